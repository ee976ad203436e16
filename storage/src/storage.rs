use tokio::io;
use utilities::result::Result;

#[allow(async_fn_in_trait)]
pub trait Storage {
    async fn write(
        &self,
        chunk_id: String,
        chunk_stream: &mut (impl io::AsyncRead + Unpin),
    ) -> Result<u64>;
    async fn read(&self, chunk_id: String) -> Result<Box<dyn io::AsyncRead + Unpin + Send>>;
    async fn delete(&self, chunk_id: String) -> Result<()>;
    async fn available_chunks(&self) -> Result<Vec<String>>;
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use std::io::Cursor;
    use tokio::io::AsyncReadExt;
    use tokio::io::BufReader;

    pub async fn storage_test(storage: impl Storage) -> Result<()> {
        let chunk_id = "test_chunk.bin".to_string();
        let original_data = b"hello world";

        // Write test data
        let mut input_stream = Cursor::new(original_data);
        let written = storage.write(chunk_id.clone(), &mut input_stream).await?;
        assert_eq!(written as usize, original_data.len());
        let available_chunks = storage.available_chunks().await?;
        assert_eq!(available_chunks, vec!["test_chunk.bin".to_string()]);

        // Read and verify data
        let reader = storage.read(chunk_id.clone()).await?;
        let mut buf_reader = BufReader::new(reader);
        let mut read_buf = Vec::new();
        buf_reader.read_to_end(&mut read_buf).await?;
        assert_eq!(read_buf, original_data);

        // Delete and verify the listing shrinks
        storage.delete(chunk_id).await?;
        let available_chunks = storage.available_chunks().await?;
        assert_eq!(available_chunks.len(), 0);
        Ok(())
    }
}
