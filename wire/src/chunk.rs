//! Codec for the chunk transport protocol spoken on a data node's socket.
//!
//! A message is a sequence of self-describing length-prefixed values: one
//! command tag, then strings and integers depending on the command. A WRITE
//! carries the chunk bytes after the header, terminated by the sender
//! half-closing the connection; a READ answers with the header echoed back
//! followed by the chunk bytes.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use utilities::result::{DfsError, Result};

const TAG_COMMAND: u8 = 1;
const TAG_STRING: u8 = 2;
const TAG_UINT: u8 = 3;

const CMD_WRITE: u8 = 1;
const CMD_READ: u8 = 2;
const CMD_DELETE: u8 = 3;

const MAX_STRING_BYTES: u32 = 4096;

/// Header of one data node operation. The chunk payload, when there is
/// one, follows the header on the same stream.
#[derive(Debug, Clone, PartialEq)]
pub enum ChunkRequest {
    Write {
        file_name: String,
        extension: String,
        chunk_number: u32,
        replication_factor: u32,
        /// Replica peers the receiving node forwards the bytes to,
        /// exactly `replication_factor - 1` entries.
        peers: Vec<String>,
    },
    Read {
        file_name: String,
        extension: String,
        chunk_number: u32,
    },
    Delete {
        file_name: String,
        extension: String,
        chunk_number: u32,
    },
}

impl ChunkRequest {
    pub async fn encode(&self, stream: &mut (impl AsyncWrite + Unpin)) -> Result<()> {
        match self {
            Self::Write {
                file_name,
                extension,
                chunk_number,
                replication_factor,
                peers,
            } => {
                write_command(stream, CMD_WRITE).await?;
                write_string(stream, file_name).await?;
                write_string(stream, extension).await?;
                write_uint(stream, *chunk_number).await?;
                write_uint(stream, *replication_factor).await?;
                for peer in peers {
                    write_string(stream, peer).await?;
                }
            }
            Self::Read {
                file_name,
                extension,
                chunk_number,
            } => {
                write_command(stream, CMD_READ).await?;
                write_string(stream, file_name).await?;
                write_string(stream, extension).await?;
                write_uint(stream, *chunk_number).await?;
            }
            Self::Delete {
                file_name,
                extension,
                chunk_number,
            } => {
                write_command(stream, CMD_DELETE).await?;
                write_string(stream, file_name).await?;
                write_string(stream, extension).await?;
                write_uint(stream, *chunk_number).await?;
            }
        }
        stream.flush().await.map_err(DfsError::transport)?;
        Ok(())
    }

    pub async fn decode(stream: &mut (impl AsyncRead + Unpin)) -> Result<Self> {
        match Self::decode_opt(stream).await? {
            Some(request) => Ok(request),
            None => Err(DfsError::transport(
                "connection closed before a command was received",
            )),
        }
    }

    /// Like [`decode`](Self::decode) but a clean close before the first
    /// byte yields `None`. A data node answers a READ for a chunk it does
    /// not hold by closing without a header, which surfaces here.
    pub async fn decode_opt(stream: &mut (impl AsyncRead + Unpin)) -> Result<Option<Self>> {
        let command = match read_command_opt(stream).await? {
            Some(command) => command,
            None => return Ok(None),
        };
        let file_name = read_string(stream).await?;
        let extension = read_string(stream).await?;
        let chunk_number = read_uint(stream).await?;
        let request = match command {
            CMD_WRITE => {
                let replication_factor = read_uint(stream).await?;
                let mut peers = Vec::new();
                for _ in 1..replication_factor {
                    peers.push(read_string(stream).await?);
                }
                Self::Write {
                    file_name,
                    extension,
                    chunk_number,
                    replication_factor,
                    peers,
                }
            }
            CMD_READ => Self::Read {
                file_name,
                extension,
                chunk_number,
            },
            CMD_DELETE => Self::Delete {
                file_name,
                extension,
                chunk_number,
            },
            other => {
                return Err(DfsError::protocol(format!("unknown command tag {other}")));
            }
        };
        Ok(Some(request))
    }
}

async fn write_value(
    stream: &mut (impl AsyncWrite + Unpin),
    tag: u8,
    payload: &[u8],
) -> Result<()> {
    stream.write_u8(tag).await.map_err(DfsError::transport)?;
    stream
        .write_u32_le(payload.len() as u32)
        .await
        .map_err(DfsError::transport)?;
    stream
        .write_all(payload)
        .await
        .map_err(DfsError::transport)?;
    Ok(())
}

async fn write_command(stream: &mut (impl AsyncWrite + Unpin), command: u8) -> Result<()> {
    write_value(stream, TAG_COMMAND, &[command]).await
}

async fn write_string(stream: &mut (impl AsyncWrite + Unpin), value: &str) -> Result<()> {
    write_value(stream, TAG_STRING, value.as_bytes()).await
}

async fn write_uint(stream: &mut (impl AsyncWrite + Unpin), value: u32) -> Result<()> {
    write_value(stream, TAG_UINT, &value.to_le_bytes()).await
}

async fn read_value(
    stream: &mut (impl AsyncRead + Unpin),
    expected_tag: u8,
) -> Result<Vec<u8>> {
    let tag = stream.read_u8().await.map_err(DfsError::transport)?;
    if tag != expected_tag {
        return Err(DfsError::protocol(format!(
            "expected value tag {expected_tag}, got {tag}"
        )));
    }
    let len = stream.read_u32_le().await.map_err(DfsError::transport)?;
    if len > MAX_STRING_BYTES {
        return Err(DfsError::protocol(format!(
            "header value of {len} bytes exceeds the limit"
        )));
    }
    let mut payload = vec![0u8; len as usize];
    stream
        .read_exact(&mut payload)
        .await
        .map_err(DfsError::transport)?;
    Ok(payload)
}

async fn read_command_opt(stream: &mut (impl AsyncRead + Unpin)) -> Result<Option<u8>> {
    let tag = match stream.read_u8().await {
        Ok(tag) => tag,
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(DfsError::transport(e)),
    };
    if tag != TAG_COMMAND {
        return Err(DfsError::protocol(format!(
            "expected a command tag first, got {tag}"
        )));
    }
    let len = stream.read_u32_le().await.map_err(DfsError::transport)?;
    if len != 1 {
        return Err(DfsError::protocol(format!(
            "command value must be one byte, got {len}"
        )));
    }
    let command = stream.read_u8().await.map_err(DfsError::transport)?;
    Ok(Some(command))
}

async fn read_string(stream: &mut (impl AsyncRead + Unpin)) -> Result<String> {
    let payload = read_value(stream, TAG_STRING).await?;
    Ok(String::from_utf8(payload)?)
}

async fn read_uint(stream: &mut (impl AsyncRead + Unpin)) -> Result<u32> {
    let payload = read_value(stream, TAG_UINT).await?;
    let bytes: [u8; 4] = payload
        .as_slice()
        .try_into()
        .map_err(|_| DfsError::protocol("integer value must be four bytes"))?;
    Ok(u32::from_le_bytes(bytes))
}

/// Deterministic blob name a chunk is stored under inside a data
/// directory.
pub fn chunk_file_name(file_name: &str, chunk_number: u32, extension: &str) -> String {
    format!("{file_name}-{chunk_number}{extension}")
}

/// Recovers the chunk number from a blob name produced by
/// [`chunk_file_name`], or `None` when the blob belongs to another file.
pub fn parse_chunk_file_name(blob: &str, file_name: &str, extension: &str) -> Option<u32> {
    blob.strip_prefix(file_name)?
        .strip_prefix('-')?
        .strip_suffix(extension)?
        .parse()
        .ok()
}

/// Splits an hdfs file name into its stem and extension suffix, the two
/// halves every header carries separately. Leading directories are
/// dropped.
pub fn split_hdfs_name(name: &str) -> (String, String) {
    let base = name
        .rsplit_once(['/', '\\'])
        .map(|(_, base)| base)
        .unwrap_or(name);
    match base.rfind('.') {
        Some(dot) if dot > 0 => (base[..dot].to_owned(), base[dot..].to_owned()),
        _ => (base.to_owned(), String::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    async fn round_trip(request: ChunkRequest) {
        let mut buf = Vec::new();
        request.encode(&mut buf).await.unwrap();
        let decoded = ChunkRequest::decode(&mut Cursor::new(buf)).await.unwrap();
        assert_eq!(decoded, request);
    }

    #[tokio::test]
    async fn write_header_round_trip() {
        round_trip(ChunkRequest::Write {
            file_name: "words".to_owned(),
            extension: ".txt".to_owned(),
            chunk_number: 2,
            replication_factor: 3,
            peers: vec!["10.0.0.2:4001".to_owned(), "10.0.0.3:4001".to_owned()],
        })
        .await;
    }

    #[tokio::test]
    async fn read_and_delete_header_round_trip() {
        round_trip(ChunkRequest::Read {
            file_name: "words".to_owned(),
            extension: ".txt".to_owned(),
            chunk_number: 0,
        })
        .await;
        round_trip(ChunkRequest::Delete {
            file_name: "words".to_owned(),
            extension: String::new(),
            chunk_number: 0,
        })
        .await;
    }

    #[tokio::test]
    async fn clean_close_decodes_to_none() {
        let decoded = ChunkRequest::decode_opt(&mut Cursor::new(Vec::new()))
            .await
            .unwrap();
        assert!(decoded.is_none());
    }

    #[tokio::test]
    async fn garbage_tag_is_a_protocol_error() {
        let buf = vec![9u8, 0, 0, 0, 0];
        let result = ChunkRequest::decode(&mut Cursor::new(buf)).await;
        assert!(matches!(
            result,
            Err(utilities::result::DfsError::Protocol(_))
        ));
    }

    #[test]
    fn blob_names() {
        assert_eq!(chunk_file_name("words", 4, ".txt"), "words-4.txt");
        assert_eq!(parse_chunk_file_name("words-4.txt", "words", ".txt"), Some(4));
        assert_eq!(parse_chunk_file_name("words-4.txt", "words", ".kv"), None);
        assert_eq!(parse_chunk_file_name("other-1.txt", "words", ".txt"), None);
        // a stem containing dashes still parses
        assert_eq!(
            parse_chunk_file_name("words-map-0.kv", "words-map", ".kv"),
            Some(0)
        );
    }

    #[test]
    fn hdfs_name_splitting() {
        assert_eq!(
            split_hdfs_name("data/words.txt"),
            ("words".to_owned(), ".txt".to_owned())
        );
        assert_eq!(
            split_hdfs_name("words"),
            ("words".to_owned(), String::new())
        );
        assert_eq!(
            split_hdfs_name(".hidden"),
            (".hidden".to_owned(), String::new())
        );
    }
}
