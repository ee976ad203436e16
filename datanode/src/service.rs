use crate::namenode_service::NameNodeService;
use std::time::Duration;
use storage::{file_storage::FileStorage, storage::Storage};
use tokio::{
    io::{copy, AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
};
use utilities::backoff::Backoff;
use utilities::logger::{error, info, span, trace, Instrument, Level, Span};
use utilities::result::{DfsError, Result};
use wire::chunk::{chunk_file_name, parse_chunk_file_name, ChunkRequest};
use wire::frame;

/// The chunk transport server of one data node. Every accepted
/// connection carries a single WRITE, READ, or DELETE.
pub struct ChunkServer {
    listener: TcpListener,
    store: FileStorage,
    namenode: NameNodeService,
    advertised_addr: String,
}

impl ChunkServer {
    pub async fn bind(
        listen_addr: &str,
        store: FileStorage,
        namenode: NameNodeService,
    ) -> Result<Self> {
        let listener = TcpListener::bind(listen_addr)
            .await
            .map_err(DfsError::transport)?;
        let advertised_addr = listener
            .local_addr()
            .map_err(DfsError::transport)?
            .to_string();
        Ok(Self {
            listener,
            store,
            namenode,
            advertised_addr,
        })
    }

    /// Overrides the address recorded as the replica holder; the bound
    /// address is not reachable when listening on a wildcard interface.
    pub fn set_advertised_addr(&mut self, addr: impl Into<String>) {
        self.advertised_addr = addr.into();
    }

    pub fn local_addr(&self) -> Result<std::net::SocketAddr> {
        self.listener.local_addr().map_err(DfsError::transport)
    }

    pub async fn serve(self) -> Result<()> {
        loop {
            let (stream, _) = self
                .listener
                .accept()
                .await
                .map_err(DfsError::transport)?;
            let store = self.store.clone();
            let namenode = self.namenode.clone();
            let advertised_addr = self.advertised_addr.clone();
            let span = Span::current();
            tokio::spawn(
                async move {
                    if let Err(e) =
                        handle_connection(stream, store, namenode, advertised_addr).await
                    {
                        error!(error = %e, "error while handling a chunk connection");
                    }
                }
                .instrument(span),
            );
        }
    }
}

async fn handle_connection(
    mut stream: TcpStream,
    store: FileStorage,
    namenode: NameNodeService,
    advertised_addr: String,
) -> Result<()> {
    match ChunkRequest::decode(&mut stream).await? {
        ChunkRequest::Write {
            file_name,
            extension,
            chunk_number,
            replication_factor,
            peers,
        } => {
            let span = span!(Level::INFO, "chunk_write", %file_name, chunk_number);
            handle_write(
                stream,
                store,
                namenode,
                advertised_addr,
                file_name,
                extension,
                chunk_number,
                replication_factor,
                peers,
            )
            .instrument(span)
            .await
        }
        ChunkRequest::Read {
            file_name,
            extension,
            chunk_number,
        } => {
            let span = span!(Level::INFO, "chunk_read", %file_name, chunk_number);
            handle_read(stream, store, file_name, extension, chunk_number)
                .instrument(span)
                .await
        }
        ChunkRequest::Delete {
            file_name,
            extension,
            chunk_number,
        } => {
            let span = span!(Level::INFO, "chunk_delete", %file_name, chunk_number);
            handle_delete(store, namenode, advertised_addr, file_name, extension)
                .instrument(span)
                .await
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn handle_write(
    mut stream: TcpStream,
    store: FileStorage,
    namenode: NameNodeService,
    advertised_addr: String,
    file_name: String,
    extension: String,
    chunk_number: u32,
    replication_factor: u32,
    peers: Vec<String>,
) -> Result<()> {
    let blob = chunk_file_name(&file_name, chunk_number, &extension);
    let stored_bytes = store.write(blob.clone(), &mut stream).await?;
    trace!(%blob, stored_bytes, "chunk stored");
    // the catalog learns about the chunk before the writer sees the
    // connection close, so a subsequent read always finds it
    let full_name = format!("{file_name}{extension}");
    namenode
        .chunk_written(
            &full_name,
            stored_bytes,
            replication_factor,
            chunk_number,
            &advertised_addr,
        )
        .await?;
    for peer in &peers {
        // a lost peer costs a replica, not the write
        if let Err(e) = Backoff::new(3, Duration::from_millis(200))
            .run(|| forward_to_peer(&store, &blob, &file_name, &extension, chunk_number, peer))
            .await
        {
            error!(error = %e, %peer, "could not forward the chunk to a replica peer");
        }
    }
    Ok(())
}

async fn forward_to_peer(
    store: &FileStorage,
    blob: &str,
    file_name: &str,
    extension: &str,
    chunk_number: u32,
    peer: &str,
) -> Result<()> {
    let mut peer_stream = frame::connect(peer).await?;
    ChunkRequest::Write {
        file_name: file_name.to_owned(),
        extension: extension.to_owned(),
        chunk_number,
        replication_factor: 1,
        peers: vec![],
    }
    .encode(&mut peer_stream)
    .await?;
    let mut reader = store.read(blob.to_owned()).await?;
    copy(&mut reader, &mut peer_stream)
        .await
        .map_err(DfsError::transport)?;
    peer_stream
        .shutdown()
        .await
        .map_err(DfsError::transport)?;
    // wait for the peer to store and report before counting the replica
    let mut sink = Vec::new();
    peer_stream
        .read_to_end(&mut sink)
        .await
        .map_err(DfsError::transport)?;
    trace!(%peer, %blob, "chunk forwarded to replica peer");
    Ok(())
}

async fn handle_read(
    mut stream: TcpStream,
    store: FileStorage,
    file_name: String,
    extension: String,
    chunk_number: u32,
) -> Result<()> {
    let blob = chunk_file_name(&file_name, chunk_number, &extension);
    let mut reader = match store.read(blob.clone()).await {
        Ok(reader) => reader,
        Err(e) => {
            // closing without a header tells the reader the chunk is
            // not here
            info!(%blob, error = %e, "chunk not found, closing without a payload");
            return Ok(());
        }
    };
    ChunkRequest::Read {
        file_name,
        extension,
        chunk_number,
    }
    .encode(&mut stream)
    .await?;
    copy(&mut reader, &mut stream)
        .await
        .map_err(DfsError::transport)?;
    stream.flush().await.map_err(DfsError::transport)?;
    Ok(())
}

async fn handle_delete(
    store: FileStorage,
    namenode: NameNodeService,
    advertised_addr: String,
    file_name: String,
    extension: String,
) -> Result<()> {
    let full_name = format!("{file_name}{extension}");
    let mut removed = 0u32;
    for blob in store.available_chunks().await? {
        let Some(chunk_number) = parse_chunk_file_name(&blob, &file_name, &extension) else {
            continue;
        };
        store.delete(blob.clone()).await?;
        namenode
            .chunk_deleted(&full_name, chunk_number, &advertised_addr)
            .await?;
        removed += 1;
    }
    info!(%full_name, removed, "local chunks deleted");
    Ok(())
}
