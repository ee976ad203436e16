use crate::handler::NameNodeHandler;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use utilities::logger::{error, Instrument, Span};
use utilities::result::{DfsError, Result};
use wire::frame;
use wire::namenode::NameNodeRequest;

/// Long-lived control server of the name service. Each accepted
/// connection carries one request and one response.
pub struct NameNodeServer {
    listener: TcpListener,
    handler: Arc<NameNodeHandler>,
}

impl NameNodeServer {
    pub async fn bind(addr: &str, handler: NameNodeHandler) -> Result<Self> {
        let listener = TcpListener::bind(addr).await.map_err(DfsError::transport)?;
        Ok(Self {
            listener,
            handler: Arc::new(handler),
        })
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
            let handler = self.handler.clone();
            let span = Span::current();
            tokio::spawn(
                async move {
                    if let Err(e) = handle_connection(stream, handler).await {
                        error!(error = %e, "error while handling a name service connection");
                    }
                }
                .instrument(span),
            );
        }
    }
}

async fn handle_connection(mut stream: TcpStream, handler: Arc<NameNodeHandler>) -> Result<()> {
    let request: NameNodeRequest = frame::recv(&mut stream).await?;
    let response = handler.handle(request).await;
    frame::send(&mut stream, &response).await
}
