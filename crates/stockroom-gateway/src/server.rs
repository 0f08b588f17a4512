use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use stockroom_llm::LlmProvider;
use stockroom_rag::InventoryAssistant;
use tokio::sync::watch;

use crate::error::GatewayError;
use crate::router::build_router;

pub(crate) struct AppState<P> {
    pub assistant: Arc<InventoryAssistant<P>>,
    pub started_at: Instant,
}

impl<P> Clone for AppState<P> {
    fn clone(&self) -> Self {
        Self {
            assistant: Arc::clone(&self.assistant),
            started_at: self.started_at,
        }
    }
}

pub struct GatewayServer<P> {
    addr: SocketAddr,
    max_body_size: usize,
    assistant: Arc<InventoryAssistant<P>>,
    shutdown_rx: watch::Receiver<bool>,
}

impl<P: LlmProvider + 'static> GatewayServer<P> {
    #[must_use]
    pub fn new(
        bind: &str,
        port: u16,
        assistant: Arc<InventoryAssistant<P>>,
        shutdown_rx: watch::Receiver<bool>,
    ) -> Self {
        let addr: SocketAddr = format!("{bind}:{port}").parse().unwrap_or_else(|e| {
            tracing::warn!("invalid bind '{bind}': {e}, falling back to 127.0.0.1:{port}");
            SocketAddr::from(([127, 0, 0, 1], port))
        });

        Self {
            addr,
            max_body_size: 1_048_576,
            assistant,
            shutdown_rx,
        }
    }

    #[must_use]
    pub fn with_max_body_size(mut self, size: usize) -> Self {
        self.max_body_size = size;
        self
    }

    /// Start serving until the shutdown channel flips to `true`.
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails to bind or encounters a fatal I/O error.
    pub async fn serve(self) -> Result<(), GatewayError> {
        let state = AppState {
            assistant: self.assistant,
            started_at: Instant::now(),
        };

        let router = build_router(state, self.max_body_size);

        let listener = tokio::net::TcpListener::bind(self.addr)
            .await
            .map_err(|e| GatewayError::Bind(self.addr.to_string(), e))?;
        tracing::info!("gateway listening on {}", self.addr);

        let mut shutdown_rx = self.shutdown_rx;
        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                while !*shutdown_rx.borrow_and_update() {
                    if shutdown_rx.changed().await.is_err() {
                        std::future::pending::<()>().await;
                    }
                }
                tracing::info!("gateway shutting down");
            })
            .await
            .map_err(|e| GatewayError::Server(format!("{e}")))?;

        Ok(())
    }
}
