//! HTTP gateway exposing embedding refresh, index status and inventory queries.

mod error;
mod handlers;
mod router;
mod server;

pub use error::GatewayError;
pub use server::GatewayServer;
