//! Configuration shared by the stockroom binary and its services.

pub mod config;

pub use config::Config;
