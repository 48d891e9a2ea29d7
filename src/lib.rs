pub mod aggregate;
pub mod bucket;
pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod period;
pub mod resolver;
pub mod server;
pub mod storage;
pub mod types;
pub mod validation;

// Entrypoint use cases layered over the pure core above
pub mod app;
