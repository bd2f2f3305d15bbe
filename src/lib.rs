pub mod conf;
pub mod docs;
pub mod generator;
pub mod server;
pub mod tracing;
pub mod types;
