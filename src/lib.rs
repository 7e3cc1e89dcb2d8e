// Library exports for the CLI and integration tests

pub mod config;
pub mod error;
pub mod events;
pub mod logging;
pub mod relay;
pub mod shutdown;
pub mod sources;
pub mod upload;
