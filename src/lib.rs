pub mod config;
pub mod error;
pub mod framer;
pub mod launcher;
pub mod observability;
pub mod prompt;
pub mod protocol;
pub mod relay;
pub mod server;
pub mod translator;
