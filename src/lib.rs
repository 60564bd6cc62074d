pub mod cli;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod media;
pub mod providers;
pub mod secrets;
pub mod server;

pub use error::{RelayError, Result};
