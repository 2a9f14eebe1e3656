pub mod browser;
pub mod classify;
pub mod config;
pub mod cookies;
pub mod dom;
mod error;
pub mod extract;
pub mod fetch;
pub mod harvest;
pub mod logging;
pub mod media;
pub mod paths;
pub mod pipeline;
pub mod snapshot;
pub mod store;

pub use config::Config;
pub use error::{ArchiverError, Result};
