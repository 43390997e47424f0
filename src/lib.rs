pub mod chunk;
pub mod config;
pub mod db;
pub mod error;
pub mod fetch;
pub mod manager;
pub mod session;
pub mod storage;
pub mod upload;

mod types;

pub use error::{ErrorKind, PortalError, Result};
pub use manager::VideoManager;
pub use types::*;
