pub mod config;
pub mod context;
pub mod disk;
pub mod error;
pub mod fs;
pub mod mount;
pub mod shell;
pub mod utils;

pub use context::{Context, Session};
pub use error::{DiskError, ErrorKind, Result};
