mod error;
mod export;
mod log;
mod store;

pub use error::LogbookError;
pub use export::FileExporter;
pub use log::{InstallerLog, LogEntry};
pub use store::{FileStore, LogStore};
