mod json;
mod proc_net;
mod services;

use crate::connection::ConnectionRecord;
use std::path::PathBuf;
use thiserror::Error;

pub use json::JsonSnapshotSource;
pub use proc_net::{ProcNetSource, parse_table};
pub use services::{DEFAULT_SERVICES_FILE, ServiceTable, WithServices};

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Failed to read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse snapshot '{path}': {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Anything that can produce a full snapshot of the current connections
pub trait ConnectionSource {
    fn snapshot(&mut self) -> Result<Vec<ConnectionRecord>, SourceError>;
}

impl<S: ConnectionSource + ?Sized> ConnectionSource for Box<S> {
    fn snapshot(&mut self) -> Result<Vec<ConnectionRecord>, SourceError> {
        (**self).snapshot()
    }
}
