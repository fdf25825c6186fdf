//! Failures raised while wiring the process together.

use std::{io, net::SocketAddr, path::PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum InfraError {
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("cannot listen on {addr}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
    #[error("media directory `{}` is not usable", .path.display())]
    MediaRoot {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("postgres is unavailable")]
    Database(#[from] sqlx::Error),
    #[error("schema migration failed")]
    Migration(#[from] sqlx::migrate::MigrateError),
    #[error("cannot install the log subscriber: {0}")]
    Logging(String),
}

impl InfraError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}
