// src/error.rs

use thiserror::Error;

/// Failure reaching the remote table host. Fatal for the current load
/// cycle; the caller decides whether to trigger another attempt later.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("GET {url} returned HTTP {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("GET {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

/// Failure extracting the table file out of the downloaded archive.
///
/// `MemberNotFound` is kept distinct from the corruption variants: it means
/// the configured table id no longer matches what the host publishes, and
/// an operator has to bump the id rather than blame the network.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("archive member `{name}` not found")]
    MemberNotFound { name: String },

    #[error("reading archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("reading archive member: {0}")]
    Io(#[from] std::io::Error),
}

/// Anything that can go wrong producing a fresh row set on a cache miss.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Archive(#[from] ArchiveError),
}
