use crate::Provider;

/// Broad classes of failure. Only [`ErrorKind::ClientInput`] is ever returned to a caller of
/// `resolve_streams`; everything else degrades to "this source contributed nothing".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    ClientInput,
    UpstreamUnavailable,
    Cache,
    Config,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid content type `{0}`, expected `movie` or `series`")]
    InvalidContentType(String),
    #[error("{provider}: {message}")]
    Upstream { provider: Provider, message: String },
    #[error("{provider} scraper task aborted: {message}")]
    TaskAborted { provider: Provider, message: String },
    #[error("cache error: {0}")]
    Cache(String),
    #[error("malformed cached payload: {0}")]
    CachedPayload(#[from] serde_json::Error),
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidContentType(_) => ErrorKind::ClientInput,
            Error::Upstream { .. } | Error::TaskAborted { .. } => ErrorKind::UpstreamUnavailable,
            Error::Cache(_) | Error::CachedPayload(_) => ErrorKind::Cache,
            Error::Config(_) => ErrorKind::Config,
        }
    }

    pub(crate) fn upstream(provider: Provider, message: impl Into<String>) -> Self {
        Error::Upstream {
            provider,
            message: message.into(),
        }
    }
}
