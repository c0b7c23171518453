use movie_info::IndexError;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("config file {} does not exist", .0.display())]
    MissingConfig(PathBuf),
    #[error(transparent)]
    Config(#[from] figment::Error),
    #[error("invalid log level `{0}`")]
    LogLevel(String),
    #[error(transparent)]
    Logger(#[from] log::SetLoggerError),
    #[error(transparent)]
    TitleIndex(#[from] IndexError),
    #[error("invalid id `{0}`, expected `tt123` or `tt123:season:episode`")]
    Identifier(String),
    #[error(transparent)]
    Resolver(#[from] stream_resolver::Error),
    #[error("failed to print streams: {0}")]
    Output(#[from] serde_json::Error),
}
