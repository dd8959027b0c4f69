use std::path::PathBuf;

use pbridge_core::PoolError;

/// Errors reported by CLI commands before exiting.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("failed to read '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write '{}': {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to read stdin: {0}")]
    Stdin(std::io::Error),

    #[error("pool '{}' is neither binary nor UTF-8 JSON: {source}", path.display())]
    NotUtf8 {
        path: PathBuf,
        source: std::string::FromUtf8Error,
    },

    #[error("invalid pool '{}': {source}", path.display())]
    Pool { path: PathBuf, source: PoolError },

    #[error("message `{0}` is not defined in the pool")]
    UnknownMessage(String),

    #[error(transparent)]
    Bridge(#[from] pbridge_lib::Error),
}

impl CliError {
    /// Print the error and terminate with exit status 1.
    pub fn exit(self) -> ! {
        eprintln!("error: {self}");
        std::process::exit(1);
    }
}
