//! Error types for gitingest.

use std::path::PathBuf;

use crate::config::ConfigError;
use crate::output::OutputError;
use crate::walker::WalkError;

/// Top-level error type. Only whole-run failures end up here; per-file
/// problems are recorded on the classified entry instead.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("path not found: {0}")]
    PathNotFound(PathBuf),

    #[error("not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("walk error: {0}")]
    Walk(#[from] WalkError),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("output error: {0}")]
    Output(#[from] OutputError),
}

/// Map an error to its process exit code.
pub fn exit_code(error: &IngestError) -> i32 {
    match error {
        IngestError::PathNotFound(_) => 3,
        IngestError::NotADirectory(_) => 4,
        IngestError::Walk(_) => 2,
        IngestError::Io(_) | IngestError::Config(_) | IngestError::Output(_) => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(exit_code(&IngestError::PathNotFound("x".into())), 3);
        assert_eq!(exit_code(&IngestError::NotADirectory("x".into())), 4);
        let walk = WalkError::PermissionDenied { path: "x".into() };
        assert_eq!(exit_code(&IngestError::from(walk)), 2);
        let io = std::io::Error::new(std::io::ErrorKind::Other, "boom");
        assert_eq!(exit_code(&IngestError::from(io)), 1);
    }
}
