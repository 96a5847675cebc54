use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Background git task failed: {0}")]
    TaskFailed(String),

    #[error("HEAD is detached, not on a branch")]
    DetachedHead,

    #[error("Branch not found: {0}")]
    BranchNotFound(String),

    #[error("Invalid commit ID: {0}")]
    InvalidCommit(String),

    #[error("File \"{path}\" does not exist in snapshot {commit}")]
    PathNotInCommit { commit: String, path: String },

    #[error("File is not tracked: {0}")]
    NotTracked(String),

    #[error("File has unsaved changes: {0}")]
    LocalChanges(String),

    #[error("No history found for file: {0}")]
    NoHistory(String),

    #[error("Nothing to commit")]
    NothingToCommit,

    #[error("Nothing to publish")]
    NothingToPublish,

    #[error("{operation} stopped on conflicts in: {}", .paths.join(", "))]
    Conflicts {
        operation: &'static str,
        paths: Vec<String>,
    },

    #[error("Could not switch back to branch \"{branch}\": {source}")]
    Restore {
        branch: String,
        #[source]
        source: Box<Error>,
    },

    #[error("Invalid UTF-8 in git data")]
    InvalidUtf8,
}

impl From<tokio::task::JoinError> for Error {
    fn from(err: tokio::task::JoinError) -> Self {
        Error::TaskFailed(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflicts_message_lists_paths() {
        let err = Error::Conflicts {
            operation: "cherry-pick",
            paths: vec!["a.md".to_string(), "b.md".to_string()],
        };
        assert_eq!(err.to_string(), "cherry-pick stopped on conflicts in: a.md, b.md");
    }

    #[test]
    fn test_restore_keeps_source() {
        let err = Error::Restore {
            branch: "master".to_string(),
            source: Box::new(Error::DetachedHead),
        };
        assert!(err.to_string().contains("\"master\""));
        assert!(std::error::Error::source(&err).is_some());
    }
}
