use super::{commit::Commit, error::Result, status::TreeStatus};
use async_trait::async_trait;
use git2::Oid;

/// How `merge` combines another branch into HEAD
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeMode {
    /// Always record a merge commit, even when HEAD could fast-forward
    NoFastForward { message: String },
    /// Stage the combined tree in index and work tree without committing
    Squash,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// HEAD already contains the other branch
    UpToDate,
    Committed(Oid),
    Staged,
}

/// The git primitives document operations are composed from.
///
/// Implemented by [`super::Repository`] on top of libgit2; tests substitute
/// a recording backend.
#[async_trait]
pub trait GitBackend: Send + Sync {
    async fn status(&self) -> Result<TreeStatus>;

    /// Short name of the checked-out branch
    async fn current_branch(&self) -> Result<String>;

    /// Commits on HEAD that changed `path`, newest first
    async fn file_log(&self, path: &str, limit: Option<usize>) -> Result<Vec<Commit>>;

    /// Commits reachable from `branch`, newest first
    async fn log(&self, branch: &str, limit: Option<usize>, skip: usize) -> Result<Vec<Commit>>;

    async fn add(&self, path: &str) -> Result<()>;

    /// Drop `path` from the index and delete it from the work tree. Refuses
    /// while `path` has edits that are not committed.
    async fn remove(&self, path: &str) -> Result<()>;

    async fn commit(&self, message: &str) -> Result<Oid>;

    async fn checkout_branch(&self, name: &str) -> Result<()>;

    /// Restore a single path from `commit` into index and work tree
    async fn checkout_file(&self, commit: &str, path: &str) -> Result<()>;

    /// Create branch `name` pointing at the tip of branch `from`
    async fn create_branch(&self, name: &str, from: &str) -> Result<()>;

    async fn delete_branch(&self, name: &str) -> Result<()>;

    /// `commits` reordered so that ancestors come before their descendants
    async fn ancestry_order(&self, commits: &[Oid]) -> Result<Vec<Oid>>;

    /// Apply `commit` onto HEAD, favoring its side on conflicting hunks.
    /// `None` when the pick changes nothing.
    async fn cherry_pick(&self, commit: Oid) -> Result<Option<Oid>>;

    async fn merge(&self, branch: &str, mode: MergeMode) -> Result<MergeOutcome>;
}
