//! Document actions on top of git: save, remove, revert and publish content
//! files along the master/staging convention.

use crate::config::Config;
use crate::git::{
    Commit, Error, GitBackend, Identity, MergeMode, MergeOutcome, Repository, Result, TreeStatus,
};
use crate::message;
use chrono::Local;
use git2::Oid;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// Branch names and message settings the document actions run with
#[derive(Debug, Clone, PartialEq)]
pub struct PadSettings {
    pub master_branch: String,
    pub staging_branch: String,
    pub temp_branch_prefix: String,
    pub date_format: String,
}

impl From<&Config> for PadSettings {
    fn from(config: &Config) -> Self {
        PadSettings {
            master_branch: config.repository.master_branch.clone(),
            staging_branch: config.repository.staging_branch.clone(),
            temp_branch_prefix: config.repository.temp_branch_prefix.clone(),
            date_format: config.publish.date_format.clone(),
        }
    }
}

impl Default for PadSettings {
    fn default() -> Self {
        PadSettings::from(&Config::default())
    }
}

/// Version control for the documents of one repository.
///
/// Mutating actions are serialized: a second save or publish waits until the
/// first one has finished and HEAD is back on its original branch.
pub struct Gitpad<B> {
    backend: Arc<B>,
    settings: PadSettings,
    lock: Mutex<()>,
}

impl Gitpad<Repository> {
    /// Open the repository containing `path` and report its status
    pub async fn init<P: AsRef<Path>>(path: P, config: &Config) -> Result<(Self, TreeStatus)> {
        let path = path.as_ref();

        let opened = async {
            let identity = config.author.clone().map(Identity::from);
            let repo = Repository::discover_from(path).await?.with_identity(identity);
            let pad = Gitpad::new(repo, PadSettings::from(config));
            let status = pad.status().await?;
            Ok::<_, Error>((pad, status))
        }
        .await;

        match &opened {
            Ok(_) => info!(path = %path.display(), "git repository initialized"),
            Err(e) => error!(path = %path.display(), "git repository initialization failed: {}", e),
        }
        opened
    }
}

impl<B: GitBackend + 'static> Gitpad<B> {
    pub fn new(backend: B, settings: PadSettings) -> Self {
        Self {
            backend: Arc::new(backend),
            settings,
            lock: Mutex::new(()),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn settings(&self) -> &PadSettings {
        &self.settings
    }

    /// Working tree status: clean or not, tracked and untracked files
    pub async fn status(&self) -> Result<TreeStatus> {
        self.backend.status().await
    }

    /// Edit history of one file, newest first. `None` lists every commit.
    pub async fn file_history(&self, file: &str, limit: Option<usize>) -> Result<Vec<Commit>> {
        self.backend.file_log(file, limit).await
    }

    /// Most recent commits on the master branch, `skip` for pagination
    pub async fn history(&self, limit: Option<usize>, skip: usize) -> Result<Vec<Commit>> {
        self.backend
            .log(&self.settings.master_branch, limit, skip)
            .await
    }

    /// Stage `file` and commit it
    pub async fn save_file(&self, file: &str, msg: &str) -> Result<Oid> {
        let _guard = self.lock.lock().await;
        let id = self.add_and_commit(file, &message::saved(file, msg)).await?;
        info!(file, commit = %id, "saved file");
        Ok(id)
    }

    /// Delete `file` and commit the removal. A removed file can be brought
    /// back with [`Gitpad::revert_file`].
    pub async fn remove_file(&self, file: &str, msg: &str) -> Result<Oid> {
        let _guard = self.lock.lock().await;
        self.backend.remove(file).await?;
        let id = self.backend.commit(&message::removed(file, msg)).await?;
        info!(file, commit = %id, "removed file");
        Ok(id)
    }

    /// Restore `file` as it was in `commit` and commit the result
    pub async fn revert_file(&self, commit: &str, file: &str, msg: &str) -> Result<Oid> {
        let _guard = self.lock.lock().await;
        self.backend.checkout_file(commit, file).await?;
        let id = self
            .add_and_commit(file, &message::reverted(file, commit, msg))
            .await?;
        info!(file, from = commit, commit = %id, "reverted file");
        Ok(id)
    }

    /// Publish the latest edit of each of `files`.
    ///
    /// The commits are cherry-picked onto a temporary copy of the staging
    /// branch, which is then squashed into staging as one publish commit.
    /// HEAD returns to the branch it started on whether or not this succeeds.
    pub async fn publish_files<S: AsRef<str>>(&self, files: &[S], msg: &str) -> Result<Oid> {
        if files.is_empty() {
            return Err(Error::NothingToPublish);
        }
        let _guard = self.lock.lock().await;

        let commits = self.latest_commits(files).await?;
        let original = self.backend.current_branch().await?;
        let temp = self.temp_branch_name();

        self.backend
            .create_branch(&temp, &self.settings.staging_branch)
            .await?;
        debug!(branch = %temp, "created publish branch");

        let published = self.squash_into_staging(&temp, &commits, msg).await;
        let published = self.restore_branch(&original, published).await;

        if let Err(e) = self.backend.delete_branch(&temp).await {
            warn!(branch = %temp, "could not delete publish branch: {}", e);
        }

        let id = published?;
        info!(files = files.len(), commit = %id, "published files");
        Ok(id)
    }

    /// Merge everything on master into staging with a merge commit.
    /// `None` when staging already has it all.
    pub async fn publish_all(&self, msg: &str) -> Result<Option<Oid>> {
        let _guard = self.lock.lock().await;

        let original = self.backend.current_branch().await?;
        let message = message::published(Local::now(), &self.settings.date_format, msg);
        let merged = self
            .merge_into(&self.settings.staging_branch, &self.settings.master_branch, message)
            .await;
        let merged = self.restore_branch(&original, merged).await?;

        match merged {
            Some(id) => info!(commit = %id, "published all changes"),
            None => info!("staging already up to date"),
        }
        Ok(merged)
    }

    /// Merge staging back into master with a merge commit
    pub async fn promote(&self, msg: &str) -> Result<Option<Oid>> {
        let _guard = self.lock.lock().await;

        let settings = &self.settings;
        let original = self.backend.current_branch().await?;
        let message = message::promoted(
            &settings.staging_branch,
            &settings.master_branch,
            Local::now(),
            &settings.date_format,
            msg,
        );
        let merged = self
            .merge_into(&settings.master_branch, &settings.staging_branch, message)
            .await;
        let merged = self.restore_branch(&original, merged).await?;

        if let Some(id) = merged {
            info!(commit = %id, "promoted staging");
        }
        Ok(merged)
    }

    async fn add_and_commit(&self, file: &str, message: &str) -> Result<Oid> {
        self.backend.add(file).await?;
        self.backend.commit(message).await
    }

    /// Latest commit of every file, deduplicated, ancestors before their
    /// descendants. All lookups run concurrently; the first failure cancels
    /// the rest.
    async fn latest_commits<S: AsRef<str>>(&self, files: &[S]) -> Result<Vec<Commit>> {
        let mut lookups = JoinSet::new();
        for (position, file) in files.iter().enumerate() {
            let backend = Arc::clone(&self.backend);
            let file = file.as_ref().to_string();
            lookups.spawn(async move {
                let latest = backend.file_log(&file, Some(1)).await?.into_iter().next();
                latest
                    .map(|commit| (position, commit))
                    .ok_or(Error::NoHistory(file))
            });
        }

        let mut found = Vec::with_capacity(files.len());
        while let Some(lookup) = lookups.join_next().await {
            found.push(lookup??);
        }
        found.sort_by_key(|(position, _)| *position);

        let mut commits: Vec<Commit> = Vec::with_capacity(found.len());
        for (_, commit) in found {
            if !commits.iter().any(|seen| seen.id == commit.id) {
                commits.push(commit);
            }
        }

        // Parents must be picked before children; author dates are not reliable
        let ids: Vec<Oid> = commits.iter().map(|commit| commit.id).collect();
        let order = self.backend.ancestry_order(&ids).await?;
        commits.sort_by_key(|commit| order.iter().position(|id| *id == commit.id));
        Ok(commits)
    }

    async fn squash_into_staging(&self, temp: &str, commits: &[Commit], msg: &str) -> Result<Oid> {
        let staging = &self.settings.staging_branch;

        self.backend.checkout_branch(temp).await?;
        for commit in commits {
            match self.backend.cherry_pick(commit.id).await? {
                Some(id) => debug!(picked = %commit.short_id, commit = %id, "cherry-picked"),
                None => debug!(picked = %commit.short_id, "already on staging"),
            }
        }

        self.backend.checkout_branch(staging).await?;
        if self.backend.merge(temp, MergeMode::Squash).await? == MergeOutcome::UpToDate {
            return Err(Error::NothingToPublish);
        }

        let message = message::published(Local::now(), &self.settings.date_format, msg);
        match self.backend.commit(&message).await {
            Err(Error::NothingToCommit) => Err(Error::NothingToPublish),
            committed => committed,
        }
    }

    async fn merge_into(&self, target: &str, source: &str, message: String) -> Result<Option<Oid>> {
        self.backend.checkout_branch(target).await?;
        let outcome = self
            .backend
            .merge(source, MergeMode::NoFastForward { message })
            .await?;

        Ok(match outcome {
            MergeOutcome::Committed(id) => Some(id),
            MergeOutcome::UpToDate | MergeOutcome::Staged => None,
        })
    }

    /// Check `original` out again after a multi-branch action, keeping the
    /// action's own error when both fail
    async fn restore_branch<T>(&self, original: &str, outcome: Result<T>) -> Result<T> {
        let restored = self.backend.checkout_branch(original).await;

        match (outcome, restored) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(e)) => Err(Error::Restore {
                branch: original.to_string(),
                source: Box::new(e),
            }),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(restore)) => {
                error!(branch = original, "could not switch back after failure: {}", restore);
                Err(e)
            }
        }
    }

    fn temp_branch_name(&self) -> String {
        format!(
            "{}{}",
            self.settings.temp_branch_prefix,
            Local::now().format("%Y%m%d%H%M%S%3f")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RepositorySettings;

    #[test]
    fn test_settings_follow_config() {
        let config = Config {
            repository: RepositorySettings {
                staging_branch: "review".to_string(),
                temp_branch_prefix: "tmp/".to_string(),
                ..RepositorySettings::default()
            },
            ..Config::default()
        };

        let settings = PadSettings::from(&config);
        assert_eq!(settings.master_branch, "master");
        assert_eq!(settings.staging_branch, "review");
        assert_eq!(settings.temp_branch_prefix, "tmp/");
        assert_eq!(settings.date_format, "%Y-%m-%d %H:%M");
    }
}
