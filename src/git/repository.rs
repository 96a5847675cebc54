use super::{
    backend::{GitBackend, MergeMode, MergeOutcome},
    commit::Commit,
    error::{Error, Result},
    history,
    status::{self, TreeStatus},
};
use async_trait::async_trait;
use git2::{
    build::CheckoutBuilder, BranchType, ErrorCode, FileFavor, MergeOptions, Oid,
    Repository as Git2Repo, Signature, Sort, Status,
};
use std::path::{Path, PathBuf};

/// Name and email recorded on commits
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub name: String,
    pub email: String,
}

/// libgit2-backed [`GitBackend`]
///
/// Note: git2::Repository is not Send/Sync, so we store the path
/// and open a fresh repository handle in each async operation
#[derive(Clone, Debug, PartialEq)]
pub struct Repository {
    path: PathBuf,
    identity: Option<Identity>,
}

impl Repository {
    /// Open a repository from the given path
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let path_clone = path.clone();

        // Verify we can open it
        tokio::task::spawn_blocking(move || Git2Repo::open(path_clone)).await??;

        Ok(Self {
            path,
            identity: None,
        })
    }

    /// Open the repository containing `start_path`, which may be any
    /// directory inside its work tree
    pub async fn discover_from<P: AsRef<Path>>(start_path: P) -> Result<Self> {
        let start_path = start_path.as_ref().to_path_buf();

        let root = tokio::task::spawn_blocking(move || {
            let repo = Git2Repo::discover(&start_path)?;
            Ok::<_, git2::Error>(repo.workdir().unwrap_or(repo.path()).to_path_buf())
        })
        .await??;

        Self::open(root).await
    }

    /// Commit as `identity` instead of git's configured user
    pub fn with_identity(mut self, identity: Option<Identity>) -> Self {
        self.identity = identity;
        self
    }

    /// Open a git2::Repository for synchronous operations
    pub fn open_git2(&self) -> Result<Git2Repo> {
        Ok(Git2Repo::open(&self.path)?)
    }

    /// Run `op` against a fresh handle on the blocking pool
    async fn run<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Self, &Git2Repo) -> Result<T> + Send + 'static,
    {
        let this = self.clone();
        tokio::task::spawn_blocking(move || {
            let repo = this.open_git2()?;
            op(&this, &repo)
        })
        .await?
    }

    fn signature(&self, repo: &Git2Repo) -> Result<Signature<'static>> {
        match &self.identity {
            Some(identity) => Ok(Signature::now(&identity.name, &identity.email)?),
            None => Ok(repo.signature()?),
        }
    }
}

fn head_commit(repo: &Git2Repo) -> Result<Option<git2::Commit<'_>>> {
    match repo.head() {
        Ok(head) => Ok(Some(head.peel_to_commit()?)),
        Err(e) if matches!(e.code(), ErrorCode::UnbornBranch | ErrorCode::NotFound) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn branch_tip<'r>(repo: &'r Git2Repo, name: &str) -> Result<git2::Commit<'r>> {
    let branch = repo
        .find_branch(name, BranchType::Local)
        .map_err(|_| Error::BranchNotFound(name.to_string()))?;
    Ok(branch.get().peel_to_commit()?)
}

/// Bring index and work tree to `tree` without touching local modifications
fn check_out_tree(repo: &Git2Repo, tree: &git2::Tree) -> Result<()> {
    let mut checkout = CheckoutBuilder::new();
    checkout.safe();
    repo.checkout_tree(tree.as_object(), Some(&mut checkout))?;

    let mut index = repo.index()?;
    index.read_tree(tree)?;
    index.write()?;
    Ok(())
}

fn conflict_paths(index: &git2::Index) -> Result<Vec<String>> {
    let mut paths = Vec::new();
    for conflict in index.conflicts()? {
        let conflict = conflict?;
        if let Some(entry) = conflict.our.or(conflict.their).or(conflict.ancestor) {
            paths.push(String::from_utf8_lossy(&entry.path).into_owned());
        }
    }
    Ok(paths)
}

#[async_trait]
impl GitBackend for Repository {
    async fn status(&self) -> Result<TreeStatus> {
        self.run(|_, repo| status::read_status(repo)).await
    }

    async fn current_branch(&self) -> Result<String> {
        self.run(|_, repo| {
            let head = repo.head()?;
            if !head.is_branch() {
                return Err(Error::DetachedHead);
            }
            head.shorthand()
                .map(str::to_string)
                .ok_or(Error::InvalidUtf8)
        })
        .await
    }

    async fn file_log(&self, path: &str, limit: Option<usize>) -> Result<Vec<Commit>> {
        let path = path.to_string();
        self.run(move |_, repo| history::file_log(repo, &path, limit))
            .await
    }

    async fn log(&self, branch: &str, limit: Option<usize>, skip: usize) -> Result<Vec<Commit>> {
        let branch = branch.to_string();
        self.run(move |_, repo| history::branch_log(repo, &branch, limit, skip))
            .await
    }

    async fn add(&self, path: &str) -> Result<()> {
        let path = path.to_string();
        self.run(move |_, repo| {
            let mut index = repo.index()?;
            index.add_path(Path::new(&path))?;
            index.write()?;
            Ok(())
        })
        .await
    }

    async fn remove(&self, path: &str) -> Result<()> {
        let path = path.to_string();
        self.run(move |_, repo| {
            let mut index = repo.index()?;
            if index.get_path(Path::new(&path), 0).is_none() {
                return Err(Error::NotTracked(path));
            }

            // Same refusal as `git rm`: uncommitted edits would be lost
            let unsaved = Status::INDEX_NEW
                | Status::INDEX_MODIFIED
                | Status::INDEX_TYPECHANGE
                | Status::INDEX_RENAMED
                | Status::WT_MODIFIED
                | Status::WT_TYPECHANGE;
            if repo.status_file(Path::new(&path))?.intersects(unsaved) {
                return Err(Error::LocalChanges(path));
            }

            index.remove_path(Path::new(&path))?;
            index.write()?;

            if let Some(workdir) = repo.workdir() {
                match std::fs::remove_file(workdir.join(&path)) {
                    Ok(()) => {}
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                    Err(e) => return Err(e.into()),
                }
            }
            Ok(())
        })
        .await
    }

    async fn commit(&self, message: &str) -> Result<Oid> {
        let message = message.to_string();
        self.run(move |this, repo| {
            let mut index = repo.index()?;
            let tree_id = index.write_tree()?;
            let parent = head_commit(repo)?;

            let unchanged = match &parent {
                Some(parent) => parent.tree_id() == tree_id,
                None => index.is_empty(),
            };
            if unchanged {
                return Err(Error::NothingToCommit);
            }

            let tree = repo.find_tree(tree_id)?;
            let sig = this.signature(repo)?;
            let parents: Vec<&git2::Commit> = parent.iter().collect();
            Ok(repo.commit(Some("HEAD"), &sig, &sig, &message, &tree, &parents)?)
        })
        .await
    }

    async fn checkout_branch(&self, name: &str) -> Result<()> {
        let name = name.to_string();
        self.run(move |_, repo| {
            let target = branch_tip(repo, &name)?;

            // Refuses to overwrite local modifications
            let mut checkout = CheckoutBuilder::new();
            checkout.safe();
            repo.checkout_tree(target.as_object(), Some(&mut checkout))?;
            repo.set_head(&format!("refs/heads/{}", name))?;
            Ok(())
        })
        .await
    }

    async fn checkout_file(&self, commit: &str, path: &str) -> Result<()> {
        let (spec, path) = (commit.to_string(), path.to_string());
        self.run(move |_, repo| {
            let commit = repo
                .revparse_single(&spec)
                .and_then(|object| object.peel_to_commit())
                .map_err(|_| Error::InvalidCommit(spec.clone()))?;
            let tree = commit.tree()?;
            if tree.get_path(Path::new(&path)).is_err() {
                return Err(Error::PathNotInCommit { commit: spec, path });
            }

            let mut checkout = CheckoutBuilder::new();
            checkout.force().disable_pathspec_match(true).path(&path);
            repo.checkout_tree(tree.as_object(), Some(&mut checkout))?;
            Ok(())
        })
        .await
    }

    async fn create_branch(&self, name: &str, from: &str) -> Result<()> {
        let (name, from) = (name.to_string(), from.to_string());
        self.run(move |_, repo| {
            let tip = branch_tip(repo, &from)?;
            repo.branch(&name, &tip, false)?;
            Ok(())
        })
        .await
    }

    async fn delete_branch(&self, name: &str) -> Result<()> {
        let name = name.to_string();
        self.run(move |_, repo| {
            repo.find_branch(&name, BranchType::Local)
                .map_err(|_| Error::BranchNotFound(name.clone()))?
                .delete()?;
            Ok(())
        })
        .await
    }

    async fn ancestry_order(&self, commits: &[Oid]) -> Result<Vec<Oid>> {
        let wanted = commits.to_vec();
        self.run(move |_, repo| {
            let mut revwalk = repo.revwalk()?;
            revwalk.set_sorting(Sort::TOPOLOGICAL | Sort::REVERSE)?;
            for id in &wanted {
                revwalk.push(*id)?;
            }

            let mut ordered: Vec<Oid> = Vec::with_capacity(wanted.len());
            for id in revwalk {
                let id = id?;
                if wanted.contains(&id) && !ordered.contains(&id) {
                    ordered.push(id);
                }
            }
            Ok(ordered)
        })
        .await
    }

    async fn cherry_pick(&self, commit: Oid) -> Result<Option<Oid>> {
        self.run(move |this, repo| {
            let picked = repo.find_commit(commit)?;
            let head = repo.head()?.peel_to_commit()?;

            // recursive strategy, "theirs" on conflicting hunks
            let mut merge_opts = MergeOptions::new();
            merge_opts.file_favor(FileFavor::Theirs);
            let mainline = if picked.parent_count() > 1 { 1 } else { 0 };

            let mut picked_index =
                repo.cherrypick_commit(&picked, &head, mainline, Some(&merge_opts))?;
            if picked_index.has_conflicts() {
                return Err(Error::Conflicts {
                    operation: "cherry-pick",
                    paths: conflict_paths(&picked_index)?,
                });
            }

            let tree = repo.find_tree(picked_index.write_tree_to(repo)?)?;
            if tree.id() == head.tree_id() {
                return Ok(None);
            }

            check_out_tree(repo, &tree)?;
            let committer = this.signature(repo)?;
            let id = repo.commit(
                Some("HEAD"),
                &picked.author(),
                &committer,
                picked.message().unwrap_or_default(),
                &tree,
                &[&head],
            )?;
            Ok(Some(id))
        })
        .await
    }

    async fn merge(&self, branch: &str, mode: MergeMode) -> Result<MergeOutcome> {
        let branch = branch.to_string();
        self.run(move |this, repo| {
            let ours = repo.head()?.peel_to_commit()?;
            let theirs = branch_tip(repo, &branch)?;

            if ours.id() == theirs.id() || repo.graph_descendant_of(ours.id(), theirs.id())? {
                return Ok(MergeOutcome::UpToDate);
            }

            let mut merged = repo.merge_commits(&ours, &theirs, None)?;
            if merged.has_conflicts() {
                return Err(Error::Conflicts {
                    operation: "merge",
                    paths: conflict_paths(&merged)?,
                });
            }
            let tree = repo.find_tree(merged.write_tree_to(repo)?)?;
            check_out_tree(repo, &tree)?;

            match mode {
                MergeMode::Squash => Ok(MergeOutcome::Staged),
                MergeMode::NoFastForward { message } => {
                    let sig = this.signature(repo)?;
                    let id = repo.commit(
                        Some("HEAD"),
                        &sig,
                        &sig,
                        &message,
                        &tree,
                        &[&ours, &theirs],
                    )?;
                    Ok(MergeOutcome::Committed(id))
                }
            }
        })
        .await
    }
}
