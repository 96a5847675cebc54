use super::error::Result;
use git2::{Status as Git2Status, StatusOptions};

/// How a single path differs from HEAD
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileState {
    Added,
    Modified,
    Deleted,
    Renamed,
    TypeChange,
    Untracked,
    Conflicted,
}

impl FileState {
    /// Get a description of the state
    pub fn description(&self) -> &'static str {
        match self {
            FileState::Added => "new file",
            FileState::Modified => "modified",
            FileState::Deleted => "deleted",
            FileState::Renamed => "renamed",
            FileState::TypeChange => "typechange",
            FileState::Untracked => "untracked",
            FileState::Conflicted => "conflicted",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEntry {
    pub path: String,
    pub state: FileState,
}

impl StatusEntry {
    pub fn new(path: impl Into<String>, state: FileState) -> Self {
        Self {
            path: path.into(),
            state,
        }
    }
}

/// Working tree state of the content repository
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TreeStatus {
    /// Checked-out branch, `None` when HEAD is detached or unborn
    pub branch: Option<String>,
    pub staged: Vec<StatusEntry>,
    pub modified: Vec<StatusEntry>,
    pub untracked: Vec<StatusEntry>,
    pub conflicted: Vec<StatusEntry>,
}

impl TreeStatus {
    pub fn total_count(&self) -> usize {
        self.staged.len() + self.modified.len() + self.untracked.len() + self.conflicted.len()
    }

    /// True when there is nothing to save and nothing untracked
    pub fn is_clean(&self) -> bool {
        self.total_count() == 0
    }
}

fn index_state(flags: Git2Status) -> Option<FileState> {
    if flags.is_index_new() {
        Some(FileState::Added)
    } else if flags.is_index_modified() {
        Some(FileState::Modified)
    } else if flags.is_index_deleted() {
        Some(FileState::Deleted)
    } else if flags.is_index_renamed() {
        Some(FileState::Renamed)
    } else if flags.is_index_typechange() {
        Some(FileState::TypeChange)
    } else {
        None
    }
}

fn worktree_state(flags: Git2Status) -> Option<FileState> {
    if flags.is_wt_new() {
        Some(FileState::Untracked)
    } else if flags.is_wt_modified() {
        Some(FileState::Modified)
    } else if flags.is_wt_deleted() {
        Some(FileState::Deleted)
    } else if flags.is_wt_renamed() {
        Some(FileState::Renamed)
    } else if flags.is_wt_typechange() {
        Some(FileState::TypeChange)
    } else {
        None
    }
}

/// Read the status of an open repository. A path that is both staged and
/// modified afterwards appears in both lists.
pub fn read_status(repo: &git2::Repository) -> Result<TreeStatus> {
    let mut status = TreeStatus {
        branch: match repo.head() {
            Ok(head) if head.is_branch() => head.shorthand().map(str::to_string),
            _ => None,
        },
        ..TreeStatus::default()
    };

    let mut opts = StatusOptions::new();
    opts.include_untracked(true);
    opts.recurse_untracked_dirs(true);
    opts.include_ignored(false);
    opts.exclude_submodules(true);

    for entry in repo.statuses(Some(&mut opts))?.iter() {
        let path = String::from_utf8_lossy(entry.path_bytes()).into_owned();
        let flags = entry.status();

        if flags.is_conflicted() {
            status.conflicted.push(StatusEntry::new(path, FileState::Conflicted));
            continue;
        }
        if let Some(state) = index_state(flags) {
            status.staged.push(StatusEntry::new(path.clone(), state));
        }
        match worktree_state(flags) {
            Some(FileState::Untracked) => {
                status.untracked.push(StatusEntry::new(path, FileState::Untracked))
            }
            Some(state) => status.modified.push(StatusEntry::new(path, state)),
            None => {}
        }
    }

    Ok(status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn create_repo_with_changes() -> (TempDir, git2::Repository) {
        let temp_dir = TempDir::new().unwrap();
        let repo_path = temp_dir.path();

        let mut opts = git2::RepositoryInitOptions::new();
        opts.initial_head("master");
        let repo = git2::Repository::init_opts(repo_path, &opts).unwrap();
        let sig = git2::Signature::now("Test", "test@example.com").unwrap();

        fs::write(repo_path.join("existing.md"), "existing content\n").unwrap();
        let tree_id = {
            let mut index = repo.index().unwrap();
            index.add_path(Path::new("existing.md")).unwrap();
            index.write().unwrap();
            index.write_tree().unwrap()
        };
        {
            let tree = repo.find_tree(tree_id).unwrap();
            repo.commit(Some("HEAD"), &sig, &sig, "Initial", &tree, &[])
                .unwrap();
        }

        // Staged, modified and untracked
        fs::write(repo_path.join("staged.md"), "staged\n").unwrap();
        let mut index = repo.index().unwrap();
        index.add_path(Path::new("staged.md")).unwrap();
        index.write().unwrap();
        fs::write(repo_path.join("existing.md"), "modified\n").unwrap();
        fs::write(repo_path.join("untracked.md"), "untracked\n").unwrap();

        (temp_dir, repo)
    }

    #[test]
    fn test_read_status_groups_entries() {
        let (_temp_dir, repo) = create_repo_with_changes();
        let status = read_status(&repo).unwrap();

        assert_eq!(status.branch.as_deref(), Some("master"));
        assert_eq!(status.staged, vec![StatusEntry::new("staged.md", FileState::Added)]);
        assert_eq!(
            status.modified,
            vec![StatusEntry::new("existing.md", FileState::Modified)]
        );
        assert_eq!(
            status.untracked,
            vec![StatusEntry::new("untracked.md", FileState::Untracked)]
        );
        assert_eq!(status.total_count(), 3);
        assert!(!status.is_clean());
    }

    #[test]
    fn test_clean_repository() {
        let temp_dir = TempDir::new().unwrap();
        let repo = git2::Repository::init(temp_dir.path()).unwrap();

        let status = read_status(&repo).unwrap();
        assert!(status.is_clean());
        // Unborn HEAD
        assert_eq!(status.branch, None);
    }

    #[test]
    fn test_state_description() {
        assert_eq!(FileState::Added.description(), "new file");
        assert_eq!(FileState::Untracked.description(), "untracked");
    }
}
