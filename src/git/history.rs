use super::{
    commit::Commit,
    error::{Error, Result},
};
use git2::{Oid, Repository as Git2Repo, Sort};
use std::path::Path;

fn revwalk_from<'r>(repo: &'r Git2Repo, start: Oid) -> Result<git2::Revwalk<'r>> {
    let mut revwalk = repo.revwalk()?;
    revwalk.set_sorting(Sort::TIME | Sort::TOPOLOGICAL)?;
    revwalk.push(start)?;
    Ok(revwalk)
}

fn blob_at(commit: &git2::Commit, path: &Path) -> Result<Option<Oid>> {
    Ok(commit.tree()?.get_path(path).ok().map(|entry| entry.id()))
}

/// Whether `commit` changed `path`: the entry differs from every parent,
/// which is how `git log -- <path>` simplifies merges.
fn changes_path(commit: &git2::Commit, path: &Path) -> Result<bool> {
    let current = blob_at(commit, path)?;

    if commit.parent_count() == 0 {
        return Ok(current.is_some());
    }

    for parent in commit.parents() {
        if blob_at(&parent, path)? == current {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Commits on HEAD that touched `path`, newest first
pub fn file_log(repo: &Git2Repo, path: &str, limit: Option<usize>) -> Result<Vec<Commit>> {
    let head = repo.head()?.peel_to_commit()?;
    let path = Path::new(path);
    let limit = limit.unwrap_or(usize::MAX);

    let mut commits = Vec::new();
    for oid in revwalk_from(repo, head.id())? {
        if commits.len() >= limit {
            break;
        }
        let git_commit = repo.find_commit(oid?)?;
        if changes_path(&git_commit, path)? {
            commits.push(Commit::from_git2(&git_commit)?);
        }
    }

    Ok(commits)
}

/// Commits reachable from a local branch, newest first
pub fn branch_log(
    repo: &Git2Repo,
    branch: &str,
    limit: Option<usize>,
    skip: usize,
) -> Result<Vec<Commit>> {
    let tip = repo
        .find_branch(branch, git2::BranchType::Local)
        .map_err(|_| Error::BranchNotFound(branch.to_string()))?
        .get()
        .peel_to_commit()?;

    revwalk_from(repo, tip.id())?
        .skip(skip)
        .take(limit.unwrap_or(usize::MAX))
        .map(|oid| Commit::from_git2(&repo.find_commit(oid?)?))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn commit_all(repo: &Git2Repo, message: &str) -> Oid {
        let sig = git2::Signature::now("Test User", "test@example.com").unwrap();
        let mut index = repo.index().unwrap();
        index
            .add_all(["*"].iter(), git2::IndexAddOption::DEFAULT, None)
            .unwrap();
        index.update_all(["*"].iter(), None).unwrap();
        index.write().unwrap();
        let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
        let parents = match repo.head() {
            Ok(head) => vec![head.peel_to_commit().unwrap()],
            Err(_) => Vec::new(),
        };
        let parents: Vec<&git2::Commit> = parents.iter().collect();
        repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
            .unwrap()
    }

    fn create_site() -> (TempDir, Git2Repo) {
        let temp_dir = TempDir::new().unwrap();
        let mut opts = git2::RepositoryInitOptions::new();
        opts.initial_head("master");
        let repo = Git2Repo::init_opts(temp_dir.path(), &opts).unwrap();
        let root = temp_dir.path().to_path_buf();

        fs::write(root.join("index.md"), "home\n").unwrap();
        commit_all(&repo, "Add index");
        fs::write(root.join("about.md"), "about\n").unwrap();
        commit_all(&repo, "Add about");
        fs::write(root.join("index.md"), "home v2\n").unwrap();
        commit_all(&repo, "Edit index");
        fs::remove_file(root.join("about.md")).unwrap();
        commit_all(&repo, "Drop about");

        (temp_dir, repo)
    }

    #[test]
    fn test_file_log_only_lists_touching_commits() {
        let (_temp_dir, repo) = create_site();

        let commits = file_log(&repo, "index.md", None).unwrap();
        let summaries: Vec<_> = commits.iter().map(|c| c.summary.as_str()).collect();
        assert_eq!(summaries, vec!["Edit index", "Add index"]);
    }

    #[test]
    fn test_file_log_includes_removal() {
        let (_temp_dir, repo) = create_site();

        let commits = file_log(&repo, "about.md", Some(1)).unwrap();
        assert_eq!(commits.len(), 1);
        assert_eq!(commits[0].summary, "Drop about");
    }

    #[test]
    fn test_file_log_unknown_path_is_empty() {
        let (_temp_dir, repo) = create_site();
        assert!(file_log(&repo, "missing.md", None).unwrap().is_empty());
    }

    #[test]
    fn test_branch_log_pagination() {
        let (_temp_dir, repo) = create_site();

        let page = branch_log(&repo, "master", Some(2), 1).unwrap();
        let summaries: Vec<_> = page.iter().map(|c| c.summary.as_str()).collect();
        assert_eq!(summaries, vec!["Edit index", "Add about"]);

        assert_eq!(branch_log(&repo, "master", None, 0).unwrap().len(), 4);
    }

    #[test]
    fn test_branch_log_unknown_branch() {
        let (_temp_dir, repo) = create_site();
        let result = branch_log(&repo, "staging", None, 0);
        assert!(matches!(result, Err(Error::BranchNotFound(name)) if name == "staging"));
    }
}
