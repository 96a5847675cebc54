//! Document-oriented version control for static site content.
//!
//! Every content file lives in a git repository with two long-lived
//! branches: `master`, where edits are saved, and `staging`, where published
//! content is collected. [`Gitpad`] turns save, remove, revert and publish
//! actions into sequences of git primitives provided by a [`GitBackend`].

pub mod config;
pub mod git;
pub mod message;
pub mod pad;

pub use git::{Commit, Error, GitBackend, Repository, Result, TreeStatus};
pub use pad::{Gitpad, PadSettings};
