// Git primitives and the libgit2 backend

pub mod backend;
pub mod commit;
pub mod error;
pub mod history;
pub mod repository;
pub mod status;

pub use backend::{GitBackend, MergeMode, MergeOutcome};
pub use commit::Commit;
pub use error::{Error, Result};
pub use repository::{Identity, Repository};
pub use status::{FileState, StatusEntry, TreeStatus};
