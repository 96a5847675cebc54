//! Commit messages recorded for document actions.

use chrono::{DateTime, Local};

pub fn saved(file: &str, msg: &str) -> String {
    format!("Saved file \"{}\": {}", file, msg)
}

pub fn removed(file: &str, msg: &str) -> String {
    format!("Removed file \"{}\": {}", file, msg)
}

pub fn reverted(file: &str, commit: &str, msg: &str) -> String {
    format!(
        "Reverted file \"{}\" to previous version from snapshot ID {}: {}",
        file, commit, msg
    )
}

/// Summary line carries the publish date, the body carries `msg`
pub fn published(at: DateTime<Local>, date_format: &str, msg: &str) -> String {
    format!("Publish {}\n\n{}", at.format(date_format), msg)
}

pub fn promoted(
    staging: &str,
    master: &str,
    at: DateTime<Local>,
    date_format: &str,
    msg: &str,
) -> String {
    format!(
        "Promote {} into {} {}\n\n{}",
        staging,
        master,
        at.format(date_format),
        msg
    )
}
