use super::error::{Error, Result};
use chrono::{DateTime, Local};
use git2::{Oid, Time};

/// One snapshot in the edit history of a document or of the whole site
#[derive(Debug, Clone, PartialEq)]
pub struct Commit {
    pub id: Oid,
    pub short_id: String,
    pub author: String,
    pub author_email: String,
    pub date: DateTime<Local>,
    pub summary: String,
    pub message: String,
}

impl Commit {
    /// Create a Commit from a git2::Commit
    pub fn from_git2(commit: &git2::Commit) -> Result<Self> {
        let id = commit.id();
        let short_id = short_id(id);

        let author = commit.author();
        let author_name = author.name().ok_or(Error::InvalidUtf8)?.to_string();
        let author_email = author.email().ok_or(Error::InvalidUtf8)?.to_string();

        let summary = commit.summary().unwrap_or_default().to_string();
        let message = commit.message().ok_or(Error::InvalidUtf8)?.to_string();

        Ok(Self {
            id,
            short_id,
            author: author_name,
            author_email,
            date: time_to_datetime(author.when()),
            summary,
            message,
        })
    }

    /// Format the date in a human-readable way
    pub fn date_str(&self) -> String {
        self.date.format("%Y-%m-%d %H:%M").to_string()
    }

    /// Format the date in a relative way (e.g., "2 hours ago")
    pub fn relative_date(&self) -> String {
        relative_to(self.date, Local::now())
    }
}

/// First seven hex digits, the way `git log --oneline` prints ids
pub fn short_id(id: Oid) -> String {
    id.to_string()[..7].to_string()
}

fn relative_to(date: DateTime<Local>, now: DateTime<Local>) -> String {
    let duration = now.signed_duration_since(date);

    let format_unit = |count: i64, unit: &str| {
        format!("{} {}{} ago", count, unit, if count == 1 { "" } else { "s" })
    };

    if duration.num_seconds() < 60 {
        return "just now".to_string();
    }
    if duration.num_minutes() < 60 {
        return format_unit(duration.num_minutes(), "minute");
    }
    if duration.num_hours() < 24 {
        return format_unit(duration.num_hours(), "hour");
    }
    if duration.num_days() < 7 {
        return format_unit(duration.num_days(), "day");
    }
    if duration.num_weeks() < 4 {
        return format_unit(duration.num_weeks(), "week");
    }
    if duration.num_days() < 365 {
        return format_unit(duration.num_days() / 30, "month");
    }

    format_unit(duration.num_days() / 365, "year")
}

fn time_to_datetime(time: Time) -> DateTime<Local> {
    DateTime::from_timestamp(time.seconds(), 0)
        .unwrap_or_default()
        .with_timezone(&Local)
}
