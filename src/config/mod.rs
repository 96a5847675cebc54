mod config;

pub use config::{Author, Config, HistorySettings, PublishSettings, RepositorySettings};
