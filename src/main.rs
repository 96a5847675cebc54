use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use gitpad::config::Config;
use gitpad::git::{Commit, StatusEntry};
use gitpad::{Gitpad, TreeStatus};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "gitpad")]
#[command(about = "Save, revert and publish site content with git")]
struct Cli {
    /// Content repository or any directory inside it (defaults to the configured path)
    #[arg(short, long, global = true)]
    repo: Option<PathBuf>,
    /// Configuration file (defaults to ~/.config/gitpad/config.yaml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show whether the working tree is clean
    Status,
    /// List recent commits on the master branch
    History {
        /// How many commits to list
        #[arg(short, long)]
        limit: Option<usize>,
        /// How many commits to skip
        #[arg(short, long, default_value = "0")]
        skip: usize,
    },
    /// List the edit history of one file
    FileHistory {
        file: String,
        /// How many commits to list
        #[arg(short, long, conflicts_with = "all")]
        limit: Option<usize>,
        /// List every commit
        #[arg(long)]
        all: bool,
    },
    /// Add a file and commit it
    Save {
        file: String,
        #[arg(short, long)]
        message: String,
    },
    /// Delete a file and commit the removal
    Remove {
        file: String,
        #[arg(short, long)]
        message: String,
    },
    /// Restore a file from an earlier snapshot and commit it
    Revert {
        commit: String,
        file: String,
        #[arg(short, long)]
        message: String,
    },
    /// Publish the latest edit of the given files to staging
    Publish {
        #[arg(required = true)]
        files: Vec<String>,
        #[arg(short, long)]
        message: String,
    },
    /// Merge everything from master into staging
    PublishAll {
        #[arg(short, long)]
        message: String,
    },
    /// Merge staging back into master
    Promote {
        #[arg(short, long)]
        message: String,
    },
    /// Write a default configuration file
    InitConfig,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("gitpad=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(Cli::parse()).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => Config::load_from_file(path)?,
        None => Config::load()?,
    };

    if let Commands::InitConfig = cli.command {
        let path = match &cli.config {
            Some(path) => {
                config.save_to_file(path)?;
                path.clone()
            }
            None => Config::init_default()?,
        };
        println!("Configuration written to {}", path.display());
        return Ok(());
    }

    let repo_path = cli.repo.unwrap_or_else(|| config.repository.path.clone());
    let (pad, status) = Gitpad::init(&repo_path, &config)
        .await
        .with_context(|| format!("Failed to open repository: {}", repo_path.display()))?;

    match cli.command {
        Commands::Status => print_status(&status),
        Commands::History { limit, skip } => {
            let limit = limit.unwrap_or(config.history.default_limit);
            print_commits(&pad.history(Some(limit), skip).await?);
        }
        Commands::FileHistory { file, limit, all } => {
            let limit = if all {
                None
            } else {
                Some(limit.unwrap_or(config.history.default_limit))
            };
            print_commits(&pad.file_history(&file, limit).await?);
        }
        Commands::Save { file, message } => {
            let id = pad.save_file(&file, &message).await?;
            println!("Saved {} as {}", file, id);
        }
        Commands::Remove { file, message } => {
            let id = pad.remove_file(&file, &message).await?;
            println!("Removed {} in {}", file, id);
        }
        Commands::Revert {
            commit,
            file,
            message,
        } => {
            let id = pad.revert_file(&commit, &file, &message).await?;
            println!("Reverted {} to {} in {}", file, commit, id);
        }
        Commands::Publish { files, message } => {
            let id = pad.publish_files(files.as_slice(), &message).await?;
            println!("Published {} file(s) in {}", files.len(), id);
        }
        Commands::PublishAll { message } => report_merge(pad.publish_all(&message).await?),
        Commands::Promote { message } => report_merge(pad.promote(&message).await?),
        Commands::InitConfig => {}
    }

    Ok(())
}

fn print_status(status: &TreeStatus) {
    let branch = status.branch.as_deref().unwrap_or("(no branch)");
    if status.is_clean() {
        println!("On {}, nothing to save", branch);
        return;
    }

    println!("On {}", branch);
    let groups: [(&str, &[StatusEntry]); 4] = [
        ("Staged", &status.staged),
        ("Modified", &status.modified),
        ("Untracked", &status.untracked),
        ("Conflicted", &status.conflicted),
    ];
    for (title, entries) in groups {
        if entries.is_empty() {
            continue;
        }
        println!("{}:", title);
        for entry in entries {
            println!("  {:<10} {}", entry.state.description(), entry.path);
        }
    }
}

fn print_commits(commits: &[Commit]) {
    for commit in commits {
        println!(
            "{} {} {:<16} {} ({})",
            commit.short_id,
            commit.date_str(),
            commit.author,
            commit.summary,
            commit.relative_date()
        );
    }
}

fn report_merge(merged: Option<git2::Oid>) {
    match merged {
        Some(id) => println!("Merged in {}", id),
        None => println!("Already up to date"),
    }
}
