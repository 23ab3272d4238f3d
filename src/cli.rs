//! CLI argument definitions using clap
//!
//! Commands:
//! - oss-disk ls [dir] [--recursive]
//! - oss-disk cat <path>
//! - oss-disk put <path> <source> [--mimetype <type>]
//! - oss-disk rm | rmdir | mkdir | stat | exists | url <path>
//! - oss-disk cp | mv <from> <to>
//! - oss-disk sign <path> [--expires <secs>] [--host <endpoint>] [--https]

use anyhow::{Context, Result};
use bytes::Bytes;
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::io::AsyncReadExt;

use crate::storage::{Filesystem, WriteOptions};

/// oss-disk - filesystem commands against an Aliyun OSS bucket
#[derive(Parser, Debug)]
#[command(name = "oss-disk")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, default_value = "./config.json")]
    pub config: PathBuf,

    /// Disk to operate on (defaults to the configured default disk)
    #[arg(long)]
    pub disk: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List a directory
    Ls {
        #[arg(default_value = "")]
        dir: String,
        /// Descend into subdirectories
        #[arg(short, long)]
        recursive: bool,
    },

    /// Print a file to stdout
    Cat { path: String },

    /// Upload a local file ("-" reads stdin)
    Put {
        path: String,
        source: PathBuf,
        #[arg(long)]
        mimetype: Option<String>,
    },

    /// Delete a file
    Rm { path: String },

    /// Delete a directory and everything under it
    Rmdir { dir: String },

    /// Create a directory
    Mkdir { dir: String },

    /// Copy a file
    Cp { from: String, to: String },

    /// Move a file
    Mv { from: String, to: String },

    /// Show file metadata as JSON
    Stat { path: String },

    /// Check whether a file exists
    Exists { path: String },

    /// Print the public URL of a file
    Url { path: String },

    /// Print a signed download URL
    Sign {
        path: String,
        /// Validity in seconds
        #[arg(long, default_value_t = 3600)]
        expires: u64,
        /// Endpoint host to sign for, e.g. the public endpoint of an internal disk
        #[arg(long)]
        host: Option<String>,
        /// Force an https URL
        #[arg(long)]
        https: bool,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

async fn read_source(source: &Path) -> Result<Bytes> {
    let mut buf = Vec::new();
    if source.as_os_str() == "-" {
        tokio::io::stdin().read_to_end(&mut buf).await?;
    } else {
        buf = tokio::fs::read(source)
            .await
            .with_context(|| format!("failed to read {}", source.display()))?;
    }
    Ok(Bytes::from(buf))
}

/// Run one command against a disk / 对磁盘执行一条命令
pub async fn run(fs: &Filesystem, command: Command, out: &mut impl Write) -> Result<()> {
    match command {
        Command::Ls { dir, recursive } => {
            for entry in fs.list_contents(&dir, recursive).await? {
                if entry.is_dir() {
                    writeln!(out, "{:>12}  {:>10}  {}/", "-", entry.timestamp, entry.path)?;
                } else {
                    writeln!(
                        out,
                        "{:>12}  {:>10}  {}",
                        entry.size.unwrap_or(0),
                        entry.timestamp,
                        entry.path
                    )?;
                }
            }
        }
        Command::Cat { path } => {
            out.write_all(&fs.read(&path).await?)?;
        }
        Command::Put { path, source, mimetype } => {
            let contents = read_source(&source).await?;
            let mut options = WriteOptions::default();
            if let Some(mimetype) = mimetype {
                options = options.mimetype(&mimetype);
            }
            let record = fs.write(&path, contents, &options).await?;
            writeln!(out, "{} ({} bytes, {})", record.path, record.size, record.mimetype)?;
        }
        Command::Rm { path } => fs.delete(&path).await?,
        Command::Rmdir { dir } => fs.delete_directory(&dir).await?,
        Command::Mkdir { dir } => {
            let record = fs.create_directory(&dir, &WriteOptions::default()).await?;
            writeln!(out, "{}/", record.path)?;
        }
        Command::Cp { from, to } => fs.copy(&from, &to).await?,
        Command::Mv { from, to } => fs.rename(&from, &to).await?,
        Command::Stat { path } => {
            let metadata = fs.get_metadata(&path).await?;
            writeln!(out, "{}", serde_json::to_string_pretty(&metadata)?)?;
        }
        Command::Exists { path } => {
            writeln!(out, "{}", fs.exists(&path).await?)?;
        }
        Command::Url { path } => {
            writeln!(out, "{}", fs.get_url(&path).await?)?;
        }
        Command::Sign { path, expires, host, https } => {
            let url = fs
                .get_signed_download_url(&path, expires, host.as_deref(), https)
                .await?;
            writeln!(out, "{}", url)?;
        }
    }
    Ok(())
}
