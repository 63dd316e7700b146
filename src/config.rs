//! Command-line configuration for the `glosa` reader.

use std::{path::PathBuf, time::Duration};

use anyhow::{Result, anyhow};
use clap::{Parser, ValueEnum};
use directories::ProjectDirs;

use crate::chapter::Book;
use crate::resolver::{
    DEFAULT_DEBOUNCE, DEFAULT_TAP_DEDUP, DEFAULT_TAP_MAX_DURATION, DEFAULT_TAP_SLOP,
    ResolverConfig,
};

const QUALIFIER: &str = "org";
const ORGANIZATION: &str = "glosa";
const APPLICATION: &str = "glosa";

const DATA_DIR_ENV: &str = "GLOSA_DATA_DIR";

/// How pointer input is presented to the selection resolver.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum InputProfile {
    /// Clicks only, like a desktop browser.
    #[default]
    Mouse,
    /// Touch start/end followed by a synthetic click, like a phone browser.
    Touch,
}

#[derive(Parser, Debug)]
#[command(
    name = "glosa",
    version,
    about = "Read Spanish novels in the terminal and gloss words or phrases on tap"
)]
pub struct CliArgs {
    #[arg(
        value_name = "CHAPTER",
        required = true,
        help = "Chapter files in reading order (.json, .md or .ftml)"
    )]
    pub chapters: Vec<PathBuf>,
    #[arg(
        long,
        value_name = "ID",
        help = "Identifier used for caching and reading position (default: derived from title)"
    )]
    pub book_id: Option<String>,
    #[arg(long, value_name = "TITLE", help = "Book title sent with gloss requests")]
    pub title: Option<String>,
    #[arg(long, value_name = "AUTHOR", default_value = "", help = "Book author")]
    pub author: String,
    #[arg(
        long,
        value_name = "URL",
        env = "GLOSA_GLOSS_ENDPOINT",
        help = "Gloss service endpoint (default: none, glosses unavailable)"
    )]
    pub gloss_endpoint: Option<String>,
    #[arg(long, value_enum, default_value_t = InputProfile::Mouse)]
    pub input: InputProfile,
    #[arg(long, value_name = "MS", default_value_t = DEFAULT_DEBOUNCE.as_millis() as u64)]
    pub debounce_ms: u64,
    #[arg(long, value_name = "MS", default_value_t = DEFAULT_TAP_MAX_DURATION.as_millis() as u64)]
    pub tap_max_ms: u64,
    #[arg(
        long,
        value_name = "PX",
        default_value_t = DEFAULT_TAP_SLOP,
        help = "Movement per axis that turns a tap into a drag"
    )]
    pub tap_slop: f32,
    #[arg(long, value_name = "MS", default_value_t = DEFAULT_TAP_DEDUP.as_millis() as u64)]
    pub dedup_ms: u64,
    #[arg(
        long,
        value_name = "FILE",
        help = "Write logs to FILE, filtered by RUST_LOG (default: no logging)"
    )]
    pub log_file: Option<PathBuf>,
    #[arg(
        long,
        value_name = "DIR",
        env = DATA_DIR_ENV,
        help = "Where the gloss cache and reading position are kept"
    )]
    pub data_dir: Option<PathBuf>,
}

impl CliArgs {
    pub fn resolver_config(&self) -> ResolverConfig {
        ResolverConfig {
            debounce: Duration::from_millis(self.debounce_ms),
            tap_max_duration: Duration::from_millis(self.tap_max_ms),
            tap_slop: self.tap_slop,
            tap_dedup: Duration::from_millis(self.dedup_ms),
            ..ResolverConfig::default()
        }
    }

    pub fn book(&self) -> Book {
        let title = self
            .title
            .clone()
            .or_else(|| {
                self.chapters
                    .first()
                    .and_then(|path| path.parent())
                    .and_then(|dir| dir.file_name())
                    .and_then(|name| name.to_str())
                    .map(str::to_string)
            })
            .unwrap_or_else(|| "Untitled".to_string());
        let id = self.book_id.clone().unwrap_or_else(|| slug(&title));
        Book {
            id,
            title,
            author: self.author.clone(),
            chapters: self.chapters.clone(),
        }
    }

    /// `--data-dir` (or `GLOSA_DATA_DIR`) when set and non-empty, otherwise
    /// the platform data directory.
    pub fn data_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = self.data_dir.as_ref().filter(|dir| !dir.as_os_str().is_empty()) {
            return Ok(dir.clone());
        }
        Ok(project_dirs()?.data_local_dir().to_path_buf())
    }
}

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from(QUALIFIER, ORGANIZATION, APPLICATION)
        .ok_or_else(|| anyhow!("unable to determine project directories for glosa"))
}

fn slug(title: &str) -> String {
    let mut slug = String::new();
    for ch in title.chars().flat_map(char::to_lowercase) {
        if ch.is_alphanumeric() {
            slug.push(ch);
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    if slug.is_empty() {
        "book".to_string()
    } else {
        slug
    }
}
