//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

use tgmedia_core::config::{ConfigOverrides, DEFAULT_CONFIG_PATH};
use tgmedia_core::session::SessionOptions;

/// Browse a chat's history and download selected media attachments.
///
/// Prompts for a chat link, username or id, lists its messages, then
/// downloads the documents attached to the messages you pick.
#[derive(Parser, Debug)]
#[command(name = "tgmedia")]
#[command(author, version, about)]
pub struct Args {
    /// Path to the JSON config file
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Increase log verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Only log errors and hide progress bars
    #[arg(short, long)]
    pub quiet: bool,

    /// Chat link, @username or id to open instead of prompting
    #[arg(long, value_name = "REF")]
    pub resource: Option<String>,

    /// Selection to download instead of prompting (e.g. "1,4-6", "T")
    #[arg(long, value_name = "EXPR")]
    pub select: Option<String>,

    /// Download directory, overrides PATH_DOWNLOAD
    #[arg(long, value_name = "DIR")]
    pub download_dir: Option<PathBuf>,

    /// Attempts per message (1-10), overrides MAX_ATTEMPTS
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=10))]
    pub max_attempts: Option<u8>,

    /// Re-attempt rate-limited messages after waiting
    #[arg(long)]
    pub retry_rate_limited: bool,

    /// Give up after this many invalid answers to one prompt
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u16).range(1..))]
    pub max_prompts: Option<u16>,

    /// Do not print messages while the history is fetched
    #[arg(long)]
    pub no_echo: bool,
}

impl Args {
    /// Config values given on the command line.
    #[must_use]
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            download_dir: self.download_dir.clone(),
            max_attempts: self.max_attempts.map(u32::from),
            retry_rate_limited: self.retry_rate_limited,
        }
    }

    /// Session settings given on the command line.
    #[must_use]
    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            resource: self.resource.clone(),
            selection: self.select.clone(),
            max_prompt_attempts: self.max_prompts.map(usize::from),
            echo_listing: !self.no_echo,
        }
    }

    /// Default log filter derived from `-v`/`-q`.
    #[must_use]
    pub fn default_log_level(&self) -> &'static str {
        if self.quiet {
            "error"
        } else {
            match self.verbose {
                0 => "warn",
                1 => "debug",
                _ => "trace",
            }
        }
    }
}
