//! CLI for chapterdl.

mod commands;

use anyhow::Result;
use chapterdl_core::archive::OutputFormat;
use chapterdl_core::config::{self, ChapterdlConfig, ConfigOverrides};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};

use commands::{run_completions, run_dedupe, run_embed_cover, run_fetch, run_man, run_resume_point};

/// Top-level CLI for chapterdl.
#[derive(Debug, Parser)]
#[command(name = "chapterdl", version)]
#[command(about = "chapterdl: fetch chapter images and pack them into cbz/zip archives", long_about = None)]
pub struct Cli {
    /// Config file to use instead of ~/.config/chapterdl/config.toml.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Log at debug level to stderr instead of the log file.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Fetch the chapters listed in a series manifest and archive them.
    Fetch(FetchArgs),

    /// Print the highest chapter already archived in a series folder.
    ResumePoint {
        /// Series output folder.
        series_dir: PathBuf,
        /// Series title used in cbz names (default: the folder name).
        #[arg(long, value_name = "TITLE")]
        series: Option<String>,
    },

    /// Add a cover image as the first entry of an archive (no-op if it has one).
    EmbedCover {
        /// Archive (.cbz or .zip).
        archive: PathBuf,
        /// Cover image file.
        cover: PathBuf,
    },

    /// Merge duplicate series folders in a library directory.
    Dedupe {
        /// Library directory holding one folder per series.
        library: PathBuf,
        /// Print the plan without moving or deleting anything.
        #[arg(long)]
        dry_run: bool,
    },

    /// Print shell completions to stdout.
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },

    /// Print the man page (roff) to stdout.
    Man,
}

#[derive(Debug, Args)]
pub struct FetchArgs {
    /// Series manifest (JSON) with resolved chapter and page URLs.
    pub manifest: PathBuf,

    /// Output root directory; the series gets its own folder inside it.
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Only these chapters, comma-separated (e.g. "12,12.5").
    #[arg(short, long, value_name = "LIST")]
    pub chapters: Option<String>,

    /// Only chapters after the latest one already archived.
    #[arg(short, long)]
    pub latest: bool,

    /// Write vol_NNN.zip archives instead of cbz.
    #[arg(short, long)]
    pub zip: bool,

    /// Fetch pages one at a time.
    #[arg(short, long)]
    pub sequence: bool,

    /// Pause after every N chapters (0 disables).
    #[arg(long, value_name = "N")]
    pub rlc: Option<u32>,

    /// Ceiling in seconds for pauses and retry backoff.
    #[arg(long, value_name = "SECS")]
    pub max_sleep: Option<u64>,

    /// Attempts per page, including the first.
    #[arg(long, value_name = "N")]
    pub max_retries: Option<u32>,

    /// Concurrent page fetches per chapter.
    #[arg(long, value_name = "N")]
    pub max_workers: Option<usize>,

    /// Re-fetch chapters whose archive already exists.
    #[arg(long)]
    pub no_skip_existing: bool,

    /// Write the run report as JSON to PATH.
    #[arg(long, value_name = "PATH")]
    pub report: Option<PathBuf>,
}

impl FetchArgs {
    /// Flags that were given; absent flags keep the config value.
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            output_dir: self.output.clone(),
            output_format: self.zip.then_some(OutputFormat::Zip),
            max_workers: self.max_workers,
            sequential: self.sequence.then_some(true),
            rate_limit_chapter_count: self.rlc,
            max_sleep_secs: self.max_sleep,
            max_retries: self.max_retries,
            skip_existing: self.no_skip_existing.then_some(false),
            resume: self.latest.then_some(true),
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<ChapterdlConfig> {
    let cfg = match path {
        Some(p) => config::load_from(p)?,
        None => config::load_or_init()?,
    };
    tracing::debug!("loaded config: {:?}", cfg);
    Ok(cfg)
}

impl Cli {
    /// Runs the selected command and returns the process exit status.
    pub async fn run(self) -> Result<i32> {
        match self.command {
            CliCommand::Fetch(args) => {
                let mut cfg = load_config(self.config.as_deref())?;
                cfg.apply(&args.overrides());
                run_fetch(cfg, &args).await
            }
            CliCommand::ResumePoint { series_dir, series } => {
                run_resume_point(&series_dir, series.as_deref())?;
                Ok(0)
            }
            CliCommand::EmbedCover { archive, cover } => {
                run_embed_cover(&archive, &cover)?;
                Ok(0)
            }
            CliCommand::Dedupe { library, dry_run } => {
                run_dedupe(&library, dry_run)?;
                Ok(0)
            }
            CliCommand::Completions { shell } => {
                run_completions(shell);
                Ok(0)
            }
            CliCommand::Man => {
                run_man()?;
                Ok(0)
            }
        }
    }
}

#[cfg(test)]
mod tests;
