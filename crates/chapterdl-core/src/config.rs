use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::archive::OutputFormat;
use crate::coordinator::FetchMode;
use crate::fetcher::HttpOptions;
use crate::pacing::ChapterPacer;
use crate::pipeline::PipelineConfig;
use crate::retry::RetryPolicy;

/// Desktop browser User-Agent; catalog image hosts reject obvious bots.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

/// Retry and pacing parameters (`[retry]` section in config.toml).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Base delay in seconds for exponential backoff.
    pub base_delay_secs: f64,
    /// Lower bound of the inter-chapter pacing pause.
    pub min_pause_secs: u64,
    /// Scale each backoff by a random factor in [0.5, 1.0].
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            base_delay_secs: 1.0,
            min_pause_secs: 15,
            jitter: true,
        }
    }
}

/// HTTP client settings (`[http]` section).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub user_agent: String,
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout_secs: 15,
            connect_timeout_secs: 10,
        }
    }
}

/// Global configuration loaded from `~/.config/chapterdl/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChapterdlConfig {
    /// Root directory; each series gets a subfolder named after its sanitized title.
    pub output_dir: PathBuf,
    pub output_format: OutputFormat,
    /// Concurrent page fetches within one chapter.
    pub max_workers: usize,
    /// Fetch pages one at a time instead of in parallel.
    pub sequential: bool,
    /// Pause after this many processed chapters; 0 disables pacing.
    pub rate_limit_chapter_count: u32,
    /// Ceiling for both retry backoff and pacing pauses.
    pub max_sleep_secs: u64,
    /// Total attempts per page, including the first.
    pub max_retries: u32,
    pub skip_existing: bool,
    /// Continue after the highest chapter already archived.
    pub resume: bool,
    /// Also put the series cover at the front of each chapter archive.
    pub embed_cover: bool,
    pub retry: RetryConfig,
    pub http: HttpConfig,
}

impl Default for ChapterdlConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("./manga_downloads"),
            output_format: OutputFormat::Cbz,
            max_workers: 8,
            sequential: false,
            rate_limit_chapter_count: 10,
            max_sleep_secs: 120,
            max_retries: 5,
            skip_existing: true,
            resume: false,
            embed_cover: false,
            retry: RetryConfig::default(),
            http: HttpConfig::default(),
        }
    }
}

/// Values given on the command line; `None` keeps the file/default value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub output_dir: Option<PathBuf>,
    pub output_format: Option<OutputFormat>,
    pub max_workers: Option<usize>,
    pub sequential: Option<bool>,
    pub rate_limit_chapter_count: Option<u32>,
    pub max_sleep_secs: Option<u64>,
    pub max_retries: Option<u32>,
    pub skip_existing: Option<bool>,
    pub resume: Option<bool>,
}

impl ChapterdlConfig {
    /// CLI flags win over the file.
    pub fn apply(&mut self, o: &ConfigOverrides) {
        if let Some(v) = &o.output_dir {
            self.output_dir = v.clone();
        }
        if let Some(v) = o.output_format {
            self.output_format = v;
        }
        if let Some(v) = o.max_workers {
            self.max_workers = v;
        }
        if let Some(v) = o.sequential {
            self.sequential = v;
        }
        if let Some(v) = o.rate_limit_chapter_count {
            self.rate_limit_chapter_count = v;
        }
        if let Some(v) = o.max_sleep_secs {
            self.max_sleep_secs = v;
        }
        if let Some(v) = o.max_retries {
            self.max_retries = v;
        }
        if let Some(v) = o.skip_existing {
            self.skip_existing = v;
        }
        if let Some(v) = o.resume {
            self.resume = v;
        }
    }

    fn ceiling(&self) -> Duration {
        Duration::from_secs(self.max_sleep_secs)
    }

    fn base_delay(&self) -> Result<Duration> {
        Duration::try_from_secs_f64(self.retry.base_delay_secs.max(0.0))
            .with_context(|| format!("retry.base_delay_secs = {} is out of range", self.retry.base_delay_secs))
    }

    /// Rejects values that cannot become durations.
    pub fn validate(&self) -> Result<()> {
        self.base_delay()?;
        Ok(())
    }

    /// Policy for page fetches; an out-of-range base delay falls back to the ceiling.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_retries,
            base_delay: self.base_delay().unwrap_or_else(|_| self.ceiling()),
            max_delay: self.ceiling(),
            jitter: self.retry.jitter,
        }
    }

    pub fn pacer(&self) -> ChapterPacer {
        ChapterPacer {
            every: self.rate_limit_chapter_count,
            min_pause: Duration::from_secs(self.retry.min_pause_secs),
            ceiling: self.ceiling(),
        }
    }

    pub fn http_options(&self) -> HttpOptions {
        HttpOptions {
            user_agent: self.http.user_agent.clone(),
            connect_timeout: Duration::from_secs(self.http.connect_timeout_secs),
            timeout: Duration::from_secs(self.http.timeout_secs),
        }
    }

    pub fn fetch_mode(&self) -> FetchMode {
        if self.sequential {
            FetchMode::Sequential
        } else {
            FetchMode::Parallel {
                max_workers: self.max_workers.max(1),
            }
        }
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            output_dir: self.output_dir.clone(),
            format: self.output_format,
            mode: self.fetch_mode(),
            pacer: self.pacer(),
            skip_existing: self.skip_existing,
            resume: self.resume,
            embed_cover: self.embed_cover,
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("chapterdl")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from the XDG path, creating a default file if none exists.
pub fn load_or_init() -> Result<ChapterdlConfig> {
    load_from(&config_path()?)
}

/// Load configuration from `path`, creating a default file there if none exists.
pub fn load_from(path: &Path) -> Result<ChapterdlConfig> {
    if !path.exists() {
        let default_cfg = ChapterdlConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml).with_context(|| format!("write {}", path.display()))?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: ChapterdlConfig = toml::from_str(&data).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate().with_context(|| format!("invalid config {}", path.display()))?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let cfg = ChapterdlConfig::default();
        assert_eq!(cfg.output_dir, PathBuf::from("./manga_downloads"));
        assert_eq!(cfg.output_format, OutputFormat::Cbz);
        assert_eq!(cfg.max_workers, 8);
        assert_eq!(cfg.rate_limit_chapter_count, 10);
        assert_eq!(cfg.max_sleep_secs, 120);
        assert_eq!(cfg.max_retries, 5);
        assert!(cfg.skip_existing);
        assert!(!cfg.resume);
    }

    #[test]
    fn config_toml_roundtrip() {
        let cfg = ChapterdlConfig::default();
        let toml = toml::to_string_pretty(&cfg).unwrap();
        let parsed: ChapterdlConfig = toml::from_str(&toml).unwrap();
        assert_eq!(parsed, cfg);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let toml = r#"
            output_format = "zip"
            max_retries = 2

            [retry]
            jitter = false
        "#;
        let cfg: ChapterdlConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.output_format, OutputFormat::Zip);
        assert_eq!(cfg.max_retries, 2);
        assert!(!cfg.retry.jitter);
        assert_eq!(cfg.retry.min_pause_secs, 15);
        assert_eq!(cfg.max_workers, 8);
        assert_eq!(cfg.http.timeout_secs, 15);
    }

    #[test]
    fn cli_overrides_win() {
        let mut cfg: ChapterdlConfig = toml::from_str("max_workers = 3\nsequential = false").unwrap();
        cfg.apply(&ConfigOverrides {
            sequential: Some(true),
            max_sleep_secs: Some(30),
            ..Default::default()
        });
        assert_eq!(cfg.fetch_mode(), FetchMode::Sequential);
        assert_eq!(cfg.retry_policy().max_delay, Duration::from_secs(30));
        assert_eq!(cfg.pacer().ceiling, Duration::from_secs(30));
        assert_eq!(cfg.max_workers, 3);
    }

    #[test]
    fn load_from_creates_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let cfg = load_from(&path).unwrap();
        assert_eq!(cfg, ChapterdlConfig::default());
        assert!(path.exists());
        assert_eq!(load_from(&path).unwrap(), cfg);
    }

    #[test]
    fn infinite_base_delay_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[retry]\nbase_delay_secs = inf\n").unwrap();
        let err = load_from(&path).unwrap_err();
        assert!(format!("{err:#}").contains("base_delay_secs"));

        let mut cfg = ChapterdlConfig::default();
        cfg.retry.base_delay_secs = 1e300;
        assert_eq!(cfg.retry_policy().base_delay, Duration::from_secs(cfg.max_sleep_secs));
    }

    #[test]
    fn zero_workers_still_runs_one() {
        let mut cfg = ChapterdlConfig::default();
        cfg.max_workers = 0;
        assert_eq!(cfg.fetch_mode(), FetchMode::Parallel { max_workers: 1 });
    }
}
