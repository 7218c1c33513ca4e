use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AppError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_db_path")]
    pub db_path: String,

    #[serde(default)]
    pub summary_api: SummaryApiConfig,

    #[serde(default)]
    pub mailer: MailerConfig,

    #[serde(default)]
    pub schedule: ScheduleConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryApiConfig {
    #[serde(default = "default_summary_endpoint")]
    pub endpoint: String,

    pub api_key: Option<String>,

    #[serde(default = "default_summary_model")]
    pub model: String,

    #[serde(default = "default_summary_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailerConfig {
    #[serde(default = "default_mailer_endpoint")]
    pub endpoint: String,

    pub api_key: Option<String>,

    #[serde(default = "default_mail_from")]
    pub from: String,

    #[serde(default = "default_mailer_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Local "HH:MM" at which the daily summary run fires.
    #[serde(default = "default_summary_time")]
    pub summary_time: String,

    /// Hour-of-day anchor for summary dates and the rolling article window.
    #[serde(default = "default_anchor_hour")]
    pub anchor_hour: u32,

    /// Maximum queue items processed per drain pass.
    #[serde(default = "default_drain_batch_size")]
    pub drain_batch_size: i64,
}

fn default_db_path() -> String {
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("newsbrief");
    std::fs::create_dir_all(&data_dir).ok();
    data_dir.join("newsbrief.db").to_string_lossy().to_string()
}

fn default_summary_endpoint() -> String {
    "https://api.perplexity.ai/chat/completions".to_string()
}

fn default_summary_model() -> String {
    "llama-3.1-sonar-large-128k-online".to_string()
}

fn default_summary_timeout() -> u64 {
    120
}

fn default_mailer_endpoint() -> String {
    "https://api.resend.com/emails".to_string()
}

fn default_mail_from() -> String {
    "digest@newsbrief.example".to_string()
}

fn default_mailer_timeout() -> u64 {
    30
}

fn default_summary_time() -> String {
    "07:00".to_string()
}

fn default_anchor_hour() -> u32 {
    6
}

fn default_drain_batch_size() -> i64 {
    50
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            summary_api: SummaryApiConfig::default(),
            mailer: MailerConfig::default(),
            schedule: ScheduleConfig::default(),
        }
    }
}

impl Default for SummaryApiConfig {
    fn default() -> Self {
        Self {
            endpoint: default_summary_endpoint(),
            api_key: None,
            model: default_summary_model(),
            timeout_secs: default_summary_timeout(),
        }
    }
}

impl Default for MailerConfig {
    fn default() -> Self {
        Self {
            endpoint: default_mailer_endpoint(),
            api_key: None,
            from: default_mail_from(),
            timeout_secs: default_mailer_timeout(),
        }
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            summary_time: default_summary_time(),
            anchor_hour: default_anchor_hour(),
            drain_batch_size: default_drain_batch_size(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load from an explicit path, writing the defaults there on first run.
    pub fn load_from(config_path: &Path) -> Result<Self> {
        let config = if config_path.exists() {
            let content = std::fs::read_to_string(config_path)?;
            toml::from_str(&content).map_err(|e| AppError::Config(e.to_string()))?
        } else {
            let config = Config::default();
            config.save_to(config_path)?;
            config
        };
        config.validate()?;
        Ok(config)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| AppError::Config(e.to_string()))?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("newsbrief")
            .join("config.toml")
    }

    fn validate(&self) -> Result<()> {
        if self.schedule.anchor_hour >= 24 {
            return Err(AppError::Config(format!(
                "schedule.anchor_hour must be 0-23, got {}",
                self.schedule.anchor_hour
            )));
        }
        let canonical = chrono::NaiveTime::parse_from_str(&self.schedule.summary_time, "%H:%M")
            .map(|t| t.format("%H:%M").to_string());
        if canonical.as_deref() != Ok(self.schedule.summary_time.as_str()) {
            return Err(AppError::Config(format!(
                "schedule.summary_time must be \"HH:MM\", got {:?}",
                self.schedule.summary_time
            )));
        }
        if self.schedule.drain_batch_size <= 0 {
            return Err(AppError::Config(
                "schedule.drain_batch_size must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
