//! Configuration management for respite.
//!
//! Settings live in a single JSON file in the platform data directory (see
//! [`DataStorage`]). Every section is optional; a missing file or section
//! falls back to the built-in defaults, so the daemon runs without any setup.
//!
//! ## Structure
//!
//! - **monitor**: activity detector thresholds in milliseconds
//! - **breaks**: one section per break with its timer and prelude settings
//! - **general**: operation mode, usage mode and insist policy
//!
//! ## Change keys
//!
//! A running daemon reloads the file when it changes. The differences are
//! reported as slash-separated keys (`timers/rest_break/limit`,
//! `breaks/micro_pause/enabled`, `monitor/idle`, `general/usage-mode`, ...)
//! and the scheduler re-applies only the settings under those prefixes.
//!
//! ## Usage Examples
//!
//! ```rust,no_run
//! use respite::libs::config::Config;
//!
//! let config = Config::read()?;
//! let rest = config.breaks().rest_break;
//! println!("Rest break every {} seconds", rest.limit);
//! # Ok::<(), respite::libs::error::ConfigError>(())
//! ```

use super::activity::Thresholds;
use super::data_storage::DataStorage;
use super::error::ConfigError;
use super::event::BreakId;
use super::modes::{InsistPolicy, OperationMode, UsageMode};
use crate::libs::messages::Message;
use crate::msg_print;
use dialoguer::{theme::ColorfulTheme, Confirm, Input, MultiSelect, Select};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::warn;

pub const CONFIG_FILE_NAME: &str = "config.json";

/// A section offered by the interactive setup.
#[derive(Debug, Clone)]
pub struct ConfigModule {
    pub key: String,
    pub name: String,
}

/// Activity detector thresholds.
///
/// Durations are in milliseconds. Values below 50 come from configurations
/// that stored seconds and are scaled up by 1000.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct MonitorConfig {
    pub noise: u64,
    pub activity: u64,
    pub idle: u64,
    /// Minimum pointer movement in pixels.
    pub sensitivity: i32,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        MonitorConfig {
            noise: 9000,
            activity: 1000,
            idle: 5000,
            sensitivity: 3,
        }
    }
}

impl MonitorConfig {
    pub fn thresholds(&self) -> Thresholds {
        let millis = |value: u64| if value < 50 { value * 1000 } else { value };
        Thresholds {
            noise: Duration::from_millis(millis(self.noise)),
            activity: Duration::from_millis(millis(self.activity)),
            idle: Duration::from_millis(millis(self.idle)),
            sensitivity: self.sensitivity,
        }
    }
}

/// Timer and prelude settings of one break. Intervals are in seconds.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct BreakConfig {
    pub enabled: bool,
    pub limit: i64,
    /// Rest needed to reset the timer; 0 disables the interval reset.
    pub auto_reset: i64,
    /// Wall-clock reset rule such as `day/4:00`; empty for none.
    #[serde(default)]
    pub reset_pred: String,
    pub snooze: i64,
    /// Preludes before the break is shown directly; negative for unlimited.
    pub max_preludes: i32,
    /// Daily limit only: count activity from the micro-break timer.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub use_microbreak_activity: bool,
}

impl BreakConfig {
    pub fn micro_pause() -> Self {
        BreakConfig {
            enabled: true,
            limit: 180,
            auto_reset: 30,
            reset_pred: String::new(),
            snooze: 150,
            max_preludes: 3,
            use_microbreak_activity: false,
        }
    }

    pub fn rest_break() -> Self {
        BreakConfig {
            enabled: true,
            limit: 2700,
            auto_reset: 600,
            reset_pred: String::new(),
            snooze: 180,
            max_preludes: 3,
            use_microbreak_activity: false,
        }
    }

    pub fn daily_limit() -> Self {
        BreakConfig {
            enabled: true,
            limit: 14400,
            auto_reset: 0,
            reset_pred: "day/4:00".to_string(),
            snooze: 1200,
            max_preludes: 3,
            use_microbreak_activity: false,
        }
    }

    pub fn defaults_for(id: BreakId) -> Self {
        match id {
            BreakId::Micro => Self::micro_pause(),
            BreakId::Rest => Self::rest_break(),
            BreakId::DailyLimit => Self::daily_limit(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct BreaksConfig {
    #[serde(default = "BreakConfig::micro_pause")]
    pub micro_pause: BreakConfig,
    #[serde(default = "BreakConfig::rest_break")]
    pub rest_break: BreakConfig,
    #[serde(default = "BreakConfig::daily_limit")]
    pub daily_limit: BreakConfig,
}

impl Default for BreaksConfig {
    fn default() -> Self {
        BreaksConfig {
            micro_pause: BreakConfig::micro_pause(),
            rest_break: BreakConfig::rest_break(),
            daily_limit: BreakConfig::daily_limit(),
        }
    }
}

impl BreaksConfig {
    pub fn get(&self, id: BreakId) -> &BreakConfig {
        match id {
            BreakId::Micro => &self.micro_pause,
            BreakId::Rest => &self.rest_break,
            BreakId::DailyLimit => &self.daily_limit,
        }
    }

    pub fn get_mut(&mut self, id: BreakId) -> &mut BreakConfig {
        match id {
            BreakId::Micro => &mut self.micro_pause,
            BreakId::Rest => &mut self.rest_break,
            BreakId::DailyLimit => &mut self.daily_limit,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
#[serde(default, rename_all = "kebab-case")]
pub struct GeneralConfig {
    pub operation_mode: OperationMode,
    pub usage_mode: UsageMode,
    pub insist_policy: InsistPolicy,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Config {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub monitor: Option<MonitorConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub breaks: Option<BreaksConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub general: Option<GeneralConfig>,
}

impl Config {
    /// Configuration with every section filled in.
    pub fn defaults() -> Self {
        Config {
            monitor: Some(MonitorConfig::default()),
            breaks: Some(BreaksConfig::default()),
            general: Some(GeneralConfig::default()),
        }
    }

    pub fn path() -> Result<PathBuf, ConfigError> {
        DataStorage::new().get_path(CONFIG_FILE_NAME).map_err(|source| ConfigError::Io {
            path: PathBuf::from(CONFIG_FILE_NAME),
            source,
        })
    }

    /// Reads the configuration file, or the defaults when there is none.
    pub fn read() -> Result<Config, ConfigError> {
        Self::read_from(&Self::path()?)
    }

    pub fn read_from(path: &Path) -> Result<Config, ConfigError> {
        if !path.exists() {
            return Ok(Config::default());
        }
        let config_str = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&config_str)?)
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let config_file = File::create(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::to_writer_pretty(&config_file, &self)?;
        Ok(())
    }

    pub fn monitor(&self) -> MonitorConfig {
        self.monitor.clone().unwrap_or_default()
    }

    pub fn breaks(&self) -> BreaksConfig {
        self.breaks.clone().unwrap_or_default()
    }

    pub fn general(&self) -> GeneralConfig {
        self.general.clone().unwrap_or_default()
    }

    /// Keys of every setting that differs between `self` and `other`.
    pub fn changed_keys(&self, other: &Config) -> Vec<String> {
        let mut keys = Vec::new();
        let mut note = |changed: bool, key: String| {
            if changed {
                keys.push(key);
            }
        };

        let (old, new) = (self.monitor(), other.monitor());
        note(old.noise != new.noise, "monitor/noise".to_string());
        note(old.activity != new.activity, "monitor/activity".to_string());
        note(old.idle != new.idle, "monitor/idle".to_string());
        note(old.sensitivity != new.sensitivity, "monitor/sensitivity".to_string());

        let (old_breaks, new_breaks) = (self.breaks(), other.breaks());
        for id in BreakId::ALL {
            let (old, new) = (old_breaks.get(id), new_breaks.get(id));
            let name = id.name();
            note(old.limit != new.limit, format!("timers/{}/limit", name));
            note(old.auto_reset != new.auto_reset, format!("timers/{}/auto_reset", name));
            note(old.reset_pred != new.reset_pred, format!("timers/{}/reset_pred", name));
            note(old.snooze != new.snooze, format!("timers/{}/snooze", name));
            note(
                old.use_microbreak_activity != new.use_microbreak_activity,
                format!("timers/{}/use_microbreak_activity", name),
            );
            note(old.enabled != new.enabled, format!("breaks/{}/enabled", name));
            note(old.max_preludes != new.max_preludes, format!("breaks/{}/max_preludes", name));
        }

        let (old, new) = (self.general(), other.general());
        note(old.operation_mode != new.operation_mode, "general/operation-mode".to_string());
        note(old.usage_mode != new.usage_mode, "general/usage-mode".to_string());
        note(old.insist_policy != new.insist_policy, "general/insist-policy".to_string());

        keys
    }

    /// Interactive setup of the selected sections.
    pub fn init() -> anyhow::Result<Self> {
        let mut config = match Self::read() {
            Ok(config) => config,
            Err(_) => Config::default(),
        };

        let mut modules: Vec<ConfigModule> = BreakId::ALL
            .iter()
            .map(|id| ConfigModule {
                key: id.name().to_string(),
                name: id.label().to_string(),
            })
            .collect();
        modules.push(ConfigModule {
            key: "monitor".to_string(),
            name: Message::ConfigModuleMonitor.to_string(),
        });
        modules.push(ConfigModule {
            key: "general".to_string(),
            name: Message::ConfigModuleGeneral.to_string(),
        });

        let selected = MultiSelect::with_theme(&ColorfulTheme::default())
            .with_prompt(Message::PromptSelectModules.to_string())
            .items(&modules.iter().map(|module| &module.name).collect::<Vec<_>>())
            .interact()?;

        for &selection in &selected {
            let key = modules[selection].key.as_str();
            if let Some(id) = BreakId::from_name(key) {
                let mut breaks = config.breaks();
                *breaks.get_mut(id) = Self::prompt_break(id, breaks.get(id))?;
                config.breaks = Some(breaks);
                continue;
            }
            match key {
                "monitor" => config.monitor = Some(Self::prompt_monitor(&config.monitor())?),
                "general" => config.general = Some(Self::prompt_general(&config.general())?),
                _ => {}
            }
        }

        Ok(config)
    }

    fn prompt_break(id: BreakId, default: &BreakConfig) -> anyhow::Result<BreakConfig> {
        let theme = ColorfulTheme::default();
        msg_print!(Message::ConfigModuleBreak(id.label().to_string()));

        let enabled = Confirm::with_theme(&theme)
            .with_prompt(Message::PromptBreakEnabled.to_string())
            .default(default.enabled)
            .interact()?;
        let limit = Input::with_theme(&theme)
            .with_prompt(Message::PromptBreakLimit.to_string())
            .default(default.limit)
            .interact_text()?;
        let auto_reset = Input::with_theme(&theme)
            .with_prompt(Message::PromptBreakAutoReset.to_string())
            .default(default.auto_reset)
            .interact_text()?;
        let reset_pred: String = Input::with_theme(&theme)
            .with_prompt(Message::PromptBreakResetRule.to_string())
            .default(default.reset_pred.clone())
            .allow_empty(true)
            .interact_text()?;
        let snooze = Input::with_theme(&theme)
            .with_prompt(Message::PromptBreakSnooze.to_string())
            .default(default.snooze)
            .interact_text()?;
        let max_preludes = Input::with_theme(&theme)
            .with_prompt(Message::PromptBreakMaxPreludes.to_string())
            .default(default.max_preludes)
            .interact_text()?;
        let use_microbreak_activity = if id == BreakId::DailyLimit {
            Confirm::with_theme(&theme)
                .with_prompt(Message::PromptUseMicroBreakActivity.to_string())
                .default(default.use_microbreak_activity)
                .interact()?
        } else {
            false
        };

        Ok(BreakConfig {
            enabled,
            limit,
            auto_reset,
            reset_pred: reset_pred.trim().to_string(),
            snooze,
            max_preludes,
            use_microbreak_activity,
        })
    }

    fn prompt_monitor(default: &MonitorConfig) -> anyhow::Result<MonitorConfig> {
        let theme = ColorfulTheme::default();
        msg_print!(Message::ConfigModuleMonitor);
        Ok(MonitorConfig {
            noise: Input::with_theme(&theme)
                .with_prompt(Message::PromptNoiseThreshold.to_string())
                .default(default.noise)
                .interact_text()?,
            activity: Input::with_theme(&theme)
                .with_prompt(Message::PromptActivityThreshold.to_string())
                .default(default.activity)
                .interact_text()?,
            idle: Input::with_theme(&theme)
                .with_prompt(Message::PromptIdleThreshold.to_string())
                .default(default.idle)
                .interact_text()?,
            sensitivity: Input::with_theme(&theme)
                .with_prompt(Message::PromptSensitivity.to_string())
                .default(default.sensitivity)
                .interact_text()?,
        })
    }

    fn prompt_general(default: &GeneralConfig) -> anyhow::Result<GeneralConfig> {
        let theme = ColorfulTheme::default();
        msg_print!(Message::ConfigModuleGeneral);

        let modes = [OperationMode::Normal, OperationMode::Quiet, OperationMode::Suspended];
        let mode = Select::with_theme(&theme)
            .with_prompt(Message::PromptOperationMode.to_string())
            .items(&["normal", "quiet", "suspended"])
            .default(modes.iter().position(|m| *m == default.operation_mode).unwrap_or(0))
            .interact()?;

        let usages = [UsageMode::Normal, UsageMode::Reading];
        let usage = Select::with_theme(&theme)
            .with_prompt(Message::PromptUsageMode.to_string())
            .items(&["normal", "reading"])
            .default(usages.iter().position(|u| *u == default.usage_mode).unwrap_or(0))
            .interact()?;

        let policies = [InsistPolicy::Halt, InsistPolicy::Ignore, InsistPolicy::Reset];
        let policy = Select::with_theme(&theme)
            .with_prompt(Message::PromptInsistPolicy.to_string())
            .items(&["halt", "ignore", "reset"])
            .default(policies.iter().position(|p| *p == default.insist_policy).unwrap_or(0))
            .interact()?;

        Ok(GeneralConfig {
            operation_mode: modes[mode],
            usage_mode: usages[usage],
            insist_policy: policies[policy],
        })
    }
}

/// Polls the configuration file and reports what changed.
#[derive(Debug)]
pub struct ConfigWatcher {
    path: PathBuf,
    modified: Option<SystemTime>,
    current: Config,
}

impl ConfigWatcher {
    pub fn new(path: PathBuf, current: Config) -> Self {
        let modified = modified_time(&path);
        Self { path, modified, current }
    }

    pub fn current(&self) -> &Config {
        &self.current
    }

    /// Re-reads the file if its modification time moved. Returns the new
    /// configuration and the changed keys, or `None` when nothing changed.
    pub fn poll(&mut self) -> Option<(Config, Vec<String>)> {
        let modified = modified_time(&self.path);
        if modified == self.modified {
            return None;
        }
        self.modified = modified;

        match Config::read_from(&self.path) {
            Ok(config) => {
                let keys = self.current.changed_keys(&config);
                self.current = config.clone();
                if keys.is_empty() {
                    None
                } else {
                    Some((config, keys))
                }
            }
            Err(e) => {
                warn!(error = %e, "ignoring unreadable configuration");
                None
            }
        }
    }
}

fn modified_time(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|meta| meta.modified()).ok()
}
