//! Configuration handling for the application.
//!
//! Everything is read from environment variables with development defaults.
//! `Config::from_env` is a thin wrapper over `Config::from_lookup`, which
//! takes any key lookup so tests can feed values without touching the
//! process environment.

use std::env;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::reducer::{DEFAULT_REDUCTION_BUDGET, RuleTables};

/// Environment variable names.
pub const ENV_OPENAI_API_KEY: &str = "OPENAI_API_KEY";
pub const ENV_OPENAI_BASE_URL: &str = "OPENAI_BASE_URL";
pub const ENV_MODEL: &str = "GOLF_BUDDY_MODEL";
pub const ENV_TEMPERATURE: &str = "GOLF_BUDDY_TEMPERATURE";
pub const ENV_REDUCTION_BUDGET: &str = "GOLF_BUDDY_REDUCTION_BUDGET";
pub const ENV_MAX_HOPS: &str = "GOLF_BUDDY_MAX_HOPS";
pub const ENV_FETCH_TIMEOUT_SECS: &str = "GOLF_BUDDY_FETCH_TIMEOUT_SECS";
pub const ENV_INFERENCE_TIMEOUT_SECS: &str = "GOLF_BUDDY_INFERENCE_TIMEOUT_SECS";
pub const ENV_HEADLESS: &str = "GOLF_BUDDY_HEADLESS";
pub const ENV_RULES: &str = "GOLF_BUDDY_RULES";

/// Default values used when environment variables are absent.
const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_TEMPERATURE: f32 = 0.2;
const DEFAULT_MAX_HOPS: u32 = 1;
const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;
const DEFAULT_INFERENCE_TIMEOUT_SECS: u64 = 60;
const DEFAULT_HEADLESS: bool = true;

/// Application runtime configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    openai_api_key: Option<String>,
    openai_base_url: String,
    model: String,
    temperature: f32,
    reduction_budget: usize,
    max_hops: u32,
    fetch_timeout: Duration,
    inference_timeout: Duration,
    headless: bool,
    rules: RuleTables,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            openai_base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            reduction_budget: DEFAULT_REDUCTION_BUDGET,
            max_hops: DEFAULT_MAX_HOPS,
            fetch_timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
            inference_timeout: Duration::from_secs(DEFAULT_INFERENCE_TIMEOUT_SECS),
            headless: DEFAULT_HEADLESS,
            rules: RuleTables::default(),
        }
    }
}

impl Config {
    /// Load from environment variables, falling back to development defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Blank values count as absent.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let temperature = parse_or(get(ENV_TEMPERATURE), ENV_TEMPERATURE, defaults.temperature)?;
        if !(0.0..=2.0).contains(&temperature) {
            return Err(ConfigError::invalid(
                ENV_TEMPERATURE,
                format!("{} is outside 0.0..=2.0", temperature),
            ));
        }

        let reduction_budget = parse_or(
            get(ENV_REDUCTION_BUDGET),
            ENV_REDUCTION_BUDGET,
            defaults.reduction_budget,
        )?;
        if reduction_budget == 0 {
            return Err(ConfigError::invalid(ENV_REDUCTION_BUDGET, "must be positive"));
        }

        let rules = match get(ENV_RULES) {
            Some(path) => load_rules(Path::new(path.trim()))?,
            None => defaults.rules,
        };

        Ok(Self {
            openai_api_key: get(ENV_OPENAI_API_KEY),
            openai_base_url: get(ENV_OPENAI_BASE_URL).unwrap_or(defaults.openai_base_url),
            model: get(ENV_MODEL).unwrap_or(defaults.model),
            temperature,
            reduction_budget,
            max_hops: parse_or(get(ENV_MAX_HOPS), ENV_MAX_HOPS, defaults.max_hops)?,
            fetch_timeout: secs(
                get(ENV_FETCH_TIMEOUT_SECS),
                ENV_FETCH_TIMEOUT_SECS,
                DEFAULT_FETCH_TIMEOUT_SECS,
            )?,
            inference_timeout: secs(
                get(ENV_INFERENCE_TIMEOUT_SECS),
                ENV_INFERENCE_TIMEOUT_SECS,
                DEFAULT_INFERENCE_TIMEOUT_SECS,
            )?,
            headless: match get(ENV_HEADLESS) {
                Some(raw) => parse_bool(&raw).ok_or_else(|| {
                    ConfigError::invalid(ENV_HEADLESS, format!("'{}' is not a boolean", raw))
                })?,
                None => defaults.headless,
            },
            rules,
        })
    }

    pub fn with_max_hops(mut self, max_hops: u32) -> Self {
        self.max_hops = max_hops;
        self
    }

    /// API key for the model endpoint, if one is configured.
    pub fn openai_api_key(&self) -> Option<&str> {
        self.openai_api_key.as_deref()
    }
    /// Base URL of an OpenAI-compatible API, without trailing `/chat/completions`.
    pub fn openai_base_url(&self) -> &str {
        &self.openai_base_url
    }
    pub fn model(&self) -> &str {
        &self.model
    }
    pub fn temperature(&self) -> f32 {
        self.temperature
    }
    /// Byte cap on the text handed to the model.
    pub fn reduction_budget(&self) -> usize {
        self.reduction_budget
    }
    /// How many booking links a session may follow.
    pub fn max_hops(&self) -> u32 {
        self.max_hops
    }
    pub fn fetch_timeout(&self) -> Duration {
        self.fetch_timeout
    }
    pub fn inference_timeout(&self) -> Duration {
        self.inference_timeout
    }
    /// Only consulted by the browser fetcher.
    pub fn headless(&self) -> bool {
        self.headless
    }
    pub fn rules(&self) -> &RuleTables {
        &self.rules
    }
}

fn parse_or<T: FromStr>(
    raw: Option<String>,
    field: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    match raw {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| ConfigError::invalid(field, format!("'{}': {}", raw, e))),
        None => Ok(default),
    }
}

fn secs(raw: Option<String>, field: &'static str, default: u64) -> Result<Duration, ConfigError> {
    let secs = parse_or(raw, field, default)?;
    if secs == 0 {
        return Err(ConfigError::invalid(field, "must be at least 1 second"));
    }
    Ok(Duration::from_secs(secs))
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn load_rules(path: &Path) -> Result<RuleTables, ConfigError> {
    RuleTables::from_json_file(path).map_err(|e| ConfigError::Rules {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Errors that can occur while building a configuration.
#[derive(Debug)]
pub enum ConfigError {
    InvalidValue { field: &'static str, reason: String },
    /// The rule table file could not be read or parsed.
    Rules { path: PathBuf, reason: String },
}

impl ConfigError {
    fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field,
            reason: reason.into(),
        }
    }
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidValue { field, reason } => {
                write!(f, "invalid value for '{}': {}", field, reason)
            }
            ConfigError::Rules { path, reason } => {
                write!(f, "cannot load rule tables from {}: {}", path.display(), reason)
            }
        }
    }
}

impl Error for ConfigError {}
