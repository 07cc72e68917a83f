//! Configuration loading and parsing.
//!
//! Parses `artois.toml` (or an override path provided by the binary):
//!
//! ```toml
//! [server]
//! url = "http://localhost:1366/"
//! timeout_ms = 300000
//!
//! [generation]
//! batch_size = 1
//! count = 20
//!
//! [generation.params]
//! max_tokens = "20"
//!
//! [output]
//! path = "artois.html"
//! ```
//!
//! Every field has a default, so a missing file or a parse error yields a
//! usable `Config`. Unknown fields are ignored. `[generation.params]` is
//! free-form: values are forwarded to the inference server as strings and never
//! validated here.
//!
//! The batch size is clamped to `1..=MAX_BATCH_SIZE` (the largest value the
//! batch-size control can produce). The raw parsed value is retained so later
//! overrides re-clamp from the user's intent.

use anyhow::Result;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::{fs, path::PathBuf};
use tracing::{info, warn};

/// Largest batch size the batch-size control maps to (step 26).
pub const MAX_BATCH_SIZE: u32 = 8192;

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    #[serde(default = "ServerConfig::default_url")]
    pub url: String,
    #[serde(default = "ServerConfig::default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            url: Self::default_url(),
            timeout_ms: Self::default_timeout_ms(),
        }
    }
}

impl ServerConfig {
    fn default_url() -> String {
        "http://localhost:1366/".to_string()
    }
    const fn default_timeout_ms() -> u64 {
        300_000
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct GenerationConfig {
    #[serde(default = "GenerationConfig::default_batch_size")]
    pub batch_size: u32,
    #[serde(default = "GenerationConfig::default_count")]
    pub count: u32,
    #[serde(default)]
    pub params: BTreeMap<String, toml::Value>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            batch_size: Self::default_batch_size(),
            count: Self::default_count(),
            params: BTreeMap::new(),
        }
    }
}

impl GenerationConfig {
    const fn default_batch_size() -> u32 {
        1
    }
    const fn default_count() -> u32 {
        20
    }

    /// Parameters as the string map forwarded to the server. String values are
    /// taken verbatim; other scalars use their TOML rendering.
    pub fn params_as_strings(&self) -> BTreeMap<String, String> {
        self.params
            .iter()
            .map(|(k, v)| {
                let s = match v {
                    toml::Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (k.clone(), s)
            })
            .collect()
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct OutputConfig {
    #[serde(default = "OutputConfig::default_path")]
    pub path: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: Self::default_path(),
        }
    }
}

impl OutputConfig {
    fn default_path() -> PathBuf {
        PathBuf::from("artois.html")
    }
}

#[derive(Debug, Deserialize, Default, Clone, PartialEq)]
pub struct ConfigFile {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Values supplied on the command line; `None` leaves the file value in place.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub server_url: Option<String>,
    pub batch_size: Option<u32>,
    pub count: Option<u32>,
    pub output: Option<PathBuf>,
    pub params: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub raw: Option<String>, // original file string (optional)
    pub file: ConfigFile,    // parsed (or default) data
    pub effective_batch_size: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_file(None, ConfigFile::default())
    }
}

/// Config path: `artois.toml` in the working directory, else the platform config dir.
pub fn discover() -> PathBuf {
    let local = PathBuf::from("artois.toml");
    if local.exists() {
        return local;
    }
    if let Some(dir) = dirs::config_dir() {
        return dir.join("artois").join("artois.toml");
    }
    PathBuf::from("artois.toml")
}

pub fn load_from(path: Option<PathBuf>) -> Result<Config> {
    let path = path.unwrap_or_else(discover);
    let Ok(content) = fs::read_to_string(&path) else {
        return Ok(Config::default());
    };
    match toml::from_str::<ConfigFile>(&content) {
        Ok(file) => Ok(Config::from_file(Some(content), file)),
        Err(e) => {
            // Fall back to defaults rather than refusing to start.
            warn!(target: "config", path = %path.display(), error = %e, "config_parse_failed");
            Ok(Config::default())
        }
    }
}

impl Config {
    fn from_file(raw: Option<String>, file: ConfigFile) -> Self {
        let mut cfg = Self {
            raw,
            file,
            effective_batch_size: 1,
        };
        cfg.clamp_batch_size();
        cfg
    }

    /// Clamp the raw batch size into `1..=MAX_BATCH_SIZE`. Returns the effective value.
    pub fn clamp_batch_size(&mut self) -> u32 {
        let raw = self.file.generation.batch_size;
        let clamped = raw.clamp(1, MAX_BATCH_SIZE);
        if clamped != raw {
            info!(
                target: "config",
                raw,
                clamped,
                max = MAX_BATCH_SIZE,
                "batch_size_clamped"
            );
        }
        self.effective_batch_size = clamped;
        clamped
    }

    /// Layer command-line values over the file values.
    pub fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(url) = overrides.server_url {
            self.file.server.url = url;
        }
        if let Some(batch) = overrides.batch_size {
            self.file.generation.batch_size = batch;
        }
        if let Some(count) = overrides.count {
            self.file.generation.count = count;
        }
        if let Some(path) = overrides.output {
            self.file.output.path = path;
        }
        for (k, v) in overrides.params {
            self.file.generation.params.insert(k, toml::Value::String(v));
        }
        self.clamp_batch_size();
    }

    pub fn server_url(&self) -> &str {
        &self.file.server.url
    }

    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.file.server.timeout_ms)
    }
}
