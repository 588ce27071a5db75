// Configuration loading and parsing (swami.toml, swamis.toml).

use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use swami_core::{ConfigurationError, Swami, SwamiParams};
use thiserror::Error;
use tracing::{debug, info};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("invalid configuration for swami `{name}`: {source}")]
    Swami {
        name: String,
        source: ConfigurationError,
    },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: PathBuf,
    pub data_paths: DataPaths,
    /// Every configured swami, validated and ordered by name.
    pub swamis: Vec<Swami>,
}

impl Config {
    pub fn swami(&self, name: &str) -> Option<&Swami> {
        self.swamis.iter().find(|s| s.name() == name)
    }
}

// ---------------------------------------------------------------------------
// swami.toml structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
struct SettingsFile {
    #[serde(default)]
    database: DatabaseSection,
    data_paths: DataPaths,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct DatabaseSection {
    path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DataPaths {
    pub teams: String,
    pub games: String,
}

// ---------------------------------------------------------------------------
// swamis.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for swamis.toml: class defaults plus named
/// instances, each of which may override any class key.
///
/// Instances stay as raw tables until `build_swamis` splits off `class`; the
/// remaining keys then go through the same strict `SwamiParams` parsing as a
/// class, so a misspelled override is an error rather than a no-op.
#[derive(Debug, Clone, Default, Deserialize)]
struct SwamisFile {
    #[serde(default)]
    classes: BTreeMap<String, SwamiParams>,
    #[serde(default)]
    swamis: BTreeMap<String, toml::Table>,
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from `config/swami.toml` and
/// `config/swamis.toml`, both relative to the given `base_dir`.
///
/// Does not copy defaults; `load_config()` does.
pub(crate) fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let config_dir = base_dir.join("config");

    // --- swami.toml (required) ---
    let settings_path = config_dir.join("swami.toml");
    let settings: SettingsFile = parse_file(&settings_path)?;

    // --- swamis.toml (required) ---
    let swamis_path = config_dir.join("swamis.toml");
    let swamis_file: SwamisFile = parse_file(&swamis_path)?;

    let db_path = match settings.database.path {
        Some(path) => PathBuf::from(path),
        None => default_db_path(),
    };

    let config = Config {
        db_path,
        data_paths: settings.data_paths,
        swamis: build_swamis(&swamis_file)?,
    };

    validate(&config)?;

    Ok(config)
}

/// Merge each instance over its class and build it. Any failure names the
/// offending swami.
fn build_swamis(file: &SwamisFile) -> Result<Vec<Swami>, ConfigError> {
    let mut swamis = Vec::with_capacity(file.swamis.len());
    for (name, entry) in &file.swamis {
        let mut overrides = entry.clone();
        let class_name = match overrides.remove("class") {
            Some(toml::Value::String(class_name)) => class_name,
            Some(_) => {
                return Err(ConfigError::ValidationError {
                    field: format!("swamis.{name}.class"),
                    message: "must be a string".into(),
                })
            }
            None => {
                return Err(ConfigError::ValidationError {
                    field: format!("swamis.{name}.class"),
                    message: "missing".into(),
                })
            }
        };
        let class = file
            .classes
            .get(&class_name)
            .ok_or_else(|| ConfigError::ValidationError {
                field: format!("swamis.{name}.class"),
                message: format!("unknown swami class `{class_name}`"),
            })?;
        let overrides: SwamiParams = toml::Value::Table(overrides).try_into().map_err(
            |e: toml::de::Error| ConfigError::ValidationError {
                field: format!("swamis.{name}"),
                message: e.message().to_string(),
            },
        )?;
        let params = overrides.merged_over(class);
        let swami = Swami::build(name, &params).map_err(|source| ConfigError::Swami {
            name: name.clone(),
            source,
        })?;
        swamis.push(swami);
    }
    Ok(swamis)
}

/// Seed `config/` from `defaults/` on first run. Files already in `config/`
/// are never overwritten and `*.example` files are never copied. Returns the
/// files written.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let defaults_dir = base_dir.join("defaults");
    let config_dir = base_dir.join("config");

    if !defaults_dir.is_dir() {
        if config_dir.is_dir() {
            debug!("no defaults/ in {}; using config/ as is", base_dir.display());
            return Ok(Vec::new());
        }
        return Err(defaults_error(format!(
            "neither defaults/ nor config/ directory found in {}; \
             run from the project root or ensure defaults/ is present",
            base_dir.display()
        )));
    }

    fs::create_dir_all(&config_dir)
        .map_err(|e| defaults_error(format!("failed to create {}: {e}", config_dir.display())))?;

    let mut sources = fs::read_dir(&defaults_dir)
        .and_then(|entries| {
            entries
                .map(|entry| entry.map(|e| e.path()))
                .collect::<io::Result<Vec<_>>>()
        })
        .map_err(|e| defaults_error(format!("failed to read {}: {e}", defaults_dir.display())))?;
    sources.retain(|path| path.is_file() && !path.extension().is_some_and(|ext| ext == "example"));
    sources.sort();

    let mut copied = Vec::new();
    for source in sources {
        let Some(file_name) = source.file_name() else {
            continue;
        };
        let target = config_dir.join(file_name);
        if seed_file(&source, &target)? {
            info!("seeded {} from {}", target.display(), source.display());
            copied.push(target);
        }
    }
    Ok(copied)
}

/// Copy `source` to `target` unless `target` already exists. Returns whether
/// anything was written.
fn seed_file(source: &Path, target: &Path) -> Result<bool, ConfigError> {
    let mut dest = match fs::OpenOptions::new().write(true).create_new(true).open(target) {
        Ok(dest) => dest,
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => return Ok(false),
        Err(e) => {
            return Err(defaults_error(format!("failed to create {}: {e}", target.display())))
        }
    };
    let mut src = fs::File::open(source)
        .map_err(|e| defaults_error(format!("failed to read {}: {e}", source.display())))?;
    io::copy(&mut src, &mut dest)
        .map_err(|e| defaults_error(format!("failed to write {}: {e}", target.display())))?;
    Ok(true)
}

fn defaults_error(message: String) -> ConfigError {
    ConfigError::DefaultsCopyError { message }
}

/// Load config relative to the current working directory, copying defaults
/// first.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    ensure_config_files(&cwd)?;
    load_config_from(&cwd)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

fn parse_file<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let text = read_file(path)?;
    toml::from_str(&text).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        source: e,
    })
}

/// `swami.db` in the platform data directory, or the working directory when
/// none can be determined.
fn default_db_path() -> PathBuf {
    directories::ProjectDirs::from("", "", "swami")
        .map(|dirs| dirs.data_dir().join("swami.db"))
        .unwrap_or_else(|| PathBuf::from("swami.db"))
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    let paths: &[(&str, &str)] = &[
        ("data_paths.teams", &config.data_paths.teams),
        ("data_paths.games", &config.data_paths.games),
    ];
    for (name, val) in paths {
        if val.trim().is_empty() {
            return Err(ConfigError::ValidationError {
                field: name.to_string(),
                message: "must not be empty".into(),
            });
        }
    }

    if config.db_path.as_os_str().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "database.path".into(),
            message: "must not be empty".into(),
        });
    }

    if config.swamis.is_empty() {
        return Err(ConfigError::ValidationError {
            field: "swamis".into(),
            message: "at least one swami must be configured".into(),
        });
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
