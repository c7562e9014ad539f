// Copyright (C) 2024 Daniel Mueller <deso@posteo.net>
// SPDX-License-Identifier: GPL-3.0-or-later

use std::env;
use std::ffi::OsStr;
use std::fs;
use std::io;
use std::io::ErrorKind;
use std::path::Path;
use std::path::PathBuf;

use serde_json::Map;
use serde_json::Value;

use thiserror::Error;

use tracing::debug;
use tracing::warn;


/// The well-known configuration key holding the Polygon API key.
pub const API_KEY: &str = "api_key";


/// The contents of a configuration file: a JSON object of which we only
/// ever interpret the `api_key` entry ourselves. Unknown entries are
/// preserved across writes.
pub type Config = Map<String, Value>;


/// An error as reported by the configuration store.
#[derive(Debug, Error)]
pub enum ConfigError {
  /// The configuration file does not exist.
  #[error("config file {} not found", .0.display())]
  NotFound(PathBuf),
  /// The configuration file is non-empty but does not contain a JSON
  /// object.
  #[error("malformed JSON in config file {}", .0.display())]
  Parse(PathBuf, #[source] serde_json::Error),
  /// An empty value was passed in for storage.
  #[error("refusing to store an empty value for key `{0}`")]
  EmptyValue(String),
  /// The key is already set and overwriting was not requested.
  #[error("key `{}` is already set in {}; not overwriting", .key, .path.display())]
  AlreadyExists {
    key: String,
    path: PathBuf,
  },
  /// The configuration path does not end in `.json`.
  #[error("config path {} must point to a file with .json extension", .0.display())]
  Extension(PathBuf),
  /// A file system level failure.
  #[error("failed to access config file {}", .0.display())]
  Io(PathBuf, #[source] io::Error),
}


/// The default configuration path, `~/.config/trademin/polygon.json`.
///
/// Only a default: every function in here accepts the path to work
/// with explicitly.
pub fn default_path() -> PathBuf {
  env::var_os("HOME")
    .map(PathBuf::from)
    .unwrap_or_else(|| PathBuf::from("."))
    .join(".config")
    .join("trademin")
    .join("polygon.json")
}


/// Load the configuration at the given path.
///
/// A missing file is an error, but an existing empty file is simply an
/// empty configuration.
pub fn load(path: &Path) -> Result<Config, ConfigError> {
  let contents = fs::read_to_string(path).map_err(|err| {
    if err.kind() == ErrorKind::NotFound {
      ConfigError::NotFound(path.to_path_buf())
    } else {
      ConfigError::Io(path.to_path_buf(), err)
    }
  })?;

  if contents.is_empty() {
    debug!("config file {} is empty", path.display());
    return Ok(Config::new())
  }

  serde_json::from_str::<Config>(&contents)
    .map_err(|err| ConfigError::Parse(path.to_path_buf(), err))
}


/// Retrieve the API key configured at the given path, if any.
pub fn api_key(path: &Path) -> Result<Option<String>, ConfigError> {
  let config = load(path)?;
  match config.get(API_KEY).and_then(Value::as_str) {
    Some(key) if !key.is_empty() => Ok(Some(key.to_string())),
    _ => {
      warn!("`{}` is undefined in {}", API_KEY, path.display());
      Ok(None)
    },
  }
}


/// Check whether a configuration entry holds an actual value.
fn is_set(value: &Value) -> bool {
  match value {
    Value::Null => false,
    Value::String(string) => !string.is_empty(),
    _ => true,
  }
}


/// Store `value` under `key` in the configuration at the given path,
/// preserving all other entries already present.
///
/// An existing non-empty value for `key` is only replaced when
/// `overwrite` is set. Parent directories are created as necessary and
/// the file itself is replaced in a single step.
pub fn save(path: &Path, key: &str, value: &str, overwrite: bool) -> Result<(), ConfigError> {
  if value.is_empty() {
    return Err(ConfigError::EmptyValue(key.to_string()))
  }

  if path.extension().and_then(OsStr::to_str) != Some("json") {
    return Err(ConfigError::Extension(path.to_path_buf()))
  }

  let mut config = match load(path) {
    Ok(config) => config,
    Err(ConfigError::NotFound(..)) => Config::new(),
    // Most notably a parse error: never clobber a file we cannot
    // read back.
    Err(err) => return Err(err),
  };

  if !overwrite && config.get(key).map(is_set).unwrap_or(false) {
    return Err(ConfigError::AlreadyExists {
      key: key.to_string(),
      path: path.to_path_buf(),
    })
  }

  let _ = config.insert(key.to_string(), Value::String(value.to_string()));
  write_replacing(path, &config)
}


/// Serialize the configuration next to its destination and move it in
/// place, so that the destination either keeps its previous contents or
/// carries the new ones in their entirety.
fn write_replacing(path: &Path, config: &Config) -> Result<(), ConfigError> {
  if let Some(dir) = path.parent() {
    if !dir.as_os_str().is_empty() {
      fs::create_dir_all(dir).map_err(|err| ConfigError::Io(dir.to_path_buf(), err))?;
    }
  }

  let contents = serde_json::to_vec(config)
    .map_err(|err| ConfigError::Parse(path.to_path_buf(), err))?;

  let temporary = path.with_extension("json.tmp");
  fs::write(&temporary, contents).map_err(|err| ConfigError::Io(temporary.clone(), err))?;
  fs::rename(&temporary, path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

  debug!("wrote config file {}", path.display());
  Ok(())
}
