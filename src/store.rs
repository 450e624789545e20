//! Credentials file: a TOML table named after the tool holding the client
//! credentials and the access token obtained for them.

use std::io;
use std::path::{Path, PathBuf};

use crate::core::models::Credentials;

use tracing::{event, Level};

pub const SECTION: &str = "simple_oauthclient";
pub const DEFAULT_PATH: &str = "./simple_oauthclient.cfg";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file {0} does not exist")]
    NotFound(PathBuf),
    #[error("cannot access config file {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("malformed config file {path}: {reason}")]
    Malformed { path: PathBuf, reason: String },
}

#[derive(Debug, Clone)]
pub struct ConfigFile {
    path: PathBuf,
}

impl ConfigFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    #[tracing::instrument(skip(self), fields(path = %self.path.display()))]
    pub fn read(&self) -> Result<Credentials, ConfigError> {
        let table = self.load()?.ok_or_else(|| ConfigError::NotFound(self.path.clone()))?;

        let section = table
            .get(SECTION)
            .cloned()
            .ok_or_else(|| self.malformed(format!("missing section [{}]", SECTION)))?;

        let credentials = section
            .try_into::<Credentials>()
            .map_err(|e| self.malformed(e.to_string()))?;

        event!(Level::DEBUG, client_id = %credentials.client_id, "Read credentials");
        Ok(credentials)
    }

    /// Replaces the tool's section, keeping whatever else the file holds.
    #[tracing::instrument(skip_all, fields(path = %self.path.display()))]
    pub fn write(&self, credentials: &Credentials) -> Result<(), ConfigError> {
        let mut table = self.load()?.unwrap_or_default();

        let section = toml::Value::try_from(credentials).map_err(|e| self.malformed(e.to_string()))?;
        table.insert(SECTION.to_string(), section);

        let contents = toml::to_string(&table).map_err(|e| self.malformed(e.to_string()))?;
        std::fs::write(&self.path, contents).map_err(|source| ConfigError::Io {
            path: self.path.clone(),
            source,
        })?;

        event!(Level::DEBUG, "Wrote credentials");
        Ok(())
    }

    fn load(&self) -> Result<Option<toml::Table>, ConfigError> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(ConfigError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        toml::from_str(&contents)
            .map(Some)
            .map_err(|e| self.malformed(e.to_string()))
    }

    fn malformed(&self, reason: String) -> ConfigError {
        ConfigError::Malformed {
            path: self.path.clone(),
            reason,
        }
    }
}
