//! Directory-backed repository.

use std::{
    io,
    path::{Path, PathBuf},
    sync::atomic::{AtomicBool, Ordering},
};

use async_trait::async_trait;
use keel_config::Config;
use tracing::{debug, info};

use crate::{Repo, RepoError};

/// Name of the config document inside the repository.
pub const CONFIG_FILE: &str = "config.toml";

/// Name of the repository format version file.
pub const VERSION_FILE: &str = "version";

/// Name of the shared network secret.
pub const SWARM_KEY_FILE: &str = "swarm.key";

/// Repository format version this crate reads and writes.
pub const REPO_VERSION: u32 = 1;

/// A repository rooted at a directory.
#[derive(Debug)]
pub struct FsRepo {
    root: PathBuf,
    open: AtomicBool,
}

impl FsRepo {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            open: AtomicBool::new(false),
        }
    }

    pub fn config_path(&self) -> PathBuf {
        self.root.join(CONFIG_FILE)
    }

    pub fn version_path(&self) -> PathBuf {
        self.root.join(VERSION_FILE)
    }

    pub fn swarm_key_path(&self) -> PathBuf {
        self.root.join(SWARM_KEY_FILE)
    }

    fn ensure_open(&self) -> Result<(), RepoError> {
        if self.is_open() {
            Ok(())
        } else {
            Err(RepoError::Closed {
                path: self.root.clone(),
            })
        }
    }

    async fn check_version(&self) -> Result<(), RepoError> {
        let path = self.version_path();
        let found = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content.trim().to_string(),
            Err(e) if e.kind() == io::ErrorKind::NotFound => String::from("<missing>"),
            Err(e) => return Err(RepoError::io(path, e)),
        };

        if found.parse::<u32>().ok() == Some(REPO_VERSION) {
            Ok(())
        } else {
            Err(RepoError::Version {
                path: self.root.clone(),
                found,
                expected: REPO_VERSION,
            })
        }
    }

    /// Write `content` next to `path` and rename it into place.
    async fn write_atomic(path: &Path, content: &[u8]) -> Result<(), RepoError> {
        let tmp = path.with_extension("tmp");
        tokio::fs::write(&tmp, content)
            .await
            .map_err(|e| RepoError::io(&tmp, e))?;
        tokio::fs::rename(&tmp, path)
            .await
            .map_err(|e| RepoError::io(path, e))
    }
}

#[async_trait]
impl Repo for FsRepo {
    fn path(&self) -> &Path {
        &self.root
    }

    async fn open(&self) -> Result<(), RepoError> {
        if self.is_open() {
            return Ok(());
        }
        if !self.is_initialized().await? {
            return Err(RepoError::NotInitialized {
                path: self.root.clone(),
            });
        }
        self.check_version().await?;

        self.open.store(true, Ordering::Release);
        debug!(path = %self.root.display(), "repository opened");
        Ok(())
    }

    async fn close(&self) -> Result<(), RepoError> {
        if self.open.swap(false, Ordering::AcqRel) {
            debug!(path = %self.root.display(), "repository closed");
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    async fn is_initialized(&self) -> Result<bool, RepoError> {
        let path = self.config_path();
        tokio::fs::try_exists(&path)
            .await
            .map_err(|e| RepoError::io(path, e))
    }

    async fn init(&self, config: &Config) -> Result<(), RepoError> {
        if self.is_initialized().await? {
            return Err(RepoError::AlreadyInitialized {
                path: self.root.clone(),
            });
        }

        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| RepoError::io(&self.root, e))?;

        Self::write_atomic(&self.version_path(), format!("{REPO_VERSION}\n").as_bytes())
            .await?;

        let rendered = config.to_toml_string().map_err(|source| RepoError::Config {
            path: self.config_path(),
            source,
        })?;
        Self::write_atomic(&self.config_path(), rendered.as_bytes()).await?;

        info!(path = %self.root.display(), "initialized repository");
        Ok(())
    }

    async fn config_get(&self) -> Result<Config, RepoError> {
        self.ensure_open()?;
        let path = self.config_path();
        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| RepoError::io(&path, e))?;
        Config::parse(&content).map_err(|source| RepoError::Config { path, source })
    }

    async fn config_replace(&self, config: &Config) -> Result<(), RepoError> {
        self.ensure_open()?;
        let path = self.config_path();
        let rendered = config
            .to_toml_string()
            .map_err(|source| RepoError::Config {
                path: path.clone(),
                source,
            })?;
        Self::write_atomic(&path, rendered.as_bytes()).await?;
        debug!(path = %path.display(), "config replaced");
        Ok(())
    }

    async fn swarm_key(&self) -> Result<Option<Vec<u8>>, RepoError> {
        self.ensure_open()?;
        let path = self.swarm_key_path();
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(RepoError::io(path, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[tokio::test]
    async fn open_uninitialized_reports_not_initialized() {
        let dir = tempfile::tempdir().unwrap();
        let repo = FsRepo::new(dir.path().join("repo"));

        assert_matches!(repo.open().await, Err(RepoError::NotInitialized { .. }));
        assert!(!repo.is_open());
    }

    #[tokio::test]
    async fn init_open_and_replace_config() {
        let dir = tempfile::tempdir().unwrap();
        let repo = FsRepo::new(dir.path().join("repo"));

        repo.init(&Config::defaults()).await.unwrap();
        assert_matches!(
            repo.init(&Config::defaults()).await,
            Err(RepoError::AlreadyInitialized { .. })
        );

        // closed repositories refuse config access
        assert_matches!(repo.config_get().await, Err(RepoError::Closed { .. }));

        repo.open().await.unwrap();
        let mut config = repo.config_get().await.unwrap();
        assert_eq!(config, Config::defaults());

        config.set("Discovery.MDNS.Enabled", false).unwrap();
        repo.config_replace(&config).await.unwrap();
        assert_eq!(
            repo.config_get().await.unwrap().get_bool("Discovery.MDNS.Enabled"),
            Some(false)
        );

        assert_eq!(repo.swarm_key().await.unwrap(), None);
        tokio::fs::write(repo.swarm_key_path(), b"secret").await.unwrap();
        assert_eq!(repo.swarm_key().await.unwrap(), Some(b"secret".to_vec()));

        repo.close().await.unwrap();
        assert!(!repo.is_open());
    }

    #[tokio::test]
    async fn unknown_version_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let repo = FsRepo::new(dir.path());
        repo.init(&Config::defaults()).await.unwrap();
        tokio::fs::write(repo.version_path(), "7\n").await.unwrap();

        assert_matches!(
            repo.open().await,
            Err(RepoError::Version { found, .. }) if found == "7"
        );
    }
}
