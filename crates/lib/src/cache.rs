//! # Response Cache
//!
//! An [`AiProvider`] decorator that stores completion responses on disk, keyed by the
//! MD5 of the prompt pair. Re-running a form against the same inputs then costs no
//! completion calls, which keeps iterating on reconciliation cheap.

use crate::{errors::PromptError, providers::ai::AiProvider};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Clone, Debug)]
pub struct CachedProvider {
    inner: Box<dyn AiProvider>,
    dir: PathBuf,
}

impl CachedProvider {
    pub fn new(inner: Box<dyn AiProvider>, dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        info!("Caching completion responses in '{}'", dir.display());
        Self { inner, dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The cache file for a prompt pair.
    pub fn entry_path(&self, system_prompt: &str, user_prompt: &str) -> PathBuf {
        let key = format!("{system_prompt}\0{user_prompt}");
        self.dir
            .join(format!("{:x}.txt", md5::compute(key.as_bytes())))
    }
}

#[async_trait]
impl AiProvider for CachedProvider {
    async fn generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<String, PromptError> {
        let path = self.entry_path(system_prompt, user_prompt);

        if tokio::fs::try_exists(&path).await? {
            debug!("Cache hit: {}", path.display());
            return Ok(tokio::fs::read_to_string(&path).await?);
        }

        let response = self.inner.generate(system_prompt, user_prompt).await?;

        // Empty replies are retried by the completion client and must not be pinned.
        if !response.trim().is_empty() {
            tokio::fs::create_dir_all(&self.dir).await?;
            tokio::fs::write(&path, &response).await?;
            debug!("Cached response: {}", path.display());
        }

        Ok(response)
    }
}
