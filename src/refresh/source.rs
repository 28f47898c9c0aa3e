//! Where snapshots come from

use {
    crate::{
        error::{HeraldError, Result},
        models::CharacterSnapshot,
    },
    async_trait::async_trait,
    std::{path::PathBuf, time::Duration},
};

/// Produces one full character snapshot per call
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn fetch(&self) -> Result<CharacterSnapshot>;

    /// Human readable origin, used in logs
    fn describe(&self) -> String;
}

/// The herald dump endpoint
pub struct HttpDumpSource {
    client: reqwest::Client,
    url: String,
}

impl HttpDumpSource {
    /// `timeout` bounds the whole request, body included
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| HeraldError::Fetch(format!("failed to build http client: {}", e)))?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl SnapshotSource for HttpDumpSource {
    async fn fetch(&self) -> Result<CharacterSnapshot> {
        let response = self.client.get(&self.url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(HeraldError::Fetch(format!("{} returned {}", self.url, status)));
        }

        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    fn describe(&self) -> String {
        self.url.clone()
    }
}

/// A dump saved to disk
pub struct FileDumpSource {
    path: PathBuf,
}

impl FileDumpSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl SnapshotSource for FileDumpSource {
    async fn fetch(&self) -> Result<CharacterSnapshot> {
        let body = tokio::fs::read(&self.path)
            .await
            .map_err(|e| HeraldError::Fetch(format!("{}: {}", self.path.display(), e)))?;

        serde_json::from_slice(&body)
            .map_err(|e| HeraldError::Decode(format!("{}: {}", self.path.display(), e)))
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}
