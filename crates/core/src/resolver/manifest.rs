use std::path::Path;

use async_trait::async_trait;
use tokio::fs;
use tracing::debug;
use url::Url;

use crate::{
    error::{Result, TubefetchError},
    resolver::MetadataResolver,
    types::ResolvedMedia,
};

/// Reads a pre-built JSON manifest (the [`ResolvedMedia`] shape) from a local
/// path or an http(s) URL.
pub struct ManifestResolver {
    client: reqwest::Client,
}

impl Default for ManifestResolver {
    fn default() -> Self {
        Self::new(reqwest::Client::new())
    }
}

impl ManifestResolver {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn fetch(&self, url: Url) -> Result<Vec<u8>> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        Ok(response.bytes().await?.to_vec())
    }
}

#[async_trait]
impl MetadataResolver for ManifestResolver {
    fn name(&self) -> &'static str {
        "manifest"
    }

    async fn resolve(&self, input: &str) -> Result<ResolvedMedia> {
        let bytes = match Url::parse(input) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {
                debug!("fetching manifest {}", url);
                self.fetch(url).await?
            }
            _ => {
                debug!("reading manifest {}", input);
                fs::read(Path::new(input))
                    .await
                    .map_err(|e| TubefetchError::ResolveFailed {
                        input: input.to_string(),
                        reason: e.to_string(),
                    })?
            }
        };

        Ok(serde_json::from_slice(&bytes)?)
    }
}
