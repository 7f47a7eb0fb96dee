//! Metadata resolvers: turn a source identifier into media info plus raw
//! variant descriptors for [`StreamCatalog::build`](crate::StreamCatalog::build).

mod manifest;
mod ytdlp;

pub use manifest::ManifestResolver;
pub use ytdlp::YtDlpResolver;

use async_trait::async_trait;

use crate::{error::Result, types::ResolvedMedia};

#[async_trait]
pub trait MetadataResolver: Send + Sync {
    /// Name of the resolver (for logging).
    fn name(&self) -> &'static str;

    async fn resolve(&self, input: &str) -> Result<ResolvedMedia>;
}
