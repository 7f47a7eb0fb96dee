use std::{io, io::SeekFrom, pin::Pin, time::Duration};

use async_trait::async_trait;
use futures::TryStreamExt;
use reqwest::{StatusCode, header};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncSeekExt};
use tokio_util::io::StreamReader;
use tracing::{debug, trace};
use url::Url;

use crate::{config::NetworkConfig, types::SourceLocator};

pub type BoxedReader = Pin<Box<dyn AsyncRead + Send>>;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("source does not support range requests")]
    RangeNotSupported,

    #[error("unexpected HTTP status {0}")]
    Status(u16),

    #[error("unsupported locator: {0}")]
    UnsupportedLocator(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// An opened source positioned at the requested offset.
pub struct SourceStream {
    pub reader: BoxedReader,
    /// Bytes the source announced for the remainder, if it said.
    pub remaining: Option<u64>,
}

impl SourceStream {
    pub fn empty() -> Self {
        Self {
            reader: Box::pin(tokio::io::empty()),
            remaining: Some(0),
        }
    }
}

/// Opens a variant's locator for reading, starting at `offset`.
///
/// An implementation that cannot start anywhere but zero must return
/// [`SourceError::RangeNotSupported`] for a non-zero offset instead of
/// silently restarting from the beginning.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn open(&self, locator: &SourceLocator, offset: u64) -> Result<SourceStream, SourceError>;
}

pub struct HttpConnector {
    client: reqwest::Client,
}

impl HttpConnector {
    pub fn new(network: &NetworkConfig) -> Result<Self, SourceError> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = network.connect_timeout {
            builder = builder.connect_timeout(Duration::from_secs(secs));
        }
        if let Some(proxy) = &network.proxy {
            builder = builder.proxy(reqwest::Proxy::all(proxy.as_str())?);
        }
        Ok(Self {
            client: builder.build()?,
        })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn get(
        &self,
        url: &Url,
        headers: &[(String, String)],
        offset: u64,
    ) -> Result<SourceStream, SourceError> {
        trace!("get: {} from offset {}", url, offset);
        let mut request = self.client.get(url.clone());
        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }
        if offset > 0 {
            request = request.header(header::RANGE, format!("bytes={offset}-"));
        }

        let response = request.send().await?;
        let status = response.status();

        if offset > 0 {
            match status {
                StatusCode::PARTIAL_CONTENT => {
                    let start = response
                        .headers()
                        .get(header::CONTENT_RANGE)
                        .and_then(|v| v.to_str().ok())
                        .and_then(content_range_start);
                    if start != Some(offset) {
                        debug!("server answered range {:?} for offset {}", start, offset);
                        return Err(SourceError::RangeNotSupported);
                    }
                }
                StatusCode::RANGE_NOT_SATISFIABLE => {
                    debug!("nothing left past offset {} for {}", offset, url);
                    return Ok(SourceStream::empty());
                }
                s if s.is_success() => return Err(SourceError::RangeNotSupported),
                s => return Err(SourceError::Status(s.as_u16())),
            }
        } else if !status.is_success() {
            return Err(SourceError::Status(status.as_u16()));
        }

        let remaining = response.content_length();
        let body = response.bytes_stream().map_err(io::Error::other);

        Ok(SourceStream {
            reader: Box::pin(StreamReader::new(body)),
            remaining,
        })
    }
}

#[async_trait]
impl Connector for HttpConnector {
    async fn open(&self, locator: &SourceLocator, offset: u64) -> Result<SourceStream, SourceError> {
        match locator {
            SourceLocator::Http { url, headers } => self.get(url, headers, offset).await,
            other => Err(SourceError::UnsupportedLocator(other.to_string())),
        }
    }
}

/// Reads local files; seeking makes every offset resumable.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileConnector;

#[async_trait]
impl Connector for FileConnector {
    async fn open(&self, locator: &SourceLocator, offset: u64) -> Result<SourceStream, SourceError> {
        let SourceLocator::File { path } = locator else {
            return Err(SourceError::UnsupportedLocator(locator.to_string()));
        };

        let mut file = tokio::fs::File::open(path).await?;
        let len = file.metadata().await?.len();
        if offset > 0 {
            file.seek(SeekFrom::Start(offset)).await?;
        }

        Ok(SourceStream {
            reader: Box::pin(file),
            remaining: Some(len.saturating_sub(offset)),
        })
    }
}

/// Dispatches to the HTTP or file connector by locator kind.
pub struct StandardConnector {
    http: HttpConnector,
    file: FileConnector,
}

impl StandardConnector {
    pub fn new(network: &NetworkConfig) -> Result<Self, SourceError> {
        Ok(Self {
            http: HttpConnector::new(network)?,
            file: FileConnector,
        })
    }
}

#[async_trait]
impl Connector for StandardConnector {
    async fn open(&self, locator: &SourceLocator, offset: u64) -> Result<SourceStream, SourceError> {
        match locator {
            SourceLocator::Http { .. } => self.http.open(locator, offset).await,
            SourceLocator::File { .. } => self.file.open(locator, offset).await,
        }
    }
}

/// First byte position of a `Content-Range: bytes <start>-<end>/<total>` value.
fn content_range_start(value: &str) -> Option<u64> {
    let range = value.trim().strip_prefix("bytes")?.trim_start();
    let (start, _) = range.split_once('-')?;
    start.trim().parse().ok()
}
