use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;
use tracing::{debug, trace};
use url::Url;

use crate::{
    error::{Result, TubefetchError},
    resolver::MetadataResolver,
    types::{MediaInfo, RawVariant, ResolvedMedia, Resolution, SourceLocator},
};

/// Protocols a plain (ranged) GET can download in one piece.
const DIRECT_PROTOCOLS: &[&str] = &["https", "http"];

/// Resolves metadata by running `yt-dlp -J`.
pub struct YtDlpResolver {
    program: String,
    proxy: Option<String>,
}

impl Default for YtDlpResolver {
    fn default() -> Self {
        Self {
            program: "yt-dlp".to_string(),
            proxy: None,
        }
    }
}

impl YtDlpResolver {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            proxy: None,
        }
    }

    pub fn with_proxy(mut self, proxy: Option<String>) -> Self {
        self.proxy = proxy;
        self
    }
}

#[async_trait]
impl MetadataResolver for YtDlpResolver {
    fn name(&self) -> &'static str {
        "yt-dlp"
    }

    async fn resolve(&self, input: &str) -> Result<ResolvedMedia> {
        let mut command = Command::new(&self.program);
        command
            .arg("-J")
            .arg("--no-playlist")
            .arg("--no-warnings")
            .arg("--extractor-args")
            .arg("youtube:player_client=android,web");
        if let Some(proxy) = &self.proxy {
            command.arg("--proxy").arg(proxy);
        }
        command.arg("--").arg(input);

        debug!("running {} for {}", self.program, input);
        let output = command.output().await.map_err(|e| TubefetchError::ResolveFailed {
            input: input.to_string(),
            reason: format!("failed to run {}: {e}", self.program),
        })?;

        if !output.status.success() {
            return Err(TubefetchError::ResolveFailed {
                input: input.to_string(),
                reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        parse_info_json(&output.stdout)
    }
}

#[derive(Deserialize)]
struct InfoJson {
    id: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    uploader: Option<String>,
    #[serde(default)]
    channel: Option<String>,
    #[serde(default)]
    duration: Option<f64>,
    #[serde(default)]
    formats: Vec<FormatJson>,
}

#[derive(Deserialize)]
struct FormatJson {
    format_id: String,
    #[serde(default)]
    ext: Option<String>,
    #[serde(default)]
    vcodec: Option<String>,
    #[serde(default)]
    acodec: Option<String>,
    #[serde(default)]
    height: Option<u32>,
    #[serde(default)]
    abr: Option<f64>,
    #[serde(default)]
    tbr: Option<f64>,
    #[serde(default)]
    filesize: Option<u64>,
    #[serde(default)]
    filesize_approx: Option<u64>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    protocol: Option<String>,
    #[serde(default)]
    http_headers: BTreeMap<String, String>,
}

/// A real codec name, or `None` for yt-dlp's "none"/empty markers.
fn codec(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty() && *v != "none")
}

impl FormatJson {
    fn into_raw(self) -> Option<RawVariant> {
        let protocol = self.protocol.as_deref().unwrap_or("https");
        if !DIRECT_PROTOCOLS.contains(&protocol) {
            trace!("skipping format {} ({})", self.format_id, protocol);
            return None;
        }

        let url = Url::parse(self.url.as_deref()?).ok()?;
        let vcodec = codec(&self.vcodec).map(str::to_owned);
        let acodec = codec(&self.acodec).map(str::to_owned);
        let (has_video, has_audio) = (vcodec.is_some(), acodec.is_some());
        if !has_video && !has_audio {
            trace!("skipping format {} without tracks", self.format_id);
            return None;
        }

        let bitrate = if has_audio {
            self.abr
                .filter(|b| *b > 0.0)
                .or(if has_video { None } else { self.tbr })
        } else {
            None
        };

        Some(RawVariant {
            id: self.format_id,
            container: self.ext.unwrap_or_else(|| "bin".to_string()),
            codecs: vcodec.into_iter().chain(acodec).collect(),
            has_video,
            has_audio,
            resolution: if has_video { self.height.map(Resolution) } else { None },
            bitrate,
            // 0 is how upstream says "unknown".
            size: self
                .filesize
                .filter(|s| *s > 0)
                .or(self.filesize_approx.filter(|s| *s > 0)),
            locator: SourceLocator::Http {
                url,
                headers: self.http_headers.into_iter().collect(),
            },
        })
    }
}

/// Map `yt-dlp -J` output to resolved media.
pub(crate) fn parse_info_json(bytes: &[u8]) -> Result<ResolvedMedia> {
    let info: InfoJson = serde_json::from_slice(bytes)?;

    let author = info.uploader.or(info.channel).unwrap_or_default();
    let title = info.title.unwrap_or_else(|| info.id.clone());
    let variants: Vec<RawVariant> = info
        .formats
        .into_iter()
        .filter_map(FormatJson::into_raw)
        .collect();

    debug!("resolved {} with {} downloadable formats", info.id, variants.len());

    Ok(ResolvedMedia {
        info: MediaInfo {
            id: info.id,
            title,
            author,
            length_seconds: info.duration,
        },
        variants,
    })
}
