use std::{fmt, path::PathBuf, str::FromStr};

use serde::{Deserialize, Serialize};
use url::Url;

/// Vertical pixel count of a video track, displayed as `720p`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Resolution(pub u32);

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}p", self.0)
    }
}

impl FromStr for Resolution {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let digits = s
            .strip_suffix('p')
            .or_else(|| s.strip_suffix('P'))
            .unwrap_or(s);
        digits.parse().map(Resolution)
    }
}

/// Which tracks a variant carries. There is no "neither" case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    VideoOnly,
    AudioOnly,
    Progressive,
}

impl MediaKind {
    pub fn from_tracks(has_video: bool, has_audio: bool) -> Option<Self> {
        match (has_video, has_audio) {
            (true, true) => Some(MediaKind::Progressive),
            (true, false) => Some(MediaKind::VideoOnly),
            (false, true) => Some(MediaKind::AudioOnly),
            (false, false) => None,
        }
    }

    pub fn has_video(self) -> bool {
        matches!(self, MediaKind::VideoOnly | MediaKind::Progressive)
    }

    pub fn has_audio(self) -> bool {
        matches!(self, MediaKind::AudioOnly | MediaKind::Progressive)
    }

    pub fn label(self) -> &'static str {
        match self {
            MediaKind::VideoOnly => "video only",
            MediaKind::AudioOnly => "audio only",
            MediaKind::Progressive => "video+audio",
        }
    }
}

/// Where the bytes of a variant live. Only connectors look inside.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceLocator {
    Http {
        url: Url,
        /// Extra request headers the upstream requires (user agent, referer...).
        #[serde(default)]
        headers: Vec<(String, String)>,
    },
    File { path: PathBuf },
}

impl SourceLocator {
    pub fn http(url: Url) -> Self {
        SourceLocator::Http {
            url,
            headers: Vec::new(),
        }
    }

    pub fn file(path: impl Into<PathBuf>) -> Self {
        SourceLocator::File { path: path.into() }
    }
}

impl fmt::Display for SourceLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceLocator::Http { url, .. } => write!(f, "{url}"),
            SourceLocator::File { path } => write!(f, "{}", path.display()),
        }
    }
}

/// Variant descriptor as emitted by a resolver, before validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawVariant {
    pub id: String,
    pub container: String,
    #[serde(default)]
    pub codecs: Vec<String>,
    pub has_video: bool,
    pub has_audio: bool,
    #[serde(default)]
    pub resolution: Option<Resolution>,
    /// Audio bitrate in kbps.
    #[serde(default)]
    pub bitrate: Option<f64>,
    #[serde(default)]
    pub size: Option<u64>,
    pub locator: SourceLocator,
}

/// One validated, downloadable rendition of a media item.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StreamVariant {
    pub id: String,
    pub container: String,
    pub codecs: Vec<String>,
    pub kind: MediaKind,
    pub resolution: Option<Resolution>,
    pub bitrate: Option<f64>,
    /// Declared byte size; `None` when upstream does not know it.
    pub size: Option<u64>,
    pub locator: SourceLocator,
}

impl StreamVariant {
    pub fn has_video(&self) -> bool {
        self.kind.has_video()
    }

    pub fn has_audio(&self) -> bool {
        self.kind.has_audio()
    }

    pub fn is_progressive(&self) -> bool {
        self.kind == MediaKind::Progressive
    }

    pub fn is_audio_only(&self) -> bool {
        self.kind == MediaKind::AudioOnly
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaInfo {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub length_seconds: Option<f64>,
}

/// Everything a resolver knows about one media item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedMedia {
    pub info: MediaInfo,
    pub variants: Vec<RawVariant>,
}
