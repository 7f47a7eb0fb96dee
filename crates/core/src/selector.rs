use std::{cmp::Ordering, fmt, str::FromStr};

use crate::{
    catalog::StreamCatalog,
    error::{Result, TubefetchError},
    types::{Resolution, StreamVariant},
};

/// Rule for picking one variant out of a catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionPolicy {
    AudioOnly,
    HighestProgressive,
    ExactResolution(Resolution),
}

impl fmt::Display for SelectionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectionPolicy::AudioOnly => write!(f, "audio"),
            SelectionPolicy::HighestProgressive => write!(f, "highest"),
            SelectionPolicy::ExactResolution(res) => write!(f, "{res}"),
        }
    }
}

impl FromStr for SelectionPolicy {
    type Err = TubefetchError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "audio" => Ok(SelectionPolicy::AudioOnly),
            "highest" | "best" => Ok(SelectionPolicy::HighestProgressive),
            other => other
                .parse::<Resolution>()
                .ok()
                .filter(|res| res.0 > 0)
                .map(SelectionPolicy::ExactResolution)
                .ok_or_else(|| TubefetchError::UnknownPolicy(s.to_string())),
        }
    }
}

/// Pick the variant `policy` asks for. Never falls back to another policy.
pub fn select<'a>(catalog: &'a StreamCatalog, policy: &SelectionPolicy) -> Result<&'a StreamVariant> {
    let chosen = match policy {
        SelectionPolicy::AudioOnly => first_max_by(catalog.filter(|v| v.is_audio_only()), |a, b| {
            // None sorts below any known bitrate.
            match (a.bitrate, b.bitrate) {
                (Some(x), Some(y)) => x.total_cmp(&y),
                (x, y) => x.is_some().cmp(&y.is_some()),
            }
        }),
        SelectionPolicy::HighestProgressive => {
            first_max_by(catalog.filter(|v| v.is_progressive()), |a, b| {
                a.resolution.cmp(&b.resolution)
            })
        }
        SelectionPolicy::ExactResolution(wanted) => {
            let wanted = *wanted;
            catalog
                .filter(move |v| v.is_progressive() && v.resolution == Some(wanted))
                .next()
        }
    };

    chosen.ok_or(TubefetchError::NoMatchingStream { policy: *policy })
}

/// Like `Iterator::max_by`, but keeps the earliest element among equals.
fn first_max_by<'a, I, F>(candidates: I, mut compare: F) -> Option<&'a StreamVariant>
where
    I: Iterator<Item = &'a StreamVariant>,
    F: FnMut(&StreamVariant, &StreamVariant) -> Ordering,
{
    candidates.reduce(|best, next| {
        if compare(next, best) == Ordering::Greater {
            next
        } else {
            best
        }
    })
}
