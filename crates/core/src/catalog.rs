use std::collections::HashSet;

use crate::{
    error::{Result, TubefetchError},
    types::{MediaKind, RawVariant, StreamVariant},
};

/// The variants discovered for one media item, in discovery order.
#[derive(Debug, Clone, Default)]
pub struct StreamCatalog {
    variants: Vec<StreamVariant>,
}

impl StreamCatalog {
    /// Validate raw descriptors. Fails on the first variant that carries no
    /// track, has an empty id, or repeats an earlier id.
    pub fn build(raw_variants: impl IntoIterator<Item = RawVariant>) -> Result<Self> {
        let mut seen = HashSet::new();
        let mut variants = Vec::new();

        for raw in raw_variants {
            if raw.id.trim().is_empty() {
                return Err(TubefetchError::InvalidVariant {
                    id: raw.id,
                    reason: "empty identifier".to_string(),
                });
            }

            let Some(kind) = MediaKind::from_tracks(raw.has_video, raw.has_audio) else {
                return Err(TubefetchError::InvalidVariant {
                    id: raw.id,
                    reason: "carries neither video nor audio".to_string(),
                });
            };

            if !seen.insert(raw.id.clone()) {
                return Err(TubefetchError::InvalidVariant {
                    id: raw.id,
                    reason: "duplicate identifier".to_string(),
                });
            }

            variants.push(StreamVariant {
                id: raw.id,
                container: raw.container,
                codecs: raw.codecs,
                kind,
                resolution: raw.resolution,
                bitrate: raw.bitrate,
                size: raw.size,
                locator: raw.locator,
            });
        }

        Ok(Self { variants })
    }

    pub fn all(&self) -> std::slice::Iter<'_, StreamVariant> {
        self.variants.iter()
    }

    /// Lazily yields matching variants in catalog order. The iterator is
    /// `Clone`, so it can be restarted.
    pub fn filter<'a, P>(&'a self, predicate: P) -> impl Iterator<Item = &'a StreamVariant> + Clone + 'a
    where
        P: Fn(&StreamVariant) -> bool + Clone + 'a,
    {
        self.variants.iter().filter(move |v| predicate(v))
    }

    pub fn get(&self, id: &str) -> Option<&StreamVariant> {
        self.variants.iter().find(|v| v.id == id)
    }

    pub fn len(&self) -> usize {
        self.variants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }
}

impl<'a> IntoIterator for &'a StreamCatalog {
    type Item = &'a StreamVariant;
    type IntoIter = std::slice::Iter<'a, StreamVariant>;

    fn into_iter(self) -> Self::IntoIter {
        self.all()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::types::{Resolution, SourceLocator};

    pub(crate) fn raw(id: &str, has_video: bool, has_audio: bool) -> RawVariant {
        RawVariant {
            id: id.to_string(),
            container: "mp4".to_string(),
            codecs: Vec::new(),
            has_video,
            has_audio,
            resolution: None,
            bitrate: None,
            size: None,
            locator: SourceLocator::file(format!("/tmp/{id}")),
        }
    }

    pub(crate) fn progressive(id: &str, height: u32) -> RawVariant {
        RawVariant {
            resolution: Some(Resolution(height)),
            codecs: vec!["avc1.4d401f".to_string(), "mp4a.40.2".to_string()],
            ..raw(id, true, true)
        }
    }

    pub(crate) fn audio(id: &str, kbps: Option<f64>) -> RawVariant {
        RawVariant {
            container: "m4a".to_string(),
            bitrate: kbps,
            codecs: vec!["mp4a.40.2".to_string()],
            ..raw(id, false, true)
        }
    }

    #[test]
    fn accepts_every_track_combination() {
        let catalog = StreamCatalog::build(vec![
            raw("v", true, false),
            raw("a", false, true),
            raw("p", true, true),
        ])
        .unwrap();

        let kinds: Vec<_> = catalog.all().map(|v| v.kind).collect();
        assert_eq!(
            kinds,
            vec![
                MediaKind::VideoOnly,
                MediaKind::AudioOnly,
                MediaKind::Progressive
            ]
        );
    }

    #[test]
    fn rejects_variant_without_tracks() {
        let err = StreamCatalog::build(vec![raw("ok", true, true), raw("empty", false, false)])
            .unwrap_err();

        match err {
            TubefetchError::InvalidVariant { id, .. } => assert_eq!(id, "empty"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn rejects_duplicate_and_blank_ids() {
        assert!(matches!(
            StreamCatalog::build(vec![raw("18", true, true), raw("18", false, true)]),
            Err(TubefetchError::InvalidVariant { .. })
        ));
        assert!(matches!(
            StreamCatalog::build(vec![raw("  ", true, true)]),
            Err(TubefetchError::InvalidVariant { .. })
        ));
    }

    #[test]
    fn filter_is_restartable_and_ordered() {
        let catalog = StreamCatalog::build(vec![
            progressive("p1", 360),
            audio("a1", Some(128.0)),
            progressive("p2", 720),
        ])
        .unwrap();

        let progressive = catalog.filter(|v| v.is_progressive());
        let first: Vec<_> = progressive.clone().map(|v| v.id.as_str()).collect();
        let second: Vec<_> = progressive.map(|v| v.id.as_str()).collect();

        assert_eq!(first, vec!["p1", "p2"]);
        assert_eq!(first, second);
        assert_eq!(catalog.filter(|v| v.is_audio_only()).count(), 1);
        assert_eq!(catalog.get("a1").map(|v| v.bitrate), Some(Some(128.0)));
    }
}
