use std::path::Path;

use async_trait::async_trait;
use tubefetch_core::{
    CancellationToken, ChannelSink, Connector, FailureReason, FileConnector, MetadataResolver,
    NoProgress, ProgressSnapshot, SelectionPolicy, SourceError, SourceLocator, SourceStream,
    StreamCatalog, TransferEngine, TransferStatus, TubefetchError, destination_path,
    resolver::ManifestResolver, select,
};

/// File source that, like many CDNs, only ever serves from byte zero.
struct WholeFileOnly;

#[async_trait]
impl Connector for WholeFileOnly {
    async fn open(&self, locator: &SourceLocator, offset: u64) -> Result<SourceStream, SourceError> {
        if offset > 0 {
            return Err(SourceError::RangeNotSupported);
        }
        FileConnector.open(locator, 0).await
    }
}

fn payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 7 % 256) as u8).collect()
}

async fn write_manifest(dir: &Path, audio: &Path, video: &Path, audio_len: usize) -> String {
    let manifest = serde_json::json!({
        "info": {"id": "xyz789", "title": "Test Clip", "author": "Tester", "length_seconds": 30},
        "variants": [
            {"id": "a-low", "container": "m4a", "has_video": false, "has_audio": true, "bitrate": 64.0,
             "locator": {"kind": "file", "path": audio}},
            {"id": "a-high", "container": "m4a", "has_video": false, "has_audio": true, "bitrate": 160.0,
             "size": audio_len, "locator": {"kind": "file", "path": audio}},
            {"id": "p-720", "container": "mp4", "has_video": true, "has_audio": true, "resolution": 720,
             "locator": {"kind": "file", "path": video}}
        ]
    });
    let path = dir.join("manifest.json");
    tokio::fs::write(&path, manifest.to_string()).await.unwrap();
    path.to_string_lossy().into_owned()
}

#[tokio::test]
async fn resolve_select_and_download_from_manifest() {
    let dir = tempfile::tempdir().unwrap();
    let audio = dir.path().join("audio.src");
    let video = dir.path().join("video.src");
    let audio_bytes = payload(300_000);
    tokio::fs::write(&audio, &audio_bytes).await.unwrap();
    tokio::fs::write(&video, payload(1000)).await.unwrap();

    let manifest = write_manifest(dir.path(), &audio, &video, audio_bytes.len()).await;
    let media = ManifestResolver::default().resolve(&manifest).await.unwrap();
    let catalog = StreamCatalog::build(media.variants).unwrap();
    let chosen = select(&catalog, &SelectionPolicy::AudioOnly).unwrap();
    assert_eq!(chosen.id, "a-high");

    let out = dir.path().join("downloads");
    tokio::fs::create_dir_all(&out).await.unwrap();
    let dest = destination_path(&out, &media.info, chosen);
    assert!(dest.ends_with("Test Clip [xyz789].m4a"));

    let (mut sink, mut rx) = ChannelSink::channel();
    let engine = TransferEngine::new(FileConnector).with_chunk_size(64 * 1024);
    let state = engine
        .transfer(chosen, &dest, &mut sink, &CancellationToken::new())
        .await
        .unwrap();
    drop(sink);

    let mut percents = Vec::new();
    while let Some(snap) = rx.recv().await {
        percents.push(snap.percent.unwrap());
    }

    assert_eq!(state.status, TransferStatus::Completed);
    assert_eq!(tokio::fs::read(&dest).await.unwrap(), audio_bytes);
    assert_eq!(percents.len(), 5);
    assert_eq!(percents.last(), Some(&100));
    assert!(percents.windows(2).all(|w| w[0] <= w[1]));
}

#[tokio::test]
async fn cancelled_transfer_resumes_to_completion() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("source.bin");
    let data = payload(40_000);
    tokio::fs::write(&source, &data).await.unwrap();

    let media = StreamCatalog::build(vec![tubefetch_core::RawVariant {
        id: "p".to_string(),
        container: "mp4".to_string(),
        codecs: Vec::new(),
        has_video: true,
        has_audio: true,
        resolution: None,
        bitrate: None,
        size: Some(data.len() as u64),
        locator: SourceLocator::file(&source),
    }])
    .unwrap();
    let variant = select(&media, &SelectionPolicy::HighestProgressive).unwrap();
    let dest = dir.path().join("out.mp4");
    let engine = TransferEngine::new(FileConnector).with_chunk_size(10_000);

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    let mut cancel_after_first = move |_snap: ProgressSnapshot| trigger.cancel();
    let err = engine
        .transfer(variant, &dest, &mut cancel_after_first, &cancel)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        TubefetchError::Transfer {
            reason: FailureReason::Cancelled,
            ..
        }
    ));
    assert_eq!(tokio::fs::metadata(&dest).await.unwrap().len(), 10_000);

    let state = engine
        .transfer(variant, &dest, &mut NoProgress, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(state.resumed_from, 10_000);
    assert_eq!(state.bytes_transferred, 40_000);
    assert_eq!(tokio::fs::read(&dest).await.unwrap(), data);

    // A non-ranged source never silently re-downloads over the partial file.
    tokio::fs::write(&dest, &data[..5000]).await.unwrap();
    let err = TransferEngine::new(WholeFileOnly)
        .transfer(variant, &dest, &mut NoProgress, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        TubefetchError::ResumeUnsupported {
            existing_bytes: 5000,
            ..
        }
    ));
}
