use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use iced::widget::{button, column, row, text, text_input};
use iced::{Element, Subscription, Task};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tubefetch_core::{
    CancellationToken, FailureReason, FetchConfig, MetadataResolver, ProgressSnapshot,
    SelectionPolicy, StandardConnector, StreamCatalog, TransferEngine, TubefetchError,
    YtDlpResolver, default_output_dir, destination_path, format_bytes, select,
};

fn main() -> iced::Result {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    iced::application(App::new, App::update, App::view)
        .title("Tubefetch")
        .subscription(App::subscription)
        .run()
}

/// Last snapshot written by the running transfer, polled by the UI.
type SharedProgress = Arc<Mutex<Option<ProgressSnapshot>>>;

struct App {
    url: String,
    output: String,
    quality: String,
    status: String,
    running: Option<CancellationToken>,
    progress: SharedProgress,
}

#[derive(Debug, Clone)]
enum Message {
    UrlChanged(String),
    OutputChanged(String),
    QualityChanged(String),
    Download,
    Cancel,
    Tick,
    Finished(Result<String, String>),
}

impl App {
    fn new() -> (Self, Task<Message>) {
        let app = Self {
            url: String::new(),
            output: default_output_dir().to_string_lossy().into_owned(),
            quality: SelectionPolicy::HighestProgressive.to_string(),
            status: "Idle".to_string(),
            running: None,
            progress: Arc::new(Mutex::new(None)),
        };
        (app, Task::none())
    }

    fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::UrlChanged(url) => self.url = url,
            Message::OutputChanged(output) => self.output = output,
            Message::QualityChanged(quality) => self.quality = quality,
            Message::Download => {
                if self.running.is_some() || self.url.trim().is_empty() {
                    return Task::none();
                }
                let policy: SelectionPolicy = match self.quality.parse() {
                    Ok(policy) => policy,
                    Err(e) => {
                        self.status = format!("Error: {e}");
                        return Task::none();
                    }
                };

                let cancel = CancellationToken::new();
                self.running = Some(cancel.clone());
                self.status = "Resolving formats...".to_string();
                if let Ok(mut slot) = self.progress.lock() {
                    *slot = None;
                }

                let job = Job {
                    url: self.url.trim().to_string(),
                    output: PathBuf::from(self.output.trim()),
                    policy,
                    cancel,
                    progress: self.progress.clone(),
                };
                return Task::perform(job.run(), Message::Finished);
            }
            Message::Cancel => {
                if let Some(cancel) = &self.running {
                    cancel.cancel();
                    self.status = "Cancelling...".to_string();
                }
            }
            Message::Tick => {
                let latest = self.progress.lock().ok().and_then(|slot| *slot);
                if let Some(snapshot) = latest {
                    self.status = describe_progress(&snapshot);
                }
            }
            Message::Finished(outcome) => {
                self.running = None;
                self.status = match outcome {
                    Ok(done) => done,
                    Err(e) => e,
                };
            }
        }
        Task::none()
    }

    fn subscription(&self) -> Subscription<Message> {
        if self.running.is_some() {
            iced::time::every(Duration::from_millis(200)).map(|_| Message::Tick)
        } else {
            Subscription::none()
        }
    }

    fn view(&self) -> Element<'_, Message> {
        let idle = self.running.is_none();
        let download = button("Download").on_press_maybe(idle.then_some(Message::Download));
        let cancel = button("Cancel").on_press_maybe((!idle).then_some(Message::Cancel));

        column![
            text("Tubefetch").size(24),
            text_input("Video URL...", &self.url).on_input(Message::UrlChanged),
            text_input("Output folder", &self.output).on_input(Message::OutputChanged),
            text_input("highest, audio or 720p", &self.quality).on_input(Message::QualityChanged),
            row![download, cancel].spacing(10),
            text(&self.status),
        ]
        .padding(20)
        .spacing(10)
        .into()
    }
}

fn describe_progress(snapshot: &ProgressSnapshot) -> String {
    match (snapshot.percent, snapshot.total_bytes) {
        (Some(percent), Some(total)) => format!(
            "Downloading: {percent}% ({} of {})",
            format_bytes(snapshot.bytes_transferred),
            format_bytes(total)
        ),
        _ => format!(
            "Downloading: {}",
            format_bytes(snapshot.bytes_transferred)
        ),
    }
}

/// Status line for a failed job; transfer failures say how much is kept.
fn describe_failure(error: TubefetchError) -> String {
    match error {
        TubefetchError::Transfer { reason, state } => {
            let saved = format_bytes(state.bytes_transferred);
            if reason == FailureReason::Cancelled {
                format!("Cancelled after {saved}. Download again to resume.")
            } else {
                format!("Error: {reason} ({saved} saved, download again to resume)")
            }
        }
        other => format!("Error: {other}"),
    }
}

/// One resolve-select-transfer run on the iced executor.
struct Job {
    url: String,
    output: PathBuf,
    policy: SelectionPolicy,
    cancel: CancellationToken,
    progress: SharedProgress,
}

impl Job {
    async fn run(self) -> Result<String, String> {
        info!("starting {} ({})", self.url, self.policy);
        self.execute().await.map_err(|e| {
            warn!("download failed: {}", e);
            describe_failure(e)
        })
    }

    async fn execute(self) -> Result<String, TubefetchError> {
        let config = FetchConfig::from_env();
        let resolver = YtDlpResolver::default().with_proxy(config.network.proxy.clone());
        let media = resolver.resolve(&self.url).await?;
        let catalog = StreamCatalog::build(media.variants)?;
        let variant = select(&catalog, &self.policy)?;

        tokio::fs::create_dir_all(&self.output).await?;
        let destination = destination_path(&self.output, &media.info, variant);

        let engine =
            TransferEngine::from_config(StandardConnector::new(&config.network)?, &config);
        let progress = self.progress;
        let mut sink = move |snapshot: ProgressSnapshot| {
            if let Ok(mut slot) = progress.lock() {
                *slot = Some(snapshot);
            }
        };
        let state = engine
            .transfer(variant, &destination, &mut sink, &self.cancel)
            .await?;

        info!(
            "saved {} bytes to {}",
            state.bytes_transferred,
            destination.display()
        );
        Ok(format!(
            "Done: {} ({})",
            destination.display(),
            format_bytes(state.bytes_transferred)
        ))
    }
}

#[cfg(test)]
mod tests {
    use tubefetch_core::{TransferState, TransferStatus};

    use super::*;

    fn stopped(reason: FailureReason, bytes: u64) -> TubefetchError {
        TubefetchError::Transfer {
            state: Box::new(TransferState {
                destination: PathBuf::from("/tmp/out.mp4"),
                total_bytes: Some(4 * 1_048_576),
                bytes_transferred: bytes,
                resumed_from: 0,
                status: TransferStatus::Failed(reason.clone()),
            }),
            reason,
        }
    }

    #[test]
    fn progress_line_shows_percent_when_total_is_known() {
        let known = ProgressSnapshot::new(2 * 1_048_576, Some(4 * 1_048_576));
        assert_eq!(describe_progress(&known), "Downloading: 50% (2.0 MB of 4.0 MB)");

        let unknown = ProgressSnapshot::new(512 * 1024, None);
        assert_eq!(describe_progress(&unknown), "Downloading: 512 KB");
    }

    #[test]
    fn failure_line_reports_saved_bytes() {
        let cancelled = describe_failure(stopped(FailureReason::Cancelled, 1_048_576));
        assert_eq!(cancelled, "Cancelled after 1.0 MB. Download again to resume.");

        let broken = describe_failure(stopped(FailureReason::Io("disk full".into()), 512 * 1024));
        assert!(broken.starts_with("Error: "));
        assert!(broken.contains("512 KB saved"));

        let other = describe_failure(TubefetchError::UnknownPolicy("4k".into()));
        assert!(other.starts_with("Error: Unknown selection policy"));
    }
}
