use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tubefetch_core::{ProgressSink, ProgressSnapshot, SinkClosed};

pub fn create_spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
            .template("{spinner:.cyan} {msg}")
            .unwrap(),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

/// Byte bar when the size is known, byte spinner otherwise.
pub fn create_download_bar(total: Option<u64>) -> ProgressBar {
    match total {
        Some(total) => {
            let pb = ProgressBar::new(total);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template(
                        "{spinner:.cyan} [{bar:40.cyan/blue}] {bytes}/{total_bytes} {percent}% ({bytes_per_sec}, {eta})",
                    )
                    .unwrap()
                    .progress_chars("=> "),
            );
            pb
        }
        None => {
            let pb = ProgressBar::new_spinner();
            pb.set_style(
                ProgressStyle::default_spinner()
                    .template("{spinner:.cyan} {bytes} downloaded ({bytes_per_sec})")
                    .unwrap(),
            );
            pb.enable_steady_tick(Duration::from_millis(120));
            pb
        }
    }
}

/// Feeds transfer snapshots into an indicatif bar.
pub struct BarSink {
    bar: ProgressBar,
}

impl BarSink {
    pub fn new(bar: ProgressBar) -> Self {
        Self { bar }
    }
}

impl ProgressSink for BarSink {
    fn on_progress(&mut self, snapshot: ProgressSnapshot) -> Result<(), SinkClosed> {
        if let Some(total) = snapshot.total_bytes {
            if self.bar.length() != Some(total) {
                self.bar.set_length(total);
            }
        }
        self.bar.set_position(snapshot.bytes_transferred);
        Ok(())
    }
}
