use serde::Serialize;
use tokio::sync::mpsc;

/// Progress of one transfer after a chunk has been written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProgressSnapshot {
    pub bytes_transferred: u64,
    pub total_bytes: Option<u64>,
    pub percent: Option<u8>,
}

impl ProgressSnapshot {
    pub fn new(bytes_transferred: u64, total_bytes: Option<u64>) -> Self {
        Self {
            bytes_transferred,
            total_bytes,
            percent: total_bytes.map(|total| percent_of(bytes_transferred, total)),
        }
    }
}

/// `floor(done * 100 / total)`, clamped to 100. A zero total counts as done.
pub fn percent_of(done: u64, total: u64) -> u8 {
    if total == 0 {
        return 100;
    }
    let pct = (u128::from(done) * 100) / u128::from(total);
    pct.min(100) as u8
}

/// Returned by a sink that no longer wants progress updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SinkClosed;

/// Consumer of progress snapshots (console bar, GUI state, channel).
pub trait ProgressSink: Send {
    fn on_progress(&mut self, snapshot: ProgressSnapshot) -> Result<(), SinkClosed>;
}

impl<F> ProgressSink for F
where
    F: FnMut(ProgressSnapshot) + Send,
{
    fn on_progress(&mut self, snapshot: ProgressSnapshot) -> Result<(), SinkClosed> {
        self(snapshot);
        Ok(())
    }
}

/// Discards every snapshot.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn on_progress(&mut self, _snapshot: ProgressSnapshot) -> Result<(), SinkClosed> {
        Ok(())
    }
}

/// Forwards snapshots to a receiver on another task.
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<ProgressSnapshot>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::UnboundedSender<ProgressSnapshot>) -> Self {
        Self { tx }
    }

    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ProgressSnapshot>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl ProgressSink for ChannelSink {
    fn on_progress(&mut self, snapshot: ProgressSnapshot) -> Result<(), SinkClosed> {
        self.tx.send(snapshot).map_err(|_| SinkClosed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_floors_and_never_divides_by_zero() {
        assert_eq!(percent_of(0, 3), 0);
        assert_eq!(percent_of(1, 3), 33);
        assert_eq!(percent_of(2, 3), 66);
        assert_eq!(percent_of(3, 3), 100);
        assert_eq!(percent_of(0, 0), 100);
        assert_eq!(percent_of(u64::MAX, u64::MAX), 100);
    }

    #[test]
    fn unknown_total_omits_percent() {
        let snap = ProgressSnapshot::new(4096, None);
        assert_eq!(snap.percent, None);
        assert_eq!(ProgressSnapshot::new(512, Some(1024)).percent, Some(50));
    }

    #[test]
    fn channel_sink_reports_closed_receiver() {
        let (mut sink, rx) = ChannelSink::channel();
        assert!(sink.on_progress(ProgressSnapshot::new(1, None)).is_ok());
        drop(rx);
        assert_eq!(
            sink.on_progress(ProgressSnapshot::new(2, None)),
            Err(SinkClosed)
        );
    }
}
