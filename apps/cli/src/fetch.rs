use std::{path::Path, time::Duration};

use tokio::fs;
use tracing::{info, warn};
use tubefetch_core::{
    CancellationToken, Connector, ProgressSink, SelectionPolicy, StreamCatalog, StreamVariant,
    TransferEngine, TransferState, TubefetchError, select,
};

/// What to do when the core reports a failure it will not handle itself.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Extra attempts after a retryable transfer failure; each one resumes.
    pub retries: u32,
    /// Truncate and start over when a partial file cannot be resumed.
    pub restart_unresumable: bool,
    /// Base delay between attempts, multiplied by the attempt number.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 0,
            restart_unresumable: false,
            backoff: Duration::from_millis(500),
        }
    }
}

pub struct Choice<'a> {
    pub variant: &'a StreamVariant,
    /// Set when an exact resolution was missing and the highest progressive
    /// stream was taken instead.
    pub fell_back_from: Option<SelectionPolicy>,
}

/// Select per `policy`; with `fallback`, a missing exact resolution retries
/// with the highest progressive stream.
pub fn choose<'a>(
    catalog: &'a StreamCatalog,
    policy: SelectionPolicy,
    fallback: bool,
) -> Result<Choice<'a>, TubefetchError> {
    match select(catalog, &policy) {
        Ok(variant) => Ok(Choice {
            variant,
            fell_back_from: None,
        }),
        Err(TubefetchError::NoMatchingStream {
            policy: missed @ SelectionPolicy::ExactResolution(_),
        }) if fallback => {
            let variant = select(catalog, &SelectionPolicy::HighestProgressive)?;
            Ok(Choice {
                variant,
                fell_back_from: Some(missed),
            })
        }
        Err(e) => Err(e),
    }
}

/// Run the transfer, re-invoking it (and therefore resuming) as `retry` allows.
pub async fn download<C, S>(
    engine: &TransferEngine<C>,
    variant: &StreamVariant,
    destination: &Path,
    sink: &mut S,
    cancel: &CancellationToken,
    retry: &RetryPolicy,
) -> Result<TransferState, TubefetchError>
where
    C: Connector,
    S: ProgressSink,
{
    let mut attempt = 0;
    let mut restarted = false;

    loop {
        match engine.transfer(variant, destination, &mut *sink, cancel).await {
            Ok(state) => return Ok(state),
            Err(TubefetchError::ResumeUnsupported { existing_bytes, .. })
                if retry.restart_unresumable && !restarted =>
            {
                warn!(
                    "source cannot resume, discarding {} bytes of {}",
                    existing_bytes,
                    destination.display()
                );
                fs::remove_file(destination).await?;
                restarted = true;
            }
            Err(TubefetchError::Transfer { reason, state })
                if reason.is_retryable() && attempt < retry.retries =>
            {
                attempt += 1;
                info!(
                    "attempt {} failed at {} bytes ({}), retrying",
                    attempt, state.bytes_transferred, reason
                );
                tokio::select! {
                    _ = cancel.cancelled() => {
                        return Err(TubefetchError::Transfer { reason, state });
                    }
                    _ = tokio::time::sleep(retry.backoff * attempt) => {}
                }
            }
            Err(e) => return Err(e),
        }
    }
}
