//! Argus audio clip client
//!
//! Captures fixed-duration microphone clips, encodes them as mono PCM16
//! WAV, and uploads them to the Argus inference service. Capture cycles
//! are driven by a record button (evdev) and a fixed interval timer, run
//! strictly one at a time: acquire, encode, upload, discard.

pub mod audio;
pub mod config;
pub mod trigger;
pub mod upload;

use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use audio::{acquire, wav, CaptureError, CaptureSession, SampleSource};
use config::ClientConfig;
use trigger::{ButtonMonitor, Trigger};
use upload::{UploadError, UploadResponse, Uploader};

/// Errors that can end a capture cycle.
#[derive(Debug)]
pub enum CycleError {
    Capture(CaptureError),
    Upload(UploadError),
}

impl std::fmt::Display for CycleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CycleError::Capture(e) => write!(f, "Capture failed: {}", e),
            CycleError::Upload(e) => write!(f, "Upload failed: {}", e),
        }
    }
}

impl std::error::Error for CycleError {}

impl From<CaptureError> for CycleError {
    fn from(e: CaptureError) -> Self {
        CycleError::Capture(e)
    }
}

impl From<UploadError> for CycleError {
    fn from(e: UploadError) -> Self {
        CycleError::Upload(e)
    }
}

/// Record one clip from `source` as a fresh capture session.
///
/// Blocking: returns only when the full clip has been acquired or the
/// source fails. The returned session owns the narrowed sample buffer.
pub fn record_clip(
    config: &ClientConfig,
    source: &mut dyn SampleSource,
) -> Result<CaptureSession, CaptureError> {
    let samples = acquire(
        source,
        config.target_samples(),
        config.block_samples * audio::source::BYTES_PER_WORD,
        Duration::from_millis(config.read_timeout_ms),
    )?;
    Ok(CaptureSession {
        id: Uuid::new_v4(),
        samples,
        sample_rate: config.sample_rate,
    })
}

/// Run one complete capture cycle: acquire, encode, upload.
///
/// The payload is built and dropped inside this call whether or not the
/// upload succeeds; nothing is retained or retried. Acquisition runs on
/// the current thread (`block_in_place`), so a new cycle can never start
/// while this one is still acquiring or uploading.
pub async fn run_cycle(
    config: &ClientConfig,
    source: &mut dyn SampleSource,
    uploader: &Uploader,
) -> Result<UploadResponse, CycleError> {
    let started = Instant::now();

    let session = tokio::task::block_in_place(|| record_clip(config, source))?;
    log::info!(
        "[{}] Recorded {} samples ({} ms) at {} Hz",
        session.id,
        session.samples.len(),
        session.duration_ms(),
        session.sample_rate
    );

    let clip = wav::encode_clip(session.sample_rate, &session.samples);
    log::debug!("[{}] Encoded clip: {} bytes", session.id, clip.len());

    let response = uploader.send(&clip).await?;
    log::info!(
        "[{}] Cycle complete in {:?} (status {})",
        session.id,
        started.elapsed(),
        response.status
    );

    Ok(response)
}

/// Run the client until the process is terminated.
///
/// The trigger channel has capacity 1: a button press or timer tick that
/// arrives while a cycle is in flight is dropped at the sender, matching
/// the polling loop of the original device firmware, which did not
/// observe triggers until it returned to its polling point.
pub async fn run(config: ClientConfig) -> Result<(), Box<dyn std::error::Error>> {
    let uploader = Uploader::new(&config)?;

    let (_capture, mut source) = audio::open_mic(config.sample_rate)?;

    let (trigger_tx, mut trigger_rx) = mpsc::channel::<Trigger>(1);
    let cancel = CancellationToken::new();

    // The button is optional: without input-device permissions the client
    // still runs in continuous-monitoring mode.
    let button_key = trigger::button::parse_button_key(&config.button_key)?;
    let _button = match ButtonMonitor::start(trigger_tx.clone(), button_key, config.debounce_ms) {
        Ok(monitor) => Some(monitor),
        Err(e) => {
            log::warn!("Record button unavailable, timer only: {}", e);
            None
        }
    };

    trigger::spawn_interval_timer(trigger_tx, config.auto_interval_secs, cancel.clone());

    log::info!(
        "Argus client ready: {} Hz, {}s clips, device {}",
        config.sample_rate,
        config.record_seconds,
        config.device_id
    );

    while let Some(trigger) = trigger_rx.recv().await {
        log::info!("Capture triggered ({})", trigger.as_str());
        match run_cycle(&config, &mut source, &uploader).await {
            Ok(response) => {
                log::info!("Inference response: {}", response.body);
            }
            Err(e) => {
                // The loop resumes at its polling point; the failed
                // payload is already gone.
                log::error!("Capture cycle failed: {}", e);
            }
        }
    }

    cancel.cancel();
    Ok(())
}
