//! Streaming sample source boundary
//!
//! The acquisition unit consumes a `SampleSource`: a blocking "read up to
//! N bytes" stream of little-endian 32-bit sample words whose upper 16
//! bits carry the true sample value (the INMP441 wire format the Argus
//! devices produce). `MicSource` implements it on top of a CPAL input
//! stream; tests substitute scripted sources.

use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{BufferSize, Device, SampleFormat, SampleRate, SizedSample, Stream, StreamConfig};
use crossbeam_channel::{Receiver, Sender, TrySendError};

/// Bytes per 32-bit sample word on the wire.
pub const BYTES_PER_WORD: usize = 4;

/// Number of capture blocks buffered between the stream callback and the
/// reader before the oldest data starts being dropped.
const CHANNEL_DEPTH: usize = 32;

/// Errors surfaced by a sample source read.
#[derive(Debug, Clone)]
pub enum SourceError {
    /// No data arrived within the read timeout. The reference firmware
    /// blocks forever here; the timeout is a deliberate hardening so a
    /// stalled stream fails the cycle instead of hanging the client.
    Timeout,
    /// The producer side of the source is gone (stream torn down).
    Closed,
}

impl std::fmt::Display for SourceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceError::Timeout => write!(f, "sample source produced no data before the timeout"),
            SourceError::Closed => write!(f, "sample source closed"),
        }
    }
}

impl std::error::Error for SourceError {}

/// Blocking byte-stream of 32-bit sample words.
///
/// Reads may return any byte count from 1 to `buf.len()`, including counts
/// that are not a multiple of 4; callers must tolerate arbitrary chunking.
pub trait SampleSource {
    fn read(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize, SourceError>;
}

/// Errors that can occur while opening the microphone.
#[derive(Debug, Clone)]
pub enum MicError {
    NoInputDevice,
    NoSupportedConfig,
    StreamCreationFailed(String),
}

impl std::fmt::Display for MicError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MicError::NoInputDevice => write!(f, "No audio input device found"),
            MicError::NoSupportedConfig => write!(f, "No supported audio configuration"),
            MicError::StreamCreationFailed(e) => {
                write!(f, "Failed to create audio stream: {}", e)
            }
        }
    }
}

impl std::error::Error for MicError {}

/// Guard owning the live CPAL stream. Not `Send`; it stays on the thread
/// that opened the device while `MicSource` (the consumer half) is handed
/// to the acquisition unit.
pub struct MicCapture {
    _stream: Stream,
}

/// Consumer half of the microphone capture: drains byte blocks pushed by
/// the stream callback and serves them through the `SampleSource` trait.
pub struct MicSource {
    rx: Receiver<Vec<u8>>,
    /// Bytes received from the callback but not yet handed to a reader.
    pending: Vec<u8>,
}

/// Open the default input device as a mono stream at `sample_rate` and
/// return the stream guard plus its `SampleSource` consumer.
///
/// Whatever sample format the backend delivers is converted to the 32-bit
/// upper-16-bit wire format before it crosses the channel, so the
/// acquisition unit always sees the same narrowing problem the device
/// firmware solves.
pub fn open_mic(sample_rate: u32) -> Result<(MicCapture, MicSource), MicError> {
    let host = cpal::default_host();

    let device = host
        .default_input_device()
        .ok_or(MicError::NoInputDevice)?;

    log::info!("Using audio input device: {:?}", device.name());

    let supported = device
        .default_input_config()
        .map_err(|_| MicError::NoSupportedConfig)?;
    let sample_format = supported.sample_format();

    let config = StreamConfig {
        channels: 1,
        sample_rate: SampleRate(sample_rate),
        buffer_size: BufferSize::Default,
    };

    log::info!(
        "Audio config: {} Hz, mono, {:?} -> 32-bit words",
        sample_rate,
        sample_format
    );

    let (tx, rx) = crossbeam_channel::bounded(CHANNEL_DEPTH);

    let stream = match sample_format {
        SampleFormat::I16 => build_stream(&device, &config, tx, |s: i16| (s as i32) << 16)?,
        SampleFormat::I32 => build_stream(&device, &config, tx, |s: i32| s)?,
        SampleFormat::F32 => build_stream(&device, &config, tx, |s: f32| {
            (float_to_i16(s) as i32) << 16
        })?,
        _ => return Err(MicError::NoSupportedConfig),
    };

    stream
        .play()
        .map_err(|e| MicError::StreamCreationFailed(format!("Failed to start stream: {}", e)))?;

    Ok((
        MicCapture { _stream: stream },
        MicSource {
            rx,
            pending: Vec::new(),
        },
    ))
}

fn build_stream<T>(
    device: &Device,
    config: &StreamConfig,
    tx: Sender<Vec<u8>>,
    convert: impl Fn(T) -> i32 + Send + 'static,
) -> Result<Stream, MicError>
where
    T: SizedSample + Send + 'static,
{
    let err_fn = |err| log::error!("Audio stream error: {}", err);

    let stream = device
        .build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                let mut block = Vec::with_capacity(data.len() * BYTES_PER_WORD);
                for &sample in data {
                    block.extend_from_slice(&convert(sample).to_le_bytes());
                }
                match tx.try_send(block) {
                    Ok(()) => {}
                    Err(TrySendError::Full(_)) => {
                        // Reader is behind; drop the block like DMA overrun.
                        log::trace!("Capture channel full, dropping {} samples", data.len());
                    }
                    Err(TrySendError::Disconnected(_)) => {}
                }
            },
            err_fn,
            None,
        )
        .map_err(|e| MicError::StreamCreationFailed(e.to_string()))?;

    Ok(stream)
}

/// Convert a float sample to i16 with clamping.
fn float_to_i16(sample: f32) -> i16 {
    let clamped = sample.clamp(-1.0, 1.0);
    (clamped * i16::MAX as f32) as i16
}

impl SampleSource for MicSource {
    fn read(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize, SourceError> {
        if self.pending.is_empty() {
            let block = match self.rx.recv_timeout(timeout) {
                Ok(block) => block,
                Err(crossbeam_channel::RecvTimeoutError::Timeout) => {
                    return Err(SourceError::Timeout)
                }
                Err(crossbeam_channel::RecvTimeoutError::Disconnected) => {
                    return Err(SourceError::Closed)
                }
            };
            self.pending = block;
        }

        let n = buf.len().min(self.pending.len());
        buf[..n].copy_from_slice(&self.pending[..n]);
        self.pending.drain(..n);
        Ok(n)
    }
}
