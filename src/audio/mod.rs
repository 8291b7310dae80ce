//! Audio pipeline for the Argus client
//!
//! Source boundary (CPAL microphone behind the 32-bit wire format),
//! fixed-duration sample acquisition with narrowing, and deterministic
//! WAV container encoding.

pub mod capture;
pub mod source;
pub mod wav;

pub use capture::{acquire, CaptureError, CaptureSession};
pub use source::{open_mic, MicCapture, MicError, MicSource, SampleSource, SourceError};
