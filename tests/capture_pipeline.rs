//! End-to-end tests for the capture pipeline
//!
//! Drives the acquisition unit with deterministic synthetic sources and
//! verifies the encoded container bit-for-bit, including through hound's
//! reader as a stand-in for the server-side decoder.

use std::time::Duration;

use argus_client::audio::{acquire, wav, SampleSource, SourceError};
use argus_client::config::ClientConfig;
use argus_client::record_clip;

/// Endless deterministic source: the n-th 32-bit word is `n << 16 | noise`,
/// so the narrowed n-th sample must equal `n` (mod i16).
struct PatternSource {
    next_word: i64,
}

impl PatternSource {
    fn new() -> Self {
        Self { next_word: 0 }
    }
}

impl SampleSource for PatternSource {
    fn read(&mut self, buf: &mut [u8], _timeout: Duration) -> Result<usize, SourceError> {
        let words = buf.len() / 4;
        if words == 0 {
            return Ok(0);
        }
        for i in 0..words {
            let value = (self.next_word as i32) << 16 | 0x0000_5A5A; // low bits are line noise
            buf[i * 4..i * 4 + 4].copy_from_slice(&value.to_le_bytes());
            self.next_word += 1;
        }
        Ok(words * 4)
    }
}

fn reference_config() -> ClientConfig {
    // The reference deployment: 16 kHz, 3 second clips, 1024-sample blocks.
    ClientConfig::default()
}

#[test]
fn reference_scenario_produces_96044_byte_clip() {
    let config = reference_config();
    assert_eq!(config.target_samples(), 48000);

    let mut source = PatternSource::new();
    let session = record_clip(&config, &mut source).unwrap();
    assert_eq!(session.samples.len(), 48000);
    assert_eq!(session.duration_ms(), 3000);

    let clip = wav::encode_clip(session.sample_rate, &session.samples);
    assert_eq!(clip.len(), 96044);

    // byte_rate and block_align fields for 16 kHz mono PCM16
    assert_eq!(u32::from_le_bytes(clip[28..32].try_into().unwrap()), 32000);
    assert_eq!(u16::from_le_bytes(clip[32..34].try_into().unwrap()), 2);
}

#[test]
fn narrowed_samples_survive_container_round_trip() {
    let config = reference_config();
    let mut source = PatternSource::new();
    let session = record_clip(&config, &mut source).unwrap();
    let clip = wav::encode_clip(session.sample_rate, &session.samples);

    let mut reader = hound::WavReader::new(std::io::Cursor::new(clip)).unwrap();
    assert_eq!(reader.spec().sample_rate, 16000);
    assert_eq!(reader.spec().channels, 1);
    assert_eq!(reader.spec().bits_per_sample, 16);

    let decoded: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
    assert_eq!(decoded.len(), 48000);
    // The low 16 bits of each word were noise; only the upper 16 survive.
    assert_eq!(decoded[0], 0);
    assert_eq!(decoded[1], 1);
    assert_eq!(decoded[32767], 32767);
    assert_eq!(decoded[32768], i16::MIN); // 32768 << 16 narrows to -32768
    assert_eq!(decoded[47999], (47999i32 << 16 >> 16) as i16);
}

/// Source that hands out data in fixed-size slices regardless of what the
/// reader asks for, to prove acquisition is chunking-independent.
struct ChunkedSource {
    inner: PatternSource,
    chunk: usize,
}

impl SampleSource for ChunkedSource {
    fn read(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize, SourceError> {
        let n = self.chunk.min(buf.len());
        self.inner.read(&mut buf[..n], timeout)
    }
}

#[test]
fn acquisition_is_independent_of_read_chunking() {
    let timeout = Duration::from_millis(10);
    let full = acquire(&mut PatternSource::new(), 48000, 4096, timeout).unwrap();

    for chunk in [4, 28, 700 * 4, 324 * 4, 4096] {
        let mut source = ChunkedSource {
            inner: PatternSource::new(),
            chunk,
        };
        let samples = acquire(&mut source, 48000, 4096, timeout).unwrap();
        assert_eq!(samples, full, "chunk size {} changed the clip", chunk);
    }
}

#[test]
fn empty_clip_is_a_bare_header() {
    let clip = wav::encode_clip(16000, &[]);
    assert_eq!(clip.len(), 44);
    assert_eq!(u32::from_le_bytes(clip[4..8].try_into().unwrap()), 36);
    assert_eq!(u32::from_le_bytes(clip[40..44].try_into().unwrap()), 0);
}
