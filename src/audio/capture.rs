//! Fixed-duration sample acquisition
//!
//! Pulls raw 32-bit sample words from a `SampleSource` until a full
//! clip's worth has been read, narrowing each word to its upper 16 bits
//! on the fly. The device firmware this mirrors narrowed in place,
//! reinterpreting the buffer it was still writing into; here the raw
//! block and the narrowed output are separate buffers so no read
//! chunking can corrupt the indexing.

use std::time::Duration;

use uuid::Uuid;

use super::source::{SampleSource, SourceError, BYTES_PER_WORD};

/// Errors that can end an acquisition early.
#[derive(Debug, Clone)]
pub enum CaptureError {
    /// The source stopped producing data mid-clip.
    SourceTimeout { samples_so_far: usize },
    /// The source was torn down mid-clip.
    SourceClosed { samples_so_far: usize },
}

impl std::fmt::Display for CaptureError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CaptureError::SourceTimeout { samples_so_far } => write!(
                f,
                "Sample source timed out after {} samples",
                samples_so_far
            ),
            CaptureError::SourceClosed { samples_so_far } => {
                write!(f, "Sample source closed after {} samples", samples_so_far)
            }
        }
    }
}

impl std::error::Error for CaptureError {}

/// One completed capture cycle, owned end to end by the pipeline:
/// acquire -> encode -> upload -> drop.
#[derive(Debug, Clone)]
pub struct CaptureSession {
    /// Correlation id for log lines across the cycle.
    pub id: Uuid,
    /// Narrowed, sign-preserved 16-bit samples.
    pub samples: Vec<i16>,
    pub sample_rate: u32,
}

impl CaptureSession {
    pub fn duration_ms(&self) -> u64 {
        (self.samples.len() as u64 * 1000) / self.sample_rate as u64
    }
}

/// Acquire exactly `target_samples` narrowed samples from `source`.
///
/// Each pull requests at most `block_bytes` and never more than the raw
/// bytes still owed (`target_samples * 4` minus what has been read), so
/// the loop terminates with exactly `target_samples` values regardless of
/// how the source chunks its reads. A word split across two reads is
/// carried over and completed by the next read.
///
/// Narrowing takes the upper 16 bits of each little-endian 32-bit word
/// with an arithmetic shift, preserving sign: `0xFFFF_0000` becomes `-1`,
/// not `65535`.
pub fn acquire(
    source: &mut dyn SampleSource,
    target_samples: usize,
    block_bytes: usize,
    read_timeout: Duration,
) -> Result<Vec<i16>, CaptureError> {
    let target_bytes = target_samples * BYTES_PER_WORD;
    let mut samples: Vec<i16> = Vec::with_capacity(target_samples);

    // Raw scratch block, separate from the narrowed output.
    let mut block = vec![0u8; block_bytes.max(BYTES_PER_WORD)];
    // Partial word left over from a read that was not a multiple of 4.
    let mut carry: Vec<u8> = Vec::with_capacity(BYTES_PER_WORD);

    let mut bytes_read = 0usize;
    while bytes_read < target_bytes {
        let want = block.len().min(target_bytes - bytes_read);
        let n = match source.read(&mut block[..want], read_timeout) {
            Ok(n) => n,
            Err(SourceError::Timeout) => {
                return Err(CaptureError::SourceTimeout {
                    samples_so_far: samples.len(),
                })
            }
            Err(SourceError::Closed) => {
                return Err(CaptureError::SourceClosed {
                    samples_so_far: samples.len(),
                })
            }
        };
        bytes_read += n;

        let mut chunk = &block[..n];
        if !carry.is_empty() {
            // Complete the word started by the previous read.
            let need = BYTES_PER_WORD - carry.len();
            let take = need.min(chunk.len());
            carry.extend_from_slice(&chunk[..take]);
            chunk = &chunk[take..];
            if carry.len() == BYTES_PER_WORD {
                samples.push(narrow(&carry));
                carry.clear();
            }
        }

        let mut words = chunk.chunks_exact(BYTES_PER_WORD);
        for word in &mut words {
            samples.push(narrow(word));
        }
        carry.extend_from_slice(words.remainder());
    }

    debug_assert!(carry.is_empty());
    debug_assert_eq!(samples.len(), target_samples);
    Ok(samples)
}

/// Narrow one little-endian 32-bit word to its upper 16 bits.
fn narrow(word: &[u8]) -> i16 {
    let raw = i32::from_le_bytes([word[0], word[1], word[2], word[3]]);
    (raw >> 16) as i16
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Source that serves a fixed byte script in caller-independent
    /// chunk sizes, from an endless deterministic 32-bit pattern.
    struct ScriptedSource {
        data: Vec<u8>,
        offset: usize,
        /// Chunk sizes to serve, cycled; 0 falls back to the request size.
        chunks: Vec<usize>,
        chunk_idx: usize,
    }

    impl ScriptedSource {
        fn from_words(words: &[i32], chunks: Vec<usize>) -> Self {
            let mut data = Vec::with_capacity(words.len() * 4);
            for w in words {
                data.extend_from_slice(&w.to_le_bytes());
            }
            Self {
                data,
                offset: 0,
                chunks,
                chunk_idx: 0,
            }
        }
    }

    impl SampleSource for ScriptedSource {
        fn read(&mut self, buf: &mut [u8], _timeout: Duration) -> Result<usize, SourceError> {
            if self.offset >= self.data.len() {
                return Err(SourceError::Timeout);
            }
            let scripted = if self.chunks.is_empty() {
                buf.len()
            } else {
                let c = self.chunks[self.chunk_idx % self.chunks.len()];
                self.chunk_idx += 1;
                if c == 0 {
                    buf.len()
                } else {
                    c
                }
            };
            let n = scripted
                .min(buf.len())
                .min(self.data.len() - self.offset);
            buf[..n].copy_from_slice(&self.data[self.offset..self.offset + n]);
            self.offset += n;
            Ok(n)
        }
    }

    fn timeout() -> Duration {
        Duration::from_millis(10)
    }

    #[test]
    fn narrowing_takes_upper_16_bits_preserving_sign() {
        let words = [
            0x0001_0000,
            0x7FFF_0000,
            0xFFFF_0000u32 as i32, // -1 after narrowing, not 65535
            0x8000_0000u32 as i32, // i16::MIN
            0x1234_ABCDu32 as i32, // lower 16 bits are padding, ignored
        ];
        let mut source = ScriptedSource::from_words(&words, vec![]);

        let samples = acquire(&mut source, words.len(), 4096, timeout()).unwrap();
        assert_eq!(samples, vec![1, 0x7FFF, -1, i16::MIN, 0x1234]);
    }

    #[test]
    fn acquires_exact_count_across_uneven_reads() {
        let target = 48000usize;
        let words: Vec<i32> = (0..target as i32).map(|i| i << 16).collect();
        // 700 samples, then 324 samples, then whatever is requested.
        let mut source = ScriptedSource::from_words(&words, vec![700 * 4, 324 * 4, 0]);

        let samples = acquire(&mut source, target, 1024 * 4, timeout()).unwrap();
        assert_eq!(samples.len(), target);
        assert_eq!(samples[0], 0);
        assert_eq!(samples[699], 699);
        assert_eq!(samples[700], 700);
        // Indices past i16::MAX wrap in the upper-16-bit pattern.
        assert_eq!(samples[47999], (47999i32 << 16 >> 16) as i16);
    }

    #[test]
    fn reads_not_divisible_by_four_do_not_corrupt_samples() {
        let words: Vec<i32> = (0..1000).map(|i| (i - 500) << 16).collect();
        // 7-byte reads split every word across read boundaries.
        let mut source = ScriptedSource::from_words(&words, vec![7]);

        let samples = acquire(&mut source, 1000, 4096, timeout()).unwrap();
        let expected: Vec<i16> = (0..1000).map(|i| (i - 500) as i16).collect();
        assert_eq!(samples, expected);
    }

    #[test]
    fn never_reads_past_the_target() {
        // Source holds more data than the clip needs.
        let words: Vec<i32> = (0..100).map(|i| i << 16).collect();
        let mut source = ScriptedSource::from_words(&words, vec![]);

        let samples = acquire(&mut source, 10, 4096, timeout()).unwrap();
        assert_eq!(samples.len(), 10);
        // Exactly 40 bytes consumed; the rest is still in the source.
        assert_eq!(source.offset, 40);
    }

    #[test]
    fn zero_target_returns_empty_buffer_without_reading() {
        let mut source = ScriptedSource::from_words(&[], vec![]);
        let samples = acquire(&mut source, 0, 4096, timeout()).unwrap();
        assert!(samples.is_empty());
    }

    #[test]
    fn dry_source_surfaces_timeout_with_progress() {
        let words: Vec<i32> = (0..10).map(|i| i << 16).collect();
        let mut source = ScriptedSource::from_words(&words, vec![]);

        let err = acquire(&mut source, 100, 4096, timeout()).unwrap_err();
        match err {
            CaptureError::SourceTimeout { samples_so_far } => assert_eq!(samples_so_far, 10),
            other => panic!("expected SourceTimeout, got {:?}", other),
        }
    }
}
