//! WAV container encoding
//!
//! Builds the 44-byte RIFF/WAVE header by hand so the output is
//! deterministic and bit-exact, and assembles the complete upload payload
//! (header followed by raw little-endian PCM16 samples). The inference
//! server feeds the bytes straight to a standard decoder, so every field
//! must match the canonical layout.

/// Size of the RIFF/WAVE header in bytes.
pub const HEADER_LEN: usize = 44;

/// Bytes per narrowed sample (PCM16 mono).
pub const BYTES_PER_SAMPLE: usize = 2;

/// Encode the 44-byte WAV header for a mono PCM16 clip.
///
/// Pure function: the output is fully determined by `sample_rate` and
/// `sample_count`. A `sample_count` of 0 is legal and describes an empty
/// data region (data size 0, file size 36).
///
/// All multi-byte fields are little-endian:
/// - bytes 0..4   "RIFF", 4..8 file size (data size + 36)
/// - bytes 8..12  "WAVE", 12..16 "fmt ", 16..20 sub-chunk size (16)
/// - bytes 20..22 PCM tag (1), 22..24 channels (1)
/// - bytes 24..28 sample rate, 28..32 byte rate (rate * 2)
/// - bytes 32..34 block align (2), 34..36 bits per sample (16)
/// - bytes 36..40 "data", 40..44 data size (sample_count * 2)
pub fn encode_header(sample_rate: u32, sample_count: u32) -> [u8; HEADER_LEN] {
    // one channel at 16 bits = 2 bytes per sample frame
    let byte_rate = sample_rate * BYTES_PER_SAMPLE as u32;
    let data_size = sample_count * BYTES_PER_SAMPLE as u32;
    let file_size = data_size + 36;

    let mut header = [0u8; HEADER_LEN];

    // RIFF chunk
    header[0..4].copy_from_slice(b"RIFF");
    header[4..8].copy_from_slice(&file_size.to_le_bytes());
    header[8..12].copy_from_slice(b"WAVE");

    // fmt sub-chunk
    header[12..16].copy_from_slice(b"fmt ");
    header[16..20].copy_from_slice(&16u32.to_le_bytes());
    header[20..22].copy_from_slice(&1u16.to_le_bytes()); // PCM
    header[22..24].copy_from_slice(&1u16.to_le_bytes()); // mono
    header[24..28].copy_from_slice(&sample_rate.to_le_bytes());
    header[28..32].copy_from_slice(&byte_rate.to_le_bytes());
    header[32..34].copy_from_slice(&2u16.to_le_bytes()); // block align
    header[34..36].copy_from_slice(&16u16.to_le_bytes()); // bits per sample

    // data sub-chunk
    header[36..40].copy_from_slice(b"data");
    header[40..44].copy_from_slice(&data_size.to_le_bytes());

    header
}

/// Assemble a complete WAV clip: header followed by the sample data.
///
/// The result is exactly `44 + 2 * samples.len()` bytes and is the entire
/// upload payload for one capture cycle.
pub fn encode_clip(sample_rate: u32, samples: &[i16]) -> Vec<u8> {
    let mut clip = Vec::with_capacity(HEADER_LEN + samples.len() * BYTES_PER_SAMPLE);
    clip.extend_from_slice(&encode_header(sample_rate, samples.len() as u32));
    for sample in samples {
        clip.extend_from_slice(&sample.to_le_bytes());
    }
    clip
}
