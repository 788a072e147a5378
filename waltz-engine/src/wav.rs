//! Canonical 44-byte-header PCM WAV container.
//!
//! Layout (all integers little-endian):
//!
//! | offset | field                                   |
//! |--------|-----------------------------------------|
//! | 0      | `RIFF`, chunk size `36 + data_len`      |
//! | 8      | `WAVE`                                  |
//! | 12     | `fmt `, 16, format 1, channels, rate, byte rate, block align, bits |
//! | 36     | `data`, `data_len`, samples             |

use crate::error::{Error, Result};
use std::fs;
use std::io::Write;
use std::path::Path;

/// Size of the header written by [`encode_pcm16`].
pub const HEADER_LEN: usize = 44;

/// WAVE_FORMAT_PCM
pub const FORMAT_PCM: u16 = 1;

/// Channel layout, rate and depth of a PCM stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PcmFormat {
    pub channels: u16,
    pub sample_rate: u32,
    pub bits_per_sample: u16,
}

impl Default for PcmFormat {
    fn default() -> Self {
        Self::mono16(44_100)
    }
}

impl PcmFormat {
    /// Mono, 16-bit.
    pub fn mono16(sample_rate: u32) -> Self {
        Self { channels: 1, sample_rate, bits_per_sample: 16 }
    }

    #[inline] pub fn bytes_per_sample(&self) -> u16 { self.bits_per_sample / 8 }
    #[inline] pub fn block_align(&self) -> u16 { self.channels * self.bytes_per_sample() }
    #[inline] pub fn byte_rate(&self) -> u32 { self.sample_rate * u32::from(self.block_align()) }
}

/// The fields of a parsed canonical header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub format_code: u16,
    pub format: PcmFormat,
    pub byte_rate: u32,
    pub block_align: u16,
    pub riff_len: u32,
    pub data_len: u32,
}

impl Header {
    /// Parse a canonical 44-byte header. Returns `None` if tags or sizes do
    /// not match the canonical layout.
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < HEADER_LEN
            || &bytes[0..4] != b"RIFF"
            || &bytes[8..12] != b"WAVE"
            || &bytes[12..16] != b"fmt "
            || &bytes[36..40] != b"data"
            || le_u32(bytes, 16) != 16
        {
            return None;
        }
        Some(Self {
            riff_len: le_u32(bytes, 4),
            format_code: le_u16(bytes, 20),
            format: PcmFormat {
                channels: le_u16(bytes, 22),
                sample_rate: le_u32(bytes, 24),
                bits_per_sample: le_u16(bytes, 34),
            },
            byte_rate: le_u32(bytes, 28),
            block_align: le_u16(bytes, 32),
            data_len: le_u32(bytes, 40),
        })
    }
}

#[inline]
fn le_u16(b: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([b[at], b[at + 1]])
}

#[inline]
fn le_u32(b: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([b[at], b[at + 1], b[at + 2], b[at + 3]])
}

/// Encode interleaved 16-bit samples into a complete WAV image.
pub fn encode_pcm16(samples: &[i16], format: PcmFormat) -> Result<Vec<u8>> {
    if format.bits_per_sample != 16 {
        return Err(Error::InvalidConfig(format!(
            "16-bit encoder given a {}-bit format",
            format.bits_per_sample
        )));
    }
    if format.channels == 0 || format.sample_rate == 0 {
        return Err(Error::InvalidConfig("channels and sample rate must be positive".into()));
    }
    if samples.len() % usize::from(format.channels) != 0 {
        return Err(Error::InvalidConfig(format!(
            "{} samples do not split into {} channels",
            samples.len(),
            format.channels
        )));
    }
    let data_len = u32::try_from(samples.len() * usize::from(format.bytes_per_sample()))
        .ok()
        .filter(|n| *n <= u32::MAX - 36)
        .ok_or_else(|| Error::InvalidConfig("sample data too large for a WAV file".into()))?;

    let mut out = Vec::with_capacity(HEADER_LEN + data_len as usize);

    // RIFF header
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(36 + data_len).to_le_bytes());
    out.extend_from_slice(b"WAVE");

    // fmt chunk
    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes()); // PCM chunk size
    out.extend_from_slice(&FORMAT_PCM.to_le_bytes());
    out.extend_from_slice(&format.channels.to_le_bytes());
    out.extend_from_slice(&format.sample_rate.to_le_bytes());
    out.extend_from_slice(&format.byte_rate().to_le_bytes());
    out.extend_from_slice(&format.block_align().to_le_bytes());
    out.extend_from_slice(&format.bits_per_sample.to_le_bytes());

    // data chunk
    out.extend_from_slice(b"data");
    out.extend_from_slice(&data_len.to_le_bytes());
    for s in samples {
        out.extend_from_slice(&s.to_le_bytes());
    }

    Ok(out)
}

/// Encode and write to `path`, creating parent directories. Returns the
/// number of bytes written.
pub fn write_wav(path: &Path, samples: &[i16], format: PcmFormat) -> Result<usize> {
    let bytes = encode_pcm16(samples, format)?;
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    let mut f = fs::File::create(path)?;
    f.write_all(&bytes)?;
    f.flush()?;
    Ok(bytes.len())
}
