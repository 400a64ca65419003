//! Sample container: WAV encoding and decoding.
//!
//! Samples embedded in a project are stored as 32-bit float WAV so that
//! round-tripping is exact and the sample rate and channel count travel
//! with the data. The decoder additionally accepts 8/16-bit integer PCM
//! for importing external files.

use std::fmt;
use std::io::Write;

use rt_ir::SampleBuffer;

/// Error type for sample decoding.
#[derive(Debug)]
pub enum SampleCodecError {
    /// Missing RIFF/WAVE magic or a malformed chunk table.
    InvalidHeader,
    /// Data ended before the declared chunk sizes.
    UnexpectedEof,
    /// A format this decoder does not handle (e.g. 24-bit PCM).
    UnsupportedFormat { format_tag: u16, bits: u16 },
}

impl fmt::Display for SampleCodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SampleCodecError::InvalidHeader => write!(f, "not a WAV file"),
            SampleCodecError::UnexpectedEof => write!(f, "truncated WAV data"),
            SampleCodecError::UnsupportedFormat { format_tag, bits } => {
                write!(f, "unsupported WAV format (tag {}, {} bits)", format_tag, bits)
            }
        }
    }
}

impl std::error::Error for SampleCodecError {}

const FORMAT_PCM: u16 = 1;
const FORMAT_IEEE_FLOAT: u16 = 3;

// --- Encoding ---

/// Encode a sample buffer as a 32-bit float WAV file.
pub fn encode_sample(buffer: &SampleBuffer) -> Vec<u8> {
    let num_channels = buffer.num_channels().max(1) as u16;
    let bits_per_sample: u16 = 32;
    let block_align = num_channels * (bits_per_sample / 8);
    let data_size = buffer.len() as u32 * block_align as u32;

    let mut out = Vec::with_capacity(44 + data_size as usize);
    write_header(&mut out, num_channels, buffer.sample_rate(), block_align, data_size)
        .expect("Vec<u8> write cannot fail");

    for frame in 0..buffer.len() {
        for ch in 0..buffer.num_channels() {
            out.extend_from_slice(&buffer.channel(ch)[frame].to_le_bytes());
        }
    }
    out
}

fn write_header(
    w: &mut impl Write,
    num_channels: u16,
    sample_rate: u32,
    block_align: u16,
    data_size: u32,
) -> std::io::Result<()> {
    w.write_all(b"RIFF")?;
    w.write_all(&(36 + data_size).to_le_bytes())?;
    w.write_all(b"WAVE")?;
    w.write_all(b"fmt ")?;
    w.write_all(&16u32.to_le_bytes())?;
    w.write_all(&FORMAT_IEEE_FLOAT.to_le_bytes())?;
    w.write_all(&num_channels.to_le_bytes())?;
    w.write_all(&sample_rate.to_le_bytes())?;
    w.write_all(&(sample_rate * block_align as u32).to_le_bytes())?;
    w.write_all(&block_align.to_le_bytes())?;
    w.write_all(&32u16.to_le_bytes())?;
    w.write_all(b"data")?;
    w.write_all(&data_size.to_le_bytes())
}

// --- Decoding ---

struct WavFormat {
    format_tag: u16,
    num_channels: u16,
    sample_rate: u32,
    bits_per_sample: u16,
}

/// Decode WAV bytes into a multi-channel float buffer.
///
/// Accepts integer PCM (8/16-bit) and 32-bit float, any channel count.
pub fn decode_sample(data: &[u8]) -> Result<SampleBuffer, SampleCodecError> {
    if data.len() < 12 || &data[0..4] != b"RIFF" || &data[8..12] != b"WAVE" {
        return Err(SampleCodecError::InvalidHeader);
    }

    let mut pos = 12;
    let mut format: Option<WavFormat> = None;
    let mut pcm: Option<&[u8]> = None;

    while pos + 8 <= data.len() {
        let chunk_id = &data[pos..pos + 4];
        let chunk_size = read_u32(data, pos + 4)? as usize;
        let body = pos + 8;
        if body + chunk_size > data.len() {
            return Err(SampleCodecError::UnexpectedEof);
        }

        if chunk_id == b"fmt " && chunk_size >= 16 {
            format = Some(WavFormat {
                format_tag: read_u16(data, body)?,
                num_channels: read_u16(data, body + 2)?,
                sample_rate: read_u32(data, body + 4)?,
                bits_per_sample: read_u16(data, body + 14)?,
            });
        } else if chunk_id == b"data" {
            pcm = Some(&data[body..body + chunk_size]);
        }

        pos = body + chunk_size;
        if pos % 2 != 0 {
            pos += 1;
        }
    }

    let format = format.ok_or(SampleCodecError::InvalidHeader)?;
    let pcm = pcm.ok_or(SampleCodecError::InvalidHeader)?;
    if format.num_channels == 0 {
        return Err(SampleCodecError::InvalidHeader);
    }

    let channels = match (format.format_tag, format.bits_per_sample) {
        (FORMAT_PCM, 8) => deinterleave(pcm, format.num_channels, 1, |b| {
            (b[0] as i16 - 128) as f32 / 128.0
        }),
        (FORMAT_PCM, 16) => deinterleave(pcm, format.num_channels, 2, |b| {
            i16::from_le_bytes([b[0], b[1]]) as f32 / 32768.0
        }),
        (FORMAT_IEEE_FLOAT, 32) => deinterleave(pcm, format.num_channels, 4, |b| {
            f32::from_le_bytes([b[0], b[1], b[2], b[3]])
        }),
        _ => {
            return Err(SampleCodecError::UnsupportedFormat {
                format_tag: format.format_tag,
                bits: format.bits_per_sample,
            })
        }
    };

    Ok(SampleBuffer::new(channels, format.sample_rate))
}

fn deinterleave(
    pcm: &[u8],
    num_channels: u16,
    bytes_per_sample: usize,
    convert: impl Fn(&[u8]) -> f32,
) -> Vec<Vec<f32>> {
    let frame_bytes = bytes_per_sample * num_channels as usize;
    let frames = pcm.len() / frame_bytes;
    let mut channels = vec![Vec::with_capacity(frames); num_channels as usize];
    for frame in pcm.chunks_exact(frame_bytes) {
        for (ch, sample) in frame.chunks_exact(bytes_per_sample).enumerate() {
            channels[ch].push(convert(sample));
        }
    }
    channels
}

fn read_u16(data: &[u8], offset: usize) -> Result<u16, SampleCodecError> {
    data.get(offset..offset + 2)
        .map(|b| u16::from_le_bytes([b[0], b[1]]))
        .ok_or(SampleCodecError::UnexpectedEof)
}

fn read_u32(data: &[u8], offset: usize) -> Result<u32, SampleCodecError> {
    data.get(offset..offset + 4)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .ok_or(SampleCodecError::UnexpectedEof)
}
