//! Duration of encoded narration audio.

use crate::error::CodecError;

/// Decodes enough of an audio stream to report its playable length.
pub trait MediaCodec: Send + Sync {
    fn decode_audio_duration(&self, bytes: &[u8]) -> Result<f64, CodecError>;
}

/// Walks MPEG audio layer III frame headers and sums their sample counts.
#[derive(Debug, Default, Clone, Copy)]
pub struct Mp3FrameCodec;

const MPEG1_BITRATES: [u32; 15] = [
    0, 32, 40, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320,
];
const MPEG2_BITRATES: [u32; 15] = [0, 8, 16, 24, 32, 40, 48, 56, 64, 80, 96, 112, 128, 144, 160];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Version {
    Mpeg1,
    Mpeg2,
    Mpeg25,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FrameHeader {
    version: Version,
    sample_rate: u32,
    length: usize,
}

impl FrameHeader {
    fn parse(bytes: &[u8]) -> Option<Self> {
        let &[b0, b1, b2, _] = bytes.get(..4)? else {
            return None;
        };
        if b0 != 0xFF || b1 & 0xE0 != 0xE0 {
            return None;
        }

        let version = match (b1 >> 3) & 0b11 {
            0b11 => Version::Mpeg1,
            0b10 => Version::Mpeg2,
            0b00 => Version::Mpeg25,
            _ => return None,
        };
        // layer III only
        if (b1 >> 1) & 0b11 != 0b01 {
            return None;
        }

        let bitrate_index = (b2 >> 4) as usize;
        let rate_index = ((b2 >> 2) & 0b11) as usize;
        if bitrate_index == 0 || bitrate_index == 15 || rate_index == 3 {
            return None;
        }

        let (bitrate, sample_rate) = match version {
            Version::Mpeg1 => (MPEG1_BITRATES[bitrate_index], [44100, 48000, 32000][rate_index]),
            Version::Mpeg2 => (MPEG2_BITRATES[bitrate_index], [22050, 24000, 16000][rate_index]),
            Version::Mpeg25 => (MPEG2_BITRATES[bitrate_index], [11025, 12000, 8000][rate_index]),
        };
        let padding = ((b2 >> 1) & 1) as u32;
        let coefficient = if version == Version::Mpeg1 { 144 } else { 72 };
        let length = (coefficient * bitrate * 1000 / sample_rate + padding) as usize;

        Some(Self {
            version,
            sample_rate,
            length,
        })
    }

    fn samples(&self) -> u32 {
        match self.version {
            Version::Mpeg1 => 1152,
            Version::Mpeg2 | Version::Mpeg25 => 576,
        }
    }
}

/// Size of a leading ID3v2 tag, footer included.
fn id3v2_len(bytes: &[u8]) -> usize {
    if bytes.len() < 10 || &bytes[..3] != b"ID3" {
        return 0;
    }
    let size = bytes[6..10]
        .iter()
        .fold(0usize, |acc, b| (acc << 7) | (*b & 0x7F) as usize);
    let footer = if bytes[5] & 0x10 != 0 { 10 } else { 0 };
    10 + size + footer
}

impl MediaCodec for Mp3FrameCodec {
    fn decode_audio_duration(&self, bytes: &[u8]) -> Result<f64, CodecError> {
        let mut pos = id3v2_len(bytes);
        let mut seconds = 0.0;
        let mut frames = 0usize;

        while pos + 4 <= bytes.len() {
            match FrameHeader::parse(&bytes[pos..]) {
                Some(header) if header.length > 4 => {
                    seconds += header.samples() as f64 / header.sample_rate as f64;
                    frames += 1;
                    pos += header.length;
                }
                _ => pos += 1,
            }
        }

        if frames == 0 {
            if bytes.starts_with(b"RIFF") || bytes.starts_with(b"OggS") {
                return Err(CodecError::Unsupported("only MPEG layer III audio is supported"));
            }
            return Err(CodecError::NoFrames);
        }

        Ok(seconds)
    }
}
