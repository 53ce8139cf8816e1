pub mod ffmpeg;

use std::future::Future;

use crate::error::Error;

pub use ffmpeg::FfmpegConcat;

pub trait AudioMerger {
    /// Concatenates `segments` in the given order into one playable file.
    /// Fails with [`Error::Merge`] when `segments` is empty.
    fn merge(&self, segments: Vec<Vec<u8>>) -> impl Future<Output = Result<Vec<u8>, Error>> + Send;
}

/// Container format recognised from the leading bytes of a buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    Mp3,
    Wav,
    Ogg,
    Unknown,
}

impl AudioFormat {
    pub fn sniff(bytes: &[u8]) -> Self {
        match bytes {
            [b'I', b'D', b'3', ..] => AudioFormat::Mp3,
            // MPEG frame sync
            [0xFF, second, ..] if second & 0xE0 == 0xE0 => AudioFormat::Mp3,
            [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'A', b'V', b'E', ..] => AudioFormat::Wav,
            [b'O', b'g', b'g', b'S', ..] => AudioFormat::Ogg,
            _ => AudioFormat::Unknown,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "mp3",
            AudioFormat::Wav => "wav",
            AudioFormat::Ogg => "ogg",
            AudioFormat::Unknown => "bin",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "audio/mpeg",
            AudioFormat::Wav => "audio/wav",
            AudioFormat::Ogg => "audio/ogg",
            AudioFormat::Unknown => "application/octet-stream",
        }
    }
}

/// The shared format of all segments, or `None` when they differ or any of
/// them is unrecognised
pub fn common_format(segments: &[Vec<u8>]) -> Option<AudioFormat> {
    let mut formats = segments.iter().map(|s| AudioFormat::sniff(s));
    let first = formats.next()?;
    (first != AudioFormat::Unknown && formats.all(|f| f == first)).then_some(first)
}
