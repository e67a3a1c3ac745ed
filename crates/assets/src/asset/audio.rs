//! Sound clips.
//!
//! WAV is decoded to PCM up front. Compressed streams (Ogg, MP3) are only
//! recognised by their signature and kept encoded; playback decodes them.

use crate::asset::error::{ErrorKind, Result};
use exn::ResultExt;
use hound::{SampleFormat, WavReader};
use std::io::Cursor;
use std::time::Duration;
use tracing::instrument;

#[derive(Clone, Debug, PartialEq)]
pub enum Audio {
    Pcm(Pcm),
    Encoded { format: EncodedFormat, data: Vec<u8> },
}

impl Audio {
    pub fn as_pcm(&self) -> Option<&Pcm> {
        match self {
            Self::Pcm(pcm) => Some(pcm),
            Self::Encoded { .. } => None,
        }
    }

    /// Length of the clip, known only once it has been decoded to PCM.
    pub fn duration(&self) -> Option<Duration> {
        self.as_pcm().map(Pcm::duration)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EncodedFormat {
    Ogg,
    Mp3,
}

/// Interleaved PCM samples.
#[derive(Clone, Debug, PartialEq)]
pub struct Pcm {
    channels: u16,
    sample_rate: u32,
    samples: Samples,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Samples {
    /// Integer samples as stored, widened to `i32`.
    Int { bits: u16, data: Vec<i32> },
    Float(Vec<f32>),
}

impl Samples {
    pub fn len(&self) -> usize {
        match self {
            Self::Int { data, .. } => data.len(),
            Self::Float(data) => data.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Pcm {
    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn samples(&self) -> &Samples {
        &self.samples
    }

    /// Samples per channel.
    pub fn frames(&self) -> usize {
        self.samples.len() / usize::from(self.channels.max(1))
    }

    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.frames() as f64 / f64::from(self.sample_rate))
    }
}

#[instrument(level = "trace", skip(bytes), fields(size = bytes.len()))]
pub fn decode(bytes: &[u8]) -> Result<Audio> {
    match bytes {
        [b'R', b'I', b'F', b'F', ..] => decode_wav(bytes).map(Audio::Pcm),
        [b'O', b'g', b'g', b'S', ..] => Ok(encoded(EncodedFormat::Ogg, bytes)),
        [b'I', b'D', b'3', ..] => Ok(encoded(EncodedFormat::Mp3, bytes)),
        // Bare MPEG frame sync: eleven set bits.
        [0xFF, second, ..] if second & 0xE0 == 0xE0 => Ok(encoded(EncodedFormat::Mp3, bytes)),
        _ => exn::bail!(ErrorKind::Audio),
    }
}

fn encoded(format: EncodedFormat, bytes: &[u8]) -> Audio {
    Audio::Encoded {
        format,
        data: bytes.to_vec(),
    }
}

fn decode_wav(bytes: &[u8]) -> Result<Pcm> {
    let mut reader = WavReader::new(Cursor::new(bytes)).or_raise(|| ErrorKind::Audio)?;
    let spec = reader.spec();
    let samples = match spec.sample_format {
        SampleFormat::Int => Samples::Int {
            bits: spec.bits_per_sample,
            data: reader.samples::<i32>().collect::<std::result::Result<_, _>>().or_raise(|| ErrorKind::Audio)?,
        },
        SampleFormat::Float => {
            Samples::Float(reader.samples::<f32>().collect::<std::result::Result<_, _>>().or_raise(|| ErrorKind::Audio)?)
        }
    };
    Ok(Pcm {
        channels: spec.channels,
        sample_rate: spec.sample_rate,
        samples,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use hound::{WavSpec, WavWriter};
    use rstest::rstest;

    /// A mono 16-bit WAV holding `samples`.
    pub(crate) fn wav_fixture(sample_rate: u32, samples: &[i16]) -> Vec<u8> {
        let spec = WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut out = Cursor::new(Vec::new());
        let mut writer = WavWriter::new(&mut out, spec).unwrap();
        for sample in samples {
            writer.write_sample(*sample).unwrap();
        }
        writer.finalize().unwrap();
        out.into_inner()
    }

    #[test]
    fn decodes_wav_to_pcm() {
        let audio = decode(&wav_fixture(8_000, &[0, 1_000, -1_000, i16::MAX])).unwrap();
        let pcm = audio.as_pcm().unwrap();
        assert_eq!(pcm.channels(), 1);
        assert_eq!(pcm.sample_rate(), 8_000);
        assert_eq!(
            pcm.samples(),
            &Samples::Int {
                bits: 16,
                data: vec![0, 1_000, -1_000, i32::from(i16::MAX)]
            }
        );
        assert_eq!(pcm.frames(), 4);
    }

    #[test]
    fn wav_duration() {
        let audio = decode(&wav_fixture(4, &[0; 8])).unwrap();
        assert_eq!(audio.duration(), Some(Duration::from_secs(2)));
    }

    #[test]
    fn decodes_float_wav() {
        let spec = WavSpec {
            channels: 2,
            sample_rate: 44_100,
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        };
        let mut out = Cursor::new(Vec::new());
        let mut writer = WavWriter::new(&mut out, spec).unwrap();
        for sample in [0.5f32, -0.5, 0.25, -0.25] {
            writer.write_sample(sample).unwrap();
        }
        writer.finalize().unwrap();

        let audio = decode(out.get_ref()).unwrap();
        let pcm = audio.as_pcm().unwrap();
        assert_eq!(pcm.samples(), &Samples::Float(vec![0.5, -0.5, 0.25, -0.25]));
        assert_eq!(pcm.frames(), 2);
    }

    #[rstest]
    #[case(b"OggS\x00\x02rest", EncodedFormat::Ogg)]
    #[case(b"ID3\x04\x00rest", EncodedFormat::Mp3)]
    #[case(b"\xFF\xFB\x90\x00", EncodedFormat::Mp3)]
    fn keeps_compressed_streams_encoded(#[case] bytes: &[u8], #[case] expected: EncodedFormat) {
        match decode(bytes).unwrap() {
            Audio::Encoded { format, data } => {
                assert_eq!(format, expected);
                assert_eq!(data, bytes);
            }
            other => panic!("expected encoded audio, got {other:?}"),
        }
    }

    #[rstest]
    #[case(b"")]
    #[case(b"fLaC\x00")]
    #[case(b"RIFF\x00\x00\x00\x00WAVE")]
    fn rejects_unrecognised_audio(#[case] bytes: &[u8]) {
        assert_eq!(*decode(bytes).unwrap_err(), ErrorKind::Audio);
    }
}
