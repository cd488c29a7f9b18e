use std::fs::File;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::debug;

/// Decoded audio with interleaved samples.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioReader {
    pub sample_rate: u32,
    pub channels: u16,
    pub samples: Vec<f32>,
}

impl AudioReader {
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels.max(1) as usize
    }

    /// Averages channels into a single one.
    pub fn to_mono(&self) -> Vec<f32> {
        let channels = self.channels.max(1) as usize;
        if channels == 1 {
            return self.samples.clone();
        }
        self.samples
            .chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect()
    }
}

pub struct AudioDecoder;

impl AudioDecoder {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<AudioReader> {
        Self::open_limited(path, None)
    }

    /// Decodes at most `max_secs` seconds from the start of the stream.
    pub fn open_limited<P: AsRef<Path>>(path: P, max_secs: Option<f32>) -> Result<AudioReader> {
        let path_ref = path.as_ref();
        let file =
            File::open(path_ref).with_context(|| format!("open audio file {:?}", path_ref))?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());
        let mut hint = Hint::new();
        if let Some(ext) = path_ref.extension().and_then(|ext| ext.to_str()) {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .with_context(|| format!("probe audio format {:?}", path_ref))?;
        let mut format = probed.format;
        let track = format
            .default_track()
            .ok_or_else(|| anyhow::anyhow!("no default track found"))?;
        let track_id = track.id;
        let mut decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())?;
        let mut sample_rate = track.codec_params.sample_rate.unwrap_or(48_000);
        let mut channels = track
            .codec_params
            .channels
            .map(|c| c.count() as u16)
            .unwrap_or(1);
        let mut samples = Vec::new();
        let limit = |rate: u32, channels: u16| {
            max_secs.map(|secs| (secs * rate as f32).round() as usize * channels.max(1) as usize)
        };

        loop {
            if let Some(max) = limit(sample_rate, channels) {
                if samples.len() >= max {
                    break;
                }
            }
            match format.next_packet() {
                Ok(packet) => {
                    if packet.track_id() != track_id {
                        continue;
                    }
                    let buffer = match decoder.decode(&packet) {
                        Ok(buffer) => buffer,
                        // skip undecodable packet
                        Err(symphonia::core::errors::Error::DecodeError(_)) => continue,
                        Err(err) => return Err(err.into()),
                    };
                    let spec = *buffer.spec();
                    sample_rate = spec.rate;
                    channels = spec.channels.count() as u16;
                    let mut out = SampleBuffer::<f32>::new(buffer.capacity() as u64, spec);
                    out.copy_interleaved_ref(buffer);
                    samples.extend_from_slice(out.samples());
                }
                Err(err) => {
                    use symphonia::core::errors::Error as SymphError;
                    match err {
                        SymphError::IoError(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                            break;
                        }
                        SymphError::ResetRequired => break,
                        _ => return Err(err.into()),
                    }
                }
            }
        }

        if let Some(max) = limit(sample_rate, channels) {
            samples.truncate(max);
        }
        if samples.is_empty() {
            bail!("no audio samples decoded from {:?}", path_ref);
        }
        debug!(
            sample_rate,
            channels,
            sample_count = samples.len(),
            "decoded audio"
        );

        Ok(AudioReader {
            sample_rate,
            channels,
            samples,
        })
    }
}
