//! Mel-frequency cepstral coefficients with librosa's default recipe.
//!
//! Centered STFT with zero padding and a periodic Hann window, power
//! spectrogram, Slaney-style mel filterbank with area normalization,
//! `power_to_db` clipped to `top_db` below the peak, orthonormal DCT-II.

use std::f64::consts::PI;
use std::sync::Arc;

use ndarray::{Array1, Array2, Axis};
use realfft::{RealFftPlanner, RealToComplex};
use serde::{Deserialize, Serialize};

use crate::AudioError;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct MfccConfig {
    pub sample_rate: u32,
    pub n_fft: usize,
    pub hop_length: usize,
    pub n_mels: usize,
    pub n_mfcc: usize,
    pub fmin: f64,
    pub fmax: Option<f64>,
    pub amin: f64,
    pub top_db: Option<f64>,
}

impl Default for MfccConfig {
    fn default() -> Self {
        Self {
            sample_rate: 22_050,
            n_fft: 2048,
            hop_length: 512,
            n_mels: 128,
            n_mfcc: 40,
            fmin: 0.0,
            fmax: None,
            amin: 1e-10,
            top_db: Some(80.0),
        }
    }
}

pub struct MfccExtractor {
    config: MfccConfig,
    fft: Arc<dyn RealToComplex<f64>>,
    window: Vec<f64>,
    mel_filterbank: Vec<Vec<f64>>,
    dct: Vec<Vec<f64>>,
}

impl MfccExtractor {
    pub fn new(config: MfccConfig) -> Result<Self, AudioError> {
        if config.n_fft == 0 || config.hop_length == 0 || config.n_mels == 0 {
            return Err(AudioError::InvalidInput(
                "n_fft, hop_length and n_mels must be positive".into(),
            ));
        }
        if config.n_mfcc == 0 || config.n_mfcc > config.n_mels {
            return Err(AudioError::InvalidInput(format!(
                "n_mfcc must be within 1..={}",
                config.n_mels
            )));
        }
        let nyquist = config.sample_rate as f64 / 2.0;
        let fmax = config.fmax.unwrap_or(nyquist);
        if !(config.fmin >= 0.0 && config.fmin < fmax) {
            return Err(AudioError::InvalidInput(format!(
                "invalid mel range {}..{}",
                config.fmin, fmax
            )));
        }

        let mut planner = RealFftPlanner::<f64>::new();
        let fft = planner.plan_fft_forward(config.n_fft);
        let window = periodic_hann(config.n_fft);
        let mel_filterbank = slaney_mel_filterbank(
            config.n_mels,
            config.n_fft,
            config.sample_rate as f64,
            config.fmin,
            fmax,
        );
        let dct = orthonormal_dct(config.n_mfcc, config.n_mels);

        Ok(Self {
            config,
            fft,
            window,
            mel_filterbank,
            dct,
        })
    }

    pub fn config(&self) -> &MfccConfig {
        &self.config
    }

    /// Log-power mel spectrogram, shape `(n_mels, frames)`.
    pub fn log_mel_spectrogram(&self, samples: &[f32]) -> Result<Array2<f64>, AudioError> {
        if samples.is_empty() {
            return Err(AudioError::InvalidInput("empty audio signal".into()));
        }
        let n_fft = self.config.n_fft;
        let pad = n_fft / 2;
        let mut padded = vec![0.0f64; samples.len() + 2 * pad];
        for (dst, &src) in padded[pad..].iter_mut().zip(samples) {
            *dst = src as f64;
        }
        let n_frames = 1 + (padded.len() - n_fft) / self.config.hop_length;

        let mut mel = Array2::<f64>::zeros((self.config.n_mels, n_frames));
        let mut fft_input = self.fft.make_input_vec();
        let mut fft_output = self.fft.make_output_vec();
        let mut power = vec![0.0f64; fft_output.len()];

        for frame in 0..n_frames {
            let start = frame * self.config.hop_length;
            for ((dst, &sample), &w) in fft_input
                .iter_mut()
                .zip(&padded[start..start + n_fft])
                .zip(&self.window)
            {
                *dst = sample * w;
            }
            self.fft
                .process(&mut fft_input, &mut fft_output)
                .map_err(|e| AudioError::Fft(e.to_string()))?;
            for (p, c) in power.iter_mut().zip(&fft_output) {
                *p = c.re * c.re + c.im * c.im;
            }
            for (band, filter) in self.mel_filterbank.iter().enumerate() {
                mel[[band, frame]] = filter.iter().zip(&power).map(|(f, p)| f * p).sum();
            }
        }

        let amin = self.config.amin;
        mel.mapv_inplace(|v| 10.0 * v.max(amin).log10());
        if let Some(top_db) = self.config.top_db {
            let peak = mel.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let floor = peak - top_db;
            mel.mapv_inplace(|v| v.max(floor));
        }
        Ok(mel)
    }

    /// Cepstral coefficients, shape `(n_mfcc, frames)`.
    pub fn compute(&self, samples: &[f32]) -> Result<Array2<f32>, AudioError> {
        let log_mel = self.log_mel_spectrogram(samples)?;
        let n_frames = log_mel.ncols();
        let mut mfcc = Array2::<f32>::zeros((self.config.n_mfcc, n_frames));
        for (k, basis) in self.dct.iter().enumerate() {
            for (t, column) in log_mel.axis_iter(Axis(1)).enumerate() {
                let value: f64 = basis.iter().zip(column.iter()).map(|(b, v)| b * v).sum();
                mfcc[[k, t]] = value as f32;
            }
        }
        Ok(mfcc)
    }

    pub fn mean_pooled(&self, samples: &[f32]) -> Result<Array1<f32>, AudioError> {
        let mfcc = self.compute(samples)?;
        mfcc.mean_axis(Axis(1))
            .ok_or_else(|| AudioError::InvalidInput("no frames to pool".into()))
    }
}

fn periodic_hann(n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| 0.5 - 0.5 * (2.0 * PI * i as f64 / n as f64).cos())
        .collect()
}

const SLANEY_F_SP: f64 = 200.0 / 3.0;
const SLANEY_MIN_LOG_HZ: f64 = 1000.0;
const SLANEY_MIN_LOG_MEL: f64 = SLANEY_MIN_LOG_HZ / SLANEY_F_SP;

fn slaney_logstep() -> f64 {
    6.4f64.ln() / 27.0
}

pub fn hz_to_mel(hz: f64) -> f64 {
    if hz >= SLANEY_MIN_LOG_HZ {
        SLANEY_MIN_LOG_MEL + (hz / SLANEY_MIN_LOG_HZ).ln() / slaney_logstep()
    } else {
        hz / SLANEY_F_SP
    }
}

pub fn mel_to_hz(mel: f64) -> f64 {
    if mel >= SLANEY_MIN_LOG_MEL {
        SLANEY_MIN_LOG_HZ * (slaney_logstep() * (mel - SLANEY_MIN_LOG_MEL)).exp()
    } else {
        SLANEY_F_SP * mel
    }
}

fn slaney_mel_filterbank(
    n_mels: usize,
    n_fft: usize,
    sample_rate: f64,
    fmin: f64,
    fmax: f64,
) -> Vec<Vec<f64>> {
    let n_bins = n_fft / 2 + 1;
    let fft_freqs: Vec<f64> = (0..n_bins)
        .map(|k| k as f64 * sample_rate / n_fft as f64)
        .collect();

    let mel_min = hz_to_mel(fmin);
    let mel_max = hz_to_mel(fmax);
    let mel_freqs: Vec<f64> = (0..n_mels + 2)
        .map(|i| mel_to_hz(mel_min + (mel_max - mel_min) * i as f64 / (n_mels + 1) as f64))
        .collect();

    (0..n_mels)
        .map(|i| {
            let (left, center, right) = (mel_freqs[i], mel_freqs[i + 1], mel_freqs[i + 2]);
            let enorm = 2.0 / (right - left);
            fft_freqs
                .iter()
                .map(|&f| {
                    let lower = (f - left) / (center - left);
                    let upper = (right - f) / (right - center);
                    lower.min(upper).max(0.0) * enorm
                })
                .collect()
        })
        .collect()
}

fn orthonormal_dct(n_out: usize, n_in: usize) -> Vec<Vec<f64>> {
    let n = n_in as f64;
    (0..n_out)
        .map(|k| {
            let scale = if k == 0 { (1.0 / n).sqrt() } else { (2.0 / n).sqrt() };
            (0..n_in)
                .map(|m| scale * (PI * k as f64 * (2 * m + 1) as f64 / (2.0 * n)).cos())
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn slaney_scale_round_trips_known_points() {
        assert_abs_diff_eq!(hz_to_mel(1000.0), 15.0, epsilon = 1e-9);
        assert_abs_diff_eq!(hz_to_mel(200.0), 3.0, epsilon = 1e-9);
        assert_abs_diff_eq!(mel_to_hz(hz_to_mel(4321.0)), 4321.0, epsilon = 1e-6);
    }

    #[test]
    fn frame_count_matches_centered_stft() {
        let extractor = MfccExtractor::new(MfccConfig::default()).unwrap();
        let mfcc = extractor.compute(&vec![0.0; 66_150]).unwrap();
        assert_eq!(mfcc.dim(), (40, 1 + 66_150 / 512));
    }

    #[test]
    fn silence_has_flat_cepstrum() {
        let extractor = MfccExtractor::new(MfccConfig::default()).unwrap();
        let pooled = extractor.mean_pooled(&vec![0.0; 22_050]).unwrap();
        assert_eq!(pooled.len(), 40);
        assert_abs_diff_eq!(pooled[0], -100.0 * 128f32.sqrt(), epsilon = 1e-2);
        for value in pooled.iter().skip(1) {
            assert_abs_diff_eq!(*value, 0.0, epsilon = 1e-3);
        }
    }

    #[test]
    fn tone_differs_from_silence() {
        let extractor = MfccExtractor::new(MfccConfig::default()).unwrap();
        let tone: Vec<f32> = (0..22_050)
            .map(|i| (2.0 * std::f32::consts::PI * 440.0 * i as f32 / 22_050.0).sin() * 0.5)
            .collect();
        let pooled = extractor.mean_pooled(&tone).unwrap();
        assert!(pooled.iter().all(|v| v.is_finite()));
        assert!(pooled[0] > -100.0 * 128f32.sqrt() + 1.0);
    }

    #[test]
    fn filterbank_rows_are_nonnegative_and_nonempty() {
        let bank = slaney_mel_filterbank(128, 2048, 22_050.0, 0.0, 11_025.0);
        assert_eq!(bank.len(), 128);
        for row in &bank {
            assert_eq!(row.len(), 1025);
            assert!(row.iter().all(|w| *w >= 0.0));
        }
        assert!(bank[64].iter().any(|w| *w > 0.0));
    }

    #[test]
    fn empty_signal_is_rejected() {
        let extractor = MfccExtractor::new(MfccConfig::default()).unwrap();
        assert!(extractor.compute(&[]).is_err());
    }

    #[test]
    fn rejects_more_coefficients_than_bands() {
        let config = MfccConfig {
            n_mfcc: 200,
            ..Default::default()
        };
        assert!(MfccExtractor::new(config).is_err());
    }
}
