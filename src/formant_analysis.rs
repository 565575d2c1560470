use std::f64::consts::PI;
use std::path::Path;

use rustfft::num_complex::Complex;
use rustfft::FftPlanner;

use crate::app_config::FormantConfig;
use crate::errors::ProcessingError;

// @module: Audio loading and LPC formant estimation

/// Candidates closer than this to 0 Hz or to the ceiling are discarded
const CANDIDATE_FLOOR_HZ: f64 = 50.0;
/// Candidates wider than this bandwidth are not formants
const BANDWIDTH_MAX_HZ: f64 = 1000.0;
/// Root polishing iterations
const ROOT_MAX_ITER: usize = 60;
/// Root polishing convergence tolerance
const ROOT_TOLERANCE: f64 = 1e-8;

/// Query interface over the formant structure of one audio file.
///
/// `formant` is 1-based (1 = F1). Implementations answer with the frequency
/// in Hz at the given time, `NaN` when the formant is undefined there, or
/// `QueryOutOfRange` when the time lies outside the analyzable range.
pub trait FormantSource {
    /// Frequency of the `formant`-th formant at `time` seconds
    fn value_at(&self, formant: usize, time: f64) -> Result<f64, ProcessingError>;
}

/// A mono waveform held in memory.
#[derive(Debug, Clone)]
pub struct Sound {
    samples: Vec<f64>,
    sample_rate: f64,
}

impl Sound {
    /// Wraps raw samples at the given rate
    pub fn new(samples: Vec<f64>, sample_rate: f64) -> Result<Self, ProcessingError> {
        if samples.is_empty() {
            return Err(ProcessingError::Audio("empty audio signal".to_string()));
        }
        if !(sample_rate > 0.0) {
            return Err(ProcessingError::Audio(format!(
                "invalid sample rate: {sample_rate}"
            )));
        }
        Ok(Sound { samples, sample_rate })
    }

    /// Load a waveform from a wav file, averaging channels to mono and
    /// normalizing integer formats to `[-1, 1]`.
    pub fn from_wav_file<P: AsRef<Path>>(path: P) -> Result<Self, ProcessingError> {
        let mut reader = hound::WavReader::open(path.as_ref())?;
        let spec = reader.spec();
        let channels = spec.channels as usize;

        let interleaved: Vec<f64> = match spec.sample_format {
            hound::SampleFormat::Float => reader
                .samples::<f32>()
                .map(|s| s.map(|v| v as f64))
                .collect::<Result<_, _>>()?,
            hound::SampleFormat::Int => {
                let scale = (1i64 << (spec.bits_per_sample - 1)) as f64;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|v| v as f64 / scale))
                    .collect::<Result<_, _>>()?
            }
        };

        let samples: Vec<f64> = interleaved
            .chunks(channels.max(1))
            .map(|frame| frame.iter().sum::<f64>() / frame.len() as f64)
            .collect();

        Sound::new(samples, spec.sample_rate as f64)
    }

    /// Sample rate in Hz
    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Signal duration in seconds
    pub fn duration(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate
    }

    /// Band-limited resample of the whole signal to `target_rate` via FFT
    /// bin mapping.
    pub fn resampled(&self, target_rate: f64) -> Sound {
        let in_len = self.samples.len();
        let out_len = ((in_len as f64) * target_rate / self.sample_rate).round() as usize;
        if out_len == 0 || out_len == in_len {
            return self.clone();
        }

        let mut planner = FftPlanner::<f64>::new();
        let fft = planner.plan_fft_forward(in_len);
        let ifft = planner.plan_fft_inverse(out_len);

        let mut spectrum: Vec<Complex<f64>> = self
            .samples
            .iter()
            .map(|&s| Complex::new(s, 0.0))
            .collect();
        fft.process(&mut spectrum);

        let mut out = vec![Complex::new(0.0, 0.0); out_len];
        let in_half = in_len / 2;
        let out_half = out_len / 2;
        let k_max = in_half.min(out_half);

        out[0] = spectrum[0];
        for k in 1..=k_max {
            out[k] = spectrum[k];
            out[out_len - k] = spectrum[in_len - k];
        }
        if in_len % 2 == 0 && out_len % 2 == 0 && k_max == out_half {
            out[out_half] = spectrum[in_half];
        }
        ifft.process(&mut out);

        let scale = 1.0 / (in_len as f64);
        let samples = out.iter().map(|c| c.re * scale).collect();
        Sound { samples, sample_rate: target_rate }
    }

    /// Estimate formants over the whole signal with Burg's method.
    ///
    /// The signal is resampled to twice the formant ceiling, pre-emphasized
    /// above the configured corner frequency, and analyzed in Hamming-
    /// windowed frames whose centers lie symmetric about the signal middle.
    pub fn to_formant_burg(&self, cfg: &FormantConfig) -> Result<FormantTrack, ProcessingError> {
        let target_rate = 2.0 * cfg.max_formant_hz;
        let sound = if self.sample_rate > target_rate {
            self.resampled(target_rate)
        } else {
            self.clone()
        };
        let fs = sound.sample_rate;
        let duration = self.duration();

        let mut x = sound.samples;
        pre_emphasize(&mut x, cfg.pre_emphasis_from, fs);

        let order = 2 * cfg.max_formants;
        let window_samples = (cfg.window_length * fs).round() as usize;
        if window_samples <= order + 2 {
            return Err(ProcessingError::Audio(format!(
                "analysis window of {window_samples} samples is too short for LPC order {order}"
            )));
        }
        if x.len() < window_samples {
            return Err(ProcessingError::Audio(
                "audio is shorter than one analysis window".to_string(),
            ));
        }

        let step = cfg.effective_time_step();
        let num_frames = (((duration - cfg.window_length) / step).floor() as usize) + 1;
        let t1 = (duration - (num_frames - 1) as f64 * step) / 2.0;
        let window = hamming_window(window_samples);

        let mut frames = Vec::with_capacity(num_frames);
        let mut frame_buf = vec![0.0f64; window_samples];
        for i in 0..num_frames {
            let center = t1 + i as f64 * step;
            let start = ((center - cfg.window_length / 2.0) * fs).round().max(0.0) as usize;
            let start = start.min(x.len() - window_samples);
            for (j, w) in window.iter().enumerate() {
                frame_buf[j] = x[start + j] * w;
            }

            let formants = match burg_coefficients(&frame_buf, order) {
                Some(coeffs) => candidate_formants(&coeffs, fs, cfg),
                None => Vec::new(),
            };
            frames.push(FormantFrame { time: center, formants });
        }

        Ok(FormantTrack {
            tmin: 0.0,
            tmax: duration,
            t1,
            dt: step,
            frames,
        })
    }
}

/// One formant candidate within a frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FormantPoint {
    /// Center frequency in Hz
    pub frequency: f64,
    /// Bandwidth in Hz
    pub bandwidth: f64,
}

/// Formant candidates of one analysis frame, sorted by frequency.
#[derive(Debug, Clone, PartialEq)]
pub struct FormantFrame {
    /// Frame center time in seconds
    pub time: f64,
    /// Ascending formant candidates; may be empty for degenerate frames
    pub formants: Vec<FormantPoint>,
}

/// Formant structure of one audio file, queryable at arbitrary times
/// within the audio's range.
#[derive(Debug, Clone)]
pub struct FormantTrack {
    tmin: f64,
    tmax: f64,
    t1: f64,
    dt: f64,
    frames: Vec<FormantFrame>,
}

impl FormantTrack {
    /// Number of analysis frames
    pub fn num_frames(&self) -> usize {
        self.frames.len()
    }

    /// The analysis frames, in time order
    pub fn frames(&self) -> &[FormantFrame] {
        &self.frames
    }

    /// Analyzable time range in seconds
    pub fn time_range(&self) -> (f64, f64) {
        (self.tmin, self.tmax)
    }

    fn frame_frequency(&self, frame: usize, formant: usize) -> Option<f64> {
        self.frames
            .get(frame)
            .and_then(|f| f.formants.get(formant - 1))
            .map(|p| p.frequency)
    }

    /// Frequency of the `formant`-th formant at `time`, interpolated
    /// linearly between the two covering frames.
    pub fn frequency_at(&self, formant: usize, time: f64) -> Result<f64, ProcessingError> {
        if formant == 0 {
            return Err(ProcessingError::Audio(
                "formant index is 1-based".to_string(),
            ));
        }
        if !(time >= self.tmin && time <= self.tmax) {
            return Err(ProcessingError::QueryOutOfRange {
                time,
                tmin: self.tmin,
                tmax: self.tmax,
            });
        }

        let last = self.frames.len() - 1;
        let pos = ((time - self.t1) / self.dt).clamp(0.0, last as f64);
        let i0 = pos.floor() as usize;
        let i1 = (i0 + 1).min(last);
        let weight = pos - i0 as f64;

        let value = match (self.frame_frequency(i0, formant), self.frame_frequency(i1, formant)) {
            (Some(a), Some(b)) => a + (b - a) * weight,
            (Some(a), None) => a,
            (None, Some(b)) => b,
            (None, None) => f64::NAN,
        };
        Ok(value)
    }
}

impl FormantSource for FormantTrack {
    fn value_at(&self, formant: usize, time: f64) -> Result<f64, ProcessingError> {
        self.frequency_at(formant, time)
    }
}

/// First-difference pre-emphasis above `corner_hz`
fn pre_emphasize(x: &mut [f64], corner_hz: f64, sample_rate: f64) {
    if corner_hz <= 0.0 {
        return;
    }
    let alpha = (-2.0 * PI * corner_hz / sample_rate).exp();
    for i in (1..x.len()).rev() {
        x[i] -= alpha * x[i - 1];
    }
}

fn hamming_window(n: usize) -> Vec<f64> {
    let mut w = Vec::with_capacity(n);
    for i in 0..n {
        let val = 0.54 - 0.46 * ((2.0 * PI * i as f64) / (n as f64 - 1.0)).cos();
        w.push(val);
    }
    w
}

/// Burg's recursion: LPC coefficients `a[0..=order]` (with `a[0] = 1`) for
/// one windowed frame, or `None` when the recursion degenerates (silence,
/// numerically unstable frame).
fn burg_coefficients(x: &[f64], order: usize) -> Option<Vec<f64>> {
    let n = x.len();
    if n <= order + 1 {
        return None;
    }

    let mut f = x.to_vec();
    let mut b = x.to_vec();
    let mut a = vec![0.0f64; order + 1];
    a[0] = 1.0;

    let mut dk = 0.0;
    for &v in x {
        dk += 2.0 * v * v;
    }
    dk -= x[0] * x[0] + x[n - 1] * x[n - 1];
    if dk <= 0.0 {
        return None;
    }

    for k in 0..order {
        let mut mu = 0.0;
        for i in 0..n - k - 1 {
            mu += f[i + k + 1] * b[i];
        }
        let mu = -2.0 * mu / dk;
        if !mu.is_finite() {
            return None;
        }

        // symmetric in-place update of the coefficient vector
        for i in 0..=(k + 1) / 2 {
            let t1 = a[i] + mu * a[k + 1 - i];
            let t2 = a[k + 1 - i] + mu * a[i];
            a[i] = t1;
            a[k + 1 - i] = t2;
        }

        for i in 0..n - k - 1 {
            let t1 = f[i + k + 1] + mu * b[i];
            let t2 = b[i] + mu * f[i + k + 1];
            f[i + k + 1] = t1;
            b[i] = t2;
        }

        dk = (1.0 - mu * mu) * dk - f[k + 1] * f[k + 1] - b[n - k - 2] * b[n - k - 2];
        if dk <= 0.0 {
            return None;
        }
    }

    Some(a)
}

/// Map the LPC polynomial's in-circle roots to formant candidates.
fn candidate_formants(a: &[f64], sample_rate: f64, cfg: &FormantConfig) -> Vec<FormantPoint> {
    if a.len() < 2 || a[0].abs() < 1e-12 {
        return Vec::new();
    }

    let roots = durand_kerner_roots(a, ROOT_MAX_ITER, ROOT_TOLERANCE);
    let mut formants = Vec::new();
    for z in roots.iter() {
        let r = z.norm();
        if r >= 1.0 || z.im <= 0.0 {
            continue;
        }
        let frequency = z.arg() * sample_rate / (2.0 * PI);
        let bandwidth = -sample_rate / PI * r.ln();
        if frequency > CANDIDATE_FLOOR_HZ
            && frequency < cfg.max_formant_hz - CANDIDATE_FLOOR_HZ
            && bandwidth < BANDWIDTH_MAX_HZ
        {
            formants.push(FormantPoint { frequency, bandwidth });
        }
    }
    formants.sort_by(|p, q| p.frequency.partial_cmp(&q.frequency).unwrap());
    formants.truncate(cfg.max_formants);
    formants
}

fn durand_kerner_roots(a: &[f64], max_iter: usize, tol: f64) -> Vec<Complex<f64>> {
    let n = a.len().saturating_sub(1);
    if n == 0 {
        return Vec::new();
    }

    let radius = 0.9;
    let two_pi = 2.0 * PI;
    let mut roots: Vec<Complex<f64>> = (0..n)
        .map(|k| {
            let theta = two_pi * (k as f64) / (n as f64);
            Complex::new(radius * theta.cos(), radius * theta.sin())
        })
        .collect();

    for _ in 0..max_iter {
        let mut converged = true;
        for i in 0..n {
            let mut denom = Complex::new(1.0, 0.0);
            for j in 0..n {
                if i != j {
                    denom *= roots[i] - roots[j];
                }
            }
            let p = poly_eval(a, roots[i]);
            let delta = if denom.norm() < 1e-12 {
                Complex::new(1e-6, 1e-6)
            } else {
                p / denom
            };
            let next = roots[i] - delta;
            if (next - roots[i]).norm() > tol {
                converged = false;
            }
            roots[i] = next;
        }
        if converged {
            break;
        }
    }

    roots
}

fn poly_eval(a: &[f64], z: Complex<f64>) -> Complex<f64> {
    let mut acc = Complex::new(a[0], 0.0);
    for &coef in &a[1..] {
        acc = acc * z + Complex::new(coef, 0.0);
    }
    acc
}
