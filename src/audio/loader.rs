// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

//! Clip decoding. Door chimes are short, so clips are decoded entirely into memory.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use rubato::{
    SincFixedIn, SincInterpolationParameters, SincInterpolationType, VecResampler, WindowFunction,
};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::default::{get_codecs, get_probe};
use tracing::{debug, info, warn};

use super::AudioError;

/// Input block size for the sinc resampler.
const INPUT_BLOCK_SIZE: usize = 1024;
/// Length of the sinc filter, also the amount of silence used to flush the resampler.
const SINC_LEN: usize = 256;

/// A decoded clip. The sample data is shared so cached clips are cheap to hand out.
#[derive(Clone, Debug)]
pub struct LoadedClip {
    /// Interleaved f32 samples.
    data: Arc<Vec<f32>>,
    /// Number of channels in the data.
    channel_count: u16,
    /// Sample rate of the data.
    sample_rate: u32,
}

impl LoadedClip {
    pub fn new(data: Vec<f32>, channel_count: u16, sample_rate: u32) -> LoadedClip {
        LoadedClip {
            data: Arc::new(data),
            channel_count,
            sample_rate,
        }
    }

    pub fn samples(&self) -> &[f32] {
        &self.data
    }

    pub fn channel_count(&self) -> u16 {
        self.channel_count
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of frames (samples per channel).
    pub fn frames(&self) -> usize {
        if self.channel_count == 0 {
            return 0;
        }
        self.data.len() / self.channel_count as usize
    }

    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.frames() as f64 / self.sample_rate as f64)
    }

    /// Converts the clip to the given channel count and sample rate. Channels are mapped
    /// round robin (mono is duplicated onto every output channel) and the sample rate is
    /// converted with a band-limited sinc resampler.
    pub fn adapt(&self, channel_count: u16, sample_rate: u32) -> Result<LoadedClip, AudioError> {
        if channel_count == self.channel_count && sample_rate == self.sample_rate {
            return Ok(self.clone());
        }

        let source_channels = self.channel_count as usize;
        let target_channels = channel_count as usize;
        let frames = self.frames();
        if source_channels == 0 || target_channels == 0 || frames == 0 || sample_rate == 0 {
            return Ok(LoadedClip::new(Vec::new(), channel_count, sample_rate));
        }

        let planar: Vec<Vec<f32>> = (0..target_channels)
            .map(|channel| {
                let source_channel = channel % source_channels;
                self.data
                    .iter()
                    .skip(source_channel)
                    .step_by(source_channels)
                    .copied()
                    .collect()
            })
            .collect();

        let planar = if sample_rate == self.sample_rate {
            planar
        } else {
            resample(planar, self.sample_rate, sample_rate)?
        };

        let output_frames = planar.first().map(|c| c.len()).unwrap_or(0);
        let mut output = Vec::with_capacity(output_frames * target_channels);
        for frame in 0..output_frames {
            for channel in &planar {
                output.push(channel[frame]);
            }
        }

        Ok(LoadedClip::new(output, channel_count, sample_rate))
    }
}

/// Resamples planar audio in fixed input blocks. The input is padded with silence so the
/// resampler's delay line drains the tail of the clip.
fn resample(
    mut planar: Vec<Vec<f32>>,
    source_rate: u32,
    target_rate: u32,
) -> Result<Vec<Vec<f32>>, AudioError> {
    let channels = planar.len();
    let resampling_failed = |_| AudioError::Resample(source_rate, target_rate);

    let sinc_params = SincInterpolationParameters {
        sinc_len: SINC_LEN,
        f_cutoff: 0.95,
        oversampling_factor: 128,
        interpolation: SincInterpolationType::Linear,
        window: WindowFunction::BlackmanHarris2,
    };
    let ratio = target_rate as f64 / source_rate as f64;
    let mut resampler =
        SincFixedIn::<f32>::new(ratio, 1.0, sinc_params, INPUT_BLOCK_SIZE, channels)
            .map_err(|_e| AudioError::Resample(source_rate, target_rate))?;

    for channel in planar.iter_mut() {
        channel.resize(channel.len() + SINC_LEN, 0.0);
    }

    let total_frames = planar.first().map(|c| c.len()).unwrap_or(0);
    let mut output: Vec<Vec<f32>> = vec![Vec::new(); channels];
    let mut scratch = resampler.output_buffer_allocate(true);
    let mut position = 0;

    loop {
        let needed = resampler.input_frames_next();
        let end = (position + needed).min(total_frames);
        let block: Vec<Vec<f32>> = planar
            .iter()
            .map(|channel| channel[position..end].to_vec())
            .collect();

        let (consumed, produced) = if end - position == needed {
            resampler
                .process_into_buffer(&block, &mut scratch, None)
                .map_err(resampling_failed)?
        } else {
            if end == position {
                break;
            }
            resampler
                .process_partial_into_buffer(Some(&block as &[Vec<f32>]), &mut scratch, None)
                .map_err(resampling_failed)?
        };

        for (channel, resampled) in output.iter_mut().zip(scratch.iter()) {
            channel.extend_from_slice(&resampled[..produced]);
        }
        if consumed == 0 || end == total_frames {
            break;
        }
        position += consumed;
    }

    debug!(
        source_rate,
        target_rate,
        frames = output.first().map(|c| c.len()).unwrap_or(0),
        "Clip resampled."
    );
    Ok(output)
}

/// Opens the file and probes its container format.
fn probe(path: &Path) -> Result<Box<dyn FormatReader>, AudioError> {
    let file = File::open(path)
        .map_err(|e| io::Error::new(e.kind(), format!("{}: {}", path.display(), e)))?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(extension) = path.extension().and_then(|ext| ext.to_str()) {
        hint.with_extension(extension);
    }

    let probed = get_probe().format(
        &hint,
        mss,
        &FormatOptions::default(),
        &MetadataOptions::default(),
    )?;
    Ok(probed.format)
}

/// Decodes the whole file into memory.
pub fn decode(path: &Path) -> Result<LoadedClip, AudioError> {
    info!(path = ?path, "Decoding clip.");

    let mut format_reader = probe(path)?;
    let track = format_reader
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| AudioError::NoTrack(PathBuf::from(path)))?;
    let track_id = track.id;
    let params = track.codec_params.clone();

    let mut decoder = get_codecs().make(&params, &DecoderOptions::default())?;
    let mut channel_count = params.channels.map(|c| c.count() as u16).unwrap_or(0);
    let mut sample_rate = params.sample_rate.unwrap_or(0);
    let mut samples: Vec<f32> = Vec::new();

    loop {
        let packet = match format_reader.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == io::ErrorKind::UnexpectedEof => break,
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(e.into()),
        };
        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(e)) => {
                // Corrupt packets are skipped, the rest of the clip is still usable.
                warn!(path = ?path, err = e, "Skipping undecodable packet.");
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        let spec = *decoded.spec();
        channel_count = spec.channels.count() as u16;
        sample_rate = spec.rate;

        let mut buffer = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
        buffer.copy_interleaved_ref(decoded);
        samples.extend_from_slice(buffer.samples());
    }

    if channel_count == 0 || sample_rate == 0 {
        return Err(AudioError::NoTrack(PathBuf::from(path)));
    }

    let clip = LoadedClip::new(samples, channel_count, sample_rate);
    debug!(
        path = ?path,
        channels = channel_count,
        sample_rate,
        duration_ms = clip.duration().as_millis() as u64,
        "Clip decoded."
    );
    Ok(clip)
}

/// Returns the length of the clip. Uses the container metadata when present and falls back
/// to decoding the whole file.
pub fn probe_length(path: &Path) -> Result<Duration, AudioError> {
    let format_reader = probe(path)?;
    let params = format_reader
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .map(|t| t.codec_params.clone())
        .ok_or_else(|| AudioError::NoTrack(PathBuf::from(path)))?;

    match (params.n_frames, params.sample_rate) {
        (Some(n_frames), Some(sample_rate)) if sample_rate > 0 => Ok(Duration::from_secs_f64(
            n_frames as f64 / sample_rate as f64,
        )),
        _ => Ok(decode(path)?.duration()),
    }
}
