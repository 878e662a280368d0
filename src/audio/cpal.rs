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
use std::{
    collections::HashMap,
    fmt,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicU32, Ordering},
        Arc,
    },
    thread,
    time::Duration,
};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use parking_lot::Mutex;
use tracing::{error, info, span, Level};

use super::loader::{self, LoadedClip};
use super::AudioError;
use crate::config;

/// The state shared between the sink and the output callback.
#[derive(Default)]
struct Playback {
    /// The loaded clip, already adapted to the output format.
    clip: Option<LoadedClip>,
    /// The next sample to output.
    position: usize,
    /// Whether the clip is playing.
    playing: bool,
}

impl Playback {
    fn is_busy(&self) -> bool {
        self.playing
            && self
                .clip
                .as_ref()
                .is_some_and(|clip| self.position < clip.samples().len())
    }

    /// Mixes the current clip into the output buffer. The buffer must already be zeroed.
    fn fill(&mut self, output: &mut [f32], volume: f32) {
        if !self.playing {
            return;
        }
        let Some(clip) = self.clip.as_ref() else {
            return;
        };

        let samples = clip.samples();
        let remaining = samples.len().saturating_sub(self.position);
        let count = remaining.min(output.len());
        for (dst, src) in output[..count]
            .iter_mut()
            .zip(&samples[self.position..self.position + count])
        {
            *dst = src * volume;
        }

        self.position += count;
        if self.position >= samples.len() {
            self.playing = false;
        }
    }
}

/// An output device driven by cpal. Clips are decoded up front and cached by path.
pub struct Sink {
    /// The name of the device.
    name: String,
    /// Output channel count.
    channels: u16,
    /// Output sample rate.
    sample_rate: u32,
    /// Shared with the output callback.
    playback: Arc<Mutex<Playback>>,
    /// The volume as f32 bits, shared with the output callback.
    volume: Arc<AtomicU32>,
    /// Decoded clips, adapted to the output format.
    cache: Mutex<HashMap<PathBuf, LoadedClip>>,
    /// Keeps the stream alive.
    _output_thread: thread::JoinHandle<()>,
}

impl fmt::Display for Sink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (Channels={}, Rate={})",
            self.name, self.channels, self.sample_rate
        )
    }
}

/// Builds the output callback for the given sample type.
fn create_callback<T: cpal::SizedSample + cpal::FromSample<f32>>(
    playback: Arc<Mutex<Playback>>,
    volume: Arc<AtomicU32>,
) -> impl FnMut(&mut [T], &cpal::OutputCallbackInfo) + Send + 'static {
    let mut scratch: Vec<f32> = Vec::new();
    move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
        scratch.clear();
        scratch.resize(data.len(), 0.0);

        // Never block the audio thread; a contended lock outputs silence for one period.
        if let Some(mut playback) = playback.try_lock() {
            playback.fill(&mut scratch, f32::from_bits(volume.load(Ordering::Relaxed)));
        }

        for (dst, &src) in data.iter_mut().zip(scratch.iter()) {
            *dst = T::from_sample(src);
        }
    }
}

impl Sink {
    /// Lists the names of the output devices known to cpal.
    pub fn list() -> Result<Vec<String>, AudioError> {
        let mut names = Vec::new();
        for host_id in cpal::available_hosts() {
            let host = cpal::host_from_id(host_id)
                .map_err(|e| AudioError::Device(e.to_string()))?;
            let devices = match host.output_devices() {
                Ok(devices) => devices,
                Err(e) => {
                    error!(
                        err = e.to_string(),
                        host = host_id.name(),
                        "Unable to list devices for host"
                    );
                    continue;
                }
            };

            for device in devices {
                if let Ok(name) = device.name() {
                    names.push(name);
                }
            }
        }

        names.sort();
        names.dedup();
        Ok(names)
    }

    /// Opens the configured output device. "default" selects the host's default output.
    pub fn get(config: &config::Audio) -> Result<Sink, AudioError> {
        let name = config.device().to_string();
        let host = cpal::default_host();
        let device = if name == "default" {
            host.default_output_device()
        } else {
            host.output_devices()
                .map_err(|e| AudioError::Device(e.to_string()))?
                .find(|device| device.name().is_ok_and(|n| n.trim() == name))
        }
        .ok_or_else(|| AudioError::Device(format!("no device found with name {}", name)))?;

        let channels = config.channels();
        let sample_rate = config.sample_rate();
        let sample_format = device
            .default_output_config()
            .map_err(|e| AudioError::Device(e.to_string()))?
            .sample_format();

        let playback = Arc::new(Mutex::new(Playback::default()));
        let volume = Arc::new(AtomicU32::new(1.0f32.to_bits()));

        // cpal streams can't be moved between threads, so the stream lives on its own
        // thread and reports back whether it started.
        let (ready_tx, ready_rx) = crossbeam_channel::bounded::<Result<(), AudioError>>(1);
        let output_thread = {
            let playback = playback.clone();
            let volume = volume.clone();
            let name = name.clone();
            thread::spawn(move || {
                let span = span!(Level::INFO, "audio output", device = name);
                let _enter = span.enter();

                let stream_config = cpal::StreamConfig {
                    channels,
                    sample_rate,
                    buffer_size: cpal::BufferSize::Default,
                };
                let on_error = |err: cpal::StreamError| error!("CPAL output stream error: {}", err);

                let stream_result = match sample_format {
                    cpal::SampleFormat::I16 => device.build_output_stream(
                        &stream_config,
                        create_callback::<i16>(playback, volume),
                        on_error,
                        None,
                    ),
                    cpal::SampleFormat::I32 => device.build_output_stream(
                        &stream_config,
                        create_callback::<i32>(playback, volume),
                        on_error,
                        None,
                    ),
                    _ => device.build_output_stream(
                        &stream_config,
                        create_callback::<f32>(playback, volume),
                        on_error,
                        None,
                    ),
                };

                let stream = match stream_result {
                    Ok(stream) => stream,
                    Err(e) => {
                        let _ = ready_tx.send(Err(AudioError::Device(e.to_string())));
                        return;
                    }
                };
                if let Err(e) = stream.play() {
                    let _ = ready_tx.send(Err(AudioError::Device(e.to_string())));
                    return;
                }

                info!("CPAL output stream started successfully");
                let _ = ready_tx.send(Ok(()));

                // Keep the stream alive for the life of the process.
                loop {
                    thread::park();
                }
            })
        };

        ready_rx
            .recv_timeout(Duration::from_secs(5))
            .map_err(|e| AudioError::Device(format!("output stream never started: {}", e)))??;

        Ok(Sink {
            name,
            channels,
            sample_rate,
            playback,
            volume,
            cache: Mutex::new(HashMap::new()),
            _output_thread: output_thread,
        })
    }

    /// Returns the clip from the cache, decoding it on first use.
    fn cached(&self, file_path: &Path) -> Result<LoadedClip, AudioError> {
        if let Some(clip) = self.cache.lock().get(file_path) {
            return Ok(clip.clone());
        }

        let clip = loader::decode(file_path)?.adapt(self.channels, self.sample_rate)?;
        self.cache
            .lock()
            .insert(file_path.to_path_buf(), clip.clone());
        Ok(clip)
    }
}

impl super::Sink for Sink {
    fn load(&self, file_path: &Path) -> Result<(), AudioError> {
        let clip = self.cached(file_path)?;
        let mut playback = self.playback.lock();
        playback.clip = Some(clip);
        playback.position = 0;
        playback.playing = false;
        Ok(())
    }

    fn play(&self) -> Result<(), AudioError> {
        let mut playback = self.playback.lock();
        if playback.clip.is_none() {
            return Err(AudioError::NothingLoaded);
        }
        playback.position = 0;
        playback.playing = true;
        Ok(())
    }

    fn stop(&self) -> Result<(), AudioError> {
        self.playback.lock().playing = false;
        Ok(())
    }

    fn is_busy(&self) -> bool {
        self.playback.lock().is_busy()
    }

    fn length(&self, file_path: &Path) -> Result<Duration, AudioError> {
        if let Some(clip) = self.cache.lock().get(file_path) {
            return Ok(clip.duration());
        }
        loader::probe_length(file_path)
    }

    fn volume(&self) -> f32 {
        f32::from_bits(self.volume.load(Ordering::Relaxed))
    }

    fn set_volume(&self, volume: f32) {
        self.volume
            .store(volume.clamp(0.0, 1.0).to_bits(), Ordering::Relaxed);
    }
}

#[cfg(test)]
mod test {
    use crate::audio::loader::LoadedClip;

    use super::Playback;

    #[test]
    fn test_playback_fill() {
        let mut playback = Playback {
            clip: Some(LoadedClip::new(vec![1.0, 1.0, 1.0, 1.0, 1.0, 1.0], 2, 44100)),
            position: 0,
            playing: true,
        };
        assert!(playback.is_busy());

        let mut output = vec![0.0f32; 4];
        playback.fill(&mut output, 0.5);
        assert_eq!(vec![0.5, 0.5, 0.5, 0.5], output);
        assert!(playback.is_busy());

        let mut output = vec![0.0f32; 4];
        playback.fill(&mut output, 0.5);
        assert_eq!(vec![0.5, 0.5, 0.0, 0.0], output);
        assert!(!playback.is_busy());
    }

    #[test]
    fn test_playback_stopped_is_silent() {
        let mut playback = Playback {
            clip: Some(LoadedClip::new(vec![1.0; 8], 2, 44100)),
            position: 0,
            playing: false,
        };

        let mut output = vec![0.0f32; 8];
        playback.fill(&mut output, 1.0);
        assert!(output.iter().all(|s| *s == 0.0));
        assert!(!playback.is_busy());
    }
}
