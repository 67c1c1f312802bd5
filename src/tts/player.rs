//! Interrupt-safe PCM playback.
//!
//! A dedicated thread owns the cpal output stream (cpal streams are not
//! `Send`); the audio callback drains a queue shared with the rest of the
//! program. Underrun plays silence, so playback is gap-free no matter how
//! bursty synthesis is.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{BufferSize, SampleRate, StreamConfig};
use tracing::{debug, warn};

use super::TtsError;

/// Queue of f32 samples shared between producers and the audio callback.
#[derive(Debug, Default)]
pub(crate) struct PcmBuffer {
    samples: VecDeque<f32>,
}

impl PcmBuffer {
    /// Append raw little-endian 16-bit PCM.
    ///
    /// A trailing odd byte (a sample split across chunks never happens
    /// with piper's output, but guard anyway) is dropped.
    pub fn push_pcm16(&mut self, bytes: &[u8]) {
        for pair in bytes.chunks_exact(2) {
            let sample = i16::from_le_bytes([pair[0], pair[1]]);
            self.samples.push_back(f32::from(sample) / 32768.0);
        }
    }

    /// Fill an output block, zero-padding on underrun. Returns how many
    /// real samples were written.
    pub fn fill(&mut self, out: &mut [f32]) -> usize {
        let mut written = 0;
        for slot in out.iter_mut() {
            match self.samples.pop_front() {
                Some(s) => {
                    *slot = s;
                    written += 1;
                }
                None => *slot = 0.0,
            }
        }
        written
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Handle to the playback thread. Cheap to clone and share.
#[derive(Clone)]
pub struct AudioPlayer {
    buffer: Arc<Mutex<PcmBuffer>>,
    shutdown: Arc<AtomicBool>,
}

impl AudioPlayer {
    /// Open the default output device and start the stream.
    ///
    /// Fails when there is no output device or the device rejects the
    /// mono stream at the requested rate; callers degrade to text-only.
    pub fn spawn(sample_rate: u32) -> Result<Self, TtsError> {
        let buffer = Arc::new(Mutex::new(PcmBuffer::default()));
        let shutdown = Arc::new(AtomicBool::new(false));

        let (ready_tx, ready_rx) = crossbeam_channel::bounded::<Result<(), TtsError>>(1);
        let thread_buffer = Arc::clone(&buffer);
        let thread_shutdown = Arc::clone(&shutdown);

        std::thread::Builder::new()
            .name("audio-player".to_string())
            .spawn(move || {
                playback_thread(sample_rate, thread_buffer, thread_shutdown, ready_tx);
            })
            .map_err(|e| TtsError::Audio(format!("failed to spawn playback thread: {e}")))?;

        ready_rx
            .recv()
            .map_err(|_| TtsError::Audio("playback thread died during startup".to_string()))??;

        Ok(Self { buffer, shutdown })
    }

    /// Queue raw 16-bit PCM for playback. Non-blocking.
    pub fn enqueue(&self, pcm: &[u8]) {
        if let Ok(mut buffer) = self.buffer.lock() {
            buffer.push_pcm16(pcm);
        }
    }

    /// Drop all queued audio immediately.
    pub fn clear(&self) {
        if let Ok(mut buffer) = self.buffer.lock() {
            buffer.clear();
        }
    }

    /// True while queued audio remains to be played.
    pub fn is_active(&self) -> bool {
        self.buffer.lock().map(|b| !b.is_empty()).unwrap_or(false)
    }

    fn queued_samples(&self) -> usize {
        self.buffer.lock().map(|b| b.len()).unwrap_or(0)
    }

    /// Wait until the queue drains or the timeout elapses.
    pub async fn wait_until_idle(&self, timeout: Duration) {
        let start = Instant::now();
        while self.is_active() {
            if start.elapsed() > timeout {
                warn!(
                    queued = self.queued_samples(),
                    "audio queue did not drain within {timeout:?}"
                );
                return;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        // Let the last callback block play out.
        tokio::time::sleep(Duration::from_millis(200)).await;
    }

    /// Stop the playback thread. Queued audio is discarded.
    pub fn shutdown(&self) {
        self.clear();
        self.shutdown.store(true, Ordering::Release);
    }
}

fn playback_thread(
    sample_rate: u32,
    buffer: Arc<Mutex<PcmBuffer>>,
    shutdown: Arc<AtomicBool>,
    ready_tx: crossbeam_channel::Sender<Result<(), TtsError>>,
) {
    let result = build_stream(sample_rate, &buffer);

    let stream = match result {
        Ok(stream) => {
            let _ = ready_tx.send(Ok(()));
            stream
        }
        Err(e) => {
            let _ = ready_tx.send(Err(e));
            return;
        }
    };

    // The stream plays via its callback until the handle asks us to stop.
    while !shutdown.load(Ordering::Acquire) {
        std::thread::sleep(Duration::from_millis(100));
    }
    drop(stream);
    debug!("playback thread stopped");
}

fn build_stream(
    sample_rate: u32,
    buffer: &Arc<Mutex<PcmBuffer>>,
) -> Result<cpal::Stream, TtsError> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| TtsError::Audio("no audio output device available".to_string()))?;

    let device_name = device.name().unwrap_or_else(|_| "unknown".to_string());
    debug!("audio output device: {device_name} @ {sample_rate} Hz");

    let config = StreamConfig {
        channels: 1,
        sample_rate: SampleRate(sample_rate),
        buffer_size: BufferSize::Default,
    };

    let callback_buffer = Arc::clone(buffer);
    let stream = device
        .build_output_stream(
            &config,
            move |data: &mut [f32], _| {
                if let Ok(mut pcm) = callback_buffer.lock() {
                    pcm.fill(data);
                } else {
                    data.fill(0.0);
                }
            },
            |e| warn!("audio stream error: {e}"),
            None,
        )
        .map_err(|e| TtsError::Audio(format!("failed to build output stream: {e}")))?;

    stream
        .play()
        .map_err(|e| TtsError::Audio(format!("failed to start output stream: {e}")))?;

    Ok(stream)
}
