//! Streaming text-to-speech.
//!
//! Pipeline: the speech planner turns streamed tokens into utterances
//! with pause beats, the piper synthesizer renders them to raw PCM, and
//! the audio player plays the PCM gap-free. A generation
//! counter makes interruption safe: bumping it invalidates every queued
//! action and kills in-flight synthesis.

mod piper;
mod planner;
mod player;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::warn;

use crate::config::TtsConfig;
use planner::{SpeechAction, SpeechPlanner};
use player::AudioPlayer;

/// How long [`TtsClient::drain`] waits for queued audio before giving up.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Error)]
pub enum TtsError {
    #[error("TTS not configured: {0}")]
    NotConfigured(String),

    #[error("piper error: {0}")]
    Piper(String),

    #[error("audio error: {0}")]
    Audio(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Work items for the speech worker, tagged with the generation they
/// belong to so stale items can be skipped after an interrupt.
enum SpeechCommand {
    Speak {
        text: String,
        generation: u64,
    },
    Pause {
        duration: Duration,
        generation: u64,
    },
    /// Acked once every prior command has been processed.
    Flush {
        done: oneshot::Sender<()>,
    },
}

/// High-level TTS client for one chat session.
pub struct TtsClient {
    planner: SpeechPlanner,
    commands: mpsc::UnboundedSender<SpeechCommand>,
    generation: Arc<AtomicU64>,
    player: AudioPlayer,
}

impl TtsClient {
    /// Initialize the full pipeline. Any failure (disabled, piper or voice
    /// model missing, no audio device) returns None so chat mode degrades
    /// to text-only instead of failing.
    pub fn initialize(config: &TtsConfig) -> Option<Self> {
        if !config.enabled {
            return None;
        }

        let synth = match piper::PiperSynth::new(config) {
            Ok(s) => s,
            Err(e) => {
                warn!("TTS disabled: {e}");
                return None;
            }
        };
        let player = match AudioPlayer::spawn(config.sample_rate) {
            Ok(p) => p,
            Err(e) => {
                warn!("TTS disabled: {e}");
                return None;
            }
        };

        let generation = Arc::new(AtomicU64::new(0));
        let (commands, rx) = mpsc::unbounded_channel();
        tokio::spawn(speech_worker(
            rx,
            synth,
            player.clone(),
            Arc::clone(&generation),
        ));

        Some(Self {
            planner: SpeechPlanner::new(),
            commands,
            generation,
            player,
        })
    }

    /// Start a new response: fresh planner, new generation, and any audio
    /// left over from the previous response dropped.
    pub fn begin(&mut self) {
        self.planner = SpeechPlanner::new();
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.player.clear();
    }

    /// Feed a streamed token from the model.
    pub fn feed(&mut self, token: &str) {
        for action in self.planner.feed(token) {
            self.dispatch(action);
        }
    }

    /// Flush whatever the planner is still buffering at end of response.
    pub fn finalize(&mut self) {
        for action in self.planner.finalize() {
            self.dispatch(action);
        }
    }

    /// Wait until queued speech has been synthesized and played (or
    /// interrupted). Call [`TtsClient::finalize`] first.
    pub async fn drain(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self
            .commands
            .send(SpeechCommand::Flush { done: done_tx })
            .is_ok()
        {
            let _ = done_rx.await;
        }
        self.player.wait_until_idle(DRAIN_TIMEOUT).await;
    }

    /// Stop speaking now. Queued actions and audio from the current
    /// generation are discarded; in-flight synthesis is killed.
    pub fn interrupt(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.player.clear();
    }

    /// True while audio is still queued for playback.
    pub fn is_speaking(&self) -> bool {
        self.player.is_active()
    }

    /// Tear down the pipeline. Consumes the client; dropping the command
    /// sender ends the worker task.
    pub fn shutdown(self) {
        self.interrupt();
        self.player.shutdown();
    }

    fn dispatch(&self, action: SpeechAction) {
        let generation = self.generation.load(Ordering::SeqCst);
        let command = match action {
            SpeechAction::Speak(text) => SpeechCommand::Speak { text, generation },
            SpeechAction::Pause(duration) => SpeechCommand::Pause {
                duration,
                generation,
            },
        };
        let _ = self.commands.send(command);
    }
}

async fn speech_worker(
    mut rx: mpsc::UnboundedReceiver<SpeechCommand>,
    synth: piper::PiperSynth,
    player: AudioPlayer,
    generation: Arc<AtomicU64>,
) {
    while let Some(command) = rx.recv().await {
        match command {
            SpeechCommand::Speak {
                text,
                generation: g,
            } => {
                if generation.load(Ordering::SeqCst) != g {
                    continue; // stale, interrupted
                }
                let live = || generation.load(Ordering::SeqCst) == g;
                let sink = |pcm: &[u8]| player.enqueue(pcm);
                if let Err(e) = synth.synthesize(&text, sink, live).await {
                    warn!("speech synthesis failed: {e}");
                }
            }
            SpeechCommand::Pause {
                duration,
                generation: g,
            } => {
                if generation.load(Ordering::SeqCst) == g {
                    tokio::time::sleep(duration).await;
                }
            }
            SpeechCommand::Flush { done } => {
                let _ = done.send(());
            }
        }
    }
}
