//! Piper subprocess synthesis.
//!
//! One subprocess per utterance: the text goes to piper's stdin, stdin is
//! closed, and raw 16-bit PCM is streamed off stdout until EOF. Per-
//! utterance processes give clean framing and let an interrupt kill
//! synthesis mid-stream.

use std::path::PathBuf;
use std::process::Stdio;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tracing::warn;

use super::TtsError;
use crate::config::TtsConfig;

const PCM_CHUNK: usize = 4096;

#[derive(Debug)]
pub struct PiperSynth {
    piper_bin: PathBuf,
    voice_model: PathBuf,
}

impl PiperSynth {
    /// Validate the configured paths.
    pub fn new(config: &TtsConfig) -> Result<Self, TtsError> {
        let voice_model = config
            .voice_model
            .clone()
            .ok_or_else(|| TtsError::NotConfigured("no piper voice model configured".into()))?;
        if !voice_model.exists() {
            return Err(TtsError::NotConfigured(format!(
                "voice model not found: {}",
                voice_model.display()
            )));
        }

        let piper_bin = config
            .piper_bin
            .clone()
            .unwrap_or_else(|| PathBuf::from("piper"));
        // An explicit path must exist; a bare name is resolved via PATH at
        // spawn time.
        if piper_bin.components().count() > 1 && !piper_bin.exists() {
            return Err(TtsError::NotConfigured(format!(
                "piper executable not found: {}",
                piper_bin.display()
            )));
        }

        Ok(Self {
            piper_bin,
            voice_model,
        })
    }

    /// Synthesize one utterance, feeding PCM chunks to `sink` as they
    /// arrive. Stops (and kills piper) as soon as `live()` turns false.
    pub async fn synthesize(
        &self,
        text: &str,
        mut sink: impl FnMut(&[u8]),
        live: impl Fn() -> bool,
    ) -> Result<(), TtsError> {
        let mut child = Command::new(&self.piper_bin)
            .arg("--model")
            .arg(&self.voice_model)
            .arg("--output-raw")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| TtsError::Piper(format!("failed to spawn piper: {e}")))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| TtsError::Piper("piper stdin unavailable".into()))?;
        stdin.write_all(text.as_bytes()).await?;
        stdin.write_all(b"\n").await?;
        drop(stdin); // EOF tells piper the utterance is complete

        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| TtsError::Piper("piper stdout unavailable".into()))?;

        let mut buf = [0u8; PCM_CHUNK];
        loop {
            let n = stdout.read(&mut buf).await?;
            if n == 0 {
                break;
            }
            if !live() {
                let _ = child.start_kill();
                break;
            }
            sink(&buf[..n]);
        }

        let status = child.wait().await?;
        if !status.success() && live() {
            warn!("piper exited with {status}");
        }
        Ok(())
    }
}
