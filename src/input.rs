//! Stdin line reader.
//!
//! Stdin is read on a blocking task and forwarded over a channel so the
//! chat loop can wait for user input and stream events at the same time.

use std::io::BufRead;

use tokio::sync::mpsc;

/// Handle to the background stdin reader.
pub struct LineReader {
    rx: mpsc::UnboundedReceiver<String>,
}

impl LineReader {
    /// Spawn the reader task. One per process; stdin has a single cursor.
    pub fn spawn() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();

        tokio::task::spawn_blocking(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                let Ok(line) = line else { break };
                if tx.send(line).is_err() {
                    break;
                }
            }
        });

        Self { rx }
    }

    /// Wait for the next line. None when stdin reaches EOF.
    pub async fn next_line(&mut self) -> Option<String> {
        self.rx.recv().await
    }

    #[cfg(test)]
    pub(crate) fn from_channel(rx: mpsc::UnboundedReceiver<String>) -> Self {
        Self { rx }
    }
}
