//! Speech planning.
//!
//! Turns the raw token stream from the model into utterance-sized speech
//! actions with natural pause beats. Text is buffered until a newline (or
//! the buffer grows past a limit, to bound latency) and each flushed line
//! becomes a `Speak` action, optionally followed by a `Pause` keyed off
//! its trailing punctuation.

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;

/// Flush the buffer once it grows past this many bytes even without a
/// newline, so long single-line responses don't speak all at once.
const MAX_BUFFER_LEN: usize = 300;

const SENTENCE_PAUSE: Duration = Duration::from_millis(300);
const COMMA_PAUSE: Duration = Duration::from_millis(120);
const ELLIPSIS_PAUSE: Duration = Duration::from_millis(400);
const LAUGH_PAUSE: Duration = Duration::from_millis(150);

static LAUGHTER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(ha(ha)+|lol|lmao)\b").expect("laughter pattern"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechAction {
    Speak(String),
    Pause(Duration),
}

/// Stateful planner; one per response.
#[derive(Debug, Default)]
pub struct SpeechPlanner {
    buffer: String,
}

impl SpeechPlanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a streamed token, returning any actions that became ready.
    pub fn feed(&mut self, token: &str) -> Vec<SpeechAction> {
        self.buffer.push_str(token);

        if self.buffer.contains('\n') {
            return self.flush_lines();
        }
        if self.buffer.len() > MAX_BUFFER_LEN {
            // No newline in sight; flush the whole buffer as one utterance.
            let text = std::mem::take(&mut self.buffer);
            return plan_line(text.trim());
        }

        Vec::new()
    }

    /// Flush whatever remains at end of response.
    pub fn finalize(&mut self) -> Vec<SpeechAction> {
        let text = std::mem::take(&mut self.buffer);
        let text = text.trim();
        if text.is_empty() {
            Vec::new()
        } else {
            vec![SpeechAction::Speak(text.to_string())]
        }
    }

    fn flush_lines(&mut self) -> Vec<SpeechAction> {
        let mut lines: Vec<String> = self.buffer.split('\n').map(str::to_string).collect();
        // The last piece is an unterminated partial line; keep buffering it.
        self.buffer = lines.pop().unwrap_or_default();

        let mut actions = Vec::new();
        for line in lines {
            actions.extend(plan_line(line.trim()));
        }
        actions
    }
}

fn plan_line(text: &str) -> Vec<SpeechAction> {
    if text.is_empty() {
        return Vec::new();
    }

    let mut actions = vec![SpeechAction::Speak(text.to_string())];

    if LAUGHTER.is_match(text) {
        actions.push(SpeechAction::Pause(LAUGH_PAUSE));
    } else if text.ends_with(['.', '!', '?']) {
        actions.push(SpeechAction::Pause(SENTENCE_PAUSE));
    } else if text.ends_with(',') {
        actions.push(SpeechAction::Pause(COMMA_PAUSE));
    } else if text.contains("...") {
        actions.push(SpeechAction::Pause(ELLIPSIS_PAUSE));
    }

    actions
}
