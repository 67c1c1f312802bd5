//! Text chat mode.
//!
//! Reads a line, streams the model's reply to the console (and the TTS
//! pipeline when available), and repeats until an exit keyword. Vendor
//! failures are reported at the prompt; only a missing API key aborts the
//! session before it starts.

use std::io::Write;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::config::Config;
use crate::error::Result;
use crate::input::LineReader;
use crate::provider::{self, NemotronClient, StreamEvent, format_api_error};
use crate::tts::TtsClient;

/// True for the keywords that return to the menu, case-insensitively.
pub fn is_exit_command(input: &str) -> bool {
    matches!(
        input.trim().to_lowercase().as_str(),
        "quit" | "exit" | "bye"
    )
}

/// Run the text chat loop until an exit keyword or EOF.
pub async fn run(config: &Config, lines: &mut LineReader) -> Result<()> {
    // Resolve the key before any request; absence is a config error.
    let api_key = config.api_key()?;
    let client = Arc::new(NemotronClient::new(api_key, config));
    let mut tts = TtsClient::initialize(&config.tts);

    println!("\n=== Text Chat Mode ===");
    println!("Type 'quit', 'exit', or 'bye' to return to the main menu.");
    if tts.is_some() {
        println!("While the assistant is speaking, press ENTER to interrupt.");
    }
    println!("{}", "-".repeat(40));

    loop {
        print!("You: ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await else {
            break;
        };
        let input = line.trim().to_string();

        if input.is_empty() {
            if let Some(t) = &tts
                && t.is_speaking()
            {
                println!("[Interrupted. Stopping audio...]");
                t.interrupt();
            }
            continue;
        }

        if is_exit_command(&input) {
            break;
        }

        if let Err(e) = stream_reply(&client, tts.as_mut(), &input, lines).await {
            println!("{}", format_api_error(&e.to_string()));
            tracing::warn!("chat request failed: {e}");
        }
    }

    if let Some(t) = tts {
        t.shutdown();
    }
    println!("Exited text chat mode.");
    Ok(())
}

/// Stream one reply, printing deltas as they arrive and feeding them to
/// TTS. An empty line typed mid-response interrupts audio playback; the
/// text stream itself keeps printing.
async fn stream_reply(
    client: &Arc<NemotronClient>,
    mut tts: Option<&mut TtsClient>,
    input: &str,
    lines: &mut LineReader,
) -> std::result::Result<(), provider::Error> {
    let (tx, mut rx) = mpsc::channel(64);
    let request = client.chat_request(input);
    let streamer = Arc::clone(client);
    let handle = tokio::spawn(async move { streamer.stream(request, tx).await });

    print!("Assistant: ");
    std::io::stdout().flush().ok();
    if let Some(t) = tts.as_deref_mut() {
        t.begin();
    }

    let mut stream_error = None;
    loop {
        tokio::select! {
            event = rx.recv() => match event {
                Some(StreamEvent::TextDelta(text)) => {
                    print!("{text}");
                    std::io::stdout().flush().ok();
                    if let Some(t) = tts.as_deref_mut() {
                        t.feed(&text);
                    }
                }
                Some(StreamEvent::Usage(usage)) => {
                    tracing::debug!(
                        input_tokens = usage.input_tokens,
                        output_tokens = usage.output_tokens,
                        "response usage"
                    );
                }
                Some(StreamEvent::Error(message)) => {
                    stream_error.get_or_insert(message);
                }
                Some(StreamEvent::Done) | None => break,
            },
            Some(_) = lines.next_line() => {
                if let Some(t) = tts.as_deref()
                    && t.is_speaking()
                {
                    println!("\n[Interrupted. Stopping audio...]");
                    t.interrupt();
                }
            }
        }
    }
    println!();

    if let Some(t) = tts.as_deref_mut() {
        t.finalize();
    }
    // Keep watching stdin while audio drains so ENTER can still interrupt.
    if let Some(t) = tts.as_deref() {
        loop {
            tokio::select! {
                () = t.drain() => break,
                Some(_) = lines.next_line() => {
                    if t.is_speaking() {
                        println!("[Interrupted. Stopping audio...]");
                        t.interrupt();
                    }
                }
            }
        }
    }

    let result = handle
        .await
        .map_err(|e| provider::Error::Stream(e.to_string()))?;
    match (result, stream_error) {
        (Err(e), _) => Err(e),
        (Ok(()), Some(message)) => Err(provider::Error::Api(message)),
        (Ok(()), None) => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_keywords_are_recognized() {
        for input in ["quit", "exit", "bye"] {
            assert!(is_exit_command(input), "{input}");
        }
    }

    #[test]
    fn exit_keywords_are_case_insensitive() {
        for input in ["QUIT", "Exit", "ByE"] {
            assert!(is_exit_command(input), "{input}");
        }
    }

    #[test]
    fn exit_keywords_tolerate_whitespace() {
        assert!(is_exit_command("  quit \n"));
    }

    #[test]
    fn normal_messages_are_not_exits() {
        for input in ["hello", "quit smoking tips", "goodbye", ""] {
            assert!(!is_exit_command(input), "{input}");
        }
    }
}
