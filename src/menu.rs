//! Top-level interactive menu.

use std::io::Write;

use crate::chat;
use crate::config::Config;
use crate::error::Result;
use crate::input::LineReader;

/// A validated menu selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuChoice {
    TextChat,
    VoiceChat,
    Exit,
}

impl MenuChoice {
    /// Parse a raw input line. Anything but `1`, `2`, `3` is rejected.
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim() {
            "1" => Some(Self::TextChat),
            "2" => Some(Self::VoiceChat),
            "3" => Some(Self::Exit),
            _ => None,
        }
    }
}

/// Run the menu loop until the user exits or stdin closes.
pub async fn run(config: &Config, lines: &mut LineReader) -> Result<()> {
    println!("Welcome to Mikasa");
    println!("{}", "=".repeat(30));

    loop {
        println!("\nPlease select an option:");
        println!("1. Text Input Chat");
        println!("2. Voice Input Chat");
        println!("3. Exit");
        print!("\nEnter your choice (1-3): ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await else {
            break;
        };

        match MenuChoice::parse(&line) {
            Some(MenuChoice::TextChat) => {
                // Chat-mode failures return control here instead of
                // taking down the menu.
                if let Err(e) = chat::run(config, lines).await {
                    tracing::error!("text chat mode failed: {e}");
                    println!("An error occurred in text chat mode: {e}");
                }
            }
            Some(MenuChoice::VoiceChat) => voice_chat_stub(),
            Some(MenuChoice::Exit) => {
                println!("Bye");
                break;
            }
            None => println!("Invalid choice. Please enter 1, 2, or 3."),
        }
    }

    Ok(())
}

/// Voice input is not implemented.
fn voice_chat_stub() {
    println!("\n=== Voice Chat Mode ===");
    println!("Voice input is not implemented yet!");
    println!("Returning to main menu...");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_the_three_options() {
        assert_eq!(MenuChoice::parse("1"), Some(MenuChoice::TextChat));
        assert_eq!(MenuChoice::parse("2"), Some(MenuChoice::VoiceChat));
        assert_eq!(MenuChoice::parse("3"), Some(MenuChoice::Exit));
    }

    #[test]
    fn trims_surrounding_whitespace() {
        assert_eq!(MenuChoice::parse(" 1 \n"), Some(MenuChoice::TextChat));
        assert_eq!(MenuChoice::parse("\t3"), Some(MenuChoice::Exit));
    }

    #[test]
    fn rejects_everything_else() {
        for input in ["", "0", "4", "12", "one", "exit", "1 2"] {
            assert_eq!(MenuChoice::parse(input), None, "input {input:?}");
        }
    }

    #[tokio::test]
    async fn reprompts_on_invalid_then_exits() {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        tx.send("9".to_string()).unwrap();
        tx.send("2".to_string()).unwrap(); // voice stub, returns to menu
        tx.send("3".to_string()).unwrap();
        drop(tx);

        let mut lines = LineReader::from_channel(rx);
        run(&Config::default(), &mut lines).await.unwrap();
    }

    #[tokio::test]
    async fn eof_ends_the_menu() {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel::<String>();
        drop(tx);

        let mut lines = LineReader::from_channel(rx);
        run(&Config::default(), &mut lines).await.unwrap();
    }
}
