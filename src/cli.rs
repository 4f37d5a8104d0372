use std::io;
use std::path::PathBuf;

use clap::Parser;
use clap_complete::Shell;
use tracing::warn;

use crate::config::HistoryBackend;

#[derive(Parser, Debug)]
#[command(name = "chatstream")]
#[command(version)]
#[command(about = "Terminal chat client for a streaming AI-assistant backend")]
pub struct Args {
    /// WebSocket URL of the chat server
    #[arg(long)]
    pub server: Option<String>,

    /// Base URL of the speech-to-text endpoint (POST <url>/stt)
    #[arg(long)]
    pub stt_url: Option<String>,

    /// Model to chat with
    #[arg(long, short)]
    pub model: Option<String>,

    /// TOML configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Where the history log is kept
    #[arg(long, value_enum)]
    pub history_backend: Option<HistoryBackend>,

    /// Directory (file backend) or database file (sqlite backend)
    #[arg(long)]
    pub history_path: Option<PathBuf>,

    /// Store key holding the history log
    #[arg(long)]
    pub history_key: Option<String>,

    /// Print the available models and exit
    #[arg(long)]
    pub list_models: bool,

    /// Print a shell completion script and exit
    #[arg(long, value_enum)]
    pub completions: Option<Shell>,
}

/// One line of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Say(String),
    Model(String),
    Models,
    Image { path: PathBuf, text: String },
    Audio(PathBuf),
    History,
    Clear,
    Help,
    Quit,
    Empty,
    Unknown(String),
}

pub const HELP_TEXT: &str = "\
commands:
  <text>                  send a message
  /model <name>           switch model
  /models                 list available models
  /image <path> [text]    send an image with optional text
  /audio <path>           transcribe a recording and send it
  /history                show the number of stored messages
  /clear                  delete the stored history
  /help                   this text
  /quit                   exit";

pub fn parse_command(line: &str) -> Command {
    let line = line.trim();
    if line.is_empty() {
        return Command::Empty;
    }
    let Some(rest) = line.strip_prefix('/') else {
        return Command::Say(line.to_string());
    };
    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (rest, ""),
    };
    match name {
        "model" if !arg.is_empty() => Command::Model(arg.to_string()),
        "models" => Command::Models,
        "image" if !arg.is_empty() => {
            let (path, text) = match arg.split_once(char::is_whitespace) {
                Some((path, text)) => (path, text.trim()),
                None => (arg, ""),
            };
            Command::Image {
                path: PathBuf::from(path),
                text: text.to_string(),
            }
        }
        "audio" if !arg.is_empty() => Command::Audio(PathBuf::from(arg)),
        "history" => Command::History,
        "clear" => Command::Clear,
        "help" => Command::Help,
        "quit" | "exit" => Command::Quit,
        _ => Command::Unknown(line.to_string()),
    }
}

/// Parse one line read from the terminal. A line that is not valid UTF-8 is
/// skipped as [`Command::Empty`]; other read errors are returned.
pub fn read_command(line: io::Result<String>) -> io::Result<Command> {
    match line {
        Ok(line) => Ok(parse_command(&line)),
        Err(e) if e.kind() == io::ErrorKind::InvalidData => {
            warn!(error = %e, "skipping input line that is not valid UTF-8");
            Ok(Command::Empty)
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_args_parse_minimal() {
        let args = Args::parse_from(["chatstream"]);
        assert!(args.server.is_none());
        assert!(args.model.is_none());
        assert!(args.history_backend.is_none());
        assert!(!args.list_models);
        assert!(args.completions.is_none());
    }

    #[test]
    fn test_args_parse_full() {
        let args = Args::parse_from([
            "chatstream",
            "--server",
            "ws://example/ws",
            "--stt-url",
            "http://example",
            "-m",
            "gemini-1.5-pro-preview-0514",
            "--history-backend",
            "sqlite",
            "--history-path",
            "/tmp/h.db",
            "--history-key",
            "k",
        ]);
        assert_eq!(args.server.as_deref(), Some("ws://example/ws"));
        assert_eq!(args.stt_url.as_deref(), Some("http://example"));
        assert_eq!(args.model.as_deref(), Some("gemini-1.5-pro-preview-0514"));
        assert_eq!(args.history_backend, Some(HistoryBackend::Sqlite));
        assert_eq!(args.history_path, Some(PathBuf::from("/tmp/h.db")));
        assert_eq!(args.history_key.as_deref(), Some("k"));
    }

    #[test]
    fn test_args_completions_shell() {
        let args = Args::parse_from(["chatstream", "--completions", "bash"]);
        assert_eq!(args.completions, Some(Shell::Bash));
    }

    #[test]
    fn test_args_reject_unknown_backend() {
        assert!(Args::try_parse_from(["chatstream", "--history-backend", "redis"]).is_err());
    }

    #[rstest]
    #[case("hello there", Command::Say("hello there".to_string()))]
    #[case("   ", Command::Empty)]
    #[case("/models", Command::Models)]
    #[case("/model gemini-1.5-flash-001", Command::Model("gemini-1.5-flash-001".to_string()))]
    #[case("/audio rec.wav", Command::Audio(PathBuf::from("rec.wav")))]
    #[case("/history", Command::History)]
    #[case("/clear", Command::Clear)]
    #[case("/help", Command::Help)]
    #[case("/quit", Command::Quit)]
    #[case("/exit", Command::Quit)]
    #[case("/model", Command::Unknown("/model".to_string()))]
    #[case("/dance", Command::Unknown("/dance".to_string()))]
    fn test_parse_command(#[case] line: &str, #[case] expected: Command) {
        assert_eq!(parse_command(line), expected);
    }

    #[test]
    fn test_parse_image_with_text() {
        assert_eq!(
            parse_command("/image cam.jpg what is this?"),
            Command::Image {
                path: PathBuf::from("cam.jpg"),
                text: "what is this?".to_string()
            }
        );
    }

    #[test]
    fn test_parse_image_without_text() {
        assert_eq!(
            parse_command("/image cam.jpg"),
            Command::Image {
                path: PathBuf::from("cam.jpg"),
                text: String::new()
            }
        );
    }

    #[test]
    fn test_read_command_skips_invalid_utf8() {
        let bad = io::Error::new(io::ErrorKind::InvalidData, "stream did not contain valid UTF-8");
        assert_eq!(read_command(Err(bad)).unwrap(), Command::Empty);
        assert_eq!(read_command(Ok("/quit".into())).unwrap(), Command::Quit);
    }

    #[test]
    fn test_read_command_propagates_other_errors() {
        let broken = io::Error::new(io::ErrorKind::BrokenPipe, "closed");
        assert!(read_command(Err(broken)).is_err());
    }
}
