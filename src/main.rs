use std::io;

use clap::{CommandFactory, Parser};
use colored::*;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_stream::wrappers::LinesStream;
use tokio_stream::StreamExt;

use chatstream::cli::{read_command, Args, Command, HELP_TEXT};
use chatstream::config::Config;
use chatstream::models::AVAILABLE_MODELS;
use chatstream::session::ChatSession;
use chatstream::stt::SttClient;
use chatstream::surface::Surface;
use chatstream::terminal::TerminalSurface;
use chatstream::transport::{self, TransportEvent};

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chatstream=warn".into()),
        )
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    if let Some(shell) = args.completions {
        clap_complete::generate(shell, &mut Args::command(), "chatstream", &mut io::stdout());
        return Ok(());
    }

    if args.list_models {
        for model in AVAILABLE_MODELS {
            println!("{model}");
        }
        return Ok(());
    }

    init_tracing();

    let config = Config::resolve(&args)?;
    let history = config.history.open_log()?;
    let stt = SttClient::new(&config.stt_url)?;
    let (transport, mut events) = transport::connect(&config.server_url).await?;

    println!("{}", "CHATSTREAM".bright_cyan().bold());
    println!("{}: {}", "Server".bright_yellow(), config.server_url);
    println!("{}: {}", "Model".bright_yellow(), config.model);
    println!("{}", "=".repeat(50).bright_blue());

    let mut session = ChatSession::new(
        TerminalSurface::stdout(),
        history,
        transport,
        config.model.clone(),
    );
    session.restore();

    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = LinesStream::new(stdin.lines());

    loop {
        tokio::select! {
            line = lines.next() => {
                let Some(line) = line else { break };
                match read_command(line)? {
                    Command::Say(text) => {
                        session.send_text(&text);
                    }
                    Command::Model(name) => match session.set_model(&name) {
                        Ok(()) => {
                            session.surface_mut().notice(&format!("model: {name}"));
                        }
                        Err(e) => {
                            session.surface_mut().notice(&e.to_string());
                        }
                    },
                    Command::Models => {
                        let listing = AVAILABLE_MODELS
                            .iter()
                            .map(|m| if *m == session.model() { format!("*{m}") } else { m.to_string() })
                            .collect::<Vec<_>>()
                            .join("  ");
                        session.surface_mut().notice(&listing);
                    }
                    Command::Image { path, text } => {
                        session.send_image_file(&path, &text);
                    }
                    Command::Audio(path) => {
                        session.send_audio_file(&stt, &path).await;
                    }
                    Command::History => {
                        let count = session.history().len();
                        session.surface_mut().notice(&format!("{count} stored messages"));
                    }
                    Command::Clear => {
                        let note = match session.history().clear() {
                            Ok(()) => "history cleared".to_string(),
                            Err(e) => format!("could not clear history: {e}"),
                        };
                        session.surface_mut().notice(&note);
                    }
                    Command::Help => {
                        println!("{HELP_TEXT}");
                    }
                    Command::Quit => break,
                    Command::Empty => {}
                    Command::Unknown(input) => {
                        session.surface_mut().notice(&format!("unknown command: {input} (try /help)"));
                    }
                }
            }

            event = events.recv() => {
                let Some(event) = event else { break };
                let disconnected = matches!(event, TransportEvent::Disconnected { .. });
                session.handle_event(event);
                if disconnected {
                    break;
                }
            }
        }
    }

    Ok(())
}
