//! Interactive terminal client for the agora chat service.
//!
//! # Usage
//!
//! ```bash
//! # Connect to the service at $AGORA_API_BASE_URL (or localhost:8000)
//! agora-chat
//!
//! # Start with a fresh session for a user
//! agora-chat --username ada
//!
//! # Resume a session and wait for complete replies
//! agora-chat --session session-1234 --structured
//! ```
//!
//! # Commands
//!
//! While chatting, slash commands manage sessions, images and results;
//! `/help` lists them.  Set `AGORA_LOG=debug` to see request logs on stderr.

use std::path::Path;

use arrrg::CommandLine;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing_subscriber::EnvFilter;

use agora::AgoraClient;
use agora::chat::{
    ChatArgs, ChatCommand, ChatConfig, ChatSession, PlainTextRenderer, Renderer, SessionRef,
    help_text, parse_command,
};

/// Main entry point for the agora-chat application.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("AGORA_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let (args, _) = ChatArgs::from_command_line_relaxed("agora-chat [OPTIONS]");
    let config = ChatConfig::try_from(args)?;

    let client = AgoraClient::new(config.api.clone())?;
    let mut renderer = PlainTextRenderer::with_options(config.use_color, config.use_markdown);
    let mut session = ChatSession::new(client, config);
    let mut rl = DefaultEditor::new()?;

    println!("Agora Chat ({})", session.config().api.base_url());
    println!("Type /help for commands, /quit to exit\n");

    start(&mut session, &mut renderer).await;

    loop {
        let prompt = match session.active() {
            Some(active) => format!("{}> ", active.username),
            None => "> ".to_string(),
        };
        let readline = rl.readline(&prompt);

        match readline {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                let _ = rl.add_history_entry(line);

                if let Some(cmd) = parse_command(line) {
                    if cmd == ChatCommand::Quit {
                        println!("Goodbye!");
                        break;
                    }
                    run_command(&mut session, &mut renderer, cmd).await;
                    continue;
                }

                if let Err(err) = session.send(line, &mut renderer).await {
                    if err.is_validation() {
                        renderer.print_error(&err.to_string());
                    } else {
                        tracing::debug!(error = %err, "send failed");
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!();
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("\nGoodbye!");
                break;
            }
            Err(err) => {
                renderer.print_error(&format!("Input error: {}", err));
                break;
            }
        }
    }

    Ok(())
}

/// Load the session list and open the session named on the command line.
async fn start(session: &mut ChatSession, renderer: &mut PlainTextRenderer) {
    match session.refresh_sessions().await {
        Ok(sessions) => {
            let count = sessions.len();
            renderer.print_info(&format!(
                "Connected; {count} session(s). Use /sessions to list them."
            ));
        }
        Err(err) => {
            tracing::warn!(error = %err, "failed to list sessions");
            renderer.print_error("Could not reach the chat service. Check /status.");
        }
    }

    if let Some(username) = session.config().username.clone() {
        new_session(session, renderer, &username).await;
    } else if let Some(id) = session.config().session_id.clone() {
        switch_session(session, renderer, &SessionRef::Id(id)).await;
    }
}

async fn run_command(
    session: &mut ChatSession,
    renderer: &mut PlainTextRenderer,
    cmd: ChatCommand,
) {
    match cmd {
        ChatCommand::Sessions => match session.refresh_sessions().await.map(|_| ()) {
            Ok(_) => renderer.print_sessions(session.sessions(), session.active_id()),
            Err(err) => {
                tracing::warn!(error = %err, "failed to list sessions");
                renderer.print_error("Failed to load sessions.");
            }
        },
        ChatCommand::New(username) => {
            let username = username.or_else(|| session.active().map(|s| s.username.clone()));
            match username {
                Some(username) => new_session(session, renderer, &username).await,
                None => renderer.print_error("/new requires a username"),
            }
        }
        ChatCommand::Switch(reference) => switch_session(session, renderer, &reference).await,
        ChatCommand::Delete(reference) => match session.delete(&reference).await {
            Ok(deleted) => renderer.print_info(&format!("Deleted session {}.", deleted.id)),
            Err(err) if err.is_validation() => renderer.print_error(&err.to_string()),
            Err(err) => {
                tracing::warn!(error = %err, "failed to delete session");
                renderer.print_error("Failed to delete session.");
            }
        },
        ChatCommand::Clear => match session.clear().await {
            Ok(()) => renderer.print_info("Conversation cleared."),
            Err(err) if err.is_validation() => renderer.print_error(&err.to_string()),
            Err(err) => {
                tracing::warn!(error = %err, "failed to clear session");
                renderer.print_error("Failed to clear chat.");
            }
        },
        ChatCommand::History => session.print_history(renderer),
        ChatCommand::Mode(mode) => {
            session.set_mode(mode);
            renderer.print_info(&format!("Mode set to {mode}."));
        }
        ChatCommand::Image(path) => match session.attach_image(Path::new(&path)).await {
            Ok(upload) => renderer.print_info(&format!(
                "Attached {}; it will be sent with your next message.",
                upload.filename
            )),
            Err(err) => {
                tracing::warn!(error = %err, path = %path, "failed to upload image");
                renderer.print_error(&format!("Failed to upload image: {err}"));
            }
        },
        ChatCommand::ClearImage => match session.clear_image() {
            Some(upload) => renderer.print_info(&format!("Dropped {}.", upload.filename)),
            None => renderer.print_info("No image attached."),
        },
        ChatCommand::Results(tab) => session.show_results(tab, renderer),
        ChatCommand::Status => renderer.print_info(&session.status_line()),
        ChatCommand::ShowConfig => print_config(session),
        ChatCommand::Help => {
            for line in help_text().lines() {
                println!("    {}", line);
            }
        }
        ChatCommand::Quit => {}
        ChatCommand::Invalid(message) => renderer.print_error(&message),
    }
}

async fn new_session(session: &mut ChatSession, renderer: &mut PlainTextRenderer, username: &str) {
    match session.create_session(username).await {
        Ok(created) => renderer.print_info(&format!(
            "Created session {} for {}.",
            created.id, created.username
        )),
        Err(err) if err.is_validation() => renderer.print_error(&err.to_string()),
        Err(err) => {
            tracing::warn!(error = %err, "failed to create session");
            renderer.print_error("Failed to create session.");
        }
    }
}

async fn switch_session(
    session: &mut ChatSession,
    renderer: &mut PlainTextRenderer,
    reference: &SessionRef,
) {
    let line = match session.switch(reference).await {
        Ok(active) => format!("Switched to session {} ({}).", active.id, active.username),
        Err(err) if err.is_validation() => {
            renderer.print_error(&err.to_string());
            return;
        }
        Err(err) => {
            tracing::warn!(error = %err, "failed to load messages");
            renderer.print_error("Failed to load messages.");
            return;
        }
    };
    renderer.print_info(&line);
    session.print_history(renderer);
}

fn print_config(session: &ChatSession) {
    let config = session.config();
    println!("    Current Configuration:");
    println!("      API: {}", config.api.base_url());
    println!("      Websocket: {}", config.api.ws_url());
    println!("      Mode: {}", session.mode());
    println!(
        "      Active session: {}",
        session.active_id().unwrap_or("(none)")
    );
    match session.pending_image() {
        Some(upload) => println!("      Pending image: {}", upload.image_url),
        None => println!("      Pending image: (none)"),
    }
    println!(
        "      Color: {}",
        if config.use_color { "on" } else { "off" }
    );
    println!(
        "      Markdown: {}",
        if config.use_markdown { "on" } else { "off" }
    );
}
