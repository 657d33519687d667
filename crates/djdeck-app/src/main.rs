//! # djdeck
//!
//! A two-deck DJ player driven from the terminal.

mod commands;
mod config;

use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};
use commands::{execute, Command, HELP};
use config::AppConfig;
use djdeck_audio::{PlayerEvent, Session};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> Result<()> {
    let config = AppConfig::load().context("Failed to load configuration")?;

    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_filter.as_str().into()),
        )
        .init();

    info!("Starting djdeck v{}", env!("CARGO_PKG_VERSION"));

    let mut session = Session::new(config.engine);
    if !config.library.is_empty() {
        let added = session.add_files(&config.library);
        info!("Added {added} library files to the playlist");
    }

    if let Err(e) = session.start_output() {
        warn!("Audio output unavailable, continuing without it: {e}");
    }

    println!("{HELP}");
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    print!("> ");
    stdout.flush()?;

    for line in stdin.lock().lines() {
        let line = line.context("Failed to read stdin")?;
        if !line.trim().is_empty() {
            match line.parse::<Command>() {
                Ok(Command::Quit) => break,
                Ok(command) => match execute(&mut session, command) {
                    Ok(output) => print!("{output}"),
                    Err(e) => println!("error: {e:#}"),
                },
                Err(e) => println!("error: {e:#}"),
            }
        }

        report_events(&session);
        print!("> ");
        stdout.flush()?;
    }

    session.stop_output();
    info!("Bye");
    Ok(())
}

fn report_events(session: &Session) {
    for (deck, event) in session.poll_events() {
        match event {
            PlayerEvent::Loaded {
                track,
                duration_secs,
            } => info!("{deck}: loaded \"{}\" ({duration_secs:.1}s)", track.title),
            PlayerEvent::LoadFailed { locator, reason } => {
                error!("{deck}: failed to load {locator}: {reason}");
            }
            PlayerEvent::Finished => println!("{deck}: track finished"),
        }
    }
}
