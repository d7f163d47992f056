//! Follow a board live from the terminal.
//!
//! ```text
//! tindur-watch --config client.toml
//! ```

use std::fmt::Write as _;
use std::sync::Arc;

use color_eyre::eyre::{Result, WrapErr};
use tindur_client::{spawn_stream_manager, Board, BoardEvent, ClientConfig, RestClient};
use tindur_core::{GroupedView, Lane};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tindur_client=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = ClientConfig::load().wrap_err("loading client configuration")?;
    let client = RestClient::new(&config)?;
    let board = Arc::new(Board::new(client.clone(), config.filter()?));

    let (event_tx, mut event_rx) = mpsc::channel::<BoardEvent>(256);
    let manager = spawn_stream_manager(client, event_tx, config.reconnect.clone());

    loop {
        tokio::select! {
            Some(event) = event_rx.recv() => {
                if let BoardEvent::Disconnected { reason } = &event {
                    tracing::warn!(reason = %reason, "Disconnected");
                }
                if let Err(err) = board.handle_event(&event).await {
                    tracing::error!(error = %err, "Failed to apply board event");
                    continue;
                }
                if !matches!(event, BoardEvent::Disconnected { .. }) {
                    println!("{}", render(&board.view()));
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutting down");
                break;
            }
        }
    }

    manager.abort();
    Ok(())
}

fn render(view: &GroupedView) -> String {
    let mut out = String::new();
    for lane in Lane::ALL {
        let name = match lane {
            Lane::Todo => "TODO",
            Lane::Doing => "DOING",
            Lane::Done => "DONE",
        };
        let _ = writeln!(out, "== {} ({})", name, view.lane(lane).len());
        for record in view.lane(lane) {
            let _ = writeln!(
                out,
                "  #{:<6} {} [{}] {}",
                record.id,
                record.scheduled_date,
                record.category.as_deref().unwrap_or("-"),
                record.title.as_deref().unwrap_or("(untitled)"),
            );
        }
    }
    out
}
