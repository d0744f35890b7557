mod config;
mod controller;
mod notes;
mod templates;

use std::{sync::Arc, time::Duration};

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};

use agenda::HttpAgendaSource;
use controller::{CountdownBoard, SessionBoard};
use notes::StatusNote;
use storage::RecordStore;

#[derive(Parser, Debug)]
#[command(name = "board", about = "Conference room countdown and agenda board")]
struct Args {
    /// Room number for this display; overrides the display URL fragment.
    #[arg(long)]
    room: Option<u32>,
    /// Render the board once and exit.
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let args = Args::parse();
    let settings = config::load_settings();
    let database_url = config::prepare_database_url(&settings.database_url)?;

    let this_room = args.room.or_else(|| {
        settings
            .display_url
            .as_deref()
            .and_then(config::room_number_from_fragment)
    });
    match this_room {
        Some(room) => info!(room, "display configured for room"),
        None => info!("no room configured; sessions will not be flagged"),
    }

    let store = RecordStore::open(&database_url).await?;
    let countdowns = Arc::new(CountdownBoard::start(store.clone()).await?);
    let sessions = SessionBoard::start(store, this_room).await?;

    let source = HttpAgendaSource::new(settings.agenda_url.clone());
    if let Err(error) = sessions.ingest(&source).await {
        // One shot at startup; a failed fetch leaves the pane empty.
        error!(%error, "agenda ingestion failed");
    }

    let note = StatusNote::new();
    let rotation = notes::spawn_rotation(
        note.clone(),
        Duration::from_secs(settings.note_interval_secs),
    );

    render(&countdowns, &sessions, &note);
    if args.once {
        rotation.abort();
        return Ok(());
    }

    // Lines typed on stdin become new countdowns.
    let input_board = Arc::clone(&countdowns);
    let input = tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if line.trim().is_empty() {
                continue;
            }
            if let Err(error) = input_board.create_from_input(&line, None).await {
                error!(%error, "failed to create countdown");
            }
        }
    });

    let mut ticker = tokio::time::interval(Duration::from_secs(settings.refresh_secs.max(1)));
    loop {
        tokio::select! {
            _ = ticker.tick() => render(&countdowns, &sessions, &note),
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    input.abort();
    rotation.abort();
    info!("board shut down");
    Ok(())
}

fn render(countdowns: &CountdownBoard, sessions: &SessionBoard, note: &StatusNote) {
    let stats = countdowns.stats();
    println!("== countdowns ({} open / {} total) ==", stats.remaining, stats.total);
    for line in countdowns.render_lines() {
        println!("{line}");
    }
    println!("== today's sessions ==");
    for line in sessions.render_lines() {
        println!("{line}");
    }
    println!("-- {} --", note.current());
}
