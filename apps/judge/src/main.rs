use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use client_core::{
    config::load_config,
    error::ClientError,
    realtime::spawn_realtime,
    snapshot::{ClientEvent, SnapshotStore},
    status::StatusMessage,
    validation::{validate_ballot, BallotDraft},
    BakeoffClient,
};
use shared::domain::{ParticipantId, StateSnapshot};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(about = "Vote in the bakeoff and follow the leaderboard")]
struct Args {
    /// Config file; defaults to ./bakeoff.toml when present.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    server_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the roster and competition settings.
    State,
    /// Print the leaderboard, optionally following live updates.
    Leaderboard {
        #[arg(long)]
        watch: bool,
        /// Seconds between refetches when the push channel is unavailable.
        #[arg(long, default_value_t = 5)]
        poll_secs: u64,
    },
    /// Score one participant.
    Vote {
        #[arg(long)]
        judge: Option<String>,
        /// Exact participant name, or an id when no name matches.
        #[arg(long)]
        participant: String,
        /// One `criterion=value` pair per flag, e.g. `--score taste=9`.
        #[arg(long = "score", value_parser = parse_criterion_score)]
        scores: Vec<(String, f64)>,
        #[arg(long, default_value = "")]
        comment: String,
    },
    /// Write the voting page as HTML.
    Page {
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let mut config = load_config(args.config.as_deref()).context("loading config")?;
    if let Some(server_url) = args.server_url {
        config.server_url = server_url;
    }
    let client = BakeoffClient::from_config(&config)?;

    match args.command {
        Command::State => {
            let snapshot = client.fetch_state().await?;
            print!("{}", views::text::settings(&snapshot));
            println!();
            print!("{}", views::text::participants(&snapshot));
        }
        Command::Leaderboard { watch, poll_secs } => {
            if watch {
                watch_leaderboard(client, Duration::from_secs(poll_secs.max(1))).await?;
            } else {
                let snapshot = client.fetch_state().await?;
                print_leaderboard(&snapshot);
            }
        }
        Command::Vote {
            judge,
            participant,
            scores,
            comment,
        } => {
            let snapshot = client.fetch_state().await?;
            let draft = BallotDraft {
                judge_name: judge.or(config.judge_name.clone()).unwrap_or_default(),
                participant: resolve_participant(&snapshot, &participant),
                criteria: scores.into_iter().collect(),
                comment,
            };
            let result = submit(&client, &snapshot, draft).await;
            let status = StatusMessage::from_result(&result, "Score submitted. Thank you!");
            println!("{status}");
            if let Ok(Some(total)) = result {
                println!("total: {}", views::format_score(total));
            }
            if status.is_error() {
                std::process::exit(1);
            }
        }
        Command::Page { output } => {
            let snapshot = client.fetch_state().await?;
            let page = views::html::voting_page(&snapshot, None).into_string();
            match output {
                Some(path) => std::fs::write(&path, page)
                    .with_context(|| format!("writing {}", path.display()))?,
                None => println!("{page}"),
            }
        }
    }

    Ok(())
}

async fn submit(
    client: &BakeoffClient,
    snapshot: &StateSnapshot,
    draft: BallotDraft,
) -> Result<Option<f64>, ClientError> {
    let submission = validate_ballot(snapshot, draft)?;
    let response = client.submit_score(&submission).await?;
    Ok(response.total.or(submission.total))
}

/// Exact name match first, then a numeric id.
fn resolve_participant(snapshot: &StateSnapshot, raw: &str) -> Option<ParticipantId> {
    if let Some(participant) = snapshot.participant_by_name(raw) {
        return Some(participant.id);
    }
    raw.trim().parse::<i64>().ok().map(ParticipantId)
}

fn parse_criterion_score(raw: &str) -> Result<(String, f64), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected criterion=value, got `{raw}`"))?;
    let value = value
        .trim()
        .parse::<f64>()
        .map_err(|err| format!("{key}: {err}"))?;
    Ok((key.trim().to_string(), value))
}

fn print_leaderboard(snapshot: &StateSnapshot) {
    let rows = client_core::rank(snapshot);
    println!("{}", snapshot.settings.competition_name);
    print!("{}", views::text::leaderboard(&rows, &snapshot.settings.criteria));
}

async fn watch_leaderboard(client: BakeoffClient, poll_every: Duration) -> Result<()> {
    info!(server = %client.server_url(), "watching leaderboard");
    let client = Arc::new(client);
    let store = Arc::new(SnapshotStore::default());
    let mut events = store.subscribe();

    // The first snapshot, or the reason it failed, arrives through `events`.
    let _ = store.refresh(client.as_ref()).await;

    let mut realtime = match spawn_realtime(client.realtime_url()?, Arc::clone(&store)).await {
        Ok(handle) => Some(handle),
        Err(err) => {
            warn!(error = %err, "falling back to polling");
            None
        }
    };

    let mut poll = tokio::time::interval(poll_every);
    poll.tick().await;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = poll.tick(), if realtime.is_none() => {
                // Failures are already reported through the event stream.
                let _ = store.refresh(client.as_ref()).await;
            }
            event = events.recv() => match event {
                Ok(ClientEvent::SnapshotApplied { .. }) => {
                    print_leaderboard(&*store.current().await);
                }
                Ok(ClientEvent::Error(message)) => println!("{}", StatusMessage::error(message)),
                Ok(ClientEvent::Disconnected) => {
                    info!("realtime channel gone, polling every {}s", poll_every.as_secs());
                    realtime = None;
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "leaderboard view fell behind");
                    print_leaderboard(&*store.current().await);
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    if let Some(handle) = realtime {
        handle.abort();
    }
    Ok(())
}
