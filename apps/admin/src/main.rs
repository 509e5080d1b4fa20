use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use client_core::{
    config::load_config,
    error::ClientError,
    status::StatusMessage,
    validation::{parse_criteria, parse_import, validate_dessert},
    BakeoffClient,
};
use shared::{
    domain::{Participant, ParticipantId, ScoreId, DEFAULT_ROSTER, PLACEHOLDER_DESSERT},
    protocol::{ImportMode, SettingsUpdate},
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(about = "Run the bakeoff: roster, settings, scores and backups")]
struct Cli {
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    server_url: Option<String>,
    /// Log in with this password before running the command.
    #[arg(long)]
    password: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Log in and print the session token for `admin_token`.
    Login { password: String },
    #[command(subcommand)]
    Participants(ParticipantsCommand),
    /// Replace the roster with the default bakers.
    Seed {
        #[arg(long)]
        yes: bool,
    },
    /// Set the dessert a participant is entering.
    Dessert {
        participant_id: i64,
        name: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, default_value = "")]
        category: String,
    },
    #[command(subcommand)]
    Settings(SettingsCommand),
    #[command(subcommand)]
    Scores(ScoresCommand),
    /// Show recent activity.
    Events {
        #[arg(long, default_value_t = 50)]
        limit: u32,
    },
    /// Download everything as JSON.
    Export { output: Option<PathBuf> },
    /// Ask the server to write a backup file.
    Backup,
    /// Load a previous export.
    Import {
        file: PathBuf,
        #[arg(long, value_enum, default_value_t = ModeArg::Replace)]
        mode: ModeArg,
    },
    /// Delete all scores and events.
    Reset {
        #[arg(long)]
        yes: bool,
    },
    /// Write the admin console as HTML.
    Page {
        #[arg(long)]
        output: Option<PathBuf>,
        #[arg(long, default_value_t = 20)]
        events: u32,
    },
}

#[derive(Subcommand, Debug)]
enum ParticipantsCommand {
    List,
    Add {
        name: String,
        #[arg(long)]
        inactive: bool,
    },
    Activate { id: i64 },
    Deactivate { id: i64 },
    Delete { id: i64 },
}

#[derive(Subcommand, Debug)]
enum SettingsCommand {
    Show,
    Set {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        theme: Option<String>,
        #[arg(long, conflicts_with = "close")]
        open: bool,
        #[arg(long)]
        close: bool,
        #[arg(long)]
        allow_repeat_scores: Option<bool>,
        /// JSON array of `{key, label, max, weight}`.
        #[arg(long)]
        criteria_file: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
enum ScoresCommand {
    List,
    Delete { id: i64 },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ModeArg {
    Replace,
    Merge,
}

impl From<ModeArg> for ImportMode {
    fn from(value: ModeArg) -> Self {
        match value {
            ModeArg::Replace => ImportMode::Replace,
            ModeArg::Merge => ImportMode::Merge,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    let mut config = load_config(cli.config.as_deref()).context("loading config")?;
    if let Some(server_url) = cli.server_url {
        config.server_url = server_url;
    }
    let mut client = BakeoffClient::from_config(&config)?;
    if let Some(password) = &cli.password {
        client.authenticate(password).await?;
    }

    match run(&mut client, cli.command).await {
        Ok(Some(done)) => println!("{}", StatusMessage::info(done)),
        Ok(None) => {}
        Err(err) => {
            let status = match err.downcast_ref::<ClientError>() {
                Some(client_err) => StatusMessage::from(client_err),
                None => StatusMessage::error(format!("{err:#}")),
            };
            println!("{status}");
            std::process::exit(1);
        }
    }
    Ok(())
}

/// Runs one command; `Some` carries the confirmation to show the admin.
async fn run(client: &mut BakeoffClient, command: Command) -> Result<Option<String>> {
    match command {
        Command::Login { password } => {
            client.authenticate(&password).await?;
            match client.admin_token() {
                Some(token) => println!("admin_token = \"{token}\""),
                None => info!("server did not issue a token"),
            }
            Ok(Some("Logged in.".into()))
        }
        Command::Participants(command) => participants(client, command).await,
        Command::Seed { yes } => {
            if !yes {
                bail!("seeding replaces every participant; pass --yes to confirm");
            }
            client.replace_participants(&default_roster()).await?;
            Ok(Some(format!("Seeded {} participants.", DEFAULT_ROSTER.len())))
        }
        Command::Dessert {
            participant_id,
            name,
            description,
            category,
        } => {
            let dessert = validate_dessert(ParticipantId(participant_id), &name, &description, &category)?;
            client.upsert_dessert(&dessert).await?;
            Ok(Some(format!("Dessert saved: {}.", dessert.dessert_name)))
        }
        Command::Settings(SettingsCommand::Show) => {
            print!("{}", views::text::settings(&client.fetch_state().await?));
            Ok(None)
        }
        Command::Settings(SettingsCommand::Set {
            name,
            theme,
            open,
            close,
            allow_repeat_scores,
            criteria_file,
        }) => {
            let criteria = match criteria_file {
                Some(path) => Some(parse_criteria(&read(&path)?)?),
                None => None,
            };
            let update = SettingsUpdate {
                competition_name: name,
                theme,
                voting_open: voting_flag(open, close),
                allow_multiple_scores_per_judge: allow_repeat_scores,
                criteria,
            };
            client.update_settings(&update).await?;
            Ok(Some("Settings saved.".into()))
        }
        Command::Scores(ScoresCommand::List) => {
            print!("{}", views::text::scores(&client.fetch_state().await?));
            Ok(None)
        }
        Command::Scores(ScoresCommand::Delete { id }) => {
            client.delete_score(ScoreId(id)).await?;
            Ok(Some(format!("Deleted score {id}.")))
        }
        Command::Events { limit } => {
            print!("{}", views::text::events(&client.list_events(limit).await?));
            Ok(None)
        }
        Command::Export { output } => {
            let bundle = client.export().await?;
            let json = serde_json::to_string_pretty(&bundle)?;
            match output {
                Some(path) => {
                    std::fs::write(&path, json)
                        .with_context(|| format!("writing {}", path.display()))?;
                    Ok(Some(format!("Exported to {}.", path.display())))
                }
                None => {
                    println!("{json}");
                    Ok(None)
                }
            }
        }
        Command::Backup => {
            let backup = client.backup().await?;
            Ok(Some(match backup.file {
                Some(file) => format!("Backup written to {file}."),
                None => "Backup written.".into(),
            }))
        }
        Command::Import { file, mode } => {
            let bundle = parse_import(&read(&file)?)?;
            client.import(mode.into(), bundle).await?;
            Ok(Some(format!("Imported {} ({mode:?}).", file.display())))
        }
        Command::Reset { yes } => {
            if !yes {
                bail!("reset deletes every score; pass --yes to confirm");
            }
            client.reset().await?;
            Ok(Some("Competition reset.".into()))
        }
        Command::Page { output, events } => {
            let snapshot = client.fetch_state().await?;
            let events = if client.has_admin_token() {
                client.list_events(events).await?
            } else {
                Vec::new()
            };
            let page = views::html::admin_page(&snapshot, &events, None).into_string();
            match output {
                Some(path) => {
                    std::fs::write(&path, page)
                        .with_context(|| format!("writing {}", path.display()))?;
                    Ok(Some(format!("Wrote {}.", path.display())))
                }
                None => {
                    println!("{page}");
                    Ok(None)
                }
            }
        }
    }
}

async fn participants(client: &BakeoffClient, command: ParticipantsCommand) -> Result<Option<String>> {
    match command {
        ParticipantsCommand::List => {
            print!("{}", views::text::participants(&client.fetch_state().await?));
            Ok(None)
        }
        ParticipantsCommand::Add { name, inactive } => {
            let created = client.upsert_participant(&name, !inactive).await?;
            Ok(Some(match created {
                Some(participant) => format!("Added {} (id {}).", participant.name, participant.id),
                None => format!("Added {}.", name.trim()),
            }))
        }
        ParticipantsCommand::Activate { id } => {
            client.set_participant_active(ParticipantId(id), true).await?;
            Ok(Some(format!("Participant {id} is accepting scores.")))
        }
        ParticipantsCommand::Deactivate { id } => {
            client.set_participant_active(ParticipantId(id), false).await?;
            Ok(Some(format!("Participant {id} is no longer accepting scores.")))
        }
        ParticipantsCommand::Delete { id } => {
            client.delete_participant(ParticipantId(id)).await?;
            Ok(Some(format!("Deleted participant {id}.")))
        }
    }
}

fn default_roster() -> Vec<Participant> {
    DEFAULT_ROSTER
        .iter()
        .zip(1..)
        .map(|(name, id)| Participant {
            id: ParticipantId(id),
            name: name.to_string(),
            dessert: Some(PLACEHOLDER_DESSERT.to_string()),
            active: true,
            created_at: None,
        })
        .collect()
}

fn voting_flag(open: bool, close: bool) -> Option<bool> {
    match (open, close) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
    }
}

fn read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}
