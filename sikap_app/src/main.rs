use std::{
    fs::OpenOptions,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use sikap_app::{
    identity::{SessionContext, StaticIdentity},
    location::{AuthorizationStatus, ReplayLocationService},
    navigation::OfflineDirections,
    renderer::HeadlessMap,
    AppEvent, EndChoice, SikapApp, SikapConfig,
};
use sikap_data_management::{default_database_path, gpx_util::read_gpx_file, DataManager, RecordId};
use sikap_lib::sikap_summary::SikapRecord;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "sikap")]
#[command(about = "Track walks and keep a history of them", long_about = None)]
struct Cli {
    /// Settings file with `key = value` lines
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Database file, overrides the settings file
    #[arg(long, global = true)]
    database: Option<PathBuf>,
    /// Keep everything in memory
    #[arg(long, global = true)]
    memory: bool,
    /// Also append logs to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Choice {
    End,
    Discard,
}

#[derive(Subcommand)]
enum Commands {
    /// Walk a recorded GPX track as if it was happening now, then end the sikap
    Replay {
        gpx_file: PathBuf,
        #[arg(long)]
        user: String,
        /// Set the display name before starting
        #[arg(long)]
        name: Option<String>,
        #[arg(long, value_enum, default_value_t = Choice::End)]
        choice: Choice,
        /// Search for a `lat,lon` place while walking
        #[arg(long)]
        search: Option<String>,
        /// Accuracy in meters for points without hdop
        #[arg(long, default_value_t = 5.)]
        accuracy: f64,
        /// Delay between replayed fixes
        #[arg(long, default_value_t = 0)]
        interval_ms: u64,
    },
    /// Print saved sikaps as JSON lines
    History {
        #[arg(long)]
        user: String,
    },
    /// Set the display name of a user
    SetName {
        #[arg(long)]
        user: String,
        name: String,
    },
}

#[derive(Serialize)]
struct HistoryLine {
    id: RecordId,
    #[serde(flatten)]
    record: SikapRecord,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_file.as_deref())?;

    let mut config = match &cli.config {
        Some(path) => SikapConfig::load(path)?,
        None => SikapConfig::default(),
    };
    if let Some(database) = &cli.database {
        config.database = Some(database.clone());
    }

    let data_manager = if cli.memory {
        DataManager::in_memory()
    } else {
        let path = match &config.database {
            Some(path) => path.clone(),
            None => default_database_path()?,
        };
        DataManager::start(&path)
            .await
            .with_context(|| format!("Failed to open database at {path:?}"))?
    };

    match cli.command {
        Commands::Replay { gpx_file, user, name, choice, search, accuracy, interval_ms } => {
            let fixes = read_gpx_file(&gpx_file, accuracy)?;
            tracing::info!("Replaying {} fixes from {:?}", fixes.len(), gpx_file);

            if let Some(name) = name {
                data_manager.set_display_name(&user, &name).await?;
            }

            let (location, mut replay) = ReplayLocationService::new(
                fixes,
                AuthorizationStatus::NotDetermined,
                Duration::from_millis(interval_ms),
            );
            let context = SessionContext::new(Arc::new(StaticIdentity::awaiting(user)), data_manager);
            context.ensure_signed_in().await?;

            let (mut app, mut rx) = SikapApp::new(config, context, Arc::new(OfflineDirections), location, HeadlessMap::new());
            let tx = app.sender();
            tx.send(AppEvent::Launch)?;
            tx.send(AppEvent::StartSikap)?;
            app.track_until(&mut rx, replay.finished(), search).await;

            let events = match choice {
                Choice::End => vec![AppEvent::EndTapped, AppEvent::EndChoice(EndChoice::End), AppEvent::SaveTapped],
                Choice::Discard => vec![AppEvent::EndTapped, AppEvent::EndChoice(EndChoice::Discard)],
            };
            for event in events.into_iter().chain([AppEvent::Shutdown]) {
                tx.send(event)?;
            }
            app.run(rx).await;
            tracing::debug!("{} route segments left on the map", app.renderer().tracked_segments());

            let view = app.view();
            if let Some(title) = &view.name_label {
                println!("{title}");
            }
            if let Some(details) = &view.details_label {
                println!("{details}");
            }
            match (choice, app.last_saved()) {
                (Choice::End, Some(id)) => println!("Saved as {id}"),
                (Choice::End, None) => println!("Sikap was not saved, see the log"),
                (Choice::Discard, _) => println!("Sikap discarded"),
            }
        }
        Commands::History { user } => {
            for (id, record) in data_manager.sikap_history(&user).await? {
                println!("{}", serde_json::to_string(&HistoryLine { id, record })?);
            }
        }
        Commands::SetName { user, name } => {
            data_manager.set_display_name(&user, &name).await?;
            println!("Name of {user} set to {name}");
        }
    }

    Ok(())
}

fn init_tracing(log_file: Option<&Path>) -> anyhow::Result<()> {
    let file_layer = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {path:?}"))?;
            Some(tracing_subscriber::fmt::layer().with_ansi(false).with_writer(Arc::new(file)))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| format!("{}=trace,sikap_app=debug,sikap_data_management=debug", env!("CARGO_CRATE_NAME")).into())
        )
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .init();

    Ok(())
}
