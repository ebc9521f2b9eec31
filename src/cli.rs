//! Command-line surface: `refresh`, `update` and `list`.
//!
//! All business logic lives in the pipeline modules; this module parses
//! arguments, builds the production collaborators (file store, tokio runner,
//! GitHub client, entropy-seeded RNG) and prints the user-facing summary.

use chrono::Utc;
use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::OrkoError;
use crate::load_config::{load_settings, Settings};
use crate::refresh::{list, refresh, GithubClient, RefreshOptions};
use crate::runner::TokioCommandRunner;
use crate::store::JsonFileStore;
use crate::update::{update, UpdateOptions};

/// Automatic package and repository maintenance bot.
#[derive(Parser, Debug)]
#[clap(name = "orko", version, about = "Automatic package and repository maintenance bot")]
pub struct Cli {
    /// Optional YAML settings file
    #[clap(long, global = true)]
    pub settings: Option<PathBuf>,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Download the repository listing of a user
    #[clap(alias = "r")]
    Refresh {
        /// GitHub username
        #[clap(short, long)]
        username: String,
        /// Minimum time between refreshes, e.g. "45m"
        #[clap(short, long, value_parser = humantime::parse_duration)]
        cooldown: Option<Duration>,
        /// Repositories per page
        #[clap(short = 'p', long)]
        per_page: Option<u32>,
        /// Ignore the cooldown
        #[clap(short, long)]
        force: bool,
    },
    /// Update one package, picked at random unless named
    Update {
        /// GitHub username
        #[clap(short, long)]
        username: String,
        /// Repository to update instead of a random one
        #[clap(short = 'p', long)]
        repository: Option<String>,
        /// Minimum time between updates, e.g. "45m"
        #[clap(short, long, value_parser = humantime::parse_duration)]
        cooldown: Option<Duration>,
        /// License to set in package.json
        #[clap(short, long)]
        license: Option<String>,
        /// npm publisher name, defaults to the GitHub username
        #[clap(long)]
        registry_user: Option<String>,
        /// Seed for the random repository choice
        #[clap(long)]
        seed: Option<u64>,
        /// Ignore the cooldown
        #[clap(short, long)]
        force: bool,
    },
    /// Print the cached repository names of a user
    List {
        /// GitHub username
        #[clap(short, long)]
        username: String,
    },
}

/// Async entrypoint shared by `main` and the tests. Never exits the process.
pub async fn run(cli: Cli) -> Result<(), OrkoError> {
    tracing::info!("trace_initialised");
    let settings = load_settings(cli.settings.as_deref())?;
    let mut store = JsonFileStore::open(&settings.store_path)?;
    let now = Utc::now();

    match cli.command {
        Commands::Refresh {
            username,
            cooldown,
            per_page,
            force,
        } => {
            let client = GithubClient::new(&settings.github_api, per_page.unwrap_or(settings.per_page))?;
            let options = RefreshOptions {
                username,
                cooldown: cooldown.unwrap_or(settings.refresh_cooldown),
                force,
            };
            let report = refresh(&mut store, &client, &options, now).await?;
            println!(
                "Stored {} repositories for {}.",
                report.repositories, options.username
            );
        }
        Commands::Update {
            username,
            repository,
            cooldown,
            license,
            registry_user,
            seed,
            force,
        } => {
            let options = update_options(
                &settings,
                username,
                repository,
                cooldown,
                license,
                registry_user,
                force,
            );
            let mut rng = match seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_entropy(),
            };
            let runner = TokioCommandRunner::new();
            let report = update(&mut store, &runner, &mut rng, &options, now).await?;
            println!("Selected: {} ({})", report.repository, report.path.display());
            println!("Published with message: {}", report.commit_message);
        }
        Commands::List { username } => {
            let view = list(&store, &username, now)?;
            println!("{}", view.header);
            for name in view.names {
                println!("{name}");
            }
        }
    }
    Ok(())
}

fn update_options(
    settings: &Settings,
    username: String,
    repository: Option<String>,
    cooldown: Option<Duration>,
    license: Option<String>,
    registry_user: Option<String>,
    force: bool,
) -> UpdateOptions {
    UpdateOptions {
        registry_user: registry_user
            .or_else(|| settings.registry_user.clone())
            .unwrap_or_else(|| username.clone()),
        username,
        repository,
        cooldown: cooldown.unwrap_or(settings.update_cooldown),
        license: license.or_else(|| settings.license.clone()),
        cache_dir: settings.cache_dir.clone(),
        force,
    }
}
