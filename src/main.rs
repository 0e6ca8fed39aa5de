//! `cinelink` CLI - exercise the link resolution engine from the terminal.

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use cinelink::{ResolveOptions, Resolver};

#[derive(Parser)]
#[command(name = "cinelink")]
#[command(about = "Resolve movies and series episodes to playable stream links")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a movie by its external title id
    Movie {
        /// External title id (catalog id)
        id: String,

        /// Title used to derive the fallback page URL when the registry
        /// does not know this id
        #[arg(short, long)]
        title: Option<String>,

        /// Disable the scrape fallback (registry tier only)
        #[arg(long)]
        no_scrape: bool,
    },

    /// Resolve one episode of a series
    Episode {
        /// External title id (catalog id)
        id: String,

        /// Season number
        season: u32,

        /// Episode number
        episode: u32,
    },

    /// Extract links from an explicit source URL
    Extract {
        /// Page URL on a supported source site
        url: String,

        /// Listen-feed session URL (required for feed-backed sources)
        #[arg(short, long)]
        listen_url: Option<String>,
    },

    /// Show counts over the verified registry
    Registry,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("CINELINK_LOG")
                .unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();
    let resolver = Resolver::from_env()?;

    match cli.command {
        Commands::Movie { id, title, no_scrape } => {
            let options = ResolveOptions {
                auto_scrape: !no_scrape,
                title_hint: title,
            };
            let result = resolver.resolve_movie(&id, &options).await;
            print_json(&result)?;
        }
        Commands::Episode { id, season, episode } => {
            let result = resolver.resolve_episode(&id, season, episode).await;
            print_json(&result)?;
        }
        Commands::Extract { url, listen_url } => {
            let result = resolver
                .extract_from_url(&url, listen_url.as_deref())
                .await;
            print_json(&result)?;
        }
        Commands::Registry => {
            let stats = resolver.registry_stats().await;
            print_json(&stats)?;
        }
    }

    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
