mod config;
mod error;

use clap::Parser;
use config::AppConfig;
use error::CliError;
use movie_info::{NoMetadata, TitleBasicsIndex, TitleMetadata};
use simplelog::{ColorChoice, TermLogger, TerminalMode};
use std::path::PathBuf;
use std::sync::Arc;
use stream_resolver::{CacheConfig, Context, ContextPointer, MemoryCache, ParsedIdentifier};

/// Resolves torrent stream candidates for a movie or series episode and prints them as JSON.
#[derive(Debug, Parser)]
#[command(name = "resolve-streams", version)]
struct Args {
    /// `movie` or `series`
    content_type: String,
    /// IMDb id such as `tt0944947`, optionally `tt0944947:1:2`
    id: String,
    #[arg(short, long)]
    season: Option<u32>,
    #[arg(short, long)]
    episode: Option<u32>,
    /// YAML config file, `resolver.yaml` by default
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn parse_identifier(args: &Args) -> Result<ParsedIdentifier, CliError> {
    let mut parts = args.id.split(':');
    let base_id = parts.next().unwrap_or_default().trim();
    if base_id.is_empty() {
        return Err(CliError::Identifier(args.id.clone()));
    }
    let mut coordinate = || -> Result<Option<u32>, CliError> {
        parts
            .next()
            .map(|part| part.parse().map_err(|_| CliError::Identifier(args.id.clone())))
            .transpose()
    };
    let season = coordinate()?.or(args.season);
    let episode = coordinate()?.or(args.episode);
    Ok(ParsedIdentifier::new(base_id, season, episode))
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let args = Args::parse();
    let config = AppConfig::load(args.config.as_deref())?;
    TermLogger::init(
        config.log_level,
        simplelog::Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    )?;

    let identifier = parse_identifier(&args)?;
    let metadata: Arc<dyn TitleMetadata> = match &config.resolver.title_basics_path {
        Some(path) => Arc::new(TitleBasicsIndex::from_path(path)?),
        None => Arc::new(NoMetadata),
    };
    let cache = Arc::new(MemoryCache::new(CacheConfig::new(
        config.resolver.cache_max_entries,
    )));

    let context: ContextPointer =
        Arc::new(Context::init(config.resolver, metadata, cache.clone()).await?);
    let result = context.resolve_streams(&args.content_type, &identifier).await;
    context.shutdown().await;

    let response = result?;
    println!("{}", serde_json::to_string_pretty(&response)?);
    log::debug!("Cache stats: {:?}", cache.stats());
    Ok(())
}
