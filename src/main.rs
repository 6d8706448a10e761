use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgMatches, Command};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, reload, EnvFilter, Registry};

use manga_notifier::config::FeedSource;
use manga_notifier::{
    Config, ConsoleSink, JsonLinesFeed, OutputFormat, RedditFeed, StreamProcessor, SubmissionFeed,
    TitleParser,
};

fn cli() -> Command {
    Command::new("manga-notifier")
        .version("0.1.0")
        .author("TigreRoll")
        .about("Watches a manga discussion feed and reports new chapter releases")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file (defaults to the usual search paths)")
                .value_parser(value_parser!(PathBuf))
                .global(true)
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging")
                .action(clap::ArgAction::SetTrue)
                .global(true)
        )
        .subcommand(
            Command::new("watch")
                .about("Stream episodes from the configured feed (default)")
                .arg(
                    Arg::new("source")
                        .short('s')
                        .long("source")
                        .value_name("SOURCE")
                        .help("Feed to read submissions from")
                        .value_parser(["reddit", "json_lines", "stdin"])
                )
                .arg(
                    Arg::new("input")
                        .short('i')
                        .long("input")
                        .value_name("FILE")
                        .help("JSON lines file with one submission per line")
                        .value_parser(value_parser!(PathBuf))
                )
                .arg(
                    Arg::new("subreddit")
                        .short('r')
                        .long("subreddit")
                        .value_name("NAME")
                        .help("Subreddit to watch")
                )
                .arg(
                    Arg::new("format")
                        .short('f')
                        .long("format")
                        .value_name("FORMAT")
                        .help("Episode output format")
                        .value_parser(["text", "json"])
                )
                .arg(
                    Arg::new("limit")
                        .short('n')
                        .long("limit")
                        .value_name("COUNT")
                        .help("Stop after this many episodes")
                        .value_parser(value_parser!(usize))
                )
        )
        .subcommand(
            Command::new("parse")
                .about("Parse post titles and print the extracted title and chapter")
                .arg(
                    Arg::new("titles")
                        .value_name("TITLE")
                        .help("Post titles to parse")
                        .required(true)
                        .num_args(1..)
                )
        )
        .subcommand(Command::new("show-config").about("Print the effective configuration"))
}

type FilterHandle = reload::Handle<EnvFilter, Registry>;

fn filter_directive(verbose: bool, level: &str) -> String {
    if verbose {
        "debug".to_string()
    } else {
        format!("manga_notifier={},warn", level)
    }
}

/// Start logging before anything else runs. `RUST_LOG` wins over `--verbose`, which wins
/// over the config file's `log_level`; the returned handle is `None` when the level is pinned.
fn init_logging(verbose: bool) -> Option<FilterHandle> {
    let from_env = EnvFilter::try_from_default_env().ok();
    let pinned = verbose || from_env.is_some();
    let filter = from_env.unwrap_or_else(|| EnvFilter::new(filter_directive(verbose, "info")));
    let (filter, handle) = reload::Layer::new(filter);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(verbose).with_writer(std::io::stderr))
        .init();

    (!pinned).then_some(handle)
}

fn apply_log_level(handle: Option<&FilterHandle>, level: &str) -> Result<()> {
    if let Some(handle) = handle {
        let filter = EnvFilter::try_new(filter_directive(false, level))
            .with_context(|| format!("Invalid log_level {:?}", level))?;
        handle.reload(filter)?;
    }
    Ok(())
}

fn load_config(path: Option<&PathBuf>) -> Result<Config> {
    match path {
        Some(path) => Config::from_file(path),
        None => Config::load(),
    }
}

/// Apply `watch` flags on top of the loaded configuration
fn apply_overrides(config: &mut Config, matches: &ArgMatches) -> Result<()> {
    if let Some(input) = matches.get_one::<PathBuf>("input") {
        config.feed.input_path = Some(input.clone());
        config.feed.source = FeedSource::JsonLines;
    }

    if let Some(source) = matches.get_one::<String>("source") {
        config.feed.source = match source.as_str() {
            "reddit" => FeedSource::Reddit,
            "json_lines" => FeedSource::JsonLines,
            _ => FeedSource::Stdin,
        };
    }

    if let Some(subreddit) = matches.get_one::<String>("subreddit") {
        config.feed.subreddit = subreddit.clone();
    }

    if let Some(format) = matches.get_one::<String>("format") {
        config.output.format = format.parse::<OutputFormat>().map_err(anyhow::Error::msg)?;
    }

    Ok(())
}

async fn open_feed(config: &Config) -> Result<Box<dyn SubmissionFeed>> {
    let feed: Box<dyn SubmissionFeed> = match config.feed.source {
        FeedSource::Reddit => Box::new(RedditFeed::new(&config.feed)?),
        FeedSource::Stdin => Box::new(JsonLinesFeed::stdin()),
        FeedSource::JsonLines => {
            let path = config
                .feed
                .input_path
                .as_deref()
                .context("input_path is required for the json_lines feed")?;
            Box::new(JsonLinesFeed::open(path).await?)
        }
    };
    Ok(feed)
}

async fn watch(mut config: Config, matches: Option<&ArgMatches>) -> Result<()> {
    let limit = matches.and_then(|m| m.get_one::<usize>("limit").copied());
    if let Some(matches) = matches {
        apply_overrides(&mut config, matches)?;
    }
    config.validate()?;

    info!("🚀 Manga Notifier starting...");
    info!("📡 Feed: {:?}", config.feed.source);
    if config.feed.source == FeedSource::Reddit {
        info!("📚 Subreddit: r/{}", config.feed.subreddit);
    }
    if let Some(limit) = limit {
        info!("🔢 Stopping after {} episodes", limit);
    }

    let feed = open_feed(&config).await?;
    let mut processor = StreamProcessor::from_config(feed, &config)?;
    let mut sink = ConsoleSink::stdout(config.output.format);

    tokio::select! {
        result = processor.run(&mut sink, limit) => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            warn!("🛑 Interrupted, stopping");
        }
    }

    info!("✅ Done: {}", processor.stats().summary());
    Ok(())
}

fn parse_titles(config: &Config, matches: &ArgMatches) -> Result<()> {
    let parser = TitleParser::new()?;

    for title in matches.get_many::<String>("titles").into_iter().flatten() {
        match (parser.parse(title)?, config.output.format) {
            (Some(parsed), OutputFormat::Json) => println!("{}", serde_json::to_string(&parsed)?),
            (Some(parsed), OutputFormat::Text) => {
                println!("{} | chapter {} ({:?})", parsed.title, parsed.chapter, parsed.rule)
            }
            (None, _) => println!("no match: {}", title),
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli().get_matches();

    let log_handle = init_logging(matches.get_flag("verbose"));
    let config = load_config(matches.get_one::<PathBuf>("config"))?;
    apply_log_level(log_handle.as_ref(), &config.output.log_level)?;

    match matches.subcommand() {
        Some(("parse", sub)) => parse_titles(&config, sub),
        Some(("show-config", _)) => {
            println!("{}", config.summary());
            Ok(())
        }
        Some(("watch", sub)) => watch(config, Some(sub)).await,
        _ => watch(config, None).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_cli_is_well_formed() {
        cli().debug_assert();
    }

    #[test]
    fn test_filter_directive() {
        assert_eq!(filter_directive(true, "warn"), "debug");
        assert_eq!(filter_directive(false, "trace"), "manga_notifier=trace,warn");
        assert!(EnvFilter::try_new(filter_directive(false, "info")).is_ok());
    }

    #[test]
    fn test_config_log_level_reloads_filter() {
        let (layer, handle) = reload::Layer::new(EnvFilter::new(filter_directive(false, "info")));
        let _subscriber = tracing_subscriber::registry().with(layer);

        apply_log_level(Some(&handle), "debug").unwrap();
        let current = handle.with_current(|filter| filter.to_string()).unwrap();
        assert!(current.contains("manga_notifier=debug"));

        assert!(apply_log_level(Some(&handle), "not a level ((").is_err());
        assert!(apply_log_level(None, "not a level ((").is_ok());
    }

    #[test]
    fn test_input_implies_json_lines() {
        let matches = cli()
            .try_get_matches_from(["manga-notifier", "watch", "--input", "posts.jsonl", "-f", "json"])
            .unwrap();
        let (_, sub) = matches.subcommand().unwrap();

        let mut config = Config::default();
        apply_overrides(&mut config, sub).unwrap();

        assert_eq!(config.feed.source, FeedSource::JsonLines);
        assert_eq!(config.feed.input_path.as_deref(), Some(Path::new("posts.jsonl")));
        assert_eq!(config.output.format, OutputFormat::Json);
    }
}
