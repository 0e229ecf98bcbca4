// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, debug};
use std::io::Write;
use std::path::Path;

use subgate::app_config::{Config, LogLevel};
use subgate::gateway::Gateway;
use subgate::models::{DownloadRequest, MediaType, SearchRequest};
use subgate::providers::ProviderKind;
use subgate::server;

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => LogLevel::Error,
            CliLogLevel::Warn => LogLevel::Warn,
            CliLogLevel::Info => LogLevel::Info,
            CliLogLevel::Debug => LogLevel::Debug,
            CliLogLevel::Trace => LogLevel::Trace,
        }
    }
}

/// CLI Wrapper for MediaType to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliMediaType {
    Movie,
    Episode,
}

impl From<CliMediaType> for MediaType {
    fn from(cli_type: CliMediaType) -> Self {
        match cli_type {
            CliMediaType::Movie => MediaType::Movie,
            CliMediaType::Episode => MediaType::Episode,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP gateway (default command)
    Serve(ServeArgs),

    /// Search one provider and print the canonical result as JSON
    Search(SearchArgs),

    /// Resolve a subtitle download and print the result as JSON
    Download(DownloadArgs),

    /// Generate shell completions for subgate
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args, Debug, Default)]
struct ServeArgs {
    /// Address to listen on
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on
    #[arg(long)]
    port: Option<u16>,
}

#[derive(Args, Debug)]
struct SearchArgs {
    /// Provider to search (opensubtitles, subdl, subsource, bsplayer, addic7ed)
    #[arg(short, long, default_value = "opensubtitles")]
    provider: ProviderKind,

    /// Title or show name
    #[arg(short, long)]
    query: Option<String>,

    /// IMDB id, with or without the `tt` prefix
    #[arg(short, long)]
    imdb_id: Option<String>,

    /// TMDB id
    #[arg(long)]
    tmdb_id: Option<u64>,

    /// Kind of media
    #[arg(short = 't', long = "type", value_enum)]
    media_type: Option<CliMediaType>,

    /// Release year
    #[arg(short, long)]
    year: Option<u32>,

    /// Comma-separated language codes
    #[arg(short, long, default_value = "en")]
    languages: String,

    /// Season number
    #[arg(short, long)]
    season: Option<u32>,

    /// Episode number
    #[arg(short, long)]
    episode: Option<u32>,

    /// Result page
    #[arg(long)]
    page: Option<u32>,

    /// Video file hash
    #[arg(long)]
    moviehash: Option<String>,

    /// Video file size in bytes
    #[arg(long)]
    moviesize: Option<u64>,

    /// API key overriding the configured one
    #[arg(long)]
    api_key: Option<String>,
}

#[derive(Args, Debug)]
struct DownloadArgs {
    /// Provider to download from, inferred from the request when omitted
    #[arg(short, long)]
    provider: Option<ProviderKind>,

    /// Numeric file id (OpenSubtitles)
    #[arg(short, long)]
    file_id: Option<i64>,

    /// Subtitle location returned by a search
    #[arg(short, long)]
    url: Option<String>,

    /// Requested subtitle format (OpenSubtitles)
    #[arg(long)]
    sub_format: Option<String>,

    /// API key overriding the configured one
    #[arg(long)]
    api_key: Option<String>,
}

/// subgate - unified subtitle search and download gateway
///
/// Normalizes OpenSubtitles, SubDL, SubSource, BSPlayer and Addic7ed behind
/// one request and response shape.
#[derive(Parser, Debug)]
#[command(name = "subgate")]
#[command(version)]
#[command(about = "Unified subtitle search and download gateway")]
#[command(long_about = "subgate exposes several subtitle providers behind one HTTP API.

EXAMPLES:
    subgate                                          # Serve with conf.json
    subgate serve --port 9000                        # Serve on another port
    subgate search -p subdl -i tt0133093 -l en,es    # One-shot search
    subgate search -p addic7ed -t episode -q 'The Office' -s 1 -e 2
    subgate download -u /subtitle/3197651-3213944.zip
    subgate completions bash > subgate.bash          # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config-path. If the config file doesn't exist, a default one
    will be created automatically.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json", global = true)]
    config_path: String,

    /// Set logging level
    #[arg(long, value_enum, global = true)]
    log_level: Option<CliLogLevel>,

    /// OpenSubtitles API key
    #[arg(long, env = "OPENSUBTITLES_API_KEY", hide_env_values = true, global = true)]
    opensubtitles_api_key: Option<String>,

    /// SubDL API key
    #[arg(long, env = "SUBDL_API_KEY", hide_env_values = true, global = true)]
    subdl_api_key: Option<String>,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger::new(level));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: ANSI color and emoji for a log level
    fn style_for_level(level: Level) -> (&'static str, &'static str) {
        match level {
            Level::Error => ("\x1B[1;31m", "❌ "),
            Level::Warn => ("\x1B[1;33m", "🚧 "),
            Level::Info => ("\x1B[1;32m", " "),
            Level::Debug => ("\x1B[1;36m", "🔍 "),
            Level::Trace => ("\x1B[1;35m", "📋 "),
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let (color, emoji) = Self::style_for_level(record.level());
            let _ = writeln!(
                std::io::stderr(),
                "{}{} {} {}\x1B[0m",
                color, now, emoji, record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // The logger accepts every level, the global max level does the filtering
    CustomLogger::init(LevelFilter::Trace)?;
    log::set_max_level(LevelFilter::Info);

    let cli = CommandLineOptions::parse();

    if let Some(Commands::Completions { shell }) = &cli.command {
        let mut cmd = CommandLineOptions::command();
        generate(*shell, &mut cmd, "subgate", &mut std::io::stdout());
        return Ok(());
    }

    let mut config = load_config(&cli)?;

    match cli.command {
        Some(Commands::Search(args)) => run_search(&config, args).await,
        Some(Commands::Download(args)) => run_download(&config, args).await,
        Some(Commands::Serve(args)) => {
            apply_serve_args(&mut config, args);
            server::serve(&config).await
        }
        None => server::serve(&config).await,
        Some(Commands::Completions { .. }) => Ok(()),
    }
}

/// Load the configuration file and apply command line overrides
fn load_config(cli: &CommandLineOptions) -> Result<Config> {
    let mut config = Config::load_or_create(Path::new(&cli.config_path))?;

    if let Some(log_level) = &cli.log_level {
        config.log_level = log_level.clone().into();
    }
    if let Some(key) = cli.opensubtitles_api_key.as_deref().filter(|k| !k.is_empty()) {
        config.providers.get_mut(ProviderKind::OpenSubtitles).api_key = key.to_string();
    }
    if let Some(key) = cli.subdl_api_key.as_deref().filter(|k| !k.is_empty()) {
        config.providers.get_mut(ProviderKind::SubDl).api_key = key.to_string();
    }

    config.validate().context("Configuration validation failed")?;
    log::set_max_level(config.log_level.to_level_filter());
    debug!("Loaded configuration from {}", cli.config_path);

    Ok(config)
}

fn apply_serve_args(config: &mut Config, args: ServeArgs) {
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
}

async fn run_search(config: &Config, args: SearchArgs) -> Result<()> {
    let request = SearchRequest {
        query: args.query,
        imdb_id: args.imdb_id,
        tmdb_id: args.tmdb_id,
        media_type: args.media_type.map(Into::into),
        year: args.year,
        languages: args.languages,
        season_number: args.season,
        episode_number: args.episode,
        page: args.page,
        moviehash: args.moviehash,
        moviesize: args.moviesize,
        ..Default::default()
    };

    let gateway = Gateway::from_config(config)?;
    let result = gateway
        .search(Some(args.provider), args.api_key.as_deref(), &request)
        .await?;

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

async fn run_download(config: &Config, args: DownloadArgs) -> Result<()> {
    let request = DownloadRequest {
        file_id: args.file_id,
        sub_format: args.sub_format,
        url: args.url,
        full_link: None,
    };

    let gateway = Gateway::from_config(config)?;
    let result = gateway
        .download(args.provider, args.api_key.as_deref(), &request)
        .await?;

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
