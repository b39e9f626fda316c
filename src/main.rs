use std::{fs, path::PathBuf, sync::Arc};

use clap::{
    CommandFactory, Parser, Subcommand,
    builder::{
        Styles,
        styling::{AnsiColor, Effects},
    },
};
use clap_complete::{Shell, generate};

use musync::{cli, config, error, types::PkceToken, warning};
use tokio::sync::Mutex;

fn styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::White.on_default() | Effects::BOLD)
        .usage(AnsiColor::White.on_default() | Effects::BOLD)
        .literal(AnsiColor::BrightBlue.on_default())
        .placeholder(AnsiColor::BrightGreen.on_default())
}

#[derive(Parser, Debug, Clone)]
#[clap(
  version = env!("CARGO_PKG_VERSION"),
  name=env!("CARGO_PKG_NAME"),
  bin_name=env!("CARGO_PKG_NAME"),
  author=env!("CARGO_PKG_AUTHORS"),
  about=env!("CARGO_PKG_DESCRIPTION"),
  styles=styles(),
)]
struct Cli {
    /// Write debug output to the log file
    #[clap(long, global = true)]
    debug: bool,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Authorize with the YouTube Data API
    Auth,

    /// Work with a music library directory
    Library(LibraryOptions),

    /// Get shell completions
    Completions(CompletionsOption),
}

#[derive(Parser, Debug, Clone)]
pub struct LibraryOptions {
    /// Library directory, downloaded files end up here
    #[clap(long)]
    pub dir: PathBuf,

    #[command(subcommand)]
    pub command: LibrarySubcommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum LibrarySubcommand {
    /// Download new songs from your playlists and subscriptions
    Update(UpdateOpts),

    /// Download the given tracks
    Download(DownloadOpts),

    /// List already processed tracks
    Cache(CacheOpts),
}

#[derive(Parser, Debug, Clone)]
pub struct UpdateOpts {
    /// Stop after this many downloaded tracks
    #[clap(long)]
    pub limit: Option<usize>,

    /// Only list what would be downloaded
    #[clap(long)]
    pub skip_download: bool,

    /// Retry failed downloads this many times
    #[clap(long, default_value_t = 0)]
    pub retries: u32,

    /// Maximum number of tracks read from each playlist
    #[clap(long)]
    pub each_playlist_limit: Option<usize>,

    /// Sync with the saved home items filter without asking
    #[clap(long)]
    pub no_review: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct DownloadOpts {
    /// YouTube video ids
    #[clap(required = true, num_args = 1..)]
    pub track_ids: Vec<String>,

    /// Retry failed downloads this many times
    #[clap(long, default_value_t = 0)]
    pub retries: u32,
}

#[derive(Parser, Debug, Clone)]
pub struct CacheOpts {
    /// Search by id, artist or title
    #[clap(long)]
    pub search: Option<String>,

    /// Show filtered tracks only
    #[clap(long)]
    pub filtered: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct CompletionsOption {
    shell: Shell,
}

/// Sends diagnostic logs to `<log_dir>/main.log`.
///
/// `RUST_LOG` wins when set. Otherwise the level is `info`, raised to `debug`
/// for this crate with `--debug`.
fn init_logger(debug: bool, log_dir: PathBuf) {
    let rust_log = std::env::var(env_logger::DEFAULT_FILTER_ENV).ok();
    let mut logger = env_logger::Builder::new();
    logger.parse_filters(&config::log_filter(debug, rust_log.as_deref()));

    let log_file = fs::create_dir_all(&log_dir).and_then(|_| {
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_dir.join("main.log"))
    });
    match log_file {
        Ok(file) => {
            logger.target(env_logger::Target::Pipe(Box::new(file)));
        }
        Err(e) => {
            warning!("Cannot open log file in {}. Err: {}", log_dir.display(), e);
            return;
        }
    }

    if let Err(e) = logger.try_init() {
        warning!("Cannot initialize logger. Err: {}", e);
    }
}

fn log_dir(command: &Command) -> Option<PathBuf> {
    match command {
        Command::Library(opt) => Some(opt.dir.join(".logs")),
        Command::Auth => dirs::data_local_dir().map(|d| d.join("musync").join(".logs")),
        Command::Completions(_) => None,
    }
}

#[tokio::main]
async fn main() {
    if let Err(e) = config::load_env().await {
        error!("Cannot load environment. Err: {}", e);
    }

    let cli = Cli::parse();

    if let Some(dir) = log_dir(&cli.command) {
        init_logger(cli.debug, dir);
    }

    match cli.command {
        Command::Auth => {
            let oauth_result: Arc<Mutex<Option<PkceToken>>> = Arc::new(Mutex::new(None));
            cli::auth(Arc::clone(&oauth_result)).await;
        }

        Command::Library(opt) => match opt.command {
            LibrarySubcommand::Update(u) => {
                cli::update(
                    &opt.dir,
                    cli::UpdateOptions {
                        limit: u.limit,
                        skip_download: u.skip_download,
                        retries: u.retries,
                        each_playlist_limit: u.each_playlist_limit,
                        review: !u.no_review,
                    },
                )
                .await
            }
            LibrarySubcommand::Download(d) => cli::download(&opt.dir, d.track_ids, d.retries).await,
            LibrarySubcommand::Cache(c) => cli::list_cache(&opt.dir, c.search, c.filtered).await,
        },

        Command::Completions(opt) => {
            let mut cmd = Cli::command_for_update();
            let name = cmd.get_name().to_string();
            generate(opt.shell, &mut cmd, name, &mut std::io::stdout())
        }
    }
}
