use clap::{
    CommandFactory, Parser, Subcommand,
    builder::{
        Styles,
        styling::{AnsiColor, Effects},
    },
};
use clap_complete::{Shell, generate};

use utafm::{cli, config, error, logging, utils};

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
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the OAuth callback server
    Serve,

    /// Link a requester to a Last.fm account
    Link(LinkOptions),

    /// List linked accounts
    Users,

    /// Show recently played tracks
    Recent(RecentOptions),

    /// Show top artists, albums or tracks
    Top(TopOptions),

    /// See which linked users know an artist, album or track
    WhoKnows(WhoKnowsOptions),

    /// Compare the music taste of two users
    Affinity(AffinityOptions),

    /// Scrobble a track
    Scrobble(ScrobbleOptions),

    /// Set the currently playing track
    NowPlaying(NowPlayingOptions),

    /// Love a track
    Love(TrackOptions),

    /// Remove a track from loved tracks
    Unlove(TrackOptions),

    /// Get shell completions
    Completions(CompletionsOption),
}

#[derive(Parser, Debug, Clone)]
pub struct LinkOptions {
    /// Identifier of the user being linked
    pub requester: String,

    /// Link read-only by Last.fm username instead of authorizing
    #[clap(long)]
    pub username: Option<String>,
}

#[derive(Parser, Debug, Clone)]
pub struct RecentOptions {
    /// Linked requester or Last.fm username
    pub who: String,

    #[clap(long, default_value_t = 10)]
    pub limit: u32,
}

#[derive(Parser, Debug, Clone)]
pub struct TopOptions {
    /// Linked requester or Last.fm username
    pub who: String,

    #[clap(value_enum, default_value = "artists")]
    pub kind: cli::TopKind,

    /// overall, 7day, 1month, 3month, 6month or 12month
    #[clap(long, default_value = "overall", value_parser = utils::parse_period)]
    pub period: utils::Period,

    #[clap(long, default_value_t = 10)]
    pub limit: u32,
}

#[derive(Parser, Debug, Clone)]
pub struct WhoKnowsOptions {
    #[clap(value_enum, default_value = "artist")]
    pub kind: cli::SubjectKind,

    #[clap(long)]
    pub artist: Option<String>,

    /// Album or track title
    #[clap(long)]
    pub name: Option<String>,

    /// Use what this linked requester is playing for missing names
    #[clap(long)]
    pub requester: Option<String>,
}

#[derive(Parser, Debug, Clone)]
pub struct AffinityOptions {
    /// Linked requester or Last.fm username
    pub first: String,

    /// Linked requester or Last.fm username
    pub second: String,
}

#[derive(Parser, Debug, Clone)]
pub struct ScrobbleOptions {
    pub requester: String,

    #[clap(long)]
    pub artist: String,

    #[clap(long)]
    pub track: String,

    #[clap(long)]
    pub album: Option<String>,

    /// Unix timestamp of the play; defaults to now
    #[clap(long)]
    pub timestamp: Option<i64>,
}

#[derive(Parser, Debug, Clone)]
pub struct NowPlayingOptions {
    pub requester: String,

    #[clap(long)]
    pub artist: String,

    #[clap(long)]
    pub track: String,

    #[clap(long)]
    pub album: Option<String>,
}

#[derive(Parser, Debug, Clone)]
pub struct TrackOptions {
    pub requester: String,

    #[clap(long)]
    pub artist: String,

    #[clap(long)]
    pub track: String,
}

#[derive(Parser, Debug, Clone)]
pub struct CompletionsOption {
    shell: Shell,
}

#[tokio::main]
async fn main() {
    if let Err(e) = config::load_env().await {
        error!("Cannot load environment. Err: {}", e);
    }
    logging::init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve => cli::serve().await,
        Command::Link(opt) => cli::link(&opt.requester, opt.username).await,
        Command::Users => cli::users().await,
        Command::Recent(opt) => cli::recent(&opt.who, opt.limit).await,
        Command::Top(opt) => cli::top(&opt.who, opt.kind, opt.period, opt.limit).await,
        Command::WhoKnows(opt) => {
            cli::who_knows(opt.kind, opt.artist, opt.name, opt.requester).await
        }
        Command::Affinity(opt) => cli::affinity(&opt.first, &opt.second).await,
        Command::Scrobble(opt) => {
            cli::scrobble(
                &opt.requester,
                opt.artist,
                opt.track,
                opt.album,
                opt.timestamp,
            )
            .await
        }
        Command::NowPlaying(opt) => {
            cli::now_playing(&opt.requester, opt.artist, opt.track, opt.album).await
        }
        Command::Love(opt) => cli::love(&opt.requester, &opt.artist, &opt.track).await,
        Command::Unlove(opt) => cli::unlove(&opt.requester, &opt.artist, &opt.track).await,
        Command::Completions(opt) => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(opt.shell, &mut cmd, name, &mut std::io::stdout())
        }
    }
}
