//! passvote: command-line client for live polls.

mod config;
mod error;
mod render;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use passvote_ceremony::{HttpIdentityService, IdentityService};
use passvote_live::{HttpEventSource, LiveStreamClient};
use passvote_polls::{HttpPollClient, PollView, ViewUpdate};
use passvote_session::SessionStore;
use passvote_types::{OptionId, PollDraft, PollFilter, PollId, UserId};
use passvote_utils::{init_logging, LogFormat};
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::error::CliError;

#[derive(Parser)]
#[command(name = "passvote", about = "Vote on polls and watch results live")]
struct Cli {
    /// Path to a TOML configuration file. If provided, file settings
    /// are used as the base; CLI flags and env vars override them.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Base URL of the poll service.
    #[arg(long, env = "PASSVOTE_API_URL")]
    api_url: Option<String>,

    /// Session token from a passkey sign-in.
    #[arg(long, env = "PASSVOTE_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "PASSVOTE_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long)]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Browse, vote on and manage polls.
    Polls {
        #[command(subcommand)]
        action: PollsAction,
    },
    /// Inspect the current session.
    Session {
        #[command(subcommand)]
        action: SessionAction,
    },
}

#[derive(clap::Subcommand)]
enum PollsAction {
    /// List public polls.
    List {
        #[arg(long, default_value_t = PollFilter::Open)]
        filter: PollFilter,
    },
    /// List the polls a user created.
    Mine {
        #[arg(long)]
        user_id: String,
        #[arg(long, default_value_t = PollFilter::All)]
        filter: PollFilter,
    },
    /// Show one poll.
    Show { poll_id: String },
    /// Follow a poll's results until it closes or Ctrl-C.
    Watch { poll_id: String },
    /// Vote for an option.
    Vote { poll_id: String, option_id: String },
    /// Create a poll.
    Create {
        #[arg(long)]
        title: String,
        /// Option text; repeat for each option.
        #[arg(long = "option", required = true)]
        options: Vec<String>,
    },
    /// Close one of your polls.
    Close { poll_id: String },
}

#[derive(clap::Subcommand)]
enum SessionAction {
    /// Check whether the session token is still valid.
    Whoami {
        #[arg(long)]
        username: String,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = resolve_config(&cli)?;
    init_logging(config.log_format, &config.log_level);
    debug!(api_url = %config.api_url, "configuration loaded");

    let Cli { command, token, .. } = cli;
    match command {
        Command::Polls { action } => run_polls(&config, token, action).await,
        Command::Session {
            action: SessionAction::Whoami { username },
        } => whoami(&config, token, &username).await,
    }
}

fn resolve_config(cli: &Cli) -> Result<ClientConfig, CliError> {
    let mut config = match &cli.config {
        Some(path) => ClientConfig::from_toml_file(path)?,
        None => ClientConfig::default(),
    };
    if let Some(api_url) = &cli.api_url {
        config.api_url = api_url.clone();
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    if let Some(format) = cli.log_format {
        config.log_format = format;
    }
    Ok(config)
}

fn poll_client(config: &ClientConfig, token: Option<String>) -> anyhow::Result<HttpPollClient> {
    let mut client = HttpPollClient::with_timeouts(
        config.api_url.clone(),
        config.request_timeout(),
        config.connect_timeout(),
    )?;
    client.set_token(token);
    Ok(client)
}

async fn open_view(
    config: &ClientConfig,
    client: HttpPollClient,
    poll_id: &PollId,
) -> anyhow::Result<PollView<HttpPollClient, HttpEventSource>> {
    let source = HttpEventSource::new(config.connect_timeout(), config.reconnect_policy())?;
    let live = LiveStreamClient::new(Arc::new(source), config.api_url.clone());
    let view = PollView::load(Arc::new(client), live, poll_id, config.view_config()).await?;
    Ok(view)
}

async fn run_polls(
    config: &ClientConfig,
    token: Option<String>,
    action: PollsAction,
) -> anyhow::Result<()> {
    let client = poll_client(config, token)?;
    match action {
        PollsAction::List { filter } => {
            let polls = client.list_polls(filter).await?;
            print!("{}", render::summaries(&polls));
        }
        PollsAction::Mine { user_id, filter } => {
            let polls = client.user_polls(&UserId::from(user_id), filter).await?;
            print!("{}", render::user_polls(&polls));
        }
        PollsAction::Show { poll_id } => {
            let view = open_view(config, client, &PollId::from(poll_id)).await?;
            print!("{}", render::poll(view.engine()));
        }
        PollsAction::Watch { poll_id } => {
            let view = open_view(config, client, &PollId::from(poll_id)).await?;
            watch(view).await;
        }
        PollsAction::Vote { poll_id, option_id } => {
            let mut view = open_view(config, client, &PollId::from(poll_id)).await?;
            view.cast_vote(&OptionId::from(option_id)).await?;
            println!("vote recorded");
            print!("{}", render::poll(view.engine()));
        }
        PollsAction::Create { title, options } => {
            let created = client.create_poll(&PollDraft::new(title, options)).await?;
            println!("created poll {}: {}", created.poll.id, created.poll.title);
            for option in &created.options {
                println!("  [{}] {}", option.option_id, option.text);
            }
        }
        PollsAction::Close { poll_id } => {
            let poll_id = PollId::from(poll_id);
            client.close_poll(&poll_id).await?;
            println!("poll {poll_id} closed");
        }
    }
    Ok(())
}

async fn watch(mut view: PollView<HttpPollClient, HttpEventSource>) {
    print!("{}", render::poll(view.engine()));
    if !view.enable_live() {
        println!("poll is closed");
        return;
    }

    loop {
        let update = tokio::select! {
            update = view.next_update() => update,
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted, leaving live mode");
                break;
            }
        };
        match update {
            None => break,
            Some(ViewUpdate::Connected) => info!(poll_id = %view.poll_id(), "live"),
            Some(ViewUpdate::StreamError(message)) => warn!("live stream: {message}"),
            Some(ViewUpdate::Updated) => print!("{}", render::poll(view.engine())),
            Some(ViewUpdate::Reset { vote_cleared }) => {
                println!("poll was reset");
                if vote_cleared {
                    println!("your vote was cleared");
                }
                print!("{}", render::poll(view.engine()));
            }
            Some(ViewUpdate::Closed) => {
                print!("{}", render::poll(view.engine()));
                println!("poll closed");
                break;
            }
        }
    }
    view.disable_live();
}

async fn whoami(config: &ClientConfig, token: Option<String>, username: &str) -> anyhow::Result<()> {
    let token = token.ok_or_else(|| {
        CliError::Argument("a session token is required (--token or PASSVOTE_TOKEN)".into())
    })?;
    let service = HttpIdentityService::with_timeouts(
        config.api_url.clone(),
        config.request_timeout(),
        config.connect_timeout(),
    )?;

    let session = SessionStore::new();
    session.initialize(service.resolve_session(&token, username).await);
    match session.identity() {
        Some(identity) => println!("signed in as {} ({})", identity.username, identity.id),
        None => println!("not signed in"),
    }
    Ok(())
}
