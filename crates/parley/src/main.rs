use std::env;
use std::fs;
use std::io::{self, IsTerminal, Write};
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use log::{LevelFilter, debug, error, info, warn};
use tokio::net::TcpListener;

use parley::api::{self, AppState};
use parley::config::{self, APP_NAME, AppConfig, AppPaths};
use parley::db::Database;
use parley::history::{HistoryStore, SqliteHistoryStore};
use parley::logging::{self, LogSettings};
use parley::provider::{CompletionClient, ProviderConfig};
use parley::relay::RelayService;

fn main() {
    if let Err(err) = try_main() {
        let _ = writeln!(io::stderr(), "{err:?}");
        std::process::exit(1);
    }
}

#[tokio::main]
async fn async_serve(ctx: RuntimeContext, cmd: ServeCommand) -> Result<()> {
    handle_serve(&ctx, cmd).await
}

#[tokio::main]
async fn async_history(ctx: RuntimeContext, cmd: HistoryCommand) -> Result<()> {
    handle_history(&ctx, cmd).await
}

fn try_main() -> Result<()> {
    let cli = Cli::parse();

    let ctx = RuntimeContext::new(cli.common.clone())?;
    ctx.init_logging()?;
    debug!("resolved paths: {}", ctx.paths);

    match cli.command {
        Command::Serve(cmd) => async_serve(ctx, cmd),
        Command::Init(cmd) => handle_init(&ctx, cmd),
        Command::Config { command } => handle_config(&ctx, command),
        Command::History { command } => async_history(ctx, command),
        Command::Completions { shell } => handle_completions(shell),
    }
}

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Parley - chat history server with an LLM relay.",
    propagate_version = true
)]
struct Cli {
    #[command(flatten)]
    common: CommonOpts,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Args)]
struct CommonOpts {
    /// Config file to use instead of the default location
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<std::path::PathBuf>,
    /// Silence all log output
    #[arg(short, long, global = true)]
    quiet: bool,
    /// More log output (-v debug, -vv trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    /// Same as -v
    #[arg(long, global = true)]
    debug: bool,
    /// Same as -vv
    #[arg(long, global = true)]
    trace: bool,
    /// Print command output and logs as JSON
    #[arg(long, global = true, conflicts_with = "yaml")]
    json: bool,
    /// Print command output as YAML
    #[arg(long, global = true)]
    yaml: bool,
    /// When to color log output
    #[arg(long, value_enum, default_value_t = ColorOption::Auto, global = true)]
    color: ColorOption,
    /// Report what would be written without touching disk
    #[arg(long = "dry-run", global = true)]
    dry_run: bool,
    /// Skip confirmation prompts
    #[arg(short = 'y', long = "yes", global = true)]
    assume_yes: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ColorOption {
    Auto,
    Always,
    Never,
}

impl ColorOption {
    fn use_ansi(self) -> bool {
        match self {
            Self::Always => true,
            Self::Never => false,
            Self::Auto => env::var_os("NO_COLOR").is_none() && io::stderr().is_terminal(),
        }
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Start the HTTP API server
    Serve(ServeCommand),
    /// Create config directories and default files
    Init(InitCommand),
    /// Inspect and manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
    /// Inspect or clear the stored chat history
    History {
        #[command(subcommand)]
        command: HistoryCommand,
    },
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Debug, Clone, Args)]
struct ServeCommand {
    /// Host address to bind to (default: server.host)
    #[arg(long)]
    host: Option<String>,
    /// Port to listen on (default: server.port, or PORT)
    #[arg(short, long)]
    port: Option<u16>,
}

#[derive(Debug, Clone, Args)]
struct InitCommand {
    /// Recreate configuration even if it already exists
    #[arg(long = "force")]
    force: bool,
}

#[derive(Debug, Subcommand)]
enum ConfigCommand {
    /// Output the effective configuration (secrets redacted)
    Show,
    /// Print the resolved config file path
    Path,
    /// Regenerate the default configuration file
    Reset,
}

#[derive(Debug, Subcommand)]
enum HistoryCommand {
    /// Print every stored message, oldest first
    List,
    /// Delete every stored message
    Clear,
}

#[derive(Debug, Clone)]
struct RuntimeContext {
    common: CommonOpts,
    paths: AppPaths,
    config: AppConfig,
}

impl RuntimeContext {
    fn new(common: CommonOpts) -> Result<Self> {
        let paths = AppPaths::discover(common.config.clone())?;
        let config = config::load_or_init_config(&paths, common.dry_run)?;
        let paths = paths.apply_overrides(&config)?;
        let ctx = Self {
            common,
            paths,
            config,
        };
        ctx.ensure_directories()?;
        Ok(ctx)
    }

    fn init_logging(&self) -> Result<()> {
        let level = if self.common.quiet {
            LevelFilter::Off
        } else {
            logging::resolve_level(
                &self.config.logging.level,
                self.common.verbose,
                self.common.debug,
                self.common.trace,
            )
        };

        logging::init(LogSettings {
            level,
            json: self.common.json,
            ansi: self.common.color.use_ansi(),
        })
    }

    fn ensure_directories(&self) -> Result<()> {
        if self.common.dry_run {
            info!(
                "dry-run: would ensure data dir {}",
                self.paths.data_dir.display()
            );
            return Ok(());
        }

        fs::create_dir_all(&self.paths.data_dir).with_context(|| {
            format!("creating data directory {}", self.paths.data_dir.display())
        })
    }

    async fn open_store(&self) -> Result<SqliteHistoryStore> {
        let database = Database::open(&self.paths.database_file)
            .await
            .with_context(|| {
                format!(
                    "opening database at {}",
                    self.paths.database_file.display()
                )
            })?;
        Ok(SqliteHistoryStore::new(database))
    }
}

fn handle_init(ctx: &RuntimeContext, cmd: InitCommand) -> Result<()> {
    if ctx.paths.config_file.exists() && !(cmd.force || ctx.common.assume_yes) {
        return Err(anyhow!(
            "config already exists at {} (use --force to overwrite)",
            ctx.paths.config_file.display()
        ));
    }

    if ctx.common.dry_run {
        info!(
            "dry-run: would write default config to {}",
            ctx.paths.config_file.display()
        );
        return Ok(());
    }

    config::write_default_config(&ctx.paths.config_file)?;
    info!("wrote default config to {}", ctx.paths.config_file.display());
    Ok(())
}

fn handle_config(ctx: &RuntimeContext, command: ConfigCommand) -> Result<()> {
    match command {
        ConfigCommand::Show => {
            let shown = ctx.config.redacted();
            if ctx.common.json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&shown).context("serializing config to JSON")?
                );
            } else if ctx.common.yaml {
                println!(
                    "{}",
                    serde_yaml::to_string(&shown).context("serializing config to YAML")?
                );
            } else {
                println!(
                    "{}",
                    toml::to_string_pretty(&shown).context("serializing config to TOML")?
                );
            }
            Ok(())
        }
        ConfigCommand::Path => {
            println!("{}", ctx.paths.config_file.display());
            Ok(())
        }
        ConfigCommand::Reset => {
            if ctx.common.dry_run {
                info!(
                    "dry-run: would reset config at {}",
                    ctx.paths.config_file.display()
                );
                return Ok(());
            }
            config::write_default_config(&ctx.paths.config_file)
        }
    }
}

async fn handle_history(ctx: &RuntimeContext, cmd: HistoryCommand) -> Result<()> {
    let store = ctx.open_store().await?;

    let result = match cmd {
        HistoryCommand::List => print_history(ctx, &store).await,
        HistoryCommand::Clear => clear_history(ctx, &store).await,
    };

    store.database().close().await;
    result
}

async fn print_history(ctx: &RuntimeContext, store: &SqliteHistoryStore) -> Result<()> {
    let messages = store.list_all().await.context("reading chat history")?;

    if ctx.common.json {
        println!("{}", serde_json::to_string_pretty(&messages)?);
    } else if ctx.common.yaml {
        println!("{}", serde_yaml::to_string(&messages)?);
    } else {
        for message in &messages {
            println!(
                "[{}] #{} {:<9} {}",
                message.timestamp.format("%Y-%m-%d %H:%M:%S"),
                message.id,
                message.role,
                message.content
            );
        }
        println!();
        println!("Total: {} messages", messages.len());
    }
    Ok(())
}

async fn clear_history(ctx: &RuntimeContext, store: &SqliteHistoryStore) -> Result<()> {
    let count = store.count().await.context("counting messages")?;
    if count == 0 {
        println!("History is already empty");
        return Ok(());
    }

    if ctx.common.dry_run {
        info!("dry-run: would delete {count} message(s)");
        return Ok(());
    }

    if !ctx.common.assume_yes && !confirm(&format!("Delete all {count} message(s)?"))? {
        println!("Aborted");
        return Ok(());
    }

    let deleted = store.clear_all().await.context("clearing chat history")?;
    if ctx.common.json {
        println!(
            "{}",
            serde_json::json!({"message": "Chat history cleared", "deleted": deleted})
        );
    } else {
        println!("Deleted {deleted} message(s)");
    }
    Ok(())
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{prompt} [y/N] ");
    io::stdout().flush().context("flushing stdout")?;

    let mut answer = String::new();
    io::stdin()
        .read_line(&mut answer)
        .context("reading confirmation")?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

fn handle_completions(shell: Shell) -> Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, APP_NAME, &mut io::stdout());
    Ok(())
}

async fn handle_serve(ctx: &RuntimeContext, cmd: ServeCommand) -> Result<()> {
    let host = cmd.host.unwrap_or_else(|| ctx.config.server.host.clone());
    let port = cmd.port.unwrap_or(ctx.config.server.port);

    let sqlite_store = ctx.open_store().await?;
    let database = sqlite_store.database().clone();
    let store: Arc<dyn HistoryStore> = Arc::new(sqlite_store);

    let settings = &ctx.config.provider;
    let provider_config = ProviderConfig::resolve(settings.api_key.as_deref());
    let client = CompletionClient::new(settings).context("creating completion client")?;
    let model = client.model().to_string();

    let relay = Arc::new(RelayService::new(
        Arc::clone(&store),
        Arc::new(client),
        provider_config,
    ));
    let state = AppState::new(Arc::clone(&relay), store)
        .with_cors_origins(ctx.config.server.cors_origins.clone());

    let app = api::create_router(state);

    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .context("invalid address")?;

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding to {addr}"))?;

    info!("Parley server listening on http://{addr}");
    info!("Database: {}", ctx.paths.database_file.display());
    info!("Model: {model}");
    if relay.is_configured() {
        info!("Completion provider: configured");
    } else {
        warn!(
            "No provider key configured: replies will be a placeholder. Set {} or provider.api_key in {}",
            config::API_KEY_ENV,
            ctx.paths.config_file.display()
        );
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("running server")?;

    database.close().await;
    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, draining connections...");
}
