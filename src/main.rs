use anyhow::{anyhow, Result};
use clap::{ArgGroup, Args, Parser, Subcommand};
use serde_json::json;
use std::io::IsTerminal;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use zeabur_deploy::config::{self, DeployConfig};
use zeabur_deploy::error::DeployError;
use zeabur_deploy::events::{BusStatusDisplay, ConsoleStatusHandler, EventBus};
use zeabur_deploy::logging::{self, DEPLOY_CHANNEL};
use zeabur_deploy::relay::Relay;
use zeabur_deploy::shutdown::ShutdownCoordinator;
use zeabur_deploy::sources::{
    poll_until, CodeArrayFileSource, DirectorySource, PollingOptions, SnippetSource,
    SourceProvider,
};
use zeabur_deploy::upload::{
    package, to_code_array, FileEntry, StatusDisplay, TracingStatus, UploadResult, Uploader,
};

const STATUS_BUS_CAPACITY: usize = 64;
const STATUS_DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Parser, Debug)]
#[command(name = "zeabur-deploy")]
#[command(version, about = "Package generated source code and deploy it to Zeabur")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Package source files and upload them as a new project
    Deploy(DeployArgs),

    /// Show recorded deployments, newest first
    History {
        #[arg(long, default_value = "20")]
        limit: usize,
    },

    /// Show or update the saved configuration
    Config(ConfigArgs),
}

#[derive(Args, Debug)]
#[command(group(
    ArgGroup::new("source")
        .required(true)
        .args(["dir", "code_array", "snippet"])
))]
struct DeployArgs {
    /// Project directory (respects .gitignore)
    #[arg(long, value_name = "PATH")]
    dir: Option<String>,

    /// JSON file holding a [[path, content], ...] code array
    #[arg(long, value_name = "FILE")]
    code_array: Option<String>,

    /// Single code snippet file
    #[arg(long, value_name = "FILE")]
    snippet: Option<String>,

    /// Language of the snippet: python, javascript, html
    #[arg(long, requires = "snippet")]
    language: Option<String>,

    /// Wait for the source to produce files before uploading
    #[arg(long)]
    wait: bool,

    /// List archive members and digest without uploading
    #[arg(long)]
    dry_run: bool,

    /// Print the deployment URL without opening a browser
    #[arg(long)]
    no_open: bool,

    /// Route the upload through the page/bridge/background relay
    #[arg(long)]
    via_relay: bool,
}

#[derive(Args, Debug)]
struct ConfigArgs {
    /// Deployment service base URL
    #[arg(long, value_name = "URL")]
    api_url: Option<String>,

    /// Seconds to wait for a relayed upload response
    #[arg(long, value_name = "SECS")]
    relay_timeout: Option<u64>,

    /// Delete the saved configuration and fall back to defaults
    #[arg(long, conflicts_with_all = ["api_url", "relay_timeout"])]
    reset: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Err(e) = logging::init_logging() {
        eprintln!("Failed to initialize logging: {}", e);
    }

    match cli.command {
        Command::Deploy(args) => deploy(args).await,
        Command::History { limit } => history(limit),
        Command::Config(args) => configure(args),
    }
}

fn expand(path: &str) -> String {
    shellexpand::tilde(path).into_owned()
}

fn source_for(args: &DeployArgs) -> Result<Box<dyn SourceProvider>> {
    if let Some(dir) = &args.dir {
        return Ok(Box::new(DirectorySource::new(expand(dir))));
    }
    if let Some(file) = &args.code_array {
        return Ok(Box::new(CodeArrayFileSource::new(expand(file))));
    }
    if let Some(file) = &args.snippet {
        return Ok(Box::new(SnippetSource::new(expand(file), args.language.clone())));
    }
    Err(anyhow!("No source given"))
}

async fn collect_files(
    source: &dyn SourceProvider,
    wait: bool,
    shutdown: &ShutdownCoordinator,
) -> Result<Vec<FileEntry>, DeployError> {
    if !wait {
        return source.get_files();
    }

    poll_until(
        PollingOptions::default(),
        "source files",
        || source.get_files().ok().filter(|files| !files.is_empty()),
        shutdown,
    )
    .await
}

async fn deploy(args: DeployArgs) -> Result<()> {
    let config = config::load_config().map_err(DeployError::from)?;
    let shutdown = ShutdownCoordinator::new();

    let ctrl_c = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, shutting down");
            ctrl_c.shutdown();
        }
    });

    let source = source_for(&args)?;
    let files = collect_files(source.as_ref(), args.wait, &shutdown).await?;
    info!(source = source.name(), files = files.len(), "Collected source files");

    if args.dry_run {
        print_dry_run(&files)?;
        return Ok(());
    }

    // Toasts on an interactive terminal, plain log lines otherwise
    let (status, console) = if std::io::stderr().is_terminal() {
        let bus = EventBus::new(STATUS_BUS_CAPACITY);
        let console =
            ConsoleStatusHandler::new(bus.clone(), shutdown.clone(), std::io::stderr()).start();
        let status: Arc<dyn StatusDisplay> = Arc::new(BusStatusDisplay::new(bus));
        (status, Some(console))
    } else {
        let status: Arc<dyn StatusDisplay> = Arc::new(TracingStatus);
        (status, None)
    };
    let uploader = Arc::new(Uploader::new(&config)?);

    let result = if args.via_relay {
        let relay = Relay::start(uploader, status, config.relay_timeout(), &shutdown);
        relay.page.upload(to_code_array(&files)).await
    } else {
        uploader.upload_entries(&files, status.as_ref()).await
    };

    // Let the console render the terminal status before printing the result
    if let Some(console) = console {
        let _ = tokio::time::timeout(STATUS_DRAIN_TIMEOUT, console).await;
    }

    let outcome = report(&result, &config, source.name(), files.len(), args.no_open).await;
    shutdown.shutdown();
    outcome
}

fn print_dry_run(files: &[FileEntry]) -> Result<()> {
    let packaged = package(files)?;
    let members = zeabur_deploy::upload::read_archive(packaged.archive.as_bytes())?;

    for member in &members {
        println!("{:>8}  {}", member.content.len(), member.path);
    }
    println!("{} file(s), archive {} bytes", members.len(), packaged.archive.len());
    println!("sha256 {}", packaged.digest);
    Ok(())
}

async fn report(
    result: &UploadResult,
    config: &DeployConfig,
    source: &str,
    file_count: usize,
    no_open: bool,
) -> Result<()> {
    match result {
        UploadResult::Success { url } => {
            println!("{}", url);

            if let Err(e) = logging::log_with_details(
                DEPLOY_CHANNEL,
                "INFO",
                "Deployment uploaded",
                json!({ "url": url, "source": source, "files": file_count }),
            ) {
                warn!(error = %e, "Failed to record deployment");
            }

            if config.open_browser && !no_open {
                tokio::time::sleep(config.redirect_delay()).await;
                if let Err(e) = open::that(url) {
                    warn!(error = %e, "Failed to open browser");
                }
            }
            Ok(())
        }
        UploadResult::Failure { error } => {
            let message = format!("Upload failed: {}", error);
            if let Err(e) = logging::log_error(DEPLOY_CHANNEL, &message) {
                warn!(error = %e, "Failed to record deployment failure");
            }
            Err(anyhow!("Upload failed: {}", error))
        }
    }
}

fn history(limit: usize) -> Result<()> {
    let entries =
        logging::read_activity_logs(DEPLOY_CHANNEL, Some(limit)).map_err(DeployError::from)?;

    if entries.is_empty() {
        println!("No deployments recorded");
        return Ok(());
    }

    for entry in entries {
        let url = entry
            .details
            .as_ref()
            .and_then(|d| d.get("url"))
            .and_then(|u| u.as_str())
            .unwrap_or("");
        println!("{}  {:<5}  {}  {}", entry.timestamp, entry.level, entry.message, url);
    }
    Ok(())
}

fn configure(args: ConfigArgs) -> Result<()> {
    if args.reset {
        config::clear_config().map_err(DeployError::from)?;
        println!("Configuration reset");
        return Ok(());
    }

    let path = config::get_config_file_path().map_err(DeployError::from)?;
    let mut current = config::load_config_from(&path).map_err(DeployError::from)?;

    let mut changed = false;
    if let Some(api_url) = args.api_url {
        url::Url::parse(&api_url).map_err(|e| anyhow!("Invalid API URL '{}': {}", api_url, e))?;
        current.api_base_url = api_url;
        changed = true;
    }
    if let Some(secs) = args.relay_timeout {
        current.relay_timeout_secs = secs;
        changed = true;
    }

    if changed {
        config::save_config(&current).map_err(DeployError::from)?;
        info!(path = %path.display(), "Saved configuration");
    }

    println!("{}", serde_json::to_string_pretty(&current)?);
    Ok(())
}
