use anyhow::{anyhow, bail, Result};
use clap::Parser;
use desksurf::api::logging::init_logging;
use desksurf::api::AgentClient;
use desksurf::config::Config;
use desksurf::desktop::{DesktopProvider, DesktopView, LocalDesktopProvider, RemoteSession};
use desksurf::scaling::{FileScreenshotSource, FrameScaler, Resolution};
use desksurf::state::{Message, MessageBody, SendOutcome, Session, SessionUpdate};
use desksurf::types::ComputerModel;
use desksurf::util::parse_resolution;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::warn;

#[derive(Parser, Debug)]
#[command(name = "desksurf")]
#[command(about = "Drive a remote desktop agent from the terminal", long_about = None)]
struct Cli {
    /// TOML config file; DESKSURF_* variables override it
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    #[arg(long, value_name = "URL")]
    api_url: Option<String>,

    /// openai or anthropic
    #[arg(long, value_parser = parse_model)]
    model: Option<ComputerModel>,

    /// Desktop resolution, e.g. 1920x1080
    #[arg(long, value_parser = parse_resolution_arg)]
    resolution: Option<Resolution>,

    #[arg(long)]
    environment: Option<String>,

    /// Print the effective config as TOML and exit
    #[arg(long)]
    gen_config: bool,

    /// Scale a screenshot to the model resolution
    #[arg(long, value_name = "PATH", requires = "out")]
    screenshot: Option<PathBuf>,

    #[arg(long, value_name = "PATH", requires = "screenshot")]
    out: Option<PathBuf>,

    /// Release the remote desktop once the task ends
    #[arg(long)]
    terminate: bool,

    /// Task for the agent
    instruction: Vec<String>,
}

fn parse_model(value: &str) -> Result<ComputerModel, String> {
    ComputerModel::parse(value).ok_or_else(|| format!("expected 'openai' or 'anthropic', got '{value}'"))
}

fn parse_resolution_arg(value: &str) -> Result<Resolution, String> {
    parse_resolution(value).ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{value}'"))
}

struct ConsoleView;

impl DesktopView for ConsoleView {
    fn session_ready(&self, session: &RemoteSession) {
        println!("[desktop] {} ({})", session.view_url, session.session_id);
    }
}

fn print_message(message: &Message) {
    match &message.body {
        MessageBody::User { content } => println!("> {content}"),
        MessageBody::Assistant { content, model } => println!("[{model}] {content}"),
        MessageBody::System { content, is_error } => {
            if *is_error {
                eprintln!("[error] {content}");
            } else {
                println!("[system] {content}");
            }
        }
        MessageBody::Action { action, status, .. } => {
            println!("[action {}] {action} ({status:?})", message.id)
        }
    }
}

async fn render_updates(
    session: Session,
    mut updates: mpsc::UnboundedReceiver<SessionUpdate>,
    budget: Duration,
) {
    let provider = LocalDesktopProvider;
    while let Some(update) = updates.recv().await {
        match update {
            SessionUpdate::Appended(message) => print_message(&message),
            SessionUpdate::ContentChanged { content, .. } => {
                if let Some(line) = content.lines().last() {
                    println!("  {line}");
                }
            }
            SessionUpdate::StatusChanged { id, status } => match session.message(&id) {
                Some(Message {
                    body: MessageBody::Action { action, .. },
                    ..
                }) => println!("[action {id}] {action} -> {status:?}"),
                _ => println!("[action {id}] {status:?}"),
            },
            SessionUpdate::SessionReady(remote) => {
                if let Err(error) = provider.extend_lifetime(&remote.session_id, budget).await {
                    warn!(%error, "failed to extend desktop lifetime");
                }
            }
            SessionUpdate::Idle(_) => break,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(api_url) = cli.api_url {
        config.api_url = api_url;
    }
    if let Some(model) = cli.model {
        config.model = model;
    }
    if let Some(resolution) = cli.resolution {
        config.resolution = resolution;
    }
    if cli.environment.is_some() {
        config.environment = cli.environment;
    }

    init_logging(&config.log_level);

    if cli.gen_config {
        print!("{}", toml::to_string_pretty(&config)?);
        return Ok(());
    }
    config.validate()?;

    let transform = config.scale_transform()?;
    println!(
        "desktop {} -> model {} (scale {:.4})",
        transform.original(),
        transform.scaled(),
        transform.scale_factor()
    );

    if let (Some(input), Some(out)) = (cli.screenshot, cli.out) {
        let scaler = FrameScaler::new(FileScreenshotSource::new(input), transform);
        let frame = scaler.take_screenshot().await?;
        tokio::fs::write(&out, &frame).await?;
        println!("wrote {} ({} bytes)", out.display(), frame.len());
        if cli.instruction.is_empty() {
            return Ok(());
        }
    }

    if cli.instruction.is_empty() {
        bail!("no instruction given");
    }

    let client = AgentClient::new(&config)?;
    println!("agent endpoint {}", client.api_url());

    let (tx, rx) = mpsc::unbounded_channel();
    let session = Session::new(client, &config)?
        .with_updates(tx)
        .with_desktop_view(Arc::new(ConsoleView));
    let renderer = tokio::spawn(render_updates(
        session.clone(),
        rx,
        config.session_budget(),
    ));

    let stopper = session.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            stopper.stop();
        }
    });

    let outcome = session.send_message(cli.instruction.join(" ")).await?;
    let _ = renderer.await;

    if cli.terminate {
        if let Some(remote) = session.remote_session() {
            LocalDesktopProvider.terminate(&remote.session_id).await?;
        }
    }

    match outcome {
        SendOutcome::Completed | SendOutcome::Ended => Ok(()),
        SendOutcome::Cancelled(reason) => {
            println!("stopped: {reason:?}");
            Ok(())
        }
        SendOutcome::Failed(error) => Err(anyhow!(error)),
    }
}
