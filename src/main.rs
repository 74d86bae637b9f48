//! mudcode - tmux bridge for long-running coding agents

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mudcode::{
    config::BridgeConfig,
    executor::{RemoteTarget, SshExecutor},
    state::{BridgeState, ProjectState},
    tmux::{resolve_window_name, session_name_for},
    SessionManager,
};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "mudcode")]
#[command(version)]
#[command(about = "Reach coding agents running in tmux, locally or over ssh")]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "MUDCODE_CONFIG")]
    config: Option<PathBuf>,

    /// Project registry path (overrides storage.statePath)
    #[arg(long, env = "MUDCODE_STATE_PATH")]
    state: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the session and window an agent instance resolves to
    Window {
        /// Project name
        project: String,

        /// Agent name
        agent: String,

        /// Instance id
        #[arg(short, long)]
        instance: Option<String>,
    },

    /// Print how the ssh target resolves
    Target {
        /// Raw target (defaults to tmux.sshTarget)
        target: Option<String>,

        /// Explicit port
        #[arg(short, long)]
        port: Option<i64>,

        /// Identity file
        #[arg(short = 'i', long)]
        identity: Option<String>,
    },

    /// Create the agent's session and window when missing
    Ensure {
        /// Project name
        project: String,

        /// Agent name
        agent: String,

        /// Instance id
        #[arg(short, long)]
        instance: Option<String>,
    },

    /// Print the agent's pane
    Capture {
        /// Project name
        project: String,

        /// Agent name
        agent: String,

        /// Instance id
        #[arg(short, long)]
        instance: Option<String>,

        /// Only print the redraw tail
        #[arg(long)]
        tail: bool,

        /// Create the window first when missing
        #[arg(long)]
        ensure: bool,
    },

    /// Show configuration
    Config {
        /// Show default configuration
        #[arg(long)]
        default: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("mudcode={}", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = BridgeConfig::load_or_default(cli.config.as_deref())
        .context("Failed to load configuration")?;
    let state_path = cli
        .state
        .unwrap_or_else(|| config.storage.state_path.clone());

    match cli.command {
        Commands::Window {
            project,
            agent,
            instance,
        } => {
            let project = load_project(&state_path, &project);
            let session = session_name_for(&project, &config.tmux);
            let window = resolve_window_name(&project, &agent, &config.tmux, instance.as_deref());
            println!("{}:{}", session, window);
            if let Some(channel) = project.find_channel_id(&agent, instance.as_deref()) {
                println!("channel: {}", channel);
            }
        }
        Commands::Target {
            target,
            port,
            identity,
        } => {
            show_target(&config, target, port, identity)?;
        }
        Commands::Ensure {
            project,
            agent,
            instance,
        } => {
            let project = load_project(&state_path, &project);
            let manager = SessionManager::from_config(config)?;
            let (resolved, outcome) = manager
                .ensure(&project, &agent, instance.as_deref())
                .await?;
            println!(
                "{}:{} {} {:?}",
                resolved.session,
                resolved.window,
                resolved.window_id.as_deref().unwrap_or("-"),
                outcome
            );
        }
        Commands::Capture {
            project,
            agent,
            instance,
            tail,
            ensure,
        } => {
            let project = load_project(&state_path, &project);
            let manager = SessionManager::from_config(config)?;
            let pane = if ensure {
                manager
                    .ensure_and_capture(&project, &agent, instance.as_deref())
                    .await?
            } else {
                manager
                    .capture(&project, &agent, instance.as_deref())
                    .await?
            };
            if tail {
                println!("{}", pane.redraw_tail());
            } else {
                print!("{}", pane.text);
            }
        }
        Commands::Config { default } => {
            show_config(if default { None } else { Some(&config) })?;
        }
    }

    Ok(())
}

/// Snapshot of one project; unknown projects start empty
fn load_project(state_path: &std::path::Path, project_name: &str) -> ProjectState {
    let state = BridgeState::load(state_path);
    state
        .project(project_name)
        .cloned()
        .unwrap_or_else(|| {
            tracing::debug!(project = %project_name, "Project not in registry");
            ProjectState {
                project_name: project_name.to_string(),
                ..ProjectState::default()
            }
        })
}

fn show_target(
    config: &BridgeConfig,
    target: Option<String>,
    port: Option<i64>,
    identity: Option<String>,
) -> Result<()> {
    let raw = target
        .or_else(|| config.tmux.ssh_target.clone())
        .context("No target given and tmux.sshTarget is not set")?;
    let port = port.or(config.tmux.ssh_port);
    let identity = identity.or_else(|| config.tmux.ssh_identity.clone());

    let target = RemoteTarget::resolve(&raw, port, identity.as_deref())?;
    println!("host:     {}", target.host_spec);
    match target.port {
        Some(port) => println!("port:     {}", port),
        None => println!("port:     (ssh default)"),
    }
    if let Some(identity) = &target.identity_file {
        println!("identity: {}", identity);
    }
    let executor = SshExecutor::new(target);
    println!("command:  {}", executor.invocation("tmux list-sessions"));
    Ok(())
}

fn show_config(config: Option<&BridgeConfig>) -> Result<()> {
    let config = config.cloned().unwrap_or_default();
    let toml = toml::to_string_pretty(&config)?;
    println!("{}", toml);
    Ok(())
}
