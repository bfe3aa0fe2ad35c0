mod action;
mod error;
mod manager;
mod prompt;
mod report;
mod ssh;
mod state;
mod systemd;

use clap::{ArgAction, ArgGroup, Parser};
use futures::StreamExt;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use action::Action;
use error::TunnelError;
use manager::{TunnelEntry, TunnelManager};
use prompt::{Confirm, ConsolePrompt};
use ssh::tunnel::{CreateRequest, DEFAULT_LOCAL_IP};
use state::persistence::AppConfig;
use systemd::store::{DescriptorStore, UnitDir};
use systemd::supervisor::{Supervisor, Systemctl};

#[derive(Parser, Debug)]
#[command(
    name = "simple-tunnel",
    about = "Run SSH port forwards as systemd user services",
    version
)]
#[command(group(ArgGroup::new("operation").args(["list", "start", "stop", "delete"])))]
struct Cli {
    /// Remote host to forward to
    #[arg(long = "ext_ip", value_name = "HOST")]
    ext_ip: Option<String>,

    /// Remote port to forward to
    #[arg(long = "ext_port", value_name = "PORT")]
    ext_port: Option<String>,

    /// Local address to bind
    #[arg(long = "local_ip", value_name = "ADDR", default_value = DEFAULT_LOCAL_IP)]
    local_ip: String,

    /// Local port to bind
    #[arg(long = "local_port", value_name = "PORT")]
    local_port: Option<String>,

    /// Tunnel name (generated when omitted)
    #[arg(long)]
    name: Option<String>,

    /// Host the forward is relayed through
    #[arg(long, value_name = "HOST")]
    proxy: Option<String>,

    /// Start the tunnel on every login, not just now
    #[arg(long)]
    persist: bool,

    /// Show tunnels and their status
    #[arg(long)]
    list: bool,

    /// Print the list as JSON
    #[arg(long, requires = "list")]
    json: bool,

    /// Start a tunnel
    #[arg(long, value_name = "NAME")]
    start: Option<String>,

    /// Stop a tunnel
    #[arg(long, value_name = "NAME")]
    stop: Option<String>,

    /// Stop and remove a tunnel
    #[arg(long, value_name = "NAME")]
    delete: Option<String>,

    /// Answer yes to confirmation prompts
    #[arg(short, long, visible_alias = "force")]
    yes: bool,

    /// Path to config file
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// More log output (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn action(&self) -> Action {
        if self.list {
            Action::List { json: self.json }
        } else if let Some(ref name) = self.start {
            Action::Start(name.clone())
        } else if let Some(ref name) = self.stop {
            Action::Stop(name.clone())
        } else if let Some(ref name) = self.delete {
            Action::Delete(name.clone())
        } else {
            Action::Create(CreateRequest {
                name: self.name.clone(),
                local_ip: self.local_ip.clone(),
                local_port: self.local_port.clone(),
                remote_host: self.ext_ip.clone(),
                remote_port: self.ext_port.clone(),
                proxy: self.proxy.clone().unwrap_or_default(),
                persistent: self.persist,
            })
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = AppConfig::load(cli.config.as_deref()).general;
    let store = UnitDir::new(config.unit_dir);
    tracing::debug!(unit_dir = %store.path().display(), "using unit directory");
    let mut manager = TunnelManager::new(
        store,
        Systemctl::new(config.systemctl_path),
        ConsolePrompt::new(cli.yes),
        config.ssh_path,
    );

    match run(&mut manager, cli.action()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            print_error(&e);
            e.exit_code()
        }
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        _ => Level::DEBUG,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Warning: Failed to install logger: {e}");
    }
}

async fn run<D, S, C>(manager: &mut TunnelManager<D, S, C>, action: Action) -> Result<(), TunnelError>
where
    D: DescriptorStore,
    S: Supervisor,
    C: Confirm,
{
    match action {
        Action::Create(request) => {
            let tunnel = manager.create(&request).await?;
            let via = tunnel
                .jump_proxy
                .as_deref()
                .map(|proxy| format!(" via {proxy}"))
                .unwrap_or_default();
            println!(
                "Created tunnel '{}': {}{}",
                tunnel.name,
                tunnel.forward_spec(),
                via
            );
            if tunnel.persistent {
                println!("   Enabled: starts on every login");
            }
        }
        Action::List { json } => {
            let entries: Vec<TunnelEntry> = manager.list()?.collect().await;
            if json {
                println!("{}", report::json(&entries)?);
            } else {
                print!("{}", report::table(&entries));
            }
        }
        Action::Start(name) => {
            manager.start(&name).await?;
            println!("Started tunnel '{name}'");
        }
        Action::Stop(name) => {
            manager.stop(&name).await?;
            println!("Stopped tunnel '{name}'");
        }
        Action::Delete(name) => {
            manager.delete(&name).await?;
            println!("Deleted tunnel '{name}'");
        }
    }
    Ok(())
}

fn print_error(error: &TunnelError) {
    match error {
        TunnelError::Validation(msg) => {
            eprintln!("{msg}");
            eprintln!("Try --help for troubleshooting.");
        }
        TunnelError::NotFound(_) | TunnelError::Aborted => eprintln!("{error}"),
        _ => eprintln!("Error: {error}"),
    }
}
