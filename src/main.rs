use std::{
    fs,
    io::{self, Write},
    net::IpAddr,
    path::PathBuf,
    sync::Arc,
};

use clap::{Parser, Subcommand};
use script_relay::{
    config::Config,
    connector::Connector,
    error::{Error, Result},
    host::HostServer,
    stream::StreamEvent,
    tui,
};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG: &str = "script_relay=info";

#[derive(Parser)]
#[command(name = "script-relay")]
#[command(about = "Send scripts to a running host application and stream its output back")]
struct Cli {
    /// Config file (defaults to <config dir>/script-relay/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Host machine running the application
    #[arg(long, global = true)]
    host: Option<IpAddr>,
    /// Override the host's command port
    #[arg(long, global = true)]
    command_port: Option<u16>,
    /// Override the local stream port
    #[arg(long, global = true)]
    stream_port: Option<u16>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Edit scripts and watch host output in a terminal UI
    Edit,
    /// Send one script to the host
    Exec {
        /// Script text
        #[arg(required_unless_present = "file", conflicts_with = "file")]
        script: Option<String>,
        /// Read the script from a file
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
    /// Stream host output to stdout until interrupted
    Listen {
        /// Print one JSON event per line
        #[arg(long)]
        json: bool,
    },
    /// Run a simulated host that echoes scripts back as output
    Host,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_tracing(&cli.command) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }

    let result = match load_config(&cli) {
        Ok(config) => match cli.command {
            Commands::Edit => tui::run(&config).await,
            Commands::Exec { script, file } => exec(&config, script, file).await,
            Commands::Listen { json } => listen(&config, json).await,
            Commands::Host => host(&config).await,
        },
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

/// The editor owns the terminal, so it logs to a file. Everything else logs
/// to stderr.
fn init_tracing(command: &Commands) -> Result<()> {
    let filter = log_filter(std::env::var("RUST_LOG").ok().as_deref())?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    if matches!(command, Commands::Edit) {
        let dir = dirs::cache_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("script-relay");
        fs::create_dir_all(&dir)?;
        let log_file = fs::File::create(dir.join("script-relay.log"))?;
        builder.with_writer(log_file).with_ansi(false).init();
    } else {
        builder.with_writer(io::stderr).init();
    }
    Ok(())
}

/// `RUST_LOG` wins when set; otherwise this crate logs at info.
fn log_filter(rust_log: Option<&str>) -> Result<EnvFilter> {
    let directives = rust_log.filter(|d| !d.trim().is_empty()).unwrap_or(DEFAULT_LOG);
    EnvFilter::try_new(directives).map_err(|e| Error::Config(format!("log filter: {e}")))
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(host) = cli.host {
        config.set_host(host);
    }
    if let Some(port) = cli.command_port {
        config.command_endpoint.set_port(port);
    }
    if let Some(port) = cli.stream_port {
        config.stream_endpoint.set_port(port);
    }
    Ok(config)
}

async fn exec(config: &Config, script: Option<String>, file: Option<PathBuf>) -> Result<()> {
    let script = match (script, file) {
        (_, Some(path)) => fs::read_to_string(path)?,
        (Some(script), None) => script,
        (None, None) => return Err(Error::Config("no script given".to_string())),
    };
    let (connector, _events) = Connector::new(config);
    connector.execute(&script).await?;
    tracing::info!("Sent {} bytes to {}", script.len(), config.command_endpoint);
    Ok(())
}

async fn listen(config: &Config, json: bool) -> Result<()> {
    let (mut connector, mut events) = Connector::new(config);
    connector.connect().await?;

    let result = loop {
        let event = tokio::select! {
            _ = tokio::signal::ctrl_c() => break Ok(()),
            event = events.recv() => event,
        };
        let Some(event) = event else {
            break Ok(());
        };
        if let Err(e) = print_event(&event, json) {
            break Err(e);
        }
        if let StreamEvent::Closed { error: Some(error) } = event {
            tracing::error!("Listener failed: {error}");
            break Ok(());
        }
    };

    connector.cleanup().await?;
    result
}

fn print_event(event: &StreamEvent, json: bool) -> Result<()> {
    let mut stdout = io::stdout().lock();
    if json {
        serde_json::to_writer(&mut stdout, event)?;
        writeln!(stdout)?;
    } else if let StreamEvent::Output(fragment) = event {
        stdout.write_all(&fragment.data)?;
    } else {
        tracing::info!("{event:?}");
    }
    stdout.flush()?;
    Ok(())
}

async fn host(config: &Config) -> Result<()> {
    let server = Arc::new(HostServer::bind(config.command_endpoint, config).await?);
    let cancel = CancellationToken::new();
    let task = tokio::spawn(Arc::clone(&server).run(cancel.clone()));

    tokio::signal::ctrl_c().await?;
    cancel.cancel();
    task.await.map_err(io::Error::other)?
}

#[cfg(test)]
mod tests {
    use tracing_subscriber::filter::LevelFilter;

    use super::*;

    #[test]
    fn test_log_filter_defaults_to_info() {
        let filter = log_filter(None).unwrap();
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::INFO));
        let blank = log_filter(Some("  ")).unwrap();
        assert_eq!(blank.max_level_hint(), Some(LevelFilter::INFO));
    }

    #[test]
    fn test_rust_log_overrides_default_level() {
        let filter = log_filter(Some("script_relay=debug")).unwrap();
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::DEBUG));
    }

    #[test]
    fn test_invalid_rust_log_is_config_error() {
        assert!(matches!(log_filter(Some("script_relay=loud")), Err(Error::Config(_))));
    }
}
