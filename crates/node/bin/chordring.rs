use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use chordring_core::dht::Did;
use chordring_core::dht::Node;
use chordring_core::dht::RingState;
use chordring_core::swarm::callback::CallbackError;
use chordring_core::swarm::callback::SwarmCallback;
use chordring_core::swarm::SwarmBuilder;
use chordring_node::config::Config;
use chordring_node::config::DEFAULT_CONFIG_PATH;
use chordring_node::logging::init_logging;
use chordring_node::logging::LogLevel;
use chordring_node::util::build_version;
use chordring_transport::connections::UdpTransport;
use clap::Args;
use clap::Parser;
use clap::Subcommand;

#[derive(Parser, Debug)]
#[command(about, version, author)]
struct Cli {
    #[arg(
        long,
        default_value = "info",
        env = "CHORDRING_LOG_LEVEL",
        value_parser = parse_log_level,
        help = "trace, debug, info, warn, error, or 4 down to 0"
    )]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn parse_log_level(s: &str) -> Result<LogLevel, chordring_node::error::Error> {
    s.parse()
}

#[derive(Subcommand, Debug)]
#[command(rename_all = "kebab-case")]
enum Command {
    #[command(about = "Write a default config file")]
    Init(InitCommand),
    #[command(about = "Run a ring node")]
    Run(RunCommand),
}

#[derive(Args, Debug)]
struct ConfigArgs {
    #[arg(long, short = 'c', default_value = DEFAULT_CONFIG_PATH, env = "CHORDRING_CONFIG")]
    config: PathBuf,
}

#[derive(Args, Debug)]
struct InitCommand {
    #[command(flatten)]
    config_args: ConfigArgs,

    #[arg(long, help = "Bootstrap peer, repeat for more")]
    well_known: Vec<SocketAddr>,
}

#[derive(Args, Debug)]
struct RunCommand {
    #[command(flatten)]
    config_args: ConfigArgs,

    #[arg(long, short = 'p', help = "Override the listening port")]
    port: Option<u16>,

    #[arg(long, help = "Override the bootstrap peers, repeat for more")]
    well_known: Vec<SocketAddr>,

    #[arg(long, help = "Known public address, skips address discovery")]
    external_address: Option<SocketAddr>,
}

/// Logs what the ring hands to this node.
struct LogCallback;

#[async_trait]
impl SwarmCallback for LogCallback {
    async fn on_deliver(&self, payload: &Bytes, origin: Node) -> Result<(), CallbackError> {
        tracing::info!("{} bytes delivered from {}", payload.len(), origin);
        Ok(())
    }

    async fn on_range_update(&self, pred_bound: Did, me: Did) -> Result<(), CallbackError> {
        tracing::info!("now responsible for ({}, {}]", pred_bound, me);
        Ok(())
    }

    async fn on_state_change(&self, state: RingState) -> Result<(), CallbackError> {
        tracing::info!("node is {}", state);
        Ok(())
    }
}

fn init(args: InitCommand) -> anyhow::Result<()> {
    let config = Config {
        well_known: args.well_known,
        ..Default::default()
    };
    let path = config.write_fs(&args.config_args.config)?;
    println!("Your config file has saved to: {}", path);
    Ok(())
}

async fn run(args: RunCommand) -> anyhow::Result<()> {
    let mut config = Config::read_fs(&args.config_args.config)?;
    if let Some(port) = args.port {
        config.port = port;
    }
    if !args.well_known.is_empty() {
        config.well_known = args.well_known;
    }
    if args.external_address.is_some() {
        config.external_address = args.external_address;
    }
    config.validate()?;

    tracing::info!("chordring {}", build_version());
    let transport = UdpTransport::bind(config.bind_addr()?).await?;
    let mut builder = SwarmBuilder::new(transport, config.well_known.clone())
        .stabilize_interval(config.stabilize_interval())
        .callback(Arc::new(LogCallback));
    if let Some(addr) = config.external_address {
        builder = builder.external_address(addr);
    }
    let swarm = Arc::new(builder.build()?);
    tracing::info!("listening on {}", swarm.local_addr()?);

    tokio::select! {
        res = swarm.clone().listen() => res?,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("interrupted, leaving the ring");
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_level);

    match cli.command {
        Command::Init(args) => init(args),
        Command::Run(args) => run(args).await,
    }
}
