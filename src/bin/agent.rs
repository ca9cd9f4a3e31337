use clap::Parser;
use storage_agent::{
    Agent,
    config::{Config, read_config_file},
    util::get_log_level,
};
use tracing::{debug, info, level_filters::LevelFilter, trace};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Parser)]
#[command(version, about = "Storage server monitoring agent")]
struct Args {
    /// Config file (JSON); defaults apply when omitted
    #[arg(short)]
    file: Option<String>,

    /// Log level for the agent's own targets (error, warn, info, debug, trace)
    #[arg(long)]
    log_level: Option<LevelFilter>,
}

fn init(level: LevelFilter) {
    let filter = filter::Targets::new().with_targets(vec![
        ("storage_agent", level),
        ("tower_http", LevelFilter::INFO.min(level)),
    ]);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_ansi(false),
        )
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let level = args
        .log_level
        .or_else(|| get_log_level().and_then(|l| l.parse().ok()))
        .unwrap_or(LevelFilter::INFO);
    init(level);
    trace!("started with args: {args:?}");

    let config = match &args.file {
        Some(path) => read_config_file(path)?,
        None => Config::default(),
    };
    debug!("using config: {config:?}");

    let agent = Agent::builder(config).start().await?;
    info!("listening on {}", agent.addr());

    tokio::signal::ctrl_c().await?;
    info!("received interrupt");

    agent.shutdown().await;

    Ok(())
}
