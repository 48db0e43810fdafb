use std::time::Duration;

use anyhow::Result;
use application::Supervisor;
use application::registry::DeviceRegistry;
use clap::Parser;
use dotenv::dotenv;
use infrastructure::SimulatedBus;
use infrastructure::config::AgentConfig;
use station_agent::bench;
use station_agent::wiring::{self, Transport};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to config directory
    #[arg(long, default_value = "config")]
    config_dir: String,

    /// Override the serial port prefix (e.g. /dev/ttyACM)
    #[arg(long)]
    port_prefix: Option<String>,

    /// Override the expected scan length
    #[arg(long)]
    scan_length: Option<usize>,

    /// Run against simulated devices that present demo badges
    #[arg(long)]
    simulate: bool,

    /// Seconds between demo badges in simulate mode
    #[arg(long, default_value_t = 30)]
    badge_interval: u64,
}

async fn run() -> Result<()> {
    dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "info,station_agent=debug,application=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("🤖 Auratic Station Agent Starting...");
    info!("🆔 Process ID: {}", std::process::id());

    let args = Args::parse();

    // Running from the workspace root during development
    let dev_config = "crates/station-agent/config";
    let config_dir = if args.config_dir == "config" && std::path::Path::new(dev_config).exists() {
        dev_config.to_string()
    } else {
        args.config_dir.clone()
    };
    info!("📂 Config directory: {}", config_dir);

    let mut config = AgentConfig::load(&config_dir)?;
    if let Some(prefix) = args.port_prefix {
        config.ports.prefix = prefix;
    }
    if let Some(scan_length) = args.scan_length {
        config.protocol.scan_length = scan_length;
    }
    config.validate()?;

    info!(
        station = %config.station_id,
        roles = config.devices.len(),
        content = config.content.len(),
        "✅ Loaded configuration"
    );

    let cancel = CancellationToken::new();
    let registry = DeviceRegistry::new(config.logical_devices()?)?;

    let transport = if args.simulate {
        let bus = SimulatedBus::new(config.ports.prefix.clone(), config.ports.max_ports);
        match bench::attach_devices(&bus, &config)? {
            Some(reader) => {
                tokio::spawn(bench::present_badges(
                    bus.clone(),
                    reader,
                    bench::demo_badges(&config),
                    Duration::from_secs(args.badge_interval.max(1)),
                    cancel.child_token(),
                ));
            }
            None => warn!("No fixed badge reader configured, no demo badges"),
        }
        info!("🧪 Simulation mode");
        Transport::Simulated(bus)
    } else {
        info!(prefix = %config.ports.prefix, max_ports = config.ports.max_ports, "🔌 Hardware mode");
        Transport::Hardware
    };

    let supervisor = Supervisor::new(
        registry,
        wiring::station_io(&config, transport),
        wiring::supervisor_settings(&config),
    );
    let handle = tokio::spawn(supervisor.run(cancel.clone()));

    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("🛑 Shutting down..."),
        Err(err) => warn!(error = %err, "Unable to listen for shutdown signal"),
    }
    cancel.cancel();

    let registry = handle.await?;
    info!(live = registry.endpoint_set().len(), "👋 Good bye!");
    Ok(())
}

fn main() {
    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("❌ Failed to start runtime: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = rt.block_on(run()) {
        eprintln!("\n❌ CRITICAL ERROR: {:?}", e);
        eprintln!("--------------------------------------------------");
        eprintln!("The station agent stopped because of a fatal error.");
        std::process::exit(1);
    }
}
