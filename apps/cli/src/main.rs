use std::time::{Duration, Instant};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use eps_core::{
    BatteryCommand, CommandStatus, ConfigRecord, EpsSession, OcpRailState, SerialTransport,
    SessionConfig, TracingObserver,
};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(author, version, about = "EPS command and telemetry tool", long_about = None)]
struct Args {
    /// Serial port the EPS is attached to
    #[arg(long, default_value = "/dev/ttyUSB0")]
    port: String,

    /// Baud rate
    #[arg(long, default_value_t = 57600)]
    baud: u32,

    /// Reply timeout in milliseconds
    #[arg(long, default_value_t = 4000)]
    timeout_ms: u64,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Collect and print a housekeeping report
    Hk,
    /// Switch the OCP rails to exactly the named set
    Ocp {
        /// Rail names, comma separated (or "all" / "none")
        #[arg(value_delimiter = ',')]
        rails: Vec<String>,
    },
    /// Power-cycle the named rails through their OCP switches
    ResetOcp {
        #[arg(value_delimiter = ',')]
        rails: Vec<String>,
    },
    /// Upload a configuration file and wait for its echo
    Config {
        /// TOML file holding the configuration record
        path: String,
    },
    /// Forward a raw command to the battery board
    Batt { command_type: u8, value: u8 },
    /// Turn off the battery daughterboard heater
    DisableHeater,
}

fn parse_rails(names: &[String]) -> anyhow::Result<OcpRailState> {
    let mut rails = OcpRailState::default();
    for name in names {
        match name.as_str() {
            "all" => return Ok(OcpRailState::ALL),
            "none" => return Ok(OcpRailState::default()),
            "radio_tx" => rails.radio_tx = true,
            "radio_rx_camera" => rails.radio_rx_camera = true,
            "eps_mcu" => rails.eps_mcu = true,
            "obc" => rails.obc = true,
            "gnss_rx" => rails.gnss_rx = true,
            "gnss_lna" => rails.gnss_lna = true,
            other => bail!("unknown rail name: {}", other),
        }
    }
    Ok(rails)
}

/// Step the session until the issued command reaches a final status.
fn drive(session: &mut EpsSession<SerialTransport, TracingObserver>) -> anyhow::Result<()> {
    loop {
        session.step(Instant::now())?;
        match session.command_status() {
            CommandStatus::Success => {
                session.clear_command_status();
                return Ok(());
            }
            CommandStatus::Failure => {
                let reason = session
                    .last_error()
                    .map(|e| e.to_string())
                    .unwrap_or_else(|| "unknown".to_string());
                bail!("command failed: {}", reason);
            }
            _ => std::thread::sleep(Duration::from_millis(10)),
        }
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    let transport = SerialTransport::open(&args.port, args.baud)?;
    let config = SessionConfig {
        port: Some(args.port.clone()),
        baud_rate: args.baud,
        command_timeout_ms: args.timeout_ms,
    };
    let mut session = EpsSession::new(transport, config);
    session.init()?;

    match &args.command {
        Command::Hk => {
            session.send_collect_hk()?;
            drive(&mut session)?;
            let hk = session.housekeeping().context("no housekeeping stored")?;
            println!("battery voltage (raw): {}", hk.vbatt_voltage);
            println!("battery status: {:?}", hk.battery_status());
            println!("rails on: {}", hk.ocp_rail_state);
            println!("{:#?}", hk);
        }
        Command::Ocp { rails } => {
            let rails = parse_rails(rails)?;
            session.send_ocp_state(rails)?;
            drive(&mut session)?;
            info!(rails = %rails, "OCP state set");
        }
        Command::ResetOcp { rails } => {
            let rails = parse_rails(rails)?;
            session.send_reset_ocp(rails)?;
            drive(&mut session)?;
            info!(rails = %rails, "OCP rails reset");
        }
        Command::Config { path } => {
            let content =
                std::fs::read_to_string(path).with_context(|| format!("reading {}", path))?;
            let record: ConfigRecord =
                toml::from_str(&content).with_context(|| format!("parsing {}", path))?;
            session.send_config(&record)?;
            drive(&mut session)?;
            info!("Configuration loaded and confirmed");
        }
        Command::Batt {
            command_type,
            value,
        } => {
            session.send_battery_command(BatteryCommand {
                command_type: *command_type,
                value: *value,
            })?;
            drive(&mut session)?;
            info!("Battery command acknowledged");
        }
        Command::DisableHeater => {
            session.send_battery_command(BatteryCommand::DISABLE_HEATER)?;
            drive(&mut session)?;
            info!("Battery heater disabled");
        }
    }

    if let Some(trip) = session.last_trip() {
        error!(rails = %trip, "EPS reported an OCP trip during this session");
    }

    Ok(())
}

fn main() {
    let args = Args::parse();

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(if args.verbose {
                    tracing::Level::DEBUG.into()
                } else {
                    tracing::Level::INFO.into()
                })
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    info!("Starting EPS tool...");

    if let Err(e) = run(args) {
        error!("Error: {:#}", e);
        std::process::exit(1);
    }
}
