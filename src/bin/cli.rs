//! Flowerpot CLI Client
//!
//! Command-line interface for querying and watering a flowerpot.

use std::time::Duration;

use clap::{Parser, Subcommand};
use flowerpot::monitor::{common_factor, Monitor, PollSchedule, DEFAULT_HISTORY_LEN};
use flowerpot::protocol::{Command, RequestMessage};
use flowerpot::{Client, FlowerpotError};
use tracing_subscriber::{fmt, EnvFilter};

/// Flowerpot CLI
#[derive(Parser, Debug)]
#[command(name = "flowerpot-cli")]
#[command(about = "CLI for a networked flowerpot")]
#[command(version)]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:2259")]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Get ambient temperature
    Temp,

    /// Get ambient air relative humidity
    Humidity,

    /// Get light level
    Light,

    /// Get reservoir water level
    Water,

    /// Get soil moisture content
    Moisture,

    /// Get liquid fertilizer level
    Fertilizer,

    /// Dispense water
    Dispense {
        /// Amount of water in mL
        ml: u8,
    },

    /// Close the connection
    Quit,

    /// Poll sensors periodically and print timestamped readings
    Monitor(MonitorArgs),
}

/// Poll periods in seconds; 0 leaves a sensor out
#[derive(clap::Args, Debug)]
struct MonitorArgs {
    #[arg(long, default_value = "900")]
    temp_period_s: u64,

    #[arg(long, default_value = "3600")]
    humidity_period_s: u64,

    #[arg(long, default_value = "900")]
    light_period_s: u64,

    #[arg(long, default_value = "7200")]
    water_period_s: u64,

    #[arg(long, default_value = "3600")]
    moisture_period_s: u64,

    #[arg(long, default_value = "7200")]
    fertilizer_period_s: u64,

    /// Schedule tick in seconds (defaults to the periods' common factor)
    #[arg(long)]
    tick_s: Option<u64>,

    /// Readings kept per sensor
    #[arg(long, default_value_t = DEFAULT_HISTORY_LEN)]
    history: usize,

    /// Stop after this many ticks (runs until interrupted if omitted)
    #[arg(long)]
    ticks: Option<u64>,
}

impl MonitorArgs {
    fn schedule(&self) -> flowerpot::Result<PollSchedule> {
        let periods: Vec<(Command, Duration)> = [
            (Command::GetTemperature, self.temp_period_s),
            (Command::GetHumidity, self.humidity_period_s),
            (Command::GetLight, self.light_period_s),
            (Command::GetWater, self.water_period_s),
            (Command::GetMoisture, self.moisture_period_s),
            (Command::GetFertilizer, self.fertilizer_period_s),
        ]
        .into_iter()
        .filter(|(_, secs)| *secs > 0)
        .map(|(command, secs)| (command, Duration::from_secs(secs)))
        .collect();

        let tick = match self.tick_s {
            Some(secs) => Duration::from_secs(secs),
            None => common_factor(periods.iter().map(|(_, p)| *p)).ok_or_else(|| {
                FlowerpotError::Config("every sensor period is 0".to_string())
            })?,
        };

        periods
            .into_iter()
            .try_fold(PollSchedule::new(tick)?, |schedule, (command, period)| {
                schedule.with_period(command, period)
            })
    }
}

impl Commands {
    fn to_message(&self) -> flowerpot::Result<RequestMessage> {
        match self {
            Commands::Monitor(_) => Err(FlowerpotError::Protocol(
                "monitor is not a single command".to_string(),
            )),
            Commands::Temp => RequestMessage::simple(Command::GetTemperature),
            Commands::Humidity => RequestMessage::simple(Command::GetHumidity),
            Commands::Light => RequestMessage::simple(Command::GetLight),
            Commands::Water => RequestMessage::simple(Command::GetWater),
            Commands::Moisture => RequestMessage::simple(Command::GetMoisture),
            Commands::Fertilizer => RequestMessage::simple(Command::GetFertilizer),
            Commands::Dispense { ml } => RequestMessage::new(Command::DispenseWater, Some(*ml)),
            Commands::Quit => RequestMessage::simple(Command::Quit),
        }
    }
}

fn monitor(args: &Args, monitor_args: &MonitorArgs) -> flowerpot::Result<()> {
    let schedule = monitor_args.schedule()?;
    let mut client = Client::connect(&args.server)?;
    let mut monitor = Monitor::new(schedule, monitor_args.history);

    let result = monitor.run(&mut client, monitor_args.ticks, |reading| {
        println!("{}", reading)
    });

    for (command, _) in monitor.schedule().periods() {
        let values: Vec<String> = monitor
            .history(*command)
            .map(|reading| reading.value.to_string())
            .collect();
        println!("{} history: [{}]", command.name(), values.join(", "));
    }

    result?;
    if !client.is_closed() {
        client.quit()?;
    }
    Ok(())
}

fn run(args: &Args) -> flowerpot::Result<()> {
    if let Commands::Monitor(monitor_args) = &args.command {
        return monitor(args, monitor_args);
    }

    let message = args.command.to_message()?;
    let mut client = Client::connect(&args.server)?;

    let response = client.send(&message)?;
    println!("{}: {}", message.command().name(), response);

    if !client.is_closed() {
        client.quit()?;
    }
    Ok(())
}

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let args = Args::parse();

    if let Err(e) = run(&args) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
