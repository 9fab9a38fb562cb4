use clap::Parser;
use color_eyre::{eyre::eyre, Result};
use mousecar::drive::{DryRunMotorDriver, MotorDriver, PwmMotorDriver};
use mousecar::input::CollectorHandle;
use mousecar::{Config, Vehicle};
use std::path::PathBuf;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "mousecar", version, about = "Drive a two-motor car with a mouse")]
struct Args {
    /// Config file, defaults to ~/.config/mousecar/config.toml
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// evdev node of the mouse, overrides the config file
    #[arg(short, long)]
    device: Option<PathBuf>,

    /// Log duty cycles instead of driving GPIO
    #[arg(long)]
    dry_run: bool,

    #[arg(long, default_value = "info")]
    log_level: Level,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    setup(args.log_level)?;

    let config = load_config(args.config.clone()).await?;
    let device = args.device.clone().unwrap_or_else(|| config.input.device.clone());

    let (event_sender, event_receiver) = mpsc::channel(config.input.channel_capacity);
    let collector = CollectorHandle::open(&device, config.input.grab, event_sender)
        .map_err(|e| eyre!("Failed to start input collector: {}", e))?;

    let driver: Box<dyn MotorDriver> = if args.dry_run {
        Box::new(DryRunMotorDriver::new())
    } else {
        Box::new(PwmMotorDriver::new(config.motor.clone()))
    };

    let vehicle = match Vehicle::create(driver, &config) {
        Ok(vehicle) => vehicle,
        Err(e) => {
            collector.stop();
            return Err(eyre!("Failed to initialize vehicle: {}", e));
        }
    };

    let shutdown = CancellationToken::new();
    spawn_signal_listener(shutdown.clone());

    let session = vehicle
        .start()
        .run_until_shutdown(event_receiver, shutdown)
        .await;

    match collector.finish(session).await {
        Ok(_) => {
            info!("Motors stopped, bye");
            Ok(())
        }
        Err(e) => Err(eyre!("Drive session ended: {}", e)),
    }
}

fn setup(level: Level) -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    setup_logging_env(level);
    Ok(())
}

fn setup_logging_env(level: Level) {
    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .init();
}

async fn load_config(path: Option<PathBuf>) -> Result<Config> {
    let path = match path {
        Some(path) => path,
        None => {
            let path = Config::default_path()?;
            Config::ensure_default_config(&path).await?;
            path
        }
    };

    Ok(Config::load(&path).await?)
}

fn spawn_signal_listener(shutdown: CancellationToken) {
    tokio::spawn(async move {
        let signal_name = match signal(SignalKind::terminate()) {
            Ok(mut terminate) => tokio::select! {
                result = tokio::signal::ctrl_c() => result.map(|_| "SIGINT"),
                _ = terminate.recv() => Ok("SIGTERM"),
            },
            Err(e) => {
                warn!("Cannot listen for SIGTERM, only ctrl-c stops the car: {}", e);
                tokio::signal::ctrl_c().await.map(|_| "SIGINT")
            }
        };

        match signal_name {
            Ok(name) => info!("Received {}, stopping", name),
            Err(e) => error!("Signal listener failed, stopping: {}", e),
        }
        shutdown.cancel();
    });
}
