//! `robohand` – controls a five-finger robotic hand over a serial link.
//!
//! The binary:
//!
//! 1. Loads `~/.robohand/config.toml`, writing defaults on first run.
//! 2. Opens the serial link to the microcontroller (or the simulated link
//!    when `serial_port = "sim"`) and starts draining heart-rate telemetry.
//! 3. Serves the live dashboard on the configured cockpit address.
//! 4. Asks for a mode (camera or voice) and runs that session until it ends.
//! 5. Intercepts **Ctrl-C** to stop the session and release the link.  A
//!    second Ctrl-C exits immediately.

mod config;
mod display;

use std::fs::File;
use std::io::{self, BufReader, Write};
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::thread;
use std::time::Duration;

use colored::Colorize;
use robohand_cockpit::CockpitServer;
use robohand_hal::SerialTransport;
use robohand_hal::sim::SimLink;
use robohand_middleware::{EventBus, SessionState};
use robohand_perception::LandmarkSource;
use robohand_perception::source::{JsonLinesLandmarkSource, LineTranscriptSource};
use robohand_runtime::{ModeArbiter, SessionContext, TelemetryReader, init_tracing};
use robohand_types::{HandError, Mode};
use tracing::{error, info, warn};

use crate::config::Config;
use crate::display::TerminalDisplay;

/// Heart rates cycled by the simulated board.
const SIM_HEARTBEAT: [i32; 6] = [72, 74, 77, 75, 71, 70];
const SIM_HEARTBEAT_PERIOD: Duration = Duration::from_secs(1);

fn main() -> ExitCode {
    let _guard = init_tracing("robohand");
    print_banner();

    let cfg = load_config();
    match run(&cfg) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "robohand stopped");
            println!("{}: {e}", "Error".red().bold());
            ExitCode::FAILURE
        }
    }
}

fn run(cfg: &Config) -> Result<(), HandError> {
    let (transport, sim) = open_link(cfg)?;
    let transport = Arc::new(transport);
    let state = Arc::new(SessionState::new());
    let bus = EventBus::default();

    let reader = TelemetryReader::new(Arc::clone(&transport), Arc::clone(&state)).spawn();
    spawn_cockpit(cfg, bus.clone());

    let ctx = SessionContext::new(transport, state, bus, cfg.session_settings());
    install_ctrlc(&ctx);

    let mut arbiter = ModeArbiter::new(ctx);
    let mode = arbiter.select(&mut io::stdin().lock(), &mut io::stdout())?;
    let outcome = match mode {
        Some(Mode::Camera) => run_camera(&mut arbiter, cfg),
        Some(Mode::Voice) => run_voice(&mut arbiter),
        None => Ok(()),
    };
    arbiter.terminate();

    if let Some(link) = sim {
        link.hang_up();
    }
    if reader.join().is_err() {
        warn!("telemetry reader panicked");
    }
    println!("{}", "  ✓ Serial link closed. Goodbye.".green());
    outcome
}

fn run_camera(arbiter: &mut ModeArbiter, cfg: &Config) -> Result<(), HandError> {
    let mut source: Box<dyn LandmarkSource> = match &cfg.landmark_feed {
        Some(path) => {
            let file = File::open(path).map_err(|e| {
                HandError::Config(format!("cannot open landmark feed {}: {e}", path.display()))
            })?;
            info!(feed = %path.display(), "camera mode reading landmark file");
            Box::new(JsonLinesLandmarkSource::new(BufReader::new(file)))
        }
        None => {
            info!("camera mode reading landmarks from stdin");
            Box::new(JsonLinesLandmarkSource::new(BufReader::new(io::stdin())))
        }
    };
    println!("{}", "  Camera mode: show your hand. Ctrl-C to quit.".cyan());

    let report = arbiter.run_camera(source.as_mut())?;
    println!(
        "  {} frames, {} with a hand, {} commands sent ({:?})",
        report.frames, report.hands, report.sent, report.exit
    );
    Ok(())
}

fn run_voice(arbiter: &mut ModeArbiter) -> Result<(), HandError> {
    println!(
        "{}",
        "  Voice mode: say which fingers to raise, \"stop\" to quit.".cyan()
    );
    let source = Box::new(LineTranscriptSource::new(BufReader::new(io::stdin())));
    let mut display = TerminalDisplay::new(io::stdout());
    let exit = arbiter.run_voice(source, &mut display)?;
    println!("  Voice session ended ({exit:?})");
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Wiring
// ─────────────────────────────────────────────────────────────────────────────

fn load_config() -> Config {
    let mut cfg = match config::load() {
        Ok(Some(cfg)) => {
            println!(
                "  Config loaded from {}",
                config::config_path().display().to_string().bold()
            );
            cfg
        }
        Ok(None) => {
            let cfg = Config::default();
            match config::save(&cfg) {
                Ok(()) => println!(
                    "  {} Default config written to {}",
                    "✓".green().bold(),
                    config::config_path().display().to_string().bold()
                ),
                Err(e) => warn!(error = %e, "could not write default config"),
            }
            cfg
        }
        Err(e) => {
            println!("{}: {e}", "Config error".red());
            println!("  Using default configuration.");
            Config::default()
        }
    };
    config::apply_env_overrides(&mut cfg);
    cfg
}

fn open_link(cfg: &Config) -> Result<(SerialTransport, Option<SimLink>), HandError> {
    if cfg.is_simulated() {
        let link = SimLink::new(cfg.read_timeout());
        let _heartbeat = link.spawn_heartbeat(SIM_HEARTBEAT.to_vec(), SIM_HEARTBEAT_PERIOD);
        println!("  Serial link: {}", "simulated".yellow());
        return Ok((link.transport(), Some(link)));
    }

    print!("  Opening {} at {} baud … ", cfg.serial_port.bold(), cfg.baud_rate);
    io::stdout().flush().ok();
    match SerialTransport::open(&cfg.serial_port, cfg.baud_rate, cfg.read_timeout(), cfg.settle()) {
        Ok(transport) => {
            println!("{}", "connected".green());
            Ok((transport, None))
        }
        Err(e) => {
            println!("{}", "unavailable".red());
            Err(e)
        }
    }
}

/// Run the dashboard on its own thread with a dedicated async runtime.
fn spawn_cockpit(cfg: &Config, bus: EventBus) {
    let server = CockpitServer::new(bus)
        .with_host(cfg.cockpit_host.clone())
        .with_port(cfg.cockpit_port);
    println!(
        "  Dashboard on {}",
        format!("http://{}:{}", cfg.cockpit_host, cfg.cockpit_port).bold()
    );
    thread::spawn(move || {
        let runtime = match tokio::runtime::Runtime::new() {
            Ok(rt) => rt,
            Err(e) => {
                error!(error = %e, "dashboard runtime failed to start");
                return;
            }
        };
        if let Err(e) = runtime.block_on(server.run()) {
            error!(error = %e, "dashboard unavailable");
        }
    });
}

fn install_ctrlc(ctx: &SessionContext) {
    let stop = Arc::clone(&ctx.stop);
    if let Err(e) = ctrlc::set_handler(move || {
        if stop.swap(true, Ordering::SeqCst) {
            std::process::exit(130);
        }
        println!();
        println!(
            "{}",
            "⚠  Ctrl-C received – stopping the session …".yellow().bold()
        );
    }) {
        warn!(error = %e, "failed to install Ctrl-C handler");
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Banner
// ─────────────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("{}", r#"   ___       __       __ __              __"#.bold().cyan());
    println!("{}", r#"  / _ \___  / /  ___ / // /__ ____  ___/ /"#.bold().cyan());
    println!("{}", r#" / , _/ _ \/ _ \/ _ | _  / _ `/ _ \/ _  / "#.bold().cyan());
    println!("{}", r#"/_/|_|\___/_.__/\___/_//_/\_,_/_//_/\_,_/  "#.bold().cyan());
    println!();
    println!(
        "  {} {}",
        "RoboHand".bold(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!("  Gesture and voice control for a five-finger hand");
    println!();
}
