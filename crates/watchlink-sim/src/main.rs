//! watchlink-sim: replays a scripted phone/watch session over an in-process
//! link and prints what each side sees after every step.

mod conference;
mod script;
mod simulation;

use std::error::Error;
use std::path::PathBuf;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use watchlink_core::clock::{Clock, ManualClock, SystemClock};
use watchlink_core::trace_log::open_trace_file;
use watchlink_core::RelayConfig;

use simulation::Simulation;

#[derive(Parser, Debug)]
#[command(name = "watchlink-sim", about = "Replay a phone/watch session over an in-process link")]
struct Args {
    /// JSON-lines script to replay (reads stdin when omitted)
    #[arg(long)]
    script: Option<PathBuf>,

    /// Relay config file (JSON)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory for the wire trace log
    #[arg(long)]
    trace_dir: Option<PathBuf>,

    /// Start with the watch app not activated
    #[arg(long)]
    inactive: bool,

    /// Clock reading at start, in epoch millis (defaults to now)
    #[arg(long)]
    start_millis: Option<i64>,

    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let config = match &args.config {
        Some(path) => RelayConfig::load(path)?,
        None => RelayConfig::default(),
    };
    let start = args.start_millis.unwrap_or_else(|| SystemClock.now_millis());
    let trace = open_trace_file(args.trace_dir.as_deref(), "watchlink-sim");

    let mut sim = Simulation::new(config, ManualClock::new(start), trace, !args.inactive);

    let reader: Box<dyn AsyncRead + Unpin> = match &args.script {
        Some(path) => Box::new(tokio::fs::File::open(path).await?),
        None => Box::new(tokio::io::stdin()),
    };
    let mut lines = BufReader::new(reader).lines();

    let mut line_no = 0;
    let mut step = 0;
    while let Some(line) = lines.next_line().await? {
        line_no += 1;
        let event = match script::parse_line(&line) {
            Ok(Some(event)) => event,
            Ok(None) => continue,
            Err(e) => {
                log::error!("Skipping line {line_no}: {e}");
                continue;
            }
        };

        step += 1;
        log::info!("Step {step}: {}", event.name());
        sim.apply(&event);
        println!("{}", serde_json::to_string(&sim.report(step, &event))?);
    }

    Ok(())
}
