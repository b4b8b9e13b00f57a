use std::io;
use std::thread;

use anyhow::{Context, anyhow};
use tracing::info;

use amr_unit::{MessageAdapter, Unit, UnitConfig, logging};

fn print_usage(program: &str) {
    println!("AMR unit");
    println!("Usage:");
    println!("  {program} <working_dir>");
    println!("  {program} --help");
    println!();
    println!("working_dir must contain the configuration/ and orders/ subdirectories.");
    println!("Messages are read from stdin, one per line: <topic> <payload>");
    println!("  /AmrUnit/currentPosition {{x: 1.0, y: 2.0, yaw: 0.0}}");
    println!("  /AmrUnit/nextOrder {{order_id: 1000001, description: \"first order\"}}");
    println!("  /AmrUnit/shutdown");
    println!("End of input also shuts the unit down.");
    println!("Log filter: AMR_LOG (falls back to RUST_LOG, default info).");
}

fn exit_with_usage(program: &str, message: &str) -> ! {
    eprintln!("{message}");
    print_usage(program);
    std::process::exit(1);
}

fn run(working_directory: &str) -> anyhow::Result<()> {
    let config = UnitConfig::load(working_directory)
        .with_context(|| format!("loading configuration from {working_directory}"))?;
    let unit = Unit::start(&config);
    let adapter = MessageAdapter::new(unit.queue(), config.topics());

    let unit_thread = unit.spawn().context("spawning unit thread")?;
    let adapter_thread = thread::Builder::new()
        .name("amr-adapter".to_string())
        .spawn(move || adapter.run_lines(io::stdin().lock()))
        .context("spawning adapter thread")?;

    let (unit, summary) = unit_thread
        .join()
        .map_err(|_| anyhow!("unit thread panicked"))?;
    info!(
        executed = summary.executed,
        failed = summary.failed,
        x = unit.position().coords.x,
        y = unit.position().coords.y,
        "final position"
    );
    // The adapter returns on its own after the shutdown message or end of
    // input; if shutdown came from elsewhere it may still block on stdin.
    if adapter_thread.is_finished() {
        adapter_thread
            .join()
            .map_err(|_| anyhow!("adapter thread panicked"))?;
    }
    Ok(())
}

fn main() {
    let program = std::env::args()
        .next()
        .unwrap_or_else(|| "amr_unit".to_string());
    let mut args = std::env::args().skip(1);
    let working_directory = match args.next().as_deref() {
        Some("--help") | Some("-h") | Some("help") => {
            print_usage(&program);
            return;
        }
        Some(dir) => dir.to_string(),
        None => exit_with_usage(&program, "missing working directory"),
    };
    if let Some(extra) = args.next() {
        exit_with_usage(&program, &format!("unexpected argument: {extra}"));
    }

    logging::init();
    if let Err(err) = run(&working_directory) {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
