//! scriptseq - main entry point
//!
//! Parses the command line, runs the selected command, and turns its outcome
//! into the process exit status. This is the only place the process exits.

use scriptseq::cli::{Cli, Commands, PipelineArgs};
use scriptseq::error::{Result, RunnerError};
use scriptseq::{ConsoleReporter, InterpreterExecutor, Runner, process_guard, sanity};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

/// Logs go to stderr; stdout carries the progress report.
fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse_args();
    init_tracing(cli.verbose);
    info!("scriptseq starting up");

    // Children are terminated with us on SIGINT/SIGTERM/SIGHUP
    if let Err(e) = process_guard::init_signal_handlers() {
        warn!("Failed to initialize signal handlers: {}", e);
    }
    debug!("Signal handlers initialized");

    let code = match execute(&cli) {
        Ok(()) => 0,
        Err(err) => {
            error!("Pipeline halted: {}", err);
            if !err.is_reported() {
                eprintln!("✗ {}", err);
            }
            err.exit_code()
        }
    };

    std::process::exit(code);
}

fn execute(cli: &Cli) -> Result<()> {
    match &cli.command {
        Commands::Run(args) => run_pipeline(args, cli.dry_run),
        Commands::Check(args) => check_pipeline(args),
    }
}

fn run_pipeline(args: &PipelineArgs, dry_run: bool) -> Result<()> {
    let config = args.to_config(dry_run)?;
    info!(
        "Running {} scripts from {:?} with {:?}",
        config.scripts.len(),
        config.scripts_dir,
        config.interpreter
    );

    let executor = InterpreterExecutor::new(&config.interpreter).with_timeout(config.timeout);
    Runner::new(&config, &executor, &ConsoleReporter).run()?;
    Ok(())
}

fn check_pipeline(args: &PipelineArgs) -> Result<()> {
    let config = args.to_config(true)?;
    let result = sanity::verify_environment(&config);
    sanity::report(&result, &config, &ConsoleReporter);

    if result.is_ok() {
        Ok(())
    } else {
        Err(RunnerError::config("pre-flight check failed"))
    }
}
