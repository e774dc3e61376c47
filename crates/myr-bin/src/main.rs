//! Mapyrus entrypoint: run script files against the op-trace encoder.
//!
//! Exit code 0 on success, 1 on any script or I/O error with the message
//! on stderr. Server and GUI front-ends are host adapters built on the
//! library crates; this binary only runs scripts.

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::rc::Rc;

use anyhow::Result;
use clap::Parser as ClapParser;
use core_context::ContextStack;
use core_device::MemoryDatasetFactory;
use core_device::recording::RecordingFactory;
use core_interp::{Interpreter, Throttle};
use core_lang::{Preprocessor, parse_source, regex_cache};
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// CLI arguments.
#[derive(ClapParser, Debug)]
#[command(name = "mapyrus", version, about = "Mapyrus cartographic scripting")]
struct Args {
    /// Script files to run in order; `-` reads from stdin.
    #[arg(required = true)]
    scripts: Vec<String>,
    /// Configuration file path (overrides discovery of `mapyrus.toml`).
    #[arg(long = "config")]
    config: Option<PathBuf>,
    /// Append log output to this file instead of stderr.
    #[arg(long = "log-file")]
    log_file: Option<PathBuf>,
}

fn configure_logging(args: &Args, default_filter: Option<&str>) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter.unwrap_or("warn")))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    match &args.log_file {
        Some(path) => {
            let dir = path.parent().unwrap_or_else(|| std::path::Path::new("."));
            let name = path.file_name().map(PathBuf::from).unwrap_or_else(|| {
                PathBuf::from("mapyrus.log")
            });
            let appender = tracing_appender::rolling::never(dir, name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(false)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
            None
        }
    }
}

fn run(args: &Args) -> Result<()> {
    let config = core_config::load_from(args.config.clone())?;
    regex_cache::set_capacity(config.file.runtime.regex_cache_capacity);

    let mut interp = Interpreter::new(
        Rc::new(RecordingFactory::new()),
        Rc::new(MemoryDatasetFactory::new()),
        Box::new(std::io::stdout()),
    );
    if let Some(budget) = config.file.runtime.timeout() {
        interp.set_throttle(Throttle::with_budget(budget));
    }

    let mut ctx = ContextStack::new();
    let mut result = Ok(());
    for script in &args.scripts {
        info!(target: "runtime", script = script.as_str(), "run_script");
        result = run_one(script, &config, &mut interp, &mut ctx);
        if result.is_err() {
            break;
        }
    }
    // Cleanup runs on every exit path: close any open dataset and page.
    let closed = ctx.close_all();
    result?;
    closed?;
    Ok(())
}

fn run_one(
    script: &str,
    config: &core_config::Config,
    interp: &mut Interpreter,
    ctx: &mut ContextStack,
) -> Result<(), core_value::MapyrusError> {
    let mut pre = Preprocessor::open(script)?;
    pre.set_include_paths(config.file.include.paths.clone());
    let statements = parse_source(pre)?;
    interp.execute(&statements, ctx)
}

fn main() -> ExitCode {
    let args = Args::parse();
    let config_for_log = core_config::load_from(args.config.clone()).unwrap_or_default();
    let _log_guard = configure_logging(&args, config_for_log.file.log.filter.as_deref());

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(target: "runtime", error = %e, "script_failed");
            let _ = writeln!(std::io::stderr(), "mapyrus: {e}");
            ExitCode::from(1)
        }
    }
}
