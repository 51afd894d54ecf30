//! genabc - bytecode compilation dispatcher

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use owo_colors::{OwoColorize, Stream::Stderr};
use std::sync::atomic::Ordering;
use std::time::Duration;
use tracing::info;

use cli::{Cli, Commands, CompilerArgs, DispatchArgs, RunArgs};
use genabc::context::{BatchContext, CompilerInstall};
use genabc::dispatch::{
    Batch, BatchOutcome, BatchSupervisor, CompilerCommand, InvocationMode, WorkerLauncher,
    run_worker_main,
};
use genabc::emit::{EmitOptions, emit_assets};
use genabc::logging::{self, LogConfig};
use genabc::paths::{ensure_dir, expand_tilde};

/// Program entry point: parses CLI arguments, dispatches the selected command, and handles top-level errors.
///
/// A failed batch exits with status 1 after its cleanup has run. Any other
/// error prints a colored error header followed by each cause in the error
/// chain before exiting with status 1.
fn main() {
    let cli = Cli::parse();

    if cli.no_color {
        owo_colors::set_override(false);
    }

    init_logging(&cli);

    let result = match &cli.command {
        Commands::Run(args) => cmd_run(args),
        Commands::Dispatch(args) => cmd_dispatch(args),
        Commands::Worker => run_worker_main(),
        Commands::Completions(args) => {
            args.generate();
            Ok(BatchOutcome { succeeded: true })
        }
    };

    match result {
        Ok(outcome) => std::process::exit(outcome.exit_code()),
        Err(e) => {
            eprintln!(
                "{}: {}",
                "error"
                    .if_supports_color(Stderr, |text| text.red())
                    .if_supports_color(Stderr, |text| text.bold()),
                e
            );
            // Print the error chain if there are causes
            for cause in e.chain().skip(1) {
                eprintln!(
                    "  {}: {}",
                    "caused by".if_supports_color(Stderr, |text| text.yellow()),
                    cause
                );
            }
            std::process::exit(1);
        }
    }
}

/// Workers log compactly at warn level; the CLI level follows `-v`/`-q`.
fn init_logging(cli: &Cli) {
    let config = match cli.command {
        Commands::Worker => LogConfig::for_worker(),
        _ if cli.quiet => LogConfig::quiet(),
        _ => LogConfig::for_cli(cli.verbose),
    };
    logging::init(config.with_env_overrides());
}

/// Check the compiler installation and build the batch context.
fn batch_context(args: &CompilerArgs, output_dir: &std::path::Path) -> Result<BatchContext> {
    let install = CompilerInstall::new(expand_tilde(&args.ark_build_dir));
    install.check()?;

    let mode = if args.batch_inputs {
        InvocationMode::Batched
    } else {
        InvocationMode::PerFile
    };
    let command =
        CompilerCommand::for_entry(&args.node, &args.runtime_args, &install.entry(), args.debug)
            .with_mode(mode);

    let ctx = BatchContext::new(output_dir, command)
        .with_max_workers(args.jobs)
        .with_timeout(args.timeout.map(Duration::from_secs));
    install_shutdown_handler(&ctx)?;
    Ok(ctx)
}

/// On Ctrl+C or SIGTERM, stop the workers so the batch is dropped and its
/// intermediates removed before exiting.
fn install_shutdown_handler(ctx: &BatchContext) -> Result<()> {
    let shutdown_flag = ctx.shutdown_flag();
    ctrlc::set_handler(move || {
        eprintln!("\nReceived interrupt, stopping workers and cleaning up...");
        shutdown_flag.store(true, Ordering::SeqCst);
    })
    .context("Failed to install Ctrl+C handler")
}

fn supervise(ctx: &BatchContext, batch: Batch) -> Result<BatchOutcome> {
    let launcher = WorkerLauncher::current_exe().context("Failed to locate genabc executable")?;
    Ok(BatchSupervisor::new(ctx, launcher).execute_batch(batch))
}

/// Emit the bundled assets under `args.input` and compile the intermediates.
fn cmd_run(args: &RunArgs) -> Result<BatchOutcome> {
    let input = expand_tilde(&args.input);
    let ctx = batch_context(&args.compiler, &expand_tilde(&args.output))?;
    let output = &ctx.output_dir;

    ensure_dir(output)
        .with_context(|| format!("Failed to create output directory {}", output.display()))?;

    let options = EmitOptions {
        worker_entries: (!args.worker_files.is_empty()).then(|| args.worker_files.clone()),
        device_level: args.device_level.clone(),
        config_output: args.config_output.as_ref().map(expand_tilde),
        project_path: args.project_path.as_ref().map(expand_tilde),
    };

    let mut batch = Batch::new();
    let summary = emit_assets(&input, output, &options, &mut batch)
        .with_context(|| format!("Failed to emit assets from {}", input.display()))?;
    info!(
        scripts = summary.scripts,
        output = %output.display(),
        "Emit finished"
    );

    supervise(&ctx, batch)
}

/// Compile intermediate files that already exist on disk.
fn cmd_dispatch(args: &DispatchArgs) -> Result<BatchOutcome> {
    let output = std::env::current_dir().context("Failed to read current directory")?;
    let ctx = batch_context(&args.compiler, &output)?;

    let mut batch = Batch::new();
    for file in &args.files {
        batch.register_file(expand_tilde(file));
    }

    supervise(&ctx, batch)
}
