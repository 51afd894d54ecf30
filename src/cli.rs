//! Command-line interface definitions using clap.

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

/// Compile bundled scripts to bytecode across a pool of worker processes.
#[derive(Parser, Debug)]
#[command(name = "genabc")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output (-v for info, -vv for debug).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output.
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Emit bundled assets as intermediate files and compile them.
    Run(RunArgs),

    /// Compile already-written intermediate files.
    Dispatch(DispatchArgs),

    /// Compile one group read from stdin (spawned by the worker pool).
    #[command(hide = true)]
    Worker,

    /// Generate shell completions.
    Completions(CompletionsArgs),
}

/// Arguments for shell completions.
#[derive(Parser, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate completions for.
    #[arg(value_enum)]
    pub shell: Shell,
}

impl CompletionsArgs {
    /// Generate and print completions to stdout.
    pub fn generate(&self) {
        clap_complete::generate(
            self.shell,
            &mut Cli::command(),
            "genabc",
            &mut std::io::stdout(),
        );
    }
}

/// Compiler and pool options shared by `run` and `dispatch`.
#[derive(clap::Args, Debug, Clone)]
pub struct CompilerArgs {
    /// Compiler build directory (contains `src/index.js` and `node_modules`).
    #[arg(long, env = "GENABC_ARK_BUILD_DIR")]
    pub ark_build_dir: PathBuf,

    /// JavaScript runtime used to run the compiler.
    #[arg(long, env = "GENABC_NODE", default_value = "node")]
    pub node: PathBuf,

    /// Argument passed to the runtime before the compiler entry (repeatable).
    #[arg(long = "runtime-arg", default_values_t = [String::from("--expose-gc")], allow_hyphen_values = true)]
    pub runtime_args: Vec<String>,

    /// Compile in debug mode.
    #[arg(long)]
    pub debug: bool,

    /// Maximum number of concurrent worker processes (and groups).
    #[arg(short, long, env = "GENABC_JOBS", default_value_t = genabc::dispatch::DEFAULT_MAX_WORKERS)]
    pub jobs: usize,

    /// Kill a worker that runs longer than this many seconds.
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Pass all of a group's files to a single compiler invocation.
    #[arg(long)]
    pub batch_inputs: bool,
}

/// Arguments for the run command.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Directory of bundled assets.
    pub input: PathBuf,

    /// Build output directory.
    #[arg(short, long, env = "GENABC_OUTPUT")]
    pub output: PathBuf,

    #[command(flatten)]
    pub compiler: CompilerArgs,

    /// Worker script entry, without `.js` (repeatable).
    #[arg(long = "worker-file")]
    pub worker_files: Vec<String>,

    /// Device level of the build (`card` copies JSON assets).
    #[arg(long, env = "DEVICE_LEVEL")]
    pub device_level: Option<String>,

    /// Output directory for configuration JSON.
    #[arg(long, env = "GENABC_CONFIG_OUTPUT")]
    pub config_output: Option<PathBuf>,

    /// Project source directory.
    #[arg(long, env = "GENABC_PROJECT_PATH")]
    pub project_path: Option<PathBuf>,
}

/// Arguments for the dispatch command.
#[derive(Parser, Debug)]
pub struct DispatchArgs {
    /// Intermediate files to compile.
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    #[command(flatten)]
    pub compiler: CompilerArgs,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parsing() {
        // Verify the CLI definition is valid
        Cli::command().debug_assert();
    }

    #[test]
    fn test_run_command_defaults() {
        let args = Cli::try_parse_from([
            "genabc",
            "run",
            "bundle",
            "--output",
            "build",
            "--ark-build-dir",
            "/ark/build",
        ])
        .unwrap();
        match args.command {
            Commands::Run(run) => {
                assert_eq!(run.input, PathBuf::from("bundle"));
                assert_eq!(run.output, PathBuf::from("build"));
                assert_eq!(run.compiler.node, PathBuf::from("node"));
                assert_eq!(run.compiler.runtime_args, vec!["--expose-gc".to_string()]);
                assert_eq!(run.compiler.jobs, 3);
                assert!(run.compiler.timeout.is_none());
                assert!(!run.compiler.batch_inputs);
                assert!(run.worker_files.is_empty());
            }
            _ => panic!("Expected Run command"),
        }
    }

    #[test]
    fn test_run_with_options() {
        let args = Cli::try_parse_from([
            "genabc",
            "-vv",
            "run",
            "bundle",
            "-o",
            "build",
            "--ark-build-dir",
            "/ark/build",
            "--jobs",
            "5",
            "--timeout",
            "60",
            "--worker-file",
            "workers/a",
            "--worker-file",
            "workers/b",
            "--device-level",
            "card",
            "--debug",
        ])
        .unwrap();
        assert_eq!(args.verbose, 2);
        match args.command {
            Commands::Run(run) => {
                assert_eq!(run.compiler.jobs, 5);
                assert_eq!(run.compiler.timeout, Some(60));
                assert!(run.compiler.debug);
                assert_eq!(run.worker_files, vec!["workers/a", "workers/b"]);
                assert_eq!(run.device_level.as_deref(), Some("card"));
            }
            _ => panic!("Expected Run command"),
        }
    }

    #[test]
    fn test_dispatch_requires_files() {
        assert!(Cli::try_parse_from(["genabc", "dispatch", "--ark-build-dir", "/ark"]).is_err());

        let args = Cli::try_parse_from([
            "genabc",
            "dispatch",
            "a.temp.js",
            "b.temp.js",
            "--ark-build-dir",
            "/ark",
            "--batch-inputs",
        ])
        .unwrap();
        match args.command {
            Commands::Dispatch(dispatch) => {
                assert_eq!(dispatch.files.len(), 2);
                assert!(dispatch.compiler.batch_inputs);
            }
            _ => panic!("Expected Dispatch command"),
        }
    }

    #[test]
    fn test_worker_command_hidden() {
        let args = Cli::try_parse_from(["genabc", "worker"]).unwrap();
        assert!(matches!(args.command, Commands::Worker));

        let help = Cli::command().render_help().to_string();
        assert!(!help.lines().any(|l| l.trim_start().starts_with("worker")));
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        assert!(Cli::try_parse_from(["genabc", "-q", "-v", "worker"]).is_err());
    }

    #[test]
    fn test_completions_command() {
        let args = Cli::try_parse_from(["genabc", "completions", "bash"]).unwrap();
        assert!(matches!(args.command, Commands::Completions(_)));
    }
}
