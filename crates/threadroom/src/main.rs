//! threadroom - host resource-limit diagnostics.
//!
//! Runs named diagnosis plugins against the local `/proc` and cgroup trees
//! and prints their findings as text or JSON.
//!
//! ```bash
//! threadroom list
//! threadroom run -m maxproc --pid 1234
//! threadroom run -m kernel --format json
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use tracing::{Level, debug, info, warn};
use tracing_subscriber::EnvFilter;

use threadroom_core::config::Config;
use threadroom_core::diagnosis::{PluginRegistry, RunContext, host_plugins};
use threadroom_core::fmt::{render_json, render_text};

/// Host resource-limit diagnostics.
#[derive(Parser)]
#[command(name = "threadroom", about = "Host resource-limit diagnostics", version)]
struct Cli {
    /// Increase logging verbosity (-v info, -vv debug, -vvv trace). Default is warn.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Quiet mode - only log errors.
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List available plugins.
    List,

    /// Run one plugin and print its findings.
    Run(RunArgs),

    /// Print the version.
    Version,
}

#[derive(clap::Args)]
struct RunArgs {
    /// Plugin to run (see `threadroom list`).
    #[arg(short, long)]
    module: String,

    /// Target process; absent or non-positive values inspect threadroom itself.
    #[arg(long, allow_negative_numbers = true)]
    pid: Option<i64>,

    /// Output format.
    #[arg(short, long, value_enum, default_value_t = Format::Text)]
    format: Format,

    /// Path to /proc filesystem.
    #[arg(long, env = "THREADROOM_PROC_PATH", default_value = "/proc")]
    proc_path: PathBuf,

    /// Path to cgroup filesystem.
    #[arg(long, env = "THREADROOM_CGROUP_PATH", default_value = "/sys/fs/cgroup")]
    cgroup_path: PathBuf,

    /// Time limit for the process-listing command, in seconds.
    #[arg(long, env = "THREADROOM_TIMEOUT", default_value = "5", value_name = "SECS")]
    timeout: u64,

    /// Program listing one line per thread, run with `-eLf`.
    #[arg(long, default_value = "ps", value_name = "PROGRAM")]
    ps_command: String,
}

impl RunArgs {
    fn config(&self) -> Config {
        Config {
            proc_path: self.proc_path.clone(),
            cgroup_path: self.cgroup_path.clone(),
            ps_program: self.ps_command.clone(),
            command_timeout: Duration::from_secs(self.timeout),
            ..Config::default()
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

/// Initializes the tracing subscriber on stderr so stdout carries only the report.
fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        Level::ERROR
    } else {
        match verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            2 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let mut filter = EnvFilter::from_default_env();
    for target in ["threadroom", "threadroom_core"] {
        match format!("{}={}", target, level).parse() {
            Ok(directive) => filter = filter.add_directive(directive),
            Err(e) => eprintln!("invalid log directive for {}: {}", target, e),
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn list_plugins() {
    let registry = PluginRegistry::new(host_plugins(&Config::default()));
    let width = registry.list().map(|p| p.name().len()).max().unwrap_or(0);
    for plugin in registry.list() {
        println!("{:<width$}  {}", plugin.name(), plugin.description(), width = width);
    }
}

fn run_plugin(args: &RunArgs) -> ExitCode {
    let config = args.config();
    debug!(?config, "configuration");

    let cancel = config.cancel_token();
    let handler_token = cancel.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        info!("Received interrupt, cancelling");
        handler_token.cancel();
    }) {
        warn!("Failed to set Ctrl-C handler: {}", e);
    }

    let registry = PluginRegistry::new(host_plugins(&config));
    let ctx = RunContext::new(cancel).with_pid(args.pid);
    let result = match registry.run(&args.module, &ctx) {
        Ok(result) => result,
        Err(e) => {
            eprintln!("threadroom: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match args.format {
        Format::Text => print!("{}", render_text(&result)),
        Format::Json => match render_json(&result) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("threadroom: cannot serialize result: {}", e);
                return ExitCode::FAILURE;
            }
        },
    }
    ExitCode::SUCCESS
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    match cli.command {
        Command::List => {
            list_plugins();
            ExitCode::SUCCESS
        }
        Command::Run(ref run) => run_plugin(run),
        Command::Version => {
            println!("threadroom {}", env!("CARGO_PKG_VERSION"));
            ExitCode::SUCCESS
        }
    }
}
