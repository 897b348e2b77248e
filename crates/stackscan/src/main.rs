//! stackscan CLI
//!
//! Runs the stack-collector payload on remote servers over SSH, streaming
//! every report to the terminal and saving per-target artifacts plus a run
//! index.

use std::path::{Path, PathBuf};

use clap::{ArgGroup, Parser};
use color_eyre::Result;
use eyre::WrapErr;
use tracing_subscriber::EnvFilter;

use stackscan_core::{RunCoordinator, RunSummary, load_targets, write_index};
use stackscan_exec::{AuthMode, SshRunner, StdoutSink, TargetSpec};

/// Remote invocation: the interpreter reads the payload from stdin and
/// writes its own working files under the remote scratch directory
const REMOTE_COMMAND: &str = "python3 - --output-dir /tmp";

/// Run the stack collector on remote servers via SSH
#[derive(Parser, Debug)]
#[command(name = "stackscan", version, about)]
#[command(group(ArgGroup::new("mode").required(true).args(["config", "host"])))]
struct Args {
    /// Targets config file (YAML or JSON)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Single target host address
    #[arg(short = 'H', long, value_name = "ADDR")]
    host: Option<String>,

    /// SSH port for the single-host mode
    #[arg(short = 'P', long, default_value_t = 22)]
    port: u16,

    /// SSH user for the single-host mode
    #[arg(short, long, default_value = "root")]
    user: String,

    /// SSH private key path
    #[arg(short, long, value_name = "PATH", conflicts_with = "password")]
    key: Option<PathBuf>,

    /// Use password authentication (prompts on the terminal)
    #[arg(short, long)]
    password: bool,

    /// Directory to save run artifacts under
    #[arg(short, long, default_value = "reports", value_name = "DIR")]
    output_dir: PathBuf,

    /// Collector payload sent to every target
    #[arg(long, default_value = "collector.py", value_name = "PATH")]
    collector: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize error handling
    color_eyre::install()?;

    // Parse arguments
    let args = Args::parse();

    // Initialize logging; reports go to stdout, diagnostics stay on stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let payload = std::fs::read(&args.collector)
        .wrap_err_with(|| format!("cannot read collector payload {}", args.collector.display()))?;

    let targets = match (&args.config, &args.host) {
        (Some(path), _) => load_targets(path)?,
        (None, Some(host)) => vec![single_target(&args, host)],
        (None, None) => unreachable!("clap enforces the target group"),
    };

    let coordinator = RunCoordinator::create(&args.output_dir, &targets)?;

    println!("\n🚀 Running stack collector on {} target(s)", targets.len());
    println!("📂 Output → {}\n", coordinator.run_dir().display());

    let runner = SshRunner::new(REMOTE_COMMAND);
    let mut sink = StdoutSink;
    let summary = coordinator
        .run_all(&targets, &payload, &runner, &mut sink)
        .await;

    let index_path = write_index(coordinator.run_dir(), &summary)?;

    print_summary(&summary, coordinator.run_dir(), &index_path);

    Ok(())
}

/// Build the one-target list from the inline flags
fn single_target(args: &Args, host: &str) -> TargetSpec {
    let mut target = TargetSpec::new(host)
        .with_port(args.port)
        .with_user(&args.user);
    if args.password {
        target.auth = AuthMode::Password;
    } else if let Some(key) = &args.key {
        target.key_path = Some(key.clone());
    }
    target.apply_defaults();
    target
}

/// Closing summary printed after the index is written
fn print_summary(summary: &RunSummary, run_dir: &Path, index_path: &Path) {
    let rule = "=".repeat(60);
    println!("\n{rule}");
    println!(
        "  📋 Summary — {} ok, {} failed",
        summary.ok_count(),
        summary.failed_count()
    );
    println!("  📂 {}", run_dir.display());
    println!("{rule}");
    for outcome in &summary.outcomes {
        let report = outcome
            .artifact
            .as_ref()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "—".to_string());
        println!("  {} {:30} → {}", outcome.status.icon(), outcome.target, report);
    }
    println!("\n  📄 Index → {}", index_path.display());
    println!();
}
