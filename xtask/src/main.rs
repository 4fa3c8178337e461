//! Development tasks for Tether
//!
//! Run with: cargo xtask <command>

use clap::{Parser, Subcommand};
use std::process::Command;

/// Fuzz targets defined in `fuzz/Cargo.toml`
const FUZZ_TARGETS: &[&str] = &[
    "fuzz_envelope_decode",
    "fuzz_envelope_roundtrip",
    "fuzz_path_resolve",
    "fuzz_config_parse",
];

#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "Tether development tasks")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run tests, optionally for one package
    Test {
        /// Package to test, e.g. tether-core
        #[arg(short, long)]
        package: Option<String>,
    },

    /// Run clippy lints
    Lint,

    /// Check formatting, or rewrite files with --fix
    Fmt {
        /// Apply formatting instead of checking
        #[arg(long)]
        fix: bool,
    },

    /// Run the envelope codec benchmarks
    Bench,

    /// Run one fuzz target, or each in turn (requires cargo-fuzz and nightly)
    Fuzz {
        /// Target to run; all targets when omitted
        target: Option<String>,

        /// Seconds to spend per target
        #[arg(long, default_value_t = 60)]
        seconds: u64,
    },

    /// Run all CI checks
    Ci,

    /// Generate documentation
    Doc {
        /// Open the docs in a browser
        #[arg(long)]
        open: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Test { package } => match package {
            Some(package) => run_command("cargo", &["test", "-p", &package])?,
            None => run_command("cargo", &["test", "--workspace"])?,
        },
        Commands::Lint => lint()?,
        Commands::Fmt { fix } => {
            if fix {
                run_command("cargo", &["fmt", "--all"])?;
            } else {
                run_command("cargo", &["fmt", "--all", "--check"])?;
            }
        }
        Commands::Bench => {
            run_command(
                "cargo",
                &["bench", "-p", "tether-core", "--bench", "envelope_bench"],
            )?;
        }
        Commands::Fuzz { target, seconds } => {
            let targets: Vec<&str> = match &target {
                Some(target) => {
                    if !FUZZ_TARGETS.contains(&target.as_str()) {
                        anyhow::bail!(
                            "Unknown fuzz target: {target}. Must be one of: {}",
                            FUZZ_TARGETS.join(", ")
                        );
                    }
                    vec![target.as_str()]
                }
                None => FUZZ_TARGETS.to_vec(),
            };
            let max_time = format!("-max_total_time={seconds}");
            for target in targets {
                println!("Fuzzing {target} for {seconds}s...");
                run_command(
                    "cargo",
                    &["+nightly", "fuzz", "run", "--fuzz-dir", "fuzz", target, "--", &max_time],
                )?;
            }
        }
        Commands::Ci => {
            println!("Running CI checks...");
            run_command("cargo", &["fmt", "--all", "--check"])?;
            lint()?;
            run_command("cargo", &["test", "--workspace"])?;
            run_command("cargo", &["bench", "-p", "tether-core", "--no-run"])?;
            println!("All CI checks passed!");
        }
        Commands::Doc { open } => {
            let mut args = vec!["doc", "--workspace", "--no-deps"];
            if open {
                args.push("--open");
            }
            run_command("cargo", &args)?;
        }
    }

    Ok(())
}

fn lint() -> anyhow::Result<()> {
    run_command(
        "cargo",
        &["clippy", "--workspace", "--all-targets", "--", "-D", "warnings"],
    )
}

fn run_command(program: &str, args: &[&str]) -> anyhow::Result<()> {
    let status = Command::new(program).args(args).status()?;

    if !status.success() {
        anyhow::bail!("{program} {} failed", args.join(" "));
    }

    Ok(())
}
