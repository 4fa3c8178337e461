//! Tether CLI
//!
//! Pack, inspect, and loop back single-file transfer envelopes.

mod commands;
mod config;
mod format;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use config::Config;
use format::{format_bytes, hex_preview};
use tether_core::envelope::unwrap_params;

/// Tether - single-file transfer over a duplex message channel
#[derive(Parser)]
#[command(name = "tether")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Configuration file path (defaults to the platform config directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode a stored file into an envelope file
    Pack {
        /// File to pack, e.g. data://notes/today.txt
        #[arg(required = true)]
        path: String,

        /// JSON metadata carried with the file
        #[arg(long)]
        params: Option<String>,

        /// Session id written into the envelope
        #[arg(long, default_value_t = 1, allow_negative_numbers = true)]
        session_id: i32,

        /// Output envelope file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Decode an envelope file and print its fields
    Inspect {
        /// Envelope file
        #[arg(required = true)]
        file: PathBuf,
    },

    /// Transfer a stored file between two in-process engines
    Loopback {
        /// File to send, e.g. data://notes/today.txt
        #[arg(required = true)]
        path: String,

        /// JSON metadata carried with the file
        #[arg(long)]
        params: Option<String>,

        /// Receiver's data directory
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Show the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::load_or_default()?,
    };

    // Validate configuration
    config.validate()?;

    // Initialize logging
    let level = if cli.verbose {
        "debug"
    } else {
        config.logging.level.as_str()
    };
    tracing_subscriber::fmt().with_env_filter(level).init();

    match cli.command {
        Commands::Pack {
            path,
            params,
            session_id,
            output,
        } => {
            let params = commands::parse_params(params.as_deref())?;
            let storage = commands::config_storage(&config);
            let envelope = commands::pack(&storage, &path, params, session_id, &output)?;

            println!("Packed: {}", envelope.file_path);
            println!("Session: {}", envelope.session_id);
            println!("Size: {}", format_bytes(u64::from(envelope.file_size)));
            println!("Output: {}", output.display());
        }
        Commands::Inspect { file } => {
            let (header, envelope) = commands::inspect(&file)?;

            println!("Envelope: {}", file.display());
            println!("  Session id: {}", header.session_id);
            println!("  File size: {}", format_bytes(u64::from(header.file_size)));
            println!("  File name: {} ({} bytes)", envelope.file_name, header.file_name_len);
            println!("  File path: {} ({} bytes)", envelope.file_path, header.file_path_len);
            match envelope.params.as_ref().and_then(unwrap_params) {
                Some(params) => println!("  Params: {params} ({} bytes)", header.params_len),
                None => println!("  Params: none"),
            }
            println!("  Header: {}", format_bytes(header.header_len()));
            println!(
                "  Content: {} [{}]",
                format_bytes(envelope.content.len() as u64),
                hex_preview(&envelope.content, 16)
            );
        }
        Commands::Loopback {
            path,
            params,
            output,
        } => {
            let params = commands::parse_params(params.as_deref())?;
            let received = commands::loopback(&config, &path, params, &output).await?;

            println!("Received: {}", received.file_path());
            println!("Session: {}", received.session_id());
            println!("Size: {}", format_bytes(u64::from(received.file_size())));
            if let Some(params) = received.decoded_params() {
                println!("Params: {params}");
            }
            println!("Written under: {}", output.display());
        }
        Commands::Config => {
            let path = cli.config.unwrap_or_else(Config::default_path);
            println!("# {}", path.display());
            print!("{}", toml::to_string_pretty(&config)?);
        }
    }

    Ok(())
}
