use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn, Level};
use tracing_subscriber::EnvFilter;

use auto_master::{
    config::Config,
    engine::{FfmpegEngine, OutputFormat},
    mastering::{Intensity, PresetSelection, Tone},
    pipeline::{MasterOptions, MasteringMode, MasteringPipeline},
    session::{SessionStore, UserId},
};

#[derive(Parser)]
#[command(
    name = "auto-master",
    version,
    about = "Automatic mastering for finished mixes",
    long_about = "Auto-Master measures a recording's loudness, spectrum, stereo image and dynamics, derives mastering parameters from them, and renders the result through ffmpeg with two-pass loudness normalization."
)]
struct Cli {
    /// Configuration file (optional)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Measure a file and print the analysis report as JSON
    Analyze {
        /// Audio file path (WAV, MP3, FLAC, OGG, M4A)
        input: PathBuf,
    },

    /// Master a file
    Master {
        input: PathBuf,

        /// Output file path; the extension follows the format
        #[arg(short, long)]
        output: PathBuf,

        #[command(flatten)]
        choice: PresetArgs,

        /// Output encoding (defaults to the session's format)
        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,

        /// Re-render in smaller formats until the file is at most this size
        #[arg(long)]
        max_bytes: Option<u64>,

        /// Session id; preferences are kept in memory for this run only
        #[arg(long, default_value_t = 0)]
        user: UserId,
    },

    /// Compare a recording before and after mastering
    Compare {
        #[arg(long)]
        before: PathBuf,

        #[arg(long)]
        after: PathBuf,

        /// Directory for report.json and preset_suggestion.json
        #[arg(long, default_value = "mastering_report")]
        outdir: PathBuf,
    },

    /// Print the filter graph that would be rendered for a file
    Chain {
        input: PathBuf,

        #[command(flatten)]
        choice: PresetArgs,
    },

    /// Configuration helpers
    Config {
        /// Write the active configuration to this path
        #[arg(long)]
        write: PathBuf,
    },
}

#[derive(Args)]
struct PresetArgs {
    /// Derive parameters from the analysis instead of presets
    #[arg(long, conflicts_with_all = ["intensity", "tone"])]
    auto: bool,

    #[arg(short, long, value_enum)]
    intensity: Option<Intensity>,

    #[arg(short, long, value_enum)]
    tone: Option<Tone>,
}

impl PresetArgs {
    fn mode(&self, pipeline: &MasteringPipeline) -> MasteringMode {
        if self.auto {
            return MasteringMode::Auto;
        }
        let defaults = pipeline.presets().defaults();
        MasteringMode::Preset(PresetSelection::new(
            self.intensity.unwrap_or(defaults.intensity),
            self.tone.unwrap_or(defaults.tone),
        ))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging; RUST_LOG overrides the flag
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.to_string()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    info!("Starting Auto-Master v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = match &cli.config {
        Some(config_path) => {
            info!("Loading configuration from {:?}", config_path);
            Config::from_file(config_path)?
        }
        None => {
            info!("Using default configuration");
            Config::default()
        }
    };

    match cli.command {
        Command::Analyze { input } => {
            let pipeline = MasteringPipeline::new(config);
            let report = pipeline.analyze(&input).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }

        Command::Master { input, output, choice, format, max_bytes, user } => {
            if !FfmpegEngine::new(&config.engine).is_available() {
                anyhow::bail!("'{}' was not found; install ffmpeg or set engine.program", config.engine.program);
            }

            let pipeline = MasteringPipeline::new(config);
            let sessions = SessionStore::new(pipeline.presets().defaults());
            let mode = choice.mode(&pipeline);

            // Held until the render finishes: one request per user at a time
            let session = sessions
                .begin(user, |record| {
                    match mode {
                        MasteringMode::Auto => record.auto = true,
                        MasteringMode::Preset(selection) => {
                            record.auto = false;
                            record.intensity = selection.intensity;
                            record.tone = selection.tone;
                        }
                    }
                    if let Some(format) = format {
                        record.format = format;
                    }
                })
                .await;

            let options = MasterOptions {
                mode: if session.auto { MasteringMode::Auto } else { MasteringMode::Preset(session.selection()) },
                format: session.format,
                max_bytes,
            };

            let outcome = pipeline
                .master(&input, &output, &options)
                .await
                .map_err(|e| anyhow::anyhow!(e.user_message()))?;

            if !outcome.render.within_limit {
                warn!("Output is larger than the requested {} bytes", max_bytes.unwrap_or_default());
            }
            println!("{}", outcome.summary());
        }

        Command::Compare { before, after, outdir } => {
            let pipeline = MasteringPipeline::new(config);
            let comparison = pipeline.compare(&before, &after).await?;
            comparison
                .write_to(&outdir)
                .with_context(|| format!("writing reports to {:?}", outdir))?;
            println!("=== SUMMARY ===");
            println!("{}", comparison.summary());
            info!("Reports saved to: {:?}", outdir);
        }

        Command::Chain { input, choice } => {
            let pipeline = MasteringPipeline::new(config);
            let plan = pipeline.plan(&input, choice.mode(&pipeline)).await?;
            println!("{}", plan.chain.render()?);
        }

        Command::Config { write } => {
            config.save_to_file(&write)?;
            info!("Configuration written to {:?}", write);
        }
    }

    Ok(())
}
