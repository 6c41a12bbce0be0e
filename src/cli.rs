// camstamp CLI binary

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};

use camstamp_lib::config::{OverlayStyle, PhotoOptions, TextColor, VideoOptions};
use camstamp_lib::constants::{
    ALPR_CONFIG_PATH, ALPR_COUNTRY, DEFAULT_FONT_PATH, DEFAULT_OUTPUT_DIR, DEFAULT_RESOLUTION,
    DEFAULT_TARGET_SIZE_MB, DRAW_PRESET, X264_PRESETS,
};
use camstamp_lib::{run_photo_batch, run_video_batch, BatchResult};

#[derive(Parser)]
#[command(name = "camstamp")]
#[command(about = "Burn capture timestamps into photos and videos", long_about = None)]
#[command(version)]
struct Cli {
    /// More log output (-v info, -vv debug, -vvv trace); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Print the summary as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct StyleArgs {
    /// TrueType font for the timestamp
    #[arg(long, default_value = DEFAULT_FONT_PATH)]
    font: PathBuf,
    /// Text color: a name, #RRGGBB, or R,G,B
    #[arg(long, default_value = "red")]
    color: TextColor,
}

impl StyleArgs {
    fn into_style(self) -> OverlayStyle {
        OverlayStyle {
            font_path: self.font,
            color: self.color,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Stamp photos and group them by license plate
    Photos {
        /// Photo files or directories
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Output directory
        #[arg(short, long, default_value = DEFAULT_OUTPUT_DIR)]
        output: PathBuf,
        /// Keep every photo in the output directory (no plate grouping)
        #[arg(short, long)]
        single_directory: bool,
        #[command(flatten)]
        style: StyleArgs,
        /// OpenALPR configuration file
        #[arg(long, default_value = ALPR_CONFIG_PATH)]
        alpr_config: PathBuf,
        /// OpenALPR country code
        #[arg(long, default_value = ALPR_COUNTRY)]
        alpr_country: String,
    },

    /// Stamp videos with a running clock and compress them
    Videos {
        /// Video files or directories
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Output directory
        #[arg(short, long, default_value = DEFAULT_OUTPUT_DIR)]
        output: PathBuf,
        /// Short-side resolution of the output; 0 keeps the source resolution
        #[arg(short, long, default_value_t = DEFAULT_RESOLUTION)]
        resolution: u32,
        /// Target file size in MB
        #[arg(short, long, default_value_t = DEFAULT_TARGET_SIZE_MB)]
        size: u64,
        /// Keep the drawn, uncompressed intermediate
        #[arg(short = 'u', long)]
        save_uncompressed: bool,
        /// Only draw the timestamp; skip compression
        #[arg(short, long)]
        draw_only: bool,
        #[command(flatten)]
        style: StyleArgs,
        /// x264 preset for the drawing pass
        #[arg(long, default_value = DRAW_PRESET, value_parser = clap::builder::PossibleValuesParser::new(X264_PRESETS))]
        preset: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let result = match cli.command {
        Commands::Photos {
            files,
            output,
            single_directory,
            style,
            alpr_config,
            alpr_country,
        } => {
            let options = PhotoOptions {
                output_dir: output,
                single_directory,
                style: style.into_style(),
                alpr_config,
                alpr_country,
            };
            run_photo_batch(&files, &options)?
        }
        Commands::Videos {
            files,
            output,
            resolution,
            size,
            save_uncompressed,
            draw_only,
            style,
            preset,
        } => {
            let options = VideoOptions {
                output_dir: output,
                resolution: (resolution > 0).then_some(resolution),
                target_size_mb: size,
                save_uncompressed,
                draw_only,
                style: style.into_style(),
                draw_preset: preset,
            };
            run_video_batch(&files, &options)?
        }
    };

    print_summary(&result, cli.json)?;
    Ok(())
}

fn setup_logging(verbosity: u8) {
    let level = match verbosity {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn print_summary(result: &BatchResult, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(result)?);
        return Ok(());
    }

    println!("Total:     {}", result.total);
    println!("Processed: {}", result.processed);
    println!("Skipped:   {}", result.skipped);
    println!("Failed:    {}", result.failed);
    if result.clustered > 0 {
        println!("Clustered: {}", result.clustered);
    }
    Ok(())
}
