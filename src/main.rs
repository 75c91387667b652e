use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use image::imageops;
use genfill::{
    logger::{self, LogLevel, LoggerConfig},
    EditSession, GeminiConfig, GenerationClient, Notice, NoticeLevel, Notifier, RasterDocument,
    SelectionBounds, SessionConfig,
};

#[derive(Parser)]
#[command(name = "genfill", version, about = "Generative fill on the command line")]
struct Cli {
    #[command(flatten)]
    canvas: CanvasArgs,

    /// Log level: trace, debug, info, warn or error.
    #[arg(long, global = true, default_value = "info")]
    log_level: LogLevel,

    /// Also append log lines to this file.
    #[arg(long, global = true)]
    log_file: Option<String>,

    /// Emit log entries as JSON objects.
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct CanvasArgs {
    /// Image to open as the document.
    #[arg(long, global = true)]
    input: Option<PathBuf>,

    /// Blank canvas width when no input is given.
    #[arg(long, global = true, default_value_t = 1024)]
    width: u32,

    /// Blank canvas height when no input is given.
    #[arg(long, global = true, default_value_t = 1024)]
    height: u32,

    /// Selection as left,top,right,bottom.
    #[arg(long, global = true, value_parser = parse_selection)]
    selection: Option<SelectionBounds>,

    /// Grayscale coverage image for a soft selection, stretched to the selection box.
    #[arg(long, global = true, requires = "selection")]
    mask: Option<PathBuf>,

    /// Where to write the flattened result.
    #[arg(long, global = true, default_value = "genfill-output.png")]
    output: PathBuf,

    #[arg(long, global = true)]
    temperature: Option<f64>,
}

#[derive(Subcommand)]
enum Command {
    /// Generate a new layer from a prompt.
    Generate { prompt: String },
    /// Regenerate the selected region from a prompt.
    Edit { prompt: String },
    /// Apply blur, remove, enhance, colorize or sharpen, or any free-text instruction.
    Transform { kind: String },
    /// Extend the whole canvas outward.
    Extend {
        #[arg(default_value = "all sides")]
        direction: String,
    },
}

fn parse_selection(value: &str) -> Result<SelectionBounds, String> {
    let edges = value
        .split(',')
        .map(|part| part.trim().parse::<i64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| format!("invalid selection '{}': {}", value, e))?;

    match edges[..] {
        [left, top, right, bottom] => SelectionBounds::from_edges(top, left, bottom, right)
            .ok_or_else(|| {
                format!(
                    "selection '{}' must have right >= left, bottom >= top and fit in u32 pixels",
                    value
                )
            }),
        _ => Err(format!(
            "selection '{}' must be four numbers: left,top,right,bottom",
            value
        )),
    }
}

struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, notice: &Notice) {
        match notice.level {
            NoticeLevel::Success => println!("{}", notice.message.green()),
            NoticeLevel::Failure => eprintln!("{}", notice.message.red()),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let env_loaded = dotenv::dotenv().is_ok();
    let cli = Cli::parse();

    let mut log_config = LoggerConfig::development()
        .with_level(cli.log_level)
        .with_json_output(cli.json_logs);
    if let Some(path) = &cli.log_file {
        log_config = log_config.with_file_output(path.as_str());
    }
    logger::init_with_config(log_config)?;
    logger::log_startup_info(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
    if !env_loaded {
        log::debug!("No .env file found, using system environment variables");
    }

    let gemini = GeminiConfig::from_env();
    logger::log_config_info(&gemini);

    let canvas = cli.canvas;
    let document = match &canvas.input {
        Some(path) => RasterDocument::open(path).await?,
        None => RasterDocument::blank(canvas.width, canvas.height),
    };
    if let Some(bounds) = canvas.selection {
        log::info!("Selection: {}", bounds);
        match &canvas.mask {
            Some(path) => {
                let mask = image::open(path)?.to_luma8();
                let mask = imageops::resize(
                    &mask,
                    bounds.width(),
                    bounds.height(),
                    imageops::FilterType::Triangle,
                );
                document.select_masked(bounds, mask).await?;
            }
            None => document.select(bounds).await?,
        }
    }
    let document = Arc::new(document);

    let mut session_config = SessionConfig::new();
    if let Some(temperature) = canvas.temperature {
        session_config = session_config.with_temperature(temperature);
    }

    let session = EditSession::new(
        document.clone(),
        GenerationClient::new(gemini),
        session_config,
    )
    .with_notifier(Arc::new(ConsoleNotifier));

    let report = match &cli.command {
        Command::Generate { prompt } => session.generate_from_prompt(prompt).await,
        Command::Edit { prompt } => session.edit_selection(prompt).await,
        Command::Transform { kind } => session.transform_selection(kind).await,
        Command::Extend { direction } => session.extend_image(Some(direction)).await,
    };

    if !report.success {
        std::process::exit(1);
    }

    document.save_flattened(&canvas.output).await?;
    log::info!("💾 Saved {}", canvas.output.display());
    Ok(())
}
