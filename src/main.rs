use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use nutrilabel::label_parser::NutritionLabelParser;
use nutrilabel::nutrition_types::ParseResult;
use nutrilabel::ocr::VisionClient;
use nutrilabel::ocr_config::{DetectionMode, VisionConfig};
use nutrilabel::parser_config::{ParserConfig, DEFAULT_RAW_TEXT_CAP};
use nutrilabel::vocabulary::{load_vocabulary, DEFAULT_VOCABULARY_PATH};
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "nutrilabel", version, about = "Extract per-100 macros from nutrition label text")]
struct Cli {
    /// Pretty-print the JSON result
    #[arg(long, global = true)]
    pretty: bool,

    /// Keyword vocabulary JSON file
    #[arg(long, global = true, default_value = DEFAULT_VOCABULARY_PATH)]
    vocabulary: PathBuf,

    /// Characters kept after the "per 100" marker
    #[arg(long, global = true)]
    section_window: Option<usize>,

    /// Lines scanned after a value-less label line
    #[arg(long, global = true)]
    lookahead: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse an OCR transcription ("-" reads stdin)
    Text { input: String },
    /// Transcribe an image with Google Vision, then parse it
    Image {
        path: PathBuf,
        /// Use DOCUMENT_TEXT_DETECTION instead of TEXT_DETECTION
        #[arg(long)]
        document: bool,
    },
    /// Transcribe a data:image/...;base64 URL read from a file ("-" reads stdin)
    DataUrl { input: String },
}

fn read_input(input: &str) -> Result<String> {
    if input == "-" {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .context("Failed to read stdin")?;
        Ok(buffer)
    } else {
        fs::read_to_string(input).with_context(|| format!("Failed to read {input}"))
    }
}

fn vision_client(detection_mode: DetectionMode) -> Result<VisionClient> {
    let mut config = VisionConfig::from_env()?;
    config.detection_mode = detection_mode;
    Ok(VisionClient::new(config)?)
}

fn print_result(result: ParseResult, pretty: bool) -> Result<()> {
    let result = result.with_raw_text_cap(DEFAULT_RAW_TEXT_CAP);
    let json = if pretty {
        serde_json::to_string_pretty(&result)?
    } else {
        serde_json::to_string(&result)?
    };
    println!("{json}");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    env_logger::init();

    // Load environment variables from .env file
    dotenv::dotenv().ok();

    let cli = Cli::parse();

    let mut config = ParserConfig::default();
    if let Some(window) = cli.section_window {
        config.section_window = window;
    }
    if let Some(lookahead) = cli.lookahead {
        config.lookahead_lines = lookahead;
    }
    let vocabulary = load_vocabulary(&cli.vocabulary);
    let parser = NutritionLabelParser::with_config(config, vocabulary)
        .context("Invalid parser configuration")?;

    let transcription = match &cli.command {
        Commands::Text { input } => read_input(input)?,
        Commands::Image { path, document } => {
            let mode = if *document {
                DetectionMode::DocumentTextDetection
            } else {
                DetectionMode::TextDetection
            };
            info!("Transcribing {}", path.display());
            vision_client(mode)?.detect_text_in_file(path).await?
        }
        Commands::DataUrl { input } => {
            let data_url = read_input(input)?;
            vision_client(DetectionMode::TextDetection)?
                .detect_text_in_data_url(&data_url)
                .await?
        }
    };

    print_result(parser.parse(&transcription), cli.pretty)
}
