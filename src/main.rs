use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use postclean::cleaner::Cleaner;
use postclean::config::Config;
use postclean::pipeline::{self, finetune::DEFAULT_FINETUNE_OUTPUT, jsonl::DEFAULT_TEXT_FIELD};

#[derive(Parser)]
#[command(name = "postclean", about = "Blog post export cleaning pipeline")]
struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a post export CSV into cleaned JSONL
    Convert {
        #[arg(default_value = "downloaded_data.csv")]
        input: PathBuf,
        #[arg(default_value = "output.jsonl")]
        output: PathBuf,
    },
    /// Re-normalize a text field of every JSONL record
    CleanText {
        input: PathBuf,
        output: PathBuf,
        #[arg(long, default_value = DEFAULT_TEXT_FIELD)]
        field: String,
    },
    /// Package cleaned articles as chat-format fine-tuning examples
    Finetune {
        #[arg(default_value = "output.jsonl")]
        input: PathBuf,
        #[arg(default_value = DEFAULT_FINETUNE_OUTPUT)]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    let config = Config::from_env()?;

    match cli.command {
        Commands::Convert { input, output } => {
            let cleaner = Cleaner::from_config(&config)?;
            let stats = pipeline::convert_file(&input, &output, &cleaner)
                .with_context(|| format!("converting {}", input.display()))?;
            info!(
                written = stats.written,
                skipped = stats.skipped,
                output = %output.display(),
                "converted"
            );
        }
        Commands::CleanText {
            input,
            output,
            field,
        } => {
            let cleaner = Cleaner::from_config(&config)?;
            let text = pipeline::read_input(&input)
                .with_context(|| format!("reading {}", input.display()))?;
            let stats =
                pipeline::clean_jsonl(text.as_bytes(), create_output(&output)?, &cleaner, &field)?;
            info!(
                written = stats.written,
                skipped = stats.skipped,
                output = %output.display(),
                "cleaned"
            );
        }
        Commands::Finetune { input, output } => {
            let text = pipeline::read_input(&input)
                .with_context(|| format!("reading {}", input.display()))?;
            let stats = pipeline::build_finetune_corpus(text.as_bytes(), create_output(&output)?)?;
            info!(
                written = stats.written,
                skipped = stats.skipped,
                output = %output.display(),
                "fine-tuning corpus written"
            );
        }
    }

    Ok(())
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

fn create_output(path: &Path) -> Result<BufWriter<File>> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating directory {}", parent.display()))?;
    }
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    Ok(BufWriter::new(file))
}
