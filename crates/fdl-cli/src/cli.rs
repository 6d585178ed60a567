use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "fdl",
    about = "Financial Data Lab: content-addressed receipt store",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Store root directory
    #[arg(long, global = true, env = "FDL_STORE")]
    pub store: Option<PathBuf>,

    /// TOML file with store settings
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Ingest a file into the store
    Ingest(IngestArgs),
    /// Export data
    Export(ExportArgs),
    /// Verify store integrity
    Verify(VerifyArgs),
    /// Show a receipt manifest
    Show(ShowArgs),
    /// Recognize the text of a stored receipt
    Ocr(OcrArgs),
}

#[derive(Args, Debug)]
pub struct IngestArgs {
    pub path: PathBuf,
}

#[derive(Args, Debug)]
pub struct ExportArgs {
    #[command(subcommand)]
    pub target: ExportTarget,
}

#[derive(Subcommand, Debug)]
pub enum ExportTarget {
    /// Export one line per receipt
    Receipts {
        /// Output file (default: <store>/exports/receipts.v1.jsonl)
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[derive(Args, Debug)]
pub struct VerifyArgs {}

#[derive(Args, Debug)]
pub struct ShowArgs {
    pub receipt_id: String,
}

#[derive(Args, Debug)]
pub struct OcrArgs {
    pub receipt_id: String,

    /// Tesseract language code
    #[arg(long, default_value = "por")]
    pub lang: String,
}
