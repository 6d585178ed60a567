use std::path::Path;

use anyhow::Context;
use colored::Colorize;
use fdl_sdk::{
    OcrEngine, PageRenderer, PdftoppmRenderer, ReceiptId, ReceiptVault, SdkError, StoreConfig,
    TesseractEngine,
};
use tracing::debug;

use crate::cli::*;

/// Process exit status for a command that ran to completion.
pub const EXIT_OK: u8 = 0;
/// Process exit status for a precondition, integrity or lookup failure.
pub const EXIT_FAILURE: u8 = 1;

pub fn run_command(cli: Cli) -> anyhow::Result<u8> {
    let config = store_config(cli.store.as_deref(), cli.config.as_deref())?;
    debug!(root = %config.root.display(), sync_mode = ?config.sync_mode, "opening store");
    let vault = ReceiptVault::open(config);
    match cli.command {
        Command::Ingest(args) => cmd_ingest(&vault, &args.path),
        Command::Export(ExportArgs {
            target: ExportTarget::Receipts { out },
        }) => cmd_export_receipts(&vault, out.as_deref()),
        Command::Verify(_) => cmd_verify(&vault),
        Command::Show(args) => cmd_show(&vault, &args.receipt_id),
        Command::Ocr(args) => cmd_ocr(
            &vault,
            &args.receipt_id,
            &args.lang,
            &TesseractEngine::new(),
            &PdftoppmRenderer::new(),
        ),
    }
}

/// `--store` (or `FDL_STORE`) wins over the config file's `root`, which wins
/// over the built-in default.
fn store_config(store: Option<&Path>, config: Option<&Path>) -> anyhow::Result<StoreConfig> {
    let mut resolved = match config {
        Some(path) => StoreConfig::from_toml_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => StoreConfig::default(),
    };
    if let Some(root) = store {
        resolved.root = root.to_path_buf();
    }
    Ok(resolved)
}

fn cmd_ingest(vault: &ReceiptVault, path: &Path) -> anyhow::Result<u8> {
    let outcome = match vault.ingest(path) {
        Ok(outcome) => outcome,
        Err(SdkError::SourceNotFound(_)) => {
            eprintln!("{} File not found: {}", "✗".red().bold(), path.display());
            return Ok(EXIT_FAILURE);
        }
        Err(err) => return Err(err.into()),
    };

    if outcome.manifest_created {
        eprintln!("{} Ingested new receipt", "✓".green().bold());
    } else {
        eprintln!("{} Receipt already in store", "=".yellow().bold());
    }
    println!("receipt_id: {}", outcome.receipt_id);
    println!("object_path: {}", outcome.object_path.display());
    println!("manifest_path: {}", outcome.manifest_path.display());
    Ok(EXIT_OK)
}

fn cmd_export_receipts(vault: &ReceiptVault, out: Option<&Path>) -> anyhow::Result<u8> {
    let summary = vault.export(out)?;
    eprintln!(
        "{} Exported {} receipts",
        "✓".green().bold(),
        summary.records.to_string().bold()
    );
    if summary.skipped > 0 {
        eprintln!(
            "  {} {} unreadable manifests skipped",
            "!".yellow().bold(),
            summary.skipped
        );
    }
    println!("export_path: {}", summary.path.display());
    Ok(EXIT_OK)
}

fn cmd_verify(vault: &ReceiptVault) -> anyhow::Result<u8> {
    if !vault.layout().receipts_root().exists() {
        println!("No receipts found.");
        return Ok(EXIT_OK);
    }
    let report = vault.verify()?;
    for issue in &report.issues {
        eprintln!("  {} {issue}", "✗".red());
    }
    if !report.is_clean() {
        eprintln!(
            "{} {} of {} manifests failed verification",
            "✗".red().bold(),
            report.error_count(),
            report.manifests_checked
        );
        return Ok(EXIT_FAILURE);
    }
    println!(
        "{} Store verification passed. ({} manifests)",
        "✓".green().bold(),
        report.manifests_checked
    );
    Ok(EXIT_OK)
}

fn cmd_show(vault: &ReceiptVault, receipt_id: &str) -> anyhow::Result<u8> {
    let report = match vault.show(receipt_id) {
        Ok(report) => report,
        Err(SdkError::ReceiptNotFound(id)) => {
            eprintln!("{} Manifest not found: {id}", "✗".red().bold());
            return Ok(EXIT_FAILURE);
        }
        Err(err) => return Err(err.into()),
    };

    print!("{}", report.manifest_text);
    if let Some(reason) = &report.invalid_json {
        eprintln!(
            "{} Invalid JSON in {}: {reason}",
            "✗".red().bold(),
            report.manifest_path.display()
        );
        return Ok(EXIT_FAILURE);
    }
    println!("object_exists: {}", report.object_exists);
    println!("hash_match: {}", report.hash_match);
    Ok(if report.is_healthy() {
        EXIT_OK
    } else {
        EXIT_FAILURE
    })
}

fn cmd_ocr(
    vault: &ReceiptVault,
    receipt_id: &str,
    lang: &str,
    engine: &dyn OcrEngine,
    renderer: &dyn PageRenderer,
) -> anyhow::Result<u8> {
    let not_found = || -> anyhow::Result<u8> {
        eprintln!("{} Manifest not found: {receipt_id}", "✗".red().bold());
        Ok(EXIT_FAILURE)
    };
    let Ok(id) = ReceiptId::parse(receipt_id) else {
        return not_found();
    };
    let outcome = match vault.observe_receipt(&id, engine, Some(renderer), lang) {
        Ok(outcome) => outcome,
        Err(SdkError::ReceiptNotFound(_)) => return not_found(),
        Err(err @ (SdkError::UnsupportedMedia { .. } | SdkError::Engine { .. })) => {
            eprintln!("{} {err}", "✗".red().bold());
            return Ok(EXIT_FAILURE);
        }
        Err(err) => return Err(err.into()),
    };

    if outcome.ocr.created {
        eprintln!("{} Recognized receipt text", "✓".green().bold());
    } else {
        eprintln!("{} Text already recognized", "=".yellow().bold());
    }
    if let Some(pages) = &outcome.pdf_pages {
        println!("pdf_pages_path: {}", pages.path.display());
    }
    println!("ocr_path: {}", outcome.ocr.path.display());
    Ok(EXIT_OK)
}
