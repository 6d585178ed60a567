//! Engines backed by external command-line tools.
//!
//! [`TesseractEngine`] runs the `tesseract` binary and [`PdftoppmRenderer`]
//! runs poppler's `pdftoppm`. Both must be on `PATH` (or given explicitly);
//! a missing or failing tool surfaces as [`SdkError::Engine`].

use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tracing::debug;

use crate::error::{SdkError, SdkResult};
use crate::observe::{OcrEngine, PageRenderer};

/// OCR through the `tesseract` command.
#[derive(Clone, Debug)]
pub struct TesseractEngine {
    program: PathBuf,
}

impl TesseractEngine {
    pub const NAME: &'static str = "tesseract";

    pub fn new() -> Self {
        Self::with_program(Self::NAME)
    }

    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for TesseractEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl OcrEngine for TesseractEngine {
    fn name(&self) -> &str {
        Self::NAME
    }

    /// `"unknown"` when the binary cannot report one.
    fn version(&self) -> String {
        run(Self::NAME, &self.program, &[OsStr::new("--version")])
            .ok()
            .and_then(|out| {
                // Older releases print the banner on stderr.
                let text = [out.stdout.as_slice(), out.stderr.as_slice()].concat();
                parse_version(&String::from_utf8_lossy(&text), "tesseract")
            })
            .unwrap_or_else(|| "unknown".to_string())
    }

    fn recognize(&self, image: &Path, lang: &str) -> SdkResult<String> {
        let out = run(
            Self::NAME,
            &self.program,
            &[image.as_os_str(), OsStr::new("stdout"), OsStr::new("-l"), OsStr::new(lang)],
        )?;
        Ok(String::from_utf8_lossy(&out.stdout).into_owned())
    }
}

/// Page rendering through `pdftoppm -png`.
#[derive(Clone, Debug)]
pub struct PdftoppmRenderer {
    program: PathBuf,
    dpi: u32,
}

impl PdftoppmRenderer {
    pub const NAME: &'static str = "pdftoppm";
    pub const DEFAULT_DPI: u32 = 200;

    pub fn new() -> Self {
        Self::with_program(Self::NAME)
    }

    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            dpi: Self::DEFAULT_DPI,
        }
    }

    pub fn dpi(mut self, dpi: u32) -> Self {
        self.dpi = dpi;
        self
    }
}

impl Default for PdftoppmRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl PageRenderer for PdftoppmRenderer {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn version(&self) -> String {
        run(Self::NAME, &self.program, &[OsStr::new("-v")])
            .ok()
            .and_then(|out| parse_version(&String::from_utf8_lossy(&out.stderr), "pdftoppm version"))
            .unwrap_or_else(|| "unknown".to_string())
    }

    fn render(&self, pdf: &Path) -> SdkResult<Vec<Vec<u8>>> {
        let scratch = tempfile::tempdir()?;
        let prefix = scratch.path().join("page");
        let dpi = self.dpi.to_string();
        run(
            Self::NAME,
            &self.program,
            &[
                OsStr::new("-png"),
                OsStr::new("-r"),
                OsStr::new(&dpi),
                pdf.as_os_str(),
                prefix.as_os_str(),
            ],
        )?;
        read_pages(scratch.path())
    }
}

/// Page images written by `pdftoppm`, in page order.
///
/// Output files are named `page-<n>.png`, with `<n>` zero-padded to the
/// width of the page count, so numeric order is recovered from the suffix.
fn read_pages(dir: &Path) -> SdkResult<Vec<Vec<u8>>> {
    let mut numbered = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let number = path
            .file_stem()
            .and_then(|s| s.to_str())
            .and_then(|s| s.strip_prefix("page-"))
            .and_then(|n| n.parse::<u32>().ok());
        if let Some(number) = number {
            numbered.push((number, path));
        }
    }
    numbered.sort();
    numbered
        .into_iter()
        .map(|(_, path)| fs::read(path).map_err(SdkError::from))
        .collect()
}

fn run(engine: &str, program: &Path, args: &[&OsStr]) -> SdkResult<Output> {
    debug!(engine, program = %program.display(), "running engine");
    let output = Command::new(program)
        .args(args)
        .output()
        .map_err(|e| SdkError::Engine {
            engine: engine.to_string(),
            reason: format!("spawn {}: {e}", program.display()),
        })?;
    if !output.status.success() {
        return Err(SdkError::Engine {
            engine: engine.to_string(),
            reason: format!(
                "status={} stderr={}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ),
        });
    }
    Ok(output)
}

/// The first whitespace-separated token after `marker` on the line that
/// starts with it, e.g. `5.3.0` from `tesseract 5.3.0`.
fn parse_version(banner: &str, marker: &str) -> Option<String> {
    banner
        .lines()
        .find_map(|line| line.trim().strip_prefix(marker))
        .and_then(|rest| rest.split_whitespace().next())
        .map(|v| v.trim_start_matches('v').to_string())
}
