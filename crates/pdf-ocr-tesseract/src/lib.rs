//! OCR engine wrapping the `tesseract` CLI tool.

use std::ffi::{OsStr, OsString};
use std::process::{Command, Output};

use image::ImageFormat;

use pdf_ocr_core::{DecodedImage, OcrEngine, PipelineError};

pub const DEFAULT_COMMAND: &str = "tesseract";

/// Runs `tesseract <input.png> stdout` once per image.
#[derive(Debug, Clone)]
pub struct TesseractEngine {
    command: OsString,
}

impl Default for TesseractEngine {
    fn default() -> Self {
        Self::new(DEFAULT_COMMAND)
    }
}

impl TesseractEngine {
    pub fn new(command: impl AsRef<OsStr>) -> Self {
        Self {
            command: command.as_ref().to_os_string(),
        }
    }

    /// First line of `tesseract --version`, e.g. `tesseract 5.3.4`.
    pub fn version(&self) -> Result<String, PipelineError> {
        let output = self.run(&[OsStr::new("--version")])?;
        // Tesseract 3.x printed its banner on stderr.
        let banner = if output.stdout.is_empty() {
            &output.stderr
        } else {
            &output.stdout
        };
        Ok(String::from_utf8_lossy(banner)
            .lines()
            .next()
            .unwrap_or_default()
            .trim()
            .to_string())
    }

    fn run(&self, args: &[&OsStr]) -> Result<Output, PipelineError> {
        let output = Command::new(&self.command).args(args).output().map_err(|e| {
            PipelineError::OcrEngine(format!(
                "cannot run {}: {e}",
                self.command.to_string_lossy()
            ))
        })?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(PipelineError::OcrEngine(format!(
                "{} failed with {}: {}",
                self.command.to_string_lossy(),
                output.status,
                stderr.trim()
            )));
        }
        Ok(output)
    }
}

impl OcrEngine for TesseractEngine {
    fn name(&self) -> &'static str {
        "tesseract"
    }

    fn recognize(&self, image: &DecodedImage) -> Result<String, PipelineError> {
        let io_err = |what: &str, e: &dyn std::fmt::Display| {
            PipelineError::OcrEngine(format!("cannot {what} tesseract input: {e}"))
        };

        let tmpdir = tempfile::Builder::new()
            .prefix("pdf-ocr")
            .tempdir()
            .map_err(|e| io_err("create directory for", &e))?;
        let input_path = tmpdir.path().join("input.png");
        image
            .save_with_format(&input_path, ImageFormat::Png)
            .map_err(|e| io_err("write", &e))?;

        let output = self.run(&[input_path.as_os_str(), OsStr::new("stdout")])?;
        let text = String::from_utf8_lossy(&output.stdout).into_owned();
        tracing::debug!(
            width = image.width(),
            height = image.height(),
            chars = text.len(),
            "tesseract finished"
        );
        Ok(text)
    }
}
