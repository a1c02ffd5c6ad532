//! Image text recognition through the `tesseract` command-line tool.

use std::io::Write;
use std::path::Path;
use std::process::Command;

use tracing::debug;

use crate::services::extract::ExtractError;

/// Tesseract OCR adapter.
#[derive(Debug, Clone)]
pub struct TesseractOcr {
    languages: String,
}

impl TesseractOcr {
    pub fn new(languages: impl Into<String>) -> Self {
        Self {
            languages: languages.into(),
        }
    }

    /// Whether the `tesseract` binary is on `PATH`.
    pub fn is_available(&self) -> bool {
        which::which("tesseract").is_ok()
    }

    /// Recognize text in an encoded image. Runs the binary on a blocking thread.
    pub async fn recognize(&self, bytes: &[u8]) -> Result<String, ExtractError> {
        let format = image::guess_format(bytes)?;
        if !self.is_available() {
            return Err(ExtractError::Unavailable(
                "tesseract not found (install tesseract-ocr)".to_string(),
            ));
        }

        let suffix = format
            .extensions_str()
            .first()
            .map(|ext| format!(".{ext}"))
            .unwrap_or_default();

        let mut file = tempfile::Builder::new().suffix(&suffix).tempfile()?;
        file.write_all(bytes)?;
        file.flush()?;

        let languages = self.languages.clone();
        tokio::task::spawn_blocking(move || {
            let text = run_tesseract(file.path(), &languages);
            drop(file);
            text
        })
        .await
        .map_err(|e| ExtractError::Ocr(e.to_string()))?
    }
}

fn run_tesseract(image_path: &Path, languages: &str) -> Result<String, ExtractError> {
    debug!(path = %image_path.display(), languages, "Running tesseract");

    let output = Command::new("tesseract")
        .arg(image_path)
        .arg("stdout")
        .args(["-l", languages])
        .output();

    match output {
        Ok(output) if output.status.success() => {
            Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
        }
        Ok(output) => Err(ExtractError::Ocr(format!(
            "tesseract failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        ))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(ExtractError::Unavailable(
            "tesseract not found (install tesseract-ocr)".to_string(),
        )),
        Err(e) => Err(ExtractError::Io(e)),
    }
}
