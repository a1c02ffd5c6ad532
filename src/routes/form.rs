use axum::extract::Multipart;
use axum::http::StatusCode;
use garde::Validate;
use tracing::{debug, warn};

use crate::models::analysis::AnalysisForm;
use crate::models::upload::UploadedFile;

/// Read an analysis form, materializing every uploaded file into memory.
///
/// Text fields: `text`, `link` (or `youtube`), `analysis_type`. File parts may
/// be named `file` or `files` and may repeat.
pub async fn read_analysis_form(
    mut multipart: Multipart,
) -> Result<(AnalysisForm, Vec<UploadedFile>), StatusCode> {
    let mut form = AnalysisForm::default();
    let mut files = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(|e| e.status())? {
        let name = field.name().unwrap_or_default().to_string();

        match name.as_str() {
            "file" | "files" => {
                let filename = field.file_name().unwrap_or("upload").to_string();
                let data = field.bytes().await.map_err(|e| e.status())?;
                // Browsers send an empty part when no file was chosen.
                if data.is_empty() {
                    continue;
                }
                debug!(%filename, bytes = data.len(), "Received upload");
                files.push(UploadedFile::new(filename, data.to_vec()));
            }
            "text" => form.text = Some(field.text().await.map_err(|e| e.status())?),
            "link" | "youtube" => {
                let value = field.text().await.map_err(|e| e.status())?;
                if form.link.is_none() || !value.trim().is_empty() {
                    form.link = Some(value);
                }
            }
            "analysis_type" => form.analysis_type = Some(field.text().await.map_err(|e| e.status())?),
            other => debug!(field = other, "Ignoring unknown form field"),
        }
    }

    if let Err(report) = form.validate() {
        warn!(error = %report, "Rejected analysis form");
        return Err(StatusCode::UNPROCESSABLE_ENTITY);
    }

    Ok((form, files))
}
