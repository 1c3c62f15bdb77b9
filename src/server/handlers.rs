use super::error::AppError;
use super::state::AppState;
use crate::convert::convert_guarded;
use crate::error::ConvertError;
use crate::format::OutputFormat;
use crate::naming::{output_filename, secure_filename_or_default};
use crate::output::ConversionRequest;
use crate::storage::{ArtifactHandle, StorageArea};
use axum::body::Bytes;
use axum::extract::{Multipart, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Fields of the upload form as received. Unknown fields are ignored.
#[derive(Debug, Default)]
struct UploadForm {
    title: Option<String>,
    author: Option<String>,
    format: Option<String>,
    filename: Option<String>,
    file: Option<Bytes>,
}

async fn read_form(mut multipart: Multipart) -> Result<UploadForm, AppError> {
    let mut form = UploadForm::default();
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(|s| s.to_string()).unwrap_or_default();
        match name.as_str() {
            "title" => form.title = Some(field.text().await?),
            "author" => form.author = Some(field.text().await?),
            "format" => form.format = Some(field.text().await?),
            "file" => {
                let filename = field.file_name().map(|s| s.to_string());
                let data = field.bytes().await?;
                // Browsers send an empty, unnamed part when no file was picked.
                if data.is_empty() && filename.as_deref().unwrap_or("").is_empty() {
                    continue;
                }
                form.filename = filename;
                form.file = Some(data);
            }
            other => debug!("Ignoring form field '{}'", other),
        }
    }
    Ok(form)
}

/// `POST /upload`: store the document, convert it, return the e-book.
pub async fn upload(State(state): State<AppState>, multipart: Multipart) -> Result<Response, AppError> {
    let form = read_form(multipart).await?;

    // The format is checked first: an invalid value is a 400 whatever else
    // the form contains.
    let format: OutputFormat = form.format.as_deref().unwrap_or_default().parse()?;
    let title = form.title.ok_or(AppError::MissingField("title"))?;
    let author = form.author.ok_or(AppError::MissingField("author"))?;
    let data = form.file.ok_or(AppError::MissingField("file"))?;

    let request_id = Uuid::new_v4();
    let upload = state
        .store
        .save(StorageArea::Uploads, &format!("{request_id}.docx"), &data)
        .await?;
    info!(
        %request_id,
        format = %format,
        bytes = data.len(),
        filename = form.filename.as_deref().unwrap_or(""),
        "Upload stored as {}",
        upload
    );

    let permit = state
        .conversions
        .clone()
        .acquire_owned()
        .await
        .map_err(|e| ConvertError::Internal(format!("conversion slots closed: {e}")))?;

    let request = ConversionRequest::new(title, author, format);
    let output = match convert_guarded(data.to_vec(), request, &state.config.conversion, permit).await {
        Ok(output) => output,
        Err(e) => {
            discard(&state, vec![upload]).await;
            return Err(e.into());
        }
    };

    let key = format!("{request_id}.{}", format.extension());
    let stored = match state.store.save(StorageArea::Output, &key, &output.bytes).await {
        Ok(handle) => handle,
        Err(e) => {
            discard(&state, vec![upload]).await;
            return Err(e.into());
        }
    };

    // Served from the output area, not from the in-memory result.
    let body = match state.store.load(&stored).await {
        Ok(body) => body,
        Err(e) => {
            discard(&state, vec![upload, stored]).await;
            return Err(e.into());
        }
    };

    let download = output_filename(
        &secure_filename_or_default(form.filename.as_deref()),
        format,
    );
    info!(%request_id, "Serving {} ({} bytes) as '{}'", stored, body.len(), download);

    discard(&state, vec![upload, stored]).await;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, format.mime_type().to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{download}\""),
            ),
        ],
        body,
    )
        .into_response())
}

/// Delete per-request artifacts unless the server retains them.
async fn discard(state: &AppState, handles: Vec<ArtifactHandle>) {
    if state.config.retain_artifacts {
        return;
    }
    for handle in handles {
        if let Err(e) = state.store.delete(&handle).await {
            warn!("Failed to delete {}: {}", handle, e);
        }
    }
}
