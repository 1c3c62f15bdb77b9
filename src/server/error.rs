//! HTTP error mapping.
//!
//! | Error                           | Status | Body                              |
//! |---------------------------------|--------|-----------------------------------|
//! | invalid `format`                | 400    | `Formato inválido`                |
//! | missing field, bad multipart    | 400    | short Portuguese message          |
//! | body over `max_upload_bytes`    | 413    | `Arquivo muito grande`            |
//! | not a Word package              | 422    | `Documento inválido`              |
//! | PDF renderer reported errors    | 500    | `Erro ao gerar PDF`               |
//! | conversion timed out            | 503    | `Tempo limite de conversão excedido` |
//! | anything else                   | 500    | `Erro interno do servidor`        |
//!
//! Bodies are plain text and never include error details; those go to the
//! log instead. An unreadable upload is the requester's problem and gets a
//! 422; only faults on our side answer 500.

use crate::error::ConvertError;
use crate::storage::StorageError;
use axum::extract::multipart::MultipartError;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::{error, warn};

#[derive(Debug, Error)]
pub enum AppError {
    /// A required form field was absent.
    #[error("Missing form field '{0}'")]
    MissingField(&'static str),

    /// The multipart body could not be read.
    #[error("Invalid multipart body: {detail}")]
    Multipart { status: StatusCode, detail: String },

    #[error(transparent)]
    Convert(#[from] ConvertError),
}

impl From<StorageError> for AppError {
    fn from(e: StorageError) -> Self {
        AppError::Convert(e.into())
    }
}

impl From<MultipartError> for AppError {
    fn from(e: MultipartError) -> Self {
        AppError::Multipart {
            status: e.status(),
            detail: e.body_text(),
        }
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::MissingField(_) => StatusCode::BAD_REQUEST,
            AppError::Multipart { status, .. } => *status,
            AppError::Convert(e) => match e {
                ConvertError::InvalidFormat { .. } => StatusCode::BAD_REQUEST,
                ConvertError::NotADocx { .. } | ConvertError::MalformedDocument { .. } => {
                    StatusCode::UNPROCESSABLE_ENTITY
                }
                ConvertError::Timeout { .. } => StatusCode::SERVICE_UNAVAILABLE,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    /// Message shown to the requester.
    pub fn client_message(&self) -> String {
        match self {
            AppError::MissingField(field) => format!("Campo obrigatório ausente: {field}"),
            AppError::Multipart { status, .. } if *status == StatusCode::PAYLOAD_TOO_LARGE => {
                "Arquivo muito grande".to_string()
            }
            AppError::Multipart { .. } => "Requisição inválida".to_string(),
            AppError::Convert(e) => match e {
                ConvertError::InvalidFormat { .. } => "Formato inválido".to_string(),
                ConvertError::NotADocx { .. } | ConvertError::MalformedDocument { .. } => {
                    "Documento inválido".to_string()
                }
                ConvertError::PdfRenderFailed { .. } => "Erro ao gerar PDF".to_string(),
                ConvertError::Timeout { .. } => "Tempo limite de conversão excedido".to_string(),
                _ => "Erro interno do servidor".to_string(),
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %self, "Request failed");
        } else {
            warn!(status = status.as_u16(), error = %self, "Request rejected");
        }

        (
            status,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            self.client_message(),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_and_message_mapping() {
        let cases: Vec<(AppError, StatusCode, &str)> = vec![
            (
                ConvertError::InvalidFormat { value: "xyz".into() }.into(),
                StatusCode::BAD_REQUEST,
                "Formato inválido",
            ),
            (
                ConvertError::malformed("no body").into(),
                StatusCode::UNPROCESSABLE_ENTITY,
                "Documento inválido",
            ),
            (
                ConvertError::PdfRenderFailed {
                    count: 1,
                    first_error: "x".into(),
                }
                .into(),
                StatusCode::INTERNAL_SERVER_ERROR,
                "Erro ao gerar PDF",
            ),
            (
                ConvertError::Timeout { secs: 5 }.into(),
                StatusCode::SERVICE_UNAVAILABLE,
                "Tempo limite de conversão excedido",
            ),
            (
                StorageError::NotFound("output/x".into()).into(),
                StatusCode::INTERNAL_SERVER_ERROR,
                "Erro interno do servidor",
            ),
            (
                AppError::MissingField("title"),
                StatusCode::BAD_REQUEST,
                "Campo obrigatório ausente: title",
            ),
        ];
        for (err, status, message) in cases {
            assert_eq!(err.status(), status, "{err:?}");
            assert_eq!(err.client_message(), message);
        }
    }

    #[test]
    fn oversized_body_is_413() {
        let err = AppError::Multipart {
            status: StatusCode::PAYLOAD_TOO_LARGE,
            detail: "length limit exceeded".into(),
        };
        assert_eq!(err.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(err.client_message(), "Arquivo muito grande");
    }

    async fn respond(err: AppError) -> (StatusCode, String, String) {
        let response = err.into_response();
        let status = response.status();
        let content_type = response.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .to_string();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, content_type, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn timeout_and_pdf_failure_responses() {
        let (status, content_type, body) = respond(ConvertError::Timeout { secs: 1 }.into()).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(content_type.starts_with("text/plain"));
        assert_eq!(body, "Tempo limite de conversão excedido");

        let (status, _, body) = respond(
            ConvertError::PdfRenderFailed {
                count: 2,
                first_error: "font registration failed".into(),
            }
            .into(),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, "Erro ao gerar PDF");
    }
}
