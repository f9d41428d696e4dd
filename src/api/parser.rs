// src/api/parser.rs
//! Turns raw HTTP responses into typed payloads or typed Notion errors.

use super::client::ApiResponse;
use super::responses::NotionErrorBody;
use crate::constants::ERROR_BODY_PREVIEW_LENGTH;
use crate::error::{AppError, NotionErrorCode};

/// Decodes a success body into `T`, or the error body into
/// [`AppError::NotionService`].
pub fn parse_api_response<T>(result: ApiResponse<String>) -> Result<T, AppError>
where
    T: serde::de::DeserializeOwned,
{
    if (200..300).contains(&result.status) {
        parse_success(&result.data, &result.url)
    } else {
        Err(decode_error(&result.data, result.status, &result.url))
    }
}

fn parse_success<T>(body: &str, url: &str) -> Result<T, AppError>
where
    T: serde::de::DeserializeOwned,
{
    serde_json::from_str(body).map_err(|e| {
        log::error!("Failed to parse response from {}: {}", url, e);
        AppError::MalformedResponse(format!("{} (body: {})", e, preview(body)))
    })
}

/// Maps a non-2xx body onto the typed error vocabulary, falling back to the
/// HTTP status when the body is not a Notion error object.
pub fn decode_error(body: &str, status: u16, url: &str) -> AppError {
    match serde_json::from_str::<NotionErrorBody>(body) {
        Ok(error) => {
            log::debug!(
                "Notion error {} from {} (request {:?})",
                error.code,
                url,
                error.request_id
            );
            AppError::NotionService {
                code: NotionErrorCode::from_api_response(&error.code),
                message: error.message,
                status,
            }
        }
        Err(_) => AppError::NotionService {
            code: NotionErrorCode::from_http_status(status),
            message: format!("HTTP {} from {}: {}", status, url, preview(body)),
            status,
        },
    }
}

fn preview(body: &str) -> String {
    if body.chars().count() > ERROR_BODY_PREVIEW_LENGTH {
        let cut: String = body.chars().take(ERROR_BODY_PREVIEW_LENGTH).collect();
        format!("{}...", cut)
    } else {
        body.to_string()
    }
}
