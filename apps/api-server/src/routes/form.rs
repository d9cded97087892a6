use crate::error::ApiError;
use axum::{
    extract::{multipart::MultipartError, Multipart},
    http::StatusCode,
};
use image_source::{AcquireError, SourceCandidates};

/// Fields of the caption form, one per possible image source plus an optional
/// prompt. Unknown fields are ignored.
#[derive(Debug, Default)]
pub struct CaptionForm {
    pub candidates: SourceCandidates,
    pub prompt: Option<String>,
}

fn is_checked(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "on" | "yes"
    )
}

/// A body cut off by the request size limit is an oversized image, not a broken form.
fn form_error(e: MultipartError, max_image_bytes: usize) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        tracing::debug!("request body over the limit: {}", e);
        ApiError::Acquire(AcquireError::TooLarge {
            limit: max_image_bytes,
        })
    } else {
        ApiError::Form(e)
    }
}

pub async fn read_caption_form(
    multipart: Multipart,
    max_image_bytes: usize,
) -> Result<CaptionForm, ApiError> {
    read_fields(multipart)
        .await
        .map_err(|e| form_error(e, max_image_bytes))
}

async fn read_fields(mut multipart: Multipart) -> Result<CaptionForm, MultipartError> {
    let mut form = CaptionForm::default();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await?;
                form.candidates.upload = Some((file_name, bytes));
            }
            "url" => form.candidates.url = Some(field.text().await?),
            "sample" => form.candidates.sample = Some(field.text().await?),
            "random" => form.candidates.random = is_checked(&field.text().await?),
            "prompt" => {
                let prompt = field.text().await?;
                form.prompt = Some(prompt.trim().to_string()).filter(|v| !v.is_empty());
            }
            _ => tracing::debug!("ignoring form field {:?}", name),
        }
    }

    Ok(form)
}
