use super::{
    form::{read_caption_form, CaptionForm},
    page::{preview_data_uri, render_page, PageOutcome},
};
use crate::{ctx::Ctx, error::ApiError};
use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::Html,
    Json,
};
use image::RgbImage;
use image_source::ImageOrigin;
use serde::Serialize;
use std::{sync::Arc, time::Instant};

#[derive(Debug)]
pub struct CaptionResult {
    pub caption: String,
    pub origin: ImageOrigin,
    pub image: Arc<RgbImage>,
    pub processing_time_ms: u128,
}

#[derive(Debug, Serialize)]
pub struct CaptionResponse {
    pub caption: String,
    pub source: ImageOrigin,
    pub model: String,
    pub processing_time_ms: u128,
}

/// Acquire exactly one image and caption it. Nothing reaches the model when
/// acquisition fails.
#[tracing::instrument(skip_all)]
pub async fn run_caption(ctx: &Ctx, form: CaptionForm) -> Result<CaptionResult, ApiError> {
    let start = Instant::now();

    let source = form.candidates.resolve().ok_or(ApiError::NoImage)?;
    let acquired = ctx.acquirer().acquire(source).await?;
    let image = Arc::new(acquired.image);

    let caption = ctx
        .ai_handler()
        .caption(image.clone(), form.prompt)
        .await
        .map_err(ApiError::Caption)?;

    let processing_time_ms = start.elapsed().as_millis();
    tracing::info!(
        "caption for {} in {} ms: {}",
        acquired.origin,
        processing_time_ms,
        caption
    );

    Ok(CaptionResult {
        caption,
        origin: acquired.origin,
        image,
        processing_time_ms,
    })
}

pub async fn caption_api(
    State(ctx): State<Ctx>,
    multipart: Multipart,
) -> Result<Json<CaptionResponse>, ApiError> {
    let form = read_caption_form(multipart, ctx.config().max_image_bytes).await?;
    let result = run_caption(&ctx, form).await?;

    Ok(Json(CaptionResponse {
        caption: result.caption,
        source: result.origin,
        model: ctx.ai_handler().model_info().title.clone(),
        processing_time_ms: result.processing_time_ms,
    }))
}

pub async fn caption_page(State(ctx): State<Ctx>, multipart: Multipart) -> (StatusCode, Html<String>) {
    let result = match read_caption_form(multipart, ctx.config().max_image_bytes).await {
        Ok(form) => run_caption(&ctx, form).await,
        Err(e) => Err(e),
    };

    let gallery = ctx.acquirer().gallery();
    let model_title = &ctx.ai_handler().model_info().title;

    match result {
        Ok(result) => {
            let preview = match preview_data_uri(&result.image) {
                Ok(preview) => Some(preview),
                Err(e) => {
                    tracing::warn!("failed to render preview: {}", e);
                    None
                }
            };
            let page = render_page(
                gallery,
                model_title,
                Some(PageOutcome::Caption {
                    result: &result,
                    preview,
                }),
            );
            (StatusCode::OK, Html(page))
        }
        Err(e) => {
            e.log();
            let page = render_page(
                gallery,
                model_title,
                Some(PageOutcome::Warning(e.user_message())),
            );
            (e.status(), Html(page))
        }
    }
}
