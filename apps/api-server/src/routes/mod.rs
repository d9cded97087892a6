mod caption;
mod form;
mod page;

pub use caption::{CaptionResponse, CaptionResult};

use crate::ctx::Ctx;
use axum::{
    extract::{DefaultBodyLimit, State},
    response::Html,
    routing::{get, post},
    Json, Router,
};
use image_source::SampleImage;

/// room for the non-file fields and multipart framing
const FORM_OVERHEAD_BYTES: usize = 64 * 1024;

async fn index(State(ctx): State<Ctx>) -> Html<String> {
    Html(page::render_page(
        ctx.acquirer().gallery(),
        &ctx.ai_handler().model_info().title,
        None,
    ))
}

async fn samples(State(ctx): State<Ctx>) -> Json<Vec<SampleImage>> {
    Json(ctx.acquirer().gallery().samples().to_vec())
}

pub fn get_routes(ctx: Ctx) -> Router {
    let body_limit = ctx.config().max_image_bytes + FORM_OVERHEAD_BYTES;

    Router::new()
        .route("/", get(index))
        .route("/caption", post(caption::caption_page))
        .route("/api/caption", post(caption::caption_api))
        .route("/api/samples", get(samples))
        .route("/version", get(|| async { env!("CARGO_PKG_VERSION") }))
        .route("/health", get(|| async { "ok" }))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(ctx)
}
