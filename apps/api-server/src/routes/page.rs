use super::caption::CaptionResult;
use base64::{engine::general_purpose, Engine as _};
use image::{DynamicImage, ImageFormat, RgbImage};
use image_source::SampleGallery;
use std::fmt::Write;
use std::io::Cursor;

const PREVIEW_SIZE: u32 = 768;

pub enum PageOutcome<'a> {
    Caption {
        result: &'a CaptionResult,
        preview: Option<String>,
    },
    Warning(String),
}

pub fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// JPEG data uri of the image, scaled down to fit the page.
pub fn preview_data_uri(image: &RgbImage) -> anyhow::Result<String> {
    let mut preview = DynamicImage::ImageRgb8(image.clone());
    if preview.width() > PREVIEW_SIZE || preview.height() > PREVIEW_SIZE {
        preview = preview.thumbnail(PREVIEW_SIZE, PREVIEW_SIZE);
    }

    let mut bytes = Vec::new();
    preview.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Jpeg)?;

    Ok(format!(
        "data:image/jpeg;base64,{}",
        general_purpose::STANDARD.encode(&bytes)
    ))
}

const STYLE: &str = r#"
body { font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, sans-serif; margin: 0; background: #f5f6f8; color: #1f2328; }
main { max-width: 960px; margin: 0 auto; padding: 24px; }
section { background: #fff; border-radius: 8px; padding: 16px 20px; margin-bottom: 16px; box-shadow: 0 1px 3px rgba(0,0,0,.08); }
label { display: block; margin: 8px 0 4px; font-weight: 600; }
input[type=text], input[type=url] { width: 100%; box-sizing: border-box; padding: 8px; }
button { margin-top: 12px; padding: 8px 16px; cursor: pointer; }
.gallery { display: flex; flex-wrap: wrap; gap: 12px; }
.gallery form { width: 160px; text-align: center; }
.gallery img { width: 160px; height: 120px; object-fit: cover; border-radius: 4px; }
.warning { background: #fff4e5; border-left: 4px solid #f0a020; }
.result img { max-width: 100%; border-radius: 4px; }
.caption { font-size: 1.3em; font-weight: 700; }
.muted { color: #667085; font-size: .9em; }
"#;

fn render_outcome(html: &mut String, outcome: &PageOutcome) -> std::fmt::Result {
    match outcome {
        PageOutcome::Warning(message) => {
            write!(
                html,
                r#"<section class="warning"><p>{}</p></section>"#,
                escape_html(message)
            )?;
        }
        PageOutcome::Caption { result, preview } => {
            html.push_str(r#"<section class="result">"#);
            if let Some(preview) = preview {
                write!(
                    html,
                    r#"<img src="{}" alt="{}">"#,
                    preview,
                    escape_html(&result.origin.to_string())
                )?;
            }
            write!(
                html,
                r#"<p class="muted">{}</p><p>Caption:</p><p class="caption">{}</p><p class="muted">{} ms</p></section>"#,
                escape_html(&result.origin.to_string()),
                escape_html(&result.caption),
                result.processing_time_ms
            )?;
        }
    }
    Ok(())
}

fn render_gallery(html: &mut String, gallery: &SampleGallery) -> std::fmt::Result {
    html.push_str(r#"<section><h2>Sample images</h2><div class="gallery">"#);
    for sample in gallery.samples() {
        write!(
            html,
            r#"<form method="post" action="/caption" enctype="multipart/form-data"><img src="{url}" alt="{title}" loading="lazy"><button type="submit" name="sample" value="{id}">{title}</button></form>"#,
            url = escape_html(&sample.url),
            title = escape_html(&sample.title),
            id = escape_html(&sample.id),
        )?;
    }
    html.push_str(
        r#"</div><form method="post" action="/caption" enctype="multipart/form-data"><button type="submit" name="random" value="1">Random sample</button></form></section>"#,
    );
    Ok(())
}

pub fn render_page(gallery: &SampleGallery, model_title: &str, outcome: Option<PageOutcome>) -> String {
    let mut html = String::new();
    // writing into a String never fails
    let _ = render_page_into(&mut html, gallery, model_title, outcome);
    html
}

fn render_page_into(
    html: &mut String,
    gallery: &SampleGallery,
    model_title: &str,
    outcome: Option<PageOutcome>,
) -> std::fmt::Result {
    write!(
        html,
        r#"<!DOCTYPE html><html lang="en"><head><meta charset="utf-8"><meta name="viewport" content="width=device-width, initial-scale=1"><title>Image Captioning</title><style>{}</style></head><body><main>"#,
        STYLE
    )?;
    write!(
        html,
        r#"<h1>Image Captioning</h1><p class="muted">Upload an image, paste an image URL or pick a sample to get a descriptive caption. Model: {}</p>"#,
        escape_html(model_title)
    )?;

    if let Some(outcome) = outcome.as_ref() {
        render_outcome(html, outcome)?;
    }

    html.push_str(
        r#"<section><form method="post" action="/caption" enctype="multipart/form-data">
<label for="file">Upload your image</label><input id="file" type="file" name="file" accept=".png,.jpg,.jpeg">
<label for="url">Or enter an image URL</label><input id="url" type="url" name="url" placeholder="https://example.com/photo.jpg">
<label for="prompt">Caption prefix (optional)</label><input id="prompt" type="text" name="prompt" placeholder="a photography of">
<button type="submit">Generate caption</button>
</form><p class="muted">When several sources are given, the uploaded file wins over the URL.</p></section>"#,
    );

    render_gallery(html, gallery)?;

    html.push_str("</main></body></html>");
    Ok(())
}
