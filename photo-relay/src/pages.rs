//! Server-rendered HTML pages

use std::fmt::Write as _;

use chrono::{DateTime, Utc};

use crate::image::GeneratedImage;
use crate::routes::upload::IMAGE_FIELD;

const STYLE: &str = "body{font-family:system-ui,sans-serif;max-width:40rem;margin:2rem auto;padding:0 1rem;color:#222}\
img{max-width:100%;border-radius:.5rem}\
.button{display:inline-block;margin:.5rem .5rem 0 0;padding:.5rem 1rem;border-radius:.25rem;background:#2563eb;color:#fff;text-decoration:none}\
.error{color:#b91c1c}";

/// Upload form posting to `/process`
#[must_use]
pub fn upload_form(max_upload_bytes: usize) -> String {
    let max_mib = max_upload_bytes / (1024 * 1024);
    layout(
        "Enhance your photo",
        &format!(
            r#"<form action="/process" method="post" enctype="multipart/form-data">
<p><input type="file" name="{IMAGE_FIELD}" accept="image/*" required></p>
<p><small>Up to {max_mib} MiB.</small></p>
<p><button class="button" type="submit">Enhance</button></p>
</form>"#
        ),
    )
}

/// Result page with an inline preview and a one-time download link
#[must_use]
pub fn result_page(
    image: &GeneratedImage,
    download_name: &str,
    expires_at: Option<DateTime<Utc>>,
) -> String {
    let name = escape(download_name);
    let mut body = format!(
        r#"<img src="{}" alt="Enhanced photo">
<p><a class="button" href="/download/{name}" download="{name}">Download</a><a class="button" href="/">Enhance another</a></p>"#,
        image.to_data_url()
    );

    if let Some(expires_at) = expires_at {
        let _ = write!(
            body,
            "\n<p><small>The download link works once and expires at {} UTC.</small></p>",
            expires_at.format("%H:%M")
        );
    }

    layout("Your enhanced photo", &body)
}

/// Generic failure page; `message` is shown as text
#[must_use]
pub fn failure_page(message: &str) -> String {
    layout(
        "Something went wrong",
        &format!(
            r#"<p class="error">{}</p>
<p><a class="button" href="/">Try again</a></p>"#,
            escape(message)
        ),
    )
}

fn layout(title: &str, body: &str) -> String {
    let title = escape(title);
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title}</title>
<style>{STYLE}</style>
</head>
<body>
<h1>{title}</h1>
{body}
</body>
</html>
"#
    )
}

/// Escapes text for HTML element content and quoted attributes
fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_upload_form_posts_image_field() {
        let html = upload_form(15 * 1024 * 1024);
        assert!(html.contains(r#"action="/process""#));
        assert!(html.contains(r#"enctype="multipart/form-data""#));
        assert!(html.contains(r#"name="image""#));
        assert!(html.contains("Up to 15 MiB"));
    }

    #[test]
    fn test_result_page_embeds_preview_and_link() {
        let image = GeneratedImage::new(vec![1, 2, 3], "image/png");
        let expires_at = Utc.with_ymd_and_hms(2024, 5, 1, 17, 45, 0).single();

        let html = result_page(&image, "hd-result-abc.png", expires_at);

        assert!(html.contains(r#"src="data:image/png;base64,AQID""#));
        assert!(html.contains(r#"href="/download/hd-result-abc.png""#));
        assert!(html.contains("expires at 17:45 UTC"));
    }

    #[test]
    fn test_failure_page_escapes_message() {
        let html = failure_page("<script>alert(1)</script>");
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }
}
