//! Authenticated HTTP download of PDF bytes, reusing the browser
//! context's session cookies so the request is seen as the same
//! authenticated session as the page that opened the popup.

use anyhow::{Context, Result};
use chromiumoxide::Page;
use reqwest::cookie::Jar;
use std::sync::Arc;
use tracing::debug;

use crate::utils::constants::CHROME_USER_AGENT;

/// Build a `reqwest::Client` seeded with `page`'s current cookies for
/// `target_url`'s origin, so GET requests it issues carry the same
/// session identity as the browser.
pub async fn client_with_page_cookies(page: &Page, target_url: &str) -> Result<reqwest::Client> {
    let cookies = page
        .get_cookies()
        .await
        .context("reading cookies from browser page")?;

    let jar = Jar::default();
    let url: reqwest::Url = target_url.parse().context("parsing target URL")?;
    let cookie_count = cookies.len();

    for cookie in cookies {
        let cookie_str = format!("{}={}", cookie.name, cookie.value);
        jar.add_cookie_str(&cookie_str, &url);
    }

    debug!(cookie_count, "built HTTP client with browser session cookies");

    reqwest::Client::builder()
        .cookie_provider(Arc::new(jar))
        .user_agent(CHROME_USER_AGENT)
        .build()
        .context("building authenticated HTTP client")
}

/// Download the bytes at `pdf_url` using an HTTP client carrying the
/// browser's session cookies.
pub async fn download_pdf_bytes(client: &reqwest::Client, pdf_url: &str) -> Result<Vec<u8>> {
    let response = client
        .get(pdf_url)
        .send()
        .await
        .with_context(|| format!("requesting {pdf_url}"))?
        .error_for_status()
        .with_context(|| format!("non-success response from {pdf_url}"))?;

    let bytes = response
        .bytes()
        .await
        .with_context(|| format!("reading response body from {pdf_url}"))?;

    Ok(bytes.to_vec())
}

/// Write `bytes` to `path` via temp-file-then-rename, so a reader never
/// observes a partially-written PDF.
pub async fn write_pdf_atomic(path: &std::path::Path, bytes: &[u8]) -> Result<()> {
    use tokio::io::AsyncWriteExt;

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("creating directory {}", parent.display()))?;
    }

    let temp_path = path.with_extension("pdf.tmp");
    let mut file = tokio::fs::File::create(&temp_path)
        .await
        .with_context(|| format!("creating temp file {}", temp_path.display()))?;
    file.write_all(bytes)
        .await
        .with_context(|| format!("writing temp file {}", temp_path.display()))?;
    file.sync_all()
        .await
        .with_context(|| format!("syncing temp file {}", temp_path.display()))?;

    tokio::fs::rename(&temp_path, path)
        .await
        .with_context(|| format!("renaming {} to {}", temp_path.display(), path.display()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path as path_matcher};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn download_pdf_bytes_returns_the_response_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path_matcher("/pdf/REF-1"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"%PDF-1.4 content".to_vec()))
            .mount(&server)
            .await;

        let client = reqwest::Client::new();
        let bytes = download_pdf_bytes(&client, &format!("{}/pdf/REF-1", server.uri()))
            .await
            .unwrap();
        assert_eq!(bytes, b"%PDF-1.4 content");
    }

    #[tokio::test]
    async fn download_pdf_bytes_surfaces_non_success_status_as_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path_matcher("/pdf/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = reqwest::Client::new();
        let err = download_pdf_bytes(&client, &format!("{}/pdf/missing", server.uri()))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("non-success"));
    }

    #[tokio::test]
    async fn write_pdf_atomic_leaves_no_temp_file_behind() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("REF-1.pdf");
        write_pdf_atomic(&path, b"%PDF-1.4 fake").await.unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"%PDF-1.4 fake");
        assert!(!dir.path().join("REF-1.pdf.tmp").exists());
    }
}
