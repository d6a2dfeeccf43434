//! Selectors and low-level page actions against the target site.
//!
//! The exact DOM affordances of the target application are a collaborator
//! concern (per the component design notes): this module is the single
//! place that would need updating if the site's markup changes. Every
//! other engine module talks to the site only through these functions.

use anyhow::{Context, Result, anyhow};
use chromiumoxide::Page;
use std::time::Duration;

pub const LOGIN_USERNAME_SELECTOR: &str = "input[name='username']";
pub const LOGIN_PASSWORD_SELECTOR: &str = "input[name='password']";
pub const LOGIN_SUBMIT_SELECTOR: &str = "button[type='submit']";
pub const LICENSE_ACCEPT_SELECTOR: &str = "button#accept-license";
pub const INVENTORY_FILTER_INPUT_SELECTOR: &str = "input[data-role='reference-filter']";
pub const INVENTORY_CLEAR_FILTER_SELECTOR: &str = "button[data-role='clear-filters']";
pub const INVENTORY_EXPORT_CSV_SELECTOR: &str = "button[data-role='export-csv']";
pub const INVENTORY_ROW_OPEN_SELECTOR: &str = "tr[data-role='inventory-row'] a.open-detail";
pub const CREATE_PDF_BUTTON_SELECTOR: &str = "button[data-role='create-pdf']";

/// URL fragment that identifies the PDF-generation popup among the
/// context's open pages.
pub const PDF_POPUP_URL_MARKER: &str = "/pdf";

async fn click(page: &Page, selector: &str) -> Result<()> {
    page.find_element(selector)
        .await
        .with_context(|| format!("locating element {selector}"))?
        .click()
        .await
        .with_context(|| format!("clicking element {selector}"))?;
    Ok(())
}

async fn type_into(page: &Page, selector: &str, text: &str) -> Result<()> {
    page.find_element(selector)
        .await
        .with_context(|| format!("locating element {selector}"))?
        .click()
        .await
        .with_context(|| format!("focusing element {selector}"))?
        .type_str(text)
        .await
        .with_context(|| format!("typing into element {selector}"))?;
    Ok(())
}

/// Submit the login form. Returns once navigation away from the login
/// page completes.
pub async fn login(page: &Page, username: &str, password: &str) -> Result<()> {
    type_into(page, LOGIN_USERNAME_SELECTOR, username).await?;
    type_into(page, LOGIN_PASSWORD_SELECTOR, password).await?;
    click(page, LOGIN_SUBMIT_SELECTOR).await?;
    page.wait_for_navigation()
        .await
        .context("waiting for navigation after login submit")?;
    Ok(())
}

/// Dismiss the license-acceptance interstitial if one is present. Absence
/// of the button is not an error — not every session sees it.
pub async fn accept_license_if_present(page: &Page) -> Result<()> {
    if page
        .find_element(LICENSE_ACCEPT_SELECTOR)
        .await
        .is_ok()
    {
        click(page, LICENSE_ACCEPT_SELECTOR).await?;
        page.wait_for_navigation().await.ok();
    }
    Ok(())
}

/// Navigate to the inventory grid and clear any persisted filters.
pub async fn open_inventory(page: &Page, inventory_url: &str) -> Result<()> {
    page.goto(inventory_url)
        .await
        .context("navigating to inventory view")?;
    page.wait_for_navigation()
        .await
        .context("waiting for inventory view to load")?;
    if page
        .find_element(INVENTORY_CLEAR_FILTER_SELECTOR)
        .await
        .is_ok()
    {
        click(page, INVENTORY_CLEAR_FILTER_SELECTOR).await?;
    }
    Ok(())
}

/// Trigger the inventory export action and return once it has produced a
/// download. The caller is responsible for locating the downloaded file.
pub async fn trigger_inventory_export(page: &Page) -> Result<()> {
    click(page, INVENTORY_EXPORT_CSV_SELECTOR).await
}

/// Filter the inventory grid down to the single row matching `reference`
/// and open its detail view.
pub async fn filter_and_open_detail(page: &Page, reference: &str) -> Result<()> {
    type_into(page, INVENTORY_FILTER_INPUT_SELECTOR, reference).await?;
    page.find_element(INVENTORY_FILTER_INPUT_SELECTOR)
        .await?
        .press_key("Enter")
        .await
        .context("submitting reference filter")?;

    click(page, INVENTORY_ROW_OPEN_SELECTOR).await?;
    page.wait_for_navigation()
        .await
        .context("waiting for detail view to load")?;
    Ok(())
}

/// Click the Create-PDF control. Does not wait for the popup — that is
/// the caller's job, inside the PDF critical section.
pub async fn click_create_pdf(page: &Page) -> Result<()> {
    click(page, CREATE_PDF_BUTTON_SELECTOR).await
}

/// Poll the context's pages for one not present in `known_urls` whose URL
/// matches the PDF-generation path, up to `timeout`.
pub async fn wait_for_pdf_popup(
    browser: &chromiumoxide::Browser,
    known_targets: &[String],
    timeout: Duration,
) -> Result<Page> {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        let pages = browser.pages().await.context("listing browser pages")?;
        for page in pages {
            let target_id = page.target_id().to_string();
            if known_targets.contains(&target_id) {
                continue;
            }
            let url = page.url().await.unwrap_or_default().unwrap_or_default();
            if url.contains(PDF_POPUP_URL_MARKER) {
                return Ok(page);
            }
        }
        if tokio::time::Instant::now() >= deadline {
            return Err(anyhow!("timed out waiting for PDF popup to open"));
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}

/// All target IDs currently open in the context, used to distinguish a
/// worker's own popup from pre-existing pages.
pub async fn known_target_ids(browser: &chromiumoxide::Browser) -> Result<Vec<String>> {
    let pages = browser.pages().await.context("listing browser pages")?;
    let ids = pages.iter().map(|page| page.target_id().to_string()).collect();
    Ok(ids)
}

/// Close any page in the context whose URL matches the PDF-generation
/// path. Used both to close the worker's own popup and, during
/// quiescence verification, to sweep up any stray popup left open.
pub async fn close_stray_pdf_popups(browser: &chromiumoxide::Browser) -> Result<usize> {
    let mut closed = 0;
    for page in browser.pages().await.context("listing browser pages")? {
        let url = page.url().await.unwrap_or_default().unwrap_or_default();
        if url.contains(PDF_POPUP_URL_MARKER) {
            page.close().await.context("closing stray PDF popup")?;
            closed += 1;
        }
    }
    Ok(closed)
}

/// Detect whether the page landed on the login URL mid-procedure,
/// indicating the session was lost. Compares scheme, host and path only,
/// since the site commonly appends a `?returnUrl=...` query string when
/// redirecting an expired session back to login.
pub fn looks_like_login_page(current_url: &str, login_url: &str) -> bool {
    let normalize = |raw: &str| -> Option<(String, Option<String>, String)> {
        let parsed = url::Url::parse(raw).ok()?;
        Some((
            parsed.scheme().to_string(),
            parsed.host_str().map(str::to_string),
            parsed.path().trim_end_matches('/').to_string(),
        ))
    };

    match (normalize(current_url), normalize(login_url)) {
        (Some(a), Some(b)) => a == b,
        _ => current_url.trim_end_matches('/') == login_url.trim_end_matches('/'),
    }
}

#[cfg(test)]
mod url_tests {
    use super::looks_like_login_page;

    #[test]
    fn matches_login_url_with_a_return_query_string() {
        assert!(looks_like_login_page(
            "https://site.example/login?returnUrl=%2Finventory%2F123",
            "https://site.example/login",
        ));
    }

    #[test]
    fn does_not_match_a_different_path() {
        assert!(!looks_like_login_page(
            "https://site.example/inventory",
            "https://site.example/login",
        ));
    }

    #[test]
    fn falls_back_to_string_comparison_on_unparsable_urls() {
        assert!(looks_like_login_page("/login", "/login"));
    }
}
