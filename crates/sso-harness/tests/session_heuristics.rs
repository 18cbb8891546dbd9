//! Session-state heuristics against synthetic pages
//!
//! Run with: cargo test -p sso-harness --test session_heuristics

#[path = "common/browser.rs"]
mod browser;

use sso_harness::config::SuiteConfig;
use sso_harness::session;

fn test_config() -> SuiteConfig {
    SuiteConfig::from_lookup(|name| match name {
        "AUTH_EMAIL" => Some("qa@example.com".into()),
        "AUTH_PASS" => Some("secret".into()),
        _ => None,
    })
    .expect("config")
}

fn data_url(body: &str) -> String {
    format!("data:text/html,<html><body>{body}</body></html>")
}

const LOGIN_FORM: &str = r#"
    <form>
      <label for='u'>Email</label><input id='u' type='email'>
      <label for='p'>Password</label><input id='p' type='password'>
      <button type='submit'>Sign In</button>
    </form>"#;

#[tokio::test]
async fn login_form_is_detected() {
    skip_if_no_chrome!();
    let Some((browser, _handle)) = browser::require_browser().await else {
        return;
    };
    let page = browser.new_page("about:blank").await.expect("page");
    page.goto(data_url(LOGIN_FORM).as_str()).await.expect("navigate");

    assert!(session::has_login_form(&page).await);
    assert!(!session::is_authenticated(&page, &test_config()).await);
}

#[tokio::test]
async fn content_page_counts_as_authenticated() {
    skip_if_no_chrome!();
    let Some((browser, _handle)) = browser::require_browser().await else {
        return;
    };
    let page = browser.new_page("about:blank").await.expect("page");
    page.goto(data_url("<h1>Dashboard</h1><p>Welcome back</p>").as_str())
        .await
        .expect("navigate");

    assert!(!session::has_login_form(&page).await);
    assert!(session::is_authenticated(&page, &test_config()).await);
}

#[tokio::test]
async fn hidden_login_form_is_not_detected() {
    skip_if_no_chrome!();
    let Some((browser, _handle)) = browser::require_browser().await else {
        return;
    };
    let page = browser.new_page("about:blank").await.expect("page");
    page.goto(data_url(&format!("<div style='display:none'>{LOGIN_FORM}</div>")).as_str())
        .await
        .expect("navigate");

    assert!(!session::has_login_form(&page).await);
}

#[tokio::test]
async fn modal_dismissal_clicks_close_controls() {
    skip_if_no_chrome!();
    let Some((browser, _handle)) = browser::require_browser().await else {
        return;
    };
    let page = browser.new_page("about:blank").await.expect("page");
    page.goto(
        data_url(
            r#"<div role='dialog' id='m'>
                 <p>Cookie consent</p>
                 <button aria-label='Close' onclick="document.getElementById('m').remove()">x</button>
               </div>"#,
        )
        .as_str(),
    )
    .await
    .expect("navigate");

    session::close_any_modal(&page, 3).await;

    let gone: bool = page
        .evaluate("document.getElementById('m') === null")
        .await
        .expect("evaluate")
        .into_value()
        .expect("bool");
    assert!(gone, "modal should have been dismissed");
}

#[tokio::test]
async fn purge_app_state_swallows_storage_failures() {
    skip_if_no_chrome!();
    let Some((browser, _handle)) = browser::require_browser().await else {
        return;
    };
    // data: origins reject storage access; the purge must shrug it off.
    session::purge_app_state(&browser, &data_url("<p>app</p>")).await;
}
