//! Locator semantics against synthetic pages
//!
//! These tests need Chrome but no live identity provider: every page is a
//! `data:` URL crafted to pin down the candidate-ordering and visibility
//! contract.
//!
//! Run with: cargo test -p sso-harness --test locator_probe

#[path = "common/browser.rs"]
mod browser;

use std::time::Duration;

use sso_harness::locator::{locate, Candidate};
use sso_harness::selectors::candidates;

const TIMEOUT: Duration = Duration::from_secs(3);
const SHORT: Duration = Duration::from_millis(500);

fn data_url(body: &str) -> String {
    format!("data:text/html,<html><body>{body}</body></html>")
}

#[tokio::test]
async fn earliest_listed_candidate_wins() {
    skip_if_no_chrome!();
    let Some((browser, _handle)) = browser::require_browser().await else {
        return;
    };
    let page = browser.new_page("about:blank").await.expect("page");
    page.goto(data_url(r#"<button id='a'>Alpha</button><button id='b'>Beta</button>"#).as_str())
        .await
        .expect("navigate");

    // Both candidates qualify; the earlier one must win.
    let hit = locate(&page, &[Candidate::Css("#b"), Candidate::Css("#a")], TIMEOUT)
        .await
        .expect("should locate");
    assert_eq!(hit.candidate_index, 0);

    // A non-matching leading candidate falls through to the next.
    let hit = locate(
        &page,
        &[Candidate::Css("#missing"), Candidate::Css("#a"), Candidate::Css("#b")],
        TIMEOUT,
    )
    .await
    .expect("should locate");
    assert_eq!(hit.candidate_index, 1);
}

#[tokio::test]
async fn hidden_elements_do_not_match() {
    skip_if_no_chrome!();
    let Some((browser, _handle)) = browser::require_browser().await else {
        return;
    };
    let page = browser.new_page("about:blank").await.expect("page");
    page.goto(
        data_url(
            r#"<button id='a' style='display:none'>Alpha</button><button id='b'>Beta</button>"#,
        )
        .as_str(),
    )
    .await
    .expect("navigate");

    let hit = locate(&page, &[Candidate::Css("#a"), Candidate::Css("#b")], SHORT)
        .await
        .expect("should locate");
    assert_eq!(hit.candidate_index, 1, "hidden earlier candidate must not win");
}

#[tokio::test]
async fn candidate_checks_its_first_match_only() {
    skip_if_no_chrome!();
    let Some((browser, _handle)) = browser::require_browser().await else {
        return;
    };
    let page = browser.new_page("about:blank").await.expect("page");
    // The selector's first match is hidden; a later sibling being visible
    // does not rescue the candidate.
    page.goto(
        data_url(r#"<button style='display:none'>One</button><button>Two</button>"#).as_str(),
    )
    .await
    .expect("navigate");

    let hit = locate(&page, &[Candidate::Css("button")], SHORT).await;
    assert!(hit.is_none());
}

#[tokio::test]
async fn absence_is_none_not_an_error() {
    skip_if_no_chrome!();
    let Some((browser, _handle)) = browser::require_browser().await else {
        return;
    };
    let page = browser.new_page("about:blank").await.expect("page");
    page.goto(data_url("<p>nothing here</p>").as_str()).await.expect("navigate");

    let hit = locate(&page, &[Candidate::Css("#nope"), Candidate::Label("email")], SHORT).await;
    assert!(hit.is_none());
}

#[tokio::test]
async fn label_candidate_finds_associated_control() {
    skip_if_no_chrome!();
    let Some((browser, _handle)) = browser::require_browser().await else {
        return;
    };
    let page = browser.new_page("about:blank").await.expect("page");
    page.goto(
        data_url(r#"<label for='em'>Email address</label><input id='em' type='text'>"#).as_str(),
    )
    .await
    .expect("navigate");

    let field = locate(&page, &candidates::identifier_field(), TIMEOUT)
        .await
        .expect("label candidate should match");
    assert!(field.fill("qa@example.com").await);

    let value: String = page
        .evaluate("document.getElementById('em').value")
        .await
        .expect("evaluate")
        .into_value()
        .expect("string");
    assert_eq!(value, "qa@example.com");
}

#[tokio::test]
async fn role_candidate_clicks_by_accessible_name() {
    skip_if_no_chrome!();
    let Some((browser, _handle)) = browser::require_browser().await else {
        return;
    };
    let page = browser.new_page("about:blank").await.expect("page");
    page.goto(
        data_url(
            r#"<button onclick="document.title='decoy'">Cancel</button>
               <button onclick="document.title='clicked'">Sign In</button>"#,
        )
        .as_str(),
    )
    .await
    .expect("navigate");

    let submit = locate(&page, &candidates::submit_button(), TIMEOUT)
        .await
        .expect("role candidate should match");
    assert!(submit.click().await);

    let title: String = page
        .evaluate("document.title")
        .await
        .expect("evaluate")
        .into_value()
        .expect("string");
    assert_eq!(title, "clicked");
}

#[tokio::test]
async fn placeholder_candidate_matches_inputs() {
    skip_if_no_chrome!();
    let Some((browser, _handle)) = browser::require_browser().await else {
        return;
    };
    let page = browser.new_page("about:blank").await.expect("page");
    page.goto(data_url(r#"<input type='text' placeholder='Your username'>"#).as_str())
        .await
        .expect("navigate");

    let hit = locate(&page, &[Candidate::Placeholder("email|username")], TIMEOUT).await;
    assert!(hit.is_some());
}

#[tokio::test]
async fn late_rendered_element_is_caught_by_polling() {
    skip_if_no_chrome!();
    let Some((browser, _handle)) = browser::require_browser().await else {
        return;
    };
    let page = browser.new_page("about:blank").await.expect("page");
    // The button appears 600ms after load, well within the locate deadline
    // but after several sweeps.
    page.goto(
        data_url(
            r#"<script>
                 setTimeout(() => {
                   const b = document.createElement('button');
                   b.textContent = 'Continue';
                   document.body.appendChild(b);
                 }, 600);
               </script>"#,
        )
        .as_str(),
    )
    .await
    .expect("navigate");

    let hit = locate(&page, &candidates::submit_button(), TIMEOUT).await;
    assert!(hit.is_some(), "polling should pick up late-rendered elements");
}

#[tokio::test]
async fn located_handle_survives_rerender() {
    skip_if_no_chrome!();
    let Some((browser, _handle)) = browser::require_browser().await else {
        return;
    };
    let page = browser.new_page("about:blank").await.expect("page");
    page.goto(data_url(r#"<div id='root'><button>Sign In</button></div>"#).as_str())
        .await
        .expect("navigate");

    let submit = locate(&page, &candidates::submit_button(), TIMEOUT)
        .await
        .expect("should locate");

    // Replace the node entirely; the handle re-resolves instead of holding a
    // stale reference.
    page.evaluate(
        r#"document.getElementById('root').innerHTML =
            "<button onclick=\"document.title='fresh'\">Sign In</button>""#,
    )
    .await
    .expect("rerender");

    assert!(submit.is_visible().await);
    assert!(submit.click().await);
    let title: String = page
        .evaluate("document.title")
        .await
        .expect("evaluate")
        .into_value()
        .expect("string");
    assert_eq!(title, "fresh");
}
