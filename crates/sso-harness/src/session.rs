//! Session state verification and logout
//!
//! Authentication state is inferred, not queried: a page counts as logged
//! out when a login form is detectable or the browser sits on the identity
//! provider's own host. That conflates "mid-login-flow" with "logged out",
//! which is fine for this suite's assertions but makes these heuristics
//! unsuitable as a general-purpose authentication check.
//!
//! Logout is a fallback ladder: UI menu first, conventional endpoints on the
//! current origin second, a forced IdP-level logout last. Each rung swallows
//! its own navigation/interaction errors and falls through; overall success
//! is the disjunction across rungs.

use std::time::Duration;

use chromiumoxide::browser::Browser;
use chromiumoxide::Page;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::SuiteConfig;
use crate::error::Result;
use crate::locator::{any_visible, current_url, locate};
use crate::selectors::candidates;

const MENU_TIMEOUT: Duration = Duration::from_millis(1500);
const LOGOUT_ITEM_TIMEOUT: Duration = Duration::from_secs(5);

/// Conventional logout paths probed on the application's own origin.
const LOGOUT_PATHS: [&str; 4] = ["/logout", "/auth/logout", "/api/logout", "/user/logout"];

/// Whether the page currently shows a login form (any probe candidate
/// present and visible).
pub async fn has_login_form(page: &Page) -> bool {
    any_visible(page, &candidates::login_form_probes()).await
}

/// Best-effort authentication check: false when a login form is detectable
/// or the current host is the IdP's own.
pub async fn is_authenticated(page: &Page, config: &SuiteConfig) -> bool {
    if has_login_form(page).await {
        return false;
    }
    if let Ok(idp_host) = config.idp_host() {
        if let Ok(url) = Url::parse(&current_url(page).await) {
            if let Some(host) = url.host_str() {
                if host.to_lowercase().contains(&idp_host) {
                    return false;
                }
            }
        }
    }
    true
}

/// Open the presumed account/user menu. True when a menu region (or at least
/// a logout-labelled control) became visible.
pub async fn open_user_menu(page: &Page) -> bool {
    let Some(button) = locate(page, &candidates::user_menu_button(), LOGOUT_ITEM_TIMEOUT).await
    else {
        return false;
    };
    button.click().await;
    if locate(page, &candidates::open_menu_region(), MENU_TIMEOUT).await.is_some() {
        return true;
    }
    any_visible(page, &candidates::logout_control()).await
}

/// Click a logout-labelled menu item, link or button if one is visible.
pub async fn click_logout_if_present(page: &Page) -> bool {
    let Some(control) = locate(page, &candidates::logout_control(), LOGOUT_ITEM_TIMEOUT).await
    else {
        return false;
    };
    control.click().await;
    let _ = page.wait_for_navigation().await;
    tokio::time::sleep(Duration::from_millis(800)).await;
    true
}

/// Walk the conventional logout endpoints on the page's current origin and
/// report whether any of them produced a login form.
pub async fn try_logout_endpoints(page: &Page) -> bool {
    let origin = match Url::parse(&current_url(page).await) {
        Ok(url) => url.origin().ascii_serialization(),
        Err(_) => return false,
    };
    for path in LOGOUT_PATHS {
        let target = format!("{origin}{path}");
        debug!(%target, "probing logout endpoint");
        if page.goto(target.as_str()).await.is_err() {
            continue;
        }
        let _ = page.wait_for_navigation().await;
        if has_login_form(page).await {
            return true;
        }
    }
    false
}

/// Derive the IdP logout endpoint from the authorize URL: rewrite the path
/// segment, keep the client identifier, attach the post-logout redirect, and
/// strip the authorization-specific parameters.
pub fn idp_logout_url(config: &SuiteConfig) -> Result<String> {
    let mut url = Url::parse(&config.routes.login)?;
    let logout_path = url.path().replace(
        "/protocol/openid-connect/auth",
        "/protocol/openid-connect/logout",
    );
    url.set_path(&logout_path);

    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| {
            !matches!(
                k.as_ref(),
                "response_type" | "code_challenge" | "code_challenge_method" | "prompt"
            )
        })
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    let has_client_id = kept.iter().any(|(k, _)| k == "client_id");
    {
        let mut pairs = url.query_pairs_mut();
        pairs.clear();
        for (k, v) in &kept {
            pairs.append_pair(k, v);
        }
        if !has_client_id {
            pairs.append_pair("client_id", "app-selector");
        }
        pairs.append_pair("post_logout_redirect_uri", &config.routes.dashboard);
    }
    Ok(url.to_string())
}

/// Force a logout at the identity-provider level from a fresh page. True when
/// the browser ended up on the IdP host afterwards.
pub async fn force_idp_logout(browser: &Browser, config: &SuiteConfig) -> bool {
    let target = match idp_logout_url(config) {
        Ok(url) => url,
        Err(err) => {
            warn!("could not derive IdP logout URL: {err}");
            return false;
        }
    };
    let Ok(page) = browser.new_page("about:blank").await else {
        return false;
    };
    let landed_on_idp = async {
        page.goto(target.as_str()).await.ok()?;
        let _ = page.wait_for_navigation().await;
        tokio::time::sleep(Duration::from_millis(500)).await;
        let host = Url::parse(&current_url(&page).await).ok()?.host_str()?.to_lowercase();
        let idp = config.idp_host().ok()?;
        Some(host.contains(&idp))
    }
    .await
    .unwrap_or(false);
    let _ = page.close().await;
    landed_on_idp
}

/// The logout fallback ladder. Short-circuits on the first rung that
/// succeeds; the contract is the disjunction of the rungs, not all of them.
pub async fn logout(browser: &Browser, page: &Page, config: &SuiteConfig) -> bool {
    if open_user_menu(page).await && click_logout_if_present(page).await {
        info!("logged out via UI menu");
        return true;
    }
    if try_logout_endpoints(page).await {
        info!("logged out via conventional endpoint");
        return true;
    }
    if force_idp_logout(browser, config).await {
        info!("logged out via forced IdP logout");
        return true;
    }
    false
}

/// Re-derive the page's authentication state after a logout: cache-busted
/// reload, short settle, then the usual heuristic. True means logged out.
pub async fn verify_logged_out(page: &Page, config: &SuiteConfig) -> bool {
    let busted = match Url::parse(&current_url(page).await) {
        Ok(mut url) => {
            url.query_pairs_mut()
                .append_pair("_", &chrono::Utc::now().timestamp_millis().to_string());
            url.to_string()
        }
        Err(_) => return false,
    };
    let _ = page.goto(busted.as_str()).await;
    let _ = page.wait_for_navigation().await;
    tokio::time::sleep(Duration::from_millis(1200)).await;
    !is_authenticated(page, config).await
}

/// Best-effort purge of client-side storage at `app_url`: localStorage,
/// sessionStorage, IndexedDB, cache storage. Hygiene between scenarios, not
/// a correctness-critical step, so every failure is swallowed.
pub async fn purge_app_state(browser: &Browser, app_url: &str) {
    let Ok(page) = browser.new_page("about:blank").await else {
        return;
    };
    let _ = page.goto(app_url).await;
    let _ = page.wait_for_navigation().await;
    let _ = page
        .evaluate(
            r#"(async () => {
                try { localStorage.clear(); } catch (e) {}
                try { sessionStorage.clear(); } catch (e) {}
                try {
                    const dbs = (await indexedDB.databases?.()) || [];
                    for (const db of dbs) {
                        if (db.name) indexedDB.deleteDatabase(db.name);
                    }
                } catch (e) {}
                try {
                    const names = await caches.keys();
                    for (const name of names) await caches.delete(name);
                } catch (e) {}
                return true;
            })()"#,
        )
        .await;
    let _ = page.close().await;
}

/// Dismiss any overlay dialog blocking the UI, up to `attempts` times.
pub async fn close_any_modal(page: &Page, attempts: usize) {
    for _ in 0..attempts {
        let Some(close) =
            locate(page, &candidates::modal_close_button(), Duration::from_millis(1000)).await
        else {
            break;
        };
        close.click().await;
        tokio::time::sleep(Duration::from_millis(200)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SuiteConfig;

    fn test_config() -> SuiteConfig {
        SuiteConfig::from_lookup(|name| match name {
            "AUTH_EMAIL" => Some("qa@example.com".into()),
            "AUTH_PASS" => Some("secret".into()),
            _ => None,
        })
        .unwrap()
    }

    #[test]
    fn logout_url_rewrites_path_segment() {
        let url = idp_logout_url(&test_config()).unwrap();
        assert!(url.contains("/protocol/openid-connect/logout"));
        assert!(!url.contains("/protocol/openid-connect/auth?"));
    }

    #[test]
    fn logout_url_strips_authorize_params() {
        let url = idp_logout_url(&test_config()).unwrap();
        for gone in ["response_type", "code_challenge_method", "prompt"] {
            assert!(!url.contains(gone), "{gone} should be stripped: {url}");
        }
        assert!(url.contains("client_id=app-selector"));
        assert!(url.contains("post_logout_redirect_uri="));
    }

    #[test]
    fn logout_url_keeps_existing_client_id() {
        let cfg = SuiteConfig::from_lookup(|name| match name {
            "AUTH_EMAIL" => Some("qa@example.com".into()),
            "AUTH_PASS" => Some("secret".into()),
            "ID_LOGIN_URL" => Some(
                "https://idp.example.org/protocol/openid-connect/auth?client_id=portal&response_type=code"
                    .into(),
            ),
            _ => None,
        })
        .unwrap();
        let url = idp_logout_url(&cfg).unwrap();
        assert!(url.contains("client_id=portal"));
        assert!(!url.contains("client_id=app-selector"));
    }
}
