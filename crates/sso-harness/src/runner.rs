//! Suite execution orchestration
//!
//! One headless browser, one browsing session, scenarios driven strictly
//! sequentially. The suite runs against a live, shared identity provider,
//! and parallel logins would race the very state (lockout counters, session
//! cookies) the scenarios assert on. Between scenarios the session is reset
//! with a forced IdP logout and a client-side storage purge so state never
//! leaks from one scenario into the next.
//!
//! Retries are whole-scenario re-executions configured at the run level;
//! the helpers themselves only ever poll within their own deadlines.
//! Configuration-class errors are never retried.

use anyhow::{bail, ensure, Context, Result};
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::Page;
use futures::StreamExt;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

use crate::config::SuiteConfig;
use crate::error::HarnessError;
use crate::inspect;
use crate::locator::{self, any_visible};
use crate::login::LoginFlow;
use crate::reset::ResetFlow;
use crate::selectors::{self, candidates};
use crate::session;

const WRONG_PASSWORD: &str = "Wrong!123";
const UNKNOWN_ACCOUNT: &str = "qa.unknown@example.com";

/// Built-in scenarios, mirroring the manual suite this harness replaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioId {
    TwoStepLogin,
    EmailNormalization,
    Lockout,
    ResetRequest,
    CrossAppLogout,
    CookieFlags,
    SecurityHeaders,
    ErrorRegion,
}

/// A registered scenario: identity, human title, and grep-able tags.
#[derive(Debug, Clone)]
pub struct ScenarioDef {
    pub id: ScenarioId,
    pub name: &'static str,
    pub tags: &'static [&'static str],
    /// Focus flag: when any scenario is focused, only focused scenarios run.
    /// Rejected outright in CI mode.
    pub only: bool,
}

impl ScenarioDef {
    /// Match the filter against the title and tags, the way a test-runner
    /// grep matches "title @tag1 @tag2".
    pub fn matches(&self, filter: &Regex) -> bool {
        if filter.is_match(self.name) {
            return true;
        }
        self.tags.iter().any(|t| filter.is_match(&format!("@{t}")))
    }
}

/// The full scenario registry, in execution order.
pub fn scenarios() -> Vec<ScenarioDef> {
    vec![
        ScenarioDef {
            id: ScenarioId::TwoStepLogin,
            name: "2-step login works",
            tags: &["smoke", "p0"],
            only: false,
        },
        ScenarioDef {
            id: ScenarioId::EmailNormalization,
            name: "Email trimming & case normalization",
            tags: &["p1"],
            only: false,
        },
        ScenarioDef {
            id: ScenarioId::Lockout,
            name: "After N wrong attempts show generic or lockout (no enumeration)",
            tags: &["p0"],
            only: false,
        },
        ScenarioDef {
            id: ScenarioId::ResetRequest,
            name: "Reset request is generic",
            tags: &["p0"],
            only: false,
        },
        ScenarioDef {
            id: ScenarioId::CrossAppLogout,
            name: "Login once, visit every app, log out everywhere",
            tags: &["smoke", "p0"],
            only: false,
        },
        ScenarioDef {
            id: ScenarioId::CookieFlags,
            name: "Cookie flags & domain",
            tags: &["security"],
            only: false,
        },
        ScenarioDef {
            id: ScenarioId::SecurityHeaders,
            name: "OIDC authorize has safe cache policy",
            tags: &["security"],
            only: false,
        },
        ScenarioDef {
            id: ScenarioId::ErrorRegion,
            name: "Errors announced to screen readers after invalid login",
            tags: &["a11y"],
            only: false,
        },
    ]
}

/// Run-level execution plan: title/tag filter, retry budget, CI rules.
#[derive(Debug, Clone, Default)]
pub struct RunPlan {
    pub filter: Option<Regex>,
    pub retries: u32,
    pub ci: bool,
}

impl RunPlan {
    /// Select the scenarios this plan will execute. Focused scenarios narrow
    /// the set, and are rejected in CI mode so a forgotten focus cannot
    /// silently skip coverage.
    pub fn select(&self, registry: &[ScenarioDef]) -> Result<Vec<ScenarioDef>> {
        let any_focused = registry.iter().any(|d| d.only);
        if any_focused && self.ci {
            bail!("focused (only) scenarios are not allowed in CI mode");
        }
        let mut selected: Vec<ScenarioDef> = registry
            .iter()
            .filter(|d| !any_focused || d.only)
            .cloned()
            .collect();
        if let Some(filter) = &self.filter {
            selected.retain(|d| d.matches(filter));
        }
        Ok(selected)
    }
}

/// Outcome of one scenario, after retries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioOutcome {
    pub name: String,
    pub tags: Vec<String>,
    pub passed: bool,
    /// Attempts actually made (1 = passed first try or failed without retry).
    pub attempts: u32,
    pub duration_ms: u64,
    /// Which expected condition was not observed, when failing.
    pub failure: Option<String>,
}

/// Results from a complete suite run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteResults {
    pub suite_name: String,
    pub idp_host: String,
    pub started_at: String,
    pub total_duration_ms: u64,
    pub passed: bool,
    pub scenario_results: Vec<ScenarioOutcome>,
}

/// The suite runner: one browser for the whole run, handler drained on a
/// background task.
pub struct SuiteRunner {
    browser: Browser,
    config: SuiteConfig,
    _handle: tokio::task::JoinHandle<()>,
}

impl SuiteRunner {
    /// Launch a headless browser honoring the HTTPS tolerance flag.
    pub async fn launch(config: SuiteConfig) -> Result<Self> {
        let mut builder = BrowserConfig::builder();
        if config.ignore_https_errors {
            builder = builder.arg("--ignore-certificate-errors");
        }
        let browser_config = builder
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build browser config: {e}"))?;
        Self::with_browser_config(config, browser_config).await
    }

    /// Launch with a custom browser configuration (tests point this at a
    /// specific Chrome binary).
    pub async fn with_browser_config(
        config: SuiteConfig,
        browser_config: BrowserConfig,
    ) -> Result<Self> {
        info!("launching browser");
        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .context("failed to launch browser")?;
        let handle = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });
        Ok(Self {
            browser,
            config,
            _handle: handle,
        })
    }

    pub fn config(&self) -> &SuiteConfig {
        &self.config
    }

    pub fn browser(&self) -> &Browser {
        &self.browser
    }

    /// Execute the plan sequentially and collect per-scenario outcomes.
    #[instrument(skip(self, plan))]
    pub async fn run(&self, plan: &RunPlan) -> Result<SuiteResults> {
        let start = Instant::now();
        let started_at = chrono::Utc::now().to_rfc3339();
        let selected = plan.select(&scenarios())?;
        info!(count = selected.len(), "starting suite run");

        let mut outcomes = Vec::new();
        for def in &selected {
            info!(scenario = def.name, "running scenario");
            self.reset_session().await;
            outcomes.push(self.run_with_retries(def, plan).await);
        }

        let passed = outcomes.iter().all(|o| o.passed);
        Ok(SuiteResults {
            suite_name: "SSO identity suite".to_string(),
            idp_host: self.config.idp_host().unwrap_or_default(),
            started_at,
            total_duration_ms: start.elapsed().as_millis() as u64,
            passed,
            scenario_results: outcomes,
        })
    }

    /// Whole-scenario retry loop. A configuration-class error stops retrying
    /// immediately; it signals the environment, not flakiness.
    async fn run_with_retries(&self, def: &ScenarioDef, plan: &RunPlan) -> ScenarioOutcome {
        let start = Instant::now();
        let max_attempts = plan.retries + 1;
        let mut attempts = 0;
        let mut failure = None;

        while attempts < max_attempts {
            attempts += 1;
            match self.execute(def.id).await {
                Ok(()) => {
                    failure = None;
                    break;
                }
                Err(err) => {
                    let config_class = err
                        .downcast_ref::<HarnessError>()
                        .map(HarnessError::is_config_error)
                        .unwrap_or(false);
                    warn!(scenario = def.name, attempt = attempts, "scenario failed: {err:#}");
                    failure = Some(format!("{err:#}"));
                    if config_class {
                        break;
                    }
                    if attempts < max_attempts {
                        self.reset_session().await;
                    }
                }
            }
        }

        ScenarioOutcome {
            name: def.name.to_string(),
            tags: def.tags.iter().map(|t| t.to_string()).collect(),
            passed: failure.is_none(),
            attempts,
            duration_ms: start.elapsed().as_millis() as u64,
            failure,
        }
    }

    /// Force the shared session back to logged-out and purge app storage so
    /// scenarios cannot observe each other's state.
    async fn reset_session(&self) {
        debug!("resetting session state");
        let _ = session::force_idp_logout(&self.browser, &self.config).await;
        for (_, url) in self.config.apps.all() {
            session::purge_app_state(&self.browser, url).await;
        }
    }

    async fn execute(&self, id: ScenarioId) -> Result<()> {
        match id {
            ScenarioId::TwoStepLogin => self.scenario_two_step_login().await,
            ScenarioId::EmailNormalization => self.scenario_email_normalization().await,
            ScenarioId::Lockout => self.scenario_lockout().await,
            ScenarioId::ResetRequest => self.scenario_reset_request().await,
            ScenarioId::CrossAppLogout => self.scenario_cross_app_logout().await,
            ScenarioId::CookieFlags => self.scenario_cookie_flags().await,
            ScenarioId::SecurityHeaders => self.scenario_security_headers().await,
            ScenarioId::ErrorRegion => self.scenario_error_region().await,
        }
    }

    async fn scratch_page(&self) -> Result<Page> {
        Ok(self.browser.new_page("about:blank").await?)
    }

    async fn login_and_verify(&self, page: &Page, email: &str, password: &str) -> Result<()> {
        let login = LoginFlow::new(page.clone());
        login.goto(&self.config).await?;
        login.sign_in(email, password).await?;
        let url = login.final_url().await;
        ensure!(
            !selectors::AUTHORIZE_PATH_RE.is_match(&url),
            "expected to leave the authorize endpoint after login, still at {url}"
        );
        Ok(())
    }

    async fn scenario_two_step_login(&self) -> Result<()> {
        let page = self.scratch_page().await?;
        let creds = self.config.credentials.clone();
        let result = self.login_and_verify(&page, &creds.email, &creds.password).await;
        let _ = page.close().await;
        result
    }

    async fn scenario_email_normalization(&self) -> Result<()> {
        let page = self.scratch_page().await?;
        let creds = self.config.credentials.clone();
        // Leading/trailing whitespace and altered case must be accepted
        // identically to the canonical value.
        let weird = format!("  {}  ", creds.email.to_uppercase());
        let result = self.login_and_verify(&page, &weird, &creds.password).await;
        let _ = page.close().await;
        result
    }

    async fn scenario_lockout(&self) -> Result<()> {
        let page = self.scratch_page().await?;
        let result = self.lockout_inner(&page).await;
        let _ = page.close().await;
        result
    }

    async fn lockout_inner(&self, page: &Page) -> Result<()> {
        let email = self.config.credentials.email.clone();
        let idp_host = self.config.idp_host()?;
        let login = LoginFlow::new(page.clone());

        for attempt in 1..=self.config.lockout_attempts {
            login.goto(&self.config).await?;
            login.sign_in(&email, WRONG_PASSWORD).await?;
            tokio::time::sleep(Duration::from_millis(1000)).await;

            let text = locator::page_text(page).await;
            let on_idp = locator::current_url(page).await.to_lowercase().contains(&idp_host);
            let still_on_login = any_visible(page, &candidates::password_field()).await;
            let generic = selectors::GENERIC_ERROR_RE.is_match(&text);
            let lockout = selectors::LOCKOUT_RE.is_match(&text);
            ensure!(
                generic || lockout || (on_idp && still_on_login),
                "after wrong attempt {attempt}, expected generic error, lockout message, or login form"
            );
        }

        // One more attempt past the threshold: lockout or generic only,
        // never anything that reveals the account exists.
        login.goto(&self.config).await?;
        login.sign_in(&email, WRONG_PASSWORD).await?;
        tokio::time::sleep(Duration::from_millis(1500)).await;
        let text = locator::page_text(page).await;
        ensure!(
            selectors::LOCKOUT_RE.is_match(&text) || selectors::GENERIC_ERROR_RE.is_match(&text),
            "expected lockout or generic error past the threshold, got neither"
        );
        ensure!(
            !selectors::ENUMERATION_RE.is_match(&text),
            "response reveals whether the account exists"
        );
        Ok(())
    }

    async fn scenario_reset_request(&self) -> Result<()> {
        let page = self.scratch_page().await?;
        let reset = ResetFlow::new(page.clone());
        let result = async {
            reset.goto_via_login(&self.config).await?;
            reset.request(UNKNOWN_ACCOUNT).await?;
            ensure!(
                reset.confirmation_is_generic().await,
                "reset response explicitly denies the account exists"
            );
            Ok(())
        }
        .await;
        let _ = page.close().await;
        result
    }

    async fn scenario_cross_app_logout(&self) -> Result<()> {
        let id_page = self.scratch_page().await?;
        let mut app_pages: Vec<Page> = Vec::new();
        let result = self.cross_app_logout_inner(&id_page, &mut app_pages).await;
        for page in app_pages {
            let _ = page.close().await;
        }
        let _ = id_page.close().await;
        result
    }

    /// Body of the cross-app scenario. Pages are registered in `app_pages`
    /// before first use so the caller can close them on any exit path; a
    /// failed run must not leave authenticated tabs behind in the shared
    /// browser, where retries would pile more on top.
    async fn cross_app_logout_inner(&self, id_page: &Page, app_pages: &mut Vec<Page>) -> Result<()> {
        let creds = self.config.credentials.clone();
        self.login_and_verify(id_page, &creds.email, &creds.password).await?;

        // One authenticated user visiting every app: independent pages under
        // the one browsing session.
        let targets = [
            join_path(&self.config.apps.sign, "home"),
            join_path(&self.config.apps.fax, "faxes/inbox"),
            self.config.apps.dial.clone(),
            self.config.apps.scan.clone(),
        ];
        for target in &targets {
            let page = self.scratch_page().await?;
            app_pages.push(page.clone());
            page.goto(target.as_str()).await?;
            let _ = page.wait_for_navigation().await;
            tokio::time::sleep(Duration::from_millis(1500)).await;
            session::close_any_modal(&page, 3).await;
            ensure!(
                session::is_authenticated(&page, &self.config).await,
                "expected SSO at {target} but saw a login form"
            );
        }

        let logged_out = session::logout(&self.browser, &app_pages[0], &self.config).await;
        ensure!(logged_out, "could not log out via UI, endpoint, or IdP");

        let mut still_authenticated = false;
        for page in app_pages.iter() {
            if !session::verify_logged_out(page, &self.config).await {
                still_authenticated = true;
            }
        }
        if still_authenticated {
            // One forced IdP retry before the final verdict.
            let _ = session::force_idp_logout(&self.browser, &self.config).await;
            for page in app_pages.iter() {
                ensure!(
                    session::verify_logged_out(page, &self.config).await,
                    "app still authenticated after logout at {}",
                    locator::current_url(page).await
                );
            }
        }
        Ok(())
    }

    async fn scenario_cookie_flags(&self) -> Result<()> {
        let page = self.scratch_page().await?;
        let result = self.cookie_flags_inner(&page).await;
        let _ = page.close().await;
        result
    }

    async fn cookie_flags_inner(&self, page: &Page) -> Result<()> {
        let creds = self.config.credentials.clone();
        self.login_and_verify(page, &creds.email, &creds.password).await?;

        let cookies = page.get_cookies().await?;
        if let Some(cookie) = inspect::find_session_cookie(&cookies) {
            ensure!(cookie.secure, "session cookie {} is not Secure", cookie.name);
            let root = self.config.expected_cookie_root()?;
            let domain = cookie.domain.trim_start_matches('.');
            ensure!(
                domain.to_lowercase().ends_with(&root),
                "session cookie {} has unexpected domain {}",
                cookie.name,
                cookie.domain
            );
        }

        let doc_cookie: String = page
            .evaluate("document.cookie || ''")
            .await?
            .into_value()
            .unwrap_or_default();
        ensure!(
            !selectors::TOKENISH_COOKIE_RE.is_match(&doc_cookie),
            "script-visible cookies leak token material"
        );
        Ok(())
    }

    async fn scenario_security_headers(&self) -> Result<()> {
        let client = reqwest::Client::builder()
            .danger_accept_invalid_certs(self.config.ignore_https_errors)
            .build()?;
        let response = client.get(&self.config.routes.login).send().await?;
        ensure!(
            response.status().as_u16() < 500,
            "authorize endpoint answered {}",
            response.status()
        );

        let header = |name: &str| {
            response
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_lowercase()
        };
        let cache_control = header("cache-control");
        let pragma = header("pragma");
        ensure!(
            inspect::cache_policy_is_safe(&cache_control)
                || pragma.contains("no-cache")
                || cache_control.contains("private"),
            "authorize endpoint is cacheable: cache-control={cache_control:?} pragma={pragma:?}"
        );

        let hsts = header("strict-transport-security");
        if !hsts.is_empty() {
            ensure!(inspect::hsts_present(&hsts), "malformed HSTS header: {hsts:?}");
        }
        Ok(())
    }

    async fn scenario_error_region(&self) -> Result<()> {
        let page = self.scratch_page().await?;
        let result = async {
            let login = LoginFlow::new(page.clone());
            login.goto(&self.config).await?;
            login.sign_in("not-a-real@example.com", WRONG_PASSWORD).await?;
            tokio::time::sleep(Duration::from_millis(1200)).await;
            let region =
                locator::locate(&page, &candidates::error_region(), Duration::from_secs(10)).await;
            ensure!(
                region.is_some(),
                "no accessible/visible error region found after invalid login"
            );
            Ok(())
        }
        .await;
        let _ = page.close().await;
        result
    }
}

fn join_path(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path)
}
