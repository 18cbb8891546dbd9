//! Password-reset request orchestration
//!
//! Finds and activates the "forgot password" affordance wherever the provider
//! puts it: directly on the first login screen, or only after an identifier
//! has been confirmed. Then submits a reset request and classifies the
//! aftermath against the anti-enumeration policy: the provider must never
//! reveal whether the account exists, so an ambiguous or silent response
//! passes and only an explicit "no such user" fails.

use std::time::Duration;

use chromiumoxide::Page;
use tracing::{debug, info};

use crate::config::SuiteConfig;
use crate::error::{HarnessError, Result};
use crate::locator::{locate, page_text};
use crate::login::LoginFlow;
use crate::selectors::{self, candidates};

const AFFORDANCE_TIMEOUT: Duration = Duration::from_secs(5);
const FIELD_TIMEOUT: Duration = Duration::from_secs(10);
/// Providers that gate the reset link behind identifier confirmation can be
/// slow to reveal the password step.
const PASSWORD_REVEAL_TIMEOUT: Duration = Duration::from_secs(15);

/// Identifier used only to coax two-step providers into showing the link.
const PROBE_IDENTIFIER: &str = "someone@example.com";

pub struct ResetFlow {
    page: Page,
}

impl ResetFlow {
    pub fn new(page: Page) -> Self {
        Self { page }
    }

    /// Reach the reset-request form through the login screen.
    ///
    /// Failing to find the affordance at all is a configuration-class error:
    /// the environment under test does not look like the one this suite is
    /// written for, and retrying will not help.
    pub async fn goto_via_login(&self, config: &SuiteConfig) -> Result<()> {
        let login = LoginFlow::new(self.page.clone());
        login.goto(config).await?;

        if self.click_forgot_on_current_screen().await {
            return Ok(());
        }

        // Some providers only show the link once an identifier is in. Feed
        // one through and look again.
        if let Some(identifier) =
            locate(&self.page, &candidates::identifier_field(), FIELD_TIMEOUT).await
        {
            identifier.fill(PROBE_IDENTIFIER).await;
            self.submit_or_press_enter(&identifier, &candidates::submit_button()).await;
            let _ = locate(&self.page, &candidates::password_field(), PASSWORD_REVEAL_TIMEOUT).await;
        }

        if self.click_forgot_on_current_screen().await {
            return Ok(());
        }
        Err(HarnessError::ForgotPasswordNotFound)
    }

    /// Fill the reset form with `identifier` and submit it.
    pub async fn request(&self, identifier: &str) -> Result<()> {
        info!("submitting reset request");
        let field = locate(&self.page, &candidates::reset_identifier_field(), FIELD_TIMEOUT)
            .await
            .ok_or_else(|| HarnessError::Timeout("reset identifier field".into()))?;
        field.fill(identifier).await;
        self.submit_or_press_enter(&field, &candidates::reset_submit_button()).await;
        Ok(())
    }

    /// Classify the response. Success when a generic confirmation phrase is
    /// visible, or at minimum no explicit enumeration phrase is. "Ambiguous
    /// or silent" passes; "explicitly denies existence" fails.
    pub async fn confirmation_is_generic(&self) -> bool {
        tokio::time::sleep(Duration::from_millis(1200)).await;
        let text = page_text(&self.page).await;
        let confirmed = selectors::RESET_CONFIRMATION_RE.is_match(&text);
        let enumerated = selectors::ENUMERATION_RE.is_match(&text);
        debug!(confirmed, enumerated, "classified reset response");
        confirmed || !enumerated
    }

    async fn click_forgot_on_current_screen(&self) -> bool {
        let Some(link) =
            locate(&self.page, &candidates::forgot_affordance(), AFFORDANCE_TIMEOUT).await
        else {
            return false;
        };
        link.click().await;
        let _ = self.page.wait_for_navigation().await;
        tokio::time::sleep(Duration::from_millis(300)).await;
        true
    }

    /// Click the submit control when it is enabled; otherwise press Enter on
    /// the field and, if the control has come alive meanwhile, click it too.
    async fn submit_or_press_enter(
        &self,
        field: &crate::locator::Located,
        submit_candidates: &[crate::locator::Candidate],
    ) {
        if let Some(submit) = locate(&self.page, submit_candidates, AFFORDANCE_TIMEOUT).await {
            if submit.is_enabled().await {
                submit.click().await;
            } else {
                field.press_enter().await;
                if submit.is_enabled().await {
                    submit.click().await;
                }
            }
        } else {
            field.press_enter().await;
        }
        tokio::time::sleep(Duration::from_millis(800)).await;
    }
}
