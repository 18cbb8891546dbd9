//! Login orchestration
//!
//! Drives the identifier-then-password sign-in flow against the identity
//! provider. Tolerates both provider shapes: single-step forms where the
//! password field is present from the start (the first submit completes the
//! login), and two-step forms where submitting the identifier reveals the
//! password step.
//!
//! The flow driver only acts; it never decides pass/fail. Callers verify
//! success afterwards via a URL or heading check.

use std::time::Duration;

use chromiumoxide::Page;
use tracing::{debug, info};

use crate::config::SuiteConfig;
use crate::error::{HarnessError, Result};
use crate::locator::{self, locate};
use crate::selectors::candidates;

const FIELD_TIMEOUT: Duration = Duration::from_secs(10);
/// Bounded probe for the password step appearing after the identifier submit.
const PASSWORD_PROBE: Duration = Duration::from_secs(3);

pub struct LoginFlow {
    page: Page,
}

impl LoginFlow {
    pub fn new(page: Page) -> Self {
        Self { page }
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    /// Navigate to the authorize entry point and give the provider time to
    /// render the form client-side.
    pub async fn goto(&self, config: &SuiteConfig) -> Result<()> {
        debug!(url = %config.routes.login, "opening login entry point");
        self.page.goto(config.routes.login.as_str()).await?;
        let _ = self.page.wait_for_navigation().await;
        tokio::time::sleep(Duration::from_millis(1000)).await;
        Ok(())
    }

    /// Fill and submit the sign-in form. Returns once the flow has settled;
    /// success is for the caller to verify.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<()> {
        info!("signing in");
        tokio::time::sleep(Duration::from_millis(1000)).await;

        let identifier = locate(&self.page, &candidates::identifier_field(), FIELD_TIMEOUT)
            .await
            .ok_or_else(|| HarnessError::Timeout("login identifier field".into()))?;
        identifier.fill(email).await;
        tokio::time::sleep(Duration::from_millis(500)).await;

        let submit = locate(&self.page, &candidates::submit_button(), FIELD_TIMEOUT)
            .await
            .ok_or_else(|| HarnessError::Timeout("login submit control".into()))?;
        submit.click().await;
        tokio::time::sleep(Duration::from_millis(1000)).await;

        // Two-step providers reveal the password field only now; single-step
        // providers are already past the form and the probe comes up empty.
        if let Some(password_field) =
            locate(&self.page, &candidates::password_field(), PASSWORD_PROBE).await
        {
            debug!("password step visible, submitting second factor of the form");
            password_field.fill(password).await;
            tokio::time::sleep(Duration::from_millis(500)).await;
            if let Some(submit) = locate(&self.page, &candidates::submit_button(), FIELD_TIMEOUT).await
            {
                submit.click().await;
            }
        }

        // Let the redirect chain settle before the caller inspects the URL.
        tokio::time::sleep(Duration::from_millis(2000)).await;
        Ok(())
    }

    /// URL the flow ended on, for the caller's success verification.
    pub async fn final_url(&self) -> String {
        locator::current_url(&self.page).await
    }
}
