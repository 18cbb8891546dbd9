//! Selector catalog
//!
//! Regex sources identifying semantic UI roles independent of exact markup.
//! The same sources back two consumers: in-page probing (compiled to a
//! JavaScript `RegExp` by the locator) and Rust-side classification of page
//! text (compiled here with case-insensitive `Regex`).
//!
//! Keep patterns provider-agnostic; anything Keycloak-specific belongs in the
//! structural CSS fallbacks of the candidate lists, last in priority.

use lazy_static::lazy_static;
use regex::Regex;

/// Identifier field label/placeholder.
pub const IDENTIFIER: &str = "email|username";
/// Password field label/placeholder.
pub const PASSWORD: &str = "password";
/// Primary submit control name.
pub const SUBMIT: &str = "sign in|log in|continue|next|submit";
/// Reset-form submit control name.
pub const RESET_SUBMIT: &str = "submit|send|continue|reset";
/// Logout control name.
pub const LOGOUT: &str = "log ?out|sign ?out";
/// Account/user menu control name.
pub const ACCOUNT_MENU: &str = "account|profile|menu|settings|avatar|user";
/// Forgot-password affordance.
pub const FORGOT: &str = "forgot|reset.*password";
/// Overlay dismiss control name.
pub const MODAL_CLOSE: &str = "close|dismiss|ok|got it|i understand";

/// Generic invalid-credentials wording.
pub const GENERIC_ERROR: &str = "invalid|incorrect|wrong (?:email|username|password)|try again|error";
/// Lockout wording.
pub const LOCKOUT: &str = "locked|too many attempts|try again later|temporarily disabled";
/// Generic reset-request confirmation wording.
pub const RESET_CONFIRMATION: &str = "if the account exists|check your email\
|email (?:has been )?sent|we (?:have )?sent\
|instructions (?:to|have been) sent|reset link";
/// Account-existence-revealing wording. Seeing this is always a failure.
pub const ENUMERATION: &str = "user not found|no account|does not exist|unknown user";

/// Substrings that must never leak into `document.cookie`.
pub const TOKENISH_COOKIE: &str = r"\b(token|idtoken|access|refresh|jwt)\b";

lazy_static! {
    pub static ref GENERIC_ERROR_RE: Regex = ci(GENERIC_ERROR);
    pub static ref LOCKOUT_RE: Regex = ci(LOCKOUT);
    pub static ref RESET_CONFIRMATION_RE: Regex = ci(RESET_CONFIRMATION);
    pub static ref ENUMERATION_RE: Regex = ci(ENUMERATION);
    pub static ref TOKENISH_COOKIE_RE: Regex = ci(TOKENISH_COOKIE);
    /// Final URL after a successful login must no longer match this.
    pub static ref AUTHORIZE_PATH_RE: Regex = ci(r"/protocol/openid-connect/auth");
}

fn ci(source: &str) -> Regex {
    Regex::new(&format!("(?i){source}")).expect("catalog pattern compiles")
}

/// Ordered candidate lists for the locator. Semantic matchers (role, label,
/// text) come first, structural CSS fallbacks last; list position is the
/// priority the locator honors.
pub mod candidates {
    use super::*;
    use crate::locator::Candidate;

    pub fn identifier_field() -> Vec<Candidate> {
        vec![
            Candidate::Label(IDENTIFIER),
            Candidate::Placeholder(IDENTIFIER),
            Candidate::Css(r#"input[type="email"], input#email, input[name="email"]"#),
            Candidate::Css(r#"input#username, input[name="username"]"#),
        ]
    }

    /// The reset form occasionally labels its field neither "email" nor
    /// "username"; a bare text input is acceptable there, last.
    pub fn reset_identifier_field() -> Vec<Candidate> {
        let mut list = identifier_field();
        list.push(Candidate::Css(r#"input[type="text"]"#));
        list
    }

    pub fn password_field() -> Vec<Candidate> {
        vec![
            Candidate::Label(PASSWORD),
            Candidate::Css(r#"input[type="password"], input#password, input[name="password"]"#),
        ]
    }

    pub fn submit_button() -> Vec<Candidate> {
        vec![
            Candidate::Role { role: "button", name: SUBMIT },
            Candidate::Css(r#"button[type="submit"], input[type="submit"]"#),
        ]
    }

    pub fn reset_submit_button() -> Vec<Candidate> {
        vec![
            Candidate::Role { role: "button", name: RESET_SUBMIT },
            Candidate::Css(r#"button[type="submit"], input[type="submit"]"#),
        ]
    }

    pub fn forgot_affordance() -> Vec<Candidate> {
        vec![
            Candidate::Role { role: "link", name: FORGOT },
            Candidate::Role { role: "button", name: FORGOT },
            Candidate::Text("forgot password"),
            Candidate::Css(r#"[data-kc-msg="doForgotPassword"]"#),
            Candidate::Css(r#"a[href*="reset-credentials" i]"#),
            Candidate::Css(r#"a[href*="forgot" i]"#),
            Candidate::Css(r#"a[href*="reset" i]"#),
        ]
    }

    /// Anything here being visible means we are looking at a login form.
    pub fn login_form_probes() -> Vec<Candidate> {
        vec![
            Candidate::Label(IDENTIFIER),
            Candidate::Label(PASSWORD),
            Candidate::Role { role: "button", name: SUBMIT },
            Candidate::Css(r#"input[type="email"], input#email, input[name="email"], input#username"#),
            Candidate::Css(r#"input[type="password"], input#password, input[name="password"]"#),
        ]
    }

    pub fn user_menu_button() -> Vec<Candidate> {
        vec![
            Candidate::Role { role: "button", name: ACCOUNT_MENU },
            Candidate::Css(
                r#"button[aria-label*="account" i], button[aria-label*="profile" i], button[aria-label*="menu" i]"#,
            ),
            Candidate::Css(r#"[class*="avatar"]"#),
            Candidate::Css(r#"header [class*="user"], header [class*="avatar"]"#),
        ]
    }

    pub fn open_menu_region() -> Vec<Candidate> {
        vec![
            Candidate::Css(r#"[role="menu"]"#),
            Candidate::Css("ul[role=\"menu\"]"),
            Candidate::Css(".menu, .dropdown, .context-menu"),
        ]
    }

    pub fn logout_control() -> Vec<Candidate> {
        vec![
            Candidate::Role { role: "menuitem", name: LOGOUT },
            Candidate::Role { role: "link", name: LOGOUT },
            Candidate::Role { role: "button", name: LOGOUT },
            Candidate::Text(LOGOUT),
            Candidate::Css(r#"a[href*="logout"]"#),
        ]
    }

    pub fn error_region() -> Vec<Candidate> {
        vec![
            Candidate::Css(r#"[role="alert"]"#),
            Candidate::Css(r#"[role="status"]"#),
            Candidate::Css(r#"[aria-live="assertive"]"#),
            Candidate::Css(r#"[aria-live="polite"]"#),
            Candidate::Css(".error, .error-message, .errors"),
            Candidate::Css(".alert, .alert-danger, .alert-error"),
            Candidate::Css(".MuiAlert-root, .MuiAlert-message"),
            Candidate::Css(".kc-feedback-text, .kc-feedback-error"),
            Candidate::Css(r#"[data-testid*="alert"], [data-testid*="error"]"#),
            Candidate::Text(GENERIC_ERROR),
            Candidate::Css(r#"input[aria-invalid="true"], input[aria-describedby*="error"]"#),
        ]
    }

    pub fn modal_close_button() -> Vec<Candidate> {
        vec![
            Candidate::Css(r#"[aria-label="Close"]"#),
            Candidate::Role { role: "button", name: MODAL_CLOSE },
            Candidate::Css(r#".modal .close, .ant-modal-close, .MuiDialog-root button[aria-label="close" i]"#),
            Candidate::Css(r#"[data-testid*="close"]"#),
        ]
    }
}
