//! Resilient element locator
//!
//! The identity provider and the downstream applications render opaque,
//! framework-generated markup that changes between releases. Instead of
//! hard-coding selectors, callers describe what they want as an ordered list
//! of [`Candidate`] descriptors, semantic matchers (role, label, text)
//! first and structural CSS last, and [`locate`] polls the page until the
//! first listed candidate that is simultaneously present and visible wins.
//!
//! List order encodes priority, not recency: a later candidate is never
//! returned while an earlier one qualifies during the same sweep.
//!
//! A successful lookup yields a [`Located`] handle. The handle stores the
//! candidate's finder expression rather than a DOM node, and every
//! interaction re-resolves the element in-page; navigations therefore never
//! leave a stale handle behind. Per-probe driver errors (element detached
//! mid-check, evaluation racing a re-render) are swallowed and treated as
//! "not yet matched".

use std::time::Duration;

use chromiumoxide::Page;
use tracing::{debug, trace};

/// Delay between full candidate sweeps. Short enough to catch fast-rendering
/// UIs, long enough to avoid hammering the DevTools connection.
const SWEEP_INTERVAL: Duration = Duration::from_millis(120);

/// A strategy for finding one semantic UI element.
///
/// Regex fields hold pattern sources from [`crate::selectors`]; they are
/// compiled case-insensitively inside the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Candidate {
    /// Element with a given ARIA role (explicit or implicit) whose accessible
    /// name matches the pattern.
    Role {
        role: &'static str,
        name: &'static str,
    },
    /// Form control labelled (via `<label>` association or `aria-label`) by
    /// text matching the pattern.
    Label(&'static str),
    /// Input whose placeholder matches the pattern.
    Placeholder(&'static str),
    /// Leaf element whose own text matches the pattern.
    Text(&'static str),
    /// Structural CSS selector. Last resort; first match in DOM order.
    Css(&'static str),
}

/// Shared in-page helpers prepended to every probe/action script.
const PRELUDE: &str = r#"
const __vis = (el) => {
    if (!el) return false;
    const s = getComputedStyle(el);
    if (s.display === 'none' || s.visibility === 'hidden') return false;
    return !!(el.offsetWidth || el.offsetHeight || el.getClientRects().length);
};
const __name = (el) => {
    const aria = el.getAttribute ? (el.getAttribute('aria-label') || '') : '';
    const title = el.getAttribute ? (el.getAttribute('title') || '') : '';
    const text = el.innerText || el.textContent || '';
    const value = typeof el.value === 'string' ? el.value : '';
    return (aria + ' ' + text + ' ' + value + ' ' + title).trim();
};
const __roleSel = (role) => ({
    button: 'button, input[type="submit"], input[type="button"], [role="button"]',
    link: 'a[href], [role="link"]',
    menuitem: '[role="menuitem"]',
    heading: 'h1, h2, h3, h4, h5, h6, [role="heading"]',
    textbox: 'input:not([type]), input[type="text"], input[type="email"], textarea, [role="textbox"]',
}[role] || ('[role="' + role + '"]'));
const __byRole = (role, re) => {
    for (const el of document.querySelectorAll(__roleSel(role))) {
        if (!re || re.test(__name(el))) return el;
    }
    return null;
};
const __byLabel = (re) => {
    for (const lab of document.querySelectorAll('label')) {
        if (re.test(lab.textContent || '')) {
            const c = lab.control
                || (lab.htmlFor && document.getElementById(lab.htmlFor))
                || lab.querySelector('input, textarea, select');
            if (c) return c;
        }
    }
    for (const el of document.querySelectorAll('input, textarea, select')) {
        if (re.test(el.getAttribute('aria-label') || '')) return el;
    }
    return null;
};
const __byPlaceholder = (re) => {
    for (const el of document.querySelectorAll('input, textarea')) {
        if (re.test(el.getAttribute('placeholder') || '')) return el;
    }
    return null;
};
const __byText = (re) => {
    for (const el of document.querySelectorAll('body *')) {
        if (el.children.length === 0 && re.test((el.textContent || '').trim())) return el;
    }
    return null;
};
"#;

/// Quote a Rust string as a JavaScript string literal.
fn js_str(s: &str) -> String {
    serde_json::to_string(s).expect("string serializes")
}

/// Compile a catalog pattern source into a case-insensitive JS RegExp.
fn js_regex(source: &str) -> String {
    format!("new RegExp({}, 'i')", js_str(source))
}

impl Candidate {
    /// Expression evaluating to the first matching element, or `null`.
    fn finder_js(&self) -> String {
        match self {
            Candidate::Role { role, name } => {
                format!("__byRole({}, {})", js_str(role), js_regex(name))
            }
            Candidate::Label(pattern) => format!("__byLabel({})", js_regex(pattern)),
            Candidate::Placeholder(pattern) => format!("__byPlaceholder({})", js_regex(pattern)),
            Candidate::Text(pattern) => format!("__byText({})", js_regex(pattern)),
            Candidate::Css(selector) => format!("document.querySelector({})", js_str(selector)),
        }
    }

    /// Whether this candidate's first match exists and is visible right now.
    /// Driver errors count as "not matched".
    pub async fn probe(&self, page: &Page) -> bool {
        let script = format!(
            "(() => {{ {PRELUDE} const el = {}; return !!(el && __vis(el)); }})()",
            self.finder_js()
        );
        eval_bool(page, &script).await
    }
}

/// Transient handle to a located, currently-visible element.
///
/// Never cached across navigations by construction: every method re-resolves
/// the element from the finder expression before acting.
#[derive(Debug, Clone)]
pub struct Located {
    page: Page,
    finder: String,
    /// Which candidate (by list position) matched; order encodes priority.
    pub candidate_index: usize,
}

impl Located {
    /// Re-resolve and run `action` against the element. Returns false when
    /// the element is gone or the driver call fails.
    async fn act(&self, action: &str) -> bool {
        let script = format!(
            "(() => {{ {PRELUDE} const el = {}; if (!el) return false; {action} return true; }})()",
            self.finder
        );
        eval_bool(&self.page, &script).await
    }

    /// Click the element via its native click handler.
    pub async fn click(&self) -> bool {
        self.act("el.click();").await
    }

    /// Fill a form control. Uses the native value setter and synthetic
    /// `input`/`change` events so framework-rendered forms observe the edit.
    pub async fn fill(&self, value: &str) -> bool {
        let action = format!(
            r#"
            el.focus();
            const proto = el instanceof HTMLTextAreaElement
                ? HTMLTextAreaElement.prototype
                : HTMLInputElement.prototype;
            const desc = Object.getOwnPropertyDescriptor(proto, 'value');
            if (desc && desc.set) {{ desc.set.call(el, {v}); }} else {{ el.value = {v}; }}
            el.dispatchEvent(new Event('input', {{ bubbles: true }}));
            el.dispatchEvent(new Event('change', {{ bubbles: true }}));
            "#,
            v = js_str(value)
        );
        self.act(&action).await
    }

    /// Press Enter on the element, falling back to submitting its form.
    /// Used when the primary submit control is present but disabled.
    pub async fn press_enter(&self) -> bool {
        self.act(
            r#"
            for (const kind of ['keydown', 'keypress', 'keyup']) {
                el.dispatchEvent(new KeyboardEvent(kind, {
                    key: 'Enter', code: 'Enter', keyCode: 13, bubbles: true,
                }));
            }
            if (el.form) {
                if (el.form.requestSubmit) { el.form.requestSubmit(); } else { el.form.submit(); }
            }
            "#,
        )
        .await
    }

    /// Whether the element is currently enabled.
    pub async fn is_enabled(&self) -> bool {
        let script = format!(
            "(() => {{ {PRELUDE} const el = {}; return !!(el && !el.disabled); }})()",
            self.finder
        );
        eval_bool(&self.page, &script).await
    }

    /// Whether the element is still present and visible.
    pub async fn is_visible(&self) -> bool {
        let script = format!(
            "(() => {{ {PRELUDE} const el = {}; return !!(el && __vis(el)); }})()",
            self.finder
        );
        eval_bool(&self.page, &script).await
    }
}

/// Poll `candidates` in list order until the deadline; the first candidate
/// (by position) that is both present and visible during a sweep wins
/// immediately. Returns `None` at the deadline; absence is the caller's
/// decision to escalate, not an error here.
pub async fn locate(page: &Page, candidates: &[Candidate], timeout: Duration) -> Option<Located> {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        for (index, candidate) in candidates.iter().enumerate() {
            if candidate.probe(page).await {
                trace!(index, ?candidate, "candidate matched");
                return Some(Located {
                    page: page.clone(),
                    finder: candidate.finder_js(),
                    candidate_index: index,
                });
            }
        }
        if tokio::time::Instant::now() >= deadline {
            debug!(candidates = candidates.len(), "no candidate matched before deadline");
            return None;
        }
        tokio::time::sleep(SWEEP_INTERVAL).await;
    }
}

/// Whether any of `candidates` currently matches. Single sweep, no polling.
pub async fn any_visible(page: &Page, candidates: &[Candidate]) -> bool {
    for candidate in candidates {
        if candidate.probe(page).await {
            return true;
        }
    }
    false
}

/// Full rendered text of the page body, for Rust-side classification.
/// Evaluation failures yield an empty string.
pub async fn page_text(page: &Page) -> String {
    match page.evaluate("document.body ? document.body.innerText : ''").await {
        Ok(result) => result.into_value::<String>().unwrap_or_default(),
        Err(_) => String::new(),
    }
}

/// Current page URL, empty when unavailable (e.g. target already closed).
pub async fn current_url(page: &Page) -> String {
    match page.url().await {
        Ok(Some(url)) => url,
        _ => String::new(),
    }
}

async fn eval_bool(page: &Page, script: &str) -> bool {
    match page.evaluate(script).await {
        Ok(result) => result.into_value::<bool>().unwrap_or(false),
        Err(err) => {
            trace!("probe evaluation failed: {err}");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn finder_js_role() {
        let js = Candidate::Role {
            role: "button",
            name: "sign in|log in",
        }
        .finder_js();
        assert!(js.contains("__byRole(\"button\""));
        assert!(js.contains("new RegExp(\"sign in|log in\", 'i')"));
    }

    #[test]
    fn finder_js_css_is_escaped() {
        let js = Candidate::Css(r#"input[name="email"]"#).finder_js();
        assert_eq!(js, r#"document.querySelector("input[name=\"email\"]")"#);
    }

    #[test]
    fn js_regex_escapes_quotes_and_backslashes() {
        assert_eq!(js_regex(r"max-age=\d+"), r#"new RegExp("max-age=\\d+", 'i')"#);
        assert_eq!(js_regex(r#"say "hi""#), r#"new RegExp("say \"hi\"", 'i')"#);
    }

    #[test]
    fn prelude_defines_all_helpers() {
        for helper in ["__vis", "__name", "__byRole", "__byLabel", "__byPlaceholder", "__byText"] {
            assert!(PRELUDE.contains(helper), "missing {helper}");
        }
    }
}
