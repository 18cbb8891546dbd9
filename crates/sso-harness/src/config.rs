//! Environment-derived suite configuration
//!
//! The suite runs against a live identity provider and four downstream
//! applications. Everything overridable lives here, resolved once at process
//! start and passed by reference into the orchestrators; no module reads the
//! environment on its own.
//!
//! Required: `AUTH_EMAIL`, `AUTH_PASS` (no defaults, fail fast).
//! Optional: `ID_LOGIN_URL`, `POST_LOGIN_URL`, `SIGN_URL`, `FAX_URL`,
//! `DIAL_URL`, `SCAN_URL`, `LOCKOUT_N`, `IGNORE_HTTPS_ERRORS`.

use url::Url;

use crate::error::{HarnessError, Result};

const DEFAULT_AUTHORIZE: &str = "https://id.alohi.com/realms/alohi/protocol/openid-connect/auth\
?client_id=app-selector\
&redirect_uri=https%3A%2F%2Fid.alohi.com%2Frealms%2Falohi%2Fapp-selector\
&response_type=code\
&code_challenge_method=S256";

const DEFAULT_POST_LOGIN: &str = "https://id.alohi.com/realms/alohi/app-selector";

/// Account used for authenticated scenarios. Sourced from required
/// environment configuration; construction fails if either value is absent.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// Identity-provider entry points.
#[derive(Debug, Clone)]
pub struct Routes {
    /// Authorize endpoint with `prompt=login` forced on, so a lingering IdP
    /// session never short-circuits the form.
    pub login: String,
    /// Where a successful login is expected to land.
    pub dashboard: String,
}

/// The four downstream application origins covered by the SSO session.
#[derive(Debug, Clone)]
pub struct Apps {
    pub sign: String,
    pub fax: String,
    pub dial: String,
    pub scan: String,
}

impl Apps {
    pub fn all(&self) -> [(&'static str, &str); 4] {
        [
            ("sign", &self.sign),
            ("fax", &self.fax),
            ("dial", &self.dial),
            ("scan", &self.scan),
        ]
    }
}

/// Complete suite configuration, constructed once at process start.
#[derive(Debug, Clone)]
pub struct SuiteConfig {
    pub credentials: Credentials,
    pub routes: Routes,
    pub apps: Apps,
    /// Consecutive wrong-password attempts before the IdP is expected to show
    /// a lockout or keep showing a generic error.
    pub lockout_attempts: u32,
    /// Tolerate certificate errors when probing staging environments.
    pub ignore_https_errors: bool,
}

impl SuiteConfig {
    /// Build the configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration from an arbitrary lookup function. Tests
    /// substitute a map here instead of mutating the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let credentials = Credentials {
            email: required(&lookup, "AUTH_EMAIL")?,
            password: required(&lookup, "AUTH_PASS")?,
        };

        let raw_login = optional(&lookup, "ID_LOGIN_URL").unwrap_or_else(|| DEFAULT_AUTHORIZE.to_string());
        let login = with_query_param(&raw_login, "prompt", "login")?;

        let routes = Routes {
            login,
            dashboard: optional(&lookup, "POST_LOGIN_URL")
                .unwrap_or_else(|| DEFAULT_POST_LOGIN.to_string()),
        };

        let apps = Apps {
            sign: optional(&lookup, "SIGN_URL").unwrap_or_else(|| "https://app.sign.plus/".into()),
            fax: optional(&lookup, "FAX_URL").unwrap_or_else(|| "https://app.fax.plus/".into()),
            dial: optional(&lookup, "DIAL_URL").unwrap_or_else(|| "https://app.dial.plus/".into()),
            scan: optional(&lookup, "SCAN_URL").unwrap_or_else(|| "https://scan.plus/".into()),
        };

        let lockout_attempts = match optional(&lookup, "LOCKOUT_N") {
            Some(raw) => raw.parse().map_err(|_| HarnessError::InvalidEnv {
                name: "LOCKOUT_N".into(),
                value: raw,
            })?,
            None => 5,
        };

        let ignore_https_errors = optional(&lookup, "IGNORE_HTTPS_ERRORS")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);

        Ok(Self {
            credentials,
            routes,
            apps,
            lockout_attempts,
            ignore_https_errors,
        })
    }

    /// Host of the identity provider, lowercased. Derived from the login URL.
    pub fn idp_host(&self) -> Result<String> {
        let url = Url::parse(&self.routes.login)?;
        Ok(url.host_str().unwrap_or_default().to_lowercase())
    }

    /// Registrable root of the IdP host (`id.alohi.com` -> `alohi.com`),
    /// used when auditing session-cookie domains.
    pub fn expected_cookie_root(&self) -> Result<String> {
        let host = self.idp_host()?;
        let labels: Vec<&str> = host.split('.').collect();
        if labels.len() >= 2 {
            Ok(labels[labels.len() - 2..].join("."))
        } else {
            Ok(host)
        }
    }
}

fn required<F>(lookup: &F, name: &str) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(val) if !val.trim().is_empty() => Ok(val.trim().to_string()),
        _ => Err(HarnessError::MissingEnv {
            name: name.to_string(),
            hint: if name == "AUTH_PASS" {
                "AUTH_PASS=\"your#StrongP@ss\"".to_string()
            } else {
                format!("{name}=value")
            },
        }),
    }
}

fn optional<F>(lookup: &F, name: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn with_query_param(raw: &str, key: &str, value: &str) -> Result<String> {
    let mut url = Url::parse(raw)?;
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| k != key)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    {
        let mut pairs = url.query_pairs_mut();
        pairs.clear();
        for (k, v) in &kept {
            pairs.append_pair(k, v);
        }
        pairs.append_pair(key, value);
    }
    Ok(url.to_string())
}
