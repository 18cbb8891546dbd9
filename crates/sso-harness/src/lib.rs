//! End-to-end probing harness for an OpenID-Connect SSO deployment
//!
//! This crate drives a real browser (via the Chrome DevTools Protocol)
//! against a live identity provider and the four downstream applications it
//! signs users into, verifying login, password reset, cross-application
//! session behavior, logout, and a handful of header/cookie security
//! properties.
//!
//! The markup under test is opaque and changes between provider releases, so
//! nothing here assumes a stable DOM. Elements are found through ordered
//! lists of [`locator::Candidate`] descriptors (semantic matchers first,
//! structural CSS last) polled under a deadline; the first match wins. See
//! [`locator`] for the contract.
//!
//! # Example
//!
//! ```no_run
//! use sso_harness::{config::SuiteConfig, runner::{RunPlan, SuiteRunner}};
//! use sso_harness::reporter::{OutputFormat, Reporter};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = SuiteConfig::from_env()?;
//! let runner = SuiteRunner::launch(config).await?;
//! let results = runner.run(&RunPlan::default()).await?;
//!
//! Reporter::new(OutputFormat::Console).report(&results)?;
//! Reporter::new(OutputFormat::Junit).write_to_file(&results, "test-results/junit.xml")?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod inspect;
pub mod locator;
pub mod login;
pub mod reporter;
pub mod reset;
pub mod runner;
pub mod selectors;
pub mod session;

// Re-export main types for convenience
pub use config::SuiteConfig;
pub use error::{HarnessError, Result};
pub use reporter::{OutputFormat, Reporter};
pub use runner::{RunPlan, SuiteResults, SuiteRunner};
