//! The built-in suite for `smash`.
//!
//! Each case is a plain function from [`Target`](crate::case::Target) to a
//! [`Verdict`]; the lists below fix both membership and execution order.

mod module;
mod stress;
mod system;

use crate::case::{CaseError, CatalogError, Category, Verdict};
use regex::Regex;
use std::time::Duration;

pub const MODULE_TESTS: &str = "Module Tests";
pub const SYSTEM_TESTS: &str = "System Tests";
pub const STRESS_TESTS: &str = "Stress Tests";

/// All categories, in run order.
pub fn categories() -> Result<Vec<Category>, CatalogError> {
    Ok(vec![
        Category::new(MODULE_TESTS, module::cases())?,
        Category::new(SYSTEM_TESTS, system::cases())?,
        Category::new(STRESS_TESTS, stress::cases())?,
    ])
}

type Check = Result<Verdict, CaseError>;

const fn secs(n: u64) -> Duration {
    Duration::from_secs(n)
}

/// A job listing entry: bracketed numeric id.
fn job_id() -> Result<Regex, CaseError> {
    Ok(Regex::new(r"\[\d+\]")?)
}

/// A job listing entry for a particular command, on one line.
fn job_entry(command: &str) -> Result<Regex, CaseError> {
    Ok(Regex::new(&format!(r"\[\d+\][^\n]*{}", regex::escape(command)))?)
}
