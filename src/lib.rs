//! Black-box test harness for interactive shell-like executables.
//!
//! The target is driven purely through stdin/stdout/stderr: each test case
//! sends a scripted session, the session is captured under a deadline, and
//! the transcript is checked with plain text predicates.

pub mod assertions;
pub mod capture;
pub mod case;
pub mod catalog;
pub mod config;
pub mod loader;
pub mod report;
pub mod runner;

#[cfg(test)]
pub(crate) mod testing;
