//! Test execution engine.
//!
//! Runs categories of cases one after another against a single target and
//! collects their verdicts. Every case runs behind a fault barrier, so a
//! broken case is recorded as `Errored` and the run moves on.

use crate::case::{Category, TestCase, Target, Verdict};
use crate::report::ReportError;
use chrono::{DateTime, Local};
use serde::Serialize;
use std::any::Any;
use std::cell::Cell;
use std::panic::{self, AssertUnwindSafe};
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

/// Result of running a single case.
#[derive(Debug, Clone, Serialize)]
pub struct CaseResult {
    pub name: String,
    #[serde(flatten)]
    pub verdict: Verdict,
    #[serde(serialize_with = "serialize_duration")]
    pub duration: Duration,
}

fn serialize_duration<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_f64(duration.as_secs_f64())
}

/// Results of one category, in execution order.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryResult {
    pub name: String,
    pub cases: Vec<CaseResult>,
}

impl CategoryResult {
    pub fn passed(&self) -> usize {
        self.cases.iter().filter(|c| c.verdict.is_pass()).count()
    }

    /// Fail and Errored both count as failed.
    pub fn failed(&self) -> usize {
        self.cases.len() - self.passed()
    }
}

/// The outcome of a whole run.
#[derive(Debug, Clone)]
pub struct RunReport {
    categories: Vec<CategoryResult>,
    passed: usize,
    failed: usize,
    setup_error: Option<String>,
    started_at: DateTime<Local>,
}

impl RunReport {
    fn new() -> Self {
        Self {
            categories: Vec::new(),
            passed: 0,
            failed: 0,
            setup_error: None,
            started_at: Local::now(),
        }
    }

    /// A run that never started. No case was executed.
    pub fn setup_failure(message: impl Into<String>) -> Self {
        Self {
            setup_error: Some(message.into()),
            ..Self::new()
        }
    }

    fn record(&mut self, category: CategoryResult) {
        self.passed += category.passed();
        self.failed += category.failed();
        self.categories.push(category);
    }

    pub fn categories(&self) -> &[CategoryResult] {
        &self.categories
    }

    pub fn passed(&self) -> usize {
        self.passed
    }

    pub fn failed(&self) -> usize {
        self.failed
    }

    pub fn total(&self) -> usize {
        self.passed + self.failed
    }

    pub fn setup_error(&self) -> Option<&str> {
        self.setup_error.as_deref()
    }

    pub fn started_at(&self) -> DateTime<Local> {
        self.started_at
    }

    /// True only if the run started and every executed case passed.
    pub fn success(&self) -> bool {
        self.setup_error.is_none() && self.failed == 0
    }

    /// Check that the overall totals equal the per-category sums.
    pub fn verify_totals(&self) -> Result<(), ReportError> {
        let passed: usize = self.categories.iter().map(CategoryResult::passed).sum();
        let failed: usize = self.categories.iter().map(CategoryResult::failed).sum();
        if passed != self.passed || failed != self.failed {
            return Err(ReportError::TotalsMismatch {
                passed: self.passed,
                failed: self.failed,
                category_passed: passed,
                category_failed: failed,
            });
        }
        Ok(())
    }
}

/// Sequential runner over a fixed target.
pub struct Runner<'a> {
    target: &'a Target,
    filter: Option<&'a str>,
}

impl<'a> Runner<'a> {
    pub fn new(target: &'a Target) -> Self {
        Self {
            target,
            filter: None,
        }
    }

    /// Only run cases whose name contains `filter`.
    pub fn with_filter(mut self, filter: Option<&'a str>) -> Self {
        self.filter = filter;
        self
    }

    /// Run every selected case of every category, in order.
    ///
    /// If the target executable is missing nothing runs and the report only
    /// carries the setup diagnostic.
    pub fn run(&self, categories: &[Category]) -> RunReport {
        if let Err(e) = self.target.verify() {
            error!(target_path = %self.target.program.display(), "{e}");
            return RunReport::setup_failure(e.to_string());
        }

        let mut report = RunReport::new();
        for category in categories {
            let selected: Vec<&TestCase> = category
                .cases()
                .iter()
                .filter(|case| self.filter.is_none_or(|f| case.name.contains(f)))
                .collect();
            if selected.is_empty() {
                continue;
            }

            info!(category = category.name(), cases = selected.len(), "running category");
            let cases = selected
                .into_iter()
                .map(|case| self.run_case(case))
                .collect();
            report.record(CategoryResult {
                name: category.name().to_string(),
                cases,
            });
        }
        report
    }

    fn run_case(&self, case: &TestCase) -> CaseResult {
        let start = Instant::now();
        let verdict = invoke_guarded(case, self.target);
        let duration = start.elapsed();
        debug!(case = case.name, ?duration, pass = verdict.is_pass(), "case finished");
        CaseResult {
            name: case.name.to_string(),
            verdict,
            duration,
        }
    }
}

thread_local! {
    static GUARDED: Cell<bool> = const { Cell::new(false) };
}

/// True while the current thread is running a case behind the fault barrier.
///
/// A panic hook uses this to tell a recorded case panic from a real crash.
pub fn inside_case() -> bool {
    GUARDED.with(Cell::get)
}

/// Invoke a case behind the fault barrier.
///
/// An `Err` from the procedure and a panic inside it both become
/// `Errored`; nothing escapes to the caller.
pub fn invoke_guarded(case: &TestCase, target: &Target) -> Verdict {
    let outer = GUARDED.replace(true);
    let result = panic::catch_unwind(AssertUnwindSafe(|| (case.procedure)(target)));
    GUARDED.set(outer);

    match result {
        Ok(Ok(verdict)) => verdict,
        Ok(Err(e)) => {
            error!(case = case.name, "case failed to run: {e}");
            Verdict::Errored {
                message: e.to_string(),
            }
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            error!(case = case.name, "case panicked: {message}");
            Verdict::Errored {
                message: format!("panicked: {message}"),
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::case::CaseError;
    use crate::testing::{FAKE_SMASH, fake_target};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn pass(_: &Target) -> Result<Verdict, CaseError> {
        Ok(Verdict::Pass)
    }

    fn fail(_: &Target) -> Result<Verdict, CaseError> {
        Ok(Verdict::fail("something", "nothing"))
    }

    fn panics(_: &Target) -> Result<Verdict, CaseError> {
        panic!("case bug");
    }

    fn io_error(_: &Target) -> Result<Verdict, CaseError> {
        Err(CaseError::Fixture(std::io::Error::other("disk full")))
    }

    fn reports_guard(_: &Target) -> Result<Verdict, CaseError> {
        Ok(Verdict::check(inside_case(), "inside the barrier", "outside"))
    }

    #[test]
    fn guard_is_set_only_while_a_case_runs() {
        let target = Target::new("/bin/true");
        assert!(!inside_case());
        assert_eq!(
            invoke_guarded(&TestCase::new("guard", reports_guard), &target),
            Verdict::Pass
        );
        assert!(!inside_case());

        invoke_guarded(&TestCase::new("panics", panics), &target);
        assert!(!inside_case());
    }

    fn category(name: &str, cases: Vec<TestCase>) -> Category {
        Category::new(name, cases).unwrap()
    }

    #[test]
    fn runs_every_case_in_order_and_counts() {
        let (_dir, target) = fake_target("exit 0");
        let categories = vec![
            category(
                "Module Tests",
                vec![TestCase::new("a", pass), TestCase::new("b", fail)],
            ),
            category("System Tests", vec![TestCase::new("c", pass)]),
        ];

        let report = Runner::new(&target).run(&categories);

        assert_eq!(report.categories().len(), 2);
        let names: Vec<_> = report.categories()[0]
            .cases
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(names, ["a", "b"]);
        assert_eq!(report.passed(), 2);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.total(), 3);
        assert!(!report.success());
        report.verify_totals().unwrap();
    }

    #[test]
    fn panics_and_errors_become_errored_and_run_continues() {
        let (_dir, target) = fake_target("exit 0");
        let categories = vec![category(
            "Module Tests",
            vec![
                TestCase::new("panics", panics),
                TestCase::new("io_error", io_error),
                TestCase::new("after", pass),
            ],
        )];

        let report = Runner::new(&target).run(&categories);
        let cases = &report.categories()[0].cases;

        assert_eq!(
            cases[0].verdict,
            Verdict::Errored {
                message: "panicked: case bug".to_string()
            }
        );
        assert_eq!(
            cases[1].verdict,
            Verdict::Errored {
                message: "fixture error: disk full".to_string()
            }
        );
        assert_eq!(cases[2].verdict, Verdict::Pass);
        assert_eq!(report.passed(), 1);
        assert_eq!(report.failed(), 2);
    }

    static INVOKED: AtomicUsize = AtomicUsize::new(0);

    fn counting(_: &Target) -> Result<Verdict, CaseError> {
        INVOKED.fetch_add(1, Ordering::SeqCst);
        Ok(Verdict::Pass)
    }

    #[test]
    fn missing_target_runs_nothing() {
        let target = Target::new("/nonexistent/dir/smash");
        let categories = vec![category(
            "Module Tests",
            vec![TestCase::new("counting", counting)],
        )];

        let report = Runner::new(&target).run(&categories);

        assert_eq!(INVOKED.load(Ordering::SeqCst), 0);
        assert_eq!(report.total(), 0);
        assert!(report.categories().is_empty());
        assert!(!report.success());
        assert!(report.setup_error().unwrap().contains("/nonexistent/dir/smash"));
    }

    #[test]
    fn filter_selects_by_substring_and_drops_empty_categories() {
        let (_dir, target) = fake_target("exit 0");
        let categories = vec![
            category(
                "Module Tests",
                vec![
                    TestCase::new("pwd", pass),
                    TestCase::new("pwd_with_args", pass),
                    TestCase::new("cd_basic", fail),
                ],
            ),
            category("Stress Tests", vec![TestCase::new("rapid_cd", fail)]),
        ];

        let report = Runner::new(&target)
            .with_filter(Some("pwd"))
            .run(&categories);

        assert_eq!(report.categories().len(), 1);
        assert_eq!(report.total(), 2);
        assert!(report.success());
    }

    #[test]
    fn totals_mismatch_is_detected() {
        let mut report = RunReport::new();
        report.record(CategoryResult {
            name: "Module Tests".to_string(),
            cases: vec![CaseResult {
                name: "a".to_string(),
                verdict: Verdict::Pass,
                duration: Duration::ZERO,
            }],
        });
        report.verify_totals().unwrap();

        report.failed += 1;
        assert!(matches!(
            report.verify_totals(),
            Err(ReportError::TotalsMismatch { .. })
        ));
    }

    #[test]
    fn empty_run_is_success() {
        let (_dir, target) = fake_target("exit 0");
        let report = Runner::new(&target).run(&[]);
        assert!(report.success());
        assert_eq!(report.total(), 0);
    }

    fn real_session(target: &Target) -> Result<Verdict, CaseError> {
        Ok(target.send(["pwd"]).check(|t| {
            Verdict::check(
                crate::assertions::any_line(&t.stdout, &target.prompt, |l| l.starts_with('/')),
                "/<path>",
                &t.stdout,
            )
        }))
    }

    #[test]
    fn same_script_twice_gives_same_verdict() {
        let (_dir, target) = fake_target(FAKE_SMASH);
        let case = TestCase::new("pwd", real_session);
        let first = invoke_guarded(&case, &target);
        let second = invoke_guarded(&case, &target);
        assert_eq!(first, Verdict::Pass);
        assert_eq!(first, second);
    }

    #[test]
    fn case_result_serializes_flat() {
        let result = CaseResult {
            name: "quit".to_string(),
            verdict: Verdict::fail("exit code 0", "exit code 1"),
            duration: Duration::from_millis(1500),
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["name"], "quit");
        assert_eq!(json["status"], "fail");
        assert_eq!(json["expected"], "exit code 0");
        assert_eq!(json["duration"], 1.5);
    }
}
