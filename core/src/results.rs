//! Pass/fail tracking for one test run.
//!
//! Counters only grow: `success` and `failure` each add one to `total`, and
//! only `success` adds to `passed`, so `passed <= total` always holds.

use serde::Serialize;
use tracing::{error, info};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Results {
    total: usize,
    passed: usize,
    failures: Vec<String>,
}

/// End-of-run snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub pass_percentage: f64,
    pub failures: Vec<String>,
}

impl Results {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn success(&mut self, message: &str) {
        info!("PASS: {message}");
        self.total += 1;
        self.passed += 1;
    }

    pub fn failure(&mut self, message: &str) {
        let fail_msg = format!("FAIL: {message}");
        error!("{fail_msg}");
        self.total += 1;
        self.failures.push(fail_msg);
    }

    pub fn log_result(&mut self, is_success: bool, success_msg: &str, failure_msg: &str) {
        if is_success {
            self.success(success_msg);
        } else {
            self.failure(failure_msg);
        }
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn pass_count(&self) -> usize {
        self.passed
    }

    pub fn fail_count(&self) -> usize {
        self.total - self.passed
    }

    pub fn failures(&self) -> &[String] {
        &self.failures
    }

    pub fn pass_percentage(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.passed as f64 / self.total as f64 * 100.0
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            total: self.total,
            passed: self.passed,
            failed: self.fail_count(),
            pass_percentage: self.pass_percentage(),
            failures: self.failures.clone(),
        }
    }

    pub fn write_summary(&self) {
        info!(
            total = self.total,
            passed = self.passed,
            failed = self.fail_count(),
            "test summary: pass rate {:.1}%",
            self.pass_percentage()
        );
        for failure in &self.failures {
            info!("{failure}");
        }
    }
}
