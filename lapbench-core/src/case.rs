//! Benchmark Cases
//!
//! A case names itself, lists the conditions to measure it under and, when
//! executed, runs its workload exactly once through `InvocationContext::measure`.

use crate::context::InvocationContext;
use crate::error::Error;
use crate::param::BenchmarkCondition;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind, resume_unwind};
use std::sync::{Mutex, PoisonError};

/// Group and name of a case
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CaseInfo {
    group: String,
    name: String,
}

impl CaseInfo {
    /// Create case info
    pub fn new(group: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            name: name.into(),
        }
    }

    /// Group name
    pub fn group(&self) -> &str {
        &self.group
    }

    /// Case name
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for CaseInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.group, self.name)
    }
}

/// A benchmark the measurer can run
pub trait BenchmarkCase: Send + Sync {
    /// Group and name
    fn info(&self) -> &CaseInfo;

    /// Conditions to measure under
    fn conditions(&self) -> Vec<BenchmarkCondition> {
        vec![BenchmarkCondition::single_thread()]
    }

    /// Run one invocation
    ///
    /// Must call `ctx.measure` or `ctx.try_measure` once; otherwise the
    /// measurer reports `Error::NoMeasurementPerformed`.
    fn execute(&self, ctx: &InvocationContext) -> Result<(), Error>;
}

// ─── Closure cases ───────────────────────────────────────────────────────────

/// Case backed by a closure
pub struct FnCase<F> {
    info: CaseInfo,
    conditions: Vec<BenchmarkCondition>,
    body: F,
}

impl<F> FnCase<F>
where
    F: Fn(&InvocationContext) -> Result<(), Error> + Send + Sync,
{
    /// Single-thread case running `body`
    pub fn new(group: impl Into<String>, name: impl Into<String>, body: F) -> Self {
        Self {
            info: CaseInfo::new(group, name),
            conditions: vec![BenchmarkCondition::single_thread()],
            body,
        }
    }

    /// Replace the conditions
    pub fn with_conditions(mut self, conditions: Vec<BenchmarkCondition>) -> Self {
        self.conditions = conditions;
        self
    }
}

impl<F> BenchmarkCase for FnCase<F>
where
    F: Fn(&InvocationContext) -> Result<(), Error> + Send + Sync,
{
    fn info(&self) -> &CaseInfo {
        &self.info
    }

    fn conditions(&self) -> Vec<BenchmarkCondition> {
        self.conditions.clone()
    }

    fn execute(&self, ctx: &InvocationContext) -> Result<(), Error> {
        (self.body)(ctx)
    }
}

// ─── Fixtures ────────────────────────────────────────────────────────────────

/// Stateful benchmark with setup and tear-down around every invocation
pub trait Fixture: Send {
    /// Prepare state for one invocation
    fn setup(&mut self, _ctx: &InvocationContext) -> Result<(), Error> {
        Ok(())
    }

    /// Run the workload through `ctx.measure`
    fn run(&mut self, ctx: &InvocationContext) -> Result<(), Error>;

    /// Release state; runs even when `setup` or `run` fails
    fn tear_down(&mut self, _ctx: &InvocationContext) -> Result<(), Error> {
        Ok(())
    }
}

/// Case wrapping a `Fixture`
pub struct FixtureCase<T> {
    info: CaseInfo,
    conditions: Vec<BenchmarkCondition>,
    fixture: Mutex<T>,
}

impl<T: Fixture> FixtureCase<T> {
    /// Single-thread case around `fixture`
    pub fn new(group: impl Into<String>, name: impl Into<String>, fixture: T) -> Self {
        Self {
            info: CaseInfo::new(group, name),
            conditions: vec![BenchmarkCondition::single_thread()],
            fixture: Mutex::new(fixture),
        }
    }

    /// Replace the conditions
    pub fn with_conditions(mut self, conditions: Vec<BenchmarkCondition>) -> Self {
        self.conditions = conditions;
        self
    }

    /// Consume the case and return the fixture
    pub fn into_inner(self) -> T {
        self.fixture.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T: Fixture> BenchmarkCase for FixtureCase<T> {
    fn info(&self) -> &CaseInfo {
        &self.info
    }

    fn conditions(&self) -> Vec<BenchmarkCondition> {
        self.conditions.clone()
    }

    fn execute(&self, ctx: &InvocationContext) -> Result<(), Error> {
        let mut fixture = self.fixture.lock().unwrap_or_else(PoisonError::into_inner);

        let outcome = catch_unwind(AssertUnwindSafe(|| {
            fixture.setup(ctx)?;
            fixture.run(ctx)
        }));
        let tear_down = fixture.tear_down(ctx);

        match outcome {
            Ok(result) => result.and(tear_down),
            Err(panic) => resume_unwind(panic),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::MonotonicClock;
    use std::sync::Arc;

    fn ctx() -> InvocationContext {
        InvocationContext::new(
            BenchmarkCondition::single_thread(),
            1,
            2,
            0,
            Arc::new(MonotonicClock::new()),
        )
    }

    #[derive(Default)]
    struct Recording {
        events: Vec<&'static str>,
        fail_run: bool,
        fail_setup: bool,
    }

    impl Fixture for Recording {
        fn setup(&mut self, _ctx: &InvocationContext) -> Result<(), Error> {
            self.events.push("setup");
            if self.fail_setup {
                return Err(Error::InvalidConfiguration("setup".to_string()));
            }
            Ok(())
        }

        fn run(&mut self, ctx: &InvocationContext) -> Result<(), Error> {
            self.events.push("run");
            if self.fail_run {
                return Err(Error::InvalidConfiguration("run".to_string()));
            }
            ctx.measure(|_, _, _| 1 + 1)
        }

        fn tear_down(&mut self, _ctx: &InvocationContext) -> Result<(), Error> {
            self.events.push("tear_down");
            Ok(())
        }
    }

    #[test]
    fn test_case_info() {
        let info = CaseInfo::new("containers", "vec_push");
        assert_eq!(info.group(), "containers");
        assert_eq!(info.name(), "vec_push");
        assert_eq!(info.to_string(), "containers/vec_push");
    }

    #[test]
    fn test_fn_case() {
        let case = FnCase::new("g", "c", |ctx: &InvocationContext| {
            ctx.measure(|t, s, i| t + s + i)
        });

        assert_eq!(case.conditions(), vec![BenchmarkCondition::single_thread()]);
        let ctx = ctx();
        case.execute(&ctx).unwrap();
        assert!(ctx.take_recorded().is_some());
    }

    #[test]
    fn test_fixture_lifecycle() {
        let case = FixtureCase::new("g", "fixture", Recording::default());
        case.execute(&ctx()).unwrap();

        assert_eq!(case.into_inner().events, vec!["setup", "run", "tear_down"]);
    }

    #[test]
    fn test_fixture_tears_down_after_failure() {
        let case = FixtureCase::new(
            "g",
            "fixture",
            Recording {
                fail_run: true,
                ..Default::default()
            },
        );
        assert!(case.execute(&ctx()).is_err());
        assert_eq!(case.into_inner().events, vec!["setup", "run", "tear_down"]);

        let case = FixtureCase::new(
            "g",
            "fixture",
            Recording {
                fail_setup: true,
                ..Default::default()
            },
        );
        assert!(case.execute(&ctx()).is_err());
        assert_eq!(case.into_inner().events, vec!["setup", "tear_down"]);
    }

    struct Panicking(bool);

    impl Fixture for Panicking {
        fn run(&mut self, _ctx: &InvocationContext) -> Result<(), Error> {
            panic!("run panicked");
        }

        fn tear_down(&mut self, _ctx: &InvocationContext) -> Result<(), Error> {
            self.0 = true;
            Ok(())
        }
    }

    #[test]
    fn test_fixture_tears_down_after_panic() {
        let case = FixtureCase::new("g", "panicking", Panicking(false));

        let result = catch_unwind(AssertUnwindSafe(|| case.execute(&ctx())));

        assert!(result.is_err());
        assert!(case.into_inner().0);
    }
}
