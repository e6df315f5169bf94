//! Execution tracing hooks.
//!
//! The evaluator reports statement visits and call dispatches to an
//! [`EvalTracer`]; the default [`NoopTracer`] compiles away to nothing,
//! while [`RecordingTracer`] captures events for tests and embedders.

use crate::error::CodeLoc;

/// Observer of evaluator progress.
pub trait EvalTracer {
    /// Called before each statement is executed.
    fn on_statement(&mut self, loc: CodeLoc);

    /// Called for each function, operator or constructor dispatch, with
    /// the resolved callee's name.
    fn on_call(&mut self, name: &str);
}

/// Tracer that ignores every event.
#[derive(Debug, Default)]
pub struct NoopTracer;

impl EvalTracer for NoopTracer {
    fn on_statement(&mut self, _loc: CodeLoc) {}
    fn on_call(&mut self, _name: &str) {}
}

/// Records every event, for inspection after a run.
#[derive(Debug, Default)]
pub struct RecordingTracer {
    pub statements: Vec<CodeLoc>,
    pub calls: Vec<String>,
}

impl RecordingTracer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl EvalTracer for RecordingTracer {
    fn on_statement(&mut self, loc: CodeLoc) {
        self.statements.push(loc);
    }

    fn on_call(&mut self, name: &str) {
        self.calls.push(name.to_owned());
    }
}
