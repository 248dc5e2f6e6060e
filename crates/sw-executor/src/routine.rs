//! # Command Routines
//!
//! A command routine is a steppable state machine. The dispatcher calls
//! [`CommandRoutine::resume`] repeatedly; each call either yields an
//! intermediate [`StepOutput`], completes with a final one, or fails.
//! Between two resumptions the dispatcher is free to run other commands.
//!
//! ```ignore
//! struct CountUp { next: u64, last: u64 }
//!
//! #[async_trait]
//! impl CommandRoutine for CountUp {
//!     async fn resume(&mut self) -> Result<Step, CommandError> {
//!         let n = self.next;
//!         self.next += 1;
//!         if n < self.last {
//!             Ok(Step::emit(n))
//!         } else {
//!             Ok(Step::done(n))
//!         }
//!     }
//! }
//! ```

use crate::error::CommandError;
use async_trait::async_trait;
use serde_json::Value;
use shared_types::TransferBuffer;
use std::collections::VecDeque;

/// The value produced by one step, plus any buffers it hands back.
#[derive(Debug, Default)]
pub struct StepOutput {
    pub value: Value,
    pub buffers: Vec<TransferBuffer>,
}

impl StepOutput {
    pub fn new(value: impl Into<Value>) -> Self {
        Self {
            value: value.into(),
            buffers: Vec::new(),
        }
    }

    /// Move a buffer into the output.
    #[must_use]
    pub fn with_buffer(mut self, buffer: TransferBuffer) -> Self {
        self.buffers.push(buffer);
        self
    }
}

/// Result of resuming a routine once.
#[derive(Debug)]
pub enum Step {
    /// An intermediate result; the routine expects to be resumed again.
    Yield(StepOutput),
    /// The final result; the routine is not resumed again.
    Complete(StepOutput),
}

impl Step {
    /// Yield a bare value.
    pub fn emit(value: impl Into<Value>) -> Self {
        Self::Yield(StepOutput::new(value))
    }

    /// Complete with a bare value.
    pub fn done(value: impl Into<Value>) -> Self {
        Self::Complete(StepOutput::new(value))
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete(_))
    }
}

/// A routine that can be suspended after each intermediate result.
#[async_trait]
pub trait CommandRoutine: Send {
    /// Run until the next intermediate result, completion or error.
    async fn resume(&mut self) -> Result<Step, CommandError>;
}

/// Routine built from a state value and a synchronous step function.
pub struct FnRoutine<S, F> {
    state: S,
    step: F,
    finished: bool,
}

impl<S, F> FnRoutine<S, F>
where
    S: Send,
    F: FnMut(&mut S) -> Result<Step, CommandError> + Send,
{
    pub fn new(state: S, step: F) -> Self {
        Self {
            state,
            step,
            finished: false,
        }
    }
}

#[async_trait]
impl<S, F> CommandRoutine for FnRoutine<S, F>
where
    S: Send,
    F: FnMut(&mut S) -> Result<Step, CommandError> + Send,
{
    async fn resume(&mut self) -> Result<Step, CommandError> {
        if self.finished {
            return Err(CommandError::Exhausted);
        }
        let step = (self.step)(&mut self.state);
        self.finished = step.as_ref().map_or(true, Step::is_complete);
        step
    }
}

/// Routine that replays a fixed script of steps.
///
/// Once the script runs out the routine reports [`CommandError::Exhausted`].
pub struct ScriptedRoutine {
    steps: VecDeque<Result<Step, CommandError>>,
}

impl ScriptedRoutine {
    pub fn new(steps: Vec<Result<Step, CommandError>>) -> Self {
        Self {
            steps: steps.into(),
        }
    }
}

#[async_trait]
impl CommandRoutine for ScriptedRoutine {
    async fn resume(&mut self) -> Result<Step, CommandError> {
        self.steps.pop_front().unwrap_or(Err(CommandError::Exhausted))
    }
}
