//! # Built-in Commands
//!
//! | Command | Arguments | Steps | Final value |
//! |---------|-----------|-------|-------------|
//! | `count_up` | `n` | `1 .. n-1` | `n` |
//! | `echo` | any | none | the argument list, buffers returned |
//! | `fail_after` | `n`, `message` | `1 ..= n` | fails with `message` |
//! | `digest` | buffers | one summary per buffer | combined SHA-256, buffers returned |
//! | `sleep_steps` | `steps`, `millis` | `1 .. steps-1`, sleeping between | `steps` |

use async_trait::async_trait;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use shared_types::TransferBuffer;
use std::collections::VecDeque;
use std::time::Duration;
use sw_executor::{
    CommandError, CommandRegistry, CommandRoutine, FnRoutine, RoutineResult, Step, StepOutput,
};

/// Registry with every built-in command.
pub fn builtin_registry() -> CommandRegistry {
    CommandRegistry::new()
        .with("count_up", count_up)
        .with("echo", echo)
        .with("fail_after", fail_after)
        .with("digest", digest)
        .with("sleep_steps", sleep_steps)
}

fn arg_u64(args: &[Value], index: usize) -> Result<u64, CommandError> {
    let value = args.get(index).ok_or(CommandError::MissingArgument(index))?;
    value.as_u64().ok_or_else(|| {
        CommandError::InvalidArguments(format!(
            "argument {index} must be a non-negative integer, got {value}"
        ))
    })
}

fn arg_str(args: &[Value], index: usize) -> Result<String, CommandError> {
    let value = args.get(index).ok_or(CommandError::MissingArgument(index))?;
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| CommandError::InvalidArguments(format!("argument {index} must be a string")))
}

/// Yield `1, 2, .., n-1`, then complete with `n`.
pub fn count_up(args: Vec<Value>, _buffers: Vec<TransferBuffer>) -> RoutineResult {
    let last = arg_u64(&args, 0)?;
    if last == 0 {
        return Err(CommandError::InvalidArguments("count must be at least 1".into()));
    }
    Ok(Box::new(FnRoutine::new(1u64, move |next: &mut u64| {
        let current = *next;
        *next += 1;
        if current < last {
            Ok(Step::emit(current))
        } else {
            Ok(Step::done(current))
        }
    })))
}

/// Complete immediately with the arguments, handing the buffers back.
pub fn echo(args: Vec<Value>, buffers: Vec<TransferBuffer>) -> RoutineResult {
    let mut output = Some(StepOutput {
        value: Value::Array(args),
        buffers,
    });
    Ok(Box::new(FnRoutine::new((), move |_: &mut ()| {
        output.take().map(Step::Complete).ok_or(CommandError::Exhausted)
    })))
}

/// Yield `1 ..= n`, then fail with `message`.
pub fn fail_after(args: Vec<Value>, _buffers: Vec<TransferBuffer>) -> RoutineResult {
    let steps = arg_u64(&args, 0)?;
    let message = arg_str(&args, 1)?;
    Ok(Box::new(FnRoutine::new(0u64, move |done: &mut u64| {
        if *done < steps {
            *done += 1;
            Ok(Step::emit(*done))
        } else {
            Err(CommandError::Execution(message.clone()))
        }
    })))
}

/// Hash each buffer in turn, then report the hash over all of them.
pub fn digest(_args: Vec<Value>, buffers: Vec<TransferBuffer>) -> RoutineResult {
    if buffers.is_empty() {
        return Err(CommandError::InvalidArguments("digest needs at least one buffer".into()));
    }
    Ok(Box::new(DigestRoutine {
        pending: buffers.into(),
        hashed: Vec::new(),
        total: Sha256::new(),
    }))
}

struct DigestRoutine {
    pending: VecDeque<TransferBuffer>,
    hashed: Vec<TransferBuffer>,
    total: Sha256,
}

#[async_trait]
impl CommandRoutine for DigestRoutine {
    async fn resume(&mut self) -> Result<Step, CommandError> {
        match self.pending.pop_front() {
            Some(buffer) => {
                self.total.update(buffer.as_slice());
                let summary = json!({
                    "index": self.hashed.len(),
                    "len": buffer.len(),
                    "sha256": hex::encode(Sha256::digest(buffer.as_slice())),
                });
                self.hashed.push(buffer);
                Ok(Step::emit(summary))
            }
            None => {
                let total = std::mem::take(&mut self.total).finalize();
                Ok(Step::Complete(StepOutput {
                    value: json!({
                        "buffers": self.hashed.len(),
                        "sha256": hex::encode(total),
                    }),
                    buffers: std::mem::take(&mut self.hashed),
                }))
            }
        }
    }
}

/// Sleep `millis` before each step; yield `1 .. steps-1`, complete with `steps`.
pub fn sleep_steps(args: Vec<Value>, _buffers: Vec<TransferBuffer>) -> RoutineResult {
    let steps = arg_u64(&args, 0)?.max(1);
    let millis = args.get(1).map_or(Ok(10), |_| arg_u64(&args, 1))?;
    Ok(Box::new(SleepSteps {
        next: 1,
        steps,
        pause: Duration::from_millis(millis),
    }))
}

struct SleepSteps {
    next: u64,
    steps: u64,
    pause: Duration,
}

#[async_trait]
impl CommandRoutine for SleepSteps {
    async fn resume(&mut self) -> Result<Step, CommandError> {
        tokio::time::sleep(self.pause).await;
        let current = self.next;
        self.next += 1;
        if current < self.steps {
            Ok(Step::emit(current))
        } else {
            Ok(Step::done(current))
        }
    }
}
