//! Per-thread record of active invocations.
//!
//! Used for backtraces on errors and for the optional call-depth limit.

use std::cell::RefCell;

use crate::config::RuntimeConfig;
use crate::errors::{stack_overflow, BacktraceFrame, EvalBacktrace, EvalError};

thread_local! {
    static CALL_STACK: RefCell<Vec<String>> = const { RefCell::new(Vec::new()) };
}

/// Keeps a frame on the call stack until dropped.
pub(crate) struct CallGuard {
    depth: usize,
}

impl CallGuard {
    pub(crate) fn enter(desc: &str) -> Result<Self, EvalError> {
        let limit = RuntimeConfig::current().max_call_depth;
        CALL_STACK.with(|stack| {
            let mut stack = stack.borrow_mut();
            if let Some(max) = limit {
                if stack.len() >= max {
                    tracing::debug!(depth = stack.len(), "call depth limit reached");
                    return Err(stack_overflow(max));
                }
            }
            stack.push(desc.to_string());
            Ok(CallGuard { depth: stack.len() })
        })
    }

    /// Attach a backtrace unless a deeper frame already did.
    pub(crate) fn annotate(&self, err: EvalError) -> EvalError {
        if err.backtrace.is_some() {
            return err;
        }
        tracing::trace!(depth = self.depth, error = %err.message, "error left frame");
        err.with_backtrace(capture_backtrace())
    }
}

impl Drop for CallGuard {
    fn drop(&mut self) {
        CALL_STACK.with(|stack| {
            stack.borrow_mut().truncate(self.depth - 1);
        });
    }
}

/// Current stack, innermost frame first, limited to `trace_depth` frames.
pub fn capture_backtrace() -> EvalBacktrace {
    let limit = RuntimeConfig::current().trace_depth;
    CALL_STACK.with(|stack| {
        let frames = stack
            .borrow()
            .iter()
            .rev()
            .take(limit)
            .map(|name| BacktraceFrame { name: name.clone() })
            .collect();
        EvalBacktrace::new(frames)
    })
}

/// Number of active invocations on this thread.
pub fn call_depth() -> usize {
    CALL_STACK.with(|stack| stack.borrow().len())
}
