//! Execution state of a running term, including break/continue/return.
//!
//! Loop control travels upward through the term tree as depths: `break 2`
//! sets `break_depth = 2` on the term running the builtin, every parent
//! absorbs it from its child, and each enclosing loop takes off one level.

/// Per-node execution state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecState {
    /// Set exactly once, by the driver, when the node exits.
    pub exit_code: Option<i32>,
    /// Status the node's semantics wants reported on exit.
    pub pending: Option<i32>,
    /// Enclosing loops still to break out of.
    pub break_depth: u32,
    /// Enclosing loops to skip to the next iteration of.
    pub continue_depth: u32,
    /// Set while a function return is in flight.
    pub return_code: Option<i32>,
    /// The node exited through a domain error.
    pub errored: bool,
}

/// What a loop does after a guard or body run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopStep {
    /// Carry on with the iteration.
    Proceed,
    /// Start the next iteration (`continue` consumed here).
    Restart,
    /// Leave the loop.
    Stop,
}

impl ExecState {
    pub fn has_breakers(&self) -> bool {
        self.break_depth > 0 || self.continue_depth > 0 || self.return_code.is_some()
    }

    /// Take over a child's in-flight loop control.
    ///
    /// Break wins over continue when both are raised.
    pub fn absorb(&mut self, child: &ExecState) {
        if child.break_depth > 0 {
            self.break_depth = self.break_depth.max(child.break_depth);
            self.continue_depth = 0;
        } else if child.continue_depth > 0 && self.break_depth == 0 {
            self.continue_depth = self.continue_depth.max(child.continue_depth);
        }
        if child.return_code.is_some() {
            self.return_code = child.return_code;
        }
    }

    pub fn clear_breakers(&mut self) {
        self.break_depth = 0;
        self.continue_depth = 0;
        self.return_code = None;
    }

    /// Apply loop semantics after a guard or body has run and its state
    /// has been absorbed into this (the loop's) state.
    ///
    /// `break n` and `continue n` for `n > 1` lose one level and propagate
    /// to the enclosing loop; `continue 1` is consumed here; a return is
    /// left for the function boundary.
    pub fn loop_step(&mut self) -> LoopStep {
        if self.return_code.is_some() {
            self.break_depth = 0;
            self.continue_depth = 0;
            return LoopStep::Stop;
        }
        if self.break_depth > 0 {
            self.break_depth -= 1;
            self.continue_depth = 0;
            return LoopStep::Stop;
        }
        match self.continue_depth {
            0 => LoopStep::Proceed,
            1 => {
                self.continue_depth = 0;
                LoopStep::Restart
            }
            _ => {
                self.continue_depth -= 1;
                LoopStep::Stop
            }
        }
    }

    /// A function boundary: consume a return into the call's status and
    /// drop any break/continue that escaped the body.
    pub fn finish_call(&mut self, body_status: i32) -> i32 {
        let status = self.return_code.unwrap_or(body_status);
        self.clear_breakers();
        status
    }

    /// Status reported when the node exits without an explicit code.
    pub fn status(&self) -> i32 {
        self.exit_code.or(self.pending).unwrap_or(0)
    }
}
