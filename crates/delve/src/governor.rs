//! Resource governor: time, memory, depth, and call budgets
//!
//! One governor lives inside each dump session. `healthy()` is the single
//! gate the walker consults before doing work; it is *sticky*: once a
//! budget trips, every later check answers unhealthy for the rest of the
//! run, even if the originating condition would look fine again. Re-checking
//! a recovered condition mid-render would flap between styles of output,
//! which is worse than finishing degraded.
//!
//! Tripping also raises a process-wide disable flag so independent dump
//! requests in the same process do not repeat the same expensive failure.
//! The host can query it via [`dumper_disabled`] and clear it with
//! [`enable_dumper`] once the resource situation has been dealt with.
//!
//! None of these operations panic or return `Err`: everything degrades to
//! "not healthy" / "at limit" and lets the walker substitute a terminal
//! fragment.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::config::DumpConfig;
use crate::memory;

// Process-wide kill switch, raised by the first trip in any run
static DUMPER_DISABLED: AtomicBool = AtomicBool::new(false);

/// True once any governor in this process has tripped
pub fn dumper_disabled() -> bool {
    DUMPER_DISABLED.load(Ordering::Relaxed)
}

/// Raise the process-wide disable flag
pub fn disable_dumper() {
    DUMPER_DISABLED.store(true, Ordering::Relaxed);
}

/// Clear the process-wide disable flag (host decision, never automatic)
pub fn enable_dumper() {
    DUMPER_DISABLED.store(false, Ordering::Relaxed);
}

/// Outcome of one call-budget check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallVerdict {
    /// Within budget
    Proceed,
    /// Within budget, but this is the next-to-last allowed call; the
    /// caller should emit its one-time warning now
    LastCall,
    /// Budget exhausted; substitute a terminal placeholder
    Refuse,
}

/// Per-run budget tracker
#[derive(Debug)]
pub struct ResourceGovernor {
    started: Instant,
    max_runtime: Duration,
    memory_floor: u64,
    max_nesting: u32,
    max_calls: u64,
    nesting: u32,
    calls: u64,
    tripped: bool,
    call_warning_issued: bool,
}

impl ResourceGovernor {
    pub fn new(config: &DumpConfig) -> Self {
        Self {
            started: Instant::now(),
            max_runtime: Duration::from_secs(config.max_runtime_secs),
            memory_floor: config.memory_left_bytes,
            max_nesting: config.max_nesting_level,
            max_calls: config.max_call_count,
            nesting: 0,
            calls: 0,
            tripped: false,
            call_warning_issued: false,
        }
    }

    /// Reset for a new top-level dump: fresh clock, clean counters
    pub fn start_run(&mut self) {
        self.started = Instant::now();
        self.nesting = 0;
        self.calls = 0;
        self.tripped = false;
        self.call_warning_issued = false;
    }

    /// Single health gate consulted before any per-node work.
    ///
    /// Sticky: permanently false once tripped. Otherwise checks elapsed
    /// time first, then memory headroom (when discoverable).
    pub fn healthy(&mut self) -> bool {
        if self.tripped {
            return false;
        }
        if !self.max_runtime.is_zero() && self.started.elapsed() >= self.max_runtime {
            self.trip("runtime budget exhausted");
            return false;
        }
        if self.memory_floor > 0 {
            if let Some(headroom) = memory::headroom_bytes() {
                if headroom < self.memory_floor {
                    self.trip("memory headroom below configured floor");
                    return false;
                }
            }
        }
        true
    }

    /// True once any budget has tripped this run
    pub fn tripped(&self) -> bool {
        self.tripped
    }

    /// Enter one nesting level; must be paired with [`exit_nesting`]
    ///
    /// [`exit_nesting`]: ResourceGovernor::exit_nesting
    pub fn enter_nesting(&mut self) {
        self.nesting += 1;
    }

    /// Leave one nesting level
    pub fn exit_nesting(&mut self) {
        self.nesting = self.nesting.saturating_sub(1);
    }

    /// Current nesting level (root = 0)
    pub fn nesting_level(&self) -> u32 {
        self.nesting
    }

    /// Whether expansion must stop at the current level.
    ///
    /// Containers count one level deeper than the level at which they are
    /// reached, so a container reached at level `max + 1` is terminal
    /// while scalars at that level still render (their parent was allowed
    /// to expand to it).
    pub fn at_depth_limit(&self, is_container: bool) -> bool {
        if self.max_nesting == 0 {
            return false;
        }
        let effective = self.nesting + u32::from(is_container);
        effective > self.max_nesting + 1
    }

    /// Count one node visit against the call budget.
    ///
    /// Returns [`CallVerdict::LastCall`] exactly once, at the next-to-last
    /// allowed call, and [`CallVerdict::Refuse`] from the maximum onward.
    pub fn check_call_budget(&mut self) -> CallVerdict {
        if self.max_calls == 0 {
            return CallVerdict::Proceed;
        }
        self.calls += 1;
        if self.calls >= self.max_calls {
            CallVerdict::Refuse
        } else if self.calls + 1 == self.max_calls && !self.call_warning_issued {
            self.call_warning_issued = true;
            CallVerdict::LastCall
        } else {
            CallVerdict::Proceed
        }
    }

    /// Trip this run and disable the dumper process-wide
    pub(crate) fn trip(&mut self, reason: &str) {
        self.tripped = true;
        disable_dumper();
        tracing::warn!("resource governor tripped ({reason}); dumper disabled for this process");
    }
}
