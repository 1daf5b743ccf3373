//! Dump session: the explicit per-run context
//!
//! One session owns everything that is "global but per-run" in spirit:
//! governor, identity tracker, path builder, chunker, stats. `dump()`
//! starts a fresh run (clock, counters, visit tables), walks the root,
//! and absorbs the rendered fragment; `finish()` streams the whole token
//! stream into the caller's sink and returns the stats.
//!
//! There is no implicit process-exit flushing: the host calls `finish()`.
//! A session dropped without finishing proactively discards any chunks it
//! persisted instead of leaving them for the stale sweep.

use std::io::{self, Write};
use std::time::{Duration, Instant};

use delve_core::Value;

use crate::chunker::{self, OutputChunker};
use crate::config::DumpConfig;
use crate::governor::{self, ResourceGovernor};
use crate::identity::IdentityTracker;
use crate::introspect::{Introspect, ValueIntrospector};
use crate::path::AccessPathBuilder;
use crate::render_text::{Render, TextRenderer};
use crate::report::{self, DumpStats};
use crate::walker::GraphWalker;

/// Default name for a dump root whose variable name is unknown
pub const DEFAULT_ROOT_NAME: &str = "root";

/// Per-run dump context
pub struct DumpSession<I: Introspect, R: Render> {
    config: DumpConfig,
    introspector: I,
    renderer: R,
    governor: ResourceGovernor,
    tracker: IdentityTracker,
    paths: AccessPathBuilder,
    chunker: OutputChunker,
    stats: DumpStats,
    output: String,
    finished: bool,
}

impl DumpSession<ValueIntrospector, TextRenderer> {
    /// Session over the built-in introspector and text renderer
    pub fn new(config: DumpConfig) -> Self {
        Self::with_parts(config, ValueIntrospector, TextRenderer::new())
    }
}

impl<I: Introspect, R: Render> DumpSession<I, R> {
    /// Session with caller-provided introspector and renderer
    pub fn with_parts(config: DumpConfig, introspector: I, renderer: R) -> Self {
        // Reclaim chunks leaked by crashed prior runs; at most once per
        // process
        chunker::sweep_stale_once(
            &config.chunk_dir,
            Duration::from_secs(config.chunk_retention_secs),
        );
        let governor = ResourceGovernor::new(&config);
        let chunker = OutputChunker::new(config.chunk_dir.clone(), config.chunk_threshold);
        Self {
            config,
            introspector,
            renderer,
            governor,
            tracker: IdentityTracker::new(),
            paths: AccessPathBuilder::new(),
            chunker,
            stats: DumpStats::default(),
            output: String::new(),
            finished: false,
        }
    }

    /// Record the scope token of the dump's root variable; enables
    /// access-path generation
    pub fn set_scope(&mut self, token: impl Into<String>) {
        self.paths.set_scope(token);
    }

    /// The root's name is ambiguous at the call site: disable access-path
    /// generation for this dump
    pub fn mark_root_ambiguous(&mut self) {
        self.paths.mark_root_ambiguous();
    }

    /// Stats collected so far
    pub fn stats(&self) -> &DumpStats {
        &self.stats
    }

    /// Dump a root under the default name
    pub fn dump(&mut self, root: &Value) {
        self.dump_named(root, DEFAULT_ROOT_NAME);
    }

    /// Dump a root under the given variable name.
    ///
    /// A disabled dumper (a prior run tripped its governor) produces
    /// nothing at all. Never panics, never fails.
    pub fn dump_named(&mut self, root: &Value, name: &str) {
        if governor::dumper_disabled() {
            return;
        }
        let run_start = Instant::now();
        self.governor.start_run();
        self.paths.reset_counter();

        let fragment = {
            let mut walker = GraphWalker {
                introspector: &self.introspector,
                renderer: &self.renderer,
                governor: &mut self.governor,
                tracker: &mut self.tracker,
                paths: &mut self.paths,
                config: &self.config,
                stats: &mut self.stats,
            };
            walker.walk_root(root, name)
        };
        // Exactly once per dump, on every path out of the walk
        self.tracker.cleanup();

        if let Some(fragment) = fragment {
            let token = self.chunker.absorb(fragment);
            if !self.output.is_empty() {
                self.output.push('\n');
            }
            self.output.push_str(&token);
        }

        self.stats.governor_tripped |= self.governor.tripped();
        self.stats.paths_emitted += self.paths.emitted();
        self.stats.wall_ms += run_start.elapsed().as_millis() as u64;
    }

    /// Stream the accumulated output into `sink` and return the stats.
    ///
    /// Sink errors propagate; everything this session persisted is then
    /// discarded by `Drop` rather than left for the stale sweep.
    pub fn finish<W: Write + ?Sized>(mut self, sink: &mut W) -> io::Result<DumpStats> {
        let output = std::mem::take(&mut self.output);
        self.chunker.flush(&output, sink)?;
        self.finished = true;
        self.stats.chunks_spilled = self.chunker.spilled();
        self.stats.chunk_bytes = self.chunker.spilled_bytes();
        report::emit_if_configured(&self.stats);
        Ok(self.stats.clone())
    }
}

impl<I: Introspect, R: Render> Drop for DumpSession<I, R> {
    fn drop(&mut self) {
        if !self.finished {
            self.chunker.discard_run();
        }
    }
}

/// Dump one value to a string with the built-in introspector/renderer
pub fn dump_to_string(root: &Value, config: &DumpConfig) -> String {
    let mut session = DumpSession::new(config.clone());
    session.dump(root);
    let mut sink = Vec::new();
    match session.finish(&mut sink) {
        Ok(_) => String::from_utf8_lossy(&sink).into_owned(),
        Err(_) => String::new(),
    }
}
