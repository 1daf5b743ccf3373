//! Output chunker: bound peak memory during final emission
//!
//! Rendered fragments above a size threshold are persisted to chunk
//! storage (a directory of `{key}.tmp` files) and replaced in-band by a
//! short marker token. At flush time the token stream is scanned, each
//! marker is substituted by streaming its chunk file straight into the
//! sink, and the file is deleted — write-once, read-once, at most one
//! open chunk in memory at a time.
//!
//! Keys are `{run_id}-{seq}` with a fresh UUID per run, so concurrent
//! runs share the storage directory without coordination. Only markers
//! carrying *this* run's id are treated as chunk references; anything
//! else marker-shaped passes through verbatim, which keeps
//! `flush(absorb(x)) == x` for arbitrary input.
//!
//! Chunking is purely an optimization: storage failures degrade to
//! keeping the fragment in memory (on absorb) or an inline note (on
//! flush), never to a failed dump.

use std::fmt;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Once;
use std::time::{Duration, SystemTime};

use uuid::Uuid;

/// Delimiter for in-band marker tokens (SUB control character)
pub const CHUNK_MARK: char = '\u{1A}';

const MARK_PREFIX: &str = "chunk:";

/// Error talking to chunk storage
#[derive(Debug)]
pub enum StorageError {
    /// Persisting a chunk failed
    Write { key: String, source: io::Error },
    /// Reading a chunk back failed
    Read { key: String, source: io::Error },
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::Write { key, source } => {
                write!(f, "failed to write chunk {key}: {source}")
            }
            StorageError::Read { key, source } => {
                write!(f, "failed to read chunk {key}: {source}")
            }
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StorageError::Write { source, .. } => Some(source),
            StorageError::Read { source, .. } => Some(source),
        }
    }
}

/// Per-run output chunker
#[derive(Debug)]
pub struct OutputChunker {
    dir: PathBuf,
    threshold: usize,
    run_id: String,
    next_seq: u64,
    spilled: u64,
    spilled_bytes: u64,
    dir_ready: bool,
}

impl OutputChunker {
    /// Create a chunker with a fresh run namespace.
    /// A zero threshold disables spilling entirely.
    pub fn new(dir: impl Into<PathBuf>, threshold: usize) -> Self {
        Self {
            dir: dir.into(),
            threshold,
            run_id: Uuid::new_v4().simple().to_string(),
            next_seq: 0,
            spilled: 0,
            spilled_bytes: 0,
            dir_ready: false,
        }
    }

    /// This run's storage namespace prefix
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Number of fragments spilled so far
    pub fn spilled(&self) -> u64 {
        self.spilled
    }

    /// Total bytes spilled so far
    pub fn spilled_bytes(&self) -> u64 {
        self.spilled_bytes
    }

    /// Pass small fragments through; persist large ones and return the
    /// marker token instead. A storage failure keeps the fragment in
    /// memory — worse for peak memory, never wrong.
    pub fn absorb(&mut self, text: String) -> String {
        if self.threshold == 0 || text.len() <= self.threshold {
            return text;
        }
        let key = format!("{}-{}", self.run_id, self.next_seq);
        match self.store(&key, text.as_bytes()) {
            Ok(()) => {
                self.next_seq += 1;
                self.spilled += 1;
                self.spilled_bytes += text.len() as u64;
                tracing::debug!("spilled {} bytes to chunk {key}", text.len());
                format!("{CHUNK_MARK}{MARK_PREFIX}{key}{CHUNK_MARK}")
            }
            Err(err) => {
                tracing::warn!("{err}; keeping fragment in memory");
                text
            }
        }
    }

    /// Stream the token stream into `sink`, substituting each of this
    /// run's markers with its chunk's bytes and deleting the chunk.
    ///
    /// Sink errors propagate; storage errors degrade to an inline note.
    pub fn flush<W: Write + ?Sized>(&mut self, text: &str, sink: &mut W) -> io::Result<()> {
        let mark_len = CHUNK_MARK.len_utf8();
        let mut rest = text;
        while let Some(start) = rest.find(CHUNK_MARK) {
            sink.write_all(rest[..start].as_bytes())?;
            let token_start = start + mark_len;
            match rest[token_start..].find(CHUNK_MARK) {
                Some(token_len) => {
                    let token = &rest[token_start..token_start + token_len];
                    let span_end = token_start + token_len + mark_len;
                    match self.own_key(token) {
                        Some(key) => {
                            let key = key.to_string();
                            self.emit_chunk(&key, sink)?;
                        }
                        None => {
                            // Marker-shaped text that is not ours: verbatim
                            sink.write_all(rest[start..span_end].as_bytes())?;
                        }
                    }
                    rest = &rest[span_end..];
                }
                None => {
                    // Unpaired delimiter: verbatim to the end
                    sink.write_all(rest[start..].as_bytes())?;
                    return Ok(());
                }
            }
        }
        sink.write_all(rest.as_bytes())
    }

    /// Delete every chunk persisted by this run. Used when a run aborts
    /// after spilling but before flushing.
    pub fn discard_run(&mut self) {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(_) => return,
        };
        for entry in entries.flatten() {
            let name = entry.file_name();
            if name.to_string_lossy().starts_with(self.run_id.as_str()) {
                let _ = fs::remove_file(entry.path());
            }
        }
    }

    /// Extract the key from a marker token, if it belongs to this run
    fn own_key<'t>(&self, token: &'t str) -> Option<&'t str> {
        let key = token.strip_prefix(MARK_PREFIX)?;
        if key.starts_with(self.run_id.as_str()) {
            Some(key)
        } else {
            None
        }
    }

    /// Stream one chunk into the sink and delete it (read-once)
    fn emit_chunk<W: Write + ?Sized>(&mut self, key: &str, sink: &mut W) -> io::Result<()> {
        let path = self.chunk_path(key);
        match File::open(&path) {
            Ok(mut file) => {
                io::copy(&mut file, sink)?;
                let _ = fs::remove_file(&path);
                Ok(())
            }
            Err(source) => {
                let err = StorageError::Read {
                    key: key.to_string(),
                    source,
                };
                tracing::warn!("{err}");
                write!(sink, "[could not access chunk {key}]")
            }
        }
    }

    fn store(&mut self, key: &str, bytes: &[u8]) -> Result<(), StorageError> {
        if !self.dir_ready {
            fs::create_dir_all(&self.dir).map_err(|source| StorageError::Write {
                key: key.to_string(),
                source,
            })?;
            self.dir_ready = true;
        }
        fs::write(self.chunk_path(key), bytes).map_err(|source| StorageError::Write {
            key: key.to_string(),
            source,
        })
    }

    fn chunk_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.tmp"))
    }
}

// One sweep per process is enough: the sweep exists for chunks leaked by
// *crashed prior* runs, not as a steady-state collector
static STALE_SWEEP: Once = Once::new();

/// Run the stale-chunk sweep at most once per process
pub fn sweep_stale_once(dir: &Path, max_age: Duration) {
    STALE_SWEEP.call_once(|| cleanup_stale(dir, max_age));
}

/// Delete chunk files older than `max_age`. Best-effort: every failure is
/// skipped, nothing is reported.
pub fn cleanup_stale(dir: &Path, max_age: Duration) {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(_) => return,
    };
    let now = SystemTime::now();
    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().map(|ext| ext == "tmp") != Some(true) {
            continue;
        }
        let modified = match entry.metadata().and_then(|m| m.modified()) {
            Ok(modified) => modified,
            Err(_) => continue,
        };
        let expired = now
            .duration_since(modified)
            .map(|age| age > max_age)
            .unwrap_or(false);
        if expired {
            let _ = fs::remove_file(&path);
        }
    }
}
