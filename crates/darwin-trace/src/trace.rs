//! The trace: an append-only, randomly indexable generation log.

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use darwin_types::{GenerationRecord, TraceId, TraceRecord, VariationId};

use crate::TraceError;

/// Error type produced by a [`GenerationSink`].
pub type SinkError = Box<dyn std::error::Error + Send + Sync>;

/// Durable storage for generation records.
///
/// A trace calls the sink before the record becomes visible in memory;
/// if the sink fails the trace is left unchanged.
pub trait GenerationSink: Send + Sync {
    /// Persist one generation of `trace`.
    fn persist_generation(&self, trace: TraceId, record: &GenerationRecord)
    -> Result<(), SinkError>;
}

/// Resolve a signed index against a sequence of length `len`.
///
/// Non-negative indices count from the start, negative ones from the end
/// (`-1` is the last element). Returns `None` outside `[-len, len)`.
pub fn signed_index(index: i64, len: usize) -> Option<usize> {
    let len = i64::try_from(len).ok()?;
    let resolved = if index < 0 {
        index.checked_add(len)?
    } else {
        index
    };
    if (0..len).contains(&resolved) {
        usize::try_from(resolved).ok()
    } else {
        None
    }
}

/// A shared handle to the generation log of one evolution run.
///
/// Cloning the handle shares the log. A sealed trace stays readable for
/// as long as any handle exists.
#[derive(Clone)]
pub struct Trace {
    inner: Arc<RwLock<TraceState>>,
}

struct TraceState {
    record: TraceRecord,
    generations: Vec<Arc<GenerationRecord>>,
    sink: Option<Arc<dyn GenerationSink>>,
}

impl std::fmt::Debug for Trace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.read();
        f.debug_struct("Trace")
            .field("id", &state.record.id)
            .field("variation_id", &state.record.variation_id)
            .field("len", &state.generations.len())
            .field("open", &state.sink.is_some())
            .finish()
    }
}

impl Trace {
    /// Open a new, empty trace that persists appends through `sink`.
    pub fn open(record: TraceRecord, sink: Arc<dyn GenerationSink>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(TraceState {
                record,
                generations: Vec::new(),
                sink: Some(sink),
            })),
        }
    }

    /// Rebuild a sealed, read-only trace from persisted generations.
    ///
    /// The generations must be ordered and contiguous from zero.
    pub fn sealed(
        record: TraceRecord,
        generations: Vec<GenerationRecord>,
    ) -> Result<Self, TraceError> {
        for (expected, generation) in generations.iter().enumerate() {
            if generation.generation != expected {
                return Err(TraceError::NonContiguous {
                    expected,
                    actual: generation.generation,
                });
            }
        }
        Ok(Self {
            inner: Arc::new(RwLock::new(TraceState {
                record,
                generations: generations.into_iter().map(Arc::new).collect(),
                sink: None,
            })),
        })
    }

    /// Row id of the trace.
    pub fn id(&self) -> TraceId {
        self.read().record.id
    }

    /// The variation this run was started from.
    pub fn variation_id(&self) -> VariationId {
        self.read().record.variation_id
    }

    /// A copy of the trace's persisted record.
    pub fn record(&self) -> TraceRecord {
        self.read().record.clone()
    }

    /// Number of generations recorded so far.
    pub fn len(&self) -> usize {
        self.read().generations.len()
    }

    /// Whether no generation has been recorded.
    pub fn is_empty(&self) -> bool {
        self.read().generations.is_empty()
    }

    /// Whether the trace still accepts appends.
    pub fn is_open(&self) -> bool {
        self.read().sink.is_some()
    }

    /// Generation at a signed index.
    pub fn get(&self, index: i64) -> Result<Arc<GenerationRecord>, TraceError> {
        let state = self.read();
        let len = state.generations.len();
        signed_index(index, len)
            .and_then(|i| state.generations.get(i))
            .cloned()
            .ok_or(TraceError::IndexOutOfRange { index, len })
    }

    /// The most recent generation.
    pub fn last(&self) -> Option<Arc<GenerationRecord>> {
        self.read().generations.last().cloned()
    }

    /// Every generation, in order.
    pub fn generations(&self) -> Vec<Arc<GenerationRecord>> {
        self.read().generations.clone()
    }

    /// Append the next generation.
    ///
    /// The record must carry the next contiguous index. It is persisted
    /// through the sink first and only then becomes visible.
    pub fn append(&self, record: GenerationRecord) -> Result<Arc<GenerationRecord>, TraceError> {
        let mut state = self.write();
        let trace = state.record.id;
        let sink = state
            .sink
            .clone()
            .ok_or(TraceError::Sealed { trace })?;

        let expected = state.generations.len();
        if record.generation != expected {
            return Err(TraceError::NonContiguous {
                expected,
                actual: record.generation,
            });
        }

        sink.persist_generation(trace, &record)
            .map_err(|source| TraceError::Sink {
                trace,
                generation: record.generation,
                source,
            })?;

        tracing::debug!(
            trace_id = %trace,
            generation = record.generation,
            best_fitness = record.summary.best_fitness,
            "Appended generation"
        );

        let record = Arc::new(record);
        state.generations.push(Arc::clone(&record));
        Ok(record)
    }

    /// Stop accepting appends. Returns `false` if already sealed.
    pub fn seal(&self) -> bool {
        let mut state = self.write();
        let was_open = state.sink.take().is_some();
        if was_open {
            tracing::info!(
                trace_id = %state.record.id,
                generations = state.generations.len(),
                "Sealed trace"
            );
        }
        was_open
    }

    fn read(&self) -> RwLockReadGuard<'_, TraceState> {
        self.inner.read().unwrap_or_else(|poisoned| {
            tracing::warn!("Recovered poisoned trace lock");
            poisoned.into_inner()
        })
    }

    fn write(&self) -> RwLockWriteGuard<'_, TraceState> {
        self.inner.write().unwrap_or_else(|poisoned| {
            tracing::warn!("Recovered poisoned trace lock");
            poisoned.into_inner()
        })
    }
}
