//! FILENAME: core/pivot-engine/src/session.rs
//! Pivot Session - Orchestrates estimation, approval and computation.
//!
//! States: `Idle -> Estimating -> {AwaitingApproval | Computing} -> {Ready | Error}`.
//!
//! The session owns the only mutable pivot state. Computations run on
//! immutable snapshots handed out as [`ComputeTicket`]s; each ticket carries
//! the generation it was issued for, and an outcome whose generation is no
//! longer current is discarded on [`PivotSession::complete`].

use std::fmt;
use std::sync::Arc;

use log::{debug, error, info, warn};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;
use tokio::task::JoinHandle;

use crate::config::EngineConfig;
use crate::definition::{PivotRequest, RecordSet};
use crate::engine::safe_calculate_pivot;
use crate::error::{PivotError, Result};
use crate::estimate::{estimate_columns, CardinalityEstimate};
use crate::view::PivotResult;

/// Cached results kept per session.
const RESULT_CACHE_CAPACITY: usize = 8;

// ============================================================================
// STATE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", content = "detail", rename_all = "camelCase")]
pub enum ComputeState {
    Idle,
    Estimating,
    /// The estimate exceeded the warning threshold; waiting for a decision.
    AwaitingApproval(CardinalityEstimate),
    Computing,
    Ready,
    /// Human-readable failure message.
    Error(String),
}

impl ComputeState {
    pub fn name(&self) -> &'static str {
        match self {
            ComputeState::Idle => "idle",
            ComputeState::Estimating => "estimating",
            ComputeState::AwaitingApproval(_) => "awaiting-approval",
            ComputeState::Computing => "computing",
            ComputeState::Ready => "ready",
            ComputeState::Error(_) => "error",
        }
    }
}

impl fmt::Display for ComputeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Everything a computed result depends on.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConfigKey {
    pub records_version: u64,
    pub request: PivotRequest,
    pub limit_columns: bool,
}

/// What the caller should do after a session action.
#[derive(Debug)]
pub enum Step {
    /// Nothing to compute.
    Idle,
    /// Present the estimate and call `approve` or `cancel`.
    AwaitingApproval(CardinalityEstimate),
    /// A cached result was reused; the session is `Ready`.
    Ready(Arc<PivotResult>),
    /// Run the ticket, then hand its outcome to `complete`.
    Compute(ComputeTicket),
}

// ============================================================================
// TICKETS
// ============================================================================

/// A self-contained unit of pivot work.
#[derive(Debug, Clone)]
pub struct ComputeTicket {
    generation: u64,
    key: ConfigKey,
    records: Arc<RecordSet>,
    config: Arc<EngineConfig>,
}

impl ComputeTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn key(&self) -> &ConfigKey {
        &self.key
    }

    /// Computes on the current thread.
    pub fn run(self) -> ComputeOutcome {
        let result = safe_calculate_pivot(
            &self.records,
            &self.key.request,
            &self.config,
            self.key.limit_columns,
        );

        ComputeOutcome {
            generation: self.generation,
            key: self.key,
            result: result.map(Arc::new),
        }
    }

    /// Schedules the computation on the tokio blocking pool.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(self) -> JoinHandle<ComputeOutcome> {
        tokio::task::spawn_blocking(move || self.run())
    }
}

/// The result of running a ticket.
#[derive(Debug, Clone)]
pub struct ComputeOutcome {
    pub generation: u64,
    pub key: ConfigKey,
    pub result: Result<Arc<PivotResult>>,
}

// ============================================================================
// SESSION
// ============================================================================

/// One pivot's computation state.
#[derive(Debug)]
pub struct PivotSession {
    records: Arc<RecordSet>,
    records_version: u64,
    config: Arc<EngineConfig>,

    state: ComputeState,
    /// The latest configuration asked for.
    request: PivotRequest,
    /// The last configuration that went on to compute.
    accepted: PivotRequest,
    /// Limiting decision the accepted configuration was computed with.
    accepted_limit: bool,
    result: Option<Arc<PivotResult>>,

    /// Bumped whenever in-flight work is superseded.
    generation: u64,
    approvals: FxHashSet<(u64, PivotRequest)>,
    cache: FxHashMap<ConfigKey, Arc<PivotResult>>,
}

impl PivotSession {
    pub fn new(records: Arc<RecordSet>, config: EngineConfig) -> Self {
        PivotSession {
            records,
            records_version: 0,
            config: Arc::new(config),
            state: ComputeState::Idle,
            request: PivotRequest::default(),
            accepted: PivotRequest::default(),
            accepted_limit: false,
            result: None,
            generation: 0,
            approvals: FxHashSet::default(),
            cache: FxHashMap::default(),
        }
    }

    pub fn state(&self) -> &ComputeState {
        &self.state
    }

    /// The latest requested configuration.
    pub fn request(&self) -> &PivotRequest {
        &self.request
    }

    /// The configuration of the last computation that was started.
    pub fn accepted_request(&self) -> &PivotRequest {
        &self.accepted
    }

    pub fn result(&self) -> Option<&Arc<PivotResult>> {
        self.result.as_ref()
    }

    pub fn records(&self) -> &Arc<RecordSet> {
        &self.records
    }

    pub fn records_version(&self) -> u64 {
        self.records_version
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Replaces the record set and re-evaluates the current configuration.
    pub fn set_records(&mut self, records: Arc<RecordSet>) -> Step {
        self.records = records;
        self.records_version += 1;
        self.cache.clear();
        self.approvals.clear();
        debug!(
            target: "PIVOT",
            "records replaced ({} records, version {})",
            self.records.len(),
            self.records_version
        );
        self.configure(self.request.clone())
    }

    /// Applies a new configuration, superseding any in-flight computation.
    pub fn configure(&mut self, request: PivotRequest) -> Step {
        self.generation += 1;

        if request.is_empty() {
            self.request = request.clone();
            self.accepted = request;
            self.accepted_limit = false;
            self.result = None;
            self.state = ComputeState::Idle;
            return Step::Idle;
        }

        self.state = ComputeState::Estimating;
        let estimate = estimate_columns(
            &self.records,
            &request.column_fields,
            &request.values,
            &self.config,
        );

        if !estimate.should_warn {
            return self.start(request, false);
        }

        if self.approvals.contains(&(self.records_version, request.clone())) {
            debug!(target: "PIVOT", "cardinality warning already approved");
            return self.start(request, true);
        }

        warn!(
            target: "PIVOT",
            "estimated {} columns ({} combinations), awaiting approval",
            estimate.estimated_columns,
            estimate.unique_column_combinations
        );
        self.request = request;
        self.state = ComputeState::AwaitingApproval(estimate);
        Step::AwaitingApproval(estimate)
    }

    /// Proceeds with a warned configuration, limiting its columns.
    pub fn approve(&mut self) -> Result<Step> {
        self.expect_awaiting("approve")?;
        self.generation += 1;
        self.approvals.insert((self.records_version, self.request.clone()));
        Ok(self.start(self.request.clone(), true))
    }

    /// Declines a warned configuration and returns to the last accepted one.
    ///
    /// The accepted configuration is reissued: served from the cache when its
    /// result is still there, otherwise as a new ticket, since any computation
    /// still in flight for it was superseded by the warned request.
    pub fn cancel(&mut self) -> Result<Step> {
        self.expect_awaiting("cancel")?;
        self.generation += 1;
        self.state = ComputeState::Idle;
        info!(target: "PIVOT", "cardinality warning declined, configuration reverted");

        let accepted = self.accepted.clone();
        if accepted.is_empty() {
            self.request = accepted;
            return Ok(Step::Idle);
        }
        Ok(self.start(accepted, self.accepted_limit))
    }

    /// Applies a finished computation. Returns false when the outcome was
    /// superseded and discarded.
    pub fn complete(&mut self, outcome: ComputeOutcome) -> bool {
        if outcome.generation != self.generation || self.state != ComputeState::Computing {
            warn!(
                target: "PIVOT",
                "discarding stale pivot result (generation {}, current {})",
                outcome.generation,
                self.generation
            );
            return false;
        }

        match outcome.result {
            Ok(result) => {
                if self.cache.len() >= RESULT_CACHE_CAPACITY {
                    self.cache.clear();
                }
                self.cache.insert(outcome.key, Arc::clone(&result));
                self.result = Some(result);
                self.state = ComputeState::Ready;
            }
            Err(e) => {
                error!(target: "PIVOT", "{}", e);
                self.result = None;
                self.state = ComputeState::Error(e.to_string());
            }
        }
        true
    }

    fn expect_awaiting(&self, action: &'static str) -> Result<()> {
        match self.state {
            ComputeState::AwaitingApproval(_) => Ok(()),
            _ => Err(PivotError::InvalidTransition {
                state: self.state.name(),
                action,
            }),
        }
    }

    fn start(&mut self, request: PivotRequest, limit_columns: bool) -> Step {
        let key = ConfigKey {
            records_version: self.records_version,
            request: request.clone(),
            limit_columns,
        };
        self.request = request.clone();
        self.accepted = request;
        self.accepted_limit = limit_columns;

        if let Some(cached) = self.cache.get(&key) {
            debug!(target: "PIVOT", "reusing cached pivot result");
            self.result = Some(Arc::clone(cached));
            self.state = ComputeState::Ready;
            return Step::Ready(Arc::clone(cached));
        }

        self.state = ComputeState::Computing;
        Step::Compute(ComputeTicket {
            generation: self.generation,
            key,
            records: Arc::clone(&self.records),
            config: Arc::clone(&self.config),
        })
    }
}
