//! Lineage accumulation: fold decoded audit records into a deduplicated set
//! of "source feeds destination" table edges.

use crate::auditlog::{AuditRecord, TableRef};
use crate::config::FilterPolicy;
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct LineageEdge {
    pub source: TableRef,
    pub destination: TableRef,
}

impl LineageEdge {
    pub fn new(source: TableRef, destination: TableRef) -> Self {
        Self {
            source,
            destination,
        }
    }
}

/// Ordered so that graph construction and rendering are deterministic.
pub type EdgeSet = BTreeSet<LineageEdge>;

/// What a single `update` did with a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    NoJobEvent,
    ExcludedPrincipal,
    NoDestination,
    ExcludedDestination,
    /// `added` counts edges that were not already in the set.
    Absorbed { added: usize },
}

/// Per-run counters, logged once the batch is done.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub records: usize,
    pub malformed: usize,
    pub no_job_event: usize,
    pub excluded_principal: usize,
    pub no_destination: usize,
    pub excluded_destination: usize,
    pub absorbed: usize,
    pub edges_added: usize,
}

impl RunSummary {
    pub fn record(&mut self, outcome: UpdateOutcome) {
        self.records += 1;
        match outcome {
            UpdateOutcome::NoJobEvent => self.no_job_event += 1,
            UpdateOutcome::ExcludedPrincipal => self.excluded_principal += 1,
            UpdateOutcome::NoDestination => self.no_destination += 1,
            UpdateOutcome::ExcludedDestination => self.excluded_destination += 1,
            UpdateOutcome::Absorbed { added } => {
                self.absorbed += 1;
                self.edges_added += added;
            }
        }
    }
}

/// Owns the edge set for one run.
#[derive(Debug)]
pub struct LineageBuilder<'a> {
    policy: &'a FilterPolicy,
    edges: EdgeSet,
}

impl<'a> LineageBuilder<'a> {
    pub fn new(policy: &'a FilterPolicy) -> Self {
        Self {
            policy,
            edges: EdgeSet::new(),
        }
    }

    /// Extend the edge set with the lineage carried by one record.
    ///
    /// Order of checks:
    /// 1) records without a job event carry nothing
    /// 2) an excluded principal drops the whole record
    /// 3) a job without a concrete destination yields nothing
    /// 4) an excluded destination drops every edge into it
    /// 5) each referenced table/view with a value and not excluded feeds the destination
    pub fn update(&mut self, record: &AuditRecord) -> UpdateOutcome {
        let Some(event) = &record.job_event else {
            return UpdateOutcome::NoJobEvent;
        };

        let principal = &record.auth_info.principal_email;
        if self.policy.is_excluded_principal(principal) {
            debug!(principal = %principal, "skip record of excluded principal");
            return UpdateOutcome::ExcludedPrincipal;
        }

        let destination = event.destination_table();
        if !destination.has_value() {
            return UpdateOutcome::NoDestination;
        }
        if self.policy.is_excluded_table(destination) {
            debug!(destination = %destination, "skip record writing to excluded table");
            return UpdateOutcome::ExcludedDestination;
        }

        let mut added = 0;
        for source in event.sources() {
            if !source.has_value() {
                continue;
            }
            if self.policy.is_excluded_table(source) {
                debug!(source = %source, destination = %destination, "skip excluded source");
                continue;
            }
            if self
                .edges
                .insert(LineageEdge::new(source.clone(), destination.clone()))
            {
                added += 1;
            }
        }
        UpdateOutcome::Absorbed { added }
    }

    pub fn edges(&self) -> &EdgeSet {
        &self.edges
    }

    pub fn into_edges(self) -> EdgeSet {
        self.edges
    }
}
