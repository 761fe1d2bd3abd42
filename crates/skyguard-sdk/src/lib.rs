//! SkyGuard SDK - client library for the detection service
//!
//! Submits aircraft snapshots and reads back conflicts, advisories and
//! streamed cycle reports.

pub mod client;

pub use client::{ReportStream, SkyguardClient, SnapshotReceipt};
pub use skyguard_core::{AircraftReport, AvoidanceAction, Conflict, CycleReport};
