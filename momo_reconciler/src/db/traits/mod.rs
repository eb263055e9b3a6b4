//! # Database management and control.
//!
//! This module defines the interface contracts that database *backends* for the reconciliation engine must fulfil.
//!
//! * [`ReconciliationDatabase`] is the base trait. It provides the composite operations that must be atomic, such as
//!   claiming a buffer and writing the audit entry that explains the claim.
//! * [`PaymentBufferStore`] stores the payments that orders expect, and owns the single compare-and-set through which
//!   a buffer becomes verified.
//! * [`NotificationLog`] is the append-only audit log, plus the read access that admin tooling needs.
mod data_objects;
mod notification_log;
mod payment_buffer_store;
mod reconciliation_database;

pub use data_objects::{
    ClaimResult,
    InsertLogResult,
    LogQueryFilter,
    NewManualResolution,
    ResolveResult,
    VerifyBufferResult,
};
pub use notification_log::NotificationLog;
pub use payment_buffer_store::PaymentBufferStore;
pub use reconciliation_database::ReconciliationDatabase;
