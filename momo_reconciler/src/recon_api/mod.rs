//! The public API of the reconciliation engine.
//!
//! * [`reconciliation_api::ReconciliationApi`] is the coordinator. Ingestion channels hand it notifications, and the
//!   order system uses it to register and cancel the payments it is waiting for.
//! * [`admin_api::AdminApi`] gives support staff read access to the audit log and lets them resolve notifications
//!   by hand.
pub mod admin_api;
pub mod errors;
pub mod reconciliation_api;
pub mod reconciliation_objects;
