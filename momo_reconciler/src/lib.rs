//! Mobile-money payment reconciliation engine
//!
//! Customers pay for orders by mobile-money transfer, and the only proof of payment the merchant receives is a
//! free-text notification, typically a bank or wallet SMS. This library turns those notifications into verified
//! payments.
//!
//! The library is divided into these sections:
//! 1. Database management and control ([`mod@db`]). Backends implement the traits in [`db::traits`]; SQLite is the
//!    supported backend. The data types stored in the database are defined in [`db_types`].
//! 2. Extraction ([`helpers`]). A pure, locale-aware parser that pulls the amount, transaction reference and sender
//!    name out of a notification.
//! 3. Matching ([`matcher`]). Decides which expected payment, if any, a notification pays for.
//! 4. The public API ([`ReconciliationApi`] and [`AdminApi`]). The coordinator that ties extraction, matching and
//!    storage together, and the admin surface for audit and manual reconciliation.
//!
//! Fulfilment signals are delivered through [`events`]. Register hooks with [`events::EventHooks`] to be told when a
//! payment is verified or a notification needs a human.
pub mod config;
pub mod db;
pub mod db_types;
pub mod events;
pub mod helpers;
pub mod matcher;
mod recon_api;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

pub use config::ReconciliationConfig;
#[cfg(feature = "sqlite")]
pub use db::sqlite::SqliteDatabase;
pub use db::traits::{
    ClaimResult,
    InsertLogResult,
    LogQueryFilter,
    NewManualResolution,
    NotificationLog,
    PaymentBufferStore,
    ReconciliationDatabase,
    ResolveResult,
    VerifyBufferResult,
};
pub use recon_api::{
    admin_api::AdminApi,
    errors::ReconciliationError,
    reconciliation_api::ReconciliationApi,
    reconciliation_objects::{InboundNotification, ProcessingOutcome},
};
