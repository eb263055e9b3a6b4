use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::{Args, Subcommand};
use momo_reconciler::db_types::{NotificationStatus, OrderId};

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Process a notification pasted by hand. The text is read from the argument, a file, or standard input, in
    /// that order of preference.
    Process(ProcessParams),
    #[command(subcommand)]
    /// Create, cancel or inspect the payment buffers of an order
    Buffer(BufferCommand),
    /// Search the audit log, newest entries first
    Logs(LogsParams),
    /// List the notifications that are waiting for an operator
    Unresolved,
    /// Link an unmatched or ambiguous notification to the buffer it paid for
    Link(LinkParams),
}

#[derive(Debug, Args)]
pub struct ProcessParams {
    /// The notification text
    #[arg(index = 1)]
    pub text: Option<String>,
    /// Read the notification text from this file
    #[arg(short = 'f', long = "file", conflicts_with = "text")]
    pub file: Option<PathBuf>,
    /// When the notification arrived (RFC 3339). Defaults to now.
    #[arg(short = 'r', long = "received-at")]
    pub received_at: Option<DateTime<Utc>>,
    /// The originator of the message, e.g. the SMS short code
    #[arg(short = 's', long = "sender")]
    pub sender: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum BufferCommand {
    /// Register a payment that an order is waiting for
    New {
        #[arg(short = 'o', long = "order")]
        order_id: OrderId,
        /// The expected amount, in minor units of the currency
        #[arg(short = 'a', long = "amount")]
        amount: i64,
        /// The transaction reference the customer was given, if any
        #[arg(short = 'r', long = "ref")]
        transaction_id: Option<String>,
        /// The name the payment is expected from, if known
        #[arg(short = 's', long = "sender")]
        sender_name: Option<String>,
    },
    /// Mark the unverified buffers of a cancelled or expired order as ineligible
    Cancel {
        #[arg(short = 'o', long = "order")]
        order_id: OrderId,
    },
    /// Show the buffers of an order
    Show {
        #[arg(short = 'o', long = "order")]
        order_id: OrderId,
    },
}

#[derive(Debug, Args)]
pub struct LogsParams {
    /// Only show entries with this status. May be repeated.
    #[arg(short = 's', long = "status")]
    pub statuses: Vec<NotificationStatus>,
    /// Only show entries that matched this buffer
    #[arg(short = 'b', long = "buffer")]
    pub buffer_id: Option<i64>,
    #[arg(long = "since")]
    pub since: Option<DateTime<Utc>>,
    #[arg(long = "until")]
    pub until: Option<DateTime<Utc>>,
    #[arg(short = 'n', long = "limit", default_value = "50")]
    pub limit: u32,
    /// Print the entries as JSON instead of a table
    #[arg(long = "json")]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct LinkParams {
    #[arg(short = 'e', long = "entry")]
    pub log_entry_id: i64,
    #[arg(short = 'b', long = "buffer")]
    pub buffer_id: i64,
    /// Who is making the link. Recorded in the audit trail.
    #[arg(short = 'o', long = "operator")]
    pub operator: String,
    #[arg(short = 'm', long = "note")]
    pub note: Option<String>,
}
