use std::{io::Read, path::Path};

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use log::*;
use momo_common::MinorUnits;
use momo_reconciler::{
    db_types::{NewPaymentBuffer, OrderId},
    events::EventProducers,
    AdminApi,
    InboundNotification,
    LogQueryFilter,
    ProcessingOutcome,
    ReconciliationApi,
    ReconciliationConfig,
    SqliteDatabase,
};
use sqlx::{migrate::MigrateDatabase, Sqlite};

use crate::{
    command_def::{BufferCommand, Command, LinkParams, LogsParams, ProcessParams},
    formatting::{format_buffers, format_log_entries, format_outcome, format_resolution},
};

struct Apis {
    api: ReconciliationApi<SqliteDatabase>,
    admin: AdminApi<SqliteDatabase>,
}

pub async fn handle_command(command: Command) -> Result<()> {
    let config = ReconciliationConfig::from_env_or_default();
    let apis = connect(&config).await?;
    match command {
        Command::Process(params) => process(&apis, params).await,
        Command::Buffer(cmd) => match cmd {
            BufferCommand::New { order_id, amount, transaction_id, sender_name } => {
                new_buffer(&apis, order_id, amount, transaction_id, sender_name).await
            },
            BufferCommand::Cancel { order_id } => cancel_order(&apis, order_id).await,
            BufferCommand::Show { order_id } => show_buffers(&apis, order_id).await,
        },
        Command::Logs(params) => logs(&apis, params).await,
        Command::Unresolved => unresolved(&apis).await,
        Command::Link(params) => link(&apis, params).await,
    }
}

/// Opens the database named in the configuration, creating and migrating it if necessary.
async fn connect(config: &ReconciliationConfig) -> Result<Apis> {
    let url = config.database_url.as_str();
    if !Sqlite::database_exists(url).await.unwrap_or(false) {
        if let Some(dir) = url.strip_prefix("sqlite://").and_then(|p| Path::new(p).parent()) {
            std::fs::create_dir_all(dir).with_context(|| format!("Could not create {}", dir.display()))?;
        }
        Sqlite::create_database(url).await.with_context(|| format!("Could not create database {url}"))?;
        info!("🛠️ Created database {url}");
    }
    let db = SqliteDatabase::new_with_url(url, 1).await?;
    db.migrate().await?;
    debug!("🛠️ Database {url} is ready");
    let api = ReconciliationApi::new(db.clone(), config, EventProducers::default())?;
    let admin = AdminApi::new(db, EventProducers::default());
    Ok(Apis { api, admin })
}

async fn process(apis: &Apis, params: ProcessParams) -> Result<()> {
    let raw_text = match (params.text, params.file) {
        (Some(text), _) => text,
        (None, Some(path)) => {
            std::fs::read_to_string(&path).with_context(|| format!("Could not read {}", path.display()))?
        },
        (None, None) => {
            let mut text = String::new();
            std::io::stdin().read_to_string(&mut text).context("Could not read the notification from stdin")?;
            text
        },
    };
    let raw_text = raw_text.trim();
    if raw_text.is_empty() {
        return Err(anyhow!("The notification is empty"));
    }
    let received_at = params.received_at.unwrap_or_else(Utc::now);
    let mut notification = InboundNotification::new(raw_text, received_at);
    if let Some(sender) = params.sender {
        notification = notification.with_sender(sender);
    }
    let outcome = apis.api.process_inbound(notification).await?;
    println!("{}", format_outcome(&outcome, apis.api.extractor().grammar()));
    if let ProcessingOutcome::Ambiguous { log_entry, .. } = &outcome {
        println!("Use `momotools link --entry {} --buffer <ID> --operator <NAME>` to resolve it.", log_entry.id);
    }
    Ok(())
}

async fn new_buffer(
    apis: &Apis,
    order_id: OrderId,
    amount: i64,
    transaction_id: Option<String>,
    sender_name: Option<String>,
) -> Result<()> {
    let mut buffer = NewPaymentBuffer::new(order_id, MinorUnits::from(amount));
    buffer.transaction_id = transaction_id;
    buffer.sender_name = sender_name;
    let buffer = apis.api.create_buffer(buffer).await?;
    println!("{}", format_buffers(&[buffer], apis.api.extractor().grammar()));
    Ok(())
}

async fn cancel_order(apis: &Apis, order_id: OrderId) -> Result<()> {
    let annulled = apis.api.cancel_order(&order_id).await?;
    if annulled.is_empty() {
        println!("Order {order_id} has no unverified buffers. Nothing changed.");
    } else {
        println!("{} buffers of order {order_id} are no longer eligible for matching", annulled.len());
        println!("{}", format_buffers(&annulled, apis.api.extractor().grammar()));
    }
    Ok(())
}

async fn show_buffers(apis: &Apis, order_id: OrderId) -> Result<()> {
    let buffers = apis.api.buffers_for_order(&order_id).await?;
    println!("{}", format_buffers(&buffers, apis.api.extractor().grammar()));
    Ok(())
}

async fn logs(apis: &Apis, params: LogsParams) -> Result<()> {
    let filter = LogQueryFilter {
        statuses: params.statuses,
        buffer_id: params.buffer_id,
        since: params.since,
        until: params.until,
        limit: Some(params.limit),
    };
    let entries = apis.admin.fetch_log_entries(filter).await?;
    if params.json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else {
        println!("{}", format_log_entries(&entries, apis.api.extractor().grammar()));
    }
    Ok(())
}

async fn unresolved(apis: &Apis) -> Result<()> {
    let entries = apis.admin.unresolved_entries().await?;
    println!("{} notifications are waiting for an operator", entries.len());
    println!("{}", format_log_entries(&entries, apis.api.extractor().grammar()));
    Ok(())
}

async fn link(apis: &Apis, params: LinkParams) -> Result<()> {
    let LinkParams { log_entry_id, buffer_id, operator, note } = params;
    let (resolution, buffer) = apis.admin.link_entry_to_buffer(log_entry_id, buffer_id, &operator, note).await?;
    println!("{}", format_resolution(&resolution));
    println!("{}", format_buffers(&[buffer], apis.api.extractor().grammar()));
    Ok(())
}
