use momo_reconciler::{
    db_types::{ManualResolution, NotificationLogEntry, PaymentBuffer},
    helpers::CurrencyGrammar,
    ProcessingOutcome,
};
use prettytable::{
    format::{LinePosition, LineSeparator, TableFormat},
    row,
    Table,
};

fn markdown_format() -> TableFormat {
    prettytable::format::FormatBuilder::new()
        .column_separator('|')
        .borders('|')
        .separator(LinePosition::Title, LineSeparator::new('-', '|', '|', '|'))
        .padding(1, 1)
        .build()
}

fn markdown_style(table: &mut Table) {
    table.set_format(markdown_format());
}

fn opt<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Keeps notification text to one short line
fn snippet(text: &str) -> String {
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if text.chars().count() > 48 {
        format!("{}…", text.chars().take(47).collect::<String>())
    } else {
        text
    }
}

pub fn format_outcome(outcome: &ProcessingOutcome, grammar: &CurrencyGrammar) -> String {
    let summary = match outcome {
        ProcessingOutcome::Matched { buffer, .. } => {
            format!("Matched. Buffer #{} verified; order {} is paid.", buffer.id, buffer.order_id)
        },
        ProcessingOutcome::Ambiguous { candidate_buffer_ids, .. } => {
            let ids = candidate_buffer_ids.iter().map(|id| format!("#{id}")).collect::<Vec<_>>().join(", ");
            format!("Ambiguous. Any of buffers {ids} could be the target. Nothing was changed.")
        },
        ProcessingOutcome::Unmatched { .. } => "Unmatched. No buffer is waiting for this payment.".to_string(),
        ProcessingOutcome::Invalid { reason, .. } => format!("Invalid. {reason}"),
        ProcessingOutcome::Duplicate { original } => {
            format!("Duplicate. This notification was already processed as log entry #{}.", original.id)
        },
    };
    format!("{summary}\n{}", format_log_entries(std::slice::from_ref(outcome.log_entry()), grammar))
}

pub fn format_buffers(buffers: &[PaymentBuffer], grammar: &CurrencyGrammar) -> String {
    if buffers.is_empty() {
        return "No payment buffers".to_string();
    }
    let mut table = Table::new();
    table.set_titles(row!["ID", "Order", "Amount", "Reference", "Sender", "Verified at", "Eligible", "Created at"]);
    buffers.iter().for_each(|b| {
        table.add_row(row![
            b.id,
            b.order_id,
            grammar.format(b.expected_amount),
            opt(b.transaction_id.as_ref()),
            opt(b.sender_name.as_ref()),
            opt(b.verified_at.map(|t| t.format("%Y-%m-%d %H:%M:%S"))),
            if b.eligible { "yes" } else { "no" },
            b.created_at.format("%Y-%m-%d %H:%M:%S"),
        ]);
    });
    markdown_style(&mut table);
    table.to_string()
}

pub fn format_log_entries(entries: &[NotificationLogEntry], grammar: &CurrencyGrammar) -> String {
    if entries.is_empty() {
        return "No log entries".to_string();
    }
    let mut table = Table::new();
    table.set_titles(row!["ID", "Received at", "Status", "Amount", "Reference", "Sender", "Buffer", "Order", "Text"]);
    entries.iter().for_each(|e| {
        let buffers = match (e.buffer_id, e.candidate_buffer_ids.as_slice()) {
            (Some(id), _) => id.to_string(),
            (None, ids) => ids.iter().map(|id| id.to_string()).collect::<Vec<_>>().join(","),
        };
        table.add_row(row![
            e.id,
            e.received_at.format("%Y-%m-%d %H:%M:%S"),
            e.status,
            opt(e.extracted_amount.map(|a| grammar.format(a))),
            opt(e.transaction_id.as_ref()),
            opt(e.sender_name.as_ref()),
            buffers,
            opt(e.matched_order_id.as_ref()),
            snippet(&e.message_content),
        ]);
    });
    markdown_style(&mut table);
    table.to_string()
}

pub fn format_resolution(resolution: &ManualResolution) -> String {
    let mut table = Table::new();
    table.set_titles(row!["ID", "Log entry", "Buffer", "Order", "Operator", "Note", "Created at"]);
    table.add_row(row![
        resolution.id,
        resolution.log_entry_id,
        resolution.buffer_id,
        resolution.order_id,
        resolution.operator,
        opt(resolution.note.as_ref()),
        resolution.created_at.format("%Y-%m-%d %H:%M:%S"),
    ]);
    markdown_style(&mut table);
    table.to_string()
}
