use chrono::Utc;
use cucumber::{given, then, when};
use momo_reconciler::{
    db_types::{MinorUnits, NewPaymentBuffer, NotificationStatus, OrderId},
    PaymentBufferStore,
    ProcessingOutcome,
};

use crate::cucumber::ReconciliationWorld;

#[given(expr = "buffer {word} for order {word} expecting {int}")]
async fn create_buffer(world: &mut ReconciliationWorld, name: String, order_id: String, amount: i64) {
    let buffer = NewPaymentBuffer::new(OrderId::from(order_id), MinorUnits::from(amount));
    let buffer = world.api().create_buffer(buffer).await.expect("Error creating buffer");
    world.buffers.insert(name, buffer.id);
}

#[given(expr = "buffer {word} for order {word} expecting {int} with reference {word}")]
async fn create_buffer_with_ref(world: &mut ReconciliationWorld, name: String, order_id: String, amount: i64, txid: String) {
    let buffer = NewPaymentBuffer::new(OrderId::from(order_id), MinorUnits::from(amount)).with_transaction_id(txid);
    let buffer = world.api().create_buffer(buffer).await.expect("Error creating buffer");
    world.buffers.insert(name, buffer.id);
}

#[given(expr = "buffer {word} for order {word} expecting {int} from {string}")]
async fn create_buffer_with_sender(world: &mut ReconciliationWorld, name: String, order_id: String, amount: i64, sender: String) {
    let buffer = NewPaymentBuffer::new(OrderId::from(order_id), MinorUnits::from(amount)).with_sender_name(sender);
    let buffer = world.api().create_buffer(buffer).await.expect("Error creating buffer");
    world.buffers.insert(name, buffer.id);
}

#[when(expr = "order {word} is cancelled")]
async fn cancel_order(world: &mut ReconciliationWorld, order_id: String) {
    world.api().cancel_order(&OrderId::from(order_id)).await.expect("Error cancelling order");
}

#[when(expr = "the notification {string} arrives")]
async fn notification_arrives(world: &mut ReconciliationWorld, text: String) {
    let outcome = world.api().process_notification(&text, Utc::now()).await.expect("Error processing notification");
    world.last_outcome = Some(outcome);
}

#[when(expr = "the notification {string} arrives twice")]
async fn notification_arrives_twice(world: &mut ReconciliationWorld, text: String) {
    let received_at = Utc::now();
    for _ in 0..2 {
        let outcome = world.api().process_notification(&text, received_at).await.expect("Error processing notification");
        world.last_outcome = Some(outcome);
    }
}

#[when(expr = "operator {word} links the last notification to buffer {word}")]
async fn operator_links(world: &mut ReconciliationWorld, operator: String, name: String) {
    let entry_id = world.outcome().log_entry().id;
    let buffer_id = world.buffer_id(&name);
    world.admin().link_entry_to_buffer(entry_id, buffer_id, &operator, None).await.expect("Error linking entry");
}

#[then(expr = "the outcome is {word}")]
async fn check_outcome(world: &mut ReconciliationWorld, expected: String) {
    let outcome = world.outcome();
    assert_eq!(outcome.name(), expected, "Unexpected outcome: {outcome:?}");
}

#[then(expr = "the notification matched buffer {word}")]
async fn check_matched_buffer(world: &mut ReconciliationWorld, name: String) {
    let expected = world.buffer_id(&name);
    match world.outcome() {
        ProcessingOutcome::Matched { buffer, .. } => assert_eq!(buffer.id, expected),
        other => panic!("Expected a match, got {other:?}"),
    }
}

#[then(expr = "the candidates are {word} and {word}")]
async fn check_candidates(world: &mut ReconciliationWorld, first: String, second: String) {
    let expected = vec![world.buffer_id(&first), world.buffer_id(&second)];
    match world.outcome() {
        ProcessingOutcome::Ambiguous { candidate_buffer_ids, .. } => assert_eq!(candidate_buffer_ids, &expected),
        other => panic!("Expected an ambiguous outcome, got {other:?}"),
    }
}

#[then(expr = "the extracted amount is {int}")]
async fn check_amount(world: &mut ReconciliationWorld, amount: i64) {
    assert_eq!(world.outcome().log_entry().extracted_amount, Some(MinorUnits::from(amount)));
}

#[then(expr = "the extracted sender is {string} and the reference is {word}")]
async fn check_sender_and_ref(world: &mut ReconciliationWorld, sender: String, txid: String) {
    let entry = world.outcome().log_entry();
    assert_eq!(entry.sender_name.as_deref(), Some(sender.as_str()));
    assert_eq!(entry.transaction_id.as_deref(), Some(txid.as_str()));
}

#[then(expr = "buffer {word} is verified for order {word}")]
async fn check_verified(world: &mut ReconciliationWorld, name: String, order_id: String) {
    let buffer = world.system().db.fetch_buffer(world.buffer_id(&name)).await.unwrap().expect("Buffer does not exist");
    assert!(buffer.verified, "Buffer {name} is not verified");
    assert!(buffer.verified_at.is_some());
    assert_eq!(buffer.linked_order_id, Some(OrderId::from(order_id)));
}

#[then(expr = "buffer {word} is not verified")]
async fn check_not_verified(world: &mut ReconciliationWorld, name: String) {
    let buffer = world.system().db.fetch_buffer(world.buffer_id(&name)).await.unwrap().expect("Buffer does not exist");
    assert!(!buffer.verified, "Buffer {name} is verified");
    assert!(buffer.linked_order_id.is_none());
}

#[then(expr = "the audit log has {int} entries")]
async fn check_log_size(world: &mut ReconciliationWorld, count: usize) {
    let entries = world.admin().fetch_log_entries(Default::default()).await.expect("Error fetching log");
    assert_eq!(entries.len(), count);
}

#[then(expr = "the last log entry is {word}")]
async fn check_last_status(world: &mut ReconciliationWorld, status: String) {
    let status = status.parse::<NotificationStatus>().expect("Not a valid status");
    let entries = world.admin().fetch_log_entries(Default::default()).await.expect("Error fetching log");
    assert_eq!(entries.first().map(|e| e.status), Some(status));
}

#[then(expr = "there are {int} unresolved notifications")]
async fn check_unresolved(world: &mut ReconciliationWorld, count: usize) {
    let entries = world.admin().unresolved_entries().await.expect("Error fetching unresolved entries");
    assert_eq!(entries.len(), count);
}
