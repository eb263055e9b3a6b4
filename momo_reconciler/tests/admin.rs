use chrono::{Duration, Utc};
use momo_reconciler::{
    db_types::{MinorUnits, NewPaymentBuffer, NotificationStatus, OrderId},
    events::EventProducers,
    test_utils::prepare_env::{destroy_database, fresh_database},
    AdminApi,
    LogQueryFilter,
    ProcessingOutcome,
    ReconciliationApi,
    ReconciliationConfig,
    ReconciliationError,
    SqliteDatabase,
};

struct System {
    url: String,
    db: SqliteDatabase,
    api: ReconciliationApi<SqliteDatabase>,
    admin: AdminApi<SqliteDatabase>,
}

impl System {
    async fn new() -> Self {
        let (url, db) = fresh_database(5).await;
        let api = ReconciliationApi::new(db.clone(), &ReconciliationConfig::default(), EventProducers::default())
            .expect("Error creating API");
        let admin = AdminApi::new(db.clone(), EventProducers::default());
        Self { url, db, api, admin }
    }

    async fn buffer(&self, order_id: &str, amount: i64) -> i64 {
        let buffer = NewPaymentBuffer::new(OrderId::from(order_id), MinorUnits::from(amount));
        self.api.create_buffer(buffer).await.expect("Error creating buffer").id
    }

    async fn notify(&self, text: &str) -> ProcessingOutcome {
        self.api.process_notification(text, Utc::now()).await.expect("Error processing notification")
    }

    async fn shutdown(self) {
        destroy_database(&self.url, self.db).await;
    }
}

#[tokio::test]
async fn ambiguous_entry_is_linked_by_hand() {
    let sys = System::new().await;
    let b1 = sys.buffer("a-1", 10_000).await;
    let b2 = sys.buffer("a-2", 10_000).await;
    let entry = sys.notify("Received 10,000 Ks").await.log_entry().clone();
    assert_eq!(entry.status, NotificationStatus::Ambiguous);

    let unresolved = sys.admin.unresolved_entries().await.unwrap();
    assert_eq!(unresolved.iter().map(|e| e.id).collect::<Vec<_>>(), vec![entry.id]);

    let (resolution, buffer) = sys.admin.link_entry_to_buffer(entry.id, b2, " thida ", Some("Called the customer".into())).await.unwrap();
    assert_eq!(resolution.log_entry_id, entry.id);
    assert_eq!(resolution.buffer_id, b2);
    assert_eq!(resolution.order_id, OrderId::from("a-2"));
    assert_eq!(resolution.operator, "thida");
    assert_eq!(resolution.note.as_deref(), Some("Called the customer"));
    assert!(buffer.verified);
    assert_eq!(buffer.linked_order_id, Some(OrderId::from("a-2")));
    assert_eq!(buffer.raw_notification_text.as_deref(), Some("Received 10,000 Ks"));

    // The audit entry itself is untouched
    let after = sys.admin.fetch_log_entry(entry.id).await.unwrap();
    assert_eq!(after, entry);
    assert!(sys.admin.unresolved_entries().await.unwrap().is_empty());
    assert_eq!(sys.admin.manual_resolution(entry.id).await.unwrap(), Some(resolution));
    assert!(!sys.admin.fetch_buffer(b1).await.unwrap().verified);
    sys.shutdown().await;
}

#[tokio::test]
async fn link_errors() {
    let sys = System::new().await;
    let b1 = sys.buffer("e-1", 5_000).await;
    let b2 = sys.buffer("e-2", 6_000).await;
    let b3 = sys.buffer("e-3", 7_000).await;
    let matched = sys.notify("Received 5,000 Ks").await.log_entry().id;
    let invalid = sys.notify("Hello!").await.log_entry().id;
    let unmatched = sys.notify("Received 9,000 Ks").await.log_entry().id;
    let unmatched_2 = sys.notify("Received 9,500 Ks").await.log_entry().id;

    let err = sys.admin.link_entry_to_buffer(999, b2, "op", None).await.unwrap_err();
    assert!(matches!(err, ReconciliationError::LogEntryNotFound(999)), "{err}");
    let err = sys.admin.link_entry_to_buffer(matched, b2, "op", None).await.unwrap_err();
    assert!(matches!(err, ReconciliationError::LogEntryNotResolvable(_, NotificationStatus::Matched)), "{err}");
    let err = sys.admin.link_entry_to_buffer(invalid, b2, "op", None).await.unwrap_err();
    assert!(matches!(err, ReconciliationError::LogEntryNotResolvable(_, NotificationStatus::Invalid)), "{err}");
    let err = sys.admin.link_entry_to_buffer(unmatched, 999, "op", None).await.unwrap_err();
    assert!(matches!(err, ReconciliationError::BufferNotFound(999)), "{err}");
    let err = sys.admin.link_entry_to_buffer(unmatched, b1, "op", None).await.unwrap_err();
    assert!(matches!(err, ReconciliationError::BufferAlreadyVerified(id) if id == b1), "{err}");
    let err = sys.admin.link_entry_to_buffer(unmatched, b2, "  ", None).await.unwrap_err();
    assert!(matches!(err, ReconciliationError::InvalidRequest(_)), "{err}");

    sys.api.cancel_order(&OrderId::from("e-3")).await.unwrap();
    let err = sys.admin.link_entry_to_buffer(unmatched, b3, "op", None).await.unwrap_err();
    assert!(matches!(err, ReconciliationError::BufferIneligible(id) if id == b3), "{err}");

    // None of the failures left anything behind
    assert!(sys.admin.manual_resolution(unmatched).await.unwrap().is_none());
    sys.admin.link_entry_to_buffer(unmatched, b2, "op", None).await.unwrap();
    let err = sys.admin.link_entry_to_buffer(unmatched, b2, "op", None).await.unwrap_err();
    assert!(matches!(err, ReconciliationError::LogEntryAlreadyResolved(_)), "{err}");
    let unresolved = sys.admin.unresolved_entries().await.unwrap();
    assert_eq!(unresolved.iter().map(|e| e.id).collect::<Vec<_>>(), vec![unmatched_2]);
    sys.shutdown().await;
}

#[tokio::test]
async fn log_queries() {
    let sys = System::new().await;
    let b1 = sys.buffer("q-1", 1_000).await;
    sys.notify("Received 1,000 Ks").await;
    sys.notify("Received 2,000 Ks").await;
    sys.notify("Received 3,000 Ks").await;
    sys.notify("not a payment").await;

    let all = sys.admin.fetch_log_entries(LogQueryFilter::default()).await.unwrap();
    assert_eq!(all.len(), 4);
    assert!(all.windows(2).all(|w| w[0].received_at >= w[1].received_at), "Newest entries come first");

    let unmatched =
        sys.admin.fetch_log_entries(LogQueryFilter::default().with_status(NotificationStatus::Unmatched)).await.unwrap();
    assert_eq!(unmatched.len(), 2);
    assert!(unmatched.iter().all(|e| e.status == NotificationStatus::Unmatched));

    let filter = LogQueryFilter::default()
        .with_status(NotificationStatus::Matched)
        .with_status(NotificationStatus::Invalid);
    assert_eq!(sys.admin.fetch_log_entries(filter).await.unwrap().len(), 2);

    let by_buffer = sys.admin.fetch_log_entries(LogQueryFilter::default().with_buffer_id(b1)).await.unwrap();
    assert_eq!(by_buffer.len(), 1);
    assert_eq!(by_buffer[0].extracted_amount, Some(MinorUnits::from(1_000)));

    let limited = sys.admin.fetch_log_entries(LogQueryFilter::default().with_limit(3)).await.unwrap();
    assert_eq!(limited.len(), 3);

    let future = sys.admin.fetch_log_entries(LogQueryFilter::default().since(Utc::now() + Duration::hours(1))).await.unwrap();
    assert!(future.is_empty());
    let past = sys.admin.fetch_log_entries(LogQueryFilter::default().until(Utc::now() - Duration::hours(1))).await.unwrap();
    assert!(past.is_empty());
    let window = LogQueryFilter::default().since(Utc::now() - Duration::hours(1)).until(Utc::now());
    assert_eq!(sys.admin.fetch_log_entries(window).await.unwrap().len(), 4);
    sys.shutdown().await;
}

#[tokio::test]
async fn log_entries_are_immutable() {
    let sys = System::new().await;
    let id = sys.notify("Received 4,000 Ks").await.log_entry().id;
    let update = sqlx::query("UPDATE notification_logs SET status = 'matched' WHERE id = $1").bind(id).execute(sys.db.pool()).await;
    assert!(update.is_err(), "Log entries must reject updates");
    let delete = sqlx::query("DELETE FROM notification_logs WHERE id = $1").bind(id).execute(sys.db.pool()).await;
    assert!(delete.is_err(), "Log entries must reject deletes");
    let b = sys.buffer("i-1", 4_000).await;
    let delete = sqlx::query("DELETE FROM payment_buffers WHERE id = $1").bind(b).execute(sys.db.pool()).await;
    assert!(delete.is_err(), "Buffers must never be deleted");
    sys.shutdown().await;
}
