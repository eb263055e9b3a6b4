use std::{
    future::Future,
    pin::Pin,
    sync::{
        atomic::{AtomicI32, AtomicI64, Ordering},
        Arc,
    },
};

use chrono::Utc;
use log::*;
use momo_reconciler::{
    db_types::{MinorUnits, NewPaymentBuffer, OrderId},
    events::{EventHandlers, EventHooks},
    test_utils::prepare_env::{destroy_database, fresh_database},
    AdminApi,
    ReconciliationApi,
    ReconciliationConfig,
};
use tokio::runtime::Runtime;

#[derive(Default, Clone)]
struct HookCalled {
    called: Arc<AtomicI32>,
    amount: Arc<AtomicI64>,
}

impl HookCalled {
    pub fn called(&self, amount: MinorUnits) {
        let _ = self.called.fetch_add(1, Ordering::SeqCst);
        let _ = self.amount.fetch_add(amount.value(), Ordering::SeqCst);
    }

    pub fn count(&self) -> i32 {
        self.called.load(Ordering::SeqCst)
    }

    pub fn total(&self) -> i64 {
        self.amount.load(Ordering::SeqCst)
    }
}

async fn wait_for<F: Fn() -> bool>(condition: F) {
    for _ in 0..50 {
        if condition() {
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }
}

#[test]
fn on_payment_verified() {
    let rt = Runtime::new().unwrap();
    let verified = HookCalled::default();
    let unresolved = HookCalled::default();
    let (v2, u2) = (verified.clone(), unresolved.clone());
    rt.block_on(async move {
        let (url, db) = fresh_database(5).await;
        let mut hooks = EventHooks::default();
        hooks
            .on_payment_verified(move |ev| {
                info!("🪝️ Order {} paid {} through buffer #{}", ev.order_id, ev.amount, ev.buffer_id);
                let v = v2.clone();
                Box::pin(async move { v.called(ev.amount) }) as Pin<Box<dyn Future<Output = ()> + Send>>
            })
            .on_notification_unresolved(move |ev| {
                info!("🪝️ Log entry #{} is {}", ev.log_entry_id, ev.status);
                let u = u2.clone();
                Box::pin(async move { u.called(ev.amount.unwrap_or_default()) }) as Pin<Box<dyn Future<Output = ()> + Send>>
            });
        let config = ReconciliationConfig::default();
        let handlers = EventHandlers::new(config.event_buffer_size, hooks);
        let producers = handlers.producers();
        handlers.start_handlers().await;

        let api = ReconciliationApi::new(db.clone(), &config, producers).unwrap();
        api.create_buffer(NewPaymentBuffer::new("h-1".into(), MinorUnits::from(500_000))).await.unwrap();
        let text = "You received MMK 500,000 from KO AUNG. Ref: TXN882";
        let now = Utc::now();
        assert!(api.process_notification(text, now).await.unwrap().is_matched());
        // A replay is neither a payment nor an unresolved notification
        assert!(api.process_notification(text, now).await.unwrap().is_duplicate());
        // Nobody is waiting for this one
        let outcome = api.process_notification("You received MMK 1,000", now).await.unwrap();
        assert!(!outcome.is_matched());

        wait_for(|| verified.count() == 1 && unresolved.count() == 1).await;
        assert_eq!(verified.count(), 1, "The payment verified hook must fire exactly once");
        assert_eq!(verified.total(), 500_000);
        assert_eq!(unresolved.count(), 1);
        assert_eq!(unresolved.total(), 1_000);
        destroy_database(&url, db).await;
    });
}

#[test]
fn manual_link_fires_payment_verified() {
    let rt = Runtime::new().unwrap();
    let verified = HookCalled::default();
    let v2 = verified.clone();
    rt.block_on(async move {
        let (url, db) = fresh_database(5).await;
        let mut hooks = EventHooks::default();
        hooks.on_payment_verified(move |ev| {
            assert_eq!(ev.order_id, OrderId::from("h-3"));
            let v = v2.clone();
            Box::pin(async move { v.called(ev.amount) }) as Pin<Box<dyn Future<Output = ()> + Send>>
        });
        let handlers = EventHandlers::new(10, hooks);
        let producers = handlers.producers();
        handlers.start_handlers().await;

        let api = ReconciliationApi::new(db.clone(), &ReconciliationConfig::default(), producers.clone()).unwrap();
        let admin = AdminApi::new(db.clone(), producers);
        let _b2 = api.create_buffer(NewPaymentBuffer::new("h-2".into(), MinorUnits::from(20_000))).await.unwrap();
        let b3 = api.create_buffer(NewPaymentBuffer::new("h-3".into(), MinorUnits::from(20_000))).await.unwrap();
        let outcome = api.process_notification("Received 20,000 Ks", Utc::now()).await.unwrap();
        let entry_id = outcome.log_entry().id;
        admin.link_entry_to_buffer(entry_id, b3.id, "thida", None).await.unwrap();

        wait_for(|| verified.count() == 1).await;
        assert_eq!(verified.count(), 1);
        assert_eq!(verified.total(), 20_000);
        destroy_database(&url, db).await;
    });
}
