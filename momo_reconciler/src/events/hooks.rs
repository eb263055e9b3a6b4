use std::{future::Future, pin::Pin, sync::Arc};

use crate::events::{EventHandler, EventProducer, Handler, NotificationUnresolvedEvent, PaymentVerifiedEvent};

#[derive(Default, Clone)]
pub struct EventProducers {
    pub payment_verified_producer: Vec<EventProducer<PaymentVerifiedEvent>>,
    pub notification_unresolved_producer: Vec<EventProducer<NotificationUnresolvedEvent>>,
}

impl EventProducers {
    pub async fn publish_payment_verified(&self, event: PaymentVerifiedEvent) {
        for producer in &self.payment_verified_producer {
            producer.publish_event(event.clone()).await;
        }
    }

    pub async fn publish_notification_unresolved(&self, event: NotificationUnresolvedEvent) {
        for producer in &self.notification_unresolved_producer {
            producer.publish_event(event.clone()).await;
        }
    }
}

pub struct EventHandlers {
    pub on_payment_verified: Option<EventHandler<PaymentVerifiedEvent>>,
    pub on_notification_unresolved: Option<EventHandler<NotificationUnresolvedEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        let on_payment_verified = hooks.on_payment_verified.map(|f| EventHandler::new(buffer_size, f));
        let on_notification_unresolved = hooks.on_notification_unresolved.map(|f| EventHandler::new(buffer_size, f));
        Self { on_payment_verified, on_notification_unresolved }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_payment_verified {
            result.payment_verified_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_notification_unresolved {
            result.notification_unresolved_producer.push(handler.subscribe());
        }
        result
    }

    pub async fn start_handlers(self) {
        if let Some(handler) = self.on_payment_verified {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
        if let Some(handler) = self.on_notification_unresolved {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
    }
}

#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_payment_verified: Option<Handler<PaymentVerifiedEvent>>,
    pub on_notification_unresolved: Option<Handler<NotificationUnresolvedEvent>>,
}

impl EventHooks {
    pub fn on_payment_verified<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(PaymentVerifiedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_payment_verified = Some(Arc::new(f));
        self
    }

    pub fn on_notification_unresolved<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(NotificationUnresolvedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_notification_unresolved = Some(Arc::new(f));
        self
    }
}
