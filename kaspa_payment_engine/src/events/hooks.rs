use std::{future::Future, pin::Pin, sync::Arc};

use crate::events::{EventHandler, EventProducer, Handler, PaymentAbandonedEvent, PaymentConfirmedEvent};

#[derive(Default, Clone)]
pub struct EventProducers {
    pub payment_confirmed_producer: Vec<EventProducer<PaymentConfirmedEvent>>,
    pub payment_abandoned_producer: Vec<EventProducer<PaymentAbandonedEvent>>,
}

impl EventProducers {
    pub async fn publish_confirmed(&self, event: PaymentConfirmedEvent) {
        for producer in &self.payment_confirmed_producer {
            producer.publish_event(event.clone()).await;
        }
    }

    pub async fn publish_abandoned(&self, event: PaymentAbandonedEvent) {
        for producer in &self.payment_abandoned_producer {
            producer.publish_event(event.clone()).await;
        }
    }
}

pub struct EventHandlers {
    pub on_payment_confirmed: Option<EventHandler<PaymentConfirmedEvent>>,
    pub on_payment_abandoned: Option<EventHandler<PaymentAbandonedEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        let on_payment_confirmed = hooks.on_payment_confirmed.map(|f| EventHandler::new(buffer_size, f));
        let on_payment_abandoned = hooks.on_payment_abandoned.map(|f| EventHandler::new(buffer_size, f));
        Self { on_payment_confirmed, on_payment_abandoned }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_payment_confirmed {
            result.payment_confirmed_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_payment_abandoned {
            result.payment_abandoned_producer.push(handler.subscribe());
        }
        result
    }

    pub async fn start_handlers(self) {
        if let Some(handler) = self.on_payment_confirmed {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
        if let Some(handler) = self.on_payment_abandoned {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
    }
}

#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_payment_confirmed: Option<Handler<PaymentConfirmedEvent>>,
    pub on_payment_abandoned: Option<Handler<PaymentAbandonedEvent>>,
}

impl EventHooks {
    pub fn on_payment_confirmed<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(PaymentConfirmedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_payment_confirmed = Some(Arc::new(f));
        self
    }

    pub fn on_payment_abandoned<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(PaymentAbandonedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_payment_abandoned = Some(Arc::new(f));
        self
    }
}
