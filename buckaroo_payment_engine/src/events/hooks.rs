use std::{future::Future, pin::Pin, sync::Arc};

use crate::events::{EventHandler, EventProducer, Handler, TransactionRefundedEvent, TransactionStatusEvent};

#[derive(Default, Clone)]
pub struct EventProducers {
    pub status_producers: Vec<EventProducer<TransactionStatusEvent>>,
    pub refund_producers: Vec<EventProducer<TransactionRefundedEvent>>,
}

pub struct EventHandlers {
    pub on_status_change: Option<EventHandler<TransactionStatusEvent>>,
    pub on_refund: Option<EventHandler<TransactionRefundedEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        let on_status_change = hooks.on_status_change.map(|f| EventHandler::new(buffer_size, f));
        let on_refund = hooks.on_refund.map(|f| EventHandler::new(buffer_size, f));
        Self { on_status_change, on_refund }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_status_change {
            result.status_producers.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_refund {
            result.refund_producers.push(handler.subscribe());
        }
        result
    }

    pub async fn start_handlers(self) {
        if let Some(handler) = self.on_status_change {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
        if let Some(handler) = self.on_refund {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
    }
}

#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_status_change: Option<Handler<TransactionStatusEvent>>,
    pub on_refund: Option<Handler<TransactionRefundedEvent>>,
}

impl EventHooks {
    pub fn on_status_change<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(TransactionStatusEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_status_change = Some(Arc::new(f));
        self
    }

    pub fn on_refund<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(TransactionRefundedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_refund = Some(Arc::new(f));
        self
    }
}

#[cfg(test)]
mod test {
    use chrono::Utc;
    use tokio::sync::mpsc;

    use super::*;
    use crate::db_types::{PaymentMethod, Transaction, TransactionStatus};

    fn transaction(id: i64) -> Transaction {
        Transaction {
            id,
            order_id: 42,
            payment_method: PaymentMethod::Ideal,
            payment_key: None,
            transaction_key: None,
            refunded: true,
            status: TransactionStatus::Success,
            external_uuid: "2d1f3a".to_string(),
            redirect_url: None,
            card: None,
            bank_code: Some("ABNANL2A".to_string()),
            last_push: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn registered_refund_hook_receives_published_events() {
        let (tx, mut rx) = mpsc::channel(1);
        let mut hooks = EventHooks::default();
        hooks.on_refund(move |event: TransactionRefundedEvent| {
            let tx = tx.clone();
            Box::pin(async move {
                let _ = tx.send(event.transaction.id).await;
            })
        });
        let handlers = EventHandlers::new(10, hooks);
        let producers = handlers.producers();
        assert_eq!(producers.refund_producers.len(), 1);
        assert!(producers.status_producers.is_empty());
        handlers.start_handlers().await;
        producers.refund_producers[0].publish_event(TransactionRefundedEvent::new(transaction(5))).await;
        assert_eq!(rx.recv().await, Some(5));
    }
}
