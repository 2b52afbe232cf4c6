use std::sync::Arc;

use crate::events::{
    AuthorizationDecidedEvent,
    CardStatusChangedEvent,
    EventHandler,
    EventProducer,
    Handler,
    HandlerFuture,
    TransactionRecordedEvent,
};

#[derive(Default, Clone)]
pub struct EventProducers {
    pub authorization_decided_producer: Vec<EventProducer<AuthorizationDecidedEvent>>,
    pub transaction_recorded_producer: Vec<EventProducer<TransactionRecordedEvent>>,
    pub card_status_changed_producer: Vec<EventProducer<CardStatusChangedEvent>>,
}

pub struct EventHandlers {
    pub on_authorization_decided: Option<EventHandler<AuthorizationDecidedEvent>>,
    pub on_transaction_recorded: Option<EventHandler<TransactionRecordedEvent>>,
    pub on_card_status_changed: Option<EventHandler<CardStatusChangedEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        let on_authorization_decided = hooks.on_authorization_decided.map(|f| EventHandler::new(buffer_size, f));
        let on_transaction_recorded = hooks.on_transaction_recorded.map(|f| EventHandler::new(buffer_size, f));
        let on_card_status_changed = hooks.on_card_status_changed.map(|f| EventHandler::new(buffer_size, f));
        Self { on_authorization_decided, on_transaction_recorded, on_card_status_changed }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_authorization_decided {
            result.authorization_decided_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_transaction_recorded {
            result.transaction_recorded_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_card_status_changed {
            result.card_status_changed_producer.push(handler.subscribe());
        }
        result
    }

    pub async fn start_handlers(self) {
        if let Some(handler) = self.on_authorization_decided {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
        if let Some(handler) = self.on_transaction_recorded {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
        if let Some(handler) = self.on_card_status_changed {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
    }
}

#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_authorization_decided: Option<Handler<AuthorizationDecidedEvent>>,
    pub on_transaction_recorded: Option<Handler<TransactionRecordedEvent>>,
    pub on_card_status_changed: Option<Handler<CardStatusChangedEvent>>,
}

impl EventHooks {
    pub fn on_authorization_decided<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(AuthorizationDecidedEvent) -> HandlerFuture) + Send + Sync + 'static {
        self.on_authorization_decided = Some(Arc::new(f));
        self
    }

    pub fn on_transaction_recorded<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(TransactionRecordedEvent) -> HandlerFuture) + Send + Sync + 'static {
        self.on_transaction_recorded = Some(Arc::new(f));
        self
    }

    pub fn on_card_status_changed<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(CardStatusChangedEvent) -> HandlerFuture) + Send + Sync + 'static {
        self.on_card_status_changed = Some(Arc::new(f));
        self
    }
}
