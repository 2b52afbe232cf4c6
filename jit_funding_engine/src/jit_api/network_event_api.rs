use std::fmt::Debug;

use log::*;

use crate::{
    cache::{CacheStore, ReadThroughCache},
    db::traits::{InsertTransactionResult, NetworkEventManagement},
    db_types::CardStatus,
    events::{CardStatusChangedEvent, EventProducers, TransactionRecordedEvent},
    jit_api::{errors::NetworkEventError, network_objects::ClearingJob},
};

/// `NetworkEventApi` handles the card-network events that don't need an immediate decision: clearing and settlement
/// records, and card lifecycle changes.
pub struct NetworkEventApi<B, C> {
    db: B,
    cache: ReadThroughCache<C>,
    producers: EventProducers,
}

impl<B, C> Debug for NetworkEventApi<B, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "NetworkEventApi")
    }
}

impl<B: Clone, C: Clone> Clone for NetworkEventApi<B, C> {
    fn clone(&self) -> Self {
        Self { db: self.db.clone(), cache: self.cache.clone(), producers: self.producers.clone() }
    }
}

impl<B, C> NetworkEventApi<B, C> {
    pub fn new(db: B, cache: ReadThroughCache<C>, producers: EventProducers) -> Self {
        Self { db, cache, producers }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B, C> NetworkEventApi<B, C>
where
    B: NetworkEventManagement,
    C: CacheStore,
{
    /// Stores the transaction for a clearing or settlement event.
    ///
    /// Redelivery of a token that is already stored changes nothing. Events for unknown cards are logged and dropped,
    /// returning `Ok(None)`.
    pub async fn record_clearing(&self, job: &ClearingJob) -> Result<Option<InsertTransactionResult>, NetworkEventError> {
        let tx = &job.transaction;
        if tx.token.trim().is_empty() {
            return Err(NetworkEventError::InvalidEvent("transaction token is empty".into()));
        }
        let Some(owner) = self.db.fetch_card_owner(&tx.card_token).await? else {
            warn!("📨️ {} event {} refers to unknown card {}. Dropping it.", job.kind, tx.token, tx.card_token);
            return Ok(None);
        };
        let new_tx = job.to_new_transaction(owner);
        let result = self.db.insert_transaction(new_tx).await?;
        if let InsertTransactionResult::Inserted(id) = result {
            info!("📨️ {} {} for {} on card {} recorded as #{id}", job.kind, tx.token, tx.amount(), tx.card_token);
            for producer in &self.producers.transaction_recorded_producer {
                producer.publish_event(TransactionRecordedEvent {
                    token: tx.token.clone(),
                    card_id: tx.card_token.clone(),
                    amount: tx.amount(),
                    transaction_type: job.kind.to_string(),
                });
            }
        } else {
            debug!("📨️ {} {} has already been recorded", job.kind, tx.token);
        }
        Ok(Some(result))
    }

    /// Applies a lifecycle change reported by the network, and drops the card's cache entry so the next authorization
    /// sees it. Returns the new status, or `None` if the card is unknown.
    pub async fn apply_card_state_change(
        &self,
        card_id: &str,
        network_state: &str,
    ) -> Result<Option<CardStatus>, NetworkEventError> {
        let status = CardStatus::from_network_state(network_state);
        if !self.db.update_card_status(card_id, status).await? {
            warn!("📨️ Card state change for unknown card {card_id}. Ignoring it.");
            return Ok(None);
        }
        self.cache.invalidate_card(card_id).await;
        for producer in &self.producers.card_status_changed_producer {
            producer.publish_event(CardStatusChangedEvent { card_id: card_id.to_string(), status });
        }
        Ok(Some(status))
    }
}
