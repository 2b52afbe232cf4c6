//----------------------------------------------   Network webhook  ----------------------------------------------------

use actix_web::{web, HttpRequest, HttpResponse};
use jit_funding_engine::{
    cache::CacheBackend,
    jit_api::network_objects::{ClearingJob, ClearingKind, NetworkEvent, NetworkEventKind},
    queue::JobPublisher,
    Authorizer,
    Decision,
    NetworkEventApi,
    NetworkEventManagement,
};
use log::*;

use crate::{
    config::ServerOptions,
    data_objects::{AuthorizationResponse, WebhookAck},
    helpers::get_remote_ip,
    route,
};

route!(network_webhook => Post "/network" impl Authorizer, NetworkEventManagement);
/// Every response is `200 OK`, otherwise the network retries the delivery. Signature failures are rejected with `401`
/// by the HMAC middleware before this handler runs.
pub async fn network_webhook<A, B>(
    req: HttpRequest,
    body: web::Bytes,
    options: web::Data<ServerOptions>,
    authorizer: web::Data<A>,
    events: web::Data<NetworkEventApi<B, CacheBackend>>,
    clearing: web::Data<JobPublisher<ClearingJob>>,
) -> HttpResponse
where
    A: Authorizer,
    B: NetworkEventManagement,
{
    let peer = get_remote_ip(&req, options.use_x_forwarded_for, options.use_forwarded);
    trace!("📨️ Received webhook delivery from {peer:?}");
    let event = match serde_json::from_slice::<NetworkEvent>(body.as_ref()) {
        Ok(event) => event,
        Err(e) => {
            warn!("📨️ Could not parse webhook payload. {e}");
            return HttpResponse::Ok().json(WebhookAck::failure(format!("Malformed event. {e}")));
        },
    };
    let ack = match event.kind() {
        NetworkEventKind::Authorization => {
            // The network expects a decision for every authorization event, so a bad one is declined
            let Some(tx) = event.transaction else {
                warn!("📨️ {} event has no transaction payload. Declining it.", event.event_type);
                return HttpResponse::Ok().json(AuthorizationResponse::from(&Decision::system_error()));
            };
            let decision = authorizer.authorize(tx.to_authorization_request()).await;
            return HttpResponse::Ok().json(AuthorizationResponse::from(&decision));
        },
        NetworkEventKind::Clearing | NetworkEventKind::Settlement => {
            let kind = match event.kind() {
                NetworkEventKind::Settlement => ClearingKind::Settlement,
                _ => ClearingKind::Clearing,
            };
            match event.transaction {
                Some(tx) => {
                    let token = tx.token.clone();
                    match clearing.enqueue(ClearingJob::new(kind, tx)) {
                        Ok(()) => {
                            debug!("📨️ {kind} event {token} queued");
                            WebhookAck::processed()
                        },
                        Err(e) => {
                            error!("📨️ Could not queue {kind} event {token}. {e}");
                            WebhookAck::failure(e)
                        },
                    }
                },
                None => missing_payload(&event.event_type, "transaction"),
            }
        },
        NetworkEventKind::CardStateChange => match event.card {
            Some(card) => match events.apply_card_state_change(&card.card_token, &card.state).await {
                Ok(Some(status)) => {
                    info!("📨️ Card {} is now {status} (network state {})", card.card_token, card.state);
                    WebhookAck::processed()
                },
                Ok(None) => WebhookAck::processed(),
                Err(e) => {
                    error!("📨️ Could not apply the state change for card {}. {e}", card.card_token);
                    WebhookAck::failure(e)
                },
            },
            None => missing_payload(&event.event_type, "card"),
        },
        NetworkEventKind::Unsupported(event_type) => {
            info!("📨️ Ignoring unsupported {event_type} event");
            WebhookAck::processed()
        },
    };
    HttpResponse::Ok().json(ack)
}

fn missing_payload(event_type: &str, field: &str) -> WebhookAck {
    warn!("📨️ {event_type} event has no {field} payload");
    WebhookAck::failure(format!("The {event_type} event has no {field} payload"))
}
