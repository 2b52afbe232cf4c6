//! Webhook signature middleware.
//!
//! The card network signs every delivery with a secret it shares with this server. The signature is the hex-encoded
//! HMAC-SHA256 of the raw request body, sent in a configurable header (`x-network-signature` by default).
//!
//! Wrap the webhook scope with [`HmacMiddlewareFactory`] and unsigned or badly signed deliveries are rejected with
//! `401 Unauthorized` before anything parses them.
use std::{
    future::{ready, Ready},
    rc::Rc,
};

use actix_http::h1;
use actix_web::{
    dev::{forward_ready, Payload, Service, ServiceRequest, ServiceResponse, Transform},
    error::ErrorBadRequest,
    web,
    Error,
};
use futures::future::LocalBoxFuture;
use jit_common::Secret;
use log::{trace, warn};

use crate::{
    errors::{AuthError, ServerError},
    helpers::verify_hmac,
};

/// What a delivery is checked against. Shared by every service the factory creates.
struct SignatureCheck {
    header: String,
    secret: Secret<String>,
    /// When false, every delivery is let through unchecked
    enabled: bool,
}

impl SignatureCheck {
    /// Verifies the request's signature. The body has to be read to do so, and is put back for the handler.
    async fn verify(&self, req: &mut ServiceRequest) -> Result<(), Error> {
        if !self.enabled {
            trace!("🔐️ Signature checks are disabled");
            return Ok(());
        }
        let Some(signature) = req.headers().get(&self.header).and_then(|v| v.to_str().ok()).map(String::from) else {
            warn!("🔐️ Delivery to {} has no {} header. Rejecting it.", req.path(), self.header);
            return Err(ServerError::from(AuthError::MissingSignature(self.header.clone())).into());
        };
        if self.secret.is_empty() {
            warn!("🔐️ No webhook secret is configured, so no delivery can be verified. Rejecting it.");
            return Err(ServerError::from(AuthError::InvalidSignature).into());
        }
        let body = req.extract::<web::Bytes>().await.map_err(|e| {
            warn!("🔐️ Could not read the delivery body. {e}");
            ErrorBadRequest("Could not read the request body.")
        })?;
        if !verify_hmac(self.secret.reveal(), body.as_ref(), &signature) {
            warn!("🔐️ Delivery to {} has an invalid signature. Rejecting it.", req.path());
            return Err(ServerError::from(AuthError::InvalidSignature).into());
        }
        trace!("🔐️ Delivery signature ✅️");
        req.set_payload(replay(body));
        Ok(())
    }
}

pub struct HmacMiddlewareFactory {
    check: Rc<SignatureCheck>,
}

impl HmacMiddlewareFactory {
    pub fn new(header: &str, secret: Secret<String>, enabled: bool) -> Self {
        let check = SignatureCheck { header: header.to_lowercase(), secret, enabled };
        Self { check: Rc::new(check) }
    }
}

impl<S, B> Transform<S, ServiceRequest> for HmacMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<B>;
    type Transform = HmacMiddlewareService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(HmacMiddlewareService { check: Rc::clone(&self.check), service: Rc::new(service) }))
    }
}

pub struct HmacMiddlewareService<S> {
    check: Rc<SignatureCheck>,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for HmacMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;
    type Response = ServiceResponse<B>;

    forward_ready!(service);

    fn call(&self, mut req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let check = Rc::clone(&self.check);
        Box::pin(async move {
            check.verify(&mut req).await?;
            service.call(req).await
        })
    }
}

fn replay(body: web::Bytes) -> Payload {
    let (_, mut payload) = h1::Payload::create(true);
    payload.unread_data(body);
    Payload::from(payload)
}
