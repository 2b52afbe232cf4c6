//! Admin key middleware.
//!
//! Guards the `/api` scope. Callers must present the configured admin API key in the `x-admin-key` header, otherwise
//! the request is rejected with `401 Unauthorized`. If no key is configured, every request is rejected.
use std::{
    future::{ready, Ready},
    rc::Rc,
};

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error,
};
use futures::future::LocalBoxFuture;
use jit_common::Secret;
use log::{trace, warn};

use crate::{
    errors::{AuthError, ServerError},
    helpers::secrets_match,
};

pub const ADMIN_KEY_HEADER: &str = "x-admin-key";

pub struct AdminKeyMiddlewareFactory {
    key: Secret<String>,
}

impl AdminKeyMiddlewareFactory {
    pub fn new(key: Secret<String>) -> Self {
        AdminKeyMiddlewareFactory { key }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AdminKeyMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<B>;
    type Transform = AdminKeyMiddlewareService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AdminKeyMiddlewareService { key: self.key.clone(), service: Rc::new(service) }))
    }
}

pub struct AdminKeyMiddlewareService<S> {
    key: Secret<String>,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for AdminKeyMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;
    type Response = ServiceResponse<B>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let key = self.key.clone();
        Box::pin(async move {
            let presented = req.headers().get(ADMIN_KEY_HEADER).and_then(|v| v.to_str().ok()).map(String::from);
            let Some(presented) = presented else {
                warn!("🔐️ Request to {} without an admin key. Denying access.", req.path());
                return Err(ServerError::from(AuthError::MissingApiKey).into());
            };
            if key.is_empty() || !secrets_match(&presented, key.reveal()) {
                warn!("🔐️ Request to {} with an invalid admin key. Denying access.", req.path());
                return Err(ServerError::from(AuthError::InvalidApiKey).into());
            }
            trace!("🔐️ Admin key check for request ✅️");
            service.call(req).await
        })
    }
}
