mod admin;
mod hmac;

pub use admin::{AdminKeyMiddlewareFactory, AdminKeyMiddlewareService, ADMIN_KEY_HEADER};
pub use hmac::{HmacMiddlewareFactory, HmacMiddlewareService};
