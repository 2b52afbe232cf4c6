use actix_web::{body::MessageBody, http::StatusCode, test, test::TestRequest, web::ServiceConfig, App};
use log::debug;

use crate::helpers::calculate_hmac;

pub const WEBHOOK_SECRET: &str = "network-shared-secret";
pub const SIGNATURE_HEADER: &str = "x-network-signature";
pub const ADMIN_KEY: &str = "test-admin-key";

pub fn sign(body: &str) -> String {
    calculate_hmac(WEBHOOK_SECRET, body.as_bytes())
}

/// Sends `req` to an app built by `configure`. Errors raised by middleware are rendered into responses, as the server
/// would do.
pub async fn send<F>(req: TestRequest, configure: F) -> (StatusCode, String)
where F: FnOnce(&mut ServiceConfig) {
    let app = test::init_service(App::new().configure(configure)).await;
    debug!("Making request");
    let res = match test::try_call_service(&app, req.to_request()).await {
        Ok(res) => res.into_parts().1.map_into_boxed_body(),
        Err(e) => e.error_response(),
    };
    let status = res.status();
    let body = res.into_body().try_into_bytes().unwrap();
    (status, String::from_utf8_lossy(&body).into_owned())
}

pub async fn post_webhook<F>(body: &str, signature: Option<String>, configure: F) -> (StatusCode, String)
where F: FnOnce(&mut ServiceConfig) {
    let mut req = TestRequest::post().uri("/webhooks/network").set_payload(body.to_string());
    if let Some(sig) = signature {
        req = req.insert_header((SIGNATURE_HEADER, sig));
    }
    send(req, configure).await
}

pub fn json(body: &str) -> serde_json::Value {
    serde_json::from_str(body).unwrap_or_else(|e| panic!("Response is not JSON ({e}): {body}"))
}
