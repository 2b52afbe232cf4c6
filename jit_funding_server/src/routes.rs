//! Request handler definitions
//!
//! Define each route and it handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause the
//! current worker to stop processing new requests:
//! ```nocompile
//!     fn my_handler() -> impl Responder {
//!         std::thread::sleep(Duration::from_secs(5)); // <-- Bad practice! Will cause the current worker thread to
//! hang!
//!     }
//! ```
//! For this reason, any long, non-cpu-bound operation (e.g. I/O, database operations, etc.) should be expressed as
//! futures or asynchronous functions. Async handlers get executed concurrently by worker threads and thus don’t block
//! execution:
//!
//! ```nocompile
//!     async fn my_handler() -> impl Responder {
//!         tokio::time::sleep(Duration::from_secs(5)).await; // <-- Ok. Worker thread will handle other requests here
//!     }
//! ```
use actix_web::{get, web, HttpResponse, Responder};
use jit_funding_engine::{AuthorizationRequest, Authorizer, TraceManagement};
use log::*;

use crate::{data_objects::TraceQuery, errors::ServerError};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

#[get("/health")]
pub async fn health() -> impl Responder {
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Authorize  ----------------------------------------------------
route!(authorize => Post "/authorize" impl Authorizer);
pub async fn authorize<A: Authorizer>(body: web::Json<AuthorizationRequest>, api: web::Data<A>) -> HttpResponse {
    let request = body.into_inner();
    debug!("⚖️ Delegated authorization request for card {}", request.card_id);
    let decision = api.authorize(request).await;
    HttpResponse::Ok().json(decision)
}

//----------------------------------------------   Traces  ----------------------------------------------------
route!(trace_for_event => Get "/traces/{event_token}" impl TraceManagement);
pub async fn trace_for_event<B: TraceManagement>(
    path: web::Path<String>,
    db: web::Data<B>,
) -> Result<HttpResponse, ServerError> {
    let event_token = path.into_inner();
    trace!("🗃️ Fetching the execution trace for {event_token}");
    let trace = db
        .fetch_latest_trace(&event_token)
        .await?
        .ok_or_else(|| ServerError::NoRecordFound(format!("No execution trace for {event_token}")))?;
    Ok(HttpResponse::Ok().json(trace))
}

route!(traces_for_card => Get "/cards/{card_id}/traces" impl TraceManagement);
pub async fn traces_for_card<B: TraceManagement>(
    path: web::Path<String>,
    query: web::Query<TraceQuery>,
    db: web::Data<B>,
) -> Result<HttpResponse, ServerError> {
    let card_id = path.into_inner();
    let traces = db.fetch_traces_for_card(&card_id, query.limit()).await?;
    Ok(HttpResponse::Ok().json(traces))
}
