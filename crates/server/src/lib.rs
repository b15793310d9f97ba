//! Read-only query endpoints over the spider's cache store.
//!
//! Handlers only ever read; a refresh is never triggered from here.

mod rest_api;

use actix_web::{middleware::Logger, web, App, HttpServer};
use sp500_spider::cache::CacheStore;

/// Serve the query endpoints on `port` until shutdown.
pub async fn serve(store: CacheStore, port: u16) -> std::io::Result<()> {
    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(web::Data::new(store.clone()))
            .service(rest_api::companies)
            .service(rest_api::info)
            .service(rest_api::time_series)
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await
}
