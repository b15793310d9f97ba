use actix_web::{get, web, HttpResponse, Responder};
use serde::Serialize;
use sp500_spider::cache::{CacheStore, Category};

/// Current roster.
///
/// ```json
/// {
///     "dateAdded": "2025-08-24",
///     "tickerSymbols": ["MMM", "AOS", "ABT", ...]
/// }
/// ```
#[derive(Serialize)]
pub(crate) struct Companies {
    #[serde(rename = "dateAdded")]
    date_added: String,
    #[serde(rename = "tickerSymbols")]
    ticker_symbols: Vec<String>,
}

// the only user-visible failure shape
#[derive(Serialize)]
pub(crate) struct ErrorBody {
    error: String,
}

#[get("/sp500-companies")]
pub(crate) async fn companies(store: web::Data<CacheStore>) -> impl Responder {
    match store.read_symbol_set().await {
        Ok(set) => HttpResponse::Ok().json(Companies {
            date_added: set.updated.format("%Y-%m-%d").to_string(),
            ticker_symbols: set.symbols,
        }),
        Err(err) => {
            tracing::error!("failed to read roster, error({err})");
            HttpResponse::InternalServerError().json(ErrorBody {
                error: err.to_string(),
            })
        }
    }
}

/// Mapping of symbol to cached fundamentals payload; symbols whose sweep
/// fetch failed are simply absent.
#[get("/sp500-info")]
pub(crate) async fn info(store: web::Data<CacheStore>) -> impl Responder {
    let records = store.read_company_records(Category::Info).await;
    HttpResponse::Ok().json(records)
}

/// Mapping of symbol to cached time-series payload.
#[get("/sp500-time-series")]
pub(crate) async fn time_series(store: web::Data<CacheStore>) -> impl Responder {
    let records = store.read_company_records(Category::TimeSeries).await;
    HttpResponse::Ok().json(records)
}

//////////////////////////////////////////////////////////////
// -- TESTS --
//////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{test, App};
    use chrono::{TimeZone, Utc};
    use sp500_spider::cache::SymbolSet;

    fn seeded_store() -> CacheStore {
        CacheStore::in_memory()
    }

    #[actix_web::test]
    async fn companies_returns_roster_with_date() {
        let store = seeded_store();
        store
            .write_symbol_set(&SymbolSet {
                symbols: vec!["AAPL".to_string(), "MSFT".to_string()],
                updated: Utc.with_ymd_and_hms(2025, 8, 24, 6, 0, 0).unwrap(),
            })
            .await
            .unwrap();

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(store))
                .service(companies),
        )
        .await;

        let req = test::TestRequest::get().uri("/sp500-companies").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["dateAdded"], "2025-08-24");
        assert_eq!(body["tickerSymbols"], serde_json::json!(["AAPL", "MSFT"]));
    }

    #[actix_web::test]
    async fn companies_is_500_with_error_body_when_cache_empty() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(seeded_store()))
                .service(companies),
        )
        .await;

        let req = test::TestRequest::get().uri("/sp500-companies").to_request();
        let res = test::call_service(&app, req).await;

        assert_eq!(res.status(), 500);
        let body: serde_json::Value = test::read_body_json(res).await;
        assert!(body["error"].as_str().unwrap().contains("not populated"));
    }

    #[actix_web::test]
    async fn info_returns_symbol_keyed_map() {
        let store = seeded_store();
        store
            .write_company_record(Category::Info, "AAPL", serde_json::json!({"pe": 30}))
            .await
            .unwrap();

        let app = test::init_service(
            App::new().app_data(web::Data::new(store)).service(info),
        )
        .await;

        let req = test::TestRequest::get().uri("/sp500-info").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["AAPL"]["pe"], 30);
    }

    #[actix_web::test]
    async fn time_series_is_empty_map_before_any_sweep() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(seeded_store()))
                .service(time_series),
        )
        .await;

        let req = test::TestRequest::get().uri("/sp500-time-series").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body, serde_json::json!({}));
    }
}
