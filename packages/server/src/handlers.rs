//! HTTP handler functions for the water map API.

use actix_web::{HttpResponse, web};
use water_map_database::queries;
use water_map_proximity::Proximity;
use water_map_search::{SearchOutcome, SearchRequest};
use water_map_server_models::{
    ApiAreaRecords, ApiHealth, ApiMessage, ApiNearest, ApiSearchRequest, ApiSearchResult,
    AreaQueryParams, NearestQueryParams, api_records,
};

use crate::AppState;

fn internal_error(message: impl std::fmt::Display) -> HttpResponse {
    log::error!("Request failed: {message}");
    HttpResponse::InternalServerError().json(ApiMessage {
        error: "internal error".to_string(),
    })
}

fn store_unavailable() -> HttpResponse {
    internal_error("store lock poisoned")
}

/// `GET /api/health`
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// `GET /api/cities`
///
/// Area name of every record, duplicates included, for the selection list.
pub async fn cities(state: web::Data<AppState>) -> HttpResponse {
    let Some(conn) = state.acquire() else {
        return store_unavailable();
    };

    match queries::list_city_names(&conn) {
        Ok(names) => HttpResponse::Ok().json(names),
        Err(e) => internal_error(e),
    }
}

/// `GET /api/records?area=...`
pub async fn records(
    state: web::Data<AppState>,
    params: web::Query<AreaQueryParams>,
) -> HttpResponse {
    let Some(conn) = state.acquire() else {
        return store_unavailable();
    };

    let AreaQueryParams { area } = params.into_inner();

    match queries::records_for_area(&conn, &area) {
        Ok(records) => HttpResponse::Ok().json(ApiAreaRecords {
            area,
            records: api_records(records),
        }),
        Err(e) => internal_error(e),
    }
}

/// `GET /api/nearest?lat=..&lon=..`
///
/// No match is a 200 with an `error` message, like the search form.
pub async fn nearest(
    state: web::Data<AppState>,
    params: web::Query<NearestQueryParams>,
) -> HttpResponse {
    let Some(conn) = state.acquire() else {
        return store_unavailable();
    };

    match water_map_proximity::find_nearest(&conn, params.lat, params.lon) {
        Ok(Proximity::Found(found)) => HttpResponse::Ok().json(ApiNearest {
            area: found.location.area,
            distance_km: found.distance_km,
            records: api_records(found.records),
        }),
        Ok(Proximity::NotFound(reason)) => HttpResponse::Ok().json(ApiMessage {
            error: reason.to_string(),
        }),
        Err(e) => internal_error(e),
    }
}

/// `POST /api/search`
///
/// Coordinate text wins over the selected area when present.
pub async fn search(
    state: web::Data<AppState>,
    body: web::Json<ApiSearchRequest>,
) -> HttpResponse {
    let Some(conn) = state.acquire() else {
        return store_unavailable();
    };

    let body = body.into_inner();
    let request = SearchRequest {
        area: body.area,
        coordinates: body.search_text,
    };

    let outcome = match water_map_search::dispatch(&conn, &request) {
        Ok(outcome) => outcome,
        Err(e) => return internal_error(e),
    };

    let result = match outcome {
        SearchOutcome::AreaRecords { area, records } => ApiSearchResult::Area(ApiAreaRecords {
            area,
            records: api_records(records),
        }),
        SearchOutcome::Nearest(found) => ApiSearchResult::Nearest(ApiNearest {
            area: found.location.area,
            distance_km: found.distance_km,
            records: api_records(found.records),
        }),
        other @ (SearchOutcome::NotFound(_) | SearchOutcome::Invalid(_)) => {
            ApiSearchResult::Message(ApiMessage {
                error: other.message().unwrap_or_default(),
            })
        }
    };

    HttpResponse::Ok().json(result)
}

#[cfg(test)]
mod tests {
    use actix_web::{App, test, web};
    use serde_json::Value;
    use water_map_database::store;

    use crate::{AppState, configure};

    const LOCATIONS: &str = "Area,\"Latitude, Longitude\"\n\
        Lakeview,\"12.5, 77.3\"\n\
        Riverside,\"13.0, 77.6\"\n";

    const AVAILABILITY: &str = "Site/Area Name,Date,Water Source,Water Level (in meters),\
        Water Quality (pH),Water Quality (Turbidity),Water Availability Status,\
        Additional Notes/Comments\n\
        Riverside,01-01-2023,River,4.5,7.2,Low,Adequate,\n\
        Lakeview,15-01-2023,Lake,2.0,6.5,High,Scarce,Algae\n\
        Riverside,01-02-2023,River,4.1,7.0,Low,Adequate,\n";

    fn state() -> web::Data<AppState> {
        let mut conn = store::open_in_memory().unwrap();
        water_map_ingest::import_from_readers(
            &mut conn,
            LOCATIONS.as_bytes(),
            AVAILABILITY.as_bytes(),
        )
        .unwrap();
        web::Data::new(AppState::new(conn))
    }

    #[actix_web::test]
    async fn cities_lists_every_record_area() {
        let app = test::init_service(App::new().app_data(state()).configure(configure)).await;
        let req = test::TestRequest::get().uri("/api/cities").to_request();
        let body: Vec<String> = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body, vec!["Riverside", "Lakeview", "Riverside"]);
    }

    #[actix_web::test]
    async fn records_by_area() {
        let app = test::init_service(App::new().app_data(state()).configure(configure)).await;
        let req = test::TestRequest::get()
            .uri("/api/records?area=Riverside")
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["area"], "Riverside");
        assert_eq!(body["records"].as_array().unwrap().len(), 2);
        assert_eq!(body["records"][0]["date"], "2023-01-01");
    }

    #[actix_web::test]
    async fn nearest_returns_distance() {
        let app = test::init_service(App::new().app_data(state()).configure(configure)).await;
        let req = test::TestRequest::get()
            .uri("/api/nearest?lat=12.5&lon=77.31")
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["area"], "Lakeview");
        let distance = body["distanceKm"].as_f64().unwrap();
        assert!((1.08..1.10).contains(&distance));
        assert_eq!(body["records"][0]["additionalNotes"], "Algae");
    }

    #[actix_web::test]
    async fn nearest_out_of_range() {
        let app = test::init_service(App::new().app_data(state()).configure(configure)).await;
        let req = test::TestRequest::get()
            .uri("/api/nearest?lat=120&lon=0")
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["error"], "latitude out of range");
    }

    #[actix_web::test]
    async fn search_with_bad_text_reports_message() {
        let app = test::init_service(App::new().app_data(state()).configure(configure)).await;
        let req = test::TestRequest::post()
            .uri("/api/search")
            .set_json(serde_json::json!({"area": "Riverside", "searchText": "not-a-number, 12"}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["kind"], "message");
        assert_eq!(body["error"], "invalid input format");
    }

    #[actix_web::test]
    async fn search_without_text_uses_area() {
        let app = test::init_service(App::new().app_data(state()).configure(configure)).await;
        let req = test::TestRequest::post()
            .uri("/api/search")
            .set_json(serde_json::json!({"area": "Lakeview", "searchText": ""}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["kind"], "area");
        assert_eq!(body["records"].as_array().unwrap().len(), 1);
    }

    #[actix_web::test]
    async fn health_reports_version() {
        let app = test::init_service(App::new().configure(configure)).await;
        let req = test::TestRequest::get().uri("/api/health").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["healthy"], true);
    }
}
