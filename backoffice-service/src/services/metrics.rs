//! Prometheus metrics for the back-office service.

use axum::{extract::Request, middleware::Next, response::Response};
use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram_vec, CounterVec, HistogramVec, TextEncoder,
};

/// HTTP request counter by method, path, and status.
pub static HTTP_REQUESTS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "backoffice_http_requests_total",
        "Total number of HTTP requests",
        &["method", "path", "status"]
    )
    .expect("Failed to register http_requests_total")
});

/// Database query duration histogram.
pub static DB_QUERY_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "backoffice_db_query_duration_seconds",
        "Database query duration in seconds",
        &["operation"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]
    )
    .expect("Failed to register db_query_duration")
});

/// Booking counter by status.
pub static BOOKINGS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "backoffice_bookings_total",
        "Total number of bookings by status",
        &["status"]
    )
    .expect("Failed to register bookings_total")
});

/// Invoice counter by status.
pub static INVOICES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "backoffice_invoices_total",
        "Total number of invoices by status",
        &["status"]
    )
    .expect("Failed to register invoices_total")
});

/// Payment counter by method.
pub static PAYMENTS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "backoffice_payments_total",
        "Total number of recorded payments by payment method",
        &["payment_method"]
    )
    .expect("Failed to register payments_total")
});

/// Contract lifecycle event counter.
pub static CONTRACT_EVENTS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "backoffice_contract_events_total",
        "Total number of contract lifecycle events",
        &["event"]
    )
    .expect("Failed to register contract_events_total")
});

/// Initialize all metrics (forces lazy initialization).
pub fn init_metrics() {
    Lazy::force(&HTTP_REQUESTS_TOTAL);
    Lazy::force(&DB_QUERY_DURATION);
    Lazy::force(&BOOKINGS_TOTAL);
    Lazy::force(&INVOICES_TOTAL);
    Lazy::force(&PAYMENTS_TOTAL);
    Lazy::force(&CONTRACT_EVENTS_TOTAL);
}

/// Count every HTTP request by method, path, and response status.
pub async fn track_requests(req: Request, next: Next) -> Response {
    let method = req.method().to_string();
    let path = req.uri().path().to_string();

    let response = next.run(req).await;

    let status = response.status().as_u16().to_string();
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[&method, &path, &status])
        .inc();

    response
}

/// Get metrics in Prometheus text format.
pub fn get_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    encoder
        .encode_to_string(&metric_families)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request as HttpRequest, middleware::from_fn, routing::get, Router};
    use tower::ServiceExt;

    #[tokio::test]
    async fn request_counter_labels_method_path_and_status() {
        let app = Router::new()
            .route("/ping", get(|| async { "pong" }))
            .layer(from_fn(track_requests));

        let before = HTTP_REQUESTS_TOTAL
            .with_label_values(&["GET", "/ping", "200"])
            .get();

        let response = app
            .oneshot(HttpRequest::get("/ping").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), 200);

        let after = HTTP_REQUESTS_TOTAL
            .with_label_values(&["GET", "/ping", "200"])
            .get();
        assert_eq!(after - before, 1.0);
    }
}
