pub mod config;
pub mod dtos;
pub mod handlers;
pub mod models;
pub mod services;

use axum::middleware::from_fn;
use axum::{
    routing::{delete, get, post},
    Router,
};
use secrecy::ExposeSecret;
use service_core::middleware::{request_id_middleware, security_headers_middleware};
use tower_http::trace::TraceLayer;

use config::Config;
use services::Database;

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Config,
}

pub struct Application {
    host: String,
    port: u16,
    router: Router,
}

impl Application {
    pub async fn build(config: Config) -> anyhow::Result<Self> {
        let db = Database::new(
            config.database.url.expose_secret(),
            config.database.max_connections,
            1,
        )
        .await?;

        db.run_migrations().await?;
        services::init_metrics();

        let state = AppState {
            db,
            config: config.clone(),
        };

        let router = Router::new()
            .route("/health", get(handlers::health_check))
            .route("/ready", get(handlers::readiness_check))
            .route("/metrics", get(handlers::metrics))
            // Contacts
            .route(
                "/contacts",
                post(handlers::contacts::create_contact).get(handlers::contacts::list_contacts),
            )
            .route(
                "/contacts/:id",
                get(handlers::contacts::get_contact)
                    .patch(handlers::contacts::update_contact)
                    .delete(handlers::contacts::archive_contact),
            )
            // Booking types and availability
            .route(
                "/booking-types",
                post(handlers::booking_types::create_booking_type)
                    .get(handlers::booking_types::list_booking_types),
            )
            .route(
                "/booking-types/:id",
                get(handlers::booking_types::get_booking_type)
                    .patch(handlers::booking_types::update_booking_type),
            )
            .route(
                "/availability/rules",
                post(handlers::availability::create_rule).get(handlers::availability::list_rules),
            )
            .route(
                "/availability/rules/:id",
                delete(handlers::availability::delete_rule),
            )
            .route(
                "/availability/overrides",
                post(handlers::availability::create_override)
                    .get(handlers::availability::list_overrides),
            )
            .route(
                "/availability/overrides/:id",
                delete(handlers::availability::delete_override),
            )
            // Bookings
            .route(
                "/bookings",
                post(handlers::bookings::create_booking).get(handlers::bookings::list_bookings),
            )
            .route("/bookings/:id", get(handlers::bookings::get_booking))
            .route(
                "/bookings/:id/confirm",
                post(handlers::bookings::confirm_booking),
            )
            .route(
                "/bookings/:id/complete",
                post(handlers::bookings::complete_booking),
            )
            .route(
                "/bookings/:id/no-show",
                post(handlers::bookings::no_show_booking),
            )
            .route(
                "/bookings/:id/cancel",
                post(handlers::bookings::cancel_booking),
            )
            .route(
                "/bookings/reminders/sweep",
                post(handlers::bookings::sweep_reminders),
            )
            // Invoices and payments
            .route(
                "/invoices",
                post(handlers::invoices::create_invoice).get(handlers::invoices::list_invoices),
            )
            .route("/invoices/:id", get(handlers::invoices::get_invoice))
            .route("/invoices/:id/send", post(handlers::invoices::send_invoice))
            .route(
                "/invoices/:id/cancel",
                post(handlers::invoices::cancel_invoice),
            )
            .route(
                "/invoices/:id/payments",
                post(handlers::invoices::record_payment),
            )
            .route(
                "/invoices/:id/payments/:payment_id",
                delete(handlers::invoices::remove_payment),
            )
            .route(
                "/invoices/overdue/sweep",
                post(handlers::invoices::sweep_overdue),
            )
            // Payment plans
            .route(
                "/invoices/:id/payment-plan",
                post(handlers::invoices::create_payment_plan)
                    .get(handlers::invoices::get_payment_plan),
            )
            .route(
                "/payment-plans/:id/installments/:sequence/pay",
                post(handlers::invoices::pay_installment),
            )
            .route(
                "/payment-plans/:id/next-due",
                get(handlers::invoices::next_due_installment),
            )
            .route(
                "/payment-plans/:id/cancel",
                post(handlers::invoices::cancel_payment_plan),
            )
            // Contract templates and contracts
            .route(
                "/contract-templates",
                post(handlers::contracts::create_template)
                    .get(handlers::contracts::list_templates),
            )
            .route(
                "/contract-templates/:id",
                get(handlers::contracts::get_template)
                    .patch(handlers::contracts::update_template),
            )
            .route(
                "/contracts",
                post(handlers::contracts::create_contract).get(handlers::contracts::list_contracts),
            )
            .route("/contracts/:id", get(handlers::contracts::get_contract))
            .route(
                "/contracts/:id/send",
                post(handlers::contracts::send_contract),
            )
            .route(
                "/contracts/:id/void",
                post(handlers::contracts::void_contract),
            )
            .route(
                "/contracts/:id/audit-log",
                get(handlers::contracts::audit_log),
            )
            // Client portal (token-authenticated public surface)
            .route(
                "/portal/login-links",
                post(handlers::portal::issue_login_link),
            )
            .route("/portal/sessions", post(handlers::portal::consume_login_link))
            .route("/portal/invoices/:token", get(handlers::portal::view_invoice))
            .route(
                "/portal/contracts/:token",
                get(handlers::portal::view_contract),
            )
            .route(
                "/portal/contracts/:token/sign",
                post(handlers::portal::sign_contract),
            )
            .route(
                "/portal/contracts/:token/decline",
                post(handlers::portal::decline_contract),
            )
            .route("/portal/bookings/:token", get(handlers::portal::view_booking))
            .route(
                "/portal/bookings/:token/cancel",
                post(handlers::portal::cancel_booking),
            )
            // Webhook ingestion
            .route("/webhooks/:source", post(handlers::webhooks::receive_webhook))
            .layer(from_fn(security_headers_middleware))
            .layer(from_fn(request_id_middleware))
            .layer(from_fn(services::metrics::track_requests))
            .layer(
                TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                    let request_id = request
                        .headers()
                        .get("x-request-id")
                        .and_then(|value| value.to_str().ok())
                        .unwrap_or("-");

                    tracing::info_span!(
                        "http_request",
                        request_id = %request_id,
                        method = %request.method(),
                        uri = %request.uri(),
                    )
                }),
            )
            .with_state(state);

        Ok(Self {
            host: config.server.host,
            port: config.server.port,
            router,
        })
    }

    pub async fn run_until_stopped(self) -> anyhow::Result<()> {
        let addr = format!("{}:{}", self.host, self.port);
        tracing::info!("Listening on {}", addr);

        let listener = tokio::net::TcpListener::bind(&addr).await?;
        axum::serve(listener, self.router).await?;

        Ok(())
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}
