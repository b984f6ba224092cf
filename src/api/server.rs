use axum::{
    extract::State,
    routing::{get, patch, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter, prelude::*};
use opentelemetry::KeyValue;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry_sdk::{trace::{SdkTracerProvider, Sampler}, Resource};
use opentelemetry_otlp::{SpanExporter, WithExportConfig};
use tracing_opentelemetry::OpenTelemetryLayer;

use crate::api::error::ApiError;
use crate::api::handlers::{
    delete_review_handler, expert_reviews_handler, submit_review_handler, update_review_handler,
    user_reviews_handler,
};
use crate::auth::JwtVerifier;
use crate::config::{ServerConfig, TelemetryConfig};
use crate::db::{create_pool, run_migrations, PgReputationStore, ReputationStore};
use crate::domain::ReviewService;

/// Shared handler state
pub struct AppState<S> {
    pub reviews: Arc<ReviewService<S>>,
    pub auth: Arc<JwtVerifier>,
}

impl<S: ReputationStore> AppState<S> {
    pub fn new(store: S, jwt_secret: &str) -> Self {
        Self {
            reviews: Arc::new(ReviewService::new(store)),
            auth: Arc::new(JwtVerifier::new(jwt_secret)),
        }
    }
}

// Derived Clone would require S: Clone
impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            reviews: Arc::clone(&self.reviews),
            auth: Arc::clone(&self.auth),
        }
    }
}

pub fn init_tracing(config: &TelemetryConfig) {
    let enable_otel = config.enabled;

    // Base subscriber - span close events only when not exporting spans
    let subscriber = tracing_subscriber::registry()
        .with(
            if !enable_otel {
                Some(fmt::layer()
                    .json()
                    .with_target(false)
                    .with_span_events(fmt::format::FmtSpan::CLOSE)) // Log span close with duration
            } else {
                Some(fmt::layer()
                    .json()
                    .with_target(false))
            }
        )
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn,hyper=warn,tower=warn"))
        );

    if enable_otel {
        match init_opentelemetry(config) {
            Ok(provider) => {
                opentelemetry::global::set_tracer_provider(provider.clone());

                // global::tracer returns BoxedTracer which doesn't implement PreSampledTracer
                let tracer = provider.tracer(config.service_name.clone());

                subscriber
                    .with(OpenTelemetryLayer::new(tracer))
                    .init();

                info!("OpenTelemetry enabled: {}", config.endpoint);
            }
            Err(e) => {
                tracing::error!(error = %e, "OpenTelemetry init failed, logging only");
                subscriber.init();
            }
        }
    } else {
        subscriber.init();
    }
}

fn init_opentelemetry(config: &TelemetryConfig) -> Result<SdkTracerProvider, Box<dyn std::error::Error>> {
    let resource = Resource::builder()
        .with_attribute(KeyValue::new("service.name", config.service_name.clone()))
        .with_attribute(KeyValue::new("service.version", env!("CARGO_PKG_VERSION")))
        .with_attribute(KeyValue::new("deployment.environment", config.environment.clone()))
        .build();

    let endpoint = config.endpoint.as_str();
    let exporter = if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        SpanExporter::builder()
            .with_http()
            .with_endpoint(endpoint)
            .build()?
    } else {
        SpanExporter::builder()
            .with_tonic()
            .with_endpoint(endpoint)
            .build()?
    };

    let provider = SdkTracerProvider::builder()
        .with_resource(resource)
        .with_sampler(Sampler::TraceIdRatioBased(config.sampling_rate))
        .with_batch_exporter(exporter)
        .build();

    info!("OpenTelemetry sampling rate: {}%", config.sampling_rate * 100.0);

    Ok(provider)
}

/// Routes over any store; `create_app` wires the Postgres one
pub fn router<S: ReputationStore>(state: AppState<S>) -> Router {
    Router::new()
        .route(
            "/reviews/expert/{id}",
            post(submit_review_handler::<S>).get(expert_reviews_handler::<S>),
        )
        .route("/reviews/user", get(user_reviews_handler::<S>))
        .route(
            "/reviews/{review_id}",
            patch(update_review_handler::<S>).delete(delete_review_handler::<S>),
        )
        .route("/health", get(health_check::<S>))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

pub async fn create_app(config: &ServerConfig) -> Result<Router, Box<dyn std::error::Error>> {
    let pool = create_pool(&config.database_url, config.db_max_connections).await?;

    if config.run_migrations {
        run_migrations(&pool).await?;
    }

    let state = AppState::new(PgReputationStore::new(pool), &config.jwt_secret);
    Ok(router(state))
}

/// Liveness plus a store round trip; a store failure is a 500 envelope
async fn health_check<S: ReputationStore>(
    State(state): State<AppState<S>>,
) -> Result<&'static str, ApiError> {
    state.reviews.health_check().await?;
    Ok("OK")
}

pub async fn run_server() -> Result<(), Box<dyn std::error::Error>> {
    let config = ServerConfig::from_env()?;

    init_tracing(&config.telemetry);

    info!("Starting expert reputation server");

    // Set up ctrl-c handler for graceful shutdown
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install CTRL+C signal handler: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Shutting down gracefully...");
    };

    let app = create_app(&config).await?;

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));

    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}
