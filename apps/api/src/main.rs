use std::sync::Arc;

use dotenv::dotenv;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{self, TraceLayer};
use tracing::{info, warn, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod router;

use appointment_cell::models::AppointmentEvent;
use appointment_cell::services::{BroadcastEventPublisher, SchedulingEngine, SchedulingStores};
use appointment_cell::store::SupabaseAppointmentStore;
use appointment_cell::SystemClock;
use doctor_cell::services::AvailabilityService;
use doctor_cell::store::SupabaseAvailabilityStore;
use shared_config::AppConfig;
use shared_database::SupabaseClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Loading Env Vars
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Amae Scheduling API server");

    let config = AppConfig::from_env();
    let stores = build_stores(&config);

    let events = Arc::new(BroadcastEventPublisher::new(config.scheduling.event_buffer));
    tokio::spawn(log_events(events.subscribe()));

    let availability = Arc::new(AvailabilityService::new(
        stores.availability.clone(),
        stores.offerings.clone(),
        &config.scheduling,
    ));
    let engine = Arc::new(SchedulingEngine::new(
        stores,
        events,
        Arc::new(SystemClock),
        &config.scheduling,
    ));

    // Set up CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = router::create_router(engine, availability)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(trace::DefaultMakeSpan::new().level(Level::INFO))
                .on_response(trace::DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors);

    let listener = TcpListener::bind(&config.bind_addr).await?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}

fn build_stores(config: &AppConfig) -> SchedulingStores {
    if !config.is_configured() {
        warn!("Supabase is not configured, using in-memory stores");
        return SchedulingStores::in_memory();
    }

    info!("Using Supabase at {}", config.supabase_url);
    let supabase = Arc::new(SupabaseClient::new(config));
    let availability = Arc::new(SupabaseAvailabilityStore::new(supabase.clone()));
    SchedulingStores {
        availability: availability.clone(),
        offerings: availability,
        appointments: Arc::new(SupabaseAppointmentStore::new(supabase)),
    }
}

async fn log_events(mut rx: broadcast::Receiver<AppointmentEvent>) {
    loop {
        match rx.recv().await {
            Ok(event) => {
                let appointment = event.appointment();
                info!(
                    appointment_id = %appointment.id,
                    doctor_id = %appointment.doctor_id,
                    status = %appointment.status,
                    "appointment event {}",
                    event.name()
                );
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!("Event log lagged, skipped {} events", skipped);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
