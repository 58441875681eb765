use super::handlers;
use super::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    // The desktop shell and dev frontends run on changing local origins, so
    // CORS stays permissive. The server binds to loopback by default.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health check
        .route("/", get(handlers::health_check))
        .route("/api/status", get(handlers::service_status))
        // Chunked recording lifecycle
        .route(
            "/api/recording/initialize",
            post(handlers::initialize_recording),
        )
        .route(
            "/api/recording/chunk/:session_id/:chunk_index",
            post(handlers::upload_chunk),
        )
        .route(
            "/api/recording/finalize/:session_id",
            post(handlers::finalize_recording),
        )
        .route(
            "/api/recording/status/:session_id",
            get(handlers::recording_status),
        )
        .route(
            "/api/recording/sessions",
            get(handlers::list_recording_sessions),
        )
        .route("/api/recording/reclaim", post(handlers::reclaim_sessions))
        // One-shot transcription and summarization
        .route("/api/transcribe", post(handlers::transcribe_upload))
        .route("/api/summarize", post(handlers::summarize_transcript))
        // Saved session records
        .route(
            "/api/sessions",
            post(handlers::create_record).get(handlers::list_records),
        )
        .route(
            "/api/sessions/:record_id",
            get(handlers::get_record)
                .put(handlers::update_record)
                .delete(handlers::delete_record),
        )
        .route("/api/sessions/:record_id/export", get(handlers::export_record))
        // Request logging
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
