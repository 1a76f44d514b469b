pub mod error;
pub mod extractors;
pub mod routes;
pub mod state;
pub mod ws;

use axum::{
    Json, Router,
    extract::State,
    http::HeaderValue,
    routing::{delete, get, post, put},
};
use state::AppState;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() {
        return layer.allow_origin(Any);
    }

    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(%origin, "Ignoring malformed CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(parsed))
}

pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.settings.app.cors_origins);

    let auth_routes = Router::new()
        .route("/register", post(routes::auth::register))
        .route("/login", post(routes::auth::login))
        .route("/refresh", post(routes::auth::refresh))
        .route("/me", get(routes::auth::me))
        .route("/change-password", put(routes::auth::change_password));

    let lead_routes = Router::new()
        .route("/", get(routes::lead::list).post(routes::lead::create))
        .route(
            "/{lead_id}",
            get(routes::lead::get)
                .put(routes::lead::update)
                .delete(routes::lead::delete),
        )
        .route("/{lead_id}/activities", post(routes::lead::add_activity))
        .route(
            "/{lead_id}/activities/{activity_id}",
            put(routes::lead::update_activity).delete(routes::lead::delete_activity),
        );

    // static segments first so they never parse as an id
    let notification_routes = Router::new()
        .route("/", get(routes::notification::list))
        .route("/unread", get(routes::notification::unread_count))
        .route("/read-all", put(routes::notification::mark_all_read))
        .route(
            "/register-token",
            post(routes::notification::register_token),
        )
        .route("/remove-token", delete(routes::notification::remove_token))
        .route("/{notification_id}", put(routes::notification::mark_read));

    let user_routes = Router::new()
        .route("/", get(routes::user::list).post(routes::user::create))
        .route("/sales", get(routes::user::list_sales))
        .route(
            "/{user_id}",
            get(routes::user::get)
                .put(routes::user::update)
                .delete(routes::user::delete),
        )
        .route(
            "/{user_id}/notification-preferences",
            put(routes::user::update_preferences),
        );

    let api = Router::new()
        .nest("/auth", auth_routes)
        .nest("/leads", lead_routes)
        .nest("/notifications", notification_routes)
        .nest("/users", user_routes);

    Router::new()
        .nest("/api", api)
        .route("/health", get(health_check))
        .route("/ws", get(ws::handler::ws_upgrade))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "connections": state.ws_storage.connection_count(),
        "push": state.push.is_some(),
    }))
}
