pub mod middleware;
pub mod routes;
pub mod state;

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use http::header::{HeaderValue, CACHE_CONTROL};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use self::middleware::auth as auth_middleware;
use self::routes::{auth, debug, health, participant, participants, statistics, users};
use self::state::AppState;

pub fn build_router(state: AppState) -> Router {
    // Any signed-in staff member
    let staff_routes = Router::new()
        .route(
            "/api/participant",
            get(participant::lookup_handler).post(participant::check_in_handler),
        )
        .route("/api/participants", get(participants::list_handler))
        .route("/api/statistics", get(statistics::statistics_handler))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            auth_middleware::require_auth,
        ));

    // Admins only
    let admin_routes = Router::new()
        .route(
            "/api/users",
            get(users::list_users_handler)
                .post(users::create_user_handler)
                .put(users::update_user_handler)
                .delete(users::delete_user_handler),
        )
        .route("/api/debug/stores", get(debug::stores_handler))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            auth_middleware::require_admin,
        ));

    Router::new()
        // Public routes
        .route("/health", get(health::health_handler))
        .route("/api/auth/login", post(auth::login_handler))
        .route("/api/auth/register", post(auth::register_handler))
        .route("/api/auth/verify", get(auth::verify_handler))
        .route("/api/auth/logout", post(auth::logout_handler))
        // Protected routes
        .merge(staff_routes)
        .merge(admin_routes)
        // Layers
        .layer(SetResponseHeaderLayer::if_not_present(
            CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::new())
        // State
        .with_state(state)
}
