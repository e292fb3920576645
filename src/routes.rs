// src/routes.rs

use axum::{
    Router,
    http::{HeaderName, HeaderValue, Method, header},
    middleware,
    routing::{delete, get, post},
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    config::API_KEY_HEADER,
    handlers::{admin, assessment, auth, profile, results},
    state::AppState,
    utils::{
        api_key::api_key_middleware,
        jwt::{admin_middleware, auth_middleware},
    },
};

/// Assembles the main application router.
///
/// * Merges all sub-routers (auth, tests, results, profile, admin, partner).
/// * Applies global middleware (Trace, CORS).
/// * Injects global state (store + config).
pub fn create_router(state: AppState) -> Router {
    let origins: Vec<HeaderValue> = state
        .config
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static(API_KEY_HEADER),
        ]);

    let require_login = middleware::from_fn_with_state(state.clone(), auth_middleware);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login));

    let test_routes = Router::new()
        .route("/{family}", get(assessment::list_tests))
        .route("/{family}/{test_id}/questions", get(assessment::list_questions))
        // Protected test routes
        .merge(
            Router::new()
                .route("/{family}/submissions", post(assessment::submit_answers))
                .layer(require_login.clone()),
        );

    let result_routes = Router::new()
        .route("/", get(results::list_my_results))
        .route("/{id}", get(results::get_result))
        .layer(require_login.clone());

    let profile_routes = Router::new()
        .route("/me", get(profile::get_me))
        .layer(require_login.clone());

    let admin_routes = Router::new()
        .route("/tests", post(admin::create_test))
        .route("/tests/{test_id}/questions", post(admin::create_question))
        .route("/users", get(admin::list_users))
        .route("/users/{id}", delete(admin::delete_user))
        .route(
            "/api-keys",
            get(admin::list_api_keys).post(admin::create_api_key),
        )
        .route("/api-keys/{id}", delete(admin::revoke_api_key))
        // Double middleware protection: Auth first, then Admin check
        .layer(middleware::from_fn(admin_middleware))
        .layer(require_login);

    let partner_routes = Router::new()
        .route("/users/{user_id}/profile", get(profile::get_partner_profile))
        .layer(middleware::from_fn_with_state(state.clone(), api_key_middleware));

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/tests", test_routes)
        .nest("/api/results", result_routes)
        .nest("/api/profile", profile_routes)
        .nest("/api/admin", admin_routes)
        .nest("/api/partner", partner_routes)
        // Global Middleware (applied from outside in)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
