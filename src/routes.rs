// src/routes.rs

use axum::{
    Router, http::Method, middleware,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{auth, exam, progress, result},
    state::AppState,
    utils::jwt::auth_middleware,
};

/// Assembles the main application router.
///
/// * Merges all sub-routers (auth, exams, results, progress).
/// * Layers `auth_middleware` over every protected group, so an unresolved
///   caller identity fails with 401 before any other validation.
/// * Applies global middleware (Trace, CORS) and injects the shared state.
pub fn create_router(state: AppState) -> Router {
    let origins = [
        "http://localhost:3000".parse().unwrap(),
        "http://127.0.0.1:3000".parse().unwrap(),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        // Protected auth routes
        .merge(
            Router::new()
                .route("/me", get(auth::me))
                .route("/logout", post(auth::logout))
                .layer(middleware::from_fn_with_state(
                    state.clone(),
                    auth_middleware,
                )),
        );

    let exam_routes = Router::new()
        .route("/", post(exam::create_exam).get(exam::list_exams))
        .route("/{id}", get(exam::get_exam))
        .route("/{id}/grade", post(exam::grade_exam))
        .route("/{id}/result", get(result::get_result))
        .route("/{id}/dispute", post(result::dispute_question))
        .route("/{id}/regrade", post(result::regrade_exam))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let result_routes = Router::new()
        .route("/", get(result::list_results))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let progress_routes = Router::new()
        .route("/summary", get(progress::summary))
        .route("/trend", get(progress::trend))
        .route("/topics", get(progress::topics))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/exams", exam_routes)
        .nest("/api/results", result_routes)
        .nest("/api/progress", progress_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
