pub mod attempts;
pub mod batches;
pub mod health;
pub mod questions;
pub mod quizzes;

use axum::{
    extract::DefaultBodyLimit,
    middleware::from_fn_with_state,
    routing::{get, post, put},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::middleware::{
    auth::{require_admin, require_bearer_auth},
    cors::api_cors,
};
use crate::AppState;

pub fn router(state: AppState) -> Router {
    let base_routes = Router::new().route("/health", get(health::health));

    let admin_api = Router::new()
        .route(
            "/api/questions",
            get(questions::list_questions).post(questions::create_question),
        )
        .route(
            "/api/questions/criteria-stats",
            get(questions::criteria_stats),
        )
        .route(
            "/api/questions/preview",
            post(questions::preview_selection),
        )
        .route("/api/questions/import", post(questions::import_questions))
        .route(
            "/api/questions/:id",
            get(questions::get_question)
                .patch(questions::update_question)
                .delete(questions::delete_question),
        )
        .route(
            "/api/batches",
            get(batches::list_batches).post(batches::create_batch),
        )
        .route("/api/batches/:id", get(batches::get_batch))
        .route(
            "/api/batches/:id/users/:user_id",
            post(batches::add_user).delete(batches::remove_user),
        )
        .route(
            "/api/batches/:id/questions/:question_id",
            post(batches::add_question).delete(batches::remove_question),
        )
        .route("/api/batches/:id/quizzes", post(batches::create_batch_quiz))
        .layer(from_fn_with_state(state.clone(), require_admin));

    let user_api = Router::new()
        .route(
            "/api/quizzes",
            get(quizzes::list_quizzes).post(quizzes::create_quiz),
        )
        .route(
            "/api/quizzes/:id",
            get(quizzes::get_quiz).delete(quizzes::delete_quiz),
        )
        .route("/api/quizzes/:id/attempts", post(attempts::start_attempt))
        .route("/api/attempts", get(attempts::list_attempts))
        .route("/api/attempts/statistics", get(attempts::attempt_statistics))
        .route("/api/attempts/:id", get(attempts::get_attempt))
        .route(
            "/api/attempts/:id/answers/:question_id",
            put(attempts::submit_answer),
        )
        .route(
            "/api/attempts/:id/game-results",
            post(attempts::submit_game_results),
        )
        .route(
            "/api/attempts/:id/complete",
            post(attempts::complete_attempt),
        )
        .route("/api/attempts/:id/abandon", post(attempts::abandon_attempt))
        .layer(from_fn_with_state(state.clone(), require_bearer_auth));

    base_routes
        .merge(admin_api)
        .merge(user_api)
        .with_state(state)
        .layer(api_cors())
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(5 * 1024 * 1024))
}
