use axum::{
    routing::get,
    Router,
};

use crate::state::AppState;

pub mod dto;
pub mod handlers;
pub mod repo;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list))
        .route(
            "/question/submit",
            get(handlers::submit_page).post(handlers::submit),
        )
        .route(
            "/question/:question_id",
            get(handlers::view).post(handlers::post_answer),
        )
        .route(
            "/question/:question_id/edit",
            get(handlers::edit_page).post(handlers::edit),
        )
}
