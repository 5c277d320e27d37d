//! Single-operator administration panel for a table of student records.
//!
//! Pages and a JSON API sit behind a session gate; student rows live in a
//! remote table store (PostgREST-style HTTP, direct Postgres, or memory).

pub mod api;
pub mod auth;
pub mod config;
pub mod err;
pub mod models;
pub mod pages;
pub mod state;
pub mod store;
pub mod students;
pub mod views;

use axum::routing::{get, post, put};
use axum::{middleware, Json, Router};
use serde::Serialize;
use tower_http::catch_panic::CatchPanicLayer;

pub use crate::err::Error;
pub use crate::state::AppState;

pub type Payload<T> = Result<Json<T>, Error>;

pub fn proceeds<V>(value: V) -> Payload<V>
where
    V: Serialize,
{
    Ok(Json(value))
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(pages::index))
        .route("/login", get(pages::login_form).post(pages::login_submit))
        .route("/logout", get(pages::logout))
        .route("/dashboard", get(pages::dashboard))
        .route("/students", post(pages::add_student))
        .route("/favicon.ico", get(pages::favicon))
        .route(
            "/api/students",
            get(api::list_students).post(api::create_student),
        )
        .route(
            "/api/students/:id",
            put(api::update_student).delete(api::delete_student),
        )
        .fallback(pages::not_found)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::session_layer,
        ))
        .layer(CatchPanicLayer::custom(pages::internal_error))
        .with_state(state)
}
