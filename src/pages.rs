use std::any::Any;

use axum::extract::rejection::FormRejection;
use axum::extract::State;
use axum::http::{StatusCode, Uri};
use axum::response::{IntoResponse, Redirect, Response};
use axum::Form;
use serde::Deserialize;

use crate::auth::{Flash, PageUser, Session};
use crate::err::Error;
use crate::models::{StudentForm, StudentPayload};
use crate::state::AppState;
use crate::views;

#[derive(Debug, Default, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

pub async fn index(session: Session) -> Redirect {
    if session.is_authenticated() {
        Redirect::to("/dashboard")
    } else {
        Redirect::to("/login")
    }
}

pub async fn login_form(State(state): State<AppState>, session: Session) -> Response {
    if session.is_authenticated() {
        return Redirect::to("/dashboard").into_response();
    }
    let flashes = state.gate.take_flashes(&session).await;
    views::login(&flashes, None).into_response()
}

pub async fn login_submit(
    State(state): State<AppState>,
    session: Session,
    form: Result<Form<LoginForm>, FormRejection>,
) -> Response {
    let form = form.map(|Form(form)| form).unwrap_or_default();
    match state
        .gate
        .authenticate(&session, &form.username, &form.password)
        .await
    {
        Some(mut signed_in) => {
            state
                .gate
                .flash(&mut signed_in, Flash::success("Login successful!"))
                .await;
            state.gate.redirect(&signed_in, "/dashboard")
        }
        None => {
            let flashes = state.gate.take_flashes(&session).await;
            views::login(&flashes, Some("Invalid username or password")).into_response()
        }
    }
}

pub async fn logout(State(state): State<AppState>, session: Session) -> Response {
    let mut fresh = state.gate.logout(&session).await;
    state
        .gate
        .flash(&mut fresh, Flash::info("You have been logged out"))
        .await;
    state.gate.redirect(&fresh, "/login")
}

pub async fn dashboard(State(state): State<AppState>, PageUser(session): PageUser) -> Response {
    let listing = state.students.list().await;
    let mut flashes = state.gate.take_flashes(&session).await;
    if listing.failed {
        flashes.push(Flash::error("Error loading student data"));
    }
    let username = session.username.as_deref().unwrap_or_default();
    views::dashboard(username, &listing.students, &flashes).into_response()
}

pub async fn add_student(
    State(state): State<AppState>,
    PageUser(mut session): PageUser,
    form: Result<Form<StudentForm>, FormRejection>,
) -> Redirect {
    let outcome = match form {
        Ok(Form(form)) => state.students.create(StudentPayload::from(form)).await,
        Err(rejection) => Err(Error::validation(rejection.body_text())),
    };
    let flash = match outcome {
        Ok(_) => Flash::success("Student added successfully!"),
        Err(err @ Error::Validation { .. }) => Flash::error(err.public_message()),
        Err(_) => Flash::error("Error adding student"),
    };
    state.gate.flash(&mut session, flash).await;
    Redirect::to("/dashboard")
}

pub async fn favicon() -> StatusCode {
    StatusCode::NO_CONTENT
}

pub async fn not_found(uri: Uri) -> Response {
    log::debug!("No route for {}", uri);
    (StatusCode::NOT_FOUND, views::error("Page not found")).into_response()
}

pub fn internal_error(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    log::error!("Internal server error: {}", detail);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        views::error("Internal server error"),
    )
        .into_response()
}
