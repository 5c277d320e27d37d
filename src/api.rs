use axum::async_trait;
use axum::extract::{FromRequest, Path, Request, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::StatusCode;
use axum::{Form, Json};
use serde::Serialize;

use crate::auth::ApiUser;
use crate::err::Error;
use crate::models::{Student, StudentForm, StudentPayload};
use crate::state::AppState;
use crate::students::parse_id;
use crate::{proceeds, Payload};

/// `name`/`age` from either a JSON or a url-encoded body. Unreadable bodies
/// are validation failures.
pub struct StudentBody(pub StudentPayload);

#[async_trait]
impl<S> FromRequest<S> for StudentBody
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_form = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.starts_with("application/x-www-form-urlencoded"))
            .unwrap_or(false);

        if is_form {
            let Form(form) = Form::<StudentForm>::from_request(req, state)
                .await
                .map_err(|rejection| Error::validation(rejection.body_text()))?;
            Ok(StudentBody(form.into()))
        } else {
            let Json(payload) = Json::<StudentPayload>::from_request(req, state)
                .await
                .map_err(|rejection| Error::validation(rejection.body_text()))?;
            Ok(StudentBody(payload))
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StudentUpdated {
    pub message: &'static str,
    pub student: Student,
}

#[derive(Debug, Clone, Serialize)]
pub struct StudentDeleted {
    pub message: &'static str,
}

pub async fn list_students(_user: ApiUser, State(state): State<AppState>) -> Payload<Vec<Student>> {
    proceeds(state.students.list().await.students)
}

pub async fn create_student(
    _user: ApiUser,
    State(state): State<AppState>,
    StudentBody(payload): StudentBody,
) -> Result<(StatusCode, Json<Student>), Error> {
    let created = state.students.create(payload).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update_student(
    _user: ApiUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    StudentBody(payload): StudentBody,
) -> Payload<StudentUpdated> {
    let id = parse_id(&id)?;
    let student = state.students.update(id, payload).await?;
    proceeds(StudentUpdated {
        message: "Student updated successfully",
        student,
    })
}

pub async fn delete_student(
    _user: ApiUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Payload<StudentDeleted> {
    let id = parse_id(&id)?;
    state.students.delete(id).await?;
    proceeds(StudentDeleted {
        message: "Student deleted successfully",
    })
}
