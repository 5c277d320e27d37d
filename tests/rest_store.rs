//! Remote table adapter against a `wiremock` server standing in for the
//! hosted PostgREST endpoint.

use std::sync::Arc;

use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use student_panel::err::Error;
use student_panel::models::{NewStudent, Student, StudentPayload};
use student_panel::store::{RestStore, StoreError, StudentStore};
use student_panel::students::Students;

const TABLE_PATH: &str = "/rest/v1/students";
const KEY: &str = "service-key";

fn store(server: &MockServer) -> RestStore {
    RestStore::new(&server.uri(), KEY, "students").unwrap()
}

fn grace() -> NewStudent {
    NewStudent {
        name: "Grace".into(),
        age: 28,
    }
}

#[tokio::test]
async fn list_sends_credentials_and_ordering() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(TABLE_PATH))
        .and(query_param("select", "*"))
        .and(query_param("order", "id.asc"))
        .and(header("apikey", KEY))
        .and(header("authorization", "Bearer service-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 1, "name": "Ada", "age": 30, "created_at": "2024-01-01T00:00:00Z"},
            {"id": 2, "name": "Grace", "age": 28, "created_at": "2024-01-02T00:00:00Z"}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let students = store(&server).list().await.unwrap();
    assert_eq!(
        students,
        vec![
            Student {
                id: 1,
                name: "Ada".into(),
                age: 30
            },
            Student {
                id: 2,
                name: "Grace".into(),
                age: 28
            },
        ]
    );
}

#[tokio::test]
async fn insert_asks_for_the_created_row() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TABLE_PATH))
        .and(header("prefer", "return=representation"))
        .and(body_json(json!({"name": "Grace", "age": 28})))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(json!([{"id": 7, "name": "Grace", "age": 28}])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let created = store(&server).insert(&grace()).await.unwrap();
    assert_eq!(created.id, 7);
}

#[tokio::test]
async fn insert_without_returned_row_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([])))
        .mount(&server)
        .await;

    assert!(matches!(
        store(&server).insert(&grace()).await,
        Err(StoreError::MissingRow("insert"))
    ));
}

#[tokio::test]
async fn update_filters_by_id_and_reports_zero_rows() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path(TABLE_PATH))
        .and(query_param("id", "eq.3"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([{"id": 3, "name": "Grace", "age": 28}])),
        )
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path(TABLE_PATH))
        .and(query_param("id", "eq.4"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let store = store(&server);
    assert_eq!(
        store.update(3, &grace()).await.unwrap().map(|s| s.id),
        Some(3)
    );
    assert_eq!(store.update(4, &grace()).await.unwrap(), None);
}

#[tokio::test]
async fn delete_reports_whether_a_row_went_away() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(query_param("id", "eq.1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([{"id": 1, "name": "Ada", "age": 30}])),
        )
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(query_param("id", "eq.2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let store = store(&server);
    assert!(store.delete(1).await.unwrap());
    assert!(!store.delete(2).await.unwrap());
}

#[tokio::test]
async fn non_success_status_is_surfaced() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
        .mount(&server)
        .await;

    match store(&server).list().await {
        Err(StoreError::Status { status, body }) => {
            assert_eq!(status, 401);
            assert_eq!(body, "invalid api key");
        }
        other => panic!("unexpected result: {:?}", other),
    }
}

#[tokio::test]
async fn unreachable_store_is_a_transport_error() {
    let port = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();

    let store = RestStore::new(&format!("http://127.0.0.1:{}", port), KEY, "students").unwrap();
    assert!(matches!(
        store.list().await,
        Err(StoreError::Transport(_))
    ));
}

#[tokio::test]
async fn adapter_turns_remote_faults_into_generic_failures() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .respond_with(ResponseTemplate::new(500).set_body_string("relation does not exist"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let students = Students::new(Arc::new(store(&server)));
    let payload: StudentPayload =
        serde_json::from_value(json!({"name": "Grace", "age": 28})).unwrap();
    let err = students.update(1, payload).await.unwrap_err();
    assert_eq!(err, Error::Transport { operation: "update" });
    assert_eq!(err.public_message(), "Internal server error");

    let listing = students.list().await;
    assert!(listing.failed);
    assert!(listing.students.is_empty());
}
