use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Client, Method, RequestBuilder, Response};

use super::{StoreError, StudentStore};
use crate::models::{NewStudent, Student};

const RETURN_ROWS: &str = "return=representation";

/// Table exposed over a PostgREST-style HTTP API (`/rest/v1/<table>`),
/// authenticated with an API key.
pub struct RestStore {
    client: Client,
    endpoint: String,
}

impl RestStore {
    pub fn new(base_url: &str, api_key: &str, table: &str) -> Result<Self, StoreError> {
        let mut headers = HeaderMap::new();
        let mut key = HeaderValue::from_str(api_key).map_err(|_| StoreError::InvalidApiKey)?;
        let mut bearer = HeaderValue::from_str(&format!("Bearer {}", api_key))
            .map_err(|_| StoreError::InvalidApiKey)?;
        key.set_sensitive(true);
        bearer.set_sensitive(true);
        headers.insert("apikey", key);
        headers.insert(AUTHORIZATION, bearer);

        let client = Client::builder().default_headers(headers).build()?;
        Ok(Self {
            client,
            endpoint: format!("{}/rest/v1/{}", base_url.trim_end_matches('/'), table),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn request(&self, method: Method) -> RequestBuilder {
        self.client.request(method, &self.endpoint)
    }

    fn filter_id(builder: RequestBuilder, id: i64) -> RequestBuilder {
        builder.query(&[("id", format!("eq.{}", id))])
    }
}

async fn rows(response: Response) -> Result<Vec<Student>, StoreError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(StoreError::Status {
            status: status.as_u16(),
            body,
        });
    }
    Ok(response.json::<Vec<Student>>().await?)
}

#[async_trait]
impl StudentStore for RestStore {
    async fn list(&self) -> Result<Vec<Student>, StoreError> {
        let response = self
            .request(Method::GET)
            .query(&[("select", "*"), ("order", "id.asc")])
            .send()
            .await?;
        rows(response).await
    }

    async fn insert(&self, student: &NewStudent) -> Result<Student, StoreError> {
        let response = self
            .request(Method::POST)
            .header("Prefer", RETURN_ROWS)
            .json(student)
            .send()
            .await?;
        rows(response)
            .await?
            .into_iter()
            .next()
            .ok_or(StoreError::MissingRow("insert"))
    }

    async fn update(&self, id: i64, student: &NewStudent) -> Result<Option<Student>, StoreError> {
        let response = Self::filter_id(self.request(Method::PATCH), id)
            .header("Prefer", RETURN_ROWS)
            .json(student)
            .send()
            .await?;
        Ok(rows(response).await?.into_iter().next())
    }

    async fn delete(&self, id: i64) -> Result<bool, StoreError> {
        let response = Self::filter_id(self.request(Method::DELETE), id)
            .header("Prefer", RETURN_ROWS)
            .send()
            .await?;
        Ok(!rows(response).await?.is_empty())
    }
}
