use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::debug;

use super::error::HarvestError;
use super::types::{Credentials, HarvestUser, TimeEntriesPage, TimeEntry};
use crate::calendar::MonthWindow;

pub const API_URL: &str = "https://api.harvestapp.com";

const USER_AGENT: &str = concat!("invoicer/", env!("CARGO_PKG_VERSION"));

pub struct HarvestClient {
    client: Client,
    base_url: String,
}

impl HarvestClient {
    /// Create a client pointing at a custom base URL (useful for testing).
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, HarvestError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(30))
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn authorized(&self, request: RequestBuilder, creds: &Credentials) -> RequestBuilder {
        request
            .header("Harvest-Account-ID", &creds.account_id)
            .bearer_auth(&creds.token)
    }

    /// Validates credentials by asking who they belong to.
    pub async fn whoami(&self, creds: &Credentials) -> Result<HarvestUser, HarvestError> {
        let url = format!("{}/v2/users/me", self.base_url);
        let response = self.authorized(self.client.get(url), creds).send().await?;
        decode(response).await
    }

    /// Fetches every time entry in `window`, following `links.next` until
    /// the last page. Any failing page fails the whole fetch.
    pub async fn time_entries(
        &self,
        creds: &Credentials,
        window: &MonthWindow,
    ) -> Result<Vec<TimeEntry>, HarvestError> {
        let first = self
            .client
            .get(format!("{}/v2/time_entries", self.base_url))
            .query(&window.query());
        let mut page: TimeEntriesPage = decode(self.authorized(first, creds).send().await?).await?;
        let mut entries = std::mem::take(&mut page.time_entries);

        while let Some(next) = page.next_url().map(str::to_string) {
            debug!(url = %next, "fetching next time entries page");
            let response = self.authorized(self.client.get(next), creds).send().await?;
            page = decode(response).await?;
            entries.append(&mut page.time_entries);
        }

        Ok(entries)
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, HarvestError> {
    let status = response.status();
    if !status.is_success() {
        let message = response
            .text()
            .await
            .unwrap_or_else(|_| "unknown error".to_string());
        return Err(HarvestError::ApiError {
            status: status.as_u16(),
            message,
        });
    }
    Ok(response.json::<T>().await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn creds() -> Credentials {
        Credentials {
            account_id: "987".into(),
            token: "tok".into(),
        }
    }

    fn entry(name: &str, hours: f64, date: &str) -> serde_json::Value {
        json!({"hours": hours, "spent_date": date, "client": {"name": name}})
    }

    #[tokio::test]
    async fn whoami_sends_auth_headers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/users/me"))
            .and(header("Harvest-Account-ID", "987"))
            .and(header("Authorization", "Bearer tok"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 7, "first_name": "Ada", "last_name": "Lovelace", "email": "ada@example.com"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = HarvestClient::with_base_url(server.uri()).unwrap();
        let user = client.whoami(&creds()).await.unwrap();
        assert_eq!(user.id, 7);
        assert_eq!(user.last_name, "Lovelace");
    }

    #[tokio::test]
    async fn whoami_maps_unauthorized() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/users/me"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid_token"))
            .mount(&server)
            .await;

        let client = HarvestClient::with_base_url(server.uri()).unwrap();
        let err = client.whoami(&creds()).await.unwrap_err();
        match err {
            HarvestError::ApiError { status, message } => {
                assert_eq!(status, 401);
                assert_eq!(message, "invalid_token");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn time_entries_follow_next_links() {
        let server = MockServer::start().await;
        let next = format!("{}/v2/time_entries?page=2", server.uri());

        Mock::given(method("GET"))
            .and(path("/v2/time_entries"))
            .and(query_param("from", "2024-03-01"))
            .and(query_param("to", "2024-03-31"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "time_entries": [entry("Acme", 1.02, "2024-03-04")],
                "links": {"next": next}
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v2/time_entries"))
            .and(query_param("page", "2"))
            .and(header("Authorization", "Bearer tok"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "time_entries": [entry("Globex", 2.5, "2024-03-05")],
                "links": {"next": null}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = HarvestClient::with_base_url(server.uri()).unwrap();
        let window = MonthWindow::new(2024, 3).unwrap();
        let entries = client.time_entries(&creds(), &window).await.unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].hours, dec!(1.02));
        assert_eq!(entries[1].client.name, "Globex");
    }

    #[tokio::test]
    async fn failing_page_fails_the_fetch() {
        let server = MockServer::start().await;
        let next = format!("{}/v2/time_entries?page=2", server.uri());

        Mock::given(method("GET"))
            .and(path("/v2/time_entries"))
            .and(query_param("page", "2"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v2/time_entries"))
            .and(query_param("from", "2024-03-01"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "time_entries": [entry("Acme", 1.0, "2024-03-04")],
                "links": {"next": next}
            })))
            .mount(&server)
            .await;

        let client = HarvestClient::with_base_url(server.uri()).unwrap();
        let window = MonthWindow::new(2024, 3).unwrap();
        let err = client.time_entries(&creds(), &window).await.unwrap_err();
        assert!(matches!(err, HarvestError::ApiError { status: 500, .. }));
    }
}
