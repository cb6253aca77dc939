use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::header::AUTHORIZATION;
use serde::de::DeserializeOwned;
use url::Url;

use crate::auth::TokenProvider;
use crate::error::{PipeScanError, Result};

use super::types::{Build, Job, Resources};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Builds the one HTTP client shared by the token provider and the API
/// client, so every outbound call carries the same timeout and TLS settings.
///
/// Certificate validation is disabled: Concourse installs commonly sit
/// behind self-signed certificates.
pub fn build_http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(concat!("pipescan/", env!("CARGO_PKG_VERSION")))
        .timeout(REQUEST_TIMEOUT)
        .danger_accept_invalid_certs(true)
        .build()
        .map_err(|e| PipeScanError::Config(format!("failed to build HTTP client: {e}")))
}

/// The read operations the scanner needs from the Concourse API.
#[async_trait]
pub trait BuildApi: Send + Sync {
    async fn list_jobs(&self, pipeline: &str) -> Result<Vec<Job>>;

    async fn list_builds(&self, pipeline: &str, job: &str) -> Result<Vec<Build>>;

    async fn build_resources(&self, build_id: i64) -> Result<Resources>;
}

/// Concourse v1 API client.
///
/// Runs in anonymous mode when no token provider is configured: requests
/// then carry no Authorization header at all.
pub struct ConcourseClient {
    client: reqwest::Client,
    base_url: String,
    team: String,
    token_provider: Option<Arc<TokenProvider>>,
}

impl ConcourseClient {
    pub fn new(
        host: &str,
        team: String,
        client: reqwest::Client,
        token_provider: Option<Arc<TokenProvider>>,
    ) -> Result<Self> {
        Url::parse(host).map_err(|e| PipeScanError::Config(format!("invalid host URL: {e}")))?;

        Ok(Self {
            client,
            base_url: host.trim_end_matches('/').to_string(),
            team,
            token_provider,
        })
    }

    /// Issues one authenticated GET and decodes the body strictly. Non-2xx
    /// statuses are not inspected; whatever body comes back must decode into
    /// `T` or the call fails.
    async fn get_json<T: DeserializeOwned>(&self, url: String, endpoint: &'static str) -> Result<T> {
        debug!("GET {url}");

        let mut request = self.client.get(&url);
        if let Some(provider) = &self.token_provider {
            request = request.header(AUTHORIZATION, provider.get_authorization_header().await?);
        }

        let body = request.send().await?.text().await?;

        serde_json::from_str(&body).map_err(|source| PipeScanError::Decode { endpoint, source })
    }
}

#[async_trait]
impl BuildApi for ConcourseClient {
    async fn list_jobs(&self, pipeline: &str) -> Result<Vec<Job>> {
        let url = format!(
            "{}/api/v1/teams/{}/pipelines/{}/jobs",
            self.base_url, self.team, pipeline
        );

        self.get_json(url, "job list").await
    }

    async fn list_builds(&self, pipeline: &str, job: &str) -> Result<Vec<Build>> {
        let url = format!(
            "{}/api/v1/teams/{}/pipelines/{}/jobs/{}/builds",
            self.base_url, self.team, pipeline, job
        );

        self.get_json(url, "build list").await
    }

    async fn build_resources(&self, build_id: i64) -> Result<Resources> {
        let url = format!("{}/api/v1/builds/{}/resources", self.base_url, build_id);

        self.get_json(url, "build resources").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::SystemClock;

    fn anonymous_client(server: &mockito::Server) -> ConcourseClient {
        ConcourseClient::new(
            &server.url(),
            "main".to_string(),
            reqwest::Client::new(),
            None,
        )
        .unwrap()
    }

    #[test]
    fn rejects_unparseable_host() {
        let result = ConcourseClient::new(
            "not a url",
            "main".to_string(),
            reqwest::Client::new(),
            None,
        );

        assert!(matches!(result, Err(PipeScanError::Config(_))));
    }

    #[tokio::test]
    async fn list_jobs_decodes_response() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v1/teams/main/pipelines/p1/jobs")
            .with_body(
                r#"[{"id": 7, "name": "unit", "url": "/p1/jobs/unit",
                     "finished_build": {"id": 10, "status": "succeeded", "job_name": "unit"},
                     "next_build": null}]"#,
            )
            .create_async()
            .await;

        let client = anonymous_client(&server);
        let jobs = client.list_jobs("p1").await.unwrap();

        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].name, "unit");
        assert_eq!(jobs[0].finished_build.as_ref().unwrap().status, "succeeded");
        assert!(jobs[0].next_build.is_none());
    }

    #[tokio::test]
    async fn list_builds_preserves_upstream_order() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v1/teams/main/pipelines/p1/jobs/unit/builds")
            .with_body(
                r#"[{"id": 3, "name": "3", "status": "failed"},
                    {"id": 2, "name": "2", "status": "succeeded"},
                    {"id": 1, "name": "1", "status": "succeeded"}]"#,
            )
            .create_async()
            .await;

        let client = anonymous_client(&server);
        let builds = client.list_builds("p1", "unit").await.unwrap();

        let ids: Vec<i64> = builds.iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![3, 2, 1]);
    }

    #[tokio::test]
    async fn build_resources_decodes_inputs() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v1/builds/42/resources")
            .with_body(
                r#"{"inputs": [{"name": "product-version",
                                "resource": "product-version",
                                "type": "semver",
                                "version": {"number": "1.2.3"},
                                "metadata": [{"name": "number", "value": "1.2.3"}],
                                "first_occurrence": true}],
                    "outputs": []}"#,
            )
            .create_async()
            .await;

        let client = anonymous_client(&server);
        let resources = client.build_resources(42).await.unwrap();

        assert_eq!(resources.inputs.len(), 1);
        assert_eq!(resources.inputs[0].resource, "product-version");
        assert_eq!(resources.inputs[0].version.number, "1.2.3");
        assert!(resources.inputs[0].first_occurrence);
    }

    #[tokio::test]
    async fn attaches_cached_authorization_header() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v1/teams/main/auth/token")
            .with_body(r#"{"type":"Bearer","value":"abc123"}"#)
            .expect(1)
            .create_async()
            .await;

        let jobs = server
            .mock("GET", "/api/v1/teams/main/pipelines/p1/jobs")
            .match_header("authorization", "Bearer abc123")
            .with_body("[]")
            .expect(2)
            .create_async()
            .await;

        let http = reqwest::Client::new();
        let provider = Arc::new(TokenProvider::new(
            &server.url(),
            "main",
            "user".to_string(),
            "pass".to_string(),
            http.clone(),
            Arc::new(SystemClock),
        ));
        let client =
            ConcourseClient::new(&server.url(), "main".to_string(), http, Some(provider)).unwrap();

        client.list_jobs("p1").await.unwrap();
        client.list_jobs("p1").await.unwrap();

        jobs.assert_async().await;
    }

    #[tokio::test]
    async fn anonymous_mode_sends_no_authorization_header() {
        let mut server = mockito::Server::new_async().await;
        let jobs = server
            .mock("GET", "/api/v1/teams/main/pipelines/p1/jobs")
            .match_header("authorization", mockito::Matcher::Missing)
            .with_body("[]")
            .create_async()
            .await;

        let client = anonymous_client(&server);
        client.list_jobs("p1").await.unwrap();

        jobs.assert_async().await;
    }

    #[tokio::test]
    async fn malformed_body_is_a_decode_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v1/teams/main/pipelines/p1/jobs")
            .with_body("<html>login required</html>")
            .create_async()
            .await;

        let client = anonymous_client(&server);
        let err = client.list_jobs("p1").await.unwrap_err();

        assert!(
            matches!(err, PipeScanError::Decode { endpoint: "job list", .. }),
            "got: {err}"
        );
    }
}
