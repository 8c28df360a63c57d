use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use url::Url;

use super::{ApiClient, ApiRequest, ApiResponse, Method};
use crate::error::ApiError;

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

/// Talks to the real portal backend over HTTP.
#[derive(Clone)]
pub struct HttpApiClient {
    client: Client,
    base_url: Url,
}

impl HttpApiClient {
    #[must_use]
    pub fn new(base_url: Url) -> Self {
        Self {
            client: Client::new(),
            base_url,
        }
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let path = path.trim_start_matches('/');
        Ok(Url::parse(&format!("{base}/{path}"))?)
    }
}

#[async_trait]
impl ApiClient for HttpApiClient {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        let url = self.endpoint(&request.path)?;
        let mut builder = self.client.request(request.method.into(), url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let bytes = response.bytes().await?;
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };

        tracing::debug!(method = %request.method, path = %request.path, status, "api response");
        Ok(ApiResponse::new(status, body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> HttpApiClient {
        HttpApiClient::new(Url::parse(&server.uri()).unwrap())
    }

    #[test]
    fn endpoint_joins_without_double_slashes() {
        let client = HttpApiClient::new(Url::parse("https://portal.example/").unwrap());
        let url = client.endpoint("/api/courses?x=1").unwrap();
        assert_eq!(url.as_str(), "https://portal.example/api/courses?x=1");
    }

    #[tokio::test]
    async fn forwards_body_and_headers() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/login"))
            .and(header("x-client", "portal"))
            .and(body_json(json!({ "cpf": "1", "password": "2" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "token": "t" })))
            .mount(&server)
            .await;

        let request = ApiRequest::post("/api/auth/login", json!({ "cpf": "1", "password": "2" }))
            .with_header("x-client", "portal");
        let response = client(&server).send(request).await.unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(response.body["token"], "t");
    }

    #[tokio::test]
    async fn error_statuses_are_responses() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/courses/9"))
            .respond_with(
                ResponseTemplate::new(404).set_body_json(json!({ "message": "Course not found" })),
            )
            .mount(&server)
            .await;

        let response = client(&server)
            .send(ApiRequest::get("/api/courses/9"))
            .await
            .unwrap();
        assert_eq!(response.status, 404);
        assert_eq!(response.message(), Some("Course not found"));
    }

    #[tokio::test]
    async fn query_strings_and_non_json_bodies() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/announcements"))
            .and(query_param("courseId", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_string("plain text"))
            .mount(&server)
            .await;

        let response = client(&server)
            .send(ApiRequest::get("/api/announcements?courseId=1"))
            .await
            .unwrap();
        assert!(response.is_success());
        assert_eq!(response.body, Value::Null);
    }
}
