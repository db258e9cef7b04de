//! Typed request helpers shared by API sections.
//!
//! A section is a group of calls against one API. Each helper sends the
//! request, checks the status, reports the API as healthy on success and
//! decodes the body. `204 No Content` is always an empty result, never an
//! error.
//!
//! ```no_run
//! use gatekeep_client::{ClientError, ControllerSection};
//! use serde::Deserialize;
//!
//! #[derive(Deserialize)]
//! struct Order {
//!     id: u64,
//! }
//!
//! struct Orders {
//!     section: ControllerSection,
//! }
//!
//! impl Orders {
//!     async fn list(&self) -> Result<Vec<Order>, ClientError> {
//!         let request = self.section.get("orders")?.query(&[("status", "open")]);
//!         self.section.request_many(request).await
//!     }
//! }
//! ```

use std::pin::Pin;
use std::sync::Arc;

use futures::stream::{self, Stream, StreamExt};
use log::{debug, error};
use reqwest::{Method, Response, StatusCode};
use reqwest_middleware::{ClientWithMiddleware, RequestBuilder};
use serde::de::DeserializeOwned;
use url::Url;

use crate::error::ClientError;
use crate::health::HealthCheckController;
use crate::json_array;
use crate::response::ResponseExt;

/// Elements decoded from a JSON array response, in arrival order.
pub type ItemStream<'a, T> = Pin<Box<dyn Stream<Item = Result<T, ClientError>> + Send + 'a>>;

/// Shared client, base address and health state for one API section.
#[derive(Debug, Clone)]
pub struct ControllerSection {
    client: ClientWithMiddleware,
    base_url: Url,
    health: Option<Arc<HealthCheckController>>,
}

impl ControllerSection {
    /// Creates a section. Relative paths are joined onto `base_url`.
    pub fn new(client: impl Into<ClientWithMiddleware>, base_url: Url) -> Self {
        Self {
            client: client.into(),
            base_url,
            health: None,
        }
    }

    /// Reports successful requests to `health`.
    #[must_use]
    pub fn with_health(mut self, health: Arc<HealthCheckController>) -> Self {
        self.health = Some(health);
        self
    }

    /// The base address.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The health state this section reports to, if any.
    #[must_use]
    pub const fn health(&self) -> Option<&Arc<HealthCheckController>> {
        self.health.as_ref()
    }

    /// Resolves `path` against the base address.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidUrl`] if the path cannot be joined.
    pub fn url(&self, path: &str) -> Result<Url, ClientError> {
        Ok(self.base_url.join(path)?)
    }

    /// Starts a request for `method` on `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidUrl`] if the path cannot be joined.
    pub fn builder(&self, method: Method, path: &str) -> Result<RequestBuilder, ClientError> {
        Ok(self.client.request(method, self.url(path)?))
    }

    /// Starts a `GET` request.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidUrl`] if the path cannot be joined.
    pub fn get(&self, path: &str) -> Result<RequestBuilder, ClientError> {
        self.builder(Method::GET, path)
    }

    /// Starts a `POST` request.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidUrl`] if the path cannot be joined.
    pub fn post(&self, path: &str) -> Result<RequestBuilder, ClientError> {
        self.builder(Method::POST, path)
    }

    /// Starts a `PUT` request.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidUrl`] if the path cannot be joined.
    pub fn put(&self, path: &str) -> Result<RequestBuilder, ClientError> {
        self.builder(Method::PUT, path)
    }

    /// Starts a `DELETE` request.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidUrl`] if the path cannot be joined.
    pub fn delete(&self, path: &str) -> Result<RequestBuilder, ClientError> {
        self.builder(Method::DELETE, path)
    }

    /// Sends the request and decodes a JSON body.
    ///
    /// Returns `None` for `204 No Content` or a JSON `null` body.
    ///
    /// # Errors
    ///
    /// Returns an error if the request is refused by the authenticator, fails
    /// in transit, answers with a non-success status, or cannot be decoded.
    pub async fn request<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<Option<T>, ClientError> {
        let response = self.send(request).await?;
        if response.status() == StatusCode::NO_CONTENT {
            return Ok(None);
        }

        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Sends the request and decodes a JSON array.
    ///
    /// Returns an empty `Vec` for `204 No Content` or a JSON `null` body.
    ///
    /// # Errors
    ///
    /// See [`ControllerSection::request`].
    pub async fn request_many<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<Vec<T>, ClientError> {
        Ok(self.request::<Vec<T>>(request).await?.unwrap_or_default())
    }

    /// Sends the request and yields the elements of a JSON array as they
    /// arrive.
    ///
    /// `null` elements are skipped. `204 No Content` and a JSON `null` body
    /// yield nothing. The API is marked healthy once the response status is
    /// known, before any element is read.
    ///
    /// The stream ends after the first error. Errors are those of
    /// [`ControllerSection::request`], plus transport failures while the
    /// body is still arriving.
    pub fn request_stream<'a, T>(
        &'a self,
        request: RequestBuilder,
    ) -> ItemStream<'a, T>
    where
        T: DeserializeOwned + Send + 'a,
    {
        let items = stream::once(self.send(request)).flat_map(
            |sent| -> ItemStream<'a, T> {
                match sent {
                    Ok(response) if response.status() == StatusCode::NO_CONTENT => {
                        Box::pin(stream::empty::<Result<T, ClientError>>())
                    }
                    Ok(response) => Box::pin(json_array::elements::<_, _, T>(response.bytes_stream())),
                    Err(e) => Box::pin(stream::iter([Err::<T, ClientError>(e)])),
                }
            },
        );

        Box::pin(items)
    }

    /// Sends the request and returns the raw body.
    ///
    /// Returns `None` for `204 No Content`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request is refused, fails in transit, or
    /// answers with a non-success status.
    pub async fn request_bytes(
        &self,
        request: RequestBuilder,
    ) -> Result<Option<Vec<u8>>, ClientError> {
        let response = self.send(request).await?;
        if response.status() == StatusCode::NO_CONTENT {
            return Ok(None);
        }

        Ok(Some(response.bytes().await?.to_vec()))
    }

    /// Sends the request and discards the body.
    ///
    /// # Errors
    ///
    /// Returns an error if the request is refused, fails in transit, or
    /// answers with a non-success status.
    pub async fn request_unit(&self, request: RequestBuilder) -> Result<(), ClientError> {
        self.send(request).await?;
        Ok(())
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, ClientError> {
        let response = request
            .send()
            .await?
            .ensure_success()
            .await
            .inspect_err(|e| error!("API request failed: {e}"))?;
        debug!("{} answered {}", response.url(), response.status());

        if let Some(health) = &self.health {
            health.set_health(true);
        }

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::auth::{AuthError, AuthenticationMiddleware};
    use crate::token::StaticTokenProvider;
    use futures::TryStreamExt;
    use gatekeep_common::AnonymousRules;
    use serde::Deserialize;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[derive(Debug, Deserialize, PartialEq)]
    struct Item {
        id: u32,
        name: String,
    }

    fn section(server: &MockServer) -> ControllerSection {
        let base = Url::parse(&format!("{}/", server.uri())).unwrap();
        ControllerSection::new(reqwest::Client::new(), base)
    }

    fn section_with_health(server: &MockServer) -> (ControllerSection, Arc<HealthCheckController>) {
        let base = Url::parse(&format!("{}/", server.uri())).unwrap();
        let health = Arc::new(HealthCheckController::new(reqwest::Client::new(), &base).unwrap());
        let section =
            ControllerSection::new(reqwest::Client::new(), base).with_health(Arc::clone(&health));
        (section, health)
    }

    #[tokio::test]
    async fn test_request_decodes_json() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/items/1"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "id": 1, "name": "widget" })),
            )
            .mount(&mock_server)
            .await;

        let section = section(&mock_server);
        let item: Option<Item> = section
            .request(section.get("items/1").unwrap())
            .await
            .unwrap();

        assert_eq!(
            item,
            Some(Item {
                id: 1,
                name: "widget".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_no_content_is_empty() {
        let mock_server = MockServer::start().await;
        Mock::given(path("/items"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&mock_server)
            .await;

        let section = section(&mock_server);

        let one: Option<Item> = section.request(section.get("items").unwrap()).await.unwrap();
        assert!(one.is_none());

        let many: Vec<Item> = section
            .request_many(section.get("items").unwrap())
            .await
            .unwrap();
        assert!(many.is_empty());

        let bytes = section
            .request_bytes(section.get("items").unwrap())
            .await
            .unwrap();
        assert!(bytes.is_none());
    }

    #[tokio::test]
    async fn test_request_many_with_query_and_body() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/items/search"))
            .and(query_param("limit", "2"))
            .and(body_json(serde_json::json!({ "name": "w" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                { "id": 1, "name": "widget" },
                { "id": 2, "name": "wrench" }
            ])))
            .mount(&mock_server)
            .await;

        let section = section(&mock_server);
        let request = section
            .post("items/search")
            .unwrap()
            .query(&[("limit", "2")])
            .json(&serde_json::json!({ "name": "w" }));
        let items: Vec<Item> = section.request_many(request).await.unwrap();

        assert_eq!(items.len(), 2);
        assert_eq!(items[1].name, "wrench");
    }

    #[tokio::test]
    async fn test_request_bytes() {
        let mock_server = MockServer::start().await;
        Mock::given(path("/export.csv"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"id,name\n1,widget\n".to_vec()))
            .mount(&mock_server)
            .await;

        let section = section(&mock_server);
        let bytes = section
            .request_bytes(section.get("export.csv").unwrap())
            .await
            .unwrap();
        assert_eq!(bytes.as_deref(), Some(&b"id,name\n1,widget\n"[..]));
    }

    #[tokio::test]
    async fn test_request_stream_skips_null_items() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/items"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                r#"[{"id": 1, "name": "widget"}, null, {"id": 2, "name": "wrench"}, null]"#,
                "application/json",
            ))
            .mount(&mock_server)
            .await;

        let (section, health) = section_with_health(&mock_server);
        let items: Vec<Item> = section
            .request_stream(section.get("items").unwrap())
            .try_collect()
            .await
            .unwrap();

        assert_eq!(
            items,
            vec![
                Item {
                    id: 1,
                    name: "widget".to_string()
                },
                Item {
                    id: 2,
                    name: "wrench".to_string()
                },
            ]
        );
        assert!(health.is_available());
    }

    #[tokio::test]
    async fn test_request_stream_no_content_yields_nothing() {
        let mock_server = MockServer::start().await;
        Mock::given(path("/items"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&mock_server)
            .await;

        let (section, health) = section_with_health(&mock_server);
        let items: Vec<Result<Item, ClientError>> = section
            .request_stream(section.get("items").unwrap())
            .collect()
            .await;

        assert!(items.is_empty());
        assert!(health.is_available());
    }

    #[tokio::test]
    async fn test_request_stream_failure_is_single_error() {
        let mock_server = MockServer::start().await;
        Mock::given(path("/items"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&mock_server)
            .await;

        let (section, health) = section_with_health(&mock_server);
        let results: Vec<Result<Item, ClientError>> = section
            .request_stream(section.get("items").unwrap())
            .collect()
            .await;

        assert_eq!(results.len(), 1);
        assert_eq!(
            results[0].as_ref().unwrap_err().status(),
            Some(StatusCode::SERVICE_UNAVAILABLE)
        );
        assert!(!health.is_available());
    }

    #[tokio::test]
    async fn test_request_stream_yields_before_bad_item() {
        let mock_server = MockServer::start().await;
        Mock::given(path("/items"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(r#"[{"id": 1, "name": "widget"}, {"id": "x"}]"#, "application/json"),
            )
            .mount(&mock_server)
            .await;

        let section = section(&mock_server);
        let mut items = section.request_stream::<Item>(section.get("items").unwrap());

        assert_eq!(items.next().await.unwrap().unwrap().id, 1);
        assert!(matches!(
            items.next().await,
            Some(Err(ClientError::SerializationError(_)))
        ));
        assert!(items.next().await.is_none());
    }

    #[tokio::test]
    async fn test_failure_carries_body() {
        let mock_server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/items/9"))
            .respond_with(ResponseTemplate::new(409).set_body_string("item is in use"))
            .mount(&mock_server)
            .await;

        let section = section(&mock_server);
        let error = section
            .request_unit(section.delete("items/9").unwrap())
            .await
            .unwrap_err();

        assert_eq!(error.status(), Some(StatusCode::CONFLICT));
        assert!(error.to_string().contains("item is in use"));
    }

    #[tokio::test]
    async fn test_success_marks_api_healthy() {
        let mock_server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/items/1"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&mock_server)
            .await;

        let (section, health) = section_with_health(&mock_server);
        let mut changes = health.subscribe();
        assert!(!health.is_available());

        section
            .request_unit(section.put("items/1").unwrap())
            .await
            .unwrap();

        assert!(health.is_available());
        assert!(changes.try_recv().unwrap().available);
    }

    #[tokio::test]
    async fn test_failure_does_not_touch_health() {
        let mock_server = MockServer::start().await;
        Mock::given(path("/items"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&mock_server)
            .await;

        let (section, health) = section_with_health(&mock_server);
        let result = section.request_unit(section.get("items").unwrap()).await;

        assert!(result.is_err());
        assert!(health.current_status().checked_at.is_none());
    }

    #[tokio::test]
    async fn test_refused_request_surfaces_auth_error() {
        let mock_server = MockServer::start().await;
        Mock::given(path("/items"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&mock_server)
            .await;

        let client = reqwest_middleware::ClientBuilder::new(reqwest::Client::new())
            .with(AuthenticationMiddleware::new(
                Arc::new(StaticTokenProvider::none()),
                AnonymousRules::new(),
            ))
            .build();
        let base = Url::parse(&format!("{}/", mock_server.uri())).unwrap();
        let section = ControllerSection::new(client, base);

        let error = section
            .request_unit(section.get("items").unwrap())
            .await
            .unwrap_err();

        assert!(matches!(
            error,
            ClientError::Authentication(AuthError::Unauthenticated { .. })
        ));
        assert!(error.is_authentication_error());
    }

    #[test]
    fn test_url_joining() {
        let section = ControllerSection::new(
            reqwest::Client::new(),
            Url::parse("https://api.example.com/v1/").unwrap(),
        );
        assert_eq!(
            section.url("orders?open=true").unwrap().as_str(),
            "https://api.example.com/v1/orders?open=true"
        );
        assert_eq!(
            section.url("/health").unwrap().as_str(),
            "https://api.example.com/health"
        );
    }
}
