use crate::api::{EntityApi, Filter};
use crate::entities::EntityKind;
use crate::error::{ApiError, Result};
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, Url};
use serde_json::Value;
use std::time::Duration;

/// [`EntityApi`] over HTTP.
///
/// Routes:
/// - `GET    {base}/entities/{Kind}/{id}`
/// - `GET    {base}/entities/{Kind}?field=value&...`
/// - `POST   {base}/entities/{Kind}`
/// - `PATCH  {base}/entities/{Kind}/{id}`
/// - `DELETE {base}/entities/{Kind}/{id}`
#[derive(Debug, Clone)]
pub struct HttpEntityApi {
    client: Client,
    base: Url,
    token: Option<String>,
}

impl HttpEntityApi {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base = Url::parse(base_url)
            .map_err(|e| ApiError::Validation(format!("invalid API URL {base_url:?}: {e}")))?;
        if base.cannot_be_a_base() {
            return Err(ApiError::Validation(format!(
                "API URL {base_url:?} cannot be used as a base"
            )));
        }

        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base,
            token: None,
        })
    }

    /// Send `Authorization: Bearer <token>` with every request.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn url(&self, kind: EntityKind, id: Option<&str>) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push("entities").push(kind.api_name());
            if let Some(id) = id {
                segments.push(id);
            }
        }
        url
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let request = self.client.request(method, url);
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder, resource: &str) -> Result<Response> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = response.text().await.unwrap_or_default();
        log::debug!("{} answered {}: {}", resource, status, message);
        Err(ApiError::from_status(status.as_u16(), resource, message))
    }
}

fn resource(kind: EntityKind, id: &str) -> String {
    format!("{kind}/{id}")
}

#[async_trait]
impl EntityApi for HttpEntityApi {
    async fn get(&self, kind: EntityKind, id: &str) -> Result<Value> {
        let request = self.request(Method::GET, self.url(kind, Some(id)));
        let response = self.send(request, &resource(kind, id)).await?;
        Ok(response.json().await?)
    }

    async fn filter(&self, kind: EntityKind, filter: &Filter) -> Result<Vec<Value>> {
        let request = self.request(Method::GET, self.url(kind, None)).query(filter);
        let response = self.send(request, kind.api_name()).await?;
        Ok(response.json().await?)
    }

    async fn create(&self, kind: EntityKind, body: Value) -> Result<Value> {
        let request = self.request(Method::POST, self.url(kind, None)).json(&body);
        let response = self.send(request, kind.api_name()).await?;
        Ok(response.json().await?)
    }

    async fn update(&self, kind: EntityKind, id: &str, patch: Value) -> Result<Value> {
        let request = self
            .request(Method::PATCH, self.url(kind, Some(id)))
            .json(&patch);
        let response = self.send(request, &resource(kind, id)).await?;
        Ok(response.json().await?)
    }

    async fn delete(&self, kind: EntityKind, id: &str) -> Result<()> {
        let request = self.request(Method::DELETE, self.url(kind, Some(id)));
        self.send(request, &resource(kind, id)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_building() {
        let api = HttpEntityApi::new("https://api.example.com/v1/", Duration::from_secs(5)).unwrap();
        assert_eq!(
            api.url(EntityKind::Event, Some("123")).as_str(),
            "https://api.example.com/v1/entities/Event/123"
        );
        assert_eq!(
            api.url(EntityKind::EventReview, None).as_str(),
            "https://api.example.com/v1/entities/EventReview"
        );
    }

    #[test]
    fn test_ids_are_escaped() {
        let api = HttpEntityApi::new("https://api.example.com", Duration::from_secs(5)).unwrap();
        assert_eq!(
            api.url(EntityKind::User, Some("a/b c")).as_str(),
            "https://api.example.com/entities/User/a%2Fb%20c"
        );
    }

    #[test]
    fn test_rejects_bad_base() {
        assert!(HttpEntityApi::new("not a url", Duration::from_secs(5)).is_err());
        assert!(HttpEntityApi::new("mailto:ana@example.com", Duration::from_secs(5)).is_err());
    }
}
