use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use std::time::Duration;
use tracing::debug;
use crate::core::Snapshot;
use crate::source::{parse_snapshot_str, SnapshotSource, SourceError};

/// Per-request timeout
const REQUEST_TIMEOUT_SECS: u64 = 15;

/// Longest error body kept in [`SourceError::Status`]
const MAX_ERROR_BODY: usize = 200;

/// Firebase Realtime Database node read through its REST interface
#[derive(Debug, Clone)]
pub struct RealtimeDbSource {
    client: Client,
    endpoint: String,
    auth_token: Option<String>,
    name: String,
}

impl RealtimeDbSource {
    /// Source for `{database_url}/{path}`
    pub fn new(database_url: &str, path: &str, auth_token: Option<String>) -> Result<Self, SourceError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self::with_client(client, database_url, path, auth_token))
    }

    /// Source sharing an existing HTTP client
    pub fn with_client(client: Client, database_url: &str, path: &str, auth_token: Option<String>) -> Self {
        let endpoint = endpoint(database_url, path);
        Self {
            client,
            name: format!("rtdb:{endpoint}"),
            endpoint,
            auth_token: auth_token.filter(|t| !t.is_empty()),
        }
    }

    /// URL without credentials, as logged
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn request(&self) -> RequestBuilder {
        let request = self.client.get(&self.endpoint);
        match &self.auth_token {
            Some(token) => request.query(&[("auth", token)]),
            None => request,
        }
    }
}

/// `https://db.example.com/` + `/playlists/` => `https://db.example.com/playlists.json`
fn endpoint(database_url: &str, path: &str) -> String {
    let base = database_url.trim_end_matches('/');
    let path = path.trim_matches('/');
    if path.is_empty() {
        format!("{base}/.json")
    } else {
        format!("{base}/{path}.json")
    }
}

#[async_trait]
impl SnapshotSource for RealtimeDbSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self) -> Result<Snapshot, SourceError> {
        // reqwest errors print their URL, which carries the token
        let response = self.request().send().await.map_err(|e| e.without_url())?;
        let status = response.status();
        let body = response.text().await.map_err(|e| e.without_url())?;

        if !status.is_success() {
            let body: String = body.chars().take(MAX_ERROR_BODY).collect();
            return Err(SourceError::Status {
                status: status.as_u16(),
                body,
            });
        }

        debug!(endpoint = %self.endpoint, bytes = body.len(), "fetched playlists");
        parse_snapshot_str(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_building() {
        assert_eq!(
            endpoint("https://demo.firebaseio.com/", "/playlists/"),
            "https://demo.firebaseio.com/playlists.json"
        );
        assert_eq!(
            endpoint("https://demo.firebaseio.com", "venues/lobby/playlists"),
            "https://demo.firebaseio.com/venues/lobby/playlists.json"
        );
        assert_eq!(endpoint("https://demo.firebaseio.com", ""), "https://demo.firebaseio.com/.json");
    }

    #[test]
    fn test_token_stays_out_of_the_name() {
        let source = RealtimeDbSource::with_client(
            Client::new(),
            "https://demo.firebaseio.com",
            "playlists",
            Some("secret".to_string()),
        );
        let request = source.request().build().unwrap();
        assert_eq!(request.url().as_str(), "https://demo.firebaseio.com/playlists.json?auth=secret");
        assert!(!source.name().contains("secret"));
        assert!(!source.endpoint().contains("secret"));
    }

    #[test]
    fn test_empty_token_is_ignored() {
        let source = RealtimeDbSource::with_client(Client::new(), "https://demo.firebaseio.com", "playlists", Some(String::new()));
        let request = source.request().build().unwrap();
        assert_eq!(request.url().as_str(), "https://demo.firebaseio.com/playlists.json");
    }

    #[test]
    fn test_token_is_query_encoded() {
        let source = RealtimeDbSource::with_client(
            Client::new(),
            "https://demo.firebaseio.com",
            "playlists",
            Some("a&b=c".to_string()),
        );
        let request = source.request().build().unwrap();
        let pairs: Vec<(String, String)> = request.url().query_pairs().into_owned().collect();
        assert_eq!(pairs, vec![("auth".to_string(), "a&b=c".to_string())]);
    }

    #[tokio::test]
    async fn test_failed_request_does_not_reveal_token() {
        // Nothing listens on port 1
        let source = RealtimeDbSource::new("http://127.0.0.1:1", "playlists", Some("SECRETTOKEN".to_string())).unwrap();
        let err = source.fetch().await.unwrap_err();

        assert!(matches!(err, SourceError::Http(_)));
        assert!(!err.to_string().contains("SECRETTOKEN"));
        assert!(!format!("{err:?}").contains("SECRETTOKEN"));
    }
}
