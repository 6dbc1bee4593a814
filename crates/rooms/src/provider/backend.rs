use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method, RequestBuilder};
use tracing::debug;

pub(crate) const DEFAULT_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36";

/// Bounded read timeout applied to every status request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Build the HTTP client used by the network-backed providers.
///
/// Responses are never cached; a stale answer is worse than a slow one here.
pub fn default_client() -> Client {
    client_with_timeout(DEFAULT_REQUEST_TIMEOUT)
}

pub fn client_with_timeout(timeout: Duration) -> Client {
    Client::builder()
        .timeout(timeout)
        .no_proxy()
        .build()
        .expect("Failed to create HTTP client")
}

/// Shared request plumbing for the network-backed providers: a named
/// upstream, its base URL, and the headers every request to it carries.
#[derive(Debug, Clone)]
pub struct Backend {
    pub name: &'static str,
    pub base_url: String,
    pub client: Client,
    headers: HeaderMap,
}

impl Backend {
    pub fn new(name: &'static str, base_url: impl Into<String>, client: Client) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(reqwest::header::USER_AGENT, HeaderValue::from_static(DEFAULT_UA));
        headers.insert(
            reqwest::header::ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/json;q=0.9,*/*;q=0.8",
            ),
        );

        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }

        Self {
            name,
            base_url,
            client,
            headers,
        }
    }

    pub fn add_header<K: AsRef<str>, V: AsRef<str>>(&mut self, key: K, value: V) {
        match (
            HeaderName::try_from(key.as_ref()),
            HeaderValue::from_str(value.as_ref()),
        ) {
            (Ok(name), Ok(value)) => {
                self.headers.insert(name, value);
            }
            (name, value) => {
                debug!(
                    name_ok = name.is_ok(),
                    value_ok = value.is_ok(),
                    "Invalid header; skipping"
                );
            }
        }
    }

    pub fn get(&self, url: &str) -> RequestBuilder {
        self.request(Method::GET, url)
    }

    pub fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.client.request(method, url).headers(self.headers.clone())
    }
}
