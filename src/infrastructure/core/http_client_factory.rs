use anyhow::{Context, Result};
use reqwest::Client;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};
use std::time::Duration;
use url::Url;

/// Settings for the shared HTTP client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpClientSettings {
    pub max_retries: u32,
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
}

impl Default for HttpClientSettings {
    fn default() -> Self {
        Self {
            max_retries: 3,
            request_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

pub struct HttpClientFactory;

impl HttpClientFactory {
    /// Creates a new HTTP client with retry middleware (exponential backoff
    /// on transient failures)
    pub fn create_client(settings: HttpClientSettings) -> ClientWithMiddleware {
        let retry_policy =
            ExponentialBackoff::builder().build_with_max_retries(settings.max_retries);

        let client = Client::builder()
            .pool_max_idle_per_host(2)
            .timeout(settings.request_timeout)
            .connect_timeout(settings.connect_timeout)
            .build()
            .unwrap_or_else(|_| Client::new());

        ClientBuilder::new(client)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build()
    }
}

/// Join `path` onto `base_url` and append the query parameters.
/// reqwest-middleware does not expose `.query()`, so the URL is built up front.
pub fn build_url_with_query<K, V>(base_url: &str, path: &str, params: &[(K, V)]) -> Result<Url>
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    let base = Url::parse(base_url).with_context(|| format!("Invalid base URL: {}", base_url))?;
    let mut url = base
        .join(path)
        .with_context(|| format!("Invalid path {} for {}", path, base_url))?;

    if !params.is_empty() {
        let mut pairs = url.query_pairs_mut();
        for (k, v) in params {
            pairs.append_pair(k.as_ref(), v.as_ref());
        }
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_is_encoded() {
        let url = build_url_with_query(
            "https://www.alphavantage.co",
            "query",
            &[("function", "SYMBOL_SEARCH"), ("keywords", "Johnson & Johnson")],
        )
        .unwrap();

        assert_eq!(
            url.as_str(),
            "https://www.alphavantage.co/query?function=SYMBOL_SEARCH&keywords=Johnson+%26+Johnson"
        );
    }

    #[test]
    fn test_no_params_leaves_no_query() {
        let url = build_url_with_query::<&str, &str>("http://localhost:8080/", "query", &[])
            .unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/query");
    }

    #[test]
    fn test_invalid_base_is_an_error() {
        assert!(build_url_with_query::<&str, &str>("not a url", "query", &[]).is_err());
    }
}
