use log::debug;
use reqwest::header::CONTENT_TYPE;
use reqwest::{redirect, Client};

use crate::config::FetchConfig;
use crate::error::ExtractError;

/// The parts of an HTTP response the tools care about.
#[derive(Debug, Clone)]
pub struct PageResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub final_url: String,
    pub body: String,
}

/// Plain HTTP fetcher with a browser user agent and bounded timeouts.
pub struct RequestFetcher {
    client: Client,
}

impl RequestFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self, ExtractError> {
        let client = Client::builder()
            .timeout(config.timeout())
            .connect_timeout(config.connect_timeout())
            .user_agent(config.user_agent.as_str())
            .redirect(redirect::Policy::limited(10))
            .build()?;

        Ok(Self { client })
    }

    /// GET a page. Non-2xx responses are returned, not turned into errors,
    /// so callers can report the status.
    pub async fn fetch_page(&self, url: &str) -> Result<PageResponse, ExtractError> {
        let response = self
            .client
            .get(url)
            .header(
                "Accept",
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            )
            .send()
            .await?;

        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        let content_type = header_value(response.headers(), CONTENT_TYPE);
        let body = response.text().await?;

        debug!(
            "Fetched {} -> {} ({} bytes, status {})",
            url,
            final_url,
            body.len(),
            status
        );

        Ok(PageResponse {
            status,
            content_type,
            final_url,
            body,
        })
    }

    /// HEAD an image URL. Returns its content type when the server answers
    /// 2xx with an `image/*` type.
    pub async fn head_image(&self, url: &str) -> Result<Option<String>, ExtractError> {
        let response = self.client.head(url).send().await?;
        if !response.status().is_success() {
            debug!("Image HEAD {} returned {}", url, response.status());
            return Ok(None);
        }

        Ok(header_value(response.headers(), CONTENT_TYPE)
            .filter(|content_type| content_type.starts_with("image/")))
    }
}

fn header_value(
    headers: &reqwest::header::HeaderMap,
    name: reqwest::header::HeaderName,
) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_string())
}
