use super::error::SyncError;
use super::payload::{RawProductPayload, SearchEnvelope};
use reqwest::{StatusCode, Url};
use std::time::Duration;

/// Error text upstream sends when the requested page is past the last one.
pub const PAGE_NOT_FOUND_PHRASE: &str = "a página que você está tentando obter não existe";

const MAX_ERROR_BODY_CHARS: usize = 512;

/// Classified outcome of one page request.
#[derive(Debug)]
pub enum PageResult {
    /// At least one product came back.
    DataPage(Vec<RawProductPayload>),
    /// Upstream answered OK without products.
    EmptyPage,
    /// Upstream reported that the page does not exist.
    EndOfPages,
    Failure(SyncError),
}

/// Source of product pages, numbered from 1.
#[rocket::async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch_page(&self, page: u32) -> PageResult;
}

/// [`PageFetcher`] backed by the Tiny product search endpoint.
pub struct TinyPageFetcher {
    http: reqwest::Client,
    endpoint: String,
    token: String,
}

impl TinyPageFetcher {
    pub fn new(base_url: &str, token: String, timeout: Duration) -> Result<Self, SyncError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .user_agent("catalog-sync/0.1")
            .build()
            .map_err(SyncError::Transport)?;

        Ok(Self {
            http,
            endpoint: format!("{}/produtos.pesquisa.php", base_url.trim_end_matches('/')),
            token,
        })
    }

    fn page_url(&self, page: u32) -> Result<Url, SyncError> {
        let page = page.to_string();
        Url::parse_with_params(
            &self.endpoint,
            &[
                ("token", self.token.as_str()),
                ("formato", "json"),
                ("pagina", page.as_str()),
            ],
        )
        .map_err(|err| SyncError::Configuration(format!("invalid upstream base url: {err}")))
    }
}

#[rocket::async_trait]
impl PageFetcher for TinyPageFetcher {
    async fn fetch_page(&self, page: u32) -> PageResult {
        let url = match self.page_url(page) {
            Ok(url) => url,
            Err(err) => return PageResult::Failure(err),
        };

        log::debug!("requesting product page {}", page);

        // The token travels in the query string, so strip urls from transport errors.
        let response = match self.http.get(url).send().await {
            Ok(response) => response,
            Err(err) => return PageResult::Failure(SyncError::Transport(err.without_url())),
        };

        let status = response.status();
        match response.bytes().await {
            Ok(body) => classify_response(status, &body),
            Err(err) => PageResult::Failure(SyncError::Transport(err.without_url())),
        }
    }
}

/// Turn an HTTP status and body into a [`PageResult`].
pub fn classify_response(status: StatusCode, body: &[u8]) -> PageResult {
    if !status.is_success() {
        let body: String = String::from_utf8_lossy(body)
            .chars()
            .take(MAX_ERROR_BODY_CHARS)
            .collect();
        return PageResult::Failure(SyncError::UpstreamStatus { status, body });
    }

    let envelope: SearchEnvelope = match serde_json::from_slice(body) {
        Ok(envelope) => envelope,
        Err(err) => {
            return PageResult::Failure(SyncError::UpstreamData(format!(
                "malformed response body: {err}"
            )));
        }
    };
    let response = envelope.retorno;

    if response.is_ok() {
        if let (Some(page), Some(count)) = (&response.page, &response.page_count) {
            log::debug!("upstream page {} of {}", page, count);
        }
        let products: Vec<RawProductPayload> = response
            .products
            .unwrap_or_default()
            .into_iter()
            .map(|entry| entry.product)
            .collect();

        return if products.is_empty() {
            PageResult::EmptyPage
        } else {
            PageResult::DataPage(products)
        };
    }

    let messages = response.error_messages();
    if messages.iter().any(|message| is_page_not_found(message)) {
        return PageResult::EndOfPages;
    }

    let reason = if messages.is_empty() {
        format!("status '{}' without error details", response.status)
    } else {
        messages.join("; ")
    };
    PageResult::Failure(SyncError::UpstreamData(format!(
        "upstream reported an error: {reason}"
    )))
}

fn is_page_not_found(message: &str) -> bool {
    message.to_lowercase().contains(PAGE_NOT_FOUND_PHRASE)
}
