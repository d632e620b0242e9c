//! Letterboxd scraping client
//!
//! Resolves a diary entry URI to the film's runtime in minutes by fetching
//! the entry page, following the canonical film link, and reading the
//! runtime out of the film page footer.

use std::sync::LazyLock;
use std::time::Duration;

use scraper::{Html, Selector};
use thiserror::Error;
use tracing::debug;

/// Per-request timeout
const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

/// Site base used to resolve relative film links
const DEFAULT_BASE_URL: &str = "https://letterboxd.com";

/// Selector for the canonical film link on a diary entry page
static FILM_LINK: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"a[href^="/film/"]"#).unwrap());

/// Selector for the footer paragraph carrying the runtime on a film page
static FOOTER_PARAGRAPH: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"p[class^="text-link text-footer"]"#).unwrap());

/// Errors that can occur when resolving a film runtime
///
/// `Http` and `Status` are network-level failures; the remaining variants
/// mean the page was fetched but did not have the expected structure.
/// All of them are contained to the single diary entry being resolved.
#[derive(Debug, Error)]
pub enum LetterboxdError {
    /// The HTTP request itself failed (connection, timeout, TLS)
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The webserver answered with a non-success status
    #[error("Webserver returned code {status} for page {url}")]
    Status {
        status: reqwest::StatusCode,
        url: String,
    },

    /// The diary entry page had no `/film/` link to follow
    #[error("No film link found on page {url}")]
    MissingFilmLink { url: String },

    /// The film page had no runtime footer paragraph
    #[error("No runtime footer found on page {url}")]
    MissingRuntime { url: String },

    /// The footer text did not start with a positive number of minutes
    #[error("Runtime {text:?} on page {url} is not a positive number of minutes")]
    InvalidRuntime { text: String, url: String },
}

/// Client for scraping film runtimes from letterboxd.com
#[derive(Debug, Clone)]
pub struct LetterboxdClient {
    /// HTTP client for making requests
    http_client: reqwest::Client,
    /// Base URL the relative film links resolve against
    base_url: String,
}

impl LetterboxdClient {
    /// Creates a client with the production base URL and request timeout
    pub fn new() -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ))
            .build()
            .expect("failed to build HTTP client");
        Self {
            http_client,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Creates a client pointed at a custom base URL (for testing)
    #[cfg(test)]
    pub fn with_base_url(base_url: String) -> Self {
        Self {
            base_url,
            ..Self::new()
        }
    }

    /// Fetches the runtime in minutes for a diary entry URI.
    ///
    /// Two chained GETs: the entry page to find the film link, then the
    /// film page to read the footer.
    pub async fn runtime_minutes(&self, entry_url: &str) -> Result<u32, LetterboxdError> {
        let film_url = self.film_url(entry_url).await?;
        let body = self.get_page(&film_url).await?;
        let text = parse_footer_text(&body).ok_or_else(|| LetterboxdError::MissingRuntime {
            url: film_url.clone(),
        })?;
        parse_runtime(&text).ok_or(LetterboxdError::InvalidRuntime {
            text,
            url: film_url,
        })
    }

    /// Resolves a diary entry URI to the absolute film page URL
    async fn film_url(&self, entry_url: &str) -> Result<String, LetterboxdError> {
        let body = self.get_page(entry_url).await?;
        let href = parse_film_link(&body).ok_or_else(|| LetterboxdError::MissingFilmLink {
            url: entry_url.to_string(),
        })?;
        Ok(format!("{}{}", self.base_url, href))
    }

    /// Fetches a page body, enforcing a success status
    async fn get_page(&self, url: &str) -> Result<String, LetterboxdError> {
        debug!(%url, "fetching page");
        let response = self.http_client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(LetterboxdError::Status {
                status: response.status(),
                url: url.to_string(),
            });
        }
        Ok(response.text().await?)
    }
}

impl Default for LetterboxdClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Extracts the first `/film/` link target from a diary entry page
fn parse_film_link(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    document
        .select(&FILM_LINK)
        .next()
        .and_then(|anchor| anchor.value().attr("href"))
        .map(str::to_string)
}

/// Extracts the footer paragraph text from a film page
fn parse_footer_text(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    document
        .select(&FOOTER_PARAGRAPH)
        .next()
        .map(|paragraph| paragraph.text().collect::<String>())
}

/// Parses the runtime prefix of the footer text as whole minutes.
///
/// The footer reads like `"101\u{a0}mins  More at IMDb TMDb"`: the number
/// is everything before the first non-breaking space. Anything that is not
/// a positive integer is rejected.
fn parse_runtime(text: &str) -> Option<u32> {
    let prefix = text.split('\u{a0}').next().unwrap_or("").trim();
    match prefix.parse::<u32>() {
        Ok(minutes) if minutes > 0 => Some(minutes),
        _ => None,
    }
}
