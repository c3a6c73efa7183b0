//! Single HTTP GET for one page image.

use crate::retry::FetchError;
use std::time::Duration;

/// Body and content type of a successful response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedBody {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

/// Performs one request for a page. No retries; the caller owns the retry loop.
pub trait PageSource: Send + Sync {
    fn get(&self, url: &str, referer: Option<&str>) -> Result<FetchedBody, FetchError>;
}

/// HTTP settings shared by every request of a run.
#[derive(Debug, Clone)]
pub struct HttpOptions {
    pub user_agent: String,
    pub connect_timeout: Duration,
    pub timeout: Duration,
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self {
            user_agent: crate::config::DEFAULT_USER_AGENT.to_string(),
            connect_timeout: Duration::from_secs(10),
            timeout: Duration::from_secs(15),
        }
    }
}

/// libcurl-backed page source; one Easy handle per request.
#[derive(Debug, Clone, Default)]
pub struct CurlSource {
    opts: HttpOptions,
}

impl CurlSource {
    pub fn new(opts: HttpOptions) -> Self {
        Self { opts }
    }
}

impl PageSource for CurlSource {
    fn get(&self, url: &str, referer: Option<&str>) -> Result<FetchedBody, FetchError> {
        let mut body: Vec<u8> = Vec::new();

        let mut easy = curl::easy::Easy::new();
        easy.url(url)?;
        easy.follow_location(true)?;
        easy.max_redirections(10)?;
        easy.useragent(&self.opts.user_agent)?;
        easy.connect_timeout(self.opts.connect_timeout)?;
        easy.timeout(self.opts.timeout)?;
        if let Some(r) = referer {
            easy.referer(r)?;
        }

        {
            let mut transfer = easy.transfer();
            transfer.write_function(|data| {
                body.extend_from_slice(data);
                Ok(data.len())
            })?;
            transfer.perform()?;
        }

        let code = easy.response_code()?;
        if !(200..300).contains(&code) {
            return Err(FetchError::Http(code));
        }
        if body.is_empty() {
            return Err(FetchError::EmptyBody);
        }
        let content_type = easy
            .content_type()?
            .map(|ct| ct.split(';').next().unwrap_or(ct).trim().to_ascii_lowercase());

        Ok(FetchedBody {
            bytes: body,
            content_type,
        })
    }
}
