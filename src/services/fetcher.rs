use std::time::Duration;

use async_trait::async_trait;

use crate::{
    configuration::ScraperSettings, domain::university::FetchMode, error::FetchError,
};

use super::{compiled_rule::CompiledRule, droid::Droid};

/// Raw listing page as seen by the fetch session.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedPage {
    /// Where the page ended up. For scripted sessions this follows redirects.
    pub source_url: String,
    pub html: String,
}

/// A fetch resource owned by one job. `close` must be called on every exit path.
#[async_trait]
pub trait FetchSession: Send {
    async fn fetch_listing_page(&mut self, rule: &CompiledRule) -> Result<FetchedPage, FetchError>;

    async fn close(self: Box<Self>);
}

#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn open(&self, rule: &CompiledRule) -> Result<Box<dyn FetchSession>, FetchError>;
}

/// Single GET against the rule's base url.
pub struct HttpFetcher {
    timeout: Duration,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Self {
        HttpFetcher { timeout }
    }
}

struct HttpSession {
    client: reqwest::Client,
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn open(&self, rule: &CompiledRule) -> Result<Box<dyn FetchSession>, FetchError> {
        let client = reqwest::Client::builder()
            .default_headers(rule.headers.clone())
            .timeout(self.timeout)
            .build()
            .map_err(|e| FetchError::Http {
                url: rule.base_url_raw.clone(),
                source: e,
            })?;

        Ok(Box::new(HttpSession { client }))
    }
}

#[async_trait]
impl FetchSession for HttpSession {
    async fn fetch_listing_page(&mut self, rule: &CompiledRule) -> Result<FetchedPage, FetchError> {
        let url = rule.base_url_raw.clone();
        let http_error = |e| FetchError::Http {
            url: url.clone(),
            source: e,
        };

        let res = self
            .client
            .get(rule.base_url.clone())
            .send()
            .await
            .map_err(http_error)?;

        let status = res.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.clone(),
                status: status.as_u16(),
            });
        }

        let html = res.text().await.map_err(http_error)?;
        log::info!("Fetched {} bytes from {}", html.len(), url);

        Ok(FetchedPage {
            source_url: url,
            html,
        })
    }

    async fn close(self: Box<Self>) {}
}

/// Headless Chrome over WebDriver, for listing pages built by JavaScript.
pub struct BrowserFetcher {
    webdriver_url: String,
    render_wait: Duration,
}

impl BrowserFetcher {
    pub fn new(webdriver_url: &str, render_wait: Duration) -> Self {
        BrowserFetcher {
            webdriver_url: webdriver_url.to_string(),
            render_wait,
        }
    }
}

struct BrowserSession {
    droid: Droid,
    render_wait: Duration,
}

#[async_trait]
impl Fetcher for BrowserFetcher {
    async fn open(&self, rule: &CompiledRule) -> Result<Box<dyn FetchSession>, FetchError> {
        let droid = Droid::launch(&self.webdriver_url, rule.user_agent()).await?;
        Ok(Box::new(BrowserSession {
            droid,
            render_wait: self.render_wait,
        }))
    }
}

#[async_trait]
impl FetchSession for BrowserSession {
    async fn fetch_listing_page(&mut self, rule: &CompiledRule) -> Result<FetchedPage, FetchError> {
        let page = self
            .droid
            .render(&rule.base_url_raw, &rule.list_selector_raw, self.render_wait)
            .await?;

        Ok(FetchedPage {
            source_url: page.current_url,
            html: page.page_source,
        })
    }

    async fn close(self: Box<Self>) {
        self.droid.quit().await;
    }
}

/// Picks the plain or scripted fetcher per rule.
pub struct SiteFetcher {
    http: HttpFetcher,
    browser: BrowserFetcher,
}

impl SiteFetcher {
    pub fn new(settings: &ScraperSettings) -> Self {
        SiteFetcher {
            http: HttpFetcher::new(settings.request_timeout()),
            browser: BrowserFetcher::new(&settings.webdriver_url, settings.render_wait()),
        }
    }
}

#[async_trait]
impl Fetcher for SiteFetcher {
    async fn open(&self, rule: &CompiledRule) -> Result<Box<dyn FetchSession>, FetchError> {
        log::info!(
            "Opening {} fetch session for {}",
            rule.mode.as_str(),
            rule.base_url_raw
        );

        match rule.mode {
            FetchMode::Plain => self.http.open(rule).await,
            FetchMode::Scripted => self.browser.open(rule).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::TcpListener,
        task::JoinHandle,
    };

    use super::*;
    use crate::services::compiled_rule::tests::rule;

    /// Serves `response` to the first connection and hands back the raw request.
    async fn serve_once(response: String) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.ends_with(b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
            String::from_utf8_lossy(&request).to_lowercase()
        });

        (format!("http://{}/courses", addr), handle)
    }

    async fn fetch(base_url: &str, user_agent: Option<&str>) -> Result<FetchedPage, FetchError> {
        let mut r = rule(base_url);
        if let Some(ua) = user_agent {
            r.custom_headers
                .insert("User-Agent".to_string(), ua.to_string());
        }
        let compiled = CompiledRule::compile(&r, "DefaultBrowser/1.0").unwrap();

        let fetcher = HttpFetcher::new(Duration::from_secs(5));
        let mut session = fetcher.open(&compiled).await?;
        let page = session.fetch_listing_page(&compiled).await;
        session.close().await;
        page
    }

    #[tokio::test]
    async fn plain_fetch_returns_body_and_base_url() {
        let body = "<div class=\"course\"><h3>BSc Physics</h3></div>";
        let response = format!(
            "HTTP/1.1 200 OK\r\ncontent-type: text/html\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
            body.len(),
            body
        );
        let (url, server) = serve_once(response).await;

        let page = fetch(&url, None).await.unwrap();
        let request = server.await.unwrap();

        assert_eq!(page.source_url, url);
        assert_eq!(page.html, body);
        assert!(request.starts_with("get /courses"));
        assert!(request.contains("user-agent: defaultbrowser/1.0"));
    }

    #[tokio::test]
    async fn plain_fetch_sends_configured_user_agent() {
        let (url, server) = serve_once(
            "HTTP/1.1 200 OK\r\ncontent-length: 0\r\nconnection: close\r\n\r\n".to_string(),
        )
        .await;

        fetch(&url, Some("CourseBot/2.0")).await.unwrap();
        let request = server.await.unwrap();

        assert!(request.contains("user-agent: coursebot/2.0"));
        assert!(!request.contains("defaultbrowser"));
    }

    #[tokio::test]
    async fn non_success_status_is_a_fetch_error() {
        let (url, server) = serve_once(
            "HTTP/1.1 404 Not Found\r\ncontent-length: 0\r\nconnection: close\r\n\r\n".to_string(),
        )
        .await;

        let err = fetch(&url, None).await.unwrap_err();
        server.await.unwrap();

        match err {
            FetchError::Status { status, .. } => assert_eq!(status, 404),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn browser_session_without_webdriver_is_a_fetch_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let mut r = rule("https://uni.example/courses");
        r.use_selenium = true;
        let compiled = CompiledRule::compile(&r, "ua").unwrap();
        let settings = ScraperSettings {
            webdriver_url: format!("http://{}", addr),
            ..Default::default()
        };

        let err = SiteFetcher::new(&settings).open(&compiled).await.err().unwrap();

        assert!(matches!(err, FetchError::Browser(_)));
    }

    #[tokio::test]
    async fn connection_refused_is_a_fetch_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = fetch(&format!("http://{}/courses", addr), None)
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Http { .. }));
    }
}
