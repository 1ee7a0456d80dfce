use std::time::Duration;

use thirtyfour::{prelude::*, ChromiumLikeCapabilities};

use crate::error::FetchError;

const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// A headless Chrome session driven over WebDriver. One per scripted job.
pub struct Droid {
    pub driver: WebDriver,
}

pub struct RenderedPage {
    pub current_url: String,
    pub page_source: String,
}

impl Droid {
    pub async fn launch(webdriver_url: &str, user_agent: &str) -> Result<Self, FetchError> {
        let mut caps = DesiredCapabilities::chrome();
        caps.set_headless()?;
        caps.set_no_sandbox()?;
        caps.set_disable_dev_shm_usage()?;
        caps.set_disable_gpu()?;
        caps.add_arg(&format!("--user-agent={}", user_agent))?;

        let driver = WebDriver::new(webdriver_url, caps).await?;
        log::info!("Opened browser session on {}", webdriver_url);

        Ok(Droid { driver })
    }

    /// Navigates to `url` and waits for `selector` to show up before snapshotting the DOM.
    pub async fn render(
        &self,
        url: &str,
        selector: &str,
        timeout: Duration,
    ) -> Result<RenderedPage, FetchError> {
        self.driver.goto(url).await?;

        if let Err(e) = self
            .driver
            .query(By::Css(selector))
            .wait(timeout, POLL_INTERVAL)
            .first()
            .await
        {
            log::error!("Waiting for `{}` on {} failed: {:?}", selector, url, e);
            return Err(FetchError::WaitTimeout {
                selector: selector.to_string(),
                secs: timeout.as_secs(),
            });
        }

        let current_url = self.driver.current_url().await?.to_string();
        let page_source = self.driver.source().await?;

        Ok(RenderedPage {
            current_url,
            page_source,
        })
    }

    pub async fn quit(self) {
        match self.driver.quit().await {
            Ok(_) => log::info!("Closed browser session"),
            Err(e) => log::error!("Failed to quit browser session: {:?}", e),
        }
    }
}
