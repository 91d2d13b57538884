// src/portal/client.rs
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header;

use crate::extractors::page::NoticeExtractor;
use crate::portal::models::NoticeRecord;
use crate::utils::error::PortalError;
use crate::utils::html_debug;

pub const DEFAULT_BASE_URL: &str =
    "https://www.gov.br/compras/pt-br/assuntos/avisos-de-licitacoes?pagina={page}";
pub const DEFAULT_TIMEOUT_SECS: u64 = 20;
pub const DEFAULT_DELAY_SECS: f64 = 1.0;

fn default_user_agent() -> String {
    format!(
        "Mozilla/5.0 (X11; Linux x86_64) procurement-scraper/{}",
        env!("CARGO_PKG_VERSION")
    )
}

/// How one scrape cycle walks the listing.
#[derive(Debug, Clone)]
pub struct ScrapeConfig {
    pub pages: u32,
    pub base_url_template: String,
    pub timeout: Duration,
    pub delay: Duration,
    pub user_agent: String,
    /// When set, every fetched page is dumped here for selector tuning.
    pub debug_dir: Option<PathBuf>,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            pages: 1,
            base_url_template: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            delay: Duration::from_secs_f64(DEFAULT_DELAY_SECS),
            user_agent: default_user_agent(),
            debug_dir: None,
        }
    }
}

impl ScrapeConfig {
    /// Converts a seconds value from the command line; negatives and NaN become zero.
    pub fn delay_from_secs(secs: f64) -> Duration {
        if secs.is_finite() && secs > 0.0 {
            Duration::from_secs_f64(secs)
        } else {
            Duration::ZERO
        }
    }

    /// Page numbers start at 1; at least one page is always requested.
    pub fn page_numbers(&self) -> std::ops::RangeInclusive<u32> {
        1..=self.pages.max(1)
    }
}

/// Substitutes the page number into the `{page}` placeholder.
pub fn page_url(template: &str, page: u32) -> String {
    template.replace("{page}", &page.to_string())
}

/// Source of listing page bodies.
#[async_trait]
pub trait PageFetcher {
    async fn fetch_page(&self, url: &str) -> Result<String, PortalError>;
}

/// reqwest-backed fetcher for the live portal.
pub struct PortalClient {
    http: reqwest::Client,
}

impl PortalClient {
    pub fn new(config: &ScrapeConfig) -> Result<Self, PortalError> {
        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.timeout)
            .build()?;
        Ok(Self { http })
    }
}

#[async_trait]
impl PageFetcher for PortalClient {
    async fn fetch_page(&self, url: &str) -> Result<String, PortalError> {
        tracing::debug!("GET {}", url);

        let response = self
            .http
            .get(url)
            .header(header::ACCEPT, "text/html,application/xhtml+xml,*/*")
            .send()
            .await?;

        // Anything but a plain 200 is treated as "no listing on this page".
        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(PortalError::Http(status));
        }

        let body = response.text().await?;
        if body.is_empty() {
            return Err(PortalError::EmptyBody(url.to_string()));
        }
        tracing::debug!("Downloaded {} bytes from {}", body.len(), url);
        Ok(body)
    }
}

/// What one page contributed to a cycle.
#[derive(Debug)]
pub enum PageOutcome {
    Fetched { page: u32, records: Vec<NoticeRecord> },
    Skipped { page: u32, reason: PortalError },
}

/// Per-page outcomes of one scrape cycle, in page order.
#[derive(Debug, Default)]
pub struct ScrapeReport {
    pub outcomes: Vec<PageOutcome>,
}

impl ScrapeReport {
    pub fn pages_fetched(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, PageOutcome::Fetched { .. }))
            .count()
    }

    pub fn pages_skipped(&self) -> usize {
        self.outcomes.len() - self.pages_fetched()
    }

    pub fn record_count(&self) -> usize {
        self.outcomes
            .iter()
            .map(|o| match o {
                PageOutcome::Fetched { records, .. } => records.len(),
                PageOutcome::Skipped { .. } => 0,
            })
            .sum()
    }

    /// All records, concatenated in page order.
    pub fn into_records(self) -> Vec<NoticeRecord> {
        self.outcomes
            .into_iter()
            .flat_map(|o| match o {
                PageOutcome::Fetched { records, .. } => records,
                PageOutcome::Skipped { .. } => Vec::new(),
            })
            .collect()
    }
}

/// Walks the configured pages sequentially, sleeping `config.delay` after each
/// page whether it succeeded or not. Page failures never abort the cycle.
pub async fn scrape_pages<F>(fetcher: &F, extractor: &NoticeExtractor, config: &ScrapeConfig) -> ScrapeReport
where
    F: PageFetcher + ?Sized,
{
    let mut report = ScrapeReport::default();

    for page in config.page_numbers() {
        let url = page_url(&config.base_url_template, page);

        let outcome = match fetcher.fetch_page(&url).await {
            Ok(body) => {
                if let Some(dir) = &config.debug_dir {
                    if let Err(e) = html_debug::save_page_dump(dir, page, &body) {
                        tracing::warn!("Failed to save debug dump for page {}: {}", page, e);
                    }
                }
                let records = extractor.extract_records(&body);
                tracing::info!("Page {}: {} notices", page, records.len());
                PageOutcome::Fetched { page, records }
            }
            Err(reason) => {
                tracing::warn!("Skipping page {} ({}): {}", page, url, reason);
                PageOutcome::Skipped { page, reason }
            }
        };
        report.outcomes.push(outcome);

        if !config.delay.is_zero() {
            tokio::time::sleep(config.delay).await;
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractors::page::SelectorProfile;
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct FakePortal {
        pages: HashMap<String, Result<String, u16>>,
        requested: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl PageFetcher for FakePortal {
        async fn fetch_page(&self, url: &str) -> Result<String, PortalError> {
            self.requested.lock().unwrap().push(url.to_string());
            match self.pages.get(url) {
                Some(Ok(body)) if body.is_empty() => Err(PortalError::EmptyBody(url.to_string())),
                Some(Ok(body)) => Ok(body.clone()),
                Some(Err(code)) => Err(PortalError::Http(reqwest::StatusCode::from_u16(*code).unwrap())),
                None => Err(PortalError::Http(reqwest::StatusCode::NOT_FOUND)),
            }
        }
    }

    fn listing(titles: &[&str]) -> String {
        let items: String = titles
            .iter()
            .map(|t| format!("<article><h2>{}</h2><span class=\"valor\">R$ 1.000,00</span></article>", t))
            .collect();
        format!("<html><body>{}</body></html>", items)
    }

    fn config(pages: u32) -> ScrapeConfig {
        ScrapeConfig {
            pages,
            base_url_template: "https://portal.test/avisos?pagina={page}".into(),
            delay: Duration::ZERO,
            ..Default::default()
        }
    }

    #[test]
    fn test_page_url_and_numbering() {
        assert_eq!(page_url(DEFAULT_BASE_URL, 3), "https://www.gov.br/compras/pt-br/assuntos/avisos-de-licitacoes?pagina=3");
        assert_eq!(config(0).page_numbers().collect::<Vec<_>>(), vec![1]);
        assert_eq!(config(3).page_numbers().collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn test_delay_from_secs_clamps() {
        assert_eq!(ScrapeConfig::delay_from_secs(-2.0), Duration::ZERO);
        assert_eq!(ScrapeConfig::delay_from_secs(f64::NAN), Duration::ZERO);
        assert_eq!(ScrapeConfig::delay_from_secs(1.5), Duration::from_millis(1500));
    }

    #[test]
    fn test_failed_pages_are_skipped_not_fatal() {
        let mut pages = HashMap::new();
        pages.insert("https://portal.test/avisos?pagina=1".to_string(), Ok(listing(&["A", "B"])));
        pages.insert("https://portal.test/avisos?pagina=2".to_string(), Err(500));
        pages.insert("https://portal.test/avisos?pagina=3".to_string(), Ok(String::new()));
        pages.insert("https://portal.test/avisos?pagina=4".to_string(), Ok(listing(&["C"])));
        let portal = FakePortal { pages, requested: Mutex::new(Vec::new()) };
        let extractor = NoticeExtractor::new(SelectorProfile::default());

        let report = tokio_test::block_on(scrape_pages(&portal, &extractor, &config(4)));

        assert_eq!(portal.requested.lock().unwrap().len(), 4);
        assert_eq!(report.pages_fetched(), 2);
        assert_eq!(report.pages_skipped(), 2);
        assert!(matches!(report.outcomes[1], PageOutcome::Skipped { page: 2, reason: PortalError::Http(_) }));
        assert!(matches!(report.outcomes[2], PageOutcome::Skipped { page: 3, reason: PortalError::EmptyBody(_) }));

        assert_eq!(report.record_count(), 3);
        let titles: Vec<String> = report.into_records().into_iter().map(|r| r.title).collect();
        assert_eq!(titles, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_debug_dir_receives_page_dumps() {
        let dir = std::env::temp_dir().join(format!("procurement_scrape_debug_{}", std::process::id()));
        let mut pages = HashMap::new();
        pages.insert("https://portal.test/avisos?pagina=1".to_string(), Ok(listing(&["A"])));
        let portal = FakePortal { pages, requested: Mutex::new(Vec::new()) };
        let extractor = NoticeExtractor::new(SelectorProfile::default());
        let cfg = ScrapeConfig { debug_dir: Some(dir.clone()), ..config(1) };

        let report = tokio_test::block_on(scrape_pages(&portal, &extractor, &cfg));

        assert_eq!(report.pages_fetched(), 1);
        assert!(dir.join("page_1_annotated.html").exists());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_delay_applies_after_every_page() {
        let portal = FakePortal { pages: HashMap::new(), requested: Mutex::new(Vec::new()) };
        let extractor = NoticeExtractor::new(SelectorProfile::default());
        let cfg = ScrapeConfig { delay: Duration::from_millis(20), ..config(3) };

        let start = std::time::Instant::now();
        let report = scrape_pages(&portal, &extractor, &cfg).await;

        assert_eq!(report.pages_skipped(), 3);
        assert!(start.elapsed() >= Duration::from_millis(60));
    }
}
