// src/portal/mod.rs
pub mod client;
pub mod models;

#[allow(unused_imports)]
pub use client::{scrape_pages, PageFetcher, PageOutcome, PortalClient, ScrapeConfig, ScrapeReport};
#[allow(unused_imports)]
pub use models::{NoticeRecord, RawNotice};
