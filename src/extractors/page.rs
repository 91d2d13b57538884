// src/extractors/page.rs

// --- Imports ---
use std::path::Path;

use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};

use crate::extractors::currency::{AmountFormat, LocalizedAmountFormat};
use crate::extractors::record::normalize_with;
use crate::portal::models::{NoticeRecord, RawNotice};
use crate::utils::error::ExtractError;

// --- Default Profile ---
// Matches the listing markup of the federal procurement notices page.
static DEFAULT_PROFILE_CONFIG: Lazy<ProfileConfig> = Lazy::new(|| ProfileConfig {
    list: "article".into(),
    title: "h2, h3, a[aria-current]".into(),
    organization: Some(".orgao, .portal-titulo, .subtitle, .subtitulo, .documentByLine".into()),
    modality: Some(".modalidade, .label-modalidade, .tag".into()),
    value: Some(".valor, .price, .amount, .value".into()),
    link: Some("a".into()),
});

static DEFAULT_PROFILE: Lazy<SelectorProfile> = Lazy::new(|| {
    SelectorProfile::from_config(&DEFAULT_PROFILE_CONFIG)
        .expect("Failed to compile DEFAULT_PROFILE")
});

// --- Data Structures ---

/// Selector strings as written in a profile file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProfileConfig {
    pub list: String,
    pub title: String,
    #[serde(default)]
    pub organization: Option<String>,
    #[serde(default)]
    pub modality: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
}

/// Compiled selectors locating each field inside one listing container.
#[derive(Debug, Clone)]
pub struct SelectorProfile {
    list: Selector,
    title: Selector,
    organization: Option<Selector>,
    modality: Option<Selector>,
    value: Option<Selector>,
    link: Option<Selector>,
}

fn compile(field: &'static str, css: &str) -> Result<Selector, ExtractError> {
    Selector::parse(css).map_err(|e| ExtractError::InvalidSelector {
        field,
        reason: e.to_string(),
    })
}

fn compile_opt(field: &'static str, css: &Option<String>) -> Result<Option<Selector>, ExtractError> {
    css.as_deref()
        .filter(|s| !s.trim().is_empty())
        .map(|s| compile(field, s))
        .transpose()
}

impl SelectorProfile {
    pub fn from_config(config: &ProfileConfig) -> Result<Self, ExtractError> {
        Ok(Self {
            list: compile("list", &config.list)?,
            title: compile("title", &config.title)?,
            organization: compile_opt("organization", &config.organization)?,
            modality: compile_opt("modality", &config.modality)?,
            value: compile_opt("value", &config.value)?,
            link: compile_opt("link", &config.link)?,
        })
    }

    /// Reads a JSON profile file (`{"list": ..., "title": ..., ...}`).
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ExtractError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ExtractError::InvalidProfile(format!("{}: {}", path.display(), e)))?;
        let config: ProfileConfig = serde_json::from_str(&content)
            .map_err(|e| ExtractError::InvalidProfile(format!("{}: {}", path.display(), e)))?;
        tracing::debug!("Loaded selector profile from {}: {:?}", path.display(), config);
        Self::from_config(&config)
    }
}

impl Default for SelectorProfile {
    fn default() -> Self {
        DEFAULT_PROFILE.clone()
    }
}

// --- Field Extraction ---

fn first_text(container: ElementRef<'_>, selector: Option<&Selector>) -> Option<String> {
    let found = container.select(selector?).next()?;
    Some(found.text().map(str::trim).collect())
}

fn first_link(container: ElementRef<'_>, selector: Option<&Selector>) -> Option<String> {
    let found = container.select(selector?).next()?;
    found.value().attr("href").map(str::to_string)
}

/// Yields one raw field set per listing container that has a title or a link.
///
/// The iterator borrows the document and keeps no other state, so calling this
/// again walks the page from the start.
pub fn extract<'a>(
    document: &'a Html,
    profile: &'a SelectorProfile,
) -> impl Iterator<Item = RawNotice> + 'a {
    document.select(&profile.list).filter_map(move |container| {
        let raw = RawNotice {
            title: first_text(container, Some(&profile.title)),
            organization: first_text(container, profile.organization.as_ref()),
            modality: first_text(container, profile.modality.as_ref()),
            value_text: first_text(container, profile.value.as_ref()),
            link: first_link(container, profile.link.as_ref()),
        };
        if raw.has_identity() {
            Some(raw)
        } else {
            tracing::trace!("Skipping container without title or link");
            None
        }
    })
}

// --- Main Extractor Structure ---

/// Page HTML in, normalized records out.
pub struct NoticeExtractor<F: AmountFormat = LocalizedAmountFormat> {
    profile: SelectorProfile,
    format: F,
}

impl NoticeExtractor {
    pub fn new(profile: SelectorProfile) -> Self {
        Self { profile, format: LocalizedAmountFormat::BRL }
    }
}

impl<F: AmountFormat> NoticeExtractor<F> {
    pub fn with_format(profile: SelectorProfile, format: F) -> Self {
        Self { profile, format }
    }

    pub fn extract_records(&self, html_content: &str) -> Vec<NoticeRecord> {
        let document = Html::parse_document(html_content);
        let records: Vec<NoticeRecord> = extract(&document, &self.profile)
            .map(|raw| normalize_with(&self.format, &raw))
            .collect();
        tracing::debug!("Extracted {} notices from {} bytes of HTML", records.len(), html_content.len());
        records
    }
}
