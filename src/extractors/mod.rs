// src/extractors/mod.rs
pub mod currency;
pub mod page;
pub mod record;

// Re-export key extraction types for convenience
#[allow(unused_imports)]
pub use currency::{parse_amount, parse_amount_with, AmountFormat, LocalizedAmountFormat};
#[allow(unused_imports)]
pub use page::{extract, NoticeExtractor, ProfileConfig, SelectorProfile};
#[allow(unused_imports)]
pub use record::{normalize, normalize_with};
