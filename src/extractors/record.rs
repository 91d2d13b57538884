// src/extractors/record.rs
use crate::extractors::currency::{parse_amount_with, AmountFormat, LocalizedAmountFormat};
use crate::portal::models::{NoticeRecord, RawNotice};

fn trimmed(field: &Option<String>) -> String {
    field.as_deref().unwrap_or("").trim().to_string()
}

/// Builds the canonical record using the portal's default currency format.
pub fn normalize(raw: &RawNotice) -> NoticeRecord {
    normalize_with(&LocalizedAmountFormat::BRL, raw)
}

/// Trims the text fields, parses the amount and leaves `link` untouched.
pub fn normalize_with<F: AmountFormat + ?Sized>(format: &F, raw: &RawNotice) -> NoticeRecord {
    let value_text = trimmed(&raw.value_text);
    let value = parse_amount_with(format, Some(&value_text));

    NoticeRecord {
        title: trimmed(&raw.title),
        organization: trimmed(&raw.organization),
        modality: trimmed(&raw.modality),
        value,
        value_text: (!value_text.is_empty()).then_some(value_text),
        link: raw.link.clone(),
    }
}
