// src/filters/mod.rs
use crate::extractors::currency::parse_amount;
use crate::portal::models::NoticeRecord;

/// Inclusion criteria; `None` (or a blank string) means "don't filter on this".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterCriteria {
    pub organization: Option<String>,
    pub modality: Option<String>,
    pub value_min: Option<f64>,
    pub value_max: Option<f64>,
}

/// Plain lowercase substring test. Accents are compared as-is, so
/// "Secretária" does not match "SECRETARIA".
fn contains_folded(field: &str, needle: &Option<String>) -> bool {
    match needle.as_deref().filter(|n| !n.is_empty()) {
        Some(needle) => field
            .trim()
            .to_lowercase()
            .contains(&needle.trim().to_lowercase()),
        None => true,
    }
}

/// Stored value, falling back to parsing `value_text` for records that only carry text.
pub fn effective_value(record: &NoticeRecord) -> Option<f64> {
    record.value.or_else(|| parse_amount(record.value_text.as_deref()))
}

impl FilterCriteria {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn matches(&self, record: &NoticeRecord) -> bool {
        if !contains_folded(&record.organization, &self.organization) {
            return false;
        }
        if !contains_folded(&record.modality, &self.modality) {
            return false;
        }
        if self.value_min.is_none() && self.value_max.is_none() {
            return true;
        }

        let Some(value) = effective_value(record) else {
            return false;
        };
        self.value_min.map_or(true, |min| value >= min) && self.value_max.map_or(true, |max| value <= max)
    }
}

/// Records passing every supplied criterion, in input order.
pub fn filter_records<'a, I>(records: I, criteria: &FilterCriteria) -> Vec<NoticeRecord>
where
    I: IntoIterator<Item = &'a NoticeRecord>,
{
    records
        .into_iter()
        .filter(|record| criteria.matches(record))
        .cloned()
        .collect()
}
