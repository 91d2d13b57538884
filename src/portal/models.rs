// src/portal/models.rs
use serde::{Deserialize, Deserializer, Serialize};

/// Field strings pulled out of one listing container, before normalization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawNotice {
    pub title: Option<String>,
    pub organization: Option<String>,
    pub modality: Option<String>,
    pub value_text: Option<String>,
    pub link: Option<String>,
}

impl RawNotice {
    /// Extraction emits a container only when it has a title or a link.
    pub fn has_identity(&self) -> bool {
        let present = |f: &Option<String>| f.as_deref().is_some_and(|s| !s.is_empty());
        present(&self.title) || present(&self.link)
    }
}

/// Reads a JSON `null` text field as `""`, the same as a missing key.
fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Canonical, persisted procurement notice.
///
/// Every key is optional on input so that hand-written or LLM-returned records
/// (which may carry only `value_text`) still load. The Portuguese keys used by
/// older output files are accepted as aliases.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NoticeRecord {
    #[serde(default, alias = "titulo", deserialize_with = "null_as_empty")]
    pub title: String,
    #[serde(default, alias = "orgao", deserialize_with = "null_as_empty")]
    pub organization: String,
    #[serde(default, alias = "modalidade", deserialize_with = "null_as_empty")]
    pub modality: String,
    #[serde(default, alias = "valor")]
    pub value: Option<f64>,
    #[serde(default, alias = "valor_texto")]
    pub value_text: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
}

impl NoticeRecord {
    /// The raw field set this record would have been built from.
    pub fn to_raw(&self) -> RawNotice {
        RawNotice {
            title: Some(self.title.clone()),
            organization: Some(self.organization.clone()),
            modality: Some(self.modality.clone()),
            value_text: self.value_text.clone(),
            link: self.link.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_identity() {
        assert!(!RawNotice::default().has_identity());
        assert!(!RawNotice { title: Some(String::new()), ..Default::default() }.has_identity());
        assert!(RawNotice { link: Some("/x".into()), ..Default::default() }.has_identity());
        assert!(RawNotice { title: Some("T".into()), ..Default::default() }.has_identity());
    }

    #[test]
    fn test_record_serializes_absent_fields_as_null() {
        let record = NoticeRecord { title: "A".into(), ..Default::default() };
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["title"], "A");
        assert!(json["value"].is_null());
        assert!(json["value_text"].is_null());
        assert!(json["link"].is_null());
        assert_eq!(json.as_object().unwrap().len(), 6);
    }

    #[test]
    fn test_record_accepts_legacy_keys_and_missing_fields() {
        let json = r#"{"titulo": "Pregão 7", "orgao": "Prefeitura", "valor_texto": "R$ 10,00"}"#;
        let record: NoticeRecord = serde_json::from_str(json).unwrap();

        assert_eq!(record.title, "Pregão 7");
        assert_eq!(record.organization, "Prefeitura");
        assert_eq!(record.modality, "");
        assert_eq!(record.value, None);
        assert_eq!(record.value_text.as_deref(), Some("R$ 10,00"));
        assert_eq!(record.link, None);
    }

    #[test]
    fn test_record_reads_null_text_fields_as_empty() {
        let json = r#"{"title": null, "organization": "Prefeitura X", "modality": null, "value": null, "value_text": null, "link": null}"#;
        let record: NoticeRecord = serde_json::from_str(json).unwrap();

        assert_eq!(record.title, "");
        assert_eq!(record.organization, "Prefeitura X");
        assert_eq!(record.modality, "");
        assert_eq!(record.value, None);
    }
}
