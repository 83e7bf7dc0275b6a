use serde::Deserialize;

use crate::error::{PubMedError, Result};

/// ESearch response (`retmode=xml`)
#[derive(Debug, Deserialize)]
#[serde(rename = "eSearchResult")]
pub(crate) struct ESearchResult {
    #[serde(rename = "ERROR", default)]
    pub error: Option<String>,
    #[serde(rename = "Count", default)]
    pub count: Option<String>,
    #[serde(rename = "QueryKey", default)]
    pub query_key: Option<String>,
    #[serde(rename = "WebEnv", default)]
    pub webenv: Option<String>,
    #[serde(rename = "IdList", default)]
    pub id_list: Option<IdList>,
    #[serde(rename = "QueryTranslation", default)]
    pub query_translation: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct IdList {
    #[serde(rename = "Id", default)]
    pub ids: Vec<String>,
}

impl ESearchResult {
    pub(crate) fn from_xml(xml: &str) -> Result<Self> {
        quick_xml::de::from_str(xml)
            .map_err(|e| PubMedError::XmlError(format!("Failed to deserialize ESearch XML: {}", e)))
    }

    pub(crate) fn pmids(&mut self) -> Vec<String> {
        self.id_list
            .take()
            .map(|list| list.ids)
            .unwrap_or_default()
            .into_iter()
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .collect()
    }
}

/// Text of an `<ERROR>` element in an E-utilities payload, if any
pub(crate) fn error_message(xml: &str) -> Option<&str> {
    let (_, rest) = xml.split_once("<ERROR>")?;
    let message = rest.split("</ERROR>").next().unwrap_or(rest).trim();
    Some(if message.is_empty() { "Unknown error" } else { message })
}
