//! Payload preparation before record extraction

use std::sync::OnceLock;

use quick_xml::Reader;
use quick_xml::events::Event;
use regex::Regex;
use tracing::debug;

use crate::error::{PubMedError, Result};

const ARTICLE_TAG: &[u8] = b"PubmedArticle";

/// Strip inline formatting tags (`<i>`, `<sup>`, `<sub>`, `<b>`, ...) that
/// appear inside `ArticleTitle` and `AbstractText`.
///
/// ```ignore
/// let cleaned = strip_inline_html_tags("<AbstractText>CO<sup>2</sup> levels</AbstractText>");
/// assert_eq!(cleaned, "<AbstractText>CO2 levels</AbstractText>");
/// ```
pub(crate) fn strip_inline_html_tags(xml: &str) -> String {
    static INLINE_TAG_REGEX: OnceLock<Regex> = OnceLock::new();
    let re = INLINE_TAG_REGEX.get_or_init(|| {
        Regex::new(r"</?(?:i|b|u|sup|sub|em|strong|italic|bold)>")
            .expect("Failed to compile inline tag regex")
    });

    let cleaned = re.replace_all(xml, "");
    if cleaned.len() != xml.len() {
        debug!(
            removed_bytes = xml.len() - cleaned.len(),
            "Stripped inline HTML tags"
        );
    }

    cleaned.into_owned()
}

/// Split an EFetch payload into its `<PubmedArticle>` records.
///
/// Each slice is the record exactly as it appears in the payload, start tag
/// through end tag. Boundaries are found from `PubmedArticle` tags alone, so
/// a record with mismatched inner tags is still handed to extraction (where
/// it becomes a diagnostic) instead of failing the payload. A record missing
/// its end tag is closed at the next `<PubmedArticle>`.
///
/// Fails when the payload ends inside a record or is not XML at all.
pub(crate) fn split_article_records(xml: &str) -> Result<Vec<&str>> {
    let mut reader = Reader::from_str(xml);
    let config = reader.config_mut();
    config.check_end_names = false;
    config.allow_unmatched_ends = true;

    let mut records = Vec::new();
    let mut record_start: Option<usize> = None;

    loop {
        let event_start = reader.buffer_position() as usize;
        match reader.read_event() {
            Ok(Event::Start(tag)) if tag.name().as_ref() == ARTICLE_TAG => {
                // records never nest
                if let Some(start) = record_start.replace(event_start) {
                    debug!(record_start = start, "PubmedArticle without end tag");
                    records.push(xml[start..event_start].trim_end());
                }
            }
            Ok(Event::End(tag)) if tag.name().as_ref() == ARTICLE_TAG => {
                if let Some(start) = record_start.take() {
                    let end = reader.buffer_position() as usize;
                    records.push(&xml[start..end]);
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(PubMedError::XmlError(format!(
                    "Failed to read EFetch payload near byte {}: {}",
                    reader.buffer_position(),
                    e
                )));
            }
        }
    }

    if record_start.is_some() {
        return Err(PubMedError::XmlError(
            "EFetch payload ended inside a PubmedArticle".to_string(),
        ));
    }

    debug!(record_count = records.len(), "Split EFetch payload");
    Ok(records)
}
