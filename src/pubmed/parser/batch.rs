//! Extraction of every record in one EFetch payload

use tracing::{debug, instrument, warn};

use super::parse_citation;
use super::preprocessing::split_article_records;
use crate::error::Result;
use crate::pubmed::models::{BatchWindow, CitationBatch};

/// Extract all citations from an EFetch payload fetched for `window`.
///
/// Records that fail extraction are skipped and returned as diagnostics; the
/// rest of the batch is unaffected. Errors only when the payload ends inside a
/// record or is not XML.
#[instrument(skip(xml), fields(xml_size = xml.len(), retstart = window.retstart))]
pub fn parse_batch(xml: &str, window: BatchWindow) -> Result<CitationBatch> {
    let records = split_article_records(xml)?;

    let mut citations = Vec::with_capacity(records.len());
    let mut diagnostics = Vec::new();

    for (index, record) in records.into_iter().enumerate() {
        match parse_citation(record, index) {
            Ok(citation) => citations.push(citation),
            Err(e) => {
                warn!(error = %e, "Failed to extract citation, skipping");
                diagnostics.push(e);
            }
        }
    }

    debug!(
        extracted = citations.len(),
        skipped = diagnostics.len(),
        "Extracted batch"
    );

    Ok(CitationBatch {
        window,
        citations,
        diagnostics,
    })
}
