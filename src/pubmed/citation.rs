//! Citation string formatting
//!
//! Produces the short source line used downstream, e.g.
//! `"2020 Jun; 12(3): 100-110."`. Full bibliographic styles are not produced.

use crate::pubmed::date::month_abbreviation;
use crate::pubmed::models::{DateSource, Pagination, PublicationDate, ResolvedDate};

/// Date segment: the `MedlineDate` text verbatim, else the resolved year,
/// followed by the season or month name when one was resolved
fn date_segment(pub_date: &PublicationDate, resolved: Option<&ResolvedDate>) -> String {
    let medline_date = pub_date.medline_date.trim();
    let mut segment = if !medline_date.is_empty() {
        medline_date.to_string()
    } else {
        resolved.map(|r| r.year().to_string()).unwrap_or_default()
    };

    let period = match resolved {
        Some(r) if r.source == DateSource::Season => Some(pub_date.season.trim()),
        Some(r) if r.month_resolved => Some(month_abbreviation(r.month())),
        _ => None,
    };

    if let Some(period) = period.filter(|p| !p.is_empty()) {
        if !segment.is_empty() {
            segment.push(' ');
        }
        segment.push_str(period);
    }

    segment
}

/// Format the source line of a citation.
///
/// The result always ends with a period, so it is never empty.
pub fn format_citation(
    pub_date: &PublicationDate,
    resolved: Option<&ResolvedDate>,
    pagination: &Pagination,
) -> String {
    let mut citation = date_segment(pub_date, resolved);

    let volume = pagination.volume.trim();
    let issue = pagination.issue.trim();
    if !volume.is_empty() || !issue.is_empty() {
        if !citation.is_empty() {
            citation.push_str("; ");
        }
        citation.push_str(volume);
        if !issue.is_empty() {
            citation.push('(');
            citation.push_str(issue);
            citation.push(')');
        }
    }

    let pages = pagination.pages.trim();
    if !pages.is_empty() {
        if !citation.is_empty() {
            citation.push_str(": ");
        }
        citation.push_str(pages);
    }

    citation.push('.');
    citation
}
