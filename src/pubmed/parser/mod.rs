//! Citation extraction from EFetch XML
//!
//! # Module Organization
//!
//! - `preprocessing` - record splitting and inline markup removal
//! - `deserializers` - custom serde deserializers for text and Y/N flags
//! - `xml_types` - the `PubmedArticle` schema and field extraction
//! - `batch` - extraction of a whole EFetch payload
//!
//! [`parse_citation`] turns one `<PubmedArticle>` record into a [`Citation`];
//! [`parse_batch`] applies it to every record in a payload and collects
//! per-record failures as diagnostics.

mod batch;
mod deserializers;
mod preprocessing;
mod xml_types;

pub use batch::parse_batch;

use std::sync::OnceLock;

use quick_xml::de::from_str;
use regex::Regex;
use tracing::instrument;

use crate::error::ExtractionError;
use crate::pubmed::citation::format_citation;
use crate::pubmed::date::resolve_publication_date;
use crate::pubmed::models::Citation;
use preprocessing::strip_inline_html_tags;
use xml_types::PubmedArticleXml;

/// Best-effort PMID lookup for records that fail to deserialize
fn scan_pmid(record_xml: &str) -> Option<String> {
    static PMID_REGEX: OnceLock<Regex> = OnceLock::new();
    let re = PMID_REGEX.get_or_init(|| {
        Regex::new(r"<PMID[^>]*>\s*(\d+)\s*</PMID>").expect("Failed to compile PMID regex")
    });
    re.captures(record_xml)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Extract a citation from one `<PubmedArticle>` record.
///
/// `record_index` is the record's position in its batch and is only used to
/// label diagnostics. Absent fields become empty values; only a missing PMID
/// or an unreadable record is an error.
///
/// # Example
///
/// ```
/// use pubmed_ingest::pubmed::parser::parse_citation;
///
/// let xml = r#"<PubmedArticle>
///   <MedlineCitation Status="MEDLINE">
///     <PMID Version="1">31452104</PMID>
///     <Article>
///       <Journal>
///         <JournalIssue>
///           <Volume>12</Volume>
///           <Issue>3</Issue>
///           <PubDate><Year>2020</Year><Month>Jun</Month></PubDate>
///         </JournalIssue>
///         <Title>Example Journal</Title>
///       </Journal>
///       <ArticleTitle>Example Article</ArticleTitle>
///       <Pagination><MedlinePgn>100-110</MedlinePgn></Pagination>
///     </Article>
///   </MedlineCitation>
/// </PubmedArticle>"#;
///
/// let citation = parse_citation(xml, 0).unwrap();
/// assert_eq!(citation.pmid, "31452104");
/// assert_eq!(citation.citation, "2020 Jun; 12(3): 100-110.");
/// ```
#[instrument(skip(record_xml), fields(xml_size = record_xml.len()))]
pub fn parse_citation(
    record_xml: &str,
    record_index: usize,
) -> Result<Citation, ExtractionError> {
    let cleaned_xml = strip_inline_html_tags(record_xml);

    let article: PubmedArticleXml = from_str(&cleaned_xml).map_err(|e| {
        ExtractionError::new(
            record_index,
            scan_pmid(record_xml),
            format!("unparsable record: {}", e),
        )
    })?;

    let pmid = article.pmid();
    if pmid.is_empty() {
        return Err(ExtractionError::new(record_index, None, "missing PMID"));
    }

    let pub_date = article.publication_date();
    let pagination = article.pagination();
    let resolved_date = resolve_publication_date(&pub_date);
    let citation = format_citation(&pub_date, resolved_date.as_ref(), &pagination);

    Ok(Citation {
        pmid,
        title: article.title(),
        affiliation: article.affiliation(),
        abstract_text: article.abstract_text(),
        abstract_copyright: article.abstract_copyright(),
        authors: article.author_names(),
        journal: article.journal(),
        pagination,
        pub_date,
        resolved_date,
        citation,
        subjects: article.subjects(),
        publication_status: article.publication_status(),
        medline_status: article.medline_status(),
        raw_xml: record_xml.to_string(),
    })
}
