use std::fmt;

use serde::{Deserialize, Serialize};
use time::{Date, Month};

use crate::error::{ExtractionError, PubMedError};
use crate::pubmed::date::month_abbreviation;

/// Options for an ESearch request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchOptions {
    /// Upper bound on the number of records fetched for this search
    pub retmax: Option<usize>,
    /// Extra ESearch parameters passed through verbatim (`sort`, `datetype`, ...)
    pub params: Vec<(String, String)>,
}

impl SearchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_retmax(mut self, retmax: usize) -> Self {
        self.retmax = Some(retmax);
        self
    }

    pub fn with_param(mut self, key: &str, value: &str) -> Self {
        self.params.push((key.to_string(), value.to_string()));
        self
    }
}

/// A search result set held on the NCBI history server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchSession {
    pub query: String,
    /// WebEnv session identifier
    pub webenv: String,
    /// Query key within the WebEnv session
    pub query_key: String,
    /// Total hits reported by ESearch (`Count`)
    pub total_count: usize,
    /// Cap requested through [`SearchOptions::retmax`]
    pub retmax: Option<usize>,
    /// First page of PMIDs returned inline by ESearch
    pub pmids: Vec<String>,
}

impl SearchSession {
    /// Number of records pagination should retrieve
    pub fn records_to_fetch(&self) -> usize {
        match self.retmax {
            Some(cap) => cap.min(self.total_count),
            None => self.total_count,
        }
    }
}

/// One EFetch window into the history server's result set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchWindow {
    pub retstart: usize,
    pub retmax: usize,
}

impl BatchWindow {
    /// Offset of the first record after this window
    pub fn end(&self) -> usize {
        self.retstart + self.retmax
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Journal {
    pub name: String,
    pub abbreviated_name: String,
    pub issn_online: String,
    pub issn_print: String,
    pub nlm_unique_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub volume: String,
    pub issue: String,
    pub pages: String,
}

/// A MeSH descriptor, or one descriptor/qualifier pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    /// Descriptor name; qualifier entries repeat their descriptor's name
    pub name: String,
    /// Qualifier name, empty for the descriptor entry itself
    pub qualifier: String,
    pub is_major_topic: bool,
}

/// Publication date fields as they appear in the record.
///
/// Empty strings stand for absent elements.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicationDate {
    pub year: String,
    pub month: String,
    pub day: String,
    pub season: String,
    /// Free-text `MedlineDate`, e.g. "1998 Dec-1999 Jan"
    pub medline_date: String,
    /// `PubMedPubDate[@PubStatus="pubmed"]` from the record history
    pub history_year: String,
    pub history_month: String,
    pub history_day: String,
}

/// Which field of the record the resolved date came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateSource {
    /// Structured `PubDate` with a month
    PubDate,
    /// `PubDate/Season`
    Season,
    /// `MedlineDate` starting with a year and a month abbreviation
    MedlineMonth,
    /// `MedlineDate` starting with a year and a season word
    MedlineSeason,
    /// Record history (the date PubMed indexed the record)
    History,
    /// Only a year could be found
    YearOnly,
}

/// A single calendar date resolved from the scattered date fields.
///
/// Imprecise dates are pinned to the earliest day of their period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedDate {
    pub date: Date,
    pub source: DateSource,
    /// False when only the year is known and the month is a placeholder
    pub month_resolved: bool,
}

impl ResolvedDate {
    pub fn year(&self) -> i32 {
        self.date.year()
    }

    pub fn month(&self) -> Month {
        self.date.month()
    }

    pub fn day(&self) -> u8 {
        self.date.day()
    }
}

impl fmt::Display for ResolvedDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.month_resolved {
            write!(
                f,
                "{} {} {}",
                self.year(),
                month_abbreviation(self.month()),
                self.day()
            )
        } else {
            write!(f, "{}", self.year())
        }
    }
}

/// A normalized bibliographic record extracted from one `PubmedArticle`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    pub pmid: String,
    pub title: String,
    pub affiliation: String,
    pub abstract_text: String,
    pub abstract_copyright: String,
    /// Display names in record order, e.g. "Smith JA"
    pub authors: Vec<String>,
    pub journal: Journal,
    pub pagination: Pagination,
    pub pub_date: PublicationDate,
    pub resolved_date: Option<ResolvedDate>,
    /// e.g. "2020 Jun; 12(3): 100-110."
    pub citation: String,
    pub subjects: Vec<Subject>,
    /// `PubmedData/PublicationStatus`, e.g. "ppublish"
    pub publication_status: String,
    /// `MedlineCitation/@Status`, e.g. "MEDLINE"
    pub medline_status: String,
    /// The record exactly as received, for change detection downstream
    pub raw_xml: String,
}

/// Citations and per-record diagnostics extracted from one fetched batch
#[derive(Debug, Clone, PartialEq)]
pub struct CitationBatch {
    pub window: BatchWindow,
    pub citations: Vec<Citation>,
    pub diagnostics: Vec<ExtractionError>,
}

/// Outcome of paginating through a whole search
#[derive(Debug)]
pub enum HarvestStatus {
    /// Every planned batch was fetched
    Complete,
    /// A batch failed after retries; records from `next_offset` on were not fetched
    Partial {
        next_offset: usize,
        error: PubMedError,
    },
}

impl HarvestStatus {
    pub fn is_complete(&self) -> bool {
        matches!(self, HarvestStatus::Complete)
    }
}

/// Everything produced by [`PubMedClient::harvest`](crate::PubMedClient::harvest)
#[derive(Debug)]
pub struct Harvest {
    pub session: SearchSession,
    pub citations: Vec<Citation>,
    pub diagnostics: Vec<ExtractionError>,
    pub status: HarvestStatus,
}
