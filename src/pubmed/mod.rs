//! PubMed ingestion: search, pagination and citation extraction
//!
//! - `client/mod.rs` - client struct, HTTP plumbing and ESearch (`search`)
//! - `client/history` - EFetch windows over the history server, streams, `harvest`
//! - `parser` - `PubmedArticle` records to [`Citation`] values
//! - `date` - publication date resolution
//! - `citation` - the short citation string

pub mod citation;
pub mod client;
pub mod date;
pub mod models;
pub mod parser;
pub(crate) mod responses;

pub use citation::format_citation;
pub use client::{PubMedClient, ResultPaginator};
pub use date::{
    MedlineDateMatch, month_abbreviation, parse_medline_year, parse_medline_year_month,
    parse_medline_year_season, parse_month, resolve_publication_date, season_to_month,
};
pub use models::{
    BatchWindow, Citation, CitationBatch, DateSource, Harvest, HarvestStatus, Journal, Pagination,
    PublicationDate, ResolvedDate, SearchOptions, SearchSession, Subject,
};
pub use parser::{parse_batch, parse_citation};
