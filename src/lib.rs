//! # pubmed-ingest
//!
//! Harvest PubMed records through the NCBI E-utilities history server and
//! normalize them into [`Citation`] values: authors, MeSH subjects, journal
//! details, a resolved publication date and a short citation string.
//!
//! ```no_run
//! use pubmed_ingest::{ClientConfig, PubMedClient, SearchOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = PubMedClient::with_config(ClientConfig::from_env().with_email("me@example.org"));
//!     let harvest = client
//!         .harvest("asthma[mh] AND 2020[dp]", &SearchOptions::new().with_retmax(2000))
//!         .await?;
//!
//!     for citation in &harvest.citations {
//!         println!("{} {}", citation.pmid, citation.citation);
//!     }
//!     if !harvest.status.is_complete() {
//!         eprintln!("harvest incomplete: {:?}", harvest.status);
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod pubmed;
pub mod rate_limit;
pub mod retry;

pub use config::ClientConfig;
pub use error::{ExtractionError, PubMedError, Result};
pub use pubmed::{
    BatchWindow, Citation, CitationBatch, DateSource, Harvest, HarvestStatus, Journal, Pagination,
    PubMedClient, PublicationDate, ResolvedDate, ResultPaginator, SearchOptions, SearchSession,
    Subject, format_citation, parse_batch, parse_citation, resolve_publication_date,
};
pub use rate_limit::RateLimiter;
pub use retry::RetryConfig;
