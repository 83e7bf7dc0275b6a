//! History server pagination (EFetch windows, citation streams, harvesting)

use futures_util::{Stream, StreamExt, stream};
use tracing::{debug, info, instrument, warn};

use super::PubMedClient;
use crate::error::{PubMedError, Result};
use crate::pubmed::models::{
    BatchWindow, Citation, CitationBatch, Harvest, HarvestStatus, SearchOptions, SearchSession,
};
use crate::pubmed::parser::parse_batch;
use crate::pubmed::responses::error_message;

/// Largest `retmax` EFetch serves from the history server in one request
pub const MAX_BATCH_SIZE: usize = 500;

/// Walks a search session's result set in EFetch windows.
///
/// Windows are `(retstart, retmax)` pairs with `retmax = min(remaining, batch size)`;
/// the offset advances by the requested size only after a window was fetched,
/// so a failed window can be requested again. The paginator owns the session.
pub struct ResultPaginator<'a> {
    client: &'a PubMedClient,
    session: SearchSession,
    total: usize,
    batch_size: usize,
    offset: usize,
}

impl<'a> ResultPaginator<'a> {
    fn new(client: &'a PubMedClient, session: SearchSession, total: usize) -> Self {
        Self {
            client,
            session,
            total,
            batch_size: MAX_BATCH_SIZE,
            offset: 0,
        }
    }

    /// Use smaller windows; values are clamped to `1..=500`
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.clamp(1, MAX_BATCH_SIZE);
        self
    }

    pub fn session(&self) -> &SearchSession {
        &self.session
    }

    /// Number of records this paginator will request
    pub fn total(&self) -> usize {
        self.total
    }

    /// `retstart` of the next window to fetch
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn is_done(&self) -> bool {
        self.offset >= self.total
    }

    fn next_window(&self) -> Option<BatchWindow> {
        if self.is_done() {
            return None;
        }
        Some(BatchWindow {
            retstart: self.offset,
            retmax: (self.total - self.offset).min(self.batch_size),
        })
    }

    /// Windows still to be fetched, in order
    pub fn windows(&self) -> Vec<BatchWindow> {
        let mut windows = Vec::new();
        let mut retstart = self.offset;
        while retstart < self.total {
            let retmax = (self.total - retstart).min(self.batch_size);
            windows.push(BatchWindow { retstart, retmax });
            retstart += retmax;
        }
        windows
    }

    /// Fetch the next window's raw EFetch payload.
    ///
    /// `Ok(None)` once every window has been fetched.
    pub async fn next_batch(&mut self) -> Result<Option<(BatchWindow, String)>> {
        let Some(window) = self.next_window() else {
            return Ok(None);
        };
        let payload = self.client.fetch_window(&self.session, window).await?;
        self.offset = window.end();
        Ok(Some((window, payload)))
    }

    /// Fetch the next window and extract its citations
    pub async fn next_citation_batch(&mut self) -> Result<Option<CitationBatch>> {
        let Some(window) = self.next_window() else {
            return Ok(None);
        };
        let payload = self.client.fetch_window(&self.session, window).await?;
        let batch = parse_batch(&payload, window)?;
        self.offset = window.end();
        Ok(Some(batch))
    }

    /// Raw payloads of the remaining windows; ends after the first error
    pub fn into_payloads(self) -> impl Stream<Item = Result<(BatchWindow, String)>> + 'a {
        stream::unfold(Some(self), |state| async move {
            let mut paginator = state?;
            match paginator.next_batch().await {
                Ok(Some(item)) => Some((Ok(item), Some(paginator))),
                Ok(None) => None,
                Err(e) => Some((Err(e), None)),
            }
        })
    }

    /// Citation batches of the remaining windows; ends after the first error
    pub fn into_citation_batches(self) -> impl Stream<Item = Result<CitationBatch>> + 'a {
        stream::unfold(Some(self), |state| async move {
            let mut paginator = state?;
            match paginator.next_citation_batch().await {
                Ok(Some(batch)) => Some((Ok(batch), Some(paginator))),
                Ok(None) => None,
                Err(e) => Some((Err(e), None)),
            }
        })
    }
}

impl PubMedClient {
    /// Paginate over `session.records_to_fetch()` records
    pub fn paginate(&self, session: SearchSession) -> ResultPaginator<'_> {
        let total = session.records_to_fetch();
        ResultPaginator::new(self, session, total)
    }

    /// Paginate over exactly `total` records, regardless of the session's count
    pub fn paginate_with_total(&self, session: SearchSession, total: usize) -> ResultPaginator<'_> {
        ResultPaginator::new(self, session, total)
    }

    /// Fetch one window of a search session as raw EFetch XML
    ///
    /// # Errors
    ///
    /// * `PubMedError::HistorySessionError` - NCBI rejected the session (e.g. expired WebEnv)
    /// * `PubMedError::ApiError` / `PubMedError::RequestError` - the request failed after retries
    #[instrument(skip(self, session), fields(retstart = window.retstart, retmax = window.retmax))]
    pub async fn fetch_window(&self, session: &SearchSession, window: BatchWindow) -> Result<String> {
        let url = format!(
            "{}/efetch.fcgi?db=pubmed&retmode=xml&rettype=full&WebEnv={}&query_key={}&retstart={}&retmax={}",
            self.base_url,
            urlencoding::encode(&session.webenv),
            urlencoding::encode(&session.query_key),
            window.retstart,
            window.retmax
        );

        info!("Fetching results {} - {}", window.retstart, window.end());
        let xml_text = self.get_text(&url, "EFetch request").await?;

        if let Some(error_msg) = error_message(&xml_text) {
            return Err(PubMedError::HistorySessionError(error_msg.to_string()));
        }

        debug!(bytes = xml_text.len(), "Fetched window");
        Ok(xml_text)
    }

    /// Stream a session's citations one batch at a time.
    ///
    /// A batch is requested only after the previous one has been consumed. The
    /// stream yields at most one error and ends with it.
    pub fn citation_batches(&self, session: SearchSession) -> impl Stream<Item = Result<CitationBatch>> + '_ {
        self.paginate(session).into_citation_batches()
    }

    /// Stream a session's citations in result order.
    ///
    /// Records that could not be extracted are logged and skipped; use
    /// [`citation_batches`](Self::citation_batches) to receive them as diagnostics.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use futures_util::StreamExt;
    /// use pubmed_ingest::{PubMedClient, SearchOptions};
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let client = PubMedClient::new();
    ///     let session = client.search("asthma[mh]", &SearchOptions::new().with_retmax(50)).await?;
    ///
    ///     let citations = client.citations(session);
    ///     futures_util::pin_mut!(citations);
    ///     while let Some(citation) = citations.next().await {
    ///         let citation = citation?;
    ///         println!("{}: {} {}", citation.pmid, citation.title, citation.citation);
    ///     }
    ///     Ok(())
    /// }
    /// ```
    pub fn citations(&self, session: SearchSession) -> impl Stream<Item = Result<Citation>> + '_ {
        self.citation_batches(session).flat_map(|batch| {
            let items: Vec<Result<Citation>> = match batch {
                Ok(batch) => batch.citations.into_iter().map(Ok).collect(),
                Err(e) => vec![Err(e)],
            };
            stream::iter(items)
        })
    }

    /// Search and fetch every record of the result set.
    ///
    /// Only a failed search is an `Err`. A batch that still fails after retries
    /// stops the harvest and is reported as [`HarvestStatus::Partial`]; the
    /// citations from earlier batches are kept.
    #[instrument(skip(self, options), fields(query = %query))]
    pub async fn harvest(&self, query: &str, options: &SearchOptions) -> Result<Harvest> {
        let session = self.search(query, options).await?;
        let mut paginator = self.paginate(session);

        let mut citations = Vec::new();
        let mut diagnostics = Vec::new();

        let status = loop {
            match paginator.next_citation_batch().await {
                Ok(Some(batch)) => {
                    citations.extend(batch.citations);
                    diagnostics.extend(batch.diagnostics);
                }
                Ok(None) => break HarvestStatus::Complete,
                Err(error) => {
                    warn!(
                        next_offset = paginator.offset(),
                        total = paginator.total(),
                        error = %error,
                        "Harvest stopped early"
                    );
                    break HarvestStatus::Partial {
                        next_offset: paginator.offset(),
                        error,
                    };
                }
            }
        };

        info!(
            citations = citations.len(),
            skipped = diagnostics.len(),
            complete = status.is_complete(),
            "Harvest finished"
        );

        Ok(Harvest {
            session: paginator.session,
            citations,
            diagnostics,
            status,
        })
    }
}
