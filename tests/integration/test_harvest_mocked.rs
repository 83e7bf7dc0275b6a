//! Search, pagination and harvesting against a mocked E-utilities server
//!
//! These tests use wiremock to simulate NCBI ESearch and EFetch responses, and
//! check the exact windows requested from the history server.

use std::time::Duration;

use futures_util::StreamExt;
use pubmed_ingest::{
    BatchWindow, ClientConfig, HarvestStatus, PubMedClient, PubMedError, RetryConfig,
    SearchOptions,
};
use tracing_test::traced_test;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const WEBENV: &str = "MCID_6578a2f1";

fn esearch_response(count: usize, ids: &[&str]) -> String {
    let ids: String = ids.iter().map(|id| format!("<Id>{}</Id>\n", id)).collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" ?>
<!DOCTYPE eSearchResult PUBLIC "-//NLM//DTD esearch 20060628//EN" "https://eutils.ncbi.nlm.nih.gov/eutils/dtd/20060628/esearch.dtd">
<eSearchResult><Count>{count}</Count><RetMax>{}</RetMax><RetStart>0</RetStart><QueryKey>1</QueryKey><WebEnv>{WEBENV}</WebEnv><IdList>
{ids}</IdList><TranslationSet/><QueryTranslation>"asthma"[MeSH Terms]</QueryTranslation></eSearchResult>"#,
        ids.lines().count()
    )
}

fn efetch_response(pmids: &[&str]) -> String {
    let articles: String = pmids
        .iter()
        .map(|pmid| {
            format!(
                r#"<PubmedArticle>
    <MedlineCitation Status="MEDLINE" Owner="NLM">
        <PMID Version="1">{pmid}</PMID>
        <Article PubModel="Print">
            <Journal>
                <JournalIssue CitedMedium="Print">
                    <Volume>12</Volume>
                    <Issue>3</Issue>
                    <PubDate><Year>2020</Year><Month>Jun</Month></PubDate>
                </JournalIssue>
                <Title>Journal of Asthma</Title>
            </Journal>
            <ArticleTitle>Article {pmid}</ArticleTitle>
            <Pagination><MedlinePgn>100-110</MedlinePgn></Pagination>
        </Article>
    </MedlineCitation>
</PubmedArticle>
"#
            )
        })
        .collect();
    format!(
        "<?xml version=\"1.0\" ?>\n<!DOCTYPE PubmedArticleSet PUBLIC \"-//NLM//DTD PubMedArticle, 1st January 2024//EN\" \"https://dtd.nlm.nih.gov/ncbi/pubmed/out/pubmed_240101.dtd\">\n<PubmedArticleSet>\n{}</PubmedArticleSet>",
        articles
    )
}

fn xml_response(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(body)
        .insert_header("content-type", "text/xml; charset=UTF-8")
}

fn create_mock_client(mock_server: &MockServer) -> PubMedClient {
    let config = ClientConfig::new()
        .with_base_url(mock_server.uri())
        .with_rate_limit(100.0)
        .with_email("curator@example.org")
        .with_tool("ingest-test")
        .with_retry_config(
            RetryConfig::new()
                .with_max_attempts(2)
                .with_initial_delay(Duration::from_millis(5))
                .without_jitter(),
        );
    PubMedClient::with_config(config)
}

async fn mount_esearch(mock_server: &MockServer, body: String) {
    Mock::given(method("GET"))
        .and(path("/esearch.fcgi"))
        .respond_with(xml_response(body))
        .expect(1)
        .mount(mock_server)
        .await;
}

async fn mount_window(mock_server: &MockServer, retstart: usize, retmax: usize, pmids: &[&str]) {
    Mock::given(method("GET"))
        .and(path("/efetch.fcgi"))
        .and(query_param("db", "pubmed"))
        .and(query_param("retmode", "xml"))
        .and(query_param("rettype", "full"))
        .and(query_param("email", "curator@example.org"))
        .and(query_param("tool", "ingest-test"))
        .and(query_param("WebEnv", WEBENV))
        .and(query_param("query_key", "1"))
        .and(query_param("retstart", retstart.to_string()))
        .and(query_param("retmax", retmax.to_string()))
        .respond_with(xml_response(efetch_response(pmids)))
        .expect(1)
        .mount(mock_server)
        .await;
}

fn history_session(total_count: usize) -> pubmed_ingest::SearchSession {
    pubmed_ingest::SearchSession {
        query: "asthma".to_string(),
        webenv: WEBENV.to_string(),
        query_key: "1".to_string(),
        total_count,
        retmax: None,
        pmids: Vec::new(),
    }
}

#[tokio::test]
#[traced_test]
async fn test_search_request_and_session() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/esearch.fcgi"))
        .and(query_param("db", "pubmed"))
        .and(query_param("retmode", "xml"))
        .and(query_param("usehistory", "y"))
        .and(query_param("term", "asthma[mh]"))
        .and(query_param("retmax", "1000"))
        .and(query_param("sort", "pub_date"))
        .and(query_param("email", "curator@example.org"))
        .and(query_param("tool", "ingest-test"))
        .respond_with(xml_response(esearch_response(1200, &["3", "2", "1"])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = create_mock_client(&mock_server);
    let options = SearchOptions::new()
        .with_retmax(1000)
        .with_param("sort", "pub_date")
        .with_param("db", "pmc");

    let session = client.search("asthma[mh]", &options).await.unwrap();
    assert_eq!(session.query, "asthma[mh]");
    assert_eq!(session.total_count, 1200);
    assert_eq!(session.webenv, WEBENV);
    assert_eq!(session.query_key, "1");
    assert_eq!(session.pmids, vec!["3", "2", "1"]);
    assert_eq!(session.records_to_fetch(), 1000);
}

#[tokio::test]
#[traced_test]
async fn test_harvest_1200_records_in_three_windows() {
    let mock_server = MockServer::start().await;
    mount_esearch(&mock_server, esearch_response(1200, &["1", "2"])).await;
    mount_window(&mock_server, 0, 500, &["1", "2"]).await;
    mount_window(&mock_server, 500, 500, &["501"]).await;
    mount_window(&mock_server, 1000, 200, &["1001", "1002"]).await;

    let client = create_mock_client(&mock_server);
    let harvest = client
        .harvest("asthma[mh]", &SearchOptions::new())
        .await
        .unwrap();

    assert!(harvest.status.is_complete());
    let pmids: Vec<&str> = harvest.citations.iter().map(|c| c.pmid.as_str()).collect();
    assert_eq!(pmids, vec!["1", "2", "501", "1001", "1002"]);
    assert!(harvest.diagnostics.is_empty());
    assert_eq!(harvest.session.total_count, 1200);
    assert_eq!(harvest.citations[0].citation, "2020 Jun; 12(3): 100-110.");

    let efetch_requests = mock_server
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .filter(|r| r.url.path() == "/efetch.fcgi")
        .count();
    assert_eq!(efetch_requests, 3);
}

#[tokio::test]
#[traced_test]
async fn test_retmax_caps_windows() {
    let mock_server = MockServer::start().await;
    mount_esearch(&mock_server, esearch_response(1200, &["1"])).await;
    mount_window(&mock_server, 0, 500, &["1"]).await;
    mount_window(&mock_server, 500, 100, &["501"]).await;

    let client = create_mock_client(&mock_server);
    let harvest = client
        .harvest("asthma[mh]", &SearchOptions::new().with_retmax(600))
        .await
        .unwrap();

    assert!(harvest.status.is_complete());
    assert_eq!(harvest.citations.len(), 2);
}

#[tokio::test]
#[traced_test]
async fn test_empty_result_fetches_nothing() {
    let mock_server = MockServer::start().await;
    mount_esearch(&mock_server, esearch_response(0, &[])).await;
    Mock::given(method("GET"))
        .and(path("/efetch.fcgi"))
        .respond_with(xml_response(efetch_response(&[])))
        .expect(0)
        .mount(&mock_server)
        .await;

    let client = create_mock_client(&mock_server);
    let harvest = client
        .harvest("no such topic", &SearchOptions::new())
        .await
        .unwrap();

    assert!(harvest.status.is_complete());
    assert!(harvest.citations.is_empty());
}

#[tokio::test]
#[traced_test]
async fn test_missing_webenv_is_malformed() {
    let mock_server = MockServer::start().await;
    mount_esearch(
        &mock_server,
        "<eSearchResult><Count>12</Count><RetMax>0</RetMax><RetStart>0</RetStart><IdList/></eSearchResult>"
            .to_string(),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/efetch.fcgi"))
        .respond_with(xml_response(efetch_response(&[])))
        .expect(0)
        .mount(&mock_server)
        .await;

    let client = create_mock_client(&mock_server);
    let result = client.harvest("asthma", &SearchOptions::new()).await;

    match result {
        Err(PubMedError::MalformedResponse { message }) => {
            assert!(message.contains("WebEnv"), "unexpected message: {}", message)
        }
        other => panic!("Expected MalformedResponse, got {:?}", other),
    }
}

#[tokio::test]
#[traced_test]
async fn test_esearch_error_element() {
    let mock_server = MockServer::start().await;
    mount_esearch(
        &mock_server,
        "<eSearchResult><ERROR>Invalid query</ERROR></eSearchResult>".to_string(),
    )
    .await;

    let client = create_mock_client(&mock_server);
    let err = client
        .search("((", &SearchOptions::new())
        .await
        .unwrap_err();

    match err {
        PubMedError::ApiError { message, .. } => assert!(message.contains("Invalid query")),
        other => panic!("Expected ApiError, got {:?}", other),
    }
}

#[tokio::test]
#[traced_test]
async fn test_expired_session_makes_harvest_partial() {
    let mock_server = MockServer::start().await;
    mount_esearch(&mock_server, esearch_response(1200, &["1"])).await;
    mount_window(&mock_server, 0, 500, &["1", "2"]).await;
    Mock::given(method("GET"))
        .and(path("/efetch.fcgi"))
        .and(query_param("retstart", "500"))
        .respond_with(xml_response(
            "<?xml version=\"1.0\" ?>\n<eFetchResult>\n<ERROR>Unable to obtain query #1</ERROR>\n</eFetchResult>".to_string(),
        ))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/efetch.fcgi"))
        .and(query_param("retstart", "1000"))
        .respond_with(xml_response(efetch_response(&["1001"])))
        .expect(0)
        .mount(&mock_server)
        .await;

    let client = create_mock_client(&mock_server);
    let harvest = client
        .harvest("asthma[mh]", &SearchOptions::new())
        .await
        .unwrap();

    assert_eq!(harvest.citations.len(), 2);
    match harvest.status {
        HarvestStatus::Partial { next_offset, error } => {
            assert_eq!(next_offset, 500);
            assert!(matches!(error, PubMedError::HistorySessionError(msg) if msg.contains("Unable to obtain query")));
        }
        HarvestStatus::Complete => panic!("Expected a partial harvest"),
    }
}

#[tokio::test]
#[traced_test]
async fn test_citation_stream_follows_windows() {
    let mock_server = MockServer::start().await;
    mount_esearch(&mock_server, esearch_response(700, &["1"])).await;
    mount_window(&mock_server, 0, 500, &["1", "2"]).await;
    mount_window(&mock_server, 500, 200, &["501"]).await;

    let client = create_mock_client(&mock_server);
    let session = client
        .search("asthma[mh]", &SearchOptions::new())
        .await
        .unwrap();

    let batches: Vec<_> = client.citation_batches(session.clone()).collect().await;
    let windows: Vec<BatchWindow> = batches
        .iter()
        .map(|batch| batch.as_ref().unwrap().window)
        .collect();
    assert_eq!(
        windows,
        vec![
            BatchWindow { retstart: 0, retmax: 500 },
            BatchWindow { retstart: 500, retmax: 200 },
        ]
    );
}

#[tokio::test]
#[traced_test]
async fn test_paginator_yields_raw_payloads() {
    let mock_server = MockServer::start().await;
    mount_window(&mock_server, 0, 2, &["1", "2"]).await;
    mount_window(&mock_server, 2, 1, &["3"]).await;

    let client = create_mock_client(&mock_server);
    let session = history_session(3);

    let mut paginator = client.paginate(session).with_batch_size(2);
    let (first_window, first_payload) = paginator.next_batch().await.unwrap().unwrap();
    assert_eq!(first_window, BatchWindow { retstart: 0, retmax: 2 });
    assert!(first_payload.contains("<PMID Version=\"1\">2</PMID>"));
    assert_eq!(paginator.offset(), 2);

    let (second_window, _) = paginator.next_batch().await.unwrap().unwrap();
    assert_eq!(second_window, BatchWindow { retstart: 2, retmax: 1 });
    assert!(paginator.next_batch().await.unwrap().is_none());
    assert!(paginator.is_done());
}

#[tokio::test]
#[traced_test]
async fn test_payload_stream_ends_after_failed_window() {
    let mock_server = MockServer::start().await;
    mount_window(&mock_server, 0, 2, &["1", "2"]).await;
    Mock::given(method("GET"))
        .and(path("/efetch.fcgi"))
        .and(query_param("retstart", "2"))
        .respond_with(ResponseTemplate::new(400))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/efetch.fcgi"))
        .and(query_param("retstart", "4"))
        .respond_with(xml_response(efetch_response(&["5"])))
        .expect(0)
        .mount(&mock_server)
        .await;

    let client = create_mock_client(&mock_server);
    let items: Vec<_> = client
        .paginate(history_session(5))
        .with_batch_size(2)
        .into_payloads()
        .collect()
        .await;

    assert_eq!(items.len(), 2);
    let (window, payload) = items[0].as_ref().unwrap();
    assert_eq!(*window, BatchWindow { retstart: 0, retmax: 2 });
    assert!(payload.contains("<PMID Version=\"1\">1</PMID>"));
    assert!(matches!(
        items[1],
        Err(PubMedError::ApiError { status: 400, .. })
    ));
}

#[tokio::test]
#[traced_test]
async fn test_payload_stream_covers_every_window() {
    let mock_server = MockServer::start().await;
    mount_window(&mock_server, 0, 2, &["1", "2"]).await;
    mount_window(&mock_server, 2, 2, &["3", "4"]).await;
    mount_window(&mock_server, 4, 1, &["5"]).await;

    let client = create_mock_client(&mock_server);
    let windows: Vec<BatchWindow> = client
        .paginate(history_session(5))
        .with_batch_size(2)
        .into_payloads()
        .map(|item| item.unwrap().0)
        .collect()
        .await;

    assert_eq!(
        windows,
        vec![
            BatchWindow { retstart: 0, retmax: 2 },
            BatchWindow { retstart: 2, retmax: 2 },
            BatchWindow { retstart: 4, retmax: 1 },
        ]
    );
}

#[tokio::test]
#[traced_test]
async fn test_ill_formed_record_does_not_stop_harvest() {
    let mock_server = MockServer::start().await;
    mount_esearch(&mock_server, esearch_response(3, &["1", "2", "3"])).await;
    let payload = efetch_response(&["1", "2", "3"]).replacen(
        "<ArticleTitle>Article 2</ArticleTitle>",
        "<ArticleTitle>Article 2",
        1,
    );
    Mock::given(method("GET"))
        .and(path("/efetch.fcgi"))
        .respond_with(xml_response(payload))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = create_mock_client(&mock_server);
    let harvest = client
        .harvest("asthma[mh]", &SearchOptions::new())
        .await
        .unwrap();

    assert!(harvest.status.is_complete());
    let pmids: Vec<&str> = harvest.citations.iter().map(|c| c.pmid.as_str()).collect();
    assert_eq!(pmids, vec!["1", "3"]);
    assert_eq!(harvest.diagnostics.len(), 1);
    assert_eq!(harvest.diagnostics[0].pmid.as_deref(), Some("2"));
}

#[tokio::test]
#[traced_test]
async fn test_citations_stream_flattens_batches() {
    let mock_server = MockServer::start().await;
    mount_window(&mock_server, 0, 500, &["10", "11"]).await;
    mount_window(&mock_server, 500, 1, &["12"]).await;

    let client = create_mock_client(&mock_server);
    let session = history_session(501);

    let pmids: Vec<String> = client
        .citations(session)
        .map(|citation| citation.unwrap().pmid)
        .collect()
        .await;
    assert_eq!(pmids, vec!["10", "11", "12"]);
}
