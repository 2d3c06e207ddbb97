// tests/providers_http.rs
//! HTTP providers against a local mock server.
use chrono::NaiveDate;
use newsrank::article::{CanonicalArticle, RankedArticle};
use newsrank::embed::OpenAiEmbedder;
use newsrank::ingest::providers::gdelt::GdeltProvider;
use newsrank::ingest::providers::newsapi::NewsApiProvider;
use newsrank::ingest::providers::FetchWindow;
use newsrank::ingest::types::SourceProvider;
use newsrank::summarize::{GeminiSummarizer, Summarizer, DEFAULT_SUMMARY};
use newsrank::{EmbeddingError, EmbeddingProvider};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn window() -> FetchWindow {
    FetchWindow {
        from: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
        to: NaiveDate::from_ymd_opt(2025, 6, 7).unwrap(),
    }
}

fn terms(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("term {i}")).collect()
}

#[tokio::test]
async fn newsapi_sends_one_request_per_chunk() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/everything"))
        .and(query_param("apiKey", "k"))
        .and(query_param("language", "en"))
        .and(query_param("sortBy", "publishedAt"))
        .and(query_param("pageSize", "50"))
        .and(query_param("from", "2025-06-01"))
        .and(query_param("to", "2025-06-07"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "ok",
            "articles": [{
                "source": {"name": "Wired"},
                "title": "t",
                "url": "https://w/1",
                "publishedAt": "2025-06-02T00:00:00Z"
            }]
        })))
        .expect(3)
        .mount(&server)
        .await;

    let p = NewsApiProvider::new(format!("{}/v2/everything", server.uri()), "k", terms(13), window())
        .unwrap();
    let chunks = p.fetch_chunks().await;
    assert_eq!(chunks.len(), 3);
    assert!(chunks.iter().all(|c| c.as_ref().ok().map(|v| v.len()) == Some(1)));
}

#[tokio::test]
async fn newsapi_failed_chunk_is_skipped() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
        .mount(&server)
        .await;

    let p = NewsApiProvider::new(server.uri(), "k", terms(2), window()).unwrap();
    let chunks = p.fetch_chunks().await;
    assert_eq!(chunks.len(), 1);
    let err = chunks[0].as_ref().unwrap_err();
    assert!(err.to_string().contains("429"));
    assert!(p.fetch_latest().await.unwrap().is_empty());
}

#[tokio::test]
async fn gdelt_query_and_window_params() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(query_param("query", "(data OR \"data broker\")"))
        .and(query_param("mode", "ArtList"))
        .and(query_param("format", "json"))
        .and(query_param("maxrecords", "50"))
        .and(query_param("startdatetime", "20250601000000"))
        .and(query_param("enddatetime", "20250607235959"))
        .respond_with(ResponseTemplate::new(200).set_body_string(""))
        .expect(1)
        .mount(&server)
        .await;

    let p = GdeltProvider::new(server.uri(), vec!["data".into(), "data broker".into()], window())
        .unwrap();
    let recs = p.fetch_latest().await.unwrap();
    assert!(recs.is_empty());
}

#[tokio::test]
async fn openai_embedder_batches_and_reorders() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({"model": "m", "input": ["a", "b"]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                {"index": 1, "embedding": [0.0, 1.0]},
                {"index": 0, "embedding": [1.0, 0.0]}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .and(body_partial_json(json!({"input": ["c"]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"index": 0, "embedding": [0.5, 0.5]}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let e = OpenAiEmbedder::new(server.uri(), "sk-test", "m")
        .unwrap()
        .with_batch_size(2);
    let texts: Vec<String> = vec!["a".into(), "b".into(), "c".into()];
    let v = e.embed_batch(&texts).await.unwrap();
    assert_eq!(v, vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![0.5, 0.5]]);
}

#[tokio::test]
async fn openai_embedder_surfaces_http_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
        .mount(&server)
        .await;

    let e = OpenAiEmbedder::new(server.uri(), "sk-test", "m").unwrap();
    let err = e.embed_batch(&["x".to_string()]).await.unwrap_err();
    assert!(matches!(err, EmbeddingError::Status { status: 401, .. }));
}

#[tokio::test]
async fn openai_embedder_rejects_short_responses() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
        .mount(&server)
        .await;

    let e = OpenAiEmbedder::new(server.uri(), "sk-test", "m").unwrap();
    let err = e.embed_batch(&["x".to_string()]).await.unwrap_err();
    assert!(matches!(err, EmbeddingError::Decode(_)));
}

fn ranked() -> RankedArticle {
    let article = CanonicalArticle {
        source: "Wired".into(),
        title: "Data deals".into(),
        url: "https://w/1".into(),
        ..Default::default()
    };
    RankedArticle {
        combined_text: article.combined_text(),
        article,
        relevance_score: 0.9,
    }
}

#[tokio::test]
async fn gemini_summary_is_trimmed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/models/gemini-2.0-flash:generateContent"))
        .and(query_param("key", "g"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{"content": {"parts": [{"text": "  Three points.\n"}]}}]
        })))
        .mount(&server)
        .await;

    let s = GeminiSummarizer::new(server.uri(), "g", "gemini-2.0-flash").unwrap();
    assert_eq!(s.summarize(&ranked()).await, "Three points.");
}

#[tokio::test]
async fn gemini_failure_falls_back_to_default() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let s = GeminiSummarizer::new(server.uri(), "g", "gemini-2.0-flash").unwrap();
    assert_eq!(s.summarize(&ranked()).await, DEFAULT_SUMMARY);
}

#[tokio::test]
async fn gemini_empty_candidates_fall_back_to_default() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"candidates": []})))
        .mount(&server)
        .await;

    let s = GeminiSummarizer::new(server.uri(), "g", "gemini-2.0-flash").unwrap();
    assert_eq!(s.summarize(&ranked()).await, DEFAULT_SUMMARY);
}
