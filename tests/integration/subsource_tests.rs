/*!
 * SubSource adapter against a fake upstream
 */

use std::sync::{Arc, Mutex};

use axum::routing::post;
use axum::{Json, Router};
use serde_json::{Value, json};

use subgate::errors::ProviderError;
use subgate::models::{DownloadRequest, MediaType, SearchRequest};
use subgate::providers::SubtitleProvider;
use subgate::providers::subsource::SubSource;
use url::Url;

use crate::common::{CallCounter, FakeUpstream, fixtures, init_logging, test_client};

/// Fake SubSource API recording which actions were called
#[derive(Clone, Default)]
struct Calls {
    search_movie: CallCounter,
    get_movie: CallCounter,
    get_sub: CallCounter,
    movie_body: Arc<Mutex<Option<Value>>>,
}

impl Calls {
    fn movie_body(&self) -> Value {
        self.movie_body.lock().unwrap().clone().unwrap_or(Value::Null)
    }
}

fn subsource_router(calls: Calls, found: Value) -> Router {
    let search_calls = calls.search_movie.clone();
    let movie_calls = calls.clone();
    let sub_calls = calls.get_sub.clone();

    Router::new()
        .route(
            "/searchMovie",
            post(move |Json(body): Json<Value>| {
                let counter = search_calls.clone();
                let found = found.clone();
                async move {
                    counter.hit();
                    assert!(body["query"].as_str().is_some_and(|q| q.starts_with("tt")));
                    Json(json!({ "found": found }))
                }
            }),
        )
        .route(
            "/getMovie",
            post(move |Json(body): Json<Value>| {
                let calls = movie_calls.clone();
                async move {
                    calls.get_movie.hit();
                    *calls.movie_body.lock().unwrap() = Some(body);
                    Json(fixtures::subsource_movie())
                }
            }),
        )
        .route(
            "/getSub",
            post(move |Json(body): Json<Value>| {
                let counter = sub_calls.clone();
                async move {
                    counter.hit();
                    assert_eq!(body, json!({"movie": "the-matrix", "lang": "english", "id": "501"}));
                    Json(json!({ "sub": { "downloadToken": "TOKEN42" } }))
                }
            }),
        )
}

fn matrix_request() -> SearchRequest {
    SearchRequest {
        imdb_id: Some("tt0133093".to_string()),
        media_type: Some(MediaType::Movie),
        languages: "en,es".to_string(),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_search_withNothingFound_shouldSkipGetMovie() {
    init_logging();
    let calls = Calls::default();
    let upstream = FakeUpstream::spawn(subsource_router(calls.clone(), json!([]))).await;
    let adapter = SubSource::new(test_client()).with_endpoint(&upstream.base_url);

    let result = adapter.search(&matrix_request()).await.unwrap();

    assert!(result.data.is_empty());
    assert_eq!(result.total_count, 0);
    assert_eq!(calls.search_movie.count(), 1);
    assert_eq!(calls.get_movie.count(), 0);
}

#[tokio::test]
async fn test_search_withMatch_shouldChainCallsAndMapSubs() {
    let calls = Calls::default();
    let found = json!([{ "linkName": "the-matrix", "title": "The Matrix" }]);
    let upstream = FakeUpstream::spawn(subsource_router(calls.clone(), found)).await;
    let adapter = SubSource::new(test_client()).with_endpoint(&upstream.base_url);

    let result = adapter.search(&matrix_request()).await.unwrap();

    assert_eq!(calls.search_movie.count(), 1);
    assert_eq!(calls.get_movie.count(), 1);
    let body = calls.movie_body();
    assert_eq!(body["movieName"], "the-matrix");
    assert_eq!(body["langs"], json!(["en", "es"]));
    assert!(body.get("season").is_none());
    assert_eq!(result.total_count, 2);
    assert_eq!(result.total_pages, 1);

    let english = &result.data[0];
    assert_eq!(english.id, "501");
    assert_eq!(english.attributes.language, "english");
    assert!(!english.attributes.hearing_impaired);
    assert_eq!(english.attributes.ratings, 9.0);
    assert_eq!(english.attributes.url, "/subtitle/the-matrix/english/501");

    let spanish = &result.data[1];
    assert_eq!(spanish.attributes.language, "es-419");
    assert!(spanish.attributes.hearing_impaired);
    assert_eq!(spanish.attributes.ratings, 7.5);
}

#[tokio::test]
async fn test_search_withSeasonOnly_shouldSendSeasonKey() {
    let calls = Calls::default();
    let found = json!([{ "linkName": "the-office", "title": "The Office" }]);
    let upstream = FakeUpstream::spawn(subsource_router(calls.clone(), found)).await;
    let adapter = SubSource::new(test_client()).with_endpoint(&upstream.base_url);

    let request = SearchRequest {
        imdb_id: Some("tt0386676".to_string()),
        season_number: Some(2),
        ..Default::default()
    };
    adapter.search(&request).await.unwrap();

    let body = calls.movie_body();
    assert_eq!(body["movieName"], "the-office");
    assert_eq!(body["season"], "season-2");
    assert_eq!(body["langs"], json!(["en"]));
}

#[tokio::test]
async fn test_searchThenDownload_withFirstResult_shouldResolveAbsoluteLink() {
    let calls = Calls::default();
    let found = json!([{ "linkName": "the-matrix", "title": "The Matrix" }]);
    let upstream = FakeUpstream::spawn(subsource_router(calls.clone(), found)).await;
    let adapter = SubSource::new(test_client()).with_endpoint(&upstream.base_url);

    let result = adapter.search(&matrix_request()).await.unwrap();
    let request = DownloadRequest {
        url: Some(result.data[0].attributes.url.clone()),
        ..Default::default()
    };
    let download = adapter.download(&request).await.unwrap();

    assert!(Url::parse(&download.link).is_ok());
    assert_eq!(calls.get_sub.count(), 1);
}

#[tokio::test]
async fn test_search_withoutTerm_shouldNotCallUpstream() {
    let calls = Calls::default();
    let upstream = FakeUpstream::spawn(subsource_router(calls.clone(), json!([]))).await;
    let adapter = SubSource::new(test_client()).with_endpoint(&upstream.base_url);

    let result = adapter.search(&SearchRequest::default()).await.unwrap();

    assert!(result.data.is_empty());
    assert_eq!(calls.search_movie.count(), 0);
}

#[tokio::test]
async fn test_download_withSubtitleLink_shouldExchangeToken() {
    let calls = Calls::default();
    let upstream = FakeUpstream::spawn(subsource_router(calls.clone(), json!([]))).await;
    let adapter = SubSource::new(test_client()).with_endpoint(&upstream.base_url);

    let request = DownloadRequest {
        url: Some("/subtitle/the-matrix/english/501".to_string()),
        ..Default::default()
    };
    let result = adapter.download(&request).await.unwrap();

    assert_eq!(calls.get_sub.count(), 1);
    assert_eq!(result.link, upstream.url("/downloadSub/TOKEN42"));
    assert_eq!(result.file_name, "the-matrix_english.srt");
}

#[tokio::test]
async fn test_download_withMalformedLink_shouldFailValidationWithoutCalls() {
    let calls = Calls::default();
    let upstream = FakeUpstream::spawn(subsource_router(calls.clone(), json!([]))).await;
    let adapter = SubSource::new(test_client()).with_endpoint(&upstream.base_url);

    let request = DownloadRequest {
        url: Some("/the-matrix".to_string()),
        ..Default::default()
    };
    let error = adapter.download(&request).await.unwrap_err();

    assert!(matches!(error, ProviderError::Validation(_)));
    assert_eq!(calls.get_sub.count(), 0);
}
