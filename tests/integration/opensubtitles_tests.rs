/*!
 * OpenSubtitles adapter against a fake upstream
 */

use std::collections::HashMap;

use axum::extract::Query;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};

use subgate::errors::ProviderError;
use subgate::models::{DownloadRequest, SearchRequest};
use subgate::providers::SubtitleProvider;
use subgate::providers::opensubtitles::OpenSubtitles;
use url::Url;

use crate::common::{CallCounter, FakeUpstream, fixtures, init_logging, test_client};

fn adapter(upstream: &FakeUpstream) -> OpenSubtitles {
    OpenSubtitles::new(test_client(), "secret").with_endpoint(&upstream.base_url)
}

fn error_route(status: StatusCode, body: &'static str) -> Router {
    Router::new().route("/subtitles", get(move || async move { (status, body) }))
}

#[tokio::test]
async fn test_search_withValidKey_shouldForwardParamsAndNormalize() {
    init_logging();
    let calls = CallCounter::default();
    let counter = calls.clone();
    let router = Router::new().route(
        "/subtitles",
        get(move |headers: HeaderMap, Query(params): Query<HashMap<String, String>>| {
            let counter = counter.clone();
            async move {
                counter.hit();
                assert_eq!(headers.get("api-key").unwrap(), "secret");
                assert_eq!(params.get("imdb_id").map(String::as_str), Some("133093"));
                assert_eq!(params.get("languages").map(String::as_str), Some("en,es"));
                assert!(!params.contains_key("year"));
                assert!(!params.contains_key("season_number"));
                Json(fixtures::opensubtitles_search())
            }
        }),
    );
    let upstream = FakeUpstream::spawn(router).await;

    let request = SearchRequest {
        imdb_id: Some("133093".to_string()),
        languages: "en,es".to_string(),
        ..Default::default()
    };
    let result = adapter(&upstream).search(&request).await.unwrap();

    assert_eq!(calls.count(), 1);
    assert_eq!(result.data.len(), 1);
    assert_eq!(result.total_count, 2);

    let attributes = &result.data[0].attributes;
    assert_eq!(attributes.provider, "opensubtitles");
    assert_eq!(attributes.uploader.name, "neo");
    assert_eq!(attributes.feature_details.tmdb_id, Some(603));
    assert_eq!(attributes.files[0].file_id, 123);
}

#[tokio::test]
async fn test_search_withUnauthorized_shouldReturnAuthenticationError() {
    let upstream = FakeUpstream::spawn(error_route(StatusCode::UNAUTHORIZED, "{\"message\":\"bad key\"}")).await;
    let error = adapter(&upstream).search(&SearchRequest::default()).await.unwrap_err();
    assert!(matches!(error, ProviderError::Authentication(_)));
    assert_eq!(error.status_code(), 401);
}

#[tokio::test]
async fn test_search_withTooManyRequests_shouldReturnRateLimitWithResetTime() {
    let body = r#"{"message":"You have downloaded your allowed 5 subtitles","reset_time_utc":"2024-05-01T00:00:00.000Z"}"#;
    let upstream = FakeUpstream::spawn(error_route(StatusCode::TOO_MANY_REQUESTS, body)).await;

    let error = adapter(&upstream).search(&SearchRequest::default()).await.unwrap_err();
    match error {
        ProviderError::RateLimited { message, reset_time } => {
            assert!(message.contains("allowed 5 subtitles"));
            assert_eq!(reset_time.as_deref(), Some("2024-05-01T00:00:00.000Z"));
        }
        other => panic!("Expected rate limit error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_search_withServerError_shouldCarryUpstreamBody() {
    let upstream = FakeUpstream::spawn(error_route(StatusCode::BAD_GATEWAY, "maintenance window")).await;
    let error = adapter(&upstream).search(&SearchRequest::default()).await.unwrap_err();
    match error {
        ProviderError::Upstream { status_code, message } => {
            assert_eq!(status_code, 502);
            assert!(message.contains("maintenance window"));
        }
        other => panic!("Expected upstream error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_search_withUnreachableHost_shouldReturnConnectivityError() {
    let adapter = OpenSubtitles::new(test_client(), "secret").with_endpoint("http://127.0.0.1:9");
    let error = adapter.search(&SearchRequest::default()).await.unwrap_err();
    assert!(matches!(error, ProviderError::Connectivity(_)));
    assert_eq!(error.status_code(), 503);
}

#[tokio::test]
async fn test_download_withFileId_shouldPostBodyAndReturnTelemetry() {
    let router = Router::new().route(
        "/download",
        post(|Json(body): Json<Value>| async move {
            assert_eq!(body["file_id"], 123);
            assert_eq!(body["sub_format"], "srt");
            Json(json!({
                "link": "https://www.opensubtitles.com/download/abc/matrix.srt",
                "file_name": "matrix.srt",
                "requests": 3,
                "remaining": 97,
                "message": "Your quota will be renewed in 23 hours",
                "reset_time": "23 hours",
                "reset_time_utc": "2024-05-01T00:00:00.000Z"
            }))
        }),
    );
    let upstream = FakeUpstream::spawn(router).await;

    let request = DownloadRequest {
        file_id: Some(123),
        sub_format: Some("srt".to_string()),
        ..Default::default()
    };
    let result = adapter(&upstream).download(&request).await.unwrap();

    assert_eq!(result.file_name, "matrix.srt");
    assert_eq!(result.remaining, 97);
    assert_eq!(result.reset_time, "23 hours");
    assert!(result.content.is_none());
}

#[tokio::test]
async fn test_download_withoutFileId_shouldFailValidation() {
    let adapter = OpenSubtitles::new(test_client(), "secret").with_endpoint("http://127.0.0.1:9");
    let error = adapter.download(&DownloadRequest::default()).await.unwrap_err();
    assert!(matches!(error, ProviderError::Validation(_)));
}

#[tokio::test]
async fn test_searchThenDownload_withFirstFile_shouldResolveAbsoluteLink() {
    let router = Router::new()
        .route("/subtitles", get(|| async { Json(fixtures::opensubtitles_search()) }))
        .route(
            "/download",
            post(|Json(body): Json<Value>| async move {
                let file_id = body["file_id"].as_i64().unwrap_or_default();
                Json(json!({
                    "link": format!("https://www.opensubtitles.com/download/{}/matrix.srt", file_id),
                    "file_name": "matrix.srt",
                    "remaining": 99
                }))
            }),
        );
    let upstream = FakeUpstream::spawn(router).await;
    let adapter = adapter(&upstream);

    let result = adapter.search(&SearchRequest::default()).await.unwrap();
    let request = DownloadRequest {
        file_id: Some(result.data[0].attributes.files[0].file_id),
        ..Default::default()
    };
    let download = adapter.download(&request).await.unwrap();

    assert!(Url::parse(&download.link).is_ok());
    assert!(download.link.contains("/123/"));
}

#[tokio::test]
async fn test_languagesAndFormats_shouldReturnInfoListings() {
    let router = Router::new()
        .route(
            "/infos/languages",
            get(|headers: HeaderMap| async move {
                assert_eq!(headers.get("api-key").unwrap(), "secret");
                Json(json!({"data": [{"language_code": "en", "language_name": "English"}]}))
            }),
        )
        .route("/infos/formats", get(|| async { Json(json!({"data": {"output_formats": ["srt", "vtt"]}})) }));
    let upstream = FakeUpstream::spawn(router).await;
    let adapter = adapter(&upstream);

    let languages = adapter.languages().await.unwrap();
    assert_eq!(languages["data"][0]["language_code"], "en");

    let formats = adapter.formats().await.unwrap();
    assert_eq!(formats["data"]["output_formats"][1], "vtt");
}
