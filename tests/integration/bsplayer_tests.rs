/*!
 * BSPlayer adapter against a fake SOAP endpoint
 */

use std::sync::{Arc, Mutex};

use axum::Router;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use url::Url;

use subgate::errors::ProviderError;
use subgate::models::{DownloadRequest, SearchRequest};
use subgate::providers::SubtitleProvider;
use subgate::providers::bsplayer::BsPlayer;

use crate::common::{CallCounter, FakeUpstream, fixtures, init_logging, test_client};

/// Fake SOAP service dispatching on the SOAPAction header, also serving the download links
#[derive(Clone)]
struct SoapFake {
    login_result: &'static str,
    logins: CallCounter,
    searches: CallCounter,
    logouts: CallCounter,
    base_url: Arc<Mutex<String>>,
}

impl SoapFake {
    fn new(login_result: &'static str) -> Self {
        Self {
            login_result,
            logins: CallCounter::default(),
            searches: CallCounter::default(),
            logouts: CallCounter::default(),
            base_url: Arc::default(),
        }
    }

    fn answer(&self, headers: &HeaderMap, body: &str) -> Response {
        let action = headers
            .get("soapaction")
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .trim_matches('"')
            .to_string();

        let xml = if action.ends_with("#logIn") {
            self.logins.hit();
            assert!(body.contains("<AppID>BSPlayer v2.72</AppID>"));
            fixtures::bsplayer_login(self.login_result, "session-token")
        } else if action.ends_with("#searchSubtitles") {
            self.searches.hit();
            assert!(body.contains("<handle>session-token</handle>"));
            assert!(body.contains("<imdbId>0133093</imdbId>"));
            assert!(body.contains("<languageId>eng,spa</languageId>"));
            assert!(body.contains("<movieHash>0</movieHash>"));
            fixtures::bsplayer_search(&self.base_url.lock().unwrap())
        } else if action.ends_with("#logOut") {
            self.logouts.hit();
            assert!(body.contains("<handle>session-token</handle>"));
            String::new()
        } else {
            panic!("Unexpected SOAP action '{}'", action);
        };

        ([(header::CONTENT_TYPE, "text/xml; charset=utf-8")], xml).into_response()
    }

    /// Serve the fake and point its download links at itself
    async fn spawn(&self) -> FakeUpstream {
        let fake = self.clone();
        let router = Router::new()
            .route(
                "/v1.php",
                post(move |headers: HeaderMap, body: String| {
                    let fake = fake.clone();
                    async move { fake.answer(&headers, &body) }
                }),
            )
            .route("/dl/11.gz", get(|| async { "gzip bytes" }));

        let upstream = FakeUpstream::spawn(router).await;
        *self.base_url.lock().unwrap() = upstream.base_url.clone();
        upstream
    }
}

fn matrix_request() -> SearchRequest {
    SearchRequest {
        imdb_id: Some("tt0133093".to_string()),
        languages: "en,es".to_string(),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_search_twice_shouldOpenAndCloseOneSessionEach() {
    init_logging();
    let fake = SoapFake::new("200");
    let upstream = fake.spawn().await;
    let adapter = BsPlayer::new(test_client()).with_endpoint(upstream.url("/v1.php"));

    let first = adapter.search(&matrix_request()).await.unwrap();
    let second = adapter.search(&matrix_request()).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(fake.logins.count(), 2);
    assert_eq!(fake.searches.count(), 2);
    assert_eq!(fake.logouts.wait_for(2).await, 2);

    assert_eq!(first.data.len(), 2);
    assert_eq!(first.data[0].id, "11");
    assert_eq!(first.data[0].attributes.language, "en");
    assert_eq!(first.data[0].attributes.download_count, 7);
    assert_eq!(first.data[0].attributes.url, upstream.url("/dl/11.gz"));
    assert_eq!(first.data[1].attributes.language, "fr");
    assert_eq!(first.data[1].attributes.ratings, 0.0);
}

#[tokio::test]
async fn test_searchThenDownload_withFirstResult_shouldResolveAbsoluteLink() {
    let fake = SoapFake::new("200");
    let upstream = fake.spawn().await;
    let adapter = BsPlayer::new(test_client()).with_endpoint(upstream.url("/v1.php"));

    let result = adapter.search(&matrix_request()).await.unwrap();
    let request = DownloadRequest {
        url: Some(result.data[0].attributes.url.clone()),
        ..Default::default()
    };
    let download = adapter.download(&request).await.unwrap();

    assert!(Url::parse(&download.link).is_ok());
    assert_eq!(download.file_name, "11.gz");
}

#[tokio::test]
async fn test_search_withRejectedLogin_shouldFailWithoutSearching() {
    let fake = SoapFake::new("401");
    let upstream = fake.spawn().await;
    let adapter = BsPlayer::new(test_client()).with_endpoint(upstream.url("/v1.php"));

    let error = adapter.search(&matrix_request()).await.unwrap_err();

    assert!(matches!(error, ProviderError::Authentication(_)));
    assert_eq!(fake.logins.count(), 1);
    assert_eq!(fake.searches.count(), 0);
    assert_eq!(fake.logouts.count(), 0);
}

#[tokio::test]
async fn test_login_withServerError_shouldReturnAuthenticationError() {
    let router = Router::new().route("/v1.php", post(|| async { StatusCode::INTERNAL_SERVER_ERROR }));
    let upstream = FakeUpstream::spawn(router).await;
    let adapter = BsPlayer::new(test_client()).with_endpoint(upstream.url("/v1.php"));

    let error = adapter.login().await.unwrap_err();
    assert!(matches!(error, ProviderError::Authentication(_)));
}

#[tokio::test]
async fn test_download_withReachableLink_shouldReturnLinkAndFileName() {
    let router = Router::new().route("/dl/501.gz", get(|| async { "gzip bytes" }));
    let upstream = FakeUpstream::spawn(router).await;
    let adapter = BsPlayer::new(test_client());

    let request = DownloadRequest {
        url: Some(upstream.url("/dl/501.gz")),
        ..Default::default()
    };
    let result = adapter.download(&request).await.unwrap();

    assert_eq!(result.link, upstream.url("/dl/501.gz"));
    assert_eq!(result.file_name, "501.gz");
    assert!(result.content.is_none());
}

#[tokio::test]
async fn test_download_withMissingFile_shouldReturnUpstreamError() {
    let upstream = FakeUpstream::spawn(Router::new()).await;
    let adapter = BsPlayer::new(test_client());

    let request = DownloadRequest {
        url: Some(upstream.url("/dl/404.gz")),
        ..Default::default()
    };
    let error = adapter.download(&request).await.unwrap_err();

    assert_eq!(error.status_code(), 500);
    assert!(matches!(error, ProviderError::Upstream { status_code: 404, .. }));
}
