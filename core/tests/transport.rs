//! Retry, classification and wire behaviour of `Transport` over real HTTP.
//!
//! A small axum app counts hits per route so retry budgets can be asserted
//! exactly. Backoff is shortened to a millisecond.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::sync::atomic::{AtomicUsize, Ordering::SeqCst};
use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};

use cars_core::envelope::INVALID_JSON;
use cars_core::{ApiError, ErrorKind, Headers, HttpMethod, HttpRequest, ResponseEnvelope, Transport, TransportConfig};

#[derive(Default)]
struct Hits {
    flaky: AtomicUsize,
    flaky_post: AtomicUsize,
    bad: AtomicUsize,
    limited: AtomicUsize,
    recover: AtomicUsize,
}

type Reply = (StatusCode, Json<Value>);

fn router(hits: Arc<Hits>) -> Router {
    Router::new()
        .route(
            "/flaky",
            get(|State(h): State<Arc<Hits>>| async move {
                h.flaky.fetch_add(1, SeqCst);
                (StatusCode::SERVICE_UNAVAILABLE, Json(json!({"successful": false})))
            })
            .post(|State(h): State<Arc<Hits>>| async move {
                h.flaky_post.fetch_add(1, SeqCst);
                (StatusCode::SERVICE_UNAVAILABLE, Json(json!({"successful": false})))
            }),
        )
        .route(
            "/bad",
            get(|State(h): State<Arc<Hits>>| async move {
                h.bad.fetch_add(1, SeqCst);
                (StatusCode::BAD_REQUEST, Json(json!({"successful": false, "reason": "bad"})))
            }),
        )
        .route(
            "/limited",
            get(|State(h): State<Arc<Hits>>| async move {
                h.limited.fetch_add(1, SeqCst);
                (StatusCode::TOO_MANY_REQUESTS, Json(json!({"successful": false})))
            }),
        )
        .route(
            "/recover",
            get(|State(h): State<Arc<Hits>>| async move {
                let reply: Reply = if h.recover.fetch_add(1, SeqCst) < 2 {
                    (StatusCode::BAD_GATEWAY, Json(json!({"successful": false})))
                } else {
                    (StatusCode::OK, Json(json!({"successful": true})))
                };
                reply
            }),
        )
        .route("/html", get(|| async { "<html>maintenance</html>" }))
        .route(
            "/auth",
            get(|| async { (StatusCode::UNAUTHORIZED, Json(json!({"successful": false}))) }),
        )
        .route(
            "/forbidden",
            get(|| async { (StatusCode::FORBIDDEN, Json(json!({"successful": false}))) }),
        )
        .route(
            "/echo",
            get(|headers: HeaderMap, Query(query): Query<HashMap<String, String>>| async move {
                Json(json!({
                    "authorization": header(&headers, "authorization"),
                    "query": query,
                }))
            })
            .post(|headers: HeaderMap, body: Bytes| async move {
                Json(json!({
                    "content_type": header(&headers, "content-type"),
                    "body": String::from_utf8_lossy(&body),
                }))
            }),
        )
        .with_state(hits)
}

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers.get(name).and_then(|v| v.to_str().ok()).map(str::to_string)
}

fn spawn_server() -> (String, Arc<Hits>) {
    let hits = Arc::new(Hits::default());
    let app = router(hits.clone());

    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            axum::serve(listener, app).await
        })
    });

    (format!("http://{addr}"), hits)
}

fn transport() -> Transport {
    let mut config = TransportConfig::default();
    config.retry.backoff_base = Duration::from_millis(1);
    Transport::new(&config)
}

fn get_request(url: String) -> HttpRequest {
    HttpRequest::new(HttpMethod::Get, url, &Headers::new())
}

#[test]
fn server_errors_use_the_whole_retry_budget() {
    let (base, hits) = spawn_server();
    let (response, error) = transport().request(&get_request(format!("{base}/flaky")));

    assert_eq!(hits.flaky.load(SeqCst), 3);
    assert_eq!(response.unwrap().status, 503);
    let error = error.unwrap();
    assert_eq!(error.kind(), ErrorKind::RequestFailure);
    assert_eq!(error.status(), Some(503));
}

#[test]
fn transient_failures_recover_within_budget() {
    let (base, hits) = spawn_server();
    let body = transport().request_json(&get_request(format!("{base}/recover"))).unwrap();

    assert_eq!(body["successful"], true);
    assert_eq!(hits.recover.load(SeqCst), 3);
}

#[test]
fn client_errors_are_not_retried() {
    let (base, hits) = spawn_server();
    let url = format!("{base}/bad");
    let err = transport().send(&get_request(url.clone())).unwrap_err();

    assert_eq!(hits.bad.load(SeqCst), 1);
    match err {
        ApiError::Request { message, status, body } => {
            assert_eq!(message, format!("Request failed for GET {url}"));
            assert_eq!(status, Some(400));
            assert_eq!(body.unwrap()["reason"], "bad");
        }
        other => panic!("expected request failure, got {other:?}"),
    }
}

#[test]
fn post_is_not_replayed_on_server_error() {
    let (base, hits) = spawn_server();
    let request = HttpRequest::new(HttpMethod::Post, format!("{base}/flaky"), &Headers::new())
        .with_body("{}".to_string());
    let err = transport().send(&request).unwrap_err();

    assert_eq!(hits.flaky_post.load(SeqCst), 1);
    assert_eq!(err.status(), Some(503));
}

#[test]
fn rate_limiting_is_retried_then_raised() {
    let (base, hits) = spawn_server();
    let err = transport().send(&get_request(format!("{base}/limited"))).unwrap_err();

    assert_eq!(hits.limited.load(SeqCst), 3);
    assert_eq!(err.kind(), ErrorKind::RateLimited);
}

#[test]
fn raising_path_classifies_statuses() {
    let (base, _) = spawn_server();
    let t = transport();

    let cases = [
        ("/auth", ErrorKind::AuthenticationFailure, 401),
        ("/forbidden", ErrorKind::AuthenticationFailure, 403),
        ("/nowhere", ErrorKind::NotFound, 404),
    ];
    for (path, kind, status) in cases {
        let err = t.request_json(&get_request(format!("{base}{path}"))).unwrap_err();
        assert_eq!(err.kind(), kind, "{path}");
        assert_eq!(err.status(), Some(status), "{path}");
    }
}

#[test]
fn non_json_body_is_reported_with_its_status() {
    let (base, _) = spawn_server();
    let url = format!("{base}/html");
    let t = transport();

    let (response, error) = t.request(&get_request(url.clone()));
    let envelope = ResponseEnvelope::format(&url, response, error);
    assert_eq!(envelope.error.as_deref(), Some(INVALID_JSON));
    assert_eq!(envelope.status_code, Some(200));
    assert!(envelope.response.is_none());

    let err = t.request_json(&get_request(url)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ValidationFailure);
}

/// Answers every connection with a body shorter than its `Content-Length`.
fn spawn_truncating_server() -> (String, Arc<AtomicUsize>) {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();

    std::thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(mut stream) = stream else { continue };
            counter.fetch_add(1, SeqCst);
            let mut head = Vec::new();
            let mut buf = [0u8; 1024];
            while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                match stream.read(&mut buf) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => head.extend_from_slice(&buf[..n]),
                }
            }
            let _ = stream.write_all(
                b"HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 200\r\n\r\n{\"successful\":tr",
            );
            let _ = stream.shutdown(std::net::Shutdown::Both);
        }
    });

    (format!("http://{addr}/cars"), hits)
}

#[test]
fn truncated_body_is_a_retried_connection_failure() {
    let (url, hits) = spawn_truncating_server();
    let (response, error) = transport().request(&get_request(url.clone()));

    assert_eq!(hits.load(SeqCst), 3);
    assert!(response.is_none());
    let error = error.unwrap();
    assert_eq!(error.kind(), ErrorKind::ConnectionFailure);

    let envelope = ResponseEnvelope::format(&url, None, Some(error));
    assert_eq!(envelope.status_code, None);
    assert_ne!(envelope.error.as_deref(), Some(INVALID_JSON));
}

#[test]
fn refused_connection_has_no_response() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!("http://{}/cars", listener.local_addr().unwrap());
    drop(listener);

    let (response, error) = transport().request(&get_request(url.clone()));
    assert!(response.is_none());
    let error = error.unwrap();
    assert!(error.is_connection());

    let envelope = ResponseEnvelope::format(&url, None, Some(error));
    assert_eq!(envelope.status_code, None);
    assert_eq!(envelope.kind, Some(ErrorKind::ConnectionFailure));
}

#[test]
fn headers_query_and_body_reach_the_server() {
    let (base, _) = spawn_server();
    let t = transport();
    let headers: Headers = vec![("Authorization".to_string(), "Basic cXhmMjpxeGYy".to_string())];

    let request = HttpRequest::new(HttpMethod::Get, format!("{base}/echo"), &headers)
        .with_query(vec![("car_name".to_string(), "Swift".to_string())]);
    let echoed = t.request_json(&request).unwrap();
    assert_eq!(echoed["authorization"], "Basic cXhmMjpxeGYy");
    assert_eq!(echoed["query"]["car_name"], "Swift");

    let request = HttpRequest::new(HttpMethod::Post, format!("{base}/echo"), &Headers::new())
        .with_body(r#"{"name":"figo"}"#.to_string());
    let echoed = t.request_json(&request).unwrap();
    assert_eq!(echoed["content_type"], "application/json");
    assert_eq!(echoed["body"], r#"{"name":"figo"}"#);
}

#[test]
fn expected_status_mismatch_is_unexpected() {
    let (base, _) = spawn_server();
    let request = get_request(format!("{base}/echo"));
    let response = transport().send(&request).unwrap();

    let err = Transport::handle_response(&request, response.clone(), Some(201)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unexpected);
    assert!(Transport::handle_response(&request, response, Some(200)).is_ok());
}

#[tokio::test]
async fn async_calls_match_sync_calls() {
    let (base, hits) = spawn_server();
    let t = transport();

    let sync_body = t.request_json(&get_request(format!("{base}/echo"))).unwrap();
    let async_body = t.request_json_async(get_request(format!("{base}/echo"))).await.unwrap();
    assert_eq!(sync_body, async_body);

    let err = t.send_async(get_request(format!("{base}/flaky"))).await.unwrap_err();
    assert_eq!(err.status(), Some(503));
    assert_eq!(hits.flaky.load(SeqCst), 3);

    let (response, error) = t.request_async(get_request(format!("{base}/auth"))).await;
    assert_eq!(response.unwrap().status, 401);
    assert_eq!(error.unwrap().kind(), ErrorKind::AuthenticationFailure);
}
