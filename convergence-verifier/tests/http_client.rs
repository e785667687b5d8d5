// Copyright 2024 Wladimir Palant
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use axum::http::{header, StatusCode};
use axum::routing::get;
use axum::Router;
use convergence_verifier::{
    verify_site, ExpectedStatus, HttpGetter, ProbeError, ReqwestGetter, RetryBudget, SitePlan,
    Verifier, VerifyError,
};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use test_log::test;

const TIMEOUT: Duration = Duration::from_secs(5);
const HOME: &str = "<h1>Hello from index.html</h1>";
const ABOUT: &str = "<h1>About page index</h1>";

async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.ok();
    });
    format!("http://{addr}")
}

fn html(body: &'static str) -> ([(header::HeaderName, &'static str); 1], &'static str) {
    ([(header::CONTENT_TYPE, "text/html; charset=utf-8")], body)
}

#[test(tokio::test)]
async fn status_and_body() {
    let base = serve(
        Router::new()
            .route("/", get(|| async { html(HOME) }))
            .route("/gone", get(|| async { (StatusCode::NOT_FOUND, "gone") })),
    )
    .await;
    let getter = ReqwestGetter::new().unwrap();

    let result = getter.get(&format!("{base}/"), TIMEOUT).await.unwrap();
    assert_eq!(result.status, StatusCode::OK);
    assert_eq!(result.content_type(), "text/html; charset=utf-8");
    assert_eq!(result.body, HOME.as_bytes());

    let result = getter.get(&format!("{base}/gone"), TIMEOUT).await.unwrap();
    assert_eq!(result.status, StatusCode::NOT_FOUND);
    assert_eq!(result.body, "gone".as_bytes());
}

#[test(tokio::test)]
async fn redirects_not_followed() {
    let base = serve(
        Router::new()
            .route("/", get(|| async { html(HOME) }))
            .route(
                "/about",
                get(|| async { (StatusCode::MOVED_PERMANENTLY, [(header::LOCATION, "/")]) }),
            ),
    )
    .await;
    let getter = ReqwestGetter::new().unwrap();

    let result = getter.get(&format!("{base}/about"), TIMEOUT).await.unwrap();
    assert_eq!(result.status, StatusCode::MOVED_PERMANENTLY);
    assert_eq!(
        result
            .headers
            .get(header::LOCATION)
            .and_then(|value| value.to_str().ok()),
        Some("/")
    );
}

#[test(tokio::test)]
async fn connection_refused() {
    let port = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();
    let getter = ReqwestGetter::new().unwrap();

    let result = getter.get(&format!("http://127.0.0.1:{port}/"), TIMEOUT).await;
    assert!(matches!(result, Err(ProbeError::Transport(_))));
}

#[test(tokio::test)]
async fn converges_after_retries() {
    let requests = Arc::new(AtomicU32::new(0));
    let counter = requests.clone();
    let base = serve(Router::new().route(
        "/",
        get(move || {
            let counter = counter.clone();
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    (StatusCode::FORBIDDEN, [(header::CONTENT_TYPE, "text/plain")], "")
                } else {
                    (StatusCode::OK, [(header::CONTENT_TYPE, "text/html")], HOME)
                }
            }
        }),
    ))
    .await;

    let verifier = Verifier::new(
        Arc::new(ReqwestGetter::new().unwrap()),
        RetryBudget::new(5, Duration::from_millis(20)).with_request_timeout(TIMEOUT),
    )
    .unwrap();
    let result = verifier
        .verify(&format!("{base}/"), &ExpectedStatus::ok())
        .await
        .unwrap();
    assert_eq!(result.body, HOME.as_bytes());
    assert_eq!(requests.load(Ordering::SeqCst), 3);
}

#[test(tokio::test)]
async fn never_converges() {
    let base = serve(Router::new()).await;
    let verifier = Verifier::new(
        Arc::new(ReqwestGetter::new().unwrap()),
        RetryBudget::new(3, Duration::from_millis(10)).with_request_timeout(TIMEOUT),
    )
    .unwrap();

    let err = verifier
        .verify(&format!("{base}/"), &ExpectedStatus::ok())
        .await
        .unwrap_err();
    assert!(matches!(err, VerifyError::BudgetExhausted { attempts: 3, .. }));
    assert_eq!(err.last_status(), Some(StatusCode::NOT_FOUND));
}

#[test(tokio::test)]
async fn whole_site() {
    let base = serve(
        Router::new()
            .route("/", get(|| async { html(HOME) }))
            .route("/index.html", get(|| async { html(HOME) }))
            .route("/about/", get(|| async { html(ABOUT) }))
            .route("/about", get(|| async { html(ABOUT) }))
            .route("/about/index.html", get(|| async { html(ABOUT) })),
    )
    .await;
    let verifier = Verifier::new(
        Arc::new(ReqwestGetter::new().unwrap()),
        RetryBudget::new(2, Duration::from_millis(10)).with_request_timeout(TIMEOUT),
    )
    .unwrap();

    let report = verify_site(&verifier, &base, &SitePlan::default()).await;
    assert_eq!(report.checked, 7);
    assert!(report.is_success(), "{:?}", report.failures);
}
