//! Exporter wiring: config -> reporters -> `/metrics` body.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use axum::extract::State;
use axum::http::{header, StatusCode};
use tagmetrics_core::{Reporter, Tags};
use tagmetrics_reporters::{app_state::AppState, config, ops};

async fn scrape(state: &AppState) -> String {
    let resp = ops::metrics(State(state.clone())).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers()[header::CONTENT_TYPE],
        "text/plain; version=0.0.4; charset=utf-8"
    );
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(body.to_vec()).unwrap()
}

fn state(yaml: &str) -> AppState {
    AppState::new(config::load_from_str(yaml).unwrap()).unwrap()
}

#[tokio::test]
async fn scrape_serves_rendered_text() {
    let state = state(
        r#"
version: 1
prometheus:
  prefix: "app_"
statsd:
  socket: { host: "127.0.0.1", port: 9 }
"#,
    );
    assert_eq!(state.reporters().len(), 2);

    let tags = Tags::from([("route", "/users")]);
    for r in state.reporters() {
        r.incr("requests", &tags);
    }

    let expected = "# HELP app_requests Counter metric\n\
                    # TYPE app_requests counter\n\
                    app_requests_total{route=\"/users\"} 1\n";
    assert_eq!(scrape(&state).await, expected);
    // scraping adds nothing to the store
    assert_eq!(scrape(&state).await, expected);
    assert_eq!(state.prometheus().len(), 1);
    state.close();
}

#[tokio::test]
async fn repeated_scrapes_at_hard_limit_keep_user_series() {
    let state = state("version: 1\nprometheus: { hard_limit: 2 }\n");
    let prometheus = state.prometheus();
    prometheus.incr("a", &Tags::new());
    prometheus.incr("b", &Tags::new());

    let first = scrape(&state).await;
    let second = scrape(&state).await;
    assert!(first.contains("a_total 1\n"));
    assert!(first.contains("b_total 1\n"));
    assert_eq!(first, second);
}

#[tokio::test]
async fn scrape_after_soft_limit_drain_is_empty() {
    let state = state("version: 1\nprometheus: { soft_limit: 2 }\n");
    let prometheus = state.prometheus();
    for name in ["m1", "m2", "m3"] {
        prometheus.incr(name, &Tags::new());
    }

    let first = scrape(&state).await;
    assert!(first.contains("m3_total 1\n"));
    assert_eq!(scrape(&state).await, "");
}
