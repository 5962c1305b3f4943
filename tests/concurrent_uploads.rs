//! Concurrent requests each get their own transient file and their own
//! downstream call.

use std::collections::HashSet;
use std::sync::Arc;

use serde_json::{json, Value};
use tokio::sync::Barrier;

mod common;
use common::{client, image_form, relay_config, start_relay, PNG_BYTES};

#[tokio::test]
async fn test_same_image_twice_is_two_independent_relays() {
    let dir = tempfile::tempdir().unwrap();
    let staging = dir.path().to_path_buf();

    // Both calls must be in flight together before either is answered, so
    // each one can observe the other's staged file.
    let barrier = Arc::new(Barrier::new(2));
    let downstream = common::start_programmable_downstream(move |_| {
        let barrier = barrier.clone();
        let staging = staging.clone();
        async move {
            barrier.wait().await;
            let staged = common::staged_files(&staging).len();
            (200, json!({ "staged": staged }).to_string())
        }
    })
    .await;

    let relay = start_relay(relay_config(&downstream.url, dir.path())).await;
    let client = client();

    let send = |id: &'static str| {
        client
            .post(relay.endpoint())
            .header("x-request-id", id)
            .multipart(image_form(PNG_BYTES, "face.png", "image/png"))
            .send()
    };
    let (a, b) = tokio::join!(send("req-a"), send("req-b"));

    for res in [a.unwrap(), b.unwrap()] {
        assert_eq!(res.status(), 200);
        let body: Value = res.json().await.unwrap();
        assert_eq!(body, json!({"staged": 2}));
    }

    assert_eq!(downstream.recorder.calls(), 2);
    let ids: HashSet<_> = downstream
        .recorder
        .images()
        .into_iter()
        .filter_map(|image| image.request_id)
        .collect();
    assert_eq!(ids, HashSet::from(["req-a".to_string(), "req-b".to_string()]));
    assert!(relay.staged_files().is_empty());
}

#[tokio::test]
async fn test_burst_of_uploads_leaves_nothing_behind() {
    let downstream = common::start_fixed_downstream(200, r#"{"result":"ok"}"#).await;
    let dir = tempfile::tempdir().unwrap();
    let relay = Arc::new(start_relay(relay_config(&downstream.url, dir.path())).await);

    let concurrency = 20;
    let mut handles = Vec::with_capacity(concurrency);
    for _ in 0..concurrency {
        let relay = relay.clone();
        handles.push(tokio::spawn(async move {
            client()
                .post(relay.endpoint())
                .multipart(image_form(PNG_BYTES, "face.png", "image/png"))
                .send()
                .await
                .map(|res| res.status().as_u16())
        }));
    }

    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap(), 200);
    }

    assert_eq!(downstream.recorder.calls(), concurrency);
    assert!(relay.staged_files().is_empty());
}
