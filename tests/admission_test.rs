//! Admission control over real connections.

use reqwest::StatusCode;

mod common;

use common::{start_server, test_config, FixedPtr};

#[tokio::test]
async fn test_eleventh_request_rejected() {
    let server = start_server(test_config(), FixedPtr("localhost.")).await;
    let client = reqwest::Client::new();

    for i in 0..10 {
        let res = client.get(server.url("/text")).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::OK, "request {} should pass", i + 1);
        assert_eq!(res.text().await.unwrap(), "127.0.0.1\n");
    }

    let res = client.get(server.url("/text")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(
        res.text().await.unwrap(),
        "Rate limit exceeded. Please try again later."
    );

    server.stop().await;
}

#[tokio::test]
async fn test_forwarded_clients_limited_separately() {
    let server = start_server(test_config(), FixedPtr("localhost.")).await;
    let client = reqwest::Client::new();

    for _ in 0..10 {
        let res = client
            .get(server.url("/json"))
            .header("X-Forwarded-For", "203.0.113.10")
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }
    let res = client
        .get(server.url("/json"))
        .header("X-Forwarded-For", "203.0.113.10, 10.0.0.1")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);

    // A different forwarded address and the direct peer are unaffected.
    let res = client
        .get(server.url("/json"))
        .header("X-Forwarded-For", "203.0.113.11")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let res = client.get(server.url("/json")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    server.stop().await;
}

#[tokio::test]
async fn test_rejected_response_has_no_cors_headers() {
    let mut config = test_config();
    config.rate_limit.burst_size = 1;
    let server = start_server(config, FixedPtr("localhost.")).await;
    let client = reqwest::Client::new();

    assert_eq!(
        client.get(server.url("/text")).send().await.unwrap().status(),
        StatusCode::OK
    );
    let res = client.get(server.url("/text")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(res.headers().get("access-control-allow-origin").is_none());

    server.stop().await;
}
