//! Output formats served over HTTP.

use std::time::{Duration, Instant};

use reqwest::StatusCode;

mod common;

use common::{start_server, test_config, FixedPtr, SilentPtr};

#[tokio::test]
async fn test_json_for_direct_peer() {
    let server = start_server(test_config(), FixedPtr("localhost.")).await;

    let res = reqwest::get(server.url("/json")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.headers().contains_key("x-request-id"));
    assert_eq!(res.headers()["access-control-allow-origin"], "*");

    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["ip_address"], "127.0.0.1");
    assert_eq!(body["hostname"], "localhost");
    assert_eq!(body["location"], "Unknown");
    assert_eq!(body["country_code"], "XX");

    server.stop().await;
}

#[tokio::test]
async fn test_yaml_and_xml() {
    let server = start_server(test_config(), FixedPtr("edge.example.org.")).await;
    let client = reqwest::Client::new();

    let res = client
        .post(server.url("/yaml"))
        .header("X-Forwarded-For", "198.51.100.20")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()["content-type"], "text/yaml");
    let body = res.text().await.unwrap();
    assert!(body.contains("ip_address: 198.51.100.20"));
    assert!(body.contains("hostname: edge.example.org"));

    let res = client
        .get(server.url("/xml"))
        .header("X-Forwarded-For", "2001:db8::5")
        .send()
        .await
        .unwrap();
    assert_eq!(res.headers()["content-type"], "application/xml");
    let body = res.text().await.unwrap();
    assert!(body.contains("<address>2001:db8::5</address>"));
    assert!(body.contains("<ipv6>true</ipv6>"));

    server.stop().await;
}

#[tokio::test]
async fn test_preflight_answered_without_body() {
    let server = start_server(test_config(), FixedPtr("localhost.")).await;

    let res = reqwest::Client::new()
        .request(reqwest::Method::OPTIONS, server.url("/json"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()["access-control-allow-methods"], "GET, OPTIONS");
    assert!(res.text().await.unwrap().is_empty());

    server.stop().await;
}

#[tokio::test]
async fn test_slow_dns_falls_back_to_address() {
    let server = start_server(test_config(), SilentPtr).await;

    let started = Instant::now();
    let body: serde_json::Value = reqwest::get(server.url("/json"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["hostname"], "127.0.0.1");
    assert!(started.elapsed() < Duration::from_secs(2));

    server.stop().await;
}

#[tokio::test]
async fn test_headers_echo() {
    let server = start_server(test_config(), FixedPtr("localhost.")).await;

    let body = reqwest::Client::new()
        .get(server.url("/headers"))
        .header("X-Forwarded-For", "192.0.2.1")
        .header("Authorization", "Bearer hunter2")
        .header("X-Custom-Thing", "yes")
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();

    assert!(body.contains("X-Custom-Thing: yes\n"));
    assert!(!body.contains("hunter2"));
    assert!(!body.contains("192.0.2.1"));

    server.stop().await;
}

#[tokio::test]
async fn test_unknown_path_not_found() {
    let server = start_server(test_config(), FixedPtr("localhost.")).await;
    let res = reqwest::get(server.url("/nope")).await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    server.stop().await;
}
