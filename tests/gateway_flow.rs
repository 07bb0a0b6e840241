//! End-to-end request flow through a live gateway.

mod common;

use api_gateway::config::AuthMode;
use api_gateway::error::ErrorBody;
use common::{
    bearer, client, config, mint_token, raw_exchange, start_capturing_backend, start_echo_backend,
    start_gateway, start_raw_backend, Echoed,
};
use jsonwebtoken::Algorithm;
use reqwest::StatusCode;

#[tokio::test]
async fn sixth_anonymous_request_is_rate_limited() {
    let auth = start_echo_backend().await;
    let users = start_echo_backend().await;
    let gateway = start_gateway(config(
        vec![("/auth", auth, AuthMode::Optional), ("/users", users, AuthMode::Optional)],
        5,
    ))
    .await;
    let client = client();

    for expected_remaining in (0..5).rev() {
        let response = client.get(gateway.url("/users/me")).send().await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["x-ratelimit-limit"], "5");
        assert_eq!(
            response.headers()["x-ratelimit-remaining"],
            expected_remaining.to_string().as_str()
        );
        let echoed: Echoed = response.json().await.unwrap();
        assert_eq!(echoed.path, "/users/me");
    }

    let response = client.get(gateway.url("/users/me")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(response.headers()["x-ratelimit-remaining"], "0");
    let body: ErrorBody = response.json().await.unwrap();
    assert_eq!(body.error, "rate limit exceeded");
}

#[tokio::test]
async fn required_route_demands_a_valid_token() {
    let users = start_echo_backend().await;
    let gateway = start_gateway(config(vec![("/users", users, AuthMode::Required)], 100)).await;
    let client = client();

    let response = client.get(gateway.url("/users/me")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: ErrorBody = response.json().await.unwrap();
    assert_eq!(body.error, "unauthorized");

    let expired = format!("Bearer {}", mint_token(Algorithm::HS256, "user-1", -3600));
    let response = client
        .get(gateway.url("/users/me"))
        .header("Authorization", expired)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Same secret, different algorithm.
    let substituted = format!("Bearer {}", mint_token(Algorithm::HS512, "user-1", 600));
    let response = client
        .get(gateway.url("/users/me"))
        .header("Authorization", substituted)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn authenticated_request_carries_identity_upstream() {
    let users = start_echo_backend().await;
    let gateway = start_gateway(config(vec![("/users", users, AuthMode::Required)], 100)).await;

    let response = client()
        .get(gateway.url("/users/me"))
        .header("Authorization", bearer("user-42"))
        .header("X-User-ID", "admin")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let echoed: Echoed = response.json().await.unwrap();
    assert_eq!(echoed.headers["x-user-id"], vec!["user-42".to_string()]);
}

#[tokio::test]
async fn unmatched_path_is_404_for_every_method() {
    let users = start_echo_backend().await;
    let gateway = start_gateway(config(vec![("/users", users, AuthMode::Optional)], 100)).await;
    let client = client();

    for method in [
        reqwest::Method::GET,
        reqwest::Method::POST,
        reqwest::Method::PUT,
        reqwest::Method::DELETE,
        reqwest::Method::PATCH,
    ] {
        let response = client
            .request(method.clone(), gateway.url("/orders/7"))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{method}");
        let body: ErrorBody = response.json().await.unwrap();
        assert_eq!(body.error, "not found");
    }
}

#[tokio::test]
async fn longest_prefix_wins() {
    let general = start_echo_backend().await;
    let admin = start_raw_backend(
        "HTTP/1.1 200 OK\r\nContent-Length: 5\r\nX-Backend: admin\r\nConnection: close\r\n\r\nadmin",
    )
    .await;
    let gateway = start_gateway(config(
        vec![("/api", general, AuthMode::Optional), ("/api/admin", admin, AuthMode::Optional)],
        100,
    ))
    .await;
    let client = client();

    let response = client.get(gateway.url("/api/admin/users")).send().await.unwrap();
    assert_eq!(response.headers()["x-backend"], "admin");

    let response = client.get(gateway.url("/api/users")).send().await.unwrap();
    let echoed: Echoed = response.json().await.unwrap();
    assert_eq!(echoed.path, "/api/users");
}

#[tokio::test]
async fn method_query_and_body_are_forwarded() {
    let users = start_echo_backend().await;
    let gateway = start_gateway(config(vec![("/users", users, AuthMode::Optional)], 100)).await;

    let response = client()
        .post(gateway.url("/users/search?q=ada&limit=2"))
        .header("X-Custom", "kept")
        .body(r#"{"name":"ada"}"#)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let echoed: Echoed = response.json().await.unwrap();
    assert_eq!(echoed.method, "POST");
    assert_eq!(echoed.path, "/users/search");
    assert_eq!(echoed.query.as_deref(), Some("q=ada&limit=2"));
    assert_eq!(echoed.body, r#"{"name":"ada"}"#);
    assert_eq!(echoed.header("x-custom"), Some("kept"));
}

#[tokio::test]
async fn hop_by_hop_headers_are_stripped_outbound() {
    let users = start_echo_backend().await;
    let gateway = start_gateway(config(vec![("/users", users, AuthMode::Optional)], 100)).await;

    let response = client()
        .get(gateway.url("/users/me"))
        .header("Keep-Alive", "timeout=5")
        .header("Proxy-Authorization", "Basic Zm9vOmJhcg==")
        .header("TE", "trailers")
        .header("X-Custom", "kept")
        .send()
        .await
        .unwrap();
    let echoed: Echoed = response.json().await.unwrap();
    for name in ["keep-alive", "proxy-authorization", "te", "trailers", "upgrade"] {
        assert!(echoed.header(name).is_none(), "{name} reached the backend");
    }
    assert_eq!(echoed.header("x-custom"), Some("kept"));
}

#[tokio::test]
async fn hop_by_hop_headers_are_stripped_from_response() {
    let backend = start_raw_backend(
        "HTTP/1.1 200 OK\r\n\
         Content-Length: 2\r\n\
         Keep-Alive: timeout=5\r\n\
         Proxy-Authenticate: Basic realm=\"x\"\r\n\
         Trailers: Expires\r\n\
         Upgrade: h2c\r\n\
         X-Custom: kept\r\n\
         Connection: close\r\n\
         \r\n\
         ok",
    )
    .await;
    let gateway = start_gateway(config(vec![("/raw", backend, AuthMode::Optional)], 100)).await;

    let response = client().get(gateway.url("/raw")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers().clone();
    for name in ["keep-alive", "proxy-authenticate", "trailers", "upgrade"] {
        assert!(!headers.contains_key(name), "{name} reached the caller");
    }
    assert_eq!(headers["x-custom"], "kept");
    assert_eq!(response.text().await.unwrap(), "ok");
}

#[tokio::test]
async fn header_name_case_survives_both_directions() {
    let (backend, mut seen) = start_capturing_backend(
        "HTTP/1.1 200 OK\r\n\
         Content-Length: 2\r\n\
         X-Backend-Case: v\r\n\
         Connection: close\r\n\
         \r\n\
         ok",
    )
    .await;
    let gateway = start_gateway(config(vec![("/case", backend, AuthMode::Optional)], 100)).await;

    let response = raw_exchange(
        gateway.addr,
        "GET /case/check HTTP/1.1\r\n\
         Host: gateway\r\n\
         X-Caller-Case: v\r\n\
         Connection: close\r\n\
         \r\n",
    )
    .await;

    let upstream = seen.recv().await.unwrap();
    assert!(upstream.contains("\r\nX-Caller-Case: v\r\n"), "backend saw:\n{upstream}");
    assert!(response.starts_with("HTTP/1.1 200 OK\r\n"), "caller saw:\n{response}");
    assert!(response.contains("\r\nX-Backend-Case: v\r\n"), "caller saw:\n{response}");
    assert!(response.ends_with("ok"));
}

#[tokio::test]
async fn request_id_is_propagated_and_echoed() {
    let users = start_echo_backend().await;
    let gateway = start_gateway(config(vec![("/users", users, AuthMode::Optional)], 100)).await;
    let client = client();

    let response = client
        .get(gateway.url("/users/me"))
        .header("X-Request-ID", "req-123")
        .send()
        .await
        .unwrap();
    assert_eq!(response.headers()["x-request-id"], "req-123");
    let echoed: Echoed = response.json().await.unwrap();
    assert_eq!(echoed.header("x-request-id"), Some("req-123"));

    // Generated when absent, also on gateway-generated errors.
    let response = client.get(gateway.url("/missing")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(response.headers().contains_key("x-request-id"));
}
