use indoc::indoc;
use integration_tests::{TestServer, llms::OpenAIMock};
use reqwest::{Method, header};

#[tokio::test]
async fn preflight_for_allowed_origin() {
    let config = indoc! {r#"
        [server.cors]
        allow_origins = ["https://app.example.com"]
    "#};

    let mut builder = TestServer::builder();
    builder.spawn_llm(OpenAIMock::new("OpenAI")).await;
    let server = builder.build(config).await;

    let response = server
        .client
        .request(Method::OPTIONS, "/api/chat")
        .header(header::ORIGIN, "https://app.example.com")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);

    let headers = response.headers();
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "https://app.example.com");

    let methods = headers[header::ACCESS_CONTROL_ALLOW_METHODS].to_str().unwrap();
    assert!(methods.contains("POST"), "{methods}");
}

#[tokio::test]
async fn preflight_for_unknown_origin_has_no_allow_origin() {
    let config = indoc! {r#"
        [server.cors]
        allow_origins = ["https://app.example.com"]
    "#};

    let mut builder = TestServer::builder();
    builder.spawn_llm(OpenAIMock::new("OpenAI")).await;
    let server = builder.build(config).await;

    let response = server
        .client
        .request(Method::OPTIONS, "/api/chat")
        .header(header::ORIGIN, "https://evil.example.com")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .send()
        .await
        .unwrap();

    assert!(!response.headers().contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
}

#[tokio::test]
async fn permissive_without_configuration() {
    let mut builder = TestServer::builder();
    builder.spawn_llm(OpenAIMock::new("OpenAI")).await;
    let server = builder.build("").await;

    let response = server
        .client
        .request(Method::OPTIONS, "/api/models")
        .header(header::ORIGIN, "https://anywhere.example.com")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
}
