pub mod llms;

use std::{net::SocketAddr, sync::Once, time::Duration};

use config::Config;
use reqwest::{Method, RequestBuilder};
use serde_json::Value;
use server::ServeConfig;
use tokio::{net::TcpListener, time::timeout};
use tokio_util::sync::CancellationToken;

use crate::llms::TestLlmProvider;

static INIT: Once = Once::new();

fn init_crypto_provider() {
    INIT.call_once(|| {
        rustls::crypto::aws_lc_rs::default_provider()
            .install_default()
            .expect("Failed to install default crypto provider");
    });
}

/// Test client for making HTTP requests to the test server
pub struct TestClient {
    base_url: String,
    client: reqwest::Client,
}

impl TestClient {
    /// Create a new test client for the given base URL
    pub fn new(base_url: String) -> Self {
        Self {
            base_url,
            client: reqwest::Client::new(),
        }
    }

    /// Send a POST request to the given path with JSON body
    pub async fn post<T: serde::Serialize>(&self, path: &str, body: &T) -> reqwest::Response {
        self.client
            .post(format!("{}{}", self.base_url, path))
            .json(body)
            .send()
            .await
            .unwrap()
    }

    /// Send a POST request with a body that is sent as is, labelled as JSON
    pub async fn post_raw(&self, path: &str, body: &'static str) -> reqwest::Response {
        self.client
            .post(format!("{}{}", self.base_url, path))
            .header("content-type", "application/json")
            .body(body)
            .send()
            .await
            .unwrap()
    }

    /// Send a GET request to the given path
    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.client
            .get(format!("{}{}", self.base_url, path))
            .send()
            .await
            .unwrap()
    }

    /// Start a request with any method, for headers the helpers above do not set
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client.request(method, format!("{}{}", self.base_url, path))
    }
}

/// Client for the LLM endpoints mounted under a path prefix
pub struct LlmClient<'a> {
    client: &'a TestClient,
    path: String,
}

impl LlmClient<'_> {
    /// POST to the chat endpoint
    pub async fn chat(&self, body: Value) -> reqwest::Response {
        self.client.post(&format!("{}/chat", self.path), &body).await
    }

    /// POST to the enhancer endpoint
    pub async fn enhancer(&self, body: Value) -> reqwest::Response {
        self.client.post(&format!("{}/enhancer", self.path), &body).await
    }

    /// POST a raw body to one of the endpoints, e.g. `"/enhancer"`
    pub async fn post_raw(&self, endpoint: &str, body: &'static str) -> reqwest::Response {
        self.client.post_raw(&format!("{}{endpoint}", self.path), body).await
    }

    /// GET the model list and return the parsed body
    pub async fn list_models(&self) -> Value {
        let response = self.client.get(&format!("{}/models", self.path)).await;
        assert_eq!(response.status(), 200);

        response.json().await.unwrap()
    }
}

/// Test server that manages the lifecycle of a server instance
pub struct TestServer {
    pub client: TestClient,
    pub address: SocketAddr,
    shutdown: CancellationToken,
    _handle: tokio::task::JoinHandle<()>,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Collects mock providers before the server is started
#[derive(Default)]
pub struct TestServerBuilder {
    provider_config: String,
}

impl TestServerBuilder {
    /// Start a mock provider and add it to the configuration
    pub async fn spawn_llm(&mut self, provider: impl TestLlmProvider) {
        let config = provider.spawn().await.unwrap();
        self.provider_config.push_str(&config.to_toml());
    }

    /// Start the server with the given TOML plus the spawned providers
    pub async fn build(self, config_toml: &str) -> TestServer {
        let config = format!("{config_toml}\n{}", self.provider_config);
        TestServer::start(&config).await
    }
}

impl TestServer {
    pub fn builder() -> TestServerBuilder {
        TestServerBuilder::default()
    }

    /// Start a new test server with the given TOML configuration
    pub async fn start(config_toml: &str) -> Self {
        init_crypto_provider();

        let config: Config = toml::from_str(config_toml).unwrap();

        // Find an available port
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        drop(listener);

        let shutdown = CancellationToken::new();

        let serve_config = ServeConfig {
            listen_address: address,
            config,
            shutdown: shutdown.clone(),
        };

        let handle = tokio::spawn(async move {
            if let Err(e) = server::serve(serve_config).await {
                eprintln!("Server failed to start: {e}");
            }
        });

        let client = TestClient::new(format!("http://{address}"));

        // Wait until the server accepts connections
        for _ in 0..20 {
            let probe = client.client.get(format!("http://{address}/")).send();

            if matches!(timeout(Duration::from_millis(100), probe).await, Ok(Ok(_))) {
                break;
            }

            tokio::time::sleep(Duration::from_millis(50)).await;
        }

        TestServer {
            client,
            address,
            shutdown,
            _handle: handle,
        }
    }

    /// Client for the LLM endpoints under the given path, usually `/api`
    pub fn llm_client(&self, path: &str) -> LlmClient<'_> {
        LlmClient {
            client: &self.client,
            path: path.to_string(),
        }
    }
}
