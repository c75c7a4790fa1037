pub mod anthropic;
pub mod common;
pub mod openai;
mod provider;

pub use anthropic::AnthropicMock;
pub use common::{ReceivedRequest, RequestLog};
pub use openai::OpenAIMock;
pub use provider::{LlmProviderConfig, MockModel, ProviderType, TestLlmProvider};
