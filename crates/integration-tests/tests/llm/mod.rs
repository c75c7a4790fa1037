mod chat;
mod enhancer;
mod models;

use indoc::indoc;

/// Base configuration of the LLM tests. Providers are appended by the builder.
const CONFIG: &str = indoc! {r#"
    [llm]
    default_model = "claude-3-5-sonnet-latest"
    default_provider = "Anthropic"
    system_prompt = "You are a test assistant."
"#};

fn user(content: &str) -> serde_json::Value {
    serde_json::json!({"role": "user", "content": content})
}
