use indoc::{formatdoc, indoc};

use crate::directive;

/// System prompt used when the configuration does not provide one.
pub(crate) const DEFAULT_SYSTEM_PROMPT: &str = indoc! {"
    You are an expert software engineer and a careful technical writer.

    Answer with working, complete code when code is asked for. Prefer small,
    focused changes over rewrites and keep explanations short. When the request
    is ambiguous, state the assumption you make before answering.
"};

/// Builds the single user message sent for a prompt enhancement.
///
/// The routing directives lead the message, followed by the instructions and the
/// caller's prompt wrapped in `<original_prompt>` tags.
pub(crate) fn enhancement(model: &str, provider: &str, message: &str) -> String {
    let instructions = formatdoc! {"
        You are a professional prompt engineer specializing in crafting precise, effective prompts.
        Your task is to enhance prompts by making them more specific, actionable, and effective.

        I want you to improve the user prompt that is wrapped in `<original_prompt>` tags.

        For valid prompts:
        - Make instructions explicit and unambiguous
        - Add relevant context and constraints
        - Remove redundant information
        - Maintain the core intent
        - Ensure the prompt is self-contained
        - Use professional language

        For invalid or unclear prompts:
        - Respond with a clear, professional guidance message
        - Keep responses concise and actionable
        - Maintain a helpful, constructive tone
        - Focus on what the user should provide
        - Use a standard template for consistency

        IMPORTANT: Your response must ONLY contain the enhanced prompt text.
        Do not include any explanations, metadata, or wrapper tags.

        <original_prompt>
        {message}
        </original_prompt>"
    };

    format!("{}{instructions}", directive::render(model, provider))
}
