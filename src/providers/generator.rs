//! Generator trait: assembled context + query to answer text

use async_trait::async_trait;

use crate::error::Result;

/// The prompt handed to the generation capability
#[derive(Debug, Clone)]
pub struct Prompt {
    /// System instructions (grounding rules)
    pub system: String,
    /// Assembled document context
    pub context: String,
    /// The user's question
    pub query: String,
}

impl Prompt {
    /// Render the prompt into the single text most providers accept
    pub fn render(&self) -> String {
        format!(
            "{system}\n\nCONTEXT FROM DOCUMENTS:\n{context}\n\nQUESTION: {query}\n\nAnswer using only the document content above:",
            system = self.system,
            context = self.context,
            query = self.query,
        )
    }
}

/// Trait for LLM-based answer generation
///
/// Implementations:
/// - `OllamaGenerator`: Ollama-compatible HTTP endpoint
#[async_trait]
pub trait Generator: Send + Sync {
    /// Generate answer text for a prompt
    async fn generate(&self, prompt: &Prompt) -> Result<String>;

    /// Get provider name for logging
    fn name(&self) -> &str;

    /// Get the model being used
    fn model(&self) -> &str;
}
