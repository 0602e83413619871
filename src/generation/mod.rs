//! Answer generation: context assembly, prompt construction, citations

mod citation;
mod context;
mod prompt;

pub use citation::build_citations;
pub use context::{ContextAssembler, ShortCircuitPolicy};
pub use prompt::PromptBuilder;
