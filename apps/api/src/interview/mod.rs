// Interview core: the session state machine, score aggregation, and the
// deterministic fallbacks behind the AI evaluation seam.
// All LLM calls go through llm_client — no direct Anthropic calls here.

pub mod aggregate;
pub mod evaluator;
pub mod fallback;
pub mod handlers;
pub mod models;
pub mod prompts;
pub mod questions;
pub mod session;
pub mod session_store;
pub mod store;
