//! Advisory generation collaborators.
//!
//! The triage engine only sees the `AdvisoryGenerator` trait; this crate
//! supplies a deterministic mock for tests/dev and an HTTP provider that
//! calls an OpenAI-compatible chat endpoint (a local Ollama works).

mod http;
mod mock;
mod retry;

pub use http::HttpAdvisor;
pub use mock::MockAdvisor;
pub use retry::RetryConfig;

use vigil_core::AdvisoryContext;

/// Prompt handed to the text-generation backend. Short on purpose: the
/// output is a two-sentence coaching nudge, not a consultation.
pub(crate) fn advisory_prompt(ctx: &AdvisoryContext) -> String {
    let mut prompt = format!(
        "You are a cautious wellness coach. {} currently shows heart-rate \
         variability of {:.1} ms, blood pressure {}/{} and a lifestyle score \
         of {}/100.",
        ctx.name, ctx.variability_ms, ctx.systolic, ctx.diastolic, ctx.lifestyle_score
    );
    if !ctx.medical_history.is_empty() {
        prompt.push_str(&format!(
            " Known history: {}.",
            ctx.medical_history.join(", ")
        ));
    }
    prompt.push_str(
        " Write at most two sentences of practical, calming advice for the \
         next half hour. Do not diagnose.",
    );
    prompt
}
