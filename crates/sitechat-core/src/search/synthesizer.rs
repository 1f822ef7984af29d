//! Grounded answer generation

use super::{QueryContext, RankedCandidate};
use crate::error::{Result, SiteChatError};
use crate::llm::AnswerGenerator;
use std::sync::Arc;

/// Returned in place of an empty model answer
pub const NO_CONTENT_PLACEHOLDER: &str = "(no content)";

/// Candidate texts in ranked order, separated by blank lines
pub fn build_context(candidates: &[RankedCandidate]) -> String {
    candidates
        .iter()
        .map(|c| c.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Instruction framing the assistant as the organisation behind `site`
pub fn system_prompt(site: &str) -> String {
    format!(
        "You are the voice of the organization represented by {}. \
         Whenever a user says 'you', it always refers to this organization, \
         not to any client or case study mentioned. \
         Respond in first-person plural. \
         Only use the provided context; if unknown, say so.",
        site
    )
}

pub fn user_prompt(question: &str, context: &str) -> String {
    format!("Context:\n{}\n\nQuestion: {}\n\nAnswer:", context, question)
}

/// Final stage: prompt assembly and one generator call
pub struct AnswerSynthesizer {
    generator: Arc<dyn AnswerGenerator>,
    temperature: f32,
    max_tokens: u32,
}

impl AnswerSynthesizer {
    pub fn new(generator: Arc<dyn AnswerGenerator>, temperature: f32, max_tokens: u32) -> Self {
        Self {
            generator,
            temperature,
            max_tokens,
        }
    }

    /// Answer `ctx.question` from `top` only.
    ///
    /// Generator failures come back as [`SiteChatError::AnswerGeneration`]
    /// unless they are configuration errors, which pass through unchanged.
    pub async fn synthesize(&self, ctx: &QueryContext, top: &[RankedCandidate]) -> Result<String> {
        let context = build_context(top);
        let system = system_prompt(&ctx.site_id);
        let user = user_prompt(&ctx.question, &context);

        tracing::debug!(
            "Generating answer with {} from {} passages ({} chars)",
            self.generator.model_name(),
            top.len(),
            context.len()
        );

        let answer = self
            .generator
            .chat(&system, &user, self.temperature, self.max_tokens)
            .await
            .map_err(|e| {
                if e.is_config_error() {
                    e
                } else {
                    SiteChatError::AnswerGeneration(e.to_string())
                }
            })?;

        let answer = answer.trim();
        if answer.is_empty() {
            Ok(NO_CONTENT_PLACEHOLDER.to_string())
        } else {
            Ok(answer.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::Candidate;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingGenerator {
        reply: Option<String>,
        prompts: Mutex<Vec<(String, String, f32, u32)>>,
    }

    #[async_trait]
    impl AnswerGenerator for RecordingGenerator {
        async fn chat(
            &self,
            system_prompt: &str,
            user_prompt: &str,
            temperature: f32,
            max_tokens: u32,
        ) -> Result<String> {
            self.prompts.lock().unwrap().push((
                system_prompt.to_string(),
                user_prompt.to_string(),
                temperature,
                max_tokens,
            ));
            self.reply
                .clone()
                .ok_or_else(|| SiteChatError::Llm("HTTP 503: overloaded".to_string()))
        }

        fn model_name(&self) -> &str {
            "recording"
        }
    }

    fn ranked(text: &str) -> RankedCandidate {
        RankedCandidate {
            candidate: Candidate {
                site_id: "acme.io".to_string(),
                url: "https://acme.io".to_string(),
                title: None,
                run_id: None,
                chunk_index: 0,
                text: text.to_string(),
                similarity: 0.5,
            },
            rerank_score: None,
        }
    }

    #[test]
    fn test_context_joins_with_blank_lines() {
        assert_eq!(build_context(&[ranked("one"), ranked("two")]), "one\n\ntwo");
        assert_eq!(build_context(&[]), "");
    }

    #[test]
    fn test_prompts() {
        let system = system_prompt("acme.io");
        assert!(system.starts_with("You are the voice of the organization represented by acme.io."));
        assert!(system.contains("first-person plural"));
        assert!(system.contains("if unknown, say so"));
        assert_eq!(
            user_prompt("Who are you?", "We build tools."),
            "Context:\nWe build tools.\n\nQuestion: Who are you?\n\nAnswer:"
        );
    }

    #[tokio::test]
    async fn test_synthesize_passes_settings_and_trims() {
        let generator = Arc::new(RecordingGenerator {
            reply: Some("  We build tools.\n".to_string()),
            ..Default::default()
        });
        let synth = AnswerSynthesizer::new(generator.clone(), 0.0, 600);
        let ctx = QueryContext::new("What do you do?", "acme.io");

        let answer = synth.synthesize(&ctx, &[ranked("We build tools.")]).await.unwrap();
        assert_eq!(answer, "We build tools.");

        let prompts = generator.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].1.contains("Question: What do you do?"));
        assert_eq!(prompts[0].2, 0.0);
        assert_eq!(prompts[0].3, 600);
    }

    #[tokio::test]
    async fn test_empty_answer_becomes_placeholder() {
        let generator = Arc::new(RecordingGenerator {
            reply: Some("   ".to_string()),
            ..Default::default()
        });
        let synth = AnswerSynthesizer::new(generator, 0.0, 600);
        let answer = synth
            .synthesize(&QueryContext::new("q", "acme.io"), &[ranked("x")])
            .await
            .unwrap();
        assert_eq!(answer, NO_CONTENT_PLACEHOLDER);
    }

    #[tokio::test]
    async fn test_generator_failure_is_answer_generation_error() {
        let synth = AnswerSynthesizer::new(Arc::new(RecordingGenerator::default()), 0.0, 600);
        let err = synth
            .synthesize(&QueryContext::new("q", "acme.io"), &[ranked("x")])
            .await
            .unwrap_err();
        assert!(matches!(err, SiteChatError::AnswerGeneration(_)));
        assert!(err.to_string().contains("overloaded"));
    }
}
