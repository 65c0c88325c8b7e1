use crate::chat::{ChatModel, ChatRequest};
use crate::error::SynthesisError;
use crate::parse::{extract_code_block, extract_reasoning};
use crate::prompt::{token_estimate, PromptBuilder};
use evo_budget::TokenBudget;
use evo_core::{BenchmarkSnapshot, EvolvableTarget, Proposal};
use evo_router::ModelRouter;
use std::sync::Arc;

/// Completion-token cap sent with every request.
const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Turns one target plus its latest benchmarks into a [`Proposal`].
///
/// The pipeline is strictly ordered: read source, budget gate, model
/// selection, prompt, transport, parse, usage accounting. The proposer
/// never writes to disk.
#[derive(Clone)]
pub struct Proposer {
    chat: Arc<dyn ChatModel>,
    budget: TokenBudget,
    router: ModelRouter,
    max_tokens: u32,
}

impl Proposer {
    pub fn new(chat: Arc<dyn ChatModel>, budget: TokenBudget, router: ModelRouter) -> Self {
        Self {
            chat,
            budget,
            router,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub async fn propose(
        &self,
        target: &EvolvableTarget,
        benchmarks: Option<&BenchmarkSnapshot>,
    ) -> Result<Proposal, SynthesisError> {
        let old_source = tokio::fs::read_to_string(&target.source_path)
            .await
            .map_err(|e| SynthesisError::ReadFailed {
                path: target.source_path.clone(),
                why: e.to_string(),
            })?;

        // The budget gate runs before any network traffic.
        if !self.budget.has_budget() {
            return Err(SynthesisError::BudgetExhausted);
        }

        let model_tag = self.router.current();
        let prompt = PromptBuilder::build(&target.name, &old_source, benchmarks);
        tracing::debug!(
            target = %target.name,
            model = %model_tag,
            prompt_tokens_estimate = token_estimate(&prompt),
            "requesting rewrite"
        );

        let reply = self
            .chat
            .complete(&ChatRequest {
                model: model_tag.clone(),
                max_tokens: self.max_tokens,
                prompt,
            })
            .await?;

        let new_source = extract_code_block(&reply.text).ok_or(SynthesisError::NoCodeInResponse)?;
        let reasoning = extract_reasoning(&reply.text);

        self.budget
            .record(reply.usage.input_tokens, reply.usage.output_tokens);

        Ok(Proposal {
            target_name: target.name.clone(),
            old_source,
            new_source,
            reasoning,
            model_tag,
            tokens_in: reply.usage.input_tokens,
            tokens_out: reply.usage.output_tokens,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::SimulatedChatModel;
    use evo_core::EvolvableRegistry;
    use std::fs;

    fn fixture() -> (tempfile::TempDir, EvolvableTarget) {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("tests")).unwrap();
        fs::write(
            dir.path().join("prompt_builder.rs"),
            "pub fn shape(s: &str) -> String {\n    s.to_string()\n}\n",
        )
        .unwrap();
        let target = EvolvableRegistry::standard(dir.path())
            .get("prompt_builder")
            .unwrap()
            .clone();
        (dir, target)
    }

    fn proposer_with(model: SimulatedChatModel, budget: TokenBudget) -> Proposer {
        Proposer::new(Arc::new(model), budget, ModelRouter::default())
    }

    #[tokio::test]
    async fn propose_builds_full_proposal() {
        let (_dir, target) = fixture();
        let reply = "```rust\npub fn shape(s: &str) -> String { s.into() }\n```\nReasoning: shorter.";
        let model = SimulatedChatModel::new().with_reply(reply, 700, 42);
        let budget = TokenBudget::new(100_000);
        let proposal = proposer_with(model, budget.clone())
            .propose(&target, None)
            .await
            .unwrap();
        assert_eq!(proposal.target_name, "prompt_builder");
        assert!(proposal.old_source.contains("to_string"));
        assert!(proposal.new_source.contains("s.into()"));
        assert_eq!(proposal.reasoning, "shorter.");
        assert_eq!(proposal.tokens_in, 700);
        // Usage was recorded with the budget.
        assert_eq!(budget.status().tokens_used_today, 742);
    }

    #[tokio::test]
    async fn exhausted_budget_never_calls_the_model() {
        let (_dir, target) = fixture();
        let model = SimulatedChatModel::new().with_reply("```rust\nx\n```", 1, 1);
        let budget = TokenBudget::new(10);
        budget.record(10, 0);
        let proposer = proposer_with(model.clone(), budget);
        let err = proposer.propose(&target, None).await.unwrap_err();
        assert!(matches!(err, SynthesisError::BudgetExhausted));
        assert!(model.requests().is_empty());
    }

    #[tokio::test]
    async fn missing_source_is_read_failed() {
        let dir = tempfile::tempdir().unwrap();
        let target = EvolvableRegistry::standard(dir.path())
            .get("token_meter")
            .unwrap()
            .clone();
        let model = SimulatedChatModel::new().with_reply("```rust\nx\n```", 1, 1);
        let err = proposer_with(model, TokenBudget::new(100))
            .propose(&target, None)
            .await
            .unwrap_err();
        assert!(matches!(err, SynthesisError::ReadFailed { .. }));
    }

    #[tokio::test]
    async fn response_without_code_block_is_rejected() {
        let (_dir, target) = fixture();
        let model = SimulatedChatModel::new().with_reply("I would rather not.", 5, 5);
        let err = proposer_with(model, TokenBudget::new(100_000))
            .propose(&target, None)
            .await
            .unwrap_err();
        assert!(matches!(err, SynthesisError::NoCodeInResponse));
    }

    #[tokio::test]
    async fn request_carries_router_model_and_cap() {
        let (_dir, target) = fixture();
        let model = SimulatedChatModel::new().with_reply("```rust\nx\n```\nReasoning: r", 1, 1);
        let proposer = proposer_with(model.clone(), TokenBudget::new(100_000)).with_max_tokens(512);
        proposer.propose(&target, None).await.unwrap();
        let requests = model.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].max_tokens, 512);
        assert_eq!(requests[0].model, ModelRouter::default().current());
    }
}
