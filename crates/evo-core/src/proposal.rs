use crate::hash::ContentHash;
use serde::{Deserialize, Serialize};

/// An LLM-generated candidate replacement for one target's source.
///
/// Immutable once constructed; the validator and applier only ever read it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Proposal {
    /// Name of the target this proposal rewrites.
    pub target_name: String,
    /// Source snapshot read from disk before the LLM call.
    pub old_source: String,
    /// Candidate replacement source.
    pub new_source: String,
    /// Free-text reasoning extracted from the response.
    pub reasoning: String,
    /// Which model produced the candidate.
    pub model_tag: String,
    /// Prompt tokens attributed by the provider.
    pub tokens_in: u64,
    /// Completion tokens attributed by the provider.
    pub tokens_out: u64,
}

impl Proposal {
    pub fn old_hash(&self) -> ContentHash {
        ContentHash::hash(self.old_source.as_bytes())
    }

    pub fn new_hash(&self) -> ContentHash {
        ContentHash::hash(self.new_source.as_bytes())
    }

    /// A proposal whose candidate is byte-identical to the snapshot.
    pub fn is_no_op(&self) -> bool {
        self.old_source == self.new_source
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Proposal {
        Proposal {
            target_name: "prompt_builder".into(),
            old_source: "pub fn a() {}\n".into(),
            new_source: "pub fn a() -> u8 { 0 }\n".into(),
            reasoning: "tightened the return type".into(),
            model_tag: "claude-3-5-haiku-latest".into(),
            tokens_in: 812,
            tokens_out: 64,
        }
    }

    #[test]
    fn hashes_track_sources() {
        let p = sample();
        assert_ne!(p.old_hash(), p.new_hash());
        assert_eq!(p.old_hash(), ContentHash::hash(p.old_source.as_bytes()));
    }

    #[test]
    fn no_op_detection() {
        let mut p = sample();
        assert!(!p.is_no_op());
        p.new_source = p.old_source.clone();
        assert!(p.is_no_op());
    }

    #[test]
    fn proposal_serde_round_trip() {
        let p = sample();
        let json = serde_json::to_string(&p).unwrap();
        let restored: Proposal = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.target_name, p.target_name);
        assert_eq!(restored.tokens_in, 812);
    }
}
