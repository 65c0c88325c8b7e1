//! End-to-end: three consecutive failed cycles on the cheap model escalate
//! to the capable model; the next success de-escalates.

mod common;

use common::{fixture, reply_with, steady_benchmarks, SEED_SOURCE};
use evo_core::GenerationStatus;
use evo_router::ModelTier;
use evo_synthesis::SimulatedChatModel;

#[tokio::test]
async fn three_failures_escalate_then_success_de_escalates() {
    let dir = tempfile::tempdir().unwrap();
    // Three replies with no code block, then a clean rewrite.
    let chat = SimulatedChatModel::new()
        .with_reply("cannot help with that", 600, 10)
        .with_reply("still thinking", 600, 10)
        .with_reply("...", 600, 10)
        .with_reply(reply_with(SEED_SOURCE), 900, 70);
    let f = fixture(dir.path(), chat, steady_benchmarks(), 100_000);

    for _ in 0..3 {
        let result = f.evolver.run_once().await;
        assert_eq!(result.status, GenerationStatus::Error);
    }
    let status = f.router.status();
    assert_eq!(status.current, ModelTier::Capable);
    assert_eq!(status.escalations, 1);
    assert_eq!(status.consecutive_failures, 3);

    // The fourth cycle runs on the capable tag.
    let recovered = f.evolver.run_once().await;
    assert_eq!(recovered.status, GenerationStatus::AcceptedNeutral);
    let record = f.store_record(4).await;
    assert_eq!(record.model_tag, "claude-sonnet-4-5");

    let status = f.router.status();
    assert_eq!(status.current, ModelTier::Cheap);
    assert_eq!(status.consecutive_failures, 0);
}
