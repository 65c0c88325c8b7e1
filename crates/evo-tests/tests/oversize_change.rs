//! End-to-end: a wholesale rewrite is stopped by the size gate and nothing
//! touches the disk.

mod common;

use common::{fixture, reply_with, steady_benchmarks, SEED_SOURCE};
use evo_core::GenerationStatus;
use evo_history::GenerationStore;
use evo_synthesis::SimulatedChatModel;
use std::fs;

#[tokio::test]
async fn oversize_rewrite_is_rejected_by_the_size_gate() {
    let dir = tempfile::tempdir().unwrap();
    // 150 generated lines against a 3-line source.
    let rewrite: String = (0..150).map(|i| format!("pub fn f{i}() {{}}\n")).collect();
    let chat = SimulatedChatModel::new().with_reply(reply_with(&rewrite), 900, 800);
    let f = fixture(dir.path(), chat, steady_benchmarks(), 100_000);

    let result = f.evolver.run_once().await;

    assert_eq!(result.status, GenerationStatus::RejectedValidation);
    assert!(result.detail.contains("cap of 20"));

    // File unchanged, failure counted.
    let on_disk = fs::read_to_string(f.evolvable_dir.join("prompt_builder.rs")).unwrap();
    assert_eq!(on_disk, SEED_SOURCE);
    assert_eq!(f.router.status().consecutive_failures, 1);

    let record = f.store.get(1).await.unwrap().unwrap();
    assert_eq!(record.status, GenerationStatus::RejectedValidation);
}
