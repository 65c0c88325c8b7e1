use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The fixed evolvable surface, in stable order.
///
/// The set is decided at build time; nothing at runtime can extend it.
pub const TARGET_NAMES: [&str; 3] = ["prompt_builder", "fitness_evaluator", "token_meter"];

/// One evolvable unit: a stable name plus its read-side source and test
/// paths.
///
/// These paths are trusted for *reading* only. The write-side whitelist
/// lives in the applier and is never derived from this type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvolvableTarget {
    pub name: String,
    pub source_path: PathBuf,
    pub test_path: PathBuf,
}

/// Enumerates the evolvable targets and owns round-robin selection.
#[derive(Clone, Debug)]
pub struct EvolvableRegistry {
    targets: Vec<EvolvableTarget>,
}

impl EvolvableRegistry {
    /// Build the standard registry rooted at an evolvable source directory.
    ///
    /// Layout: `<root>/<name>.rs` and `<root>/tests/<name>_test.rs`.
    pub fn standard(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        let targets = TARGET_NAMES
            .iter()
            .map(|name| EvolvableTarget {
                name: (*name).to_string(),
                source_path: root.join(format!("{name}.rs")),
                test_path: root.join("tests").join(format!("{name}_test.rs")),
            })
            .collect();
        Self { targets }
    }

    /// All targets in stable order.
    pub fn all(&self) -> &[EvolvableTarget] {
        &self.targets
    }

    /// Round-robin selection by generation index.
    pub fn select(&self, generation: u64) -> &EvolvableTarget {
        let idx = (generation % self.targets.len() as u64) as usize;
        &self.targets[idx]
    }

    /// Look up a target by name.
    pub fn get(&self, name: &str) -> Option<&EvolvableTarget> {
        self.targets.iter().find(|t| t.name == name)
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}
