use evo_core::BenchmarkSnapshot;

/// Rendered when the caller has no benchmark snapshot to show.
const BENCHMARKS_FALLBACK: &str = "(no benchmark data available)";

/// Constructs the LLM is told it must never emit. The validator enforces
/// the same list statically, so the prompt is a courtesy, not the defence.
pub const FORBIDDEN_CONSTRUCTS: [&str; 8] = [
    "unsafe blocks or unsafe impls",
    "std::process / spawning child processes",
    "std::fs / filesystem access",
    "std::net / sockets or any networking",
    "std::env / environment access",
    "FFI, extern blocks, or raw pointers",
    "mem::transmute or mem::forget",
    "macro invocations at module level (include!, ctor, ...)",
];

/// Assembles the request text sent to the chat model.
///
/// Pure: a function of its inputs only, no I/O.
pub struct PromptBuilder;

impl PromptBuilder {
    pub fn build(target_name: &str, source: &str, benchmarks: Option<&BenchmarkSnapshot>) -> String {
        let mut prompt = String::new();

        prompt.push_str("You are the rewrite engine of a self-evolving Rust service.\n");
        prompt.push_str(&format!(
            "Improve the module `{target_name}` without changing its public behaviour.\n\n"
        ));

        prompt.push_str("## Current source\n```rust\n");
        prompt.push_str(source);
        if !source.ends_with('\n') {
            prompt.push('\n');
        }
        prompt.push_str("```\n\n");

        prompt.push_str("## Latest benchmarks\n");
        prompt.push_str(&Self::format_benchmarks(benchmarks));
        prompt.push('\n');

        prompt.push_str("## Forbidden constructs\n");
        for construct in FORBIDDEN_CONSTRUCTS {
            prompt.push_str(&format!("- {construct}\n"));
        }
        prompt.push('\n');

        prompt.push_str("## Response format\n");
        prompt.push_str("Reply with exactly one fenced code block containing the full new source,\n");
        prompt.push_str("followed by a single line starting with `Reasoning:`.\n");

        prompt
    }

    /// One `key: value` line per metric. An empty map renders an empty
    /// block; an absent snapshot renders the fixed fallback string.
    pub fn format_benchmarks(benchmarks: Option<&BenchmarkSnapshot>) -> String {
        match benchmarks {
            None => format!("{BENCHMARKS_FALLBACK}\n"),
            Some(snapshot) => {
                let mut out = String::new();
                for (key, value) in &snapshot.metrics {
                    out.push_str(&format!("{key}: {value}\n"));
                }
                out
            }
        }
    }
}

/// Rough token estimate for logging and max-token sanity: roughly four
/// characters per token for English-plus-code text.
pub fn token_estimate(text: &str) -> u64 {
    (text.chars().count() as u64).div_ceil(4)
}
