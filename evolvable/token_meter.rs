pub fn estimate(text: &str) -> u64 {
    let chars = text.chars().count() as u64;
    (chars + 3) / 4
}
