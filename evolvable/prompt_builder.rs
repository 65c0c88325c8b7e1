pub fn shape(target: &str, source: &str) -> String {
    let mut out = String::with_capacity(target.len() + source.len() + 32);
    out.push_str("Rewrite the module `");
    out.push_str(target);
    out.push_str("`.\n\n");
    out.push_str(source);
    if !source.ends_with('\n') {
        out.push('\n');
    }
    out
}
