include!("../prompt_builder.rs");

#[test]
fn shape_names_the_target() {
    let out = shape("token_meter", "pub fn estimate() {}");
    assert!(out.starts_with("Rewrite the module `token_meter`"));
}

#[test]
fn shape_carries_the_source() {
    let out = shape("t", "pub fn body() {}");
    assert!(out.contains("pub fn body() {}"));
}

#[test]
fn shape_terminates_with_newline() {
    let out = shape("t", "no trailing newline");
    assert!(out.ends_with('\n'));
}
