include!("../token_meter.rs");

#[test]
fn four_chars_per_token() {
    assert_eq!(estimate("abcd"), 1);
    assert_eq!(estimate("abcde"), 2);
}

#[test]
fn empty_text_is_zero_tokens() {
    assert_eq!(estimate(""), 0);
}
