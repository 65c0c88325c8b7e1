//! Integration-test crate for the Evo workspace. All content lives under
//! `tests/`.
