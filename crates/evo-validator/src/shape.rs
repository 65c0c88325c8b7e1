//! Gate 3: module-level side-effect scan.
//!
//! Gate 4 hands the candidate to a compiler, so everything at the top level
//! must be purely declarative. Rust cannot evaluate expressions at module
//! level the way a dynamic language can, but macro invocations, `extern
//! crate` and foreign modules can smuggle expansion-time or load-time
//! behaviour; those are the forms this gate counts.

use crate::error::ValidationError;
use syn::Item;

/// Run the gate over an already-parsed candidate.
pub fn shape_gate(file: &syn::File) -> Result<(), ValidationError> {
    if file.items.is_empty() {
        return Err(ValidationError::NotAModule);
    }
    let offending = file.items.iter().filter(|item| !is_declarative(item)).count();
    if offending >= 1 {
        return Err(ValidationError::ModuleLevelSideEffects(offending));
    }
    Ok(())
}

/// The closed set of allowed top-level forms.
fn is_declarative(item: &Item) -> bool {
    match item {
        Item::Use(_)
        | Item::Fn(_)
        | Item::Struct(_)
        | Item::Enum(_)
        | Item::Union(_)
        | Item::Impl(_)
        | Item::Trait(_)
        | Item::TraitAlias(_)
        | Item::Type(_)
        | Item::Const(_)
        | Item::Static(_)
        | Item::Mod(_) => true,
        // A macro *definition* is declarative; an invocation is not.
        Item::Macro(mac) => mac.ident.is_some(),
        _ => false,
    }
}
