//! Gate 2: AST allowlist walk.
//!
//! Parses the candidate in the dialect the LLM is asked to produce (the
//! host's own, so `syn` suffices) and walks every node. Qualified paths are
//! checked against a namespace allowlist; call names against a denylist;
//! and any mention of a runtime escape facility (process, filesystem,
//! network, FFI, unsafe) is flagged wherever it appears in the tree.
//!
//! Violations aggregate; one walk reports everything it finds.

use crate::error::{ValidationError, Violation};
use syn::visit::{self, Visit};

/// Namespace roots a qualified call may start with. Everything reachable
/// through these is still subject to the denylists below.
const ALLOWED_PATH_ROOTS: [&str; 6] = ["std", "core", "alloc", "crate", "self", "super"];

/// Function short names that are banned outright, qualified or bare.
const BANNED_FUNCTIONS: [&str; 11] = [
    "spawn",
    "spawn_blocking",
    "exec",
    "eval",
    "transmute",
    "forget",
    "from_raw",
    "into_raw",
    "copy_nonoverlapping",
    "set_var",
    "remove_var",
];

/// Path segments that name a runtime escape facility. Catching the segment
/// anywhere in a path covers both `std::process::Command` and a bare
/// `Command::new` after an import.
const BANNED_RUNTIME_SEGMENTS: [&str; 13] = [
    "process",
    "fs",
    "net",
    "env",
    "ffi",
    "ptr",
    "libc",
    "os",
    "Command",
    "TcpStream",
    "TcpListener",
    "UdpSocket",
    "File",
];

/// Macros that splice foreign content or run at expansion time.
const BANNED_MACROS: [&str; 5] = ["include", "include_str", "include_bytes", "env", "option_env"];

/// Run the gate: parse, walk, aggregate.
pub fn ast_gate(new_source: &str) -> Result<(), ValidationError> {
    let file = syn::parse_file(new_source)
        .map_err(|e| ValidationError::AstParseFailed(e.to_string()))?;
    let violations = walk(&file);
    if violations.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::UnsafeCode(violations))
    }
}

/// Walk a parsed file and collect every violation.
pub fn walk(file: &syn::File) -> Vec<Violation> {
    let mut visitor = SafetyVisitor::default();
    visitor.visit_file(file);
    visitor.violations
}

#[derive(Default)]
struct SafetyVisitor {
    violations: Vec<Violation>,
}

impl SafetyVisitor {
    fn flag(&mut self, violation: Violation) {
        if !self.violations.contains(&violation) {
            self.violations.push(violation);
        }
    }

    fn check_path(&mut self, path: &syn::Path) {
        for segment in &path.segments {
            let name = segment.ident.to_string();
            if BANNED_RUNTIME_SEGMENTS.contains(&name.as_str()) {
                self.flag(Violation::BannedRuntime(name));
            }
        }
        if path.segments.len() > 1 {
            let root = path.segments[0].ident.to_string();
            let module_like = root
                .chars()
                .next()
                .map(|c| c.is_ascii_lowercase())
                .unwrap_or(false);
            if module_like && !ALLOWED_PATH_ROOTS.contains(&root.as_str()) {
                self.flag(Violation::DisallowedModule(root));
            }
        }
    }

    fn check_call_name(&mut self, name: &str) {
        if BANNED_FUNCTIONS.contains(&name) {
            self.flag(Violation::BannedFunction(name.to_string()));
        }
    }
}

impl SafetyVisitor {
    /// Use declarations carry their own tree type; flatten it to the same
    /// checks a path gets.
    fn check_use_tree(&mut self, tree: &syn::UseTree, depth: usize) {
        match tree {
            syn::UseTree::Path(use_path) => {
                let name = use_path.ident.to_string();
                if BANNED_RUNTIME_SEGMENTS.contains(&name.as_str()) {
                    self.flag(Violation::BannedRuntime(name.clone()));
                }
                if depth == 0 {
                    let module_like = name
                        .chars()
                        .next()
                        .map(|c| c.is_ascii_lowercase())
                        .unwrap_or(false);
                    if module_like && !ALLOWED_PATH_ROOTS.contains(&name.as_str()) {
                        self.flag(Violation::DisallowedModule(name));
                    }
                }
                self.check_use_tree(&use_path.tree, depth + 1);
            }
            syn::UseTree::Name(use_name) => {
                let name = use_name.ident.to_string();
                if BANNED_RUNTIME_SEGMENTS.contains(&name.as_str()) {
                    self.flag(Violation::BannedRuntime(name));
                }
            }
            syn::UseTree::Rename(use_rename) => {
                let name = use_rename.ident.to_string();
                if BANNED_RUNTIME_SEGMENTS.contains(&name.as_str()) {
                    self.flag(Violation::BannedRuntime(name));
                }
            }
            syn::UseTree::Glob(_) => {}
            syn::UseTree::Group(group) => {
                for item in &group.items {
                    self.check_use_tree(item, depth);
                }
            }
        }
    }
}

impl<'ast> Visit<'ast> for SafetyVisitor {
    fn visit_path(&mut self, path: &'ast syn::Path) {
        self.check_path(path);
        visit::visit_path(self, path);
    }

    fn visit_item_use(&mut self, item: &'ast syn::ItemUse) {
        self.check_use_tree(&item.tree, 0);
        visit::visit_item_use(self, item);
    }

    fn visit_expr_call(&mut self, call: &'ast syn::ExprCall) {
        if let syn::Expr::Path(expr_path) = call.func.as_ref() {
            if let Some(last) = expr_path.path.segments.last() {
                self.check_call_name(&last.ident.to_string());
            }
        }
        visit::visit_expr_call(self, call);
    }

    fn visit_expr_method_call(&mut self, call: &'ast syn::ExprMethodCall) {
        self.check_call_name(&call.method.to_string());
        visit::visit_expr_method_call(self, call);
    }

    fn visit_expr_unsafe(&mut self, expr: &'ast syn::ExprUnsafe) {
        self.flag(Violation::BannedRuntime("unsafe".into()));
        visit::visit_expr_unsafe(self, expr);
    }

    fn visit_item_fn(&mut self, item: &'ast syn::ItemFn) {
        if item.sig.unsafety.is_some() {
            self.flag(Violation::BannedRuntime("unsafe".into()));
        }
        visit::visit_item_fn(self, item);
    }

    fn visit_item_impl(&mut self, item: &'ast syn::ItemImpl) {
        if item.unsafety.is_some() {
            self.flag(Violation::BannedRuntime("unsafe".into()));
        }
        visit::visit_item_impl(self, item);
    }

    fn visit_item_foreign_mod(&mut self, item: &'ast syn::ItemForeignMod) {
        self.flag(Violation::BannedRuntime("extern".into()));
        visit::visit_item_foreign_mod(self, item);
    }

    fn visit_macro(&mut self, mac: &'ast syn::Macro) {
        if let Some(last) = mac.path.segments.last() {
            let name = last.ident.to_string();
            if BANNED_MACROS.contains(&name.as_str()) {
                self.flag(Violation::BannedFunction(format!("{name}!")));
            }
        }
        visit::visit_macro(self, mac);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn violations_of(source: &str) -> Vec<Violation> {
        match ast_gate(source) {
            Ok(()) => Vec::new(),
            Err(ValidationError::UnsafeCode(v)) => v,
            Err(other) => panic!("unexpected: {other}"),
        }
    }

    #[test]
    fn clean_code_passes() {
        let source = r#"
            pub fn shape(input: &str) -> String {
                let mut out = String::with_capacity(input.len());
                for word in input.split_whitespace() {
                    out.push_str(word);
                }
                out
            }
        "#;
        assert!(ast_gate(source).is_ok());
    }

    #[test]
    fn unparseable_source_is_parse_failed() {
        assert!(matches!(
            ast_gate("pub fn broken( {"),
            Err(ValidationError::AstParseFailed(_))
        ));
    }

    #[test]
    fn shell_execution_is_flagged() {
        let source = r#"
            pub fn run() {
                std::process::Command::new("rm").arg("-rf").arg("/").status().ok();
            }
        "#;
        let violations = violations_of(source);
        assert!(violations.contains(&Violation::BannedRuntime("process".into())));
        assert!(violations.contains(&Violation::BannedRuntime("Command".into())));
    }

    #[test]
    fn imported_command_still_flagged() {
        // The import names the runtime module; the later call names the type.
        let source = r#"
            use std::process::Command;
            pub fn run() {
                Command::new("sh");
            }
        "#;
        let violations = violations_of(source);
        assert!(violations.contains(&Violation::BannedRuntime("process".into())));
        assert!(violations.contains(&Violation::BannedRuntime("Command".into())));
    }

    #[test]
    fn filesystem_access_is_flagged() {
        let source = r#"
            pub fn wipe() {
                std::fs::remove_file("/etc/passwd").ok();
            }
        "#;
        assert!(violations_of(source).contains(&Violation::BannedRuntime("fs".into())));
    }

    #[test]
    fn spawn_is_banned_wherever_it_appears() {
        let source = r#"
            pub fn go() {
                std::thread::spawn(|| {});
            }
        "#;
        assert!(violations_of(source).contains(&Violation::BannedFunction("spawn".into())));
    }

    #[test]
    fn bare_banned_call_is_flagged() {
        let source = r#"
            pub fn go() {
                spawn(|| {});
            }
        "#;
        assert!(violations_of(source).contains(&Violation::BannedFunction("spawn".into())));
    }

    #[test]
    fn banned_method_call_is_flagged() {
        let source = r#"
            pub fn go(pool: Pool) {
                pool.spawn(|| {});
            }
        "#;
        assert!(violations_of(source).contains(&Violation::BannedFunction("spawn".into())));
    }

    #[test]
    fn transmute_is_flagged() {
        let source = r#"
            pub fn cast(x: u32) -> i32 {
                std::mem::transmute(x)
            }
        "#;
        assert!(violations_of(source).contains(&Violation::BannedFunction("transmute".into())));
    }

    #[test]
    fn foreign_crate_is_disallowed_module() {
        let source = r#"
            pub fn go() {
                libc::getpid();
            }
        "#;
        let violations = violations_of(source);
        assert!(violations.contains(&Violation::DisallowedModule("libc".into())));
        assert!(violations.contains(&Violation::BannedRuntime("libc".into())));
    }

    #[test]
    fn tokio_is_outside_the_allowlist() {
        let source = r#"
            pub async fn go() {
                tokio::time::sleep(std::time::Duration::from_secs(1)).await;
            }
        "#;
        assert!(violations_of(source).contains(&Violation::DisallowedModule("tokio".into())));
    }

    #[test]
    fn unsafe_block_is_flagged() {
        let source = r#"
            pub fn danger() {
                let x = unsafe { *(0 as *const u8) };
                let _ = x;
            }
        "#;
        assert!(violations_of(source).contains(&Violation::BannedRuntime("unsafe".into())));
    }

    #[test]
    fn extern_block_is_flagged() {
        let source = r#"
            extern "C" {
                fn system(cmd: *const u8) -> i32;
            }
        "#;
        assert!(violations_of(source).contains(&Violation::BannedRuntime("extern".into())));
    }

    #[test]
    fn include_macro_is_flagged() {
        let source = r#"
            pub fn text() -> &'static str {
                include_str!("/etc/passwd")
            }
        "#;
        assert!(violations_of(source).contains(&Violation::BannedFunction("include_str!".into())));
    }

    #[test]
    fn foreign_import_is_flagged() {
        let source = r#"
            use rand::Rng;
            pub fn f() {}
        "#;
        assert!(violations_of(source).contains(&Violation::DisallowedModule("rand".into())));
    }

    #[test]
    fn std_collection_import_passes() {
        let source = r#"
            use std::collections::BTreeMap;
            pub fn f() -> BTreeMap<String, u64> {
                BTreeMap::new()
            }
        "#;
        assert!(ast_gate(source).is_ok());
    }

    #[test]
    fn grouped_import_of_runtime_module_is_flagged() {
        let source = r#"
            use std::{collections::HashMap, fs};
            pub fn f() {}
        "#;
        assert!(violations_of(source).contains(&Violation::BannedRuntime("fs".into())));
    }

    #[test]
    fn type_paths_are_not_disallowed_modules() {
        let source = r#"
            pub fn build() -> Vec<String> {
                let mut v = Vec::new();
                v.push(String::from("ok"));
                v
            }
        "#;
        assert!(ast_gate(source).is_ok());
    }

    #[test]
    fn violations_are_deduplicated() {
        let source = r#"
            pub fn go() {
                spawn(|| {});
                spawn(|| {});
            }
        "#;
        let violations = violations_of(source);
        assert_eq!(
            violations
                .iter()
                .filter(|v| **v == Violation::BannedFunction("spawn".into()))
                .count(),
            1
        );
    }
}
