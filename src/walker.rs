//! Resolves the local names a module imports the addon API under.
//!
//! Only top-level import declarations are inspected. The visitor never
//! descends into statements or exports, and once an import declaration is
//! classified its specifiers are handled in place.

use std::collections::HashMap;

use swc_core::ecma::{
    ast::*,
    visit::{Visit, VisitWith},
};
use tracing::debug;

use crate::options::PluginOptions;

pub const DEFINE_META: &str = "defineMeta";
pub const SET_TEMPLATE: &str = "setTemplate";
pub const STORY: &str = "Story";

/// Exports of the addon package recognized under an alias.
pub const ADDON_EXPORTS: [&str; 3] = [DEFINE_META, SET_TEMPLATE, STORY];

/// Canonical addon export name -> local identifier.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AliasTable {
    aliases: HashMap<&'static str, String>,
}

impl AliasTable {
    pub fn get(&self, canonical: &str) -> Option<&str> {
        self.aliases.get(canonical).map(String::as_str)
    }

    /// Local name for `canonical`, falling back to the canonical name itself.
    pub fn resolve<'a>(&'a self, canonical: &'a str) -> &'a str {
        self.get(canonical).unwrap_or(canonical)
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }

    pub fn len(&self) -> usize {
        self.aliases.len()
    }
}

/// Walk `module`'s top-level imports and collect the addon aliases.
pub fn collect_aliases(module: &Module, options: &PluginOptions) -> AliasTable {
    let mut walker = AliasWalker {
        options,
        table: AliasTable::default(),
    };
    module.visit_with(&mut walker);
    debug!(aliases = walker.table.len(), "resolved addon imports");
    walker.table
}

struct AliasWalker<'a> {
    options: &'a PluginOptions,
    table: AliasTable,
}

impl Visit for AliasWalker<'_> {
    fn visit_module_decl(&mut self, n: &ModuleDecl) {
        if let ModuleDecl::Import(import) = n {
            self.visit_import_decl(import);
        }
    }

    // Imports only live at the top level.
    fn visit_stmt(&mut self, _: &Stmt) {}

    fn visit_import_decl(&mut self, n: &ImportDecl) {
        if n.type_only || !self.options.is_addon_source(&n.src.value) {
            return;
        }
        for specifier in &n.specifiers {
            if let ImportSpecifier::Named(named) = specifier {
                self.visit_import_named_specifier(named);
            }
        }
    }

    fn visit_import_named_specifier(&mut self, n: &ImportNamedSpecifier) {
        if n.is_type_only {
            return;
        }
        let imported = match &n.imported {
            Some(ModuleExportName::Ident(ident)) => ident.sym.to_string(),
            Some(ModuleExportName::Str(s)) => s.value.to_string(),
            None => n.local.sym.to_string(),
        };
        if let Some(&canonical) = ADDON_EXPORTS.iter().find(|name| **name == imported) {
            self.table
                .aliases
                .insert(canonical, n.local.sym.to_string());
        }
    }
}
