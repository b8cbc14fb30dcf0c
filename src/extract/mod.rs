//! Story and meta extraction from the template tree and the compiled module.

pub mod compiled;
pub mod shape;
pub mod svelte;

pub use compiled::{extract_compiled_nodes, CompiledMeta, CompiledNodes, CompiledStory, DefaultExport};
pub use shape::{ObjectShape, PropShape, PropValue};
pub use svelte::{extract_svelte_nodes, HtmlComment, SvelteMeta, SvelteNodes, SvelteStory};

use swc_core::common::Span;
use swc_core::ecma::ast::*;

use crate::walker::{AliasTable, STORY};

/// A top-level `const { ... } = defineMeta(...)` declaration.
pub(crate) struct DefineMetaDecl<'m> {
    pub stmt_span: Span,
    pub declarator: &'m VarDeclarator,
    pub call: &'m CallExpr,
}

pub(crate) fn find_define_meta<'m>(module: &'m Module, callee: &str) -> Option<DefineMetaDecl<'m>> {
    for item in &module.body {
        let (stmt_span, var) = match item {
            ModuleItem::Stmt(Stmt::Decl(Decl::Var(var))) => (var.span, var),
            ModuleItem::ModuleDecl(ModuleDecl::ExportDecl(ExportDecl {
                span,
                decl: Decl::Var(var),
            })) => (*span, var),
            _ => continue,
        };
        for declarator in &var.decls {
            if let Some(Expr::Call(call)) = declarator.init.as_deref() {
                if is_call_to(call, callee) {
                    return Some(DefineMetaDecl {
                        stmt_span,
                        declarator,
                        call,
                    });
                }
            }
        }
    }
    None
}

pub(crate) fn is_call_to(call: &CallExpr, callee: &str) -> bool {
    match &call.callee {
        Callee::Expr(expr) => matches!(&**expr, Expr::Ident(id) if &*id.sym == callee),
        _ => false,
    }
}

/// Local name the `Story` component is bound to by the meta destructuring,
/// e.g. `const { Story: S } = defineMeta(...)` -> `S`.
pub(crate) fn story_local_name(pattern: &Pat, aliases: &AliasTable) -> String {
    if let Pat::Object(obj) = pattern {
        for prop in &obj.props {
            match prop {
                ObjectPatProp::KeyValue(kv) if shape::static_key(&kv.key).as_deref() == Some(STORY) => {
                    if let Pat::Ident(binding) = &*kv.value {
                        return binding.id.sym.to_string();
                    }
                }
                ObjectPatProp::Assign(assign) if &*assign.key.id.sym == STORY => {
                    return STORY.to_string();
                }
                _ => {}
            }
        }
    }
    aliases.resolve(STORY).to_string()
}
