//! Meta, default export and stories in the compiled JS module.

use std::ops::Range;

use swc_core::common::Spanned;
use swc_core::ecma::{
    ast::*,
    visit::{Visit, VisitWith},
};
use tracing::debug;

use crate::error::{CsfError, Result};
use crate::extract::shape::{static_key, ObjectShape};
use crate::extract::{find_define_meta, is_call_to, story_local_name};
use crate::options::PluginOptions;
use crate::parse::ParsedModule;
use crate::walker::{collect_aliases, AliasTable, DEFINE_META};

pub const META_BINDING: &str = "meta";

#[derive(Debug)]
pub struct CompiledMeta<'a> {
    pub call: &'a CallExpr,
    pub pattern: &'a ObjectPat,
    pub pattern_range: Range<usize>,
    pub argument: ObjectShape,
    /// Local `meta` is already destructured as, if it is.
    pub meta_local: Option<String>,
    /// Offset a new pattern property goes to, and whether it needs a
    /// separating comma.
    pub pattern_insert: (usize, PatternInsert),
    pub story_local: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternInsert {
    /// `{}`: text goes before the closing brace.
    Empty,
    /// After the last property.
    AfterLast,
    /// Before a trailing rest element.
    BeforeRest,
}

/// `export default function Name(...) { ... }`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefaultExport {
    pub range: Range<usize>,
    /// Where the exported declaration starts, i.e. the end of the
    /// `export default ` prefix.
    pub declaration_start: usize,
    pub function_name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CompiledStory {
    pub name: Option<String>,
    pub props: ObjectShape,
    pub start: usize,
    pub end: usize,
}

#[derive(Debug)]
pub struct CompiledNodes<'a> {
    pub aliases: AliasTable,
    pub meta: CompiledMeta<'a>,
    pub default_export: DefaultExport,
    pub stories: Vec<CompiledStory>,
}

pub fn extract_compiled_nodes<'a>(
    parsed: &'a ParsedModule,
    filename: &str,
    options: &PluginOptions,
) -> Result<CompiledNodes<'a>> {
    let module = parsed.module();
    let aliases = collect_aliases(module, options);

    if imports_from(module, &options.runtime_module) {
        return Err(CsfError::AlreadyTransformed {
            filename: filename.to_string(),
        });
    }

    let default_decl = find_default_export(&module.body, filename)?;
    let meta = extract_meta(parsed, &aliases, filename)?;

    let DefaultDecl::Fn(fn_expr) = &default_decl.decl else {
        return Err(CsfError::unexpected(
            filename,
            "the default export is expected to be the compiled component function",
        ));
    };
    let body = fn_expr.function.body.as_ref().ok_or_else(|| {
        CsfError::unexpected(filename, "the compiled component function has no body")
    })?;

    let stories = collect_story_calls(parsed, body, &meta.story_local, filename)?;
    let default_export = DefaultExport {
        range: parsed.range(default_decl.span),
        declaration_start: parsed.offset(fn_expr.function.span.lo),
        function_name: fn_expr.ident.as_ref().map(|i| i.sym.to_string()),
    };
    debug!(filename, stories = stories.len(), "extracted compiled stories");

    Ok(CompiledNodes {
        aliases,
        meta,
        default_export,
        stories,
    })
}

fn imports_from(module: &Module, source: &str) -> bool {
    module.body.iter().any(|item| {
        matches!(item, ModuleItem::ModuleDecl(ModuleDecl::Import(import)) if &*import.src.value == source)
    })
}

/// The single `export default` of the module.
pub(crate) fn find_default_export<'a>(
    items: &'a [ModuleItem],
    filename: &str,
) -> Result<&'a ExportDefaultDecl> {
    let mut decls = Vec::new();
    let mut count = 0;
    for item in items {
        let ModuleItem::ModuleDecl(decl) = item else {
            continue;
        };
        match decl {
            ModuleDecl::ExportDefaultDecl(d) => {
                count += 1;
                decls.push(d);
            }
            ModuleDecl::ExportDefaultExpr(_) => count += 1,
            ModuleDecl::ExportNamed(named) => {
                count += named
                    .specifiers
                    .iter()
                    .filter(|s| exports_as_default(s))
                    .count();
            }
            _ => {}
        }
    }

    match count {
        0 => Err(CsfError::MissingDefaultExport {
            filename: filename.to_string(),
        }),
        1 => decls.pop().ok_or_else(|| {
            CsfError::unexpected(
                filename,
                "the default export is expected to be a function declaration",
            )
        }),
        count => Err(CsfError::MultipleDefaultExports {
            filename: filename.to_string(),
            count,
        }),
    }
}

fn exports_as_default(specifier: &ExportSpecifier) -> bool {
    let name = match specifier {
        ExportSpecifier::Named(named) => named.exported.as_ref().unwrap_or(&named.orig),
        ExportSpecifier::Default(_) => return false,
        ExportSpecifier::Namespace(ns) => &ns.name,
    };
    match name {
        ModuleExportName::Ident(ident) => &*ident.sym == "default",
        ModuleExportName::Str(s) => &*s.value == "default",
    }
}

fn extract_meta<'a>(
    parsed: &'a ParsedModule,
    aliases: &AliasTable,
    filename: &str,
) -> Result<CompiledMeta<'a>> {
    let decl = find_define_meta(parsed.module(), aliases.resolve(DEFINE_META)).ok_or_else(|| {
        CsfError::MissingMetaDeclaration {
            filename: filename.to_string(),
        }
    })?;

    let argument = match decl.call.args.first() {
        Some(ExprOrSpread { spread: None, expr }) => match &**expr {
            Expr::Object(obj) => ObjectShape::from_lit(obj, parsed),
            _ => {
                return Err(CsfError::unexpected(
                    filename,
                    "defineMeta must be called with an object literal",
                ))
            }
        },
        _ => {
            return Err(CsfError::unexpected(
                filename,
                "defineMeta must be called with an object literal",
            ))
        }
    };

    let Pat::Object(pattern) = &decl.declarator.name else {
        return Err(CsfError::unexpected(
            filename,
            "the result of defineMeta must be destructured, e.g. `const { Story } = defineMeta(...)`",
        ));
    };

    Ok(CompiledMeta {
        call: decl.call,
        pattern,
        pattern_range: parsed.range(pattern.span),
        argument,
        meta_local: pattern_binding(pattern, META_BINDING),
        pattern_insert: pattern_insert_point(pattern, parsed),
        story_local: story_local_name(&decl.declarator.name, aliases),
    })
}

fn pattern_binding(pattern: &ObjectPat, key: &str) -> Option<String> {
    pattern.props.iter().find_map(|prop| match prop {
        ObjectPatProp::KeyValue(kv) if static_key(&kv.key).as_deref() == Some(key) => {
            match &*kv.value {
                Pat::Ident(binding) => Some(binding.id.sym.to_string()),
                _ => None,
            }
        }
        ObjectPatProp::Assign(assign) if &*assign.key.id.sym == key => Some(key.to_string()),
        _ => None,
    })
}

fn pattern_insert_point(pattern: &ObjectPat, parsed: &ParsedModule) -> (usize, PatternInsert) {
    match pattern.props.last() {
        None => (parsed.offset(pattern.span.hi) - 1, PatternInsert::Empty),
        Some(ObjectPatProp::Rest(rest)) => (parsed.offset(rest.span.lo), PatternInsert::BeforeRest),
        Some(last) => (parsed.offset(last.span().hi), PatternInsert::AfterLast),
    }
}

// -----------------------------------------------------------------------------
// Story calls
// -----------------------------------------------------------------------------

struct StoryCalls<'p> {
    parsed: &'p ParsedModule,
    callee: &'p str,
    filename: &'p str,
    found: Vec<CompiledStory>,
    error: Option<CsfError>,
}

impl Visit for StoryCalls<'_> {
    fn visit_call_expr(&mut self, n: &CallExpr) {
        if self.error.is_some() {
            return;
        }
        if !is_call_to(n, self.callee) {
            n.visit_children_with(self);
            return;
        }

        // Story(anchor, { ...props })
        let props = match n.args.get(1) {
            Some(ExprOrSpread { spread: None, expr }) => match &**expr {
                Expr::Object(props) => Some(props),
                _ => None,
            },
            _ => None,
        };
        let Some(props) = props else {
            let at = self.parsed.offset(n.span.lo);
            self.error = Some(CsfError::unexpected(
                self.filename,
                format!(
                    "`{}` call at offset {at} doesn't pass its props as an object literal",
                    self.callee
                ),
            ));
            return;
        };

        let props = ObjectShape::from_lit(props, self.parsed);
        let range = self.parsed.range(n.span);
        self.found.push(CompiledStory {
            name: props.string("name").map(str::to_string),
            props,
            start: range.start,
            end: range.end,
        });
    }
}

fn collect_story_calls(
    parsed: &ParsedModule,
    body: &BlockStmt,
    callee: &str,
    filename: &str,
) -> Result<Vec<CompiledStory>> {
    let mut visitor = StoryCalls {
        parsed,
        callee,
        filename,
        found: Vec::new(),
        error: None,
    };
    body.visit_with(&mut visitor);
    match visitor.error {
        Some(err) => Err(err),
        None => Ok(visitor.found),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::ScriptLang;

    fn parse(code: &str) -> ParsedModule {
        ParsedModule::parse("Test.stories.svelte", code, ScriptLang::JavaScript).unwrap()
    }

    const COMPILED: &str = r#"import { defineMeta } from "@storybook/addon-svelte-csf";
const { Story } = defineMeta({ title: "T" });
export default function Test_stories($$anchor) {
	Story(node, { name: "A" });
	$.if(node_1, () => {
		Story(node_2, { name: "B", children: ($$anchor) => { inner($$anchor); } });
	});
	Story(node_3, { exportName: "C" });
}
"#;

    #[test]
    fn finds_stories_in_document_order() {
        let parsed = parse(COMPILED);
        let nodes = extract_compiled_nodes(&parsed, "Test.stories.svelte", &PluginOptions::default())
            .unwrap();
        let names: Vec<_> = nodes.stories.iter().map(|s| s.name.as_deref()).collect();
        assert_eq!(names, [Some("A"), Some("B"), None]);
        assert!(nodes.stories.windows(2).all(|w| w[0].end <= w[1].start));

        assert_eq!(nodes.meta.story_local, "Story");
        assert_eq!(nodes.meta.meta_local, None);
        assert_eq!(nodes.meta.pattern_insert.1, PatternInsert::AfterLast);
        assert_eq!(&COMPILED[nodes.meta.pattern_range.clone()], "{ Story }");
        assert_eq!(nodes.default_export.function_name.as_deref(), Some("Test_stories"));
        assert_eq!(
            &COMPILED[nodes.default_export.range.start..nodes.default_export.declaration_start],
            "export default "
        );
    }

    #[test]
    fn two_default_exports_are_rejected() {
        let mut first = parse("export default function A() {}").module().clone();
        let second = parse("export default function B() {}").module().clone();
        first.body.extend(second.body);

        let err = find_default_export(&first.body, "x.stories.svelte").unwrap_err();
        assert!(matches!(err, CsfError::MultipleDefaultExports { count: 2, .. }));
    }

    #[test]
    fn named_default_export_counts_towards_the_limit() {
        let mut module = parse("function A() {}\nexport { A as default };").module().clone();
        module.body.extend(parse("export default 1;").module().clone().body);
        let err = find_default_export(&module.body, "x.stories.svelte").unwrap_err();
        assert!(matches!(err, CsfError::MultipleDefaultExports { count: 2, .. }));
    }

    #[test]
    fn missing_default_export() {
        let module = parse("export const a = 1;").module().clone();
        let err = find_default_export(&module.body, "x.stories.svelte").unwrap_err();
        assert!(matches!(err, CsfError::MissingDefaultExport { .. }));
    }

    #[test]
    fn aliased_define_meta_and_story_are_resolved() {
        let parsed = parse(
            r#"import { defineMeta as m } from "@storybook/addon-svelte-csf";
const { Story: S, meta: M, ...rest } = m({});
export default function X() { S(a, { name: "One" }); Story(b, { name: "ignored" }); }
"#,
        );
        let nodes = extract_compiled_nodes(&parsed, "X.stories.svelte", &PluginOptions::default())
            .unwrap();
        assert_eq!(nodes.aliases.get(DEFINE_META), Some("m"));
        assert_eq!(nodes.meta.story_local, "S");
        assert_eq!(nodes.meta.meta_local.as_deref(), Some("M"));
        assert_eq!(nodes.meta.pattern_insert.1, PatternInsert::BeforeRest);
        assert_eq!(nodes.stories.len(), 1);
        assert_eq!(nodes.stories[0].name.as_deref(), Some("One"));
    }

    #[test]
    fn spread_props_fail_fast() {
        let parsed = parse(
            r#"import { defineMeta } from "@storybook/addon-svelte-csf";
const { Story } = defineMeta({});
export default function X() { Story(a, $.spread_props(p)); }
"#,
        );
        let err = extract_compiled_nodes(&parsed, "X.stories.svelte", &PluginOptions::default())
            .unwrap_err();
        assert!(matches!(err, CsfError::UnexpectedNode { .. }));
    }

    #[test]
    fn runtime_import_marks_an_already_transformed_module() {
        let parsed = parse(&format!(
            "import {{ createRuntimeStories }} from \"{}\";\nexport default function X() {{}}",
            crate::options::DEFAULT_RUNTIME_MODULE
        ));
        let err = extract_compiled_nodes(&parsed, "X.stories.svelte", &PluginOptions::default())
            .unwrap_err();
        assert!(matches!(err, CsfError::AlreadyTransformed { .. }));
    }
}
