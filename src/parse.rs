//! Thin wrapper around the swc parser that keeps the comments and maps spans
//! back to byte offsets of the text that was parsed.

use std::ops::Range;

use swc_core::{
    common::{
        comments::{CommentKind, Comments, SingleThreadedComments},
        sync::Lrc,
        BytePos, FileName, SourceFile, SourceMap, Span,
    },
    ecma::{
        ast::{EsVersion, Module},
        parser::{parse_file_as_module, EsSyntax, Syntax, TsSyntax},
    },
};
use tracing::warn;

use crate::error::{CsfError, Result};

/// JS or TS flavour of a script block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScriptLang {
    #[default]
    JavaScript,
    TypeScript,
}

impl ScriptLang {
    fn syntax(self) -> Syntax {
        match self {
            ScriptLang::JavaScript => Syntax::Es(EsSyntax::default()),
            ScriptLang::TypeScript => Syntax::Typescript(TsSyntax::default()),
        }
    }
}

/// A JSDoc block comment together with its offsets in the parsed text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocComment {
    pub text: String,
    pub range: Range<usize>,
}

pub struct ParsedModule {
    file: Lrc<SourceFile>,
    module: Module,
    comments: SingleThreadedComments,
}

impl ParsedModule {
    pub fn parse(filename: &str, code: &str, lang: ScriptLang) -> Result<Self> {
        let cm: Lrc<SourceMap> = Default::default();
        let file = cm.new_source_file(
            Lrc::new(FileName::Custom(filename.to_string())),
            code.to_string(),
        );
        let comments = SingleThreadedComments::default();
        let mut recovered = Vec::new();

        let module = parse_file_as_module(
            &file,
            lang.syntax(),
            EsVersion::latest(),
            Some(&comments),
            &mut recovered,
        )
        .map_err(|err| CsfError::Parse {
            filename: filename.to_string(),
            message: format!("{:?}", err.kind()),
        })?;

        for err in &recovered {
            warn!(filename, error = ?err.kind(), "recovered from parse error");
        }

        Ok(Self {
            file,
            module,
            comments,
        })
    }

    pub fn module(&self) -> &Module {
        &self.module
    }

    pub fn source(&self) -> &str {
        &self.file.src
    }

    pub fn offset(&self, pos: BytePos) -> usize {
        (pos.0 - self.file.start_pos.0) as usize
    }

    pub fn range(&self, span: Span) -> Range<usize> {
        self.offset(span.lo)..self.offset(span.hi)
    }

    pub fn text(&self, span: Span) -> &str {
        &self.source()[self.range(span)]
    }

    /// The closest `/** ... */` comment leading the node starting at `pos`.
    pub fn jsdoc_for(&self, pos: BytePos) -> Option<DocComment> {
        let leading = self.comments.get_leading(pos)?;
        let comment = leading
            .iter()
            .rev()
            .find(|c| c.kind == CommentKind::Block && c.text.starts_with('*'))?;

        Some(DocComment {
            text: crate::names::clean_jsdoc(&comment.text),
            range: self.range(comment.span),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use swc_core::common::Spanned;

    #[test]
    fn offsets_are_relative_to_the_parsed_text() {
        let parsed =
            ParsedModule::parse("a.js", "const a = 1;\nconst b = 2;", ScriptLang::JavaScript)
                .unwrap();
        let second = &parsed.module().body[1];
        assert_eq!(parsed.range(second.span()), 13..25);
        assert_eq!(parsed.text(second.span()), "const b = 2;");
    }

    #[test]
    fn finds_the_jsdoc_comment_before_a_statement() {
        let code = "// plain\n/**\n * Hello\n * world\n */\nconst a = 1;";
        let parsed = ParsedModule::parse("a.js", code, ScriptLang::JavaScript).unwrap();
        let stmt = &parsed.module().body[0];
        let doc = parsed.jsdoc_for(stmt.span().lo).unwrap();
        assert_eq!(doc.text, "Hello\nworld");
        assert_eq!(&code[doc.range.clone()], "/**\n * Hello\n * world\n */");
    }

    #[test]
    fn typescript_scripts_parse_with_ts_syntax() {
        let code = "const a: number = 1;\nexport type A = string;";
        let parsed = ParsedModule::parse("a.ts", code, ScriptLang::TypeScript).unwrap();
        assert_eq!(parsed.module().body.len(), 2);
    }

    #[test]
    fn syntax_errors_surface_as_parse_errors() {
        let err = ParsedModule::parse("bad.js", "const = ;", ScriptLang::JavaScript)
            .err()
            .unwrap();
        assert!(matches!(err, CsfError::Parse { ref filename, .. } if filename == "bad.js"));
    }
}
