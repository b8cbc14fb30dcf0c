//! The subset of Svelte's modern template AST this crate reads, and the
//! collaborator interfaces standing in for the Svelte compiler.
//!
//! Field names follow the JSON that `svelte/compiler`'s `parse(code, { modern: true })`
//! emits. Offsets are byte offsets into the (preprocessed) source text. The
//! compiler counts UTF-16 code units instead; [`JsonAst`] converts its
//! offsets with [`Root::into_byte_offsets`].

use std::ops::Range;

use serde::Deserialize;

use crate::error::{CsfError, Result};
use crate::parse::ScriptLang;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Root {
    #[serde(default)]
    pub fragment: Fragment,
    #[serde(default)]
    pub instance: Option<Script>,
    #[serde(default)]
    pub module: Option<Script>,
}

impl Root {
    /// A tree whose offsets are already byte offsets.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Convert offsets counted in UTF-16 code units of `source` to byte
    /// offsets. Fails if an offset is past the end of `source` or splits a
    /// character.
    pub fn into_byte_offsets(mut self, source: &str, filename: &str) -> Result<Self> {
        if source.is_ascii() {
            return Ok(self);
        }
        let offsets = Utf16Offsets::new(source);
        self.remap(&offsets).ok_or_else(|| {
            CsfError::unexpected(filename, "template offsets don't match the source text")
        })?;
        Ok(self)
    }

    fn remap(&mut self, offsets: &Utf16Offsets) -> Option<()> {
        for node in &mut self.fragment.nodes {
            node.remap(offsets)?;
        }
        for script in self.instance.iter_mut().chain(self.module.iter_mut()) {
            offsets.span(&mut script.start, &mut script.end)?;
            remap_attributes(&mut script.attributes, offsets)?;
        }
        Some(())
    }

    /// The script block holding the story file's logic: the module script
    /// when there is one, otherwise the instance script.
    pub fn logic_script(&self) -> Option<&Script> {
        self.module.as_ref().or(self.instance.as_ref())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Fragment {
    #[serde(default)]
    pub nodes: Vec<TemplateNode>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum TemplateNode {
    Comment(Comment),
    Text(Text),
    Component(Component),
    #[serde(other)]
    Other,
}

impl TemplateNode {
    fn remap(&mut self, offsets: &Utf16Offsets) -> Option<()> {
        match self {
            TemplateNode::Comment(Comment { start, end, .. })
            | TemplateNode::Text(Text { start, end, .. }) => offsets.span(start, end),
            TemplateNode::Component(component) => component.remap(offsets),
            TemplateNode::Other => Some(()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Comment {
    pub start: usize,
    pub end: usize,
    pub data: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Text {
    pub start: usize,
    pub end: usize,
    pub data: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Component {
    pub start: usize,
    pub end: usize,
    pub name: String,
    #[serde(default)]
    pub attributes: Vec<AttributeNode>,
    #[serde(default)]
    pub fragment: Option<Children>,
}

/// The child nodes of an element. Only their extent is read.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Children {
    #[serde(default)]
    pub nodes: Vec<NodeRange>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct NodeRange {
    pub start: usize,
    pub end: usize,
}

impl Component {
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find_map(|a| match a {
            AttributeNode::Attribute(attr) if attr.name == name => Some(attr),
            _ => None,
        })
    }

    /// Range from the first child node to the end of the last one. `None`
    /// when the tree carries no children for the element.
    pub fn children_range(&self) -> Option<Range<usize>> {
        let nodes = &self.fragment.as_ref()?.nodes;
        Some(nodes.first()?.start..nodes.last()?.end)
    }

    pub fn is_self_closing(&self, source: &str) -> bool {
        source
            .get(self.start..self.end)
            .is_some_and(|element| element.ends_with("/>"))
    }

    fn remap(&mut self, offsets: &Utf16Offsets) -> Option<()> {
        offsets.span(&mut self.start, &mut self.end)?;
        remap_attributes(&mut self.attributes, offsets)?;
        if let Some(children) = &mut self.fragment {
            for node in &mut children.nodes {
                offsets.span(&mut node.start, &mut node.end)?;
            }
        }
        Some(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum AttributeNode {
    Attribute(Attribute),
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Attribute {
    pub start: usize,
    pub end: usize,
    pub name: String,
    pub value: AttributeValue,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    /// Bare attribute, e.g. `<Story source>`.
    Bool(bool),
    Sequence(Vec<ValuePart>),
    Expression(ValuePart),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum ValuePart {
    Text(Text),
    ExpressionTag(ExpressionTag),
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExpressionTag {
    pub start: usize,
    pub end: usize,
    /// ESTree expression, kept as raw JSON.
    pub expression: serde_json::Value,
}

fn remap_attributes(attributes: &mut [AttributeNode], offsets: &Utf16Offsets) -> Option<()> {
    for node in attributes {
        let AttributeNode::Attribute(attr) = node else {
            continue;
        };
        offsets.span(&mut attr.start, &mut attr.end)?;
        let parts = match &mut attr.value {
            AttributeValue::Bool(_) => continue,
            AttributeValue::Sequence(parts) => parts.as_mut_slice(),
            AttributeValue::Expression(part) => std::slice::from_mut(part),
        };
        for part in parts {
            match part {
                ValuePart::Text(Text { start, end, .. })
                | ValuePart::ExpressionTag(ExpressionTag { start, end, .. }) => {
                    offsets.span(start, end)?
                }
            }
        }
    }
    Some(())
}

impl ExpressionTag {
    /// The value of a string literal or an interpolation-free template literal.
    pub fn static_string(&self) -> Option<String> {
        let expr = &self.expression;
        match expr.get("type")?.as_str()? {
            "Literal" => expr.get("value")?.as_str().map(str::to_string),
            "TemplateLiteral" => {
                let has_interpolation = expr
                    .get("expressions")
                    .and_then(|e| e.as_array())
                    .is_some_and(|e| !e.is_empty());
                if has_interpolation {
                    return None;
                }
                let quasi = expr.get("quasis")?.as_array()?.first()?;
                quasi
                    .get("value")?
                    .get("cooked")?
                    .as_str()
                    .map(str::to_string)
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Script {
    pub start: usize,
    pub end: usize,
    #[serde(default)]
    pub context: String,
    #[serde(default)]
    pub attributes: Vec<AttributeNode>,
}

impl Script {
    /// Range of the code between `<script ...>` and `</script>`.
    pub fn content_range(&self, source: &str) -> Option<Range<usize>> {
        let element = source.get(self.start..self.end)?;
        // Attribute values may contain `>`; the tag ends after the last one.
        let attrs_end = self
            .attributes
            .iter()
            .filter_map(|a| match a {
                AttributeNode::Attribute(attr) => attr.end.checked_sub(self.start),
                AttributeNode::Other => None,
            })
            .max()
            .unwrap_or(0);
        let open = attrs_end + element.get(attrs_end..)?.find('>')? + 1;
        let close = element.rfind("</")?;
        (close >= open).then(|| self.start + open..self.start + close)
    }

    pub fn lang(&self) -> ScriptLang {
        let lang = self.attributes.iter().find_map(|a| match a {
            AttributeNode::Attribute(attr) if attr.name == "lang" => match &attr.value {
                AttributeValue::Sequence(parts) => parts.iter().find_map(|p| match p {
                    ValuePart::Text(t) => Some(t.data.as_str()),
                    ValuePart::ExpressionTag(_) => None,
                }),
                _ => None,
            },
            _ => None,
        });
        match lang {
            Some("ts" | "typescript") => ScriptLang::TypeScript,
            _ => ScriptLang::JavaScript,
        }
    }
}

// -----------------------------------------------------------------------------
// Offset conversion
// -----------------------------------------------------------------------------

/// Byte offset of every UTF-16 code unit index of a text. The second unit
/// of a surrogate pair has none.
struct Utf16Offsets {
    bytes: Vec<Option<usize>>,
}

impl Utf16Offsets {
    fn new(source: &str) -> Self {
        let mut bytes = Vec::with_capacity(source.len() + 1);
        for (at, c) in source.char_indices() {
            bytes.push(Some(at));
            if c.len_utf16() == 2 {
                bytes.push(None);
            }
        }
        bytes.push(Some(source.len()));
        Self { bytes }
    }

    fn byte(&self, unit: usize) -> Option<usize> {
        self.bytes.get(unit).copied().flatten()
    }

    fn span(&self, start: &mut usize, end: &mut usize) -> Option<()> {
        *start = self.byte(*start)?;
        *end = self.byte(*end)?;
        Some(())
    }
}

// -----------------------------------------------------------------------------
// Compiler collaborators
// -----------------------------------------------------------------------------

/// Source preprocessing hook (`svelte.config.js` `preprocess`).
pub trait Preprocessor: Send + Sync {
    fn preprocess(&self, code: &str, filename: &str) -> Result<String>;
}

/// Produces the template tree for a (preprocessed) stories file.
pub trait TemplateParser: Send + Sync {
    fn parse(&self, code: &str, filename: &str) -> Result<Root>;
}

/// A [`TemplateParser`] for hosts that call the Svelte compiler themselves
/// and pass its AST along as JSON, offsets in UTF-16 code units.
#[derive(Debug, Clone)]
pub struct JsonAst(pub String);

impl TemplateParser for JsonAst {
    fn parse(&self, code: &str, filename: &str) -> Result<Root> {
        let root: Root = serde_json::from_str(&self.0).map_err(|e| CsfError::Parse {
            filename: filename.to_string(),
            message: e.to_string(),
        })?;
        root.into_byte_offsets(code, filename)
    }
}
