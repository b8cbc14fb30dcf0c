//! A tiny `.stories.svelte` scanner standing in for the Svelte compiler's
//! parser. It only understands what the fixtures use: `<script>` blocks,
//! HTML comments, capitalized component elements with plain, `{"literal"}`,
//! ``{`template`}`` or bare attributes, and text.

#![allow(dead_code)]

use serde_json::json;
use svelte_csf_swc::svelte::{
    Attribute, AttributeNode, AttributeValue, Children, Comment, Component, ExpressionTag,
    NodeRange, Script, Text, TemplateNode, ValuePart,
};
use svelte_csf_swc::{Preprocessor, Result, Root, TemplateParser};

pub struct Scanner;

impl TemplateParser for Scanner {
    fn parse(&self, code: &str, _filename: &str) -> Result<Root> {
        Ok(scan(code))
    }
}

/// Replaces every `from` with `to` in the raw source.
pub struct Replace(pub &'static str, pub &'static str);

impl Preprocessor for Replace {
    fn preprocess(&self, code: &str, _filename: &str) -> Result<String> {
        Ok(code.replace(self.0, self.1))
    }
}

pub fn scan(code: &str) -> Root {
    let mut root = Root::default();
    let mut pos = 0;
    let mut text_start = 0;

    while pos < code.len() {
        let rest = &code[pos..];
        if rest.starts_with("<script") {
            push_text(&mut root, code, text_start, pos);
            let end = pos + rest.find("</script>").expect("unclosed script") + "</script>".len();
            let (attributes, _) = scan_attributes(code, pos + "<script".len());
            let is_module = attributes.iter().any(|a| match a {
                AttributeNode::Attribute(attr) => {
                    attr.name == "module"
                        || (attr.name == "context" && text_value(&attr.value) == Some("module"))
                }
                AttributeNode::Other => false,
            });
            let script = Script {
                start: pos,
                end,
                context: if is_module { "module" } else { "default" }.to_string(),
                attributes,
            };
            if is_module {
                root.module = Some(script);
            } else {
                root.instance = Some(script);
            }
            pos = end;
            text_start = pos;
        } else if rest.starts_with("<!--") {
            push_text(&mut root, code, text_start, pos);
            let end = pos + rest.find("-->").expect("unclosed comment") + "-->".len();
            root.fragment.nodes.push(TemplateNode::Comment(Comment {
                start: pos,
                end,
                data: code[pos + 4..end - 3].to_string(),
            }));
            pos = end;
            text_start = pos;
        } else if rest.starts_with('<') && rest[1..].starts_with(|c: char| c.is_ascii_uppercase()) {
            push_text(&mut root, code, text_start, pos);
            let component = scan_component(code, pos);
            pos = component.end;
            text_start = pos;
            root.fragment.nodes.push(TemplateNode::Component(component));
        } else {
            pos += rest.chars().next().map_or(1, char::len_utf8);
        }
    }
    push_text(&mut root, code, text_start, code.len());
    root
}

fn push_text(root: &mut Root, code: &str, start: usize, end: usize) {
    if start < end {
        root.fragment.nodes.push(TemplateNode::Text(Text {
            start,
            end,
            data: code[start..end].to_string(),
        }));
    }
}

fn scan_component(code: &str, start: usize) -> Component {
    let name_start = start + 1;
    let name_len = code[name_start..]
        .find(|c: char| c.is_whitespace() || c == '/' || c == '>')
        .expect("unterminated tag");
    let name = code[name_start..name_start + name_len].to_string();

    let (attributes, open_end) = scan_attributes(code, name_start + name_len);
    let mut children = Children::default();
    let end = if code[..open_end].ends_with("/>") {
        open_end
    } else {
        let closing = format!("</{name}>");
        let close = open_end + code[open_end..].find(&closing).expect("unclosed component");
        // The whole inner markup stands in for the child nodes.
        if close > open_end {
            children.nodes.push(NodeRange {
                start: open_end,
                end: close,
            });
        }
        close + closing.len()
    };

    Component {
        start,
        end,
        name,
        attributes,
        fragment: Some(children),
    }
}

/// Attributes from `pos` up to the end of the tag. Returns them with the
/// offset just past the tag's `>`.
fn scan_attributes(code: &str, mut pos: usize) -> (Vec<AttributeNode>, usize) {
    let bytes = code.as_bytes();
    let mut attributes = Vec::new();
    loop {
        while bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }
        match bytes[pos] {
            b'>' => return (attributes, pos + 1),
            b'/' if bytes[pos + 1] == b'>' => return (attributes, pos + 2),
            _ => {}
        }

        let start = pos;
        while !matches!(bytes[pos], b'=' | b'>' | b'/') && !bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }
        let name = code[start..pos].to_string();

        let value = if bytes[pos] == b'=' {
            pos += 1;
            match bytes[pos] {
                b'"' => {
                    let value_end = pos + 1 + code[pos + 1..].find('"').expect("unclosed value");
                    let part = ValuePart::Text(Text {
                        start: pos + 1,
                        end: value_end,
                        data: code[pos + 1..value_end].to_string(),
                    });
                    pos = value_end + 1;
                    AttributeValue::Sequence(vec![part])
                }
                b'{' => {
                    let value_end = pos + code[pos..].find('}').expect("unclosed expression");
                    let source = code[pos + 1..value_end].trim();
                    let template = source
                        .strip_prefix('`')
                        .and_then(|s| s.strip_suffix('`'))
                        .filter(|raw| !raw.contains("${"));
                    let expression = match (template, serde_json::from_str::<String>(source)) {
                        (Some(raw), _) => json!({
                            "type": "TemplateLiteral",
                            "expressions": [],
                            "quasis": [{ "type": "TemplateElement", "tail": true,
                                         "value": { "raw": raw, "cooked": raw } }]
                        }),
                        (None, Ok(value)) => json!({ "type": "Literal", "value": value, "raw": source }),
                        (None, Err(_)) => json!({ "type": "Identifier", "name": source }),
                    };
                    let tag = ExpressionTag {
                        start: pos,
                        end: value_end + 1,
                        expression,
                    };
                    pos = value_end + 1;
                    AttributeValue::Expression(ValuePart::ExpressionTag(tag))
                }
                other => panic!("unsupported attribute value starting with {:?}", other as char),
            }
        } else {
            AttributeValue::Bool(true)
        };

        attributes.push(AttributeNode::Attribute(Attribute {
            start,
            end: pos,
            name,
            value,
        }));
    }
}

fn text_value(value: &AttributeValue) -> Option<&str> {
    match value {
        AttributeValue::Sequence(parts) => match parts.as_slice() {
            [ValuePart::Text(text)] => Some(&text.data),
            _ => None,
        },
        _ => None,
    }
}
