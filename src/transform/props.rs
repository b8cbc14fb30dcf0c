//! Nested property insertion into object literals of the compiled module.
//!
//! Several passes may add properties below the same object, e.g. both the
//! story description and the relocated `source` live under
//! `parameters.docs`. Patches are collected per object literal and merged,
//! then written to the [`EditBuffer`] in one go, so no key is emitted twice.

use std::collections::BTreeMap;
use std::ops::Range;

use crate::error::{CsfError, Result};
use crate::extract::{ObjectShape, PropValue};
use crate::names::is_identifier;
use crate::splice::EditBuffer;

#[derive(Debug, Clone, PartialEq, Eq)]
enum PatchValue {
    Object(Vec<(String, PatchValue)>),
    /// Already serialized JS expression.
    Literal(String),
}

#[derive(Debug)]
struct ObjectPatch<'s> {
    object: &'s ObjectShape,
    removed: Vec<usize>,
    added: Vec<(String, PatchValue)>,
}

#[derive(Debug, Default)]
pub struct PropertyPatches<'s> {
    objects: BTreeMap<usize, ObjectPatch<'s>>,
}

impl<'s> PropertyPatches<'s> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    fn patch(&mut self, object: &'s ObjectShape) -> &mut ObjectPatch<'s> {
        self.objects
            .entry(object.range.start)
            .or_insert_with(|| ObjectPatch {
                object,
                removed: Vec::new(),
                added: Vec::new(),
            })
    }

    /// Set `path` below `object` to the JS expression `value`, creating the
    /// intermediate objects that don't exist yet. Returns `false` when the
    /// author already set the final key, which is then left alone.
    pub fn set(
        &mut self,
        object: &'s ObjectShape,
        path: &[&str],
        value: String,
        filename: &str,
    ) -> Result<bool> {
        let mut current = object;
        for (depth, key) in path.iter().enumerate() {
            let Some(prop) = current.get(key) else {
                let rest = &path[depth..];
                return Ok(insert(&mut self.patch(current).added, rest, value));
            };
            if depth + 1 == path.len() {
                return Ok(false);
            }
            match &prop.value {
                PropValue::Object(inner) => current = inner,
                _ => {
                    return Err(CsfError::unexpected(
                        filename,
                        format!(
                            "`{}` at offset {} is expected to be an object literal",
                            path[..=depth].join("."),
                            prop.range.start
                        ),
                    ))
                }
            }
        }
        Ok(false)
    }

    /// Drop property `key` from `object`. Returns `false` if there is none.
    pub fn remove(&mut self, object: &'s ObjectShape, key: &str) -> bool {
        let Some(index) = object.position(key) else {
            return false;
        };
        let patch = self.patch(object);
        if !patch.removed.contains(&index) {
            patch.removed.push(index);
        }
        true
    }

    /// Write every collected patch into `buffer`.
    pub fn flush(self, buffer: &mut EditBuffer) -> Result<()> {
        for patch in self.objects.into_values() {
            patch.write(buffer)?;
        }
        Ok(())
    }
}

impl ObjectPatch<'_> {
    fn write(&self, buffer: &mut EditBuffer) -> Result<()> {
        let props = &self.object.props;

        let mut removals: Vec<Range<usize>> = self
            .removed
            .iter()
            .map(|&index| {
                let prop = &props[index];
                match (index.checked_sub(1), props.get(index + 1)) {
                    (_, Some(next)) => prop.range.start..next.range.start,
                    (Some(prev), None) => props[prev].range.end..prop.range.end,
                    (None, None) => prop.range.clone(),
                }
            })
            .collect();
        removals.sort_by_key(|r| r.start);
        let mut merged: Vec<Range<usize>> = Vec::with_capacity(removals.len());
        for range in removals {
            match merged.last_mut() {
                Some(last) if range.start < last.end => last.end = last.end.max(range.end),
                _ => merged.push(range),
            }
        }
        for range in merged {
            buffer.remove(range.start, range.end)?;
        }

        if self.added.is_empty() {
            return Ok(());
        }
        let text = render_entries(&self.added);
        let remaining_last = props
            .iter()
            .enumerate()
            .filter(|(index, _)| !self.removed.contains(index))
            .map(|(_, prop)| prop)
            .last();

        match (remaining_last, props.first()) {
            (Some(last), _) => buffer.insert(last.range.end, format!(", {text}"))?,
            (None, Some(first)) => buffer.insert(first.range.start, text)?,
            (None, None) => buffer.insert(self.object.range.end - 1, format!(" {text} "))?,
        }
        Ok(())
    }
}

/// Merge `path = value` into `entries`. The first value set for a key wins.
fn insert(entries: &mut Vec<(String, PatchValue)>, path: &[&str], value: String) -> bool {
    let Some((head, rest)) = path.split_first() else {
        return false;
    };
    let existing = entries.iter_mut().find(|(key, _)| key.as_str() == *head);

    if rest.is_empty() {
        if existing.is_some() {
            return false;
        }
        entries.push((head.to_string(), PatchValue::Literal(value)));
        return true;
    }

    match existing {
        Some((_, PatchValue::Object(children))) => insert(children, rest, value),
        Some((_, PatchValue::Literal(_))) => false,
        None => {
            let mut children = Vec::new();
            insert(&mut children, rest, value);
            entries.push((head.to_string(), PatchValue::Object(children)));
            true
        }
    }
}

fn render_entries(entries: &[(String, PatchValue)]) -> String {
    entries
        .iter()
        .map(|(key, value)| {
            let key = if is_identifier(key) {
                key.clone()
            } else {
                serde_json::Value::from(key.as_str()).to_string()
            };
            match value {
                PatchValue::Literal(js) => format!("{key}: {js}"),
                PatchValue::Object(children) => format!("{key}: {{ {} }}", render_entries(children)),
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::{ParsedModule, ScriptLang};
    use swc_core::ecma::ast::*;

    fn apply(code: &str, edit: impl for<'s> FnOnce(&'s ObjectShape, &mut PropertyPatches<'s>)) -> String {
        let parsed = ParsedModule::parse("t.js", code, ScriptLang::JavaScript).unwrap();
        let ModuleItem::Stmt(Stmt::Expr(stmt)) = &parsed.module().body[0] else {
            panic!("expected an expression statement");
        };
        let Expr::Paren(paren) = &*stmt.expr else {
            panic!("expected a parenthesized object");
        };
        let Expr::Object(obj) = &*paren.expr else {
            panic!("expected an object literal");
        };
        let shape = ObjectShape::from_lit(obj, &parsed);
        let mut patches = PropertyPatches::new();
        edit(&shape, &mut patches);
        let mut buffer = EditBuffer::new(code);
        patches.flush(&mut buffer).unwrap();
        buffer.finish().unwrap()
    }

    const DESCRIPTION: &[&str] = &["parameters", "docs", "description", "story"];
    const SOURCE: &[&str] = &["parameters", "docs", "source", "code"];

    #[test]
    fn creates_missing_objects_and_merges_siblings() {
        let out = apply(r#"({ name: "A" });"#, |shape, patches| {
            assert!(patches.set(shape, DESCRIPTION, r#""desc""#.into(), "t").unwrap());
            assert!(patches.set(shape, SOURCE, r#""<b/>""#.into(), "t").unwrap());
        });
        assert_eq!(
            out,
            r#"({ name: "A", parameters: { docs: { description: { story: "desc" }, source: { code: "<b/>" } } } });"#
        );
    }

    #[test]
    fn descends_into_existing_objects() {
        let out = apply(r#"({ parameters: { docs: { foo: 1 }, }, });"#, |shape, patches| {
            assert!(patches.set(shape, DESCRIPTION, "1".into(), "t").unwrap());
        });
        assert_eq!(
            out,
            r#"({ parameters: { docs: { foo: 1, description: { story: 1 } }, }, });"#
        );
    }

    #[test]
    fn existing_keys_are_not_overwritten() {
        let code = r#"({ parameters: { docs: { description: { story: "mine" } } } });"#;
        let out = apply(code, |shape, patches| {
            assert!(!patches.set(shape, DESCRIPTION, r#""theirs""#.into(), "t").unwrap());
            assert!(patches.is_empty());
        });
        assert_eq!(out, code);
    }

    #[test]
    fn non_object_on_the_path_fails_fast() {
        apply(r#"({ parameters: shared });"#, |shape, patches| {
            let err = patches.set(shape, DESCRIPTION, "1".into(), "t").unwrap_err();
            assert!(matches!(err, CsfError::UnexpectedNode { .. }));
        });
    }

    #[test]
    fn removal_and_insertion_in_one_object() {
        let last = apply(r#"({ name: "A", source: true });"#, |shape, patches| {
            assert!(patches.remove(shape, "source"));
            patches.set(shape, SOURCE, "1".into(), "t").unwrap();
        });
        assert_eq!(last, r#"({ name: "A", parameters: { docs: { source: { code: 1 } } } });"#);

        let middle = apply(r#"({ name: "A", source: true, x: 2 });"#, |shape, patches| {
            patches.remove(shape, "source");
        });
        assert_eq!(middle, r#"({ name: "A", x: 2 });"#);

        let only = apply(r#"({ source: true });"#, |shape, patches| {
            patches.remove(shape, "source");
            patches.set(shape, SOURCE, "1".into(), "t").unwrap();
        });
        assert_eq!(only, r#"({ parameters: { docs: { source: { code: 1 } } } });"#);
    }

    #[test]
    fn empty_object() {
        let out = apply("({});", |shape, patches| {
            patches.set(shape, &["parameters", "data-x"], "1".into(), "t").unwrap();
        });
        assert_eq!(out, r#"({ parameters: { "data-x": 1 } });"#);
    }
}
