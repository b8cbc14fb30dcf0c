//! Offsets-only outline of an object literal.
//!
//! Nested object literal values are outlined too; every other value is only
//! kept as a range. This is all the rewrite passes need to decide where a
//! property goes.

use std::ops::Range;

use swc_core::common::Spanned;
use swc_core::ecma::ast::*;

use crate::parse::ParsedModule;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectShape {
    pub range: Range<usize>,
    pub props: Vec<PropShape>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropShape {
    /// Static key; `None` for spreads and computed keys.
    pub key: Option<String>,
    pub range: Range<usize>,
    pub value: PropValue,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropValue {
    Object(ObjectShape),
    Str(String),
    Other,
}

impl ObjectShape {
    pub fn from_lit(object: &ObjectLit, parsed: &ParsedModule) -> Self {
        let props = object
            .props
            .iter()
            .map(|prop| PropShape::from_prop(prop, parsed))
            .collect();
        Self {
            range: parsed.range(object.span),
            props,
        }
    }

    /// The property a lookup of `key` resolves to, i.e. the last one.
    pub fn get(&self, key: &str) -> Option<&PropShape> {
        self.props
            .iter()
            .rev()
            .find(|p| p.key.as_deref() == Some(key))
    }

    pub fn position(&self, key: &str) -> Option<usize> {
        self.props
            .iter()
            .rposition(|p| p.key.as_deref() == Some(key))
    }

    pub fn string(&self, key: &str) -> Option<&str> {
        match &self.get(key)?.value {
            PropValue::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl PropShape {
    fn from_prop(prop: &PropOrSpread, parsed: &ParsedModule) -> Self {
        let range = parsed.range(prop.span());
        let PropOrSpread::Prop(prop) = prop else {
            return Self {
                key: None,
                range,
                value: PropValue::Other,
            };
        };

        let (key, value) = match &**prop {
            Prop::KeyValue(kv) => {
                let value = match &*kv.value {
                    Expr::Object(inner) => PropValue::Object(ObjectShape::from_lit(inner, parsed)),
                    Expr::Lit(Lit::Str(s)) => PropValue::Str(s.value.to_string()),
                    _ => PropValue::Other,
                };
                (static_key(&kv.key), value)
            }
            Prop::Shorthand(ident) => (Some(ident.sym.to_string()), PropValue::Other),
            Prop::Method(m) => (static_key(&m.key), PropValue::Other),
            Prop::Getter(g) => (static_key(&g.key), PropValue::Other),
            Prop::Setter(s) => (static_key(&s.key), PropValue::Other),
            Prop::Assign(a) => (Some(a.key.sym.to_string()), PropValue::Other),
        };
        Self { key, range, value }
    }
}

pub(crate) fn static_key(key: &PropName) -> Option<String> {
    match key {
        PropName::Ident(i) => Some(i.sym.to_string()),
        PropName::Str(s) => Some(s.value.to_string()),
        PropName::Num(n) => Some(n.value.to_string()),
        PropName::Computed(_) | PropName::BigInt(_) => None,
    }
}
