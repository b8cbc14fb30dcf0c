//! Identifier and comment text helpers.

use std::sync::LazyLock;

use regex::Regex;

static NON_IDENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9_$]").expect("valid regex"));
static WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[A-Za-z0-9]+").expect("valid regex"));

/// Normalize bundler style module ids before taking the basename.
fn normalize_id(id: &str) -> String {
    let s = id.split(['?', '#']).next().unwrap_or_default();
    let s = s.replace('\\', "/");
    match s.strip_prefix("file://") {
        Some(rest) => rest.to_string(),
        None => s,
    }
}

/// Name the Svelte compiler gives the component compiled from `id`,
/// e.g. `src/Button.stories.svelte` -> `Button_stories`.
pub fn component_name(id: &str) -> Option<String> {
    let id = normalize_id(id);
    let mut parts: Vec<&str> = id.split('/').collect();
    let base = parts.pop()?;
    let mut name = base.strip_suffix(".svelte").unwrap_or(base);

    if name == "index" {
        if let Some(dir) = parts.last().filter(|d| !d.is_empty() && **d != "src") {
            name = *dir;
        }
    }

    let mut chars = name.chars();
    let first = chars.next()?;
    let capitalized: String = first.to_uppercase().chain(chars).collect();
    let ident = NON_IDENT.replace_all(&capitalized, "_").into_owned();

    if ident.chars().all(|c| c == '_') {
        return None;
    }
    if ident.starts_with(|c: char| c.is_ascii_digit()) {
        return Some(format!("_{ident}"));
    }
    Some(ident)
}

/// Export binding used for a story name, e.g. `With Source` -> `WithSource`.
pub fn story_export_name(story_name: &str) -> Option<String> {
    let mut out = String::new();
    for word in WORD.find_iter(story_name) {
        let mut chars = word.as_str().chars();
        if let Some(first) = chars.next() {
            out.extend(first.to_uppercase());
            out.push_str(chars.as_str());
        }
    }
    if out.is_empty() {
        return None;
    }
    if out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    Some(out)
}

pub fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

/// Words a module can't declare as a binding: reserved words, strict mode
/// reserved words, and the literals.
const RESERVED_WORDS: &[&str] = &[
    "arguments", "await", "break", "case", "catch", "class", "const", "continue", "debugger",
    "default", "delete", "do", "else", "enum", "eval", "export", "extends", "false", "finally",
    "for", "function", "if", "implements", "import", "in", "instanceof", "interface", "let", "new",
    "null", "package", "private", "protected", "public", "return", "static", "super", "switch",
    "this", "throw", "true", "try", "typeof", "var", "void", "while", "with", "yield",
];

/// Whether `export const <s> = ...` is valid in a module.
pub fn is_binding_identifier(s: &str) -> bool {
    is_identifier(s) && !RESERVED_WORDS.contains(&s)
}

/// Body of a `/** ... */` comment without the leading `*` gutter.
/// `text` is the comment content between the delimiters.
pub fn clean_jsdoc(text: &str) -> String {
    let body = text.strip_prefix('*').unwrap_or(text);
    let lines: Vec<&str> = body
        .lines()
        .map(|line| {
            let line = line.trim_start();
            let line = line.strip_prefix('*').unwrap_or(line);
            line.strip_prefix(' ').unwrap_or(line).trim_end()
        })
        .collect();
    lines.join("\n").trim().to_string()
}

/// Strip the common indentation from a block of markup or comment text.
/// The first line is only trimmed, the way it sits right after `<!--`.
pub fn dedent(text: &str) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let indent = lines
        .iter()
        .skip(1)
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.len() - l.trim_start().len())
        .min()
        .unwrap_or(0);

    let mut out = Vec::with_capacity(lines.len());
    for (i, line) in lines.iter().enumerate() {
        if i == 0 {
            out.push(line.trim_start());
        } else if line.trim().is_empty() {
            out.push("");
        } else {
            out.push(line.get(indent..).unwrap_or_else(|| line.trim_start()));
        }
    }
    out.join("\n").trim().to_string()
}
