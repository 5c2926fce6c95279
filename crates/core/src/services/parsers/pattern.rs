use std::ops::Range;
use std::sync::OnceLock;

use regex::{Regex, RegexBuilder};

use super::{line_at, ParseError, ParseStrategy};
use crate::model::{
    ClassDeclaration, MethodDeclaration, SourceUnit, SINKS, STRING_CONTEXT_FUNCTIONS,
};

/// Regex-based fallback parser.
///
/// Classes own the text inside their brace span and methods own their body span, so
/// properties, calls and `$this` reads are attributed to the nearest enclosing
/// declaration. Only sink-vocabulary and string-context calls are recognised.
#[derive(Debug, Default, Clone, Copy)]
pub struct PatternStrategy;

impl PatternStrategy {
    pub fn new() -> Self {
        Self
    }
}

struct Patterns {
    class: Regex,
    method: Regex,
    property: Regex,
    this_access: Regex,
    paren_invoke: Regex,
    call_user_func: Regex,
    calls: Vec<(&'static str, Regex)>,
}

impl Patterns {
    fn compile() -> Result<Self, regex::Error> {
        let mut calls = Vec::new();
        for name in SINKS.iter().chain(STRING_CONTEXT_FUNCTIONS.iter()) {
            let pattern = format!(r"\b{}\s*\(", regex::escape(name));
            calls.push((*name, RegexBuilder::new(&pattern).case_insensitive(true).build()?));
        }
        Ok(Self {
            class: Regex::new(r"\bclass\s+([A-Za-z_][A-Za-z0-9_]*)")?,
            method: Regex::new(r"\bfunction\s+&?\s*([A-Za-z_][A-Za-z0-9_]*)\s*\(")?,
            property: Regex::new(concat!(
                r"\b(?:public|protected|private|var)",
                r"(?:\s+(?:static|readonly))*",
                r"(?:\s+\??[A-Za-z_\\][A-Za-z0-9_\\|]*)?",
                r"\s+\$([A-Za-z_][A-Za-z0-9_]*)",
            ))?,
            this_access: Regex::new(r"\$this\s*->\s*([A-Za-z_][A-Za-z0-9_]*)")?,
            paren_invoke: Regex::new(r"\(\s*\$this\s*->\s*([A-Za-z_][A-Za-z0-9_]*)\s*\)\s*\(")?,
            call_user_func: RegexBuilder::new(
                r"\bcall_user_func(?:_array)?\s*\(\s*\$this\s*->\s*([A-Za-z_][A-Za-z0-9_]*)",
            )
            .case_insensitive(true)
            .build()?,
            calls,
        })
    }
}

fn patterns() -> Result<&'static Patterns, ParseError> {
    static PATTERNS: OnceLock<Result<Patterns, String>> = OnceLock::new();
    PATTERNS
        .get_or_init(|| Patterns::compile().map_err(|e| e.to_string()))
        .as_ref()
        .map_err(|e| ParseError::Unavailable(format!("pattern strategy: {e}")))
}

impl ParseStrategy for PatternStrategy {
    fn name(&self) -> &'static str {
        "pattern"
    }

    fn parse(&self, unit: &SourceUnit) -> Result<Vec<ClassDeclaration>, ParseError> {
        let patterns = patterns()?;
        let text = unit.text.as_str();
        let mut classes = Vec::new();

        for cap in patterns.class.captures_iter(text) {
            let name = &cap[1];
            if matches!(name, "extends" | "implements") {
                // `new class extends Base { ... }`
                continue;
            }
            let Some(whole) = cap.get(0) else { continue };
            let span = block_span(text, whole.end());
            let mut class = ClassDeclaration::new(name, unit.path.clone());

            let body = &text[span.clone()];
            for prop in patterns.property.captures_iter(body) {
                class.declare_property(&prop[1]);
            }

            let mut claimed_until = span.start;
            for m in patterns.method.captures_iter(body) {
                let (Some(keyword), Some(method_name)) = (m.get(0), m.get(1)) else { continue };
                let start = span.start + keyword.start();
                if start < claimed_until {
                    // Named function declared inside a previous method body.
                    continue;
                }
                // The method pattern ends on the parameter list's `(`.
                let params_open = span.start + keyword.end() - 1;
                let method_body = method_body_span(text, params_open, span.end);
                claimed_until = method_body.end;

                let mut method = MethodDeclaration::new(
                    method_name.as_str(),
                    unit.path.clone(),
                    line_at(text, start),
                );
                collect_body_facts(patterns, text, method_body, &mut method);
                class.methods.push(method);
            }

            classes.push(class);
        }

        Ok(classes)
    }
}

fn collect_body_facts(
    patterns: &Patterns,
    text: &str,
    span: Range<usize>,
    method: &mut MethodDeclaration,
) {
    let body = &text[span.clone()];

    let mut hits: Vec<(usize, &'static str)> = Vec::new();
    for (name, re) in &patterns.calls {
        for m in re.find_iter(body) {
            hits.push((m.start(), *name));
        }
    }
    // Keep sink references in source order.
    hits.sort_by_key(|(offset, _)| *offset);
    for (offset, name) in hits {
        method.record_call(name, line_at(text, span.start + offset));
    }

    for cap in patterns.this_access.captures_iter(body) {
        let Some(whole) = cap.get(0) else { continue };
        let rest = body[whole.end()..].trim_start();
        if rest.starts_with('(') {
            // `$this->method(...)` is a method call, not a property read.
            continue;
        }
        method.uses.insert(cap[1].to_string());
    }

    for cap in patterns.paren_invoke.captures_iter(body) {
        method.invokes.insert(cap[1].to_string());
    }
    for cap in patterns.call_user_func.captures_iter(body) {
        method.invokes.insert(cap[1].to_string());
    }
}

/// Span strictly inside the first `{ ... }` block at or after `from`.
///
/// An unterminated block extends to end of text; a missing block is empty.
fn block_span(text: &str, from: usize) -> Range<usize> {
    match text[from..].find('{') {
        Some(rel) => {
            let open = from + rel;
            let close = matching_brace(text, open).unwrap_or(text.len());
            open + 1..close
        }
        None => text.len()..text.len(),
    }
}

/// Body span of a method whose parameter list opens at `params_open`; abstract and
/// interface methods (terminated by `;`) get an empty span.
fn method_body_span(text: &str, params_open: usize, limit: usize) -> Range<usize> {
    let from = matching_delimiter(text, params_open, b'(', b')')
        .map_or(params_open + 1, |close| close + 1)
        .min(limit);
    let window = &text[from..limit];
    let open = window.find('{');
    let semi = window.find(';');
    match (open, semi) {
        (Some(o), Some(s)) if s < o => from..from,
        (Some(o), _) => {
            let open = from + o;
            let close = matching_brace(text, open).unwrap_or(limit).min(limit);
            open + 1..close
        }
        _ => from..from,
    }
}

/// Offset of the brace closing the one at `open`, skipping strings and comments.
fn matching_brace(text: &str, open: usize) -> Option<usize> {
    matching_delimiter(text, open, b'{', b'}')
}

/// Offset of the `close` byte balancing the `open_byte` at `open`, skipping strings
/// and comments.
fn matching_delimiter(text: &str, open: usize, open_byte: u8, close_byte: u8) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut i = open;
    while i < bytes.len() {
        match bytes[i] {
            b if b == open_byte => depth += 1,
            b if b == close_byte => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(i);
                }
            }
            quote @ (b'\'' | b'"') => {
                i += 1;
                while i < bytes.len() && bytes[i] != quote {
                    if bytes[i] == b'\\' {
                        i += 1;
                    }
                    i += 1;
                }
            }
            b'/' if bytes.get(i + 1) == Some(&b'/') => i = skip_line(bytes, i),
            b'#' if bytes.get(i + 1) != Some(&b'[') => i = skip_line(bytes, i),
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                i += 2;
                while i + 1 < bytes.len() && !(bytes[i] == b'*' && bytes[i + 1] == b'/') {
                    i += 1;
                }
                i += 1;
            }
            _ => {}
        }
        i += 1;
    }
    None
}

fn skip_line(bytes: &[u8], from: usize) -> usize {
    let mut i = from;
    while i < bytes.len() && bytes[i] != b'\n' {
        i += 1;
    }
    i
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Vec<ClassDeclaration> {
        PatternStrategy.parse(&SourceUnit::new("t.php", text)).expect("pattern parse")
    }

    #[test]
    fn matching_brace_skips_strings_and_comments() {
        let text = "{ '}' \"{\" // }\n /* } */ { } }";
        assert_eq!(matching_brace(text, 0), Some(text.len() - 1));
    }

    #[test]
    fn abstract_methods_have_empty_bodies() {
        let classes = parse(
            r#"<?php abstract class A {
                abstract function f();
                function g() { system('x'); }
            }"#,
        );
        assert_eq!(classes[0].methods.len(), 2);
        assert!(classes[0].methods[0].calls.is_empty());
        assert!(classes[0].methods[1].calls.contains("system"));
    }

    #[test]
    fn method_calls_on_this_are_not_property_reads() {
        let classes = parse(
            r#"<?php class A {
                function __toString() { return $this->render() . $this->name; }
            }"#,
        );
        let method = &classes[0].methods[0];
        assert_eq!(method.uses.iter().collect::<Vec<_>>(), vec!["name"]);
    }

    #[test]
    fn braces_in_default_arguments_do_not_open_the_body() {
        let classes = parse(
            r#"<?php class A {
                public $p;
                function f($a = '{', $b = ")") { }
                function __wakeup() { system($this->p); }
            }"#,
        );
        let class = &classes[0];
        let names: Vec<_> = class.methods.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["f", "__wakeup"]);
        assert!(class.methods[0].calls.is_empty());
        let wakeup = class.method("__wakeup").expect("__wakeup");
        assert!(wakeup.calls.contains("system"));
        assert_eq!(wakeup.sinks[0].line, 4);
    }

    #[test]
    fn anonymous_class_extends_is_not_a_class_name() {
        let classes = parse("<?php $x = new class extends Base { };");
        assert!(classes.is_empty());
    }
}
