use tree_sitter::{Node, Parser};

use super::{ParseError, ParseStrategy};
use crate::model::{ClassDeclaration, MethodDeclaration, SourceUnit};

/// Grammar-aware parser backed by tree-sitter-php.
pub struct StructuralStrategy;

impl ParseStrategy for StructuralStrategy {
    fn name(&self) -> &'static str {
        "structural"
    }

    fn parse(&self, unit: &SourceUnit) -> Result<Vec<ClassDeclaration>, ParseError> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_php::LANGUAGE_PHP.into())
            .map_err(|e| ParseError::Unavailable(format!("tree-sitter-php: {e}")))?;
        let tree = parser.parse(&unit.text, None).ok_or_else(|| ParseError::Failed {
            path: unit.path.clone(),
            reason: "tree-sitter returned no tree".to_string(),
        })?;

        let mut classes = Vec::new();
        let ctx = Ctx { source: unit.text.as_bytes(), path: &unit.path };
        collect_classes(&ctx, tree.root_node(), &mut classes);
        Ok(classes)
    }
}

struct Ctx<'a> {
    source: &'a [u8],
    path: &'a str,
}

impl Ctx<'_> {
    fn text(&self, node: Node) -> &str {
        node.utf8_text(self.source).unwrap_or_default()
    }
}

fn collect_classes(ctx: &Ctx, node: Node, out: &mut Vec<ClassDeclaration>) {
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        if child.kind() == "class_declaration" {
            out.push(extract_class(ctx, child));
        }
        collect_classes(ctx, child, out);
    }
}

fn extract_class(ctx: &Ctx, node: Node) -> ClassDeclaration {
    let name = node.child_by_field_name("name").map(|n| ctx.text(n)).unwrap_or_default();
    let mut class = ClassDeclaration::new(name, ctx.path);

    let Some(body) = node.child_by_field_name("body") else {
        return class;
    };
    let mut cursor = body.walk();
    for member in body.named_children(&mut cursor) {
        match member.kind() {
            "property_declaration" => {
                let mut elements = member.walk();
                for element in member.named_children(&mut elements) {
                    if element.kind() != "property_element" {
                        continue;
                    }
                    if let Some(var) = find_child_by_kind(element, "variable_name") {
                        class.declare_property(ctx.text(var).trim_start_matches('$'));
                    }
                }
            }
            "method_declaration" => {
                if let Some(method) = extract_method(ctx, member) {
                    class.methods.push(method);
                }
            }
            _ => {}
        }
    }
    class
}

fn extract_method(ctx: &Ctx, node: Node) -> Option<MethodDeclaration> {
    let name = ctx.text(node.child_by_field_name("name")?);
    if name.is_empty() {
        return None;
    }
    let body = node.child_by_field_name("body");
    let line = body.unwrap_or(node).start_position().row + 1;
    let mut method = MethodDeclaration::new(name, ctx.path, line);
    if let Some(body) = body {
        visit_body(ctx, body, &mut method);
    }
    Some(method)
}

/// Recursively record calls, `$this->prop` reads and callable-property invocations.
fn visit_body(ctx: &Ctx, node: Node, method: &mut MethodDeclaration) {
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        let line = child.start_position().row + 1;
        match child.kind() {
            "function_call_expression" => record_function_call(ctx, child, line, method),
            "include_expression" => method.record_call("include", line),
            "include_once_expression" => method.record_call("include_once", line),
            "require_expression" => method.record_call("require", line),
            "require_once_expression" => method.record_call("require_once", line),
            "member_access_expression" => {
                if let Some(prop) = this_property(ctx, child) {
                    method.uses.insert(prop.to_string());
                }
            }
            _ => {}
        }
        visit_body(ctx, child, method);
    }
}

fn record_function_call(ctx: &Ctx, node: Node, line: usize, method: &mut MethodDeclaration) {
    let Some(function) = node.child_by_field_name("function") else {
        return;
    };
    match function.kind() {
        "name" | "qualified_name" => {
            let text = ctx.text(function);
            let callee = text.rsplit('\\').next().unwrap_or(text);
            if callee.is_empty() {
                return;
            }
            method.record_call(callee, line);
            if callee.eq_ignore_ascii_case("call_user_func")
                || callee.eq_ignore_ascii_case("call_user_func_array")
            {
                if let Some(prop) = first_argument_property(ctx, node) {
                    method.invokes.insert(prop.to_string());
                }
            }
        }
        "parenthesized_expression" => {
            // ($this->callback)(...)
            let inner = function.named_child(0);
            if let Some(prop) = inner.and_then(|n| this_property(ctx, n)) {
                method.invokes.insert(prop.to_string());
            }
        }
        _ => {}
    }
}

/// `prop` for a `$this->prop` member access, otherwise `None`.
fn this_property<'a>(ctx: &'a Ctx, node: Node) -> Option<&'a str> {
    if node.kind() != "member_access_expression" {
        return None;
    }
    let object = node.child_by_field_name("object")?;
    if object.kind() != "variable_name" || ctx.text(object) != "$this" {
        return None;
    }
    let name = node.child_by_field_name("name")?;
    if name.kind() != "name" {
        return None;
    }
    Some(ctx.text(name))
}

fn first_argument_property<'a>(ctx: &'a Ctx, call: Node) -> Option<&'a str> {
    let arguments = call.child_by_field_name("arguments")?;
    let argument = find_child_by_kind(arguments, "argument")?;
    let value = argument.named_child(0)?;
    this_property(ctx, value)
}

fn find_child_by_kind<'t>(node: Node<'t>, kind: &str) -> Option<Node<'t>> {
    let mut cursor = node.walk();
    let found = node.named_children(&mut cursor).find(|child| child.kind() == kind);
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Vec<ClassDeclaration> {
        StructuralStrategy.parse(&SourceUnit::new("t.php", text)).expect("structural parse")
    }

    #[test]
    fn extracts_calls_uses_and_invokes() {
        let classes = parse(
            r#"<?php
class A {
  public $cb;
  function __get($n) {
    return ($this->cb)($this->arg);
  }
  function run() {
    \system($this->cmd);
  }
}
"#,
        );
        assert_eq!(classes.len(), 1);
        let class = &classes[0];
        assert_eq!(class.properties, vec!["cb"]);

        let get = class.method("__get").expect("__get");
        assert!(get.invokes.contains("cb"));
        assert!(get.uses.contains("arg"));

        let run = class.method("run").expect("run");
        assert!(run.calls.contains("system"));
        assert_eq!(run.sinks[0].line, 8);
        assert_eq!(run.line, 7);
    }

    #[test]
    fn include_expressions_count_as_calls() {
        let classes = parse("<?php class A { function __destruct() { include $this->file; } }");
        let method = classes[0].method("__destruct").expect("__destruct");
        assert!(method.calls.contains("include"));
        assert_eq!(method.sinks.len(), 1);
    }

    #[test]
    fn classes_inside_namespaces_are_found() {
        let classes = parse("<?php namespace App { class A {} class B {} }");
        let names: Vec<_> = classes.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B"]);
    }
}
