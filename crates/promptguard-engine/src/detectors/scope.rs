//! Lexical shadowing below module level.
//!
//! An imported name can be rebound by a parameter, a nested declaration, or
//! an assignment inside a function. A call through such a name constructs
//! whatever the local binding holds, so it never matches.

use promptguard_core::LanguageFamily;
use tree_sitter::Node;

use super::bindings::{require_module, text};

/// Whether `name`, used at `site`, is bound by a function, class, or block
/// scope enclosing `site`. Module-level definitions are not considered here.
pub fn is_shadowed(site: Node<'_>, name: &str, source: &[u8], family: LanguageFamily) -> bool {
    match family {
        LanguageFamily::Ecma => ecma_shadowed(site, name, source),
        LanguageFamily::Python => python_shadowed(site, name, source),
    }
}

// ---- TS/JS ----

fn ecma_shadowed(site: Node<'_>, name: &str, source: &[u8]) -> bool {
    let mut names = Vec::new();
    let mut child = site;
    while let Some(scope) = child.parent() {
        names.clear();
        match scope.kind() {
            "program" => return false,
            "function_declaration"
            | "generator_function_declaration"
            | "method_definition"
            | "arrow_function" => ecma_parameter_names(scope, source, &mut names),
            // A function or class expression's own name is visible inside it.
            "function_expression" | "function" | "generator_function" | "class" => {
                ecma_parameter_names(scope, source, &mut names);
                if let Some(own) = scope.child_by_field_name("name") {
                    names.push(text(own, source));
                }
            }
            "statement_block" | "switch_case" | "switch_default" | "class_static_block" => {
                let mut cursor = scope.walk();
                for stmt in scope.named_children(&mut cursor) {
                    ecma_declared_names(stmt, source, &mut names);
                }
            }
            "for_statement" => {
                if let Some(init) = scope.child_by_field_name("initializer") {
                    ecma_declared_names(init, source, &mut names);
                }
            }
            "for_in_statement" if scope.child_by_field_name("kind").is_some() => {
                if let Some(left) = scope.child_by_field_name("left") {
                    ecma_pattern_names(left, source, &mut names);
                }
            }
            "catch_clause" => {
                if let Some(param) = scope.child_by_field_name("parameter") {
                    ecma_pattern_names(param, source, &mut names);
                }
            }
            _ => {}
        }
        if names.contains(&name) {
            return true;
        }
        child = scope;
    }
    false
}

/// Names a TS/JS statement declares in its enclosing block. `require`
/// declarators are imports, not definitions.
pub(crate) fn ecma_declared_names<'s>(stmt: Node<'_>, source: &'s [u8], out: &mut Vec<&'s str>) {
    let decl = if stmt.kind() == "export_statement" {
        match stmt.child_by_field_name("declaration") {
            Some(d) => d,
            None => return,
        }
    } else {
        stmt
    };
    match decl.kind() {
        "class_declaration"
        | "abstract_class_declaration"
        | "function_declaration"
        | "generator_function_declaration" => {
            if let Some(name) = decl.child_by_field_name("name") {
                out.push(text(name, source));
            }
        }
        "lexical_declaration" | "variable_declaration" => {
            let mut cursor = decl.walk();
            for declarator in decl.named_children(&mut cursor) {
                if declarator.kind() != "variable_declarator" {
                    continue;
                }
                let is_require = declarator.child_by_field_name("value").is_some_and(|v| {
                    require_module(v, source).is_some()
                        || v.child_by_field_name("object")
                            .is_some_and(|o| require_module(o, source).is_some())
                });
                if is_require {
                    continue;
                }
                if let Some(name) = declarator.child_by_field_name("name") {
                    ecma_pattern_names(name, source, out);
                }
            }
        }
        _ => {}
    }
}

fn ecma_parameter_names<'s>(func: Node<'_>, source: &'s [u8], out: &mut Vec<&'s str>) {
    // `x => ...` has a single `parameter`.
    if let Some(param) = func.child_by_field_name("parameter") {
        ecma_pattern_names(param, source, out);
    }
    if let Some(params) = func.child_by_field_name("parameters") {
        let mut cursor = params.walk();
        for param in params.named_children(&mut cursor) {
            ecma_pattern_names(param, source, out);
        }
    }
}

fn ecma_pattern_names<'s>(node: Node<'_>, source: &'s [u8], out: &mut Vec<&'s str>) {
    match node.kind() {
        "identifier" | "shorthand_property_identifier_pattern" => out.push(text(node, source)),
        "required_parameter" | "optional_parameter" => {
            if let Some(pattern) = node.child_by_field_name("pattern") {
                ecma_pattern_names(pattern, source, out);
            }
        }
        "assignment_pattern" | "object_assignment_pattern" => {
            if let Some(left) = node.child_by_field_name("left") {
                ecma_pattern_names(left, source, out);
            }
        }
        "pair_pattern" => {
            if let Some(value) = node.child_by_field_name("value") {
                ecma_pattern_names(value, source, out);
            }
        }
        "object_pattern" | "array_pattern" | "rest_pattern" => {
            let mut cursor = node.walk();
            for child in node.named_children(&mut cursor) {
                ecma_pattern_names(child, source, out);
            }
        }
        _ => {}
    }
}

// ---- Python ----

const PY_NESTED_SCOPES: &[&str] = &[
    "function_definition",
    "class_definition",
    "lambda",
    "list_comprehension",
    "set_comprehension",
    "dictionary_comprehension",
    "generator_expression",
];

fn python_shadowed(site: Node<'_>, name: &str, source: &[u8]) -> bool {
    let mut child = site;
    let mut in_function = false;
    while let Some(scope) = child.parent() {
        match scope.kind() {
            "module" => return false,
            "function_definition" | "lambda" => {
                let mut names = Vec::new();
                if let Some(params) = scope.child_by_field_name("parameters") {
                    python_parameter_names(params, source, &mut names);
                }
                if let Some(body) = scope.child_by_field_name("body") {
                    if python_declares_global(body, name, source) {
                        return false;
                    }
                    python_body_names(body, source, &mut names);
                }
                if names.contains(&name) {
                    return true;
                }
                in_function = true;
            }
            // Class-level names are not visible inside methods.
            "class_definition" if !in_function => {
                let body = scope.child_by_field_name("body");
                if let Some(body) = body.filter(|b| b.id() == child.id()) {
                    let mut names = Vec::new();
                    python_body_names(body, source, &mut names);
                    if names.contains(&name) {
                        return true;
                    }
                }
            }
            "list_comprehension" | "set_comprehension" | "dictionary_comprehension"
            | "generator_expression" => {
                let mut names = Vec::new();
                let mut cursor = scope.walk();
                for clause in scope.named_children(&mut cursor) {
                    if clause.kind() == "for_in_clause" {
                        if let Some(left) = clause.child_by_field_name("left") {
                            python_target_names(left, source, &mut names);
                        }
                    }
                }
                if names.contains(&name) {
                    return true;
                }
            }
            _ => {}
        }
        child = scope;
    }
    false
}

fn python_parameter_names<'s>(params: Node<'_>, source: &'s [u8], out: &mut Vec<&'s str>) {
    let mut cursor = params.walk();
    for param in params.named_children(&mut cursor) {
        match param.kind() {
            "identifier" => out.push(text(param, source)),
            "default_parameter" | "typed_default_parameter" => {
                if let Some(name) = param.child_by_field_name("name") {
                    python_target_names(name, source, out);
                }
            }
            "typed_parameter" | "list_splat_pattern" | "dictionary_splat_pattern" => {
                let mut c = param.walk();
                let first = param.named_children(&mut c).next();
                if let Some(first) = first {
                    python_target_names(first, source, out);
                }
            }
            "tuple_pattern" => python_target_names(param, source, out),
            _ => {}
        }
    }
}

/// Names bound anywhere in a function or class body, without entering
/// nested scopes (whose own names are still collected).
fn python_body_names<'s>(body: Node<'_>, source: &'s [u8], out: &mut Vec<&'s str>) {
    let mut stack = vec![body];
    while let Some(node) = stack.pop() {
        match node.kind() {
            "function_definition" | "class_definition" => {
                if let Some(name) = node.child_by_field_name("name") {
                    out.push(text(name, source));
                }
                continue;
            }
            kind if PY_NESTED_SCOPES.contains(&kind) => continue,
            "assignment" | "augmented_assignment" | "for_statement" | "for_in_clause" => {
                if let Some(left) = node.child_by_field_name("left") {
                    python_target_names(left, source, out);
                }
            }
            "named_expression" => {
                if let Some(name) = node.child_by_field_name("name") {
                    out.push(text(name, source));
                }
            }
            "as_pattern" => {
                if let Some(alias) = node.child_by_field_name("alias") {
                    let mut c = alias.walk();
                    for target in alias.named_children(&mut c) {
                        python_target_names(target, source, out);
                    }
                }
            }
            _ => {}
        }
        let mut cursor = node.walk();
        stack.extend(node.named_children(&mut cursor));
    }
}

fn python_target_names<'s>(node: Node<'_>, source: &'s [u8], out: &mut Vec<&'s str>) {
    match node.kind() {
        "identifier" => out.push(text(node, source)),
        "pattern_list" | "tuple_pattern" | "list_pattern" | "tuple" | "list"
        | "parenthesized_expression" | "list_splat_pattern" | "list_splat" => {
            let mut cursor = node.walk();
            for child in node.named_children(&mut cursor) {
                python_target_names(child, source, out);
            }
        }
        _ => {}
    }
}

/// `global name` / `nonlocal name` directly in this function's body.
fn python_declares_global(body: Node<'_>, name: &str, source: &[u8]) -> bool {
    let mut stack = vec![body];
    while let Some(node) = stack.pop() {
        match node.kind() {
            "global_statement" | "nonlocal_statement" => {
                let mut cursor = node.walk();
                if node
                    .named_children(&mut cursor)
                    .any(|n| n.kind() == "identifier" && text(n, source) == name)
                {
                    return true;
                }
            }
            kind if PY_NESTED_SCOPES.contains(&kind) => continue,
            _ => {}
        }
        let mut cursor = node.walk();
        stack.extend(node.named_children(&mut cursor));
    }
    false
}
