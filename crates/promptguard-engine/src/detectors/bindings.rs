//! Import bindings: which local names refer to which module exports.
//!
//! Resolution is exact. A name only resolves to a provider class when every
//! binding of that name agrees and the file does not also define it.

use promptguard_core::{FxHashMap, FxHashSet, LanguageFamily, Provider};
use smallvec::SmallVec;
use tree_sitter::Node;

use crate::patterns::catalog::{CalleeNames, EnvAccessNames};

use super::scope::ecma_declared_names;

/// How a local name is bound to a module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportKind {
    /// `import * as ns from "m"`, `import m` (Python).
    Namespace,
    /// `const m = require("m")`: both the module and its default export.
    CommonJs,
    /// `import C from "m"`.
    Default,
    /// `import { C } from "m"`, `from m import C`, `const { C } = require("m")`.
    Named(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportBinding {
    pub local: String,
    pub module: String,
    pub kind: ImportKind,
    /// Not nested in a function, class, or lambda.
    pub module_level: bool,
}

/// What a local name means for detection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// No import binds the name.
    Unbound,
    /// Bound, but not to a provider SDK class or module.
    Foreign,
    Provider {
        provider: Provider,
        /// `new X(...)` / `X(...)` constructs a client.
        constructor: bool,
        /// `X.Client(...)` constructs a client.
        namespace: bool,
    },
    /// Conflicting bindings; the reason is user-facing.
    Ambiguous(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Class(Provider),
    Module { provider: Provider, constructible: bool },
    Foreign,
}

#[derive(Debug, Clone)]
pub struct ImportBindings {
    family: LanguageFamily,
    bindings: FxHashMap<String, SmallVec<[ImportBinding; 1]>>,
    definitions: FxHashSet<String>,
    /// Set while visiting each import statement.
    visiting_module_level: bool,
}

impl ImportBindings {
    /// Collect every import in the file (at any depth) and every
    /// module-level definition.
    pub fn collect(root: Node<'_>, source: &[u8], family: LanguageFamily) -> Self {
        let mut out = Self {
            family,
            bindings: FxHashMap::default(),
            definitions: FxHashSet::default(),
            visiting_module_level: true,
        };
        match family {
            LanguageFamily::Ecma => {
                for_each_node(root, |node| {
                    out.visiting_module_level = is_module_level(node, family);
                    match node.kind() {
                        "import_statement" => out.ecma_import(node, source),
                        "variable_declarator" => out.ecma_require(node, source),
                        _ => {}
                    }
                });
                out.ecma_definitions(root, source);
            }
            LanguageFamily::Python => {
                for_each_node(root, |node| {
                    out.visiting_module_level = is_module_level(node, family);
                    match node.kind() {
                        "import_statement" => out.python_import(node, source),
                        "import_from_statement" => out.python_import_from(node, source),
                        _ => {}
                    }
                });
                out.python_definitions(root, source);
            }
        }
        out
    }

    pub fn get(&self, local: &str) -> &[ImportBinding] {
        self.bindings.get(local).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn is_defined_locally(&self, name: &str) -> bool {
        self.definitions.contains(name)
    }

    pub fn resolve(&self, local: &str) -> Resolution {
        let bindings = self.get(local);
        if bindings.is_empty() {
            return Resolution::Unbound;
        }

        let mut targets: SmallVec<[Target; 2]> = SmallVec::new();
        for binding in bindings {
            let target = self.target_of(binding);
            if !targets.contains(&target) {
                targets.push(target);
            }
        }

        let provider_related = targets.iter().any(|t| !matches!(t, Target::Foreign));
        if !provider_related {
            return Resolution::Foreign;
        }
        if targets.len() > 1 {
            let modules: Vec<&str> = bindings.iter().map(|b| b.module.as_str()).collect();
            return Resolution::Ambiguous(format!(
                "`{local}` is bound by more than one import ({})",
                modules.join(", ")
            ));
        }
        if self.definitions.contains(local) {
            return Resolution::Ambiguous(format!(
                "`{local}` is imported from {} and also defined in this file",
                bindings[0].module
            ));
        }

        match targets[0] {
            Target::Class(provider) => Resolution::Provider {
                provider,
                constructor: true,
                namespace: false,
            },
            Target::Module {
                provider,
                constructible,
            } => Resolution::Provider {
                provider,
                constructor: constructible,
                namespace: true,
            },
            Target::Foreign => Resolution::Foreign,
        }
    }

    /// Local names through which `provider`'s clients can be constructed.
    pub fn callee_names(&self, provider: Provider) -> CalleeNames {
        let mut names = CalleeNames {
            classes: provider
                .surface(self.family)
                .classes
                .iter()
                .map(|c| c.to_string())
                .collect(),
            ..CalleeNames::default()
        };
        for local in self.sorted_locals() {
            if let Resolution::Provider {
                provider: p,
                constructor,
                namespace,
            } = self.resolve(local)
            {
                if p != provider {
                    continue;
                }
                if constructor {
                    names.constructors.push(local.to_string());
                }
                if namespace {
                    names.namespaces.push(local.to_string());
                }
            }
        }
        names
    }

    /// Names whose resolution is ambiguous, with the reason.
    pub fn ambiguous_names(&self) -> Vec<(String, String)> {
        self.sorted_locals()
            .into_iter()
            .filter_map(|local| match self.resolve(local) {
                Resolution::Ambiguous(reason) => Some((local.to_string(), reason)),
                _ => None,
            })
            .collect()
    }

    /// Python only: local names for `os`, `os.environ`, and `os.getenv`,
    /// bound at any depth. An unbound `os` counts as the module itself.
    pub fn env_access_names(&self) -> EnvAccessNames {
        let mut names = self.os_access_names(false);
        if names.os.is_empty() && self.get("os").is_empty() && !self.definitions.contains("os") {
            names.os.push("os".to_string());
        }
        names
    }

    /// Like [`env_access_names`](Self::env_access_names), but only names
    /// bound by module-level imports, which are visible everywhere.
    pub fn module_env_access_names(&self) -> EnvAccessNames {
        self.os_access_names(true)
    }

    /// Whether a module-level import binds the `os` module itself.
    pub fn os_is_imported(&self) -> bool {
        self.bindings.values().flatten().any(|b| {
            b.module_level && b.module == "os" && b.kind == ImportKind::Namespace
        })
    }

    /// Whether the module-level name `os` means something other than the os module.
    pub fn os_is_rebound(&self) -> bool {
        self.definitions.contains("os")
            || self.get("os").iter().any(|b| {
                b.module_level && !(b.module == "os" && b.kind == ImportKind::Namespace)
            })
    }

    fn os_access_names(&self, module_level_only: bool) -> EnvAccessNames {
        let mut names = EnvAccessNames::default();
        for local in self.sorted_locals() {
            for binding in self.get(local) {
                if binding.module != "os" || (module_level_only && !binding.module_level) {
                    continue;
                }
                match &binding.kind {
                    ImportKind::Namespace => names.os.push(local.to_string()),
                    ImportKind::Named(n) if n == "environ" => names.environ.push(local.to_string()),
                    ImportKind::Named(n) if n == "getenv" => names.getenv.push(local.to_string()),
                    _ => {}
                }
            }
        }
        names
    }

    fn sorted_locals(&self) -> Vec<&str> {
        let mut locals: Vec<&str> = self.bindings.keys().map(|k| k.as_str()).collect();
        locals.sort_unstable();
        locals
    }

    fn target_of(&self, binding: &ImportBinding) -> Target {
        let family = self.family;
        let Some(provider) = Provider::for_module(family, &binding.module) else {
            return Target::Foreign;
        };
        let default_export = provider.surface(family).default_export;
        match &binding.kind {
            ImportKind::Named(name) if provider.exports_class(family, name) => {
                Target::Class(provider)
            }
            ImportKind::Named(_) => Target::Foreign,
            ImportKind::Default if default_export.is_some() => Target::Class(provider),
            ImportKind::Default => Target::Foreign,
            ImportKind::Namespace => Target::Module {
                provider,
                constructible: false,
            },
            ImportKind::CommonJs => Target::Module {
                provider,
                constructible: default_export.is_some(),
            },
        }
    }

    fn bind(&mut self, local: &str, module: &str, kind: ImportKind) {
        if local.is_empty() || module.is_empty() {
            return;
        }
        let binding = ImportBinding {
            local: local.to_string(),
            module: module.to_string(),
            kind,
            module_level: self.visiting_module_level,
        };
        let slot = self.bindings.entry(local.to_string()).or_default();
        if !slot.contains(&binding) {
            slot.push(binding);
        }
    }

    // ---- TS/JS ----

    fn ecma_import(&mut self, node: Node<'_>, source: &[u8]) {
        if has_token(node, "type") || has_token(node, "typeof") {
            return;
        }
        let Some(module) = node
            .child_by_field_name("source")
            .and_then(|s| ecma_string_value(s, source))
        else {
            return;
        };

        let mut cursor = node.walk();
        let clause = node
            .named_children(&mut cursor)
            .find(|c| c.kind() == "import_clause");
        let Some(clause) = clause else {
            return;
        };

        let mut cursor = clause.walk();
        for part in clause.named_children(&mut cursor) {
            match part.kind() {
                "identifier" => self.bind(text(part, source), &module, ImportKind::Default),
                "namespace_import" => {
                    let mut c = part.walk();
                    let local = part
                        .named_children(&mut c)
                        .find(|n| n.kind() == "identifier");
                    if let Some(local) = local {
                        self.bind(text(local, source), &module, ImportKind::Namespace);
                    }
                }
                "named_imports" => {
                    let mut c = part.walk();
                    for spec in part.named_children(&mut c) {
                        if spec.kind() != "import_specifier" || has_token(spec, "type") {
                            continue;
                        }
                        let Some(name) = spec.child_by_field_name("name") else {
                            continue;
                        };
                        let imported = match name.kind() {
                            "string" => ecma_string_value(name, source).unwrap_or_default(),
                            _ => text(name, source).to_string(),
                        };
                        let local = spec
                            .child_by_field_name("alias")
                            .map(|a| text(a, source).to_string())
                            .unwrap_or_else(|| imported.clone());
                        if imported == "default" {
                            self.bind(&local, &module, ImportKind::Default);
                        } else {
                            self.bind(&local, &module, ImportKind::Named(imported));
                        }
                    }
                }
                _ => {}
            }
        }
    }

    /// `const X = require("m")`, `const { A, B: C } = require("m")`,
    /// `const A = require("m").A`.
    fn ecma_require(&mut self, node: Node<'_>, source: &[u8]) {
        let (Some(name), Some(value)) = (
            node.child_by_field_name("name"),
            node.child_by_field_name("value"),
        ) else {
            return;
        };

        if let Some(module) = require_module(value, source) {
            match name.kind() {
                "identifier" => self.bind(text(name, source), &module, ImportKind::CommonJs),
                "object_pattern" => {
                    let mut cursor = name.walk();
                    for prop in name.named_children(&mut cursor) {
                        match prop.kind() {
                            "shorthand_property_identifier_pattern" => {
                                let local = text(prop, source);
                                self.bind(local, &module, ImportKind::Named(local.to_string()));
                            }
                            "pair_pattern" => {
                                let key = prop.child_by_field_name("key");
                                let val = prop.child_by_field_name("value");
                                if let (Some(key), Some(val)) = (key, val) {
                                    if val.kind() == "identifier" {
                                        self.bind(
                                            text(val, source),
                                            &module,
                                            ImportKind::Named(text(key, source).to_string()),
                                        );
                                    }
                                }
                            }
                            _ => {}
                        }
                    }
                }
                _ => {}
            }
            return;
        }

        if value.kind() == "member_expression" && name.kind() == "identifier" {
            let object = value.child_by_field_name("object");
            let property = value.child_by_field_name("property");
            if let (Some(object), Some(property)) = (object, property) {
                if let Some(module) = require_module(object, source) {
                    self.bind(
                        text(name, source),
                        &module,
                        ImportKind::Named(text(property, source).to_string()),
                    );
                }
            }
        }
    }

    fn ecma_definitions(&mut self, root: Node<'_>, source: &[u8]) {
        let mut names = Vec::new();
        let mut cursor = root.walk();
        for stmt in root.named_children(&mut cursor) {
            ecma_declared_names(stmt, source, &mut names);
        }
        self.definitions.extend(names.into_iter().map(str::to_string));
    }

    // ---- Python ----

    fn python_import(&mut self, node: Node<'_>, source: &[u8]) {
        let mut cursor = node.walk();
        let names: Vec<Node<'_>> = node.children_by_field_name("name", &mut cursor).collect();
        for name in names {
            match name.kind() {
                // `import a.b` binds `a`.
                "dotted_name" => {
                    let full = text(name, source);
                    let head = full.split('.').next().unwrap_or(full);
                    self.bind(head, head, ImportKind::Namespace);
                }
                "aliased_import" => {
                    let module = name.child_by_field_name("name").map(|n| text(n, source));
                    let alias = name.child_by_field_name("alias").map(|n| text(n, source));
                    if let (Some(module), Some(alias)) = (module, alias) {
                        self.bind(alias, module, ImportKind::Namespace);
                    }
                }
                _ => {}
            }
        }
    }

    fn python_import_from(&mut self, node: Node<'_>, source: &[u8]) {
        let Some(module_node) = node.child_by_field_name("module_name") else {
            return;
        };
        if module_node.kind() != "dotted_name" {
            // Relative imports never reach an installed SDK.
            return;
        }
        let module = text(module_node, source).to_string();

        let mut cursor = node.walk();
        let wildcard = node
            .named_children(&mut cursor)
            .any(|c| c.kind() == "wildcard_import");
        if wildcard {
            if let Some(provider) = Provider::for_module(LanguageFamily::Python, &module) {
                for class in provider.surface(LanguageFamily::Python).classes {
                    self.bind(class, &module, ImportKind::Named(class.to_string()));
                }
            }
            return;
        }

        let mut cursor = node.walk();
        let names: Vec<Node<'_>> = node.children_by_field_name("name", &mut cursor).collect();
        for name in names {
            match name.kind() {
                "dotted_name" => {
                    let imported = text(name, source);
                    self.bind(imported, &module, ImportKind::Named(imported.to_string()));
                }
                "aliased_import" => {
                    let imported = name.child_by_field_name("name").map(|n| text(n, source));
                    let alias = name.child_by_field_name("alias").map(|n| text(n, source));
                    if let (Some(imported), Some(alias)) = (imported, alias) {
                        self.bind(alias, &module, ImportKind::Named(imported.to_string()));
                    }
                }
                _ => {}
            }
        }
    }

    fn python_definitions(&mut self, root: Node<'_>, source: &[u8]) {
        let mut cursor = root.walk();
        for stmt in root.named_children(&mut cursor) {
            let def = if stmt.kind() == "decorated_definition" {
                match stmt.child_by_field_name("definition") {
                    Some(d) => d,
                    None => continue,
                }
            } else {
                stmt
            };
            match def.kind() {
                "class_definition" | "function_definition" => {
                    if let Some(name) = def.child_by_field_name("name") {
                        self.definitions.insert(text(name, source).to_string());
                    }
                }
                "expression_statement" => {
                    let mut c = def.walk();
                    for expr in def.named_children(&mut c) {
                        if expr.kind() != "assignment" {
                            continue;
                        }
                        if let Some(left) = expr.child_by_field_name("left") {
                            if left.kind() == "identifier" {
                                self.definitions.insert(text(left, source).to_string());
                            }
                        }
                    }
                }
                _ => {}
            }
        }
    }
}

/// Pre-order visit of every node under `root`.
pub(crate) fn for_each_node<'t>(root: Node<'t>, mut f: impl FnMut(Node<'t>)) {
    let mut cursor = root.walk();
    loop {
        f(cursor.node());
        if cursor.goto_first_child() {
            continue;
        }
        loop {
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() {
                return;
            }
        }
    }
}

/// Whether `node` sits outside every function, class, and lambda.
fn is_module_level(node: Node<'_>, family: LanguageFamily) -> bool {
    let nested: &[&str] = match family {
        LanguageFamily::Ecma => &[
            "function_declaration",
            "generator_function_declaration",
            "function_expression",
            "function",
            "generator_function",
            "arrow_function",
            "method_definition",
            "class_body",
        ],
        LanguageFamily::Python => &["function_definition", "class_definition", "lambda"],
    };
    let mut current = node.parent();
    while let Some(parent) = current {
        if nested.contains(&parent.kind()) {
            return false;
        }
        current = parent.parent();
    }
    true
}

pub(crate) fn text<'s>(node: Node<'_>, source: &'s [u8]) -> &'s str {
    node.utf8_text(source).unwrap_or("")
}

/// Whether `node` has an anonymous child token with the given text.
fn has_token(node: Node<'_>, token: &str) -> bool {
    let mut cursor = node.walk();
    let found = node
        .children(&mut cursor)
        .any(|c| !c.is_named() && c.kind() == token);
    found
}

/// Value of a plain TS/JS string literal (no escapes).
pub(crate) fn ecma_string_value(node: Node<'_>, source: &[u8]) -> Option<String> {
    if node.kind() != "string" {
        return None;
    }
    let mut cursor = node.walk();
    let parts: Vec<Node<'_>> = node.named_children(&mut cursor).collect();
    match parts.as_slice() {
        [] => Some(String::new()),
        [fragment] if fragment.kind() == "string_fragment" => {
            Some(text(*fragment, source).to_string())
        }
        _ => None,
    }
}

/// `require("m")` → `m`.
pub(crate) fn require_module(node: Node<'_>, source: &[u8]) -> Option<String> {
    if node.kind() != "call_expression" {
        return None;
    }
    let function = node.child_by_field_name("function")?;
    if function.kind() != "identifier" || text(function, source) != "require" {
        return None;
    }
    let args = node.child_by_field_name("arguments")?;
    let mut cursor = args.walk();
    let first = args
        .named_children(&mut cursor)
        .find(|c| !c.is_extra())?;
    ecma_string_value(first, source)
}
