//! The shapes the detector and transformer run, built from provider data
//! and a file's import bindings.

use promptguard_core::LanguageFamily;

use super::shape::{NodeShape, Shape};

/// Capture names shared by every constructor shape.
pub const CALL: &str = "call";
pub const CLASS: &str = "class";
pub const NAMESPACE: &str = "namespace";
pub const ARGS: &str = "args";

/// Capture names of env-lookup shapes.
pub const ENV_NAME: &str = "env_name";
pub const ENV_STRING: &str = "env_string";
pub const ENV_ARGS: &str = "env_args";

/// Local names a constructor call may go through for one provider.
#[derive(Debug, Clone, Default)]
pub struct CalleeNames {
    /// Identifiers bound directly to a client class.
    pub constructors: Vec<String>,
    /// Identifiers bound to the SDK module (`ns.Class(...)`).
    pub namespaces: Vec<String>,
    /// Class names accepted after a namespace.
    pub classes: Vec<String>,
}

impl CalleeNames {
    pub fn is_empty(&self) -> bool {
        self.constructors.is_empty() && self.namespaces.is_empty()
    }
}

/// Constructor-call shape for one family.
///
/// TS/JS: `new C(args?)` or `new ns.C(args?)`.
/// Python: `C(args)` or `ns.C(args)`.
pub fn constructor_shape(family: LanguageFamily, names: &CalleeNames) -> Shape {
    match family {
        LanguageFamily::Ecma => Shape::node("new_expression")
            .field(
                "constructor",
                Shape::one_of(vec![
                    Shape::node("identifier")
                        .text_in(names.constructors.iter().cloned())
                        .capture(CLASS),
                    Shape::node("member_expression")
                        .field(
                            "object",
                            Shape::node("identifier")
                                .text_in(names.namespaces.iter().cloned())
                                .capture(NAMESPACE),
                        )
                        .field(
                            "property",
                            Shape::node("property_identifier")
                                .text_in(names.classes.iter().cloned())
                                .capture(CLASS),
                        )
                        .into(),
                ]),
            )
            .optional_field("arguments", Shape::node("arguments").capture(ARGS))
            .capture(CALL),
        LanguageFamily::Python => Shape::node("call")
            .field(
                "function",
                Shape::one_of(vec![
                    Shape::node("identifier")
                        .text_in(names.constructors.iter().cloned())
                        .capture(CLASS),
                    Shape::node("attribute")
                        .field(
                            "object",
                            Shape::node("identifier")
                                .text_in(names.namespaces.iter().cloned())
                                .capture(NAMESPACE),
                        )
                        .field(
                            "attribute",
                            Shape::node("identifier")
                                .text_in(names.classes.iter().cloned())
                                .capture(CLASS),
                        )
                        .into(),
                ]),
            )
            .field("arguments", Shape::any().capture(ARGS))
            .capture(CALL),
    }
}

/// Names through which Python code reaches the environment.
#[derive(Debug, Clone, Default)]
pub struct EnvAccessNames {
    /// Local names of the `os` module.
    pub os: Vec<String>,
    /// Local names of `os.environ` (`from os import environ`).
    pub environ: Vec<String>,
    /// Local names of `os.getenv` (`from os import getenv`).
    pub getenv: Vec<String>,
}

/// Env-lookup shapes for TS/JS: `process.env.NAME` and `process.env["NAME"]`.
/// `names` restricts the dotted form to the given variables.
pub fn ecma_env_shapes(names: &[&str]) -> Vec<Shape> {
    ecma_env_shapes_with(Shape::node("property_identifier").text_in(names.iter().copied()))
}

/// Like [`ecma_env_shapes`], for any variable name.
pub fn ecma_env_usage_shapes() -> Vec<Shape> {
    ecma_env_shapes_with(Shape::node("property_identifier"))
}

fn ecma_env_shapes_with(property: NodeShape) -> Vec<Shape> {
    let process_env = || -> Shape {
        Shape::node("member_expression")
            .field("object", Shape::node("identifier").text_in(["process"]))
            .field("property", Shape::node("property_identifier").text_in(["env"]))
            .into()
    };
    vec![
        Shape::node("member_expression")
            .field("object", process_env())
            .field("property", property.capture(ENV_NAME))
            .into(),
        Shape::node("subscript_expression")
            .field("object", process_env())
            .field("index", Shape::node("string").capture(ENV_STRING))
            .into(),
    ]
}

/// Env-lookup shapes for Python. Call forms capture their argument list;
/// the key is the first positional argument.
pub fn python_env_shapes(names: &EnvAccessNames) -> Vec<Shape> {
    let os = || Shape::node("identifier").text_in(names.os.iter().cloned());
    let environ = || Shape::node("identifier").text_in(names.environ.iter().cloned());
    let os_environ = || -> Shape {
        Shape::node("attribute")
            .field("object", os())
            .field("attribute", Shape::node("identifier").text_in(["environ"]))
            .into()
    };
    let method = |object: Shape, name: &'static str| -> Shape {
        Shape::node("attribute")
            .field("object", object)
            .field("attribute", Shape::node("identifier").text_in([name]))
            .into()
    };
    let call = |function: Shape| -> Shape {
        Shape::node("call")
            .field("function", function)
            .field("arguments", Shape::node("argument_list").capture(ENV_ARGS))
            .into()
    };
    let subscript = |value: Shape| -> Shape {
        Shape::node("subscript")
            .field("value", value)
            .field("subscript", Shape::node("string").capture(ENV_STRING))
            .into()
    };

    vec![
        call(method(os_environ(), "get")),
        call(method(environ().into(), "get")),
        call(method(os().into(), "getenv")),
        call(
            Shape::node("identifier")
                .text_in(names.getenv.iter().cloned())
                .into(),
        ),
        subscript(os_environ()),
        subscript(environ().into()),
    ]
}
