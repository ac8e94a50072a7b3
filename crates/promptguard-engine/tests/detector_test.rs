//! Detector tests: precision, import-binding resolution, and ambiguity.

use std::path::Path;

use promptguard_core::{Language, Provider};
use promptguard_engine::detectors::{Detector, FileDetection, WarningKind};
use promptguard_engine::parsers::{AstProvider, SourceFile};

fn detect(rel: &str, src: &str) -> FileDetection {
    let language = Language::from_path(Path::new(rel)).unwrap();
    let file = SourceFile::from_text(rel, language, src);
    let tree = AstProvider::for_language(language)
        .parse(&file.text, &file.path)
        .unwrap();
    Detector::all().detect(&file, &tree)
}

// ---- Precision ----

#[test]
fn typescript_fixture_has_exactly_one_match() {
    let src = r#"import OpenAI from "openai";

// new OpenAI({ apiKey: "sk-commented-out" })
/* const old = new OpenAI(); */
const banner = "call new OpenAI() to build an OpenAI client";
const template = `new OpenAI(${banner})`;

export const client = new OpenAI({ apiKey: process.env.OPENAI_API_KEY });
"#;
    let detection = detect("src/client.ts", src);
    assert_eq!(detection.matches.len(), 1);
    let m = &detection.matches[0];
    assert_eq!(m.provider, Provider::OpenAI);
    assert_eq!(m.class_name, "OpenAI");
    assert_eq!(m.line, 8);
    assert!(!m.already_proxied);
    assert!(detection.warnings.is_empty());
}

#[test]
fn javascript_fixture_has_exactly_one_match() {
    let src = r#"const Anthropic = require("@anthropic-ai/sdk");

// const legacy = new Anthropic();
const help = "new Anthropic({ apiKey }) creates a client";

const anthropic = new Anthropic({ apiKey: process.env["ANTHROPIC_API_KEY"] });
module.exports = { anthropic, help };
"#;
    let detection = detect("lib/anthropic.js", src);
    assert_eq!(detection.matches.len(), 1);
    assert_eq!(detection.matches[0].provider, Provider::Anthropic);
    assert_eq!(detection.matches[0].line, 6);
}

#[test]
fn python_fixture_has_exactly_one_match() {
    let src = r#""""Client setup. Do not call OpenAI() at import time."""
import os

from openai import OpenAI

# client = OpenAI(api_key="sk-old")
HELP = "OpenAI(api_key=...) builds a client"

client = OpenAI(api_key=os.environ.get("OPENAI_API_KEY"))
"#;
    let detection = detect("app/llm.py", src);
    assert_eq!(detection.matches.len(), 1);
    let m = &detection.matches[0];
    assert_eq!(m.provider, Provider::OpenAI);
    assert_eq!(m.line, 9);
    assert_eq!(m.args.as_ref().map(|a| a.kind), Some("argument_list"));
}

#[test]
fn tsx_is_parsed_with_jsx() {
    let src = r#"import OpenAI from "openai";
const client = new OpenAI();
export const View = () => <div>{String(client)}</div>;
"#;
    let detection = detect("ui/view.tsx", src);
    assert_eq!(detection.matches.len(), 1);
}

// ---- Binding forms ----

#[test]
fn aliased_named_and_namespace_imports_resolve() {
    let src = r#"import { OpenAI as LLM } from "openai";
import * as cohere from "cohere-ai";
import { HfInference } from "@huggingface/inference";

const a = new LLM();
const b = new cohere.CohereClient({ token: process.env.CO_API_KEY });
const c = new HfInference(process.env.HF_TOKEN);
"#;
    let detection = detect("src/multi.ts", src);
    let providers: Vec<Provider> = detection.matches.iter().map(|m| m.provider).collect();
    assert_eq!(
        providers,
        vec![Provider::OpenAI, Provider::Cohere, Provider::HuggingFace]
    );
    assert_eq!(detection.matches[0].class_name, "LLM");
    assert_eq!(detection.matches[1].class_name, "CohereClient");
}

#[test]
fn destructured_require_resolves() {
    let src = r#"const { CohereClientV2 } = require("cohere-ai");
const co = new CohereClientV2({ token: process.env.CO_API_KEY });
"#;
    let detection = detect("src/co.cjs", src);
    assert_eq!(detection.matches.len(), 1);
    assert_eq!(detection.matches[0].provider, Provider::Cohere);
}

#[test]
fn python_module_import_and_async_class() {
    let src = r#"import anthropic
import cohere as co
from huggingface_hub import AsyncInferenceClient

a = anthropic.AsyncAnthropic()
b = co.ClientV2(api_key="x")
c = AsyncInferenceClient(token="t")
"#;
    let detection = detect("svc/clients.py", src);
    let providers: Vec<Provider> = detection.matches.iter().map(|m| m.provider).collect();
    assert_eq!(
        providers,
        vec![Provider::Anthropic, Provider::Cohere, Provider::HuggingFace]
    );
}

#[test]
fn type_only_imports_do_not_bind() {
    let src = r#"import type OpenAI from "openai";
const client = new OpenAI();
"#;
    assert!(detect("src/types.ts", src).matches.is_empty());
}

#[test]
fn already_proxied_is_flagged() {
    let src = r#"import OpenAI from "openai";
const client = new OpenAI({ baseUrl: "https://example.test/v1" });
"#;
    let detection = detect("src/proxied.ts", src);
    assert_eq!(detection.matches.len(), 1);
    assert!(detection.matches[0].already_proxied);

    let py = "from openai import OpenAI\nclient = OpenAI(base_url='https://example.test')\n";
    assert!(detect("p.py", py).matches[0].already_proxied);
}

// ---- Disambiguation ----

#[test]
fn local_class_with_provider_name_is_not_matched() {
    let ts = r#"class OpenAI {
  constructor(readonly opts: object) {}
}
const fake = new OpenAI({ apiKey: process.env.OPENAI_API_KEY });
"#;
    let detection = detect("src/fake.ts", ts);
    assert!(detection.matches.is_empty());
    assert!(detection.warnings.is_empty());

    let py = r#"class Anthropic:
    def __init__(self, api_key=None):
        self.api_key = api_key

client = Anthropic(api_key="local")
"#;
    assert!(detect("fake.py", py).matches.is_empty());
}

#[test]
fn same_class_name_from_other_package_is_not_matched() {
    let src = r#"import { OpenAI } from "./mocks/openai";
const client = new OpenAI();
"#;
    assert!(detect("src/mocked.ts", src).matches.is_empty());

    let py = "from .mocks import OpenAI\nclient = OpenAI()\n";
    assert!(detect("mocked.py", py).matches.is_empty());
}

#[test]
fn conflicting_bindings_are_warned_not_matched() {
    let py = r#"from openai import OpenAI
from anthropic import Anthropic as OpenAI

client = OpenAI()
"#;
    let detection = detect("conflict.py", py);
    assert!(detection.matches.is_empty());
    assert_eq!(detection.warnings.len(), 1);
    assert_eq!(detection.warnings[0].kind, WarningKind::PatternAmbiguous);
    assert_eq!(detection.warnings[0].line, 4);
}

#[test]
fn import_shadowed_by_local_definition_is_warned() {
    let src = r#"import OpenAI from "openai";
function OpenAI() {}
const client = new OpenAI();
"#;
    let detection = detect("src/shadow.js", src);
    assert!(detection.matches.is_empty());
    assert_eq!(detection.warnings.len(), 1);
    assert!(detection.warnings[0].message.contains("also defined"));
}

#[test]
fn parameter_shadowing_an_import_is_not_matched() {
    let src = r#"import OpenAI from "openai";

function make(OpenAI, k) {
  return new OpenAI({ apiKey: k });
}
const arrow = (OpenAI) => new OpenAI();
const real = new OpenAI({ apiKey: process.env.OPENAI_API_KEY });
"#;
    let detection = detect("src/factory.ts", src);
    assert_eq!(detection.matches.len(), 1);
    assert_eq!(detection.matches[0].line, 7);
    assert!(detection.warnings.is_empty());
}

#[test]
fn block_declaration_shadowing_an_import_is_not_matched() {
    let src = r#"const OpenAI = require("openai");

if (process.env.MOCK) {
  const OpenAI = class { constructor(o) {} };
  module.exports = new OpenAI({});
}
try {
  run();
} catch (OpenAI) {
  new OpenAI();
}
"#;
    assert!(detect("lib/mock.js", src).matches.is_empty());
}

#[test]
fn python_nested_class_shadowing_an_import_is_not_matched() {
    let src = r#"from openai import OpenAI

def make(k):
    class OpenAI: ...
    return OpenAI(api_key=k)

def make_real(k):
    return OpenAI(api_key=k)
"#;
    let detection = detect("factory.py", src);
    assert_eq!(detection.matches.len(), 1);
    assert_eq!(detection.matches[0].line, 8);
    assert!(detection.warnings.is_empty());
}

#[test]
fn python_parameters_and_assignments_shadow_imports() {
    let src = r#"import anthropic
from openai import OpenAI

def with_param(OpenAI):
    return OpenAI()

def with_assignment():
    anthropic = load_stub()
    return anthropic.Anthropic()

def with_global():
    global OpenAI
    return OpenAI()

class Holder:
    OpenAI = object

    def build(self):
        return OpenAI()
"#;
    let detection = detect("shadows.py", src);
    let lines: Vec<usize> = detection.matches.iter().map(|m| m.line).collect();
    assert_eq!(lines, vec![13, 19]);
}

#[test]
fn provider_filter_limits_detection() {
    let src = r#"import OpenAI from "openai";
import Anthropic from "@anthropic-ai/sdk";
const a = new OpenAI();
const b = new Anthropic();
"#;
    let file = SourceFile::from_text("src/both.ts", Language::TypeScript, src);
    let tree = AstProvider::for_language(Language::TypeScript)
        .parse(&file.text, &file.path)
        .unwrap();
    let detection = Detector::new([Provider::Anthropic]).detect(&file, &tree);
    assert_eq!(detection.matches.len(), 1);
    assert_eq!(detection.matches[0].provider, Provider::Anthropic);
}
