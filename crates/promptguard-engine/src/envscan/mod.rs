//! Env scanner: which LLM-related variables the project defines in `.env`
//! files and which ones its code reads.

pub mod dotenv;
pub mod usage;

use std::collections::BTreeMap;

use serde::Serialize;

pub use dotenv::{find_env_files, load_definitions, parse_dotenv, EnvDefinition, ENV_FILE_NAMES};
pub use usage::{env_usages, EnvUsage};

/// Name segments that mark a variable as worth reporting.
const KEYWORDS: &[&str] = &[
    "API",
    "KEY",
    "SECRET",
    "TOKEN",
    "URL",
    "ENDPOINT",
    "BASE",
    "OPENAI",
    "ANTHROPIC",
    "COHERE",
    "HUGGINGFACE",
    "HF",
];

/// Whether `name` looks like an LLM credential or endpoint. `watched`
/// names always count.
pub fn is_llm_related(name: &str, watched: &[&str]) -> bool {
    watched.contains(&name)
        || name
            .split('_')
            .any(|segment| KEYWORDS.contains(&segment.to_ascii_uppercase().as_str()))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnvLocation {
    pub path: String,
    pub line: usize,
}

/// One variable, where it is defined and where it is read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EnvVariable {
    pub name: String,
    pub defined_in: Vec<EnvLocation>,
    pub used_in: Vec<EnvLocation>,
    /// Some definition assigns a non-empty value.
    pub has_value: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EnvReport {
    /// Env files found, relative to the root.
    pub env_files: Vec<String>,
    /// LLM-related variables, by name.
    pub variables: Vec<EnvVariable>,
}

impl EnvReport {
    pub fn build(
        env_files: Vec<String>,
        definitions: Vec<EnvDefinition>,
        usages: Vec<EnvUsage>,
        watched: &[&str],
    ) -> Self {
        let mut by_name: BTreeMap<String, EnvVariable> = BTreeMap::new();
        for def in definitions {
            if !is_llm_related(&def.name, watched) {
                continue;
            }
            let var = slot(&mut by_name, &def.name);
            var.has_value |= def.has_value;
            var.defined_in.push(EnvLocation {
                path: def.path,
                line: def.line,
            });
        }
        for usage in usages {
            if !is_llm_related(&usage.name, watched) {
                continue;
            }
            let var = slot(&mut by_name, &usage.name);
            let location = EnvLocation {
                path: usage.path,
                line: usage.line,
            };
            if !var.used_in.contains(&location) {
                var.used_in.push(location);
            }
        }

        Self {
            env_files,
            variables: by_name.into_values().collect(),
        }
    }

    pub fn variable(&self, name: &str) -> Option<&EnvVariable> {
        self.variables.iter().find(|v| v.name == name)
    }

    /// Variables read by code but defined in no env file.
    pub fn undefined(&self) -> impl Iterator<Item = &EnvVariable> {
        self.variables
            .iter()
            .filter(|v| v.defined_in.is_empty() && !v.used_in.is_empty())
    }
}

fn slot<'m>(by_name: &'m mut BTreeMap<String, EnvVariable>, name: &str) -> &'m mut EnvVariable {
    by_name
        .entry(name.to_string())
        .or_insert_with(|| EnvVariable {
            name: name.to_string(),
            ..EnvVariable::default()
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usage(path: &str, line: usize, name: &str) -> EnvUsage {
        EnvUsage {
            path: path.to_string(),
            line,
            column: 1,
            name: name.to_string(),
        }
    }

    #[test]
    fn keyword_filter() {
        assert!(is_llm_related("OPENAI_API_KEY", &[]));
        assert!(is_llm_related("HF_TOKEN", &[]));
        assert!(is_llm_related("api_base", &[]));
        assert!(!is_llm_related("NODE_ENV", &[]));
        assert!(!is_llm_related("PORT", &[]));
        assert!(is_llm_related("PORT", &["PORT"]));
    }

    #[test]
    fn groups_definitions_and_usages_by_name() {
        let defs = parse_dotenv(".env", "OPENAI_API_KEY=sk\nNODE_ENV=dev\nPROMPTGUARD_API_KEY=\n");
        let usages = vec![
            usage("src/app.ts", 3, "OPENAI_API_KEY"),
            usage("src/app.ts", 3, "OPENAI_API_KEY"),
            usage("bot/main.py", 4, "ANTHROPIC_API_KEY"),
            usage("src/app.ts", 9, "NODE_ENV"),
        ];
        let report = EnvReport::build(vec![".env".to_string()], defs, usages, &[]);

        let names: Vec<&str> = report.variables.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["ANTHROPIC_API_KEY", "OPENAI_API_KEY", "PROMPTGUARD_API_KEY"]);

        let openai = report.variable("OPENAI_API_KEY").unwrap();
        assert!(openai.has_value);
        assert_eq!(openai.used_in.len(), 1);
        assert!(!report.variable("PROMPTGUARD_API_KEY").unwrap().has_value);

        let undefined: Vec<&str> = report.undefined().map(|v| v.name.as_str()).collect();
        assert_eq!(undefined, vec!["ANTHROPIC_API_KEY"]);
    }
}
