//! LLM provider registry.
//!
//! Each provider is described as plain data: the packages that export its
//! client classes, the class names, and the argument keys used for the
//! credential and the base URL in each language family. The detector and
//! transformer consume this table; nothing else branches on a provider.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::language::LanguageFamily;

/// An LLM vendor SDK targeted for detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    OpenAI,
    Anthropic,
    Cohere,
    HuggingFace,
}

/// The SDK surface of one provider in one language family.
#[derive(Debug, Clone, Copy)]
pub struct SdkSurface {
    /// Package (TS/JS) or top-level module (Python) names.
    pub packages: &'static [&'static str],
    /// Constructible client classes exported by the package.
    pub classes: &'static [&'static str],
    /// Class bound by a default import or a whole-module `require`.
    pub default_export: Option<&'static str>,
    /// Argument key carrying the credential.
    pub credential_key: &'static str,
    /// Argument key carrying the base URL.
    pub proxy_key: &'static str,
}

#[derive(Debug, Clone, Copy)]
pub struct ProviderSpec {
    pub provider: Provider,
    pub ecma: SdkSurface,
    pub python: SdkSurface,
    /// Env vars the SDK reads by default. The first one is restored by disable.
    pub default_env_vars: &'static [&'static str],
}

/// Keys that mean "a base URL is already configured".
const ECMA_PROXY_KEYS: &[&str] = &["baseURL", "baseUrl", "base_url"];
const PYTHON_PROXY_KEYS: &[&str] = &["base_url"];

static OPENAI: ProviderSpec = ProviderSpec {
    provider: Provider::OpenAI,
    ecma: SdkSurface {
        packages: &["openai"],
        classes: &["OpenAI"],
        default_export: Some("OpenAI"),
        credential_key: "apiKey",
        proxy_key: "baseURL",
    },
    python: SdkSurface {
        packages: &["openai"],
        classes: &["OpenAI", "AsyncOpenAI"],
        default_export: None,
        credential_key: "api_key",
        proxy_key: "base_url",
    },
    default_env_vars: &["OPENAI_API_KEY"],
};

static ANTHROPIC: ProviderSpec = ProviderSpec {
    provider: Provider::Anthropic,
    ecma: SdkSurface {
        packages: &["@anthropic-ai/sdk"],
        classes: &["Anthropic"],
        default_export: Some("Anthropic"),
        credential_key: "apiKey",
        proxy_key: "baseURL",
    },
    python: SdkSurface {
        packages: &["anthropic"],
        classes: &["Anthropic", "AsyncAnthropic"],
        default_export: None,
        credential_key: "api_key",
        proxy_key: "base_url",
    },
    default_env_vars: &["ANTHROPIC_API_KEY"],
};

static COHERE: ProviderSpec = ProviderSpec {
    provider: Provider::Cohere,
    ecma: SdkSurface {
        packages: &["cohere-ai"],
        classes: &["CohereClient", "CohereClientV2"],
        default_export: None,
        credential_key: "token",
        proxy_key: "baseURL",
    },
    python: SdkSurface {
        packages: &["cohere"],
        classes: &["Client", "ClientV2", "AsyncClient", "AsyncClientV2"],
        default_export: None,
        credential_key: "api_key",
        proxy_key: "base_url",
    },
    default_env_vars: &["CO_API_KEY", "COHERE_API_KEY"],
};

static HUGGINGFACE: ProviderSpec = ProviderSpec {
    provider: Provider::HuggingFace,
    ecma: SdkSurface {
        packages: &["@huggingface/inference"],
        classes: &["HfInference", "InferenceClient"],
        default_export: None,
        credential_key: "accessToken",
        proxy_key: "baseUrl",
    },
    python: SdkSurface {
        packages: &["huggingface_hub"],
        classes: &["InferenceClient", "AsyncInferenceClient"],
        default_export: None,
        credential_key: "token",
        proxy_key: "base_url",
    },
    default_env_vars: &["HF_TOKEN", "HUGGINGFACE_API_KEY"],
};

impl Provider {
    pub const ALL: [Provider; 4] = [
        Provider::OpenAI,
        Provider::Anthropic,
        Provider::Cohere,
        Provider::HuggingFace,
    ];

    pub fn spec(self) -> &'static ProviderSpec {
        match self {
            Self::OpenAI => &OPENAI,
            Self::Anthropic => &ANTHROPIC,
            Self::Cohere => &COHERE,
            Self::HuggingFace => &HUGGINGFACE,
        }
    }

    pub fn surface(self, family: LanguageFamily) -> &'static SdkSurface {
        let spec = self.spec();
        match family {
            LanguageFamily::Ecma => &spec.ecma,
            LanguageFamily::Python => &spec.python,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::OpenAI => "openai",
            Self::Anthropic => "anthropic",
            Self::Cohere => "cohere",
            Self::HuggingFace => "huggingface",
        }
    }

    pub fn default_env_vars(self) -> &'static [&'static str] {
        self.spec().default_env_vars
    }

    /// The env var name disable restores.
    pub fn primary_env_var(self) -> &'static str {
        self.spec().default_env_vars[0]
    }

    /// Whether `module` (an import specifier) belongs to this provider's SDK.
    /// Subpaths count: `openai/resources` and `huggingface_hub.inference`.
    pub fn owns_module(self, family: LanguageFamily, module: &str) -> bool {
        let sep = match family {
            LanguageFamily::Ecma => '/',
            LanguageFamily::Python => '.',
        };
        self.surface(family).packages.iter().any(|pkg| {
            module == *pkg
                || (module.len() > pkg.len()
                    && module.starts_with(pkg)
                    && module[pkg.len()..].starts_with(sep))
        })
    }

    pub fn exports_class(self, family: LanguageFamily, name: &str) -> bool {
        self.surface(family).classes.contains(&name)
    }

    /// Find the provider whose SDK owns `module`.
    pub fn for_module(family: LanguageFamily, module: &str) -> Option<Provider> {
        Self::ALL
            .into_iter()
            .find(|p| p.owns_module(family, module))
    }
}

/// Argument keys that indicate a base URL is already configured.
pub fn recognized_proxy_keys(family: LanguageFamily) -> &'static [&'static str] {
    match family {
        LanguageFamily::Ecma => ECMA_PROXY_KEYS,
        LanguageFamily::Python => PYTHON_PROXY_KEYS,
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAI),
            "anthropic" => Ok(Self::Anthropic),
            "cohere" => Ok(Self::Cohere),
            "huggingface" | "hf" => Ok(Self::HuggingFace),
            other => Err(format!("unknown provider: {other}")),
        }
    }
}
