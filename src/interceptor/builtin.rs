//! Built-in interceptors for `String`-valued maps.
//!
//! These are the kinds a node binary knows how to decode without any user
//! code, and the ones the HTTP API can register by name.

use super::factory::InterceptorFactory;
use super::types::{InterceptorError, MapInterceptor, RemoveOutcome, Transportable};

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Appends a suffix to every value read.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SuffixInterceptor {
    pub suffix: String,
}

impl Transportable for SuffixInterceptor {
    const KIND: &'static str = "suffix";
}

impl MapInterceptor<String> for SuffixInterceptor {
    fn intercept_get(&self, value: String) -> Result<String, InterceptorError> {
        Ok(value + &self.suffix)
    }
}

/// Stores every written value upper-cased.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct UppercaseInterceptor;

impl Transportable for UppercaseInterceptor {
    const KIND: &'static str = "uppercase";
}

impl MapInterceptor<String> for UppercaseInterceptor {
    fn intercept_put(&self, _old: Option<&String>, new: String) -> Result<String, InterceptorError> {
        Ok(new.to_uppercase())
    }
}

/// Vetoes the removal of any entry whose stored value is protected.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct GuardInterceptor {
    pub protected: BTreeSet<String>,
}

impl GuardInterceptor {
    pub fn protecting<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            protected: values.into_iter().map(Into::into).collect(),
        }
    }
}

impl Transportable for GuardInterceptor {
    const KIND: &'static str = "guard";
}

impl MapInterceptor<String> for GuardInterceptor {
    fn intercept_remove(&self, removed: String) -> Result<RemoveOutcome<String>, InterceptorError> {
        if self.protected.contains(&removed) {
            return Ok(RemoveOutcome::veto(format!("'{}' is protected", removed)));
        }
        Ok(RemoveOutcome::proceed(removed))
    }
}

/// Wire form used by the HTTP API to register a built-in interceptor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BuiltinInterceptor {
    Suffix { suffix: String },
    Uppercase,
    Guard { protected: Vec<String> },
}

/// Makes every built-in kind decodable by `factory`.
pub fn register_builtin_kinds(factory: &InterceptorFactory<String>) {
    factory.register::<SuffixInterceptor>();
    factory.register::<UppercaseInterceptor>();
    factory.register::<GuardInterceptor>();
}
