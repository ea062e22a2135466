use crate::errors::ParamsError;
use regex::{Captures, Regex};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

const NAME_PATTERN: &str = "[A-Za-z_][0-9A-Za-z_]*";

static NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::unwrap_used)]
    Regex::new(&format!("^{}$", NAME_PATTERN)).unwrap()
});

static DECLARATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::unwrap_used)]
    Regex::new(&format!(r"\{{\{{ *({}) *\}}\}}", NAME_PATTERN)).unwrap()
});

pub fn is_identifier(name: &str) -> bool {
    NAME_RE.is_match(name)
}

/// Template parameters supplied on the command line; later values win.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params(BTreeMap<String, String>);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Adds every `NAME=VALUE` element of a comma separated `--param` argument.
    pub fn add_arg(&mut self, arg: &str) -> Result<(), ParamsError> {
        for (name, value) in parse_param_arg(arg)? {
            self.insert(name, value);
        }
        Ok(())
    }

    pub fn extend(&mut self, other: Params) {
        self.0.extend(other.0);
    }
}

impl FromStr for Params {
    type Err = ParamsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut params = Params::new();
        params.add_arg(s)?;
        Ok(params)
    }
}

impl fmt::Display for Params {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pairs: Vec<String> = self.0.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
        write!(f, "{}", pairs.join(","))
    }
}

pub fn parse_param_arg(arg: &str) -> Result<Vec<(String, String)>, ParamsError> {
    arg.split(',')
        .map(|element| {
            let (name, value) = element
                .split_once('=')
                .ok_or_else(|| ParamsError::MissingValue(element.to_string()))?;
            if !is_identifier(name) {
                return Err(ParamsError::InvalidName(name.to_string()));
            }
            Ok((name.to_string(), value.to_string()))
        })
        .collect()
}

/// Names referenced by `{{ NAME }}` declarations, without duplicates.
pub fn declared_params(template: &str) -> BTreeSet<String> {
    DECLARATION_RE
        .captures_iter(template)
        .map(|caps| caps[1].to_string())
        .collect()
}

/// Replaces every `{{ NAME }}` declaration with its value.
///
/// Fails on the first declaration that has no value.
pub fn replace_params(template: &str, params: &Params) -> Result<String, ParamsError> {
    let declared = declared_params(template);
    if let Some(missing) = declared.iter().find(|name| params.get(name).is_none()) {
        return Err(ParamsError::Unspecified(missing.clone()));
    }

    for (name, _) in params.0.iter().filter(|(name, _)| !declared.contains(*name)) {
        tracing::debug!("Parameter {} is not referenced by the template", name);
    }

    let rendered = DECLARATION_RE.replace_all(template, |caps: &Captures| {
        params.get(&caps[1]).unwrap_or_default().to_string()
    });
    Ok(rendered.into_owned())
}
