use std::collections::BTreeMap;

/// Variables produced by step outputs and read back by later steps.
///
/// Scalars keep every binding in write order and resolve to the latest one;
/// arrays only ever grow.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    scalars: Vec<(String, String)>,
    arrays: BTreeMap<String, Vec<String>>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&mut self, name: &str, value: impl Into<String>) {
        self.scalars.push((name.to_string(), value.into()));
    }

    pub fn append(&mut self, name: &str, value: impl Into<String>) {
        self.arrays
            .entry(name.to_string())
            .or_default()
            .push(value.into());
    }

    pub fn scalar(&self, name: &str) -> Option<&str> {
        self.scalars
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn array(&self, name: &str) -> Option<&[String]> {
        self.arrays.get(name).map(Vec::as_slice)
    }

    /// Length of the named array; unset arrays count as empty.
    pub fn array_len(&self, name: &str) -> usize {
        self.array(name).map_or(0, <[String]>::len)
    }

    /// Latest value of every scalar, in first-bound order.
    pub fn scalars(&self) -> Vec<(&str, &str)> {
        let mut latest: Vec<(&str, &str)> = Vec::new();
        for (name, value) in &self.scalars {
            match latest.iter_mut().find(|(n, _)| *n == name.as_str()) {
                Some(slot) => slot.1 = value.as_str(),
                None => latest.push((name.as_str(), value.as_str())),
            }
        }
        latest
    }

    pub fn arrays(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.arrays.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn is_empty(&self) -> bool {
        self.scalars.is_empty() && self.arrays.is_empty()
    }

    /// Shell assignments for every scalar plus the named arrays.
    ///
    /// Values are single-quoted so they survive `bash -c` untouched.
    pub fn shell_bindings<'a>(&self, arrays: impl IntoIterator<Item = &'a str>) -> Vec<String> {
        let mut bindings: Vec<String> = self
            .scalars()
            .into_iter()
            .map(|(name, value)| format!("{}={}", name, shell_quote(value)))
            .collect();
        for name in arrays {
            let items: Vec<String> = self
                .array(name)
                .unwrap_or_default()
                .iter()
                .map(|v| shell_quote(v))
                .collect();
            bindings.push(format!("{}=({})", name, items.join(" ")));
        }
        bindings
    }
}

pub fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r#"'\''"#))
}
