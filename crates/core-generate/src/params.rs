use std::collections::BTreeMap;

/// Free-form generation parameters forwarded to the server as strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationParams {
    values: BTreeMap<String, String>,
}

impl GenerationParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.values.remove(key)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn as_map(&self) -> &BTreeMap<String, String> {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Parse `key=value`. The value may itself contain `=`.
    pub fn parse_pair(raw: &str) -> Option<(String, String)> {
        let (k, v) = raw.split_once('=')?;
        let k = k.trim();
        if k.is_empty() {
            return None;
        }
        Some((k.to_string(), v.to_string()))
    }
}

impl FromIterator<(String, String)> for GenerationParams {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_pair_splits_on_first_equals() {
        assert_eq!(
            GenerationParams::parse_pair("stop=a=b"),
            Some(("stop".into(), "a=b".into()))
        );
        assert_eq!(GenerationParams::parse_pair("=x"), None);
        assert_eq!(GenerationParams::parse_pair("novalue"), None);
    }

    #[test]
    fn set_overwrites() {
        let mut p: GenerationParams = [("max_tokens".to_string(), "20".to_string())]
            .into_iter()
            .collect();
        p.set("max_tokens", "40");
        assert_eq!(p.get("max_tokens"), Some("40"));
        assert_eq!(p.len(), 1);
        assert_eq!(p.remove("max_tokens").as_deref(), Some("40"));
        assert!(p.is_empty());
    }
}
