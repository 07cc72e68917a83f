//! Wire types for the generate endpoint.

use core_model::{AttentionMatrix, ContextSnapshot, Token};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Keys the generation loop always sets itself.
pub const RESERVED_KEYS: [&str; 2] = ["context", "batch_size"];

/// Body of `POST {endpoint}`: user parameters flattened next to `context` and `batch_size`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerateRequest {
    #[serde(flatten)]
    pub params: BTreeMap<String, String>,
    pub context: String,
    pub batch_size: u32,
}

impl GenerateRequest {
    /// Build a request. Same-named entries in `params` are dropped in favor of
    /// the explicit `context` and `batch_size`.
    pub fn new(
        context: impl Into<String>,
        batch_size: u32,
        params: &BTreeMap<String, String>,
    ) -> Self {
        let params = params
            .iter()
            .filter(|(k, _)| !RESERVED_KEYS.contains(&k.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Self {
            params,
            context: context.into(),
            batch_size,
        }
    }
}

#[derive(Deserialize)]
struct WireToken {
    text: String,
}

/// Decoded server answer.
///
/// `{tokens, attention}` is the full form. `{context}` alone is the plain-text
/// form and yields a single token with no attention. Anything that fits
/// neither shape decodes to an empty snapshot.
#[derive(Debug, Clone, PartialEq)]
pub enum GenerateResponse {
    Tokens(ContextSnapshot),
    PlainText(String),
    Unrecognized,
}

impl GenerateResponse {
    pub fn from_value(value: &Value) -> Self {
        let tokens = value
            .get("tokens")
            .and_then(|v| Vec::<WireToken>::deserialize(v).ok());
        if let Some(tokens) = tokens {
            let attention = value
                .get("attention")
                .and_then(|v| Vec::<Vec<f64>>::deserialize(v).ok())
                .map(AttentionMatrix::new)
                .unwrap_or_default();
            let tokens = tokens.into_iter().map(|t| Token::new(t.text)).collect();
            return Self::Tokens(ContextSnapshot::new(tokens, attention));
        }
        match value.get("context").and_then(Value::as_str) {
            Some(text) => Self::PlainText(text.to_string()),
            None => Self::Unrecognized,
        }
    }

    pub fn into_snapshot(self) -> ContextSnapshot {
        match self {
            Self::Tokens(snapshot) => snapshot,
            Self::PlainText(text) => ContextSnapshot::from_plain_text(text),
            Self::Unrecognized => ContextSnapshot::empty(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn request_flattens_params_and_overrides_reserved() {
        let mut params = BTreeMap::new();
        params.insert("max_tokens".to_string(), "20".to_string());
        params.insert("context".to_string(), "stale".to_string());
        params.insert("batch_size".to_string(), "99".to_string());
        let req = GenerateRequest::new("Hello", 4, &params);
        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(
            v,
            json!({"max_tokens": "20", "context": "Hello", "batch_size": 4})
        );
    }

    #[test]
    fn tokens_and_attention_decode() {
        let v = json!({
            "tokens": [{"text": "Hello "}, {"text": "world"}],
            "attention": [[0.0], [0.0, 0.9]]
        });
        let snap = GenerateResponse::from_value(&v).into_snapshot();
        assert_eq!(snap.text(), "Hello world");
        assert_eq!(snap.attention.weight(1, 1), 0.9);
        assert!(snap.is_renderable());
    }

    #[test]
    fn malformed_attention_keeps_tokens() {
        let v = json!({"tokens": [{"text": "ab"}], "attention": "nope"});
        let snap = GenerateResponse::from_value(&v).into_snapshot();
        assert_eq!(snap.text(), "ab");
        assert!(!snap.is_renderable());
    }

    #[test]
    fn plain_context_is_single_token() {
        let v = json!({"context": "Hello, Hello World!"});
        let resp = GenerateResponse::from_value(&v);
        assert_eq!(resp, GenerateResponse::PlainText("Hello, Hello World!".into()));
        let snap = resp.into_snapshot();
        assert_eq!(snap.token_count(), 1);
        assert!(snap.attention.is_empty());
    }

    #[test]
    fn unrecognized_shape_is_empty() {
        let v = json!({"tokens": [{"txt": 1}]});
        assert_eq!(GenerateResponse::from_value(&v), GenerateResponse::Unrecognized);
        assert_eq!(
            GenerateResponse::from_value(&json!([1, 2])).into_snapshot(),
            ContextSnapshot::empty()
        );
    }
}
