use std::collections::BTreeMap;

/// JSON scalar kept by [`SafeDictionary`].
#[derive(Clone, Debug, PartialEq)]
pub enum SafeValue {
    String(String),
    Int(i64),
    Double(f64),
    Bool(bool),
}

impl SafeValue {
    fn from_json(value: serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::String(value) => Some(Self::String(value)),
            serde_json::Value::Bool(value) => Some(Self::Bool(value)),
            serde_json::Value::Number(number) => number
                .as_i64()
                .map(Self::Int)
                .or_else(|| number.as_f64().map(Self::Double)),
            serde_json::Value::Null
            | serde_json::Value::Array(_)
            | serde_json::Value::Object(_) => None,
        }
    }
}

/// Scalar view of a JSON object error body.
///
/// Only string, integer, float and boolean members survive; nulls, arrays and
/// nested objects are dropped.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SafeDictionary {
    values: BTreeMap<String, SafeValue>,
}

impl SafeDictionary {
    /// Parses `body` as a JSON object. Returns `None` for anything else.
    pub fn from_slice(body: &[u8]) -> Option<Self> {
        let serde_json::Value::Object(object) = serde_json::from_slice(body).ok()? else {
            return None;
        };

        let values = object
            .into_iter()
            .filter_map(|(key, value)| SafeValue::from_json(value).map(|value| (key, value)))
            .collect();
        Some(Self { values })
    }

    pub fn get(&self, key: &str) -> Option<&SafeValue> {
        self.values.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        match self.get(key)? {
            SafeValue::String(value) => Some(value.as_str()),
            _ => None,
        }
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        match self.get(key)? {
            SafeValue::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SafeValue)> {
        self.values.iter().map(|(key, value)| (key.as_str(), value))
    }
}

impl FromIterator<(String, SafeValue)> for SafeDictionary {
    fn from_iter<I: IntoIterator<Item = (String, SafeValue)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{SafeDictionary, SafeValue};

    #[test]
    fn keeps_scalars_and_drops_the_rest() {
        let body = br#"{
            "error": "bad alias",
            "code": 400,
            "ratio": 0.5,
            "retryable": false,
            "detail": null,
            "items": [1, 2],
            "nested": {"a": 1}
        }"#;
        let dict = SafeDictionary::from_slice(body).expect("must parse object");

        assert_eq!(dict.len(), 4);
        assert_eq!(dict.get_str("error"), Some("bad alias"));
        assert_eq!(dict.get_i64("code"), Some(400));
        assert_eq!(dict.get("ratio"), Some(&SafeValue::Double(0.5)));
        assert_eq!(dict.get("retryable"), Some(&SafeValue::Bool(false)));
        assert!(dict.get("detail").is_none());
        assert!(dict.get("items").is_none());
        assert!(dict.get("nested").is_none());
    }

    #[test]
    fn non_object_bodies_yield_none() {
        assert!(SafeDictionary::from_slice(b"[1,2,3]").is_none());
        assert!(SafeDictionary::from_slice(b"\"text\"").is_none());
        assert!(SafeDictionary::from_slice(b"Internal Server Error").is_none());
        assert!(SafeDictionary::from_slice(b"").is_none());
    }

    #[test]
    fn empty_object_is_empty_dictionary() {
        let dict = SafeDictionary::from_slice(b"{}").expect("must parse object");
        assert!(dict.is_empty());
    }

    #[test]
    fn compares_structurally() {
        let a = SafeDictionary::from_slice(br#"{"code": 1, "msg": "x"}"#);
        let b = SafeDictionary::from_slice(br#"{"msg": "x", "code": 1}"#);
        assert_eq!(a, b);
    }
}
