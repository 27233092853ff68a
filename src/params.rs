use serde_json::Value as JsonValue;

use crate::Value;

/// Query parameters for a read call.
///
/// Pairs are sent in insertion order; the cache fingerprint sorts them.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Params(Vec<(String, Value)>);

impl Params {
    /// Builds parameters from name/value pairs.
    pub fn new<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        Self(
            pairs
                .into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        )
    }

    /// Appends a parameter.
    pub fn push(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.push((name.into(), value.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Pairs rendered for the query string, in insertion order.
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        self.0
            .iter()
            .map(|(name, value)| (name.clone(), value.to_string()))
            .collect()
    }

    /// Order-independent JSON rendering of the pairs.
    pub fn canonical(&self) -> String {
        let mut pairs = self.to_query_pairs();
        pairs.sort();
        let array = pairs
            .into_iter()
            .map(|(name, value)| {
                JsonValue::Array(vec![JsonValue::String(name), JsonValue::String(value)])
            })
            .collect();
        JsonValue::Array(array).to_string()
    }
}

impl From<()> for Params {
    fn from(_: ()) -> Self {
        Self::default()
    }
}

impl From<Vec<(String, Value)>> for Params {
    fn from(pairs: Vec<(String, Value)>) -> Self {
        Self(pairs)
    }
}

impl<K, V, const N: usize> From<[(K, V); N]> for Params
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from(pairs: [(K, V); N]) -> Self {
        Self::new(pairs)
    }
}

/// Builds the cache fingerprint for a read call.
///
/// Example: `GET /notes?id=42` → `GET:/notes:[["id","42"]]`
pub fn cache_key(method: &str, path: &str, params: &Params) -> String {
    format!(
        "{}:{}:{}",
        method.to_ascii_uppercase(),
        path,
        params.canonical()
    )
}

#[cfg(test)]
mod tests {
    use crate::{params::cache_key, Params, Value};

    #[test]
    fn pairs_from_array() {
        let params: Params = [("id", Value::text("42")), ("limit", Value::integer(20))].into();
        assert_eq!(params.len(), 2);
        assert_eq!(
            params.to_query_pairs(),
            vec![
                ("id".to_owned(), "42".to_owned()),
                ("limit".to_owned(), "20".to_owned())
            ]
        );
    }

    #[test]
    fn key_ignores_insertion_order() {
        let a = Params::new([("id", "42"), ("sort", "latest")]);
        let b = Params::new([("sort", "latest"), ("id", "42")]);
        assert_eq!(cache_key("get", "/notes", &a), cache_key("GET", "/notes", &b));
    }

    #[test]
    fn key_distinguishes_values_and_paths() {
        let a = Params::new([("id", "42")]);
        let b = Params::new([("id", "43")]);
        assert_ne!(cache_key("GET", "/notes", &a), cache_key("GET", "/notes", &b));
        assert_ne!(cache_key("GET", "/notes", &a), cache_key("GET", "/users", &a));
    }

    #[test]
    fn key_escapes_separators() {
        let a = Params::new([("a", "1\",\"b")]);
        let b = Params::new([("a", "1"), ("b", "")]);
        assert_ne!(cache_key("GET", "/x", &a), cache_key("GET", "/x", &b));
    }

    #[test]
    fn empty_params_key() {
        assert_eq!(cache_key("GET", "/notes", &Params::from(())), "GET:/notes:[]");
    }
}
