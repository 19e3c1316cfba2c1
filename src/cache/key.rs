/// Request descriptors and their canonical cache keys
///
/// A descriptor is a function identity plus named parameters. Parameter
/// names are kept sorted and list values are sorted on canonicalization,
/// so `ids=[3,1,2]` and `ids=[1,2,3]` land in the same slot.
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Null,
    Bool(bool),
    Integer(i64),
    Number(f64),
    Text(String),
    List(Vec<ParamValue>),
    Map(BTreeMap<String, ParamValue>),
}

impl ParamValue {
    /// Deterministic textual form used inside cache keys
    pub fn canonical(&self) -> String {
        match self {
            ParamValue::Null => "null".to_string(),
            ParamValue::Bool(b) => b.to_string(),
            ParamValue::Integer(i) => i.to_string(),
            ParamValue::Number(n) => {
                if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    format!("{}", n)
                }
            }
            ParamValue::Text(s) => format!("{:?}", s),
            ParamValue::List(items) => {
                let mut rendered: Vec<String> = items.iter().map(|v| v.canonical()).collect();
                rendered.sort();
                format!("[{}]", rendered.join(","))
            }
            ParamValue::Map(map) => {
                let rendered: Vec<String> = map
                    .iter()
                    .map(|(k, v)| format!("{}={}", k, v.canonical()))
                    .collect();
                format!("{{{}}}", rendered.join(","))
            }
        }
    }

    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => ParamValue::Null,
            Value::Bool(b) => ParamValue::Bool(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => ParamValue::Integer(i),
                None => ParamValue::Number(n.as_f64().unwrap_or(0.0)),
            },
            Value::String(s) => ParamValue::Text(s.clone()),
            Value::Array(items) => ParamValue::List(items.iter().map(Self::from_json).collect()),
            Value::Object(map) => ParamValue::Map(
                map.iter()
                    .map(|(k, v)| (k.clone(), Self::from_json(v)))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Text(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Text(value)
    }
}

impl From<&String> for ParamValue {
    fn from(value: &String) -> Self {
        ParamValue::Text(value.clone())
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Bool(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Integer(value)
    }
}

impl From<i32> for ParamValue {
    fn from(value: i32) -> Self {
        ParamValue::Integer(value as i64)
    }
}

impl From<u32> for ParamValue {
    fn from(value: u32) -> Self {
        ParamValue::Integer(value as i64)
    }
}

impl From<usize> for ParamValue {
    fn from(value: usize) -> Self {
        ParamValue::Integer(value as i64)
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        ParamValue::Number(value)
    }
}

impl<T: Into<ParamValue>> From<Vec<T>> for ParamValue {
    fn from(values: Vec<T>) -> Self {
        ParamValue::List(values.into_iter().map(Into::into).collect())
    }
}

/// Canonical, hashable cache slot identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Function identity + parameters of one outbound request
#[derive(Debug, Clone, PartialEq)]
pub struct RequestDescriptor {
    function: String,
    params: BTreeMap<String, ParamValue>,
}

impl RequestDescriptor {
    pub fn new(function: impl Into<String>) -> Self {
        Self {
            function: function.into(),
            params: BTreeMap::new(),
        }
    }

    /// Builder-style parameter insertion; a repeated name overwrites
    pub fn param(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// Build from a JSON object; the `func` member names the function
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Object(map) => {
                let function = map
                    .get("func")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                let params = map
                    .iter()
                    .filter(|(k, _)| k.as_str() != "func")
                    .map(|(k, v)| (k.clone(), ParamValue::from_json(v)))
                    .collect();
                Self { function, params }
            }
            other => Self::new(ParamValue::from_json(other).canonical()),
        }
    }

    pub fn function(&self) -> &str {
        &self.function
    }

    pub fn cache_key(&self) -> CacheKey {
        let params: Vec<String> = self
            .params
            .iter()
            .map(|(name, value)| format!("{}={}", name, value.canonical()))
            .collect();
        CacheKey(format!("{}({})", self.function, params.join(",")))
    }
}

impl From<&Value> for RequestDescriptor {
    fn from(value: &Value) -> Self {
        RequestDescriptor::from_json(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_param_order_does_not_matter() {
        let a = RequestDescriptor::new("klines")
            .param("symbol", "BTCUSDT")
            .param("interval", "1h")
            .param("limit", 300usize);
        let b = RequestDescriptor::new("klines")
            .param("limit", 300usize)
            .param("symbol", "BTCUSDT")
            .param("interval", "1h");
        assert_eq!(a.cache_key(), b.cache_key());
    }

    #[test]
    fn test_list_values_are_sorted() {
        let a = RequestDescriptor::from_json(&json!({"func": "caps", "ids": [3, 1, 2]}));
        let b = RequestDescriptor::from_json(&json!({"func": "caps", "ids": [1, 2, 3]}));
        assert_eq!(a.cache_key(), b.cache_key());

        let c = RequestDescriptor::new("caps").param("ids", vec!["solana", "bitcoin"]);
        let d = RequestDescriptor::new("caps").param("ids", vec!["bitcoin", "solana"]);
        assert_eq!(c.cache_key(), d.cache_key());
    }

    #[test]
    fn test_different_values_do_not_collide() {
        let a = RequestDescriptor::new("klines").param("symbol", "BTCUSDT");
        let b = RequestDescriptor::new("klines").param("symbol", "ETHUSDT");
        let c = RequestDescriptor::new("ticker").param("symbol", "BTCUSDT");
        assert_ne!(a.cache_key(), b.cache_key());
        assert_ne!(a.cache_key(), c.cache_key());
    }

    #[test]
    fn test_text_is_quoted_so_numbers_and_strings_differ() {
        let a = RequestDescriptor::new("f").param("x", "1");
        let b = RequestDescriptor::new("f").param("x", 1i64);
        assert_ne!(a.cache_key(), b.cache_key());
    }

    #[test]
    fn test_integral_floats_match_integers() {
        let a = RequestDescriptor::new("f").param("x", 3.0);
        let b = RequestDescriptor::new("f").param("x", 3i64);
        assert_eq!(a.cache_key(), b.cache_key());
    }

    #[test]
    fn test_non_object_json_becomes_function_name() {
        let d = RequestDescriptor::from_json(&json!("get_global"));
        assert_eq!(d.function(), "\"get_global\"");
        assert_eq!(d.cache_key().as_str(), "\"get_global\"()");
    }
}
