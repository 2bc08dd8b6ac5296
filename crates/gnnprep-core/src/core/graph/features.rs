use std::collections::BTreeMap;

/// A single feature value: a scalar or a fixed-width vector.
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureValue {
    Scalar(f64),
    Vector(Vec<f64>),
}

impl FeatureValue {
    /// Number of columns this value occupies when stored.
    pub fn width(&self) -> usize {
        match self {
            FeatureValue::Scalar(_) => 1,
            FeatureValue::Vector(values) => values.len(),
        }
    }

    pub fn as_slice(&self) -> &[f64] {
        match self {
            FeatureValue::Scalar(value) => std::slice::from_ref(value),
            FeatureValue::Vector(values) => values,
        }
    }

    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            FeatureValue::Scalar(value) => Some(*value),
            FeatureValue::Vector(_) => None,
        }
    }
}

impl From<f64> for FeatureValue {
    fn from(value: f64) -> Self {
        FeatureValue::Scalar(value)
    }
}

impl From<bool> for FeatureValue {
    fn from(value: bool) -> Self {
        FeatureValue::Scalar(if value { 1.0 } else { 0.0 })
    }
}

impl From<Vec<f64>> for FeatureValue {
    fn from(values: Vec<f64>) -> Self {
        FeatureValue::Vector(values)
    }
}

impl<const N: usize> From<[f64; N]> for FeatureValue {
    fn from(values: [f64; N]) -> Self {
        FeatureValue::Vector(values.to_vec())
    }
}

/// Named feature values of one node or edge, kept in name order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Features(BTreeMap<String, FeatureValue>);

impl Features {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `name` to `value`, replacing any previous value.
    pub fn insert(&mut self, name: &str, value: impl Into<FeatureValue>) {
        self.0.insert(name.to_string(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&FeatureValue> {
        self.0.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FeatureValue)> {
        self.0.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
