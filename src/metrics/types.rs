use chrono::Utc;
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

/// A single metric reading.
///
/// `Unavailable` means the value could not be measured. It is a distinct
/// state from a genuine zero or an empty string and serializes to `null`.
#[derive(Clone, Debug, PartialEq)]
pub enum MetricValue {
    Int(i64),
    Float(f64),
    Text(String),
    Bool(bool),
    Map(Section),
    Unavailable,
}

impl MetricValue {
    /// Types a raw textual reading: integer first, then float, then text.
    pub fn parse_scalar(raw: &str) -> MetricValue {
        let raw = raw.trim();
        if let Ok(value) = raw.parse::<i64>() {
            return MetricValue::Int(value);
        }
        if let Ok(value) = raw.parse::<f64>() {
            if value.is_finite() {
                return MetricValue::Float(value);
            }
        }
        MetricValue::Text(raw.to_string())
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, MetricValue::Unavailable)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            MetricValue::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetricValue::Int(value) => Some(*value as f64),
            MetricValue::Float(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetricValue::Text(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_section(&self) -> Option<&Section> {
        match self {
            MetricValue::Map(section) => Some(section),
            _ => None,
        }
    }
}

impl Serialize for MetricValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            MetricValue::Int(value) => serializer.serialize_i64(*value),
            MetricValue::Float(value) => serializer.serialize_f64(*value),
            MetricValue::Text(value) => serializer.serialize_str(value),
            MetricValue::Bool(value) => serializer.serialize_bool(*value),
            MetricValue::Map(section) => section.serialize(serializer),
            MetricValue::Unavailable => serializer.serialize_none(),
        }
    }
}

impl From<i64> for MetricValue {
    fn from(value: i64) -> Self {
        MetricValue::Int(value)
    }
}

impl From<u64> for MetricValue {
    fn from(value: u64) -> Self {
        MetricValue::Int(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

impl From<u32> for MetricValue {
    fn from(value: u32) -> Self {
        MetricValue::Int(i64::from(value))
    }
}

impl From<usize> for MetricValue {
    fn from(value: usize) -> Self {
        MetricValue::Int(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

impl From<f64> for MetricValue {
    fn from(value: f64) -> Self {
        if value.is_finite() {
            MetricValue::Float(value)
        } else {
            MetricValue::Unavailable
        }
    }
}

impl From<bool> for MetricValue {
    fn from(value: bool) -> Self {
        MetricValue::Bool(value)
    }
}

impl From<&str> for MetricValue {
    fn from(value: &str) -> Self {
        MetricValue::Text(value.to_string())
    }
}

impl From<String> for MetricValue {
    fn from(value: String) -> Self {
        MetricValue::Text(value)
    }
}

impl From<Section> for MetricValue {
    fn from(value: Section) -> Self {
        MetricValue::Map(value)
    }
}

impl<T: Into<MetricValue>> From<Option<T>> for MetricValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(MetricValue::Unavailable)
    }
}

/// Insertion-ordered mapping of metric name to value.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Section {
    entries: Vec<(String, MetricValue)>,
}

impl Section {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a section with every name present and unavailable.
    pub fn unavailable(names: &[&str]) -> Self {
        Section {
            entries: names
                .iter()
                .map(|name| (name.to_string(), MetricValue::Unavailable))
                .collect(),
        }
    }

    /// Sets `name`, replacing an existing entry in place.
    pub fn set(&mut self, name: &str, value: impl Into<MetricValue>) {
        let value = value.into();
        match self.entries.iter_mut().find(|(key, _)| key == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name.to_string(), value)),
        }
    }

    pub fn with(mut self, name: &str, value: impl Into<MetricValue>) -> Self {
        self.set(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&MetricValue> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &MetricValue)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for Section {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// One capture of a target: ordered sections plus a trailing `meta` section.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Snapshot {
    sections: Vec<(String, Section)>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &str, section: Section) {
        match self.sections.iter_mut().find(|(key, _)| key == name) {
            Some(entry) => entry.1 = section,
            None => self.sections.push((name.to_string(), section)),
        }
    }

    pub fn with(mut self, name: &str, section: Section) -> Self {
        self.insert(name, section);
        self
    }

    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, section)| section)
    }

    /// Convenience lookup for `section.metric`.
    pub fn metric(&self, section: &str, name: &str) -> Option<&MetricValue> {
        self.section(section).and_then(|s| s.get(name))
    }

    pub fn meta(&self) -> Option<&Section> {
        self.section("meta")
    }

    pub fn section_names(&self) -> impl Iterator<Item = &str> {
        self.sections.iter().map(|(key, _)| key.as_str())
    }

    pub fn sections(&self) -> impl Iterator<Item = (&str, &Section)> {
        self.sections.iter().map(|(key, section)| (key.as_str(), section))
    }

    /// Section names paired with their metric names, for schema comparisons.
    pub fn schema(&self) -> Vec<(String, Vec<String>)> {
        self.sections
            .iter()
            .map(|(key, section)| {
                (
                    key.clone(),
                    section.names().map(str::to_string).collect(),
                )
            })
            .collect()
    }
}

impl Serialize for Snapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.sections.len()))?;
        for (key, section) in &self.sections {
            map.serialize_entry(key, section)?;
        }
        map.end()
    }
}

/// Seconds since the Unix epoch, as stamped into every `meta` section.
pub fn capture_timestamp() -> i64 {
    Utc::now().timestamp()
}
