// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Loosely-structured data produced outside Lightframe (capture metadata,
// pixel statistics, star analysis). Its shape depends on which capture-side
// extensions were active, so it is modelled as a small tagged union rather
// than a fixed schema.

use serde_json::Value;

/// Key that carries a record's producer type in Json.NET-style payloads.
const TYPE_KEY: &str = "$type";

/// One node of an externally produced data tree.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum StructuredValue {
    /// Missing or null.
    #[default]
    Absent,
    Number(f64),
    Text(String),
    Object(Record),
}

/// A named group of fields, optionally tagged with the type that produced it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    /// Producer type or namespace, e.g. `NINA.Plugin.HocusFocus.StarAnalysis`.
    pub type_name: Option<String>,
    /// Fields in the order the producer emitted them.
    pub fields: Vec<(String, StructuredValue)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style: tag the record with its producer type.
    pub fn typed(type_name: impl Into<String>) -> Self {
        Self {
            type_name: Some(type_name.into()),
            fields: Vec::new(),
        }
    }

    /// Builder-style: append a field.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<StructuredValue>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    /// First field whose name matches `name` ignoring ASCII case.
    pub fn field(&self, name: &str) -> Option<&StructuredValue> {
        self.fields
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value)
    }

    /// Iterate over `(name, value)` pairs in producer order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &StructuredValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl StructuredValue {
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Self::Object(record) => Some(record),
            _ => None,
        }
    }

    /// Look up a direct field of an object value. Non-objects have no fields.
    pub fn field(&self, name: &str) -> Option<&StructuredValue> {
        self.as_record().and_then(|record| record.field(name))
    }

    /// Walk a chain of field names, e.g. `["Image", "RecordedRMS", "Total"]`.
    pub fn path(&self, segments: &[&str]) -> Option<&StructuredValue> {
        segments
            .iter()
            .try_fold(self, |node, segment| node.field(segment))
    }

    /// Coerce to a finite `f64`.
    ///
    /// Numbers are accepted when finite; text is accepted when it parses as a
    /// finite number after trimming. Everything else yields `None`.
    pub fn as_f64(&self) -> Option<f64> {
        let number = match self {
            Self::Number(n) => *n,
            Self::Text(text) => text.trim().parse::<f64>().ok()?,
            Self::Absent | Self::Object(_) => return None,
        };
        number.is_finite().then_some(number)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }
}

impl From<f64> for StructuredValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for StructuredValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for StructuredValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Record> for StructuredValue {
    fn from(value: Record) -> Self {
        Self::Object(value)
    }
}

impl From<Value> for StructuredValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Absent,
            Value::Bool(flag) => Self::Number(if flag { 1.0 } else { 0.0 }),
            Value::Number(n) => n.as_f64().map_or(Self::Absent, Self::Number),
            Value::String(text) => Self::Text(text),
            Value::Array(items) => Self::Object(Record {
                type_name: None,
                fields: items
                    .into_iter()
                    .enumerate()
                    .map(|(index, item)| (index.to_string(), item.into()))
                    .collect(),
            }),
            Value::Object(map) => {
                let mut record = Record::new();
                for (key, item) in map {
                    if key == TYPE_KEY {
                        record.type_name = item.as_str().map(str::to_owned);
                        continue;
                    }
                    record.fields.push((key, item.into()));
                }
                Self::Object(record)
            }
        }
    }
}
