use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::NaiveDate;

/// Three-valued logic for comparisons that may involve missing data.
///
/// A comparison against a missing cell is `Unknown`, never silently false.
/// `Unknown` only becomes false at the point a caller asks `is_true()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Truth {
    True,
    False,
    Unknown,
}

impl Truth {
    pub fn from_bool(value: bool) -> Self {
        if value {
            Truth::True
        } else {
            Truth::False
        }
    }

    pub fn or(self, other: Truth) -> Truth {
        match (self, other) {
            (Truth::True, _) | (_, Truth::True) => Truth::True,
            (Truth::Unknown, _) | (_, Truth::Unknown) => Truth::Unknown,
            _ => Truth::False,
        }
    }

    pub fn and(self, other: Truth) -> Truth {
        match (self, other) {
            (Truth::False, _) | (_, Truth::False) => Truth::False,
            (Truth::Unknown, _) | (_, Truth::Unknown) => Truth::Unknown,
            _ => Truth::True,
        }
    }

    pub fn negate(self) -> Truth {
        match self {
            Truth::True => Truth::False,
            Truth::False => Truth::True,
            Truth::Unknown => Truth::Unknown,
        }
    }

    pub fn is_true(self) -> bool {
        matches!(self, Truth::True)
    }
}

/// A single typed cell of an observation table.
///
/// `Missing` is a first-class marker, not a numeric sentinel. Categorical
/// cells hold interned labels (see [`CategoryDict`]) so the same station
/// label shares one allocation across every downstream stage.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Missing,
    Float(f64),
    Int(i64),
    Str(String),
    Cat(Arc<str>),
    Date(NaiveDate),
}

impl Value {
    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }

    /// Numeric view of the cell. `Int` widens to `f64`.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Value::Date(d) => Some(*d),
            _ => None,
        }
    }

    /// Label view of a string-like cell (`Str` or `Cat`).
    pub fn as_label(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s.as_str()),
            Value::Cat(s) => Some(s),
            _ => None,
        }
    }

    /// Three-valued `self < other`.
    pub fn lt(&self, other: &Value) -> Truth {
        match self.compare(other) {
            Some(ordering) => Truth::from_bool(ordering == Ordering::Less),
            None => Truth::Unknown,
        }
    }

    /// Three-valued `self > other`.
    pub fn gt(&self, other: &Value) -> Truth {
        match self.compare(other) {
            Some(ordering) => Truth::from_bool(ordering == Ordering::Greater),
            None => Truth::Unknown,
        }
    }

    /// Three-valued equality. Missing compared to anything is `Unknown`.
    pub fn eq3(&self, other: &Value) -> Truth {
        match self.compare(other) {
            Some(ordering) => Truth::from_bool(ordering == Ordering::Equal),
            None => Truth::Unknown,
        }
    }

    /// Ordering between comparable cells. `None` when either side is missing
    /// or the types are not comparable.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Missing, _) | (_, Value::Missing) => None,
            (Value::Date(a), Value::Date(b)) => Some(a.cmp(b)),
            (a, b) => {
                if let (Some(x), Some(y)) = (a.as_float(), b.as_float()) {
                    x.partial_cmp(&y)
                } else if let (Some(x), Some(y)) = (a.as_label(), b.as_label()) {
                    Some(x.cmp(y))
                } else {
                    None
                }
            }
        }
    }

    /// Hashable form of the cell for group and join keys.
    pub fn key(&self) -> KeyValue {
        match self {
            Value::Missing => KeyValue::Missing,
            Value::Float(f) => KeyValue::Float(f.to_bits()),
            Value::Int(i) => KeyValue::Int(*i),
            Value::Str(s) => KeyValue::Str(s.clone()),
            Value::Cat(s) => KeyValue::Str(s.to_string()),
            Value::Date(d) => KeyValue::Date(*d),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Missing => write!(f, "NA"),
            Value::Float(v) => write!(f, "{}", v),
            Value::Int(v) => write!(f, "{}", v),
            Value::Str(v) => write!(f, "{}", v),
            Value::Cat(v) => write!(f, "{}", v),
            Value::Date(v) => write!(f, "{}", v.format("%Y-%m-%d")),
        }
    }
}

/// Hashable key derived from a cell. Categorical keys compare by label so
/// tables with independently built dictionaries still join correctly.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeyValue {
    Missing,
    Float(u64),
    Int(i64),
    Str(String),
    Date(NaiveDate),
}

impl KeyValue {
    pub fn is_missing(&self) -> bool {
        matches!(self, KeyValue::Missing)
    }
}

/// Stable code <-> label mapping for categorical columns.
///
/// Built once by the ingestor and reused by every later stage; re-interning
/// the same label returns a clone of the original `Arc<str>`.
#[derive(Debug, Clone, Default)]
pub struct CategoryDict {
    labels: Vec<Arc<str>>,
    codes: HashMap<Arc<str>, u32>,
}

impl CategoryDict {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a label, returning the shared allocation for it.
    pub fn intern(&mut self, label: &str) -> Arc<str> {
        if let Some((existing, _)) = self.codes.get_key_value(label) {
            return Arc::clone(existing);
        }
        let shared: Arc<str> = Arc::from(label);
        self.codes.insert(Arc::clone(&shared), self.labels.len() as u32);
        self.labels.push(Arc::clone(&shared));
        shared
    }

    pub fn code_of(&self, label: &str) -> Option<u32> {
        self.codes.get(label).copied()
    }

    pub fn label_of(&self, code: u32) -> Option<&str> {
        self.labels.get(code as usize).map(|s| s.as_ref())
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(|s| s.as_ref())
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}
