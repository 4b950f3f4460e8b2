//! Field readers over untyped JSON.
//!
//! Each reader classifies a raw value as [`Read`] and [`Repairs`] turns the
//! classification into a typed value plus a diagnostic. Nothing here fails.

use serde_json::{Map, Value};

use crate::repair::{FieldRepair, RepairKind};

/// Classification of one raw value.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Read<T> {
    /// Absent, `null`, or blank text.
    Missing,
    /// Already in canonical form.
    Valid(T),
    /// Usable after conversion.
    Coerced(T),
    /// Present but unusable.
    Invalid,
}

impl<T> Read<T> {
    pub(crate) fn value(self) -> Option<T> {
        match self {
            Self::Valid(v) | Self::Coerced(v) => Some(v),
            Self::Missing | Self::Invalid => None,
        }
    }
}

/// Trimmed, non-empty text.
pub(crate) fn text(value: Option<&Value>) -> Read<String> {
    match value {
        None | Some(Value::Null) => Read::Missing,
        Some(Value::String(raw)) => {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                Read::Missing
            } else if trimmed.len() == raw.len() {
                Read::Valid(raw.clone())
            } else {
                Read::Coerced(trimmed.to_owned())
            }
        }
        Some(_) => Read::Invalid,
    }
}

/// A finite number, from a JSON number or numeric text.
pub(crate) fn number(value: Option<&Value>) -> Read<f64> {
    match value {
        None | Some(Value::Null) => Read::Missing,
        Some(Value::Number(n)) => n
            .as_f64()
            .filter(|f| f.is_finite())
            .map_or(Read::Invalid, Read::Valid),
        Some(Value::String(raw)) => {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                return Read::Missing;
            }
            trimmed
                .parse::<f64>()
                .ok()
                .filter(|f| f.is_finite())
                .map_or(Read::Invalid, Read::Coerced)
        }
        Some(_) => Read::Invalid,
    }
}

/// An integer, flooring fractional input.
pub(crate) fn integer(value: Option<&Value>) -> Read<i64> {
    if let Some(Value::Number(n)) = value {
        if let Some(exact) = n.as_i64() {
            return Read::Valid(exact);
        }
        if n.is_u64() {
            return Read::Coerced(i64::MAX);
        }
    }
    match number(value) {
        Read::Valid(f) if f.fract() == 0.0 => Read::Valid(floor_to_i64(f)),
        Read::Valid(f) | Read::Coerced(f) => Read::Coerced(floor_to_i64(f)),
        Read::Missing => Read::Missing,
        Read::Invalid => Read::Invalid,
    }
}

/// A JSON boolean. Nothing else is accepted.
pub(crate) const fn boolean(value: Option<&Value>) -> Read<bool> {
    match value {
        None | Some(Value::Null) => Read::Missing,
        Some(Value::Bool(b)) => Read::Valid(*b),
        Some(_) => Read::Invalid,
    }
}

/// Float to integer; `as` saturates at the bounds.
#[allow(clippy::cast_possible_truncation)]
fn floor_to_i64(value: f64) -> i64 {
    value.floor() as i64
}

/// `prefix.key`, or `key` at the root.
pub(crate) fn join(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_owned()
    } else {
        format!("{prefix}.{key}")
    }
}

/// `prefix[index]`.
pub(crate) fn index(prefix: &str, index: usize) -> String {
    format!("{prefix}[{index}]")
}

/// Collects [`FieldRepair`]s while reading typed fields.
#[derive(Debug, Default)]
pub(crate) struct Repairs {
    list: Vec<FieldRepair>,
}

impl Repairs {
    pub(crate) fn into_vec(self) -> Vec<FieldRepair> {
        self.list
    }

    pub(crate) fn note(&mut self, path: impl Into<String>, kind: RepairKind) {
        let path = path.into();
        tracing::debug!(%path, %kind, "Repaired field");
        self.list.push(FieldRepair { path, kind });
    }

    /// Record the repair implied by `read` and return its value.
    ///
    /// `required` fields that are missing count as defaulted; optional ones
    /// that are missing are left alone.
    fn settle<T>(&mut self, path: &str, read: Read<T>, required: bool) -> Option<T> {
        match read {
            Read::Valid(v) => Some(v),
            Read::Coerced(v) => {
                self.note(path, RepairKind::Coerced);
                Some(v)
            }
            Read::Missing => {
                if required {
                    self.note(path, RepairKind::Defaulted);
                }
                None
            }
            Read::Invalid => {
                let kind = if required {
                    RepairKind::Defaulted
                } else {
                    RepairKind::Dropped
                };
                self.note(path, kind);
                None
            }
        }
    }

    pub(crate) fn text_or(
        &mut self,
        obj: &Map<String, Value>,
        key: &str,
        prefix: &str,
        default: &str,
    ) -> String {
        let path = join(prefix, key);
        self.settle(&path, text(obj.get(key)), true)
            .unwrap_or_else(|| default.to_owned())
    }

    pub(crate) fn optional_text(
        &mut self,
        obj: &Map<String, Value>,
        key: &str,
        prefix: &str,
    ) -> Option<String> {
        let path = join(prefix, key);
        self.settle(&path, text(obj.get(key)), false)
    }

    /// Required text id; `None` when missing or unusable.
    pub(crate) fn id(
        &mut self,
        obj: &Map<String, Value>,
        key: &str,
        prefix: &str,
    ) -> Option<String> {
        let path = join(prefix, key);
        match text(obj.get(key)) {
            Read::Valid(v) => Some(v),
            Read::Coerced(v) => {
                self.note(path, RepairKind::Coerced);
                Some(v)
            }
            Read::Missing | Read::Invalid => None,
        }
    }

    pub(crate) fn int_or(
        &mut self,
        obj: &Map<String, Value>,
        key: &str,
        prefix: &str,
        default: i64,
    ) -> i64 {
        let path = join(prefix, key);
        self.settle(&path, integer(obj.get(key)), true)
            .unwrap_or(default)
    }

    /// Integer clamped to `min..=max`; `default` when unreadable.
    pub(crate) fn int_within(
        &mut self,
        obj: &Map<String, Value>,
        key: &str,
        prefix: &str,
        (min, max): (i64, i64),
        default: i64,
    ) -> i64 {
        let path = join(prefix, key);
        let Some(value) = self.settle(&path, integer(obj.get(key)), true) else {
            return default;
        };
        let clamped = value.clamp(min, max);
        if clamped != value {
            self.note(path, RepairKind::Clamped);
        }
        clamped
    }

    /// Positive count that must fit a `u32`.
    pub(crate) fn positive_u32(
        &mut self,
        obj: &Map<String, Value>,
        key: &str,
        prefix: &str,
        default: u32,
    ) -> u32 {
        let range = (1, i64::from(u32::MAX));
        let value = self.int_within(obj, key, prefix, range, i64::from(default));
        u32::try_from(value).unwrap_or(default)
    }

    pub(crate) fn flag_or(
        &mut self,
        obj: &Map<String, Value>,
        key: &str,
        prefix: &str,
        default: bool,
    ) -> bool {
        let path = join(prefix, key);
        self.settle(&path, boolean(obj.get(key)), true)
            .unwrap_or(default)
    }

    /// Finite number clamped to `0.0..=1.0`.
    pub(crate) fn unit_interval(
        &mut self,
        obj: &Map<String, Value>,
        key: &str,
        prefix: &str,
        default: f64,
    ) -> f64 {
        let path = join(prefix, key);
        let Some(value) = self.settle(&path, number(obj.get(key)), true) else {
            return default;
        };
        let clamped = value.clamp(0.0, 1.0);
        if !(0.0..=1.0).contains(&value) {
            self.note(path, RepairKind::Clamped);
        }
        clamped
    }

    /// Child object at `key`, or `None` with a repair when it is not one.
    pub(crate) fn object<'a>(
        &mut self,
        obj: &'a Map<String, Value>,
        key: &str,
        prefix: &str,
    ) -> Option<&'a Map<String, Value>> {
        match obj.get(key) {
            Some(Value::Object(child)) => Some(child),
            None | Some(Value::Null) => None,
            Some(_) => {
                self.note(join(prefix, key), RepairKind::Defaulted);
                None
            }
        }
    }

    /// Object entries of the array at `key`, paired with their paths.
    ///
    /// Non-object entries are dropped with a repair.
    pub(crate) fn records<'a>(
        &mut self,
        obj: &'a Map<String, Value>,
        key: &str,
        prefix: &str,
    ) -> Vec<(String, &'a Map<String, Value>)> {
        let path = join(prefix, key);
        let items = match obj.get(key) {
            Some(Value::Array(items)) => items,
            None | Some(Value::Null) => return Vec::new(),
            Some(_) => {
                self.note(path, RepairKind::Defaulted);
                return Vec::new();
            }
        };
        let mut out = Vec::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            let item_path = index(&path, i);
            match item {
                Value::Object(record) => out.push((item_path, record)),
                _ => self.note(item_path, RepairKind::Dropped),
            }
        }
        out
    }
}

/// JSON type name for diagnostics.
pub(crate) const fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
