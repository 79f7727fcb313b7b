//! Widget property bags and their per-type schemas.
//!
//! Properties are a small tagged union stored in an ordered string-keyed map.
//! Each widget type declares which keys it accepts and what kind of value each
//! key holds; validation is one generic walk over that table.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{LayoutError, LayoutResult, WidgetType};

/// A single property value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    /// Boolean flag.
    Bool(bool),
    /// Numeric value. Must be finite to validate.
    Number(f64),
    /// Free-form text.
    String(String),
}

impl PropertyValue {
    /// The kind tag of this value.
    #[must_use]
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Bool(_) => ValueKind::Bool,
            Self::Number(_) => ValueKind::Number,
            Self::String(_) => ValueKind::String,
        }
    }

    /// Borrow the string payload, if any.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// The boolean payload, if any.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// The numeric payload, if any.
    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

/// Ordered property map attached to widgets and used as SetProps patches.
pub type PropertyBag = BTreeMap<String, PropertyValue>;

/// Expected kind of a property value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// [`PropertyValue::Bool`].
    Bool,
    /// [`PropertyValue::Number`].
    Number,
    /// [`PropertyValue::String`].
    String,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Bool => "bool",
            Self::Number => "number",
            Self::String => "string",
        };
        f.write_str(name)
    }
}

/// Property-bag validator keyed by widget type.
///
/// The document engine only calls out through this trait; hosts with their own
/// widget registry can supply a different table.
pub trait PropertySchema {
    /// Check a full property bag for the given widget type.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::Validation`] naming the offending key.
    fn validate_property_bag(&self, widget_type: WidgetType, bag: &PropertyBag)
        -> LayoutResult<()>;
}

/// The schema table shipped with the engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinSchema;

const COMMON_FIELDS: &[(&str, ValueKind)] = &[
    ("name", ValueKind::String),
    ("visible", ValueKind::Bool),
    ("enabled", ValueKind::Bool),
    ("tooltip", ValueKind::String),
];

const RANGE_FIELDS: &[(&str, ValueKind)] = &[
    ("min", ValueKind::Number),
    ("max", ValueKind::Number),
    ("value", ValueKind::Number),
    ("param", ValueKind::String),
];

impl BuiltinSchema {
    /// Keys accepted by a widget type in addition to the common ones.
    #[must_use]
    pub fn fields(widget_type: WidgetType) -> &'static [(&'static str, ValueKind)] {
        match widget_type {
            WidgetType::Button => &[("text", ValueKind::String), ("action", ValueKind::String)],
            WidgetType::Toggle => &[
                ("text", ValueKind::String),
                ("checked", ValueKind::Bool),
                ("param", ValueKind::String),
            ],
            WidgetType::Slider => &[
                ("min", ValueKind::Number),
                ("max", ValueKind::Number),
                ("value", ValueKind::Number),
                ("step", ValueKind::Number),
                ("orientation", ValueKind::String),
                ("param", ValueKind::String),
            ],
            WidgetType::Knob | WidgetType::Meter => RANGE_FIELDS,
            WidgetType::Label => &[
                ("text", ValueKind::String),
                ("fontSize", ValueKind::Number),
                ("color", ValueKind::String),
            ],
            WidgetType::Panel => &[
                ("background", ValueKind::String),
                ("cornerRadius", ValueKind::Number),
            ],
            WidgetType::Image => &[("asset", ValueKind::String), ("opacity", ValueKind::Number)],
        }
    }

    fn expected_kind(widget_type: WidgetType, key: &str) -> Option<ValueKind> {
        COMMON_FIELDS
            .iter()
            .chain(Self::fields(widget_type))
            .find(|(name, _)| *name == key)
            .map(|(_, kind)| *kind)
    }
}

impl PropertySchema for BuiltinSchema {
    fn validate_property_bag(
        &self,
        widget_type: WidgetType,
        bag: &PropertyBag,
    ) -> LayoutResult<()> {
        for (key, value) in bag {
            let expected = Self::expected_kind(widget_type, key).ok_or_else(|| {
                LayoutError::validation(format!(
                    "unknown property '{key}' for widget type '{widget_type}'"
                ))
            })?;
            if value.kind() != expected {
                return Err(LayoutError::validation(format!(
                    "property '{key}' on '{widget_type}' expects {expected}, got {}",
                    value.kind()
                )));
            }
            if let PropertyValue::Number(n) = value {
                if !n.is_finite() {
                    return Err(LayoutError::validation(format!(
                        "property '{key}' must be a finite number"
                    )));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bag(entries: &[(&str, PropertyValue)]) -> PropertyBag {
        entries
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_accepts_common_and_type_fields() {
        let props = bag(&[
            ("name", "Gain".into()),
            ("min", 0.0.into()),
            ("max", 1.0.into()),
        ]);
        BuiltinSchema
            .validate_property_bag(WidgetType::Slider, &props)
            .expect("slider bag should validate");
    }

    #[test]
    fn test_rejects_unknown_key() {
        let props = bag(&[("checked", true.into())]);
        let err = BuiltinSchema
            .validate_property_bag(WidgetType::Label, &props)
            .expect_err("label has no 'checked'");
        assert!(err.to_string().contains("unknown property 'checked'"));
    }

    #[test]
    fn test_rejects_wrong_kind() {
        let props = bag(&[("text", 3.0.into())]);
        assert!(BuiltinSchema
            .validate_property_bag(WidgetType::Button, &props)
            .is_err());
    }

    #[test]
    fn test_rejects_non_finite_number() {
        let props = bag(&[("value", f64::NAN.into())]);
        assert!(BuiltinSchema
            .validate_property_bag(WidgetType::Knob, &props)
            .is_err());
    }

    #[test]
    fn test_untagged_json_shape() {
        let props = bag(&[("checked", true.into()), ("text", "On".into())]);
        let json = serde_json::to_string(&props).expect("serialize");
        assert_eq!(json, r#"{"checked":true,"text":"On"}"#);
    }
}
