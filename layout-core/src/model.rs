//! Document model - plain value snapshots of everything structural.
//!
//! Nothing in here has behaviour beyond lookups. Every edit produces a new
//! [`DocumentModel`]; a published snapshot is never mutated.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{LayoutError, PropertyBag};

/// Identifier shared by widgets, groups and layers.
///
/// Encoded as a decimal string in JSON so 64-bit values survive text
/// interchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct WidgetId(i64);

impl WidgetId {
    /// Reserved sentinel meaning "no parent / top-level". Never allocated.
    pub const ROOT: Self = Self(0);

    /// Wrap a raw id value.
    #[must_use]
    pub const fn new(raw: i64) -> Self {
        Self(raw)
    }

    /// The raw id value.
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }

    /// Whether this is the root sentinel.
    #[must_use]
    pub const fn is_root(self) -> bool {
        self.0 == Self::ROOT.0
    }

    /// Whether this id may name a real node (`> ROOT`).
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 > Self::ROOT.0
    }
}

impl fmt::Display for WidgetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for WidgetId {
    type Err = LayoutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<i64>()
            .map(Self)
            .map_err(|e| LayoutError::Format(format!("invalid id '{s}': {e}")))
    }
}

impl From<WidgetId> for String {
    fn from(id: WidgetId) -> Self {
        id.to_string()
    }
}

impl TryFrom<String> for WidgetId {
    type Error = LayoutError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Axis-aligned rectangle in canvas coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    /// Left edge.
    pub x: f32,
    /// Top edge.
    pub y: f32,
    /// Width.
    pub w: f32,
    /// Height.
    pub h: f32,
}

impl Rect {
    /// Create a rectangle.
    #[must_use]
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    /// All four components are finite.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.w.is_finite() && self.h.is_finite()
    }

    /// Finite with non-negative width and height.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.is_finite() && self.w >= 0.0 && self.h >= 0.0
    }

    /// The same rectangle shifted by an offset.
    #[must_use]
    pub fn translated(&self, dx: f32, dy: f32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            ..*self
        }
    }
}

impl Default for Rect {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            w: 100.0,
            h: 30.0,
        }
    }
}

/// The kind of interactive widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WidgetType {
    /// Momentary push button.
    Button,
    /// Two-state switch.
    Toggle,
    /// Linear fader.
    Slider,
    /// Rotary control.
    Knob,
    /// Static text.
    Label,
    /// Level display.
    Meter,
    /// Decorative background panel.
    Panel,
    /// Bitmap from the asset table.
    Image,
}

impl WidgetType {
    /// Every widget type, in declaration order.
    pub const ALL: [Self; 8] = [
        Self::Button,
        Self::Toggle,
        Self::Slider,
        Self::Knob,
        Self::Label,
        Self::Meter,
        Self::Panel,
        Self::Image,
    ];

    /// The stable type key used in documents.
    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            Self::Button => "button",
            Self::Toggle => "toggle",
            Self::Slider => "slider",
            Self::Knob => "knob",
            Self::Label => "label",
            Self::Meter => "meter",
            Self::Panel => "panel",
            Self::Image => "image",
        }
    }
}

impl fmt::Display for WidgetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for WidgetType {
    type Err = LayoutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.key() == s)
            .ok_or_else(|| LayoutError::Format(format!("unknown widget type '{s}'")))
    }
}

/// A placed widget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WidgetModel {
    /// Unique identifier.
    pub id: WidgetId,
    /// Widget type.
    #[serde(rename = "type")]
    pub widget_type: WidgetType,
    /// Position and size.
    pub bounds: Rect,
    /// Validated property bag.
    #[serde(default)]
    pub properties: PropertyBag,
}

/// A named group in the z-order forest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupModel {
    /// Unique identifier (shares the widget id space).
    pub id: WidgetId,
    /// Display name.
    pub name: String,
    /// Parent group, `None` for top-level.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_group_id: Option<WidgetId>,
    /// Direct member widgets, back to front.
    #[serde(default)]
    pub member_widget_ids: Vec<WidgetId>,
    /// Position among the parent's children, held only while the group has
    /// no effective members and so no paint slot of its own.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sibling_index: Option<usize>,
}

/// Visibility/lock grouping, orthogonal to the z-order forest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerModel {
    /// Unique identifier (shares the widget id space).
    pub id: WidgetId,
    /// Display name.
    pub name: String,
    /// Sort key among layers.
    #[serde(default)]
    pub order: i32,
    /// Whether members are drawn.
    #[serde(default = "default_true")]
    pub visible: bool,
    /// Whether members accept edits.
    #[serde(default)]
    pub locked: bool,
    /// Member widgets.
    #[serde(default)]
    pub member_widget_ids: Vec<WidgetId>,
    /// Member groups.
    #[serde(default)]
    pub member_group_ids: Vec<WidgetId>,
}

const fn default_true() -> bool {
    true
}

/// An external resource referenced by widgets (images, fonts, samples).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetModel {
    /// Asset key, unique within the document.
    pub id: String,
    /// Asset category, e.g. `image` or `font`.
    pub kind: String,
    /// Source path or URI.
    pub path: String,
}

/// A named runtime parameter widgets can drive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeParam {
    /// Parameter key, unique within the document.
    pub key: String,
    /// Initial value.
    pub default_value: f64,
}

/// Binds a widget property to an expression. The expression is opaque here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyBinding {
    /// Target widget.
    pub widget_id: WidgetId,
    /// Target property key.
    pub property: String,
    /// Source expression text.
    pub expression: String,
}

/// Routes a widget event to a runtime parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeBinding {
    /// Source widget.
    pub widget_id: WidgetId,
    /// Event name, e.g. `change`.
    pub event: String,
    /// Runtime parameter key.
    pub param: String,
}

/// Document schema version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SchemaVersion {
    /// Breaking changes.
    pub major: u32,
    /// Additive changes.
    pub minor: u32,
    /// Fixes.
    pub patch: u32,
}

impl SchemaVersion {
    /// The version this runtime writes.
    pub const CURRENT: Self = Self::new(1, 0, 0);

    /// Create a version triple.
    #[must_use]
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }
}

impl Default for SchemaVersion {
    fn default() -> Self {
        Self::CURRENT
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for SchemaVersion {
    type Err = LayoutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.trim().split('.').collect();
        let [major, minor, patch] = parts.as_slice() else {
            return Err(LayoutError::Format(format!(
                "version '{s}' must be major.minor.patch"
            )));
        };
        let parse = |part: &str| {
            part.parse::<u32>()
                .map_err(|e| LayoutError::Format(format!("invalid version '{s}': {e}")))
        };
        Ok(Self::new(parse(*major)?, parse(*minor)?, parse(*patch)?))
    }
}

/// Kind of a node in the layer tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// A widget.
    Widget,
    /// A group.
    Group,
    /// A layer.
    Layer,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Widget => "widget",
            Self::Group => "group",
            Self::Layer => "layer",
        };
        f.write_str(name)
    }
}

/// A typed reference to a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeRef {
    /// Node kind.
    pub kind: NodeKind,
    /// Node id.
    pub id: WidgetId,
}

impl NodeRef {
    /// Reference a widget.
    #[must_use]
    pub const fn widget(id: WidgetId) -> Self {
        Self {
            kind: NodeKind::Widget,
            id,
        }
    }

    /// Reference a group.
    #[must_use]
    pub const fn group(id: WidgetId) -> Self {
        Self {
            kind: NodeKind::Group,
            id,
        }
    }
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.id)
    }
}

/// One immutable snapshot of the whole document.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentModel {
    /// Version the document was written with.
    pub schema_version: SchemaVersion,
    /// Widgets in back-to-front paint order.
    pub widgets: Vec<WidgetModel>,
    /// Group arena.
    pub groups: Vec<GroupModel>,
    /// Layers.
    pub layers: Vec<LayerModel>,
    /// Assets.
    pub assets: Vec<AssetModel>,
    /// Runtime parameters.
    pub runtime_params: Vec<RuntimeParam>,
    /// Property bindings.
    pub property_bindings: Vec<PropertyBinding>,
    /// Runtime bindings.
    pub runtime_bindings: Vec<RuntimeBinding>,
}

impl DocumentModel {
    /// Create an empty document at the current schema version.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a widget.
    #[must_use]
    pub fn widget(&self, id: WidgetId) -> Option<&WidgetModel> {
        self.widgets.iter().find(|w| w.id == id)
    }

    /// Position of a widget in paint order.
    #[must_use]
    pub fn widget_index(&self, id: WidgetId) -> Option<usize> {
        self.widgets.iter().position(|w| w.id == id)
    }

    /// Look up a group.
    #[must_use]
    pub fn group(&self, id: WidgetId) -> Option<&GroupModel> {
        self.groups.iter().find(|g| g.id == id)
    }

    /// Look up a layer.
    #[must_use]
    pub fn layer(&self, id: WidgetId) -> Option<&LayerModel> {
        self.layers.iter().find(|l| l.id == id)
    }

    /// Whether a node of the given kind exists.
    #[must_use]
    pub fn contains(&self, node: NodeRef) -> bool {
        match node.kind {
            NodeKind::Widget => self.widget(node.id).is_some(),
            NodeKind::Group => self.group(node.id).is_some(),
            NodeKind::Layer => self.layer(node.id).is_some(),
        }
    }

    /// Largest id used by any widget, group or layer (`ROOT` when empty).
    #[must_use]
    pub fn max_id(&self) -> WidgetId {
        self.widgets
            .iter()
            .map(|w| w.id)
            .chain(self.groups.iter().map(|g| g.id))
            .chain(self.layers.iter().map(|l| l.id))
            .max()
            .unwrap_or(WidgetId::ROOT)
    }

    /// Whether an id is taken by any node kind.
    #[must_use]
    pub fn id_in_use(&self, id: WidgetId) -> bool {
        self.widget(id).is_some() || self.group(id).is_some() || self.layer(id).is_some()
    }

    /// Number of widgets.
    #[must_use]
    pub fn widget_count(&self) -> usize {
        self.widgets.len()
    }

    /// Whether the document has no widgets and no groups.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.widgets.is_empty() && self.groups.is_empty()
    }
}

/// Session state that travels with the document but is not part of it.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EditorStateModel {
    /// Selected widgets, ordered and unique.
    #[serde(default)]
    pub selection: Vec<WidgetId>,
}

impl EditorStateModel {
    /// Build a selection, dropping repeats while keeping first occurrence order.
    #[must_use]
    pub fn with_selection(ids: impl IntoIterator<Item = WidgetId>) -> Self {
        let mut seen = HashSet::new();
        let selection = ids.into_iter().filter(|id| seen.insert(*id)).collect();
        Self { selection }
    }

    /// Whether a widget is selected.
    #[must_use]
    pub fn is_selected(&self, id: WidgetId) -> bool {
        self.selection.contains(&id)
    }
}
