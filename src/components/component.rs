//! # The component unit: state, status, updates, rendering.
//!
//! A [`Component`] bundles an optional id, a lifecycle [`ComponentStatus`],
//! and a kind-specific state. Task code mutates components through
//! [`Update`]s; the render path turns the current state into a payload.
//!
//! ## Rules
//! - `update` is **tolerant**: frozen components and kind-mismatched updates
//!   accept the call and discard it. Application code may optimistically
//!   update components that were never attached or have been dropped.
//! - `render` is **pure**: it never mutates state, and an unmutated
//!   component renders to an identical payload every time.
//! - A failing render (custom components only) is isolated into an error
//!   placeholder payload for that one entry.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use rand::Rng;
use serde_json::{json, Map, Value};

use crate::artifact::ComponentPayload;

use super::kinds::{Image, LineChart, Markdown, ProgressBar, Table, TableRows};
use super::registry::{RenderFn, RenderRegistry};

/// Lifecycle status of a component.
///
/// Distinguishes "intentionally frozen" from "not attached" instead of
/// overloading silent failure for both.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ComponentStatus {
    /// Attached to a document and accepting updates.
    Live,
    /// Attached (or attachable) but declining updates; update calls are
    /// accepted and discarded.
    Frozen,
    /// Not yet attached to any document.
    Detached,
}

/// A kind-specific state mutation.
///
/// Each variant matches one component kind; applying a mismatched variant is
/// silently discarded (tolerant-update policy).
#[derive(Clone, Debug)]
pub enum Update {
    /// Replace a markdown block's text.
    Text(String),
    /// Set a progress bar's value, optionally replacing its metadata line.
    Progress {
        /// New current value.
        value: f64,
        /// New metadata line, if any (`None` keeps the previous one).
        metadata: Option<String>,
    },
    /// Append a point to a line chart.
    Point {
        /// X-axis label (timestamp, step number, ...).
        label: Value,
        /// Y-axis value.
        value: f64,
    },
    /// Replace an image's bytes.
    Bytes(Vec<u8>),
    /// Replace a custom component's raw state.
    Value(Value),
}

/// Custom component: opaque JSON state plus a render function resolved once
/// at construction from a [`RenderRegistry`].
#[derive(Clone)]
pub(crate) struct Custom {
    pub(crate) tag: String,
    pub(crate) state: Value,
    pub(crate) render: RenderFn,
}

impl std::fmt::Debug for Custom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Custom")
            .field("tag", &self.tag)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

/// Closed set of component kinds (plus the extensible `Custom` escape hatch).
#[derive(Clone, Debug)]
pub(crate) enum ComponentKind {
    Markdown(Markdown),
    Table(Table),
    ProgressBar(ProgressBar),
    LineChart(LineChart),
    Image(Image),
    Custom(Custom),
}

/// A named or anonymous unit of renderable, independently updatable state.
#[derive(Clone, Debug)]
pub struct Component {
    pub(crate) id: Option<String>,
    pub(crate) status: ComponentStatus,
    pub(crate) kind: ComponentKind,
}

impl Component {
    fn new(kind: ComponentKind) -> Self {
        Self {
            id: None,
            status: ComponentStatus::Detached,
            kind,
        }
    }

    /// Creates a markdown block.
    pub fn markdown(text: impl Into<String>) -> Self {
        Markdown::new(text).into()
    }

    /// Creates an image from raw bytes.
    pub fn image(bytes: Vec<u8>) -> Self {
        Image::new(bytes).into()
    }

    /// Creates a custom component with a render function resolved from the
    /// registry.
    ///
    /// Returns `None` if no render function is registered for `tag`; the
    /// function is looked up exactly once, here.
    pub fn custom(registry: &RenderRegistry, tag: impl Into<String>, state: Value) -> Option<Self> {
        let tag = tag.into();
        let render = registry.resolve(&tag)?;
        Some(Self::new(ComponentKind::Custom(Custom { tag, state, render })))
    }

    /// Pre-assigns an id; the document registers it on append.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Assigns a generated id of the form `<tag>_<hex>`.
    ///
    /// Useful when a component must be updatable but the caller has no
    /// natural name for it.
    pub fn with_generated_id(mut self) -> Self {
        let suffix: u32 = rand::rng().random();
        self.id = Some(format!("{}_{suffix:08x}", self.tag()));
        self
    }

    /// Marks the component frozen: it stays renderable but discards all
    /// subsequent updates.
    pub fn frozen(mut self) -> Self {
        self.status = ComponentStatus::Frozen;
        self
    }

    /// Returns the component id, if assigned.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Returns the lifecycle status.
    pub fn status(&self) -> ComponentStatus {
        self.status
    }

    /// Returns true if the component declines updates.
    pub fn is_frozen(&self) -> bool {
        self.status == ComponentStatus::Frozen
    }

    /// Returns the component type tag.
    pub fn tag(&self) -> &str {
        match &self.kind {
            ComponentKind::Markdown(_) => "markdown",
            ComponentKind::Table(_) => "table",
            ComponentKind::ProgressBar(_) => "progressBar",
            ComponentKind::LineChart(_) => "lineChart",
            ComponentKind::Image(_) => "image",
            ComponentKind::Custom(c) => &c.tag,
        }
    }

    /// Applies an update under kind-specific semantics.
    ///
    /// Returns true if the update changed state. Frozen components and
    /// kind-mismatched updates return false without raising.
    pub(crate) fn apply(&mut self, update: Update) -> bool {
        if self.status == ComponentStatus::Frozen {
            return false;
        }
        match (&mut self.kind, update) {
            (ComponentKind::Markdown(m), Update::Text(text)) => {
                m.text = text;
                true
            }
            (ComponentKind::ProgressBar(p), Update::Progress { value, metadata }) => {
                p.value = value;
                if metadata.is_some() {
                    p.metadata = metadata;
                }
                true
            }
            (ComponentKind::LineChart(c), Update::Point { label, value }) => {
                c.push(label, value);
                true
            }
            (ComponentKind::Image(i), Update::Bytes(bytes)) => {
                i.bytes = bytes;
                true
            }
            (ComponentKind::Custom(c), Update::Value(state)) => {
                c.state = state;
                true
            }
            _ => false,
        }
    }

    /// Renders this component into its payload value.
    ///
    /// Pure: calling twice on unchanged state yields identical payloads.
    /// Tables attached to a document must be rendered through the document
    /// (their cells live in the document arena).
    pub fn render(&self) -> Result<Value, String> {
        self.render_with(None)
    }

    /// Renders into a full `{id?, type, payload}` record, isolating render
    /// failures into an error placeholder payload.
    pub(crate) fn render_record(&self, arena: Option<&[Component]>) -> ComponentPayload {
        let payload = match self.render_with(arena) {
            Ok(value) => value,
            Err(reason) => json!({ "error": reason }),
        };
        ComponentPayload {
            id: self.id.clone(),
            kind: self.tag().to_string(),
            payload,
        }
    }

    pub(crate) fn render_with(&self, arena: Option<&[Component]>) -> Result<Value, String> {
        match &self.kind {
            ComponentKind::Markdown(m) => Ok(Value::String(m.text.clone())),
            ComponentKind::ProgressBar(p) => {
                let mut map = Map::new();
                map.insert("max".to_string(), json!(p.max));
                map.insert("value".to_string(), json!(p.value));
                if let Some(label) = &p.label {
                    map.insert("label".to_string(), json!(label));
                }
                if let Some(unit) = &p.unit {
                    map.insert("unit".to_string(), json!(unit));
                }
                if let Some(metadata) = &p.metadata {
                    map.insert("metadata".to_string(), json!(metadata));
                }
                Ok(Value::Object(map))
            }
            ComponentKind::LineChart(c) => {
                let mut map = Map::new();
                map.insert("data".to_string(), json!(c.data));
                map.insert("labels".to_string(), json!(c.labels));
                if let Some(title) = &c.x_title {
                    map.insert("xTitle".to_string(), json!(title));
                }
                if let Some(title) = &c.y_title {
                    map.insert("yTitle".to_string(), json!(title));
                }
                Ok(Value::Object(map))
            }
            ComponentKind::Image(i) => Ok(Value::String(BASE64.encode(&i.bytes))),
            ComponentKind::Custom(c) => (c.render)(&c.state),
            ComponentKind::Table(t) => {
                let rows = match &t.rows {
                    TableRows::Detached(rows) => rows
                        .iter()
                        .map(|row| {
                            row.iter()
                                .map(|cell| record_value(cell.render_record(arena)))
                                .collect::<Vec<Value>>()
                        })
                        .collect::<Vec<_>>(),
                    TableRows::Attached(slots) => {
                        let arena =
                            arena.ok_or_else(|| "attached table rendered without its document".to_string())?;
                        slots
                            .iter()
                            .map(|row| {
                                row.iter()
                                    .map(|&slot| record_value(arena[slot].render_record(Some(arena))))
                                    .collect::<Vec<Value>>()
                            })
                            .collect::<Vec<_>>()
                    }
                };
                if t.headers.is_empty() {
                    Ok(json!(rows))
                } else {
                    Ok(json!({ "headers": t.headers, "rows": rows }))
                }
            }
        }
    }

    /// Takes the detached rows out of a table component, leaving empty
    /// attached rows behind. Returns `None` for non-tables and for tables
    /// that are already attached.
    pub(crate) fn take_detached_rows(&mut self) -> Option<Vec<Vec<Component>>> {
        if let ComponentKind::Table(t) = &mut self.kind {
            if matches!(t.rows, TableRows::Detached(_)) {
                match std::mem::replace(&mut t.rows, TableRows::Attached(Vec::new())) {
                    TableRows::Detached(rows) => return Some(rows),
                    attached => t.rows = attached,
                }
            }
        }
        None
    }

    /// Installs arena slots as this table's attached rows.
    pub(crate) fn set_attached_rows(&mut self, slots: Vec<Vec<usize>>) {
        if let ComponentKind::Table(t) = &mut self.kind {
            t.rows = TableRows::Attached(slots);
        }
    }

    /// Collects every id in this component's detached tree (self plus
    /// not-yet-attached table cells), for duplicate checking before any
    /// mutation happens.
    pub(crate) fn collect_ids<'a>(&'a self, out: &mut Vec<&'a str>) {
        if let Some(id) = &self.id {
            out.push(id);
        }
        if let ComponentKind::Table(t) = &self.kind {
            if let TableRows::Detached(rows) = &t.rows {
                for row in rows {
                    for cell in row {
                        cell.collect_ids(out);
                    }
                }
            }
        }
    }
}

/// Builds the JSON value for a nested cell record.
fn record_value(record: ComponentPayload) -> Value {
    let mut map = Map::new();
    if let Some(id) = record.id {
        map.insert("id".to_string(), Value::String(id));
    }
    map.insert("type".to_string(), Value::String(record.kind));
    map.insert("payload".to_string(), record.payload);
    Value::Object(map)
}

impl From<Markdown> for Component {
    fn from(kind: Markdown) -> Self {
        Component::new(ComponentKind::Markdown(kind))
    }
}

impl From<Table> for Component {
    fn from(kind: Table) -> Self {
        Component::new(ComponentKind::Table(kind))
    }
}

impl From<ProgressBar> for Component {
    fn from(kind: ProgressBar) -> Self {
        Component::new(ComponentKind::ProgressBar(kind))
    }
}

impl From<LineChart> for Component {
    fn from(kind: LineChart) -> Self {
        Component::new(ComponentKind::LineChart(kind))
    }
}

impl From<Image> for Component {
    fn from(kind: Image) -> Self {
        Component::new(ComponentKind::Image(kind))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_markdown_update_replaces_text() {
        let mut c = Component::markdown("v1");
        assert!(c.apply(Update::Text("v2".to_string())));
        assert_eq!(c.render().unwrap(), json!("v2"));
    }

    #[test]
    fn test_frozen_component_discards_updates() {
        let mut c = Component::markdown("keep").frozen();
        assert!(!c.apply(Update::Text("dropped".to_string())));
        assert_eq!(c.render().unwrap(), json!("keep"));
    }

    #[test]
    fn test_kind_mismatch_is_discarded() {
        let mut c = Component::markdown("text");
        assert!(!c.apply(Update::Bytes(vec![1, 2, 3])));
        assert_eq!(c.render().unwrap(), json!("text"));
    }

    #[test]
    fn test_render_is_idempotent() {
        let c = Component::from(ProgressBar::new(10.0).with_label("epoch"));
        assert_eq!(c.render().unwrap(), c.render().unwrap());
    }

    #[test]
    fn test_progress_update_keeps_metadata_when_absent() {
        let mut c = Component::from(ProgressBar::new(100.0).with_metadata("0.0 iter/s"));
        c.apply(Update::Progress {
            value: 5.0,
            metadata: None,
        });
        let payload = c.render().unwrap();
        assert_eq!(payload["value"], json!(5.0));
        assert_eq!(payload["metadata"], json!("0.0 iter/s"));
    }

    #[test]
    fn test_generated_id_uses_tag_prefix() {
        let c = Component::markdown("x").with_generated_id();
        assert!(c.id().unwrap().starts_with("markdown_"));
    }

    #[test]
    fn test_custom_render_failure_becomes_placeholder() {
        let mut reg = RenderRegistry::new();
        reg.register("boom", |_| Err("render exploded".to_string()));

        let c = Component::custom(&reg, "boom", json!({})).unwrap();
        let record = c.render_record(None);
        assert_eq!(record.payload, json!({ "error": "render exploded" }));
        assert_eq!(record.kind, "boom");
    }

    #[test]
    fn test_detached_table_renders_cells() {
        let table = Table::new(vec![vec![Component::markdown("a"), Component::markdown("b")]]);
        let c = Component::from(table);
        let payload = c.render().unwrap();
        assert_eq!(payload[0][0]["payload"], json!("a"));
        assert_eq!(payload[0][1]["payload"], json!("b"));
    }

    #[test]
    fn test_image_renders_base64() {
        let c = Component::image(vec![0xDE, 0xAD]);
        assert_eq!(c.render().unwrap(), json!("3q0="));
    }
}
