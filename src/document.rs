//! # The component document: ordered sequence + identity index.
//!
//! A [`Document`] owns every component attached to one unit of work,
//! including table cells. Components live in a single arena; the root
//! sequence records insertion order (which defines render order) and the
//! index maps ids to arena slots.
//!
//! ## Architecture
//! ```text
//! append(component)
//!     │  collect ids of the detached tree ──► duplicate check (no mutation yet)
//!     ▼
//! arena: [markdown#0] [table#1] [image#2] [image#3] ...
//! roots: [0, 1]                       (insertion order = render order)
//! index: {"status" → 0, "grid" → 1, "cam_a" → 2, "cam_b" → 3}
//!
//! snapshot()
//!     └─► roots, in order ──► render_record per component ──► Vec<ComponentPayload>
//! ```
//!
//! ## Rules
//! - Every id-bearing component appears exactly once in the arena and the
//!   index; anonymous components are never indexed.
//! - A duplicate id aborts that append only and leaves the document unchanged.
//! - `update` is tolerant: unknown ids are a no-op, never an error.
//! - The internal mutex is held only for synchronous work, never across an
//!   await; a multi-field update is atomic with respect to any snapshot.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::artifact::ComponentPayload;
use crate::components::{Component, ComponentStatus, Update};
use crate::error::DocumentError;

struct DocumentInner {
    arena: Vec<Component>,
    roots: Vec<usize>,
    index: HashMap<String, usize>,
}

/// Ordered, identity-indexed collection of components owned by one task.
///
/// ### Responsibilities
/// - **Structure**: append/extend preserving insertion order
/// - **Identity**: id → component resolution, duplicate rejection
/// - **Snapshots**: point-in-time-consistent render records in document order
pub struct Document {
    inner: Mutex<DocumentInner>,
}

impl Document {
    /// Creates an empty document.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(DocumentInner {
                arena: Vec::new(),
                roots: Vec::new(),
                index: HashMap::new(),
            }),
        }
    }

    /// Appends a component at the end of the sequence.
    ///
    /// Ids carried by the component (or by table cells inside it) are
    /// registered in the index; any collision fails with
    /// [`DocumentError::DuplicateId`] before the document is touched.
    pub fn append(&self, component: Component) -> Result<(), DocumentError> {
        let mut inner = self.lock();
        attach_root(&mut inner, component)
    }

    /// Appends a component under the given id.
    ///
    /// Overrides any id already carried by the component.
    pub fn append_with_id(
        &self,
        component: Component,
        id: impl Into<String>,
    ) -> Result<(), DocumentError> {
        self.append(component.with_id(id))
    }

    /// Appends multiple components preserving their relative order.
    ///
    /// Each component is appended independently; a duplicate id aborts that
    /// component only and the error is propagated after the earlier ones
    /// have already landed.
    pub fn extend(
        &self,
        components: impl IntoIterator<Item = Component>,
    ) -> Result<(), DocumentError> {
        let mut inner = self.lock();
        for component in components {
            attach_root(&mut inner, component)?;
        }
        Ok(())
    }

    /// Returns a snapshot of the component registered under `id`.
    pub fn lookup(&self, id: &str) -> Result<Component, DocumentError> {
        let inner = self.lock();
        match inner.index.get(id) {
            Some(&slot) => Ok(inner.arena[slot].clone()),
            None => Err(DocumentError::NotFound { id: id.to_string() }),
        }
    }

    /// Applies an update to the component registered under `id`.
    ///
    /// Tolerant by design: an unknown id, a frozen component, or a
    /// kind-mismatched update all degrade to a no-op. Returns true only if
    /// state actually changed.
    pub fn update(&self, id: &str, update: Update) -> bool {
        let mut inner = self.lock();
        let Some(slot) = inner.index.get(id).copied() else {
            return false;
        };
        inner.arena[slot].apply(update)
    }

    /// Returns the number of root components (appends), in-order.
    pub fn len(&self) -> usize {
        self.lock().roots.len()
    }

    /// Returns true if nothing has been appended.
    pub fn is_empty(&self) -> bool {
        self.lock().roots.is_empty()
    }

    /// Returns the sorted list of registered ids.
    pub fn ids(&self) -> Vec<String> {
        let inner = self.lock();
        let mut ids: Vec<String> = inner.index.keys().cloned().collect();
        ids.sort_unstable();
        ids
    }

    /// Renders every root component, in insertion order, into a
    /// point-in-time-consistent list of payload records.
    ///
    /// Per-component render failures become error placeholder payloads for
    /// that entry; the rest of the document renders normally.
    pub fn snapshot(&self) -> Vec<ComponentPayload> {
        let inner = self.lock();
        inner
            .roots
            .iter()
            .map(|&slot| inner.arena[slot].render_record(Some(&inner.arena)))
            .collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, DocumentInner> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

/// Checks the detached tree for id collisions, then moves it into the arena.
fn attach_root(inner: &mut DocumentInner, component: Component) -> Result<(), DocumentError> {
    let mut ids = Vec::new();
    component.collect_ids(&mut ids);
    for (i, id) in ids.iter().enumerate() {
        if inner.index.contains_key(*id) || ids[..i].contains(id) {
            return Err(DocumentError::DuplicateId {
                id: (*id).to_string(),
            });
        }
    }

    let slot = attach_node(inner, component);
    inner.roots.push(slot);
    Ok(())
}

/// Recursively moves a component (and any detached table cells) into the
/// arena, registering ids along the way.
fn attach_node(inner: &mut DocumentInner, mut component: Component) -> usize {
    if let Some(rows) = component.take_detached_rows() {
        let slots: Vec<Vec<usize>> = rows
            .into_iter()
            .map(|row| row.into_iter().map(|cell| attach_node(inner, cell)).collect())
            .collect();
        component.set_attached_rows(slots);
    }
    if component.status == ComponentStatus::Detached {
        component.status = ComponentStatus::Live;
    }

    let slot = inner.arena.len();
    if let Some(id) = &component.id {
        inner.index.insert(id.clone(), slot);
    }
    inner.arena.push(component);
    slot
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{LineChart, ProgressBar, Table};
    use serde_json::json;

    #[test]
    fn test_append_preserves_order_and_indexes_ids() {
        let doc = Document::new();
        doc.append(Component::markdown("first")).unwrap();
        doc.append_with_id(Component::markdown("second"), "named")
            .unwrap();
        doc.append(Component::markdown("third")).unwrap();

        assert_eq!(doc.len(), 3);
        assert_eq!(doc.ids(), vec!["named".to_string()]);

        let records = doc.snapshot();
        assert_eq!(records[0].payload, json!("first"));
        assert_eq!(records[1].payload, json!("second"));
        assert_eq!(records[1].id.as_deref(), Some("named"));
        assert_eq!(records[2].payload, json!("third"));
    }

    #[test]
    fn test_duplicate_id_leaves_document_unchanged() {
        let doc = Document::new();
        doc.append_with_id(Component::markdown("a"), "x").unwrap();

        let err = doc
            .append_with_id(Component::markdown("b"), "x")
            .unwrap_err();
        assert!(matches!(err, DocumentError::DuplicateId { .. }));
        assert_eq!(doc.len(), 1);
        assert_eq!(doc.snapshot()[0].payload, json!("a"));
    }

    #[test]
    fn test_duplicate_id_inside_table_rejects_whole_append() {
        let doc = Document::new();
        doc.append_with_id(Component::markdown("a"), "cell").unwrap();

        let table = Table::new(vec![vec![Component::markdown("b").with_id("cell")]]);
        let err = doc.append(Component::from(table)).unwrap_err();
        assert!(matches!(err, DocumentError::DuplicateId { .. }));
        assert_eq!(doc.len(), 1);
    }

    #[test]
    fn test_extend_preserves_relative_order() {
        let doc = Document::new();
        doc.extend(vec![
            Component::markdown("one"),
            Component::markdown("two"),
            Component::markdown("three"),
        ])
        .unwrap();

        let payloads: Vec<_> = doc.snapshot().into_iter().map(|r| r.payload).collect();
        assert_eq!(payloads, vec![json!("one"), json!("two"), json!("three")]);
    }

    #[test]
    fn test_update_unknown_id_is_noop() {
        let doc = Document::new();
        doc.append_with_id(Component::markdown("kept"), "a").unwrap();

        assert!(!doc.update("ghost", Update::Text("ignored".to_string())));
        assert_eq!(doc.snapshot()[0].payload, json!("kept"));
    }

    #[test]
    fn test_update_frozen_id_is_noop() {
        let doc = Document::new();
        doc.append_with_id(Component::markdown("static").frozen(), "s")
            .unwrap();

        assert!(!doc.update("s", Update::Text("dropped".to_string())));
        assert_eq!(doc.snapshot()[0].payload, json!("static"));
    }

    #[test]
    fn test_lookup_propagates_not_found() {
        let doc = Document::new();
        let err = doc.lookup("missing").unwrap_err();
        assert!(matches!(err, DocumentError::NotFound { .. }));
    }

    #[test]
    fn test_table_cells_are_updatable_by_id() {
        let doc = Document::new();
        let table = Table::new(vec![vec![
            Component::from(ProgressBar::new(10.0)).with_id("pb1"),
            Component::from(ProgressBar::new(10.0)).with_id("pb2"),
        ]]);
        doc.append_with_id(Component::from(table), "grid").unwrap();

        assert!(doc.update(
            "pb2",
            Update::Progress {
                value: 7.0,
                metadata: None
            }
        ));

        let records = doc.snapshot();
        assert_eq!(records.len(), 1);
        let payload = &records[0].payload;
        assert_eq!(payload[0][0]["payload"]["value"], json!(0.0));
        assert_eq!(payload[0][1]["payload"]["value"], json!(7.0));
    }

    #[test]
    fn test_snapshot_is_idempotent_without_mutation() {
        let doc = Document::new();
        doc.append_with_id(Component::from(LineChart::new().with_max_size(5)), "chart")
            .unwrap();
        doc.update(
            "chart",
            Update::Point {
                label: json!(1),
                value: 0.5,
            },
        );

        assert_eq!(doc.snapshot(), doc.snapshot());
    }

    #[test]
    fn test_two_component_scenario() {
        let doc = Document::new();
        doc.append_with_id(Component::markdown(""), "a").unwrap();
        doc.append_with_id(Component::from(Table::empty()), "b").unwrap();

        doc.update("a", Update::Text("v1".to_string()));
        let records = doc.snapshot();
        assert_eq!(records[0].id.as_deref(), Some("a"));
        assert_eq!(records[0].payload, json!("v1"));
        assert_eq!(records[1].id.as_deref(), Some("b"));
        assert_eq!(records[1].payload, json!([]));

        doc.update("a", Update::Text("v2".to_string()));
        assert_eq!(doc.snapshot()[0].payload, json!("v2"));
    }
}
