//! # Built-in component kinds.
//!
//! Each kind carries its own state and update semantics:
//! - [`Markdown`] — a text block; updates replace the text wholesale
//! - [`Table`] — a container of nested components; cells with ids stay
//!   individually updatable after the table is attached
//! - [`ProgressBar`] — value/max with optional label, unit and metadata
//! - [`LineChart`] — a bounded time series; updates append, oldest points
//!   fall off once `max_size` is reached
//! - [`Image`] — raw bytes, rendered as base64
//!
//! Rendering is pure: the payload is a function of the current state only.

use std::collections::VecDeque;

use serde_json::Value;

use super::component::Component;

/// A markdown text block.
///
/// Updates replace the full text.
#[derive(Clone, Debug)]
pub struct Markdown {
    pub(crate) text: String,
}

impl Markdown {
    /// Creates a markdown block with the given source text.
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// Returns the current source text.
    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Row storage for a table.
///
/// Rows start `Detached` (holding the child components themselves); when the
/// table is appended to a document the children move into the document arena
/// and rows become `Attached` (holding arena slots).
#[derive(Clone, Debug)]
pub(crate) enum TableRows {
    Detached(Vec<Vec<Component>>),
    Attached(Vec<Vec<usize>>),
}

/// A container component: rows of nested components with optional headers.
///
/// Cells that carry ids are registered in the document index when the table
/// is appended, so they remain individually updatable (dynamic images and
/// charts inside tables).
#[derive(Clone, Debug)]
pub struct Table {
    pub(crate) headers: Vec<String>,
    pub(crate) rows: TableRows,
}

impl Table {
    /// Creates a table from rows of child components.
    pub fn new(rows: Vec<Vec<Component>>) -> Self {
        Self {
            headers: Vec::new(),
            rows: TableRows::Detached(rows),
        }
    }

    /// Creates an empty table.
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Sets column headers.
    pub fn with_headers(mut self, headers: Vec<impl Into<String>>) -> Self {
        self.headers = headers.into_iter().map(Into::into).collect();
        self
    }
}

/// A progress bar.
///
/// Updates set the current value and optionally replace the metadata line
/// (e.g. an iterations-per-second readout).
#[derive(Clone, Debug)]
pub struct ProgressBar {
    pub(crate) max: f64,
    pub(crate) value: f64,
    pub(crate) label: Option<String>,
    pub(crate) unit: Option<String>,
    pub(crate) metadata: Option<String>,
}

impl ProgressBar {
    /// Creates a progress bar with the given maximum.
    pub fn new(max: f64) -> Self {
        Self {
            max,
            value: 0.0,
            label: None,
            unit: None,
            metadata: None,
        }
    }

    /// Sets the display label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Sets the unit suffix.
    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    /// Sets the initial value.
    pub fn with_value(mut self, value: f64) -> Self {
        self.value = value;
        self
    }

    /// Sets the metadata line.
    pub fn with_metadata(mut self, metadata: impl Into<String>) -> Self {
        self.metadata = Some(metadata.into());
        self
    }

    /// Returns the current value.
    pub fn value(&self) -> f64 {
        self.value
    }
}

/// A bounded time-series chart.
///
/// Updates append a `(label, value)` point; once `max_size` points are held,
/// the oldest point is dropped for each new one. Unbounded growth is opted
/// into explicitly by leaving `max_size` unset.
#[derive(Clone, Debug)]
pub struct LineChart {
    pub(crate) data: VecDeque<f64>,
    pub(crate) labels: VecDeque<Value>,
    pub(crate) max_size: Option<usize>,
    pub(crate) x_title: Option<String>,
    pub(crate) y_title: Option<String>,
}

impl LineChart {
    /// Creates an empty chart.
    pub fn new() -> Self {
        Self {
            data: VecDeque::new(),
            labels: VecDeque::new(),
            max_size: None,
            x_title: None,
            y_title: None,
        }
    }

    /// Bounds the series to the most recent `max_size` points.
    pub fn with_max_size(mut self, max_size: usize) -> Self {
        self.max_size = Some(max_size);
        self
    }

    /// Sets the x-axis title.
    pub fn with_x_title(mut self, title: impl Into<String>) -> Self {
        self.x_title = Some(title.into());
        self
    }

    /// Sets the y-axis title.
    pub fn with_y_title(mut self, title: impl Into<String>) -> Self {
        self.y_title = Some(title.into());
        self
    }

    /// Returns the number of points currently held.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the series holds no points.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Appends a point, trimming the oldest beyond `max_size`.
    pub(crate) fn push(&mut self, label: Value, value: f64) {
        self.data.push_back(value);
        self.labels.push_back(label);
        if let Some(max) = self.max_size {
            while self.data.len() > max {
                self.data.pop_front();
                self.labels.pop_front();
            }
        }
    }
}

impl Default for LineChart {
    fn default() -> Self {
        Self::new()
    }
}

/// An image carried as raw bytes.
///
/// Updates replace the bytes. Images default to frozen in the original
/// surface; here freezing is explicit via
/// [`Component::frozen`](super::Component::frozen).
#[derive(Clone, Debug)]
pub struct Image {
    pub(crate) bytes: Vec<u8>,
}

impl Image {
    /// Creates an image from raw bytes.
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// Returns the current bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}
