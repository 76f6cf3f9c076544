//! Range-tagged metadata over character offsets.
//!
//! A [`Marker`] highlights or protects `length` characters at `offset`. Markers follow the text
//! through edits using the segment update rule of
//! [`DocumentChange::shift_segment`]; a marker whose text is deleted entirely is dropped.
//!
//! Point lookups are cached per offset. Any change to the marker set or the document clears the
//! cache.

use crate::buffer::TextBuffer;
use crate::delta::DocumentChange;
use crate::location::TextLocation;
use std::cell::RefCell;
use std::collections::HashMap;

/// A `0xRRGGBB` color.
pub type Color = u32;

/// Default marker color (red).
pub const DEFAULT_MARKER_COLOR: Color = 0xFF_00_00;

/// How a marker is drawn by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MarkerType {
    /// Not drawn; used for metadata such as read-only protection.
    #[default]
    Invisible,
    /// Filled background.
    SolidBlock,
    /// Straight underline.
    Underlined,
    /// Wavy underline.
    WaveLine,
}

/// A marked range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Marker {
    /// Start offset.
    pub offset: usize,
    /// Length, at least 1.
    pub length: usize,
    /// Rendering hint.
    pub marker_type: MarkerType,
    /// Marker color.
    pub color: Color,
    /// Text color override.
    pub fore_color: Option<Color>,
    /// Edits touching the range are refused.
    pub is_read_only: bool,
    /// Tooltip shown by the host.
    pub tooltip: Option<String>,
}

impl Marker {
    /// Create a marker. A zero length is widened to one character.
    pub fn new(offset: usize, length: usize, marker_type: MarkerType) -> Self {
        Self {
            offset,
            length: length.max(1),
            marker_type,
            color: DEFAULT_MARKER_COLOR,
            fore_color: None,
            is_read_only: false,
            tooltip: None,
        }
    }

    /// An invisible read-only marker.
    pub fn read_only(offset: usize, length: usize) -> Self {
        Self {
            is_read_only: true,
            ..Self::new(offset, length, MarkerType::Invisible)
        }
    }

    /// Set the color.
    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    /// Set the text color override.
    pub fn with_fore_color(mut self, fore_color: Color) -> Self {
        self.fore_color = Some(fore_color);
        self
    }

    /// Set the tooltip.
    pub fn with_tooltip(mut self, tooltip: impl Into<String>) -> Self {
        self.tooltip = Some(tooltip.into());
        self
    }

    /// Exclusive end offset.
    pub fn end_offset(&self) -> usize {
        self.offset + self.length
    }

    /// Returns `true` if the character at `offset` is marked.
    pub fn contains_offset(&self, offset: usize) -> bool {
        self.offset <= offset && offset < self.end_offset()
    }

    fn intersects(&self, offset: usize, length: usize) -> bool {
        if length == 0 {
            return self.contains_offset(offset);
        }
        self.offset < offset + length && offset < self.end_offset()
    }
}

/// Handle to a marker stored in a [`MarkerStrategy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MarkerId(u64);

#[derive(Debug, Clone)]
struct MarkerEntry {
    id: MarkerId,
    marker: Marker,
}

/// The marker collection of a document.
#[derive(Debug, Default)]
pub struct MarkerStrategy {
    entries: Vec<MarkerEntry>,
    next_id: u64,
    /// offset -> indices into `entries`
    cache: RefCell<HashMap<usize, Vec<usize>>>,
}

impl MarkerStrategy {
    /// Create an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate_id(&mut self) -> MarkerId {
        self.next_id += 1;
        MarkerId(self.next_id)
    }

    fn invalidate(&self) {
        self.cache.borrow_mut().clear();
    }

    /// Append a marker.
    pub fn add(&mut self, marker: Marker) -> MarkerId {
        let index = self.entries.len();
        self.insert(index, marker)
    }

    /// Insert a marker at `index` (clamped to the end).
    pub fn insert(&mut self, index: usize, marker: Marker) -> MarkerId {
        let id = self.allocate_id();
        let index = index.min(self.entries.len());
        self.entries.insert(index, MarkerEntry { id, marker });
        self.invalidate();
        id
    }

    /// Remove a marker.
    pub fn remove(&mut self, id: MarkerId) -> Option<Marker> {
        let index = self.entries.iter().position(|entry| entry.id == id)?;
        self.invalidate();
        Some(self.entries.remove(index).marker)
    }

    /// Remove every marker matching `predicate`. Returns how many were removed.
    pub fn remove_all(&mut self, mut predicate: impl FnMut(&Marker) -> bool) -> usize {
        let before = self.entries.len();
        self.entries.retain(|entry| !predicate(&entry.marker));
        self.invalidate();
        before - self.entries.len()
    }

    /// Remove every marker.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.invalidate();
    }

    /// Look up a marker.
    pub fn get(&self, id: MarkerId) -> Option<&Marker> {
        self.entries
            .iter()
            .find(|entry| entry.id == id)
            .map(|entry| &entry.marker)
    }

    /// All markers in insertion order.
    pub fn markers(&self) -> impl Iterator<Item = &Marker> {
        self.entries.iter().map(|entry| &entry.marker)
    }

    /// Number of markers.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if there are no markers.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Markers containing the character at `offset`.
    pub fn get_markers_at(&self, offset: usize) -> Vec<&Marker> {
        let mut cache = self.cache.borrow_mut();
        let indices = cache.entry(offset).or_insert_with(|| {
            self.entries
                .iter()
                .enumerate()
                .filter(|(_, entry)| entry.marker.contains_offset(offset))
                .map(|(idx, _)| idx)
                .collect()
        });
        indices.iter().map(|&idx| &self.entries[idx].marker).collect()
    }

    /// Markers intersecting `offset..offset + length`. A zero length is a point query.
    pub fn get_markers_in_range(&self, offset: usize, length: usize) -> Vec<&Marker> {
        self.markers()
            .filter(|marker| marker.intersects(offset, length))
            .collect()
    }

    /// Markers at a location. Locations outside the document have none.
    pub fn get_markers_at_location(&self, buffer: &TextBuffer, location: TextLocation) -> Vec<&Marker> {
        match buffer.line_segment(location.line) {
            Ok(segment) => self.get_markers_at(segment.offset + location.column),
            Err(_) => Vec::new(),
        }
    }

    /// Returns `true` if a read-only marker intersects `offset..offset + length`.
    pub fn has_read_only_marker_in(&self, offset: usize, length: usize) -> bool {
        self.markers()
            .any(|marker| marker.is_read_only && marker.intersects(offset, length))
    }

    pub(crate) fn apply_change(&mut self, change: &DocumentChange) {
        self.invalidate();
        self.entries
            .retain_mut(|entry| match change.shift_segment(entry.marker.offset, entry.marker.length) {
                Some((offset, length)) => {
                    entry.marker.offset = offset;
                    entry.marker.length = length;
                    true
                }
                None => false,
            });
    }
}
