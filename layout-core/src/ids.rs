//! Monotonic id allocation.

use crate::{DocumentModel, WidgetId};

/// Hands out node ids in strictly increasing order, skipping the root sentinel.
///
/// The allocator lives beside the document rather than inside it, so undo
/// never rewinds it: an id handed out once is not handed out again until the
/// allocator is explicitly reseeded by a document load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdAllocator {
    next: i64,
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl IdAllocator {
    /// Allocator whose first id is 1.
    #[must_use]
    pub const fn new() -> Self {
        Self { next: 1 }
    }

    /// Allocator seeded past every id in `document`.
    #[must_use]
    pub fn seeded_from(document: &DocumentModel) -> Self {
        let mut ids = Self::new();
        ids.reseed(document);
        ids
    }

    /// Resynchronise to `max(existing ids) + 1`, never below 1.
    pub fn reseed(&mut self, document: &DocumentModel) {
        self.next = document.max_id().get().saturating_add(1).max(1);
        tracing::trace!(next = self.next, "id allocator reseeded");
    }

    /// The id the next draw will try first.
    #[must_use]
    pub fn peek(&self) -> WidgetId {
        WidgetId::new(self.next)
    }

    /// Draw a fresh id, retrying while `in_use` reports a collision.
    pub fn allocate(&mut self, in_use: impl Fn(WidgetId) -> bool) -> WidgetId {
        loop {
            let candidate = WidgetId::new(self.next);
            self.next = self.next.saturating_add(1);
            if candidate.is_valid() && !in_use(candidate) {
                tracing::trace!(id = %candidate, "allocated id");
                return candidate;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Rect, WidgetModel, WidgetType};

    fn doc_with_ids(ids: &[i64]) -> DocumentModel {
        let mut doc = DocumentModel::new();
        for &raw in ids {
            doc.widgets.push(WidgetModel {
                id: WidgetId::new(raw),
                widget_type: WidgetType::Button,
                bounds: Rect::default(),
                properties: crate::PropertyBag::new(),
            });
        }
        doc
    }

    #[test]
    fn test_starts_at_one() {
        let mut ids = IdAllocator::new();
        assert_eq!(ids.allocate(|_| false), WidgetId::new(1));
        assert_eq!(ids.allocate(|_| false), WidgetId::new(2));
    }

    #[test]
    fn test_skips_ids_in_use() {
        let doc = doc_with_ids(&[1, 2]);
        let mut ids = IdAllocator::new();
        assert_eq!(ids.allocate(|id| doc.id_in_use(id)), WidgetId::new(3));
    }

    #[test]
    fn test_reseed_from_document() {
        let doc = doc_with_ids(&[4, 9, 2]);
        let ids = IdAllocator::seeded_from(&doc);
        assert_eq!(ids.peek(), WidgetId::new(10));
    }

    #[test]
    fn test_reseed_empty_document_never_yields_root() {
        let mut ids = IdAllocator::new();
        ids.allocate(|_| false);
        ids.reseed(&DocumentModel::new());
        assert_eq!(ids.peek(), WidgetId::new(1));
    }
}
