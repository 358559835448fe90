//! FocusRing: keyboard focus cycling between components.

use crate::action::ComponentId;

pub struct FocusRing {
    items: Vec<ComponentId>,
    current: usize,
}

impl FocusRing {
    pub fn new(items: Vec<ComponentId>) -> Self {
        Self { items, current: 0 }
    }

    pub fn current(&self) -> Option<ComponentId> {
        self.items.get(self.current).copied()
    }

    pub fn next(&mut self) -> Option<ComponentId> {
        if self.items.is_empty() {
            return None;
        }
        self.current = (self.current + 1) % self.items.len();
        self.current()
    }

    pub fn prev(&mut self) -> Option<ComponentId> {
        if self.items.is_empty() {
            return None;
        }
        self.current = self.current.checked_sub(1).unwrap_or(self.items.len() - 1);
        self.current()
    }

    /// No-op if `id` is not in the ring.
    pub fn set(&mut self, id: ComponentId) {
        if let Some(pos) = self.items.iter().position(|&x| x == id) {
            self.current = pos;
        }
    }

    /// Replace the ring, keeping focus on the same component if it survives.
    pub fn set_items(&mut self, items: Vec<ComponentId>) {
        let old = self.current();
        self.items = items;
        self.current = old
            .and_then(|id| self.items.iter().position(|&x| x == id))
            .unwrap_or(0);
    }
}

impl Default for FocusRing {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycles_both_ways() {
        let mut ring = FocusRing::new(vec![ComponentId::SearchBar, ComponentId::Results]);
        assert_eq!(ring.next(), Some(ComponentId::Results));
        assert_eq!(ring.next(), Some(ComponentId::SearchBar));
        assert_eq!(ring.prev(), Some(ComponentId::Results));
    }

    #[test]
    fn test_set_items_keeps_surviving_focus() {
        let mut ring = FocusRing::new(vec![ComponentId::SearchBar, ComponentId::Results]);
        ring.set(ComponentId::Results);
        ring.set_items(vec![ComponentId::Results, ComponentId::Dashboard]);
        assert_eq!(ring.current(), Some(ComponentId::Results));
        ring.set_items(vec![ComponentId::Dashboard]);
        assert_eq!(ring.current(), Some(ComponentId::Dashboard));
    }

    #[test]
    fn test_empty_ring() {
        let mut ring = FocusRing::default();
        assert_eq!(ring.next(), None);
        assert_eq!(ring.prev(), None);
    }
}
