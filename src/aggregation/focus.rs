//! Click-to-zoom focus over a hierarchy aggregate.

use serde::{Deserialize, Serialize};

use super::hierarchy::{HierarchyAggregate, HierarchyLeaf, HierarchyNode};

/// The single focused level-1 node, if any.
///
/// Focus lives outside the aggregate: the aggregate always covers the full
/// filtered set and [`HierarchyFocus::select`] picks what is displayed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HierarchyFocus {
    focused: Option<String>,
}

/// Displayed subset of a [`HierarchyAggregate`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HierarchyView<'a> {
    pub level1: &'a [HierarchyNode],
    pub level2: &'a [HierarchyLeaf],
}

impl HierarchyFocus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn focused(&self) -> Option<&str> {
        self.focused.as_deref()
    }

    /// Focuses `name`, or clears focus if it is already focused.
    pub fn toggle(&mut self, name: &str) {
        if self.focused.as_deref() == Some(name) {
            self.focused = None;
        } else {
            self.focused = Some(name.to_string());
        }
    }

    /// Clicking a level-2 slice zooms on (or out of) its parent.
    pub fn toggle_leaf(&mut self, leaf: &HierarchyLeaf) {
        self.toggle(&leaf.parent_name);
    }

    pub fn clear(&mut self) {
        self.focused = None;
    }

    /// Focused node and its children, or everything when nothing is focused
    /// or the focused node is gone from `aggregate`.
    pub fn select<'a>(&self, aggregate: &'a HierarchyAggregate) -> HierarchyView<'a> {
        let focused = self.focused.as_deref().and_then(|name| {
            aggregate
                .level1
                .iter()
                .position(|node| node.name == name)
        });

        match focused {
            Some(idx) => HierarchyView {
                level1: &aggregate.level1[idx..=idx],
                level2: &aggregate.level1[idx].children,
            },
            None => HierarchyView {
                level1: &aggregate.level1,
                level2: &aggregate.level2,
            },
        }
    }
}
