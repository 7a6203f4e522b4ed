//! Recent-values tracker: a small bounded cache of named variables the
//! debugger has recently seen, with match/evict/highlight rules (§3, §4.8).

use crate::consts::RECENT_VALUES_SLOTS;
use crate::debug_db::{StorageClass, VariableLocation};

/// One occupied tracker slot.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedValue {
    pub name: String,
    pub storage_class: StorageClass,
    pub position: u64,
    pub is_static: bool,
    pub age: u64,
    pub last_displayed_age: u64,
    pub highlighted: bool,
    pub enclosing_call_depth: u64,
}

/// What happened when a new descriptor was offered to the tracker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOutcome {
    /// Stored into an empty or matched-by-name slot.
    Stored,
    /// Stored by evicting a slot whose register binding was stale; the
    /// evicted slot was highlighted, so the UI should break into the REPL
    /// and announce the replacement (§4.8, rule 2).
    EvictedHighlighted { evicted_name: String },
    /// No non-highlighted slot was available and no match/register-evict
    /// rule applied; the value was not stored.
    Dropped,
}

/// The fixed-size cache described by §3/§4.8.
pub struct RecentValuesTracker {
    slots: [Option<TrackedValue>; RECENT_VALUES_SLOTS],
    filter: Option<String>,
}

impl Default for RecentValuesTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl RecentValuesTracker {
    /// An empty tracker with no active filter.
    pub fn new() -> Self {
        Self {
            slots: std::array::from_fn(|_| None),
            filter: None,
        }
    }

    /// Set (or clear) the substring filter used by the `w` command and by
    /// highlight rule (a) (§4.6, §4.8).
    pub fn set_filter(&mut self, filter: Option<String>) {
        self.filter = filter;
    }

    /// The active filter, if any.
    pub fn filter(&self) -> Option<&str> {
        self.filter.as_deref()
    }

    /// Age every occupied slot by one instruction (§4.8: "Ages increment
    /// once per executed instruction").
    pub fn age_all(&mut self) {
        for slot in self.slots.iter_mut().flatten() {
            slot.age += 1;
        }
    }

    fn highlighted_for(&self, var: &VariableLocation) -> bool {
        let filter_match = self.filter.as_deref().is_some_and(|f| var.name.contains(f));
        filter_match || (var.is_variable && !var.is_const)
    }

    /// Offer a variable descriptor seen at the current instruction to the
    /// tracker, applying the match/evict/highlight policy of §4.8.
    pub fn visit(&mut self, var: &VariableLocation, call_depth: u64) -> StoreOutcome {
        let highlighted = self.highlighted_for(var);
        let fresh = TrackedValue {
            name: var.name.clone(),
            storage_class: var.storage_class,
            position: var.position,
            is_static: var.is_static,
            age: 0,
            last_displayed_age: 0,
            highlighted,
            enclosing_call_depth: call_depth,
        };

        // Rule 1: same name already tracked -> overwrite in place.
        if let Some(slot) = self.slots.iter_mut().flatten().find(|s| s.name == var.name) {
            *slot = fresh;
            return StoreOutcome::Stored;
        }

        // Rule 2: same register, different name -> evict that slot.
        if var.storage_class == StorageClass::InRegister {
            if let Some(idx) = self.slots.iter().position(|s| {
                s.as_ref()
                    .is_some_and(|s| s.storage_class == StorageClass::InRegister && s.position == var.position)
            }) {
                let evicted = self.slots[idx].take().expect("position() found an occupied slot");
                self.slots[idx] = Some(fresh);
                return if evicted.highlighted {
                    StoreOutcome::EvictedHighlighted { evicted_name: evicted.name }
                } else {
                    StoreOutcome::Stored
                };
            }
        }

        // Rule 3: the oldest non-highlighted slot, whether empty or occupied.
        let victim = self
            .slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.as_ref().is_none_or(|s| !s.highlighted))
            .max_by_key(|(_, s)| s.as_ref().map_or(u64::MAX, |s| s.age))
            .map(|(idx, _)| idx);

        match victim {
            Some(idx) => {
                self.slots[idx] = Some(fresh);
                StoreOutcome::Stored
            }
            None => StoreOutcome::Dropped,
        }
    }

    /// Drop every slot that is not currently highlighted (`o` command, §4.6).
    pub fn clear_non_highlighted(&mut self) {
        for slot in self.slots.iter_mut() {
            if slot.as_ref().is_some_and(|s| !s.highlighted) {
                *slot = None;
            }
        }
    }

    /// Slots visible at `call_depth` (§4.8: statics only at their recorded
    /// depth, everything else regardless of depth), in slot order.
    pub fn visible(&self, call_depth: u64) -> impl Iterator<Item = &TrackedValue> {
        self.slots
            .iter()
            .flatten()
            .filter(move |s| !s.is_static || s.enclosing_call_depth == call_depth)
    }

    /// All occupied slots regardless of depth, for `v`'s raw dump.
    pub fn all(&self) -> impl Iterator<Item = &TrackedValue> {
        self.slots.iter().flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::debug_db::TypeTag;

    fn var(name: &str, storage: StorageClass, position: u64, is_const: bool) -> VariableLocation {
        VariableLocation {
            name: name.to_string(),
            type_tag: TypeTag::Other,
            storage_class: storage,
            position,
            is_variable: true,
            is_const,
            is_static: false,
        }
    }

    #[test]
    fn same_name_overwrites_in_place() {
        let mut t = RecentValuesTracker::new();
        t.visit(&var("x", StorageClass::InRegister, 0, false), 0);
        t.visit(&var("x", StorageClass::InRegister, 1, false), 0);
        let found: Vec<_> = t.all().filter(|s| s.name == "x").collect();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].position, 1);
    }

    #[test]
    fn same_register_different_name_evicts_stale_binding() {
        let mut t = RecentValuesTracker::new();
        t.visit(&var("a", StorageClass::InRegister, 2, true), 0); // not highlighted (is_const)
        let outcome = t.visit(&var("b", StorageClass::InRegister, 2, true), 0);
        assert_eq!(outcome, StoreOutcome::Stored);
        assert!(t.all().find(|s| s.name == "a").is_none());
    }

    #[test]
    fn evicting_a_highlighted_register_binding_is_announced() {
        let mut t = RecentValuesTracker::new();
        t.visit(&var("a", StorageClass::InRegister, 2, false), 0); // is_variable && !is_const -> highlighted
        let outcome = t.visit(&var("b", StorageClass::InRegister, 2, true), 0);
        assert_eq!(
            outcome,
            StoreOutcome::EvictedHighlighted {
                evicted_name: "a".to_string()
            }
        );
    }

    #[test]
    fn filter_match_highlights_even_const_variables() {
        let mut t = RecentValuesTracker::new();
        t.set_filter(Some("counter".to_string()));
        t.visit(&var("counter_total", StorageClass::OnStack, 8, true), 0);
        assert!(t.all().next().unwrap().highlighted);
    }

    #[test]
    fn clear_non_highlighted_keeps_highlighted_slots() {
        let mut t = RecentValuesTracker::new();
        t.visit(&var("kept", StorageClass::OnStack, 0, false), 0);
        t.visit(&var("dropped", StorageClass::OnStack, 8, true), 0);
        t.clear_non_highlighted();
        let names: Vec<_> = t.all().map(|s| s.name.clone()).collect();
        assert_eq!(names, vec!["kept".to_string()]);
    }

    #[test]
    fn static_variable_is_hidden_outside_its_recorded_call_depth() {
        let mut t = RecentValuesTracker::new();
        let mut v = var("g_counter", StorageClass::GlobalStackOffset, 0, true);
        v.is_static = true;
        t.visit(&v, 2);
        assert_eq!(t.visible(2).count(), 1);
        assert_eq!(t.visible(0).count(), 0);
    }

    #[test]
    fn non_static_variable_is_visible_at_every_depth() {
        let mut t = RecentValuesTracker::new();
        t.visit(&var("local", StorageClass::OnStack, 0, true), 3);
        assert_eq!(t.visible(3).count(), 1);
        assert_eq!(t.visible(0).count(), 1);
    }
}
