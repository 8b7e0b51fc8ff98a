// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use rclkit_native::EntityId;

/// Indexes of the slots still holding an entity after a wait.
pub(crate) fn ready_slots(table: &[Option<EntityId>]) -> Vec<usize> {
    table
        .iter()
        .enumerate()
        .filter_map(|(idx, slot)| slot.map(|_| idx))
        .collect()
}

/// Slot holding `entity`, if it is still present (i.e. ready).
pub(crate) fn slot_of(table: &[Option<EntityId>], entity: EntityId) -> Option<usize> {
    table.iter().position(|slot| *slot == Some(entity))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(n: u64) -> Option<EntityId> {
        EntityId::new(n)
    }

    #[test]
    fn ready_slots_returns_ordered_indices() {
        let table = [None, id(4), None, id(2)];
        assert_eq!(ready_slots(&table), vec![1, 3]);
        assert!(ready_slots(&[None, None]).is_empty());
    }

    #[test]
    fn slot_of_finds_only_present_entities() {
        let table = [id(7), None, id(9)];
        let nine = EntityId::new(9).expect("non-zero");
        let five = EntityId::new(5).expect("non-zero");
        assert_eq!(slot_of(&table, nine), Some(2));
        assert_eq!(slot_of(&table, five), None);
    }
}
