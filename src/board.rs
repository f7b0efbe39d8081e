//! The ranking board: ordered tiers plus the pool of unplaced items.
//!
//! Every mutation goes through [`Board`] methods, which keep each item in
//! exactly one location. A failed operation leaves the board untouched.

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::defaults::{DEFAULT_TIER_COUNT, DEFAULT_TIER_LABELS};
use crate::media::Item;

/// Where an item lives, or where it should go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Location {
    Pool,
    Tier(usize),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tier {
    pub id: String,
    pub label: String,
    pub items: Vec<Item>,
}

impl Tier {
    /// An empty tier for creation slot `index`, labelled by the default rule.
    pub fn for_slot(index: usize) -> Self {
        Tier {
            id: tier_id(index),
            label: default_tier_label(index),
            items: Vec::new(),
        }
    }
}

pub fn tier_id(index: usize) -> String {
    format!("tier-{}", index)
}

/// `S, A, B, C, D, F, G, H`, then `T<n+1>` for later slots.
pub fn default_tier_label(index: usize) -> String {
    DEFAULT_TIER_LABELS
        .get(index)
        .map(|label| label.to_string())
        .unwrap_or_else(|| format!("T{}", index + 1))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoardError {
    ItemNotFound(String),
    TierNotFound(usize),
    EmptyLabel,
    DuplicateItem(String),
}

impl fmt::Display for BoardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoardError::ItemNotFound(id) => write!(f, "Could not find item: {}", id),
            BoardError::TierNotFound(index) => write!(f, "Could not find tier #{}", index + 1),
            BoardError::EmptyLabel => write!(f, "Tier label cannot be empty"),
            BoardError::DuplicateItem(id) => write!(f, "Item already on the board: {}", id),
        }
    }
}

impl std::error::Error for BoardError {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    tiers: Vec<Tier>,
    pool: Vec<Item>,
}

impl Default for Board {
    fn default() -> Self {
        Board::with_tier_count(DEFAULT_TIER_COUNT)
    }
}

impl Board {
    pub fn with_tier_count(count: usize) -> Self {
        Board {
            tiers: (0..count).map(Tier::for_slot).collect(),
            pool: Vec::new(),
        }
    }

    /// Assemble a board from parts that are already known to be consistent.
    pub(crate) fn from_parts(tiers: Vec<Tier>, pool: Vec<Item>) -> Self {
        Board { tiers, pool }
    }

    pub fn tiers(&self) -> &[Tier] {
        &self.tiers
    }

    pub fn pool(&self) -> &[Item] {
        &self.pool
    }

    pub fn tier_count(&self) -> usize {
        self.tiers.len()
    }

    /// All items in collection order: the pool first, then each tier in turn.
    pub fn items(&self) -> impl Iterator<Item = &Item> {
        self.pool
            .iter()
            .chain(self.tiers.iter().flat_map(|tier| tier.items.iter()))
    }

    pub fn item_count(&self) -> usize {
        self.pool.len() + self.tiers.iter().map(|t| t.items.len()).sum::<usize>()
    }

    pub fn locate(&self, item_id: &str) -> Option<Location> {
        if self.pool.iter().any(|item| item.id == item_id) {
            return Some(Location::Pool);
        }
        self.tiers
            .iter()
            .position(|tier| tier.items.iter().any(|item| item.id == item_id))
            .map(Location::Tier)
    }

    pub fn get(&self, item_id: &str) -> Option<&Item> {
        self.items().find(|item| item.id == item_id)
    }

    /// Case-insensitive lookup of a tier by its label.
    pub fn tier_index_by_label(&self, label: &str) -> Option<usize> {
        let wanted = label.trim().to_lowercase();
        self.tiers
            .iter()
            .position(|tier| tier.label.to_lowercase() == wanted)
    }

    /// Add freshly uploaded items to the pool.
    ///
    /// Items whose id is already on the board are skipped; their ids are
    /// returned so the caller can report them.
    pub fn add_to_pool(&mut self, items: impl IntoIterator<Item = Item>) -> Vec<String> {
        let mut skipped = Vec::new();
        for item in items {
            if self.locate(&item.id).is_some() {
                warn!("Skipping duplicate item '{}'", item.id);
                skipped.push(item.id);
                continue;
            }
            debug!("Added '{}' to pool", item.id);
            self.pool.push(item);
        }
        skipped
    }

    /// Move an item to the end of `destination`. Returns where it came from.
    pub fn place(&mut self, item_id: &str, destination: Location) -> Result<Location, BoardError> {
        if let Location::Tier(index) = destination {
            if index >= self.tiers.len() {
                return Err(BoardError::TierNotFound(index));
            }
        }
        let from = self
            .locate(item_id)
            .ok_or_else(|| BoardError::ItemNotFound(item_id.to_string()))?;
        let item = self.take(item_id, from)?;
        match destination {
            Location::Pool => self.pool.push(item),
            Location::Tier(index) => self.tiers[index].items.push(item),
        }
        debug!("Moved '{}' from {:?} to {:?}", item_id, from, destination);
        Ok(from)
    }

    /// Delete an item from wherever it lives.
    pub fn remove(&mut self, item_id: &str) -> Result<Item, BoardError> {
        let from = self
            .locate(item_id)
            .ok_or_else(|| BoardError::ItemNotFound(item_id.to_string()))?;
        let item = self.take(item_id, from)?;
        info!("Removed '{}'", item_id);
        Ok(item)
    }

    fn take(&mut self, item_id: &str, from: Location) -> Result<Item, BoardError> {
        let items = match from {
            Location::Pool => &mut self.pool,
            Location::Tier(index) => {
                &mut self
                    .tiers
                    .get_mut(index)
                    .ok_or(BoardError::TierNotFound(index))?
                    .items
            }
        };
        let position = items
            .iter()
            .position(|item| item.id == item_id)
            .ok_or_else(|| BoardError::ItemNotFound(item_id.to_string()))?;
        Ok(items.remove(position))
    }

    /// Grow or shrink the tier list.
    ///
    /// New tiers get default labels for their slot. Items of removed tiers go
    /// back to the pool in tier order, then item order. Returns how many items
    /// were returned to the pool.
    pub fn resize_tiers(&mut self, new_count: usize) -> usize {
        let current = self.tiers.len();
        if new_count > current {
            self.tiers.extend((current..new_count).map(Tier::for_slot));
            info!("Grew tiers from {} to {}", current, new_count);
            return 0;
        }
        let mut returned = 0;
        for tier in self.tiers.drain(new_count..) {
            returned += tier.items.len();
            self.pool.extend(tier.items);
        }
        if new_count < current {
            info!(
                "Shrank tiers from {} to {}, {} item(s) back in pool",
                current, new_count, returned
            );
        }
        returned
    }

    /// Rename a tier. Blank labels are rejected; the label is stored trimmed.
    pub fn relabel(&mut self, tier_index: usize, new_label: &str) -> Result<(), BoardError> {
        let trimmed = new_label.trim();
        if trimmed.is_empty() {
            return Err(BoardError::EmptyLabel);
        }
        let tier = self
            .tiers
            .get_mut(tier_index)
            .ok_or(BoardError::TierNotFound(tier_index))?;
        tier.label = trimmed.to_string();
        Ok(())
    }

    fn get_mut(&mut self, item_id: &str) -> Option<&mut Item> {
        self.pool
            .iter_mut()
            .chain(self.tiers.iter_mut().flat_map(|tier| tier.items.iter_mut()))
            .find(|item| item.id == item_id)
    }

    /// Attach a recognition label to an item.
    pub fn set_label(&mut self, item_id: &str, label: Option<String>) -> Result<(), BoardError> {
        let item = self
            .get_mut(item_id)
            .ok_or_else(|| BoardError::ItemNotFound(item_id.to_string()))?;
        item.label = label;
        Ok(())
    }

    pub fn clear_labels(&mut self) {
        for item in self
            .pool
            .iter_mut()
            .chain(self.tiers.iter_mut().flat_map(|tier| tier.items.iter_mut()))
        {
            item.label = None;
        }
    }

    /// Image items that have not been annotated yet, in collection order.
    pub fn unlabeled_images(&self) -> Vec<Item> {
        self.items()
            .filter(|item| item.is_image() && item.label.is_none())
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::MediaKind;

    fn item(id: &str) -> Item {
        Item::new(id, format!("{}.png", id), format!("/uploads/{}", id), MediaKind::Image)
    }

    fn ids(items: &[Item]) -> Vec<&str> {
        items.iter().map(|i| i.id.as_str()).collect()
    }

    #[test]
    fn default_board_has_five_labelled_tiers() {
        let board = Board::default();
        let labels: Vec<_> = board.tiers().iter().map(|t| t.label.as_str()).collect();
        assert_eq!(labels, ["S", "A", "B", "C", "D"]);
        assert_eq!(board.tiers()[4].id, "tier-4");
        assert!(board.pool().is_empty());
    }

    #[test]
    fn default_labels_continue_past_the_list() {
        assert_eq!(default_tier_label(7), "H");
        assert_eq!(default_tier_label(8), "T9");
        assert_eq!(default_tier_label(11), "T12");
    }

    #[test]
    fn place_moves_between_pool_and_tiers() {
        let mut board = Board::default();
        board.add_to_pool([item("a"), item("b")]);

        assert_eq!(board.place("a", Location::Tier(0)), Ok(Location::Pool));
        assert_eq!(ids(board.pool()), ["b"]);
        assert_eq!(ids(&board.tiers()[0].items), ["a"]);

        assert_eq!(board.place("a", Location::Tier(2)), Ok(Location::Tier(0)));
        assert!(board.tiers()[0].items.is_empty());
        assert_eq!(ids(&board.tiers()[2].items), ["a"]);

        assert_eq!(board.place("a", Location::Pool), Ok(Location::Tier(2)));
        assert_eq!(ids(board.pool()), ["b", "a"]);
    }

    #[test]
    fn place_within_same_tier_appends_to_end() {
        let mut board = Board::default();
        board.add_to_pool([item("a"), item("b")]);
        board.place("a", Location::Tier(1)).unwrap();
        board.place("b", Location::Tier(1)).unwrap();
        board.place("a", Location::Tier(1)).unwrap();
        assert_eq!(ids(&board.tiers()[1].items), ["b", "a"]);
    }

    #[test]
    fn place_unknown_item_or_tier_is_a_no_op() {
        let mut board = Board::default();
        board.add_to_pool([item("a")]);
        let before = board.clone();

        assert_eq!(
            board.place("ghost", Location::Tier(0)),
            Err(BoardError::ItemNotFound("ghost".into()))
        );
        assert_eq!(board.place("a", Location::Tier(9)), Err(BoardError::TierNotFound(9)));
        assert_eq!(board, before);
    }

    #[test]
    fn duplicate_ids_are_not_added_twice() {
        let mut board = Board::default();
        board.add_to_pool([item("a")]);
        board.place("a", Location::Tier(0)).unwrap();
        let skipped = board.add_to_pool([item("a"), item("b")]);
        assert_eq!(skipped, ["a"]);
        assert_eq!(board.item_count(), 2);
    }

    #[test]
    fn remove_discards_item_everywhere() {
        let mut board = Board::default();
        board.add_to_pool([item("a"), item("b")]);
        board.place("b", Location::Tier(3)).unwrap();
        assert_eq!(board.remove("b").map(|i| i.id), Ok("b".to_string()));
        assert_eq!(board.locate("b"), None);
        assert_eq!(board.remove("b"), Err(BoardError::ItemNotFound("b".into())));
    }

    #[test]
    fn shrinking_returns_items_to_pool_in_tier_order() {
        let mut board = Board::default();
        board.add_to_pool([item("a"), item("b"), item("c"), item("d")]);
        board.place("d", Location::Tier(4)).unwrap();
        board.place("b", Location::Tier(3)).unwrap();
        board.place("c", Location::Tier(3)).unwrap();
        board.place("a", Location::Tier(0)).unwrap();

        assert_eq!(board.resize_tiers(3), 3);
        assert_eq!(board.tier_count(), 3);
        assert_eq!(ids(board.pool()), ["b", "c", "d"]);
        assert_eq!(ids(&board.tiers()[0].items), ["a"]);
    }

    #[test]
    fn growing_uses_default_labels_for_new_slots() {
        let mut board = Board::with_tier_count(2);
        board.relabel(0, "Best").unwrap();
        board.resize_tiers(10);
        let labels: Vec<_> = board.tiers().iter().map(|t| t.label.as_str()).collect();
        assert_eq!(labels, ["Best", "A", "B", "C", "D", "F", "G", "H", "T9", "T10"]);
        assert_eq!(board.tiers()[9].id, "tier-9");
    }

    #[test]
    fn resize_to_zero_is_allowed() {
        let mut board = Board::default();
        board.add_to_pool([item("a")]);
        board.place("a", Location::Tier(0)).unwrap();
        assert_eq!(board.resize_tiers(0), 1);
        assert_eq!(board.tier_count(), 0);
        assert_eq!(board.locate("a"), Some(Location::Pool));
    }

    #[test]
    fn relabel_trims_and_rejects_blank() {
        let mut board = Board::default();
        assert_eq!(board.relabel(1, "   "), Err(BoardError::EmptyLabel));
        assert_eq!(board.tiers()[1].label, "A");
        board.relabel(1, "  Great ").unwrap();
        assert_eq!(board.tiers()[1].label, "Great");
        assert_eq!(board.relabel(7, "X"), Err(BoardError::TierNotFound(7)));
    }

    #[test]
    fn relabel_is_idempotent() {
        let mut once = Board::default();
        once.relabel(2, "Mid").unwrap();
        let mut twice = once.clone();
        twice.relabel(2, "Mid").unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn tier_lookup_ignores_case() {
        let board = Board::default();
        assert_eq!(board.tier_index_by_label("s"), Some(0));
        assert_eq!(board.tier_index_by_label(" b "), Some(2));
        assert_eq!(board.tier_index_by_label("z"), None);
    }

    #[test]
    fn labels_follow_items_and_can_be_cleared() {
        let mut board = Board::default();
        board.add_to_pool([item("a"), item("b")]);
        board.set_label("a", Some("cat".into())).unwrap();
        board.place("a", Location::Tier(0)).unwrap();
        assert_eq!(board.get("a").and_then(|i| i.label.as_deref()), Some("cat"));
        assert_eq!(ids(&board.unlabeled_images()), ["b"]);

        board.clear_labels();
        assert!(board.items().all(|i| i.label.is_none()));
        assert_eq!(
            board.set_label("zzz", None),
            Err(BoardError::ItemNotFound("zzz".into()))
        );
    }

    #[test]
    fn audio_items_are_never_queued_for_recognition() {
        let mut board = Board::default();
        board.add_to_pool([Item::new("s.mp3", "s.mp3", "/u/s.mp3", MediaKind::Audio)]);
        assert!(board.unlabeled_images().is_empty());
    }
}
