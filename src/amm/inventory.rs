use crate::errors::{AmmError, AmmResult};
use crate::state::{OptionClass, Position, PositionId, Side};
use smallvec::SmallVec;

/// A position held by the AMM, with its stable handle.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct InventoryEntry {
    pub id: PositionId,
    pub position: Position,
}

/// AMM-held positions of a single option class.
/// Handles are never reused, so a handle identifies at most one entry.
#[derive(Debug, Clone)]
pub struct Inventory {
    class: OptionClass,
    entries: Vec<InventoryEntry>,
    next_id: u64,
}

impl Inventory {
    pub fn new(class: OptionClass) -> Self {
        Self {
            class,
            entries: Vec::new(),
            next_id: 0,
        }
    }

    #[inline]
    pub fn class(&self) -> OptionClass {
        self.class
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn entries(&self) -> &[InventoryEntry] {
        &self.entries
    }

    pub fn get(&self, id: PositionId) -> Option<&Position> {
        self.entries.iter().find(|e| e.id == id).map(|e| &e.position)
    }

    pub fn ids(&self) -> Vec<PositionId> {
        self.entries.iter().map(|e| e.id).collect()
    }

    /// Handles of positions on `side` whose strike is within `tolerance` of `strike`.
    pub fn matching(&self, strike: f64, side: Side, tolerance: f64) -> SmallVec<[PositionId; 4]> {
        self.entries
            .iter()
            .filter(|e| e.position.side() == side)
            .filter(|e| (e.position.strike() - strike).abs() <= tolerance)
            .map(|e| e.id)
            .collect()
    }

    pub fn insert(&mut self, position: Position) -> AmmResult<PositionId> {
        self.check_class(&position)?;
        let id = PositionId(self.next_id);
        self.next_id += 1;
        self.entries.push(InventoryEntry { id, position });
        Ok(id)
    }

    /// Remove exactly one entry. Anything else means the books are corrupt.
    pub fn remove(&mut self, id: PositionId) -> AmmResult<Position> {
        let hits = self.entries.iter().filter(|e| e.id == id).count();
        if hits != 1 {
            return Err(AmmError::InternalConsistency(format!(
                "{} inventory: removing {id:?} matched {hits} entries",
                self.class
            )));
        }
        let idx = self
            .entries
            .iter()
            .position(|e| e.id == id)
            .ok_or_else(|| AmmError::InternalConsistency(format!("{id:?} vanished")))?;
        Ok(self.entries.remove(idx).position)
    }

    /// Swap `removed` for `added` as one step: every handle and every new
    /// position is validated before anything is touched.
    pub fn replace(
        &mut self,
        removed: &[PositionId],
        added: Vec<Position>,
    ) -> AmmResult<SmallVec<[PositionId; 2]>> {
        for (i, id) in removed.iter().enumerate() {
            let hits = self.entries.iter().filter(|e| e.id == *id).count();
            if hits != 1 || removed[..i].contains(id) {
                return Err(AmmError::InternalConsistency(format!(
                    "{} inventory: cannot replace {id:?} ({hits} entries)",
                    self.class
                )));
            }
        }
        for position in &added {
            self.check_class(position)?;
        }

        self.entries.retain(|e| !removed.contains(&e.id));
        let mut ids = SmallVec::new();
        for position in added {
            ids.push(self.insert(position)?);
        }
        Ok(ids)
    }

    fn check_class(&self, position: &Position) -> AmmResult<()> {
        if position.class() != self.class {
            return Err(AmmError::InternalConsistency(format!(
                "{} position filed into {} inventory",
                position.class(),
                self.class
            )));
        }
        Ok(())
    }
}
