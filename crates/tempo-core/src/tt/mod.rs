//! Transposition table
//!
//! Fixed-capacity, always-replace hash table keyed by the position's Zobrist
//! hash. Mate scores are stored relative to the node that produced them and
//! translated back to be relative to the probing node, so a mate found via
//! one move order stays correct when reached via another.

use chess::ChessMove;

use crate::types::{is_mate_score, Hash, Score};

/// How a stored value bounds the true score of the position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    /// Searched with a full window; the value is exact.
    Exact,
    /// Failed high; the true score is at least the stored value.
    Lower,
    /// Failed low; the true score is at most the stored value.
    Upper,
}

#[derive(Debug, Clone, Copy)]
struct TTEntry {
    key: Hash,
    value: Score,
    depth: i32,
    bound: Bound,
    mv: Option<ChessMove>,
}

pub struct TranspositionTable {
    entries: Vec<Option<TTEntry>>,
    capacity: u64,
}

impl TranspositionTable {
    pub fn new(size_mb: usize) -> Self {
        let bytes = size_mb * 1024 * 1024;
        let capacity = (bytes / std::mem::size_of::<Option<TTEntry>>()).max(1);
        TranspositionTable {
            entries: vec![None; capacity],
            capacity: capacity as u64,
        }
    }

    pub fn clear(&mut self) {
        self.entries.fill(None);
    }

    fn index(&self, hash: Hash) -> usize {
        (hash % self.capacity) as usize
    }

    /// Best move recorded for this position, if its entry survived.
    pub fn try_get_move(&self, hash: Hash) -> Option<ChessMove> {
        let entry = self.entries[self.index(hash)]?;
        if entry.key == hash {
            entry.mv
        } else {
            None
        }
    }

    /// Probe for a score usable at a node `ply_from_root` deep searching
    /// `depth` more plies with window `(alpha, beta)`.
    ///
    /// Returns `None` on a miss, a key mismatch, a shallower entry, or a
    /// bound that cannot resolve the current window.
    pub fn lookup(
        &self,
        hash: Hash,
        depth: i32,
        ply_from_root: i32,
        alpha: Score,
        beta: Score,
    ) -> Option<Score> {
        let entry = self.entries[self.index(hash)]?;
        if entry.key != hash || entry.depth < depth {
            return None;
        }
        let value = score_from_tt(entry.value, ply_from_root);
        match entry.bound {
            Bound::Exact => Some(value),
            Bound::Lower if value >= beta => Some(value),
            Bound::Upper if value <= alpha => Some(value),
            _ => None,
        }
    }

    /// Record a search result. Always replaces whatever occupied the slot.
    pub fn store(
        &mut self,
        hash: Hash,
        depth: i32,
        ply_from_root: i32,
        value: Score,
        bound: Bound,
        mv: Option<ChessMove>,
    ) {
        let index = self.index(hash);
        self.entries[index] = Some(TTEntry {
            key: hash,
            value: score_to_tt(value, ply_from_root),
            depth,
            bound,
            mv,
        });
    }
}

/// Convert a root-relative mate score to node-relative before storing.
fn score_to_tt(score: Score, ply_from_root: i32) -> Score {
    if is_mate_score(score) {
        let sign = score.signum();
        (score * sign + ply_from_root) * sign
    } else {
        score
    }
}

/// Convert a node-relative mate score back to root-relative on lookup.
fn score_from_tt(score: Score, ply_from_root: i32) -> Score {
    if is_mate_score(score) {
        let sign = score.signum();
        (score * sign - ply_from_root) * sign
    } else {
        score
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{IMMEDIATE_MATE_SCORE, INFINITY};
    use chess::{ChessMove, Square};

    #[test]
    fn stores_and_recalls_exact_scores() {
        let mut tt = TranspositionTable::new(1);
        let mv = ChessMove::new(Square::E2, Square::E4, None);
        tt.store(0xABCD, 5, 0, 42, Bound::Exact, Some(mv));

        assert_eq!(tt.lookup(0xABCD, 5, 0, -INFINITY, INFINITY), Some(42));
        assert_eq!(tt.lookup(0xABCD, 3, 0, -INFINITY, INFINITY), Some(42));
        assert_eq!(tt.try_get_move(0xABCD), Some(mv));
    }

    #[test]
    fn rejects_shallower_entries_and_unusable_bounds() {
        let mut tt = TranspositionTable::new(1);
        tt.store(0xABCD, 3, 0, 42, Bound::Lower, None);

        // Deeper requirement than stored.
        assert_eq!(tt.lookup(0xABCD, 5, 0, -INFINITY, INFINITY), None);
        // Lower bound of 42 says nothing when beta is above it.
        assert_eq!(tt.lookup(0xABCD, 3, 0, 0, 100), None);
        // But it resolves a window it exceeds.
        assert_eq!(tt.lookup(0xABCD, 3, 0, 0, 40), Some(42));
    }

    #[test]
    fn mate_scores_are_ply_corrected() {
        let mut tt = TranspositionTable::new(1);
        // A node 4 plies from the root finds mate 2 plies below itself, so
        // the root-relative score at store time is mate-in-6.
        tt.store(0x1234, 6, 4, IMMEDIATE_MATE_SCORE - 6, Bound::Exact, None);

        // Reached again from only 2 plies down, the same mate is now 4
        // plies from the root.
        let probed = tt.lookup(0x1234, 6, 2, -INFINITY, INFINITY).unwrap();
        assert_eq!(probed, IMMEDIATE_MATE_SCORE - 4);

        // Getting mated is corrected symmetrically.
        tt.store(0x5678, 6, 4, -(IMMEDIATE_MATE_SCORE - 6), Bound::Exact, None);
        let probed = tt.lookup(0x5678, 6, 2, -INFINITY, INFINITY).unwrap();
        assert_eq!(probed, -(IMMEDIATE_MATE_SCORE - 4));
    }

    #[test]
    fn colliding_slots_are_overwritten_and_mismatched_keys_miss() {
        let mut tt = TranspositionTable::new(1);
        let capacity = tt.capacity;
        tt.store(7, 4, 0, 10, Bound::Exact, None);
        // Same slot, different key.
        tt.store(7 + capacity, 4, 0, 20, Bound::Exact, None);

        assert_eq!(tt.lookup(7, 4, 0, -INFINITY, INFINITY), None);
        assert_eq!(
            tt.lookup(7 + capacity, 4, 0, -INFINITY, INFINITY),
            Some(20)
        );
    }
}
