//! Repetition detection
//!
//! A bounded stack of position hashes pushed and popped in lock-step with
//! the search recursion. Each entry records the start of the current
//! "irreversible segment": a capture or pawn move resets it, and
//! [`RepetitionTable::contains`] ignores everything before the segment
//! start, since those positions can never recur.

use crate::position::Position;
use crate::types::Hash;

/// Fixed stack capacity. Deep enough for any search stack plus the seeded
/// game history; repetition only needs detecting within the current
/// irreversible segment anyway.
const CAPACITY: usize = 256;

pub struct RepetitionTable {
    hashes: [Hash; CAPACITY],
    /// `start_indices[count]` is the segment start for the current stack
    /// height `count`.
    start_indices: [usize; CAPACITY + 1],
    count: usize,
}

impl RepetitionTable {
    pub fn new() -> Self {
        RepetitionTable {
            hashes: [0; CAPACITY],
            start_indices: [0; CAPACITY + 1],
            count: 0,
        }
    }

    /// Seed from a position's recorded history plus the position itself.
    /// Only hashes inside the fifty-move window can repeat, so older ones
    /// are not loaded; if even that overflows capacity, the oldest are
    /// dropped.
    pub fn init(&mut self, position: &Position) {
        let history = position.repetition_history();
        let window = (position.halfmove_clock() as usize).min(history.len());
        let relevant = &history[history.len() - window..];
        let keep = relevant.len().min(CAPACITY - 1);
        let seed = &relevant[relevant.len() - keep..];

        self.hashes[..keep].copy_from_slice(seed);
        self.hashes[keep] = position.hash();
        self.count = keep + 1;
        for index in &mut self.start_indices[..=self.count] {
            *index = 0;
        }
    }

    /// Push a hash. `reset` marks the preceding move as irreversible
    /// (capture or pawn move), starting a new segment at this entry.
    pub fn push(&mut self, hash: Hash, reset: bool) {
        if self.count == CAPACITY {
            // Shift everything down one slot, dropping the oldest entry.
            self.hashes.copy_within(1.., 0);
            self.start_indices.copy_within(1.., 0);
            self.count -= 1;
            for index in &mut self.start_indices[..=self.count] {
                *index = index.saturating_sub(1);
            }
        }
        self.hashes[self.count] = hash;
        self.start_indices[self.count + 1] = if reset {
            self.count
        } else {
            self.start_indices[self.count]
        };
        self.count += 1;
    }

    /// Remove the most recently pushed entry. Returns whether a pop
    /// happened.
    pub fn try_pop(&mut self) -> bool {
        if self.count == 0 {
            return false;
        }
        self.count -= 1;
        true
    }

    /// Whether `hash` already occurred within the current irreversible
    /// segment. The most recent entry (the probing node's own parent push)
    /// is excluded from the scan.
    pub fn contains(&self, hash: Hash) -> bool {
        let start = self.start_indices[self.count];
        let end = self.count.saturating_sub(1);
        self.hashes[start..end].contains(&hash)
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.count
    }
}

impl Default for RepetitionTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_hash_is_detected() {
        let mut table = RepetitionTable::new();
        table.push(0xABCD, false);
        table.push(0xABCD, false);
        assert!(table.contains(0xABCD));
    }

    #[test]
    fn irreversible_move_starts_a_new_segment() {
        let mut table = RepetitionTable::new();
        table.push(0xABCD, false);
        table.push(0x1111, true); // capture/pawn move played here
        table.push(0xABCD, false);
        // The earlier occurrence is behind the segment start.
        assert!(!table.contains(0xABCD));
    }

    #[test]
    fn pop_unwinds_segments() {
        let mut table = RepetitionTable::new();
        table.push(0xABCD, false);
        table.push(0x1111, true);
        assert!(table.try_pop());
        table.push(0xABCD, false);
        assert!(table.contains(0xABCD));
    }

    #[test]
    fn pop_on_empty_reports_false() {
        let mut table = RepetitionTable::new();
        assert!(!table.try_pop());
        table.push(1, false);
        assert!(table.try_pop());
        assert!(!table.try_pop());
    }

    #[test]
    fn overflow_drops_the_oldest_entry() {
        let mut table = RepetitionTable::new();
        for i in 0..CAPACITY {
            table.push(i as Hash, false);
        }
        assert_eq!(table.len(), CAPACITY);
        table.push(0xFFFF, false);
        assert_eq!(table.len(), CAPACITY);
        // Hash 0 was dropped; hash 1 survived the shift.
        assert!(!table.contains(0));
        assert!(table.contains(1));
    }

    #[test]
    fn init_seeds_from_position_history() {
        use crate::position::Position;
        use chess::{ChessMove, File, Rank, Square};

        let mut pos = Position::startpos();
        // Shuffle knights out and back: four reversible moves.
        let moves = [
            ("g1f3", (Rank::First, File::G), (Rank::Third, File::F)),
            ("g8f6", (Rank::Eighth, File::G), (Rank::Sixth, File::F)),
            ("f3g1", (Rank::Third, File::F), (Rank::First, File::G)),
            ("f6g8", (Rank::Sixth, File::F), (Rank::Eighth, File::G)),
        ];
        let start_hash = pos.hash();
        for (_, from, to) in moves {
            let mv = ChessMove::new(
                Square::make_square(from.0, from.1),
                Square::make_square(to.0, to.1),
                None,
            );
            pos.apply(mv);
        }
        assert_eq!(pos.hash(), start_hash);

        let mut table = RepetitionTable::new();
        table.init(&pos);
        // Four prior positions plus the current one.
        assert_eq!(table.len(), 5);
        // The starting position occurs in the seeded history, so a search
        // line reaching it again sees a repetition.
        table.push(0xDEAD, false);
        assert!(table.contains(start_hash));
    }
}
