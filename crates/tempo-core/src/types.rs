//! Score and move-list types shared across the engine
//!
//! Scores are plain centipawn `i32`s. Values inside the band near
//! `±IMMEDIATE_MATE_SCORE` encode "mate in N plies"; everything else is a
//! heuristic evaluation.

use chess::ChessMove;
use smallvec::SmallVec;

/// Centipawn score, side-to-move relative.
pub type Score = i32;

/// 64-bit Zobrist position hash.
pub type Hash = u64;

/// Node count type.
pub type NodeCount = u64;

/// Stack-allocated move buffer. A legal chess position has at most 218
/// moves; 64 covers the overwhelming majority without spilling.
pub type MoveList = SmallVec<[ChessMove; 64]>;

/// Score bound for alpha-beta windows.
pub const INFINITY: Score = 9_999_999;

/// Score of a mate delivered on this very ply. "Mate in N plies" is
/// `IMMEDIATE_MATE_SCORE - N`.
pub const IMMEDIATE_MATE_SCORE: Score = 100_000;

/// Width of the mate band: any score within this distance of
/// `IMMEDIATE_MATE_SCORE` is a mate score.
pub const MAX_MATE_PLY: Score = 1_000;

/// Score returned for drawn positions.
pub const DRAW_SCORE: Score = 0;

/// Whether a score encodes a forced mate.
#[inline]
pub fn is_mate_score(score: Score) -> bool {
    score.abs() >= IMMEDIATE_MATE_SCORE - MAX_MATE_PLY
}

/// Number of plies until mate encoded in a mate score.
#[inline]
pub fn plies_to_mate(score: Score) -> Score {
    debug_assert!(is_mate_score(score));
    IMMEDIATE_MATE_SCORE - score.abs()
}

/// Mate score seen from the mated side at `ply_from_root`.
#[inline]
pub fn mated_in(ply_from_root: i32) -> Score {
    -(IMMEDIATE_MATE_SCORE - ply_from_root)
}
