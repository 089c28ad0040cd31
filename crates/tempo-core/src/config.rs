//! Engine configuration
//!
//! All tunable weights and thresholds live in explicit config objects that
//! are constructed once and passed by reference, so several independently
//! configured searchers can coexist in one process (e.g. a main search plus
//! speculative pondering searches).

use chess::Piece;
use serde::{Deserialize, Serialize};

use crate::types::Score;

/// Static evaluation weights.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EvalWeights {
    pub pawn_value: Score,
    pub knight_value: Score,
    pub bishop_value: Score,
    pub rook_value: Score,
    pub queen_value: Score,

    /// Passed pawn bonus indexed by squares from promotion (0..=6).
    pub passed_pawn_bonuses: [Score; 7],
    /// Penalty (negative) indexed by the number of isolated pawns for a side.
    pub isolated_pawn_penalty_by_count: [Score; 9],
    /// Per-square miss penalty for the six king pawn-shield squares.
    pub king_pawn_shield_scores: [Score; 6],
    /// Material edge (in centipawns) required before the mop-up term
    /// activates. Roughly two minor pieces.
    pub mop_up_material_edge: Score,
}

impl Default for EvalWeights {
    fn default() -> Self {
        EvalWeights {
            pawn_value: 100,
            knight_value: 300,
            bishop_value: 320,
            rook_value: 500,
            queen_value: 900,
            passed_pawn_bonuses: [0, 120, 80, 50, 30, 15, 15],
            isolated_pawn_penalty_by_count: [0, -10, -25, -50, -75, -75, -75, -75, -75],
            king_pawn_shield_scores: [4, 7, 4, 3, 6, 3],
            mop_up_material_edge: 600,
        }
    }
}

impl EvalWeights {
    /// Material value of a piece. The king never enters material sums.
    #[inline]
    pub fn piece_value(&self, piece: Piece) -> Score {
        match piece {
            Piece::Pawn => self.pawn_value,
            Piece::Knight => self.knight_value,
            Piece::Bishop => self.bishop_value,
            Piece::Rook => self.rook_value,
            Piece::Queen => self.queen_value,
            Piece::King => 0,
        }
    }

    /// Non-pawn material at which the endgame transition reaches zero
    /// (i.e. full middlegame material).
    #[inline]
    pub fn endgame_material_start(&self) -> Score {
        self.rook_value * 2 + self.bishop_value + self.knight_value
    }
}

/// Search driver parameters.
///
/// The late-move-reduction thresholds and the quiescence ply ceiling are
/// empirical; they are exposed here as tunables rather than contracts.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Transposition table budget in megabytes.
    pub tt_size_mb: usize,
    /// Iterative deepening ceiling.
    pub max_depth: i32,
    /// Total one-ply search extensions allowed along a single line.
    pub max_extensions: i32,
    /// Minimum remaining depth before late-move reduction applies.
    pub lmr_min_depth: i32,
    /// Ordered-move index from which late moves are reduced.
    pub lmr_move_threshold: usize,
    /// Hard ply ceiling for quiescence search beyond the main-search
    /// horizon. At the ceiling a node returns its stand-pat score.
    pub qsearch_max_ply: usize,
    /// Fraction of the time budget after which no new iteration starts.
    pub soft_time_fraction: f64,
    /// Evaluation weights.
    pub weights: EvalWeights,
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            tt_size_mb: 64,
            max_depth: 64,
            max_extensions: 16,
            lmr_min_depth: 3,
            lmr_move_threshold: 3,
            qsearch_max_ply: 32,
            soft_time_fraction: 0.3,
            weights: EvalWeights::default(),
        }
    }
}
