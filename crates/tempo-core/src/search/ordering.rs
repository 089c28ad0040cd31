//! Move ordering
//!
//! Ranks candidate moves so the alpha-beta search meets its cutoffs early:
//! hash move, then captures by MVV-LVA split into winning and losing by the
//! opponent's attack maps, promotions, killer moves, and finally quiet moves
//! by piece-square delta plus history. Owns the killer slots and the history
//! table.

use chess::{BitBoard, ChessMove, Color, Piece, EMPTY};
use smallvec::SmallVec;

use crate::config::EvalWeights;
use crate::eval::psqt;
use crate::position::Position;
use crate::types::{MoveList, Score};

/// Killer moves are tracked for plies below this.
pub const MAX_KILLER_PLY: usize = 32;

const MILLION: Score = 1_000_000;
const HASH_MOVE_SCORE: Score = 100 * MILLION;
const WINNING_CAPTURE_BIAS: Score = 8 * MILLION;
const PROMOTE_BIAS: Score = 6 * MILLION;
const KILLER_BIAS: Score = 4 * MILLION;
const LOSING_CAPTURE_BIAS: Score = 2 * MILLION;

/// Penalty for moving onto a square an opponent pawn attacks.
const PAWN_ATTACK_PENALTY: Score = 50;
/// Penalty for moving onto a square any opponent piece attacks.
const PIECE_ATTACK_PENALTY: Score = 25;

/// Two killer slots per ply, newest first.
#[derive(Clone, Copy, Default)]
struct Killers {
    move_a: Option<ChessMove>,
    move_b: Option<ChessMove>,
}

impl Killers {
    fn add(&mut self, mv: ChessMove) {
        if self.move_a != Some(mv) {
            self.move_b = self.move_a;
            self.move_a = Some(mv);
        }
    }

    fn matches(&self, mv: ChessMove) -> bool {
        self.move_a == Some(mv) || self.move_b == Some(mv)
    }
}

pub struct MoveOrderer {
    weights: EvalWeights,
    killers: [Killers; MAX_KILLER_PLY],
    /// `[side][from][to]` -> accumulated cutoff score.
    history: Box<[[[Score; 64]; 64]; 2]>,
}

impl MoveOrderer {
    pub fn new(weights: EvalWeights) -> Self {
        MoveOrderer {
            weights,
            killers: [Killers::default(); MAX_KILLER_PLY],
            history: Box::new([[[0; 64]; 64]; 2]),
        }
    }

    /// Reorder `moves` in place, best candidates first.
    ///
    /// `opponent_attacks` / `opponent_pawn_attacks` are the squares the
    /// opponent currently covers; quiescence search neither consults nor
    /// records killers.
    #[allow(clippy::too_many_arguments)]
    pub fn order(
        &self,
        hash_move: Option<ChessMove>,
        pos: &Position,
        moves: &mut MoveList,
        opponent_attacks: BitBoard,
        opponent_pawn_attacks: BitBoard,
        in_qsearch: bool,
        ply: usize,
    ) {
        let mut scored: SmallVec<[(ChessMove, Score); 64]> = moves
            .iter()
            .map(|&mv| {
                (
                    mv,
                    self.score_move(
                        hash_move,
                        pos,
                        mv,
                        opponent_attacks,
                        opponent_pawn_attacks,
                        in_qsearch,
                        ply,
                    ),
                )
            })
            .collect();
        scored.sort_unstable_by_key(|&(_, score)| -score);
        for (slot, (mv, _)) in moves.iter_mut().zip(scored.iter()) {
            *slot = *mv;
        }
    }

    fn score_move(
        &self,
        hash_move: Option<ChessMove>,
        pos: &Position,
        mv: ChessMove,
        opponent_attacks: BitBoard,
        opponent_pawn_attacks: BitBoard,
        in_qsearch: bool,
        ply: usize,
    ) -> Score {
        if hash_move == Some(mv) {
            return HASH_MOVE_SCORE;
        }

        let source = mv.get_source();
        let dest = mv.get_dest();
        let Some(piece) = pos.piece_on(source) else {
            return 0;
        };
        let dest_bb = BitBoard::from_square(dest);
        let captured = pos.piece_on(dest);

        let mut score = 0;

        if let Some(victim) = captured {
            // Most valuable victim with the least valuable attacker first;
            // recapturable targets drop into the losing-capture band.
            let material_delta =
                self.weights.piece_value(victim) - self.weights.piece_value(piece);
            let recapturable =
                (opponent_attacks | opponent_pawn_attacks) & dest_bb != EMPTY;
            score += if recapturable && material_delta < 0 {
                LOSING_CAPTURE_BIAS
            } else {
                WINNING_CAPTURE_BIAS
            };
            score += material_delta;
        }

        match piece {
            Piece::Pawn => {
                if mv.get_promotion() == Some(Piece::Queen) && captured.is_none() {
                    score += PROMOTE_BIAS;
                }
            }
            Piece::King => {}
            _ => {
                if let Some(table) = psqt::ordering_table(piece) {
                    let is_white = pos.side_to_move() == Color::White;
                    score += psqt::read(table, dest, is_white) - psqt::read(table, source, is_white);
                }
                if opponent_pawn_attacks & dest_bb != EMPTY {
                    score -= PAWN_ATTACK_PENALTY;
                } else if opponent_attacks & dest_bb != EMPTY {
                    score -= PIECE_ATTACK_PENALTY;
                }
            }
        }

        if captured.is_none() {
            let is_killer =
                !in_qsearch && ply < MAX_KILLER_PLY && self.killers[ply].matches(mv);
            if is_killer {
                score += KILLER_BIAS;
            }
            score += self.history[pos.side_to_move().to_index()][source.to_index()]
                [dest.to_index()];
        }

        score
    }

    /// Record a quiet move that caused a beta cutoff: killer slot for its
    /// ply plus a depth-squared history bump.
    pub fn record_quiet_cutoff(
        &mut self,
        side: Color,
        mv: ChessMove,
        ply: usize,
        depth_remaining: i32,
    ) {
        if ply < MAX_KILLER_PLY {
            self.killers[ply].add(mv);
        }
        let bump = depth_remaining * depth_remaining;
        self.history[side.to_index()][mv.get_source().to_index()][mv.get_dest().to_index()] +=
            bump;
    }

    pub fn clear_killers(&mut self) {
        self.killers = [Killers::default(); MAX_KILLER_PLY];
    }

    pub fn clear_history(&mut self) {
        self.history = Box::new([[[0; 64]; 64]; 2]);
    }

    /// Full reset, for searching an unrelated position.
    pub fn clear(&mut self) {
        self.clear_killers();
        self.clear_history();
    }
}
