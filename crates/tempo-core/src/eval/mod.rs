//! Static evaluation
//!
//! Heuristic scoring of a position from the side to move's perspective:
//! material, tapered piece-square tables, pawn structure, king safety and a
//! mop-up term for won endgames. The endgame transition is a continuous
//! fraction of the opponent's remaining non-pawn material, so the opening
//! and endgame tables blend instead of switching.

pub mod precomputed;
pub mod psqt;

use chess::{get_adjacent_files, get_file, BitBoard, Color, File, Piece, Square, EMPTY};

use crate::config::EvalWeights;
use crate::position::Position;
use crate::types::Score;

use precomputed::PrecomputedEvalData;

/// Evaluation seam. The search driver only depends on this trait, so a
/// different scorer can be swapped in without touching the search.
pub trait Evaluate {
    /// Score `pos` from the perspective of the side to move. Negating the
    /// position negates the result.
    fn evaluate(&self, pos: &Position) -> Score;
}

/// Per-side material census used by several evaluation terms.
struct MaterialInfo {
    material_score: Score,
    num_rooks: u32,
    num_queens: u32,
    /// 0 at full material, 1 in a bare endgame.
    endgame_t: f64,
    pawns: BitBoard,
}

pub struct HeuristicEvaluator {
    weights: EvalWeights,
    data: PrecomputedEvalData,
}

impl HeuristicEvaluator {
    pub fn new(weights: EvalWeights) -> Self {
        HeuristicEvaluator {
            weights,
            data: PrecomputedEvalData::new(),
        }
    }

    fn material_info(&self, pos: &Position, color: Color) -> MaterialInfo {
        let w = &self.weights;
        let num_pawns = pos.pieces(Piece::Pawn, color).popcnt();
        let num_knights = pos.pieces(Piece::Knight, color).popcnt();
        let num_bishops = pos.pieces(Piece::Bishop, color).popcnt();
        let num_rooks = pos.pieces(Piece::Rook, color).popcnt();
        let num_queens = pos.pieces(Piece::Queen, color).popcnt();

        let non_pawn_material = num_knights as Score * w.knight_value
            + num_bishops as Score * w.bishop_value
            + num_rooks as Score * w.rook_value
            + num_queens as Score * w.queen_value;
        let material_score = non_pawn_material + num_pawns as Score * w.pawn_value;

        let endgame_t =
            1.0 - (non_pawn_material as f64 / w.endgame_material_start() as f64).min(1.0);

        MaterialInfo {
            material_score,
            num_rooks,
            num_queens,
            endgame_t,
            pawns: pos.pieces(Piece::Pawn, color),
        }
    }

    /// Piece-square score for one side, with pawn and king tables tapered
    /// by the *opponent's* endgame fraction.
    fn piece_square_score(&self, pos: &Position, color: Color, endgame_t: f64) -> Score {
        let is_white = color == Color::White;
        let mut value = 0;

        for (piece, table) in [
            (Piece::Knight, &psqt::KNIGHTS),
            (Piece::Bishop, &psqt::BISHOPS),
            (Piece::Rook, &psqt::ROOKS),
            (Piece::Queen, &psqt::QUEENS),
        ] {
            for sq in pos.pieces(piece, color) {
                value += psqt::read(table, sq, is_white);
            }
        }

        let mut pawns_early = 0;
        let mut pawns_late = 0;
        for sq in pos.pieces(Piece::Pawn, color) {
            pawns_early += psqt::read(&psqt::PAWNS, sq, is_white);
            pawns_late += psqt::read(&psqt::PAWNS_END, sq, is_white);
        }
        value += (pawns_early as f64 * (1.0 - endgame_t)) as Score;
        value += (pawns_late as f64 * endgame_t) as Score;

        let king_sq = pos.king_square(color);
        let king_early = psqt::read(&psqt::KING_START, king_sq, is_white);
        let king_late = psqt::read(&psqt::KING_END, king_sq, is_white);
        value += (king_early as f64 * (1.0 - endgame_t)) as Score;
        value += (king_late as f64 * endgame_t) as Score;

        value
    }

    /// Passed pawn bonuses and isolated pawn penalties for one side.
    fn pawn_structure(&self, pos: &Position, color: Color) -> Score {
        let friendly = pos.pieces(Piece::Pawn, color);
        let enemy = pos.pieces(Piece::Pawn, !color);

        let mut bonus = 0;
        let mut num_isolated = 0usize;

        for sq in friendly {
            if self.data.passed_pawn_mask(color, sq) & enemy == EMPTY {
                let rank = sq.get_rank().to_index();
                let from_promotion = match color {
                    Color::White => 7 - rank,
                    Color::Black => rank,
                };
                bonus += self.weights.passed_pawn_bonuses[from_promotion.min(6)];
            }
            if get_adjacent_files(sq.get_file()) & friendly == EMPTY {
                num_isolated += 1;
            }
        }

        bonus + self.weights.isolated_pawn_penalty_by_count[num_isolated.min(8)]
    }

    /// Pawn-shield and open-file penalties around `color`'s king, fading out
    /// as the opponent's material runs down and halving once queens are off.
    fn king_safety(&self, pos: &Position, color: Color, enemy: &MaterialInfo) -> Score {
        if enemy.endgame_t >= 1.0 {
            return 0;
        }

        let king_sq = pos.king_square(color);
        let king_file = king_sq.get_file().to_index();

        let mut shield_penalty: Score = 0;
        // Only kings tucked away on the flanks are scored against a shield,
        // and only the nearest rank of shield squares is charged.
        if king_file <= 2 || king_file >= 5 {
            let shield = self.data.pawn_shield(color, king_sq);
            for (i, &shield_sq) in shield.iter().take(shield.len() / 2).enumerate() {
                let shielded = pos.piece_on(shield_sq) == Some(Piece::Pawn)
                    && pos.color_on(shield_sq) == Some(color);
                if !shielded {
                    shield_penalty += self.weights.king_pawn_shield_scores[i];
                }
            }
            shield_penalty *= shield_penalty;
        }

        let mut open_file_penalty: Score = 0;
        let rook_pair_or_queen = enemy.num_rooks > 1 || (enemy.num_rooks > 0 && enemy.num_queens > 0);
        if rook_pair_or_queen {
            let friendly_pawns = pos.pieces(Piece::Pawn, color);
            let clamped_file = king_file.clamp(1, 6);
            for file in clamped_file..=clamped_file + 1 {
                let file_mask = get_file(File::from_index(file));
                let is_king_file = file == king_file;
                if friendly_pawns & file_mask == EMPTY {
                    open_file_penalty += if is_king_file { 25 } else { 15 };
                    if enemy.pawns & file_mask == EMPTY {
                        open_file_penalty += if is_king_file { 15 } else { 10 };
                    }
                }
            }
        }

        let mut weight = 1.0 - enemy.endgame_t;
        let queens_off = pos.pieces(Piece::Queen, Color::White).popcnt() == 0
            && pos.pieces(Piece::Queen, Color::Black).popcnt() == 0;
        if queens_off {
            weight *= 0.6;
        }

        -(((shield_penalty + open_file_penalty) as f64 * weight) as Score)
    }

    /// Reward driving the enemy king to the edge when winning a bare
    /// endgame. Only active with a decisive material edge.
    fn mop_up(
        &self,
        pos: &Position,
        color: Color,
        my: &MaterialInfo,
        enemy: &MaterialInfo,
    ) -> Score {
        if my.material_score <= enemy.material_score + self.weights.mop_up_material_edge
            || enemy.endgame_t <= 0.0
        {
            return 0;
        }

        let my_king = pos.king_square(color);
        let enemy_king = pos.king_square(!color);

        let mut score = (14 - manhattan_distance(my_king, enemy_king)) * 4;
        score += center_manhattan_distance(enemy_king) * 10;

        (score as f64 * enemy.endgame_t) as Score
    }

    fn side_score(
        &self,
        pos: &Position,
        color: Color,
        my: &MaterialInfo,
        enemy: &MaterialInfo,
    ) -> Score {
        my.material_score
            + self.piece_square_score(pos, color, enemy.endgame_t)
            + self.mop_up(pos, color, my, enemy)
            + self.pawn_structure(pos, color)
            + self.king_safety(pos, color, enemy)
    }
}

impl Evaluate for HeuristicEvaluator {
    fn evaluate(&self, pos: &Position) -> Score {
        let white = self.material_info(pos, Color::White);
        let black = self.material_info(pos, Color::Black);

        let white_score = self.side_score(pos, Color::White, &white, &black);
        let black_score = self.side_score(pos, Color::Black, &black, &white);

        let perspective = match pos.side_to_move() {
            Color::White => 1,
            Color::Black => -1,
        };
        (white_score - black_score) * perspective
    }
}

#[inline]
fn manhattan_distance(a: Square, b: Square) -> Score {
    let file_diff =
        (a.get_file().to_index() as i32 - b.get_file().to_index() as i32).abs();
    let rank_diff =
        (a.get_rank().to_index() as i32 - b.get_rank().to_index() as i32).abs();
    file_diff + rank_diff
}

/// Manhattan distance to the nearest of the four center squares.
#[inline]
fn center_manhattan_distance(sq: Square) -> Score {
    let file = sq.get_file().to_index() as i32;
    let rank = sq.get_rank().to_index() as i32;
    let file_dist = if file <= 3 { 3 - file } else { file - 4 };
    let rank_dist = if rank <= 3 { 3 - rank } else { rank - 4 };
    file_dist + rank_dist
}
