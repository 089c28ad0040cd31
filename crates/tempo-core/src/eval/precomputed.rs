//! Precomputed evaluation geometry
//!
//! Bit masks and square lists derived once at construction: passed-pawn
//! blocking masks and king pawn-shield squares. Kept on the evaluator
//! instead of in process-wide statics so independently configured engines
//! can coexist.

use chess::{get_adjacent_files, get_file, BitBoard, Color, File, Rank, Square, EMPTY};

/// Up to six shield squares in front of a king: three one rank ahead,
/// three two ranks ahead.
pub type ShieldSquares = Vec<Square>;

pub struct PrecomputedEvalData {
    /// `[color][square]` -> squares an enemy pawn must not occupy for a
    /// pawn on `square` to count as passed (own file + adjacent files,
    /// strictly ahead).
    passed_pawn_masks: [[BitBoard; 64]; 2],
    /// `[color][king square]` -> pawn-shield squares.
    pawn_shield_squares: [[ShieldSquares; 64]; 2],
}

impl PrecomputedEvalData {
    pub fn new() -> Self {
        let passed_pawn_masks = [
            std::array::from_fn(|sq| passed_mask(sq, Color::White)),
            std::array::from_fn(|sq| passed_mask(sq, Color::Black)),
        ];
        let pawn_shield_squares = [
            std::array::from_fn(|sq| shield_squares(sq, Color::White)),
            std::array::from_fn(|sq| shield_squares(sq, Color::Black)),
        ];
        PrecomputedEvalData {
            passed_pawn_masks,
            pawn_shield_squares,
        }
    }

    #[inline]
    pub fn passed_pawn_mask(&self, color: Color, square: Square) -> BitBoard {
        self.passed_pawn_masks[color.to_index()][square.to_index()]
    }

    #[inline]
    pub fn pawn_shield(&self, color: Color, king_square: Square) -> &[Square] {
        &self.pawn_shield_squares[color.to_index()][king_square.to_index()]
    }
}

impl Default for PrecomputedEvalData {
    fn default() -> Self {
        Self::new()
    }
}

/// Squares strictly ahead of `sq` (from `color`'s view) on its own and
/// adjacent files.
fn passed_mask(sq: usize, color: Color) -> BitBoard {
    let rank = sq / 8;
    let file = File::from_index(sq % 8);
    let files = get_file(file) | get_adjacent_files(file);

    let mut ahead = EMPTY;
    let ranks_ahead: Box<dyn Iterator<Item = usize>> = match color {
        Color::White => Box::new(rank + 1..8),
        Color::Black => Box::new(0..rank),
    };
    for r in ranks_ahead {
        ahead |= chess::get_rank(Rank::from_index(r));
    }
    files & ahead
}

fn shield_squares(sq: usize, color: Color) -> ShieldSquares {
    let rank = (sq / 8) as i32;
    let file = (sq % 8) as i32;
    let forward: i32 = match color {
        Color::White => 1,
        Color::Black => -1,
    };

    let mut squares = Vec::with_capacity(6);
    for rank_step in [1, 2] {
        for file_offset in [-1, 0, 1] {
            let f = file + file_offset;
            let r = rank + forward * rank_step;
            if (0..8).contains(&f) && (0..8).contains(&r) {
                squares.push(Square::make_square(
                    Rank::from_index(r as usize),
                    File::from_index(f as usize),
                ));
            }
        }
    }
    squares
}
