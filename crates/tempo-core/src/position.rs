//! Position wrapper around the `chess` crate board
//!
//! The board crate supplies legal move generation, check detection and the
//! Zobrist hash. This wrapper adds what the search core needs on top:
//! an apply/undo pair that returns an inverse record, the halfmove clock for
//! the fifty-move rule, the hash history that seeds repetition detection,
//! and bitboard attack maps for move ordering.

use chess::{
    get_bishop_moves, get_king_moves, get_knight_moves, get_pawn_attacks, get_rook_moves,
    BitBoard, Board, ChessMove, Color, MoveGen, Piece, Square, EMPTY,
};
use std::str::FromStr;

use crate::types::{Hash, MoveList};

/// Errors raised while constructing a position. Nothing inside the search
/// itself produces errors; malformed input is rejected here, at the edge.
#[derive(Debug, thiserror::Error)]
pub enum PositionError {
    // `chess::Error` implements `Display` but not `std::error::Error`,
    // so it is carried as a plain payload rather than a source.
    #[error("invalid FEN: {0}")]
    InvalidFen(chess::Error),
    #[error("invalid halfmove clock field in FEN: {0:?}")]
    InvalidClock(String),
}

/// Inverse record returned by [`Position::apply`]. Feeding it back into
/// [`Position::undo`] restores the position bit-identically.
///
/// The board type is `Copy` and small, so the record simply keeps the prior
/// board alongside the prior clock.
#[derive(Clone, Copy)]
pub struct Undo {
    board: Board,
    halfmove_clock: u32,
}

/// A chess position plus the bookkeeping the search core needs.
#[derive(Clone, Debug)]
pub struct Position {
    board: Board,
    halfmove_clock: u32,
    /// Hashes of every position before the current one, oldest first.
    /// Pushed on apply, popped on undo, so during search it tracks the
    /// recursion stack exactly.
    history: Vec<Hash>,
}

impl Position {
    /// Standard starting position.
    pub fn startpos() -> Self {
        Position {
            board: Board::default(),
            halfmove_clock: 0,
            history: Vec::new(),
        }
    }

    /// Parse a FEN string. The halfmove clock field is honored; the board
    /// crate itself ignores it.
    pub fn from_fen(fen: &str) -> Result<Self, PositionError> {
        let board = Board::from_str(fen).map_err(PositionError::InvalidFen)?;
        let halfmove_clock = match fen.split_whitespace().nth(4) {
            Some(field) => field
                .parse::<u32>()
                .map_err(|_| PositionError::InvalidClock(field.to_string()))?,
            None => 0,
        };
        Ok(Position {
            board,
            halfmove_clock,
            history: Vec::new(),
        })
    }

    /// Apply a legal move, returning the inverse record.
    ///
    /// The caller owns the responsibility to undo exactly what it applied;
    /// each recursive search frame applies at most one move.
    pub fn apply(&mut self, mv: ChessMove) -> Undo {
        let undo = Undo {
            board: self.board,
            halfmove_clock: self.halfmove_clock,
        };
        let irreversible = self.is_capture(mv) || self.is_pawn_move(mv);
        self.history.push(self.board.get_hash());
        self.board = self.board.make_move_new(mv);
        self.halfmove_clock = if irreversible { 0 } else { self.halfmove_clock + 1 };
        undo
    }

    /// Revert the most recent [`apply`](Position::apply).
    pub fn undo(&mut self, undo: Undo) {
        self.board = undo.board;
        self.halfmove_clock = undo.halfmove_clock;
        self.history.pop();
    }

    /// All legal moves in the current position.
    pub fn legal_moves(&self) -> MoveList {
        MoveGen::new_legal(&self.board).collect()
    }

    /// Whether the side to move is in check.
    #[inline]
    pub fn in_check(&self) -> bool {
        self.board.checkers().popcnt() != 0
    }

    /// Fifty-move rule: one hundred halfmoves without a capture or pawn move.
    #[inline]
    pub fn is_fifty_move_draw(&self) -> bool {
        self.halfmove_clock >= 100
    }

    #[inline]
    pub fn halfmove_clock(&self) -> u32 {
        self.halfmove_clock
    }

    /// Zobrist hash of the current position.
    #[inline]
    pub fn hash(&self) -> Hash {
        self.board.get_hash()
    }

    /// Hashes of all prior positions, oldest first.
    pub fn repetition_history(&self) -> &[Hash] {
        &self.history
    }

    #[inline]
    pub fn side_to_move(&self) -> Color {
        self.board.side_to_move()
    }

    #[inline]
    pub fn piece_on(&self, square: Square) -> Option<Piece> {
        self.board.piece_on(square)
    }

    #[inline]
    pub fn color_on(&self, square: Square) -> Option<Color> {
        self.board.color_on(square)
    }

    #[inline]
    pub fn king_square(&self, color: Color) -> Square {
        self.board.king_square(color)
    }

    #[inline]
    pub fn pieces(&self, piece: Piece, color: Color) -> BitBoard {
        self.board.pieces(piece) & self.board.color_combined(color)
    }

    /// Whether `mv` captures. Covers en passant, where the destination
    /// square is empty but the file changes on a pawn move.
    pub fn is_capture(&self, mv: ChessMove) -> bool {
        if self.board.piece_on(mv.get_dest()).is_some() {
            return true;
        }
        self.board.piece_on(mv.get_source()) == Some(Piece::Pawn)
            && mv.get_source().get_file() != mv.get_dest().get_file()
    }

    #[inline]
    pub fn is_pawn_move(&self, mv: ChessMove) -> bool {
        self.board.piece_on(mv.get_source()) == Some(Piece::Pawn)
    }

    /// Whether `mv` is legal here. Used to sanity-check cached moves before
    /// they leave the core (e.g. when walking the principal variation).
    #[inline]
    pub fn is_legal(&self, mv: ChessMove) -> bool {
        self.board.legal(mv)
    }

    /// Every square attacked by `color`'s pieces.
    pub fn attack_map(&self, color: Color) -> BitBoard {
        let occupied = *self.board.combined();
        let mut attacks = EMPTY;
        for square in *self.board.color_combined(color) {
            attacks |= match self.board.piece_on(square) {
                Some(Piece::Pawn) => get_pawn_attacks(square, color, !EMPTY),
                Some(Piece::Knight) => get_knight_moves(square),
                Some(Piece::Bishop) => get_bishop_moves(square, occupied),
                Some(Piece::Rook) => get_rook_moves(square, occupied),
                Some(Piece::Queen) => {
                    get_bishop_moves(square, occupied) | get_rook_moves(square, occupied)
                }
                Some(Piece::King) => get_king_moves(square),
                None => EMPTY,
            };
        }
        attacks
    }

    /// Squares attacked by `color`'s pawns only.
    pub fn pawn_attack_map(&self, color: Color) -> BitBoard {
        let mut attacks = EMPTY;
        for square in self.pieces(Piece::Pawn, color) {
            attacks |= get_pawn_attacks(square, color, !EMPTY);
        }
        attacks
    }

    /// Direct board access for evaluation bitboard scans.
    #[inline]
    pub fn board(&self) -> &Board {
        &self.board
    }
}
