//! Iterative-deepening alpha-beta search
//!
//! The searcher deepens one ply at a time, reusing the transposition table
//! and move ordering state between iterations so earlier iterations steer
//! the later, expensive ones. A cancelled iteration still yields a usable
//! move: either the previous completed iteration's choice, or this
//! iteration's best if at least one root move finished.
//!
//! Scores are side-to-move relative centipawns; forced mates live in the
//! band near [`IMMEDIATE_MATE_SCORE`] and encode distance in plies.

pub mod ordering;
pub mod repetition;

use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chess::{ChessMove, Piece, Rank};
use log::debug;

use crate::config::SearchConfig;
use crate::eval::{Evaluate, HeuristicEvaluator};
use crate::position::Position;
use crate::tt::{Bound, TranspositionTable};
use crate::types::{
    is_mate_score, mated_in, plies_to_mate, MoveList, NodeCount, Score, DRAW_SCORE,
    IMMEDIATE_MATE_SCORE, INFINITY,
};

use ordering::MoveOrderer;
use repetition::RepetitionTable;

/// How many nodes pass between checks of the wall clock.
const NODES_PER_CLOCK_CHECK: u32 = 2048;

#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// The position is checkmate or stalemate; there is nothing to search.
    #[error("no legal moves in the searched position")]
    NoLegalMoves,
}

/// Lifecycle of a searcher, observable between calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchState {
    Idle,
    Searching,
    Completed,
    Cancelled,
}

/// External limits on a single search call. All fields are optional; with
/// none set the search runs to the configured depth ceiling.
#[derive(Clone, Default)]
pub struct SearchLimits {
    /// Stop after completing this iteration depth.
    pub depth: Option<i32>,
    /// Wall-clock budget.
    pub movetime: Option<Duration>,
    /// Cooperative stop flag, settable from another thread.
    pub stop: Option<Arc<AtomicBool>>,
}

/// Counters accumulated over one `start_search` call.
#[derive(Debug, Clone, Default)]
pub struct SearchDiagnostics {
    pub depth_completed: i32,
    pub nodes: NodeCount,
    pub q_nodes: NodeCount,
    pub evaluations: NodeCount,
    pub cutoffs: NodeCount,
    pub tt_hits: NodeCount,
    /// The returned move came from an interrupted iteration.
    pub from_partial_search: bool,
    pub mate_found: bool,
}

/// Result of a completed (or cancelled-but-productive) search.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub best_move: ChessMove,
    /// Side-to-move relative score of `best_move`.
    pub score: Score,
    /// Deepest fully completed iteration.
    pub depth: i32,
    /// Principal variation recovered from the transposition table. May be
    /// shorter than `depth` if entries were overwritten.
    pub pv: Vec<ChessMove>,
    pub diagnostics: SearchDiagnostics,
}

pub struct Searcher {
    config: SearchConfig,
    evaluator: Box<dyn Evaluate>,
    tt: TranspositionTable,
    orderer: MoveOrderer,
    repetition: RepetitionTable,
    state: SearchState,

    stop: Option<Arc<AtomicBool>>,
    deadline: Option<Instant>,
    cancelled: bool,
    nodes_since_clock_check: u32,

    diagnostics: SearchDiagnostics,
    best_move: Option<ChessMove>,
    best_eval: Score,
    best_move_this_iteration: Option<ChessMove>,
    best_eval_this_iteration: Score,
}

impl Searcher {
    pub fn new(config: SearchConfig) -> Self {
        let evaluator = Box::new(HeuristicEvaluator::new(config.weights.clone()));
        Self::with_evaluator(config, evaluator)
    }

    /// Build a searcher around a caller-supplied evaluation.
    pub fn with_evaluator(config: SearchConfig, evaluator: Box<dyn Evaluate>) -> Self {
        Searcher {
            tt: TranspositionTable::new(config.tt_size_mb),
            orderer: MoveOrderer::new(config.weights.clone()),
            repetition: RepetitionTable::new(),
            state: SearchState::Idle,
            stop: None,
            deadline: None,
            cancelled: false,
            nodes_since_clock_check: 0,
            diagnostics: SearchDiagnostics::default(),
            best_move: None,
            best_eval: 0,
            best_move_this_iteration: None,
            best_eval_this_iteration: -INFINITY,
            evaluator,
            config,
        }
    }

    pub fn state(&self) -> SearchState {
        self.state
    }

    /// Drop cached state that assumes continuity with the previous game:
    /// the transposition table, killers and history.
    pub fn clear_for_new_position(&mut self) {
        self.tt.clear();
        self.orderer.clear();
        self.best_move = None;
        self.best_eval = 0;
        self.state = SearchState::Idle;
    }

    /// Run an iterative-deepening search and return the best move found.
    ///
    /// The position is mutated during the search but restored before
    /// returning. Errors only when the position has no legal moves.
    pub fn start_search(
        &mut self,
        pos: &mut Position,
        limits: &SearchLimits,
    ) -> Result<SearchOutcome, SearchError> {
        let root_moves = pos.legal_moves();
        if root_moves.is_empty() {
            return Err(SearchError::NoLegalMoves);
        }

        let start = Instant::now();
        self.state = SearchState::Searching;
        self.stop = limits.stop.clone();
        self.deadline = limits.movetime.map(|budget| start + budget);
        let soft_deadline = limits
            .movetime
            .map(|budget| start + budget.mul_f64(self.config.soft_time_fraction));
        self.cancelled = false;
        self.nodes_since_clock_check = 0;
        self.diagnostics = SearchDiagnostics::default();
        self.best_move = None;
        self.best_eval = 0;
        self.orderer.clear_killers();
        self.repetition.init(pos);

        let depth_ceiling = limits
            .depth
            .unwrap_or(self.config.max_depth)
            .clamp(1, self.config.max_depth);

        for depth in 1..=depth_ceiling {
            self.best_move_this_iteration = None;
            self.best_eval_this_iteration = -INFINITY;

            self.search(pos, depth, 0, -INFINITY, INFINITY, 0, false);

            if self.cancelled {
                // Adopt the interrupted iteration's result only if at least
                // one root move was searched to completion.
                if let Some(mv) = self.best_move_this_iteration {
                    self.best_move = Some(mv);
                    self.best_eval = self.best_eval_this_iteration;
                    self.diagnostics.from_partial_search = true;
                }
                break;
            }

            self.best_move = self.best_move_this_iteration;
            self.best_eval = self.best_eval_this_iteration;
            self.diagnostics.depth_completed = depth;
            debug!(
                "depth {} score {} nodes {} qnodes {} best {:?}",
                depth,
                self.best_eval,
                self.diagnostics.nodes,
                self.diagnostics.q_nodes,
                self.best_move,
            );

            // A mate within the horizon cannot be improved by deepening.
            if is_mate_score(self.best_eval) && plies_to_mate(self.best_eval) <= depth {
                self.diagnostics.mate_found = true;
                break;
            }

            // Starting another iteration this late would almost certainly
            // be cut off before it completes.
            if let Some(soft) = soft_deadline {
                if Instant::now() >= soft {
                    break;
                }
            }
        }

        if is_mate_score(self.best_eval) {
            self.diagnostics.mate_found = true;
        }

        // Cancelled before any root move finished at depth one: fall back
        // to the first legal move rather than returning nothing.
        let best_move = self.best_move.unwrap_or(root_moves[0]);
        self.state = if self.cancelled {
            SearchState::Cancelled
        } else {
            SearchState::Completed
        };
        let pv = self.extract_pv(pos, best_move);

        Ok(SearchOutcome {
            best_move,
            score: self.best_eval,
            depth: self.diagnostics.depth_completed,
            pv,
            diagnostics: self.diagnostics.clone(),
        })
    }

    /// Alpha-beta over `ply_remaining` plies. `prev_irreversible` tells
    /// whether the move that produced this node was a capture or pawn move,
    /// which opens a fresh repetition segment.
    #[allow(clippy::too_many_arguments)]
    fn search(
        &mut self,
        pos: &mut Position,
        ply_remaining: i32,
        ply_from_root: i32,
        mut alpha: Score,
        mut beta: Score,
        num_extensions: i32,
        prev_irreversible: bool,
    ) -> Score {
        if self.should_stop() {
            return 0;
        }
        self.diagnostics.nodes += 1;

        if ply_from_root > 0 {
            if pos.is_fifty_move_draw() || self.repetition.contains(pos.hash()) {
                return DRAW_SCORE;
            }
            // Mate distance pruning: no line from here can beat a mate
            // already found closer to the root.
            alpha = alpha.max(mated_in(ply_from_root));
            beta = beta.min(IMMEDIATE_MATE_SCORE - ply_from_root);
            if alpha >= beta {
                return alpha;
            }
        }

        if let Some(tt_value) =
            self.tt
                .lookup(pos.hash(), ply_remaining, ply_from_root, alpha, beta)
        {
            self.diagnostics.tt_hits += 1;
            if ply_from_root == 0 {
                self.best_move_this_iteration = self.tt.try_get_move(pos.hash());
                self.best_eval_this_iteration = tt_value;
            }
            return tt_value;
        }

        if ply_remaining == 0 {
            return self.qsearch(pos, alpha, beta, 0);
        }

        let mut moves = pos.legal_moves();
        if moves.is_empty() {
            return if pos.in_check() {
                mated_in(ply_from_root)
            } else {
                DRAW_SCORE
            };
        }

        let hash_move = if ply_from_root == 0 {
            self.best_move
        } else {
            self.tt.try_get_move(pos.hash())
        };
        let opponent = !pos.side_to_move();
        self.orderer.order(
            hash_move,
            pos,
            &mut moves,
            pos.attack_map(opponent),
            pos.pawn_attack_map(opponent),
            false,
            ply_from_root as usize,
        );

        let pushed = ply_from_root > 0;
        if pushed {
            self.repetition.push(pos.hash(), prev_irreversible);
        }

        let mut bound = Bound::Upper;
        let mut best_move_here: Option<ChessMove> = None;

        for (move_index, &mv) in moves.iter().enumerate() {
            let is_capture = pos.is_capture(mv);
            let irreversible = is_capture || pos.is_pawn_move(mv);
            let undo = pos.apply(mv);

            let mut extension = 0;
            if num_extensions < self.config.max_extensions {
                if pos.in_check() {
                    extension = 1;
                } else if pos.piece_on(mv.get_dest()) == Some(Piece::Pawn) {
                    let rank = mv.get_dest().get_rank();
                    if rank == Rank::Second || rank == Rank::Seventh {
                        extension = 1;
                    }
                }
            }

            // Late move reduction: quiet moves ordered far down the list
            // get a shallower null-window look first, and only a score
            // above alpha earns the full re-search.
            let mut eval = 0;
            let mut needs_full_search = true;
            if extension == 0
                && ply_remaining >= self.config.lmr_min_depth
                && move_index >= self.config.lmr_move_threshold
                && !is_capture
            {
                eval = -self.search(
                    pos,
                    ply_remaining - 2,
                    ply_from_root + 1,
                    -alpha - 1,
                    -alpha,
                    num_extensions,
                    irreversible,
                );
                needs_full_search = eval > alpha;
            }
            if needs_full_search {
                eval = -self.search(
                    pos,
                    ply_remaining - 1 + extension,
                    ply_from_root + 1,
                    -beta,
                    -alpha,
                    num_extensions + extension,
                    irreversible,
                );
            }
            pos.undo(undo);

            if self.cancelled {
                if pushed {
                    self.repetition.try_pop();
                }
                return 0;
            }

            if eval >= beta {
                self.tt
                    .store(pos.hash(), ply_remaining, ply_from_root, beta, Bound::Lower, Some(mv));
                if !is_capture {
                    self.orderer.record_quiet_cutoff(
                        pos.side_to_move(),
                        mv,
                        ply_from_root as usize,
                        ply_remaining,
                    );
                }
                self.diagnostics.cutoffs += 1;
                if pushed {
                    self.repetition.try_pop();
                }
                return beta;
            }

            if eval > alpha {
                alpha = eval;
                bound = Bound::Exact;
                best_move_here = Some(mv);
                if ply_from_root == 0 {
                    self.best_move_this_iteration = Some(mv);
                    self.best_eval_this_iteration = eval;
                }
            }
        }

        self.tt
            .store(pos.hash(), ply_remaining, ply_from_root, alpha, bound, best_move_here);
        if pushed {
            self.repetition.try_pop();
        }
        alpha
    }

    /// Quiescence search: captures only, with the static evaluation as a
    /// stand-pat floor, so the horizon never lands mid-exchange.
    fn qsearch(&mut self, pos: &mut Position, mut alpha: Score, beta: Score, qdepth: usize) -> Score {
        if self.should_stop() {
            return 0;
        }
        self.diagnostics.q_nodes += 1;

        self.diagnostics.evaluations += 1;
        let stand_pat = self.evaluator.evaluate(pos);
        if stand_pat >= beta {
            return beta;
        }
        if stand_pat > alpha {
            alpha = stand_pat;
        }
        if qdepth >= self.config.qsearch_max_ply {
            return alpha;
        }

        let mut moves: MoveList = pos
            .legal_moves()
            .into_iter()
            .filter(|&mv| pos.is_capture(mv))
            .collect();
        let opponent = !pos.side_to_move();
        self.orderer.order(
            None,
            pos,
            &mut moves,
            pos.attack_map(opponent),
            pos.pawn_attack_map(opponent),
            true,
            0,
        );

        for &mv in moves.iter() {
            let undo = pos.apply(mv);
            let eval = -self.qsearch(pos, -beta, -alpha, qdepth + 1);
            pos.undo(undo);

            if self.cancelled {
                return 0;
            }
            if eval >= beta {
                self.diagnostics.cutoffs += 1;
                return beta;
            }
            if eval > alpha {
                alpha = eval;
            }
        }

        alpha
    }

    /// Cooperative cancellation: the stop flag is cheap and checked every
    /// node; the wall clock only every [`NODES_PER_CLOCK_CHECK`] nodes.
    fn should_stop(&mut self) -> bool {
        if self.cancelled {
            return true;
        }
        if let Some(stop) = &self.stop {
            if stop.load(AtomicOrdering::Relaxed) {
                self.cancelled = true;
                return true;
            }
        }
        self.nodes_since_clock_check += 1;
        if self.nodes_since_clock_check >= NODES_PER_CLOCK_CHECK {
            self.nodes_since_clock_check = 0;
            if let Some(deadline) = self.deadline {
                if Instant::now() >= deadline {
                    self.cancelled = true;
                }
            }
        }
        self.cancelled
    }

    /// Walk transposition-table best moves from the root to recover the
    /// principal variation. Every cached move is re-checked for legality,
    /// and the walk is bounded to guard against hash collisions and cycles.
    fn extract_pv(&self, pos: &mut Position, first: ChessMove) -> Vec<ChessMove> {
        let max_len = self.diagnostics.depth_completed.max(1) as usize;
        let mut pv = Vec::with_capacity(max_len);
        let mut undos = Vec::with_capacity(max_len);

        if pos.is_legal(first) {
            pv.push(first);
            undos.push(pos.apply(first));
            while pv.len() < max_len {
                let Some(mv) = self.tt.try_get_move(pos.hash()) else {
                    break;
                };
                if !pos.is_legal(mv) {
                    break;
                }
                pv.push(mv);
                undos.push(pos.apply(mv));
            }
        }
        for undo in undos.into_iter().rev() {
            pos.undo(undo);
        }
        pv
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MAX_MATE_PLY;

    fn search_fen(fen: &str, depth: i32) -> SearchOutcome {
        let mut pos = Position::from_fen(fen).unwrap();
        let mut searcher = Searcher::new(SearchConfig::default());
        let limits = SearchLimits {
            depth: Some(depth),
            ..Default::default()
        };
        searcher.start_search(&mut pos, &limits).unwrap()
    }

    #[test]
    fn depth_one_returns_a_legal_move() {
        let mut pos = Position::startpos();
        let mut searcher = Searcher::new(SearchConfig::default());
        let limits = SearchLimits {
            depth: Some(1),
            ..Default::default()
        };
        let outcome = searcher.start_search(&mut pos, &limits).unwrap();
        assert!(pos.is_legal(outcome.best_move));
        assert_eq!(outcome.depth, 1);
        assert_eq!(searcher.state(), SearchState::Completed);
    }

    #[test]
    fn checkmate_yields_no_legal_moves_error() {
        // Fool's mate final position, white to move and mated.
        let mut pos =
            Position::from_fen("rnb1kbnr/pppp1ppp/8/4p3/6Pq/5P2/PPPPP2P/RNBQKBNR w KQkq - 1 3")
                .unwrap();
        let mut searcher = Searcher::new(SearchConfig::default());
        let limits = SearchLimits::default();
        assert!(matches!(
            searcher.start_search(&mut pos, &limits),
            Err(SearchError::NoLegalMoves)
        ));
    }

    #[test]
    fn search_restores_the_position() {
        let mut pos = Position::startpos();
        let before = pos.hash();
        let mut searcher = Searcher::new(SearchConfig::default());
        let limits = SearchLimits {
            depth: Some(3),
            ..Default::default()
        };
        searcher.start_search(&mut pos, &limits).unwrap();
        assert_eq!(pos.hash(), before);
        assert!(pos.repetition_history().is_empty());
    }

    #[test]
    fn finds_mate_in_one() {
        // 1.f3 e5 2.g4 and black mates with Qh4.
        let outcome = search_fen(
            "rnbqkbnr/pppp1ppp/8/4p3/6P1/5P2/PPPPP2P/RNBQKBNR b KQkq g3 0 2",
            4,
        );
        assert_eq!(outcome.best_move.to_string(), "d8h4");
        assert!(outcome.score >= IMMEDIATE_MATE_SCORE - MAX_MATE_PLY);
        assert!(outcome.diagnostics.mate_found);
    }

    #[test]
    fn quiescence_matches_static_eval_without_captures() {
        // No capture exists in the start position, so the stand-pat score
        // is the quiescence result.
        let mut pos = Position::startpos();
        let config = SearchConfig::default();
        let static_eval = HeuristicEvaluator::new(config.weights.clone()).evaluate(&pos);
        let mut searcher = Searcher::new(config);
        let q = searcher.qsearch(&mut pos, -INFINITY, INFINITY, 0);
        assert_eq!(q, static_eval);
    }

    #[test]
    fn pre_set_stop_flag_still_yields_a_legal_move() {
        let mut pos = Position::startpos();
        let mut searcher = Searcher::new(SearchConfig::default());
        let stop = Arc::new(AtomicBool::new(true));
        let limits = SearchLimits {
            stop: Some(Arc::clone(&stop)),
            ..Default::default()
        };
        let outcome = searcher.start_search(&mut pos, &limits).unwrap();
        assert!(pos.is_legal(outcome.best_move));
        assert_eq!(outcome.depth, 0);
        assert_eq!(searcher.state(), SearchState::Cancelled);
    }
}
