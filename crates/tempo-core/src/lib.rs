//! tempo-core: a chess move-search engine.
//!
//! The crate is organized around one driver and four collaborators:
//!
//! - [`search::Searcher`] runs iterative-deepening alpha-beta with
//!   quiescence, extensions and late move reduction
//! - [`eval::HeuristicEvaluator`] scores quiet positions (material,
//!   piece-square tables, pawn structure, king safety, mop-up)
//! - [`search::ordering::MoveOrderer`] ranks moves and owns the killer and
//!   history tables
//! - [`tt::TranspositionTable`] caches bounded scores and best moves by
//!   Zobrist hash
//! - [`search::repetition::RepetitionTable`] detects draws by repetition
//!   across the game history and the search stack
//!
//! [`position::Position`] wraps the `chess` crate's board with the
//! apply/undo, clock and history bookkeeping the search needs.
//!
//! ```no_run
//! use tempo_core::{Position, SearchConfig, Searcher, SearchLimits};
//!
//! let mut pos = Position::startpos();
//! let mut searcher = Searcher::new(SearchConfig::default());
//! let limits = SearchLimits { depth: Some(6), ..Default::default() };
//! let outcome = searcher.start_search(&mut pos, &limits)?;
//! println!("best move: {}", outcome.best_move);
//! # Ok::<(), tempo_core::SearchError>(())
//! ```

pub mod config;
pub mod eval;
pub mod position;
pub mod search;
pub mod tt;
pub mod types;

pub use config::{EvalWeights, SearchConfig};
pub use eval::{Evaluate, HeuristicEvaluator};
pub use position::{Position, PositionError, Undo};
pub use search::{
    SearchDiagnostics, SearchError, SearchLimits, SearchOutcome, SearchState, Searcher,
};
pub use tt::{Bound, TranspositionTable};
pub use types::{Hash, MoveList, NodeCount, Score};
