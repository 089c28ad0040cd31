//! End-to-end search tests over full positions.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tempo_core::types::{plies_to_mate, IMMEDIATE_MATE_SCORE, MAX_MATE_PLY};
use tempo_core::{Position, SearchConfig, SearchError, SearchLimits, SearchOutcome, Searcher};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

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
fn best_moves_are_legal_at_every_depth() {
    init_logging();
    let fens = [
        // Start position.
        "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
        // Open middlegame (Italian game).
        "r1bqk1nr/pppp1ppp/2n5/2b1p3/2B1P3/5N2/PPPP1PPP/RNBQK2R w KQkq - 4 4",
        // Rook endgame.
        "8/5pk1/8/8/8/8/1R3PK1/3r4 w - - 0 1",
    ];
    for fen in fens {
        for depth in 1..=3 {
            let pos = Position::from_fen(fen).unwrap();
            let outcome = search_fen(fen, depth);
            assert!(
                pos.is_legal(outcome.best_move),
                "illegal move {} from {} at depth {}",
                outcome.best_move,
                fen,
                depth,
            );
            assert_eq!(outcome.depth, depth);
            assert!(!outcome.pv.is_empty());
            assert_eq!(outcome.pv[0], outcome.best_move);
        }
    }
}

#[test]
fn captures_a_hanging_queen() {
    init_logging();
    // Black queen wandered to g5 with a white knight on f3.
    let outcome = search_fen("rnb1kbnr/pppp1ppp/8/4p1q1/8/5N2/PPPPPPPP/RNBQKB1R w KQkq - 0 1", 3);
    assert_eq!(outcome.best_move.to_string(), "f3g5");
    assert!(outcome.score > 500, "score {} too low for a won queen", outcome.score);
}

#[test]
fn finds_back_rank_mate_in_one() {
    init_logging();
    let outcome = search_fen("6k1/5ppp/8/8/8/8/5PPP/R5K1 w - - 0 1", 3);
    assert_eq!(outcome.best_move.to_string(), "a1a8");
    assert_eq!(outcome.score, IMMEDIATE_MATE_SCORE - 1);
    assert!(outcome.diagnostics.mate_found);
}

#[test]
fn finds_forced_mate_in_two() {
    init_logging();
    // Two-rook ladder: 1.Rb7+ drives the king to the back rank, 2.Ra8#.
    let outcome = search_fen("8/7k/R7/8/8/8/8/1R4K1 w - - 0 1", 4);
    assert_eq!(outcome.best_move.to_string(), "b1b7");
    assert!(outcome.score >= IMMEDIATE_MATE_SCORE - MAX_MATE_PLY);
    assert_eq!(plies_to_mate(outcome.score), 3);
}

#[test]
fn defender_facing_forced_mate_scores_in_negative_band() {
    init_logging();
    // The two-rook ladder with the bare king to move: g6 and h6 are covered,
    // so every retreat stays on the seventh or eighth rank and runs into
    // Rb7 followed by Ra8#.
    let outcome = search_fen("8/7k/R7/8/8/8/8/1R4K1 b - - 0 1", 6);
    assert!(outcome.score <= -(IMMEDIATE_MATE_SCORE - MAX_MATE_PLY));
    assert_eq!(plies_to_mate(outcome.score), 4);
    assert!(outcome.diagnostics.mate_found);
}

#[test]
fn mated_position_is_an_error() {
    init_logging();
    // Fool's mate.
    let mut pos =
        Position::from_fen("rnb1kbnr/pppp1ppp/8/4p3/6Pq/5P2/PPPPP2P/RNBQKBNR w KQkq - 1 3")
            .unwrap();
    let mut searcher = Searcher::new(SearchConfig::default());
    assert!(matches!(
        searcher.start_search(&mut pos, &SearchLimits::default()),
        Err(SearchError::NoLegalMoves)
    ));
}

#[test]
fn stalemate_is_an_error() {
    init_logging();
    // Black king on a8 stalemated by queen and king.
    let mut pos = Position::from_fen("k7/8/1Q6/8/8/8/8/4K3 b - - 0 1").unwrap();
    let mut searcher = Searcher::new(SearchConfig::default());
    assert!(matches!(
        searcher.start_search(&mut pos, &SearchLimits::default()),
        Err(SearchError::NoLegalMoves)
    ));
}

#[test]
fn timed_search_returns_within_budget() {
    init_logging();
    let mut pos = Position::startpos();
    let mut searcher = Searcher::new(SearchConfig::default());
    let limits = SearchLimits {
        movetime: Some(Duration::from_millis(100)),
        ..Default::default()
    };
    let started = std::time::Instant::now();
    let outcome = searcher.start_search(&mut pos, &limits).unwrap();
    // Generous slack over the budget for slow CI machines.
    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(pos.is_legal(outcome.best_move));
    assert!(outcome.depth >= 1);
}

#[test]
fn stop_flag_cancels_a_running_search() {
    init_logging();
    let stop = Arc::new(AtomicBool::new(false));
    let setter = {
        let stop = Arc::clone(&stop);
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(50));
            stop.store(true, Ordering::Relaxed);
        })
    };

    let mut pos = Position::startpos();
    let mut searcher = Searcher::new(SearchConfig::default());
    let limits = SearchLimits {
        stop: Some(Arc::clone(&stop)),
        ..Default::default()
    };
    let outcome = searcher.start_search(&mut pos, &limits).unwrap();
    setter.join().unwrap();

    assert!(pos.is_legal(outcome.best_move));
    assert_eq!(searcher.state(), tempo_core::SearchState::Cancelled);
}

#[test]
fn same_position_searches_identically() {
    init_logging();
    let fen = "r1bqk1nr/pppp1ppp/2n5/2b1p3/2B1P3/5N2/PPPP1PPP/RNBQK2R w KQkq - 4 4";
    let first = search_fen(fen, 4);
    let second = search_fen(fen, 4);
    assert_eq!(first.best_move, second.best_move);
    assert_eq!(first.score, second.score);
    assert_eq!(first.diagnostics.nodes, second.diagnostics.nodes);
}

#[test]
fn search_leaves_the_position_untouched() {
    init_logging();
    let fen = "r1bqk1nr/pppp1ppp/2n5/2b1p3/2B1P3/5N2/PPPP1PPP/RNBQK2R w KQkq - 4 4";
    let mut pos = Position::from_fen(fen).unwrap();
    let hash_before = pos.hash();
    let clock_before = pos.halfmove_clock();

    let mut searcher = Searcher::new(SearchConfig::default());
    let limits = SearchLimits {
        depth: Some(4),
        ..Default::default()
    };
    searcher.start_search(&mut pos, &limits).unwrap();

    assert_eq!(pos.hash(), hash_before);
    assert_eq!(pos.halfmove_clock(), clock_before);
}

#[test]
fn clearing_state_does_not_break_the_next_search() {
    init_logging();
    let mut searcher = Searcher::new(SearchConfig::default());
    let limits = SearchLimits {
        depth: Some(3),
        ..Default::default()
    };

    let mut first = Position::startpos();
    searcher.start_search(&mut first, &limits).unwrap();

    searcher.clear_for_new_position();

    let mut second =
        Position::from_fen("rnb1kbnr/pppp1ppp/8/4p1q1/8/5N2/PPPPPPPP/RNBQKB1R w KQkq - 0 1")
            .unwrap();
    let outcome = searcher.start_search(&mut second, &limits).unwrap();
    assert_eq!(outcome.best_move.to_string(), "f3g5");
}
