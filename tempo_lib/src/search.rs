use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Instant;

use crate::{
    board::{MoveInfo, Position},
    evaluate::Evaluator,
    game_outcome::{is_draw, is_irreversible, HashHistory},
    hash_tables::{EntryHandle, NodeType::*, TranspositionTable},
    history_tables::HistoryTable,
    moves::*,
    options::SearchOptions,
    types::{All, Captures, Piece},
};

pub const MATE: i32 = 30_000;
pub const INF: i32 = 31_000;
/// Returned by nodes that were stopped before learning anything. Callers
/// check the stop flag and never use it as a score.
const ABORTED: i32 = INF + 1;
pub const MAX_PLY: usize = 128;

const MVV_LVA: [[i32; 6]; 6] = [
    // pawn captured
    [15, 14, 13, 12, 11, 10],
    // knight captured
    [25, 24, 23, 22, 21, 20],
    // bishop captured
    [35, 34, 33, 32, 31, 30],
    // rook captured
    [45, 44, 43, 42, 41, 40],
    // queen captured
    [55, 54, 53, 52, 51, 50],
    // king captured (never happens)
    [0, 0, 0, 0, 0, 0],
];

#[inline(always)]
pub fn is_mate_score(eval: i32) -> bool {
    eval.abs() >= MATE - MAX_PLY as i32
}

/// Mate scores are stored relative to the node, not the root.
fn score_to_tt(eval: i32, ply: usize) -> i16 {
    let eval = if eval >= MATE - MAX_PLY as i32 {
        eval + ply as i32
    } else if eval <= -(MATE - MAX_PLY as i32) {
        eval - ply as i32
    } else {
        eval
    };
    eval.clamp(-MATE, MATE) as i16
}

fn score_from_tt(eval: i16, ply: usize) -> i32 {
    let eval = eval as i32;
    if eval >= MATE - MAX_PLY as i32 {
        eval - ply as i32
    } else if eval <= -(MATE - MAX_PLY as i32) {
        eval + ply as i32
    } else {
        eval
    }
}

/// UCI `score` field.
pub fn format_score(eval: i32) -> String {
    if is_mate_score(eval) {
        let moves = (MATE - eval.abs() + 1) / 2;
        format!("mate {}", moves * eval.signum())
    } else {
        format!("cp {eval}")
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SearchResult {
    pub best_move: Move,
    pub ponder_move: Option<Move>,
    pub eval: i32,
    pub depth: u8,
    pub nodes: u64,
}

/// What the late move reduction guards need to know about one move.
#[derive(Clone, Copy, Debug)]
struct ReductionCandidate {
    /// Position of the move in the ordered list.
    mv_pos: usize,
    /// Depth the child would be searched at without reduction.
    depth: i8,
    quiet: bool,
    in_check: bool,
    gives_check: bool,
    killer: bool,
    /// The node itself is already on a reduced line.
    reduced: bool,
}

impl ReductionCandidate {
    fn should_reduce(&self, options: &SearchOptions) -> bool {
        !self.reduced
            && self.quiet
            && !self.in_check
            && !self.gives_check
            && !self.killer
            && self.depth >= options.lmr_depth
            && self.mv_pos >= options.lmr_protected_moves
    }
}

#[derive(Clone)]
struct SearchStackEntry {
    move_list: MoveList,
    killer_moves: KillerMoves<NUM_KILLER_MOVES>,
    quiets_tried: Vec<Move>,
}

impl Default for SearchStackEntry {
    fn default() -> Self {
        Self {
            move_list: MoveList::default(),
            killer_moves: KillerMoves::default(),
            quiets_tried: Vec::with_capacity(MAX_MOVES),
        }
    }
}

/// Iterative deepening searcher. Owns everything it mutates, so a driver can
/// move it onto a worker thread and take it back afterwards.
pub struct Search<E: Evaluator> {
    position: Position,
    history: HashHistory,
    transposition_table: TranspositionTable,
    history_table: HistoryTable,
    evaluator: E,
    options: SearchOptions,
    search_stack: Box<[SearchStackEntry]>,
    stop: Arc<AtomicBool>,
    max_depth: u8,
    output: bool,
    nodes: u64,
    seldepth: usize,
}

impl<E: Evaluator> Search<E> {
    pub fn new(position: Position, evaluator: E, options: SearchOptions) -> Self {
        let history = HashHistory::new(position.hash());
        Self {
            position,
            history,
            transposition_table: TranspositionTable::new(options.tt_size_mb),
            history_table: HistoryTable::default(),
            evaluator,
            options,
            search_stack: vec![SearchStackEntry::default(); MAX_PLY].into_boxed_slice(),
            stop: Arc::new(AtomicBool::new(false)),
            max_depth: options.max_depth,
            output: false,
            nodes: 0,
            seldepth: 0,
        }
    }

    pub fn max_depth(mut self, depth: u8) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn output(mut self, output: bool) -> Self {
        self.output = output;
        self
    }

    pub fn stop_flag(mut self, stop: Arc<AtomicBool>) -> Self {
        self.stop = stop;
        self
    }

    /// Replaces the root. `history` must end with the hash of `position`.
    pub fn set_position(&mut self, position: Position, history: HashHistory) {
        debug_assert_eq!(history.last(), Some(position.hash()));
        self.position = position;
        self.history = history;
    }

    pub fn position(&self) -> &Position {
        &self.position
    }

    pub fn history(&self) -> &HashHistory {
        &self.history
    }

    pub fn options(&self) -> &SearchOptions {
        &self.options
    }

    pub fn set_options(&mut self, options: SearchOptions) {
        if options.tt_size_mb != self.options.tt_size_mb {
            self.transposition_table.resize(options.tt_size_mb);
        }
        self.options = options;
        self.max_depth = options.max_depth;
    }

    pub fn transposition_table(&self) -> &TranspositionTable {
        &self.transposition_table
    }

    pub fn resize_tt(&mut self, size_mb: usize) {
        self.options.tt_size_mb = size_mb;
        self.transposition_table.resize(size_mb);
    }

    /// Forgets everything learnt from earlier games.
    pub fn clear(&mut self) {
        self.transposition_table.clear();
        self.history_table.clear();
    }

    pub fn nodes(&self) -> u64 {
        self.nodes
    }

    #[inline(always)]
    fn stopped(&self) -> bool {
        self.stop.load(Ordering::Relaxed)
    }

    pub fn run(&mut self) -> SearchResult {
        let start = Instant::now();
        self.nodes = 0;
        self.transposition_table.set_root(self.position.num_pieces());
        self.evaluator.set_position(&self.position);
        for entry in self.search_stack.iter_mut() {
            entry.killer_moves = KillerMoves::default();
        }

        let legal = self.position.legal_moves();
        if legal.is_empty() {
            return SearchResult::default();
        }
        // answer with something even if stopped straight away
        let mut result = SearchResult {
            best_move: legal[0],
            ..SearchResult::default()
        };

        if self.avoid_repetition_hallucination() {
            log::debug!("principal variation repeats the position, dropped it from the table");
        }

        let max_depth = self.max_depth.clamp(1, MAX_PLY as u8 - 1);
        for depth in 1..=max_depth {
            self.seldepth = 0;
            let Some((best_move, eval)) = self.search_root(depth as i8) else {
                break;
            };
            let stopped = self.stopped();
            let pv = self.principal_variation(best_move);
            result = SearchResult {
                best_move,
                ponder_move: pv.iter().nth(1).copied(),
                eval,
                depth: if stopped { depth - 1 } else { depth },
                nodes: self.nodes,
            };

            let elapsed = start.elapsed();
            if self.output {
                let nps = (self.nodes as f64 / elapsed.as_secs_f64().max(1e-3)) as u64;
                println!(
                    "info depth {depth} seldepth {} score {} nodes {} nps {nps} hashfull {} time {} pv {pv}",
                    self.seldepth,
                    format_score(eval),
                    self.nodes,
                    self.transposition_table.hashfull(),
                    elapsed.as_millis(),
                );
            }
            log::debug!("depth {depth} eval {eval} pv {pv} nodes {}", self.nodes);

            if stopped || is_mate_score(eval) {
                break;
            }
        }

        result.nodes = self.nodes;
        log::info!(
            "search finished: bestmove {} eval {} depth {} nodes {} in {}ms",
            result.best_move,
            result.eval,
            result.depth,
            result.nodes,
            start.elapsed().as_millis()
        );
        result
    }

    #[inline(always)]
    fn make(&mut self, mv: Move) -> (MoveInfo, usize) {
        let color = self.position.side_to_move();
        let info = self.position.make_move(mv);
        self.evaluator.apply_move(color, mv, info.captured);
        let previous_start = self
            .history
            .push(self.position.hash(), is_irreversible(mv, &info));
        (info, previous_start)
    }

    #[inline(always)]
    fn unmake(&mut self, mv: Move, info: &MoveInfo, previous_start: usize) {
        self.history.pop(previous_start);
        self.position.unmake_move(mv, info);
        self.evaluator
            .revert_move(self.position.side_to_move(), mv, info.captured);
    }

    fn search_root(&mut self, depth: i8) -> Option<(Move, i32)> {
        self.nodes += 1;
        let hash = self.position.hash();
        let num_pieces = self.position.num_pieces();
        self.position
            .generate_moves::<All>(&mut self.search_stack[0].move_list);

        let probe =
            self.transposition_table
                .probe(hash, num_pieces, &self.search_stack[0].move_list);
        let mut tt_move = Move::null();
        if let Some((_, entry)) = probe {
            if entry.depth as i8 >= depth && entry.node_type == Exact {
                return Some((entry.best_move, score_from_tt(entry.eval, 0)));
            }
            tt_move = entry.best_move;
        }
        self.score_moves(0, tt_move);

        let mut alpha = -INF;
        let beta = INF;
        let mut best_move = Move::null();
        for i in 0..self.search_stack[0].move_list.len() {
            if self.stopped() {
                break;
            }
            let (mv, _) = self.search_stack[0].move_list.pick_move(i);
            let (info, previous_start) = self.make(mv);
            let eval = -self.search(depth - 1, -beta, -alpha, 1, false, false);
            self.unmake(mv, &info, previous_start);
            if self.stopped() {
                break;
            }
            if eval > alpha {
                alpha = eval;
                best_move = mv;
            }
        }

        if best_move.is_null() {
            return None;
        }
        let node_type = if self.stopped() { LowerBound } else { Exact };
        self.transposition_table.store(
            hash,
            best_move,
            depth as u8,
            node_type,
            score_to_tt(alpha, 0),
            num_pieces,
            probe.map(|(handle, _)| handle),
        );
        Some((best_move, alpha))
    }

    fn search(
        &mut self,
        depth: i8,
        mut alpha: i32,
        mut beta: i32,
        ply: usize,
        reduced: bool,
        used_null_move: bool,
    ) -> i32 {
        if self.stopped() {
            return ABORTED;
        }
        if is_draw(&self.position, &self.history) {
            return 0;
        }
        if depth <= 0 || ply >= MAX_PLY {
            return self.quiescence(alpha, beta, ply);
        }
        self.nodes += 1;
        self.seldepth = self.seldepth.max(ply);

        self.position
            .generate_moves::<All>(&mut self.search_stack[ply].move_list);
        let in_check = self.position.in_check();
        if self.search_stack[ply].move_list.is_empty() {
            return if in_check { -MATE + ply as i32 } else { 0 };
        }

        let hash = self.position.hash();
        let num_pieces = self.position.num_pieces();
        let mut best_move = Move::null();
        let mut tt_move = Move::null();
        let probe =
            self.transposition_table
                .probe(hash, num_pieces, &self.search_stack[ply].move_list);
        if let Some((_, entry)) = probe {
            tt_move = entry.best_move;
            if entry.depth as i8 >= depth {
                let eval = score_from_tt(entry.eval, ply);
                match entry.node_type {
                    Exact => return eval,
                    UpperBound => {
                        if alpha >= eval {
                            return eval;
                        }
                        beta = beta.min(eval);
                    }
                    LowerBound => {
                        if eval >= beta {
                            return eval;
                        }
                        if eval > alpha {
                            alpha = eval;
                            best_move = entry.best_move;
                        }
                    }
                    Invalid => {}
                }
            }
        }
        let handle: Option<EntryHandle> = probe.map(|(handle, _)| handle);

        if self.null_move_allowed(depth, in_check, used_null_move) {
            let info = self.position.make_null_move();
            self.evaluator.flip_side_to_move();
            let previous_start = self.history.push(self.position.hash(), true);
            let eval = -self.search(
                depth - self.options.nmp_reduction,
                -beta,
                -beta + 1,
                ply + 1,
                reduced,
                true,
            );
            self.history.pop(previous_start);
            self.position.unmake_null_move(&info);
            self.evaluator.flip_side_to_move();

            if self.stopped() {
                return ABORTED;
            }
            if eval >= beta {
                return eval;
            }
        }

        self.score_moves(ply, tt_move);
        self.search_stack[ply].quiets_tried.clear();
        let color = self.position.side_to_move();
        let alpha_orig = alpha;
        let mut best_eval = -INF;
        let mut pv_search = true;

        for mv_pos in 0..self.search_stack[ply].move_list.len() {
            if self.stopped() {
                break;
            }
            let (mv, _) = self.search_stack[ply].move_list.pick_move(mv_pos);
            let quiet = !self.position.is_capture(mv) && !mv.is_promotion();
            let (info, previous_start) = self.make(mv);

            let eval = if pv_search {
                -self.search(depth - 1, -beta, -alpha, ply + 1, reduced, false)
            } else {
                let reduce = ReductionCandidate {
                    mv_pos,
                    depth: depth - 1,
                    quiet,
                    in_check,
                    gives_check: self.position.in_check(),
                    killer: self.search_stack[ply].killer_moves.contains(&mv),
                    reduced,
                }
                .should_reduce(&self.options);
                let d = if reduce {
                    self.reduced_depth(depth - 1, mv_pos)
                } else {
                    depth - 1
                };

                let mut eval = -self.search(d, -alpha - 1, -alpha, ply + 1, reduce, false);
                if reduce && eval > alpha {
                    eval = -self.search(depth - 1, -alpha - 1, -alpha, ply + 1, reduced, false);
                }
                if eval > alpha && eval < beta {
                    eval = -self.search(depth - 1, -beta, -alpha, ply + 1, reduced, false);
                }
                eval
            };
            self.unmake(mv, &info, previous_start);

            // the last child was cut short, its score means nothing
            if self.stopped() {
                break;
            }

            if eval >= beta {
                best_eval = eval;
                best_move = mv;
                if quiet {
                    self.search_stack[ply].killer_moves.push(mv);
                    self.history_table.update(
                        color,
                        mv,
                        &self.search_stack[ply].quiets_tried,
                        depth,
                    );
                }
                break;
            }

            if eval > best_eval {
                best_eval = eval;
                best_move = mv;
                if eval > alpha {
                    alpha = eval;
                }
            }
            if quiet {
                self.search_stack[ply].quiets_tried.push(mv);
            }

            if depth > self.options.pvs_fulldepth {
                pv_search = false;
            }
        }

        let stopped = self.stopped();
        // an interrupted fail low proves nothing
        if best_eval <= alpha_orig && stopped {
            return ABORTED;
        }

        let node_type = if best_eval <= alpha_orig {
            UpperBound
        } else if stopped || best_eval >= beta {
            LowerBound
        } else {
            Exact
        };
        self.transposition_table.store(
            hash,
            best_move,
            depth as u8,
            node_type,
            score_to_tt(best_eval, ply),
            num_pieces,
            handle,
        );
        best_eval
    }

    fn quiescence(&mut self, mut alpha: i32, beta: i32, ply: usize) -> i32 {
        if self.stopped() {
            return ABORTED;
        }
        self.nodes += 1;
        self.seldepth = self.seldepth.max(ply);

        // doing nothing is usually worse than the best capture
        let stand_pat = self.evaluator.evaluate(&self.position);
        if stand_pat >= beta || ply >= MAX_PLY {
            return stand_pat;
        }
        alpha = alpha.max(stand_pat);

        self.position
            .generate_moves::<Captures>(&mut self.search_stack[ply].move_list);
        self.score_moves(ply, Move::null());

        for i in 0..self.search_stack[ply].move_list.len() {
            let (mv, _) = self.search_stack[ply].move_list.pick_move(i);
            let (info, previous_start) = self.make(mv);
            let eval = -self.quiescence(-beta, -alpha, ply + 1);
            self.unmake(mv, &info, previous_start);

            if self.stopped() {
                break;
            }
            if eval >= beta {
                return eval;
            }
            alpha = alpha.max(eval);
        }
        alpha
    }

    /// Passing is only safe to test when the side has enough material that
    /// zugzwang is unlikely, and never twice in a row or out of check.
    fn null_move_allowed(&self, depth: i8, in_check: bool, used_null_move: bool) -> bool {
        let us = self.position.us();
        !used_null_move
            && !in_check
            && depth >= self.options.nmp_depth
            && us.occupancy.count_ones() >= 4
            && !us.only_pawns()
    }

    fn reduced_depth(&self, depth: i8, mv_pos: usize) -> i8 {
        if mv_pos <= self.options.lmr_light_moves {
            depth - 1
        } else if mv_pos <= self.options.lmr_medium_moves {
            depth - 2
        } else {
            depth / 3
        }
    }

    fn score_moves(&mut self, ply: usize, tt_move: Move) {
        let color = self.position.side_to_move();
        for i in 0..self.search_stack[ply].move_list.len() {
            let mv = self.search_stack[ply].move_list[i];
            let score = if mv == tt_move {
                TT_MOVE_SCORE
            } else if let Some(promoted) = mv.promotion() {
                let capture = self.position.them().piece_on(mv.to()).map_or(0, |victim| {
                    MVV_LVA[victim][Piece::Pawn]
                });
                if promoted == Piece::Queen {
                    QUEEN_PROMOTION_SCORE + capture
                } else {
                    UNDERPROMO_SCORE + capture
                }
            } else if self.position.is_capture(mv) {
                let victim = self.position.them().piece_on(mv.to()).unwrap_or(Piece::Pawn);
                WINNING_CAPTURE_SCORE + 1000 * MVV_LVA[victim][mv.piece()]
            } else if self.search_stack[ply].killer_moves.contains(&mv) {
                KILLER_MOVE_SCORE + self.history_table.get(color, mv) as i32
            } else {
                QUIET_SCORE + self.history_table.get(color, mv) as i32
            };
            self.search_stack[ply].move_list.inner_mut()[i].score = score;
        }
    }

    /// Best line from the table, starting with `best_move`.
    fn principal_variation(&mut self, best_move: Move) -> PrincipalVariation {
        let mut pv = PrincipalVariation::new();
        let mut position = self.position.clone();
        let mut mv = best_move;
        let mut seen = Vec::with_capacity(PV_MAX_LEN);
        while pv.push(mv) {
            position.make_move(mv);
            if seen.contains(&position.hash()) {
                break;
            }
            seen.push(position.hash());
            let moves = position.legal_moves();
            match self
                .transposition_table
                .probe(position.hash(), position.num_pieces(), &moves)
            {
                Some((_, entry)) => mv = entry.best_move,
                None => break,
            }
        }
        pv
    }

    /// When the root has been seen before, follows the table's best moves
    /// through known positions. If they lead back to the root, the line is a
    /// repetition the search would otherwise score as a win: the entry
    /// closing the cycle is re-scored as a draw and the rest of the line is
    /// made unreachable.
    fn avoid_repetition_hallucination(&mut self) -> bool {
        if self.history.len() < 5 {
            return false;
        }
        let Some(repeated) = self.history.previous_occurrence() else {
            return false;
        };

        let mut position = self.position.clone();
        let mut line = Vec::new();
        for _ in 0..MAX_PLY {
            let moves = position.legal_moves();
            let Some((handle, entry)) =
                self.transposition_table
                    .probe(position.hash(), position.num_pieces(), &moves)
            else {
                return false;
            };
            position.make_move(entry.best_move);

            if position.hash() == repeated {
                let closing = self.transposition_table.entry_mut(handle);
                // the side to move can always take the draw
                closing.node_type = if closing.eval > 0 { LowerBound } else { Exact };
                closing.eval = 0;
                for earlier in line {
                    self.transposition_table.entry_mut(earlier).num_pieces = 100;
                }
                return true;
            }
            if !self.history.contains(position.hash()) {
                return false;
            }
            line.push(handle);
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use tempo_bitboards::Square;

    use super::*;
    use crate::board::START_FEN;
    use crate::evaluate::PieceSquareEvaluator;
    use crate::hash_tables::NodeType;
    use crate::Tables;

    fn searcher(fen: &str) -> Result<Search<PieceSquareEvaluator>, Box<dyn Error>> {
        let position = Position::from_fen(Tables::embedded()?, fen)?;
        let options = SearchOptions {
            tt_size_mb: 4,
            ..SearchOptions::default()
        };
        Ok(Search::new(position, PieceSquareEvaluator::new(), options))
    }

    fn play(search: &mut Search<PieceSquareEvaluator>, moves: &[&str]) -> Result<(), Box<dyn Error>> {
        let mut position = search.position().clone();
        let mut history = search.history().clone();
        for text in moves {
            let mv = position.parse_move(text)?;
            let info = position.make_move(mv);
            history.push(position.hash(), is_irreversible(mv, &info));
        }
        search.set_position(position, history);
        Ok(())
    }

    #[test]
    fn finds_mate_in_one() -> Result<(), Box<dyn Error>> {
        let mut search = searcher("6k1/5ppp/8/8/8/8/8/R5K1 w - - 0 1")?.max_depth(4);
        let result = search.run();
        assert_eq!(result.best_move.to_string(), "a1a8");
        assert_eq!(result.eval, MATE - 1);
        assert_eq!(format_score(result.eval), "mate 1");
        Ok(())
    }

    #[test]
    fn finds_mate_for_black() -> Result<(), Box<dyn Error>> {
        let mut search = searcher("3r2k1/8/8/8/8/8/5PPP/6K1 b - - 0 1")?.max_depth(4);
        let result = search.run();
        assert_eq!(result.best_move.to_string(), "d8d1");
        assert_eq!(format_score(result.eval), "mate 1");
        Ok(())
    }

    #[test]
    fn takes_a_hanging_queen() -> Result<(), Box<dyn Error>> {
        let mut search = searcher("4k3/8/8/3q4/8/8/8/3RK3 w - - 0 1")?.max_depth(5);
        let result = search.run();
        assert_eq!(result.best_move.to_string(), "d1d5");
        assert!(result.eval > 300);
        Ok(())
    }

    #[test]
    fn search_leaves_the_root_untouched() -> Result<(), Box<dyn Error>> {
        let mut search = searcher(START_FEN)?.max_depth(5);
        let before = search.position().clone();
        let result = search.run();
        assert_eq!(search.position(), &before);
        assert_eq!(result.depth, 5);
        assert!(before.legal_moves().contains(result.best_move));
        assert!(search.nodes() > 0);
        Ok(())
    }

    #[test]
    fn dead_draws_score_zero() -> Result<(), Box<dyn Error>> {
        let mut search = searcher("4k3/8/8/8/8/8/8/4KN2 w - - 0 1")?.max_depth(6);
        assert_eq!(search.run().eval, 0);
        Ok(())
    }

    #[test]
    fn raised_stop_flag_returns_a_legal_move() -> Result<(), Box<dyn Error>> {
        let stop = Arc::new(AtomicBool::new(true));
        let mut search = searcher(START_FEN)?.stop_flag(stop);
        let result = search.run();
        assert_eq!(result.depth, 0);
        assert!(search.position().legal_moves().contains(result.best_move));
        Ok(())
    }

    #[test]
    fn mated_side_has_no_move() -> Result<(), Box<dyn Error>> {
        let mut search = searcher("R5k1/5ppp/8/8/8/8/8/4K3 b - - 0 1")?;
        let result = search.run();
        assert!(result.best_move.is_null());
        Ok(())
    }

    #[test]
    fn repeating_line_is_rescored_as_a_draw() -> Result<(), Box<dyn Error>> {
        let mut search = searcher(START_FEN)?;
        play(&mut search, &["g1f3", "g8f6", "f3g1", "f6g8"])?;

        // store a principal variation that repeats the root
        let mut position = search.position().clone();
        let mut hashes = Vec::new();
        for text in ["g1f3", "g8f6", "f3g1", "f6g8"] {
            let mv = position.parse_move(text)?;
            hashes.push(position.hash());
            search.transposition_table.store(
                position.hash(),
                mv,
                4,
                Exact,
                50,
                position.num_pieces(),
                None,
            );
            position.make_move(mv);
        }
        assert_eq!(position.hash(), search.position().hash());

        assert!(search.avoid_repetition_hallucination());
        let tt = &mut search.transposition_table;
        let pieces = position.num_pieces();
        // the root entry is gone
        assert!(tt.probe(hashes[0], pieces, &position.legal_moves()).is_none());
        let mut closing = position.clone();
        for text in ["g1f3", "g8f6", "f3g1"] {
            let mv = closing.parse_move(text)?;
            closing.make_move(mv);
        }
        let (_, entry) = tt
            .probe(hashes[3], pieces, &closing.legal_moves())
            .ok_or("closing entry missing")?;
        assert_eq!(entry.eval, 0);
        assert_eq!(entry.node_type, LowerBound);
        Ok(())
    }

    #[test]
    fn mate_scores_are_stored_relative_to_the_node() {
        let eval = MATE - 7;
        assert_eq!(score_from_tt(score_to_tt(eval, 3), 3), eval);
        assert_eq!(score_to_tt(eval, 3) as i32, MATE - 4);
        assert_eq!(score_from_tt(score_to_tt(-eval, 5), 5), -eval);
        assert_eq!(score_to_tt(120, 9), 120);
    }

    #[test]
    fn null_move_guards() -> Result<(), Box<dyn Error>> {
        let search = searcher(START_FEN)?;
        let nmp_depth = search.options().nmp_depth;
        assert!(search.null_move_allowed(nmp_depth, false, false));
        assert!(!search.null_move_allowed(nmp_depth - 1, false, false));
        assert!(!search.null_move_allowed(nmp_depth, true, false));
        assert!(!search.null_move_allowed(nmp_depth, false, true));

        // king and pawns only
        let search = searcher("4k3/pppp4/8/8/8/8/PPPP4/4K3 w - - 0 1")?;
        assert!(!search.null_move_allowed(8, false, false));
        // too little material
        let search = searcher("4k3/pppp4/8/8/8/8/8/2N1K1N1 w - - 0 1")?;
        assert!(!search.null_move_allowed(8, false, false));
        let search = searcher("4k3/pppp4/8/8/8/8/P7/2N1K1N1 w - - 0 1")?;
        assert!(search.null_move_allowed(8, false, false));
        Ok(())
    }

    #[test]
    fn reduction_guards() {
        let options = SearchOptions::default();
        let late_quiet = ReductionCandidate {
            mv_pos: options.lmr_protected_moves + 4,
            depth: options.lmr_depth + 2,
            quiet: true,
            in_check: false,
            gives_check: false,
            killer: false,
            reduced: false,
        };
        assert!(late_quiet.should_reduce(&options));

        let refused = [
            ReductionCandidate { quiet: false, ..late_quiet },
            ReductionCandidate { in_check: true, ..late_quiet },
            ReductionCandidate { gives_check: true, ..late_quiet },
            ReductionCandidate { killer: true, ..late_quiet },
            ReductionCandidate { reduced: true, ..late_quiet },
            ReductionCandidate { mv_pos: options.lmr_protected_moves - 1, ..late_quiet },
            ReductionCandidate { depth: options.lmr_depth - 1, ..late_quiet },
        ];
        for candidate in refused {
            assert!(!candidate.should_reduce(&options), "{candidate:?}");
        }
        assert!(ReductionCandidate { mv_pos: options.lmr_protected_moves, ..late_quiet }
            .should_reduce(&options));
    }

    #[test]
    fn table_bounds_cut_the_search_short() -> Result<(), Box<dyn Error>> {
        fn search_with(seed: Option<(NodeType, i16)>) -> Result<i32, Box<dyn Error>> {
            let mut search = searcher(START_FEN)?;
            let position = search.position().clone();
            search.transposition_table.set_root(position.num_pieces());
            search.evaluator.set_position(&position);
            if let Some((node_type, eval)) = seed {
                let mv = position.parse_move("e2e4")?;
                search.transposition_table.store(
                    position.hash(),
                    mv,
                    10,
                    node_type,
                    eval,
                    position.num_pieces(),
                    None,
                );
            }
            Ok(search.search(3, -100, 100, 1, false, false))
        }

        let plain = search_with(None)?;
        assert!(plain.abs() < 100, "{plain}");
        // a deep lower bound at or above beta fails high at once
        assert_eq!(search_with(Some((LowerBound, 500)))?, 500);
        // a deep upper bound at or below alpha fails low at once
        assert_eq!(search_with(Some((UpperBound, -300)))?, -300);
        // too shallow to trust is ignored
        let mut search = searcher(START_FEN)?;
        let position = search.position().clone();
        search.transposition_table.set_root(position.num_pieces());
        search.evaluator.set_position(&position);
        search.transposition_table.store(
            position.hash(),
            position.parse_move("e2e4")?,
            1,
            LowerBound,
            500,
            position.num_pieces(),
            None,
        );
        assert_eq!(search.search(3, -100, 100, 1, false, false), plain);
        Ok(())
    }

    #[test]
    fn repetition_walk_ignores_illegal_table_moves() -> Result<(), Box<dyn Error>> {
        let mut search = searcher("4k3/4r3/8/8/8/8/4N3/4K3 w - - 0 1")?;
        play(&mut search, &["e1d1", "e8d8", "d1e1", "d8e8"])?;
        let root = search.position().clone();

        // the knight is pinned, so this move from a colliding entry is illegal
        let pinned = Move::new(
            MoveFlag::KnightMove,
            Square::from_coord("e2").ok_or("bad square")?,
            Square::from_coord("c3").ok_or("bad square")?,
        );
        assert!(!root.legal_moves().contains(pinned));
        search
            .transposition_table
            .store(root.hash(), pinned, 4, Exact, 50, root.num_pieces(), None);

        assert!(!search.avoid_repetition_hallucination());
        assert_eq!(search.position(), &root);
        let mut with_pinned = MoveList::new();
        with_pinned.push(pinned);
        let (_, entry) = search
            .transposition_table
            .probe(root.hash(), root.num_pieces(), &with_pinned)
            .ok_or("entry missing")?;
        assert_eq!(entry.eval, 50);
        Ok(())
    }
}
