use std::sync::{
    atomic::{AtomicBool, Ordering},
    mpsc::{self, RecvTimeoutError},
    Arc,
};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::{
    board::{Position, START_FEN},
    error::EngineError,
    evaluate::{Evaluator, PieceSquareEvaluator},
    game_outcome::{game_status, is_irreversible, GameStatus, HashHistory},
    moves::Move,
    options::SearchOptions,
    search::{Search, SearchResult},
    Tables,
};

const SEARCH_STACK_SIZE: usize = 16 * 1024 * 1024;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SearchLimit {
    Depth(u8),
    MoveTime(Duration),
    /// Time left on the mover's clock.
    Clock { remaining: Duration },
    Infinite,
}

impl SearchLimit {
    /// Time the search may use, given the number of full moves played so far.
    pub fn time_budget(&self, moves_played: u16) -> Option<Duration> {
        match *self {
            SearchLimit::Depth(_) | SearchLimit::Infinite => None,
            SearchLimit::MoveTime(time) => Some(time),
            SearchLimit::Clock { remaining } => Some(match moves_played {
                0..=9 => remaining / 60,
                10..=29 => remaining / 10,
                _ => remaining / 20,
            }),
        }
    }
}

/// Sets `stop` once `budget` has passed, unless the returned sender is
/// dropped first.
fn start_timer(budget: Duration, stop: Arc<AtomicBool>) -> mpsc::Sender<()> {
    let (sender, receiver) = mpsc::channel::<()>();
    thread::spawn(move || {
        if let Err(RecvTimeoutError::Timeout) = receiver.recv_timeout(budget) {
            stop.store(true, Ordering::Relaxed);
        }
    });
    sender
}

type Worker<E> = JoinHandle<(Search<E>, SearchResult)>;

/// Game driver: tracks the game, and runs at most one search at a time on a
/// worker thread.
pub struct Engine<E: Evaluator + Clone + 'static = PieceSquareEvaluator> {
    tables: Arc<Tables>,
    position: Position,
    history: HashHistory,
    options: SearchOptions,
    /// Fresh evaluator used to rebuild the searcher if a worker dies.
    evaluator: E,
    search: Option<Search<E>>,
    worker: Option<Worker<E>>,
    stop: Arc<AtomicBool>,
    uci_output: bool,
}

impl Engine<PieceSquareEvaluator> {
    pub fn new(tables: Arc<Tables>, options: SearchOptions) -> Self {
        Self::with_evaluator(tables, options, PieceSquareEvaluator::new())
    }
}

impl<E: Evaluator + Clone + 'static> Engine<E> {
    pub fn with_evaluator(tables: Arc<Tables>, options: SearchOptions, evaluator: E) -> Self {
        let position = Position::start(tables.clone());
        let history = HashHistory::new(position.hash());
        let search = Search::new(position.clone(), evaluator.clone(), options);
        Self {
            tables,
            position,
            history,
            options,
            evaluator,
            search: Some(search),
            worker: None,
            stop: Arc::new(AtomicBool::new(false)),
            uci_output: false,
        }
    }

    /// Print UCI `info` lines while searching and `bestmove` when done.
    pub fn set_uci_output(&mut self, output: bool) {
        self.uci_output = output;
    }

    pub fn position(&self) -> &Position {
        &self.position
    }

    pub fn options(&self) -> &SearchOptions {
        &self.options
    }

    pub fn game_status(&self) -> GameStatus {
        game_status(&self.position, &self.history)
    }

    pub fn is_searching(&self) -> bool {
        self.worker.as_ref().is_some_and(|worker| !worker.is_finished())
    }

    /// Joins a finished worker so its searcher can be reused.
    fn reclaim(&mut self) -> Result<(), EngineError> {
        if self.is_searching() {
            return Err(EngineError::SearchInProgress);
        }
        if self.worker.is_some() {
            self.wait_result()?;
        }
        Ok(())
    }

    fn searcher(&mut self) -> &mut Search<E> {
        let (position, evaluator, options) = (&self.position, &self.evaluator, self.options);
        self.search
            .get_or_insert_with(|| Search::new(position.clone(), evaluator.clone(), options))
    }

    pub fn set_position(&mut self, fen: &str) -> Result<(), EngineError> {
        self.reclaim()?;
        let position = Position::from_fen(self.tables.clone(), fen)?;
        log::debug!("position set to {fen}");
        self.history = HashHistory::new(position.hash());
        self.position = position;
        Ok(())
    }

    pub fn set_start_position(&mut self) -> Result<(), EngineError> {
        self.set_position(START_FEN)
    }

    /// Plays a move given in long algebraic notation.
    pub fn apply_move(&mut self, text: &str) -> Result<Move, EngineError> {
        self.reclaim()?;
        let mv = self.position.parse_move(text)?;
        let info = self.position.make_move(mv);
        self.history
            .push(self.position.hash(), is_irreversible(mv, &info));
        log::debug!("played {mv}, now {}", self.position.fen());
        Ok(mv)
    }

    /// Plays moves in order, stopping at the first one that fails.
    pub fn apply_moves<I, S>(&mut self, moves: I) -> Result<(), EngineError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for text in moves {
            self.apply_move(text.as_ref())?;
        }
        Ok(())
    }

    pub fn set_options(&mut self, options: SearchOptions) -> Result<(), EngineError> {
        self.reclaim()?;
        self.options = options;
        self.searcher().set_options(options);
        Ok(())
    }

    pub fn resize_tt(&mut self, size_mb: usize) -> Result<(), EngineError> {
        self.reclaim()?;
        self.options.tt_size_mb = size_mb;
        self.searcher().resize_tt(size_mb);
        log::info!("transposition table resized to {size_mb} MiB");
        Ok(())
    }

    /// Back to the start position with an empty transposition table.
    pub fn new_game(&mut self) -> Result<(), EngineError> {
        self.reclaim()?;
        self.searcher().clear();
        self.set_start_position()
    }

    /// Starts searching the current position on a worker thread.
    pub fn search(&mut self, limit: SearchLimit) -> Result<(), EngineError> {
        self.search_capped(limit, None)
    }

    /// As [`Engine::search`], but never deeper than `depth` whatever else
    /// limits the search.
    pub fn search_capped(&mut self, limit: SearchLimit, depth: Option<u8>) -> Result<(), EngineError> {
        self.reclaim()?;
        let mut search = match self.search.take() {
            Some(search) => search,
            None => Search::new(self.position.clone(), self.evaluator.clone(), self.options),
        };
        search.set_position(self.position.clone(), self.history.clone());

        let stop = Arc::new(AtomicBool::new(false));
        self.stop = stop.clone();
        let max_depth = match limit {
            SearchLimit::Depth(depth) => depth,
            _ => self.options.max_depth,
        };
        let max_depth = depth.map_or(max_depth, |cap| cap.min(max_depth));
        let budget = limit.time_budget(self.position.fullmove_number().saturating_sub(1));
        let output = self.uci_output;
        let search = search
            .max_depth(max_depth)
            .stop_flag(stop.clone())
            .output(output);

        log::info!("searching {} with {limit:?}", self.position.fen());
        let worker = thread::Builder::new()
            .name("search".into())
            .stack_size(SEARCH_STACK_SIZE)
            .spawn(move || {
                let mut search = search;
                // dropping the sender at the end cancels the timer
                let _timer = budget.map(|budget| start_timer(budget, stop));
                let result = search.run();
                if output {
                    match result.ponder_move {
                        Some(ponder) => println!("bestmove {} ponder {ponder}", result.best_move),
                        None => println!("bestmove {}", result.best_move),
                    }
                }
                (search, result)
            })?;
        self.worker = Some(worker);
        Ok(())
    }

    /// Asks the running search to finish. Its result is still collected with
    /// [`Engine::wait_result`].
    pub fn stop(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }

    /// Blocks until the current search finishes and returns its result.
    pub fn wait_result(&mut self) -> Result<SearchResult, EngineError> {
        let worker = self.worker.take().ok_or(EngineError::NoSearch)?;
        match worker.join() {
            Ok((search, result)) => {
                self.search = Some(search);
                Ok(result)
            }
            Err(_) => {
                log::error!("search thread panicked, transposition table lost");
                Err(EngineError::WorkerPanicked)
            }
        }
    }

    /// Stops any search in flight and joins it. A no-op when idle.
    pub fn finish(&mut self) -> Result<(), EngineError> {
        if self.worker.is_none() {
            return Ok(());
        }
        self.stop();
        self.wait_result().map(|_| ())
    }
}

impl<E: Evaluator + Clone + 'static> Drop for Engine<E> {
    fn drop(&mut self) {
        self.stop();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}
