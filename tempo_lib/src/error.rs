use thiserror::Error;

use crate::types::Color;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PositionError {
    #[error("FEN is missing the {0} field")]
    MissingField(&'static str),
    #[error("invalid piece character '{0}' in FEN")]
    InvalidPiece(char),
    #[error("FEN rank {0} does not describe exactly eight squares")]
    BadRank(usize),
    #[error("FEN must describe exactly eight ranks, found {0}")]
    BadRankCount(usize),
    #[error("{color:?} has {count} kings")]
    KingCount { color: Color, count: u32 },
    #[error("pawns cannot stand on the first or last rank")]
    PawnOnBackRank,
    #[error("side to move already attacks the opposing king")]
    OpponentInCheck,
    #[error("invalid side to move '{0}'")]
    InvalidSideToMove(String),
    #[error("invalid castling rights '{0}'")]
    InvalidCastling(String),
    #[error("invalid en passant square '{0}'")]
    InvalidEnPassant(String),
    #[error("invalid move clock '{0}'")]
    InvalidClock(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MoveError {
    #[error("cannot parse move '{0}'")]
    Unparsable(String),
    #[error("move '{0}' is not legal in this position")]
    Illegal(String),
}

#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Position(#[from] PositionError),
    #[error(transparent)]
    Move(#[from] MoveError),
    #[error(transparent)]
    Tables(#[from] tempo_pregen::TableError),
    #[error("could not start the search thread: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("a search is already running")]
    SearchInProgress,
    #[error("no search has been started")]
    NoSearch,
    #[error("the search thread panicked")]
    WorkerPanicked,
}
