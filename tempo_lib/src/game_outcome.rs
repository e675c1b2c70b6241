use std::fmt::Display;

use tempo_bitboards::BitBoard;
use tempo_pregen::{DARK_SQUARES, LIGHT_SQUARES};

use crate::board::{MoveInfo, Position, Side};
use crate::moves::Move;
use crate::types::{Color, Piece::*};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GameStatus {
    Ongoing,
    Checkmate,
    Stalemate,
    InsufficientMaterial,
    Repetition,
    FiftyMoveRule,
}

impl GameStatus {
    pub fn is_over(&self) -> bool {
        *self != GameStatus::Ongoing
    }
}

impl Display for GameStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            GameStatus::Ongoing => "ongoing",
            GameStatus::Checkmate => "checkmate",
            GameStatus::Stalemate => "stalemate",
            GameStatus::InsufficientMaterial => "draw by insufficient material",
            GameStatus::Repetition => "draw by repetition",
            GameStatus::FiftyMoveRule => "draw by fifty move rule",
        };
        write!(f, "{text}")
    }
}

/// True for moves after which no earlier position can recur.
pub fn is_irreversible(mv: Move, info: &MoveInfo) -> bool {
    info.captured.is_some() || mv.piece() == Pawn || mv.is_castle()
}

/// Position hashes reachable by repetition: everything since the last
/// capture, pawn move or castle.
#[derive(Clone, Debug)]
pub struct HashHistory {
    hashes: Vec<u64>,
    start: usize,
}

impl HashHistory {
    pub fn new(hash: u64) -> Self {
        let mut hashes = Vec::with_capacity(256);
        hashes.push(hash);
        Self { hashes, start: 0 }
    }

    /// Records the hash reached by a move. Returns the previous window start
    /// for [`HashHistory::pop`].
    #[inline(always)]
    pub fn push(&mut self, hash: u64, irreversible: bool) -> usize {
        let previous = self.start;
        if irreversible {
            self.start = self.hashes.len();
        }
        self.hashes.push(hash);
        previous
    }

    #[inline(always)]
    pub fn pop(&mut self, previous_start: usize) {
        self.hashes.pop();
        self.start = previous_start;
    }

    /// Number of positions in the repetition window, the current one included.
    pub fn len(&self) -> usize {
        self.hashes.len() - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn last(&self) -> Option<u64> {
        self.hashes.last().copied()
    }

    fn window(&self) -> &[u64] {
        &self.hashes[self.start..]
    }

    pub fn contains(&self, hash: u64) -> bool {
        self.window().contains(&hash)
    }

    /// Earlier occurrence of the current position with the same side to
    /// move, if any.
    pub fn previous_occurrence(&self) -> Option<u64> {
        let window = self.window();
        let last = *window.last()?;
        window
            .iter()
            .rev()
            .skip(4)
            .step_by(2)
            .find(|&&hash| hash == last)
            .copied()
    }

    /// The current position has occurred twice before. A position can only
    /// come back after two moves by each side, so after a hit the scan
    /// jumps four plies.
    pub fn is_repetition(&self) -> bool {
        let window = self.window();
        if window.len() < 9 {
            return false;
        }
        let last = window[window.len() - 1];
        let mut count = 1;
        let mut i = window.len() as isize - 5;
        while i >= 0 {
            if window[i as usize] == last {
                count += 1;
                if count == 3 {
                    return true;
                }
                i -= 4;
            } else {
                i -= 2;
            }
        }
        false
    }
}

fn one_colour(bishops: BitBoard) -> bool {
    (bishops & LIGHT_SQUARES).is_empty() || (bishops & DARK_SQUARES).is_empty()
}

fn bare_king(side: &Side) -> bool {
    side.occupancy == side.pieces[King]
}

fn king_and_bishops(side: &Side) -> bool {
    side.occupancy == side.pieces[King] | side.pieces[Bishop]
}

/// Neither side can possibly deliver mate.
pub fn insufficient_material(position: &Position) -> bool {
    let white = position.side(Color::White);
    let black = position.side(Color::Black);

    for (lone, other) in [(white, black), (black, white)] {
        if !bare_king(lone) {
            continue;
        }
        if bare_king(other) {
            return true;
        }
        if other.occupancy == other.pieces[King] | other.pieces[Knight] && other.counts[Knight] == 1 {
            return true;
        }
        if king_and_bishops(other) && one_colour(other.pieces[Bishop]) {
            return true;
        }
    }

    king_and_bishops(white)
        && king_and_bishops(black)
        && white.counts[Bishop] == 1
        && black.counts[Bishop] == 1
        && one_colour(white.pieces[Bishop] | black.pieces[Bishop])
}

/// Draw conditions the search treats as a zero score.
#[inline(always)]
pub fn is_draw(position: &Position, history: &HashHistory) -> bool {
    position.halfmove_clock() >= 100 || history.is_repetition() || insufficient_material(position)
}

pub fn game_status(position: &Position, history: &HashHistory) -> GameStatus {
    if position.legal_moves().is_empty() {
        return if position.in_check() {
            GameStatus::Checkmate
        } else {
            GameStatus::Stalemate
        };
    }
    if insufficient_material(position) {
        GameStatus::InsufficientMaterial
    } else if history.is_repetition() {
        GameStatus::Repetition
    } else if position.halfmove_clock() >= 100 {
        GameStatus::FiftyMoveRule
    } else {
        GameStatus::Ongoing
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use super::*;
    use crate::Tables;

    fn play(
        position: &mut Position,
        history: &mut HashHistory,
        moves: &[&str],
    ) -> Result<(), Box<dyn Error>> {
        for text in moves {
            let mv = position.parse_move(text)?;
            let info = position.make_move(mv);
            history.push(position.hash(), is_irreversible(mv, &info));
        }
        Ok(())
    }

    fn status(fen: &str) -> Result<GameStatus, Box<dyn Error>> {
        let position = Position::from_fen(Tables::embedded()?, fen)?;
        let history = HashHistory::new(position.hash());
        Ok(game_status(&position, &history))
    }

    #[test]
    fn threefold_repetition() -> Result<(), Box<dyn Error>> {
        let mut position = Position::start(Tables::embedded()?);
        let mut history = HashHistory::new(position.hash());
        let shuffle = ["g1f3", "g8f6", "f3g1", "f6g8"];

        play(&mut position, &mut history, &shuffle)?;
        assert!(!history.is_repetition());
        assert_eq!(history.previous_occurrence(), Some(position.hash()));

        play(&mut position, &mut history, &shuffle)?;
        assert!(history.is_repetition());
        assert_eq!(game_status(&position, &history), GameStatus::Repetition);
        Ok(())
    }

    #[test]
    fn pawn_moves_reset_the_window() -> Result<(), Box<dyn Error>> {
        let mut position = Position::start(Tables::embedded()?);
        let mut history = HashHistory::new(position.hash());
        play(&mut position, &mut history, &["g1f3", "g8f6", "f3g1", "f6g8", "e2e3"])?;
        assert_eq!(history.len(), 1);
        play(&mut position, &mut history, &["e7e6", "g1f3", "g8f6", "f3g1", "f6g8"])?;
        assert!(!history.is_repetition());

        let before = history.len();
        let previous = history.push(1234, true);
        assert_eq!(history.len(), 1);
        history.pop(previous);
        assert_eq!(history.len(), before);
        Ok(())
    }

    #[test]
    fn insufficient_material_cases() -> Result<(), Box<dyn Error>> {
        use GameStatus::*;
        assert_eq!(status("4k3/8/8/8/8/8/8/4K3 w - -")?, InsufficientMaterial);
        assert_eq!(status("4k3/8/8/8/8/8/8/4KN2 w - -")?, InsufficientMaterial);
        assert_eq!(status("4k3/8/8/8/8/8/8/2B1KB2 w - -")?, Ongoing);
        assert_eq!(status("4k3/8/8/8/8/8/8/2B1K1B1 w - -")?, InsufficientMaterial);
        // bishops on c1 and f8 share dark squares
        assert_eq!(status("5b2/4k3/8/8/8/8/8/2B1K3 w - -")?, InsufficientMaterial);
        assert_eq!(status("2b5/4k3/8/8/8/8/8/2B1K3 w - -")?, Ongoing);
        assert_eq!(status("4kb2/8/8/8/8/8/8/2B1K3 w - -")?, InsufficientMaterial);
        assert_eq!(status("4k3/8/8/8/8/8/8/1NN1K3 w - -")?, Ongoing);
        assert_eq!(status("4k3/8/8/8/8/8/4P3/4K3 w - -")?, Ongoing);
        Ok(())
    }

    #[test]
    fn terminal_positions() -> Result<(), Box<dyn Error>> {
        assert_eq!(status("R5k1/5ppp/8/8/8/8/8/4K3 b - -")?, GameStatus::Checkmate);
        assert_eq!(status("7k/5Q2/6K1/8/8/8/8/8 b - -")?, GameStatus::Stalemate);
        assert_eq!(status("4k3/8/8/8/8/8/4P3/4K3 w - - 100 80")?, GameStatus::FiftyMoveRule);
        assert_eq!(status("4k3/8/8/8/8/8/4P3/4K3 w - - 99 80")?, GameStatus::Ongoing);
        Ok(())
    }
}
