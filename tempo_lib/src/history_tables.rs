use crate::{moves::Move, types::Color};

pub const HISTORY_MAX: i16 = 4096;

/// Quiet-move cutoff statistics per side, moving piece and destination.
#[derive(Copy, Clone, Debug)]
pub struct HistoryTable([[[i16; 64]; 6]; 2]);

impl Default for HistoryTable {
    fn default() -> Self {
        Self([[[0; 64]; 6]; 2])
    }
}

impl HistoryTable {
    #[inline(always)]
    pub fn get(&self, color: Color, mv: Move) -> i16 {
        self.0[color][mv.piece()][mv.to()]
    }

    #[inline(always)]
    fn get_mut(&mut self, color: Color, mv: Move) -> &mut i16 {
        &mut self.0[color][mv.piece()][mv.to()]
    }

    /// Rewards the move that caused a cutoff and punishes the quiet moves
    /// searched before it.
    pub fn update(&mut self, color: Color, cutoff: Move, tried: &[Move], depth: i8) {
        let delta = history_delta(depth);
        apply_history_bonus(self.get_mut(color, cutoff), delta);
        for &mv in tried {
            apply_history_malus(self.get_mut(color, mv), delta);
        }
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

#[inline(always)]
fn history_delta(depth: i8) -> i16 {
    let depth = depth.max(0) as i16;
    (depth * depth).min(HISTORY_MAX)
}

/// Moves `score` towards `HISTORY_MAX`, more slowly the closer it already is.
#[inline(always)]
pub fn apply_history_bonus(score: &mut i16, delta: i16) {
    *score += (delta as i32 - (delta as i32 * *score as i32) / HISTORY_MAX as i32) as i16;
}

#[inline(always)]
pub fn apply_history_malus(score: &mut i16, delta: i16) {
    *score -= (delta as i32 + (delta as i32 * *score as i32) / HISTORY_MAX as i32) as i16;
}

#[cfg(test)]
mod tests {
    use tempo_bitboards::Square;

    use super::*;
    use crate::moves::MoveFlag;

    #[test]
    fn scores_stay_bounded() {
        let mut score = 0;
        for _ in 0..1000 {
            apply_history_bonus(&mut score, 400);
        }
        assert!(score <= HISTORY_MAX);
        assert!(score > HISTORY_MAX - 400);
        for _ in 0..1000 {
            apply_history_malus(&mut score, 400);
        }
        assert!(score >= -HISTORY_MAX);
    }

    #[test]
    fn cutoff_move_outranks_tried_moves() {
        let good = Move::new(MoveFlag::KnightMove, Square::G1, Square::from_bits(21));
        let bad = Move::new(MoveFlag::KnightMove, Square::B1, Square::from_bits(18));
        let mut history = HistoryTable::default();
        history.update(Color::White, good, &[bad], 5);
        assert_eq!(history.get(Color::White, good), 25);
        assert_eq!(history.get(Color::White, bad), -25);
        // the other side's table is untouched
        assert_eq!(history.get(Color::Black, good), 0);
    }
}
