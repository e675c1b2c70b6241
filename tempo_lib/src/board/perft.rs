use super::Position;
use crate::moves::{Move, MoveList};
use crate::types::All;

impl Position {
    /// Counts the leaves of the legal move tree `depth` plies deep. The last
    /// ply is bulk counted from the move list length.
    pub fn perft(&mut self, depth: u8) -> u64 {
        let mut lists = vec![MoveList::new(); depth as usize];
        self.perft_inner(depth, &mut lists)
    }

    fn perft_inner(&mut self, depth: u8, lists: &mut [MoveList]) -> u64 {
        if depth == 0 {
            return 1;
        }
        let Some((moves, rest)) = lists.split_first_mut() else {
            return 1;
        };
        self.generate_moves::<All>(moves);
        if depth == 1 {
            return moves.len() as u64;
        }

        let mut nodes = 0;
        for mv in moves.iter() {
            let info = self.make_move(mv);
            nodes += self.perft_inner(depth - 1, rest);
            self.unmake_move(mv, &info);
        }
        nodes
    }

    /// Per-root-move leaf counts, in generation order.
    pub fn divide(&mut self, depth: u8) -> Vec<(Move, u64)> {
        if depth == 0 {
            return Vec::new();
        }
        let moves = self.legal_moves();
        let mut lists = vec![MoveList::new(); depth as usize - 1];
        moves
            .iter()
            .map(|mv| {
                let info = self.make_move(mv);
                let nodes = self.perft_inner(depth - 1, &mut lists);
                self.unmake_move(mv, &info);
                (mv, nodes)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use super::*;
    use crate::board::START_FEN;
    use crate::Tables;

    fn assert_perft(fen: &str, expected: &[u64]) -> Result<(), Box<dyn Error>> {
        let mut position = Position::from_fen(Tables::embedded()?, fen)?;
        let before = position.clone();
        for (depth, &nodes) in expected.iter().enumerate() {
            assert_eq!(position.perft(depth as u8 + 1), nodes, "{fen} depth {}", depth + 1);
        }
        assert_eq!(position, before);
        Ok(())
    }

    #[test]
    fn perft_start_position() -> Result<(), Box<dyn Error>> {
        assert_perft(START_FEN, &[20, 400, 8902, 197281])
    }

    #[test]
    fn perft_kiwipete() -> Result<(), Box<dyn Error>> {
        assert_perft(
            "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq -",
            &[48, 2039, 97862],
        )
    }

    #[test]
    fn perft_position_3() -> Result<(), Box<dyn Error>> {
        assert_perft("8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - -", &[14, 191, 2812, 43238])
    }

    #[test]
    fn perft_position_4() -> Result<(), Box<dyn Error>> {
        assert_perft(
            "r3k2r/Pppp1ppp/1b3nbN/nP6/BBP1P3/q4N2/Pp1P2PP/R2Q1RK1 w kq - 0 1",
            &[6, 264, 9467],
        )
    }

    #[test]
    fn perft_position_5() -> Result<(), Box<dyn Error>> {
        assert_perft(
            "rnbq1k1r/pp1Pbppp/2p5/8/2B5/8/PPP1NnPP/RNBQK2R w KQ - 1 8",
            &[44, 1486, 62379],
        )
    }

    #[test]
    fn divide_sums_to_perft() -> Result<(), Box<dyn Error>> {
        let mut position = Position::start(Tables::embedded()?);
        let split = position.divide(3);
        assert_eq!(split.len(), 20);
        assert_eq!(split.iter().map(|(_, n)| n).sum::<u64>(), 8902);
        let e2e4 = split
            .iter()
            .find(|(mv, _)| mv.to_string() == "e2e4")
            .map(|(_, n)| *n);
        assert_eq!(e2e4, Some(600));
        Ok(())
    }
}
