use std::sync::Arc;

use tempo_bitboards::{BitBoard, Square};

use super::{Position, Side};
use crate::error::PositionError;
use crate::types::{Black, CastlingIndex, Color, Piece, TypeColor, White};
use crate::Tables;

impl Position {
    /// Parses a FEN string. The two move clocks may be omitted and default
    /// to `0 1`.
    ///
    /// Positions the move generator cannot handle soundly are rejected: a
    /// missing or extra king, pawns on the first or last rank, castling
    /// rights without the king and rook at home, an en passant square with
    /// no pawn that could just have double pushed, or the side to move
    /// already giving check.
    pub fn from_fen(tables: Arc<Tables>, fen: &str) -> Result<Self, PositionError> {
        let mut fields = fen.split_whitespace();
        let placement = fields.next().ok_or(PositionError::MissingField("placement"))?;
        let stm = fields.next().ok_or(PositionError::MissingField("side to move"))?;
        let castling = fields.next().ok_or(PositionError::MissingField("castling"))?;
        let ep = fields.next().ok_or(PositionError::MissingField("en passant"))?;
        let halfmove = fields.next().unwrap_or("0");
        let fullmove = fields.next().unwrap_or("1");

        let mut sides = [Side::empty(), Side::empty()];

        let ranks = placement.split('/').collect::<Vec<_>>();
        if ranks.len() != 8 {
            return Err(PositionError::BadRankCount(ranks.len()));
        }
        for (row, text) in ranks.into_iter().enumerate() {
            let rank = 7 - row as u8;
            let mut file = 0u8;
            for symbol in text.chars() {
                if let Some(skip) = symbol.to_digit(10) {
                    if !(1..=8).contains(&skip) {
                        return Err(PositionError::BadRank(row + 1));
                    }
                    file = file
                        .checked_add(skip as u8)
                        .filter(|&f| f <= 8)
                        .ok_or(PositionError::BadRank(row + 1))?;
                    continue;
                }
                let (piece, color) =
                    Piece::from_char(symbol).ok_or(PositionError::InvalidPiece(symbol))?;
                if file > 7 {
                    return Err(PositionError::BadRank(row + 1));
                }
                let square = Square::from_rank_file(rank, file);
                let side = &mut sides[color];
                side.pieces[piece] |= square.bitboard();
                side.occupancy |= square.bitboard();
                side.counts[piece] += 1;
                file += 1;
            }
            if file != 8 {
                return Err(PositionError::BadRank(row + 1));
            }
        }

        for color in [Color::White, Color::Black] {
            let side = &mut sides[color];
            let count = side.pieces[Piece::King].count_ones();
            if count != 1 {
                return Err(PositionError::KingCount { color, count });
            }
            side.king_square = side.pieces[Piece::King].first_square();
            let back_ranks = tempo_pregen::FIRST_RANK | tempo_pregen::EIGHTH_RANK;
            if (side.pieces[Piece::Pawn] & back_ranks).is_not_empty() {
                return Err(PositionError::PawnOnBackRank);
            }
        }

        let side_to_move = match stm {
            "w" => Color::White,
            "b" => Color::Black,
            _ => return Err(PositionError::InvalidSideToMove(stm.to_string())),
        };

        if castling != "-" {
            for symbol in castling.chars() {
                let (color, castle, rook) = match symbol {
                    'K' => (Color::White, CastlingIndex::Kingside, Square::H1),
                    'Q' => (Color::White, CastlingIndex::Queenside, Square::A1),
                    'k' => (Color::Black, CastlingIndex::Kingside, Square::H8),
                    'q' => (Color::Black, CastlingIndex::Queenside, Square::A8),
                    _ => return Err(PositionError::InvalidCastling(castling.to_string())),
                };
                let side = &mut sides[color];
                let king_home = if color == Color::White {
                    Square::E1
                } else {
                    Square::E8
                };
                if side.king_square != king_home
                    || !side.pieces[Piece::Rook].contains(rook)
                    || side.castling[castle]
                {
                    return Err(PositionError::InvalidCastling(castling.to_string()));
                }
                side.castling[castle] = true;
            }
        }

        if ep != "-" {
            let invalid = || PositionError::InvalidEnPassant(ep.to_string());
            let square = Square::from_coord(ep).ok_or_else(invalid)?;
            let (rank, push) = match side_to_move {
                Color::White => (5, -8),
                Color::Black => (2, 8),
            };
            if square.rank() != rank {
                return Err(invalid());
            }
            // the pawn that just moved stands one rank past the target
            let pushed = square.offset(push);
            let occupied = sides[0].occupancy | sides[1].occupancy;
            if occupied.contains(square)
                || !sides[!side_to_move].pieces[Piece::Pawn].contains(pushed)
            {
                return Err(invalid());
            }
            sides[side_to_move].ep_target = Some(square);
        }

        let halfmove_clock = halfmove
            .parse()
            .map_err(|_| PositionError::InvalidClock(halfmove.to_string()))?;
        let fullmove_number = fullmove
            .parse()
            .map_err(|_| PositionError::InvalidClock(fullmove.to_string()))?;

        let mut position = Self {
            sides,
            side_to_move,
            halfmove_clock,
            fullmove_number,
            hash: 0,
            tables,
        };

        match side_to_move {
            Color::White => position.init_attacks::<White>()?,
            Color::Black => position.init_attacks::<Black>()?,
        }
        position.hash = position.calculate_hash();
        Ok(position)
    }

    fn init_attacks<T: TypeColor>(&mut self) -> Result<(), PositionError> {
        let (attacks, check_mask) = self.attacks_info::<T::Other>();
        self.sides[T::Other::INDEX].attacks = attacks;
        self.sides[T::INDEX].check_mask = check_mask;

        let (attacks, check_mask) = self.attacks_info::<T>();
        if check_mask != BitBoard::FULL {
            return Err(PositionError::OpponentInCheck);
        }
        self.sides[T::INDEX].attacks = attacks;
        self.set_pins::<T>();
        Ok(())
    }

    pub fn fen(&self) -> String {
        let mut fen = String::new();
        for rank in (0..8).rev() {
            let mut empty = 0;
            for file in 0..8 {
                match self.piece_on(Square::from_rank_file(rank, file)) {
                    Some((piece, color)) => {
                        if empty > 0 {
                            fen.push_str(&empty.to_string());
                            empty = 0;
                        }
                        fen.push(piece.to_char(color));
                    }
                    None => empty += 1,
                }
            }
            if empty > 0 {
                fen.push_str(&empty.to_string());
            }
            if rank > 0 {
                fen.push('/');
            }
        }

        fen.push_str(match self.side_to_move {
            Color::White => " w ",
            Color::Black => " b ",
        });

        let mut castling = String::new();
        for (color, symbols) in [(Color::White, ['K', 'Q']), (Color::Black, ['k', 'q'])] {
            let rights = self.sides[color].castling;
            if rights[CastlingIndex::Kingside] {
                castling.push(symbols[0]);
            }
            if rights[CastlingIndex::Queenside] {
                castling.push(symbols[1]);
            }
        }
        if castling.is_empty() {
            castling.push('-');
        }
        fen.push_str(&castling);

        match self.us().ep_target {
            Some(square) => fen.push_str(&format!(" {square} ")),
            None => fen.push_str(" - "),
        }
        fen.push_str(&format!("{} {}", self.halfmove_clock, self.fullmove_number));
        fen
    }

}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use super::*;
    use crate::board::START_FEN;

    #[test]
    fn fen_round_trips() -> Result<(), Box<dyn Error>> {
        let tables = Tables::embedded()?;
        for fen in [
            START_FEN,
            "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
            "rnbqkbnr/ppp1pppp/8/8/3pP3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 3",
            "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 12 40",
        ] {
            let position = Position::from_fen(tables.clone(), fen)?;
            assert_eq!(position.fen(), fen);
            assert_eq!(position.hash(), position.calculate_hash());
        }
        Ok(())
    }

    #[test]
    fn clocks_are_optional() -> Result<(), Box<dyn Error>> {
        let position = Position::from_fen(Tables::embedded()?, "4k3/8/8/8/8/8/8/4K3 b - -")?;
        assert_eq!(position.halfmove_clock(), 0);
        assert_eq!(position.fullmove_number(), 1);
        assert_eq!(position.side_to_move(), Color::Black);
        Ok(())
    }

    #[test]
    fn malformed_fens_are_rejected() -> Result<(), Box<dyn Error>> {
        let tables = Tables::embedded()?;
        let parse = |fen: &str| Position::from_fen(tables.clone(), fen).map(|_| ());

        assert_eq!(parse("8/8/8 w - -"), Err(PositionError::BadRankCount(3)));
        assert_eq!(
            parse("4k3/8/8/8/8/8/8/4K2 w - -"),
            Err(PositionError::BadRank(8))
        );
        // digits alone overrun the rank long before the counter could wrap
        assert_eq!(
            parse("88888888888888888888888888888888/8/8/8/8/8/8/4K2k w - - 0 1"),
            Err(PositionError::BadRank(1))
        );
        assert_eq!(
            parse("4k3/8/8/8/8/8/8/4K44 w - -"),
            Err(PositionError::BadRank(8))
        );
        assert_eq!(
            parse("4k3/8/8/8/8/8/8/4X3 w - -"),
            Err(PositionError::InvalidPiece('X'))
        );
        assert_eq!(
            parse("8/8/8/8/8/8/8/4K3 w - -"),
            Err(PositionError::KingCount {
                color: Color::Black,
                count: 0
            })
        );
        assert_eq!(
            parse("P3k3/8/8/8/8/8/8/4K3 w - -"),
            Err(PositionError::PawnOnBackRank)
        );
        assert!(matches!(
            parse("4k3/8/8/8/8/8/8/4K3 x - -"),
            Err(PositionError::InvalidSideToMove(_))
        ));
        assert_eq!(
            parse("4k3/8/8/8/8/8/8/4K3 w"),
            Err(PositionError::MissingField("castling"))
        );
        assert!(matches!(
            parse("4k3/8/8/8/8/8/8/4K3 w - - zero 1"),
            Err(PositionError::InvalidClock(_))
        ));
        Ok(())
    }

    #[test]
    fn inconsistent_rights_are_rejected() -> Result<(), Box<dyn Error>> {
        let tables = Tables::embedded()?;
        let parse = |fen: &str| Position::from_fen(tables.clone(), fen).map(|_| ());

        // king not on e1
        assert!(matches!(
            parse("4k3/8/8/8/8/8/8/R2K3R w KQ -"),
            Err(PositionError::InvalidCastling(_))
        ));
        // rook missing from h8
        assert!(matches!(
            parse("r3k3/8/8/8/8/8/8/4K3 w k -"),
            Err(PositionError::InvalidCastling(_))
        ));
        // no black pawn on e5 for a white capture onto e6
        assert!(matches!(
            parse("4k3/8/8/8/8/8/8/4K3 w - e6"),
            Err(PositionError::InvalidEnPassant(_))
        ));
        // wrong rank for the side to move
        assert!(matches!(
            parse("4k3/8/8/4p3/8/8/8/4K3 w - e3"),
            Err(PositionError::InvalidEnPassant(_))
        ));
        assert_eq!(
            parse("4k3/8/8/8/8/8/8/4K2R w - -"),
            Ok(())
        );
        // white to move with the black king on the open e-file
        assert_eq!(
            parse("4k3/8/8/8/8/8/8/4R1K1 w - -"),
            Err(PositionError::OpponentInCheck)
        );
        Ok(())
    }

    #[test]
    fn ep_target_belongs_to_capturing_side() -> Result<(), Box<dyn Error>> {
        let position = Position::from_fen(
            Tables::embedded()?,
            "rnbqkbnr/ppp1pppp/8/8/3pP3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 3",
        )?;
        assert_eq!(position.side(Color::Black).ep_target, Square::from_coord("e3"));
        assert_eq!(position.side(Color::White).ep_target, None);
        Ok(())
    }
}
