use tempo_bitboards::{BitBoard, Square};

use super::Position;
use crate::moves::{Move, MoveFlag};
use crate::types::{Black, CastlingIndex, Color, Piece, TypeColor, White};

/// Everything `unmake_move` needs to restore the position exactly.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct MoveInfo {
    pub captured: Option<Piece>,
    pub castling: [[bool; 2]; 2],
    pub ep_targets: [Option<Square>; 2],
    pub hash: u64,
    /// Mover's attack set before the move.
    pub attacks: BitBoard,
    /// Opponent's check mask before the move.
    pub check_mask: BitBoard,
    pub halfmove_clock: u16,
    pub fullmove_number: u16,
}

#[inline(always)]
fn rook_home<T: TypeColor>(castle: CastlingIndex) -> Square {
    match castle {
        CastlingIndex::Queenside => Square::from_bits(T::BACK_RANK as u16),
        CastlingIndex::Kingside => Square::from_bits(T::BACK_RANK as u16 + 7),
    }
}

#[inline(always)]
fn relative<T: TypeColor>(file: u16) -> Square {
    Square::from_bits(T::BACK_RANK as u16 + file)
}

impl Position {
    /// Plays a legal move. The returned record must be handed back to
    /// [`Position::unmake_move`] together with the same move.
    pub fn make_move(&mut self, mv: Move) -> MoveInfo {
        match self.side_to_move {
            Color::White => self.make_move_for::<White>(mv),
            Color::Black => self.make_move_for::<Black>(mv),
        }
    }

    pub fn unmake_move(&mut self, mv: Move, info: &MoveInfo) {
        match self.side_to_move {
            Color::White => self.unmake_move_for::<Black>(mv, info),
            Color::Black => self.unmake_move_for::<White>(mv, info),
        }
    }

    /// Passes the turn. Never call while in check.
    pub fn make_null_move(&mut self) -> MoveInfo {
        match self.side_to_move {
            Color::White => self.make_null_move_for::<White>(),
            Color::Black => self.make_null_move_for::<Black>(),
        }
    }

    pub fn unmake_null_move(&mut self, info: &MoveInfo) {
        match self.side_to_move {
            Color::White => self.unmake_null_move_for::<Black>(info),
            Color::Black => self.unmake_null_move_for::<White>(info),
        }
    }

    fn snapshot<T: TypeColor>(&self) -> MoveInfo {
        MoveInfo {
            captured: None,
            castling: [self.sides[0].castling, self.sides[1].castling],
            ep_targets: [self.sides[0].ep_target, self.sides[1].ep_target],
            hash: self.hash,
            attacks: self.sides[T::INDEX].attacks,
            check_mask: self.sides[T::Other::INDEX].check_mask,
            halfmove_clock: self.halfmove_clock,
            fullmove_number: self.fullmove_number,
        }
    }

    fn make_move_for<T: TypeColor>(&mut self, mv: Move) -> MoveInfo {
        debug_assert!(!mv.is_null());
        let mut info = self.snapshot::<T>();
        let (from, to) = (mv.from(), mv.to());
        let piece = mv.piece();

        // an unused en passant chance expires
        if let Some(ep) = self.sides[T::INDEX].ep_target.take() {
            self.hash ^= self.tables.zobrist.en_passant(ep);
        }

        match mv.flag() {
            MoveFlag::CastleKingside => {
                self.move_piece::<T>(Piece::King, from, to);
                self.move_piece::<T>(
                    Piece::Rook,
                    rook_home::<T>(CastlingIndex::Kingside),
                    relative::<T>(5),
                );
            }
            MoveFlag::CastleQueenside => {
                self.move_piece::<T>(Piece::King, from, to);
                self.move_piece::<T>(
                    Piece::Rook,
                    rook_home::<T>(CastlingIndex::Queenside),
                    relative::<T>(3),
                );
            }
            MoveFlag::EnPassant => {
                self.remove_piece::<T::Other>(Piece::Pawn, to.offset(-T::PAWN_PUSH));
                self.move_piece::<T>(Piece::Pawn, from, to);
                info.captured = Some(Piece::Pawn);
            }
            flag => {
                if let Some(victim) = self.sides[T::Other::INDEX].piece_on(to) {
                    self.remove_piece::<T::Other>(victim, to);
                    info.captured = Some(victim);
                    if victim == Piece::Rook {
                        for castle in [CastlingIndex::Queenside, CastlingIndex::Kingside] {
                            if to == rook_home::<T::Other>(castle) {
                                self.revoke_castling::<T::Other>(castle);
                            }
                        }
                    }
                }

                match mv.promotion() {
                    Some(promoted) => {
                        self.remove_piece::<T>(Piece::Pawn, from);
                        self.add_piece::<T>(promoted, to);
                    }
                    None => self.move_piece::<T>(piece, from, to),
                }

                if flag == MoveFlag::DoublePush {
                    let target = from.offset(T::PAWN_PUSH);
                    let capturers = self.tables.attacks.pawn(T::INDEX, target)
                        & self.sides[T::Other::INDEX].pieces[Piece::Pawn];
                    if capturers.is_not_empty() {
                        self.sides[T::Other::INDEX].ep_target = Some(target);
                        self.hash ^= self.tables.zobrist.en_passant(target);
                    }
                }
            }
        }

        match piece {
            Piece::King => {
                self.revoke_castling::<T>(CastlingIndex::Queenside);
                self.revoke_castling::<T>(CastlingIndex::Kingside);
            }
            Piece::Rook => {
                for castle in [CastlingIndex::Queenside, CastlingIndex::Kingside] {
                    if from == rook_home::<T>(castle) {
                        self.revoke_castling::<T>(castle);
                    }
                }
            }
            _ => {}
        }

        if info.captured.is_some() || piece == Piece::Pawn {
            self.halfmove_clock = 0;
        } else {
            self.halfmove_clock += 1;
        }
        if !T::WHITE {
            self.fullmove_number += 1;
        }

        self.finish_move::<T>();
        info
    }

    /// Shared tail of every make: refresh the mover's attacks and the
    /// opponent's check mask, hand over the turn and record the new pins.
    #[inline(always)]
    fn finish_move<T: TypeColor>(&mut self) {
        let (attacks, check_mask) = self.attacks_info::<T>();
        self.sides[T::INDEX].attacks = attacks;
        self.sides[T::Other::INDEX].check_mask = check_mask;

        self.side_to_move = T::Other::COLOR;
        self.hash ^= self.tables.zobrist.black_to_move();
        self.bump_move_ids();
        self.set_pins::<T::Other>();

        debug_assert_eq!(self.hash, self.calculate_hash());
    }

    fn unmake_move_for<T: TypeColor>(&mut self, mv: Move, info: &MoveInfo) {
        let (from, to) = (mv.from(), mv.to());

        match mv.flag() {
            MoveFlag::CastleKingside => {
                self.move_piece::<T>(Piece::King, to, from);
                self.move_piece::<T>(
                    Piece::Rook,
                    relative::<T>(5),
                    rook_home::<T>(CastlingIndex::Kingside),
                );
            }
            MoveFlag::CastleQueenside => {
                self.move_piece::<T>(Piece::King, to, from);
                self.move_piece::<T>(
                    Piece::Rook,
                    relative::<T>(3),
                    rook_home::<T>(CastlingIndex::Queenside),
                );
            }
            MoveFlag::EnPassant => {
                self.move_piece::<T>(Piece::Pawn, to, from);
                self.add_piece::<T::Other>(Piece::Pawn, to.offset(-T::PAWN_PUSH));
            }
            _ => {
                match mv.promotion() {
                    Some(promoted) => {
                        self.remove_piece::<T>(promoted, to);
                        self.add_piece::<T>(Piece::Pawn, from);
                    }
                    None => self.move_piece::<T>(mv.piece(), to, from),
                }
                if let Some(victim) = info.captured {
                    self.add_piece::<T::Other>(victim, to);
                }
            }
        }

        self.restore::<T>(info);
        self.halfmove_clock = info.halfmove_clock;
        self.fullmove_number = info.fullmove_number;
        self.bump_move_ids();
        self.set_pins::<T>();
    }

    fn restore<T: TypeColor>(&mut self, info: &MoveInfo) {
        for (side, (castling, ep_target)) in self
            .sides
            .iter_mut()
            .zip(info.castling.into_iter().zip(info.ep_targets))
        {
            side.castling = castling;
            side.ep_target = ep_target;
        }
        self.sides[T::INDEX].attacks = info.attacks;
        self.sides[T::Other::INDEX].check_mask = info.check_mask;
        self.side_to_move = T::COLOR;
        self.hash = info.hash;
    }

    fn make_null_move_for<T: TypeColor>(&mut self) -> MoveInfo {
        debug_assert!(!self.in_check());
        let info = self.snapshot::<T>();
        if let Some(ep) = self.sides[T::INDEX].ep_target.take() {
            self.hash ^= self.tables.zobrist.en_passant(ep);
        }
        self.finish_move::<T>();
        info
    }

    fn unmake_null_move_for<T: TypeColor>(&mut self, info: &MoveInfo) {
        self.restore::<T>(info);
        self.bump_move_ids();
        self.set_pins::<T>();
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use super::*;
    use crate::board::START_FEN;
    use crate::Tables;

    const FIXTURES: [&str; 5] = [
        START_FEN,
        "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
        "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
        "r3k2r/Pppp1ppp/1b3nbN/nP6/BBP1P3/q4N2/Pp1P2PP/R2Q1RK1 w kq - 0 1",
        "rnbq1k1r/pp1Pbppp/2p5/8/2B5/8/PPP1NnPP/RNBQK2R w KQ - 1 8",
    ];

    fn check_undo(position: &mut Position, depth: u8) {
        if depth == 0 {
            return;
        }
        for mv in position.legal_moves().iter() {
            let before = position.clone();
            let info = position.make_move(mv);
            assert_eq!(position.hash(), position.calculate_hash(), "{mv} from {before:?}");
            check_undo(position, depth - 1);
            position.unmake_move(mv, &info);
            assert_eq!(*position, before, "undo of {mv}");
        }
    }

    #[test]
    fn make_unmake_is_exact() -> Result<(), Box<dyn Error>> {
        let tables = Tables::embedded()?;
        for fen in FIXTURES {
            let mut position = Position::from_fen(tables.clone(), fen)?;
            check_undo(&mut position, 3);
        }
        Ok(())
    }

    #[test]
    fn null_move_round_trips() -> Result<(), Box<dyn Error>> {
        let tables = Tables::embedded()?;
        let mut position = Position::from_fen(
            tables,
            "rnbqkbnr/ppp1pppp/8/8/3pP3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 3",
        )?;
        let before = position.clone();
        let info = position.make_null_move();
        assert_eq!(position.side_to_move(), Color::White);
        assert_eq!(position.side(Color::Black).ep_target, None);
        assert_eq!(position.hash(), position.calculate_hash());
        assert_eq!(position.halfmove_clock(), before.halfmove_clock());
        position.unmake_null_move(&info);
        assert_eq!(position, before);
        Ok(())
    }

    #[test]
    fn castling_moves_the_rook_and_clears_rights() -> Result<(), Box<dyn Error>> {
        let mut position = Position::from_fen(
            Tables::embedded()?,
            "r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1",
        )?;
        let mv = position.parse_move("e1g1")?;
        position.make_move(mv);
        assert_eq!(position.fen(), "r3k2r/8/8/8/8/8/8/R4RK1 b kq - 1 1");

        // capturing the a1 rook takes away white's remaining right
        let mut position = Position::from_fen(
            Tables::embedded()?,
            "r3k2r/8/8/8/8/8/8/R3K2R b KQkq - 0 1",
        )?;
        let mv = position.parse_move("a8a1")?;
        let info = position.make_move(mv);
        assert_eq!(info.captured, Some(Piece::Rook));
        assert_eq!(position.fen(), "4k2r/8/8/8/8/8/8/r3K2R w Kk - 0 2");
        Ok(())
    }

    #[test]
    fn double_push_offers_en_passant_only_when_capturable() -> Result<(), Box<dyn Error>> {
        let tables = Tables::embedded()?;
        let mut position = Position::start(tables.clone());
        position.make_move(position.parse_move("e2e4")?);
        assert_eq!(position.side(Color::Black).ep_target, None);

        let mut position =
            Position::from_fen(tables, "4k3/8/8/8/3p4/8/4P3/4K3 w - - 0 1")?;
        position.make_move(position.parse_move("e2e4")?);
        assert_eq!(position.side(Color::Black).ep_target, Square::from_coord("e3"));
        let capture = position.parse_move("d4e3")?;
        assert_eq!(capture.flag(), MoveFlag::EnPassant);
        let info = position.make_move(capture);
        assert_eq!(info.captured, Some(Piece::Pawn));
        assert_eq!(position.fen(), "4k3/8/8/8/8/4p3/8/4K3 w - - 0 2");
        Ok(())
    }

    #[test]
    fn promotion_replaces_the_pawn() -> Result<(), Box<dyn Error>> {
        let mut position =
            Position::from_fen(Tables::embedded()?, "1n2k3/P7/8/8/8/8/8/4K3 w - - 0 1")?;
        let before = position.clone();
        let mv = position.parse_move("a7b8n")?;
        let info = position.make_move(mv);
        assert_eq!(position.fen(), "1N2k3/8/8/8/8/8/8/4K3 b - - 0 1");
        assert_eq!(position.side(Color::White).counts[Piece::Knight], 1);
        assert_eq!(position.side(Color::White).counts[Piece::Pawn], 0);
        position.unmake_move(mv, &info);
        assert_eq!(position, before);
        Ok(())
    }

    #[test]
    fn pins_survive_move_id_wraparound() -> Result<(), Box<dyn Error>> {
        let mut position = Position::from_fen(
            Tables::embedded()?,
            "4r1k1/8/8/8/1b6/8/3BN3/4K3 w - - 0 1",
        )?;
        // move the counters to the brink of wrapping, keeping the live pins tagged
        for side in position.sides.iter_mut() {
            let old = side.move_id;
            for pin in side.pins.iter_mut().filter(|pin| pin.move_id == old) {
                pin.move_id = u32::MAX - 1;
            }
            side.move_id = u32::MAX - 1;
        }
        let before = position.clone();

        let mv = position.parse_move("e1f1")?;
        let info = position.make_move(mv);
        assert_eq!(position.side(Color::White).move_id, u32::MAX);
        position.unmake_move(mv, &info);
        // wrapped: every record was reset and the counter restarted
        assert_eq!(position.side(Color::White).move_id, 1);
        assert_eq!(position, before);
        assert!(position.us().pin(Square::from_coord("e2").unwrap()).is_some());
        assert_eq!(position.legal_moves().len(), before.legal_moves().len());
        Ok(())
    }
}
