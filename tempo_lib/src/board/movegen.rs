use tempo_bitboards::{BitBoard, Square};
use tempo_pregen::{NOT_A_FILE, NOT_H_FILE};

use super::{Pin, Position};
use crate::error::MoveError;
use crate::moves::{Move, MoveFlag, MoveList};
use crate::types::{Black, CastlingIndex, Color, Piece::*, TypeColor, TypeMoveGen, White};

const KINGSIDE_EMPTY: BitBoard = BitBoard(0b0110_0000);
const KINGSIDE_SAFE: BitBoard = BitBoard(0b0110_0000);
const QUEENSIDE_EMPTY: BitBoard = BitBoard(0b0000_1110);
const QUEENSIDE_SAFE: BitBoard = BitBoard(0b0000_1100);

#[inline(always)]
fn push_moves(list: &mut MoveList, flag: MoveFlag, from: Square, targets: BitBoard) {
    for to in targets {
        list.push(Move::new(flag, from, to));
    }
}

#[inline(always)]
fn push_pawn_move<T: TypeColor>(list: &mut MoveList, from: Square, to: Square) {
    if T::PROMOTION_RANK.contains(to) {
        for flag in MoveFlag::PROMOTIONS {
            list.push(Move::new(flag, from, to));
        }
    } else {
        list.push(Move::new(MoveFlag::PawnMove, from, to));
    }
}

#[inline(always)]
fn pawn_attack_set<T: TypeColor>(pawns: BitBoard) -> BitBoard {
    if T::WHITE {
        ((pawns << 9) & NOT_A_FILE) | ((pawns << 7) & NOT_H_FILE)
    } else {
        ((pawns >> 7) & NOT_A_FILE) | ((pawns >> 9) & NOT_H_FILE)
    }
}

impl Position {
    /// Squares attacked by `color`'s pawns.
    pub fn pawn_attacks(&self, color: Color) -> BitBoard {
        let pawns = self.sides[color].pieces[Pawn];
        match color {
            Color::White => pawn_attack_set::<White>(pawns),
            Color::Black => pawn_attack_set::<Black>(pawns),
        }
    }

    /// Appends every legal move for the side to move, or only the legal
    /// captures for `Captures`.
    pub fn generate_moves<M: TypeMoveGen>(&self, list: &mut MoveList) {
        list.reset();
        match self.side_to_move {
            Color::White => self.generate_moves_for::<White, M>(list),
            Color::Black => self.generate_moves_for::<Black, M>(list),
        }
    }

    fn generate_moves_for<T: TypeColor, M: TypeMoveGen>(&self, list: &mut MoveList) {
        let tables = &self.tables.attacks;
        let us = &self.sides[T::INDEX];
        let them = &self.sides[T::Other::INDEX];
        let occupied = us.occupancy | them.occupancy;
        let king = us.king_square;
        let in_check = them.attacks.contains(king);

        let mut king_targets = tables.king(king) & !us.occupancy & !them.attacks;
        if M::CAPTURES {
            king_targets &= them.occupancy;
        }
        push_moves(list, MoveFlag::KingMove, king, king_targets);

        let check_mask = if in_check {
            us.check_mask
        } else {
            BitBoard::FULL
        };
        // double check: only the king can move
        if check_mask.is_empty() {
            return;
        }

        let mut targets = !us.occupancy & check_mask;
        if M::CAPTURES {
            targets &= them.occupancy;
        }

        for from in us.pieces[Pawn] {
            let pin_mask = us.pin_mask(from);
            let attacks = tables.pawn(T::INDEX, from);

            if !M::CAPTURES {
                let single = from.offset(T::PAWN_PUSH);
                if !occupied.contains(single) {
                    if (check_mask & pin_mask).contains(single) {
                        push_pawn_move::<T>(list, from, single);
                    }
                    if T::PAWN_START.contains(from) {
                        let double = single.offset(T::PAWN_PUSH);
                        if !occupied.contains(double) && (check_mask & pin_mask).contains(double)
                        {
                            list.push(Move::new(MoveFlag::DoublePush, from, double));
                        }
                    }
                }
            }

            for to in attacks & them.occupancy & check_mask & pin_mask {
                push_pawn_move::<T>(list, from, to);
            }

            if let Some(ep) = us.ep_target {
                if attacks.contains(ep) && self.en_passant_is_legal::<T>(from, ep, check_mask) {
                    list.push(Move::new(MoveFlag::EnPassant, from, ep));
                }
            }
        }

        // a pinned knight can never stay on its pin line
        for from in us.pieces[Knight] {
            if us.pin(from).is_none() {
                push_moves(list, MoveFlag::KnightMove, from, tables.knight(from) & targets);
            }
        }

        for from in us.pieces[Bishop] {
            let moves = tables.bishop(from, occupied) & targets & us.pin_mask(from);
            push_moves(list, MoveFlag::BishopMove, from, moves);
        }
        for from in us.pieces[Rook] {
            let moves = tables.rook(from, occupied) & targets & us.pin_mask(from);
            push_moves(list, MoveFlag::RookMove, from, moves);
        }
        for from in us.pieces[Queen] {
            let moves = tables.queen(from, occupied) & targets & us.pin_mask(from);
            push_moves(list, MoveFlag::QueenMove, from, moves);
        }

        if M::CAPTURES || in_check {
            return;
        }
        if us.castling[CastlingIndex::Kingside]
            && (occupied & (KINGSIDE_EMPTY << T::BACK_RANK as u64)).is_empty()
            && (them.attacks & (KINGSIDE_SAFE << T::BACK_RANK as u64)).is_empty()
        {
            list.push(Move::new(MoveFlag::CastleKingside, king, king.offset(2)));
        }
        if us.castling[CastlingIndex::Queenside]
            && (occupied & (QUEENSIDE_EMPTY << T::BACK_RANK as u64)).is_empty()
            && (them.attacks & (QUEENSIDE_SAFE << T::BACK_RANK as u64)).is_empty()
        {
            list.push(Move::new(MoveFlag::CastleQueenside, king, king.offset(-2)));
        }
    }

    /// Both pawns leave their squares at once, which can open a line to the
    /// king that no pin record covers, so the capture is replayed on a scratch
    /// occupancy and the king re-tested against every enemy slider.
    fn en_passant_is_legal<T: TypeColor>(&self, from: Square, ep: Square, check_mask: BitBoard) -> bool {
        let captured = ep.offset(-T::PAWN_PUSH);
        if !(check_mask.contains(ep) || check_mask.contains(captured)) {
            return false;
        }

        let tables = &self.tables.attacks;
        let them = &self.sides[T::Other::INDEX];
        let king = self.sides[T::INDEX].king_square;
        let occupied =
            (self.occupied() ^ from.bitboard() ^ captured.bitboard()) | ep.bitboard();

        (tables.bishop(king, occupied) & them.diagonal_sliders()).is_empty()
            && (tables.rook(king, occupied) & them.orthogonal_sliders()).is_empty()
    }

    /// Attack set of `T` and the check mask it imposes on the other side's king.
    pub(crate) fn attacks_info<T: TypeColor>(&self) -> (BitBoard, BitBoard) {
        let tables = &self.tables.attacks;
        let us = &self.sides[T::INDEX];
        let enemy_king = self.sides[T::Other::INDEX].king_square;
        // sliders see through the king so it cannot step back along a checking ray
        let occupied = self.occupied() ^ enemy_king.bitboard();

        let mut checkers = 0;
        let mut check_mask = BitBoard::EMPTY;

        let mut attacks = pawn_attack_set::<T>(us.pieces[Pawn]);
        for square in tables.pawn(T::Other::INDEX, enemy_king) & us.pieces[Pawn] {
            checkers += 1;
            check_mask = square.bitboard();
        }

        for square in us.pieces[Knight] {
            attacks |= tables.knight(square);
        }
        for square in tables.knight(enemy_king) & us.pieces[Knight] {
            checkers += 1;
            check_mask = square.bitboard();
        }

        for square in us.diagonal_sliders() {
            let slider = tables.bishop(square, occupied);
            attacks |= slider;
            if slider.contains(enemy_king) {
                checkers += 1;
                check_mask = tables.diagonal_ray(square, enemy_king);
            }
        }
        for square in us.orthogonal_sliders() {
            let slider = tables.rook(square, occupied);
            attacks |= slider;
            if slider.contains(enemy_king) {
                checkers += 1;
                check_mask = tables.orthogonal_ray(square, enemy_king);
            }
        }

        attacks |= tables.king(us.king_square);

        let check_mask = match checkers {
            0 => BitBoard::FULL,
            1 => check_mask,
            _ => BitBoard::EMPTY,
        };
        (attacks, check_mask)
    }

    /// Records the pins on `T`'s pieces, tagged with the current move id.
    pub(crate) fn set_pins<T: TypeColor>(&mut self) {
        let Position { sides, tables, .. } = self;
        let tables = &tables.attacks;
        let (us, them) = if T::WHITE {
            let (white, black) = sides.split_at_mut(1);
            (&mut white[0], &black[0])
        } else {
            let (white, black) = sides.split_at_mut(1);
            (&mut black[0], &white[0])
        };
        let king = us.king_square;

        let mut record = |pinner: Square, ray: BitBoard, diagonal: bool| {
            let blockers = ray & us.occupancy;
            if blockers.count_ones() == 1 && ray & them.occupancy == pinner.bitboard() {
                us.pins[blockers.first_square()] = Pin {
                    diagonal,
                    pinner,
                    allowed: ray,
                    move_id: us.move_id,
                };
            }
        };

        for pinner in them.diagonal_sliders() {
            record(pinner, tables.diagonal_ray(pinner, king), true);
        }
        for pinner in them.orthogonal_sliders() {
            record(pinner, tables.orthogonal_ray(pinner, king), false);
        }
    }

    /// Finds the legal move written as `text` in long algebraic notation.
    pub fn parse_move(&self, text: &str) -> Result<Move, MoveError> {
        let text = text.trim();
        let (from, to) = match (text.get(0..2), text.get(2..4)) {
            (Some(from), Some(to)) => (Square::from_coord(from), Square::from_coord(to)),
            _ => return Err(MoveError::Unparsable(text.to_string())),
        };
        let (Some(from), Some(to)) = (from, to) else {
            return Err(MoveError::Unparsable(text.to_string()));
        };
        let promotion = match text.get(4..) {
            None | Some("") => None,
            Some("n") => Some(Knight),
            Some("b") => Some(Bishop),
            Some("r") => Some(Rook),
            Some("q") => Some(Queen),
            Some(_) => return Err(MoveError::Unparsable(text.to_string())),
        };

        self.legal_moves()
            .iter()
            .find(|mv| mv.from() == from && mv.to() == to && mv.promotion() == promotion)
            .ok_or_else(|| MoveError::Illegal(text.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use super::*;
    use crate::types::Captures;
    use crate::Tables;

    fn moves_of(fen: &str) -> Result<(Position, Vec<String>), Box<dyn Error>> {
        let position = Position::from_fen(Tables::embedded()?, fen)?;
        let mut moves = position.legal_moves().iter().map(|m| m.coords()).collect::<Vec<_>>();
        moves.sort();
        Ok((position, moves))
    }

    #[test]
    fn double_check_allows_only_king_moves() -> Result<(), Box<dyn Error>> {
        // rook on e8 and bishop on b4 both check the king on e1
        let (position, moves) = moves_of("4r1k1/8/8/8/1b6/8/5P2/R3K2N w - - 0 1")?;
        assert!(position.in_check());
        assert!(position.us().check_mask.is_empty());
        for mv in position.legal_moves().iter() {
            assert_eq!(mv.piece(), King, "{mv}");
        }
        assert_eq!(moves, vec!["e1d1", "e1f1"]);
        Ok(())
    }

    #[test]
    fn single_check_moves_land_on_check_mask() -> Result<(), Box<dyn Error>> {
        let (position, moves) = moves_of("4k3/8/8/8/8/3n4/8/R2QK1NR w - - 0 1")?;
        assert!(position.in_check());
        let mask = position.us().check_mask;
        assert_eq!(mask, Square::from_coord("d3").unwrap().bitboard());
        for mv in position.legal_moves().iter() {
            if mv.piece() != King {
                assert!(mask.contains(mv.to()), "{mv}");
            }
        }
        assert!(moves.contains(&"d1d3".to_string()));
        Ok(())
    }

    #[test]
    fn blocking_a_slider_check() -> Result<(), Box<dyn Error>> {
        // the a5 queen checks along a5-e1; the rook and knight can only interpose
        let (_, moves) = moves_of("4k3/8/8/q7/8/8/7R/1N2K3 w - - 0 1")?;
        let blocks = moves
            .iter()
            .filter(|m| !m.starts_with("e1"))
            .cloned()
            .collect::<Vec<_>>();
        assert_eq!(blocks, vec!["b1c3", "b1d2", "h2d2"]);
        assert!(!moves.contains(&"e1d2".to_string()));
        Ok(())
    }

    #[test]
    fn en_passant_horizontal_pin_is_rejected() -> Result<(), Box<dyn Error>> {
        let (_, moves) = moves_of("8/8/8/KPp4r/8/8/8/7k w - c6 0 1")?;
        assert!(!moves.contains(&"b5c6".to_string()));
        assert!(moves.contains(&"b5b6".to_string()));
        Ok(())
    }

    #[test]
    fn en_passant_without_pin_is_generated() -> Result<(), Box<dyn Error>> {
        let (_, moves) = moves_of("8/8/8/1Pp4r/K7/8/8/7k w - c6 0 1")?;
        assert!(moves.contains(&"b5c6".to_string()));
        Ok(())
    }

    #[test]
    fn en_passant_captures_the_checking_pawn() -> Result<(), Box<dyn Error>> {
        // the pawn that just double pushed to d5 gives check
        let (position, moves) = moves_of("8/8/8/2Pp4/4K3/8/8/k7 w - d6 0 1")?;
        assert!(position.in_check());
        assert!(moves.contains(&"c5d6".to_string()));
        Ok(())
    }

    #[test]
    fn pinned_pieces_stay_on_their_line() -> Result<(), Box<dyn Error>> {
        // the e2 knight is pinned by the e8 rook, the d2 bishop by the b4 bishop
        let (position, moves) = moves_of("4r1k1/8/8/8/1b6/8/3BN3/4K3 w - - 0 1")?;
        assert!(position.us().pin(Square::from_coord("e2").unwrap()).is_some());
        let pin = position.us().pin(Square::from_coord("d2").unwrap()).copied();
        assert!(pin.is_some_and(|p| p.diagonal));
        assert!(moves.iter().all(|m| !m.starts_with("e2")));
        let bishop_moves = moves.iter().filter(|m| m.starts_with("d2")).collect::<Vec<_>>();
        assert_eq!(bishop_moves, vec!["d2b4", "d2c3"]);
        Ok(())
    }

    #[test]
    fn castling_requires_safe_transit() -> Result<(), Box<dyn Error>> {
        let (_, moves) = moves_of("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1")?;
        assert!(moves.contains(&"e1g1".to_string()));
        assert!(moves.contains(&"e1c1".to_string()));

        // f1 is attacked, so no kingside castling; b1 attacked does not stop queenside
        let (_, moves) = moves_of("r3k2r/8/8/8/8/8/5r2/R3K2R w KQ - 0 1")?;
        assert!(!moves.contains(&"e1g1".to_string()));

        let (_, moves) = moves_of("1r2k3/8/8/8/8/8/8/R3K3 w Q - 0 1")?;
        assert!(moves.contains(&"e1c1".to_string()));
        Ok(())
    }

    #[test]
    fn promotions_enumerate_four_pieces() -> Result<(), Box<dyn Error>> {
        let (_, moves) = moves_of("1n2k3/P7/8/8/8/8/8/4K3 w - - 0 1")?;
        for suffix in ["q", "r", "b", "n"] {
            assert!(moves.contains(&format!("a7a8{suffix}")));
            assert!(moves.contains(&format!("a7b8{suffix}")));
        }
        Ok(())
    }

    #[test]
    fn captures_generator_matches_full_list() -> Result<(), Box<dyn Error>> {
        let position = Position::from_fen(
            Tables::embedded()?,
            "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
        )?;
        let mut captures = MoveList::new();
        position.generate_moves::<Captures>(&mut captures);
        let expected = position
            .legal_moves()
            .iter()
            .filter(|&mv| position.is_capture(mv))
            .count();
        assert_eq!(captures.len(), expected);
        assert!(captures.iter().all(|mv| position.is_capture(mv)));
        Ok(())
    }

    #[test]
    fn parse_move_finds_legal_moves() -> Result<(), Box<dyn Error>> {
        let position = Position::start(Tables::embedded()?);
        let mv = position.parse_move("e2e4")?;
        assert_eq!(mv.flag(), MoveFlag::DoublePush);
        assert!(matches!(position.parse_move("e2e5"), Err(MoveError::Illegal(_))));
        assert!(matches!(position.parse_move("zz"), Err(MoveError::Unparsable(_))));
        Ok(())
    }
}
