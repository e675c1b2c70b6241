use crate::moves::{Move, MoveList};

pub const BUCKET_SIZE: usize = 5;
const MIB: usize = 1024 * 1024;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum NodeType {
    #[default]
    Invalid,
    Exact,
    UpperBound,
    LowerBound,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TTEntry {
    /// Upper half of the position hash; the lower half picks the bucket.
    pub tag: u32,
    pub best_move: Move,
    pub depth: u8,
    pub node_type: NodeType,
    pub eval: i16,
    /// Search generation this entry was last stored or hit in.
    pub generation: u8,
    pub num_pieces: u8,
}

#[derive(Clone, Copy, Default)]
#[repr(align(64))]
struct Bucket {
    entries: [TTEntry; BUCKET_SIZE],
    used: u8,
    last_gen_checked: u8,
    smallest_depth_index: u8,
}

impl Bucket {
    fn update_smallest_depth(&mut self) {
        let mut smallest = u8::MAX;
        for (i, entry) in self.entries.iter().enumerate() {
            if entry.depth < smallest {
                smallest = entry.depth;
                self.smallest_depth_index = i as u8;
            }
        }
    }
}

/// Location of a probed entry, valid until the next store into its bucket.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EntryHandle {
    bucket: usize,
    slot: u8,
}

/// Bucketed transposition table.
///
/// Entries are never cleared between searches. Instead they age out: an entry
/// holding more pieces than the current root can never be reached again, and
/// one not touched for two generations probably won't be.
pub struct TranspositionTable {
    table: Vec<Bucket>,
    mask: usize,
    root_pieces: u8,
    generation: u8,
    last_generation_searched: u8,
}

impl TranspositionTable {
    pub fn new(size_mb: usize) -> Self {
        let mut length = size_mb * MIB / std::mem::size_of::<Bucket>();
        // round down to a power of two so the hash can be masked
        length = match length {
            0 => 1,
            n => 1 << (usize::BITS - 1 - n.leading_zeros()),
        };
        Self {
            table: vec![Bucket::default(); length],
            mask: length - 1,
            root_pieces: 32,
            generation: 1,
            last_generation_searched: 1,
        }
    }

    pub fn resize(&mut self, size_mb: usize) {
        *self = Self::new(size_mb);
    }

    pub fn clear(&mut self) {
        self.table.fill(Bucket::default());
        self.generation = 1;
        self.last_generation_searched = 1;
    }

    pub fn len(&self) -> usize {
        self.table.len() * BUCKET_SIZE
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn generation(&self) -> u8 {
        self.generation
    }

    /// Starts a search from a root with `num_pieces` pieces. The generation
    /// only advances if the previous generation stored anything.
    pub fn set_root(&mut self, num_pieces: u8) {
        if self.last_generation_searched == self.generation {
            self.generation = self.generation.wrapping_add(1);
        }
        self.root_pieces = num_pieces;
    }

    #[inline(always)]
    fn index(&self, hash: u64) -> usize {
        hash as usize & self.mask
    }

    /// Finds the entry for `hash` whose move is in the legal move list and
    /// marks it as used in this generation.
    pub fn probe(
        &mut self,
        hash: u64,
        num_pieces: u8,
        moves: &MoveList,
    ) -> Option<(EntryHandle, TTEntry)> {
        let index = self.index(hash);
        let tag = (hash >> 32) as u32;
        let generation = self.generation;
        let bucket = &mut self.table[index];
        let used = bucket.used as usize;

        for (slot, entry) in bucket.entries[..used].iter_mut().enumerate() {
            if entry.tag == tag && entry.num_pieces == num_pieces && moves.contains(entry.best_move) {
                entry.generation = generation;
                let handle = EntryHandle {
                    bucket: index,
                    slot: slot as u8,
                };
                return Some((handle, *entry));
            }
        }
        None
    }

    pub fn entry_mut(&mut self, handle: EntryHandle) -> &mut TTEntry {
        &mut self.table[handle.bucket].entries[handle.slot as usize]
    }

    /// Stores a search result. `handle` is the entry returned by the probe at
    /// the same node, if any. Null moves are never stored.
    #[allow(clippy::too_many_arguments)]
    pub fn store(
        &mut self,
        hash: u64,
        best_move: Move,
        depth: u8,
        node_type: NodeType,
        eval: i16,
        num_pieces: u8,
        handle: Option<EntryHandle>,
    ) {
        if best_move.is_null() {
            return;
        }
        self.last_generation_searched = self.generation;

        let index = self.index(hash);
        let tag = (hash >> 32) as u32;
        let generation = self.generation;
        let root_pieces = self.root_pieces;
        let new = TTEntry {
            tag,
            best_move,
            depth,
            node_type,
            eval,
            generation,
            num_pieces,
        };
        let bucket = &mut self.table[index];
        let used = bucket.used as usize;

        // never keep two entries for one position
        let existing = handle
            .filter(|h| h.bucket == index && bucket.entries[h.slot as usize].tag == tag)
            .map(|h| h.slot as usize)
            .or_else(|| {
                bucket.entries[..used]
                    .iter()
                    .position(|e| e.tag == tag && e.num_pieces == num_pieces)
            });
        if let Some(slot) = existing {
            let old = bucket.entries[slot];
            if depth > old.depth
                || (depth == old.depth
                    && node_type == NodeType::Exact
                    && old.node_type != NodeType::Exact)
            {
                bucket.entries[slot] = new;
                bucket.update_smallest_depth();
            }
            return;
        }

        if used < BUCKET_SIZE {
            bucket.entries[used] = new;
            bucket.used += 1;
            if bucket.used as usize == BUCKET_SIZE {
                bucket.update_smallest_depth();
            }
            return;
        }

        if bucket.last_gen_checked != generation {
            let stale = bucket.entries.iter().position(|e| {
                e.num_pieces > root_pieces || generation.wrapping_sub(e.generation) >= 2
            });
            if let Some(slot) = stale {
                bucket.entries[slot] = new;
                bucket.update_smallest_depth();
                return;
            }
            bucket.last_gen_checked = generation;
        }

        bucket.entries[bucket.smallest_depth_index as usize] = new;
        bucket.update_smallest_depth();
    }

    /// Permille of sampled slots holding an entry from this generation.
    pub fn hashfull(&self) -> usize {
        let sample = self.table.len().min(200);
        let filled = self.table[..sample]
            .iter()
            .flat_map(|bucket| bucket.entries[..bucket.used as usize].iter())
            .filter(|e| e.generation == self.generation)
            .count();
        filled * 1000 / (sample * BUCKET_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use tempo_bitboards::Square;

    use super::*;
    use crate::board::Position;
    use crate::moves::MoveFlag;
    use crate::Tables;

    fn some_move() -> Move {
        Move::new(MoveFlag::KnightMove, Square::G1, Square::from_bits(21))
    }

    /// Hashes that all land in bucket 0 with distinct tags.
    fn colliding(n: u64) -> u64 {
        (n + 1) << 32
    }

    fn depths_in(tt: &TranspositionTable, bucket: usize) -> Vec<u8> {
        let mut depths = tt.table[bucket].entries.iter().map(|e| e.depth).collect::<Vec<_>>();
        depths.sort();
        depths
    }

    #[test]
    fn size_is_a_power_of_two() {
        let tt = TranspositionTable::new(3);
        assert!(tt.table.len().is_power_of_two());
        assert!(tt.table.len() * std::mem::size_of::<Bucket>() <= 3 * MIB);
        assert_eq!(std::mem::size_of::<Bucket>(), 64);
        assert_eq!(TranspositionTable::new(0).table.len(), 1);
    }

    #[test]
    fn lookups_require_legal_move_and_piece_count() -> Result<(), Box<dyn Error>> {
        let position = Position::start(Tables::embedded()?);
        let moves = position.legal_moves();
        let legal = moves[0];
        let mut tt = TranspositionTable::new(1);

        tt.store(position.hash(), legal, 4, NodeType::Exact, 25, 32, None);
        let (_, entry) = tt.probe(position.hash(), 32, &moves).ok_or("entry missing")?;
        assert_eq!(entry.best_move, legal);
        assert_eq!(entry.eval, 25);
        assert!(tt.probe(position.hash(), 31, &moves).is_none());

        // a tag collision with a move that is illegal here is a miss
        let other = position.hash() ^ 0xFFFF_0000_0000_0000;
        tt.store(other, some_move(), 4, NodeType::Exact, 25, 32, None);
        let mut empty = MoveList::new();
        empty.push(legal);
        assert!(tt.probe(other, 32, &empty).is_none());
        empty.push(some_move());
        assert!(tt.probe(other, 32, &empty).is_some());
        Ok(())
    }

    #[test]
    fn null_moves_are_not_stored() {
        let mut tt = TranspositionTable::new(1);
        tt.store(colliding(0), Move::null(), 4, NodeType::Exact, 0, 32, None);
        assert_eq!(tt.table[0].used, 0);
    }

    #[test]
    fn same_position_keeps_the_deeper_result() {
        let mut tt = TranspositionTable::new(1);
        let hash = colliding(0);
        tt.store(hash, some_move(), 6, NodeType::LowerBound, 10, 32, None);
        tt.store(hash, some_move(), 4, NodeType::Exact, 20, 32, None);
        assert_eq!(tt.table[0].used, 1);
        assert_eq!(tt.table[0].entries[0].depth, 6);

        tt.store(hash, some_move(), 6, NodeType::Exact, 30, 32, None);
        assert_eq!(tt.table[0].entries[0].node_type, NodeType::Exact);
        assert_eq!(tt.table[0].entries[0].eval, 30);

        tt.store(hash, some_move(), 6, NodeType::UpperBound, 40, 32, None);
        assert_eq!(tt.table[0].entries[0].eval, 30);
        assert_eq!(tt.table[0].used, 1);
    }

    #[test]
    fn full_bucket_evicts_the_shallowest_entry() {
        let mut tt = TranspositionTable::new(1);
        tt.set_root(32);
        for (i, depth) in [7, 3, 9, 5, 8].into_iter().enumerate() {
            tt.store(colliding(i as u64), some_move(), depth, NodeType::Exact, 0, 32, None);
        }
        assert_eq!(depths_in(&tt, 0), vec![3, 5, 7, 8, 9]);

        // first overflow in a generation scans for stale entries, finds none
        tt.store(colliding(10), some_move(), 6, NodeType::Exact, 0, 32, None);
        assert_eq!(depths_in(&tt, 0), vec![5, 6, 7, 8, 9]);
        tt.store(colliding(11), some_move(), 1, NodeType::Exact, 0, 32, None);
        assert_eq!(depths_in(&tt, 0), vec![1, 6, 7, 8, 9]);
        tt.store(colliding(12), some_move(), 2, NodeType::Exact, 0, 32, None);
        assert_eq!(depths_in(&tt, 0), vec![2, 6, 7, 8, 9]);
    }

    #[test]
    fn unreachable_and_stale_entries_go_first() {
        let mut tt = TranspositionTable::new(1);
        tt.set_root(32);
        for i in 0..5 {
            let pieces = if i == 2 { 30 } else { 20 };
            tt.store(colliding(i), some_move(), 10 + i as u8, NodeType::Exact, 0, pieces, None);
        }

        // the root lost pieces: the 30 piece entry can never be reached
        tt.set_root(24);
        tt.store(colliding(7), some_move(), 1, NodeType::Exact, 0, 24, None);
        assert_eq!(tt.table[0].entries[2].tag, colliding(7) as u32);
        assert_eq!(tt.table[0].entries[2].depth, 1);

        // two generations later everything untouched is stale, even deep entries
        tt.set_root(24);
        tt.store(colliding(8), some_move(), 1, NodeType::Exact, 0, 24, None);
        tt.set_root(24);
        tt.store(colliding(9), some_move(), 1, NodeType::Exact, 0, 24, None);
        assert!(tt.table[0].entries.iter().any(|e| e.tag == colliding(9) as u32));
        assert!(tt.table[0].entries.iter().any(|e| e.tag == colliding(8) as u32));
    }

    #[test]
    fn generation_only_advances_after_a_store() {
        let mut tt = TranspositionTable::new(1);
        let start = tt.generation();
        tt.set_root(32);
        assert_eq!(tt.generation(), start.wrapping_add(1));
        tt.set_root(32);
        assert_eq!(tt.generation(), start.wrapping_add(1));
        tt.store(colliding(0), some_move(), 1, NodeType::Exact, 0, 32, None);
        tt.set_root(32);
        assert_eq!(tt.generation(), start.wrapping_add(2));
    }
}
