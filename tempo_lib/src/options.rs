#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SearchOptions {
    pub tt_size_mb: usize,
    pub max_depth: u8,
    pub nmp_depth: i8,
    pub nmp_reduction: i8,
    /// Every move gets a full window at or below this depth.
    pub pvs_fulldepth: i8,
    pub lmr_depth: i8,
    pub lmr_protected_moves: usize,
    /// Move index up to which a reduction of one ply applies.
    pub lmr_light_moves: usize,
    /// Move index up to which a reduction of two plies applies. Later moves
    /// keep a third of the depth.
    pub lmr_medium_moves: usize,
}

pub const TT_SIZE_MB: usize = 16;
pub const MAX_DEPTH: u8 = 64;
pub const NMP_DEPTH: i8 = 3;
pub const NMP_REDUCTION: i8 = 3;
pub const PVS_FULLDEPTH: i8 = 4;
pub const LMR_DEPTH: i8 = 3;
pub const LMR_PROTECTED_MOVES: usize = 2;
pub const LMR_LIGHT_MOVES: usize = 3;
pub const LMR_MEDIUM_MOVES: usize = 6;

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            tt_size_mb: TT_SIZE_MB,
            max_depth: MAX_DEPTH,
            nmp_depth: NMP_DEPTH,
            nmp_reduction: NMP_REDUCTION,
            pvs_fulldepth: PVS_FULLDEPTH,
            lmr_depth: LMR_DEPTH,
            lmr_protected_moves: LMR_PROTECTED_MOVES,
            lmr_light_moves: LMR_LIGHT_MOVES,
            lmr_medium_moves: LMR_MEDIUM_MOVES,
        }
    }
}
