use tempo_bitboards::BitBoard;

pub const A_FILE: BitBoard = BitBoard(0x0101010101010101);
pub const H_FILE: BitBoard = BitBoard(0x8080808080808080);
pub const NOT_A_FILE: BitBoard = BitBoard(!0x0101010101010101);
pub const NOT_A_B_FILES: BitBoard = BitBoard(!0x0303030303030303);
pub const NOT_H_FILE: BitBoard = BitBoard(!0x8080808080808080);
pub const NOT_G_H_FILES: BitBoard = BitBoard(!0xC0C0C0C0C0C0C0C0);

pub const FIRST_RANK: BitBoard = BitBoard(0x00000000000000FF);
pub const SECOND_RANK: BitBoard = BitBoard(0x000000000000FF00);
pub const THIRD_RANK: BitBoard = BitBoard(0x0000000000FF0000);
pub const FOURTH_RANK: BitBoard = BitBoard(0x00000000FF000000);
pub const FIFTH_RANK: BitBoard = BitBoard(0x000000FF00000000);
pub const SIXTH_RANK: BitBoard = BitBoard(0x0000FF0000000000);
pub const SEVENTH_RANK: BitBoard = BitBoard(0x00FF000000000000);
pub const EIGHTH_RANK: BitBoard = BitBoard(0xFF00000000000000);

// a1 is dark
pub const LIGHT_SQUARES: BitBoard = BitBoard(0x55AA55AA55AA55AA);
pub const DARK_SQUARES: BitBoard = BitBoard(!0x55AA55AA55AA55AA);
