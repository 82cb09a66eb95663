//! Zobrist hashing keys for position identification.

use crate::board::{Board, MAX_BOARD_SIZE};
use crate::location::Loc;
use crate::sign::Sign;

const CELLS: usize = MAX_BOARD_SIZE * MAX_BOARD_SIZE;

/// One key per (cell, player). Indexed `[row * MAX_BOARD_SIZE + col][player]`.
static CELL_SIGN: [[u64; 2]; CELLS] = {
    let mut table = [[0u64; 2]; CELLS];
    let mut state = SEED;
    let mut cell = 0;
    while cell < CELLS {
        let mut player = 0;
        while player < 2 {
            let (val, next) = xorshift64(state);
            table[cell][player] = val;
            state = next;
            player += 1;
        }
        cell += 1;
    }
    table
};

const SEED: u64 = 0x474f_4d4f_4b55_2121; // "GOMOKU!!"

/// Xorshift64 PRNG. Returns (value, next_state).
const fn xorshift64(mut state: u64) -> (u64, u64) {
    state ^= state << 13;
    state ^= state >> 7;
    state ^= state << 17;
    (state, state)
}

/// Key toggled when `sign` occupies `loc`.
///
/// # Panics
///
/// Panics if `sign` is not a player sign.
#[inline]
pub fn key(loc: Loc, sign: Sign) -> u64 {
    CELL_SIGN[loc.row as usize * MAX_BOARD_SIZE + loc.col as usize][sign.player_index()]
}

/// Hash of a whole board: XOR of keys for every placed stone.
pub fn hash_board(board: &Board) -> u64 {
    let mut hash = 0u64;
    for loc in board.locations() {
        let sign = board.at(loc);
        if sign.is_stone() {
            hash ^= key(loc, sign);
        }
    }
    hash
}
