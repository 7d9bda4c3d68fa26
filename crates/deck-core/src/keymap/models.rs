//! Physical scan-order tables for every supported device model.
//!
//! Each table is indexed by **physical** key index (the order in which the
//! device reports and addresses its keys) and stores the **logical** key index
//! in the engine's row-major grid ([`crate::KEYS_PER_ROW`] columns wide).
//!
//! The tables are hardware facts, written out by hand rather than computed.
//! They are checked when the `*_MAP` constants are evaluated: a table with a
//! repeated or out-of-range logical index fails the build.

use super::KeyIndexMap;

/// 32-key emulator: 4 rows of 8, every row scanned right-to-left.
pub const EMULATOR_TABLE: [u8; 32] = [
    7, 6, 5, 4, 3, 2, 1, 0, //
    15, 14, 13, 12, 11, 10, 9, 8, //
    23, 22, 21, 20, 19, 18, 17, 16, //
    31, 30, 29, 28, 27, 26, 25, 24,
];

/// 15-key original: 3 rows of 5, right-to-left, occupying logical columns 0–4.
pub const ORIGINAL_TABLE: [u8; 15] = [
    4, 3, 2, 1, 0, //
    12, 11, 10, 9, 8, //
    20, 19, 18, 17, 16,
];

/// 6-key mini: 2 rows of 3, left-to-right, occupying logical columns 0–2.
pub const MINI_TABLE: [u8; 6] = [
    0, 1, 2, //
    8, 9, 10,
];

pub const EMULATOR_MAP: KeyIndexMap = KeyIndexMap::builtin(&EMULATOR_TABLE);
pub const ORIGINAL_MAP: KeyIndexMap = KeyIndexMap::builtin(&ORIGINAL_TABLE);
pub const MINI_MAP: KeyIndexMap = KeyIndexMap::builtin(&MINI_TABLE);
