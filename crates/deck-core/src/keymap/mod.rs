//! Key-index translation between a device's physical scan order and the
//! engine's logical grid.
//!
//! # Physical vs. logical (for beginners)
//!
//! The engine numbers its buttons row by row: key 0 is top-left, key 7 is the
//! end of the first row, key 8 starts the second row, and so on.  Devices
//! rarely agree.  The emulated 32-key device scans each row right-to-left, so
//! the key the user sees top-left reports itself as physical index 7.
//!
//! A [`KeyIndexMap`] holds both directions of that mapping as fixed-size
//! lookup tables, so translating a key press or an image position is a single
//! array index in either direction.
//!
//! # The `None` sentinel
//!
//! Lookups never panic.  An index outside `0..MAX_BUTTONS`, or a key the model
//! does not have (a 15-key device leaves 17 logical keys without a physical
//! counterpart), yields `None`.  Callers treat `None` as "ignore this key".

pub mod models;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::MAX_BUTTONS;

/// Reasons a physical → logical table is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum KeymapError {
    /// The table describes more physical keys than the engine can address.
    #[error("key table has {count} entries, at most {max} are addressable")]
    TooManyKeys { count: usize, max: usize },

    /// A physical key points outside the logical grid.
    #[error("physical key {physical} maps to logical key {logical}, outside 0..{max}")]
    LogicalOutOfRange {
        physical: usize,
        logical: usize,
        max: usize,
    },

    /// Two physical keys claim the same logical key.
    #[error("logical key {logical} is claimed by more than one physical key")]
    DuplicateLogical { logical: usize },
}

/// A precomputed bijection between a model's physical keys and a subset of
/// the logical grid.
///
/// `to_logical[p]` and `to_physical[l]` are true inverses over the model's
/// keys; both are built once from the model table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyIndexMap {
    to_logical: [Option<u8>; MAX_BUTTONS],
    to_physical: [Option<u8>; MAX_BUTTONS],
    key_count: usize,
}

impl KeyIndexMap {
    /// Builds a map from a table indexed by physical key holding logical keys.
    ///
    /// # Errors
    ///
    /// Returns [`KeymapError`] if the table is longer than [`MAX_BUTTONS`],
    /// names a logical key outside the grid, or names a logical key twice.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use deck_core::KeyIndexMap;
    ///
    /// let map = KeyIndexMap::try_from_table(&[1, 0]).unwrap();
    /// assert_eq!(map.to_logical(0), Some(1));
    /// assert_eq!(map.to_physical(1), Some(0));
    /// assert_eq!(map.to_physical(2), None);
    /// ```
    pub const fn try_from_table(table: &[u8]) -> Result<Self, KeymapError> {
        if table.len() > MAX_BUTTONS {
            return Err(KeymapError::TooManyKeys {
                count: table.len(),
                max: MAX_BUTTONS,
            });
        }

        let mut to_logical = [None; MAX_BUTTONS];
        let mut to_physical = [None; MAX_BUTTONS];

        let mut physical = 0;
        while physical < table.len() {
            let logical = table[physical] as usize;
            if logical >= MAX_BUTTONS {
                return Err(KeymapError::LogicalOutOfRange {
                    physical,
                    logical,
                    max: MAX_BUTTONS,
                });
            }
            if to_physical[logical].is_some() {
                return Err(KeymapError::DuplicateLogical { logical });
            }
            to_logical[physical] = Some(logical as u8);
            to_physical[logical] = Some(physical as u8);
            physical += 1;
        }

        Ok(Self {
            to_logical,
            to_physical,
            key_count: table.len(),
        })
    }

    /// Compile-time constructor for the built-in model tables.
    ///
    /// Evaluated in a `const` item, an invalid table aborts compilation.
    pub(crate) const fn builtin(table: &[u8]) -> Self {
        match Self::try_from_table(table) {
            Ok(map) => map,
            Err(_) => panic!("built-in key table is not a valid permutation"),
        }
    }

    /// Translates a logical grid index to the device's physical index.
    pub fn to_physical(&self, logical: usize) -> Option<usize> {
        self.to_physical
            .get(logical)
            .copied()
            .flatten()
            .map(usize::from)
    }

    /// Translates a physical device index to the logical grid index.
    pub fn to_logical(&self, physical: usize) -> Option<usize> {
        self.to_logical
            .get(physical)
            .copied()
            .flatten()
            .map(usize::from)
    }

    /// Number of physical keys the model exposes.
    pub fn key_count(&self) -> usize {
        self.key_count
    }
}

/// Supported device models.
///
/// Serialised in lowercase (`"emulator"`, `"original"`, `"mini"`) so it can be
/// chosen from the configuration file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceModel {
    /// The 32-key virtual device presented to remote clients.
    #[default]
    Emulator,
    /// 15-key device, 5 keys per row.
    Original,
    /// 6-key device, 3 keys per row.
    Mini,
}

impl DeviceModel {
    /// Returns the model's precomputed key-index map.
    pub fn key_map(self) -> KeyIndexMap {
        match self {
            DeviceModel::Emulator => models::EMULATOR_MAP,
            DeviceModel::Original => models::ORIGINAL_MAP,
            DeviceModel::Mini => models::MINI_MAP,
        }
    }

    /// Number of keys per physical row.
    pub fn keys_per_row(self) -> usize {
        match self {
            DeviceModel::Emulator => 8,
            DeviceModel::Original => 5,
            DeviceModel::Mini => 3,
        }
    }

    /// Human-readable model name used in logs and device metadata.
    pub fn display_name(self) -> &'static str {
        match self {
            DeviceModel::Emulator => "Elgato Streamdeck Emulator",
            DeviceModel::Original => "Elgato Streamdeck Original",
            DeviceModel::Mini => "Elgato Streamdeck Mini",
        }
    }
}
