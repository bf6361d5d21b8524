
#[cfg(feature = "serialization")]
use serde::{Deserialize, Serialize};

/// Number of entries in a transfer table unless configured otherwise
pub const DEFAULT_TABLE_SIZE: usize = 16301;

/// Color with opacity, each channel in 0..=1
#[derive(Default, Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serialization", derive(Serialize, Deserialize))]
pub struct Albedo {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Albedo {
    pub fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub fn is_transparent(&self) -> bool {
        self.a == 0.
    }

    /// Linear interpolation between self and `other`, `ratio` 0 being self
    pub fn lerp(&self, other: &Albedo, ratio: f32) -> Albedo {
        Albedo {
            r: self.r + (other.r - self.r) * ratio,
            g: self.g + (other.g - self.g) * ratio,
            b: self.b + (other.b - self.b) * ratio,
            a: self.a + (other.a - self.a) * ratio,
        }
    }
}

/// The scalar range the transfer table is stretched over
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serialization", derive(Serialize, Deserialize))]
pub struct TransferRange {
    /// Samples at or below this value map to the first table entry
    pub threshold_min: f32,
    pub domain_min: f32,
    pub domain_max: f32,
}

impl Default for TransferRange {
    fn default() -> Self {
        Self {
            threshold_min: 0.,
            domain_min: 0.,
            domain_max: 1.,
        }
    }
}

/// A linear color segment over the normalized [0, 1] table range
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serialization", derive(Serialize, Deserialize))]
pub struct TransferRamp {
    pub start: f32,
    pub end: f32,
    pub from: Albedo,
    pub to: Albedo,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serialization", derive(Serialize, Deserialize))]
pub struct TransferConfig {
    pub resolution: usize,
    /// Applied in order, later ramps overwrite the entries of earlier ones
    pub ramps: Vec<TransferRamp>,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            resolution: DEFAULT_TABLE_SIZE,
            ramps: Vec::new(),
        }
    }
}

/// error types during the creation of a transfer table
#[derive(Debug, PartialEq, thiserror::Error)]
pub enum TransferError {
    #[error("Transfer table needs at least 1 entry")]
    EmptyTable,
    #[error("Transfer table resolution {0} is too low, at least 2 entries are needed")]
    InvalidResolution(usize),
    #[error("Invalid transfer ramp [{start}, {end}], it should be inside [0, 1] and not reversed")]
    InvalidRamp { start: f32, end: f32 },
}

/// Lookup table mapping normalized scalar values to color and opacity.
/// There is no mutable access after construction, so one table can be read
/// by any number of rays at the same time.
#[derive(Clone, Debug, PartialEq)]
pub struct TransferTable {
    entries: Vec<Albedo>,
}

impl TransferTable {
    /// Creates a table from the given entries, which must not be empty
    pub fn from_entries(entries: Vec<Albedo>) -> Result<Self, TransferError> {
        if entries.is_empty() {
            return Err(TransferError::EmptyTable);
        }
        Ok(Self { entries })
    }

    /// Builds the table of the given configuration: fully transparent,
    /// with each ramp interpolated over its part of the table
    pub fn from_config(config: &TransferConfig) -> Result<Self, TransferError> {
        if config.resolution < 2 {
            return Err(TransferError::InvalidResolution(config.resolution));
        }
        let mut entries = vec![Albedo::default(); config.resolution];
        let last_index = (config.resolution - 1) as f32;
        for ramp in config.ramps.iter() {
            if !(0. <= ramp.start && ramp.start <= ramp.end && ramp.end <= 1.) {
                return Err(TransferError::InvalidRamp {
                    start: ramp.start,
                    end: ramp.end,
                });
            }
            let first = (ramp.start * last_index).round() as usize;
            let last = (ramp.end * last_index).round() as usize;
            let span = (last - first).max(1) as f32;
            for (offset, entry) in entries[first..=last].iter_mut().enumerate() {
                *entry = ramp.from.lerp(&ramp.to, offset as f32 / span);
            }
        }
        log::debug!(
            "Transfer table built with {} entries from {} ramps",
            entries.len(),
            config.ramps.len()
        );
        Ok(Self { entries })
    }

    /// Color and opacity of the given sample, see [`transfer`]
    pub fn lookup(&self, value: f32, range: &TransferRange) -> Albedo {
        transfer(
            value,
            range.threshold_min,
            range.domain_min,
            range.domain_max,
            self,
        )
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[Albedo] {
        &self.entries
    }

    pub fn first(&self) -> Albedo {
        self.entries[0]
    }

    pub fn last(&self) -> Albedo {
        self.entries[self.entries.len() - 1]
    }
}

/// Maps the sample `value` to a color and opacity through the given table.
/// The value is normalized against the domain width starting from `threshold_min`,
/// and clamped into the table range: out of range values are never rejected.
/// A NaN sample maps to the first entry.
pub fn transfer(
    value: f32,
    threshold_min: f32,
    domain_min: f32,
    domain_max: f32,
    table: &TransferTable,
) -> Albedo {
    let normalized = ((value - threshold_min) / (domain_max - domain_min)).clamp(0., 1.);
    // float to int casts saturate, NaN becomes 0
    let index = (normalized * (table.len() - 1) as f32).floor() as usize;
    table.entries[index.min(table.len() - 1)]
}
