//! Surrogate key allocation for one load.

use crash_warehouse_models::{DimensionKind, SurrogateKey};

/// Hands out surrogate keys for the dimension tables and the fact table.
///
/// One allocator belongs to one load context. Each table has its own
/// sequence starting at 1, so identical input loaded twice yields
/// identical keys.
#[derive(Debug, Clone, Default)]
pub struct KeyAllocator {
    dimensions: [u32; 9],
    facts: u32,
}

impl KeyAllocator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Next key for `dimension`.
    pub fn next_dimension_key(&mut self, dimension: DimensionKind) -> SurrogateKey {
        let slot = &mut self.dimensions[slot(dimension)];
        *slot += 1;
        SurrogateKey(*slot)
    }

    /// Next fact id.
    pub const fn next_fact_id(&mut self) -> SurrogateKey {
        self.facts += 1;
        SurrogateKey(self.facts)
    }

    /// Number of keys handed out for `dimension` so far.
    #[must_use]
    pub const fn issued(&self, dimension: DimensionKind) -> u32 {
        self.dimensions[slot(dimension)]
    }
}

const fn slot(dimension: DimensionKind) -> usize {
    match dimension {
        DimensionKind::Time => 0,
        DimensionKind::Season => 1,
        DimensionKind::Location => 2,
        DimensionKind::CrashType => 3,
        DimensionKind::RoadCondition => 4,
        DimensionKind::Vehicle => 5,
        DimensionKind::Driver => 6,
        DimensionKind::Population => 7,
        DimensionKind::Lga => 8,
    }
}
