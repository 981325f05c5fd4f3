use serde::Serialize;

pub const BLOCKED_Z_BASE: u32 = 10;
pub const REGULAR_Z_BASE: u32 = 50;
pub const COLLISION_Z: u32 = 999;
pub const FOCUSED_Z: u32 = 1000;

/// Blocked entries draw first, underneath appointments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Blocked,
    Regular,
}

impl Tier {
    pub fn of(is_blocked: bool) -> Self {
        if is_blocked { Tier::Blocked } else { Tier::Regular }
    }

    fn z_base(self) -> u32 {
        match self {
            Tier::Blocked => BLOCKED_Z_BASE,
            Tier::Regular => REGULAR_Z_BASE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DrawOrder {
    pub tier: Tier,
    /// Position inside the tier, by start time.
    pub rank: usize,
    pub z_index: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderKey {
    pub tier: Tier,
    pub start_minutes: i64,
    pub in_collision: bool,
}

/// Returns `(index, order)` pairs in draw sequence. Ties on start time
/// keep input order.
pub fn draw_sequence(keys: &[OrderKey]) -> Vec<(usize, DrawOrder)> {
    let mut indices: Vec<usize> = (0..keys.len()).collect();
    indices.sort_by_key(|&idx| (keys[idx].tier, keys[idx].start_minutes));

    let mut sequence = Vec::with_capacity(indices.len());
    let mut current_tier = None;
    let mut rank = 0usize;
    for idx in indices {
        let key = keys[idx];
        if current_tier != Some(key.tier) {
            current_tier = Some(key.tier);
            rank = 0;
        }

        let z_index = if key.in_collision {
            COLLISION_Z
        } else {
            key.tier.z_base().saturating_add(u32::try_from(rank).unwrap_or(u32::MAX))
        };
        sequence.push((
            idx,
            DrawOrder {
                tier: key.tier,
                rank,
                z_index,
            },
        ));
        rank += 1;
    }
    sequence
}
