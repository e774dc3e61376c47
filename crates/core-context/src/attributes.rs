//! The six tracked graphics attributes and their dirty masks.
//!
//! Every attribute setter ORs its bit into both the frame's `pending` and
//! `changed` masks. Drawing primitives pass the set they need; only
//! `pending ∩ needed` is emitted to the output encoder, then cleared from
//! `pending`. On frame close `changed` drives what the parent must
//! reflush when the encoder could not restore state itself.

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct AttributeMask: u8 {
        const FONT = 1;
        const JUSTIFY = 2;
        const COLOR = 4;
        const BLEND = 8;
        const LINESTYLE = 16;
        const CLIP = 32;
    }
}

impl AttributeMask {
    /// The mask forcing a first flush of everything.
    pub fn all_attributes() -> Self {
        Self::all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn six_distinct_bits() {
        let all = AttributeMask::all();
        assert_eq!(all.bits().count_ones(), 6);
        assert!(all.contains(AttributeMask::CLIP));
    }
}
