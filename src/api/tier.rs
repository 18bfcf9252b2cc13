//! Memory tiers.

/// A backing memory source an allocation can be served from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Tier {
    /// Conventional RAM, served by the host C library allocator.
    Volatile = 0,
    /// Byte-addressable persistent memory reached through a file-backed mapping.
    Durable = 1,
}

impl Tier {
    /// The other tier.
    #[inline]
    pub const fn flipped(self) -> Self {
        match self {
            Tier::Volatile => Tier::Durable,
            Tier::Durable => Tier::Volatile,
        }
    }

    /// Short lowercase name, as used in log records.
    pub const fn name(self) -> &'static str {
        match self {
            Tier::Volatile => "volatile",
            Tier::Durable => "durable",
        }
    }

    #[inline]
    pub(crate) const fn from_u8(raw: u8) -> Self {
        if raw == Tier::Durable as u8 {
            Tier::Durable
        } else {
            Tier::Volatile
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flip_and_raw_roundtrip() {
        assert_eq!(Tier::Durable.flipped(), Tier::Volatile);
        assert_eq!(Tier::from_u8(Tier::Durable as u8), Tier::Durable);
        assert_eq!(Tier::from_u8(7), Tier::Volatile);
        assert_eq!(Tier::Volatile.to_string(), "volatile");
    }
}
