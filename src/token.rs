use std::fmt;
use std::num::NonZeroU64;

use crate::config::WorkingSetConfig;
use crate::domain::{DomainId, PartitionId};

const TAG_MASK: u64 = (1 << ShadowToken::TAG_BITS) - 1;
const PARTITION_MASK: u64 = (1 << ShadowToken::PARTITION_BITS) - 1;
const DOMAIN_MASK: u64 = (1 << ShadowToken::DOMAIN_BITS) - 1;

// The snapshot field must retain at least one bit after the tag and the two
// id fields are packed into the word.
const _: () = assert!(
    ShadowToken::TAG_BITS + ShadowToken::PARTITION_BITS + ShadowToken::DOMAIN_BITS < u64::BITS
);

/// A shadow token: the packed eviction record an entry leaves behind in its
/// index slot.
///
/// Everything fits in one word so the token can be stored in place of the
/// entry pointer it replaces:
///
/// ```text
/// bit 63                                                    bit 0
/// +----------------------+-----------+-------------+-----+
/// | eviction snapshot    | domain id | partition id | tag |
/// |      41 bits         |  16 bits  |    6 bits    |  1  |
/// +----------------------+-----------+-------------+-----+
/// ```
///
/// The tag bit is always set, which distinguishes tokens from live entry
/// references (stored with it clear) and gives `Option<ShadowToken>` a niche.
/// The snapshot is stored right-shifted by the configured bucket order;
/// [`unpack`](Self::unpack) restores the shift, so the low bits come back as
/// zeroes.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct ShadowToken(NonZeroU64);

impl ShadowToken {
    /// Width of the discriminant distinguishing tokens from entry references.
    pub const TAG_BITS: u32 = 1;
    /// Width of the partition id field.
    pub const PARTITION_BITS: u32 = 6;
    /// Width of the domain id field.
    pub const DOMAIN_BITS: u32 = 16;
    /// Bits left over for the truncated eviction snapshot.
    pub const SNAPSHOT_BITS: u32 =
        u64::BITS - Self::TAG_BITS - Self::PARTITION_BITS - Self::DOMAIN_BITS;
    /// Mask the width of the snapshot field. Refault distances are measured
    /// modulo this span, since the token never stored anything beyond it.
    pub const SNAPSHOT_MASK: u64 = (1 << Self::SNAPSHOT_BITS) - 1;

    /// Packs an eviction record into a token.
    ///
    /// The snapshot loses its low `bucket_order` bits and, should the clock
    /// outgrow the snapshot field, its high bits; both reappear as zeroes at
    /// unpack time. The distance arithmetic masks itself to the field's span
    /// ([`SNAPSHOT_MASK`](Self::SNAPSHOT_MASK)), so the lost high bits cancel
    /// out of the result.
    #[inline]
    pub fn pack(
        config: &WorkingSetConfig,
        domain: DomainId,
        partition: PartitionId,
        snapshot: u64,
    ) -> ShadowToken {
        let mut bits = snapshot >> config.bucket_order();
        bits = (bits << Self::DOMAIN_BITS) | u64::from(domain.as_u16());
        bits = (bits << Self::PARTITION_BITS) | u64::from(partition.as_u16());
        bits = (bits << Self::TAG_BITS) | TAG_MASK;

        // The tag bit is set, so the word is never zero.
        ShadowToken(NonZeroU64::new(bits).unwrap())
    }

    /// The inverse of [`pack`](Self::pack). The returned snapshot has its low
    /// `bucket_order` bits zeroed.
    #[inline]
    pub fn unpack(self, config: &WorkingSetConfig) -> (DomainId, PartitionId, u64) {
        let mut bits = self.0.get() >> Self::TAG_BITS;
        let partition = PartitionId::new((bits & PARTITION_MASK) as u16);
        bits >>= Self::PARTITION_BITS;
        let domain = DomainId::new((bits & DOMAIN_MASK) as u16);
        bits >>= Self::DOMAIN_BITS;

        (domain, partition, bits << config.bucket_order())
    }

    /// The token as a raw slot word, for storage in the host's index.
    #[inline]
    pub fn raw(self) -> RawSlot {
        RawSlot(self.0.get())
    }

    #[inline]
    pub(crate) fn from_raw(raw: RawSlot) -> ShadowToken {
        debug_assert!(raw.is_shadow());
        ShadowToken(NonZeroU64::new(raw.0).unwrap())
    }
}

impl fmt::Debug for ShadowToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ShadowToken({:#x})", self.0.get())
    }
}

/// A raw index slot word: either a live entry reference or a shadow token,
/// distinguished by the tag bit.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct RawSlot(u64);

impl RawSlot {
    #[inline]
    pub const fn from_bits(bits: u64) -> RawSlot {
        RawSlot(bits)
    }

    #[inline]
    pub const fn as_bits(self) -> u64 {
        self.0
    }

    /// Whether the word is a shadow token rather than a live entry reference.
    #[inline]
    pub const fn is_shadow(self) -> bool {
        self.0 & TAG_MASK != 0
    }
}

impl fmt::Debug for RawSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RawSlot({:#x})", self.0)
    }
}

/// A reference to a live entry, as the host's index stores it. The low bit
/// is reserved for the token tag and must be clear.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct EntryRef(u64);

impl EntryRef {
    #[inline]
    pub fn new(bits: u64) -> EntryRef {
        debug_assert!(
            bits & TAG_MASK == 0,
            "entry references must keep the tag bit clear"
        );
        EntryRef(bits)
    }

    #[inline]
    pub const fn as_bits(self) -> u64 {
        self.0
    }

    /// The reference as a raw slot word.
    #[inline]
    pub fn raw(self) -> RawSlot {
        RawSlot(self.0)
    }
}

impl fmt::Debug for EntryRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntryRef({:#x})", self.0)
    }
}

/// Typed view of an occupied index slot.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SlotValue {
    Live(EntryRef),
    Shadow(ShadowToken),
}

impl SlotValue {
    #[inline]
    pub fn from_raw(raw: RawSlot) -> SlotValue {
        if raw.is_shadow() {
            SlotValue::Shadow(ShadowToken::from_raw(raw))
        } else {
            SlotValue::Live(EntryRef(raw.0))
        }
    }
}
