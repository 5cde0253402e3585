//! Range kinds of index key ranges.

/// Bound kinds of one key range.
///
/// The first half names the lower bound, the second the upper bound: `GeLt`
/// is `lower <= key < upper`. `Inf` leaves that side open, and `EqNa` is an
/// equality match with no upper key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RangeKind {
    EqNa,
    GeLe,
    GeLt,
    GtLe,
    GtLt,
    GeInf,
    GtInf,
    InfLe,
    InfLt,
    InfInf,
}

impl RangeKind {
    /// Returns whether the range has a lower key.
    pub fn has_lower(&self) -> bool {
        !matches!(self, RangeKind::InfLe | RangeKind::InfLt | RangeKind::InfInf)
    }

    /// Returns whether the range has an upper key.
    pub fn has_upper(&self) -> bool {
        !matches!(
            self,
            RangeKind::EqNa | RangeKind::GeInf | RangeKind::GtInf | RangeKind::InfInf
        )
    }

    #[inline]
    pub fn lower_exclusive(&self) -> bool {
        matches!(self, RangeKind::GtLe | RangeKind::GtLt | RangeKind::GtInf)
    }

    #[inline]
    pub fn upper_exclusive(&self) -> bool {
        matches!(self, RangeKind::GeLt | RangeKind::GtLt | RangeKind::InfLt)
    }

    /// Inclusive form of the range, for keys that hold only a prefix of the
    /// column value: two values sharing a prefix compare equal in the key,
    /// so no exclusive bound can be decided on the key alone.
    ///
    /// `EqNa` widens to `GeLe` with both bounds set to the same key.
    pub fn widen_for_prefix(&self) -> RangeKind {
        match self {
            RangeKind::EqNa | RangeKind::GtLt | RangeKind::GtLe | RangeKind::GeLt => {
                RangeKind::GeLe
            }
            RangeKind::GtInf => RangeKind::GeInf,
            RangeKind::InfLt => RangeKind::InfLe,
            other => *other,
        }
    }
}
