use super::{ConstraintKind, ConstraintReading, UNLIMITED_HEADROOM};

/// Picks the smallest remaining value and the constraint that produced it.
///
/// Seeded by the first reading and updated only on a strictly smaller value,
/// so on ties the earlier-evaluated constraint wins (A over B over C over D).
/// With no readings the result is unlimited and attributed to `Nproc`.
pub fn select_binding(readings: &[ConstraintReading]) -> (i64, ConstraintKind) {
    let mut iter = readings.iter();
    let Some(first) = iter.next() else {
        return (UNLIMITED_HEADROOM, ConstraintKind::Nproc);
    };

    iter.fold((first.remaining, first.kind), |best, r| {
        if r.remaining < best.0 {
            (r.remaining, r.kind)
        } else {
            best
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headroom::ConstraintKind::*;

    fn limited(kind: ConstraintKind, remaining: i64) -> ConstraintReading {
        ConstraintReading::limited(kind, 0, 0, remaining)
    }

    fn unlimited(kind: ConstraintKind) -> ConstraintReading {
        ConstraintReading::unlimited(kind, None, 0)
    }

    #[test]
    fn test_minimum_wins() {
        let readings = [
            limited(Nproc, 40),
            unlimited(CgroupPids),
            limited(KernelThreadsMax, 5),
            unlimited(VirtualMemory),
        ];
        assert_eq!(select_binding(&readings), (5, KernelThreadsMax));
    }

    #[test]
    fn test_tie_goes_to_earlier_constraint() {
        let readings = [
            limited(Nproc, 40),
            limited(CgroupPids, 40),
            limited(KernelThreadsMax, 41),
            limited(VirtualMemory, 40),
        ];
        assert_eq!(select_binding(&readings), (40, Nproc));

        let readings = [
            unlimited(Nproc),
            unlimited(CgroupPids),
            limited(KernelThreadsMax, 7),
            limited(VirtualMemory, 7),
        ];
        assert_eq!(select_binding(&readings), (7, KernelThreadsMax));
    }

    #[test]
    fn test_unlimited_never_selected_over_limited() {
        let readings = [
            unlimited(Nproc),
            unlimited(CgroupPids),
            unlimited(KernelThreadsMax),
            limited(VirtualMemory, UNLIMITED_HEADROOM - 1),
        ];
        assert_eq!(select_binding(&readings), (UNLIMITED_HEADROOM - 1, VirtualMemory));
    }

    #[test]
    fn test_all_unlimited() {
        let readings = ConstraintKind::ALL.map(unlimited);
        assert_eq!(select_binding(&readings), (UNLIMITED_HEADROOM, Nproc));
    }

    #[test]
    fn test_negative_remaining() {
        let readings = [limited(Nproc, 3), limited(CgroupPids, -2)];
        assert_eq!(select_binding(&readings), (-2, CgroupPids));
    }

    #[test]
    fn test_empty() {
        assert_eq!(select_binding(&[]), (UNLIMITED_HEADROOM, Nproc));
    }
}
