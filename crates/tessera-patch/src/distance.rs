//! Signed per-axis distance from a grid point to a patch, with optional
//! periodic wrap-around.

use tessera_core::GridOffset;

use crate::error::PatchError;
use crate::patch::Patch;

/// Result of [`Patch::distance_vector`].
#[derive(Clone, Debug, PartialEq)]
pub struct DistanceVector {
    /// Per-axis signed distance. Zero when the point is inside the patch's
    /// range on that axis, positive when the patch lies above the point,
    /// negative when it lies below.
    pub offsets: GridOffset,
    /// Euclidean norm of `offsets`.
    pub norm: f64,
}

impl Patch {
    /// Signed distance from `point` to the nearest cell of this patch.
    ///
    /// With `periodic`, each axis `i` wraps at `periodic[i]` and the
    /// shorter way around wins; on a tie the direct distance is kept.
    /// Every period must cover the patch (`upper < period`) and every
    /// point coordinate must lie below its period.
    ///
    /// ```
    /// use tessera_patch::Patch;
    ///
    /// let p = Patch::new(&[3], &[7]).unwrap();
    /// assert_eq!(p.distance_vector(&[0], None).unwrap().offsets[0], 3);
    /// assert_eq!(p.distance_vector(&[31], None).unwrap().offsets[0], -24);
    /// assert_eq!(p.distance_vector(&[31], Some(&[32][..])).unwrap().offsets[0], 4);
    /// ```
    pub fn distance_vector(
        &self,
        point: &[u32],
        periodic: Option<&[u32]>,
    ) -> Result<DistanceVector, PatchError> {
        self.check_ndim("point", point.len())?;
        if let Some(periods) = periodic {
            self.check_ndim("period", periods.len())?;
        }
        let upper = self.upper_index();
        let mut offsets = GridOffset::with_capacity(self.ndim());
        for axis in 0..self.ndim() {
            let lo = i64::from(self.origin()[axis]);
            let hi = i64::from(upper[axis]);
            let p = i64::from(point[axis]);
            let period = match periodic {
                Some(periods) => Some(validated_period(axis, periods[axis], hi, p)?),
                None => None,
            };
            offsets.push(axis_offset(lo, hi, p, period));
        }
        let norm = offsets
            .iter()
            .map(|&d| (d as f64) * (d as f64))
            .sum::<f64>()
            .sqrt();
        Ok(DistanceVector { offsets, norm })
    }
}

fn validated_period(axis: usize, period: u32, hi: i64, p: i64) -> Result<i64, PatchError> {
    let period = i64::from(period);
    if period <= hi {
        return Err(PatchError::InvalidArgument {
            reason: format!("period {period} on axis {axis} does not cover patch upper {hi}"),
        });
    }
    if p >= period {
        return Err(PatchError::InvalidArgument {
            reason: format!("point coordinate {p} on axis {axis} is not below period {period}"),
        });
    }
    Ok(period)
}

/// Distance along one axis from `p` to `[lo, hi]`.
///
/// `below` tracks whether the patch is reached by stepping down from `p`;
/// the sign is negative in that case.
fn axis_offset(lo: i64, hi: i64, p: i64, period: Option<i64>) -> i64 {
    let (mut d, mut below) = if p < lo {
        (lo - p, false)
    } else if p > hi {
        (p - hi, true)
    } else {
        return 0;
    };
    if let Some(period) = period {
        let wrapped = if below { lo + period - p } else { p + period - hi };
        if wrapped < d {
            d = wrapped;
            below = !below;
        }
    }
    if below {
        -d
    } else {
        d
    }
}
