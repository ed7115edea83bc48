use anyhow::bail;
use num_traits::AsPrimitive;

// Takes two flat inputs a and b (any numeric element types)
// Fills out with out[i] = a[i] + b[i], both operands widened to O first
// No allocations inside
// CPU version, single pass in memory order

/// How integer additions behave when the promoted type overflows.
/// Floating-point addition ignores this and follows IEEE rules.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum OverflowPolicy {
    /// Two's-complement wraparound.
    #[default]
    Wrap,
    /// Clamp to the type's min/max.
    Saturate,
    /// Abort at the first overflowing index.
    Checked,
}

/// Raised by [`add_arr`] under [`OverflowPolicy::Checked`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
#[error("integer overflow at linear index {0}")]
pub struct OverflowAt(pub usize);

/// Element types the add kernel can write.
pub trait AddElement: Copy + Send + Sync + 'static {
    fn wrapping_sum(self, rhs: Self) -> Self;
    fn saturating_sum(self, rhs: Self) -> Self;
    fn checked_sum(self, rhs: Self) -> Option<Self>;
}

macro_rules! impl_int_add {
    ($($t:ty),* $(,)?) => {
        $(
            impl AddElement for $t {
                #[inline(always)]
                fn wrapping_sum(self, rhs: Self) -> Self {
                    self.wrapping_add(rhs)
                }

                #[inline(always)]
                fn saturating_sum(self, rhs: Self) -> Self {
                    self.saturating_add(rhs)
                }

                #[inline(always)]
                fn checked_sum(self, rhs: Self) -> Option<Self> {
                    self.checked_add(rhs)
                }
            }
        )*
    };
}

macro_rules! impl_float_add {
    ($($t:ty),* $(,)?) => {
        $(
            impl AddElement for $t {
                #[inline(always)]
                fn wrapping_sum(self, rhs: Self) -> Self {
                    self + rhs
                }

                #[inline(always)]
                fn saturating_sum(self, rhs: Self) -> Self {
                    self + rhs
                }

                // inf and NaN are values, not overflow
                #[inline(always)]
                fn checked_sum(self, rhs: Self) -> Option<Self> {
                    Some(self + rhs)
                }
            }
        )*
    };
}

impl_int_add!(i8, i16, i32, i64, u8, u16, u32, u64);
impl_float_add!(f32, f64);

pub fn add_arr<A, B, O>(a: &[A], b: &[B], out: &mut [O], policy: OverflowPolicy) -> anyhow::Result<()>
where
    A: AsPrimitive<O>,
    B: AsPrimitive<O>,
    O: AddElement,
{
    if a.len() != b.len() || a.len() != out.len() {
        bail!(
            "add_arr: input/output length mismatch: a={}, b={}, out={}",
            a.len(),
            b.len(),
            out.len()
        );
    }

    let lanes = out.iter_mut().zip(a.iter().zip(b.iter()));

    match policy {
        OverflowPolicy::Wrap => {
            for (o, (&x, &y)) in lanes {
                *o = x.as_().wrapping_sum(y.as_());
            }
        }
        OverflowPolicy::Saturate => {
            for (o, (&x, &y)) in lanes {
                *o = x.as_().saturating_sum(y.as_());
            }
        }
        OverflowPolicy::Checked => {
            for (i, (o, (&x, &y))) in lanes.enumerate() {
                *o = x.as_().checked_sum(y.as_()).ok_or(OverflowAt(i))?;
            }
        }
    }

    Ok(())
}
