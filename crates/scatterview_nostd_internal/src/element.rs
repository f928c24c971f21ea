//! Defines the closed set of types that can be stored in a grid.
//!
//! Every element type has two ways of being added into a cell:
//! - [`Element::add_into`] is an ordinary (non-atomic) addition. It's used
//!   when the cell is exclusively owned (duplicate slots, the serial slot,
//!   and the final reduction into the target).
//! - [`AtomicCell::atomic_add`] is used by the atomic strategy, where many
//!   workers may hit the same cell at once.
//!
//! The atomic flavor of a type is described by [`Element::Atomic`]. Not every
//! type can be updated atomically on stable rust (e.g. `Complex<f64>` would
//! need 128-bit compare-exchange), which is expressed by
//! [`Element::ATOMIC_SUPPORT`] and by the uninhabited [`NoAtomic`] type.
//!
//! # Integer overflow
//! Integer addition always wraps. Hardware `fetch_add` wraps, so the other
//! strategies must do the same in order to produce bitwise identical results.

use core::convert::Infallible;
use core::fmt::Debug;
use core::marker::PhantomData;
use core::sync::atomic::{
    AtomicI8, AtomicI16, AtomicI32, AtomicI64, AtomicIsize, AtomicU8, AtomicU16, AtomicU32,
    AtomicU64, AtomicUsize, Ordering,
};
use num_complex::Complex;
use num_traits::Zero;

mod sealed {
    pub trait Sealed {}
}
use sealed::Sealed;

/// Describes how (and whether) an element type can be atomically updated
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AtomicSupport {
    /// the hardware provides a fetch-add instruction for the type
    Native,
    /// atomic updates are emulated with a compare-exchange loop
    CompareExchange,
    /// there's no way to atomically update the type
    Unsupported,
}

/// A type that can be stored in a grid cell.
///
/// This trait is sealed. It's implemented for the primitive integers, `f32`,
/// `f64`, `Complex<f32>` and `Complex<f64>`.
pub trait Element: Copy + Debug + PartialEq + Send + Sync + Zero + 'static + Sealed {
    /// The atomic counterpart used by the atomic strategy
    type Atomic: AtomicCell<Self>;

    const ATOMIC_SUPPORT: AtomicSupport;

    /// A short name, used in log messages & errors
    const NAME: &'static str;

    /// Non-atomic accumulation (`*dst += delta`, wrapping for integers)
    fn add_into(dst: &mut Self, delta: Self);
}

/// The atomic storage for a single cell.
pub trait AtomicCell<T>: Send + Sync + Sized {
    /// Returns a cell holding zero, or `None` when the type has no atomic
    /// representation.
    fn zeroed() -> Option<Self>;

    fn atomic_add(&self, delta: T);

    /// Atomically replaces the stored value with zero and returns the old
    /// value
    fn swap_zero(&self) -> T;
}

macro_rules! impl_native_int {
    ($($t:ty => $atomic:ty),* $(,)?) => {
        $(
            impl Sealed for $t {}

            impl Element for $t {
                type Atomic = $atomic;
                const ATOMIC_SUPPORT: AtomicSupport = AtomicSupport::Native;
                const NAME: &'static str = stringify!($t);

                #[inline(always)]
                fn add_into(dst: &mut Self, delta: Self) {
                    *dst = dst.wrapping_add(delta);
                }
            }

            impl AtomicCell<$t> for $atomic {
                fn zeroed() -> Option<Self> {
                    Some(<$atomic>::new(0))
                }

                #[inline(always)]
                fn atomic_add(&self, delta: $t) {
                    self.fetch_add(delta, Ordering::Relaxed);
                }

                fn swap_zero(&self) -> $t {
                    self.swap(0, Ordering::Relaxed)
                }
            }
        )*
    };
}

impl_native_int!(
    u8 => AtomicU8,
    u16 => AtomicU16,
    u32 => AtomicU32,
    u64 => AtomicU64,
    usize => AtomicUsize,
    i8 => AtomicI8,
    i16 => AtomicI16,
    i32 => AtomicI32,
    i64 => AtomicI64,
    isize => AtomicIsize,
);

/// An `f32` that supports atomic addition (through its bit pattern)
#[derive(Debug)]
pub struct AtomicF32(AtomicU32);

/// An `f64` that supports atomic addition (through its bit pattern)
#[derive(Debug)]
pub struct AtomicF64(AtomicU64);

/// A `Complex<f32>` packed into 64 bits: the real part occupies the low 32
/// bits and the imaginary part occupies the high 32 bits.
#[derive(Debug)]
pub struct AtomicComplex32(AtomicU64);

#[inline(always)]
fn pack_complex32(z: Complex<f32>) -> u64 {
    (z.re.to_bits() as u64) | ((z.im.to_bits() as u64) << 32)
}

#[inline(always)]
fn unpack_complex32(bits: u64) -> Complex<f32> {
    Complex::new(
        f32::from_bits(bits as u32),
        f32::from_bits((bits >> 32) as u32),
    )
}

// the bit pattern of all zeros is +0.0, for both f32 and f64. We rely upon
// this in `zeroed` and `swap_zero`
macro_rules! impl_cas_float {
    ($t:ty, $wrapper:ident, $atomic_bits:ty) => {
        impl Sealed for $t {}

        impl Element for $t {
            type Atomic = $wrapper;
            const ATOMIC_SUPPORT: AtomicSupport = AtomicSupport::CompareExchange;
            const NAME: &'static str = stringify!($t);

            #[inline(always)]
            fn add_into(dst: &mut Self, delta: Self) {
                *dst += delta;
            }
        }

        impl AtomicCell<$t> for $wrapper {
            fn zeroed() -> Option<Self> {
                Some($wrapper(<$atomic_bits>::new(0)))
            }

            #[inline(always)]
            fn atomic_add(&self, delta: $t) {
                // the closure always returns Some, so this can't fail
                let _ = self.0.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |bits| {
                    Some((<$t>::from_bits(bits) + delta).to_bits())
                });
            }

            fn swap_zero(&self) -> $t {
                <$t>::from_bits(self.0.swap(0, Ordering::Relaxed))
            }
        }
    };
}

impl_cas_float!(f32, AtomicF32, AtomicU32);
impl_cas_float!(f64, AtomicF64, AtomicU64);

impl Sealed for Complex<f32> {}

impl Element for Complex<f32> {
    type Atomic = AtomicComplex32;
    const ATOMIC_SUPPORT: AtomicSupport = AtomicSupport::CompareExchange;
    const NAME: &'static str = "Complex<f32>";

    #[inline(always)]
    fn add_into(dst: &mut Self, delta: Self) {
        *dst += delta;
    }
}

impl AtomicCell<Complex<f32>> for AtomicComplex32 {
    fn zeroed() -> Option<Self> {
        Some(AtomicComplex32(AtomicU64::new(0)))
    }

    #[inline(always)]
    fn atomic_add(&self, delta: Complex<f32>) {
        let _ = self
            .0
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |bits| {
                Some(pack_complex32(unpack_complex32(bits) + delta))
            });
    }

    fn swap_zero(&self) -> Complex<f32> {
        unpack_complex32(self.0.swap(0, Ordering::Relaxed))
    }
}

/// Stands in for the atomic counterpart of a type that can't be updated
/// atomically. It's uninhabited: [`AtomicCell::zeroed`] always returns
/// `None`, so an instance can never exist.
pub struct NoAtomic<T>(Infallible, PhantomData<T>);

impl<T: Send + Sync> AtomicCell<T> for NoAtomic<T> {
    fn zeroed() -> Option<Self> {
        None
    }

    fn atomic_add(&self, _delta: T) {
        let never: Infallible = self.0;
        match never {}
    }

    fn swap_zero(&self) -> T {
        let never: Infallible = self.0;
        match never {}
    }
}

impl Sealed for Complex<f64> {}

impl Element for Complex<f64> {
    type Atomic = NoAtomic<Complex<f64>>;
    const ATOMIC_SUPPORT: AtomicSupport = AtomicSupport::Unsupported;
    const NAME: &'static str = "Complex<f64>";

    #[inline(always)]
    fn add_into(dst: &mut Self, delta: Self) {
        *dst += delta;
    }
}
