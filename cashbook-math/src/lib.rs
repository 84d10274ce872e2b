//! Exact arithmetic for cashbook
//!
//! This crate provides the fixed-point rational type used for every
//! monetary quantity in a GnuCash book, plus commodity identity and the
//! conversion-factor table. All arithmetic is integer numerator and
//! denominator manipulation; nothing ever passes through a float.

#![warn(clippy::all)]
#![warn(missing_docs)]

pub mod commodity;
pub mod fraction;

// Re-export main types
pub use commodity::{Commodity, CommodityId, CurrencyTable};
pub use fraction::{Fraction, FractionError, FractionResult};
