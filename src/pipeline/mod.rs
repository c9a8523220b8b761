//! Pure transforms over raw counter samples.
//!
//! Nothing in here touches the network or the database: every function maps
//! already-fetched data to derived structures, so the whole pipeline is
//! exercised by plain unit tests.

mod bins;
mod deltas;
mod emergency;
mod normalize;

pub use bins::*;
pub use deltas::*;
pub use emergency::*;
pub use normalize::*;

use std::collections::BTreeMap;

/// Counter reading per minute-aligned UTC instant (epoch ms).
pub type MinuteMap = BTreeMap<i64, f64>;

/// Non-negative production delta per minute-aligned UTC instant.
pub type MinuteDeltaMap = BTreeMap<i64, f64>;
