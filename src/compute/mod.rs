//! Local computation
//!
//! Everything a single participant needs to produce its partial result without
//! talking to anyone else:
//!
//! - `integrand`: the function being integrated
//! - `partition`: which slice of the global interval this participant owns
//! - `quadrature`: the midpoint-rule sum over that slice

pub mod integrand;
pub mod partition;
pub mod quadrature;

pub use integrand::Integrand;
pub use partition::{partition, partition_all, Interval, RemainderPolicy, Tile};
pub use quadrature::integrate;
