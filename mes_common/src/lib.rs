mod minor_units;
mod secret;

pub mod helpers;
pub mod op;

pub use minor_units::{MinorUnits, MinorUnitsConversionError};
pub use secret::Secret;
