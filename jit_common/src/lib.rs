//! Value types shared between the JIT funding engine and server crates.
mod amount;
mod helpers;
mod secret;

pub use amount::{Amount, AmountConversionError, DEFAULT_CURRENCY_CODE, MINOR_UNITS_PER_MAJOR};
pub use helpers::parse_boolean_flag;
pub use secret::Secret;
