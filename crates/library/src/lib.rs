pub mod codec;
pub mod errors;
pub mod math;
pub mod ring;

pub use errors::{LibraryError, LibraryResult};
pub use math::decimal::Decimal;
