pub mod crank;
pub mod packing;
pub mod round;
