pub mod decimal;
pub mod median;
pub mod safe_math;
