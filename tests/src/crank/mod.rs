//! Crank scheduling tests driven through the keeper against an in-memory
//! ledger.

pub mod fixture;

mod crank_test;
