//! Round lifecycle and history ring tests.

mod round_test;
