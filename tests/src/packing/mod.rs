//! Transaction packing and signer coverage tests.

mod packing_test;
