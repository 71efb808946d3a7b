use std::convert::TryInto;
use std::panic::Location;

// Copyright 2021 Drift Labs
// Copyright 2025 INSTADAPP LABS INC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

// Portions of this code are derived from Drift Protocol
// Original source: https://github.com/drift-labs/protocol-v2/blob/master/programs/drift/src/math/safe_math.rs
// Modified by INSTADAPP LABS INC

use crate::errors::{LibraryError, LibraryResult};

pub trait SafeMath: Sized {
    fn safe_add(self, rhs: Self) -> LibraryResult<Self>;
    fn safe_sub(self, rhs: Self) -> LibraryResult<Self>;
    fn safe_mul(self, rhs: Self) -> LibraryResult<Self>;
    fn safe_div(self, rhs: Self) -> LibraryResult<Self>;
    fn safe_pow(self, exp: u32) -> LibraryResult<Self>;
}

#[track_caller]
#[inline(always)]
fn checked<T>(value: Option<T>, err: LibraryError) -> LibraryResult<T> {
    match value {
        Some(result) => Ok(result),
        None => {
            let caller = Location::caller();
            tracing::debug!("Math error thrown at {}:{}", caller.file(), caller.line());
            Err(err)
        }
    }
}

macro_rules! checked_impl {
    ($t:ty) => {
        impl SafeMath for $t {
            #[track_caller]
            #[inline(always)]
            fn safe_add(self, v: $t) -> LibraryResult<$t> {
                checked(self.checked_add(v), LibraryError::MathOverflow)
            }

            #[track_caller]
            #[inline(always)]
            fn safe_sub(self, v: $t) -> LibraryResult<$t> {
                checked(self.checked_sub(v), LibraryError::MathOverflow)
            }

            #[track_caller]
            #[inline(always)]
            fn safe_mul(self, v: $t) -> LibraryResult<$t> {
                checked(self.checked_mul(v), LibraryError::MathOverflow)
            }

            #[track_caller]
            #[inline(always)]
            fn safe_div(self, v: $t) -> LibraryResult<$t> {
                if v == 0 {
                    return checked(None, LibraryError::DivisionByZero);
                }
                checked(self.checked_div(v), LibraryError::MathOverflow)
            }

            #[track_caller]
            #[inline(always)]
            fn safe_pow(self, exp: u32) -> LibraryResult<$t> {
                checked(self.checked_pow(exp), LibraryError::MathOverflow)
            }
        }
    };
}

checked_impl!(u128);
checked_impl!(u64);
checked_impl!(u32);
checked_impl!(usize);
checked_impl!(i128);
checked_impl!(i64);
checked_impl!(i32);

pub trait Cast: Sized {
    #[track_caller]
    #[inline(always)]
    fn cast<T: std::convert::TryFrom<Self>>(self) -> LibraryResult<T> {
        match self.try_into() {
            Ok(result) => Ok(result),
            Err(_) => {
                let caller = Location::caller();
                tracing::debug!(
                    "Casting error thrown at {}:{}",
                    caller.file(),
                    caller.line()
                );
                Err(LibraryError::CastingFailure)
            }
        }
    }
}

impl Cast for u128 {}
impl Cast for u64 {}
impl Cast for u32 {}
impl Cast for u8 {}
impl Cast for usize {}
impl Cast for i128 {}
impl Cast for i64 {}
impl Cast for i32 {}
