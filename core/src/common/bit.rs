// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

use std::{fmt::Debug, mem::size_of};

/// A value with a fixed byte width that can be stored in a row buffer.
///
/// Values are always stored in little-endian byte order.
pub trait FixedWidth: Copy + Default + PartialEq + Debug {
    const WIDTH: usize;

    /// Writes the little-endian bytes of this value into the first `WIDTH` bytes of `dst`.
    fn write_le(self, dst: &mut [u8]);

    /// Reads a value from the first `WIDTH` little-endian bytes of `src`.
    fn read_le(src: &[u8]) -> Self;

    /// Reverses the byte order of this value.
    fn byte_swap(self) -> Self;
}

macro_rules! fixed_width_int {
    ($($ty: ty),*) => {
        $(
        impl FixedWidth for $ty {
            const WIDTH: usize = size_of::<Self>();

            #[inline]
            fn write_le(self, dst: &mut [u8]) {
                dst[..Self::WIDTH].copy_from_slice(&self.to_le_bytes());
            }

            #[inline]
            fn read_le(src: &[u8]) -> Self {
                let mut bytes = [0u8; size_of::<$ty>()];
                bytes.copy_from_slice(&src[..Self::WIDTH]);
                <$ty>::from_le_bytes(bytes)
            }

            #[inline]
            fn byte_swap(self) -> Self {
                self.swap_bytes()
            }
        }
        )*
    };
}

macro_rules! fixed_width_float {
    ($($ty: ty => $bits: ty),*) => {
        $(
        impl FixedWidth for $ty {
            const WIDTH: usize = size_of::<Self>();

            #[inline]
            fn write_le(self, dst: &mut [u8]) {
                self.to_bits().write_le(dst)
            }

            #[inline]
            fn read_le(src: &[u8]) -> Self {
                <$ty>::from_bits(<$bits>::read_le(src))
            }

            #[inline]
            fn byte_swap(self) -> Self {
                <$ty>::from_bits(self.to_bits().swap_bytes())
            }
        }
        )*
    };
}

fixed_width_int! { u8, u16, u32, u64, i8, i16, i32, i64 }
fixed_width_float! { f32 => u32, f64 => u64 }

impl FixedWidth for bool {
    const WIDTH: usize = 1;

    #[inline]
    fn write_le(self, dst: &mut [u8]) {
        dst[0] = self as u8;
    }

    #[inline]
    fn read_le(src: &[u8]) -> Self {
        src[0] != 0
    }

    #[inline]
    fn byte_swap(self) -> Self {
        self
    }
}

/// Converts `value` from host byte order to big-endian.
#[inline]
pub fn to_big_endian<T: FixedWidth>(value: T) -> T {
    if cfg!(target_endian = "little") {
        value.byte_swap()
    } else {
        value
    }
}

/// Converts `value` from host byte order to little-endian.
#[inline]
pub fn to_little_endian<T: FixedWidth>(value: T) -> T {
    if cfg!(target_endian = "big") {
        value.byte_swap()
    } else {
        value
    }
}

static BIT_MASK: [u8; 8] = [1, 2, 4, 8, 16, 32, 64, 128];

/// Returns whether bit at position `i` in `data` is set or not
#[inline]
pub fn get_bit(data: &[u8], i: usize) -> bool {
    (data[i >> 3] & BIT_MASK[i & 7]) != 0
}

#[inline]
pub fn set_bit(bits: &mut [u8], i: usize) {
    bits[i / 8] |= 1 << (i % 8);
}

#[inline]
pub fn unset_bit(bits: &mut [u8], i: usize) {
    bits[i / 8] &= !(1 << (i % 8));
}

#[inline]
pub fn set_bit_to(bits: &mut [u8], i: usize, value: bool) {
    if value {
        set_bit(bits, i)
    } else {
        unset_bit(bits, i)
    }
}

/// Rounds `num_bytes` up to the nearest multiple of a 8-byte word.
#[inline]
pub const fn round_up_to_word(num_bytes: usize) -> usize {
    (num_bytes + 7) & !7
}

/// Width in bytes of a null bitmap tracking `num_bits` entries, padded to whole 64-bit words.
#[inline]
pub const fn bitmap_width_in_bytes(num_bits: usize) -> usize {
    num_bits.div_ceil(64) * 8
}

#[inline]
pub const fn is_multiple_of_8(num: usize) -> bool {
    num & 7 == 0
}

/// Renders `bytes` as lowercase hex, two characters per byte.
pub fn hex(bytes: &[u8]) -> String {
    const DIGITS: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        out.push(DIGITS[(b >> 4) as usize] as char);
        out.push(DIGITS[(b & 0xf) as usize] as char);
    }
    out
}
