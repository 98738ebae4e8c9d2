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

use std::{
    cell::Ref,
    fmt::{self, Formatter},
    rc::Rc,
    sync::Arc,
};

use arrow::datatypes::{DataType, Schema};

use crate::common::{
    bit::{self, FixedWidth},
    BufferRef,
};
use crate::row::{ArrayData, MapData, Row};

/// Read access to the fields of a [`Row`] or the elements of an [`ArrayData`].
///
/// Implementors provide the location of the value at an index and its logical type. The typed
/// getters decode the value in place. Reads past the end of the underlying buffer panic.
pub trait Getter {
    fn buffer(&self) -> &BufferRef;

    fn base_offset(&self) -> usize;

    fn size_bytes(&self) -> usize;

    fn is_null_at(&self, i: usize) -> bool;

    /// Absolute offset of the slot of the value at index `i`.
    fn get_offset(&self, i: usize) -> usize;

    /// Logical type of the value at index `i`.
    fn type_at(&self, i: usize) -> &DataType;

    #[inline]
    fn get_bool(&self, i: usize) -> bool {
        read_at(self.buffer(), self.get_offset(i))
    }

    #[inline]
    fn get_int8(&self, i: usize) -> i8 {
        read_at(self.buffer(), self.get_offset(i))
    }

    #[inline]
    fn get_uint8(&self, i: usize) -> u8 {
        read_at(self.buffer(), self.get_offset(i))
    }

    #[inline]
    fn get_int16(&self, i: usize) -> i16 {
        read_at(self.buffer(), self.get_offset(i))
    }

    #[inline]
    fn get_uint16(&self, i: usize) -> u16 {
        read_at(self.buffer(), self.get_offset(i))
    }

    #[inline]
    fn get_int32(&self, i: usize) -> i32 {
        read_at(self.buffer(), self.get_offset(i))
    }

    #[inline]
    fn get_uint32(&self, i: usize) -> u32 {
        read_at(self.buffer(), self.get_offset(i))
    }

    #[inline]
    fn get_int64(&self, i: usize) -> i64 {
        read_at(self.buffer(), self.get_offset(i))
    }

    #[inline]
    fn get_uint64(&self, i: usize) -> u64 {
        read_at(self.buffer(), self.get_offset(i))
    }

    #[inline]
    fn get_float(&self, i: usize) -> f32 {
        read_at(self.buffer(), self.get_offset(i))
    }

    #[inline]
    fn get_double(&self, i: usize) -> f64 {
        read_at(self.buffer(), self.get_offset(i))
    }

    /// Decodes the slot of a variable-length value into its offset, relative to
    /// [`Self::base_offset`], and its size in bytes.
    #[inline]
    fn get_offset_and_size(&self, i: usize) -> (usize, usize) {
        let offset_and_size = self.get_uint64(i);
        (
            (offset_and_size >> 32) as usize,
            (offset_and_size & 0xffff_ffff) as usize,
        )
    }

    /// Borrows the bytes of a variable-length value, or `None` if it is null.
    fn get_binary_ref(&self, i: usize) -> Option<Ref<'_, [u8]>> {
        if self.is_null_at(i) {
            return None;
        }
        let (relative_offset, size) = self.get_offset_and_size(i);
        let start = self.base_offset() + relative_offset;
        Some(Ref::map(self.buffer().borrow(), |buffer| {
            buffer.get_bytes(start, size)
        }))
    }

    /// Copies the bytes of a variable-length value. A null value yields an empty vector.
    fn get_binary(&self, i: usize) -> Vec<u8> {
        self.get_binary_ref(i)
            .map(|bytes| bytes.to_vec())
            .unwrap_or_default()
    }

    /// Decodes a string value. A null value yields an empty string.
    fn get_string(&self, i: usize) -> String {
        self.get_binary_ref(i)
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
            .unwrap_or_default()
    }

    fn get_struct(&self, i: usize) -> Option<Row> {
        if self.is_null_at(i) {
            return None;
        }
        let schema = match self.type_at(i) {
            DataType::Struct(fields) => Arc::new(Schema::new(fields.clone())),
            dt => panic!("Value at {i} is not a struct: {dt}"),
        };
        let (relative_offset, size) = self.get_offset_and_size(i);
        Some(Row::new(
            schema,
            Rc::clone(self.buffer()),
            self.base_offset() + relative_offset,
            size,
        ))
    }

    fn get_array(&self, i: usize) -> Option<ArrayData> {
        if self.is_null_at(i) {
            return None;
        }
        let (relative_offset, size) = self.get_offset_and_size(i);
        Some(ArrayData::new(
            self.type_at(i),
            Rc::clone(self.buffer()),
            self.base_offset() + relative_offset,
            size,
        ))
    }

    fn get_map(&self, i: usize) -> Option<MapData> {
        if self.is_null_at(i) {
            return None;
        }
        let (relative_offset, size) = self.get_offset_and_size(i);
        Some(MapData::new(
            self.type_at(i),
            Rc::clone(self.buffer()),
            self.base_offset() + relative_offset,
            size,
        ))
    }

    /// Renders the value at index `i`, or `null`.
    fn fmt_value(&self, f: &mut Formatter<'_>, i: usize) -> fmt::Result {
        if self.is_null_at(i) {
            return write!(f, "null");
        }
        match self.type_at(i) {
            DataType::Boolean => write!(f, "{}", self.get_bool(i)),
            DataType::Int8 => write!(f, "{}", self.get_int8(i)),
            DataType::UInt8 => write!(f, "{}", self.get_uint8(i)),
            DataType::Int16 => write!(f, "{}", self.get_int16(i)),
            DataType::Int32 | DataType::Date32 | DataType::Time32(_) => {
                write!(f, "{}", self.get_int32(i))
            }
            DataType::UInt16 => write!(f, "{}", self.get_uint16(i)),
            DataType::UInt32 => write!(f, "{}", self.get_uint32(i)),
            DataType::Int64
            | DataType::Date64
            | DataType::Time64(_)
            | DataType::Timestamp(_, _) => write!(f, "{}", self.get_int64(i)),
            DataType::UInt64 => write!(f, "{}", self.get_uint64(i)),
            DataType::Float32 => write!(f, "{}", self.get_float(i)),
            DataType::Float64 => write!(f, "{}", self.get_double(i)),
            DataType::Utf8 | DataType::Binary => write!(f, "{}", self.get_string(i)),
            DataType::Struct(_) => match self.get_struct(i) {
                Some(row) => write!(f, "{row}"),
                None => write!(f, "null"),
            },
            DataType::List(_) => match self.get_array(i) {
                Some(array) => write!(f, "{array}"),
                None => write!(f, "null"),
            },
            DataType::Map(_, _) => match self.get_map(i) {
                Some(map) => write!(f, "{map}"),
                None => write!(f, "null"),
            },
            dt => write!(f, "<unsupported {dt}>"),
        }
    }
}

/// In-place updates of an already encoded row or array.
///
/// Values are written at their native width without zeroing the rest of the slot.
pub trait Setter: Getter {
    /// Absolute offset of the null bitmap.
    fn bitmap_offset(&self) -> usize;

    fn set_null_at(&mut self, i: usize) {
        let offset = self.bitmap_offset();
        let mut buffer = self.buffer().borrow_mut();
        bit::set_bit(&mut buffer.as_slice_mut()[offset..], i);
    }

    fn set_not_null_at(&mut self, i: usize) {
        let offset = self.bitmap_offset();
        let mut buffer = self.buffer().borrow_mut();
        bit::unset_bit(&mut buffer.as_slice_mut()[offset..], i);
    }

    fn set<T: FixedWidth>(&mut self, i: usize, value: T)
    where
        Self: Sized,
    {
        let offset = self.get_offset(i);
        self.buffer().borrow_mut().put(offset, value);
    }
}

#[inline]
fn read_at<T: FixedWidth>(buffer: &BufferRef, offset: usize) -> T {
    buffer.borrow().get(offset)
}

/// Whether bit `i` of the null bitmap starting at `bitmap_offset` is set.
#[inline]
pub(crate) fn is_null_in_bitmap(buffer: &BufferRef, bitmap_offset: usize, i: usize) -> bool {
    let buffer = buffer.borrow();
    bit::get_bit(buffer.get_bytes(bitmap_offset, i / 8 + 1), i)
}
