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

use std::fmt::{self, Debug, Display, Formatter};

use arrow::datatypes::DataType;

use crate::common::{bit, BufferRef, FixedWidth};
use crate::encoder::RowEncode;
use crate::row::getter::{is_null_in_bitmap, Getter, Setter};
use crate::row::types::{self, list_type};
use crate::row::ArrayWriter;

/// A zero-copy view of a list encoded in the row format.
///
/// ```text
/// +--------------+--------------------+-----------------------------+------------------+
/// | num elements | null bitmap        | elements                    | variable-length  |
/// | 8 B          | ceil(n / 64) * 8 B | n * element size, 8B padded | region           |
/// +--------------+--------------------+-----------------------------+------------------+
/// ```
///
/// Fixed-width elements are stored at their native width. Variable-length and nested elements
/// use an 8-byte `(relative offset << 32) | size` slot.
#[derive(Clone)]
pub struct ArrayData {
    data_type: DataType,
    element_type: DataType,
    element_size: usize,
    buffer: BufferRef,
    num_elements: usize,
    element_offset: usize,
    base_offset: usize,
    size_bytes: usize,
}

impl ArrayData {
    /// Creates a view of the list of type `data_type` stored at `base_offset`.
    ///
    /// # Panics
    ///
    /// Panics if `data_type` is not a list type, or if the stored number of elements is negative
    /// or does not fit a 32-bit signed integer.
    pub fn new(
        data_type: &DataType,
        buffer: BufferRef,
        base_offset: usize,
        size_bytes: usize,
    ) -> Self {
        let element_type = match types::list_field(data_type) {
            Ok(field) => field.data_type().clone(),
            Err(e) => panic!("{e}"),
        };
        let num_elements: i64 = buffer.borrow().get(base_offset);
        if num_elements < 0 || num_elements > i32::MAX as i64 {
            panic!("Invalid number of elements {num_elements} at offset {base_offset}");
        }
        let num_elements = num_elements as usize;
        Self {
            data_type: data_type.clone(),
            element_size: types::element_size(&element_type),
            element_type,
            buffer,
            num_elements,
            element_offset: base_offset + Self::calculate_header_in_bytes(num_elements),
            base_offset,
            size_bytes,
        }
    }

    /// Creates a standalone list of fixed-width values.
    pub fn from_slice<T: RowEncode + FixedWidth>(values: &[T]) -> Self {
        let mut writer = ArrayWriter::new(&list_type(T::data_type()));
        writer.reset(values.len());
        for (i, value) in values.iter().enumerate() {
            value.write_to(&mut writer, i);
        }
        writer.copy_to_array_data()
    }

    /// Bytes taken by the element count and the null bitmap of a list of `num_elements`.
    pub const fn calculate_header_in_bytes(num_elements: usize) -> usize {
        8 + bit::bitmap_width_in_bytes(num_elements)
    }

    pub fn data_type(&self) -> &DataType {
        &self.data_type
    }

    pub fn element_type(&self) -> &DataType {
        &self.element_type
    }

    pub fn num_elements(&self) -> usize {
        self.num_elements
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.buffer
            .borrow()
            .get_bytes(self.base_offset, self.size_bytes)
            .to_vec()
    }

    /// Element counts along each of the first `num_dims` levels of a nested list.
    ///
    /// The walk descends into the first non-null sub-list at every level. Returns `None` when
    /// no path reaches `num_dims` levels, e.g. because a level is not a list or all of its
    /// sub-lists are null.
    pub fn dimensions(&self, num_dims: usize) -> Option<Vec<usize>> {
        if num_dims == 0 {
            return Some(vec![]);
        }
        let mut dims = vec![self.num_elements];
        if num_dims == 1 {
            return Some(dims);
        }
        if !matches!(self.element_type, DataType::List(_)) {
            return None;
        }
        (0..self.num_elements)
            .filter_map(|i| self.get_array(i))
            .find_map(|child| child.dimensions(num_dims - 1))
            .map(|rest| {
                dims.extend(rest);
                dims
            })
    }
}

impl Getter for ArrayData {
    fn buffer(&self) -> &BufferRef {
        &self.buffer
    }

    fn base_offset(&self) -> usize {
        self.base_offset
    }

    fn size_bytes(&self) -> usize {
        self.size_bytes
    }

    fn is_null_at(&self, i: usize) -> bool {
        is_null_in_bitmap(&self.buffer, self.base_offset + 8, i)
    }

    fn get_offset(&self, i: usize) -> usize {
        self.element_offset + i * self.element_size
    }

    fn type_at(&self, _i: usize) -> &DataType {
        &self.element_type
    }
}

impl Setter for ArrayData {
    fn bitmap_offset(&self) -> usize {
        self.base_offset + 8
    }
}

impl Display for ArrayData {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for i in 0..self.num_elements {
            if i != 0 {
                write!(f, ", ")?;
            }
            self.fmt_value(f, i)?;
        }
        write!(f, "]")
    }
}

impl Debug for ArrayData {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArrayData")
            .field("element_type", &self.element_type)
            .field("num_elements", &self.num_elements)
            .field("base_offset", &self.base_offset)
            .field("size_bytes", &self.size_bytes)
            .finish()
    }
}
