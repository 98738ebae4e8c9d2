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
    fmt::{self, Debug, Display, Formatter},
    sync::Arc,
};

use arrow::datatypes::{DataType, SchemaRef};

use crate::common::{bit, Buffer, BufferRef};
use crate::row::getter::{is_null_in_bitmap, Getter, Setter};

/// A zero-copy view of a record encoded in the row format.
///
/// Layout of a record with `N` fields, starting at `base_offset`:
///
/// ```text
/// +----------------------+-------------------+------------------------+
/// | null bitmap          | fixed-width slots | variable-length region |
/// | ceil(N / 64) * 8 B   | N * 8 B           | 8-byte aligned         |
/// +----------------------+-------------------+------------------------+
/// ```
///
/// A set bit in the bitmap marks the field as null. Fixed-width values live in the low bytes of
/// their slot. Variable-length and nested values store `(relative offset << 32) | size` in their
/// slot, with the offset relative to `base_offset`.
#[derive(Clone)]
pub struct Row {
    schema: SchemaRef,
    buffer: BufferRef,
    base_offset: usize,
    size_bytes: usize,
    bitmap_width_in_bytes: usize,
}

impl Row {
    pub fn new(
        schema: SchemaRef,
        buffer: BufferRef,
        base_offset: usize,
        size_bytes: usize,
    ) -> Self {
        let bitmap_width_in_bytes = bit::bitmap_width_in_bytes(schema.fields().len());
        Self {
            schema,
            buffer,
            base_offset,
            size_bytes,
            bitmap_width_in_bytes,
        }
    }

    /// Points this view to a record of the same schema stored at `offset` in `buffer`.
    pub fn point_to(&mut self, buffer: BufferRef, offset: usize, size_bytes: usize) {
        self.buffer = buffer;
        self.base_offset = offset;
        self.size_bytes = size_bytes;
    }

    pub fn schema(&self) -> &SchemaRef {
        &self.schema
    }

    pub fn num_fields(&self) -> usize {
        self.schema.fields().len()
    }

    /// Copies the bytes of this record.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.buffer
            .borrow()
            .get_bytes(self.base_offset, self.size_bytes)
            .to_vec()
    }

    /// Copies this record into its own buffer. The copy stays valid when the buffer it was
    /// written to gets reused.
    pub fn copy(&self) -> Row {
        let buffer = self
            .buffer
            .borrow()
            .copy(self.base_offset, self.size_bytes)
            .into_ref();
        Row::new(Arc::clone(&self.schema), buffer, 0, self.size_bytes)
    }
}

impl Getter for Row {
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
        is_null_in_bitmap(&self.buffer, self.base_offset, i)
    }

    fn get_offset(&self, i: usize) -> usize {
        self.base_offset + self.bitmap_width_in_bytes + i * 8
    }

    fn type_at(&self, i: usize) -> &DataType {
        self.schema.field(i).data_type()
    }
}

impl Setter for Row {
    fn bitmap_offset(&self) -> usize {
        self.base_offset
    }
}

impl Display for Row {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, field) in self.schema.fields().iter().enumerate() {
            if i != 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}=", field.name())?;
            self.fmt_value(f, i)?;
        }
        write!(f, "}}")
    }
}

impl Debug for Row {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Row")
            .field("num_fields", &self.num_fields())
            .field("base_offset", &self.base_offset)
            .field("size_bytes", &self.size_bytes)
            .finish()
    }
}

/// Builds a standalone record from raw bytes, e.g. received from another process.
impl From<(SchemaRef, &[u8])> for Row {
    fn from((schema, bytes): (SchemaRef, &[u8])) -> Self {
        Row::new(schema, Buffer::from_slice(bytes).into_ref(), 0, bytes.len())
    }
}
