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

//! Cursor-based encoders for records and lists.
//!
//! A writer appends to the end of a shared [`Buffer`]. The cursor is the buffer's writer index,
//! so a nested writer created with a parent appends right after whatever the parent has written
//! and the parent records the nested region with [`Writer::set_offset_and_size`]:
//!
//! ```text
//!  parent.cursor()         child writes            parent.cursor()
//!       |                                                |
//!       v                                                v
//! ... --+------------------------------------------------+--
//!       | nested record / list / map                     |
//! ... --+------------------------------------------------+--
//! ```
//!
//! Replacing the buffer of a writer with [`Writer::set_buffer`] also replaces it in every live
//! nested writer created from it, recursively.

use std::{
    cell::RefCell,
    rc::{Rc, Weak},
    sync::Arc,
};

use arrow::datatypes::{DataType, SchemaRef};

use crate::common::{bit, Buffer, BufferRef, FixedWidth};
use crate::config::RowFormatConfig;
use crate::row::{types, ArrayData, Getter, MapData, Row};

/// Initial buffer size of a standalone [`ArrayWriter`].
const DEFAULT_ARRAY_BUFFER_SIZE: usize = 64;

/// Links a writer to its buffer and to the nested writers sharing it.
#[derive(Debug)]
struct BufferLink {
    buffer: RefCell<BufferRef>,
    children: RefCell<Vec<Weak<BufferLink>>>,
}

impl BufferLink {
    fn new(buffer: BufferRef) -> Rc<Self> {
        Rc::new(Self {
            buffer: RefCell::new(buffer),
            children: RefCell::new(vec![]),
        })
    }

    fn buffer(&self) -> BufferRef {
        Rc::clone(&self.buffer.borrow())
    }

    fn add_child(&self, child: &Rc<BufferLink>) {
        let mut children = self.children.borrow_mut();
        children.retain(|c| c.strong_count() > 0);
        children.push(Rc::downgrade(child));
    }

    fn set_buffer(&self, buffer: &BufferRef) {
        *self.buffer.borrow_mut() = Rc::clone(buffer);
        let mut children = self.children.borrow_mut();
        children.retain(|c| c.strong_count() > 0);
        for child in children.iter().filter_map(Weak::upgrade) {
            child.set_buffer(buffer);
        }
    }
}

/// State shared by all writers: the buffer link, where the current value starts and where its
/// null bitmap sits relative to that start.
#[derive(Debug)]
pub struct WriterBase {
    link: Rc<BufferLink>,
    starting_offset: usize,
    bytes_before_bitmap: usize,
}

impl WriterBase {
    fn new(buffer: BufferRef, bytes_before_bitmap: usize) -> Self {
        Self {
            link: BufferLink::new(buffer),
            starting_offset: 0,
            bytes_before_bitmap,
        }
    }

    fn new_nested(parent: &WriterBase, bytes_before_bitmap: usize) -> Self {
        let link = BufferLink::new(parent.link.buffer());
        parent.link.add_child(&link);
        Self {
            link,
            starting_offset: 0,
            bytes_before_bitmap,
        }
    }
}

/// Common operations of [`RowWriter`] and [`ArrayWriter`].
///
/// Space must be reserved with [`Writer::grow`] before it is written; the `write_*` methods
/// that append to the variable-length region do this themselves.
pub trait Writer {
    fn base(&self) -> &WriterBase;

    /// Absolute offset of the slot of field or element `i`.
    fn get_offset(&self, i: usize) -> usize;

    /// Writes a fixed-width value into slot `i`.
    fn write<T: FixedWidth>(&mut self, i: usize, value: T);

    fn buffer(&self) -> BufferRef {
        self.base().link.buffer()
    }

    /// Absolute position where the next byte is appended.
    fn cursor(&self) -> usize {
        self.base().link.buffer.borrow().borrow().writer_index()
    }

    fn starting_offset(&self) -> usize {
        self.base().starting_offset
    }

    /// Bytes written since the last reset.
    fn size(&self) -> usize {
        self.cursor() - self.starting_offset()
    }

    fn grow(&mut self, needed: usize) {
        self.buffer().borrow_mut().grow(needed);
    }

    fn increase_cursor(&mut self, num_bytes: usize) {
        self.buffer().borrow_mut().increase_writer_index(num_bytes);
    }

    fn bitmap_offset(&self) -> usize {
        self.starting_offset() + self.base().bytes_before_bitmap
    }

    fn set_null_at(&mut self, i: usize) {
        let offset = self.bitmap_offset();
        let buffer = self.buffer();
        let mut buffer = buffer.borrow_mut();
        bit::set_bit(&mut buffer.as_slice_mut()[offset..], i);
    }

    fn set_not_null_at(&mut self, i: usize) {
        let offset = self.bitmap_offset();
        let buffer = self.buffer();
        let mut buffer = buffer.borrow_mut();
        bit::unset_bit(&mut buffer.as_slice_mut()[offset..], i);
    }

    fn is_null_at(&self, i: usize) -> bool {
        let offset = self.bitmap_offset();
        let buffer = self.buffer();
        let buffer = buffer.borrow();
        bit::get_bit(&buffer.as_slice()[offset..], i)
    }

    /// Stores `(absolute_offset - starting_offset) << 32 | size` in slot `i`.
    fn set_offset_and_size(&mut self, i: usize, absolute_offset: usize, size: usize) {
        let relative_offset = absolute_offset - self.starting_offset();
        assert!(
            relative_offset <= u32::MAX as usize && size <= u32::MAX as usize,
            "Offset {relative_offset} or size {size} does not fit in 32 bits"
        );
        let offset_and_size = ((relative_offset as u64) << 32) | size as u64;
        self.write(i, offset_and_size as i64);
    }

    /// Zeroes the last word of a payload of `num_bytes` that starts at the cursor, so that the
    /// padding after an unaligned payload is zero.
    fn zero_out_padding_bytes(&mut self, num_bytes: usize) {
        if !bit::is_multiple_of_8(num_bytes) {
            let offset = self.cursor() + ((num_bytes >> 3) << 3);
            self.buffer().borrow_mut().put(offset, 0i64);
        }
    }

    fn write_string(&mut self, i: usize, value: &str) {
        self.write_unaligned(i, value.as_bytes());
    }

    fn write_bytes(&mut self, i: usize, value: &[u8]) {
        self.write_unaligned(i, value);
    }

    /// Appends `input` padded with zeros to a word and records it in slot `i`.
    fn write_unaligned(&mut self, i: usize, input: &[u8]) {
        let num_bytes = input.len();
        let rounded_size = bit::round_up_to_word(num_bytes);
        self.grow(rounded_size);
        self.zero_out_padding_bytes(num_bytes);
        let cursor = self.cursor();
        self.buffer().borrow_mut().put_bytes(cursor, input);
        self.set_offset_and_size(i, cursor, num_bytes);
        self.increase_cursor(rounded_size);
    }

    fn write_row(&mut self, i: usize, row: &Row) {
        self.write_aligned(i, row.buffer(), row.base_offset(), row.size_bytes());
    }

    fn write_array(&mut self, i: usize, array: &ArrayData) {
        self.write_aligned(i, array.buffer(), array.base_offset(), array.size_bytes());
    }

    fn write_map(&mut self, i: usize, map: &MapData) {
        self.write_aligned(i, map.buffer(), map.base_offset(), map.size_bytes());
    }

    /// Copies `num_bytes` of an already encoded, word aligned region of `source` to the cursor
    /// and records it in slot `i`. `source` may be this writer's own buffer.
    fn write_aligned(&mut self, i: usize, source: &BufferRef, offset: usize, num_bytes: usize) {
        debug_assert!(bit::is_multiple_of_8(num_bytes));
        self.grow(num_bytes);
        let cursor = self.cursor();
        let buffer = self.buffer();
        if Rc::ptr_eq(&buffer, source) {
            buffer.borrow_mut().copy_within(offset, cursor, num_bytes);
        } else {
            buffer
                .borrow_mut()
                .copy_from(cursor, source.borrow().as_slice(), offset, num_bytes);
        }
        self.set_offset_and_size(i, cursor, num_bytes);
        self.increase_cursor(num_bytes);
    }

    /// Appends an 8-byte word at the cursor.
    fn write_directly(&mut self, value: i64) {
        self.grow(8);
        let cursor = self.cursor();
        self.buffer().borrow_mut().put(cursor, value);
        self.increase_cursor(8);
    }

    /// Overwrites the 8-byte word at the absolute `offset`.
    fn write_directly_at(&mut self, offset: usize, value: i64) {
        self.buffer().borrow_mut().put(offset, value);
    }

    /// Replaces the buffer of this writer and of all nested writers created from it.
    fn set_buffer(&mut self, buffer: BufferRef) {
        self.base().link.set_buffer(&buffer);
    }
}

/// Writes records of a fixed schema.
///
/// ```text
/// +--------------------+-------------------+------------------------+
/// | null bitmap        | fixed-width slots | variable-length region |
/// | ceil(N / 64) * 8 B | N * 8 B           | 8-byte aligned         |
/// +--------------------+-------------------+------------------------+
/// ```
///
/// Call [`RowWriter::reset`] before writing each record.
#[derive(Debug)]
pub struct RowWriter {
    base: WriterBase,
    schema: SchemaRef,
    header_in_bytes: usize,
    fixed_size: usize,
}

impl RowWriter {
    /// Creates a writer with its own buffer of `8 * num_fields` bytes.
    pub fn new(schema: SchemaRef) -> Self {
        let size = schema.fields().len() * 8;
        Self::with_buffer_size(schema, size)
    }

    pub fn with_config(schema: SchemaRef, config: &RowFormatConfig) -> Self {
        match config.writer_initial_buffer_size {
            Some(size) => Self::with_buffer_size(schema, size),
            None => Self::new(schema),
        }
    }

    fn with_buffer_size(schema: SchemaRef, size: usize) -> Self {
        Self::from_base(schema, WriterBase::new(Buffer::new(size).into_ref(), 0))
    }

    /// Creates a writer for a record nested inside a value written by `parent`. Both writers
    /// share the same buffer.
    pub fn new_nested<W: Writer>(schema: SchemaRef, parent: &W) -> Self {
        Self::from_base(schema, WriterBase::new_nested(parent.base(), 0))
    }

    fn from_base(schema: SchemaRef, base: WriterBase) -> Self {
        let num_fields = schema.fields().len();
        let header_in_bytes = bit::bitmap_width_in_bytes(num_fields);
        Self {
            base,
            schema,
            header_in_bytes,
            fixed_size: header_in_bytes + num_fields * 8,
        }
    }

    pub fn schema(&self) -> &SchemaRef {
        &self.schema
    }

    /// Starts a new record at the cursor: reserves the bitmap and the slots and clears the
    /// bitmap.
    pub fn reset(&mut self) {
        let cursor = self.cursor();
        self.base.starting_offset = cursor;
        self.grow(self.fixed_size);
        self.increase_cursor(self.fixed_size);
        self.buffer()
            .borrow_mut()
            .fill_zero(cursor, self.header_in_bytes);
    }

    /// A view of the record written since the last reset. It shares the writer's buffer.
    pub fn to_row(&self) -> Row {
        Row::new(
            Arc::clone(&self.schema),
            self.buffer(),
            self.starting_offset(),
            self.size(),
        )
    }
}

impl Writer for RowWriter {
    fn base(&self) -> &WriterBase {
        &self.base
    }

    #[inline]
    fn get_offset(&self, i: usize) -> usize {
        self.starting_offset() + self.header_in_bytes + i * 8
    }

    /// Writes `value` into the low bytes of the 8-byte slot of field `i`, zeroing the rest.
    #[inline]
    fn write<T: FixedWidth>(&mut self, i: usize, value: T) {
        debug_assert!(i < self.schema.fields().len());
        let offset = self.get_offset(i);
        let buffer = self.buffer();
        let mut buffer = buffer.borrow_mut();
        if T::WIDTH < 8 {
            buffer.put(offset, 0i64);
        }
        buffer.put(offset, value);
    }
}

/// Writes lists whose elements have the type of a list [`DataType`].
///
/// Call [`ArrayWriter::reset`] with the number of elements before writing each list.
#[derive(Debug)]
pub struct ArrayWriter {
    base: WriterBase,
    data_type: DataType,
    element_size: usize,
    num_elements: usize,
    header_in_bytes: usize,
}

impl ArrayWriter {
    /// Creates a writer with its own buffer.
    ///
    /// # Panics
    ///
    /// Panics if `data_type` is not a list type.
    pub fn new(data_type: &DataType) -> Self {
        Self::with_buffer_size(data_type, DEFAULT_ARRAY_BUFFER_SIZE)
    }

    pub fn with_config(data_type: &DataType, config: &RowFormatConfig) -> Self {
        let size = config
            .writer_initial_buffer_size
            .unwrap_or(DEFAULT_ARRAY_BUFFER_SIZE);
        Self::with_buffer_size(data_type, size)
    }

    fn with_buffer_size(data_type: &DataType, size: usize) -> Self {
        Self::from_base(data_type, WriterBase::new(Buffer::new(size).into_ref(), 8))
    }

    /// Creates a writer for a list nested inside a value written by `parent`. Both writers
    /// share the same buffer.
    pub fn new_nested<W: Writer>(data_type: &DataType, parent: &W) -> Self {
        Self::from_base(data_type, WriterBase::new_nested(parent.base(), 8))
    }

    fn from_base(data_type: &DataType, base: WriterBase) -> Self {
        let element_size = match types::list_field(data_type) {
            Ok(field) => types::element_size(field.data_type()),
            Err(e) => panic!("{e}"),
        };
        Self {
            base,
            data_type: data_type.clone(),
            element_size,
            num_elements: 0,
            header_in_bytes: 0,
        }
    }

    pub fn data_type(&self) -> &DataType {
        &self.data_type
    }

    pub fn num_elements(&self) -> usize {
        self.num_elements
    }

    /// Starts a new list of `num_elements` at the cursor: writes the element count, reserves
    /// the bitmap and the element region, and zeroes both.
    pub fn reset(&mut self, num_elements: usize) {
        let cursor = self.cursor();
        self.base.starting_offset = cursor;
        self.num_elements = num_elements;
        self.header_in_bytes = ArrayData::calculate_header_in_bytes(num_elements);
        let data_size = num_elements * self.element_size;
        assert!(
            data_size < i32::MAX as usize,
            "List of {num_elements} elements is too large"
        );
        let fixed_size = self.header_in_bytes + bit::round_up_to_word(data_size);
        self.grow(fixed_size);
        let buffer = self.buffer();
        let mut buffer = buffer.borrow_mut();
        buffer.put(cursor, num_elements as i64);
        buffer.fill_zero(cursor + 8, fixed_size - 8);
        buffer.increase_writer_index(fixed_size);
    }

    /// Copies the list written since the last reset into a new buffer.
    pub fn copy_to_array_data(&self) -> ArrayData {
        let size = self.size();
        let buffer = self
            .buffer()
            .borrow()
            .copy(self.starting_offset(), size)
            .into_ref();
        ArrayData::new(&self.data_type, buffer, 0, size)
    }
}

impl Writer for ArrayWriter {
    fn base(&self) -> &WriterBase {
        &self.base
    }

    #[inline]
    fn get_offset(&self, i: usize) -> usize {
        self.starting_offset() + self.header_in_bytes + i * self.element_size
    }

    /// Writes `value` at the native width of the element type. The element region was zeroed
    /// by [`ArrayWriter::reset`].
    #[inline]
    fn write<T: FixedWidth>(&mut self, i: usize, value: T) {
        debug_assert!(i < self.num_elements);
        debug_assert_eq!(T::WIDTH, self.element_size);
        let offset = self.get_offset(i);
        self.buffer().borrow_mut().put(offset, value);
    }
}
