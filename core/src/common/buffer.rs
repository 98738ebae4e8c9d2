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

use crate::common::bit::{self, FixedWidth};
use log::trace;
use std::{
    alloc::{handle_alloc_error, Layout},
    cell::RefCell,
    ptr::NonNull,
    rc::Rc,
};

/// Shared handle to a [`Buffer`]. Writers and the views they produce hold clones of the same
/// handle, so they all observe the storage after it is reallocated by growth.
pub type BufferRef = Rc<RefCell<Buffer>>;

/// All buffers are aligned to 64 bytes.
const ALIGNMENT: usize = 64;

/// Indices into a buffer must stay addressable by a signed 32-bit offset.
const MAX_INDEX: usize = i32::MAX as usize;

/// A growable, zero-initialized byte buffer with a writer index and a reader index.
///
/// Typed values are stored little-endian through [`FixedWidth`]. The capacity is always a
/// multiple of 8 bytes, grows by roughly doubling, and never shrinks. Bytes that have not been
/// written are zero.
///
/// Reads are bounds checked against the capacity and panic on violation: an out-of-range read
/// means the encoded bytes or the schema used to decode them are corrupt.
#[derive(Debug)]
pub struct Buffer {
    data: NonNull<u8>,
    capacity: usize,
    writer_index: usize,
    reader_index: usize,
}

unsafe impl Sync for Buffer {}
unsafe impl Send for Buffer {}

impl Buffer {
    /// Allocates a zeroed buffer of at least `capacity` bytes, rounded up to a word.
    pub fn new(capacity: usize) -> Self {
        let capacity = bit::round_up_to_word(capacity.max(1));
        let layout = Self::layout(capacity);
        unsafe {
            let ptr = std::alloc::alloc_zeroed(layout);
            Self {
                data: NonNull::new(ptr).unwrap_or_else(|| handle_alloc_error(layout)),
                capacity,
                writer_index: 0,
                reader_index: 0,
            }
        }
    }

    /// Copies `bytes` into a new buffer whose writer index sits right after them.
    pub fn from_slice(bytes: &[u8]) -> Self {
        let mut buffer = Self::new(bytes.len());
        buffer.put_bytes(0, bytes);
        buffer.set_writer_index(bytes.len());
        buffer
    }

    /// Wraps this buffer into a shared handle.
    pub fn into_ref(self) -> BufferRef {
        Rc::new(RefCell::new(self))
    }

    fn layout(capacity: usize) -> Layout {
        Layout::from_size_align(capacity, ALIGNMENT)
            .unwrap_or_else(|_| panic!("Invalid buffer capacity {capacity}"))
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn writer_index(&self) -> usize {
        self.writer_index
    }

    pub fn set_writer_index(&mut self, writer_index: usize) {
        assert!(
            writer_index < MAX_INDEX,
            "Buffer overflow writer_index {writer_index} target {MAX_INDEX}"
        );
        self.writer_index = writer_index;
    }

    pub fn increase_writer_index(&mut self, diff: usize) {
        self.set_writer_index(self.writer_index + diff);
    }

    pub fn reader_index(&self) -> usize {
        self.reader_index
    }

    pub fn set_reader_index(&mut self, reader_index: usize) {
        assert!(
            reader_index < MAX_INDEX,
            "Buffer overflow reader_index {reader_index} target {MAX_INDEX}"
        );
        self.reader_index = reader_index;
    }

    pub fn increase_reader_index(&mut self, diff: usize) {
        self.set_reader_index(self.reader_index + diff);
    }

    /// Returns the whole allocation, written or not, as a slice.
    pub fn as_slice(&self) -> &[u8] {
        unsafe { std::slice::from_raw_parts(self.data.as_ptr(), self.capacity) }
    }

    pub fn as_slice_mut(&mut self) -> &mut [u8] {
        unsafe { std::slice::from_raw_parts_mut(self.data.as_ptr(), self.capacity) }
    }

    /// Stores `value` at `offset`. The caller reserves the space beforehand with [`Self::grow`];
    /// writing past the capacity panics.
    #[inline]
    pub fn put<T: FixedWidth>(&mut self, offset: usize, value: T) {
        value.write_le(&mut self.as_slice_mut()[offset..offset + T::WIDTH]);
    }

    #[inline]
    pub fn get<T: FixedWidth>(&self, offset: usize) -> T {
        self.check_range(offset, T::WIDTH);
        T::read_le(&self.as_slice()[offset..offset + T::WIDTH])
    }

    pub fn put_bytes(&mut self, offset: usize, src: &[u8]) {
        self.as_slice_mut()[offset..offset + src.len()].copy_from_slice(src);
    }

    pub fn get_bytes(&self, offset: usize, len: usize) -> &[u8] {
        self.check_range(offset, len);
        &self.as_slice()[offset..offset + len]
    }

    #[inline]
    fn check_range(&self, offset: usize, len: usize) {
        assert!(
            offset + len <= self.capacity,
            "Out of range: {len} bytes at offset {offset} exceed capacity {}",
            self.capacity
        );
    }

    /// Writes `value` as a varint at `offset`: 7 bits per byte, lowest group first, with the
    /// high bit of each byte set when more bytes follow. Returns the number of bytes written,
    /// between 1 and 5.
    pub fn put_var_u32(&mut self, offset: usize, mut value: u32) -> usize {
        let mut pos = offset;
        while value >= 0x80 {
            self.put(pos, (value as u8) | 0x80);
            value >>= 7;
            pos += 1;
        }
        self.put(pos, value as u8);
        pos + 1 - offset
    }

    /// Reads a varint written by [`Self::put_var_u32`]. Returns the value and the number of
    /// bytes it occupied.
    pub fn get_var_u32(&self, offset: usize) -> (u32, usize) {
        let mut result = 0u32;
        let mut shift = 0;
        let mut pos = offset;
        loop {
            let b: u8 = self.get(pos);
            pos += 1;
            result |= ((b & 0x7f) as u32) << shift;
            if b & 0x80 == 0 || shift == 28 {
                break;
            }
            shift += 7;
        }
        (result, pos - offset)
    }

    /// Appends a varint at the writer index.
    pub fn write_var_u32(&mut self, value: u32) {
        self.grow(5);
        let len = self.put_var_u32(self.writer_index, value);
        self.increase_writer_index(len);
    }

    /// Reads a varint at the reader index.
    pub fn read_var_u32(&mut self) -> u32 {
        let (value, len) = self.get_var_u32(self.reader_index);
        self.increase_reader_index(len);
        value
    }

    /// Makes sure `needed` more bytes fit after the writer index, reserving about twice the
    /// required size when they do not.
    #[inline]
    pub fn grow(&mut self, needed: usize) {
        let len = self.writer_index + needed;
        if len > self.capacity {
            self.reserve(bit::round_up_to_word(len * 2));
        }
    }

    /// Reallocates to hold at least `new_size` bytes. New bytes are zero. This is a no-op when
    /// the buffer is already large enough.
    pub fn reserve(&mut self, new_size: usize) {
        if new_size <= self.capacity {
            return;
        }
        let new_capacity = bit::round_up_to_word(new_size);
        trace!(
            "Growing buffer from {} to {} bytes",
            self.capacity,
            new_capacity
        );
        let new_layout = Self::layout(new_capacity);
        unsafe {
            let raw_ptr = std::alloc::realloc(
                self.data.as_ptr(),
                Self::layout(self.capacity),
                new_capacity,
            );
            let ptr = NonNull::new(raw_ptr).unwrap_or_else(|| handle_alloc_error(new_layout));
            ptr.as_ptr()
                .add(self.capacity)
                .write_bytes(0, new_capacity - self.capacity);
            self.data = ptr;
        }
        self.capacity = new_capacity;
    }

    /// Copies `nbytes` starting at `start` into a new buffer.
    pub fn copy(&self, start: usize, nbytes: usize) -> Buffer {
        Buffer::from_slice(self.get_bytes(start, nbytes))
    }

    /// Copies `out.len()` bytes starting at `start` into `out`.
    pub fn copy_to(&self, start: usize, out: &mut [u8]) {
        out.copy_from_slice(self.get_bytes(start, out.len()));
    }

    /// Copies `nbytes` of `src`, starting at `src_offset`, to `offset`.
    pub fn copy_from(&mut self, offset: usize, src: &[u8], src_offset: usize, nbytes: usize) {
        self.put_bytes(offset, &src[src_offset..src_offset + nbytes]);
    }

    /// Copies `nbytes` from `src_offset` to `dst_offset` inside this buffer. The ranges may
    /// overlap.
    pub fn copy_within(&mut self, src_offset: usize, dst_offset: usize, nbytes: usize) {
        self.check_range(src_offset, nbytes);
        self.as_slice_mut()
            .copy_within(src_offset..src_offset + nbytes, dst_offset);
    }

    pub fn fill_zero(&mut self, offset: usize, len: usize) {
        self.as_slice_mut()[offset..offset + len].fill(0);
    }

    /// Zeroes the whole allocation.
    pub fn zero_padding(&mut self) {
        self.as_slice_mut().fill(0);
    }

    /// Returns whether the first `nbytes` of both buffers are equal.
    pub fn eq_prefix(&self, other: &Buffer, nbytes: usize) -> bool {
        nbytes <= self.capacity
            && nbytes <= other.capacity
            && self.as_slice()[..nbytes] == other.as_slice()[..nbytes]
    }

    /// Hex rendering of the whole allocation.
    pub fn hex(&self) -> String {
        bit::hex(self.as_slice())
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        unsafe { std::alloc::dealloc(self.data.as_ptr(), Self::layout(self.capacity)) }
    }
}

/// Two buffers are equal when they hold the same written bytes.
impl PartialEq for Buffer {
    fn eq(&self, other: &Buffer) -> bool {
        if self.data.as_ptr() == other.data.as_ptr() {
            return true;
        }
        self.writer_index == other.writer_index && self.eq_prefix(other, self.writer_index)
    }
}
