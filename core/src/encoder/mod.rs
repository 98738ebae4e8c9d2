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

//! Typed encoding of Rust values into the row format.
//!
//! [`RowEncode`] maps a Rust type to its Arrow type and writes it into a slot of a [`Writer`].
//! Records register their fields in order through [`RowRecord`], usually with the
//! [`row_record!`](crate::row_record) macro:
//!
//! ```
//! use binary_row::row::Getter;
//! use binary_row::{encoder::RowEncoder, row_record};
//!
//! struct Point {
//!     x: i32,
//!     y: i32,
//!     label: Option<String>,
//! }
//!
//! row_record!(Point { x: i32, y: i32, label: Option<String> });
//!
//! let mut encoder = RowEncoder::<Point>::new();
//! let row = encoder.encode(&Point { x: 1, y: 2, label: None });
//! assert_eq!(2, row.get_int32(1));
//! assert_eq!("{x=1, y=2, label=null}", row.to_string());
//! ```

use std::{
    collections::{BTreeMap, HashMap},
    marker::PhantomData,
    sync::Arc,
};

use arrow::datatypes::{DataType, Field, Schema, SchemaRef};

use crate::common::Buffer;
use crate::config::RowFormatConfig;
use crate::row::types::{list_type, map_type};
use crate::row::{ArrayWriter, Row, RowWriter, Writer};

/// A value that can be written into a slot of a record or a list.
pub trait RowEncode {
    fn data_type() -> DataType;

    fn write_to<W: Writer>(&self, writer: &mut W, index: usize);
}

macro_rules! impl_fixed_width_encode {
    ($($ty: ty => $data_type: expr),*) => {
        $(
        impl RowEncode for $ty {
            fn data_type() -> DataType {
                $data_type
            }

            #[inline]
            fn write_to<W: Writer>(&self, writer: &mut W, index: usize) {
                writer.write(index, *self);
            }
        }
        )*
    };
}

impl_fixed_width_encode! {
    bool => DataType::Boolean,
    i8 => DataType::Int8,
    i16 => DataType::Int16,
    i32 => DataType::Int32,
    i64 => DataType::Int64,
    f32 => DataType::Float32,
    f64 => DataType::Float64
}

impl RowEncode for str {
    fn data_type() -> DataType {
        DataType::Utf8
    }

    fn write_to<W: Writer>(&self, writer: &mut W, index: usize) {
        writer.write_string(index, self);
    }
}

impl RowEncode for String {
    fn data_type() -> DataType {
        DataType::Utf8
    }

    fn write_to<W: Writer>(&self, writer: &mut W, index: usize) {
        writer.write_string(index, self);
    }
}

impl<T: RowEncode> RowEncode for Option<T> {
    fn data_type() -> DataType {
        T::data_type()
    }

    fn write_to<W: Writer>(&self, writer: &mut W, index: usize) {
        match self {
            Some(value) => value.write_to(writer, index),
            None => writer.set_null_at(index),
        }
    }
}

impl<T: RowEncode> RowEncode for [T] {
    fn data_type() -> DataType {
        list_type(T::data_type())
    }

    fn write_to<W: Writer>(&self, writer: &mut W, index: usize) {
        let offset = writer.cursor();
        let mut array_writer = ArrayWriter::new_nested(&Self::data_type(), &*writer);
        array_writer.reset(self.len());
        for (i, value) in self.iter().enumerate() {
            value.write_to(&mut array_writer, i);
        }
        let size = writer.cursor() - offset;
        writer.set_offset_and_size(index, offset, size);
    }
}

impl<T: RowEncode> RowEncode for Vec<T> {
    fn data_type() -> DataType {
        <[T]>::data_type()
    }

    fn write_to<W: Writer>(&self, writer: &mut W, index: usize) {
        self.as_slice().write_to(writer, index)
    }
}

impl<K: RowEncode, V: RowEncode> RowEncode for BTreeMap<K, V> {
    fn data_type() -> DataType {
        map_type(K::data_type(), V::data_type())
    }

    fn write_to<W: Writer>(&self, writer: &mut W, index: usize) {
        write_map_entries(writer, index, self.len(), self.iter())
    }
}

impl<K: RowEncode, V: RowEncode, S> RowEncode for HashMap<K, V, S> {
    fn data_type() -> DataType {
        map_type(K::data_type(), V::data_type())
    }

    fn write_to<W: Writer>(&self, writer: &mut W, index: usize) {
        write_map_entries(writer, index, self.len(), self.iter())
    }
}

/// Writes `len` key/value pairs as a map into slot `index`, in iteration order.
pub fn write_map_entries<'a, K, V, W, I>(writer: &mut W, index: usize, len: usize, entries: I)
where
    K: RowEncode + 'a,
    V: RowEncode + 'a,
    W: Writer,
    I: Iterator<Item = (&'a K, &'a V)> + Clone,
{
    let offset = writer.cursor();
    // placeholder for the byte size of the key list
    writer.write_directly(-1);

    let mut key_writer = ArrayWriter::new_nested(&list_type(K::data_type()), &*writer);
    key_writer.reset(len);
    for (i, (key, _)) in entries.clone().enumerate() {
        key.write_to(&mut key_writer, i);
    }
    writer.write_directly_at(offset, key_writer.size() as i64);

    let mut value_writer = ArrayWriter::new_nested(&list_type(V::data_type()), &*writer);
    value_writer.reset(len);
    for (i, (_, value)) in entries.enumerate() {
        value.write_to(&mut value_writer, i);
    }

    let size = writer.cursor() - offset;
    writer.set_offset_and_size(index, offset, size);
}

/// A record type with an ordered list of named fields.
pub trait RowRecord {
    fn fields() -> Vec<Field>;

    /// Writes field `i` into slot `i` of `writer`, which has been reset.
    fn write_fields(&self, writer: &mut RowWriter);

    fn schema() -> SchemaRef
    where
        Self: Sized,
    {
        Arc::new(Schema::new(Self::fields()))
    }
}

/// Writes `value` as a record nested in slot `index`.
pub fn write_record<T: RowRecord, W: Writer>(value: &T, writer: &mut W, index: usize) {
    let offset = writer.cursor();
    let mut row_writer = RowWriter::new_nested(T::schema(), &*writer);
    row_writer.reset();
    value.write_fields(&mut row_writer);
    let size = writer.cursor() - offset;
    writer.set_offset_and_size(index, offset, size);
}

/// Implements [`RowRecord`] and [`RowEncode`] for a struct from its ordered field list.
///
/// Every field is declared nullable in the generated schema.
#[macro_export]
macro_rules! row_record {
    ($ty:ty { $($field:ident : $field_ty:ty),* $(,)? }) => {
        impl $crate::encoder::RowRecord for $ty {
            fn fields() -> ::std::vec::Vec<$crate::arrow::datatypes::Field> {
                ::std::vec![$(
                    $crate::arrow::datatypes::Field::new(
                        stringify!($field),
                        <$field_ty as $crate::encoder::RowEncode>::data_type(),
                        true,
                    )
                ),*]
            }

            #[allow(unused_assignments, unused_mut, unused_variables)]
            fn write_fields(&self, writer: &mut $crate::row::RowWriter) {
                let mut index = 0usize;
                $(
                    <$field_ty as $crate::encoder::RowEncode>::write_to(
                        &self.$field,
                        writer,
                        index,
                    );
                    index += 1;
                )*
            }
        }

        impl $crate::encoder::RowEncode for $ty {
            fn data_type() -> $crate::arrow::datatypes::DataType {
                $crate::arrow::datatypes::DataType::Struct(
                    <$ty as $crate::encoder::RowRecord>::fields().into(),
                )
            }

            fn write_to<W: $crate::row::Writer>(&self, writer: &mut W, index: usize) {
                $crate::encoder::write_record(self, writer, index)
            }
        }
    };
}

/// Encodes records of type `T` into standalone rows.
///
/// Every call to [`RowEncoder::encode`] writes into a fresh buffer, so the rows returned by
/// earlier calls stay valid.
pub struct RowEncoder<T> {
    writer: RowWriter,
    initial_buffer_size: usize,
    _marker: PhantomData<T>,
}

impl<T: RowRecord> RowEncoder<T> {
    pub fn new() -> Self {
        Self::with_config(&RowFormatConfig::default())
    }

    pub fn with_config(config: &RowFormatConfig) -> Self {
        let schema = T::schema();
        let initial_buffer_size = config
            .writer_initial_buffer_size
            .unwrap_or(schema.fields().len() * 8);
        Self {
            writer: RowWriter::with_config(schema, config),
            initial_buffer_size,
            _marker: PhantomData,
        }
    }

    pub fn schema(&self) -> &SchemaRef {
        self.writer.schema()
    }

    pub fn encode(&mut self, value: &T) -> Row {
        self.writer
            .set_buffer(Buffer::new(self.initial_buffer_size).into_ref());
        self.writer.reset();
        value.write_fields(&mut self.writer);
        self.writer.to_row()
    }
}

impl<T: RowRecord> Default for RowEncoder<T> {
    fn default() -> Self {
        Self::new()
    }
}
