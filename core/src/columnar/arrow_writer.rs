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

//! Converts rows into an Arrow [`RecordBatch`].
//!
//! One [`ArrowArrayWriter`] is created per schema field. List, struct and map writers own the
//! writers of their children, so a whole nested type is handled by a single tree of writers.

use std::sync::Arc;

use arrow::array::{
    ArrayBuilder, ArrayRef, BinaryBuilder, BooleanBuilder, ListArray, MapArray, PrimitiveBuilder,
    StringBuilder, StructArray,
};
use arrow::buffer::{NullBuffer, OffsetBuffer, ScalarBuffer};
use arrow::datatypes::{
    ArrowPrimitiveType, DataType, Date32Type, Date64Type, FieldRef, Fields, Float32Type,
    Float64Type, Int16Type, Int32Type, Int64Type, Int8Type, SchemaRef, Time32MillisecondType,
    Time32SecondType, Time64MicrosecondType, Time64NanosecondType, TimeUnit,
    TimestampMicrosecondType, TimestampMillisecondType, TimestampNanosecondType,
    TimestampSecondType,
};
use arrow::record_batch::{RecordBatch, RecordBatchOptions};
use log::{debug, warn};

use crate::config::RowFormatConfig;
use crate::errors::{RowError, RowResult};
use crate::row::{types, Getter, Row};

/// Appends values read from a [`Getter`] to an Arrow array under construction.
pub trait ArrowArrayWriter {
    fn data_type(&self) -> &DataType;

    /// Number of values appended since the last finish or reset.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Appends the value at index `i` of `getter`, or a null.
    fn write(&mut self, getter: &dyn Getter, i: usize) -> RowResult<()> {
        if getter.is_null_at(i) {
            self.append_null()
        } else {
            self.append_value(getter, i)
        }
    }

    fn append_null(&mut self) -> RowResult<()>;

    /// Appends the value at index `i` of `getter`, which must not be null.
    fn append_value(&mut self, getter: &dyn Getter, i: usize) -> RowResult<()>;

    /// Builds the array of all appended values. The writer is empty afterwards.
    fn finish(&mut self) -> RowResult<ArrayRef>;

    /// Drops all appended values.
    fn reset(&mut self);
}

/// Creates the writer for values of `data_type`. `capacity` is the number of values the
/// underlying builders initially make room for.
pub fn create_array_writer(
    data_type: &DataType,
    capacity: usize,
) -> RowResult<Box<dyn ArrowArrayWriter>> {
    let writer: Box<dyn ArrowArrayWriter> = match data_type {
        DataType::Boolean => Box::new(BooleanWriter::new(capacity)),
        DataType::Int8 => primitive::<Int8Type>(data_type, capacity, |g, i| g.get_int8(i)),
        DataType::Int16 => primitive::<Int16Type>(data_type, capacity, |g, i| g.get_int16(i)),
        DataType::Int32 => primitive::<Int32Type>(data_type, capacity, |g, i| g.get_int32(i)),
        DataType::Int64 => primitive::<Int64Type>(data_type, capacity, |g, i| g.get_int64(i)),
        DataType::Float32 => {
            primitive::<Float32Type>(data_type, capacity, |g, i| g.get_float(i))
        }
        DataType::Float64 => {
            primitive::<Float64Type>(data_type, capacity, |g, i| g.get_double(i))
        }
        DataType::Date32 => primitive::<Date32Type>(data_type, capacity, |g, i| g.get_int32(i)),
        DataType::Date64 => primitive::<Date64Type>(data_type, capacity, |g, i| g.get_int64(i)),
        DataType::Time32(TimeUnit::Second) => {
            primitive::<Time32SecondType>(data_type, capacity, |g, i| g.get_int32(i))
        }
        DataType::Time32(TimeUnit::Millisecond) => {
            primitive::<Time32MillisecondType>(data_type, capacity, |g, i| g.get_int32(i))
        }
        DataType::Time64(TimeUnit::Microsecond) => {
            primitive::<Time64MicrosecondType>(data_type, capacity, |g, i| g.get_int64(i))
        }
        DataType::Time64(TimeUnit::Nanosecond) => {
            primitive::<Time64NanosecondType>(data_type, capacity, |g, i| g.get_int64(i))
        }
        DataType::Timestamp(unit, _) => match unit {
            TimeUnit::Second => {
                primitive::<TimestampSecondType>(data_type, capacity, |g, i| g.get_int64(i))
            }
            TimeUnit::Millisecond => {
                primitive::<TimestampMillisecondType>(data_type, capacity, |g, i| g.get_int64(i))
            }
            TimeUnit::Microsecond => {
                primitive::<TimestampMicrosecondType>(data_type, capacity, |g, i| g.get_int64(i))
            }
            TimeUnit::Nanosecond => {
                primitive::<TimestampNanosecondType>(data_type, capacity, |g, i| g.get_int64(i))
            }
        },
        DataType::Binary => Box::new(BinaryWriter::new(capacity)),
        DataType::Utf8 => Box::new(StringWriter::new(capacity)),
        DataType::List(field) => Box::new(ListWriter::try_new(data_type, field, capacity)?),
        DataType::Map(field, ordered) => {
            Box::new(MapWriter::try_new(data_type, field, *ordered, capacity)?)
        }
        DataType::Struct(fields) => Box::new(StructWriter::try_new(data_type, fields, capacity)?),
        _ => {
            warn!("Columnar conversion does not support {data_type}");
            return Err(RowError::NotImplemented(format!(
                "Unsupported type: {data_type}"
            )));
        }
    };
    Ok(writer)
}

fn primitive<T: ArrowPrimitiveType>(
    data_type: &DataType,
    capacity: usize,
    read: fn(&dyn Getter, usize) -> T::Native,
) -> Box<dyn ArrowArrayWriter> {
    Box::new(PrimitiveWriter::<T>::new(data_type, capacity, read))
}

/// Builds a null buffer out of validity flags, or `None` when every value is valid.
fn take_nulls(validity: &mut Vec<bool>) -> Option<NullBuffer> {
    let validity = std::mem::take(validity);
    if validity.iter().all(|valid| *valid) {
        None
    } else {
        Some(NullBuffer::from(validity))
    }
}

fn take_offsets(offsets: &mut Vec<i32>) -> OffsetBuffer<i32> {
    let offsets = std::mem::replace(offsets, vec![0]);
    OffsetBuffer::new(ScalarBuffer::from(offsets))
}

fn end_offset(len: usize) -> RowResult<i32> {
    i32::try_from(len)
        .map_err(|_| RowError::Internal(format!("{len} child values overflow list offsets")))
}

struct PrimitiveWriter<T: ArrowPrimitiveType> {
    data_type: DataType,
    capacity: usize,
    builder: PrimitiveBuilder<T>,
    read: fn(&dyn Getter, usize) -> T::Native,
}

impl<T: ArrowPrimitiveType> PrimitiveWriter<T> {
    fn new(
        data_type: &DataType,
        capacity: usize,
        read: fn(&dyn Getter, usize) -> T::Native,
    ) -> Self {
        Self {
            data_type: data_type.clone(),
            capacity,
            builder: Self::builder(data_type, capacity),
            read,
        }
    }

    /// The data type carries the time unit and the timezone of temporal types.
    fn builder(data_type: &DataType, capacity: usize) -> PrimitiveBuilder<T> {
        PrimitiveBuilder::<T>::with_capacity(capacity).with_data_type(data_type.clone())
    }
}

impl<T: ArrowPrimitiveType> ArrowArrayWriter for PrimitiveWriter<T> {
    fn data_type(&self) -> &DataType {
        &self.data_type
    }

    fn len(&self) -> usize {
        self.builder.len()
    }

    fn append_null(&mut self) -> RowResult<()> {
        self.builder.append_null();
        Ok(())
    }

    fn append_value(&mut self, getter: &dyn Getter, i: usize) -> RowResult<()> {
        self.builder.append_value((self.read)(getter, i));
        Ok(())
    }

    fn finish(&mut self) -> RowResult<ArrayRef> {
        Ok(Arc::new(self.builder.finish()))
    }

    fn reset(&mut self) {
        self.builder = Self::builder(&self.data_type, self.capacity);
    }
}

struct BooleanWriter {
    data_type: DataType,
    capacity: usize,
    builder: BooleanBuilder,
}

impl BooleanWriter {
    fn new(capacity: usize) -> Self {
        Self {
            data_type: DataType::Boolean,
            capacity,
            builder: BooleanBuilder::with_capacity(capacity),
        }
    }
}

impl ArrowArrayWriter for BooleanWriter {
    fn data_type(&self) -> &DataType {
        &self.data_type
    }

    fn len(&self) -> usize {
        self.builder.len()
    }

    fn append_null(&mut self) -> RowResult<()> {
        self.builder.append_null();
        Ok(())
    }

    fn append_value(&mut self, getter: &dyn Getter, i: usize) -> RowResult<()> {
        self.builder.append_value(getter.get_bool(i));
        Ok(())
    }

    fn finish(&mut self) -> RowResult<ArrayRef> {
        Ok(Arc::new(self.builder.finish()))
    }

    fn reset(&mut self) {
        self.builder = BooleanBuilder::with_capacity(self.capacity);
    }
}

/// Estimated bytes per variable-length value when sizing builders.
const BYTES_PER_VALUE: usize = 16;

struct BinaryWriter {
    data_type: DataType,
    capacity: usize,
    builder: BinaryBuilder,
}

impl BinaryWriter {
    fn new(capacity: usize) -> Self {
        Self {
            data_type: DataType::Binary,
            capacity,
            builder: BinaryBuilder::with_capacity(capacity, capacity * BYTES_PER_VALUE),
        }
    }
}

impl ArrowArrayWriter for BinaryWriter {
    fn data_type(&self) -> &DataType {
        &self.data_type
    }

    fn len(&self) -> usize {
        self.builder.len()
    }

    fn append_null(&mut self) -> RowResult<()> {
        self.builder.append_null();
        Ok(())
    }

    fn append_value(&mut self, getter: &dyn Getter, i: usize) -> RowResult<()> {
        match getter.get_binary_ref(i) {
            Some(bytes) => self.builder.append_value(&*bytes),
            None => self.builder.append_null(),
        }
        Ok(())
    }

    fn finish(&mut self) -> RowResult<ArrayRef> {
        Ok(Arc::new(self.builder.finish()))
    }

    fn reset(&mut self) {
        self.builder = BinaryBuilder::with_capacity(self.capacity, self.capacity * BYTES_PER_VALUE);
    }
}

struct StringWriter {
    data_type: DataType,
    capacity: usize,
    builder: StringBuilder,
}

impl StringWriter {
    fn new(capacity: usize) -> Self {
        Self {
            data_type: DataType::Utf8,
            capacity,
            builder: StringBuilder::with_capacity(capacity, capacity * BYTES_PER_VALUE),
        }
    }
}

impl ArrowArrayWriter for StringWriter {
    fn data_type(&self) -> &DataType {
        &self.data_type
    }

    fn len(&self) -> usize {
        self.builder.len()
    }

    fn append_null(&mut self) -> RowResult<()> {
        self.builder.append_null();
        Ok(())
    }

    fn append_value(&mut self, getter: &dyn Getter, i: usize) -> RowResult<()> {
        match getter.get_binary_ref(i) {
            Some(bytes) => self.builder.append_value(std::str::from_utf8(&bytes)?),
            None => self.builder.append_null(),
        }
        Ok(())
    }

    fn finish(&mut self) -> RowResult<ArrayRef> {
        Ok(Arc::new(self.builder.finish()))
    }

    fn reset(&mut self) {
        self.builder = StringBuilder::with_capacity(self.capacity, self.capacity * BYTES_PER_VALUE);
    }
}

struct ListWriter {
    data_type: DataType,
    field: FieldRef,
    values: Box<dyn ArrowArrayWriter>,
    offsets: Vec<i32>,
    validity: Vec<bool>,
}

impl ListWriter {
    fn try_new(data_type: &DataType, field: &FieldRef, capacity: usize) -> RowResult<Self> {
        let mut offsets = Vec::with_capacity(capacity + 1);
        offsets.push(0);
        Ok(Self {
            data_type: data_type.clone(),
            field: Arc::clone(field),
            values: create_array_writer(field.data_type(), capacity)?,
            offsets,
            validity: Vec::with_capacity(capacity),
        })
    }

    fn push_offset(&mut self) -> RowResult<()> {
        self.offsets.push(end_offset(self.values.len())?);
        Ok(())
    }
}

impl ArrowArrayWriter for ListWriter {
    fn data_type(&self) -> &DataType {
        &self.data_type
    }

    fn len(&self) -> usize {
        self.validity.len()
    }

    fn append_null(&mut self) -> RowResult<()> {
        self.push_offset()?;
        self.validity.push(false);
        Ok(())
    }

    fn append_value(&mut self, getter: &dyn Getter, i: usize) -> RowResult<()> {
        let array = match getter.get_array(i) {
            Some(array) => array,
            None => return self.append_null(),
        };
        for j in 0..array.num_elements() {
            self.values.write(&array, j)?;
        }
        self.push_offset()?;
        self.validity.push(true);
        Ok(())
    }

    fn finish(&mut self) -> RowResult<ArrayRef> {
        let values = self.values.finish()?;
        let offsets = take_offsets(&mut self.offsets);
        let nulls = take_nulls(&mut self.validity);
        Ok(Arc::new(ListArray::try_new(Arc::clone(&self.field), offsets, values, nulls)?))
    }

    fn reset(&mut self) {
        self.values.reset();
        self.offsets.truncate(1);
        self.validity.clear();
    }
}

struct StructWriter {
    data_type: DataType,
    fields: Fields,
    children: Vec<Box<dyn ArrowArrayWriter>>,
    validity: Vec<bool>,
}

impl StructWriter {
    fn try_new(data_type: &DataType, fields: &Fields, capacity: usize) -> RowResult<Self> {
        let children = fields
            .iter()
            .map(|field| create_array_writer(field.data_type(), capacity))
            .collect::<RowResult<Vec<_>>>()?;
        Ok(Self {
            data_type: data_type.clone(),
            fields: fields.clone(),
            children,
            validity: Vec::with_capacity(capacity),
        })
    }
}

impl ArrowArrayWriter for StructWriter {
    fn data_type(&self) -> &DataType {
        &self.data_type
    }

    fn len(&self) -> usize {
        self.validity.len()
    }

    /// Children get a null too, so that they stay as long as the struct.
    fn append_null(&mut self) -> RowResult<()> {
        for child in self.children.iter_mut() {
            child.append_null()?;
        }
        self.validity.push(false);
        Ok(())
    }

    fn append_value(&mut self, getter: &dyn Getter, i: usize) -> RowResult<()> {
        let row = match getter.get_struct(i) {
            Some(row) => row,
            None => return self.append_null(),
        };
        for (j, child) in self.children.iter_mut().enumerate() {
            child.write(&row, j)?;
        }
        self.validity.push(true);
        Ok(())
    }

    fn finish(&mut self) -> RowResult<ArrayRef> {
        let arrays = self
            .children
            .iter_mut()
            .map(|child| child.finish())
            .collect::<RowResult<Vec<_>>>()?;
        let len = self.validity.len();
        let nulls = take_nulls(&mut self.validity);
        // without children the length can only come from the struct itself
        if self.fields.is_empty() {
            return Ok(Arc::new(StructArray::new_empty_fields(len, nulls)));
        }
        Ok(Arc::new(StructArray::try_new(self.fields.clone(), arrays, nulls)?))
    }

    fn reset(&mut self) {
        for child in self.children.iter_mut() {
            child.reset();
        }
        self.validity.clear();
    }
}

struct MapWriter {
    data_type: DataType,
    entries_field: FieldRef,
    entries_fields: Fields,
    ordered: bool,
    keys: Box<dyn ArrowArrayWriter>,
    values: Box<dyn ArrowArrayWriter>,
    offsets: Vec<i32>,
    validity: Vec<bool>,
}

impl MapWriter {
    fn try_new(
        data_type: &DataType,
        entries_field: &FieldRef,
        ordered: bool,
        capacity: usize,
    ) -> RowResult<Self> {
        let (key_field, value_field) = types::map_key_value_fields(data_type)?;
        let entries_fields = Fields::from(vec![Arc::clone(key_field), Arc::clone(value_field)]);
        let mut offsets = Vec::with_capacity(capacity + 1);
        offsets.push(0);
        Ok(Self {
            data_type: data_type.clone(),
            entries_field: Arc::clone(entries_field),
            entries_fields,
            ordered,
            keys: create_array_writer(key_field.data_type(), capacity)?,
            values: create_array_writer(value_field.data_type(), capacity)?,
            offsets,
            validity: Vec::with_capacity(capacity),
        })
    }

    fn push_offset(&mut self) -> RowResult<()> {
        self.offsets.push(end_offset(self.keys.len())?);
        Ok(())
    }
}

impl ArrowArrayWriter for MapWriter {
    fn data_type(&self) -> &DataType {
        &self.data_type
    }

    fn len(&self) -> usize {
        self.validity.len()
    }

    fn append_null(&mut self) -> RowResult<()> {
        self.push_offset()?;
        self.validity.push(false);
        Ok(())
    }

    fn append_value(&mut self, getter: &dyn Getter, i: usize) -> RowResult<()> {
        let map = match getter.get_map(i) {
            Some(map) => map,
            None => return self.append_null(),
        };
        let (keys, values) = (map.keys_array(), map.values_array());
        for j in 0..map.num_elements() {
            self.keys.write(keys, j)?;
            self.values.write(values, j)?;
        }
        self.push_offset()?;
        self.validity.push(true);
        Ok(())
    }

    fn finish(&mut self) -> RowResult<ArrayRef> {
        let keys = self.keys.finish()?;
        let values = self.values.finish()?;
        let entries = StructArray::try_new(self.entries_fields.clone(), vec![keys, values], None)?;
        let offsets = take_offsets(&mut self.offsets);
        let nulls = take_nulls(&mut self.validity);
        Ok(Arc::new(MapArray::try_new(
            Arc::clone(&self.entries_field),
            offsets,
            entries,
            nulls,
            self.ordered,
        )?))
    }

    fn reset(&mut self) {
        self.keys.reset();
        self.values.reset();
        self.offsets.truncate(1);
        self.validity.clear();
    }
}

/// Accumulates rows of a schema into a [`RecordBatch`].
pub struct ArrowWriter {
    schema: SchemaRef,
    column_writers: Vec<Box<dyn ArrowArrayWriter>>,
    num_rows: usize,
}

impl ArrowWriter {
    /// Fails with [`RowError::NotImplemented`] when a field type cannot be converted.
    pub fn try_new(schema: SchemaRef) -> RowResult<Self> {
        Self::try_new_with_config(schema, &RowFormatConfig::default())
    }

    pub fn try_new_with_config(schema: SchemaRef, config: &RowFormatConfig) -> RowResult<Self> {
        let column_writers = schema
            .fields()
            .iter()
            .map(|field| create_array_writer(field.data_type(), config.columnar_batch_capacity))
            .collect::<RowResult<Vec<_>>>()?;
        debug!(
            "Created columnar writer with {} columns",
            column_writers.len()
        );
        Ok(Self {
            schema,
            column_writers,
            num_rows: 0,
        })
    }

    pub fn schema(&self) -> &SchemaRef {
        &self.schema
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    /// Appends one row. After an error the columns may differ in length and the writer should
    /// be reset.
    pub fn write(&mut self, row: &Row) -> RowResult<()> {
        if row.num_fields() != self.column_writers.len() {
            return Err(RowError::Internal(format!(
                "Row has {} fields but the schema has {} columns",
                row.num_fields(),
                self.column_writers.len()
            )));
        }
        for (i, writer) in self.column_writers.iter_mut().enumerate() {
            writer.write(row, i)?;
        }
        self.num_rows += 1;
        Ok(())
    }

    /// Builds a batch out of all rows written so far. The writer is empty afterwards.
    pub fn finish(&mut self) -> RowResult<RecordBatch> {
        let columns = self
            .column_writers
            .iter_mut()
            .map(|writer| writer.finish())
            .collect::<RowResult<Vec<_>>>()?;
        let options = RecordBatchOptions::new().with_row_count(Some(self.num_rows));
        let batch = RecordBatch::try_new_with_options(Arc::clone(&self.schema), columns, &options)?;
        debug!("Finished record batch of {} rows", self.num_rows);
        self.num_rows = 0;
        Ok(batch)
    }

    pub fn reset(&mut self) {
        for writer in self.column_writers.iter_mut() {
            writer.reset();
        }
        self.num_rows = 0;
    }
}
