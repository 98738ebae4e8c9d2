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
    rc::Rc,
    sync::Arc,
};

use arrow::datatypes::DataType;

use crate::common::BufferRef;
use crate::row::types;
use crate::row::ArrayData;

/// A zero-copy view of a map encoded in the row format.
///
/// ```text
/// +-------------------+-----------------+-------------------+
/// | key list size (B) | key list        | value list        |
/// | 8 B               | key list size B | remaining bytes   |
/// +-------------------+-----------------+-------------------+
/// ```
///
/// Keys and values are two lists of equal length. The pair at index `i` is made of the `i`-th
/// key and the `i`-th value, in the order the map was written.
#[derive(Clone)]
pub struct MapData {
    data_type: DataType,
    keys: ArrayData,
    values: ArrayData,
    buffer: BufferRef,
    base_offset: usize,
    size_bytes: usize,
}

impl MapData {
    /// # Panics
    ///
    /// Panics if `data_type` is not a map type, if the stored sizes are inconsistent with
    /// `size_bytes`, or if the key and value lists differ in length.
    pub fn new(
        data_type: &DataType,
        buffer: BufferRef,
        base_offset: usize,
        size_bytes: usize,
    ) -> Self {
        let (key_field, value_field) = match types::map_key_value_fields(data_type) {
            Ok(fields) => fields,
            Err(e) => panic!("{e}"),
        };

        let key_array_size: i64 = buffer.borrow().get(base_offset);
        if key_array_size < 0 {
            panic!("Negative key array size in bytes: {key_array_size}");
        }
        let key_array_size = key_array_size as usize;
        if key_array_size + 8 > size_bytes {
            panic!("Key array size {key_array_size} exceeds map size {size_bytes}");
        }
        let value_array_size = size_bytes - 8 - key_array_size;

        let keys = ArrayData::new(
            &DataType::List(Arc::clone(key_field)),
            Rc::clone(&buffer),
            base_offset + 8,
            key_array_size,
        );
        let values = ArrayData::new(
            &DataType::List(Arc::clone(value_field)),
            Rc::clone(&buffer),
            base_offset + 8 + key_array_size,
            value_array_size,
        );

        if keys.num_elements() != values.num_elements() {
            panic!(
                "Number of keys {} and values {} mismatch",
                keys.num_elements(),
                values.num_elements()
            );
        }

        Self {
            data_type: data_type.clone(),
            keys,
            values,
            buffer,
            base_offset,
            size_bytes,
        }
    }

    pub fn data_type(&self) -> &DataType {
        &self.data_type
    }

    pub fn num_elements(&self) -> usize {
        self.keys.num_elements()
    }

    pub fn keys_array(&self) -> &ArrayData {
        &self.keys
    }

    pub fn values_array(&self) -> &ArrayData {
        &self.values
    }

    pub fn buffer(&self) -> &BufferRef {
        &self.buffer
    }

    pub fn base_offset(&self) -> usize {
        self.base_offset
    }

    pub fn size_bytes(&self) -> usize {
        self.size_bytes
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.buffer
            .borrow()
            .get_bytes(self.base_offset, self.size_bytes)
            .to_vec()
    }
}

impl Display for MapData {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Map({}, {})", self.keys, self.values)
    }
}

impl Debug for MapData {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapData")
            .field("num_elements", &self.num_elements())
            .field("base_offset", &self.base_offset)
            .field("size_bytes", &self.size_bytes)
            .finish()
    }
}
