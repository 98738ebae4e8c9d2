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

//! Helpers for building and inspecting the Arrow types that describe row layouts.

use std::sync::Arc;

use arrow::datatypes::{DataType, Field, FieldRef, Fields, Schema, SchemaRef};

use crate::errors::{RowError, RowResult};

/// A list of `element`, with a nullable `item` field.
pub fn list_type(element: DataType) -> DataType {
    DataType::new_list(element, true)
}

/// A map from `key` to `value`. Entries are stored as a non-nullable `entries` struct of a
/// non-nullable `key` and a nullable `value`.
pub fn map_type(key: DataType, value: DataType) -> DataType {
    let entries = Field::new(
        "entries",
        DataType::Struct(Fields::from(vec![
            Field::new("key", key, false),
            Field::new("value", value, true),
        ])),
        false,
    );
    DataType::Map(Arc::new(entries), false)
}

pub fn struct_type(fields: Vec<Field>) -> DataType {
    DataType::Struct(Fields::from(fields))
}

pub fn schema_of(fields: Vec<Field>) -> SchemaRef {
    Arc::new(Schema::new(fields))
}

/// Width in bytes of a value of `data_type` when it is stored inline in a list, or `None` for
/// types that are stored as an offset and size into the variable-length region.
pub fn fixed_width(data_type: &DataType) -> Option<usize> {
    match data_type {
        DataType::Boolean | DataType::Int8 | DataType::UInt8 => Some(1),
        DataType::Int16 | DataType::UInt16 => Some(2),
        DataType::Int32
        | DataType::UInt32
        | DataType::Float32
        | DataType::Date32
        | DataType::Time32(_) => Some(4),
        DataType::Int64
        | DataType::UInt64
        | DataType::Float64
        | DataType::Date64
        | DataType::Time64(_)
        | DataType::Timestamp(_, _) => Some(8),
        _ => None,
    }
}

/// Stride of an element of `data_type` inside a list.
pub fn element_size(data_type: &DataType) -> usize {
    fixed_width(data_type).unwrap_or(8)
}

/// Returns the item field of a list type.
pub fn list_field(data_type: &DataType) -> RowResult<&FieldRef> {
    match data_type {
        DataType::List(field) => Ok(field),
        _ => Err(RowError::Internal(format!(
            "Expected a list type, found {data_type}"
        ))),
    }
}

/// Returns the key and value fields of a map type.
pub fn map_key_value_fields(data_type: &DataType) -> RowResult<(&FieldRef, &FieldRef)> {
    let entries = match data_type {
        DataType::Map(entries, _) => entries,
        _ => {
            return Err(RowError::Internal(format!(
                "Expected a map type, found {data_type}"
            )))
        }
    };
    match entries.data_type() {
        DataType::Struct(fields) if fields.len() == 2 => Ok((&fields[0], &fields[1])),
        dt => Err(RowError::Internal(format!(
            "Map entries must be a struct of key and value, found {dt}"
        ))),
    }
}
