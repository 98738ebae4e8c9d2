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

use std::collections::BTreeMap;
use std::sync::Arc;

use arrow::array::{Array, AsArray};
use arrow::datatypes::{
    ArrowPrimitiveType, DataType, Date32Type, Date64Type, Field, Float32Type, Float64Type,
    Int32Type, Int64Type, Time32MillisecondType, Time32SecondType, Time64MicrosecondType,
    Time64NanosecondType, TimeUnit, TimestampMicrosecondType, TimestampMillisecondType,
    TimestampNanosecondType, TimestampSecondType,
};
use binary_row::columnar::ArrowWriter;
use binary_row::common::Buffer;
use binary_row::config::RowFormatConfig;
use binary_row::encoder::{RowEncode, RowEncoder};
use binary_row::row::types::{list_type, map_type, schema_of};
use binary_row::row::{ArrayData, ArrayWriter, Getter, Row, RowWriter, Writer};
use binary_row::row_record;
use rand::Rng;

#[test]
fn test_base_types_to_record_batch() {
    let schema = schema_of(vec![
        Field::new("f1", DataType::Int32, true),
        Field::new("f2", DataType::Int64, true),
        Field::new("f3", DataType::Float64, true),
    ]);
    let mut row_writer = RowWriter::new(Arc::clone(&schema));
    let mut arrow_writer = ArrowWriter::try_new(Arc::clone(&schema)).unwrap();

    for _ in 0..100 {
        let buffer = Buffer::new(16).into_ref();
        row_writer.set_buffer(buffer);
        row_writer.reset();
        row_writer.write(0, i32::MAX);
        row_writer.write(1, i64::MAX);
        row_writer.write(2, f64::MAX);
        arrow_writer.write(&row_writer.to_row()).unwrap();
    }

    let batch = arrow_writer.finish().unwrap();
    assert_eq!(100, batch.num_rows());
    assert_eq!(3, batch.num_columns());
    let f1 = batch.column(0).as_primitive::<Int32Type>();
    let f2 = batch.column(1).as_primitive::<Int64Type>();
    let f3 = batch.column(2).as_primitive::<Float64Type>();
    for i in 0..100 {
        assert_eq!(i32::MAX, f1.value(i));
        assert_eq!(i64::MAX, f2.value(i));
        assert_eq!(f64::MAX, f3.value(i));
    }
}

#[test]
fn test_array_type_to_record_batch() {
    let list = list_type(DataType::Int32);
    let schema = schema_of(vec![Field::new("f1", list.clone(), true)]);
    let mut row_writer = RowWriter::new(Arc::clone(&schema));
    let mut array_writer = ArrayWriter::new_nested(&list, &row_writer);
    let mut arrow_writer = ArrowWriter::try_new(Arc::clone(&schema)).unwrap();

    for _ in 0..10 {
        row_writer.set_buffer(Buffer::new(16).into_ref());
        row_writer.reset();
        let offset = row_writer.cursor();
        array_writer.reset(50);
        for i in 0..50 {
            array_writer.write(i, i32::MIN);
        }
        row_writer.set_offset_and_size(0, offset, array_writer.size());

        let row = row_writer.to_row();
        let array = row.get_array(0).unwrap();
        assert_eq!(50, array.num_elements());
        assert!((0..50).all(|i| array.get_int32(i) == i32::MIN));
        arrow_writer.write(&row).unwrap();
    }

    let batch = arrow_writer.finish().unwrap();
    assert_eq!(10, batch.num_rows());
    let lists = batch.column(0).as_list::<i32>();
    for i in 0..10 {
        let values = lists.value(i);
        let values = values.as_primitive::<Int32Type>();
        assert_eq!(50, values.len());
        assert!(values.iter().all(|v| v == Some(i32::MIN)));
    }
}

#[test]
fn test_map_encoding() {
    let map = map_type(DataType::Utf8, DataType::Float32);
    let schema = schema_of(vec![Field::new("m", map, true)]);
    let mut writer = RowWriter::new(Arc::clone(&schema));
    writer.reset();

    let mut entries = BTreeMap::new();
    entries.insert("key1".to_string(), 1.0f32);
    entries.insert("key2".to_string(), 1.0f32);
    entries.write_to(&mut writer, 0);

    let row = writer.to_row();
    let map = row.get_map(0).unwrap();
    assert_eq!(2, map.num_elements());
    assert_eq!(&DataType::Float32, map.values_array().element_type());
    assert_eq!("key1", map.keys_array().get_string(0));
    assert_eq!("key2", map.keys_array().get_string(1));
    assert_eq!(1.0, map.values_array().get_float(0));
    assert_eq!(1.0, map.values_array().get_float(1));
    assert_eq!("Map([key1, key2], [1, 1])", map.to_string());

    let mut arrow_writer = ArrowWriter::try_new(schema).unwrap();
    arrow_writer.write(&row).unwrap();
    let batch = arrow_writer.finish().unwrap();
    let maps = batch.column(0).as_map();
    assert_eq!("key2", maps.keys().as_string::<i32>().value(1));
    let values = maps.values().as_primitive::<Float32Type>();
    assert_eq!(1.0, values.value(0));
    assert_eq!(1.0, values.value(1));
}

#[test]
fn test_primitive_round_trip() {
    let schema = schema_of(vec![
        Field::new("bool", DataType::Boolean, true),
        Field::new("i8", DataType::Int8, true),
        Field::new("i16", DataType::Int16, true),
        Field::new("i32", DataType::Int32, true),
        Field::new("i64", DataType::Int64, true),
        Field::new("f32", DataType::Float32, true),
        Field::new("f64", DataType::Float64, true),
    ]);
    let mut writer = RowWriter::new(schema);
    let mut rng = rand::rng();

    for _ in 0..100 {
        let (b, i8v, i16v, i32v, i64v, f32v, f64v) = (
            rng.random::<bool>(),
            rng.random::<i8>(),
            rng.random::<i16>(),
            rng.random::<i32>(),
            rng.random::<i64>(),
            rng.random::<f32>(),
            rng.random::<f64>(),
        );
        writer.reset();
        writer.write(0, b);
        writer.write(1, i8v);
        writer.write(2, i16v);
        writer.write(3, i32v);
        writer.write(4, i64v);
        writer.write(5, f32v);
        writer.write(6, f64v);

        let row = writer.to_row();
        assert_eq!(b, row.get_bool(0));
        assert_eq!(i8v, row.get_int8(1));
        assert_eq!(i16v, row.get_int16(2));
        assert_eq!(i32v, row.get_int32(3));
        assert_eq!(i64v, row.get_int64(4));
        assert_eq!(f32v.to_bits(), row.get_float(5).to_bits());
        assert_eq!(f64v.to_bits(), row.get_double(6).to_bits());
        assert!((0..7).all(|i| !row.is_null_at(i)));
    }

    writer.reset();
    writer.write(1, i8::MIN);
    writer.write(2, i16::MIN);
    writer.write(3, i32::MIN);
    writer.write(4, i64::MIN);
    writer.write(5, f32::MIN);
    writer.write(6, f64::MIN);
    let row = writer.to_row();
    assert_eq!(i8::MIN, row.get_int8(1));
    assert_eq!(i16::MIN, row.get_int16(2));
    assert_eq!(i32::MIN, row.get_int32(3));
    assert_eq!(i64::MIN, row.get_int64(4));
    assert_eq!(f32::MIN, row.get_float(5));
    assert_eq!(f64::MIN, row.get_double(6));
}

#[test]
fn test_null_fields() {
    let schema = schema_of(vec![
        Field::new("s", DataType::Utf8, true),
        Field::new("b", DataType::Binary, true),
        Field::new("l", list_type(DataType::Int64), true),
        Field::new("m", map_type(DataType::Int32, DataType::Int32), true),
    ]);
    let mut writer = RowWriter::new(schema);
    writer.reset();
    for i in 0..4 {
        writer.set_null_at(i);
    }
    let row = writer.to_row();
    assert_eq!("", row.get_string(0));
    assert!(row.get_binary(1).is_empty());
    assert!(row.get_binary_ref(1).is_none());
    assert!(row.get_array(2).is_none());
    assert!(row.get_map(3).is_none());
    assert_eq!("{s=null, b=null, l=null, m=null}", row.to_string());
}

#[test]
fn test_alignment() {
    let schema = schema_of(vec![Field::new("s", DataType::Binary, true)]);
    let mut writer = RowWriter::new(schema);
    for len in 0..40usize {
        writer.reset();
        let before = writer.cursor();
        let payload = vec![0xabu8; len];
        writer.write_bytes(0, &payload);
        assert_eq!(len.div_ceil(8) * 8, writer.cursor() - before);
        assert_eq!(0, writer.size() % 8);

        let row = writer.to_row();
        assert_eq!(payload, row.get_binary(0));
        let (offset, size) = row.get_offset_and_size(0);
        assert_eq!(len, size);
        let buffer = row.buffer().borrow();
        let padding = buffer.get_bytes(row.base_offset() + offset + len, len.div_ceil(8) * 8 - len);
        assert!(padding.iter().all(|b| *b == 0));
    }
}

struct Address {
    city: String,
    zip: Option<i32>,
}

row_record!(Address { city: String, zip: Option<i32> });

struct Person {
    name: String,
    age: i16,
    scores: Vec<f64>,
    addresses: Vec<Address>,
    matrix: Vec<Vec<i64>>,
    tags: BTreeMap<String, Vec<i32>>,
}

row_record!(Person {
    name: String,
    age: i16,
    scores: Vec<f64>,
    addresses: Vec<Address>,
    matrix: Vec<Vec<i64>>,
    tags: BTreeMap<String, Vec<i32>>,
});

fn person() -> Person {
    let mut tags = BTreeMap::new();
    tags.insert("a".to_string(), vec![1, 2]);
    tags.insert("b".to_string(), vec![]);
    Person {
        name: "Ada".to_string(),
        age: 36,
        scores: vec![1.5, 2.0],
        addresses: vec![
            Address {
                city: "London".to_string(),
                zip: None,
            },
            Address {
                city: "Paris".to_string(),
                zip: Some(75001),
            },
        ],
        matrix: vec![vec![1, 2, 3], vec![4, 5, 6]],
        tags,
    }
}

#[test]
fn test_nested_records() {
    let mut encoder = RowEncoder::<Person>::new();
    let row = encoder.encode(&person());

    assert_eq!(6, row.num_fields());
    assert_eq!("Ada", row.get_string(0));
    assert_eq!(36, row.get_int16(1));

    let addresses = row.get_array(3).unwrap();
    let paris = addresses.get_struct(1).unwrap();
    assert_eq!("Paris", paris.get_string(0));
    assert_eq!(75001, paris.get_int32(1));
    assert!(addresses.get_struct(0).unwrap().is_null_at(1));

    let matrix = row.get_array(4).unwrap();
    assert_eq!(Some(vec![2, 3]), matrix.dimensions(2));
    assert_eq!(6, matrix.get_array(1).unwrap().get_int64(2));

    assert_eq!(
        "{name=Ada, age=36, scores=[1.5, 2], \
         addresses=[{city=London, zip=null}, {city=Paris, zip=75001}], \
         matrix=[[1, 2, 3], [4, 5, 6]], tags=Map([a, b], [[1, 2], []])}",
        row.to_string()
    );
}

#[test]
fn test_nested_region_is_position_independent() {
    let mut encoder = RowEncoder::<Person>::new();
    let row = encoder.encode(&person());
    let addresses = row.get_array(3).unwrap();

    // embed the list at a different position of another buffer
    let schema = schema_of(vec![
        Field::new("pad", DataType::Utf8, true),
        Field::new("addresses", <Vec<Address>>::data_type(), true),
    ]);
    let mut writer = RowWriter::new(schema);
    writer.reset();
    writer.write_string(0, "some padding in front of the list");
    writer.write_array(1, &addresses);

    let copied = writer.to_row().get_array(1).unwrap();
    assert_ne!(addresses.base_offset(), copied.base_offset());
    assert_eq!(addresses.to_bytes(), copied.to_bytes());
    assert_eq!(addresses.to_string(), copied.to_string());
}

#[test]
fn test_rows_from_encoder_stay_valid() {
    let mut encoder = RowEncoder::<Address>::new();
    let first = encoder.encode(&Address {
        city: "Oslo".to_string(),
        zip: Some(150),
    });
    let second = encoder.encode(&Address {
        city: "Rome".to_string(),
        zip: None,
    });
    assert_eq!("{city=Oslo, zip=150}", first.to_string());
    assert_eq!("{city=Rome, zip=null}", second.to_string());

    let decoded = Row::from((Arc::clone(encoder.schema()), first.to_bytes().as_slice()));
    assert_eq!(first.to_string(), decoded.to_string());
}

#[test]
fn test_encoder_honors_initial_buffer_size() {
    let config = RowFormatConfig {
        writer_initial_buffer_size: Some(256),
        ..Default::default()
    };
    let mut encoder = RowEncoder::<Person>::with_config(&config);
    let row = encoder.encode(&person());
    assert!(row.buffer().borrow().capacity() >= 256);
    assert_eq!(
        RowEncoder::<Person>::new().encode(&person()).to_string(),
        row.to_string()
    );

    // a buffer smaller than the fixed region still grows to fit the record
    let config = RowFormatConfig {
        writer_initial_buffer_size: Some(8),
        ..Default::default()
    };
    let mut encoder = RowEncoder::<Person>::with_config(&config);
    let row = encoder.encode(&person());
    assert_eq!("Ada", row.get_string(0));
    assert_eq!(Some(vec![2, 3]), row.get_array(4).unwrap().dimensions(2));
}

#[test]
fn test_columnar_matches_decoding() {
    let mut encoder = RowEncoder::<Person>::new();
    let mut arrow_writer = ArrowWriter::try_new(Arc::clone(encoder.schema())).unwrap();
    let rows = (0..5)
        .map(|i| {
            let mut person = person();
            person.age = i;
            person.scores.push(i as f64);
            encoder.encode(&person)
        })
        .collect::<Vec<_>>();
    for row in &rows {
        arrow_writer.write(row).unwrap();
    }

    let batch = arrow_writer.finish().unwrap();
    assert_eq!(rows.len(), batch.num_rows());
    assert_eq!(6, batch.num_columns());

    let names = batch.column(0).as_string::<i32>();
    let ages = batch.column(1).as_primitive::<arrow::datatypes::Int16Type>();
    let scores = batch.column(2).as_list::<i32>();
    let addresses = batch.column(3).as_list::<i32>();
    let matrix = batch.column(4).as_list::<i32>();
    let tags = batch.column(5).as_map();
    for (i, row) in rows.iter().enumerate() {
        assert_eq!(row.get_string(0), names.value(i));
        assert_eq!(row.get_int16(1), ages.value(i));

        let expected = row.get_array(2).unwrap();
        let actual = scores.value(i);
        let actual = actual.as_primitive::<Float64Type>();
        assert_eq!(expected.num_elements(), actual.len());
        for j in 0..actual.len() {
            assert_eq!(expected.get_double(j), actual.value(j));
        }

        let expected = row.get_array(3).unwrap();
        let actual = addresses.value(i);
        let actual = actual.as_struct();
        assert_eq!(expected.num_elements(), actual.len());
        let cities = actual.column(0).as_string::<i32>();
        let zips = actual.column(1).as_primitive::<Int32Type>();
        for j in 0..actual.len() {
            let address = expected.get_struct(j).unwrap();
            assert_eq!(address.get_string(0), cities.value(j));
            assert_eq!(address.is_null_at(1), zips.is_null(j));
            if !address.is_null_at(1) {
                assert_eq!(address.get_int32(1), zips.value(j));
            }
        }

        let expected = row.get_array(4).unwrap();
        let actual = matrix.value(i);
        let actual = actual.as_list::<i32>();
        assert_eq!(expected.num_elements(), actual.len());
        for j in 0..actual.len() {
            let expected_row = expected.get_array(j).unwrap();
            let actual_row = actual.value(j);
            let actual_row = actual_row.as_primitive::<Int64Type>();
            assert_eq!(expected_row.num_elements(), actual_row.len());
            for k in 0..actual_row.len() {
                assert_eq!(expected_row.get_int64(k), actual_row.value(k));
            }
        }

        let expected = row.get_map(5).unwrap();
        let entries = tags.value(i);
        assert_eq!(expected.num_elements(), entries.len());
        let keys = entries.column(0).as_string::<i32>();
        let values = entries.column(1).as_list::<i32>();
        for j in 0..entries.len() {
            assert_eq!(expected.keys_array().get_string(j), keys.value(j));
            let expected_values = expected.values_array().get_array(j).unwrap();
            let actual_values = values.value(j);
            let actual_values = actual_values.as_primitive::<Int32Type>();
            assert_eq!(expected_values.num_elements(), actual_values.len());
            for k in 0..actual_values.len() {
                assert_eq!(expected_values.get_int32(k), actual_values.value(k));
            }
        }
    }
}

#[test]
fn test_array_from_slice_in_row() {
    let array = ArrayData::from_slice(&[3i64, 2, 1]);
    let schema = schema_of(vec![Field::new("l", list_type(DataType::Int64), true)]);
    let mut writer = RowWriter::new(schema);
    writer.reset();
    writer.write_array(0, &array);
    let row = writer.to_row();
    assert_eq!("{l=[3, 2, 1]}", row.to_string());
    assert_eq!(array.to_bytes(), row.get_array(0).unwrap().to_bytes());
}

fn assert_column_matches<T: ArrowPrimitiveType>(
    rows: &[Row],
    column: &dyn Array,
    ordinal: usize,
    read: fn(&Row, usize) -> T::Native,
) {
    let column = column.as_primitive::<T>();
    assert_eq!(rows.len(), column.len());
    for (i, row) in rows.iter().enumerate() {
        assert_eq!(row.is_null_at(ordinal), column.is_null(i), "row {i} field {ordinal}");
        if !row.is_null_at(ordinal) {
            assert_eq!(read(row, ordinal), column.value(i), "row {i} field {ordinal}");
        }
    }
}

#[test]
fn test_temporal_and_float_columns_match_decoding() {
    let schema = schema_of(vec![
        Field::new("f32", DataType::Float32, true),
        Field::new("date32", DataType::Date32, true),
        Field::new("date64", DataType::Date64, true),
        Field::new("time_s", DataType::Time32(TimeUnit::Second), true),
        Field::new("time_ms", DataType::Time32(TimeUnit::Millisecond), true),
        Field::new("time_us", DataType::Time64(TimeUnit::Microsecond), true),
        Field::new("time_ns", DataType::Time64(TimeUnit::Nanosecond), true),
        Field::new("ts_s", DataType::Timestamp(TimeUnit::Second, None), true),
        Field::new("ts_ms", DataType::Timestamp(TimeUnit::Millisecond, None), true),
        Field::new(
            "ts_us",
            DataType::Timestamp(TimeUnit::Microsecond, Some("UTC".into())),
            true,
        ),
        Field::new("ts_ns", DataType::Timestamp(TimeUnit::Nanosecond, None), true),
    ]);
    let mut writer = RowWriter::new(Arc::clone(&schema));
    let mut arrow_writer = ArrowWriter::try_new(Arc::clone(&schema)).unwrap();
    let mut rng = rand::rng();

    let mut rows = Vec::new();
    for _ in 0..64 {
        writer.set_buffer(Buffer::new(16).into_ref());
        writer.reset();
        writer.write(0, rng.random::<f32>());
        writer.write(1, rng.random::<i32>());
        writer.write(2, rng.random::<i64>());
        writer.write(3, rng.random_range(0..86_400i32));
        writer.write(4, rng.random_range(0..86_400_000i32));
        writer.write(5, rng.random_range(0..86_400_000_000i64));
        writer.write(6, rng.random_range(0..86_400_000_000_000i64));
        for i in 7..11 {
            writer.write(i, rng.random::<i64>());
        }
        for i in 0..11 {
            if rng.random_ratio(1, 5) {
                writer.set_null_at(i);
            }
        }
        let row = writer.to_row();
        arrow_writer.write(&row).unwrap();
        rows.push(row);
    }

    let batch = arrow_writer.finish().unwrap();
    assert_eq!(rows.len(), batch.num_rows());
    assert_eq!(schema.fields(), batch.schema().fields());

    assert_column_matches::<Float32Type>(&rows, batch.column(0), 0, |r, i| r.get_float(i));
    assert_column_matches::<Date32Type>(&rows, batch.column(1), 1, |r, i| r.get_int32(i));
    assert_column_matches::<Date64Type>(&rows, batch.column(2), 2, |r, i| r.get_int64(i));
    assert_column_matches::<Time32SecondType>(&rows, batch.column(3), 3, |r, i| {
        r.get_int32(i)
    });
    assert_column_matches::<Time32MillisecondType>(&rows, batch.column(4), 4, |r, i| {
        r.get_int32(i)
    });
    assert_column_matches::<Time64MicrosecondType>(&rows, batch.column(5), 5, |r, i| {
        r.get_int64(i)
    });
    assert_column_matches::<Time64NanosecondType>(&rows, batch.column(6), 6, |r, i| {
        r.get_int64(i)
    });
    assert_column_matches::<TimestampSecondType>(&rows, batch.column(7), 7, |r, i| {
        r.get_int64(i)
    });
    assert_column_matches::<TimestampMillisecondType>(&rows, batch.column(8), 8, |r, i| {
        r.get_int64(i)
    });
    assert_column_matches::<TimestampMicrosecondType>(&rows, batch.column(9), 9, |r, i| {
        r.get_int64(i)
    });
    assert_column_matches::<TimestampNanosecondType>(&rows, batch.column(10), 10, |r, i| {
        r.get_int64(i)
    });
}
