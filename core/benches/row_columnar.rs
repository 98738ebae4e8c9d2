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

use std::sync::Arc;

use arrow::datatypes::{DataType, Field};
use binary_row::columnar::ArrowWriter;
use binary_row::common::Buffer;
use binary_row::row::types::{list_type, schema_of};
use binary_row::row::{ArrayWriter, Row, RowWriter, Writer};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

const NUM_ROWS: usize = 10000;
const NUM_COLS: usize = 100;
const LIST_SIZE: usize = 16;

fn int64_rows() -> Vec<Row> {
    let fields = (0..NUM_COLS)
        .map(|i| Field::new(format!("c{i}"), DataType::Int64, true))
        .collect();
    let mut writer = RowWriter::new(schema_of(fields));
    (0..NUM_ROWS)
        .map(|r| {
            writer.set_buffer(Buffer::new(8).into_ref());
            writer.reset();
            for i in 0..NUM_COLS {
                writer.write(i, (r * NUM_COLS + i) as i64);
            }
            writer.to_row()
        })
        .collect()
}

fn list_rows() -> Vec<Row> {
    let list = list_type(DataType::Int32);
    let mut writer = RowWriter::new(schema_of(vec![
        Field::new("id", DataType::Int64, true),
        Field::new("values", list.clone(), true),
    ]));
    let mut array_writer = ArrayWriter::new_nested(&list, &writer);
    (0..NUM_ROWS)
        .map(|r| {
            writer.set_buffer(Buffer::new(8).into_ref());
            writer.reset();
            writer.write(0, r as i64);
            let offset = writer.cursor();
            array_writer.reset(LIST_SIZE);
            for i in 0..LIST_SIZE {
                array_writer.write(i, i as i32);
            }
            writer.set_offset_and_size(1, offset, array_writer.size());
            writer.to_row()
        })
        .collect()
}

fn benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("row_columnar");

    group.bench_function(BenchmarkId::new("encode_int64", NUM_COLS), |b| {
        let fields = (0..NUM_COLS)
            .map(|i| Field::new(format!("c{i}"), DataType::Int64, true))
            .collect();
        let mut writer = RowWriter::new(schema_of(fields));
        b.iter(|| {
            for r in 0..NUM_ROWS {
                writer.reset();
                for i in 0..NUM_COLS {
                    writer.write(i, (r + i) as i64);
                }
                // reuse the buffer from the start
                writer.buffer().borrow_mut().set_writer_index(0);
            }
        });
    });

    group.bench_function(BenchmarkId::new("row_to_array_int64", NUM_COLS), |b| {
        let rows = int64_rows();
        let schema = Arc::clone(rows[0].schema());
        let mut arrow_writer = ArrowWriter::try_new(schema).unwrap();
        b.iter(|| {
            for row in &rows {
                arrow_writer.write(row).unwrap();
            }
            arrow_writer.finish().unwrap()
        });
    });

    group.bench_function(BenchmarkId::new("row_to_array_list", LIST_SIZE), |b| {
        let rows = list_rows();
        let schema = Arc::clone(rows[0].schema());
        let mut arrow_writer = ArrowWriter::try_new(schema).unwrap();
        b.iter(|| {
            for row in &rows {
                arrow_writer.write(row).unwrap();
            }
            arrow_writer.finish().unwrap()
        });
    });
}

fn config() -> Criterion {
    Criterion::default().sample_size(10)
}

criterion_group! {
    name = benches;
    config = config();
    targets = benchmark
}
criterion_main!(benches);
