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

use std::collections::HashMap;

use crate::errors::{RowError, RowResult};

/// Initial size in bytes of the buffer a standalone writer allocates.
pub const WRITER_INITIAL_BUFFER_SIZE: &str = "row.writer.initialBufferSize";
/// Initial capacity (in rows) of the Arrow builders used by the columnar bridge.
pub const COLUMNAR_BATCH_CAPACITY: &str = "row.columnar.batchCapacity";
/// Path to a log4rs configuration file. The default console logger is used when unset.
pub const LOG_CONF_PATH: &str = "row.log.confPath";

pub const DEFAULT_COLUMNAR_BATCH_CAPACITY: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowFormatConfig {
    /// When `None`, a row writer starts with `8 * num_fields` bytes and an array writer with 64.
    pub writer_initial_buffer_size: Option<usize>,
    pub columnar_batch_capacity: usize,
    pub log_conf_path: Option<String>,
}

impl Default for RowFormatConfig {
    fn default() -> Self {
        Self {
            writer_initial_buffer_size: None,
            columnar_batch_capacity: DEFAULT_COLUMNAR_BATCH_CAPACITY,
            log_conf_path: None,
        }
    }
}

impl RowFormatConfig {
    /// Parses the configuration from string key/value pairs. Unknown keys are ignored.
    pub fn from_map(configs: &HashMap<String, String>) -> RowResult<Self> {
        let mut config = Self::default();

        if let Some(size) = get_config(configs, WRITER_INITIAL_BUFFER_SIZE) {
            config.writer_initial_buffer_size = Some(parse_size(WRITER_INITIAL_BUFFER_SIZE, size)?);
        }
        if let Some(capacity) = get_config(configs, COLUMNAR_BATCH_CAPACITY) {
            config.columnar_batch_capacity = parse_size(COLUMNAR_BATCH_CAPACITY, capacity)?;
        }
        if let Some(path) = get_config(configs, LOG_CONF_PATH) {
            // empty path means there is no custom log4rs config file
            if !path.is_empty() {
                config.log_conf_path = Some(path.to_string());
            }
        }

        Ok(config)
    }
}

fn get_config<'a>(configs: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    configs.get(key).map(|v| v.trim())
}

fn parse_size(key: &str, value: &str) -> RowResult<usize> {
    let size = value.parse::<usize>().map_err(|e| {
        RowError::Config(format!("Invalid value '{value}' for {key}: {e}"))
    })?;
    if size == 0 {
        return Err(RowError::Config(format!("{key} must be positive")));
    }
    Ok(size)
}
