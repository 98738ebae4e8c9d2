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

// The clippy throws an error if the reference clone not wrapped into `Arc::clone`
// The lint makes easier for code reader/reviewer separate references clones from more
// heavyweight ones
#![deny(clippy::clone_on_ref_ptr)]

//! A schema-driven binary row format.
//!
//! Records, lists and maps are encoded into a single contiguous buffer by cursor-based writers
//! ([`row::RowWriter`], [`row::ArrayWriter`]) and read back without copying through
//! [`row::Row`], [`row::ArrayData`] and [`row::MapData`]. [`columnar::ArrowWriter`] turns a
//! sequence of rows into an Arrow `RecordBatch`.

pub use arrow;

use log::{info, LevelFilter};
use log4rs::{
    append::console::{ConsoleAppender, Target},
    config::{load_config_file, Appender, Deserializers, Root},
    encode::pattern::PatternEncoder,
    Config, Handle,
};
use once_cell::sync::OnceCell;

pub mod columnar;
pub mod common;
pub mod config;
pub mod encoder;
pub mod errors;
pub mod row;

use crate::config::RowFormatConfig;
pub use crate::errors::{RowError, RowResult};

static LOG_HANDLE: OnceCell<Handle> = OnceCell::new();

/// Installs the panic hook and the logger.
///
/// Logging is configured from the log4rs file at `config.log_conf_path`, or goes to the console
/// at `INFO` level when no file is given. Calling this again replaces the logging configuration
/// installed by an earlier call.
pub fn init(config: &RowFormatConfig) -> RowResult<()> {
    // Initialize the error handling to capture panic backtraces
    errors::init();

    let log_config = match &config.log_conf_path {
        Some(path) => load_config_file(path, Deserializers::default())
            .map_err(|err| RowError::Config(err.to_string()))?,
        None => default_logger_config()?,
    };

    match LOG_HANDLE.get() {
        Some(handle) => handle.set_config(log_config),
        None => {
            // another logger may already be installed by the application, keep it
            if let Ok(handle) = log4rs::init_config(log_config) {
                let _ = LOG_HANDLE.set(handle);
            }
        }
    }

    info!(
        "Row format library version {} initialized",
        env!("CARGO_PKG_VERSION")
    );
    Ok(())
}

const LOG_PATTERN: &str = "{d(%y/%m/%d %H:%M:%S)} {l} {f}: {m}{n}";

// Creates a default log4rs config, which logs to console with `INFO` level.
fn default_logger_config() -> RowResult<Config> {
    let console_append = ConsoleAppender::builder()
        .target(Target::Stderr)
        .encoder(Box::new(PatternEncoder::new(LOG_PATTERN)))
        .build();
    let appender = Appender::builder().build("console", Box::new(console_append));
    let root = Root::builder().appender("console").build(LevelFilter::Info);
    Config::builder()
        .appender(appender)
        .build(root)
        .map_err(|err| RowError::Config(err.to_string()))
}
