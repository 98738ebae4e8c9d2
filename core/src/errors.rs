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

//! Common errors for the row format and its columnar bridge.

use arrow::error::ArrowError;
use lazy_static::lazy_static;
use log::error;

use std::{
    result,
    str::Utf8Error,
    sync::{Arc, Mutex},
};

lazy_static! {
    static ref PANIC_BACKTRACE: Arc<Mutex<Option<String>>> = Arc::new(Mutex::new(None));
}

#[derive(thiserror::Error, Debug)]
pub enum RowError {
    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("Not implemented: {0}")]
    NotImplemented(String),

    #[error("Row Format Internal Error: {0}")]
    Internal(String),

    #[error(transparent)]
    Arrow {
        #[from]
        source: ArrowError,
    },

    #[error(transparent)]
    NumberIntFormat {
        #[from]
        source: std::num::ParseIntError,
    },

    #[error(transparent)]
    Format {
        #[from]
        source: Utf8Error,
    },
}

pub type RowResult<T> = result::Result<T, RowError>;

/// Installs a panic hook that logs the panic together with a captured backtrace.
///
/// Invariant violations in the buffer, the decoders and the writers are fatal and surface as
/// panics. The hook makes sure the context reaches the log before the thread unwinds. The last
/// backtrace can be retrieved with [`take_panic_backtrace`].
pub fn init() {
    std::panic::set_hook(Box::new(|panic_info| {
        let backtrace = std::backtrace::Backtrace::force_capture().to_string();
        error!("{panic_info}\n{backtrace}");
        if let Ok(mut last) = PANIC_BACKTRACE.lock() {
            *last = Some(backtrace);
        }
    }));
}

/// Returns the backtrace of the most recent panic captured by the hook installed in [`init`].
pub fn take_panic_backtrace() -> Option<String> {
    PANIC_BACKTRACE.lock().ok().and_then(|mut last| last.take())
}
