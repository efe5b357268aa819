// Copyright 2025 JUnit Traces Contributors
// SPDX-License-Identifier: Apache-2.0

//! Downstream consumers of assembled traces.
//!
//! The pipeline's responsibility ends when a [`Trace`] is handed to a
//! [`TraceConsumer`]; export and retry belong to the consumer.

use crate::error::{AdapterError, Result};
use async_trait::async_trait;
use junit_traces_core::attributes::keys;
use junit_traces_core::otlp::Encoding;
use junit_traces_core::Trace;
use std::io::Write;
use std::sync::Mutex;
use tracing::info;

/// Accepts one assembled trace per delivery.
#[async_trait]
pub trait TraceConsumer: Send + Sync {
    /// Take ownership of a trace.
    async fn consume(&self, trace: Trace) -> Result<()>;
}

/// Logs a structured summary of each trace.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogConsumer;

#[async_trait]
impl TraceConsumer for LogConsumer {
    async fn consume(&self, trace: Trace) -> Result<()> {
        info!(
            trace_id = %trace.trace_id(),
            service = trace.resource.get_str(keys::SERVICE_NAME).unwrap_or_default(),
            root = %trace.root.name,
            suites = trace.suites.len(),
            tests = trace.tests.len(),
            errors = trace.error_count(),
            "Trace assembled"
        );
        Ok(())
    }
}

/// Writes each trace as an OTLP export request to a writer.
pub struct OtlpWriter<W: Write + Send> {
    out: Mutex<W>,
    encoding: Encoding,
}

impl<W: Write + Send> OtlpWriter<W> {
    /// Writer producing OTLP/JSON.
    pub fn json(out: W) -> Self {
        Self::new(out, Encoding::Json)
    }

    /// Writer producing the given encoding.
    pub fn new(out: W, encoding: Encoding) -> Self {
        Self {
            out: Mutex::new(out),
            encoding,
        }
    }

    /// Recover the underlying writer.
    pub fn into_inner(self) -> Result<W> {
        self.out
            .into_inner()
            .map_err(|_| AdapterError::Consumer("writer lock poisoned".to_string()))
    }
}

#[async_trait]
impl<W: Write + Send> TraceConsumer for OtlpWriter<W> {
    async fn consume(&self, trace: Trace) -> Result<()> {
        let bytes = trace.encode(self.encoding)?;
        let mut out = self
            .out
            .lock()
            .map_err(|_| AdapterError::Consumer("writer lock poisoned".to_string()))?;
        out.write_all(&bytes)?;
        if self.encoding == Encoding::Json {
            out.write_all(b"\n")?;
        }
        out.flush()?;
        Ok(())
    }
}
