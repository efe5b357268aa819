// Copyright 2025 JUnit Traces Contributors
// SPDX-License-Identifier: Apache-2.0

//! Projection of a [`Trace`] onto the OTLP wire model.

use crate::attributes::{AttributeValue, Attributes};
use crate::error::{Error, Result};
use crate::span::{SpanLink, SpanNode, SpanNodeKind, StatusCode};
use crate::trace::Trace;
use chrono::{DateTime, Utc};
use opentelemetry_proto::tonic::collector::trace::v1::ExportTraceServiceRequest;
use opentelemetry_proto::tonic::common::v1::{any_value, AnyValue, InstrumentationScope, KeyValue};
use opentelemetry_proto::tonic::resource::v1::Resource;
use opentelemetry_proto::tonic::trace::v1::{span, status, ResourceSpans, ScopeSpans, Span, Status};
use prost::Message;

/// Instrumentation scope name stamped on every export.
pub const SCOPE_NAME: &str = env!("CARGO_PKG_NAME");
/// Instrumentation scope version stamped on every export.
pub const SCOPE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Wire encoding of an export request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding {
    /// OTLP/JSON
    #[default]
    Json,
    /// OTLP/protobuf
    Protobuf,
}

impl From<SpanNodeKind> for span::SpanKind {
    fn from(kind: SpanNodeKind) -> Self {
        match kind {
            SpanNodeKind::Root => span::SpanKind::Server,
            SpanNodeKind::Suite | SpanNodeKind::Test => span::SpanKind::Internal,
        }
    }
}

impl From<StatusCode> for status::StatusCode {
    fn from(code: StatusCode) -> Self {
        match code {
            StatusCode::Unset => status::StatusCode::Unset,
            StatusCode::Ok => status::StatusCode::Ok,
            StatusCode::Error => status::StatusCode::Error,
        }
    }
}

impl From<&AttributeValue> for AnyValue {
    fn from(value: &AttributeValue) -> Self {
        let value = match value {
            AttributeValue::Str(s) => any_value::Value::StringValue(s.clone()),
            AttributeValue::Int(i) => any_value::Value::IntValue(*i),
        };
        AnyValue { value: Some(value) }
    }
}

impl From<&SpanLink> for span::Link {
    fn from(link: &SpanLink) -> Self {
        span::Link {
            trace_id: link.trace_id.to_bytes().to_vec(),
            span_id: link
                .span_id
                .map(|id| id.to_bytes().to_vec())
                .unwrap_or_default(),
            ..Default::default()
        }
    }
}

impl From<&SpanNode> for Span {
    fn from(node: &SpanNode) -> Self {
        let kind: span::SpanKind = node.kind.into();
        let code: status::StatusCode = node.status.into();
        Span {
            trace_id: node.trace_id.to_bytes().to_vec(),
            span_id: node.span_id.to_bytes().to_vec(),
            parent_span_id: node
                .parent_span_id
                .map(|id| id.to_bytes().to_vec())
                .unwrap_or_default(),
            name: node.name.clone(),
            kind: kind as i32,
            start_time_unix_nano: to_nanos(node.start_time),
            end_time_unix_nano: to_nanos(node.end_time),
            attributes: key_values(&node.attributes),
            links: node.links.iter().map(Into::into).collect(),
            status: Some(Status {
                code: code as i32,
                message: node.status_message.clone(),
            }),
            ..Default::default()
        }
    }
}

impl From<&Trace> for ExportTraceServiceRequest {
    fn from(trace: &Trace) -> Self {
        ExportTraceServiceRequest {
            resource_spans: vec![ResourceSpans {
                resource: Some(Resource {
                    attributes: key_values(&trace.resource),
                    ..Default::default()
                }),
                scope_spans: vec![ScopeSpans {
                    scope: Some(InstrumentationScope {
                        name: SCOPE_NAME.to_string(),
                        version: SCOPE_VERSION.to_string(),
                        ..Default::default()
                    }),
                    spans: trace.spans().map(Span::from).collect(),
                    ..Default::default()
                }],
                ..Default::default()
            }],
        }
    }
}

impl Trace {
    /// The OTLP export request carrying this trace.
    pub fn to_otlp(&self) -> ExportTraceServiceRequest {
        self.into()
    }

    /// Encode the OTLP export request.
    pub fn encode(&self, encoding: Encoding) -> Result<Vec<u8>> {
        let request = self.to_otlp();
        match encoding {
            Encoding::Json => serde_json::to_vec_pretty(&request)
                .map_err(|e| Error::Encode(e.to_string())),
            Encoding::Protobuf => Ok(request.encode_to_vec()),
        }
    }
}

fn key_values(attributes: &Attributes) -> Vec<KeyValue> {
    attributes
        .iter()
        .map(|(key, value)| KeyValue {
            key: key.to_string(),
            value: Some(value.into()),
        })
        .collect()
}

fn to_nanos(time: DateTime<Utc>) -> u64 {
    time.timestamp_nanos_opt()
        .and_then(|nanos| u64::try_from(nanos).ok())
        .unwrap_or(0)
}
