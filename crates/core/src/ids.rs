// Copyright 2025 JUnit Traces Contributors
// SPDX-License-Identifier: Apache-2.0

//! Deterministic trace and span identifiers.
//!
//! Every identifier is a window of the SHA-256 digest of a string built from
//! the run identity. Nothing here depends on wall-clock time or randomness, so
//! a redelivered event maps onto the exact same trace.
//!
//! | Kind        | Digest input                                    | Digest bytes |
//! |-------------|-------------------------------------------------|--------------|
//! | trace       | `<run_id><run_attempt>t`                        | `0..16`      |
//! | root span   | `<run_id><run_attempt>s`                        | `8..16`      |
//! | suite span  | `<run_id><run_attempt><suite>`                  | `8..16`      |
//! | test span   | `<run_id><run_attempt><suite><classname><name>` | `8..16`      |
//!
//! The table is encoded once in [`IdKind::digest_range`] and
//! [`IdKey::material`]; changing either breaks idempotent redelivery.

use crate::error::{Error, Result};
use serde::{Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;
use std::ops::Range;

/// 16-byte trace identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TraceId([u8; 16]);

impl TraceId {
    /// Wrap raw bytes.
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Raw bytes.
    pub const fn to_bytes(self) -> [u8; 16] {
        self.0
    }

    /// Parse from 32 lowercase or uppercase hex characters.
    pub fn from_hex(hex_str: &str) -> Result<Self> {
        let mut bytes = [0u8; 16];
        hex::decode_to_slice(hex_str, &mut bytes)
            .map_err(|e| Error::invalid_input(format!("invalid trace id {hex_str:?}: {e}")))?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl Serialize for TraceId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// 8-byte span identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SpanId([u8; 8]);

impl SpanId {
    /// Wrap raw bytes.
    pub const fn from_bytes(bytes: [u8; 8]) -> Self {
        Self(bytes)
    }

    /// Raw bytes.
    pub const fn to_bytes(self) -> [u8; 8] {
        self.0
    }

    /// Parse from 16 hex characters.
    pub fn from_hex(hex_str: &str) -> Result<Self> {
        let mut bytes = [0u8; 8];
        hex::decode_to_slice(hex_str, &mut bytes)
            .map_err(|e| Error::invalid_input(format!("invalid span id {hex_str:?}: {e}")))?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for SpanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl Serialize for SpanId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Which identifier is being derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdKind {
    /// Trace ID for one run attempt.
    Trace,
    /// Span ID of the run's root span.
    RootSpan,
    /// Span ID of a test suite span.
    SuiteSpan,
    /// Span ID of a test case span.
    TestSpan,
}

impl IdKind {
    /// Human readable name, used in errors.
    pub fn name(self) -> &'static str {
        match self {
            IdKind::Trace => "trace",
            IdKind::RootSpan => "root span",
            IdKind::SuiteSpan => "suite span",
            IdKind::TestSpan => "test span",
        }
    }

    /// Bytes of the SHA-256 digest that make up the identifier.
    pub fn digest_range(self) -> Range<usize> {
        match self {
            IdKind::Trace => 0..16,
            IdKind::RootSpan | IdKind::SuiteSpan | IdKind::TestSpan => 8..16,
        }
    }
}

/// Identity fields for one identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdKey<'a> {
    /// Key of a trace ID.
    Trace {
        /// Workflow run ID
        run_id: u64,
        /// Workflow run attempt
        run_attempt: u32,
    },
    /// Key of the root span ID.
    RootSpan {
        /// Workflow run ID
        run_id: u64,
        /// Workflow run attempt
        run_attempt: u32,
    },
    /// Key of a suite span ID.
    SuiteSpan {
        /// Workflow run ID
        run_id: u64,
        /// Workflow run attempt
        run_attempt: u32,
        /// Suite name
        suite: &'a str,
    },
    /// Key of a test span ID.
    TestSpan {
        /// Workflow run ID
        run_id: u64,
        /// Workflow run attempt
        run_attempt: u32,
        /// Name of the enclosing suite
        suite: &'a str,
        /// Test classname
        classname: &'a str,
        /// Test name
        name: &'a str,
    },
}

impl IdKey<'_> {
    /// The kind of identifier this key produces.
    pub fn kind(&self) -> IdKind {
        match self {
            IdKey::Trace { .. } => IdKind::Trace,
            IdKey::RootSpan { .. } => IdKind::RootSpan,
            IdKey::SuiteSpan { .. } => IdKind::SuiteSpan,
            IdKey::TestSpan { .. } => IdKind::TestSpan,
        }
    }

    /// The string that gets hashed.
    pub fn material(&self) -> String {
        match self {
            IdKey::Trace {
                run_id,
                run_attempt,
            } => format!("{run_id}{run_attempt}t"),
            IdKey::RootSpan {
                run_id,
                run_attempt,
            } => format!("{run_id}{run_attempt}s"),
            IdKey::SuiteSpan {
                run_id,
                run_attempt,
                suite,
            } => format!("{run_id}{run_attempt}{suite}"),
            IdKey::TestSpan {
                run_id,
                run_attempt,
                suite,
                classname,
                name,
            } => format!("{run_id}{run_attempt}{suite}{classname}{name}"),
        }
    }
}

fn digest_window<const N: usize>(key: &IdKey<'_>) -> Result<[u8; N]> {
    let kind = key.kind();
    let range = kind.digest_range();
    let digest = Sha256::digest(key.material().as_bytes());

    digest
        .get(range.clone())
        .and_then(|window| <[u8; N]>::try_from(window).ok())
        .ok_or_else(|| Error::IdentifierDerivation {
            kind: kind.name(),
            reason: format!("digest bytes {range:?} do not form a {N}-byte identifier"),
        })
}

/// Derive a trace ID from its key.
pub fn derive_trace_id(key: &IdKey<'_>) -> Result<TraceId> {
    if key.kind() != IdKind::Trace {
        return Err(Error::IdentifierDerivation {
            kind: key.kind().name(),
            reason: "key does not describe a trace".to_string(),
        });
    }
    digest_window::<16>(key).map(TraceId)
}

/// Derive a span ID from its key.
pub fn derive_span_id(key: &IdKey<'_>) -> Result<SpanId> {
    if key.kind() == IdKind::Trace {
        return Err(Error::IdentifierDerivation {
            kind: key.kind().name(),
            reason: "key does not describe a span".to_string(),
        });
    }
    digest_window::<8>(key).map(SpanId)
}

/// Trace ID of one run attempt.
pub fn trace_id(run_id: u64, run_attempt: u32) -> Result<TraceId> {
    derive_trace_id(&IdKey::Trace {
        run_id,
        run_attempt,
    })
}

/// Span ID of a run attempt's root span.
pub fn root_span_id(run_id: u64, run_attempt: u32) -> Result<SpanId> {
    derive_span_id(&IdKey::RootSpan {
        run_id,
        run_attempt,
    })
}

/// Span ID of a suite span.
pub fn suite_span_id(run_id: u64, run_attempt: u32, suite: &str) -> Result<SpanId> {
    derive_span_id(&IdKey::SuiteSpan {
        run_id,
        run_attempt,
        suite,
    })
}

/// Span ID of a test span.
pub fn test_span_id(
    run_id: u64,
    run_attempt: u32,
    suite: &str,
    classname: &str,
    name: &str,
) -> Result<SpanId> {
    derive_span_id(&IdKey::TestSpan {
        run_id,
        run_attempt,
        suite,
        classname,
        name,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trace_id_golden_value() {
        // sha256("421t") = 0330c15a8d3e153086738dd3191a6497e789...
        let id = trace_id(42, 1).unwrap();
        assert_eq!(id.to_string(), "0330c15a8d3e153086738dd3191a6497");
    }

    #[test]
    fn test_root_span_id_golden_value() {
        // sha256("421s") = afa209242f8dae73 e93171e2ef746fb5 ...
        let id = root_span_id(42, 1).unwrap();
        assert_eq!(id.to_string(), "e93171e2ef746fb5");
    }

    #[test]
    fn test_suite_and_test_span_golden_values() {
        assert_eq!(
            suite_span_id(42, 1, "Calc").unwrap().to_string(),
            "1f4824773e6b7ee7"
        );
        assert_eq!(
            test_span_id(42, 1, "Calc", "CalcTest", "add")
                .unwrap()
                .to_string(),
            "1e90f53660c7e3ab"
        );
    }

    #[test]
    fn test_trace_id_is_deterministic() {
        let first = trace_id(9_876_543_210, 3).unwrap();
        for _ in 0..10 {
            assert_eq!(trace_id(9_876_543_210, 3).unwrap(), first);
        }
    }

    #[test]
    fn test_attempts_yield_distinct_trace_ids() {
        let attempt_one = trace_id(42, 1).unwrap();
        let attempt_two = trace_id(42, 2).unwrap();
        assert_ne!(attempt_one, attempt_two);
        assert_eq!(attempt_two.to_string(), "40e47d023fdf039f55e8a65d241f6133");
    }

    #[test]
    fn test_span_id_sensitive_to_classname_and_name() {
        let x = test_span_id(42, 1, "suite", "X", "A").unwrap();
        let y = test_span_id(42, 1, "suite", "Y", "A").unwrap();
        let b = test_span_id(42, 1, "suite", "X", "B").unwrap();
        assert_ne!(x, y);
        assert_ne!(x, b);
        assert_ne!(y, b);
    }

    #[test]
    fn test_root_and_suite_ids_differ_from_each_other() {
        let root = root_span_id(42, 1).unwrap();
        let suite = suite_span_id(42, 1, "s").unwrap();
        assert_ne!(root, suite);
    }

    #[test]
    fn test_key_kind_mismatch_is_rejected() {
        let err = derive_span_id(&IdKey::Trace {
            run_id: 1,
            run_attempt: 1,
        })
        .unwrap_err();
        assert!(err.to_string().contains("trace"));

        let err = derive_trace_id(&IdKey::RootSpan {
            run_id: 1,
            run_attempt: 1,
        })
        .unwrap_err();
        assert!(err.to_string().contains("root span"));
    }

    #[test]
    fn test_material_matches_documented_layout() {
        let key = IdKey::TestSpan {
            run_id: 7,
            run_attempt: 2,
            suite: "S",
            classname: "C",
            name: "N",
        };
        assert_eq!(key.material(), "72SCN");
        assert_eq!(key.kind().digest_range(), 8..16);
    }

    #[test]
    fn test_hex_roundtrip() {
        let id = trace_id(42, 1).unwrap();
        assert_eq!(TraceId::from_hex(&id.to_string()).unwrap(), id);
        let span = root_span_id(42, 1).unwrap();
        assert_eq!(SpanId::from_hex(&span.to_string()).unwrap(), span);
        assert!(SpanId::from_hex("zz").is_err());
    }
}
