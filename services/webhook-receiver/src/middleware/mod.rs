// Copyright 2025 JUnit Traces Contributors
// SPDX-License-Identifier: Apache-2.0

// Request verification middleware
pub mod signature;

pub use signature::{verify_signature, MAX_PAYLOAD_BYTES, SIGNATURE_HEADER};
