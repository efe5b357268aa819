// Copyright 2025 JUnit Traces Contributors
// SPDX-License-Identifier: Apache-2.0

pub mod health;
pub mod webhook;

pub use webhook::{DeliveryResponse, DELIVERY_HEADER, EVENT_HEADER};
