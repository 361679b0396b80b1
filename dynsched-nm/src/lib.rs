/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! dynsched-nm – network manager for TSCH dynamic scheduling.
//!
//! Drives a coordinator device over a serial link: the operator picks one of
//! the cataloged link schedules, the manager serializes it into the
//! coordinator's line command and transmits it, while a concurrent reader
//! watches the device's log stream for the scheduling-latency diagnostics it
//! prints after applying a schedule.
//!
//! Module layout:
//!
//! ```text
//! lib.rs
//! ├── schedule    – Link / Schedule data model
//! ├── catalog/    – built-in schedule set + YAML catalog files
//! ├── wire/       – schedule command serializer and parser
//! ├── logwatch/   – latency extraction from the device log stream
//! ├── transport/  – line-oriented serial transport (writer/reader split)
//! └── session/    – the two concurrent loops and their shutdown contract
//! ```

pub mod catalog;
pub mod logwatch;
pub mod schedule;
pub mod session;
pub mod transport;
pub mod wire;
