// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Streaming sensor-sample collector
//!
//! Subscribes to one or more aggregators, keeps only samples from the
//! transmitters and receivers of interest, and writes one tab-separated
//! record per admitted sample.
//!
//! # Features
//!
//! - **Subscription rules**: physical layer, update interval and exact or
//!   masked transmitter selectors sent to each aggregator
//! - **Local admission**: authoritative transmitter/receiver allow-lists
//!   (an empty list admits everything)
//! - **Record formats**: decimal or hexadecimal identifiers
//! - **Outputs**: stdout, file (with rotation), memory
//!
//! # Example
//!
//! ```rust,ignore
//! use streamcollect::{
//!     create_formatter, create_output, ChannelTransport, Endpoint, IdentifierLists,
//!     OutputConfig, OutputMode, HexTimestamp, SubscriptionDispatcher,
//! };
//!
//! let lists = IdentifierLists::parse("5 6\n\n", OutputMode::Decimal)?;
//! let (rule, filter) = lists.into_subscription(0);
//!
//! let mut dispatcher = SubscriptionDispatcher::new(
//!     rule,
//!     filter,
//!     create_formatter(OutputMode::Decimal, HexTimestamp::Current),
//!     create_output(&OutputConfig::Stdout)?,
//! );
//!
//! let transport = ChannelTransport::new();
//! dispatcher.start(&transport, &[Endpoint::new("localhost", 7008)])?;
//! dispatcher.wait()?;
//! ```

mod config;
mod dispatcher;
mod filter;
mod formatter;
mod ident;
mod output;
mod rule;
mod sample;
pub mod transport;

pub use config::{
    parse_identifier, CollectorConfig, CollectorConfigBuilder, ConfigError, Endpoint,
    IdentifierLists,
};
pub use dispatcher::{
    DispatchError, DispatchStats, DispatchStatsSnapshot, DispatcherState, StopHandle,
    SubscriptionDispatcher,
};
pub use filter::AdmissionFilter;
pub use formatter::{
    create_formatter, Clock, DecimalFormatter, FixedClock, HexFormatter, HexTimestamp,
    OutputMode, RecordFormatter, SystemClock,
};
pub use ident::{Identifier, IdentifierSet};
pub use output::{
    create_output, parse_size, FileOutput, FileRotation, MemoryOutput, OutputConfig, SampleOutput,
    StdoutOutput,
};
pub use rule::{SubscriptionRule, TransmitterSpec, EXACT_MASK};
pub use sample::SampleRecord;
pub use transport::{
    ChannelTransport, LineTransport, SampleSink, Transport, TransportError,
};
