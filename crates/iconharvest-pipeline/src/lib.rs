// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The harvest pipeline.
//!
//! Authentication and crawling share one browser and run strictly in
//! sequence. Downloads then fan out over plain HTTP with bounded
//! concurrency, each asset ending in exactly one recorded outcome. Only a
//! failure that leaves nothing to process ends the run with an error.

mod error;
mod guard;
mod outcome;
mod pipeline;
mod plan;

pub use error::{exit_code, PipelineError};
pub use guard::{SessionGuard, SessionTicket};
pub use outcome::{AssetFailure, AssetOutcome, OutcomeStatus, PipelineResult};
pub use pipeline::{FetchTransport, Pipeline, PipelineSettings, DEFAULT_CONCURRENCY};
