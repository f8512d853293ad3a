// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// lightframe-metrics: Scalar quality metrics (HFR, FWHM, eccentricity,
// guiding RMS, exposure) pulled out of analysis and metadata trees whose
// shape depends on which capture-side extensions produced them.

pub mod report;
pub mod resolver;

pub use report::{MetricReport, subject_labels};
pub use resolver::{Metric, MetricQuery, MetricResolver, MetricSource, SearchOptions};
