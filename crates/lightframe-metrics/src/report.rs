// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable metric summary for a cached artifact.

use std::fmt;

use lightframe_core::types::metadata_paths;
use lightframe_core::value::StructuredValue;
use lightframe_core::Artifact;

use crate::resolver::{Metric, MetricQuery, MetricResolver};

/// Field names that carry the guiding pixel scale (arcsec per pixel).
const RMS_SCALE_SYNONYMS: &[&str] = &["Scale", "PixelScale"];

/// Every known metric resolved against one artifact.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricReport {
    values: Vec<(Metric, Option<f64>)>,
    /// Guiding scale in arcsec/pixel, when the guider reported one.
    rms_scale: Option<f64>,
}

impl MetricReport {
    pub fn from_artifact(artifact: &Artifact, resolver: &MetricResolver) -> Self {
        let values = Metric::ALL
            .into_iter()
            .map(|metric| (metric, resolver.resolve_artifact(metric, artifact)))
            .collect();

        let scale_query = MetricQuery {
            name: "Guiding scale".into(),
            synonyms: RMS_SCALE_SYNONYMS.iter().map(|s| (*s).to_owned()).collect(),
        };
        let rms_scale = artifact
            .metadata()
            .path(metadata_paths::RECORDED_RMS)
            .and_then(|rms| resolver.resolve_query(&scale_query, rms))
            .filter(|scale| *scale > 0.0);

        Self { values, rms_scale }
    }

    /// Resolved value of `metric`, if any.
    pub fn get(&self, metric: Metric) -> Option<f64> {
        self.values
            .iter()
            .find(|(m, _)| *m == metric)
            .and_then(|(_, value)| *value)
    }

    /// Guiding RMS converted to arc-seconds, when both the pixel value and
    /// the guider scale are known.
    pub fn arcseconds(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::GuidingRmsTotal | Metric::GuidingRmsRa | Metric::GuidingRmsDec => {
                Some(self.get(metric)? * self.rms_scale?)
            }
            _ => None,
        }
    }

    /// Whether nothing at all could be resolved.
    pub fn is_empty(&self) -> bool {
        self.values.iter().all(|(_, value)| value.is_none())
    }
}

impl fmt::Display for MetricReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (metric, value) in &self.values {
            write!(f, "{}: ", metric.label())?;
            let Some(value) = value else {
                writeln!(f, "n/a")?;
                continue;
            };
            match metric {
                Metric::ExposureTime => writeln!(f, "{value:.2} s")?,
                Metric::GuidingRmsTotal | Metric::GuidingRmsRa | Metric::GuidingRmsDec => {
                    match self.arcseconds(*metric) {
                        Some(arcsec) => writeln!(f, "{value:.2} px ({arcsec:.2}\")")?,
                        None => writeln!(f, "{value:.2} px")?,
                    }
                }
                _ => writeln!(f, "{value:.2}")?,
            }
        }
        Ok(())
    }
}

/// Image type and target name for a message subject, when present.
pub fn subject_labels(artifact: &Artifact) -> (Option<&str>, Option<&str>) {
    let metadata = artifact.metadata();
    let label = |path: &[&str]| metadata.path(path).and_then(StructuredValue::as_str);
    (
        label(metadata_paths::IMAGE_TYPE),
        label(metadata_paths::TARGET_NAME),
    )
}
