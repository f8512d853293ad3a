// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Metric resolution: bounded, depth-limited search for a named numeric value.
//
// Search order for one query against a primary object:
//
//   0. direct fields of the primary object, synonym by synonym
//   1. direct fields of every nested object of the primary, in field order
//   2. one level further, but only inside nested objects whose type name
//      marks them as coming from a known optional extension
//
// The first candidate that coerces to a finite number wins. Missing fields,
// non-numeric values, and non-object nodes are skipped, never fatal.

use lightframe_core::types::metadata_paths;
use lightframe_core::value::{Record, StructuredValue};
use lightframe_core::Artifact;
use tracing::{debug, instrument, trace};

/// Type-name fragments that identify containers produced by optional
/// capture-side extensions.
const DEFAULT_EXTENSION_MARKERS: &[&str] = &["NINA.Plugin", "HocusFocus"];

/// Deepest search level (see module docs).
const DEFAULT_MAX_DEPTH: usize = 2;

/// Metrics Lightframe knows how to report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    Hfr,
    Fwhm,
    Eccentricity,
    GuidingRmsTotal,
    GuidingRmsRa,
    GuidingRmsDec,
    ExposureTime,
}

/// Where a metric's primary object lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricSource {
    /// The star analysis object.
    Analysis,
    /// A subtree of the capture metadata.
    Metadata(&'static [&'static str]),
}

impl Metric {
    pub const ALL: [Metric; 7] = [
        Metric::Hfr,
        Metric::Fwhm,
        Metric::Eccentricity,
        Metric::GuidingRmsTotal,
        Metric::GuidingRmsRa,
        Metric::GuidingRmsDec,
        Metric::ExposureTime,
    ];

    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Hfr => "HFR",
            Self::Fwhm => "FWHM",
            Self::Eccentricity => "Eccentricity",
            Self::GuidingRmsTotal => "Guiding RMS (total)",
            Self::GuidingRmsRa => "Guiding RMS (RA)",
            Self::GuidingRmsDec => "Guiding RMS (Dec)",
            Self::ExposureTime => "Exposure",
        }
    }

    /// Acceptable field names, most specific first.
    pub fn synonyms(&self) -> &'static [&'static str] {
        match self {
            Self::Hfr => &["HFR", "AverageHFR", "HFRAverage", "MeanHFR"],
            Self::Fwhm => &["FWHM", "AverageFWHM", "FWHMAverage", "MeanFWHM"],
            Self::Eccentricity => &["Eccentricity", "AverageEccentricity", "MeanEccentricity"],
            Self::GuidingRmsTotal => &["Total", "TotalRMS", "RMSTotal"],
            Self::GuidingRmsRa => &["RA", "RightAscension", "RARMS"],
            Self::GuidingRmsDec => &["Dec", "Declination", "DecRMS"],
            Self::ExposureTime => &["ExposureTime", "Exposure", "ExposureDuration"],
        }
    }

    pub fn source(&self) -> MetricSource {
        match self {
            Self::Hfr | Self::Fwhm | Self::Eccentricity => MetricSource::Analysis,
            Self::GuidingRmsTotal | Self::GuidingRmsRa | Self::GuidingRmsDec => {
                MetricSource::Metadata(metadata_paths::RECORDED_RMS)
            }
            Self::ExposureTime => MetricSource::Metadata(&["Image"]),
        }
    }

    /// Look a metric up by label or any of its synonyms, ignoring case.
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL.into_iter().find(|metric| {
            metric.label().eq_ignore_ascii_case(name)
                || metric
                    .synonyms()
                    .iter()
                    .any(|synonym| synonym.eq_ignore_ascii_case(name))
        })
    }

    pub fn query(&self) -> MetricQuery {
        MetricQuery {
            name: self.label().to_owned(),
            synonyms: self.synonyms().iter().map(|s| (*s).to_owned()).collect(),
        }
    }
}

/// A resolution request: a value name plus the ordered field names that may
/// carry it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricQuery {
    pub name: String,
    pub synonyms: Vec<String>,
}

impl MetricQuery {
    /// A query whose only synonym is its own name.
    pub fn named(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            synonyms: vec![name.clone()],
            name,
        }
    }
}

/// Tunables for the structural search.
#[derive(Debug, Clone)]
pub struct SearchOptions {
    /// 0 = direct fields only, 1 = plus nested objects, 2 = plus one more
    /// level inside extension containers.
    pub max_depth: usize,
    /// Type-name fragments (case-insensitive) that mark extension containers.
    pub extension_markers: Vec<String>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            extension_markers: DEFAULT_EXTENSION_MARKERS
                .iter()
                .map(|m| (*m).to_owned())
                .collect(),
        }
    }
}

impl SearchOptions {
    fn is_extension_container(&self, record: &Record) -> bool {
        let Some(type_name) = record.type_name.as_deref() else {
            return false;
        };
        let type_name = type_name.to_ascii_lowercase();
        self.extension_markers
            .iter()
            .any(|marker| type_name.contains(&marker.to_ascii_lowercase()))
    }
}

/// Resolves metrics against analysis and metadata objects.
#[derive(Debug, Clone, Default)]
pub struct MetricResolver {
    options: SearchOptions,
}

impl MetricResolver {
    pub fn new(options: SearchOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &SearchOptions {
        &self.options
    }

    /// Resolve a known metric from explicit analysis and metadata objects.
    #[instrument(skip_all, fields(metric = metric.label()))]
    pub fn resolve(
        &self,
        metric: Metric,
        analysis: &StructuredValue,
        metadata: &StructuredValue,
    ) -> Option<f64> {
        let primary = match metric.source() {
            MetricSource::Analysis => analysis,
            MetricSource::Metadata(root) => metadata.path(root)?,
        };
        let value = self.resolve_query(&metric.query(), primary);
        debug!(resolved = ?value, "metric resolved");
        value
    }

    /// Resolve a known metric from a cached artifact.
    pub fn resolve_artifact(&self, metric: Metric, artifact: &Artifact) -> Option<f64> {
        self.resolve(metric, artifact.analysis(), artifact.metadata())
    }

    /// Resolve a metric by name. Known names use their synonym list and
    /// source; anything else is searched for verbatim in the analysis object.
    pub fn resolve_named(&self, name: &str, artifact: &Artifact) -> Option<f64> {
        match Metric::from_name(name) {
            Some(metric) => self.resolve_artifact(metric, artifact),
            None => self.resolve_query(&MetricQuery::named(name), artifact.analysis()),
        }
    }

    /// Run the bounded search for `query` against `primary`.
    ///
    /// Returns `None` when `primary` is absent or not an object, or when no
    /// finite numeric candidate exists within the depth limit.
    pub fn resolve_query(&self, query: &MetricQuery, primary: &StructuredValue) -> Option<f64> {
        let record = primary.as_record()?;

        if let Some(value) = direct_match(record, &query.synonyms) {
            trace!(query = %query.name, depth = 0, "direct match");
            return Some(value);
        }

        if self.options.max_depth >= 1 {
            for (_, child) in record.iter() {
                let Some(nested) = child.as_record() else {
                    continue;
                };
                if let Some(value) = direct_match(nested, &query.synonyms) {
                    trace!(query = %query.name, depth = 1, "nested match");
                    return Some(value);
                }
            }
        }

        if self.options.max_depth >= 2 {
            for (name, child) in record.iter() {
                let Some(container) = child.as_record() else {
                    continue;
                };
                if !self.options.is_extension_container(container) {
                    continue;
                }
                for (_, grandchild) in container.iter() {
                    let Some(nested) = grandchild.as_record() else {
                        continue;
                    };
                    if let Some(value) = direct_match(nested, &query.synonyms) {
                        trace!(query = %query.name, container = name, depth = 2, "extension match");
                        return Some(value);
                    }
                }
            }
        }

        None
    }
}

/// First finite numeric field of `record` named by any synonym, trying
/// synonyms in order.
fn direct_match(record: &Record, synonyms: &[String]) -> Option<f64> {
    synonyms.iter().find_map(|synonym| {
        record
            .iter()
            .filter(|(name, _)| name.eq_ignore_ascii_case(synonym))
            .find_map(|(_, value)| value.as_f64())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn resolver() -> MetricResolver {
        MetricResolver::default()
    }

    #[test]
    fn direct_value_beats_nested_value() {
        let analysis: StructuredValue = json!({
            "HFR": 2.5,
            "Details": { "HFR": 9.9 }
        })
        .into();
        let hfr = resolver().resolve(Metric::Hfr, &analysis, &StructuredValue::Absent);
        assert_eq!(hfr, Some(2.5));
    }

    #[test]
    fn absent_analysis_resolves_to_none() {
        let hfr = resolver().resolve(Metric::Hfr, &StructuredValue::Absent, &StructuredValue::Absent);
        assert_eq!(hfr, None);
    }

    #[test]
    fn no_numeric_candidate_resolves_to_none() {
        let analysis: StructuredValue = json!({
            "HFR": "unknown",
            "Stars": { "Count": 12, "HFR": null },
            "Note": "nothing here"
        })
        .into();
        let hfr = resolver().resolve(Metric::Hfr, &analysis, &StructuredValue::Absent);
        assert_eq!(hfr, None);
    }

    #[test]
    fn synonyms_match_case_insensitively() {
        let analysis: StructuredValue = json!({ "averagefwhm": 3.1 }).into();
        let fwhm = resolver().resolve(Metric::Fwhm, &analysis, &StructuredValue::Absent);
        assert_eq!(fwhm, Some(3.1));
    }

    #[test]
    fn non_numeric_candidate_is_skipped() {
        let analysis: StructuredValue = json!({
            "HFR": "NaN",
            "AverageHFR": 1.75
        })
        .into();
        let hfr = resolver().resolve(Metric::Hfr, &analysis, &StructuredValue::Absent);
        assert_eq!(hfr, Some(1.75));
    }

    #[test]
    fn nested_objects_searched_in_field_order() {
        let analysis: StructuredValue = json!({
            "Count": 40,
            "First": { "Eccentricity": "bad" },
            "Second": { "Eccentricity": 0.42 },
            "Third": { "Eccentricity": 0.9 }
        })
        .into();
        let ecc = resolver().resolve(Metric::Eccentricity, &analysis, &StructuredValue::Absent);
        assert_eq!(ecc, Some(0.42));
    }

    #[test]
    fn extension_containers_get_one_extra_level() {
        let analysis: StructuredValue = json!({
            "Detector": {
                "$type": "NINA.Plugin.HocusFocus.StarDetection.Result, HocusFocus",
                "Metrics": { "FWHM": 2.2 }
            }
        })
        .into();
        let fwhm = resolver().resolve(Metric::Fwhm, &analysis, &StructuredValue::Absent);
        assert_eq!(fwhm, Some(2.2));
    }

    #[test]
    fn unmarked_containers_are_not_searched_deeper() {
        let analysis: StructuredValue = json!({
            "Detector": {
                "$type": "Some.Other.Result",
                "Metrics": { "FWHM": 2.2 }
            }
        })
        .into();
        let fwhm = resolver().resolve(Metric::Fwhm, &analysis, &StructuredValue::Absent);
        assert_eq!(fwhm, None);
    }

    #[test]
    fn depth_limit_is_honoured() {
        let analysis: StructuredValue = json!({ "Nested": { "HFR": 2.0 } }).into();
        let shallow = MetricResolver::new(SearchOptions {
            max_depth: 0,
            ..Default::default()
        });
        assert_eq!(shallow.resolve(Metric::Hfr, &analysis, &StructuredValue::Absent), None);
        assert_eq!(resolver().resolve(Metric::Hfr, &analysis, &StructuredValue::Absent), Some(2.0));
    }

    #[test]
    fn guiding_and_exposure_come_from_metadata() {
        let metadata: StructuredValue = json!({
            "Image": {
                "ExposureTime": 180.0,
                "RecordedRMS": { "Total": 0.61, "RA": 0.4, "Dec": 0.45, "Scale": 1.38 }
            }
        })
        .into();
        let r = resolver();
        let none = StructuredValue::Absent;
        assert_eq!(r.resolve(Metric::GuidingRmsTotal, &none, &metadata), Some(0.61));
        assert_eq!(r.resolve(Metric::GuidingRmsRa, &none, &metadata), Some(0.4));
        assert_eq!(r.resolve(Metric::GuidingRmsDec, &none, &metadata), Some(0.45));
        assert_eq!(r.resolve(Metric::ExposureTime, &none, &metadata), Some(180.0));
    }

    #[test]
    fn missing_metadata_subtree_resolves_to_none() {
        let metadata: StructuredValue = json!({ "Image": { "ExposureTime": 60 } }).into();
        let rms = resolver().resolve(Metric::GuidingRmsTotal, &StructuredValue::Absent, &metadata);
        assert_eq!(rms, None);
    }

    #[test]
    fn from_name_accepts_labels_and_synonyms() {
        assert_eq!(Metric::from_name("hfr"), Some(Metric::Hfr));
        assert_eq!(Metric::from_name("MeanFWHM"), Some(Metric::Fwhm));
        assert_eq!(Metric::from_name("Exposure"), Some(Metric::ExposureTime));
        assert_eq!(Metric::from_name("StarCount"), None);
    }

    #[test]
    fn custom_query_searches_analysis_verbatim() {
        let analysis: StructuredValue = json!({ "Stats": { "StarCount": 311 } }).into();
        let count = resolver().resolve_query(&MetricQuery::named("starcount"), &analysis);
        assert_eq!(count, Some(311.0));
    }
}
