//! Per-axis side selection and the final measurement record.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::edge::{Axis, Edge};
use crate::gauge::{format_catalog_gauge, round_to_quarter, EdgeGaugeResult};

/// Spacing variation above which an edge is flagged as irregular
const IRREGULAR_SPACING_CV: f32 = 0.15;
/// Gauges outside this range are rare in catalogs
const TYPICAL_GAUGE_RANGE: (f32, f32) = (8.5, 16.0);
/// Allowed distance from the nearest quarter gauge
const QUARTER_GRID_TOLERANCE: f32 = 0.1;

/// Something unusual about a measurement worth showing to the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GaugeAnomaly {
    IrregularSpacing { edge: Edge, cv: f32 },
    BelowTypicalRange { gauge: f32 },
    AboveTypicalRange { gauge: f32 },
    OffQuarterGrid { gauge: f32 },
}

impl fmt::Display for GaugeAnomaly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GaugeAnomaly::IrregularSpacing { edge, cv } => {
                write!(f, "irregular spacing on the {edge} edge (cv {cv:.2})")
            }
            GaugeAnomaly::BelowTypicalRange { gauge } => {
                write!(f, "gauge {gauge:.2} is below the typical range")
            }
            GaugeAnomaly::AboveTypicalRange { gauge } => {
                write!(f, "gauge {gauge:.2} is above the typical range")
            }
            GaugeAnomaly::OffQuarterGrid { gauge } => {
                write!(f, "gauge {gauge:.2} is not close to a quarter step")
            }
        }
    }
}

/// Final result of one measurement run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GaugeMeasurement {
    /// Gauge of the top/bottom axis, 0 when unset
    pub horizontal_gauge: f32,
    /// Gauge of the left/right axis, 0 when unset
    pub vertical_gauge: f32,
    /// At most one result per axis
    pub selected_edges: BTreeMap<Edge, EdgeGaugeResult>,
    /// Average of both axes when both are set
    pub compound_gauge: Option<f32>,
    /// `"H × V"` to one decimal, `N/A` for unset axes
    pub notation: String,
    pub anomalies: Vec<GaugeAnomaly>,
}

impl GaugeMeasurement {
    /// Measurement with both axes unset.
    pub fn empty() -> Self {
        Self {
            horizontal_gauge: 0.0,
            vertical_gauge: 0.0,
            selected_edges: BTreeMap::new(),
            compound_gauge: None,
            notation: notation(0.0, 0.0),
            anomalies: Vec::new(),
        }
    }

    /// Selected result of the top/bottom axis
    pub fn horizontal(&self) -> Option<&EdgeGaugeResult> {
        self.axis(Axis::Horizontal)
    }

    pub fn vertical(&self) -> Option<&EdgeGaugeResult> {
        self.axis(Axis::Vertical)
    }

    fn axis(&self, axis: Axis) -> Option<&EdgeGaugeResult> {
        self.selected_edges.values().find(|r| r.edge.axis() == axis)
    }

    pub fn is_empty(&self) -> bool {
        self.selected_edges.is_empty()
    }

    /// Quarter step catalog form, e.g. `14 × 13½`.
    pub fn catalog_notation(&self) -> String {
        if self.horizontal_gauge <= 0.0 && self.vertical_gauge <= 0.0 {
            return "N/A".to_string();
        }
        format!(
            "{} × {}",
            format_catalog_gauge(self.horizontal_gauge),
            format_catalog_gauge(self.vertical_gauge)
        )
    }

    /// Both axes set and different after quarter rounding.
    pub fn is_compound(&self) -> bool {
        self.horizontal_gauge > 0.0
            && self.vertical_gauge > 0.0
            && round_to_quarter(self.horizontal_gauge) != round_to_quarter(self.vertical_gauge)
    }
}

fn notation(horizontal: f32, vertical: f32) -> String {
    let axis = |g: f32| {
        if g > 0.0 {
            format!("{g:.1}")
        } else {
            "N/A".to_string()
        }
    };
    if horizontal <= 0.0 && vertical <= 0.0 {
        "N/A".to_string()
    } else {
        format!("{} × {}", axis(horizontal), axis(vertical))
    }
}

/// Picks the better edge of each axis.
#[derive(Debug, Clone, Copy, Default)]
pub struct SideSelector;

impl SideSelector {
    /// Assemble a measurement from up to four edge results.
    ///
    /// Per axis the valid result with the highest quality wins, then the
    /// one with more tics, then the one earlier in compass order.
    pub fn select(&self, results: &[EdgeGaugeResult]) -> GaugeMeasurement {
        let mut selected_edges = BTreeMap::new();
        for axis in [Axis::Horizontal, Axis::Vertical] {
            if let Some(best) = best_of_axis(results, axis) {
                selected_edges.insert(best.edge, best.clone());
            }
        }

        let gauge_of = |axis: Axis| {
            selected_edges
                .values()
                .find(|r: &&EdgeGaugeResult| r.edge.axis() == axis)
                .map_or(0.0, |r| r.gauge)
        };
        let horizontal_gauge = gauge_of(Axis::Horizontal);
        let vertical_gauge = gauge_of(Axis::Vertical);

        let compound_gauge = (horizontal_gauge > 0.0 && vertical_gauge > 0.0)
            .then(|| (horizontal_gauge + vertical_gauge) / 2.0);

        let anomalies = anomalies(&selected_edges, [horizontal_gauge, vertical_gauge]);
        let notation = notation(horizontal_gauge, vertical_gauge);
        debug!("selected {} ({} anomalies)", notation, anomalies.len());

        GaugeMeasurement {
            horizontal_gauge,
            vertical_gauge,
            selected_edges,
            compound_gauge,
            notation,
            anomalies,
        }
    }
}

fn best_of_axis(results: &[EdgeGaugeResult], axis: Axis) -> Option<&EdgeGaugeResult> {
    results
        .iter()
        .filter(|r| axis.edges().contains(&r.edge) && r.is_valid())
        .fold(None, |best: Option<&EdgeGaugeResult>, r| match best {
            None => Some(r),
            Some(b) => {
                let better = r.quality > b.quality
                    || (r.quality == b.quality && r.tic_count > b.tic_count)
                    || (r.quality == b.quality && r.tic_count == b.tic_count && r.edge < b.edge);
                Some(if better { r } else { b })
            }
        })
}

fn anomalies(selected: &BTreeMap<Edge, EdgeGaugeResult>, gauges: [f32; 2]) -> Vec<GaugeAnomaly> {
    let mut found: Vec<GaugeAnomaly> = selected
        .values()
        .filter(|r| r.spacing_cv > IRREGULAR_SPACING_CV)
        .map(|r| GaugeAnomaly::IrregularSpacing {
            edge: r.edge,
            cv: r.spacing_cv,
        })
        .collect();

    let (low, high) = TYPICAL_GAUGE_RANGE;
    for gauge in gauges.into_iter().filter(|&g| g > 0.0) {
        if gauge < low {
            found.push(GaugeAnomaly::BelowTypicalRange { gauge });
        } else if gauge > high {
            found.push(GaugeAnomaly::AboveTypicalRange { gauge });
        }
        if (gauge - round_to_quarter(gauge)).abs() > QUARTER_GRID_TOLERANCE {
            found.push(GaugeAnomaly::OffQuarterGrid { gauge });
        }
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(edge: Edge, gauge: f32, quality: f32, tic_count: usize) -> EdgeGaugeResult {
        EdgeGaugeResult {
            gauge,
            quality,
            tic_count,
            ..EdgeGaugeResult::unset(edge)
        }
    }

    #[test]
    fn test_higher_quality_wins() {
        let m = SideSelector.select(&[
            result(Edge::Top, 14.0, 0.6, 10),
            result(Edge::Bottom, 13.0, 0.8, 8),
            result(Edge::Left, 12.5, 0.7, 9),
        ]);
        assert_eq!(m.horizontal_gauge, 13.0);
        assert_eq!(m.vertical_gauge, 12.5);
        assert_eq!(
            m.selected_edges.keys().copied().collect::<Vec<_>>(),
            vec![Edge::Bottom, Edge::Left]
        );
        assert_eq!(m.notation, "13.0 × 12.5");
        assert_eq!(m.compound_gauge, Some(12.75));
        assert_eq!(m.horizontal().map(|r| r.edge), Some(Edge::Bottom));
    }

    #[test]
    fn test_equal_quality_prefers_more_tics() {
        let m = SideSelector.select(&[
            result(Edge::Left, 11.0, 0.5, 7),
            result(Edge::Right, 12.0, 0.5, 9),
        ]);
        assert_eq!(m.vertical().map(|r| r.edge), Some(Edge::Right));
        assert_eq!(m.vertical_gauge, 12.0);
    }

    #[test]
    fn test_full_tie_prefers_compass_order() {
        let m = SideSelector.select(&[
            result(Edge::Bottom, 13.0, 0.5, 9),
            result(Edge::Top, 14.0, 0.5, 9),
        ]);
        assert_eq!(m.horizontal_gauge, 14.0);
    }

    #[test]
    fn test_unset_axes() {
        let m = SideSelector.select(&[
            result(Edge::Top, 14.0, 0.6, 10),
            EdgeGaugeResult::unset(Edge::Left),
        ]);
        assert_eq!(m.vertical_gauge, 0.0);
        assert_eq!(m.notation, "14.0 × N/A");
        assert_eq!(m.compound_gauge, None);
        assert!(!m.is_compound());

        let empty = SideSelector.select(&[]);
        assert_eq!(empty, GaugeMeasurement::empty());
        assert_eq!(empty.notation, "N/A");
        assert_eq!(empty.catalog_notation(), "N/A");
    }

    #[test]
    fn test_catalog_notation_and_compound() {
        let m = SideSelector.select(&[
            result(Edge::Top, 14.02, 0.6, 10),
            result(Edge::Right, 13.48, 0.6, 10),
        ]);
        assert_eq!(m.catalog_notation(), "14 × 13½");
        assert!(m.is_compound());

        let line = SideSelector.select(&[
            result(Edge::Top, 11.98, 0.6, 10),
            result(Edge::Left, 12.04, 0.6, 10),
        ]);
        assert!(!line.is_compound());
    }

    #[test]
    fn test_anomalies() {
        let mut irregular = result(Edge::Top, 17.38, 0.4, 6);
        irregular.spacing_cv = 0.3;
        let m = SideSelector.select(&[irregular, result(Edge::Left, 8.0, 0.5, 5)]);
        assert_eq!(
            m.anomalies,
            vec![
                GaugeAnomaly::IrregularSpacing {
                    edge: Edge::Top,
                    cv: 0.3
                },
                GaugeAnomaly::AboveTypicalRange { gauge: 17.38 },
                GaugeAnomaly::OffQuarterGrid { gauge: 17.38 },
                GaugeAnomaly::BelowTypicalRange { gauge: 8.0 },
            ]
        );
        assert!(m.anomalies[0].to_string().contains("top"));
    }
}
