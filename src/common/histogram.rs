//! Reshapes the raw Q-score histogram into the chart series the dashboard
//! renders: gap-filled columns split at Q30, or linked area segments for
//! instruments whose bins are variable-width windows.

use serde::Serialize;

use crate::error::StatusError;
use crate::platform::HistogramPolicy;

/// Index at which the discrete series switches to its "Q30 and above" half
pub const Q30_PIVOT: usize = 29;
/// Positions left free after the last windowed segment
pub const WINDOW_LOOKAHEAD: u32 = 10;

pub const LOW_COLORS: (&str, &str) = ("#f2fbff", "#4db0e8");
pub const DISCRETE_HIGH_COLORS: (&str, &str) = ("#ebffeb", "#08a11c");
pub const WINDOWED_HIGH_COLORS: (&str, &str) = ("#faffff", "#95edeb");

pub const DEFAULT_X_LABEL: &str = "Q Score";
pub const DEFAULT_Y_LABEL: &str = "Total (million)";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistogramBin {
    /// lowest Q value covered by the bin
    pub bin: u32,
    pub count: f64,
    pub width: u32,
}

/// Sparse Q-score histogram. Bins are not necessarily sorted or contiguous.
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    pub bins: Vec<HistogramBin>,
    /// last x position the chart has to show
    pub axis_max: u32,
    pub x_label: String,
    pub y_label: String,
}

impl Histogram {
    /// Histogram with the default labels; the axis ends at the upper edge of
    /// the highest populated bin
    pub fn new(bins: Vec<HistogramBin>) -> Histogram {
        let axis_max = bins
            .iter()
            .filter(|b| b.count > 0.0)
            .map(|b| b.bin + b.width.max(1) - 1)
            .max()
            .unwrap_or(0);

        Histogram {
            bins,
            axis_max,
            x_label: DEFAULT_X_LABEL.to_owned(),
            y_label: DEFAULT_Y_LABEL.to_owned(),
        }
    }

    pub fn with_axis_max(mut self, axis_max: u32) -> Histogram {
        self.axis_max = axis_max;
        self
    }

    /// No bin holds any clusters yet
    pub fn is_empty(&self) -> bool {
        !self.bins.iter().any(|b| b.count > 0.0)
    }

    fn sorted_bins(&self) -> Vec<HistogramBin> {
        let mut bins = self.bins.clone();
        bins.sort_by_key(|b| b.bin);
        bins
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LinearGradient {
    pub x1: u8,
    pub y1: u8,
    pub x2: u8,
    pub y2: u8,
}

/// Bottom-to-top two-stop gradient
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Gradient {
    #[serde(rename = "linearGradient")]
    pub linear_gradient: LinearGradient,
    pub stops: [(u8, &'static str); 2],
}

impl Gradient {
    pub fn new(colors: (&'static str, &'static str)) -> Gradient {
        Gradient {
            linear_gradient: LinearGradient { x1: 0, y1: 1, x2: 0, y2: 0 },
            stops: [(0, colors.0), (1, colors.1)],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Point {
    pub x: u32,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Marker {
    pub enabled: bool,
}

/// How a windowed segment joins the others into one line
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum SeriesLink {
    #[serde(rename = "id")]
    Anchor(String),
    #[serde(rename = "linkedTo")]
    LinkedTo(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ChartSegment {
    Discrete {
        name: String,
        data: Vec<Point>,
        color: Gradient,
    },
    Windowed {
        #[serde(flatten)]
        link: SeriesLink,
        name: String,
        /// `None` before the segment starts so all segments share one x axis
        data: Vec<Option<f64>>,
        marker: Marker,
        color: Gradient,
    },
}

impl ChartSegment {
    /// Number of plotted (non-padding) positions
    pub fn width(&self) -> usize {
        match self {
            ChartSegment::Discrete { data, .. } => data.len(),
            ChartSegment::Windowed { data, .. } => data.iter().filter(|v| v.is_some()).count(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKind {
    Column,
    Area,
    /// placeholder while the run initializes
    Blank,
}

impl Serialize for ChartKind {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(match self {
            ChartKind::Column => "column",
            ChartKind::Area => "area",
            ChartKind::Blank => "",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Limit {
    pub read: String,
    pub cycle_nb: u32,
}

impl Limit {
    pub fn q30() -> Limit {
        Limit { read: "30".to_owned(), cycle_nb: 30 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesMetadata {
    pub limits: Vec<Limit>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    pub data: Vec<ChartSegment>,
    pub metadata: SeriesMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Charts {
    pub level: &'static str,
    pub dataset_label: String,
    pub header: String,
    pub subheader: String,
    pub xaxis_labels: Vec<u32>,
    pub x_limits: Vec<Limit>,
    pub yaxis_label: String,
    pub series: Series,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartData {
    pub charts: Charts,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartValue {
    pub scale: &'static str,
    pub chart: ChartKind,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartOptions {
    pub value: ChartValue,
}

/// The `q30_plot` chart descriptor
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Q30Plot {
    pub data: ChartData,
    pub options: ChartOptions,
}

impl Q30Plot {
    fn new(histogram: &Histogram, axis_max: u32, segments: Vec<ChartSegment>, chart: ChartKind) -> Q30Plot {
        Q30Plot {
            data: ChartData {
                charts: Charts {
                    level: "Q score",
                    dataset_label: histogram.x_label.clone(),
                    header: String::new(),
                    subheader: String::new(),
                    xaxis_labels: (1..=axis_max).collect(),
                    x_limits: vec![Limit::q30()],
                    yaxis_label: histogram.y_label.clone(),
                    series: Series {
                        data: segments,
                        metadata: SeriesMetadata { limits: vec![Limit::q30()] },
                    },
                },
            },
            options: ChartOptions {
                value: ChartValue { scale: "interop", chart },
            },
        }
    }

    /// Empty descriptor reported while a run is initializing
    pub fn placeholder() -> Q30Plot {
        Q30Plot {
            data: ChartData {
                charts: Charts {
                    level: "Q score",
                    dataset_label: String::new(),
                    header: String::new(),
                    subheader: String::new(),
                    xaxis_labels: Vec::new(),
                    x_limits: Vec::new(),
                    yaxis_label: String::new(),
                    series: Series {
                        data: Vec::new(),
                        metadata: SeriesMetadata {
                            limits: vec![Limit { read: String::new(), cycle_nb: 0 }],
                        },
                    },
                },
            },
            options: ChartOptions {
                value: ChartValue { scale: "interop", chart: ChartKind::Blank },
            },
        }
    }

    pub fn segments(&self) -> &[ChartSegment] {
        &self.data.charts.series.data
    }
}

/// Turn `histogram` into the chart for the instrument's policy. `series_id`
/// names the line windowed segments are linked into.
pub fn reshape(
    histogram: &Histogram,
    policy: HistogramPolicy,
    series_id: &str,
) -> Result<Q30Plot, StatusError> {
    if histogram.is_empty() {
        return Err(StatusError::MetricsNotReady(
            "quality histogram has no populated bins".to_owned(),
        ));
    }

    Ok(match policy {
        HistogramPolicy::DiscreteBin => discrete_plot(histogram),
        HistogramPolicy::WindowedBin => windowed_plot(histogram, series_id),
    })
}

/// Every position from 1 to the axis bound, with 0 where the histogram has no bin
pub fn fill_discrete(histogram: &Histogram) -> (Vec<u32>, Vec<f64>) {
    let highest = histogram.bins.iter().map(|b| b.bin).max().unwrap_or(0);
    let axis_max = histogram.axis_max.max(highest);

    let labels: Vec<u32> = (1..=axis_max).collect();
    let mut values = vec![0.0; labels.len()];
    for bin in histogram.sorted_bins().iter().filter(|b| b.bin >= 1) {
        values[bin.bin as usize - 1] = bin.count;
    }

    (labels, values)
}

fn discrete_plot(histogram: &Histogram) -> Q30Plot {
    let (labels, values) = fill_discrete(histogram);
    let axis_max = labels.last().copied().unwrap_or(0);

    let points: Vec<Point> = labels
        .iter()
        .zip(values.iter())
        .map(|(&x, &y)| Point { x, y })
        .collect();
    let pivot = Q30_PIVOT.min(points.len());
    let (low, high) = points.split_at(pivot);

    let segments = vec![
        ChartSegment::Discrete {
            name: histogram.x_label.clone(),
            data: low.to_vec(),
            color: Gradient::new(LOW_COLORS),
        },
        ChartSegment::Discrete {
            name: histogram.x_label.clone(),
            data: high.to_vec(),
            color: Gradient::new(DISCRETE_HIGH_COLORS),
        },
    ];

    Q30Plot::new(histogram, axis_max, segments, ChartKind::Column)
}

fn windowed_plot(histogram: &Histogram, series_id: &str) -> Q30Plot {
    let link_id = format!("{}-series", series_id);
    let mut segments = Vec::new();
    let mut offset = 0u32;
    let mut end = 0u32;

    for bin in histogram.sorted_bins() {
        let width = bin.width.max(1);
        if bin.count == 0.0 {
            offset += width;
            continue;
        }

        let mut data = vec![None; offset as usize];
        data.extend(std::iter::repeat(Some(bin.count)).take(width as usize));

        let link = if segments.is_empty() {
            SeriesLink::Anchor(link_id.clone())
        } else {
            SeriesLink::LinkedTo(link_id.clone())
        };
        let colors = if (offset as usize) < Q30_PIVOT {
            LOW_COLORS
        } else {
            WINDOWED_HIGH_COLORS
        };

        segments.push(ChartSegment::Windowed {
            link,
            name: histogram.x_label.clone(),
            data,
            marker: Marker { enabled: false },
            color: Gradient::new(colors),
        });

        offset += width;
        end = offset;
    }

    Q30Plot::new(histogram, end + WINDOW_LOOKAHEAD, segments, ChartKind::Area)
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    fn bin(bin: u32, count: f64, width: u32) -> HistogramBin {
        HistogramBin { bin, count, width }
    }

    fn binned() -> Histogram {
        Histogram::new(vec![
            bin(28, 6.0, 5),
            bin(1, 0.0, 14),
            bin(15, 2.0, 7),
            bin(22, 0.0, 6),
            bin(33, 9.0, 4),
            bin(37, 0.0, 5),
        ])
    }

    #[test]
    fn fill_sparse_discrete() {
        let histogram = Histogram::new(vec![bin(1, 0.0, 1), bin(2, 5.0, 1), bin(3, 0.0, 1)])
            .with_axis_max(5);

        let (labels, values) = fill_discrete(&histogram);
        assert_eq!(labels, vec![1, 2, 3, 4, 5]);
        assert_eq!(values, vec![0.0, 5.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn axis_from_populated_bins() {
        assert_eq!(Histogram::new(vec![bin(3, 1.0, 1), bin(40, 0.0, 1)]).axis_max, 3);
        assert_eq!(binned().axis_max, 36);
        assert_eq!(Histogram::new(Vec::new()).axis_max, 0);
    }

    #[test]
    fn discrete_split_at_q30() {
        let histogram = Histogram::new(vec![bin(37, 2.0, 1), bin(12, 1.0, 1), bin(32, 4.0, 1)]);
        let plot = reshape(&histogram, HistogramPolicy::DiscreteBin, "MiSeq1").unwrap();

        assert_eq!(plot.options.value.chart, ChartKind::Column);
        assert_eq!(plot.data.charts.xaxis_labels, (1..=37).collect::<Vec<_>>());

        let segments = plot.segments();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].width() + segments[1].width(), 37);

        match (&segments[0], &segments[1]) {
            (
                ChartSegment::Discrete { data: low, color: low_color, .. },
                ChartSegment::Discrete { data: high, color: high_color, .. },
            ) => {
                assert_eq!(low.len(), 29);
                assert_eq!(low[11], Point { x: 12, y: 1.0 });
                assert!(low.iter().filter(|p| p.x != 12).all(|p| p.y == 0.0));
                assert_eq!(high[0].x, 30);
                assert_eq!(high[2], Point { x: 32, y: 4.0 });
                assert_eq!(high.last(), Some(&Point { x: 37, y: 2.0 }));
                assert_eq!(low_color, &Gradient::new(LOW_COLORS));
                assert_eq!(high_color, &Gradient::new(DISCRETE_HIGH_COLORS));
            }
            _ => panic!("expected discrete segments"),
        }
    }

    #[test]
    fn discrete_below_pivot() {
        let histogram = Histogram::new(vec![bin(10, 3.0, 1)]);
        let plot = reshape(&histogram, HistogramPolicy::DiscreteBin, "MiSeq1").unwrap();
        let segments = plot.segments();

        assert_eq!(segments[0].width(), 10);
        assert_eq!(segments[1].width(), 0);
    }

    #[test]
    fn windowed_segments() {
        let histogram = binned();
        let plot = reshape(&histogram, HistogramPolicy::WindowedBin, "NextSeq").unwrap();

        assert_eq!(plot.options.value.chart, ChartKind::Area);
        let segments = plot.segments();
        assert_eq!(segments.len(), 3);

        let plotted: usize = segments.iter().map(|s| s.width()).sum();
        let non_zero: u32 = histogram.bins.iter().filter(|b| b.count != 0.0).map(|b| b.width).sum();
        assert_eq!(plotted, non_zero as usize);

        match &segments[0] {
            ChartSegment::Windowed { link, data, color, .. } => {
                assert_eq!(link, &SeriesLink::Anchor("NextSeq-series".to_owned()));
                assert_eq!(data.len(), 21);
                assert!(data[..14].iter().all(|v| v.is_none()));
                assert!(data[14..].iter().all(|v| *v == Some(2.0)));
                assert_eq!(color, &Gradient::new(LOW_COLORS));
            }
            _ => panic!("expected a windowed segment"),
        }
        match &segments[2] {
            ChartSegment::Windowed { link, data, color, .. } => {
                assert_eq!(link, &SeriesLink::LinkedTo("NextSeq-series".to_owned()));
                assert_eq!(data.iter().filter(|v| v.is_none()).count(), 32);
                assert_eq!(color, &Gradient::new(WINDOWED_HIGH_COLORS));
            }
            _ => panic!("expected a windowed segment"),
        }

        // last segment ends at 36
        assert_eq!(plot.data.charts.xaxis_labels.len(), 46);
    }

    #[test]
    fn empty_histogram_not_ready() {
        let err = reshape(&Histogram::new(Vec::new()), HistogramPolicy::WindowedBin, "NovaSeq_A")
            .unwrap_err();
        assert!(err.is_initializing());
    }

    #[test]
    fn zero_count_histogram_not_ready() {
        let zeros = Histogram::new(vec![bin(1, 0.0, 14), bin(15, 0.0, 7)]);
        assert!(zeros.is_empty());

        for policy in [HistogramPolicy::WindowedBin, HistogramPolicy::DiscreteBin].iter() {
            let err = reshape(&zeros, *policy, "NextSeq").unwrap_err();
            assert!(err.is_initializing(), "{:?}", err);
        }
    }

    #[test]
    fn windowed_json() {
        let histogram = Histogram::new(vec![bin(1, 1.5, 2)]);
        let plot = reshape(&histogram, HistogramPolicy::WindowedBin, "NovaSeq_B").unwrap();

        assert_eq!(
            serde_json::to_value(&plot.segments()[0]).unwrap(),
            json!({
                "id": "NovaSeq_B-series",
                "name": "Q Score",
                "data": [1.5, 1.5],
                "marker": {"enabled": false},
                "color": {
                    "linearGradient": {"x1": 0, "y1": 1, "x2": 0, "y2": 0},
                    "stops": [[0, "#f2fbff"], [1, "#4db0e8"]]
                }
            })
        );
        assert_eq!(
            serde_json::to_value(&plot.options).unwrap(),
            json!({"value": {"scale": "interop", "chart": "area"}})
        );
        assert_eq!(plot.data.charts.xaxis_labels, (1..=12).collect::<Vec<_>>());
    }

    #[test]
    fn placeholder_json() {
        assert_eq!(
            serde_json::to_value(&Q30Plot::placeholder()).unwrap(),
            json!({
                "data": {
                    "charts": {
                        "level": "Q score",
                        "dataset_label": "",
                        "header": "",
                        "subheader": "",
                        "xaxis_labels": [],
                        "x_limits": [],
                        "yaxis_label": "",
                        "series": {
                            "data": [],
                            "metadata": {"limits": [{"read": "", "cycle_nb": 0}]}
                        }
                    }
                },
                "options": {"value": {"scale": "interop", "chart": ""}}
            })
        );
    }
}
