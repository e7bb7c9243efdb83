//! Chart renderers: pure transforms from a classification summary into
//! chart-ready series, plus PNG rendering with plotters.
//!
//! The transforms must tolerate absent optional fields (a summary without
//! `percentages`, ragged label/data lengths, empty clusters) without
//! panicking; malformed input degrades to fewer rows, never a crash.

use std::collections::BTreeMap;

use plotters::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::SentimentSummary;

/// The three fixed visualization palettes.
///
/// Each preset is an ordered sequence of three colors (positive, neutral,
/// negative). The selection is persisted under `colorOptions` so the
/// visualization and the generated report use the same palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ColorScheme {
    #[default]
    Classic,
    Ocean,
    Blossom,
}

impl ColorScheme {
    pub const ALL: [ColorScheme; 3] = [ColorScheme::Classic, ColorScheme::Ocean, ColorScheme::Blossom];

    /// CSS color names sent to the backend as `colorOptions`
    pub fn css_colors(&self) -> [&'static str; 3] {
        match self {
            ColorScheme::Classic => ["green", "gold", "crimson"],
            ColorScheme::Ocean => ["teal", "steelblue", "navy"],
            ColorScheme::Blossom => ["pink", "orchid", "purple"],
        }
    }

    /// The same palette as drawable colors
    pub fn rgb_colors(&self) -> [RGBColor; 3] {
        match self {
            ColorScheme::Classic => [RGBColor(46, 125, 50), RGBColor(251, 192, 45), RGBColor(198, 40, 40)],
            ColorScheme::Ocean => [RGBColor(0, 128, 128), RGBColor(70, 130, 180), RGBColor(0, 0, 128)],
            ColorScheme::Blossom => [RGBColor(244, 143, 177), RGBColor(186, 104, 200), RGBColor(123, 31, 162)],
        }
    }

    pub fn as_param(&self) -> &'static str {
        match self {
            ColorScheme::Classic => "classic",
            ColorScheme::Ocean => "ocean",
            ColorScheme::Blossom => "blossom",
        }
    }

    pub fn from_param(value: &str) -> Option<Self> {
        match value {
            "classic" => Some(ColorScheme::Classic),
            "ocean" => Some(ColorScheme::Ocean),
            "blossom" => Some(ColorScheme::Blossom),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ColorScheme::Classic => "Classic",
            ColorScheme::Ocean => "Ocean",
            ColorScheme::Blossom => "Blossom",
        }
    }
}

/// One labeled, colored value — feeds both the pie and the bar renderer
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSlice {
    pub label: String,
    pub value: f64,
    pub color: RGBColor,
}

/// One row of the text-format view
#[derive(Debug, Clone, PartialEq)]
pub struct TextRow {
    pub label: String,
    pub count: f64,
    pub percentage: f64,
}

/// One cluster's points for the scatter view
#[derive(Debug, Clone, PartialEq)]
pub struct ScatterSeries {
    pub label: String,
    pub points: Vec<(f64, f64)>,
    pub color: RGBColor,
}

/// Labeled, colored slices from a sentiment summary.
///
/// Labels and data are truncated to the shorter of the two; colors come from
/// the active scheme, cycling when there are more labels than preset colors.
pub fn chart_slices(summary: &SentimentSummary, scheme: ColorScheme) -> Vec<ChartSlice> {
    let data = summary
        .datasets
        .first()
        .map(|d| d.data.as_slice())
        .unwrap_or(&[]);
    let colors = scheme.rgb_colors();

    summary
        .labels
        .iter()
        .zip(data.iter())
        .enumerate()
        .map(|(i, (label, value))| ChartSlice {
            label: label.clone(),
            value: *value,
            color: colors[i % colors.len()],
        })
        .collect()
}

/// Label/count/percentage rows for the text-format view.
///
/// Missing `percentages` are recomputed from the counts; a zero total yields
/// zero percentages rather than a division by zero.
pub fn text_rows(summary: &SentimentSummary) -> Vec<TextRow> {
    let dataset = match summary.datasets.first() {
        Some(dataset) => dataset,
        None => return Vec::new(),
    };
    let total: f64 = dataset.data.iter().sum();

    summary
        .labels
        .iter()
        .zip(dataset.data.iter())
        .enumerate()
        .map(|(i, (label, count))| {
            let percentage = dataset
                .percentages
                .as_ref()
                .and_then(|p| p.get(i).copied())
                .unwrap_or(if total > 0.0 { count / total * 100.0 } else { 0.0 });
            TextRow {
                label: label.clone(),
                count: *count,
                percentage,
            }
        })
        .collect()
}

/// Per-cluster scatter series. Server cluster ids are zero-based strings;
/// they are shown one-based ("Cluster 1", ...). Unparsable ids keep their
/// raw form.
pub fn scatter_series(
    cluster_points: &BTreeMap<String, Vec<(f64, f64)>>,
    scheme: ColorScheme,
) -> Vec<ScatterSeries> {
    let colors = scheme.rgb_colors();

    cluster_points
        .iter()
        .enumerate()
        .map(|(i, (cluster_id, points))| {
            let label = match cluster_id.parse::<i64>() {
                Ok(id) => format!("Cluster {}", id + 1),
                Err(_) => format!("Cluster {}", cluster_id),
            };
            ScatterSeries {
                label,
                points: points.clone(),
                color: colors[i % colors.len()],
            }
        })
        .collect()
}

/// Per-cluster sample reviews, headed one-based like the scatter labels
pub fn cluster_sections(cluster_samples: &BTreeMap<String, Vec<String>>) -> Vec<(String, Vec<String>)> {
    cluster_samples
        .iter()
        .map(|(cluster_id, samples)| {
            let heading = match cluster_id.parse::<i64>() {
                Ok(id) => format!("Cluster {}", id + 1),
                Err(_) => format!("Cluster {}", cluster_id),
            };
            (heading, samples.clone())
        })
        .collect()
}

/// Scratch path for a chart image; unique per call so concurrent requests
/// cannot clobber each other.
fn scratch_path() -> std::path::PathBuf {
    std::env::temp_dir().join(format!("reviewlens_chart_{}.png", Uuid::new_v4()))
}

/// Render a pie chart of the sentiment distribution
pub fn render_pie_png(
    slices: &[ChartSlice],
    title: &str,
    width: u32,
    height: u32,
) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    let sizes: Vec<f64> = slices.iter().map(|s| s.value).collect();
    let colors: Vec<RGBColor> = slices.iter().map(|s| s.color).collect();
    let labels: Vec<String> = slices.iter().map(|s| s.label.clone()).collect();
    let total: f64 = sizes.iter().sum();

    let path = scratch_path();
    {
        let root = BitMapBackend::new(&path, (width, height)).into_drawing_area();
        root.fill(&WHITE)?;
        let root = root.titled(title, ("sans-serif", 30).into_font())?;

        if total > 0.0 {
            let center = (width as i32 / 2, height as i32 / 2);
            let radius = f64::from(width.min(height)) * 0.35;
            let mut pie = Pie::new(&center, &radius, &sizes, &colors, &labels);
            pie.start_angle(-90.0);
            pie.label_style(("sans-serif", 18).into_font());
            pie.percentages(("sans-serif", 14).into_font());
            root.draw(&pie)?;
        } else {
            root.draw(&Text::new(
                "No data",
                (width as i32 / 2 - 30, height as i32 / 2),
                ("sans-serif", 20).into_font(),
            ))?;
        }
        root.present()?;
    }

    let buffer = std::fs::read(&path)?;
    std::fs::remove_file(&path)?;
    Ok(buffer)
}

/// Render a bar chart of the sentiment counts
pub fn render_bar_png(
    slices: &[ChartSlice],
    title: &str,
    width: u32,
    height: u32,
) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    let max_y = slices.iter().map(|s| s.value).fold(0.0_f64, f64::max);
    let max_y = if max_y > 0.0 { max_y * 1.1 } else { 1.0 };

    let path = scratch_path();
    {
        let root = BitMapBackend::new(&path, (width, height)).into_drawing_area();
        root.fill(&WHITE)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(title, ("sans-serif", 30).into_font())
            .margin(10)
            .x_label_area_size(30)
            .y_label_area_size(40)
            .build_cartesian_2d(0i32..slices.len() as i32, 0f64..max_y)?;

        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(slices.len())
            .x_label_formatter(&|x| {
                slices
                    .get(*x as usize)
                    .map(|s| s.label.clone())
                    .unwrap_or_default()
            })
            .y_desc("Reviews")
            .draw()?;

        chart.draw_series(slices.iter().enumerate().map(|(i, s)| {
            Rectangle::new([(i as i32, 0.0), (i as i32 + 1, s.value)], s.color.filled())
        }))?;

        root.present()?;
    }

    let buffer = std::fs::read(&path)?;
    std::fs::remove_file(&path)?;
    Ok(buffer)
}

/// Render a scatter plot of the cluster points, one color per cluster
pub fn render_scatter_png(
    series: &[ScatterSeries],
    title: &str,
    width: u32,
    height: u32,
) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    let points = series.iter().flat_map(|s| s.points.iter());
    let min_x = points.clone().map(|p| p.0).fold(f64::INFINITY, f64::min);
    let max_x = points.clone().map(|p| p.0).fold(f64::NEG_INFINITY, f64::max);
    let min_y = points.clone().map(|p| p.1).fold(f64::INFINITY, f64::min);
    let max_y = points.map(|p| p.1).fold(f64::NEG_INFINITY, f64::max);

    // Degenerate or empty ranges get a unit window so the mesh still draws
    let (min_x, max_x) = pad_range(min_x, max_x);
    let (min_y, max_y) = pad_range(min_y, max_y);

    let path = scratch_path();
    {
        let root = BitMapBackend::new(&path, (width, height)).into_drawing_area();
        root.fill(&WHITE)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(title, ("sans-serif", 30).into_font())
            .margin(10)
            .x_label_area_size(30)
            .y_label_area_size(40)
            .build_cartesian_2d(min_x..max_x, min_y..max_y)?;

        chart
            .configure_mesh()
            .x_desc("X Coordinate")
            .y_desc("Y Coordinate")
            .draw()?;

        for cluster in series {
            let color = cluster.color;
            chart
                .draw_series(
                    cluster
                        .points
                        .iter()
                        .map(|&(x, y)| Circle::new((x, y), 4, color.filled())),
                )?
                .label(cluster.label.clone())
                .legend(move |(x, y)| Circle::new((x, y), 4, color.filled()));
        }

        chart
            .configure_series_labels()
            .border_style(BLACK)
            .background_style(WHITE.mix(0.8))
            .draw()?;

        root.present()?;
    }

    let buffer = std::fs::read(&path)?;
    std::fs::remove_file(&path)?;
    Ok(buffer)
}

fn pad_range(min: f64, max: f64) -> (f64, f64) {
    if !min.is_finite() || !max.is_finite() {
        return (0.0, 1.0);
    }
    if min == max {
        return (min - 0.5, max + 0.5);
    }
    let pad = (max - min) * 0.05;
    (min - pad, max + pad)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::SentimentDataset;

    fn summary(data: Vec<f64>, percentages: Option<Vec<f64>>) -> SentimentSummary {
        SentimentSummary {
            labels: vec!["Positive".into(), "Neutral".into(), "Negative".into()],
            datasets: vec![SentimentDataset {
                data,
                percentages,
                background_color: None,
            }],
        }
    }

    #[test]
    fn text_rows_uses_server_percentages_when_present() {
        let rows = text_rows(&summary(
            vec![50.0, 30.0, 20.0],
            Some(vec![50.0, 30.0, 20.0]),
        ));
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].percentage, 50.0);
        assert_eq!(rows[2].label, "Negative");
    }

    #[test]
    fn text_rows_recomputes_missing_percentages() {
        let rows = text_rows(&summary(vec![3.0, 1.0, 0.0], None));
        assert_eq!(rows[0].percentage, 75.0);
        assert_eq!(rows[1].percentage, 25.0);
        assert_eq!(rows[2].percentage, 0.0);
    }

    #[test]
    fn text_rows_survive_zero_total_and_empty_summaries() {
        let rows = text_rows(&summary(vec![0.0, 0.0, 0.0], None));
        assert!(rows.iter().all(|r| r.percentage == 0.0));

        let empty = SentimentSummary {
            labels: vec![],
            datasets: vec![],
        };
        assert!(text_rows(&empty).is_empty());
    }

    #[test]
    fn chart_slices_truncate_ragged_input() {
        let mut s = summary(vec![10.0], None);
        s.labels = vec!["Positive".into(), "Neutral".into(), "Negative".into()];
        let slices = chart_slices(&s, ColorScheme::Classic);
        assert_eq!(slices.len(), 1);
        assert_eq!(slices[0].color, ColorScheme::Classic.rgb_colors()[0]);
    }

    #[test]
    fn scatter_series_shows_one_based_cluster_ids() {
        let mut points = BTreeMap::new();
        points.insert("0".to_string(), vec![(1.0, 2.0)]);
        points.insert("1".to_string(), vec![(3.0, 4.0), (5.0, 6.0)]);

        let series = scatter_series(&points, ColorScheme::Ocean);
        assert_eq!(series[0].label, "Cluster 1");
        assert_eq!(series[1].label, "Cluster 2");
        assert_eq!(series[1].points.len(), 2);
    }

    #[test]
    fn cluster_sections_keep_unparsable_ids_raw() {
        let mut samples = BTreeMap::new();
        samples.insert("noise".to_string(), vec!["odd one out".to_string()]);
        let sections = cluster_sections(&samples);
        assert_eq!(sections[0].0, "Cluster noise");
    }

    #[test]
    fn color_scheme_params_round_trip() {
        for scheme in ColorScheme::ALL {
            assert_eq!(ColorScheme::from_param(scheme.as_param()), Some(scheme));
        }
        assert_eq!(ColorScheme::from_param("neon"), None);
    }

    #[test]
    fn pad_range_handles_degenerate_windows() {
        assert_eq!(pad_range(f64::INFINITY, f64::NEG_INFINITY), (0.0, 1.0));
        assert_eq!(pad_range(2.0, 2.0), (1.5, 2.5));
    }
}
