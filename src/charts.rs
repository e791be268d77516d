//! Chart rendering.
//!
//! Renders the daily trend line and the hourly distribution as PNG byte
//! buffers for inline embedding in the report artifact. Rendering is fully
//! in-memory and deterministic for a given input series. The images carry no
//! text; captions live in the surrounding HTML, which keeps rendering
//! independent of system font availability.

use plotters::prelude::*;

use crate::parser::{DailyBucket, HourlyBucket};

const WIDTH: u32 = 720;
const HEIGHT: u32 = 360;

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("cannot render a chart from an empty series")]
    EmptySeries,
    #[error("chart backend failure: {0}")]
    Backend(String),
}

impl RenderError {
    pub fn classification(&self) -> &'static str {
        "render"
    }
}

fn backend_err<E: std::fmt::Display>(err: E) -> RenderError {
    RenderError::Backend(err.to_string())
}

/// Line chart of total and answered call volume across the daily buckets.
pub fn render_trend(daily: &[DailyBucket]) -> Result<Vec<u8>, RenderError> {
    if daily.is_empty() {
        return Err(RenderError::EmptySeries);
    }

    let x_max = daily.len().saturating_sub(1).max(1);
    let y_max = daily.iter().map(|d| d.total).max().unwrap_or(0).max(1);
    let mut rgb = vec![0u8; (WIDTH * HEIGHT * 3) as usize];
    {
        let root = BitMapBackend::with_buffer(&mut rgb, (WIDTH, HEIGHT)).into_drawing_area();
        root.fill(&WHITE).map_err(backend_err)?;

        let mut chart = ChartBuilder::on(&root)
            .margin(16)
            .build_cartesian_2d(0usize..x_max, 0u64..y_max + 1)
            .map_err(backend_err)?;

        chart
            .configure_mesh()
            .light_line_style(&WHITE)
            .draw()
            .map_err(backend_err)?;

        chart
            .draw_series(AreaSeries::new(
                daily.iter().enumerate().map(|(i, d)| (i, d.total)),
                0,
                BLUE.mix(0.15),
            ))
            .map_err(backend_err)?;
        chart
            .draw_series(LineSeries::new(
                daily.iter().enumerate().map(|(i, d)| (i, d.total)),
                BLUE.stroke_width(2),
            ))
            .map_err(backend_err)?;
        chart
            .draw_series(LineSeries::new(
                daily.iter().enumerate().map(|(i, d)| (i, d.answered)),
                GREEN.stroke_width(2),
            ))
            .map_err(backend_err)?;

        root.present().map_err(backend_err)?;
    }

    encode_png(&rgb)
}

/// Bar chart of call volume per hour of day.
pub fn render_hourly(hourly: &[HourlyBucket]) -> Result<Vec<u8>, RenderError> {
    if hourly.is_empty() {
        return Err(RenderError::EmptySeries);
    }

    let y_max = hourly.iter().map(|h| h.total).max().unwrap_or(0).max(1);
    let mut rgb = vec![0u8; (WIDTH * HEIGHT * 3) as usize];
    {
        let root = BitMapBackend::with_buffer(&mut rgb, (WIDTH, HEIGHT)).into_drawing_area();
        root.fill(&WHITE).map_err(backend_err)?;

        let mut chart = ChartBuilder::on(&root)
            .margin(16)
            .build_cartesian_2d((0u32..24u32).into_segmented(), 0u64..y_max + 1)
            .map_err(backend_err)?;

        chart
            .configure_mesh()
            .light_line_style(&WHITE)
            .draw()
            .map_err(backend_err)?;

        chart
            .draw_series(
                Histogram::vertical(&chart)
                    .style(BLUE.mix(0.7).filled())
                    .margin(2)
                    .data(hourly.iter().map(|h| (h.hour as u32, h.total))),
            )
            .map_err(backend_err)?;

        root.present().map_err(backend_err)?;
    }

    encode_png(&rgb)
}

fn encode_png(rgb: &[u8]) -> Result<Vec<u8>, RenderError> {
    use image::{ExtendedColorType, ImageEncoder, codecs::png::PngEncoder};

    let mut png = Vec::new();
    PngEncoder::new(&mut png)
        .write_image(rgb, WIDTH, HEIGHT, ExtendedColorType::Rgb8)
        .map_err(backend_err)?;
    Ok(png)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_MAGIC: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];

    fn sample_daily() -> Vec<DailyBucket> {
        (0..7)
            .map(|i| DailyBucket {
                period: format!("2024-01-{:02}", i + 8),
                total: 40 + i * 5,
                answered: 35 + i * 4,
                abandoned: 5 + i,
            })
            .collect()
    }

    #[test]
    fn trend_produces_png_bytes() {
        let png = render_trend(&sample_daily()).unwrap();
        assert_eq!(&png[..8], &PNG_MAGIC);
    }

    #[test]
    fn empty_series_is_rejected() {
        assert!(matches!(render_trend(&[]), Err(RenderError::EmptySeries)));
        assert!(matches!(render_hourly(&[]), Err(RenderError::EmptySeries)));
    }

    #[test]
    fn rendering_is_deterministic() {
        let daily = sample_daily();
        assert_eq!(render_trend(&daily).unwrap(), render_trend(&daily).unwrap());
    }

    #[test]
    fn hourly_produces_png_bytes() {
        let hourly: Vec<HourlyBucket> = (8..18)
            .map(|h| HourlyBucket {
                hour: h,
                total: (h as u64) * 3,
                answered: (h as u64) * 2,
                abandoned: h as u64,
                avg_duration_secs: 120,
            })
            .collect();
        let png = render_hourly(&hourly).unwrap();
        assert_eq!(&png[..8], &PNG_MAGIC);
    }

    #[test]
    fn single_point_series_renders() {
        let one = vec![DailyBucket {
            period: "2024-01-15".to_string(),
            total: 10,
            answered: 9,
            abandoned: 1,
        }];
        assert!(render_trend(&one).is_ok());
    }
}
