use image::{ImageOutputFormat, RgbImage};
use plotters::prelude::*;
use std::f64::consts::PI;
use std::io::Cursor;

use crate::error::{FleetError, Result};
use crate::summary::{ChartSlice, PriorityBuckets};

/// Bar colours for priority levels 1, 2 and 3
pub const PRIORITY_COLORS: [&str; 3] = ["#FF4D4F", "#FFD24D", "#34D399"];

/// Size options for chart generation
///
/// Charts carry no text; titles and legends are part of the page around them.
#[derive(Clone, Debug)]
pub struct GraphOptions {
    /// Width of the image in pixels
    pub width: u32,

    /// Height of the image in pixels
    pub height: u32,
}

impl Default for GraphOptions {
    fn default() -> Self {
        Self {
            width: 480,
            height: 320,
        }
    }
}

/// Parse a `#RRGGBB` colour, falling back to grey
pub fn parse_hex_color(hex: &str) -> RGBColor {
    let digits = hex.trim_start_matches('#');
    let channel = |i: usize| {
        digits
            .get(i..i + 2)
            .and_then(|s| u8::from_str_radix(s, 16).ok())
    };
    match (digits.len(), channel(0), channel(2), channel(4)) {
        (6, Some(r), Some(g), Some(b)) => RGBColor(r, g, b),
        _ => RGBColor(0x88, 0x88, 0x88),
    }
}

fn chart_error<E: std::fmt::Display>(e: E) -> FleetError {
    FleetError::Chart(e.to_string())
}

/// Render an RGB buffer drawn by `draw` into PNG bytes
fn render_png<F>(options: &GraphOptions, draw: F) -> Result<Vec<u8>>
where
    F: FnOnce(&DrawingArea<BitMapBackend<'_>, plotters::coord::Shift>) -> Result<()>,
{
    let mut buffer = vec![0u8; options.width as usize * options.height as usize * 3];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (options.width, options.height))
            .into_drawing_area();
        root.fill(&WHITE).map_err(chart_error)?;
        draw(&root)?;
        root.present().map_err(chart_error)?;
    }

    let image = RgbImage::from_raw(options.width, options.height, buffer)
        .ok_or_else(|| FleetError::Chart("bitmap buffer size mismatch".to_string()))?;
    let mut png = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut png), ImageOutputFormat::Png)
        .map_err(chart_error)?;
    Ok(png)
}

/// Pie chart of the status distribution, one wedge per slice
///
/// An empty distribution renders a plain grey disc.
pub fn create_status_pie(slices: &[ChartSlice], options: &GraphOptions) -> Result<Vec<u8>> {
    render_png(options, |root| {
        let (w, h) = root.dim_in_pixel();
        let center = (w as i32 / 2, h as i32 / 2);
        let radius = (w.min(h) as f64 / 2.0) - 10.0;
        let total: usize = slices.iter().map(|s| s.count).sum();

        if total == 0 {
            root.draw(&Circle::new(center, radius as i32, RGBColor(0xDD, 0xDD, 0xDD).filled()))
                .map_err(chart_error)?;
            return Ok(());
        }

        let mut start = -PI / 2.0;
        for slice in slices.iter().filter(|s| s.count > 0) {
            let sweep = 2.0 * PI * slice.count as f64 / total as f64;
            let steps = ((sweep.to_degrees()).ceil() as usize).max(2);
            let mut points = Vec::with_capacity(steps + 2);
            points.push(center);
            for step in 0..=steps {
                let angle = start + sweep * step as f64 / steps as f64;
                points.push((
                    center.0 + (radius * angle.cos()).round() as i32,
                    center.1 + (radius * angle.sin()).round() as i32,
                ));
            }
            root.draw(&Polygon::new(points, parse_hex_color(slice.color).filled()))
                .map_err(chart_error)?;
            start += sweep;
        }
        Ok(())
    })
}

/// Bar chart of the three priority buckets, bars scaled to the largest
pub fn create_priority_bars(buckets: &PriorityBuckets, options: &GraphOptions) -> Result<Vec<u8>> {
    render_png(options, |root| {
        let (w, h) = root.dim_in_pixel();
        let (w, h) = (w as i32, h as i32);
        let margin = 20;
        let baseline = h - margin;
        let slot = (w - 2 * margin) / PRIORITY_COLORS.len() as i32;
        let max = buckets.iter().map(|b| b.count).max().unwrap_or(0).max(1);

        root.draw(&PathElement::new(
            vec![(margin, baseline), (w - margin, baseline)],
            BLACK.stroke_width(2),
        ))
        .map_err(chart_error)?;

        for (i, bucket) in buckets.iter().enumerate() {
            let height = ((baseline - margin) as f64 * bucket.count as f64 / max as f64) as i32;
            let left = margin + slot * i as i32 + slot / 6;
            let right = margin + slot * (i as i32 + 1) - slot / 6;
            root.draw(&Rectangle::new(
                [(left, baseline - height), (right, baseline)],
                parse_hex_color(PRIORITY_COLORS[i]).filled(),
            ))
            .map_err(chart_error)?;
        }
        Ok(())
    })
}
