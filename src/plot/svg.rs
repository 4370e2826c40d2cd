//! Self-contained SVG rendering of the draw-total distribution: one rect
//! per histogram bin, the fitted normal's density curve, and a dashed
//! vertical marker at the observed total.
//!
//! Output is deterministic for a given input: no timestamps, no ids, all
//! coordinates formatted to two decimals. Golden-file tests rely on this.

use std::fmt::Write as _;

use statrs::distribution::{Continuous, Normal};

use crate::stats::histogram::Histogram;
use crate::stats::summary::FitResult;

const WIDTH: f64 = 800.0;
const HEIGHT: f64 = 450.0;
const MARGIN_LEFT: f64 = 60.0;
const MARGIN_RIGHT: f64 = 20.0;
const MARGIN_TOP: f64 = 30.0;
const MARGIN_BOTTOM: f64 = 50.0;

const CURVE_POINTS: usize = 256;
const X_TICKS: usize = 6;

pub fn render_histogram_svg(
    samples: &[u64],
    fit: &FitResult,
    obs_total: u64,
    bins: usize,
    title: &str,
) -> String {
    if samples.is_empty() {
        return format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{WIDTH}" height="{HEIGHT}"></svg>"#
        );
    }

    let mut x_min = samples.iter().copied().min().unwrap_or(0) as f64;
    let mut x_max = samples.iter().copied().max().unwrap_or(0) as f64;
    if x_max <= x_min {
        x_min -= 0.5;
        x_max += 0.5;
    }

    let hist = Histogram::over_range(samples, bins, x_min, x_max);
    let n = samples.len();

    let inner_w = WIDTH - MARGIN_LEFT - MARGIN_RIGHT;
    let inner_h = HEIGHT - MARGIN_TOP - MARGIN_BOTTOM;
    let bottom_y = MARGIN_TOP + inner_h;

    let normal = Normal::new(fit.mu, fit.sigma_mle).ok();
    let pdf_peak = normal.as_ref().map_or(0.0, |dist| dist.pdf(fit.mu));
    let y_max = hist.max_density(n).max(pdf_peak).max(f64::MIN_POSITIVE);

    let sx = |x: f64| MARGIN_LEFT + (x - x_min) * (inner_w / (x_max - x_min).max(1e-9));
    let sy = |y: f64| MARGIN_TOP + inner_h - y * (inner_h / y_max);

    let mut svg = String::with_capacity(16 * 1024);
    let _ = writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{WIDTH}" height="{HEIGHT}">"#
    );
    let _ = writeln!(
        svg,
        r#"  <rect x="0" y="0" width="{WIDTH}" height="{HEIGHT}" fill="white"/>"#
    );

    // Axes, labels, title.
    let mid_w = MARGIN_LEFT + inner_w / 2.0;
    let mid_h = MARGIN_TOP + inner_h / 2.0;
    let _ = writeln!(
        svg,
        r#"  <line x1="{MARGIN_LEFT}" y1="{bottom_y}" x2="{:.2}" y2="{bottom_y}" stroke="black"/>"#,
        MARGIN_LEFT + inner_w
    );
    let _ = writeln!(
        svg,
        r#"  <line x1="{MARGIN_LEFT}" y1="{MARGIN_TOP}" x2="{MARGIN_LEFT}" y2="{bottom_y}" stroke="black"/>"#
    );
    let _ = writeln!(
        svg,
        r#"  <text x="{mid_w:.2}" y="{:.2}" text-anchor="middle" font-size="12">Total draws</text>"#,
        HEIGHT - 8.0
    );
    let _ = writeln!(
        svg,
        r#"  <text x="16" y="{mid_h:.2}" transform="rotate(-90 16,{mid_h:.2})" font-size="12">Density</text>"#
    );
    let _ = writeln!(
        svg,
        r#"  <text x="{:.2}" y="20" text-anchor="middle" font-size="16">{}</text>"#,
        WIDTH / 2.0,
        escape_text(title)
    );

    // Histogram bars, one rect per bin so bars are countable downstream.
    for bin in 0..hist.bins() {
        let density = hist.density(bin, n);
        let left = x_min + bin as f64 * hist.bin_width;
        let right = x_min + (bin + 1) as f64 * hist.bin_width;
        let x = sx(left);
        let w = (sx(right) - x).max(0.0);
        let y = sy(density);
        let h = (bottom_y - y).max(0.0);
        let _ = writeln!(
            svg,
            r#"  <rect class="bar" x="{x:.2}" y="{y:.2}" width="{w:.2}" height="{h:.2}" fill="black" opacity="0.14" stroke="none"/>"#
        );
    }

    // Fitted normal density curve.
    if let Some(dist) = normal {
        let mut path = String::with_capacity(CURVE_POINTS * 16);
        for point in 0..=CURVE_POINTS {
            let x = x_min + (x_max - x_min) * point as f64 / CURVE_POINTS as f64;
            let y = dist.pdf(x);
            let command = if point == 0 { 'M' } else { 'L' };
            let _ = write!(path, "{command} {:.2} {:.2} ", sx(x), sy(y));
        }
        let _ = writeln!(
            svg,
            r##"  <path class="fit" d="{}" fill="none" stroke="#1565c0" stroke-width="2"/>"##,
            path.trim_end()
        );
    }

    // Observation marker, clamped into the plotted domain.
    let obs_x = sx((obs_total as f64).clamp(x_min, x_max));
    let _ = writeln!(
        svg,
        r##"  <line class="obs" x1="{obs_x:.2}" y1="{MARGIN_TOP}" x2="{obs_x:.2}" y2="{bottom_y}" stroke="#c62828" stroke-dasharray="6 4" stroke-width="2"/>"##
    );

    // X ticks.
    for tick in 0..X_TICKS {
        let value = x_min + (x_max - x_min) * tick as f64 / (X_TICKS - 1) as f64;
        let tick_x = sx(value);
        let _ = writeln!(
            svg,
            r#"  <line x1="{tick_x:.2}" y1="{bottom_y}" x2="{tick_x:.2}" y2="{:.2}" stroke="black"/>"#,
            bottom_y + 6.0
        );
        let _ = writeln!(
            svg,
            r#"  <text x="{tick_x:.2}" y="{:.2}" text-anchor="middle" font-size="11">{}</text>"#,
            bottom_y + 22.0,
            value.round() as i64
        );
    }

    svg.push_str("</svg>\n");
    svg
}

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::summary::fit_normal;

    fn sample_set() -> Vec<u64> {
        (0..400u64).map(|i| 700 + (i * 7919) % 211).collect()
    }

    #[test]
    fn renders_one_rect_per_bin() {
        let samples = sample_set();
        let fit = fit_normal(&samples).unwrap();
        let svg = render_histogram_svg(&samples, &fit, 888, 128, "distribution");
        assert_eq!(svg.matches(r#"<rect class="bar""#).count(), 128);
        assert_eq!(svg.matches(r#"class="fit""#).count(), 1);
        assert_eq!(svg.matches(r#"class="obs""#).count(), 1);
    }

    #[test]
    fn output_is_byte_identical_across_calls() {
        let samples = sample_set();
        let fit = fit_normal(&samples).unwrap();
        let a = render_histogram_svg(&samples, &fit, 888, 64, "t");
        let b = render_histogram_svg(&samples, &fit, 64, 64, "t");
        let c = render_histogram_svg(&samples, &fit, 888, 64, "t");
        assert_eq!(a, c);
        assert_ne!(a, b);
    }

    #[test]
    fn empty_samples_render_an_empty_canvas() {
        let fit = FitResult {
            mu: 0.0,
            sigma_mle: 1.0,
            sigma_sample: 1.0,
            ks_distance: 0.0,
        };
        let svg = render_histogram_svg(&[], &fit, 1, 10, "t");
        assert!(svg.starts_with("<svg"));
        assert!(!svg.contains("rect class"));
    }

    #[test]
    fn title_is_escaped() {
        let samples = sample_set();
        let fit = fit_normal(&samples).unwrap();
        let svg = render_histogram_svg(&samples, &fit, 888, 8, "a < b & c");
        assert!(svg.contains("a &lt; b &amp; c"));
    }

    #[test]
    fn obs_marker_is_clamped_into_domain() {
        let samples = vec![10u64, 11, 12, 13, 14, 15, 16, 17, 18, 20];
        let fit = fit_normal(&samples).unwrap();
        let svg = render_histogram_svg(&samples, &fit, 9999, 5, "t");
        // Marker x equals the right edge of the plot area.
        assert!(svg.contains(r#"class="obs" x1="780.00""#));
    }
}
