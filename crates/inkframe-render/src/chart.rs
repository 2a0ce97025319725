//! Compact SVG sparkline of the next 24 hours of temperature.

use inkframe_weather::HourlyForecast;

const HOURS_SHOWN: usize = 24;

/// Render hourly temperatures as an inline SVG polyline with min/max and
/// first/middle/last hour labels. Returns `None` when there are fewer than
/// two points to draw a line through.
pub fn hourly_svg(
    forecasts: &[HourlyForecast],
    width: u32,
    height: u32,
    padding: u32,
) -> Option<String> {
    let forecasts = &forecasts[..forecasts.len().min(HOURS_SHOWN)];
    if forecasts.len() < 2 {
        return None;
    }

    let width = f64::from(width);
    let height = f64::from(height);
    let padding = f64::from(padding);

    let min_temp = forecasts.iter().map(|f| f.temp).min()?;
    let max_temp = forecasts.iter().map(|f| f.temp).max()?;

    let start_time = forecasts.first()?.date;
    let end_time = forecasts.last()?.date;
    let span_secs = (end_time - start_time).num_seconds();
    if span_secs <= 0 {
        return None;
    }

    let x_scale = (width - padding * 1.5) / span_secs as f64;
    // flat temperature run still draws a (horizontal) line
    let temp_range = f64::from((max_temp - min_temp).max(1));
    let y_scale = (height - padding * 1.5) / temp_range;

    let points: Vec<String> = forecasts
        .iter()
        .map(|f| {
            let x = padding * 1.5 + (f.date - start_time).num_seconds() as f64 * x_scale;
            let y = height - padding - f64::from(f.temp - min_temp) * y_scale;
            format!("{x:.1},{y:.1}")
        })
        .collect();

    let mid = forecasts.len() / 2;
    let labels = [
        (hour_label(&forecasts[0]), 30.0, height, ""),
        (hour_label(&forecasts[mid]), (width - 20.0) / 2.0, height, ""),
        (hour_label(&forecasts[forecasts.len() - 1]), width, height, r#" text-anchor="end""#),
    ];

    let mut svg = format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}">"#
    );
    svg.push_str(&format!(
        r#"<polyline points="{}" stroke="black" stroke-width="5" fill="none"/>"#,
        points.join(" ")
    ));
    svg.push_str(&format!(
        r#"<text font-size="20" x="0" y="{}">{}&#176;</text>"#,
        height - 20.0,
        min_temp
    ));
    svg.push_str(&format!(
        r#"<text font-size="20" x="0" y="20">{max_temp}&#176;</text>"#
    ));
    for (text, x, y, anchor) in labels {
        svg.push_str(&format!(
            r#"<text font-size="20" x="{x}" y="{y}"{anchor}>{text}</text>"#
        ));
    }
    svg.push_str("</svg>");
    Some(svg)
}

/// "3PM"-style hour label.
fn hour_label(forecast: &HourlyForecast) -> String {
    format!(
        "{}{}",
        forecast.date.format("%l").to_string().trim_start(),
        forecast.date.format("%p")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    fn hourly(rfc3339: &str, temp: i32) -> HourlyForecast {
        HourlyForecast {
            date: DateTime::parse_from_rfc3339(rfc3339).unwrap(),
            temp,
            condition: "Clear".to_string(),
            weather_class: "wi wi-day-sunny".to_string(),
        }
    }

    fn sample(count: usize) -> Vec<HourlyForecast> {
        (0..count)
            .map(|i| {
                hourly(
                    &format!("2024-06-03T{:02}:00:00-04:00", i % 24),
                    50 + (i as i32 % 10),
                )
            })
            .collect()
    }

    #[test]
    fn draws_a_polyline_with_labels() {
        let svg = hourly_svg(&sample(24), 400, 80, 20).unwrap();
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains("<polyline"));
        assert!(svg.contains("12AM"));
        assert!(svg.contains("59&#176;"));
        assert!(svg.contains("50&#176;"));
    }

    #[test]
    fn too_few_points_yields_none() {
        assert!(hourly_svg(&[], 400, 80, 20).is_none());
        assert!(hourly_svg(&sample(1), 400, 80, 20).is_none());
    }

    #[test]
    fn flat_temperatures_still_render() {
        let flat = vec![
            hourly("2024-06-03T00:00:00-04:00", 60),
            hourly("2024-06-03T01:00:00-04:00", 60),
        ];
        let svg = hourly_svg(&flat, 400, 80, 20).unwrap();
        assert!(svg.contains("<polyline"));
    }

    #[test]
    fn only_first_24_hours_are_drawn() {
        let mut long = sample(24);
        long.push(hourly("2024-06-04T00:00:00-04:00", 200));
        let svg = hourly_svg(&long, 400, 80, 20).unwrap();
        // the 25th point's temperature must not become the max label
        assert!(svg.contains("59&#176;"));
        assert!(!svg.contains("200&#176;"));
    }
}
