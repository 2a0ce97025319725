//! Render orchestration: fetch, template, screenshot, rotate, publish.
//!
//! The cycle is stateless between invocations apart from the weather cache.
//! Publishing is write-temp-then-rename, so readers of the output path never
//! observe a partial image; a failed cycle leaves the previous image alone.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use chrono_tz::Tz;
use tokio::process::Command;
use tracing::{info, instrument};

use inkframe_calendar::CalendarClient;
use inkframe_weather::{fetch_cached, WeatherCache, WeatherSource};

use crate::chart;
use crate::dates::{calendar_dates, dates_with_events};
use crate::error::RenderError;
use crate::template::TemplateEngine;

/// Headless-browser screenshot renderer seam.
#[async_trait]
pub trait Screenshotter: Send + Sync {
    /// Render `html` + `css` at `width` x `height` into a raster image at
    /// `out`.
    async fn capture(
        &self,
        html: &str,
        css: &str,
        width: u32,
        height: u32,
        out: &Path,
    ) -> Result<(), RenderError>;
}

/// Raster post-processing seam.
#[async_trait]
pub trait Rotator: Send + Sync {
    /// Rotate the image at `path` counter-clockwise by `degrees`, expanding
    /// the canvas.
    async fn rotate(&self, path: &Path, degrees: u32) -> Result<(), RenderError>;
}

/// Screenshots via a headless Chromium binary.
#[derive(Debug, Clone)]
pub struct ChromiumScreenshotter {
    binary: PathBuf,
}

impl ChromiumScreenshotter {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl Default for ChromiumScreenshotter {
    fn default() -> Self {
        Self::new("chromium")
    }
}

#[async_trait]
impl Screenshotter for ChromiumScreenshotter {
    async fn capture(
        &self,
        html: &str,
        css: &str,
        width: u32,
        height: u32,
        out: &Path,
    ) -> Result<(), RenderError> {
        let page = out.with_extension("page.html");
        let doc = format!(
            "<!DOCTYPE html><html><head><meta charset=\"utf-8\"><style>{css}</style></head><body>{html}</body></html>"
        );
        tokio::fs::write(&page, doc).await?;

        let status = Command::new(&self.binary)
            .arg("--headless")
            .arg("--hide-scrollbars")
            .arg("--no-sandbox")
            .arg("--no-first-run")
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--virtual-time-budget=10000")
            .arg(format!("--window-size={width},{height}"))
            .arg(format!("--screenshot={}", out.display()))
            .arg(format!("file://{}", page.display()))
            .status()
            .await?;

        let _ = tokio::fs::remove_file(&page).await;

        if status.success() {
            Ok(())
        } else {
            Err(RenderError::Screenshot(format!(
                "{} exited with {status}",
                self.binary.display()
            )))
        }
    }
}

/// Rotates in place via the ImageMagick CLI.
#[derive(Debug, Clone)]
pub struct ImageMagickRotator {
    binary: PathBuf,
}

impl ImageMagickRotator {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl Default for ImageMagickRotator {
    fn default() -> Self {
        Self::new("convert")
    }
}

#[async_trait]
impl Rotator for ImageMagickRotator {
    async fn rotate(&self, path: &Path, degrees: u32) -> Result<(), RenderError> {
        if degrees % 360 == 0 {
            return Ok(());
        }
        // counter-clockwise display convention; ImageMagick rotates clockwise
        let clockwise = (360 - degrees % 360) % 360;
        let status = Command::new(&self.binary)
            .arg(path)
            .arg("-background")
            .arg("none")
            .arg("-rotate")
            .arg(clockwise.to_string())
            .arg(path)
            .status()
            .await?;

        if status.success() {
            Ok(())
        } else {
            Err(RenderError::Screenshot(format!(
                "{} exited with {status}",
                self.binary.display()
            )))
        }
    }
}

/// Not every deployment rotates; 0-degree setups skip the dependency on an
/// image tool entirely.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopRotator;

#[async_trait]
impl Rotator for NoopRotator {
    async fn rotate(&self, _path: &Path, _degrees: u32) -> Result<(), RenderError> {
        Ok(())
    }
}

/// Output geometry and destination for the rendered image.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub width: u32,
    pub height: u32,
    /// Counter-clockwise degrees; 0 disables rotation.
    pub rotate: u32,
    pub output_path: PathBuf,
    pub weeks: u32,
}

/// Drives one full render cycle.
pub struct Generator {
    tz: Tz,
    calendar_ids: Vec<String>,
    options: RenderOptions,
    engine: TemplateEngine,
    weather: Box<dyn WeatherSource>,
    cache: WeatherCache,
    calendar: CalendarClient,
    screenshotter: Box<dyn Screenshotter>,
    rotator: Box<dyn Rotator>,
}

impl Generator {
    pub fn new(
        tz: Tz,
        calendar_ids: Vec<String>,
        options: RenderOptions,
        weather: Box<dyn WeatherSource>,
        cache: WeatherCache,
        calendar: CalendarClient,
        screenshotter: Box<dyn Screenshotter>,
        rotator: Box<dyn Rotator>,
    ) -> Result<Self, RenderError> {
        Ok(Self {
            tz,
            calendar_ids,
            options,
            engine: TemplateEngine::new()?,
            weather,
            cache,
            calendar,
            screenshotter,
            rotator,
        })
    }

    /// One render cycle: grid, concurrent fetches, annotate, template,
    /// screenshot, rotate, publish.
    #[instrument(skip(self), level = "info")]
    pub async fn run_cycle(&self) -> Result<(), RenderError> {
        let today = Utc::now().with_timezone(&self.tz).date_naive();
        let (dates, end) = calendar_dates(today, self.options.weeks);

        let (weather, events) = tokio::try_join!(
            async {
                fetch_cached(self.weather.as_ref(), &self.cache)
                    .await
                    .map_err(RenderError::from)
            },
            async {
                self.calendar
                    .fetch_events(&self.calendar_ids, today, end)
                    .await
                    .map_err(RenderError::from)
            }
        )?;

        let annotated = dates_with_events(&dates, &events, today);
        let svg = chart::hourly_svg(&weather.hourly, 400, 80, 20);
        let html = self
            .engine
            .render_dashboard(&weather, &annotated, &events, svg.as_deref())?;

        self.publish(&html).await
    }

    async fn publish(&self, html: &str) -> Result<(), RenderError> {
        let out = &self.options.output_path;
        let temp = temp_path(out);

        self.screenshotter
            .capture(
                html,
                self.engine.stylesheet(),
                self.options.width,
                self.options.height,
                &temp,
            )
            .await?;

        if self.options.rotate % 360 != 0 {
            self.rotator.rotate(&temp, self.options.rotate).await?;
        }

        tokio::fs::rename(&temp, out).await?;
        info!("published dashboard image to {}", out.display());
        Ok(())
    }
}

/// Sibling temporary path: `output.png` -> `output.tmp.png`.
fn temp_path(out: &Path) -> PathBuf {
    match out.extension().and_then(|e| e.to_str()) {
        Some(ext) => out.with_extension(format!("tmp.{ext}")),
        None => out.with_extension("tmp"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use inkframe_weather::{Weather, WeatherError};
    use wiremock::matchers::{method, path as url_path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn tz() -> Tz {
        chrono_tz::America::New_York
    }

    #[test]
    fn temp_path_keeps_the_extension() {
        assert_eq!(
            temp_path(Path::new("/tmp/output.png")),
            Path::new("/tmp/output.tmp.png")
        );
        assert_eq!(temp_path(Path::new("/tmp/output")), Path::new("/tmp/output.tmp"));
    }

    struct FakeWeather {
        fail: bool,
    }

    #[async_trait]
    impl WeatherSource for FakeWeather {
        async fn fetch(&self) -> Result<Weather, WeatherError> {
            if self.fail {
                return Err(WeatherError::MissingField("daily forecast"));
            }
            Ok(Weather {
                temperature: 61,
                high_temp: 70,
                low_temp: 50,
                condition: "Clear".to_string(),
                weather_class: "wi wi-day-sunny".to_string(),
                forecasts: Vec::new(),
                hourly: Vec::new(),
            })
        }

        fn cache_key(&self) -> String {
            "fake".to_string()
        }
    }

    struct FakeScreenshotter;

    #[async_trait]
    impl Screenshotter for FakeScreenshotter {
        async fn capture(
            &self,
            html: &str,
            _css: &str,
            _width: u32,
            _height: u32,
            out: &Path,
        ) -> Result<(), RenderError> {
            assert!(html.contains("dashboard"));
            tokio::fs::write(out, b"raster").await?;
            Ok(())
        }
    }

    struct CountingRotator {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Rotator for CountingRotator {
        async fn rotate(&self, path: &Path, _degrees: u32) -> Result<(), RenderError> {
            assert!(path.exists(), "rotation must happen before the rename");
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    async fn generator_for(
        server: &MockServer,
        out: PathBuf,
        rotate: u32,
        fail_weather: bool,
        rotations: Arc<AtomicUsize>,
    ) -> Generator {
        Mock::given(method("GET"))
            .and(url_path("/api/calendars/calendar.family"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .mount(server)
            .await;

        Generator::new(
            tz(),
            vec!["family".to_string()],
            RenderOptions {
                width: 820,
                height: 1200,
                rotate,
                output_path: out,
                weeks: 4,
            },
            Box::new(FakeWeather { fail: fail_weather }),
            WeatherCache::memory(Duration::from_secs(600)),
            CalendarClient::new(&server.uri(), "secret", tz()).unwrap(),
            Box::new(FakeScreenshotter),
            Box::new(CountingRotator { calls: rotations }),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn cycle_publishes_atomically() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("dashboard.png");
        let rotations = Arc::new(AtomicUsize::new(0));

        let generator =
            generator_for(&server, out.clone(), 0, false, rotations.clone()).await;
        generator.run_cycle().await.unwrap();

        assert_eq!(std::fs::read(&out).unwrap(), b"raster");
        assert!(!temp_path(&out).exists(), "temp file must be gone after publish");
        assert_eq!(rotations.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn rotation_runs_before_the_rename() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("dashboard.png");
        let rotations = Arc::new(AtomicUsize::new(0));

        let generator =
            generator_for(&server, out.clone(), 270, false, rotations.clone()).await;
        generator.run_cycle().await.unwrap();

        assert_eq!(rotations.load(Ordering::SeqCst), 1);
        assert!(out.exists());
    }

    #[tokio::test]
    async fn failed_fetch_leaves_the_previous_image_in_place() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("dashboard.png");
        std::fs::write(&out, b"previous").unwrap();
        let rotations = Arc::new(AtomicUsize::new(0));

        let generator = generator_for(&server, out.clone(), 0, true, rotations).await;
        assert!(generator.run_cycle().await.is_err());

        assert_eq!(std::fs::read(&out).unwrap(), b"previous");
    }
}
