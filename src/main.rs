use std::time::Duration;

use anyhow::{Context, Result};

use inkframe_calendar::CalendarClient;
use inkframe_core::{Settings, WeatherProviderKind};
use inkframe_render::{
    ChromiumScreenshotter, Generator, ImageMagickRotator, NoopRotator, RenderOptions, Rotator,
};
use inkframe_weather::{EntityStateClient, OpenWeatherClient, WeatherCache, WeatherSource};

#[tokio::main]
async fn main() -> Result<()> {
    inkframe_core::init()?;

    let settings = Settings::load_validated().context("Invalid configuration")?;
    let tz = settings.tz()?;

    let weather: Box<dyn WeatherSource> = match settings.weather_provider {
        WeatherProviderKind::OpenWeather => Box::new(OpenWeatherClient::new(
            &settings.openweather_api_key,
            settings.latitude,
            settings.longitude,
            tz,
        )?),
        WeatherProviderKind::HomeAssistant => Box::new(EntityStateClient::new(
            &settings.base_url,
            &settings.token,
            &settings.weather_entity,
            tz,
        )?),
    };

    let cache_ttl = Duration::from_secs(settings.weather_cache_secs);
    let cache = match &settings.cache_dir {
        Some(dir) => WeatherCache::file(dir, cache_ttl),
        None => WeatherCache::memory(cache_ttl),
    };

    let calendar = CalendarClient::new(&settings.base_url, &settings.token, tz)?;

    let rotator: Box<dyn Rotator> = if settings.render_rotate % 360 == 0 {
        Box::new(NoopRotator)
    } else {
        Box::new(ImageMagickRotator::default())
    };

    let generator = Generator::new(
        tz,
        settings.calendar_ids(),
        RenderOptions {
            width: settings.render_width,
            height: settings.render_height,
            rotate: settings.render_rotate,
            output_path: settings.output_path.clone(),
            weeks: 4,
        },
        weather,
        cache,
        calendar,
        Box::new(ChromiumScreenshotter::default()),
        rotator,
    )?;

    tracing::info!(
        "inkframe started; rendering every {}s to {}",
        settings.interval_secs,
        settings.output_path.display()
    );

    // Cycles never overlap: the next tick waits for the current cycle.
    let mut ticker = tokio::time::interval(Duration::from_secs(settings.interval_secs));
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        if let Err(e) = generator.run_cycle().await {
            tracing::error!("render cycle failed: {e}");
        }
    }
}
