//! Dashboard rendering: date grid, HTML templating, screenshotting, and
//! atomic image publishing.

pub mod chart;
pub mod dates;
pub mod error;
pub mod generate;
pub mod template;

pub use dates::{calendar_dates, dates_with_events, DateCount};
pub use error::RenderError;
pub use generate::{
    ChromiumScreenshotter, Generator, ImageMagickRotator, NoopRotator, RenderOptions, Rotator,
    Screenshotter,
};
pub use template::TemplateEngine;
