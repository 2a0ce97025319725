//! Tera-backed dashboard template.

use inkframe_calendar::EventsByDay;
use inkframe_weather::Weather;
use tera::{Context, Tera};

use crate::dates::DateCount;
use crate::error::RenderError;

const DASHBOARD_TEMPLATE: &str = include_str!("../assets/dashboard.html");
const STYLESHEET: &str = include_str!("../assets/style.css");

/// Compiles the embedded dashboard template once and renders it per cycle.
pub struct TemplateEngine {
    tera: Tera,
}

impl TemplateEngine {
    pub fn new() -> Result<Self, RenderError> {
        let mut tera = Tera::default();
        tera.add_raw_template("dashboard.html", DASHBOARD_TEMPLATE)?;
        Ok(Self { tera })
    }

    /// Render the dashboard body markup.
    pub fn render_dashboard(
        &self,
        weather: &Weather,
        dates_with_events: &[DateCount],
        events: &EventsByDay,
        hourly_svg: Option<&str>,
    ) -> Result<String, RenderError> {
        let mut ctx = Context::new();
        ctx.insert("weather", weather);
        ctx.insert("dates_with_events", dates_with_events);
        ctx.insert("events", events);
        // empty string is falsy in the template's if
        ctx.insert("hourly_svg", hourly_svg.unwrap_or_default());

        Ok(self.tera.render("dashboard.html", &ctx)?)
    }

    /// The stylesheet handed to the screenshot renderer.
    pub fn stylesheet(&self) -> &'static str {
        STYLESHEET
    }
}
