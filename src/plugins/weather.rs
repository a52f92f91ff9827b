//! Spoken forecasts from api.weather.gov.

use reqwest::blocking::Client;
use serde::Deserialize;

use crate::actuator::Actuator;
use crate::error::{AppError, CommandFailure, FailureKind};
use crate::registry::{CommandDescriptor, CommandFactory, CommandOutcome, Plugin};
use crate::settings::LocationCoords;

pub const WEATHER_API: &str = "https://api.weather.gov";

const SENSITIVITY: f64 = 0.5;
const ALT_SOUND: &str = "thicc";
/// Periods searched when looking for tomorrow's forecast.
const TOMORROW_WINDOW: usize = 4;
const WINDY_MPH: u32 = 20;
const DRESS_WARMLY_AT: i64 = 35;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeatherDay {
    Today,
    Tomorrow,
}

/// One forecast period as returned by the gridpoint forecast endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ForecastPeriod {
    pub name: String,
    pub temperature: i64,
    #[serde(rename = "shortForecast")]
    pub short_forecast: String,
    #[serde(rename = "windSpeed")]
    pub wind_speed: String,
}

#[derive(Deserialize)]
struct ForecastResponse {
    properties: ForecastProperties,
}

#[derive(Deserialize)]
struct ForecastProperties {
    periods: Vec<ForecastPeriod>,
}

pub fn parse_periods(body: &str) -> Result<Vec<ForecastPeriod>, CommandFailure> {
    serde_json::from_str::<ForecastResponse>(body)
        .map(|r| r.properties.periods)
        .map_err(|e| {
            CommandFailure::new(FailureKind::InvalidResponse, "malformed forecast").with_source(e)
        })
}

/// Today is the first period. Tomorrow is the first of the next few whose
/// name mentions a day, or the first period when none does.
pub fn pick_period(periods: &[ForecastPeriod], day: WeatherDay) -> Option<&ForecastPeriod> {
    match day {
        WeatherDay::Today => periods.first(),
        WeatherDay::Tomorrow => periods
            .iter()
            .take(TOMORROW_WINDOW)
            .find(|p| p.name.contains("day"))
            .or_else(|| periods.first()),
    }
}

/// Upper bound of a wind speed such as `"10 mph"` or `"5 to 15 mph"`.
pub fn max_wind_mph(wind_speed: &str) -> Result<u32, CommandFailure> {
    let trimmed = wind_speed.trim_end_matches([' ', 'm', 'p', 'h']);
    let upper = trimmed.rsplit(" to ").next().unwrap_or(trimmed);
    upper.trim().parse().map_err(|_| {
        CommandFailure::new(
            FailureKind::InvalidResponse,
            format!("unrecognised wind speed '{wind_speed}'"),
        )
    })
}

/// Full forecast in the style of a TV weatherman.
pub fn full_broadcast(period: &ForecastPeriod) -> Result<String, CommandFailure> {
    let t = period.temperature;
    let feel = match t {
        t if t > 80 => "it's rather steamy",
        t if t > 70 => "it's warm",
        t if t > 55 => "it's comfy",
        t if t > 35 => "it's cool",
        t if t > 20 => "it's pretty cold outside",
        _ => "it's pretty darn cold",
    };
    let mut to_say = format!("{}, {feel} with a temperature of {t}!", period.name);

    if period.short_forecast.contains("Clear") {
        to_say.push_str(" It's a nice day, too!");
    } else if period.short_forecast.contains("Cloudy") {
        to_say.push_str(" It's a lame, cloudy day, too!");
    }
    if max_wind_mph(&period.wind_speed)? >= WINDY_MPH {
        to_say.push_str(" AND it's windy!");
    }
    if t <= DRESS_WARMLY_AT {
        to_say.push_str(" Be sure to dress for the weather!");
    }
    Ok(to_say)
}

pub struct WeatherPlugin {
    client: Client,
    location: LocationCoords,
    api: String,
}

impl WeatherPlugin {
    pub fn new(location: LocationCoords) -> Result<Self, AppError> {
        Self::with_api(location, WEATHER_API)
    }

    pub fn with_api(location: LocationCoords, api: impl Into<String>) -> Result<Self, AppError> {
        Ok(Self {
            client: super::http_client()?,
            location,
            api: api.into(),
        })
    }

    pub fn forecast_url(&self) -> String {
        format!(
            "{}/points/{},{}/forecast",
            self.api.trim_end_matches('/'),
            self.location.x,
            self.location.y
        )
    }

    fn period(&self, day: WeatherDay) -> Result<ForecastPeriod, CommandFailure> {
        let body = self
            .client
            .get(self.forecast_url())
            .send()?
            .error_for_status()?
            .text()?;
        let periods = parse_periods(&body)?;
        pick_period(&periods, day).cloned().ok_or_else(|| {
            CommandFailure::new(FailureKind::InvalidResponse, "forecast has no periods")
        })
    }

    fn report(&self, actuator: &mut dyn Actuator, day: WeatherDay, full: bool) -> CommandOutcome {
        let period = self.period(day)?;
        let to_say = if full {
            full_broadcast(&period)?
        } else {
            period.short_forecast
        };
        actuator.speak(&to_say)?;
        Ok(to_say)
    }

    fn today_full(&self, actuator: &mut dyn Actuator) -> CommandOutcome {
        self.report(actuator, WeatherDay::Today, true)
    }

    fn tomorrow_full(&self, actuator: &mut dyn Actuator) -> CommandOutcome {
        self.report(actuator, WeatherDay::Tomorrow, true)
    }

    fn today_brief(&self, actuator: &mut dyn Actuator) -> CommandOutcome {
        self.report(actuator, WeatherDay::Today, false)
    }

    fn tomorrow_brief(&self, actuator: &mut dyn Actuator) -> CommandOutcome {
        self.report(actuator, WeatherDay::Tomorrow, false)
    }
}

impl Plugin for WeatherPlugin {
    fn name(&self) -> &str {
        "weather"
    }

    fn commands(&self, factory: &CommandFactory) -> Result<Vec<CommandDescriptor>, AppError> {
        let recoverable = [FailureKind::ConnectionError, FailureKind::NetworkTimeout];
        Ok(vec![
            factory.create(
                "weather_today_full",
                WeatherPlugin::today_full,
                SENSITIVITY,
                recoverable.clone(),
                Some(ALT_SOUND),
            )?,
            factory.create(
                "weather_tomorrow_full",
                WeatherPlugin::tomorrow_full,
                SENSITIVITY,
                recoverable.clone(),
                Some(ALT_SOUND),
            )?,
            factory.create(
                "weather_today_brief",
                WeatherPlugin::today_brief,
                SENSITIVITY,
                recoverable.clone(),
                Some(ALT_SOUND),
            )?,
            factory.create(
                "weather_tomorrow_brief",
                WeatherPlugin::tomorrow_brief,
                SENSITIVITY,
                recoverable,
                Some(ALT_SOUND),
            )?,
        ])
    }
}
