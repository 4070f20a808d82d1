//! Turns reports and failures into the text shown to the user.
//!
//! Output is plain text with `<b>` spans. Lines come in a fixed order and a
//! line is left out when its field is absent.

use serde::{Deserialize, Serialize};

use crate::{
    geocoding::GeocodingError,
    model::{ForecastPeriod, WeatherReport},
    resolver::ResolveError,
};

pub const SEPARATOR: &str = "==================================";
const WARNING: &str = "\u{26A0}";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Language {
    #[default]
    #[serde(rename = "ua", alias = "uk")]
    Ukrainian,
    #[serde(rename = "en", alias = "us")]
    English,
}

impl std::str::FromStr for Language {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "ua" | "uk" => Ok(Language::Ukrainian),
            "en" | "us" => Ok(Language::English),
            _ => Err(anyhow::anyhow!("Unknown language '{value}'. Supported languages: ua, en.")),
        }
    }
}

struct Labels {
    date: &'static str,
    condition: &'static str,
    temperature: &'static str,
    max_temperature: &'static str,
    min_temperature: &'static str,
    wind: &'static str,
    pressure: &'static str,
    precipitation: &'static str,
    humidity: &'static str,
    sunrise: &'static str,
    sunset: &'static str,
    degrees: &'static str,
    speed_unit: &'static str,
    pressure_unit: &'static str,
    precipitation_unit: &'static str,
}

const UKRAINIAN: Labels = Labels {
    date: "Погода на:",
    condition: "Погода",
    temperature: "Температура повітря",
    max_temperature: "Максимальна температура повітря",
    min_temperature: "Мінімальна температура повітря",
    wind: "Швидкість вітру",
    pressure: "Атмосферний тиск",
    precipitation: "Опади",
    humidity: "Відносна вологість",
    sunrise: "Схід сонця",
    sunset: "Захід сонця",
    degrees: "С°",
    speed_unit: "м/с",
    pressure_unit: "мм рт.ст.",
    precipitation_unit: "мм",
};

const ENGLISH: Labels = Labels {
    date: "Weather for:",
    condition: "Weather",
    temperature: "Air temperature",
    max_temperature: "Maximum air temperature",
    min_temperature: "Minimum air temperature",
    wind: "Wind speed",
    pressure: "Atmospheric pressure",
    precipitation: "Precipitation",
    humidity: "Relative humidity",
    sunrise: "Sunrise",
    sunset: "Sunset",
    degrees: "°C",
    speed_unit: "m/s",
    pressure_unit: "mmHg",
    precipitation_unit: "mm",
};

impl Language {
    fn labels(&self) -> &'static Labels {
        match self {
            Language::Ukrainian => &UKRAINIAN,
            Language::English => &ENGLISH,
        }
    }
}

/// Render the reports for `city_name`. Multi-day periods get one block per day.
pub fn render_reports(
    city_name: &str,
    reports: &[WeatherReport],
    period: ForecastPeriod,
    language: Language,
) -> String {
    let mut out = format!("<b>** {city_name} **</b>\n\n");

    match (period, reports) {
        (ForecastPeriod::Current | ForecastPeriod::Today, [report, ..]) => {
            out.push_str(&render_body(report, language));
            out.push('\n');
            out.push_str(SEPARATOR);
        }
        _ => {
            for report in reports {
                out.push_str(&render_body(report, language));
                out.push('\n');
                out.push_str(SEPARATOR);
                out.push_str("\n\n");
            }
        }
    }

    out
}

fn render_body(report: &WeatherReport, language: Language) -> String {
    let l = language.labels();
    let mut lines: Vec<String> = vec![format!("<b>{}</b> \t{}\n{SEPARATOR}", l.date, report.date)];

    if let Some(summary) = report.summary {
        lines.push(format!("<b>{}</b>:\t{}\t{}", l.condition, summary.emoji(), summary.label(language)));
    }
    if let Some(t) = report.temperature {
        lines.push(format!("<b>{}</b>:\t{t} {}", l.temperature, l.degrees));
    }
    if let Some(t) = report.max_temperature {
        lines.push(format!("<b>{}</b>:\t{t} {}", l.max_temperature, l.degrees));
    }
    if let Some(t) = report.min_temperature {
        lines.push(format!("<b>{}</b>:\t{t} {}", l.min_temperature, l.degrees));
    }
    if let Some(speed) = report.wind_speed {
        lines.push(format!(
            "<b>{}</b>:\t{speed} {}\t{}",
            l.wind,
            l.speed_unit,
            report.wind_direction.indicator()
        ));
    }
    if let Some(p) = report.pressure_mm_hg {
        lines.push(format!("<b>{}</b>:\t{p} {}", l.pressure, l.pressure_unit));
    }
    if let Some(p) = report.precipitation {
        lines.push(format!("<b>{}</b>:\t{p} {}", l.precipitation, l.precipitation_unit));
    }
    if let Some(h) = report.humidity {
        lines.push(format!("<b>{}</b>:\t{h} %", l.humidity));
    }
    if let Some(s) = &report.sunrise {
        lines.push(format!("<b>{}</b>: {s}", l.sunrise));
    }
    if let Some(s) = &report.sunset {
        lines.push(format!("<b>{}</b>: {s}", l.sunset));
    }

    lines.join("\n")
}

/// User-facing text for a failed resolve.
pub fn failure_message(error: &ResolveError, language: Language) -> String {
    match (error, language) {
        (ResolveError::UnknownProvider(name), Language::Ukrainian) => format!(
            "{WARNING} Невідомий провайдер погоди '{name}'.\nОберіть провайдера у налаштуваннях."
        ),
        (ResolveError::UnknownProvider(name), Language::English) => format!(
            "{WARNING} Unknown weather provider '{name}'.\nPick a provider in the settings."
        ),
        (ResolveError::ProviderNotConfigured(id), Language::Ukrainian) => format!(
            "{WARNING} Провайдер погоди '{}' не налаштований.",
            id.display_name()
        ),
        (ResolveError::ProviderNotConfigured(id), Language::English) => format!(
            "{WARNING} Weather provider '{}' is not configured.",
            id.display_name()
        ),
        (ResolveError::NotImplemented { .. }, Language::Ukrainian) => {
            "Нажаль ця функція знаходиться у стадії розробки...".to_string()
        }
        (ResolveError::NotImplemented { .. }, Language::English) => {
            "Unfortunately this feature is still in development...".to_string()
        }
        (ResolveError::Provider(err), Language::Ukrainian) => format!(
            "{WARNING} Не вдалося отримати дані про погоду від {}.\nСпробуйте пізніше.",
            err.provider().display_name()
        ),
        (ResolveError::Provider(err), Language::English) => format!(
            "{WARNING} Couldn't get weather data from {}.\nPlease try again later.",
            err.provider().display_name()
        ),
        (ResolveError::Cache(_), Language::Ukrainian) => {
            format!("{WARNING} Сталася неочікувана помилка!!!\nСпробуйте пізніше.")
        }
        (ResolveError::Cache(_), Language::English) => {
            format!("{WARNING} An unexpected error occurred!!!\nPlease try again later.")
        }
    }
}

/// User-facing text for a place name that could not be geocoded.
pub fn location_failure_message(error: &GeocodingError, language: Language) -> String {
    match language {
        Language::Ukrainian => format!(
            "{WARNING} Не вдалося визначити назву населеного пункту!\n\
             Перевірте назву, та повторіть спробу!\n({error})"
        ),
        Language::English => format!(
            "{WARNING} Couldn't determine the place name!\n\
             Check the spelling and try again!\n({error})"
        ),
    }
}
