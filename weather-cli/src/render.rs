//! Terminal rendering of weather reports.

use chrono::{DateTime, FixedOffset, Utc};
use clap::ValueEnum;
use std::fmt::Write;
use weather_core::{Units, WeatherReport};

const UNKNOWN: &str = "--";

/// How much of the report to print.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Layout {
    /// Greeting, headline and a detail table.
    #[default]
    Full,
    /// A single summary line.
    Compact,
}

pub fn greeting(hour: u32) -> &'static str {
    match hour {
        0..=11 => "Good Morning",
        12..=17 => "Good Afternoon",
        _ => "Good Evening",
    }
}

/// `14 Nov 2023, 10:13 PM`
pub fn format_timestamp(ts: DateTime<FixedOffset>) -> String {
    ts.format("%d %b %Y, %I:%M %p").to_string()
}

fn observed(report: &WeatherReport) -> Option<DateTime<FixedOffset>> {
    report
        .local_observed_at()
        .or_else(|| report.observed_at().map(|t: DateTime<Utc>| t.fixed_offset()))
}

fn degrees(value: Option<f64>) -> String {
    value.map_or_else(|| UNKNOWN.to_string(), |v| format!("{}°", v.round()))
}

fn or_unknown<T: std::fmt::Display>(value: Option<T>, suffix: &str) -> String {
    value.map_or_else(|| UNKNOWN.to_string(), |v| format!("{v}{suffix}"))
}

fn location(report: &WeatherReport) -> String {
    let name = report.location_name.as_deref().unwrap_or(UNKNOWN);
    match report.system.as_ref().map(|s| s.country_code.as_str()) {
        Some(country) if !country.is_empty() => format!("{name}, {country}"),
        _ => name.to_string(),
    }
}

pub fn render_report(report: &WeatherReport, units: Units, layout: Layout, hour: u32) -> String {
    let main = report.measurements.as_ref();
    let description = report
        .primary_condition()
        .map(|c| c.description.as_str())
        .unwrap_or(UNKNOWN);
    let temperature = format!(
        "{}{}",
        degrees(main.map(|m| m.temperature)),
        units.temperature_symbol()
    );

    if layout == Layout::Compact {
        return format!("{}: {temperature}, {description}", location(report));
    }

    let wind = report
        .wind
        .map(|w| format!("{} {} ({}°)", w.speed.round(), units.speed_symbol(), w.direction_degrees));

    let mut out = String::new();
    let _ = writeln!(out, "{}", location(report));
    let _ = writeln!(out, "{}", greeting(hour));
    let _ = writeln!(out);
    let _ = writeln!(out, "  {temperature}  {description}");
    let _ = writeln!(
        out,
        "  {}",
        observed(report).map_or_else(|| UNKNOWN.to_string(), format_timestamp)
    );
    if let Some(icon) = report.icon_url() {
        let _ = writeln!(out, "  Icon: {icon}");
    }
    let _ = writeln!(out);

    let rows = [
        ("Min Temp", degrees(main.map(|m| m.temp_min))),
        ("Max Temp", degrees(main.map(|m| m.temp_max))),
        ("Feels Like", degrees(main.map(|m| m.feels_like))),
        ("Pressure", or_unknown(main.map(|m| m.pressure), " hPa")),
        ("Humidity", or_unknown(main.map(|m| m.humidity), "%")),
        ("Wind", wind.unwrap_or_else(|| UNKNOWN.to_string())),
        ("Clouds", or_unknown(report.cloud_cover_percent(), "%")),
    ];
    for (label, value) in rows {
        let _ = writeln!(out, "  {label:<11} {value}");
    }

    out
}
