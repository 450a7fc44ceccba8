//! Admin statistics screen. Each section loads independently; a failed
//! section prints its error and the others still render.

use anyhow::Result;
use tracing::warn;

use crate::api::ApiClient;
use crate::error::GatewayError;
use crate::stats::{DailyCount, DiagnosisCount, OverallStats, Period, SymptomRecord, group_symptoms};
use crate::ui::Palette;

const BAR_WIDTH: u64 = 30;

pub async fn run_stats(client: &ApiClient, period: Period, palette: Palette) -> Result<()> {
    let (overall, daily, diagnoses, symptoms) = tokio::join!(
        client.overall_stats(),
        client.daily_stats(period),
        client.diagnosis_stats(period),
        client.symptom_stats(period),
    );

    println!("{}", palette.accent(&format!("MedAssyst statistics ({})", period.as_ref())));
    print!("{}", section("Overview", &palette, overall.map(|o| format_overall(&o))));
    print!("{}", section("Consultations per day", &palette, daily.map(|d| format_daily(&d))));
    print!("{}", section("Diagnoses", &palette, diagnoses.map(|d| format_diagnoses(&d))));
    print!("{}", section("Symptoms", &palette, symptoms.map(|s| format_symptoms(&s))));

    Ok(())
}

fn section(title: &str, palette: &Palette, body: Result<String, GatewayError>) -> String {
    let body = body.unwrap_or_else(|err| {
        warn!(section = title, error = %err, "stats request failed");
        format!("  {}\n", err.user_message("Could not load statistics"))
    });
    format!("\n{}\n{}", palette.accent(title), body)
}

fn bar(count: u64, max: u64) -> String {
    if max == 0 {
        return String::new();
    }
    let width = (count * BAR_WIDTH).div_ceil(max);
    "█".repeat(width as usize)
}

pub fn format_overall(stats: &OverallStats) -> String {
    format!(
        "  Total consultations: {}\n  Today:               {}\n  Unique diagnoses:    {}\n  Active users:        {}\n",
        stats.total_chats, stats.today_chats, stats.unique_diagnoses, stats.active_users
    )
}

pub fn format_daily(days: &[DailyCount]) -> String {
    if days.is_empty() {
        return "  No data for this period\n".to_string();
    }
    let max = days.iter().map(|d| d.count).max().unwrap_or(0);
    days.iter()
        .map(|d| format!("  {:<12} {:>5} {}\n", d.date, d.count, bar(d.count, max)))
        .collect()
}

pub fn format_diagnoses(diagnoses: &[DiagnosisCount]) -> String {
    if diagnoses.is_empty() {
        return "  No data for this period\n".to_string();
    }
    let mut sorted = diagnoses.to_vec();
    sorted.sort_by(|a, b| b.count.cmp(&a.count));
    sorted
        .iter()
        .map(|d| format!("  {:>5}  {}\n", d.count, d.diagnosis))
        .collect()
}

pub fn format_symptoms(records: &[SymptomRecord]) -> String {
    let grouped = group_symptoms(records.iter().map(|r| r.symptom.as_str()));
    if grouped.is_empty() {
        return "  No data for this period\n".to_string();
    }
    let max = grouped.first().map(|g| g.count).unwrap_or(0);
    grouped
        .iter()
        .map(|g| format!("  {:<22} {:>5} {}\n", g.group, g.count, bar(g.count, max)))
        .collect()
}
