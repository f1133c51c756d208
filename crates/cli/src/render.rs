//! Plain-text table rendering.

use chrono::{DateTime, FixedOffset, Utc};

use marketboard_core::EntityRecord;
use marketboard_recon::projector::{star_glyphs, MarketSummary, Star};

const NAME_WIDTH: usize = 24;

pub fn stars(rating: f64) -> String {
    star_glyphs(rating)
        .iter()
        .map(|s| match s {
            Star::Full => '★',
            Star::Half => '½',
            Star::Empty => '☆',
        })
        .collect()
}

/// `1234567` -> `1,234,567`.
pub fn thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

pub fn timestamp(at: Option<DateTime<Utc>>, offset: FixedOffset) -> String {
    match at {
        Some(t) => t.with_timezone(&offset).format("%Y-%m-%d %H:%M %:z").to_string(),
        None => "never".to_string(),
    }
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(width.saturating_sub(1)).collect();
    cut.push('…');
    cut
}

/// Ranked table. The subject row is marked with `>` instead of its rank.
/// Placeholder rows read `Pending...` / `---`.
pub fn table(rows: &[EntityRecord], subject_id: Option<&str>) -> String {
    let mut out = format!(
        "{:>3}  {:<NAME_WIDTH$}  {:>4}  {:<5}  {:>9}  {}\n",
        "#", "VENUE", "SCORE", "", "VOLUME", "LOCATION"
    );
    for (idx, row) in rows.iter().enumerate() {
        let marker = if subject_id == Some(row.id.as_str()) {
            ">".to_string()
        } else {
            (idx + 1).to_string()
        };
        let (score, glyphs, volume) = if row.is_placeholder() {
            ("Pending...".to_string(), String::new(), "---".to_string())
        } else {
            (format!("{:.1}", row.rating), stars(row.rating), thousands(row.rating_count))
        };
        out.push_str(&format!(
            "{:>3}  {:<NAME_WIDTH$}  {:>4}  {:<5}  {:>9}  {}\n",
            marker,
            truncate(&row.name, NAME_WIDTH),
            score,
            glyphs,
            volume,
            row.location_label
        ));
    }
    out
}

pub fn summary_line(summary: &MarketSummary) -> String {
    let mut line = format!(
        "{} of {} venues reporting, {} ratings",
        summary.observed,
        summary.entities,
        thousands(summary.total_ratings)
    );
    if let Some(mean) = summary.mean_rating {
        line.push_str(&format!(", mean score {mean:.2}"));
    }
    if let (Some(rank), Some(share)) = (summary.subject_rank, summary.subject_share) {
        line.push_str(&format!("; subject #{rank} with {share:.1}% of volume"));
    }
    line
}
