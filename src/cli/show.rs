use super::ui;
use crate::core::record::RateRecord;
use crate::store::RecordStore;
use anyhow::Result;
use chrono::{DateTime, Utc};
use comfy_table::Table;

/// Prints the stored record as a card, the terminal counterpart of the web
/// card.
pub fn run(store: &dyn RecordStore) -> Result<()> {
    println!("{}", card_text(store, Utc::now()));
    Ok(())
}

fn card_text(store: &dyn RecordStore, now: DateTime<Utc>) -> String {
    match store.load() {
        Ok(Some(record)) => format!(
            "\n{}\n{}",
            ui::style_text(
                &format!("{} {}", record.currency, record.pair),
                ui::StyleType::Title
            ),
            render_card(&record, now)
        ),
        Ok(None) => "No rate record found yet. Run `ratecard fetch` first.".to_string(),
        Err(e) => ui::style_text(
            &format!("Rate record is unreadable: {e:#}"),
            ui::StyleType::Error,
        ),
    }
}

pub fn render_card(record: &RateRecord, now: DateTime<Utc>) -> Table {
    let has_error = !record.is_success();
    let mut table = ui::new_styled_table();

    table.add_row(vec![
        ui::label_cell(&record.source_field),
        record
            .rate
            .map_or_else(|| ui::na_cell(has_error), ui::value_cell),
    ]);
    table.add_row(vec![
        ui::label_cell("Per 100"),
        record
            .rate_per_100
            .map_or_else(|| ui::na_cell(has_error), ui::value_cell),
    ]);

    let change_cell = match (record.rate_change, record.rate_change_percent, record.trend()) {
        (Some(abs), Some(pct), Some(trend)) => {
            ui::trend_cell(&format!("{abs:+} ({pct:+}%)"), trend)
        }
        _ => ui::na_cell(false),
    };
    table.add_row(vec![ui::label_cell("Change"), change_cell]);

    table.add_row(vec![
        ui::label_cell("Published"),
        record
            .publish_time_raw
            .as_deref()
            .map_or_else(|| ui::na_cell(has_error), ui::value_cell),
    ]);

    let fetched = match (&record.fetched_at_local, record.fetched_at_utc) {
        (Some(local), Some(utc)) => format!("{local} ({})", format_age(now - utc)),
        (Some(local), None) => local.clone(),
        _ => String::new(),
    };
    table.add_row(vec![
        ui::label_cell("Fetched"),
        if fetched.is_empty() {
            ui::na_cell(has_error)
        } else {
            ui::value_cell(fetched)
        },
    ]);

    let status = match &record.error_message {
        Some(message) if has_error => format!("{}: {}", record.status, message),
        _ => record.status.to_string(),
    };
    table.add_row(vec![
        ui::label_cell("Status"),
        if has_error {
            ui::value_cell(ui::style_text(&status, ui::StyleType::Error))
        } else {
            ui::value_cell(status)
        },
    ]);

    table
}

fn format_age(age: chrono::Duration) -> String {
    let minutes = age.num_minutes().max(0);
    match minutes {
        0 => "just now".to_string(),
        m if m < 60 => format!("{m}m ago"),
        m if m < 60 * 24 => format!("{}h {}m ago", m / 60, m % 60),
        m => format!("{}d {}h ago", m / (60 * 24), (m / 60) % 24),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::QuoteConfig;
    use crate::core::error::RateError;
    use crate::core::record::Quote;
    use crate::store::disk::JsonFileStore;
    use crate::store::memory::MemoryStore;
    use chrono::{Duration, TimeZone};
    use comfy_table::ContentArrangement;
    use rust_decimal::Decimal;

    fn record_at(rate: Decimal, now: DateTime<Utc>) -> RateRecord {
        let quote = Quote {
            currency: "英镑".to_string(),
            rate,
            publish_time_raw: "2025.01.02 10:30:00".to_string(),
        };
        RateRecord::from_quote(quote, &QuoteConfig::default(), "http://bank", now)
    }

    #[test]
    fn test_format_age() {
        assert_eq!(format_age(Duration::seconds(20)), "just now");
        assert_eq!(format_age(Duration::minutes(5)), "5m ago");
        assert_eq!(format_age(Duration::minutes(185)), "3h 5m ago");
        assert_eq!(format_age(Duration::hours(50)), "2d 2h ago");
        assert_eq!(format_age(Duration::minutes(-3)), "just now");
    }

    #[test]
    fn test_render_success_card() {
        console::set_colors_enabled(false);
        let fetched = Utc.with_ymd_and_hms(2025, 1, 2, 2, 31, 0).unwrap();
        let previous = record_at(Decimal::new(93531, 4), fetched);
        let record = record_at(Decimal::new(93654, 4), fetched).with_change_from(Some(&previous));

        let mut table = render_card(&record, fetched + Duration::minutes(90));
        table.set_content_arrangement(ContentArrangement::Disabled);
        let rendered = table.to_string();
        assert!(rendered.contains("现汇卖出价"));
        assert!(rendered.contains("9.3654"));
        assert!(rendered.contains("936.54"));
        assert!(rendered.contains("▲ +0.0123 (+0.1315%)"));
        assert!(rendered.contains("2025-01-02 10:31:00 (1h 30m ago)"));
        assert!(rendered.contains("success"));
    }

    #[test]
    fn test_render_error_card_without_data() {
        console::set_colors_enabled(false);
        let error = RateError::Parse("no row found".to_string());
        let record = RateRecord::failed(
            None,
            &error,
            &QuoteConfig::default(),
            "http://bank",
            Utc::now(),
        );

        let mut table = render_card(&record, Utc::now());
        table.set_content_arrangement(ContentArrangement::Disabled);
        let rendered = table.to_string();
        assert!(rendered.contains("N/A"));
        assert!(rendered.contains("error: Could not parse rate from page: no row found"));
    }

    #[test]
    fn test_card_text_for_missing_and_unreadable_records() {
        console::set_colors_enabled(false);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");
        let store = JsonFileStore::new(&path);

        assert!(card_text(&store, Utc::now()).starts_with("No rate record found yet"));

        std::fs::write(&path, "{ not json").unwrap();
        let text = card_text(&store, Utc::now());
        assert!(text.starts_with("Rate record is unreadable"));
        assert!(text.contains("Failed to parse record"));
    }

    #[test]
    fn test_card_text_for_stored_record() {
        console::set_colors_enabled(false);
        let now = Utc.with_ymd_and_hms(2025, 1, 2, 2, 31, 0).unwrap();
        let store = MemoryStore::with_record(record_at(Decimal::new(93654, 4), now));

        let text = card_text(&store, now);
        assert!(text.contains("英镑 GBP/CNY"));
        assert!(text.contains("9.3654"));
    }
}
