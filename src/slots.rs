//! Slot availability over the fixed business-hours template, on the salon's
//! wall clock (Brasília, UTC-3) regardless of the host timezone.

use chrono::{Duration, NaiveDateTime, NaiveTime, Utc};

/// Bookable times of day, in order. Hourly slots from open to last start.
pub const BUSINESS_HOURS: [&str; 10] = [
    "09:00", "10:00", "11:00", "12:00", "13:00", "14:00", "15:00", "16:00", "17:00", "18:00",
];

const SALON_UTC_OFFSET_HOURS: i64 = -3;

/// Same-day bookings must start strictly after now plus this margin.
pub const SAME_DAY_MARGIN_MIN: i64 = 30;

pub fn salon_now() -> NaiveDateTime {
    (Utc::now() + Duration::hours(SALON_UTC_OFFSET_HOURS)).naive_utc()
}

pub fn salon_today() -> String {
    salon_now().format("%Y-%m-%d").to_string()
}

pub fn salon_tomorrow() -> String {
    (salon_now() + Duration::days(1)).format("%Y-%m-%d").to_string()
}

pub fn salon_month_start() -> String {
    salon_now().format("%Y-%m-01").to_string()
}

/// Template slots still open on `date`. Booked times are dropped; when `date`
/// is the current salon day, slots at or before now + margin are dropped too.
/// `date` is matched against today by plain string comparison, so past or
/// malformed dates simply skip the time filter.
pub fn available_slots(
    template: &[&str],
    date: &str,
    booked: &[String],
    now: NaiveDateTime,
) -> Vec<String> {
    let today = now.format("%Y-%m-%d").to_string();
    let cutoff = (date == today).then(|| now + Duration::minutes(SAME_DAY_MARGIN_MIN));

    template
        .iter()
        .filter(|slot| !booked.iter().any(|b| b == *slot))
        .filter(|slot| match cutoff {
            Some(cutoff) => starts_after(slot, now, cutoff),
            None => true,
        })
        .map(|slot| (*slot).to_string())
        .collect()
}

/// Compares as full timestamps so a cutoff that wraps past midnight still
/// excludes every remaining slot of the day.
fn starts_after(slot: &str, now: NaiveDateTime, cutoff: NaiveDateTime) -> bool {
    match NaiveTime::parse_from_str(slot, "%H:%M") {
        Ok(time) => now.date().and_time(time) > cutoff,
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(date: &str, time: &str) -> NaiveDateTime {
        let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap();
        let time = NaiveTime::parse_from_str(time, "%H:%M").unwrap();
        date.and_time(time)
    }

    fn booked(times: &[&str]) -> Vec<String> {
        times.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn future_date_drops_only_booked_slots() {
        let template = ["09:00", "10:00", "11:00"];
        let open = available_slots(
            &template,
            "2024-06-01",
            &booked(&["10:00"]),
            at("2024-05-20", "12:00"),
        );
        assert_eq!(open, vec!["09:00", "11:00"]);
    }

    #[test]
    fn same_day_applies_the_booking_margin() {
        let open = available_slots(
            &BUSINESS_HOURS,
            "2024-06-01",
            &[],
            at("2024-06-01", "14:45"),
        );
        // 15:00 is inside the 30-minute margin, 16:00 onwards is not.
        assert_eq!(open, vec!["16:00", "17:00", "18:00"]);
    }

    #[test]
    fn margin_spills_into_the_next_hour() {
        let open = available_slots(
            &BUSINESS_HOURS,
            "2024-06-01",
            &[],
            at("2024-06-01", "09:45"),
        );
        assert!(!open.contains(&"10:00".to_string()));
        assert!(open.contains(&"11:00".to_string()));
    }

    #[test]
    fn slot_exactly_at_cutoff_is_excluded() {
        let open = available_slots(
            &BUSINESS_HOURS,
            "2024-06-01",
            &[],
            at("2024-06-01", "09:30"),
        );
        assert!(!open.contains(&"10:00".to_string()));
    }

    #[test]
    fn cutoff_past_midnight_excludes_everything() {
        let open = available_slots(
            &BUSINESS_HOURS,
            "2024-06-01",
            &[],
            at("2024-06-01", "23:45"),
        );
        assert!(open.is_empty());
    }

    #[test]
    fn past_date_skips_the_time_filter() {
        let open = available_slots(
            &BUSINESS_HOURS,
            "2020-01-01",
            &booked(&["09:00"]),
            at("2024-06-01", "23:45"),
        );
        assert_eq!(open.len(), BUSINESS_HOURS.len() - 1);
    }

    #[test]
    fn booked_and_margin_filters_stack() {
        let open = available_slots(
            &BUSINESS_HOURS,
            "2024-06-01",
            &booked(&["16:00", "18:00"]),
            at("2024-06-01", "14:45"),
        );
        assert_eq!(open, vec!["17:00"]);
    }

    #[test]
    fn template_order_is_preserved() {
        let open = available_slots(&BUSINESS_HOURS, "2030-01-01", &[], at("2024-06-01", "12:00"));
        let template: Vec<String> = BUSINESS_HOURS.iter().map(|s| s.to_string()).collect();
        assert_eq!(open, template);
    }

    #[test]
    fn fully_booked_day_has_no_slots() {
        let all = booked(&BUSINESS_HOURS);
        let open = available_slots(&BUSINESS_HOURS, "2030-01-01", &all, at("2024-06-01", "12:00"));
        assert!(open.is_empty());
    }
}
