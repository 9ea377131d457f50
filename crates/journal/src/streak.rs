use chrono::{DateTime, NaiveDate, TimeZone, Utc};

/// Days in a row with at least one entry, counted back from the most recent
/// entry's local day in `tz`. Zero for no entries.
pub fn streak<Tz: TimeZone>(times: impl IntoIterator<Item = DateTime<Utc>>, tz: &Tz) -> u32 {
    let mut days: Vec<NaiveDate> = times
        .into_iter()
        .map(|t| t.with_timezone(tz).date_naive())
        .collect();
    days.sort_unstable_by(|a, b| b.cmp(a));
    days.dedup();

    let Some((&first, rest)) = days.split_first() else {
        return 0;
    };

    let mut count = 1;
    let mut current = first;
    for &day in rest {
        if current.pred_opt() != Some(day) {
            break;
        }
        count += 1;
        current = day;
    }
    count
}
