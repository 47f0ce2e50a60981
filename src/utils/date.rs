use chrono::{NaiveDate, Utc};

/// Parse ett datum från en sträng (flexibelt format)
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    let formats = [
        "%Y-%m-%d", // 2024-01-15
        "%Y/%m/%d", // 2024/01/15
        "%d-%m-%Y", // 15-01-2024
        "%d/%m/%Y", // 15/01/2024
        "%Y%m%d",   // 20240115
    ];

    formats
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(s, format).ok())
}

/// Tolka ett valfritt datumfält från ett formulär.
/// Tom sträng ger Ok(None), ogiltigt datum ger Err.
pub fn parse_optional_date(s: &str) -> Result<Option<NaiveDate>, String> {
    if s.trim().is_empty() {
        return Ok(None);
    }
    parse_date(s)
        .map(Some)
        .ok_or_else(|| format!("Ogiltigt datum: {} (använd ÅÅÅÅ-MM-DD)", s.trim()))
}

/// Formatera ett datum för visning
pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Text för en deadline relativt idag, t.ex. "om 3 dagar"
pub fn deadline_display(deadline: NaiveDate, today: NaiveDate) -> String {
    let days = (deadline - today).num_days();
    match days {
        0 => format!("{} (idag)", format_date(deadline)),
        1 => format!("{} (imorgon)", format_date(deadline)),
        d if d > 1 => format!("{} (om {} dagar)", format_date(deadline), d),
        d => format!("{} ({} dagar sedan)", format_date(deadline), -d),
    }
}

pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}
