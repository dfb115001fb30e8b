use chrono::{DateTime, FixedOffset, NaiveDate, Utc};

/// Brasília time (UTC-3, no daylight saving since 2019).
const BRASILIA_OFFSET_SECS: i32 = 3 * 3600;

/// Parses the date formats found in edital records: `YYYY-MM-DD`, `DD/MM/YYYY`
/// and RFC 3339 timestamps (the date part is kept).
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%d/%m/%Y") {
        return Some(date);
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.date_naive());
    }
    // "2025-12-10T23:59:59" and "2025-12-10 23:59" without an offset.
    raw.get(..10)
        .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
}

/// Calendar date in Brasília, the reference for every deadline in the catalogue.
pub fn hoje() -> NaiveDate {
    match FixedOffset::west_opt(BRASILIA_OFFSET_SECS) {
        Some(offset) => Utc::now().with_timezone(&offset).date_naive(),
        None => Utc::now().date_naive(),
    }
}

/// Lowercases and strips Portuguese diacritics so status words compare loosely.
pub fn fold(text: &str) -> String {
    text.trim()
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'í' | 'ì' | 'î' | 'ï' => 'i',
            'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
            'ú' | 'ù' | 'û' | 'ü' => 'u',
            'ç' => 'c',
            '_' | '-' => ' ',
            other => other,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_iso_date() {
        assert_eq!(parse_date("2025-12-10"), Some(ymd(2025, 12, 10)));
    }

    #[test]
    fn test_brazilian_date() {
        assert_eq!(parse_date("10/12/2025"), Some(ymd(2025, 12, 10)));
    }

    #[test]
    fn test_rfc3339_timestamp() {
        assert_eq!(
            parse_date("2025-03-01T18:00:00-03:00"),
            Some(ymd(2025, 3, 1))
        );
    }

    #[test]
    fn test_naive_timestamp() {
        assert_eq!(parse_date("2025-03-01T18:00:00"), Some(ymd(2025, 3, 1)));
    }

    #[test]
    fn test_garbage_is_none() {
        assert_eq!(parse_date("fluxo contínuo"), None);
        assert_eq!(parse_date(""), None);
    }

    #[test]
    fn test_fold_strips_accents() {
        assert_eq!(fold("  Inscrições_Abertas "), "inscricoes abertas");
    }
}
