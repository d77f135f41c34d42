//! Query string parsing into domain filter types
//!
//! Translates the URL-encoded query into `EventFilter`, paging, time
//! ranges, and the enum parameters. Every parse failure is a
//! `DomainError::Validation` naming the offending parameter, which the
//! response layer turns into a 400.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use vestry_core::domain::{ActionCategory, DomainError, RiskLevel, TargetKind};
use vestry_core::ports::{
    EventFilter, Granularity, Page, TimeRange, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE,
};
use vestry_report::ExportFormat;

/// Decoded `key=value` pairs of one query string
pub type Params = Vec<(String, String)>;

/// Decodes a query string into owned pairs.
pub fn parse(query: &str) -> Params {
    url::form_urlencoded::parse(query.as_bytes())
        .into_owned()
        .collect()
}

/// First non-empty value for `name`.
pub fn get<'a>(params: &'a Params, name: &str) -> Option<&'a str> {
    params
        .iter()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.as_str())
        .filter(|value| !value.is_empty())
}

/// Builds an event filter from the shared filter vocabulary.
pub fn event_filter(params: &Params) -> Result<EventFilter, DomainError> {
    let mut filter = EventFilter::new();
    if let Some(value) = get(params, "from") {
        filter = filter.with_from(parse_datetime(value, "from")?);
    }
    if let Some(value) = get(params, "to") {
        filter = filter.with_to(parse_datetime(value, "to")?);
    }
    if let Some(value) = get(params, "actor_id") {
        filter = filter.with_actor_id(value);
    }
    if let Some(value) = get(params, "target_id") {
        filter.target_id = Some(value.to_string());
    }
    if let Some(value) = get(params, "target_kind") {
        filter.target_kind = Some(value.parse::<TargetKind>()?);
    }
    if let Some(value) = get(params, "action") {
        filter = filter.with_action(value);
    }
    if let Some(value) = get(params, "category") {
        filter = filter.with_category(value.parse::<ActionCategory>()?);
    }
    if let Some(value) = get(params, "risk_level") {
        filter = filter.with_risk_levels(risk_levels(value)?);
    }
    if let Some(value) = get(params, "success") {
        filter = filter.with_success(parse_bool(value, "success")?);
    }
    if let Some(value) = get(params, "flagged") {
        filter = filter.with_flagged(parse_bool(value, "flagged")?);
    }
    if let Some(value) = get(params, "reviewed") {
        filter = filter.with_reviewed(parse_bool(value, "reviewed")?);
    }
    if let Some(value) = get(params, "sensitive") {
        filter = filter.with_sensitive(parse_bool(value, "sensitive")?);
    }
    if let Some(value) = get(params, "actor_ip") {
        filter = filter.with_actor_ip(value);
    }
    if let Some(value) = get(params, "archived") {
        filter = filter.with_archived(parse_bool(value, "archived")?);
    }
    Ok(filter)
}

/// Page number and size, defaulted and clamped to the store's bounds.
pub fn page(params: &Params) -> Result<Page, DomainError> {
    let number = match get(params, "page") {
        Some(value) => parse_u32(value, "page")?.max(1),
        None => 1,
    };
    let size = match get(params, "limit") {
        Some(value) => parse_u32(value, "limit")?.clamp(1, MAX_PAGE_SIZE),
        None => DEFAULT_PAGE_SIZE,
    };
    Ok(Page::new(number, size))
}

/// Optional `from`/`to` bounds as a time range.
pub fn time_range(params: &Params) -> Result<TimeRange, DomainError> {
    let from = get(params, "from")
        .map(|value| parse_datetime(value, "from"))
        .transpose()?;
    let to = get(params, "to")
        .map(|value| parse_datetime(value, "to"))
        .transpose()?;
    Ok(TimeRange::new(from, to))
}

/// Comma-separated risk level set, e.g. `high,critical`.
pub fn risk_levels(value: &str) -> Result<Vec<RiskLevel>, DomainError> {
    value
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| part.parse::<RiskLevel>())
        .collect()
}

/// Statistics bucketing, defaulting to daily.
pub fn granularity(params: &Params) -> Result<Granularity, DomainError> {
    match get(params, "granularity") {
        Some(value) => value.parse(),
        None => Ok(Granularity::Day),
    }
}

/// Export serialization format, defaulting to JSON.
pub fn export_format(params: &Params) -> Result<ExportFormat, DomainError> {
    match get(params, "format") {
        Some(value) => value.parse(),
        None => Ok(ExportFormat::Json),
    }
}

/// Accepts RFC 3339, `YYYY-MM-DDTHH:MM:SS` (read as UTC), and bare
/// `YYYY-MM-DD` (midnight UTC).
pub fn parse_datetime(value: &str, field: &str) -> Result<DateTime<Utc>, DomainError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S") {
        return Ok(DateTime::from_naive_utc_and_offset(naive, Utc));
    }

    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        if let Some(naive) = date.and_hms_opt(0, 0, 0) {
            return Ok(DateTime::from_naive_utc_and_offset(naive, Utc));
        }
    }

    Err(DomainError::validation(
        field,
        format!("'{value}' is not a date or datetime"),
    ))
}

pub fn parse_bool(value: &str, field: &str) -> Result<bool, DomainError> {
    match value {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        other => Err(DomainError::validation(
            field,
            format!("'{other}' is not a boolean"),
        )),
    }
}

pub fn parse_u32(value: &str, field: &str) -> Result<u32, DomainError> {
    value
        .parse::<u32>()
        .map_err(|_| DomainError::validation(field, format!("'{value}' is not a whole number")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(query: &str) -> Params {
        parse(query)
    }

    #[test]
    fn test_parse_decodes_pairs() {
        let params = params("action=update%20user&page=2");
        assert_eq!(get(&params, "action"), Some("update user"));
        assert_eq!(get(&params, "page"), Some("2"));
        assert_eq!(get(&params, "missing"), None);
    }

    #[test]
    fn test_empty_value_reads_as_absent() {
        let params = params("actor_id=&page=1");
        assert_eq!(get(&params, "actor_id"), None);
    }

    #[test]
    fn test_event_filter_from_query() {
        let params = params(
            "actor_id=adm-1&category=user_management&risk_level=high,critical&flagged=true",
        );
        let filter = event_filter(&params).unwrap();

        assert_eq!(filter.actor_id.as_deref(), Some("adm-1"));
        assert_eq!(filter.category, Some(ActionCategory::UserManagement));
        assert_eq!(
            filter.risk_levels,
            vec![RiskLevel::High, RiskLevel::Critical]
        );
        assert_eq!(filter.flagged, Some(true));
        assert!(filter.from.is_none());
    }

    #[test]
    fn test_event_filter_rejects_unknown_category() {
        let params = params("category=gardening");
        let err = event_filter(&params).unwrap_err();
        assert_eq!(err, DomainError::InvalidCategory("gardening".to_string()));
    }

    #[test]
    fn test_event_filter_rejects_unknown_risk_level() {
        let params = params("risk_level=high,severe");
        assert!(event_filter(&params).is_err());
    }

    #[test]
    fn test_page_defaults_and_clamps() {
        assert_eq!(page(&params("")).unwrap(), Page::new(1, DEFAULT_PAGE_SIZE));
        assert_eq!(page(&params("page=3&limit=20")).unwrap(), Page::new(3, 20));
        assert_eq!(
            page(&params("limit=9999")).unwrap(),
            Page::new(1, MAX_PAGE_SIZE)
        );
        assert_eq!(page(&params("page=0&limit=0")).unwrap(), Page::new(1, 1));
        assert!(page(&params("page=two")).is_err());
    }

    #[test]
    fn test_parse_datetime_forms() {
        let rfc = parse_datetime("2026-08-01T09:30:00Z", "from").unwrap();
        assert_eq!(rfc.to_rfc3339(), "2026-08-01T09:30:00+00:00");

        let naive = parse_datetime("2026-08-01T09:30:00", "from").unwrap();
        assert_eq!(naive, rfc);

        let date = parse_datetime("2026-08-01", "from").unwrap();
        assert_eq!(date.to_rfc3339(), "2026-08-01T00:00:00+00:00");

        assert!(parse_datetime("yesterday", "from").is_err());
    }

    #[test]
    fn test_time_range_from_query() {
        let range = time_range(&params("from=2026-08-01&to=2026-08-15")).unwrap();
        assert!(range.from.is_some());
        assert!(range.to.is_some());

        let open = time_range(&params("")).unwrap();
        assert!(open.from.is_none());
        assert!(open.to.is_none());
    }

    #[test]
    fn test_parse_bool_accepts_numeric() {
        assert!(parse_bool("true", "f").unwrap());
        assert!(parse_bool("1", "f").unwrap());
        assert!(!parse_bool("false", "f").unwrap());
        assert!(!parse_bool("0", "f").unwrap());
        assert!(parse_bool("yes", "f").is_err());
    }

    #[test]
    fn test_granularity_defaults_to_day() {
        assert_eq!(granularity(&params("")).unwrap(), Granularity::Day);
        assert_eq!(
            granularity(&params("granularity=hour")).unwrap(),
            Granularity::Hour
        );
        assert!(granularity(&params("granularity=week")).is_err());
    }

    #[test]
    fn test_export_format_defaults_to_json() {
        assert_eq!(export_format(&params("")).unwrap(), ExportFormat::Json);
        assert_eq!(
            export_format(&params("format=csv")).unwrap(),
            ExportFormat::Csv
        );
        assert!(export_format(&params("format=xml")).is_err());
    }
}
