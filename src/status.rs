//! Parsing of the plain-text capacity report served at `/api/status`.

use chrono::{DateTime, Utc};

use crate::{ApiStatus, OverpassError, Result};

const CONNECTED_PREFIX_LEN: usize = "Connected as: ".len();
const CURRENT_TIME_PREFIX_LEN: usize = "Current time: ".len();
const RATE_LIMIT_PREFIX_LEN: usize = "Rate limit: ".len();
// "Slot available after: " + RFC 3339 timestamp + ", in "
const SLOT_SECONDS_OFFSET: usize = "Slot available after: 2024-01-01T00:00:00Z, in ".len();

/// Parses a status report into a snapshot.
///
/// Never fails: unrecognized or truncated fields are left at their
/// defaults. Callers must treat a snapshot without `client_id` as invalid.
///
/// Any line that is neither a known field nor mentions "available" is
/// recorded as a running query, including blank lines and informational
/// lines such as `Announced endpoint: none`.
pub fn parse_status(text: &str) -> ApiStatus {
    let mut status = ApiStatus::default();

    for line in text.lines() {
        match line.split(' ').next().unwrap_or_default() {
            "Connected" => {
                if let Some(id) = line.get(CONNECTED_PREFIX_LEN..) {
                    status.client_id = Some(id.to_owned());
                }
            }
            "Current" => {
                status.current_time = line
                    .get(CURRENT_TIME_PREFIX_LEN..)
                    .and_then(|value| DateTime::parse_from_rfc3339(value.trim()).ok())
                    .map(|time| time.with_timezone(&Utc));
            }
            "Rate" => {
                status.rate_limit = line
                    .get(RATE_LIMIT_PREFIX_LEN..)
                    .and_then(|value| value.trim().parse().ok())
                    .unwrap_or_default();
            }
            "Slot" => {
                let seconds = line.get(SLOT_SECONDS_OFFSET..).and_then(|rest| {
                    let end = rest.find(' ').unwrap_or(rest.len());
                    rest[..end].parse::<i64>().ok()
                });
                if let Some(seconds) = seconds {
                    status.slots_available_after.push(seconds);
                }
            }
            "Currently" => {}
            _ if line.contains("available") => {}
            _ => status
                .slots_running
                .push(line.split('\t').map(str::to_owned).collect()),
        }
    }

    status
}

/// Derives the status URL from an interpreter endpoint by replacing the
/// last path segment with `status`.
pub(crate) fn status_url(endpoint: &str) -> Result<url::Url> {
    let mut url = url::Url::parse(endpoint)
        .map_err(|err| OverpassError::ApiStatus(format!("invalid endpoint '{endpoint}': {err}")))?;
    url.path_segments_mut()
        .map_err(|_| OverpassError::ApiStatus(format!("endpoint '{endpoint}' has no path")))?
        .pop_if_empty()
        .pop()
        .push("status");
    url.set_query(None);
    Ok(url)
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::{parse_status, status_url};

    const SATURATED: &str = "Connected as: 1869598343
Current time: 2024-05-01T12:00:00Z
Announced endpoint: none
Rate limit: 2
Slot available after: 2024-05-01T12:00:05Z, in 5 seconds.
Slot available after: 2024-05-01T12:00:42Z, in 42 seconds.
Currently running queries (pid, space limit, time limit, start time):
";

    const BUSY: &str = "Connected as: 42
Current time: 2024-05-01T12:00:00Z
Rate limit: 3
1 slots available now.
Currently running queries (pid, space limit, time limit, start time):
5721\t536870912\t180\t2024-05-01T11:59:58Z
";

    #[test]
    fn parses_saturated_report() {
        let status = parse_status(SATURATED);
        assert_eq!(status.client_id.as_deref(), Some("1869598343"));
        assert_eq!(
            status.current_time,
            Some(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap())
        );
        assert_eq!(status.rate_limit, 2);
        assert_eq!(status.slots_available_after, vec![5, 42]);
        assert_eq!(status.slots_running, vec![vec!["Announced endpoint: none".to_owned()]]);
    }

    #[test]
    fn parses_running_queries_and_skips_available_header() {
        let status = parse_status(BUSY);
        assert_eq!(status.rate_limit, 3);
        assert!(status.slots_available_after.is_empty());
        assert_eq!(
            status.slots_running,
            vec![vec![
                "5721".to_owned(),
                "536870912".to_owned(),
                "180".to_owned(),
                "2024-05-01T11:59:58Z".to_owned(),
            ]]
        );
    }

    #[test]
    fn unrecognized_lines_count_as_running_queries() {
        let status = parse_status("Connected as: 1\nAnnounced endpoint: none\nRate limit: 2\n");
        assert_eq!(status.rate_limit, 2);
        assert_eq!(status.slots_running.len(), 1);
        assert!(!crate::backoff::should_retry_immediately(&status));

        let status = parse_status("Connected as: 1\n\nRate limit: 3\n");
        assert_eq!(status.slots_running, vec![vec![String::new()]]);
    }

    #[test]
    fn terminating_newline_does_not_add_a_line() {
        let status = parse_status("Connected as: 1\nRate limit: 2\n");
        assert!(status.slots_running.is_empty());
    }

    #[test]
    fn parsing_is_idempotent() {
        assert_eq!(parse_status(SATURATED), parse_status(SATURATED));
        assert_eq!(parse_status(BUSY), parse_status(BUSY));
    }

    #[test]
    fn later_duplicate_fields_win() {
        let status = parse_status("Connected as: a\nRate limit: 1\nConnected as: b\nRate limit: 4\n");
        assert_eq!(status.client_id.as_deref(), Some("b"));
        assert_eq!(status.rate_limit, 4);
    }

    #[test]
    fn missing_connected_line_leaves_client_id_empty() {
        let status = parse_status("Current time: 2024-05-01T12:00:00Z\nRate limit: 2\n");
        assert!(status.client_id.is_none());
        assert_eq!(status.rate_limit, 2);
    }

    #[test]
    fn garbage_never_panics() {
        let status = parse_status("Connected\nRate limit: many\nSlot x\nCurrent time: yesterday\n");
        assert!(status.client_id.is_none());
        assert_eq!(status.rate_limit, 0);
        assert!(status.current_time.is_none());
        assert!(status.slots_available_after.is_empty());
    }

    #[test]
    fn status_url_replaces_interpreter_segment() {
        let url = status_url("https://overpass-api.de/api/interpreter").expect("valid url");
        assert_eq!(url.as_str(), "https://overpass-api.de/api/status");

        let url = status_url("http://127.0.0.1:8080/api/interpreter/").expect("valid url");
        assert_eq!(url.as_str(), "http://127.0.0.1:8080/api/status");
    }

    #[test]
    fn status_url_rejects_garbage() {
        assert!(status_url("not a url").is_err());
    }
}
