use serde::Deserialize;

use crate::{wire, CsvTable, OverpassError, Result};

const BAD_REQUEST_OPEN: &str = "</strong>: ";
const BAD_REQUEST_CLOSE: &str = " </p>";

/// Extracts the error messages from the HTML page served with a 400.
///
/// Each message sits between `</strong>: ` and ` </p>`; `&quot;` entities
/// are turned back into quotes.
pub(crate) fn extract_bad_request_messages(html: &str) -> Vec<String> {
    let mut messages = Vec::new();
    let mut rest = html;

    while let Some(start) = rest.find(BAD_REQUEST_OPEN) {
        let after = &rest[start + BAD_REQUEST_OPEN.len()..];
        let Some(end) = after.find(BAD_REQUEST_CLOSE) else {
            break;
        };
        messages.push(after[..end].replace("&quot;", "\""));
        rest = &after[end + BAD_REQUEST_CLOSE.len()..];
    }

    messages
}

/// Fails with [`OverpassError::Remark`] if a JSON body carries a string `remark`.
pub(crate) fn check_json_remark(value: &serde_json::Value) -> Result<()> {
    if !value.is_object() {
        return Ok(());
    }
    let Ok(envelope) = wire::RemarkEnvelope::deserialize(value) else {
        return Ok(());
    };
    match envelope.remark {
        Some(serde_json::Value::String(remark)) => Err(OverpassError::Remark(remark)),
        _ => Ok(()),
    }
}

/// Fails with [`OverpassError::Remark`] if an XML body contains a `<remark>` element.
pub(crate) fn check_xml_remark(xml: &str) -> Result<()> {
    let Some(start) = xml.find("<remark>") else {
        return Ok(());
    };
    let after = &xml[start + "<remark>".len()..];
    let end = after.find("</remark>").unwrap_or(after.len());
    Err(OverpassError::Remark(after[..end].trim().to_owned()))
}

pub(crate) fn decode_utf8(body: &[u8]) -> Result<String> {
    std::str::from_utf8(body)
        .map(str::to_owned)
        .map_err(|err| OverpassError::Decode(format!("response body is not valid UTF-8: {err}")))
}

pub(crate) fn decode_json(body: &str) -> Result<serde_json::Value> {
    let value = serde_json::from_str::<serde_json::Value>(body)
        .map_err(|err| OverpassError::Decode(format!("invalid JSON response: {err}")))?;
    check_json_remark(&value)?;
    Ok(value)
}

pub(crate) fn decode_csv(text: &str, separator: char) -> CsvTable {
    let mut lines = text
        .lines()
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !line.is_empty());

    let split = |line: &str| line.split(separator).map(str::to_owned).collect::<Vec<_>>();

    CsvTable {
        header: lines.next().map(split).unwrap_or_default(),
        rows: lines.map(split).collect(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::{decode, OverpassError};

    const BAD_REQUEST_PAGE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<body>
<p>The data included in this document is from www.openstreetmap.org.</p>
<p><strong style="color:#FF0000">Error</strong>: line 1: parse error: Unknown type &quot;nod&quot; </p>
<p><strong style="color:#FF0000">Error</strong>: line 1: parse error: An empty query is not allowed </p>
</body>"#;

    #[test]
    fn extracts_every_bad_request_message_with_quotes_unescaped() {
        let messages = decode::extract_bad_request_messages(BAD_REQUEST_PAGE);
        assert_eq!(
            messages,
            vec![
                "line 1: parse error: Unknown type \"nod\"".to_owned(),
                "line 1: parse error: An empty query is not allowed".to_owned(),
            ]
        );
    }

    #[test]
    fn bad_request_without_fragments_yields_no_messages() {
        assert!(decode::extract_bad_request_messages("<html>oops</html>").is_empty());
    }

    #[test]
    fn json_remark_is_an_error() {
        let err = decode::check_json_remark(&json!({
            "version": 0.6,
            "elements": [],
            "remark": "runtime error: Query timed out in \"query\" at line 1 after 2 seconds."
        }))
        .expect_err("remark must fail");
        match err {
            OverpassError::Remark(message) => assert!(message.starts_with("runtime error")),
            other => panic!("expected remark error, got {other:?}"),
        }
    }

    #[test]
    fn json_without_remark_passes() {
        decode::check_json_remark(&json!({"elements": []})).expect("no remark");
        decode::check_json_remark(&json!([1, 2, 3])).expect("not an object");
    }

    #[test]
    fn invalid_json_is_a_decode_error() {
        let err = decode::decode_json("<osm/>").expect_err("must fail");
        assert!(matches!(err, OverpassError::Decode(_)));
    }

    #[test]
    fn invalid_utf8_is_a_decode_error() {
        let err = decode::decode_utf8(&[0x3c, 0x6f, 0xff, 0xfe, 0x3e]).expect_err("must fail");
        assert!(matches!(err, OverpassError::Decode(_)));
        assert_eq!(decode::decode_utf8(b"<osm/>").expect("valid"), "<osm/>");
    }

    #[test]
    fn xml_remark_is_an_error() {
        let xml = r#"<osm version="0.6">
  <remark> runtime error: Query run out of memory using about 2048 MB of RAM. </remark>
</osm>"#;
        let err = decode::check_xml_remark(xml).expect_err("remark must fail");
        match err {
            OverpassError::Remark(message) => assert_eq!(
                message,
                "runtime error: Query run out of memory using about 2048 MB of RAM."
            ),
            other => panic!("expected remark error, got {other:?}"),
        }
        decode::check_xml_remark("<osm><node id=\"1\"/></osm>").expect("no remark");
    }

    #[test]
    fn csv_splits_header_and_rows() {
        let table = decode::decode_csv("@id\tname\r\n1\tBerlin\n2\t\n", '\t');
        assert_eq!(table.header, vec!["@id", "name"]);
        assert_eq!(
            table.rows,
            vec![
                vec!["1".to_owned(), "Berlin".to_owned()],
                vec!["2".to_owned(), String::new()],
            ]
        );
    }
}
