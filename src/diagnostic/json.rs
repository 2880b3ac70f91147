use super::{line_col, Diagnostic, Severity};

/// One diagnostic as one JSON object (NDJSON framing is the caller's job).
pub fn render(d: &Diagnostic) -> String {
    let severity = match d.severity {
        Severity::Error => "error",
        Severity::Warning => "warning",
    };

    let labels: Vec<serde_json::Value> = d
        .labels
        .iter()
        .map(|l| {
            let mut obj = serde_json::json!({
                "start": l.span.start,
                "end": l.span.end,
                "message": l.message,
            });
            if let Some(source) = &d.source {
                let (line, col) = line_col(source, l.span.start);
                obj["line"] = serde_json::Value::from(line);
                obj["col"] = serde_json::Value::from(col);
            }
            obj
        })
        .collect();

    let mut obj = serde_json::json!({
        "severity": severity,
        "message": d.message,
        "labels": labels,
        "notes": d.notes,
    });
    if let Some(code) = d.code {
        obj["code"] = serde_json::Value::String(code.to_string());
    }

    serde_json::to_string(&obj).unwrap_or_else(|_| {
        r#"{"severity":"error","message":"internal error serializing diagnostic"}"#.to_string()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> serde_json::Value {
        serde_json::from_str(s).expect("valid JSON")
    }

    #[test]
    fn basic_error_shape() {
        let v = parse(&render(&Diagnostic::error("division by zero").with_code("WS-R005")));
        assert_eq!(v["severity"], "error");
        assert_eq!(v["message"], "division by zero");
        assert_eq!(v["code"], "WS-R005");
        assert!(v["labels"].as_array().unwrap().is_empty());
    }

    #[test]
    fn label_gets_line_and_col_with_source() {
        let d = Diagnostic::error("bad").with_span(3..4, "here").with_source("+[\nx]".to_string());
        let v = parse(&render(&d));
        let label = &v["labels"][0];
        assert_eq!(label["start"], 3);
        assert_eq!(label["end"], 4);
        assert_eq!(label["line"], 2);
        assert_eq!(label["col"], 1);
    }

    #[test]
    fn label_without_source_has_no_line_col() {
        let d = Diagnostic::error("bad").with_span(3..4, "here");
        let v = parse(&render(&d));
        assert!(v["labels"][0].get("line").is_none());
    }

    #[test]
    fn code_key_absent_when_unset() {
        let v = parse(&render(&Diagnostic::error("bad")));
        assert!(v.get("code").is_none() || v["code"].is_null());
    }
}
