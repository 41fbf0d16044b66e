//! Classification of submission endpoint responses.

use serde_json::Value;

use crate::backend::BackendResponse;
use crate::error::TransportError;

/// What a successful submission response means.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseOutcome {
    /// The backend declined the email.
    Skipped,
    /// Accepted for asynchronous processing under `session_id`.
    Processing { session_id: String },
    /// Processed synchronously.
    Completed,
    /// The backend answered 2xx but reported an error in the body.
    Rejected { message: String },
}

/// Classify a response. `known_session` is the id the client already
/// holds, if any.
///
/// Skip wins over processing, and a 202 means processing whatever the
/// body says otherwise.
pub fn classify_response(
    response: &BackendResponse,
    known_session: Option<&str>,
) -> Result<ResponseOutcome, TransportError> {
    if !(200..300).contains(&response.status) {
        return Err(TransportError::Status {
            endpoint: response.endpoint.clone(),
            status: response.status,
            body: response.raw.clone(),
        });
    }

    let accepted = response.status == 202;
    let Some(body) = response.body.as_ref().and_then(Value::as_object) else {
        return match known_session {
            Some(id) if accepted => Ok(ResponseOutcome::Processing {
                session_id: id.to_string(),
            }),
            _ => Err(TransportError::MalformedBody {
                endpoint: response.endpoint.clone(),
                reason: "expected a JSON object".to_string(),
            }),
        };
    };

    let status = body.get("status").and_then(Value::as_str).unwrap_or_default();

    if status == "skipped" || body.get("skipped").is_some_and(truthy) {
        return Ok(ResponseOutcome::Skipped);
    }

    if accepted || status == "processing" {
        let session_id = body
            .get("session_id")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .or(known_session);
        return match session_id {
            Some(id) => Ok(ResponseOutcome::Processing {
                session_id: id.to_string(),
            }),
            None => Err(TransportError::MissingSession {
                endpoint: response.endpoint.clone(),
            }),
        };
    }

    if status == "error" {
        let message = ["error", "message"]
            .iter()
            .find_map(|k| body.get(*k).and_then(Value::as_str))
            .unwrap_or("Unknown error")
            .to_string();
        return Ok(ResponseOutcome::Rejected { message });
    }

    Ok(ResponseOutcome::Completed)
}

/// Loose truthiness as the backends emit it: `true`, non-zero numbers,
/// non-empty strings, and any array or object.
fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn resp(status: u16, body: Value) -> BackendResponse {
        BackendResponse::json("/api/submit", status, body)
    }

    #[test]
    fn non_success_status_fails() {
        let err = classify_response(&resp(500, json!({"status": "processing"})), Some("S1"))
            .unwrap_err();
        assert!(matches!(err, TransportError::Status { status: 500, .. }));
    }

    #[test]
    fn accepted_with_session_id() {
        let outcome =
            classify_response(&resp(202, json!({"status": "processing", "session_id": "S1"})), None)
                .unwrap();
        assert_eq!(
            outcome,
            ResponseOutcome::Processing {
                session_id: "S1".into()
            }
        );
    }

    #[test]
    fn skip_takes_precedence_over_processing() {
        let outcome = classify_response(
            &resp(202, json!({"status": "processing", "skipped": true, "session_id": "S1"})),
            None,
        )
        .unwrap();
        assert_eq!(outcome, ResponseOutcome::Skipped);

        let outcome = classify_response(&resp(200, json!({"status": "skipped"})), None).unwrap();
        assert_eq!(outcome, ResponseOutcome::Skipped);
    }

    #[test]
    fn falsy_skipped_flag_is_ignored() {
        let outcome = classify_response(&resp(200, json!({"skipped": false})), None).unwrap();
        assert_eq!(outcome, ResponseOutcome::Completed);
        let outcome = classify_response(&resp(200, json!({"skipped": 0})), None).unwrap();
        assert_eq!(outcome, ResponseOutcome::Completed);
    }

    #[test]
    fn accepted_status_is_authoritative() {
        let outcome =
            classify_response(&resp(202, json!({"status": "done"})), Some("S9")).unwrap();
        assert_eq!(
            outcome,
            ResponseOutcome::Processing {
                session_id: "S9".into()
            }
        );
    }

    #[test]
    fn processing_falls_back_to_known_session() {
        let outcome =
            classify_response(&resp(200, json!({"status": "processing"})), Some("S2")).unwrap();
        assert_eq!(
            outcome,
            ResponseOutcome::Processing {
                session_id: "S2".into()
            }
        );
    }

    #[test]
    fn processing_without_any_session_fails() {
        let err = classify_response(&resp(202, json!({})), None).unwrap_err();
        assert!(matches!(err, TransportError::MissingSession { .. }));
    }

    #[test]
    fn synchronous_success_and_error() {
        let outcome =
            classify_response(&resp(200, json!({"status": "done", "policy": "x"})), None).unwrap();
        assert_eq!(outcome, ResponseOutcome::Completed);

        let outcome = classify_response(
            &resp(200, json!({"status": "error", "message": "not an ACORD form"})),
            None,
        )
        .unwrap();
        assert_eq!(
            outcome,
            ResponseOutcome::Rejected {
                message: "not an ACORD form".into()
            }
        );
    }

    #[test]
    fn non_object_body() {
        let html = BackendResponse::new("/api/submit", 200, "<html>ok</html>");
        let err = classify_response(&html, None).unwrap_err();
        assert!(matches!(err, TransportError::MalformedBody { .. }));

        let empty = BackendResponse::new("/api/process", 202, "");
        let outcome = classify_response(&empty, Some("S1")).unwrap();
        assert_eq!(
            outcome,
            ResponseOutcome::Processing {
                session_id: "S1".into()
            }
        );
    }
}
