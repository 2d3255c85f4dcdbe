use serde_json::Value;
use storage_integration_core::contract::{CallbackPayload, CallbackStatus, CallbackTarget};
use tracing::{debug, error, info, warn};

use crate::adapters::callback::CallbackTransport;

/// Sends the custom-resource response. Delivery problems are logged only:
/// the callback is the sole failure channel, so there is nowhere to escalate.
pub fn report_completion(
    transport: &dyn CallbackTransport,
    target: &CallbackTarget,
    log_stream_name: &str,
    status: CallbackStatus,
    reason: Option<String>,
    data: Value,
) -> CallbackPayload {
    let payload = CallbackPayload::new(target, status, reason, log_stream_name, data);
    let body = match payload.to_json() {
        Ok(body) => body,
        Err(error) => {
            error!(error = %error, "callback payload could not be serialized; callback not sent");
            return payload;
        }
    };
    debug!(body = %body, "callback response body");

    if target.response_url.is_empty() {
        warn!(
            request_id = %target.request_id,
            "event has no ResponseURL; callback not sent"
        );
        return payload;
    }

    match transport.put(&target.response_url, &body) {
        Ok(code) if (200..300).contains(&code) => {
            info!(status = ?status, http_status = code, "callback delivered");
        }
        Ok(code) => {
            warn!(status = ?status, http_status = code, "callback rejected");
        }
        Err(error) => {
            error!(status = ?status, error = %error, "callback delivery failed");
        }
    }
    payload
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use serde_json::json;
    use storage_integration_core::contract::empty_data;

    use super::*;

    struct RecordingTransport {
        puts: Mutex<Vec<(String, String)>>,
        response: Result<u16, String>,
    }

    impl RecordingTransport {
        fn new(response: Result<u16, String>) -> Self {
            Self {
                puts: Mutex::new(Vec::new()),
                response,
            }
        }

        fn puts(&self) -> Vec<(String, String)> {
            self.puts.lock().expect("poisoned mutex").clone()
        }
    }

    impl CallbackTransport for RecordingTransport {
        fn put(&self, url: &str, body: &str) -> Result<u16, String> {
            self.puts
                .lock()
                .expect("poisoned mutex")
                .push((url.to_string(), body.to_string()));
            self.response.clone()
        }
    }

    fn target(response_url: &str) -> CallbackTarget {
        CallbackTarget {
            response_url: response_url.to_string(),
            stack_id: "stack-1".to_string(),
            request_id: "req-1".to_string(),
            logical_resource_id: "Integration".to_string(),
            physical_resource_id: None,
        }
    }

    #[test]
    fn puts_serialized_payload_to_response_url() {
        let transport = RecordingTransport::new(Ok(200));
        report_completion(
            &transport,
            &target("https://callback.example/put"),
            "stream",
            CallbackStatus::Success,
            None,
            json!({"IntegrationName": "S3INTabc12"}),
        );

        let puts = transport.puts();
        assert_eq!(puts.len(), 1);
        assert_eq!(puts[0].0, "https://callback.example/put");
        let body: Value = serde_json::from_str(&puts[0].1).expect("valid json");
        assert_eq!(body["Status"], "SUCCESS");
        assert_eq!(body["RequestId"], "req-1");
        assert_eq!(body["Data"]["IntegrationName"], "S3INTabc12");
    }

    #[test]
    fn delivery_errors_are_swallowed() {
        let transport = RecordingTransport::new(Err("connection reset".to_string()));
        let payload = report_completion(
            &transport,
            &target("https://callback.example/put"),
            "stream",
            CallbackStatus::Failed,
            Some("boom".to_string()),
            empty_data(),
        );
        assert_eq!(payload.status, CallbackStatus::Failed);
        assert_eq!(transport.puts().len(), 1);
    }

    #[test]
    fn missing_response_url_skips_delivery() {
        let transport = RecordingTransport::new(Ok(200));
        report_completion(
            &transport,
            &target(""),
            "stream",
            CallbackStatus::Success,
            None,
            empty_data(),
        );
        assert!(transport.puts().is_empty());
    }
}
