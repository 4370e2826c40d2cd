use crate::error::EngineError;
use crate::server::api::{self, ServerState};
use crate::server::ratelimit::RateLimitDecision;

pub struct HttpResponse {
    pub status_code: u16,
    pub status_text: &'static str,
    pub content_type: &'static str,
    pub headers: Vec<(&'static str, String)>,
    pub body: String,
}

impl HttpResponse {
    pub fn to_http_string(&self) -> String {
        let mut extra = String::new();
        for (name, value) in &self.headers {
            extra.push_str(name);
            extra.push_str(": ");
            extra.push_str(value);
            extra.push_str("\r\n");
        }
        format!(
            "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\n{}Connection: close\r\n\r\n{}",
            self.status_code,
            self.status_text,
            self.content_type,
            self.body.len(),
            extra,
            self.body
        )
    }

    /// Header lookup, case-insensitive. Test hook.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(header, _)| header.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Pure request router. Every response carries the caller's current
/// `X-RateLimit-*` state; only `/api/simulate` consumes budget.
pub fn route_request(
    method: &str,
    path: &str,
    body: &str,
    caller: &str,
    state: &ServerState,
) -> HttpResponse {
    match (method, path) {
        ("GET", "/api/health") => {
            let decision = state.limiter.peek(caller);
            match api::health_payload() {
                Ok(payload) => ok_response(payload, &decision),
                Err(err) => error_response(
                    500,
                    "Internal Server Error",
                    &err.to_string(),
                    &decision,
                ),
            }
        }
        ("POST", "/api/simulate") => {
            let decision = state.limiter.check(caller);
            if !decision.allowed {
                let err = EngineError::RateLimited {
                    reset_unix: decision.reset_unix,
                };
                return engine_error_response(&err, &decision);
            }
            match api::simulate_payload(body, state) {
                Ok(payload) => ok_response(payload, &decision),
                Err(err) => engine_error_response(&err, &decision),
            }
        }
        _ => {
            let decision = state.limiter.peek(caller);
            error_response(404, "Not Found", "Route not found", &decision)
        }
    }
}

fn ok_response(body: String, decision: &RateLimitDecision) -> HttpResponse {
    HttpResponse {
        status_code: 200,
        status_text: "OK",
        content_type: "application/json",
        headers: decision.headers(),
        body,
    }
}

fn engine_error_response(err: &EngineError, decision: &RateLimitDecision) -> HttpResponse {
    let (status_code, status_text) = err.http_status();
    error_response(status_code, status_text, &err.to_string(), decision)
}

fn error_response(
    status_code: u16,
    status_text: &'static str,
    message: &str,
    decision: &RateLimitDecision,
) -> HttpResponse {
    let body = serde_json::json!({ "ok": false, "error": message });
    HttpResponse {
        status_code,
        status_text,
        content_type: "application/json",
        headers: decision.headers(),
        body: serde_json::to_string(&body)
            .unwrap_or_else(|_| "{\"ok\":false,\"error\":\"unknown error\"}".to_string()),
    }
}
