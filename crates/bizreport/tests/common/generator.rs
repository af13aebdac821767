//! Scripted content generator for pipeline tests.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;

use bizreport::generator::{ContentGenerator, GeneratedContent, GenerationError, GenerationRequest};
use bizreport::ShutdownSignal;

/// Returns a fixed body per report type and records every request.
///
/// Report types added with [`FakeGenerator::failing`] return an error instead.
pub struct FakeGenerator {
    failing: HashSet<String>,
    body_chars: usize,
    stop_after: Option<(usize, ShutdownSignal)>,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl FakeGenerator {
    pub fn new() -> Self {
        Self {
            failing: HashSet::new(),
            body_chars: 0,
            stop_after: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Fail generation for this report type.
    pub fn failing(mut self, report_type: &str) -> Self {
        self.failing.insert(report_type.to_string());
        self
    }

    /// Pad every body to at least this many characters.
    pub fn with_body_chars(mut self, chars: usize) -> Self {
        self.body_chars = chars;
        self
    }

    /// Request shutdown once `calls` generations have been served.
    pub fn stop_after(mut self, calls: usize, shutdown: ShutdownSignal) -> Self {
        self.stop_after = Some((calls, shutdown));
        self
    }

    /// Report types requested so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.requests
            .lock()
            .expect("request log poisoned")
            .iter()
            .map(|r| r.report_type.clone())
            .collect()
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().expect("request log poisoned").clone()
    }
}

#[async_trait]
impl ContentGenerator for FakeGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedContent, GenerationError> {
        let served = {
            let mut requests = self.requests.lock().expect("request log poisoned");
            requests.push(request.clone());
            requests.len()
        };

        if let Some((calls, shutdown)) = &self.stop_after {
            if served >= *calls {
                shutdown.request();
            }
        }

        if self.failing.contains(&request.report_type) {
            return Err(GenerationError::Status {
                status: 503,
                body: format!("{} unavailable", request.report_type),
            });
        }

        let mut body = format!("<h2>{}</h2>", request.title);
        if body.len() < self.body_chars {
            body.push_str(&"x".repeat(self.body_chars - body.len()));
        }
        Ok(GeneratedContent {
            body,
            prompt_tokens: 100,
            completion_tokens: 50,
        })
    }
}
