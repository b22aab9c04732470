use std::collections::HashMap;
use std::io::{BufRead, Write};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::analysis::config::AnalysisConfig;
use crate::analysis::orchestrator::AnalysisOrchestrator;
use crate::collab::delivery::{DeliverySink, DiffTelemetry};
use crate::collab::store::ResultStore;
use crate::dom::dom_model::DomPage;

pub const DEFAULT_SESSION: &str = "default";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Action {
    Analyze,
    GetLastResult,
    ResetBaseline,
    GetDiffSummary,
}

/// One request line.
///
/// `config` replaces the handler's default config; `options` is a partial
/// config merged on top of whichever config applies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub action: Action,
    #[serde(default)]
    pub config: Option<AnalysisConfig>,
    #[serde(default)]
    pub options: Option<Value>,
    #[serde(default)]
    pub page: Option<DomPage>,
    #[serde(default)]
    pub session: Option<String>,
}

impl AnalysisRequest {
    pub fn new(action: Action) -> Self {
        Self {
            action,
            config: None,
            options: None,
            page: None,
            session: None,
        }
    }

    pub fn with_page(mut self, page: DomPage) -> Self {
        self.page = Some(page);
        self
    }

    pub fn with_options(mut self, options: Value) -> Self {
        self.options = Some(options);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AnalysisResponse {
    pub fn ok(data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(message: impl ToString) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.to_string()),
        }
    }
}

// ============================================================================
// Handler
// ============================================================================

/// Builds the orchestrator for a session the handler has not seen yet.
pub type OrchestratorFactory = Box<dyn Fn() -> AnalysisOrchestrator>;

/// Routes requests to the orchestrator, the result store and the optional
/// delivery sink. Never panics on bad input: every failure is an error
/// response.
///
/// Each session gets its own orchestrator, so diff baselines never cross
/// sessions.
pub struct RequestHandler {
    factory: OrchestratorFactory,
    orchestrators: HashMap<String, AnalysisOrchestrator>,
    store: Box<dyn ResultStore>,
    delivery: Option<Box<dyn DeliverySink>>,
    config: AnalysisConfig,
    session: String,
}

impl RequestHandler {
    pub fn new(store: Box<dyn ResultStore>) -> Self {
        Self {
            factory: Box::new(AnalysisOrchestrator::default),
            orchestrators: HashMap::new(),
            store,
            delivery: None,
            config: AnalysisConfig::default(),
            session: DEFAULT_SESSION.to_string(),
        }
    }

    pub fn with_factory(mut self, factory: impl Fn() -> AnalysisOrchestrator + 'static) -> Self {
        self.factory = Box::new(factory);
        self
    }

    pub fn with_delivery(mut self, delivery: Box<dyn DeliverySink>) -> Self {
        self.delivery = Some(delivery);
        self
    }

    pub fn with_config(mut self, config: AnalysisConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_session(mut self, session: &str) -> Self {
        self.session = session.to_string();
        self
    }

    pub fn handle_line(&mut self, line: &str) -> AnalysisResponse {
        match serde_json::from_str::<AnalysisRequest>(line) {
            Ok(request) => self.handle(request),
            Err(e) => AnalysisResponse::err(format!("invalid request: {e}")),
        }
    }

    pub fn handle(&mut self, request: AnalysisRequest) -> AnalysisResponse {
        let session = request.session.clone().unwrap_or_else(|| self.session.clone());
        let outcome = match request.action {
            Action::Analyze => self.analyze(&session, request),
            Action::GetLastResult => self.last_result(&session),
            Action::ResetBaseline => {
                if let Some(orchestrator) = self.orchestrators.get_mut(&session) {
                    orchestrator.reset_baseline();
                }
                Ok(serde_json::json!({ "reset": true }))
            }
            Action::GetDiffSummary => self.diff_summary(&session),
        };

        match outcome {
            Ok(data) => AnalysisResponse::ok(data),
            Err(message) => AnalysisResponse::err(message),
        }
    }

    fn analyze(&mut self, session: &str, request: AnalysisRequest) -> Result<Value, String> {
        let page = request
            .page
            .ok_or_else(|| "analyze requires a page".to_string())?;
        let base = request.config.unwrap_or_else(|| self.config.clone());
        let config = match request.options {
            Some(options) => merge_options(&base, options)?,
            None => base,
        };

        let factory = &self.factory;
        let orchestrator = self
            .orchestrators
            .entry(session.to_string())
            .or_insert_with(|| factory());
        let result = orchestrator
            .analyze_page(&page, &config)
            .map_err(|e| e.to_string())?;

        if let Err(e) = self.store.save(session, &result) {
            warn!(session, error = %e, "could not store result");
        }
        if let (Some(sink), Some(telemetry)) = (&self.delivery, DiffTelemetry::from_result(&result)) {
            if let Err(e) = sink.deliver(&telemetry) {
                warn!(error = %e, "telemetry delivery failed");
            }
        }

        serde_json::to_value(&result).map_err(|e| e.to_string())
    }

    fn last_result(&self, session: &str) -> Result<Value, String> {
        match self.store.load(session).map_err(|e| e.to_string())? {
            Some(result) => serde_json::to_value(&result).map_err(|e| e.to_string()),
            None => Ok(Value::Null),
        }
    }

    fn diff_summary(&self, session: &str) -> Result<Value, String> {
        let telemetry = self
            .store
            .load(session)
            .map_err(|e| e.to_string())?
            .and_then(|r| DiffTelemetry::from_result(&r));
        match telemetry {
            Some(t) => serde_json::to_value(&t).map_err(|e| e.to_string()),
            None => Ok(Value::Null),
        }
    }

    /// Answer one JSON request per input line until the input ends.
    pub fn serve<R: BufRead, W: Write>(&mut self, input: R, mut output: W) -> std::io::Result<()> {
        info!(session = %self.session, "serving analysis requests");
        for line in input.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let response = self.handle_line(line.trim());
            let json = serde_json::to_string(&response)
                .unwrap_or_else(|e| format!("{{\"success\":false,\"error\":\"{e}\"}}"));
            writeln!(output, "{json}")?;
            output.flush()?;
        }
        Ok(())
    }
}

/// Overlay the keys of `options` on `base`.
fn merge_options(base: &AnalysisConfig, options: Value) -> Result<AnalysisConfig, String> {
    let Value::Object(overrides) = options else {
        return Err("options must be an object".to_string());
    };
    let mut merged = serde_json::to_value(base).map_err(|e| e.to_string())?;
    if let Value::Object(fields) = &mut merged {
        for (key, value) in overrides {
            fields.insert(key, value);
        }
    }
    serde_json::from_value(merged).map_err(|e| format!("invalid options: {e}"))
}
