//! Orchestrator protocol: register, invoke and view.
//!
//! One endpoint serves all three operations, selected by HTTP method:
//! `PUT` registers, `POST` invokes, `GET` views. Anything else is declined
//! and the caller answers with 405.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use axum::http::Method;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, instrument, warn};

use crate::adapters::Registrar;
use crate::domain::{derive_run_id, Event, RunReport, RunState, WorkflowRun};
use crate::error::{Error, Result};

use super::memo::StepMemo;
use super::workflow::{RegistrationDescriptor, WorkflowRegistry};

/// Operation selected from an inbound request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolAction {
    Register { deploy_id: Option<String> },
    Invoke { fn_id: Option<String>, step_id: Option<String> },
    View { introspect: bool },
}

impl ProtocolAction {
    /// Select the action for a request; `None` means the method is not handled
    pub fn select(method: &Method, query: &HashMap<String, String>) -> Option<Self> {
        if *method == Method::PUT {
            Some(Self::Register {
                deploy_id: query.get("deployId").cloned(),
            })
        } else if *method == Method::POST {
            Some(Self::Invoke {
                fn_id: query.get("fnId").cloned(),
                step_id: query.get("stepId").cloned(),
            })
        } else if *method == Method::GET {
            Some(Self::View {
                introspect: query.contains_key("introspect"),
            })
        } else {
            None
        }
    }
}

/// Body of an invoke request
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvokeBody {
    pub event: Event,

    #[serde(default)]
    pub memo: StepMemo,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
}

/// Payload reported to the orchestrator on registration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    /// Where the orchestrator should send invoke/view calls
    pub url: String,
    pub app_name: String,
    pub deploy_id: Option<String>,
    pub functions: Vec<RegistrationDescriptor>,
}

/// Static facts about this deployment, shown by `view`
#[derive(Debug, Clone, Default)]
pub struct AdapterSettings {
    pub app_name: String,

    /// Public URL of this endpoint; derived from the request when unset
    pub serve_url: Option<String>,

    pub has_event_key: bool,
    pub has_signing_key: bool,
    pub production: bool,

    /// Setting name to redacted display value
    pub config_summary: BTreeMap<String, String>,
}

/// Transport-neutral request
#[derive(Debug, Clone)]
pub struct ProtocolRequest {
    pub method: Method,
    pub query: HashMap<String, String>,

    /// URL this request arrived at, used as the registration callback
    pub request_url: String,
    pub body: Vec<u8>,
}

/// Transport-neutral response; `body` is `None` for an empty body
#[derive(Debug, Clone, PartialEq)]
pub struct ProtocolResponse {
    pub status: u16,
    pub body: Option<Value>,
}

impl ProtocolResponse {
    fn json(status: u16, body: Value) -> Self {
        Self {
            status,
            body: Some(body),
        }
    }

    fn error(status: u16, error: &Error) -> Self {
        Self::json(status, json!({ "error": error.to_string(), "kind": error.kind() }))
    }
}

/// Serves the workflow registry to an external orchestrator
pub struct ProtocolAdapter {
    registry: Arc<WorkflowRegistry>,
    registrar: Option<Arc<dyn Registrar>>,
    settings: AdapterSettings,
}

impl ProtocolAdapter {
    pub fn new(registry: Arc<WorkflowRegistry>, settings: AdapterSettings) -> Self {
        Self {
            registry,
            registrar: None,
            settings,
        }
    }

    /// Forward registrations to the orchestrator through `registrar`
    pub fn with_registrar(mut self, registrar: Arc<dyn Registrar>) -> Self {
        self.registrar = Some(registrar);
        self
    }

    pub fn registry(&self) -> &WorkflowRegistry {
        &self.registry
    }

    /// Describe all workflows and report them to the orchestrator (if any)
    #[instrument(skip(self))]
    pub async fn register(
        &self,
        callback_url: &str,
        deploy_id: Option<&str>,
    ) -> Result<Registration> {
        let registration = Registration {
            url: self
                .settings
                .serve_url
                .clone()
                .unwrap_or_else(|| callback_url.to_string()),
            app_name: self.settings.app_name.clone(),
            deploy_id: deploy_id.map(str::to_string),
            functions: self.registry.descriptors(),
        };

        match self.registrar {
            Some(ref registrar) => registrar.register(&registration).await?,
            None => info!("No orchestrator configured, skipping remote registration"),
        }

        Ok(registration)
    }

    /// Run one workflow for the event and memo in `body`.
    ///
    /// Only an unknown `fn_id` is an `Err`; step failures are reported in
    /// the returned [`RunReport`].
    #[instrument(skip(self, body), fields(fn_id = %fn_id))]
    pub async fn invoke(
        &self,
        fn_id: &str,
        step_id: Option<&str>,
        body: InvokeBody,
    ) -> Result<RunReport> {
        let definition = self
            .registry
            .get(fn_id)
            .ok_or_else(|| Error::UnknownFunction(fn_id.to_string()))?;

        let InvokeBody {
            event,
            memo,
            run_id,
        } = body;
        let run_id = run_id.unwrap_or_else(|| derive_run_id(&event));

        info!(%run_id, step_id = ?step_id, memoized = memo.len(), "Invoking workflow");
        Ok(definition
            .execute(WorkflowRun::new(run_id, event, memo))
            .await)
    }

    /// Diagnostic metadata; read-only
    pub fn view(&self, introspect: bool) -> Value {
        if introspect {
            json!({
                "functions": self.registry.descriptors(),
                "hasEventKey": self.settings.has_event_key,
                "hasSigningKey": self.settings.has_signing_key,
                "config": self.settings.config_summary,
            })
        } else {
            json!({
                "message": format!("{} is serving {} function(s)", self.settings.app_name, self.registry.len()),
                "functionCount": self.registry.len(),
                "mode": if self.settings.production { "production" } else { "dev" },
            })
        }
    }

    /// Dispatch a request; `None` means the method is not handled
    pub async fn handle(&self, request: ProtocolRequest) -> Option<ProtocolResponse> {
        let action = ProtocolAction::select(&request.method, &request.query)?;

        let response = match action {
            ProtocolAction::Register { deploy_id } => {
                match self.register(&request.request_url, deploy_id.as_deref()).await {
                    Ok(registration) => ProtocolResponse::json(200, json!(registration.functions)),
                    Err(e) => {
                        warn!(error = %e, "Registration failed");
                        ProtocolResponse::error(500, &e)
                    }
                }
            }
            ProtocolAction::Invoke { fn_id, step_id } => {
                self.handle_invoke(fn_id, step_id, &request.body).await
            }
            ProtocolAction::View { introspect } => {
                ProtocolResponse::json(200, self.view(introspect))
            }
        };

        Some(response)
    }

    async fn handle_invoke(
        &self,
        fn_id: Option<String>,
        step_id: Option<String>,
        body: &[u8],
    ) -> ProtocolResponse {
        let Some(fn_id) = fn_id else {
            return ProtocolResponse::json(400, json!({ "error": "Missing fnId" }));
        };

        let body: InvokeBody = match serde_json::from_slice(body) {
            Ok(body) => body,
            Err(e) => {
                return ProtocolResponse::json(
                    400,
                    json!({ "error": format!("Invalid invoke body: {}", e) }),
                )
            }
        };

        match self.invoke(&fn_id, step_id.as_deref(), body).await {
            Ok(report) => report_response(report),
            Err(e) => ProtocolResponse::error(404, &e),
        }
    }
}

fn report_response(report: RunReport) -> ProtocolResponse {
    let RunReport {
        run_id,
        state,
        memo,
        steps_executed,
    } = report;

    match state {
        RunState::Completed { result } => ProtocolResponse::json(
            200,
            json!({
                "runId": run_id,
                "result": result,
                "memo": memo,
                "stepsExecuted": steps_executed,
            }),
        ),
        RunState::Failed { step, failure } => ProtocolResponse::json(
            500,
            json!({
                "runId": run_id,
                "error": Error::from(failure.clone()).to_string(),
                "kind": failure.kind,
                "step": step,
                "memo": memo,
                "stepsExecuted": steps_executed,
            }),
        ),
    }
}
