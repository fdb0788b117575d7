//! The request server.
//!
//! The server reads one request per line, answers each with exactly one
//! envelope line, and stops at end of input (or on a shutdown signal when
//! run with [`Server::run_until_shutdown`]).
//!
//! # Method resolution
//!
//! Built-in methods are resolved first:
//!
//! - `listTools`
//! - `listResources`, `resources/read`
//! - `listPrompts`, `prompts/get`
//!
//! Any other method name is looked up in the [`RequestRouter`].

use std::io;
use std::time::Instant;

use serde::Serialize;
use serde_json::{json, Map, Value};
use tokio::io::{AsyncBufRead, AsyncWrite};

use crate::config::Config;
use crate::error::{ConfigError, PromptError};
use crate::mcp::protocol::{Envelope, ErrorBody, ErrorCode, Meta, Request};
use crate::mcp::router::RequestRouter;
use crate::mcp::schema::SchemaValidator;
use crate::mcp::transport::{Incoming, LineTransport};
use crate::project::ProjectContext;
use crate::providers::{
    FilePromptProvider, FileResourceProvider, PromptAggregator, PromptProvider,
    ResourceAggregator, ResourceProvider, StaticPromptProvider, StaticResourceProvider,
};
use crate::tools;

type MethodResult = Result<Map<String, Value>, ErrorBody>;

/// Dispatches requests to built-in methods, tools and providers.
pub struct Server {
    router: RequestRouter,
    resources: ResourceAggregator,
    prompts: PromptAggregator,
    project: ProjectContext,
}

impl Server {
    /// Creates a server from its parts.
    #[must_use]
    pub const fn new(
        router: RequestRouter,
        resources: ResourceAggregator,
        prompts: PromptAggregator,
        project: ProjectContext,
    ) -> Self {
        Self {
            router,
            resources,
            prompts,
            project,
        }
    }

    /// Builds a server with every built-in tool and provider.
    ///
    /// Tools generated from configured commands are registered before the
    /// dedicated tools. Resources list the built-in workflow documents, then
    /// documentation files, then template files. Prompts list the built-in
    /// templates, then prompt files.
    ///
    /// # Errors
    ///
    /// Returns an error if a configured glob pattern is invalid.
    pub fn from_config(config: &Config, project: ProjectContext) -> Result<Self, ConfigError> {
        let mut router = RequestRouter::new();
        tools::register_all(&mut router, config);

        let file_provider = |scheme: &str, source: &crate::config::SourceConfig| {
            FileResourceProvider::new(
                scheme,
                source.roots.clone(),
                &source.pattern,
                project.clone(),
            )
            .map_err(|e| ConfigError::ValidationError {
                message: format!("Invalid {scheme} pattern '{}': {e}", source.pattern),
            })
        };

        let resources = ResourceAggregator::new()
            .with(StaticResourceProvider::builtin())
            .with(file_provider("docs", &config.documentation)?)
            .with(file_provider("templates", &config.templates)?);

        let prompts = PromptAggregator::new()
            .with(StaticPromptProvider::builtin())
            .with(FilePromptProvider::new(
                config.prompts.roots.clone(),
                project.clone(),
            ));

        tracing::debug!(
            tools = router.len(),
            resource_providers = resources.provider_count(),
            "Server configured"
        );

        Ok(Self::new(router, resources, prompts, project))
    }

    /// Returns the tool router.
    #[must_use]
    pub const fn router(&self) -> &RequestRouter {
        &self.router
    }

    /// Handles one request, producing its envelope.
    #[must_use]
    pub fn handle(&self, request: &Request) -> Envelope {
        let started = Instant::now();
        let result = self.route(&request.method, &request.params);
        let meta = Meta::from_duration(started.elapsed());

        if let Err(error) = &result {
            tracing::debug!(method = %request.method, code = error.code, "Request failed");
        }

        Envelope::from_result(request.id.clone(), result, meta)
    }

    fn route(&self, method: &str, params: &Value) -> MethodResult {
        match method {
            "listTools" => self.list_tools(params),
            "listResources" => self.list_resources(params),
            "resources/read" => self.read_resource(params),
            "listPrompts" => self.list_prompts(params),
            "prompts/get" => self.get_prompt(params),
            _ => self.router.dispatch(method, params, &self.project),
        }
    }

    fn list_tools(&self, params: &Value) -> MethodResult {
        validate(params, &no_params())?;
        field("tools", &self.router.list_tools())
    }

    fn list_resources(&self, params: &Value) -> MethodResult {
        validate(params, &no_params())?;
        field("resources", &self.resources.list())
    }

    fn read_resource(&self, params: &Value) -> MethodResult {
        validate(
            params,
            &json!({
                "type": "object",
                "properties": { "id": { "type": "string" } },
                "required": ["id"]
            }),
        )?;
        let id = params["id"].as_str().unwrap_or_default();

        match self.resources.read(id) {
            Ok(Some(content)) => object(&content),
            Ok(None) => Err(ErrorBody::with_message(
                ErrorCode::NotFound,
                format!("Resource not found: {id}"),
            )),
            Err(e) => {
                tracing::warn!(resource = %id, error = %e, "Failed to read resource");
                Err(ErrorBody::internal(e.to_string()))
            }
        }
    }

    fn list_prompts(&self, params: &Value) -> MethodResult {
        validate(params, &no_params())?;
        field("prompts", &self.prompts.list())
    }

    fn get_prompt(&self, params: &Value) -> MethodResult {
        validate(
            params,
            &json!({
                "type": "object",
                "properties": {
                    "name": { "type": "string" },
                    "arguments": { "type": "object" }
                },
                "required": ["name"]
            }),
        )?;
        let name = params["name"].as_str().unwrap_or_default();
        let arguments = params
            .get("arguments")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();

        let Some(bound) = self.prompts.get(name, &arguments) else {
            return Err(ErrorBody::with_message(
                ErrorCode::NotFound,
                format!("Prompt not found: {name}"),
            ));
        };
        let bound = bound.map_err(|e| {
            let PromptError::MissingArguments { names } = &e;
            ErrorBody::with_message(ErrorCode::ValidationFailed, e.to_string())
                .with_data(json!(names))
        })?;

        let mut result = Map::new();
        result.insert("name".to_string(), json!(bound.name()));
        result.insert("description".to_string(), json!(bound.description()));
        result.insert("messages".to_string(), to_value(&bound.messages())?);
        Ok(result)
    }

    /// Serves requests until end of input.
    ///
    /// # Errors
    ///
    /// Returns an error if reading or writing the transport fails.
    pub async fn run<R, W>(&self, transport: &mut LineTransport<R, W>) -> io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        loop {
            let incoming = transport.read().await?;
            if self.serve(incoming, transport).await? {
                return Ok(());
            }
        }
    }

    /// Serves requests until end of input or a shutdown signal.
    ///
    /// # Errors
    ///
    /// Returns an error if reading or writing the transport fails, or if the
    /// signal handlers cannot be installed.
    #[cfg(unix)]
    pub async fn run_until_shutdown<R, W>(
        &self,
        transport: &mut LineTransport<R, W>,
    ) -> io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sigterm = signal(SignalKind::terminate())?;

        loop {
            tokio::select! {
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT, shutting down");
                    return Ok(());
                }

                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM, shutting down");
                    return Ok(());
                }

                incoming = transport.read() => {
                    if self.serve(incoming?, transport).await? {
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Serves requests until end of input or a shutdown signal.
    ///
    /// # Errors
    ///
    /// Returns an error if reading or writing the transport fails.
    #[cfg(windows)]
    pub async fn run_until_shutdown<R, W>(
        &self,
        transport: &mut LineTransport<R, W>,
    ) -> io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);

        loop {
            tokio::select! {
                _ = &mut ctrl_c => {
                    tracing::info!("Received Ctrl+C, shutting down");
                    return Ok(());
                }

                incoming = transport.read() => {
                    if self.serve(incoming?, transport).await? {
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Answers one input line.
    ///
    /// Returns `true` once the input is closed.
    async fn serve<R, W>(
        &self,
        incoming: Incoming,
        transport: &mut LineTransport<R, W>,
    ) -> io::Result<bool>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        match incoming {
            Incoming::Closed => {
                tracing::info!("Input closed");
                Ok(true)
            }
            Incoming::Empty => Ok(false),
            Incoming::Malformed(envelope) => {
                transport.write(&envelope).await?;
                Ok(false)
            }
            Incoming::Request(request) => {
                tracing::debug!(method = %request.method, "Handling request");
                let envelope = self.handle(&request);
                transport.write(&envelope).await?;
                Ok(false)
            }
        }
    }
}

fn no_params() -> Value {
    json!({ "type": "object" })
}

fn validate(params: &Value, schema: &Value) -> Result<(), ErrorBody> {
    let violations = SchemaValidator::validate(params, schema);
    if violations.is_empty() {
        Ok(())
    } else {
        Err(ErrorBody::validation_failed(violations))
    }
}

fn to_value<T: Serialize + ?Sized>(value: &T) -> Result<Value, ErrorBody> {
    serde_json::to_value(value).map_err(|e| ErrorBody::internal(e.to_string()))
}

/// Serialises `value`, which must become a JSON object.
fn object<T: Serialize + ?Sized>(value: &T) -> MethodResult {
    match to_value(value)? {
        Value::Object(map) => Ok(map),
        _ => Err(ErrorBody::internal("result is not an object")),
    }
}

/// Wraps `value` as the single field `key` of a result object.
fn field<T: Serialize + ?Sized>(key: &str, value: &T) -> MethodResult {
    let mut result = Map::new();
    result.insert(key.to_string(), to_value(value)?);
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::protocol::RequestId;
    use crate::providers::{StaticResource, StaticResourceProvider};

    fn server() -> (tempfile::TempDir, Server) {
        let dir = tempfile::tempdir().unwrap();
        let project = ProjectContext::new(dir.path(), &[]).unwrap();
        let server = Server::from_config(&Config::default(), project).unwrap();
        (dir, server)
    }

    fn request(id: i64, method: &str, params: Value) -> Request {
        Request {
            id: RequestId::Number(id),
            method: method.to_string(),
            params,
        }
    }

    #[test]
    fn list_tools_in_registration_order() {
        let (_dir, server) = server();
        let env = server.handle(&request(1, "listTools", json!({})));

        let tools = env.result().unwrap()["tools"].as_array().unwrap().clone();
        let names: Vec<&str> = tools.iter().map(|t| t["name"].as_str().unwrap()).collect();
        assert_eq!(
            names,
            vec![
                "health/version",
                "project/state",
                "project/transition",
                "project/mode",
                "ish:featurePack:list"
            ]
        );
        assert!(tools[0].get("inputSchema").is_some());
        assert!(tools[0].get("kind").is_none());
    }

    #[test]
    fn tool_call_envelope() {
        let (_dir, server) = server();
        let env = server.handle(&request(7, "health/version", json!({})));

        assert_eq!(env.id, RequestId::Number(7));
        assert_eq!(env.result().unwrap()["protocolVersion"], "0.1");
        assert!(env.error_body().is_none());
    }

    #[test]
    fn unknown_method_is_not_found() {
        let (_dir, server) = server();
        let env = server.handle(&request(2, "no/such", json!({})));

        let error = env.error_body().unwrap();
        assert_eq!(error.code, 40400);
        assert_eq!(error.message, "Method not found: no/such");
    }

    #[test]
    fn builtin_params_are_validated() {
        let (_dir, server) = server();
        let env = server.handle(&request(3, "prompts/get", json!({ "arguments": {} })));

        let error = env.error_body().unwrap();
        assert_eq!(error.code, 40001);
        assert_eq!(error.data, json!(["$: missing required property 'name'"]));
    }

    #[test]
    fn get_builtin_prompt() {
        let (_dir, server) = server();
        let env = server.handle(&request(
            4,
            "prompts/get",
            json!({ "name": "next-step", "arguments": { "state": "INIT" } }),
        ));

        let result = env.result().unwrap();
        assert_eq!(result["name"], "next-step");
        let text = result["messages"][0]["content"]["text"].as_str().unwrap();
        assert!(text.contains("stage INIT ( mode)"));
        assert_eq!(result["messages"][0]["role"], "user");
    }

    #[test]
    fn prompt_missing_argument() {
        let (_dir, server) = server();
        let env = server.handle(&request(5, "prompts/get", json!({ "name": "stage-review" })));

        let error = env.error_body().unwrap();
        assert_eq!(error.code, 40001);
        assert_eq!(error.data, json!(["stage"]));
    }

    #[test]
    fn unknown_prompt_is_not_found() {
        let (_dir, server) = server();
        let env = server.handle(&request(6, "prompts/get", json!({ "name": "nope" })));
        assert_eq!(env.error_body().unwrap().code, 40400);
    }

    #[test]
    fn read_builtin_resource() {
        let (_dir, server) = server();
        let env = server.handle(&request(
            8,
            "resources/read",
            json!({ "id": "ish://workflow/stages" }),
        ));

        let result = env.result().unwrap();
        assert_eq!(result["mimeType"], "text/markdown");
        assert!(result["text"].as_str().unwrap().contains("INIT"));

        let env = server.handle(&request(9, "resources/read", json!({ "id": "ish://nope" })));
        assert_eq!(env.error_body().unwrap().code, 40400);
    }

    #[test]
    fn resources_listed_in_provider_order() {
        let dir = tempfile::tempdir().unwrap();
        let project = ProjectContext::new(dir.path(), &[]).unwrap();
        let resources = ResourceAggregator::new()
            .with(StaticResourceProvider::new(vec![
                StaticResource::new("a://1", "first", ""),
                StaticResource::new("a://2", "second", ""),
            ]))
            .with(StaticResourceProvider::new(vec![StaticResource::new(
                "b://1", "third", "",
            )]));
        let server = Server::new(
            RequestRouter::new(),
            resources,
            PromptAggregator::new(),
            project,
        );

        let env = server.handle(&request(1, "listResources", json!({})));
        let ids: Vec<&str> = env.result().unwrap()["resources"]
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["id"].as_str().unwrap())
            .collect();
        assert_eq!(ids, vec!["a://1", "a://2", "b://1"]);
    }

    #[tokio::test]
    async fn run_answers_each_line_once() {
        let (_dir, server) = server();
        let input: &[u8] = b"{\"id\":1,\"method\":\"health/version\"}\n\n   \nnot json\n";
        let mut transport = LineTransport::new(input, Vec::new());

        server.run(&mut transport).await.unwrap();

        let output = String::from_utf8(transport.into_writer()).unwrap();
        let lines: Vec<Value> = output
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["id"], 1);
        assert!(lines[0]["meta"]["durationMs"].is_u64());
        assert_eq!(lines[1]["id"], Value::Null);
        assert_eq!(lines[1]["error"]["code"], -32700);
    }
}
