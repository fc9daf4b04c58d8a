// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 opchain contributors

//! Built-in side effects
//!
//! Side effects log, store, count or call out. Whatever they compute, the
//! chain value passes through them unchanged.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Number, Value};
use tracing::{debug, error, info, warn};

use super::{
    parse_config, render_template, template_args, type_name, Category,
    ConfigParam, ConfigSchema, ConfigType, ConfiguredOperation, Operation, OperationConfig,
    SideEffect,
};
use crate::errors::{ConfigValidationError, OperationError};
use crate::pipeline::ExecutionContext;
use crate::resolver::DotPath;

#[cfg(feature = "http")]
pub use http::HttpRequest;

// ─────────────────────────────────────────────────────────────────────────────
// log_value
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
enum LogLevel {
    Debug,
    #[default]
    Info,
    #[serde(alias = "warn")]
    Warning,
    Error,
}

/// Emit the value through the tracing subscriber
#[derive(Debug)]
pub struct LogValue {
    level: LogLevel,
    message: String,
}

#[derive(Deserialize)]
struct LogValueConfig {
    #[serde(default)]
    level: LogLevel,
    #[serde(default = "default_log_message")]
    message: String,
}

fn default_log_message() -> String {
    "log_value".into()
}

impl ConfiguredOperation for LogValue {
    const CATEGORY: Category = Category::SideEffect;
    const DESCRIPTION: &'static str = "Log the current value at a chosen level";

    fn config_schema() -> ConfigSchema {
        ConfigSchema::new()
            .optional(
                "level",
                ConfigParam::new(ConfigType::Str, "One of debug, info, warning, error")
                    .default_value(json!("info"))
                    .example(json!("debug")),
            )
            .optional(
                "message",
                ConfigParam::new(ConfigType::Str, "Prefix for the log line")
                    .default_value(json!("log_value"))
                    .example(json!("Processing user")),
            )
    }

    fn from_config(config: &OperationConfig) -> Result<Self, ConfigValidationError> {
        let cfg: LogValueConfig = parse_config(config)?;
        Ok(Self {
            level: cfg.level,
            message: cfg.message,
        })
    }

    fn into_operation(self) -> Operation {
        Operation::SideEffect(Box::new(self))
    }
}

#[async_trait]
impl SideEffect for LogValue {
    async fn perform(
        &self,
        value: &Value,
        _context: &mut ExecutionContext,
    ) -> Result<(), OperationError> {
        match self.level {
            LogLevel::Debug => debug!("{}: {}", self.message, value),
            LogLevel::Info => info!("{}: {}", self.message, value),
            LogLevel::Warning => warn!("{}: {}", self.message, value),
            LogLevel::Error => error!("{}: {}", self.message, value),
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// store_in_context
// ─────────────────────────────────────────────────────────────────────────────

/// Copy the value, or part of it, into shared data
#[derive(Debug)]
pub struct StoreInContext {
    context_path: DotPath,
    value_path: Option<DotPath>,
    overwrite: bool,
}

#[derive(Deserialize)]
struct StoreInContextConfig {
    context_path: String,
    #[serde(default)]
    value_path: Option<String>,
    #[serde(default = "default_true")]
    overwrite: bool,
}

fn default_true() -> bool {
    true
}

impl ConfiguredOperation for StoreInContext {
    const CATEGORY: Category = Category::SideEffect;
    const DESCRIPTION: &'static str = "Store the value, or a field of it, in shared data";

    fn config_schema() -> ConfigSchema {
        ConfigSchema::new()
            .required(
                "context_path",
                ConfigParam::new(ConfigType::Str, "Dot path in shared data to write")
                    .example(json!("user.email")),
            )
            .optional(
                "value_path",
                ConfigParam::new(ConfigType::Str, "Dot path in the value to store; whole value when unset")
                    .example(json!("profile.email")),
            )
            .optional(
                "overwrite",
                ConfigParam::new(ConfigType::Bool, "Replace an existing entry")
                    .default_value(json!(true)),
            )
    }

    fn from_config(config: &OperationConfig) -> Result<Self, ConfigValidationError> {
        let cfg: StoreInContextConfig = parse_config(config)?;
        let context_path =
            DotPath::parse(&cfg.context_path).map_err(|e| e.into_config_error("context_path"))?;
        let value_path = cfg
            .value_path
            .map(|p| DotPath::parse(&p).map_err(|e| e.into_config_error("value_path")))
            .transpose()?;
        Ok(Self {
            context_path,
            value_path,
            overwrite: cfg.overwrite,
        })
    }

    fn into_operation(self) -> Operation {
        Operation::SideEffect(Box::new(self))
    }
}

#[async_trait]
impl SideEffect for StoreInContext {
    async fn perform(
        &self,
        value: &Value,
        context: &mut ExecutionContext,
    ) -> Result<(), OperationError> {
        let stored = match &self.value_path {
            None => value.clone(),
            Some(path) => match path.get(value) {
                Some(found) => found.clone(),
                None => {
                    warn!("store_in_context: '{}' not found in value, nothing stored", path);
                    return Ok(());
                }
            },
        };

        if !self.overwrite && self.context_path.get_in(&context.shared_data).is_some() {
            debug!("store_in_context: '{}' already set, keeping it", self.context_path);
            return Ok(());
        }

        self.context_path
            .set_in(&mut context.shared_data, stored)
            .map(|_| ())
            .map_err(|e| OperationError::failed(e.to_string()))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// increment_counter
// ─────────────────────────────────────────────────────────────────────────────

/// Add to a numeric counter in shared data
#[derive(Debug)]
pub struct IncrementCounter {
    key: String,
    increment: Number,
}

#[derive(Deserialize)]
struct IncrementCounterConfig {
    #[serde(default = "default_counter_key")]
    key: String,
    #[serde(default = "default_increment")]
    increment: Number,
}

fn default_counter_key() -> String {
    "counter".into()
}

fn default_increment() -> Number {
    Number::from(1)
}

impl ConfiguredOperation for IncrementCounter {
    const CATEGORY: Category = Category::SideEffect;
    const DESCRIPTION: &'static str = "Increment a counter in shared data";

    fn config_schema() -> ConfigSchema {
        ConfigSchema::new()
            .optional(
                "key",
                ConfigParam::new(ConfigType::Str, "Shared data key of the counter")
                    .default_value(json!("counter"))
                    .example(json!("processed")),
            )
            .optional(
                "increment",
                ConfigParam::new(ConfigType::Float, "Amount to add").default_value(json!(1)),
            )
    }

    fn from_config(config: &OperationConfig) -> Result<Self, ConfigValidationError> {
        let cfg: IncrementCounterConfig = parse_config(config)?;
        Ok(Self {
            key: cfg.key,
            increment: cfg.increment,
        })
    }

    fn into_operation(self) -> Operation {
        Operation::SideEffect(Box::new(self))
    }
}

#[async_trait]
impl SideEffect for IncrementCounter {
    async fn perform(
        &self,
        _value: &Value,
        context: &mut ExecutionContext,
    ) -> Result<(), OperationError> {
        let next = match context.shared_data.get(&self.key) {
            None | Some(Value::Null) => Value::Number(self.increment.clone()),
            Some(Value::Number(current)) => match (current.as_i64(), self.increment.as_i64()) {
                (Some(a), Some(b)) => a.checked_add(b).map(Value::from).ok_or_else(|| {
                    OperationError::failed(format!("counter '{}' overflowed", self.key))
                })?,
                _ => Value::from(
                    current.as_f64().unwrap_or_default() + self.increment.as_f64().unwrap_or_default(),
                ),
            },
            Some(other) => {
                return Err(OperationError::failed(format!(
                    "counter '{}' holds a {} instead of a number",
                    self.key,
                    type_name(other)
                )))
            }
        };
        context.shared_data.insert(self.key.clone(), next);
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// notify
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum Channel {
    Email,
    Sms,
    Webhook,
}

/// Announce a notification through the log
///
/// Delivery is left to a custom operation registered under the same name.
#[derive(Debug)]
pub struct Notify {
    channel: Channel,
    recipient: String,
    message: String,
}

#[derive(Deserialize)]
struct NotifyConfig {
    channel: Channel,
    recipient: String,
    #[serde(default = "default_notify_message")]
    message: String,
}

fn default_notify_message() -> String {
    "{value}".into()
}

impl ConfiguredOperation for Notify {
    const CATEGORY: Category = Category::SideEffect;
    const DESCRIPTION: &'static str = "Log a notification for a recipient";

    fn config_schema() -> ConfigSchema {
        ConfigSchema::new()
            .required(
                "channel",
                ConfigParam::new(ConfigType::Str, "One of email, sms, webhook").example(json!("email")),
            )
            .required(
                "recipient",
                ConfigParam::new(ConfigType::Str, "Recipient address")
                    .example(json!("ops@example.com")),
            )
            .optional(
                "message",
                ConfigParam::new(ConfigType::Str, "Message template")
                    .default_value(json!("{value}"))
                    .example(json!("New item created: {value}")),
            )
    }

    fn from_config(config: &OperationConfig) -> Result<Self, ConfigValidationError> {
        let cfg: NotifyConfig = parse_config(config)?;
        Ok(Self {
            channel: cfg.channel,
            recipient: cfg.recipient,
            message: cfg.message,
        })
    }

    fn into_operation(self) -> Operation {
        Operation::SideEffect(Box::new(self))
    }
}

#[async_trait]
impl SideEffect for Notify {
    async fn perform(
        &self,
        value: &Value,
        context: &mut ExecutionContext,
    ) -> Result<(), OperationError> {
        let message = render_template(&self.message, &template_args(value, context))
            .map_err(OperationError::failed)?;
        info!(
            "notify: {:?} to {}: {}",
            self.channel, self.recipient, message
        );
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// http_request
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(feature = "http")]
mod http {
    use std::collections::BTreeMap;
    use std::time::Duration;

    use reqwest::Method;

    use super::*;
    use crate::config::HttpDefaults;

    /// Send an HTTP request built from templates
    ///
    /// The client and connection live only for the duration of the step.
    #[derive(Debug)]
    pub struct HttpRequest {
        method: Method,
        url: String,
        headers: BTreeMap<String, String>,
        body_template: Option<String>,
        store_response_key: Option<String>,
        timeout_secs: u64,
        user_agent: String,
        error_for_status: bool,
    }

    #[derive(Deserialize)]
    struct HttpRequestConfig {
        url: String,
        #[serde(default = "default_method")]
        method: String,
        #[serde(default)]
        headers: BTreeMap<String, String>,
        #[serde(default)]
        body_template: Option<String>,
        #[serde(default)]
        store_response_key: Option<String>,
        #[serde(default)]
        timeout: Option<u64>,
        #[serde(default)]
        error_for_status: bool,
    }

    fn default_method() -> String {
        "GET".into()
    }

    impl HttpRequest {
        /// Build with engine-wide HTTP defaults
        pub fn from_config_with(
            config: &OperationConfig,
            defaults: &HttpDefaults,
        ) -> Result<Self, ConfigValidationError> {
            let cfg: HttpRequestConfig = parse_config(config)?;
            let method = cfg
                .method
                .to_uppercase()
                .parse::<Method>()
                .map_err(|e| ConfigValidationError::invalid("method", e.to_string()))?;
            let timeout_secs = cfg.timeout.unwrap_or(defaults.default_timeout_secs);
            if timeout_secs == 0 {
                return Err(ConfigValidationError::invalid("timeout", "must be at least 1 second"));
            }

            Ok(Self {
                method,
                url: cfg.url,
                headers: cfg.headers,
                body_template: cfg.body_template,
                store_response_key: cfg.store_response_key,
                timeout_secs,
                user_agent: defaults.user_agent.clone(),
                error_for_status: cfg.error_for_status,
            })
        }

        fn sends_body(&self) -> bool {
            self.method == Method::POST || self.method == Method::PUT || self.method == Method::PATCH
        }
    }

    impl ConfiguredOperation for HttpRequest {
        const CATEGORY: Category = Category::SideEffect;
        const DESCRIPTION: &'static str = "Send an HTTP request and optionally store the response";

        fn config_schema() -> ConfigSchema {
            ConfigSchema::new()
                .required(
                    "url",
                    ConfigParam::new(ConfigType::Str, "URL template")
                        .example(json!("https://api.example.com/users/{value}")),
                )
                .optional(
                    "method",
                    ConfigParam::new(ConfigType::Str, "HTTP method")
                        .default_value(json!("GET"))
                        .example(json!("POST")),
                )
                .optional(
                    "headers",
                    ConfigParam::new(ConfigType::Dict, "Request headers")
                        .example(json!({"Authorization": "Bearer token"})),
                )
                .optional(
                    "body_template",
                    ConfigParam::new(ConfigType::Str, "Body template for POST, PUT and PATCH")
                        .example(json!("{\"id\": \"{value}\"}")),
                )
                .optional(
                    "store_response_key",
                    ConfigParam::new(ConfigType::Str, "Shared data key receiving {status, data}")
                        .example(json!("api_response")),
                )
                .optional(
                    "timeout",
                    ConfigParam::new(ConfigType::Int, "Whole-request timeout in seconds")
                        .default_value(json!(HttpDefaults::default().default_timeout_secs)),
                )
                .optional(
                    "error_for_status",
                    ConfigParam::new(ConfigType::Bool, "Fail on non-2xx responses")
                        .default_value(json!(false)),
                )
        }

        fn from_config(config: &OperationConfig) -> Result<Self, ConfigValidationError> {
            Self::from_config_with(config, &HttpDefaults::default())
        }

        fn into_operation(self) -> Operation {
            Operation::SideEffect(Box::new(self))
        }
    }

    #[async_trait]
    impl SideEffect for HttpRequest {
        async fn perform(
            &self,
            value: &Value,
            context: &mut ExecutionContext,
        ) -> Result<(), OperationError> {
            let args = template_args(value, context);
            let url = render_template(&self.url, &args).map_err(OperationError::failed)?;
            let timeout = Duration::from_secs(self.timeout_secs);

            let client = reqwest::Client::builder()
                .timeout(timeout)
                .user_agent(self.user_agent.as_str())
                .build()
                .map_err(|e| OperationError::failed(format!("cannot build HTTP client: {}", e)))?;

            let mut request = client.request(self.method.clone(), url.as_str());
            for (name, header) in &self.headers {
                request = request.header(name.as_str(), header.as_str());
            }
            if let (true, Some(template)) = (self.sends_body(), &self.body_template) {
                let body = render_template(template, &args).map_err(OperationError::failed)?;
                request = request.body(body);
            }

            let exchange = async {
                let response = request.send().await?;
                let status = response.status();
                let text = response.text().await?;
                Ok::<_, reqwest::Error>((status, text))
            };

            let (status, body) = match tokio::time::timeout(timeout, exchange).await {
                Err(_) => {
                    return Err(OperationError::Timeout {
                        seconds: self.timeout_secs,
                    })
                }
                Ok(Err(e)) if e.is_timeout() => {
                    return Err(OperationError::Timeout {
                        seconds: self.timeout_secs,
                    })
                }
                Ok(Err(e)) => {
                    return Err(OperationError::failed(format!(
                        "{} {} failed: {}",
                        self.method, url, e
                    )))
                }
                Ok(Ok(exchange)) => exchange,
            };

            info!("{} {} -> {}", self.method, url, status.as_u16());

            if self.error_for_status && !status.is_success() {
                return Err(OperationError::failed(format!(
                    "{} {} returned {}",
                    self.method, url, status
                )));
            }

            if let Some(key) = &self.store_response_key {
                context.shared_data.insert(
                    key.clone(),
                    json!({"status": status.as_u16(), "data": body}),
                );
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operations::test_support::perform;

    #[tokio::test]
    async fn test_log_value_accepts_warn_alias() {
        let mut context = ExecutionContext::default();
        perform("log", json!({"level": "warn"}), json!(1), &mut context)
            .await
            .unwrap();
        assert!(context.shared_data.is_empty());
    }

    #[tokio::test]
    async fn test_store_in_context_paths() {
        let mut context = ExecutionContext::default();
        let value = json!({"profile": {"email": "a@example.com"}});

        perform(
            "store_in_context",
            json!({"context_path": "user.email", "value_path": "profile.email"}),
            value.clone(),
            &mut context,
        )
        .await
        .unwrap();
        assert_eq!(
            Value::Object(context.shared_data.clone()),
            json!({"user": {"email": "a@example.com"}})
        );

        perform(
            "store",
            json!({"context_path": "user.email", "overwrite": false}),
            json!("other"),
            &mut context,
        )
        .await
        .unwrap();
        assert_eq!(context.shared_data["user"]["email"], json!("a@example.com"));
    }

    #[tokio::test]
    async fn test_store_into_scalar_fails() {
        let mut context = ExecutionContext::default();
        context.shared_data.insert("user".into(), json!("flat"));

        let err = perform("store", json!({"context_path": "user.email"}), json!(1), &mut context)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("is not a mapping"));
    }

    #[tokio::test]
    async fn test_increment_counter() {
        let mut context = ExecutionContext::default();
        for _ in 0..3 {
            perform("increment_counter", json!({"key": "seen"}), json!(null), &mut context)
                .await
                .unwrap();
        }
        perform(
            "increment_counter",
            json!({"key": "seen", "increment": 10}),
            json!(null),
            &mut context,
        )
        .await
        .unwrap();
        assert_eq!(context.shared_data["seen"], json!(13));

        context.shared_data.insert("bad".into(), json!("x"));
        assert!(perform("increment_counter", json!({"key": "bad"}), json!(null), &mut context)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_notify_renders_template() {
        let mut context = ExecutionContext::default();
        perform(
            "notify",
            json!({"channel": "email", "recipient": "ops@example.com", "message": "new {value}"}),
            json!("order"),
            &mut context,
        )
        .await
        .unwrap();

        let err = perform(
            "notify",
            json!({"channel": "email", "recipient": "ops@example.com", "message": "{missing}"}),
            json!("order"),
            &mut context,
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("unknown placeholder"));
    }

    #[cfg(feature = "http")]
    #[tokio::test]
    async fn test_http_request_times_out() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            // Accept and never answer
            let (_socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(std::time::Duration::from_secs(10)).await;
        });

        let mut context = ExecutionContext::default();
        let err = perform(
            "http_request",
            json!({"url": format!("http://{}/slow", addr), "timeout": 1}),
            json!(null),
            &mut context,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, OperationError::Timeout { seconds: 1 }));
        server.abort();
    }

    #[cfg(feature = "http")]
    #[test]
    fn test_http_request_rejects_bad_method() {
        let config = json!({"url": "http://localhost", "method": "NOT A METHOD"});
        let err = HttpRequest::from_config(config.as_object().unwrap()).unwrap_err();
        assert_eq!(err.issues[0].key(), "method");
    }
}
