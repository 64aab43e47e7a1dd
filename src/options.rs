//! Agent configuration: the builder-pattern `AgentOptions`, the closed
//! `PermissionMode` vocabulary, and the `ArgumentRenderer` collaborator that
//! turns options into the Agent CLI's argv.

use std::fmt;
use std::str::FromStr;

use serde_json::Value;

use crate::error::{Error, Result};
use crate::hooks::HookRegistration;
use crate::permissions::CanUseToolHandler;
use crate::tools::Tool;
use std::sync::Arc;

/// The five canonical permission-mode spellings. Normalised at this
/// boundary so the rest of the crate only ever sees one of these, whatever
/// casing a caller passed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionMode {
    Default,
    AcceptEdits,
    Plan,
    BypassPermissions,
    DontAsk,
}

impl PermissionMode {
    fn wire_name(self) -> &'static str {
        match self {
            PermissionMode::Default => "default",
            PermissionMode::AcceptEdits => "acceptEdits",
            PermissionMode::Plan => "plan",
            PermissionMode::BypassPermissions => "bypassPermissions",
            PermissionMode::DontAsk => "dontAsk",
        }
    }
}

impl fmt::Display for PermissionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

impl FromStr for PermissionMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "default" => Ok(PermissionMode::Default),
            "acceptEdits" => Ok(PermissionMode::AcceptEdits),
            "plan" => Ok(PermissionMode::Plan),
            "bypassPermissions" => Ok(PermissionMode::BypassPermissions),
            "dontAsk" => Ok(PermissionMode::DontAsk),
            other => Err(Error::invalid_state(format!(
                "unrecognised permission mode: {other}"
            ))),
        }
    }
}

/// Configuration for one query or session. Built with [`AgentOptionsBuilder`].
#[derive(Clone)]
pub struct AgentOptions {
    pub model: Option<String>,
    pub fallback_model: Option<String>,
    pub system_prompt: Option<String>,
    pub append_system_prompt: Option<String>,
    pub allowed_tools: Vec<String>,
    pub disallowed_tools: Vec<String>,
    pub permission_mode: Option<PermissionMode>,
    pub max_turns: Option<u32>,
    pub max_budget_usd: Option<f64>,
    pub max_thinking_tokens: Option<u32>,
    pub mcp_config: Option<String>,
    pub agents: Vec<String>,
    pub plugins: Vec<String>,
    pub sandbox: bool,
    pub sandbox_config: Option<String>,
    pub resume: Option<String>,
    pub fork_session: bool,
    pub continue_session: bool,
    pub include_partial_messages: bool,
    pub json_schema: Option<Value>,
    pub cwd: Option<String>,
    pub executable_path: Option<String>,
    pub message_channel_capacity: usize,
    pub tools: Vec<Tool>,
    pub hooks: Vec<HookRegistration>,
    pub can_use_tool: Option<Arc<dyn CanUseToolHandler>>,
}

impl Default for AgentOptions {
    fn default() -> Self {
        AgentOptions {
            model: None,
            fallback_model: None,
            system_prompt: None,
            append_system_prompt: None,
            allowed_tools: Vec::new(),
            disallowed_tools: Vec::new(),
            permission_mode: None,
            max_turns: None,
            max_budget_usd: None,
            max_thinking_tokens: None,
            mcp_config: None,
            agents: Vec::new(),
            plugins: Vec::new(),
            sandbox: false,
            sandbox_config: None,
            resume: None,
            fork_session: false,
            continue_session: false,
            include_partial_messages: false,
            json_schema: None,
            cwd: None,
            executable_path: None,
            message_channel_capacity: 1024,
            tools: Vec::new(),
            hooks: Vec::new(),
            can_use_tool: None,
        }
    }
}

impl AgentOptions {
    pub fn builder() -> AgentOptionsBuilder {
        AgentOptionsBuilder::default()
    }

    /// Whether this query needs interactive mode (tools or hooks registered)
    /// rather than a plain one-shot `--print`.
    pub fn needs_interactive_mode(&self) -> bool {
        !self.tools.is_empty() || !self.hooks.is_empty() || self.can_use_tool.is_some()
    }
}

#[derive(Default)]
pub struct AgentOptionsBuilder {
    options: AgentOptions,
}

macro_rules! string_setter {
    ($name:ident) => {
        pub fn $name(mut self, value: impl Into<String>) -> Self {
            self.options.$name = Some(value.into());
            self
        }
    };
}

impl AgentOptionsBuilder {
    string_setter!(model);
    string_setter!(fallback_model);
    string_setter!(system_prompt);
    string_setter!(append_system_prompt);
    string_setter!(mcp_config);
    string_setter!(sandbox_config);
    string_setter!(resume);
    string_setter!(cwd);
    string_setter!(executable_path);

    pub fn allowed_tools(mut self, tools: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.options.allowed_tools = tools.into_iter().map(Into::into).collect();
        self
    }

    pub fn disallowed_tools(mut self, tools: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.options.disallowed_tools = tools.into_iter().map(Into::into).collect();
        self
    }

    pub fn permission_mode(mut self, mode: PermissionMode) -> Self {
        self.options.permission_mode = Some(mode);
        self
    }

    pub fn max_turns(mut self, n: u32) -> Self {
        self.options.max_turns = Some(n);
        self
    }

    pub fn max_budget_usd(mut self, n: f64) -> Self {
        self.options.max_budget_usd = Some(n);
        self
    }

    pub fn max_thinking_tokens(mut self, n: u32) -> Self {
        self.options.max_thinking_tokens = Some(n);
        self
    }

    pub fn agents(mut self, agents: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.options.agents = agents.into_iter().map(Into::into).collect();
        self
    }

    pub fn plugins(mut self, plugins: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.options.plugins = plugins.into_iter().map(Into::into).collect();
        self
    }

    pub fn sandbox(mut self, enabled: bool) -> Self {
        self.options.sandbox = enabled;
        self
    }

    pub fn fork_session(mut self, enabled: bool) -> Self {
        self.options.fork_session = enabled;
        self
    }

    pub fn continue_session(mut self, enabled: bool) -> Self {
        self.options.continue_session = enabled;
        self
    }

    pub fn include_partial_messages(mut self, enabled: bool) -> Self {
        self.options.include_partial_messages = enabled;
        self
    }

    pub fn json_schema(mut self, schema: Value) -> Self {
        self.options.json_schema = Some(schema);
        self
    }

    pub fn message_channel_capacity(mut self, capacity: usize) -> Self {
        self.options.message_channel_capacity = capacity;
        self
    }

    pub fn tool(mut self, tool: Tool) -> Self {
        self.options.tools.push(tool);
        self
    }

    pub fn hook(mut self, registration: HookRegistration) -> Self {
        self.options.hooks.push(registration);
        self
    }

    pub fn can_use_tool(mut self, handler: Arc<dyn CanUseToolHandler>) -> Self {
        self.options.can_use_tool = Some(handler);
        self
    }

    /// Validate and produce the final [`AgentOptions`].
    ///
    /// Today the only validated invariant is that `fork_session` and
    /// `resume` aren't both set (forking only makes sense against a
    /// resumed session's id, which this builder doesn't yet thread
    /// through, so combining the flags would silently do nothing useful).
    pub fn build(self) -> Result<AgentOptions> {
        if self.options.fork_session && self.options.resume.is_none() {
            return Err(Error::invalid_state(
                "fork_session requires resume to be set",
            ));
        }
        Ok(self.options)
    }
}

/// Turns [`AgentOptions`] into the Agent CLI's argv, per the documented
/// flag surface. One-shot vs. interactive input mode is decided by the
/// caller (`session.rs`), not by this renderer.
pub trait ArgumentRenderer: Send + Sync {
    fn render(&self, options: &AgentOptions, prompt: Option<&str>, interactive: bool) -> Vec<String>;
}

#[derive(Debug, Default)]
pub struct DefaultArgumentRenderer;

impl ArgumentRenderer for DefaultArgumentRenderer {
    fn render(&self, options: &AgentOptions, prompt: Option<&str>, interactive: bool) -> Vec<String> {
        let mut args = vec!["--output-format".to_string(), "stream-json".to_string(), "--verbose".to_string()];

        if interactive {
            args.push("--input-format".to_string());
            args.push("stream-json".to_string());
        } else if let Some(prompt) = prompt {
            args.push("--print".to_string());
            args.push(prompt.to_string());
        }

        if let Some(model) = &options.model {
            args.extend(["--model".to_string(), model.clone()]);
        }
        if let Some(model) = &options.fallback_model {
            args.extend(["--fallback-model".to_string(), model.clone()]);
        }
        if !options.allowed_tools.is_empty() {
            args.extend(["--allowedTools".to_string(), options.allowed_tools.join(",")]);
        }
        if !options.disallowed_tools.is_empty() {
            args.extend([
                "--disallowedTools".to_string(),
                options.disallowed_tools.join(","),
            ]);
        }
        if let Some(prompt) = &options.system_prompt {
            args.extend(["--system-prompt".to_string(), prompt.clone()]);
        }
        if let Some(prompt) = &options.append_system_prompt {
            args.extend(["--append-system-prompt".to_string(), prompt.clone()]);
        }
        if let Some(mode) = options.permission_mode {
            args.extend(["--permission-mode".to_string(), mode.to_string()]);
        }
        if let Some(n) = options.max_turns {
            args.extend(["--max-turns".to_string(), n.to_string()]);
        }
        if let Some(n) = options.max_budget_usd {
            args.extend(["--max-budget-usd".to_string(), n.to_string()]);
        }
        if let Some(n) = options.max_thinking_tokens {
            args.extend(["--max-thinking-tokens".to_string(), n.to_string()]);
        }
        if let Some(path) = &options.mcp_config {
            args.extend(["--mcp-config".to_string(), path.clone()]);
        }
        if !options.agents.is_empty() {
            args.extend(["--agents".to_string(), options.agents.join(",")]);
        }
        if !options.plugins.is_empty() {
            args.extend(["--plugins".to_string(), options.plugins.join(",")]);
        }
        if options.sandbox {
            args.push("--sandbox".to_string());
        }
        if let Some(config) = &options.sandbox_config {
            args.extend(["--sandbox-config".to_string(), config.clone()]);
        }
        if let Some(session_id) = &options.resume {
            args.extend(["--resume".to_string(), session_id.clone()]);
        }
        if options.fork_session {
            args.push("--fork-session".to_string());
        }
        if options.continue_session {
            args.push("--continue".to_string());
        }
        if options.include_partial_messages {
            args.push("--include-partial-messages".to_string());
        }
        if let Some(schema) = &options.json_schema {
            args.extend(["--json-schema".to_string(), schema.to_string()]);
        }

        args
    }
}
