// src/config/model.rs

use serde::Deserialize;

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [runner]
/// program = "npm"
/// tool_alias = "cdk"
///
/// [progress]
/// poll_interval_ms = 100
///
/// [cdk]
/// profile = "dev"
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub runner: RunnerSection,

    #[serde(default)]
    pub progress: ProgressSection,

    #[serde(default)]
    pub cdk: CdkSection,
}

/// Validated configuration. Only obtainable through `TryFrom<RawConfigFile>`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub runner: RunnerSection,
    pub progress: ProgressSection,
    pub cdk: CdkSection,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(raw: RawConfigFile) -> Self {
        Self {
            runner: raw.runner,
            progress: raw.progress,
            cdk: raw.cdk,
        }
    }
}

/// `[runner]` section: how the deployment tool is started.
#[derive(Debug, Clone, Deserialize)]
pub struct RunnerSection {
    /// Package-manager executable used to reach the tool.
    #[serde(default = "default_program")]
    pub program: String,

    /// Script alias of the tool, i.e. `<program> run <tool_alias> -- ...`.
    #[serde(default = "default_tool_alias")]
    pub tool_alias: String,

    /// stdout lines starting with this are echoed to the operator.
    #[serde(default = "default_prompt_prefix")]
    pub prompt_prefix: String,

    /// Capacity of each run's event channel. Must be >= 1.
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,

    /// Answer the tool's prompts with lines read from the host's stdin.
    /// Stdin is only read once a prompt has been seen.
    #[serde(default = "default_true")]
    pub forward_stdin: bool,
}

fn default_program() -> String {
    "npm".to_string()
}

fn default_tool_alias() -> String {
    "cdk".to_string()
}

fn default_prompt_prefix() -> String {
    crate::exec::runner::DEFAULT_PROMPT_PREFIX.to_string()
}

fn default_event_buffer() -> usize {
    1
}

fn default_true() -> bool {
    true
}

impl Default for RunnerSection {
    fn default() -> Self {
        Self {
            program: default_program(),
            tool_alias: default_tool_alias(),
            prompt_prefix: default_prompt_prefix(),
            event_buffer: default_event_buffer(),
            forward_stdin: true,
        }
    }
}

/// `[progress]` section: live display.
#[derive(Debug, Clone, Deserialize)]
pub struct ProgressSection {
    /// How often the bar picks up the latest event.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// When false, runs are drained without a bar and every line is logged.
    #[serde(default = "default_true")]
    pub show_bar: bool,
}

fn default_poll_interval_ms() -> u64 {
    100
}

impl Default for ProgressSection {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            show_bar: true,
        }
    }
}

/// `[cdk]` section: values baked into the tool's command lines.
#[derive(Debug, Clone, Deserialize)]
pub struct CdkSection {
    #[serde(default)]
    pub profile: String,

    #[serde(default = "default_toolkit_stack_name")]
    pub toolkit_stack_name: String,

    #[serde(default = "default_qualifier")]
    pub qualifier: String,

    #[serde(default = "default_app_tag_key")]
    pub app_tag_key: String,

    #[serde(default = "default_app_tag_value")]
    pub app_tag_value: String,

    #[serde(default = "default_version_tag_key")]
    pub version_tag_key: String,

    /// Name prefix of the per-deploy output directory.
    #[serde(default = "default_output_dir_prefix")]
    pub output_dir_prefix: String,
}

fn default_toolkit_stack_name() -> String {
    "Agc-CDKToolkit".to_string()
}

fn default_qualifier() -> String {
    "agc".to_string()
}

fn default_app_tag_key() -> String {
    "application-name".to_string()
}

fn default_app_tag_value() -> String {
    "agc".to_string()
}

fn default_version_tag_key() -> String {
    "agc-version".to_string()
}

fn default_output_dir_prefix() -> String {
    "cdk-output".to_string()
}

impl Default for CdkSection {
    fn default() -> Self {
        Self {
            profile: String::new(),
            toolkit_stack_name: default_toolkit_stack_name(),
            qualifier: default_qualifier(),
            app_tag_key: default_app_tag_key(),
            app_tag_value: default_app_tag_value(),
            version_tag_key: default_version_tag_key(),
            output_dir_prefix: default_output_dir_prefix(),
        }
    }
}
