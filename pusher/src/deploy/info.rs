//! Deployment parameters and their resolution
//!
//! A [`DeploymentInfo`] is built once per push, from exactly one [`ConfigSource`]:
//! the application mapping of a manifest file, or the inline configuration from the
//! settings file. Resolution never fails on missing fields. It substitutes defaults
//! and reports the important ones as [`ResolutionWarning`]s. The only failure is a
//! memory value that carries the megabyte suffix but no integer.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};

use crate::errors::PushError;

/// Memory in megabytes used when none is given
pub const DEFAULT_MEMORY: u32 = 512;

/// Instance count used when none is given
pub const DEFAULT_INSTANCES: u32 = 1;

/// Health poll timeout in seconds used when none is given
pub const DEFAULT_TIMEOUT: u32 = 60;

/// Artifact path used when none is given
pub const DEFAULT_APP_PATH: &str = ".";

/// Resolved deployment parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeploymentInfo {
    pub app_name: String,
    pub memory: u32,
    pub hostname: String,
    pub instances: u32,
    pub timeout_seconds: u32,
    pub no_route: bool,
    pub app_path: String,
    /// `None` lets the platform detect the buildpack
    pub buildpack: Option<String>,
    /// `None` keeps the platform's default start command
    pub command: Option<String>,
    pub domain: String,
    pub env_vars: BTreeMap<String, String>,
    /// Bind order
    pub service_names: Vec<String>,
}

impl DeploymentInfo {
    /// Externally reachable URI, absent with `no_route`
    pub fn app_uri(&self) -> Option<String> {
        (!self.no_route).then(|| format!("https://{}.{}", self.hostname, self.domain))
    }
}

/// Environment variable of the inline configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentVariable {
    pub key: String,
    pub value: String,
}

/// Service name of the inline configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceName {
    pub name: String,
}

/// Inline deployment configuration
///
/// Blank strings and zero numbers mean "not set".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InlineManifest {
    pub app_name: String,
    pub memory: u32,
    pub hostname: String,
    pub instances: u32,
    pub timeout: u32,
    pub no_route: bool,
    pub app_path: String,
    pub buildpack: String,
    pub command: String,
    pub domain: String,
    pub env_vars: Vec<EnvironmentVariable>,
    pub services_names: Vec<ServiceName>,
}

/// Where the deployment parameters come from
#[derive(Debug, Clone)]
pub enum ConfigSource {
    /// One application mapping out of a manifest file
    Manifest(Mapping),
    /// Inline configuration; replaces the manifest as a whole
    Inline(InlineManifest),
}

/// Values used when the source leaves a field out
#[derive(Debug, Clone)]
pub struct ResolveDefaults {
    /// Fallback application name, normally the build's display name
    pub build_name: String,
    /// Fallback domain, normally derived from the target URL
    pub domain: String,
}

/// A default that was applied to an important field, or a field that was ignored
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionWarning {
    MissingAppName { used: String },
    MissingMemory { used: u32 },
    MissingHostname { used: String },
    UnparsableEnvVars,
    UnparsableServices,
}

impl fmt::Display for ResolutionWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolutionWarning::MissingAppName { used } => {
                write!(f, "No application name. Using build name: {}", used)
            }
            ResolutionWarning::MissingMemory { used } => {
                write!(f, "No value for memory. Using default value: {}", used)
            }
            ResolutionWarning::MissingHostname { used } => {
                write!(f, "No value for hostname. Using app name: {}", used)
            }
            ResolutionWarning::UnparsableEnvVars => {
                write!(f, "Could not parse env vars into a map. Ignoring env vars.")
            }
            ResolutionWarning::UnparsableServices => {
                write!(f, "Could not parse services into a list. Ignoring services.")
            }
        }
    }
}

/// Outcome of a resolution: the parameters plus what was defaulted on the way
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub info: DeploymentInfo,
    pub warnings: Vec<ResolutionWarning>,
}

/// Resolve the deployment parameters from one source
pub fn resolve(source: &ConfigSource, defaults: &ResolveDefaults) -> Result<Resolution, PushError> {
    match source {
        ConfigSource::Manifest(app) => from_manifest(app, defaults),
        ConfigSource::Inline(inline) => Ok(from_inline_config(inline, defaults)),
    }
}

/// Resolve from one application mapping of a manifest
pub fn from_manifest(app: &Mapping, defaults: &ResolveDefaults) -> Result<Resolution, PushError> {
    let mut warnings = Vec::new();

    let app_name = match non_empty_str(app, "name") {
        Some(name) => name,
        None => {
            warnings.push(ResolutionWarning::MissingAppName {
                used: defaults.build_name.clone(),
            });
            defaults.build_name.clone()
        }
    };

    let memory = match manifest_memory(app)? {
        Some(memory) => memory,
        None => {
            warnings.push(ResolutionWarning::MissingMemory {
                used: DEFAULT_MEMORY,
            });
            DEFAULT_MEMORY
        }
    };

    let hostname = match non_empty_str(app, "host") {
        Some(host) => host,
        None => {
            warnings.push(ResolutionWarning::MissingHostname {
                used: app_name.clone(),
            });
            app_name.clone()
        }
    };

    let instances = positive_int(app, "instances").unwrap_or(DEFAULT_INSTANCES);
    let timeout_seconds = positive_int(app, "timeout").unwrap_or(DEFAULT_TIMEOUT);
    let no_route = boolean(app, "no-route").unwrap_or(false);
    let domain = non_empty_str(app, "domain").unwrap_or_else(|| defaults.domain.clone());
    let app_path = non_empty_str(app, "path").unwrap_or_else(|| DEFAULT_APP_PATH.to_string());
    let buildpack = non_empty_str(app, "buildpack");
    let command = non_empty_str(app, "command");

    let env_vars = match app.get("env") {
        None | Some(Value::Null) => BTreeMap::new(),
        Some(value) => env_map(value).unwrap_or_else(|| {
            warnings.push(ResolutionWarning::UnparsableEnvVars);
            BTreeMap::new()
        }),
    };

    let service_names = match app.get("services") {
        None | Some(Value::Null) => Vec::new(),
        Some(value) => service_list(value).unwrap_or_else(|| {
            warnings.push(ResolutionWarning::UnparsableServices);
            Vec::new()
        }),
    };

    Ok(Resolution {
        info: DeploymentInfo {
            app_name,
            memory,
            hostname,
            instances,
            timeout_seconds,
            no_route,
            app_path,
            buildpack,
            command,
            domain,
            env_vars,
            service_names,
        },
        warnings,
    })
}

/// Resolve from the inline configuration
pub fn from_inline_config(inline: &InlineManifest, defaults: &ResolveDefaults) -> Resolution {
    let mut warnings = Vec::new();

    let app_name = match blank_to_none(&inline.app_name) {
        Some(name) => name,
        None => {
            warnings.push(ResolutionWarning::MissingAppName {
                used: defaults.build_name.clone(),
            });
            defaults.build_name.clone()
        }
    };

    let memory = if inline.memory == 0 {
        warnings.push(ResolutionWarning::MissingMemory {
            used: DEFAULT_MEMORY,
        });
        DEFAULT_MEMORY
    } else {
        inline.memory
    };

    let hostname = match blank_to_none(&inline.hostname) {
        Some(host) => host,
        None => {
            warnings.push(ResolutionWarning::MissingHostname {
                used: app_name.clone(),
            });
            app_name.clone()
        }
    };

    let instances = if inline.instances == 0 {
        DEFAULT_INSTANCES
    } else {
        inline.instances
    };
    let timeout_seconds = if inline.timeout == 0 {
        DEFAULT_TIMEOUT
    } else {
        inline.timeout
    };

    let env_vars = inline
        .env_vars
        .iter()
        .map(|var| (var.key.clone(), var.value.clone()))
        .collect();
    let service_names = inline
        .services_names
        .iter()
        .map(|service| service.name.clone())
        .collect();

    Resolution {
        info: DeploymentInfo {
            app_name,
            memory,
            hostname,
            instances,
            timeout_seconds,
            no_route: inline.no_route,
            app_path: blank_to_none(&inline.app_path)
                .unwrap_or_else(|| DEFAULT_APP_PATH.to_string()),
            buildpack: blank_to_none(&inline.buildpack),
            command: blank_to_none(&inline.command),
            domain: blank_to_none(&inline.domain).unwrap_or_else(|| defaults.domain.clone()),
            env_vars,
            service_names,
        },
        warnings,
    }
}

/// Parse a manifest memory value.
///
/// `"<int>M"` and `"<int>m"` give `<int>`. A missing value, another suffix or a
/// zero gives `None`. A megabyte suffix without an integer in front is an error.
pub fn parse_memory(raw: &str) -> Result<Option<u32>, PushError> {
    let raw = raw.trim();
    let Some(digits) = raw.strip_suffix(['m', 'M']) else {
        return Ok(None);
    };
    let memory: u32 = digits.trim().parse().map_err(|_| {
        PushError::ManifestParsing(format!("Invalid memory value: {}", raw))
    })?;
    Ok((memory > 0).then_some(memory))
}

fn manifest_memory(app: &Mapping) -> Result<Option<u32>, PushError> {
    let value = app.get("memory").or_else(|| app.get("mem"));
    match value {
        Some(Value::String(raw)) => parse_memory(raw),
        _ => Ok(None),
    }
}

fn blank_to_none(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

fn non_empty_str(app: &Mapping, key: &str) -> Option<String> {
    app.get(key).and_then(Value::as_str).and_then(blank_to_none)
}

fn positive_int(app: &Mapping, key: &str) -> Option<u32> {
    let number = match app.get(key)? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    }?;
    u32::try_from(number).ok().filter(|n| *n > 0)
}

fn boolean(app: &Mapping, key: &str) -> Option<bool> {
    match app.get(key)? {
        Value::Bool(b) => Some(*b),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn env_map(value: &Value) -> Option<BTreeMap<String, String>> {
    let Value::Mapping(map) = value else {
        return None;
    };
    map.iter()
        .map(|(k, v)| Some((k.as_str()?.to_string(), scalar_string(v)?)))
        .collect()
}

fn service_list(value: &Value) -> Option<Vec<String>> {
    let Value::Sequence(services) = value else {
        return None;
    };
    services
        .iter()
        .map(|s| s.as_str().map(str::to_string))
        .collect()
}
