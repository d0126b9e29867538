use crate::config::TelemetryConfig;
use std::fmt;
use tracing_subscriber::filter::{Directive, ParseError};
use tracing_subscriber::EnvFilter;

/// HTML parsing and HTTP internals are chatty below `warn` during a load.
/// They stay quiet unless a filter names them.
const QUIET_TARGETS: &[&str] = &["html5ever", "selectors", "hyper", "reqwest", "rustls"];

#[derive(Debug)]
pub enum TelemetryError {
    InvalidDirective { directive: String, source: ParseError },
    AlreadyInstalled(Box<dyn std::error::Error + Send + Sync>),
}

impl fmt::Display for TelemetryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TelemetryError::InvalidDirective { directive, .. } => {
                write!(f, "log filter '{directive}' does not parse")
            }
            TelemetryError::AlreadyInstalled(err) => {
                write!(f, "a global subscriber is already installed: {err}")
            }
        }
    }
}

impl std::error::Error for TelemetryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TelemetryError::InvalidDirective { source, .. } => Some(source),
            TelemetryError::AlreadyInstalled(err) => Some(&**err),
        }
    }
}

fn invalid(directive: &str) -> impl FnOnce(ParseError) -> TelemetryError + '_ {
    move |source| TelemetryError::InvalidDirective {
        directive: directive.to_string(),
        source,
    }
}

/// Builds a filter from `directives`, adding a `warn` cap for every quiet
/// target the directives leave unmentioned.
fn filter_from(directives: &str) -> Result<EnvFilter, TelemetryError> {
    let mut filter = EnvFilter::try_new(directives).map_err(invalid(directives))?;

    let mentioned: Vec<&str> = directives
        .split(',')
        .filter_map(|directive| directive.split(['=', '[']).next())
        .map(str::trim)
        .collect();
    for target in QUIET_TARGETS {
        if mentioned.contains(target) {
            continue;
        }
        let cap = format!("{target}=warn");
        let directive: Directive = cap.parse().map_err(invalid(&cap))?;
        filter = filter.add_directive(directive);
    }

    Ok(filter)
}

/// `RUST_LOG` wins over the configured level when it is set and parses.
fn env_filter(config: &TelemetryConfig) -> Result<EnvFilter, TelemetryError> {
    std::env::var(EnvFilter::DEFAULT_ENV)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .and_then(|value| filter_from(&value).ok())
        .map_or_else(|| filter_from(&config.log_level), Ok)
}

pub fn init(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(config)?)
        .with_target(false)
        .compact()
        .with_ansi(false)
        .try_init()
        .map_err(TelemetryError::AlreadyInstalled)
}
