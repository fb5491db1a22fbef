use crate::params::ParamError;
use crate::resolver::ResolveError;
use crate::router::RouteError;

#[derive(Debug, thiserror::Error)]
pub enum FootprintError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error("invalid footprint module `{module}`: {reason}")]
    InvalidModule { module: String, reason: String },
    #[error("footprint `{module}` failed: {message}")]
    Script { module: String, message: String },
    #[error("footprint `{module}`: {source}")]
    Params { module: String, source: ParamError },
    #[error("footprint `{module}`: {source}")]
    Route { module: String, source: RouteError },
}

impl FootprintError {
    pub(crate) fn invalid_module(module: &str, reason: impl Into<String>) -> Self {
        Self::InvalidModule {
            module: module.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn script(module: &str, message: impl Into<String>) -> Self {
        Self::Script {
            module: module.to_string(),
            message: message.into(),
        }
    }

    /// The module the failure originated from, when known.
    pub fn module(&self) -> Option<&str> {
        match self {
            Self::Resolve(_) => None,
            Self::InvalidModule { module, .. }
            | Self::Script { module, .. }
            | Self::Params { module, .. }
            | Self::Route { module, .. } => Some(module),
        }
    }
}
