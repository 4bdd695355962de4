//! Error types for the configuration resolution core.
//!
//! Domain-scoped variants with an optional boxed source, trimmed to the
//! taxonomy this service needs.

use thiserror::Error;

/// Core error type for the resolution pipeline and its administrative
/// operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Specification lookup miss for `(appId, version)`.
    #[error("specification not found for app '{app_id}' version '{version}'")]
    NotFound {
        /// Application identifier that was looked up.
        app_id: String,
        /// Version that was looked up.
        version: String,
    },

    /// Schema validation on `defaultConfig` failed during create.
    #[error("specification validation failed: {errors:?}")]
    ValidationFailed {
        /// The individual validation error messages.
        errors: Vec<String>,
    },

    /// Rule composition (template/extend/compose/mixin) could not proceed.
    #[error("composition error: {0}")]
    Composition(#[from] CompositionError),

    /// Query-string or body JSON failed to decode.
    #[error("malformed input: {message}")]
    MalformedInput {
        /// Human-readable description of what failed to parse.
        message: String,
    },

    /// Unexpected error with no more specific variant.
    #[error("internal error: {message}")]
    Internal {
        /// Human-readable message.
        message: String,
        /// Optional underlying source error.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

/// Administrative composition failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompositionError {
    /// `composeRules` was called with an empty source list.
    #[error("composition source list must not be empty")]
    EmptyComposition,

    /// `extend` composition referenced a `baseRuleId` that does not resolve.
    #[error("base rule '{0}' not found")]
    BaseRuleNotFound(String),

    /// `compose` composition referenced a `sourceRuleIds` entry that does
    /// not resolve.
    #[error("source rule '{0}' not found")]
    SourceRuleNotFound(String),

    /// Template lookup by name failed.
    #[error("template '{0}' not found")]
    TemplateNotFound(String),

    /// `createFromTemplate` was called without an id in `overrides`.
    #[error("template instantiation requires overrides.id")]
    TemplateMissingId,

    /// `compose`/`mixin` composition is missing `sourceRuleIds`.
    #[error("composition is missing sourceRuleIds")]
    MissingSourceRuleIds,

    /// `extend` composition is missing `baseRuleId`.
    #[error("composition is missing baseRuleId")]
    MissingBaseRuleId,

    /// A cycle was detected while resolving `extend` composition chains.
    #[error("composition cycle detected at rule '{0}'")]
    CompositionCycle(String),
}

impl Error {
    /// Construct an [`Error::Internal`] with no source.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
            source: None,
        }
    }

    /// Construct an [`Error::NotFound`].
    #[must_use]
    pub fn not_found(app_id: impl Into<String>, version: impl Into<String>) -> Self {
        Self::NotFound {
            app_id: app_id.into(),
            version: version.into(),
        }
    }

    /// Construct an [`Error::MalformedInput`].
    #[must_use]
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedInput {
            message: message.into(),
        }
    }
}

/// Core result type.
pub type Result<T> = std::result::Result<T, Error>;
