#![doc = r#"
sumav-error: workspace-wide error types, severity, and policy-driven emission.

Overview
- A single Error enum shared across crates.
- Severity classification for coarse, programmatic handling.
- DomainError for structured, non-fatal domain failures.
- Result alias for ergonomic propagation.
- Context and iterator extensions to reduce boilerplate.
- Policy-driven emission via ErrorPolicy so libraries stay side-effect free.

Quickstart
- Library code should:
  - return sumav_error::Result<T>
  - create structured errors (Fatal/Internal/Domain/Warning)
  - use ContextExt and ResultExt helpers when helpful
- Application code (the CLI binary) should:
  - choose an ErrorPolicy (e.g., TracingPolicy)
  - emit errors at boundaries without interleaving side-effects in core logic

Example: return Result and propagate with ?
```rust,ignore
use sumav_error::{Result, DomainError};

fn parse_weight_param(s: &str) -> Result<f64> {
    s.trim().parse::<f64>().map_err(|e| {
        sumav_error::Error::from(DomainError::Config { message: format!("invalid weight_param: {e}") })
    })
}
```

Example: policy-driven emission at the boundary
```rust,ignore
use sumav_error::{Result, ErrorPolicy, ResultExt, policy::NoopPolicy};

fn handle_build(policy: &impl ErrorPolicy) -> Result<()> {
    parse_weight_param("4.1").emit_event(policy)?;
    Ok(())
}
```

Feature flags
- tracing: enables TracingPolicy
- serde: enables Serialize/Deserialize on a subset of types (e.g., Severity, DomainError)

Guidance
- Prefer structured Error variants and DomainError over ad-hoc strings.
- Use ErrorPolicy to classify/emit; avoid logging in library code.
- ContextExt captures context lazily; add it only where it improves UX.
"#]

pub mod context;
pub mod domain;
pub mod fatal;
pub mod internal;
pub mod policy;
#[cfg(feature = "serde")]
pub mod pretty;
pub mod result_ext;
pub mod severity;
pub mod warning;

// public exports
pub use context::{ContextExt, ContextualError, ErrorContext};
pub use domain::DomainError;
pub use fatal::FatalError;
pub use internal::InternalError;
#[cfg(feature = "tracing")]
pub use policy::TracingPolicy;
pub use policy::{CombinedPolicy, ErrorPolicy, NoopPolicy};
#[cfg(feature = "serde")]
pub use pretty::PrettyDebug;
pub use result_ext::{IterResultExt, ResultExt};
pub use severity::Severity;
pub use warning::WarningError;

/// Workspace-wide result alias used by all crates in the project.
/// The default error type is this crate's [`Error`].
/// Use this throughout library code and propagate failures with `?`.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Top-level error type used across the sumav workspace.
///
/// Variants group failures into coarse classes; see [`Error::severity`] for programmatic classification.
/// Prefer returning `Result<T>` from functions and let callers decide how to emit via a [`policy::ErrorPolicy`].
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Fatal(#[from] FatalError),
    #[error(transparent)]
    Warning(#[from] WarningError),
    #[error(transparent)]
    Internal(#[from] InternalError),
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Context(#[from] ContextualError),
}

impl Error {
    /// Returns true if this error is a Warning variant.
    pub fn is_warning(&self) -> bool {
        matches!(self, Error::Warning(_))
    }

    /// Coarse severity classification for programmatic handling.
    pub fn severity(&self) -> Severity {
        match self {
            Error::Warning(_) => Severity::Warning,
            Error::Fatal(_) => Severity::Fatal,
            Error::Internal(_) | Error::Domain(_) | Error::Context(_) => Severity::Error,
        }
    }
}
