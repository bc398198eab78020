/// Failures raised by member access on instrumented types.
///
/// The same variants are produced whether the access goes through a
/// [`Proxy`](crate::proxy::Proxy) or directly through
/// [`Members`](crate::proxy::Members) on the unwrapped value.
#[derive(Debug, thiserror::Error)]
pub enum AccessError {
    #[error("'{type_name}' has no member '{member}'")]
    MissingMember {
        type_name: &'static str,
        member: String,
    },
    #[error("member '{member}' of '{type_name}' is read-only")]
    ReadOnly {
        type_name: &'static str,
        member: String,
    },
    #[error("member '{member}' of '{type_name}' cannot be deleted")]
    Undeletable {
        type_name: &'static str,
        member: String,
    },
    #[error("member '{member}' of '{type_name}' is not callable")]
    NotCallable {
        type_name: &'static str,
        member: String,
    },
    #[error("member '{member}' of '{type_name}' is a method, not a field")]
    NotAField {
        type_name: &'static str,
        member: String,
    },
    #[error("invalid value for '{type_name}.{member}': {reason}")]
    InvalidValue {
        type_name: &'static str,
        member: String,
        reason: String,
    },
    #[error("'{type_name}.{method}' expects an argument at position {index}")]
    MissingArgument {
        type_name: &'static str,
        method: String,
        index: usize,
    },
    #[error("invalid argument {index} for '{type_name}.{method}': {reason}")]
    InvalidArgument {
        type_name: &'static str,
        method: String,
        index: usize,
        reason: String,
    },
    /// Failure raised by the target's own method body.
    #[error(transparent)]
    Raised(#[from] anyhow::Error),
}

impl AccessError {
    /// Wrap an arbitrary failure raised inside a method body.
    pub fn raised<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        AccessError::Raised(anyhow::Error::new(error))
    }

    /// Raise a plain message from a method body.
    pub fn msg(message: impl std::fmt::Display) -> Self {
        AccessError::Raised(anyhow::anyhow!("{}", message))
    }

    /// Returns `true` when the member does not exist on the target.
    pub fn is_missing_member(&self) -> bool {
        matches!(self, AccessError::MissingMember { .. })
    }

    /// Name of the member involved, when the failure concerns one.
    pub fn member(&self) -> Option<&str> {
        match self {
            AccessError::MissingMember { member, .. }
            | AccessError::ReadOnly { member, .. }
            | AccessError::Undeletable { member, .. }
            | AccessError::NotCallable { member, .. }
            | AccessError::NotAField { member, .. }
            | AccessError::InvalidValue { member, .. } => Some(member),
            AccessError::MissingArgument { method, .. }
            | AccessError::InvalidArgument { method, .. } => Some(method),
            AccessError::Raised(_) => None,
        }
    }
}
