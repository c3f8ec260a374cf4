use thiserror::Error;

/// Result type alias using ExError
pub type Result<T> = std::result::Result<T, ExError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Each kind maps to a stable error code usable for programmatic handling,
/// test assertions, and translation into response categories at the
/// boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExErrorKind {
    // Read requests
    InvalidQuery,

    // Write requests
    MissingKey,
    MissingField,
    InvalidInput,
    ConstraintViolation,

    // Expansion
    ExpansionFailed,
    CircularReference,

    // Integration/IO
    /// Pool checkout or connectivity failure; the only retryable kind
    Unavailable,
    Persistence,
    Serialization,
    Config,

    // Internal
    Internal,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::InvalidQuery => "ERR_INVALID_QUERY",
            ExErrorKind::MissingKey => "ERR_MISSING_KEY",
            ExErrorKind::MissingField => "ERR_MISSING_FIELD",
            ExErrorKind::InvalidInput => "ERR_INVALID_INPUT",
            ExErrorKind::ConstraintViolation => "ERR_CONSTRAINT_VIOLATION",
            ExErrorKind::ExpansionFailed => "ERR_EXPANSION_FAILED",
            ExErrorKind::CircularReference => "ERR_CIRCULAR_REFERENCE",
            ExErrorKind::Unavailable => "ERR_UNAVAILABLE",
            ExErrorKind::Persistence => "ERR_PERSISTENCE",
            ExErrorKind::Serialization => "ERR_SERIALIZATION",
            ExErrorKind::Config => "ERR_CONFIG",
            ExErrorKind::Internal => "ERR_INTERNAL",
        }
    }

    /// Whether the kind describes bad caller input rather than a server fault
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ExErrorKind::InvalidQuery
                | ExErrorKind::MissingKey
                | ExErrorKind::MissingField
                | ExErrorKind::InvalidInput
                | ExErrorKind::ConstraintViolation
                | ExErrorKind::ExpansionFailed
                | ExErrorKind::CircularReference
        )
    }

    /// Response status category a boundary layer should use for this kind
    pub fn http_status(&self) -> u16 {
        match self {
            kind if kind.is_client_error() => 400,
            ExErrorKind::Unavailable => 503,
            _ => 500,
        }
    }
}

/// Canonical structured error type
///
/// Carries a classification kind plus the identifying context (operation,
/// table, field names, offending identifier, traversal path) that callers
/// surface verbatim.
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    table: Option<String>,
    entity_id: Option<String>,
    fields: Option<Vec<String>>,
    path: Option<String>,
    message: String,
}

impl ExError {
    /// Create a new error with the specified kind
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            table: None,
            entity_id: None,
            fields: None,
            path: None,
            message: String::new(),
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add table context
    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    /// Add entity ID context
    pub fn with_entity_id(mut self, id: impl Into<String>) -> Self {
        self.entity_id = Some(id.into());
        self
    }

    /// Add the field names involved
    pub fn with_fields(mut self, fields: Vec<String>) -> Self {
        self.fields = Some(fields);
        self
    }

    /// Add the traversal path at which the error occurred
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Get the error kind
    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    /// Get the stable error code
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// Whether this error was caused by the caller's input
    pub fn is_client_error(&self) -> bool {
        self.kind.is_client_error()
    }

    /// Only connectivity failures are worth retrying
    pub fn is_retryable(&self) -> bool {
        self.kind == ExErrorKind::Unavailable
    }

    /// Response status category for this error
    pub fn http_status(&self) -> u16 {
        self.kind.http_status()
    }

    /// Get the operation context, if any
    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    /// Get the table context, if any
    pub fn table(&self) -> Option<&str> {
        self.table.as_deref()
    }

    /// Get the entity ID context, if any
    pub fn entity_id(&self) -> Option<&str> {
        self.entity_id.as_deref()
    }

    /// Get the field names involved, if any
    pub fn fields(&self) -> Option<&[String]> {
        self.fields.as_deref()
    }

    /// Get the traversal path, if any
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for ExError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(table) = &self.table {
            write!(f, " (table: {})", table)?;
        }
        if let Some(entity_id) = &self.entity_id {
            write!(f, " (entity_id: {})", entity_id)?;
        }
        if let Some(fields) = &self.fields {
            write!(f, " (fields: {})", fields.join(", "))?;
        }
        if let Some(path) = &self.path {
            write!(f, " (path: {})", path)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExError {}

// ========== End Error Facility ==========

/// Named failure conditions raised by the store and the expansion engine
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    /// A read request had no usable conditions
    #[error("Invalid query on {table}: {reason}")]
    InvalidQuery { table: String, reason: String },

    /// Logical key fields absent from a write
    #[error("Missing keys: {} while putting into {table}", .keys.join(", "))]
    MissingKey { table: String, keys: Vec<String> },

    /// Required (non auto-assigned) fields absent from a write
    #[error("Missing fields: {} while putting into {table}", .fields.join(", "))]
    MissingField { table: String, fields: Vec<String> },

    /// A value does not fit the declared kind of its field
    #[error("Invalid value for {table}.{field}: expected {expected}")]
    InvalidFieldValue {
        table: String,
        field: String,
        expected: String,
    },

    /// The storage engine rejected the row
    #[error("Integrity error in {table}: {message}")]
    ConstraintViolation { table: String, message: String },

    /// A foreign key names an entity that does not exist at the pinned time
    #[error("Failed expansion of {relation}: {id}")]
    ExpansionFailed {
        relation: String,
        path: String,
        id: String,
    },

    /// The reference graph loops back on an identifier still being expanded
    #[error("Circular references found in data. See {id}")]
    CircularReference { id: String },

    /// Generic internal error
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl From<StoreError> for ExError {
    fn from(err: StoreError) -> Self {
        let message = err.to_string();
        match err {
            StoreError::InvalidQuery { table, .. } => ExError::new(ExErrorKind::InvalidQuery)
                .with_table(table)
                .with_message(message),

            StoreError::MissingKey { table, keys } => ExError::new(ExErrorKind::MissingKey)
                .with_table(table)
                .with_fields(keys)
                .with_message(message),

            StoreError::MissingField { table, fields } => {
                ExError::new(ExErrorKind::MissingField)
                    .with_table(table)
                    .with_fields(fields)
                    .with_message(message)
            }

            StoreError::InvalidFieldValue { table, field, .. } => {
                ExError::new(ExErrorKind::InvalidInput)
                    .with_table(table)
                    .with_fields(vec![field])
                    .with_message(message)
            }

            StoreError::ConstraintViolation { table, .. } => {
                ExError::new(ExErrorKind::ConstraintViolation)
                    .with_table(table)
                    .with_message(message)
            }

            StoreError::ExpansionFailed { path, id, .. } => {
                ExError::new(ExErrorKind::ExpansionFailed)
                    .with_entity_id(id)
                    .with_path(path)
                    .with_message(message)
            }

            StoreError::CircularReference { id } => ExError::new(ExErrorKind::CircularReference)
                .with_entity_id(id)
                .with_message(message),

            StoreError::Internal { .. } => {
                ExError::new(ExErrorKind::Internal).with_message(message)
            }
        }
    }
}
