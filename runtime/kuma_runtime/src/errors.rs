//! Error types for the runtime core.
//!
//! Every failure the core can produce is an [`EvalError`] carrying a typed
//! [`EvalErrorKind`]. Factory functions (e.g. [`arity_mismatch`]) are the
//! construction API: they populate both `kind` and the rendered `message`.
//!
//! # Recoverable vs fatal
//!
//! Most kinds are recoverable: the check that produced them ran before any
//! shared state was touched. A handful of kinds report a broken invariant
//! (a category with a gap between branches, a struct whose guard fails after
//! a mutation already happened). Those are classified by
//! [`EvalError::is_fatal`] and must abort the enclosing operation.

use std::fmt;

use kuma_ir::Name;

use crate::value::Value;

/// Result of evaluation.
pub type EvalResult<T = Value> = Result<T, EvalError>;

/// Why a single candidate rejected a list of arguments.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ArgumentFailure {
    /// Wrong number of arguments.
    Arity { expected: usize, got: usize },
    /// An argument did not satisfy its parameter's abstraction.
    Type {
        param: Name,
        expected: String,
        got: String,
    },
}

impl fmt::Display for ArgumentFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Arity { expected, got } => {
                write!(f, "{expected} arguments required but {got} given")
            }
            Self::Type {
                param,
                expected,
                got,
            } => write!(f, "invalid argument {param}: expected {expected}, got {got}"),
        }
    }
}

/// Diagnostic for one overload candidate that did not match.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CandidateFailure {
    /// Description of the candidate, including its prototype.
    pub candidate: String,
    /// The check it failed.
    pub reason: ArgumentFailure,
}

/// Typed error category.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EvalErrorKind {
    // Function
    ArityMismatch {
        callable: String,
        expected: usize,
        got: usize,
    },
    ArgumentTypeMismatch {
        callable: String,
        param: Name,
        expected: String,
        got: String,
    },
    ReturnTypeMismatch {
        callable: String,
        expected: String,
        got: String,
    },
    NoMatchingOverload {
        name: String,
        candidates: Vec<CandidateFailure>,
    },
    NotCallable {
        type_name: String,
    },
    DuplicateParameter {
        name: Name,
    },
    StackOverflow {
        depth: usize,
    },

    // Scope
    VariableNotFound {
        name: Name,
    },
    VariableNotDeclared {
        name: Name,
    },
    AlreadyDeclared {
        name: Name,
    },
    NotReassignable {
        name: Name,
    },
    VariableTypeMismatch {
        name: Name,
        expected: String,
    },
    ScopeReadOnly {
        name: Name,
    },

    // Abstraction
    DuplicateBranch {
        name: Name,
    },
    CategoryBranchMissing {
        category: String,
        got: String,
    },
    DuplicateEnumItem {
        name: Name,
    },
    TemplateArgInvalid {
        index: usize,
    },
    TemplateReturnInvalid {
        got: String,
    },

    // Schema / Struct
    SchemaFieldMissing {
        field: Name,
    },
    SchemaFieldInvalid {
        field: Name,
    },
    SchemaInvalidDefault {
        field: Name,
    },
    SchemaUnknownDefault {
        field: Name,
    },
    SchemaFieldConflict {
        field: Name,
    },
    SchemaGuardRejected {
        schema: Name,
    },
    GuardNotBool {
        schema: Name,
        got: String,
    },
    StructFieldMissing {
        field: Name,
    },
    StructInconsistent {
        field: Name,
    },
    StructGuardViolated {
        schema: Name,
    },

    // Composition
    MethodConflict {
        name: Name,
        first: String,
        second: String,
    },
    MethodMissing {
        name: Name,
        class: String,
        interface: String,
    },
    MethodInvalid {
        name: Name,
        class: String,
        interface: String,
    },
    OperatorConflict {
        operator: Name,
        first: String,
        second: String,
    },
    NotMounting {
        class: String,
    },
    MountingUndeclared {
        class: String,
    },
    MountingMounted {
        class: String,
    },
    InvalidMount,
    InvalidInitializer {
        class: String,
    },
    InterfaceDefaultInvalid {
        name: Name,
    },
    MethodNotFound {
        name: Name,
        type_name: String,
    },
    NoCommonClass {
        operator: Name,
    },
    InstanceDropped {
        callable: String,
    },

    /// Failure raised by a host-provided body that has no structured kind.
    Custom {
        message: String,
    },
}

impl EvalErrorKind {
    /// Whether this kind reports a broken invariant rather than a normal
    /// runtime condition.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::CategoryBranchMissing { .. }
                | Self::StructInconsistent { .. }
                | Self::StructGuardViolated { .. }
                | Self::InstanceDropped { .. }
        )
    }
}

impl fmt::Display for EvalErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // Function
            Self::ArityMismatch {
                callable,
                expected,
                got,
            } => {
                let arg_word = if *expected == 1 {
                    "argument"
                } else {
                    "arguments"
                };
                write!(f, "{callable}: {expected} {arg_word} required but {got} given")
            }
            Self::ArgumentTypeMismatch {
                callable,
                param,
                expected,
                got,
            } => write!(
                f,
                "{callable}: invalid argument {param}: expected {expected}, got {got}"
            ),
            Self::ReturnTypeMismatch {
                callable,
                expected,
                got,
            } => write!(
                f,
                "{callable}: invalid return value: expected {expected}, got {got}"
            ),
            Self::NoMatchingOverload { name, candidates } => {
                write!(f, "{name}: invalid arguments: no matching function")?;
                if !candidates.is_empty() {
                    write!(f, "\n\navailable functions are:")?;
                    for candidate in candidates {
                        write!(f, "\n    {}: {}", candidate.candidate, candidate.reason)?;
                    }
                }
                Ok(())
            }
            Self::NotCallable { type_name } => {
                write!(f, "unable to call non-callable object of type {type_name}")
            }
            Self::DuplicateParameter { name } => {
                write!(f, "parameter {name} declared more than once")
            }
            Self::StackOverflow { depth } => {
                write!(f, "maximum call depth exceeded (limit: {depth})")
            }

            // Scope
            Self::VariableNotFound { name } => write!(f, "variable {name} not found"),
            Self::VariableNotDeclared { name } => write!(f, "variable {name} not declared"),
            Self::AlreadyDeclared { name } => write!(f, "variable {name} already declared"),
            Self::NotReassignable { name } => write!(f, "cannot reset fixed variable {name}"),
            Self::VariableTypeMismatch { name, expected } => write!(
                f,
                "invalid value assigned to variable {name}: expected {expected}"
            ),
            Self::ScopeReadOnly { name } => {
                write!(f, "cannot modify variable {name}: scope is read-only")
            }

            // Abstraction
            Self::DuplicateBranch { name } => {
                write!(f, "branch {name} defined twice in the same category")
            }
            Self::CategoryBranchMissing { category, got } => write!(
                f,
                "no branch of {category} contains the given {got} value"
            ),
            Self::DuplicateEnumItem { name } => {
                write!(f, "enum item {name} defined twice")
            }
            Self::TemplateArgInvalid { index } => write!(
                f,
                "invalid template argument #{index}: neither a type nor a primitive"
            ),
            Self::TemplateReturnInvalid { got } => write!(
                f,
                "return value of type template should be a type, got {got}"
            ),

            // Schema / Struct
            Self::SchemaFieldMissing { field } => write!(
                f,
                "invalid structure initialization: missing field '{field}'"
            ),
            Self::SchemaFieldInvalid { field } => write!(
                f,
                "given value for field '{field}' violated the schema of the struct"
            ),
            Self::SchemaInvalidDefault { field } => {
                write!(f, "invalid default value for field '{field}'")
            }
            Self::SchemaUnknownDefault { field } => {
                write!(f, "default value given for undefined field '{field}'")
            }
            Self::SchemaFieldConflict { field } => {
                write!(f, "field '{field}' was defined twice or more")
            }
            Self::SchemaGuardRejected { schema } => {
                write!(f, "the guard of schema {schema} rejected the structure")
            }
            Self::GuardNotBool { schema, got } => write!(
                f,
                "the guard of schema {schema} returned {got} instead of a boolean value"
            ),
            Self::StructFieldMissing { field } => {
                write!(f, "field '{field}' does not exist on the struct")
            }
            Self::StructInconsistent { field } => write!(
                f,
                "the value of field '{field}' became violating the schema"
            ),
            Self::StructGuardViolated { schema } => write!(
                f,
                "structure of schema {schema} no longer satisfies its guard"
            ),

            // Composition
            Self::MethodConflict {
                name,
                first,
                second,
            } => write!(
                f,
                "method conflict:\n    {first}\nand\n    {second}\nboth have method: {name}()"
            ),
            Self::MethodMissing {
                name,
                class,
                interface,
            } => write!(
                f,
                "the {class}\ndoes not implement\n    {interface}\n(missing method {name}())"
            ),
            Self::MethodInvalid {
                name,
                class,
                interface,
            } => write!(
                f,
                "the {class}\ndoes not implement\n    {interface}\n(invalid method {name}())"
            ),
            Self::OperatorConflict {
                operator,
                first,
                second,
            } => write!(
                f,
                "operator {operator} defined in {first}\nconflicts with the operator {operator} defined in\n    {second}"
            ),
            Self::NotMounting { class } => {
                write!(f, "created instance did not mount an instance of {class}")
            }
            Self::MountingUndeclared { class } => write!(
                f,
                "unable to mount instance of undeclared base class:\n    {class}"
            ),
            Self::MountingMounted { class } => write!(
                f,
                "an instance of the same base class is already mounted: {class}"
            ),
            Self::InvalidMount => {
                write!(f, "mount operator is only available inside initializer")
            }
            Self::InvalidInitializer { class } => {
                write!(f, "initializer of {class} must be a plain function")
            }
            Self::InterfaceDefaultInvalid { name } => write!(
                f,
                "invalid interface: default implementation of {name}() has no single prototype"
            ),
            Self::MethodNotFound { name, type_name } => {
                write!(f, "method {name}() does not exist on {type_name}")
            }
            Self::NoCommonClass { operator } => write!(
                f,
                "unable to find a common class of both instances that defined operator {operator}"
            ),
            Self::InstanceDropped { callable } => write!(
                f,
                "{callable}: the instance this method belongs to no longer exists"
            ),

            Self::Custom { message } => write!(f, "{message}"),
        }
    }
}

/// A single frame in an evaluation backtrace.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BacktraceFrame {
    /// Description of the callable that was executing.
    pub name: String,
}

/// Snapshot of the call stack at an error site, innermost frame first.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EvalBacktrace {
    frames: Vec<BacktraceFrame>,
}

impl EvalBacktrace {
    /// Create a backtrace from a list of frames.
    pub fn new(frames: Vec<BacktraceFrame>) -> Self {
        Self { frames }
    }

    /// Get the backtrace frames.
    pub fn frames(&self) -> &[BacktraceFrame] {
        &self.frames
    }

    /// Check if the backtrace is empty.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Number of frames in the backtrace.
    pub fn len(&self) -> usize {
        self.frames.len()
    }
}

impl fmt::Display for EvalBacktrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.frames.is_empty() {
            return Ok(());
        }
        writeln!(f, "stack backtrace:")?;
        for (i, frame) in self.frames.iter().enumerate() {
            writeln!(f, "  {i}: {}", frame.name)?;
        }
        Ok(())
    }
}

/// Evaluation error.
#[derive(Clone, Debug)]
pub struct EvalError {
    /// Structured error category.
    pub kind: EvalErrorKind,
    /// Human-readable error message, equal to `kind.to_string()` for
    /// factory-created errors.
    pub message: String,
    /// Call stack at the point the error left its innermost frame.
    pub backtrace: Option<EvalBacktrace>,
    /// Additional context notes.
    pub notes: Vec<String>,
}

impl EvalError {
    /// Create an error with just a message.
    ///
    /// Uses the `Custom` kind; host-provided bodies use this to fail.
    pub fn new(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::from_kind(EvalErrorKind::Custom {
            message: message.clone(),
        })
    }

    fn from_kind(kind: EvalErrorKind) -> Self {
        let message = kind.to_string();
        Self {
            kind,
            message,
            backtrace: None,
            notes: Vec::new(),
        }
    }

    /// Attach a backtrace to this error.
    #[must_use]
    pub fn with_backtrace(mut self, backtrace: EvalBacktrace) -> Self {
        self.backtrace = Some(backtrace);
        self
    }

    /// Add a context note to this error.
    #[must_use]
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    /// Whether this error reports a broken invariant.
    #[inline]
    pub fn is_fatal(&self) -> bool {
        self.kind.is_fatal()
    }
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        for note in &self.notes {
            write!(f, "\n  note: {note}")?;
        }
        if let Some(backtrace) = &self.backtrace {
            if !backtrace.is_empty() {
                write!(f, "\n{backtrace}")?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for EvalError {}

// Function Errors

#[cold]
pub fn arity_mismatch(callable: &str, expected: usize, got: usize) -> EvalError {
    EvalError::from_kind(EvalErrorKind::ArityMismatch {
        callable: callable.to_string(),
        expected,
        got,
    })
}

#[cold]
pub fn argument_type_mismatch(callable: &str, param: Name, expected: &str, got: &str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::ArgumentTypeMismatch {
        callable: callable.to_string(),
        param,
        expected: expected.to_string(),
        got: got.to_string(),
    })
}

/// Convert a prototype check failure into the error a direct call reports.
#[cold]
pub fn argument_failure(callable: &str, failure: ArgumentFailure) -> EvalError {
    match failure {
        ArgumentFailure::Arity { expected, got } => arity_mismatch(callable, expected, got),
        ArgumentFailure::Type {
            param,
            expected,
            got,
        } => argument_type_mismatch(callable, param, &expected, &got),
    }
}

#[cold]
pub fn return_type_mismatch(callable: &str, expected: &str, got: &str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::ReturnTypeMismatch {
        callable: callable.to_string(),
        expected: expected.to_string(),
        got: got.to_string(),
    })
}

#[cold]
pub fn no_matching_overload(name: &str, candidates: Vec<CandidateFailure>) -> EvalError {
    EvalError::from_kind(EvalErrorKind::NoMatchingOverload {
        name: name.to_string(),
        candidates,
    })
}

#[cold]
pub fn not_callable(type_name: &str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::NotCallable {
        type_name: type_name.to_string(),
    })
}

#[cold]
pub fn duplicate_parameter(name: Name) -> EvalError {
    EvalError::from_kind(EvalErrorKind::DuplicateParameter { name })
}

#[cold]
pub fn stack_overflow(depth: usize) -> EvalError {
    EvalError::from_kind(EvalErrorKind::StackOverflow { depth })
}

// Scope Errors

#[cold]
pub fn variable_not_found(name: Name) -> EvalError {
    EvalError::from_kind(EvalErrorKind::VariableNotFound { name })
}

#[cold]
pub fn variable_not_declared(name: Name) -> EvalError {
    EvalError::from_kind(EvalErrorKind::VariableNotDeclared { name })
}

#[cold]
pub fn already_declared(name: Name) -> EvalError {
    EvalError::from_kind(EvalErrorKind::AlreadyDeclared { name })
}

#[cold]
pub fn not_reassignable(name: Name) -> EvalError {
    EvalError::from_kind(EvalErrorKind::NotReassignable { name })
}

#[cold]
pub fn variable_type_mismatch(name: Name, expected: &str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::VariableTypeMismatch {
        name,
        expected: expected.to_string(),
    })
}

#[cold]
pub fn scope_read_only(name: Name) -> EvalError {
    EvalError::from_kind(EvalErrorKind::ScopeReadOnly { name })
}

// Abstraction Errors

#[cold]
pub fn duplicate_branch(name: Name) -> EvalError {
    EvalError::from_kind(EvalErrorKind::DuplicateBranch { name })
}

#[cold]
pub fn category_branch_missing(category: &str, got: &str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::CategoryBranchMissing {
        category: category.to_string(),
        got: got.to_string(),
    })
}

#[cold]
pub fn duplicate_enum_item(name: Name) -> EvalError {
    EvalError::from_kind(EvalErrorKind::DuplicateEnumItem { name })
}

#[cold]
pub fn template_arg_invalid(index: usize) -> EvalError {
    EvalError::from_kind(EvalErrorKind::TemplateArgInvalid { index })
}

#[cold]
pub fn template_return_invalid(got: &str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::TemplateReturnInvalid {
        got: got.to_string(),
    })
}

// Schema and Struct Errors

#[cold]
pub fn schema_field_missing(field: Name) -> EvalError {
    EvalError::from_kind(EvalErrorKind::SchemaFieldMissing { field })
}

#[cold]
pub fn schema_field_invalid(field: Name) -> EvalError {
    EvalError::from_kind(EvalErrorKind::SchemaFieldInvalid { field })
}

#[cold]
pub fn schema_invalid_default(field: Name) -> EvalError {
    EvalError::from_kind(EvalErrorKind::SchemaInvalidDefault { field })
}

#[cold]
pub fn schema_unknown_default(field: Name) -> EvalError {
    EvalError::from_kind(EvalErrorKind::SchemaUnknownDefault { field })
}

#[cold]
pub fn schema_field_conflict(field: Name) -> EvalError {
    EvalError::from_kind(EvalErrorKind::SchemaFieldConflict { field })
}

#[cold]
pub fn schema_guard_rejected(schema: Name) -> EvalError {
    EvalError::from_kind(EvalErrorKind::SchemaGuardRejected { schema })
}

#[cold]
pub fn guard_not_bool(schema: Name, got: &str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::GuardNotBool {
        schema,
        got: got.to_string(),
    })
}

#[cold]
pub fn struct_field_missing(field: Name) -> EvalError {
    EvalError::from_kind(EvalErrorKind::StructFieldMissing { field })
}

#[cold]
pub fn struct_inconsistent(field: Name) -> EvalError {
    EvalError::from_kind(EvalErrorKind::StructInconsistent { field })
}

#[cold]
pub fn struct_guard_violated(schema: Name) -> EvalError {
    EvalError::from_kind(EvalErrorKind::StructGuardViolated { schema })
}

// Composition Errors

#[cold]
pub fn method_conflict(name: Name, first: &str, second: &str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::MethodConflict {
        name,
        first: first.to_string(),
        second: second.to_string(),
    })
}

#[cold]
pub fn method_missing(name: Name, class: &str, interface: &str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::MethodMissing {
        name,
        class: class.to_string(),
        interface: interface.to_string(),
    })
}

#[cold]
pub fn method_invalid(name: Name, class: &str, interface: &str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::MethodInvalid {
        name,
        class: class.to_string(),
        interface: interface.to_string(),
    })
}

#[cold]
pub fn operator_conflict(operator: Name, first: &str, second: &str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::OperatorConflict {
        operator,
        first: first.to_string(),
        second: second.to_string(),
    })
}

#[cold]
pub fn not_mounting(class: &str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::NotMounting {
        class: class.to_string(),
    })
}

#[cold]
pub fn mounting_undeclared(class: &str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::MountingUndeclared {
        class: class.to_string(),
    })
}

#[cold]
pub fn mounting_mounted(class: &str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::MountingMounted {
        class: class.to_string(),
    })
}

#[cold]
pub fn invalid_mount() -> EvalError {
    EvalError::from_kind(EvalErrorKind::InvalidMount)
}

#[cold]
pub fn invalid_initializer(class: &str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::InvalidInitializer {
        class: class.to_string(),
    })
}

#[cold]
pub fn interface_default_invalid(name: Name) -> EvalError {
    EvalError::from_kind(EvalErrorKind::InterfaceDefaultInvalid { name })
}

#[cold]
pub fn method_not_found(name: Name, type_name: &str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::MethodNotFound {
        name,
        type_name: type_name.to_string(),
    })
}

#[cold]
pub fn no_common_class(operator: Name) -> EvalError {
    EvalError::from_kind(EvalErrorKind::NoCommonClass { operator })
}

#[cold]
pub fn instance_dropped(callable: &str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::InstanceDropped {
        callable: callable.to_string(),
    })
}
