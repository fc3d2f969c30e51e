// SPDX-License-Identifier: MIT
// Copyright 2026 Poppy contributors

//! `Mishap`: the structured failure value carried by the core. Every
//! fallible operation in this crate returns `Result<T, Mishap>`; there is
//! no panicking/catching inside the core, only scoped acquisition
//! (`CodePlanter`'s `Drop` releases its extra-roots regardless of how its
//! scope is exited).

#[cfg(test)]
mod mishap_test;

use core::fmt;

/// How serious a `Mishap` is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// A failure produced while running already-planted bytecode.
    Execution,
    /// A failure produced while a `CodePlanter` is assembling a procedure.
    Compile,
    /// A failure in the runtime substrate itself (heap exhaustion that
    /// survives a GC, an invalid key code, …).
    System,
}

/// The kind of failure, used by callers to decide whether a retry (GC then
/// re-attempt allocation) makes sense.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    HeapOverflow,
    NotSmall,
    Overflow,
    NotCallable,
    InvalidKey,
    DuplicateLocal,
    NotAProcedure,
}

impl Kind {
    const fn severity(self) -> Severity {
        match self {
            Self::HeapOverflow | Self::InvalidKey => Severity::System,
            Self::NotSmall | Self::Overflow | Self::NotCallable | Self::NotAProcedure => {
                Severity::Execution
            }
            Self::DuplicateLocal => Severity::Compile,
        }
    }

    const fn default_message(self) -> &'static str {
        match self {
            Self::HeapOverflow => "heap overflow",
            Self::NotSmall => "operand is not a small integer",
            Self::Overflow => "small-integer arithmetic overflowed",
            Self::NotCallable => "cell is not a procedure",
            Self::InvalidKey => "unknown key code during heap walk",
            Self::DuplicateLocal => "local redeclared within the same scope",
            Self::NotAProcedure => "entry point does not reference a ProcedureKey",
        }
    }
}

/// A structured failure: a message, a severity, and an ordered list of
/// `(key, value)` culprits describing what was being done when it fired.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mishap {
    kind: Kind,
    message: String,
    severity: Severity,
    culprits: Vec<(String, String)>,
}

impl Mishap {
    #[must_use]
    pub fn new(kind: Kind) -> Self {
        Self {
            kind,
            message: kind.default_message().to_string(),
            severity: kind.severity(),
            culprits: Vec::new(),
        }
    }

    #[must_use]
    pub fn kind(&self) -> Kind {
        self.kind
    }

    #[must_use]
    pub fn severity(&self) -> Severity {
        self.severity
    }

    #[must_use]
    pub fn culprits(&self) -> &[(String, String)] {
        &self.culprits
    }

    /// Attach a `(key, value)` culprit, returning `self` for chaining.
    #[must_use]
    pub fn culprit(mut self, key: impl Into<String>, value: impl fmt::Display) -> Self {
        self.culprits.push((key.into(), value.to_string()));
        self
    }

    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn heap_overflow() -> Self {
        Self::new(Kind::HeapOverflow)
    }

    pub fn not_small() -> Self {
        Self::new(Kind::NotSmall)
    }

    pub fn overflow() -> Self {
        Self::new(Kind::Overflow)
    }

    pub fn not_callable() -> Self {
        Self::new(Kind::NotCallable)
    }

    pub fn invalid_key() -> Self {
        Self::new(Kind::InvalidKey)
    }

    pub fn duplicate_local() -> Self {
        Self::new(Kind::DuplicateLocal)
    }

    pub fn not_a_procedure() -> Self {
        Self::new(Kind::NotAProcedure)
    }
}

impl fmt::Display for Mishap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}] {}", self.severity, self.message)?;
        for (key, value) in &self.culprits {
            write!(f, " ({key}: {value})")?;
        }
        Ok(())
    }
}

impl std::error::Error for Mishap {}
