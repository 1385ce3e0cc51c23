//! Error classification and assertion helpers
//!
//! Operations that fail with an error a workload expects under contention
//! (duplicate keys under racing inserts, write conflicts, transient
//! transaction errors) are *tolerated*: counted and logged, but the worker
//! carries on. Everything else is *unexpected* and fails the workload.
//!
//! The set of tolerated errors lives in an [`ErrorClassifier`] attached to
//! the workload config rather than in each state function.

use fsm_core::{
    CommandError, CommandResult, Document, ErrorCode, HarnessError, HarnessResult, Value,
    TRANSIENT_TRANSACTION_ERROR,
};

/// Verdict on one error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Expected under contention; carry on
    Tolerated(ErrorCode),
    /// Fails the workload
    Unexpected,
}

/// Allowlist of error codes and labels a workload tolerates
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorClassifier {
    codes: Vec<ErrorCode>,
    labels: Vec<String>,
}

impl ErrorClassifier {
    /// Classifier tolerating nothing
    pub fn new() -> Self {
        Self::default()
    }

    /// Classifier tolerating the given codes
    pub fn tolerating(codes: impl IntoIterator<Item = ErrorCode>) -> Self {
        let mut c = Self::new();
        for code in codes {
            c.add_code(code);
        }
        c
    }

    /// Classifier for multi-statement transactions: tolerates anything
    /// labelled `TransientTransactionError` plus `WriteConflict` and
    /// `NoSuchTransaction`
    pub fn transactional() -> Self {
        Self::tolerating([ErrorCode::WRITE_CONFLICT, ErrorCode::NO_SUCH_TRANSACTION])
            .with_label(TRANSIENT_TRANSACTION_ERROR)
    }

    /// Add a tolerated code
    pub fn with_code(mut self, code: ErrorCode) -> Self {
        self.add_code(code);
        self
    }

    /// Add a tolerated error label
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        let label = label.into();
        if !self.labels.contains(&label) {
            self.labels.push(label);
        }
        self
    }

    /// Add a tolerated code in place
    pub fn add_code(&mut self, code: ErrorCode) {
        if !self.codes.contains(&code) {
            self.codes.push(code);
            self.codes.sort();
        }
    }

    /// Union with another classifier
    pub fn merge(&mut self, other: &ErrorClassifier) {
        for code in &other.codes {
            self.add_code(*code);
        }
        for label in &other.labels {
            if !self.labels.contains(label) {
                self.labels.push(label.clone());
            }
        }
    }

    /// Tolerated codes, ascending
    pub fn codes(&self) -> &[ErrorCode] {
        &self.codes
    }

    /// Classify a command failure
    pub fn classify_command(&self, err: &CommandError) -> Classification {
        if self.codes.contains(&err.code) || self.labels.iter().any(|l| err.has_label(l)) {
            Classification::Tolerated(err.code)
        } else {
            Classification::Unexpected
        }
    }

    /// Classify any harness error; only command failures can be tolerated
    pub fn classify(&self, err: &HarnessError) -> Classification {
        match err.as_command() {
            Some(cmd) => self.classify_command(cmd),
            None => Classification::Unexpected,
        }
    }

    /// Whether `err` is tolerated
    pub fn is_tolerated(&self, err: &HarnessError) -> bool {
        matches!(self.classify(err), Classification::Tolerated(_))
    }
}

/// Fail unless `cond` holds
///
/// # Errors
///
/// Returns [`HarnessError::Assertion`] with `msg`.
pub fn assert_always(cond: bool, msg: impl FnOnce() -> String) -> HarnessResult<()> {
    if cond {
        Ok(())
    } else {
        Err(HarnessError::Assertion(msg()))
    }
}

/// Fail unless `cond` holds, but only when the workload owns its collection
///
/// Assertions about collection contents are meaningless when other
/// workloads write to the same collection; those are skipped.
///
/// # Errors
///
/// Returns [`HarnessError::Assertion`] with `msg` when enforced and false.
pub fn assert_when_own_coll(
    owns_collection: bool,
    cond: bool,
    msg: impl FnOnce() -> String,
) -> HarnessResult<()> {
    if !owns_collection {
        return Ok(());
    }
    assert_always(cond, msg)
}

/// Unwrap a command reply, failing on an error or a reply without `ok: 1`
///
/// # Errors
///
/// Returns the command error, or an assertion error for a non-ok reply.
pub fn assert_command_worked(reply: CommandResult<Document>) -> HarnessResult<Document> {
    let doc = reply?;
    let ok = doc.get("ok").and_then(Value::as_f64).unwrap_or(0.0);
    if ok != 1.0 {
        return Err(HarnessError::Assertion(format!(
            "command reply not ok: {:?}",
            doc
        )));
    }
    Ok(doc)
}

/// Expect a command to fail with one of `codes`
///
/// # Errors
///
/// Returns an assertion error if the command succeeded or failed with a
/// different code.
pub fn assert_command_failed_with_code<T: std::fmt::Debug>(
    result: CommandResult<T>,
    codes: &[ErrorCode],
) -> HarnessResult<CommandError> {
    match result {
        Ok(v) => Err(HarnessError::Assertion(format!(
            "expected failure with {:?}, command succeeded: {:?}",
            codes, v
        ))),
        Err(e) if codes.contains(&e.code) => Ok(e),
        Err(e) => Err(HarnessError::Assertion(format!(
            "expected failure with {:?}, got {}",
            codes, e
        ))),
    }
}

/// Let a result through, swallowing errors `classifier` tolerates
///
/// Returns `Ok(None)` for a tolerated failure.
///
/// # Errors
///
/// Returns unexpected failures unchanged.
pub fn assert_worked_handle_txn_errors<T>(
    result: CommandResult<T>,
    classifier: &ErrorClassifier,
) -> HarnessResult<Option<T>> {
    match result {
        Ok(v) => Ok(Some(v)),
        Err(e) => match classifier.classify_command(&e) {
            Classification::Tolerated(code) => {
                tracing::warn!(code = code.0, error = %e, "tolerated error");
                Ok(None)
            }
            Classification::Unexpected => Err(HarnessError::Command(e)),
        },
    }
}
