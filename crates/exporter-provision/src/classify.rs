//! Failure classification
//!
//! A non-zero exit is not always an error: "user already exists" means the desired
//! state holds. Each step picks its own classifier so the same phrase can mean
//! different things for different resources.

use crate::runner::CommandResult;

/// Result of a command or step, after classification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success,
    /// Failed, but in a way that shows the desired state already holds
    ToleratedFailure(String),
    FatalFailure(String),
}

impl Outcome {
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::FatalFailure(_))
    }
}

/// Strategy for deciding whether a failed command is benign
pub trait FailureClassifier {
    fn classify(&self, result: &CommandResult) -> Outcome;
}

/// Tolerates failures whose stderr contains one of a set of signatures
#[derive(Debug, Clone, Default)]
pub struct SignatureClassifier {
    signatures: Vec<String>,
}

impl SignatureClassifier {
    pub fn new(signatures: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            signatures: signatures.into_iter().map(Into::into).collect(),
        }
    }

    /// Classifier that tolerates nothing
    pub fn strict() -> Self {
        Self::default()
    }
}

impl FailureClassifier for SignatureClassifier {
    fn classify(&self, result: &CommandResult) -> Outcome {
        if result.success() {
            return Outcome::Success;
        }
        // Case-sensitive substring match
        match self
            .signatures
            .iter()
            .find(|sig| result.stderr.contains(sig.as_str()))
        {
            Some(sig) => Outcome::ToleratedFailure(sig.clone()),
            None => Outcome::FatalFailure(result.stderr.trim().to_string()),
        }
    }
}

/// Tolerates a fixed set of exit codes
#[derive(Debug, Clone)]
pub struct ExitCodeClassifier {
    benign: Vec<(i32, String)>,
}

impl ExitCodeClassifier {
    pub fn new(benign: impl IntoIterator<Item = (i32, impl Into<String>)>) -> Self {
        Self {
            benign: benign.into_iter().map(|(c, r)| (c, r.into())).collect(),
        }
    }
}

impl FailureClassifier for ExitCodeClassifier {
    fn classify(&self, result: &CommandResult) -> Outcome {
        if result.success() {
            return Outcome::Success;
        }
        match self.benign.iter().find(|(code, _)| *code == result.exit_code) {
            Some((_, reason)) => Outcome::ToleratedFailure(reason.clone()),
            None => Outcome::FatalFailure(format!(
                "exit code {}: {}",
                result.exit_code,
                result.stderr.trim()
            )),
        }
    }
}

/// Classify `result` against a set of benign stderr signatures
pub fn classify(result: &CommandResult, signatures: &[&str]) -> Outcome {
    SignatureClassifier::new(signatures.iter().copied()).classify(result)
}
