//! Outcome classification
//!
//! `vzctl` and the other host-side tools report success, failure, and
//! idempotent success purely through human-readable sentences, so every
//! lifecycle operation ends with a text match against a pattern table. That
//! fragility is contained here: the table is the single place that knows
//! which phrases mean what, call sites never match text themselves, and the
//! table can be serialized/extended to track wording drift across tool
//! versions.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// The remote operations with classified outcomes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Stop,
    Start,
    Restart,
    Create,
    Destroy,
    /// A single `vzctl set` key application
    SetParam,
    /// Remote filesystem presence probe (`[[ -e path ]] && echo true`)
    FileExists,
}

/// Semantic result of a classified operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The tool reported the operation succeeded
    Success,
    /// The container was already in the requested state
    AlreadyInDesiredState,
    /// Nothing matched; carries the raw remote text verbatim
    Failure(String),
}

impl Outcome {
    /// Success, counting "already there" as success
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success | Outcome::AlreadyInDesiredState)
    }
}

/// What a matched pattern means. `Failure` is the implicit default for
/// unmatched text and never appears in a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleOutcome {
    Success,
    AlreadyInDesiredState,
}

/// One row of the classification table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    /// Substring to look for, matched case-insensitively
    pub pattern: String,
    pub outcome: RuleOutcome,
}

impl Rule {
    fn new(pattern: &str, outcome: RuleOutcome) -> Self {
        Self {
            pattern: pattern.to_string(),
            outcome,
        }
    }
}

/// The operation-specific pattern table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierTable {
    rules: HashMap<Operation, Vec<Rule>>,
}

static DEFAULT_TABLE: Lazy<ClassifierTable> = Lazy::new(ClassifierTable::builtin);

impl Default for ClassifierTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ClassifierTable {
    /// The phrases `vzctl` actually emits, one row per documented pattern
    fn builtin() -> Self {
        use RuleOutcome::{AlreadyInDesiredState, Success};
        let mut rules = HashMap::new();
        rules.insert(
            Operation::Stop,
            vec![
                Rule::new("container was stopped", Success),
                Rule::new("container is not running", AlreadyInDesiredState),
                Rule::new("config file does not exist", AlreadyInDesiredState),
            ],
        );
        rules.insert(
            Operation::Start,
            vec![
                Rule::new("container start in progress", Success),
                Rule::new("container is already running", AlreadyInDesiredState),
            ],
        );
        rules.insert(
            Operation::Restart,
            vec![Rule::new("container start in progress", Success)],
        );
        rules.insert(
            Operation::Create,
            vec![Rule::new("container private area was created", Success)],
        );
        rules.insert(
            Operation::Destroy,
            vec![Rule::new("container private area was destroyed", Success)],
        );
        rules.insert(
            Operation::SetParam,
            vec![Rule::new("saved parameters", Success)],
        );
        rules.insert(Operation::FileExists, vec![Rule::new("true", Success)]);
        Self { rules }
    }

    /// Shared built-in table
    pub fn global() -> &'static ClassifierTable {
        &DEFAULT_TABLE
    }

    /// Append a rule for `operation`. Earlier rules win, so additions only
    /// extend coverage for phrases the built-ins miss.
    pub fn add_rule(&mut self, operation: Operation, pattern: &str, outcome: RuleOutcome) {
        self.rules
            .entry(operation)
            .or_default()
            .push(Rule::new(pattern, outcome));
    }

    /// Map `output` to an outcome for `operation`.
    ///
    /// Pure: the same input always yields the same outcome. Matching is
    /// case-insensitive substring search; the first matching rule wins and
    /// unmatched text is always `Failure` with the raw output attached.
    pub fn classify(&self, operation: Operation, output: &str) -> Outcome {
        let lowered = output.to_lowercase();
        if let Some(rules) = self.rules.get(&operation) {
            for rule in rules {
                if lowered.contains(&rule.pattern.to_lowercase()) {
                    return match rule.outcome {
                        RuleOutcome::Success => Outcome::Success,
                        RuleOutcome::AlreadyInDesiredState => Outcome::AlreadyInDesiredState,
                    };
                }
            }
        }
        Outcome::Failure(output.to_string())
    }
}

/// Classify with the built-in table
pub fn classify(operation: Operation, output: &str) -> Outcome {
    ClassifierTable::global().classify(operation, output)
}
