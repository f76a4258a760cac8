// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Failure Classifier
//!
//! Maps a message to exactly one [`FailureCategory`] by case-insensitive
//! keyword matching over an ordered rule list. The first matching rule wins,
//! so rule order is part of the contract: "system too complex - timeout" is an
//! architecture failure because the architecture rule precedes the timeout
//! rule.
//!
//! Rules are data. Callers extend the taxonomy by prepending their own rules
//! ([`FailureClassifier::with_custom_rules`]); the built-in list is never
//! edited.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Pure message → category mapping and the failure predicate

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::trace::TraceRecord;

/// Closed failure taxonomy, declared in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FailureCategory {
    #[serde(rename = "LLM API Error")]
    LlmApiError,
    #[serde(rename = "Code Generation Error")]
    CodeGenerationError,
    #[serde(rename = "Requirements Analysis Error")]
    RequirementsAnalysisError,
    #[serde(rename = "Architecture Design Error")]
    ArchitectureDesignError,
    #[serde(rename = "Project Management Error")]
    ProjectManagementError,
    #[serde(rename = "Implementation Error")]
    ImplementationError,
    #[serde(rename = "Syntax / Compile Error")]
    SyntaxCompileError,
    #[serde(rename = "Logic / Test Failure")]
    LogicTestFailure,
    #[serde(rename = "Timeout")]
    Timeout,
    #[serde(rename = "LLM Hallucination")]
    LlmHallucination,
    #[serde(rename = "Other")]
    Other,
}

impl FailureCategory {
    /// Every category, in taxonomy order.
    pub const ALL: [FailureCategory; 11] = [
        FailureCategory::LlmApiError,
        FailureCategory::CodeGenerationError,
        FailureCategory::RequirementsAnalysisError,
        FailureCategory::ArchitectureDesignError,
        FailureCategory::ProjectManagementError,
        FailureCategory::ImplementationError,
        FailureCategory::SyntaxCompileError,
        FailureCategory::LogicTestFailure,
        FailureCategory::Timeout,
        FailureCategory::LlmHallucination,
        FailureCategory::Other,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            FailureCategory::LlmApiError => "LLM API Error",
            FailureCategory::CodeGenerationError => "Code Generation Error",
            FailureCategory::RequirementsAnalysisError => "Requirements Analysis Error",
            FailureCategory::ArchitectureDesignError => "Architecture Design Error",
            FailureCategory::ProjectManagementError => "Project Management Error",
            FailureCategory::ImplementationError => "Implementation Error",
            FailureCategory::SyntaxCompileError => "Syntax / Compile Error",
            FailureCategory::LogicTestFailure => "Logic / Test Failure",
            FailureCategory::Timeout => "Timeout",
            FailureCategory::LlmHallucination => "LLM Hallucination",
            FailureCategory::Other => "Other",
        }
    }

    /// Inverse of [`label`](Self::label), case-insensitive.
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.label().eq_ignore_ascii_case(label))
    }
}

impl fmt::Display for FailureCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One ordered rule: any keyword matching the message selects `category`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationRule {
    pub category: FailureCategory,
    pub keywords: Vec<String>,
}

impl ClassificationRule {
    /// Keywords are lowercased once here so matching only lowercases the message.
    pub fn new<I, S>(category: FailureCategory, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            category,
            keywords: keywords
                .into_iter()
                .map(|k| k.as_ref().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
        }
    }

    fn matches(&self, lowered_message: &str) -> bool {
        self.keywords
            .iter()
            .any(|k| lowered_message.contains(k.as_str()))
    }
}

/// Words that make a message failure-indicating.
pub const DEFAULT_FAILURE_KEYWORDS: &[&str] =
    &["fail", "error", "exception", "crash", "timeout", "hallucination"];

/// The built-in rule list, in evaluation order.
///
/// Note: rule 2 matches "syntax" and "compile", so rule 7 is only reachable
/// through phrases that contain neither (e.g. "unexpected indent").
pub fn builtin_rules() -> Vec<ClassificationRule> {
    use FailureCategory::*;
    vec![
        ClassificationRule::new(LlmApiError, ["llm", "gpt", "openai", "api"]),
        ClassificationRule::new(CodeGenerationError, ["code generation", "syntax", "compile"]),
        ClassificationRule::new(RequirementsAnalysisError, ["requirements", "user story", "product"]),
        ClassificationRule::new(ArchitectureDesignError, ["architecture", "design", "system"]),
        ClassificationRule::new(ProjectManagementError, ["project", "planning", "timeline"]),
        ClassificationRule::new(ImplementationError, ["implementation", "coding", "development"]),
        ClassificationRule::new(
            SyntaxCompileError,
            [
                "syntax error",
                "compile error",
                "compilation failed",
                "unexpected indent",
                "invalid syntax",
            ],
        ),
        ClassificationRule::new(
            LogicTestFailure,
            [
                "assertion failed",
                "test failed",
                "logic error",
                "incorrect result",
                "wrong output",
                "failed test",
                "did not pass",
                "mismatch",
            ],
        ),
        ClassificationRule::new(Timeout, ["timeout", "timed out"]),
        ClassificationRule::new(
            LlmHallucination,
            [
                "hallucination",
                "nonsensical",
                "made up",
                "fabricated",
                "not in context",
                "irrelevant",
                "llm mistake",
            ],
        ),
    ]
}

/// Ordered keyword classifier. Cheap to clone and share.
#[derive(Debug, Clone)]
pub struct FailureClassifier {
    rules: Vec<ClassificationRule>,
    failure_keywords: Vec<String>,
}

impl Default for FailureClassifier {
    fn default() -> Self {
        Self {
            rules: builtin_rules(),
            failure_keywords: DEFAULT_FAILURE_KEYWORDS.iter().map(|k| k.to_string()).collect(),
        }
    }
}

impl FailureClassifier {
    /// Classifier whose `custom` rules are consulted before the built-in list.
    pub fn with_custom_rules(custom: Vec<ClassificationRule>) -> Self {
        let mut classifier = Self::default();
        classifier.prepend_rules(custom);
        classifier
    }

    /// Insert rules ahead of everything already present, keeping their order.
    pub fn prepend_rules(&mut self, rules: Vec<ClassificationRule>) {
        let mut merged = rules;
        merged.append(&mut self.rules);
        self.rules = merged;
    }

    /// Replace the words that make a message failure-indicating.
    pub fn with_failure_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.failure_keywords = keywords
            .into_iter()
            .map(|k| k.as_ref().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();
        self
    }

    pub fn rules(&self) -> &[ClassificationRule] {
        &self.rules
    }

    /// Total: every message maps to a category, `Other` when nothing matches.
    pub fn classify(&self, message: &str) -> FailureCategory {
        let lowered = message.to_lowercase();
        self.rules
            .iter()
            .find(|rule| rule.matches(&lowered))
            .map(|rule| rule.category)
            .unwrap_or(FailureCategory::Other)
    }

    /// Failure-indicating: an error-or-worse level, or a failure keyword in
    /// the message. Classification alone never makes a record a failure.
    pub fn is_failure(&self, record: &TraceRecord) -> bool {
        if record.level().is_failure() {
            return true;
        }
        let lowered = record.message().to_lowercase();
        self.failure_keywords
            .iter()
            .any(|k| lowered.contains(k.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::trace::{AgentId, LogLevel};

    fn record(level: LogLevel, message: &str) -> TraceRecord {
        TraceRecord::now(AgentId::new("agent").unwrap(), level, message)
    }

    #[test]
    fn test_documented_examples() {
        let classifier = FailureClassifier::default();
        assert_eq!(
            classifier.classify("LLM API rate limit exceeded"),
            FailureCategory::LlmApiError
        );
        assert_eq!(
            classifier.classify("assertion failed on step 3"),
            FailureCategory::LogicTestFailure
        );
        assert_eq!(classifier.classify("nothing relevant here"), FailureCategory::Other);
    }

    #[test]
    fn test_priority_order_wins_over_later_rules() {
        let classifier = FailureClassifier::default();
        // "system" (architecture) precedes "timeout"
        assert_eq!(
            classifier.classify("system too complex - timeout"),
            FailureCategory::ArchitectureDesignError
        );
        assert_eq!(classifier.classify("request timed out"), FailureCategory::Timeout);
    }

    #[test]
    fn test_matching_is_case_insensitive() {
        let classifier = FailureClassifier::default();
        assert_eq!(classifier.classify("OPENAI quota"), FailureCategory::LlmApiError);
        assert_eq!(classifier.classify("Timeline slipped"), FailureCategory::ProjectManagementError);
    }

    #[test]
    fn test_narrow_syntax_rule_is_shadowed_by_code_generation() {
        // Known taxonomy ambiguity: "syntax error" also contains "syntax",
        // which the broader code generation rule claims first.
        let classifier = FailureClassifier::default();
        assert_eq!(
            classifier.classify("syntax error on line 4"),
            FailureCategory::CodeGenerationError
        );
        assert_eq!(
            classifier.classify("compile error in main"),
            FailureCategory::CodeGenerationError
        );
        assert_eq!(
            classifier.classify("unexpected indent at line 2"),
            FailureCategory::SyntaxCompileError
        );
    }

    #[test]
    fn test_custom_rules_take_precedence() {
        let classifier = FailureClassifier::with_custom_rules(vec![ClassificationRule::new(
            FailureCategory::Timeout,
            ["Deadline Exceeded", "system"],
        )]);

        assert_eq!(
            classifier.classify("system too complex"),
            FailureCategory::Timeout
        );
        assert_eq!(classifier.classify("deadline exceeded"), FailureCategory::Timeout);
        // built-ins still apply after the custom list
        assert_eq!(classifier.classify("gpt refused"), FailureCategory::LlmApiError);
    }

    #[test]
    fn test_failure_predicate() {
        let classifier = FailureClassifier::default();
        assert!(classifier.is_failure(&record(LogLevel::Error, "all good")));
        assert!(classifier.is_failure(&record(LogLevel::Critical, "all good")));
        assert!(classifier.is_failure(&record(LogLevel::Info, "Request timeout")));
        assert!(!classifier.is_failure(&record(LogLevel::Info, "Starting requirements analysis")));
        assert!(!classifier.is_failure(&record(
            LogLevel::Warning,
            "Complex requirements detected - may cause issues downstream"
        )));
    }

    #[test]
    fn test_labels_round_trip() {
        for category in FailureCategory::ALL {
            assert_eq!(FailureCategory::from_label(category.label()), Some(category));
        }
        assert_eq!(
            serde_json::to_string(&FailureCategory::SyntaxCompileError).unwrap(),
            "\"Syntax / Compile Error\""
        );
    }
}
