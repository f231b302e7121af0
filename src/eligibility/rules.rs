use serde::Serialize;

/// Rules applied by the evaluator, in evaluation order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Rule {
    StudentStatus,
    OddSemester,
    EvenSemester,
    Override,
    LastSemesterDues,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleOutcome {
    pub rule: Rule,
    pub passed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Ordered record of rule decisions
///
/// Non-terminal rules append. A superseding rule discards everything recorded
/// so far and becomes the only entry.
#[derive(Debug, Clone, Default)]
pub struct ReasonLog {
    outcomes: Vec<RuleOutcome>,
}

impl ReasonLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pass(&mut self, rule: Rule) {
        self.outcomes.push(RuleOutcome {
            rule,
            passed: true,
            message: None,
        });
    }

    pub fn fail(&mut self, rule: Rule, message: impl Into<String>) {
        self.outcomes.push(RuleOutcome {
            rule,
            passed: false,
            message: Some(message.into()),
        });
    }

    /// Failed without a reason worth showing
    pub fn fail_silently(&mut self, rule: Rule) {
        self.outcomes.push(RuleOutcome {
            rule,
            passed: false,
            message: None,
        });
    }

    pub fn supersede(&mut self, rule: Rule, passed: bool, message: impl Into<String>) {
        self.outcomes.clear();
        self.outcomes.push(RuleOutcome {
            rule,
            passed,
            message: Some(message.into()),
        });
    }

    pub fn reasons(&self) -> Vec<String> {
        self.outcomes
            .iter()
            .filter_map(|o| o.message.clone())
            .collect()
    }

    pub fn into_outcomes(self) -> Vec<RuleOutcome> {
        self.outcomes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reasons_keep_insertion_order() {
        let mut log = ReasonLog::new();
        log.fail(Rule::StudentStatus, "first");
        log.pass(Rule::OddSemester);
        log.fail(Rule::EvenSemester, "second");

        assert_eq!(log.reasons(), vec!["first", "second"]);
        assert_eq!(log.into_outcomes().len(), 3);
    }

    #[test]
    fn test_supersede_replaces_everything() {
        let mut log = ReasonLog::new();
        log.fail(Rule::StudentStatus, "status");
        log.fail(Rule::OddSemester, "odd");
        log.supersede(Rule::Override, true, "override");
        log.fail(Rule::LastSemesterDues, "dues");

        assert_eq!(log.reasons(), vec!["override", "dues"]);
        assert_eq!(log.into_outcomes()[0].rule, Rule::Override);
    }
}
