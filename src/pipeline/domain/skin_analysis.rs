use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::finding::Finding;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    /// Count-based bucket: more than three findings is high, more than one is medium.
    /// Confidence and issue kind do not participate.
    pub fn from_finding_count(count: usize) -> Self {
        if count > 3 {
            Severity::High
        } else if count > 1 {
            Severity::Medium
        } else {
            Severity::Low
        }
    }
}

/// Outcome of analysing one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkinAnalysis {
    findings: Vec<Finding>,
    severity: Severity,
}

impl SkinAnalysis {
    pub fn new(findings: Vec<Finding>) -> Self {
        let severity = Severity::from_finding_count(findings.len());
        Self { findings, severity }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn findings(&self) -> &[Finding] {
        &self.findings
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn into_findings(self) -> Vec<Finding> {
        self.findings
    }
}

/// Boundary envelope handed to transport/persistence layers.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub issues: Vec<Finding>,
    pub severity: Severity,
}

impl AnalysisReport {
    pub fn from_analysis(analysis: SkinAnalysis) -> Self {
        let severity = analysis.severity();
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            issues: analysis.into_findings(),
            severity,
        }
    }
}
