use academy_core::ServiceError;
use serde::{Deserialize, Serialize};

use crate::collection::Collection;
use crate::entity::{ensure_date, ensure_non_negative, label_enum, Entity, FieldDef, FieldKind, Label};
use crate::workflow::{Effect, Transition, Workflow};

// ---------------------------------------------------------------------------
// TestReport
// ---------------------------------------------------------------------------

label_enum! {
    /// Letter band of a test percentage.
    pub enum Grade {
        A = "A",
        B = "B",
        C = "C",
        D = "D",
        F = "F",
    }
    default F
}

impl Grade {
    pub fn from_percentage(pct: f64) -> Self {
        match pct {
            p if p >= 90.0 => Self::A,
            p if p >= 80.0 => Self::B,
            p if p >= 70.0 => Self::C,
            p if p >= 60.0 => Self::D,
            _ => Self::F,
        }
    }
}

/// A scored test. The percentage and grade are derived, never stored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestReport {
    pub student_name: String,
    pub subject: String,
    pub test_date: String,
    pub score: f64,
    pub max_score: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub teacher_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub created_at: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub updated_at: String,
}

impl TestReport {
    /// `score / max_score × 100`; zero when `max_score` is not positive.
    pub fn percentage(&self) -> f64 {
        if self.max_score > 0.0 {
            self.score / self.max_score * 100.0
        } else {
            0.0
        }
    }

    pub fn grade(&self) -> Grade {
        Grade::from_percentage(self.percentage())
    }
}

impl Entity for TestReport {
    const COLLECTION: Collection = Collection::TestReports;
    const FIELDS: &'static [FieldDef] = &[
        FieldDef::required("studentName", FieldKind::Text),
        FieldDef::required("subject", FieldKind::Text),
        FieldDef::required("testDate", FieldKind::Date),
        FieldDef::required("score", FieldKind::Number),
        FieldDef::required("maxScore", FieldKind::Number),
        FieldDef::optional("studentId", FieldKind::Text),
        FieldDef::optional("teacherName", FieldKind::Text),
        FieldDef::optional("remarks", FieldKind::Text),
    ];
    const SEARCH_FIELDS: &'static [&'static str] = &["studentName", "subject"];
    const FILTER_FIELDS: &'static [&'static str] = &["subject", "grade"];

    fn created_at(&self) -> &str {
        &self.created_at
    }

    fn partition(&self) -> &'static str {
        self.grade().as_str()
    }

    fn display_name(&self) -> &str {
        &self.student_name
    }

    fn derived(&self, field: &str) -> Option<String> {
        (field == "grade").then(|| self.grade().to_string())
    }

    fn check(&self) -> Result<(), ServiceError> {
        ensure_date("testDate", &self.test_date)?;
        ensure_non_negative("score", self.score)?;
        if self.max_score <= 0.0 {
            return Err(ServiceError::Validation(format!(
                "maxScore must be greater than zero, got {}",
                self.max_score
            )));
        }
        if self.score > self.max_score {
            return Err(ServiceError::Validation(format!(
                "score {} exceeds maxScore {}",
                self.score, self.max_score
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// TestStatus
// ---------------------------------------------------------------------------

label_enum! {
    /// Progress of a scheduled test.
    ///
    /// ```text
    /// scheduled → in_progress → completed → graded
    ///     └───────────┴─────────────┴──→ cancelled
    /// ```
    pub enum TestPhase {
        Scheduled = "scheduled",
        InProgress = "in_progress",
        Completed = "completed",
        Graded = "graded",
        Cancelled = "cancelled",
    }
    default Scheduled
}

impl TestPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Graded | Self::Cancelled)
    }
}

/// A test on the calendar, tracked from scheduling to grading.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestStatus {
    pub student_name: String,
    pub subject: String,
    pub scheduled_date: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub status: TestPhase,

    // --- workflow stamps ---
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub graded_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancelled_at: Option<String>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub created_at: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub updated_at: String,
}

impl Entity for TestStatus {
    const COLLECTION: Collection = Collection::TestStatus;
    const FIELDS: &'static [FieldDef] = &[
        FieldDef::required("studentName", FieldKind::Text),
        FieldDef::required("subject", FieldKind::Text),
        FieldDef::required("scheduledDate", FieldKind::Date),
        FieldDef::optional("studentId", FieldKind::Text),
        FieldDef::optional("notes", FieldKind::Text),
    ];
    const SEARCH_FIELDS: &'static [&'static str] = &["studentName", "subject"];
    const FILTER_FIELDS: &'static [&'static str] = &["status", "subject"];

    fn created_at(&self) -> &str {
        &self.created_at
    }

    fn partition(&self) -> &'static str {
        self.status.as_str()
    }

    fn display_name(&self) -> &str {
        &self.student_name
    }

    fn check(&self) -> Result<(), ServiceError> {
        ensure_date("scheduledDate", &self.scheduled_date)
    }
}

impl Workflow for TestStatus {
    type Status = TestPhase;
    const TRANSITIONS: &'static [Transition<TestPhase>] = &[
        Transition {
            from: &[TestPhase::Scheduled],
            action: "start",
            to: TestPhase::InProgress,
            effects: &[Effect::Stamp("startedAt")],
        },
        Transition {
            from: &[TestPhase::InProgress],
            action: "complete",
            to: TestPhase::Completed,
            effects: &[Effect::Stamp("completedAt")],
        },
        Transition {
            from: &[TestPhase::Completed],
            action: "grade",
            to: TestPhase::Graded,
            effects: &[Effect::Stamp("gradedAt")],
        },
        Transition {
            from: &[TestPhase::Scheduled, TestPhase::InProgress, TestPhase::Completed],
            action: "cancel",
            to: TestPhase::Cancelled,
            effects: &[Effect::Stamp("cancelledAt")],
        },
    ];

    fn status(&self) -> TestPhase {
        self.status
    }
}
