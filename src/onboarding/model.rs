//! Vendor session data model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The three sections of a vendor application, in collection order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnboardingSection {
    CompanyInformation,
    ComplianceCertifications,
    DataAccessRequirements,
}

impl OnboardingSection {
    /// All sections in the fixed order used by summaries and progress.
    pub const ALL: [OnboardingSection; 3] = [
        Self::CompanyInformation,
        Self::ComplianceCertifications,
        Self::DataAccessRequirements,
    ];

    /// Label used when listing a missing section.
    pub fn label(&self) -> &'static str {
        match self {
            Self::CompanyInformation => "Company information",
            Self::ComplianceCertifications => "Compliance certifications",
            Self::DataAccessRequirements => "Data access requirements",
        }
    }

    /// Short step name for progress displays.
    pub fn step_name(&self) -> &'static str {
        match self {
            Self::CompanyInformation => "Company Info",
            Self::ComplianceCertifications => "Compliance",
            Self::DataAccessRequirements => "Data Access",
        }
    }
}

impl std::fmt::Display for OnboardingSection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::CompanyInformation => "company_information",
            Self::ComplianceCertifications => "compliance_certifications",
            Self::DataAccessRequirements => "data_access_requirements",
        };
        write!(f, "{s}")
    }
}

/// Everything collected for one vendor application.
///
/// `application_complete` is derived: it is recomputed after every merge and
/// is true exactly when all three sections are present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VendorSession {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    #[serde(default)]
    pub company_lookup_complete: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compliance_certifications: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certifications_saved_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_access_needs: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_access_saved_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub application_complete: bool,
}

/// A partial write. `None` fields leave the stored value alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionUpdate {
    pub company_name: Option<String>,
    pub company_lookup_complete: Option<bool>,
    pub compliance_certifications: Option<String>,
    pub certifications_saved_at: Option<DateTime<Utc>>,
    pub data_access_needs: Option<String>,
    pub data_access_saved_at: Option<DateTime<Utc>>,
}

impl SessionUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn company_name(mut self, name: impl Into<String>) -> Self {
        self.company_name = Some(name.into());
        self
    }

    pub fn lookup_complete(mut self) -> Self {
        self.company_lookup_complete = Some(true);
        self
    }

    /// Certifications plus the save timestamp.
    pub fn certifications(mut self, certifications: impl Into<String>, at: DateTime<Utc>) -> Self {
        self.compliance_certifications = Some(certifications.into());
        self.certifications_saved_at = Some(at);
        self
    }

    /// Data access needs plus the save timestamp.
    pub fn data_access(mut self, needs: impl Into<String>, at: DateTime<Utc>) -> Self {
        self.data_access_needs = Some(needs.into());
        self.data_access_saved_at = Some(at);
        self
    }
}

impl VendorSession {
    /// Shallow merge: present fields overwrite, absent fields are kept.
    pub fn apply(&mut self, update: SessionUpdate) {
        if let Some(name) = update.company_name {
            self.company_name = Some(name);
        }
        if let Some(done) = update.company_lookup_complete {
            // Once set, never cleared.
            self.company_lookup_complete |= done;
        }
        if let Some(certs) = update.compliance_certifications {
            self.compliance_certifications = Some(certs);
        }
        if let Some(at) = update.certifications_saved_at {
            self.certifications_saved_at = Some(at);
        }
        if let Some(needs) = update.data_access_needs {
            self.data_access_needs = Some(needs);
        }
        if let Some(at) = update.data_access_saved_at {
            self.data_access_saved_at = Some(at);
        }
        self.recompute_completion();
    }

    pub fn recompute_completion(&mut self) {
        self.application_complete = OnboardingSection::ALL
            .iter()
            .all(|section| self.has_section(*section));
    }

    pub fn has_section(&self, section: OnboardingSection) -> bool {
        match section {
            OnboardingSection::CompanyInformation => self.company_name.is_some(),
            OnboardingSection::ComplianceCertifications => self.compliance_certifications.is_some(),
            OnboardingSection::DataAccessRequirements => self.data_access_needs.is_some(),
        }
    }

    pub fn completed_sections(&self) -> usize {
        OnboardingSection::ALL
            .iter()
            .filter(|section| self.has_section(**section))
            .count()
    }

    /// Missing sections in fixed order.
    pub fn missing_sections(&self) -> Vec<OnboardingSection> {
        OnboardingSection::ALL
            .into_iter()
            .filter(|section| !self.has_section(*section))
            .collect()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            company_name: self.company_name.clone(),
            compliance_certifications: self.compliance_certifications.clone(),
            data_access_needs: self.data_access_needs.clone(),
            application_complete: self.application_complete,
        }
    }

    pub fn progress(&self) -> Progress {
        let steps: Vec<StepStatus> = OnboardingSection::ALL
            .into_iter()
            .map(|section| StepStatus {
                section,
                name: section.step_name().to_string(),
                complete: self.has_section(section),
            })
            .collect();
        Progress::from_steps(steps)
    }
}

/// Read-only view for progress displays.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compliance_certifications: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_access_needs: Option<String>,
    pub application_complete: bool,
}

/// One step of the progress tracker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepStatus {
    pub section: OnboardingSection,
    pub name: String,
    pub complete: bool,
}

/// Completed steps out of three, with an integer percentage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
    pub percent: u8,
    pub steps: Vec<StepStatus>,
}

impl Progress {
    fn from_steps(steps: Vec<StepStatus>) -> Self {
        let total = steps.len();
        let completed = steps.iter().filter(|s| s.complete).count();
        let percent = if total == 0 {
            0
        } else {
            (completed * 100 / total) as u8
        };
        Self {
            completed,
            total,
            percent,
            steps,
        }
    }

    /// Progress of a session nobody has written to yet.
    pub fn empty() -> Self {
        VendorSession::default().progress()
    }
}

impl std::fmt::Display for Progress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{} steps completed ({}%)",
            self.completed, self.total, self.percent
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(session: &mut VendorSession, section: OnboardingSection) {
        let now = Utc::now();
        let update = match section {
            OnboardingSection::CompanyInformation => {
                SessionUpdate::new().company_name("Acme Inc").lookup_complete()
            }
            OnboardingSection::ComplianceCertifications => {
                SessionUpdate::new().certifications("SOC 2 Type II", now)
            }
            OnboardingSection::DataAccessRequirements => {
                SessionUpdate::new().data_access("Customer PII", now)
            }
        };
        session.apply(update);
    }

    #[test]
    fn complete_only_after_all_three_for_every_order() {
        use OnboardingSection::*;
        let orders = [
            [CompanyInformation, ComplianceCertifications, DataAccessRequirements],
            [CompanyInformation, DataAccessRequirements, ComplianceCertifications],
            [ComplianceCertifications, CompanyInformation, DataAccessRequirements],
            [ComplianceCertifications, DataAccessRequirements, CompanyInformation],
            [DataAccessRequirements, CompanyInformation, ComplianceCertifications],
            [DataAccessRequirements, ComplianceCertifications, CompanyInformation],
        ];

        for order in orders {
            let mut session = VendorSession::default();
            for (i, section) in order.iter().enumerate() {
                write(&mut session, *section);
                assert_eq!(
                    session.application_complete,
                    i == 2,
                    "order {order:?}, after {} writes",
                    i + 1
                );
            }
        }
    }

    #[test]
    fn merge_keeps_absent_fields_and_overrides_present_ones() {
        let mut session = VendorSession::default();
        session.apply(SessionUpdate::new().company_name("Acme Inc").lookup_complete());
        session.apply(SessionUpdate::new().certifications("ISO 27001", Utc::now()));
        session.apply(SessionUpdate::new().company_name("Acme Incorporated"));

        assert_eq!(session.company_name.as_deref(), Some("Acme Incorporated"));
        assert_eq!(session.compliance_certifications.as_deref(), Some("ISO 27001"));
        assert!(session.company_lookup_complete);
    }

    #[test]
    fn lookup_flag_is_never_cleared() {
        let mut session = VendorSession::default();
        session.apply(SessionUpdate::new().lookup_complete());
        session.apply(SessionUpdate {
            company_lookup_complete: Some(false),
            ..SessionUpdate::default()
        });
        assert!(session.company_lookup_complete);
    }

    #[test]
    fn missing_sections_follow_fixed_order() {
        let mut session = VendorSession::default();
        session.apply(SessionUpdate::new().certifications("SOC 2", Utc::now()));

        assert_eq!(
            session.missing_sections(),
            vec![
                OnboardingSection::CompanyInformation,
                OnboardingSection::DataAccessRequirements
            ]
        );
        assert_eq!(session.completed_sections(), 1);
    }

    #[test]
    fn progress_counts_and_percentage() {
        assert_eq!(Progress::empty().to_string(), "0/3 steps completed (0%)");

        let mut session = VendorSession::default();
        write(&mut session, OnboardingSection::CompanyInformation);
        let progress = session.progress();
        assert_eq!(progress.completed, 1);
        assert_eq!(progress.percent, 33);
        assert_eq!(progress.steps[0].name, "Company Info");
        assert!(progress.steps[0].complete);
        assert!(!progress.steps[2].complete);

        write(&mut session, OnboardingSection::ComplianceCertifications);
        write(&mut session, OnboardingSection::DataAccessRequirements);
        assert_eq!(session.progress().percent, 100);
    }

    #[test]
    fn snapshot_omits_absent_fields() {
        let mut session = VendorSession::default();
        write(&mut session, OnboardingSection::CompanyInformation);

        let json = serde_json::to_value(session.snapshot()).unwrap();
        assert_eq!(json["company_name"], "Acme Inc");
        assert_eq!(json["application_complete"], false);
        assert!(json.get("compliance_certifications").is_none());
    }
}
