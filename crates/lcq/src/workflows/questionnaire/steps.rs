use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Branch of the questionnaire chosen when an application is started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationType {
    Individual,
    Group,
}

impl ApplicationType {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Individual => "individual",
            Self::Group => "group",
        }
    }

    pub fn steps(self) -> &'static [Step] {
        steps_for(self)
    }
}

impl fmt::Display for ApplicationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.label())
    }
}

impl FromStr for ApplicationType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "individual" => Ok(Self::Individual),
            "group" => Ok(Self::Group),
            other => Err(format!("unknown application type '{other}'")),
        }
    }
}

/// One page of the wizard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Step {
    pub path: &'static str,
    pub label: &'static str,
    pub short_label: &'static str,
}

impl Step {
    /// Key under which this step's answers live in the form document.
    pub fn section(&self) -> &'static str {
        self.path.rsplit('/').next().unwrap_or(self.path)
    }
}

pub static INDIVIDUAL_STEPS: [Step; 8] = [
    Step {
        path: "/application/bio",
        label: "Biographical Information",
        short_label: "Bio",
    },
    Step {
        path: "/application/education",
        label: "Education",
        short_label: "Education",
    },
    Step {
        path: "/application/admissions",
        label: "Bar Admissions",
        short_label: "Admissions",
    },
    Step {
        path: "/application/employment",
        label: "Employment History",
        short_label: "Employment",
    },
    Step {
        path: "/application/practice",
        label: "Practice & Clients",
        short_label: "Practice",
    },
    Step {
        path: "/application/conflicts",
        label: "Conflicts & Disclosures",
        short_label: "Conflicts",
    },
    Step {
        path: "/application/references",
        label: "References",
        short_label: "References",
    },
    Step {
        path: "/application/review",
        label: "Review & Submit",
        short_label: "Review",
    },
];

pub static GROUP_STEPS: [Step; 7] = [
    Step {
        path: "/group/overview",
        label: "Group Overview",
        short_label: "Overview",
    },
    Step {
        path: "/group/members",
        label: "Group Members",
        short_label: "Members",
    },
    Step {
        path: "/group/practice",
        label: "Practice & Clients",
        short_label: "Practice",
    },
    Step {
        path: "/group/financials",
        label: "Book of Business",
        short_label: "Financials",
    },
    Step {
        path: "/group/conflicts",
        label: "Conflicts & Disclosures",
        short_label: "Conflicts",
    },
    Step {
        path: "/group/references",
        label: "References",
        short_label: "References",
    },
    Step {
        path: "/group/review",
        label: "Review & Submit",
        short_label: "Review",
    },
];

pub fn steps_for(application_type: ApplicationType) -> &'static [Step] {
    match application_type {
        ApplicationType::Individual => &INDIVIDUAL_STEPS,
        ApplicationType::Group => &GROUP_STEPS,
    }
}

pub fn index_of(application_type: ApplicationType, path: &str) -> Option<usize> {
    position(steps_for(application_type), path)
}

pub fn step_at(application_type: ApplicationType, index: usize) -> Option<&'static Step> {
    steps_for(application_type).get(index)
}

/// Step following `path`, or `None` when `path` is the last (or unknown) step.
pub fn next_step(application_type: ApplicationType, path: &str) -> Option<&'static Step> {
    let index = index_of(application_type, path)?;
    step_at(application_type, index + 1)
}

pub(crate) fn position(steps: &[Step], path: &str) -> Option<usize> {
    steps.iter().position(|step| step.path == path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalogs_start_with_entry_pages_and_end_with_review() {
        assert_eq!(INDIVIDUAL_STEPS[0].path, "/application/bio");
        assert_eq!(GROUP_STEPS[0].path, "/group/overview");
        assert_eq!(INDIVIDUAL_STEPS.last().map(Step::section), Some("review"));
        assert_eq!(GROUP_STEPS.last().map(Step::section), Some("review"));
    }

    #[test]
    fn lookups_resolve_by_path() {
        assert_eq!(
            index_of(ApplicationType::Individual, "/application/employment"),
            Some(3)
        );
        assert_eq!(index_of(ApplicationType::Group, "/application/bio"), None);
        assert_eq!(
            next_step(ApplicationType::Group, "/group/overview").map(|step| step.path),
            Some("/group/members")
        );
        assert!(next_step(ApplicationType::Group, "/group/review").is_none());
    }

    #[test]
    fn application_type_parses_case_insensitively() {
        assert_eq!(
            "Group".parse::<ApplicationType>(),
            Ok(ApplicationType::Group)
        );
        assert!("firm".parse::<ApplicationType>().is_err());
    }
}
