use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::UnknownValue;

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize, sqlx::FromRow)]
pub struct Project {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub package: String,
    pub size: String,
    pub status: String,
    pub eta: NaiveDateTime,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// A project as listed on the customer dashboard.
#[derive(Clone, Debug, Serialize)]
pub struct ProjectSummary {
    #[serde(flatten)]
    pub project: Project,
    pub hours_until_eta: i64,
}

#[derive(Clone, Debug, Deserialize)]
pub struct NewProject {
    pub title: String,
    pub package: String,
    pub size: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvanceProject {
    pub next_status: String,
    pub eta_hours: Option<f64>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EtaAdjustment {
    pub ids: Vec<String>,
    pub delta_days: i64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectStatus {
    Intake,
    Mixing,
    Mastering,
    Revisions,
    Delivered,
}

impl ProjectStatus {
    pub const ALL: [ProjectStatus; 5] = [
        ProjectStatus::Intake,
        ProjectStatus::Mixing,
        ProjectStatus::Mastering,
        ProjectStatus::Revisions,
        ProjectStatus::Delivered,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::Intake => "intake",
            ProjectStatus::Mixing => "mixing",
            ProjectStatus::Mastering => "mastering",
            ProjectStatus::Revisions => "revisions",
            ProjectStatus::Delivered => "delivered",
        }
    }

    /// The following stage of the production pipeline, `None` once delivered.
    pub fn next(&self) -> Option<ProjectStatus> {
        match self {
            ProjectStatus::Intake => Some(ProjectStatus::Mixing),
            ProjectStatus::Mixing => Some(ProjectStatus::Mastering),
            ProjectStatus::Mastering => Some(ProjectStatus::Revisions),
            ProjectStatus::Revisions => Some(ProjectStatus::Delivered),
            ProjectStatus::Delivered => None,
        }
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProjectStatus {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProjectStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownValue::new("status", s))
    }
}

/// Which status changes the state machine accepts.
///
/// `Permissive` only requires the target to be a known status, so operators
/// can move a project backwards or skip stages. `Linear` walks the pipeline
/// one stage at a time and treats `delivered` as terminal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransitionPolicy {
    #[default]
    Permissive,
    Linear,
}

impl TransitionPolicy {
    pub fn allows(&self, current: &str, target: ProjectStatus) -> bool {
        match self {
            TransitionPolicy::Permissive => true,
            TransitionPolicy::Linear => current
                .parse::<ProjectStatus>()
                .map(|current| current.next() == Some(target))
                .unwrap_or(false),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageTier {
    Basic,
    Pro,
    Master,
}

impl PackageTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            PackageTier::Basic => "basic",
            PackageTier::Pro => "pro",
            PackageTier::Master => "master",
        }
    }

    /// Base turnaround in whole days.
    pub fn base_days(&self) -> i64 {
        match self {
            PackageTier::Basic => 3,
            PackageTier::Pro => 5,
            PackageTier::Master => 7,
        }
    }
}

impl FromStr for PackageTier {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "basic" => Ok(PackageTier::Basic),
            "pro" => Ok(PackageTier::Pro),
            "master" => Ok(PackageTier::Master),
            _ => Err(UnknownValue::new("package", s)),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SizeClass {
    #[default]
    Normal,
    Large,
}

impl SizeClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            SizeClass::Normal => "normal",
            SizeClass::Large => "large",
        }
    }
}

impl FromStr for SizeClass {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "normal" => Ok(SizeClass::Normal),
            "large" => Ok(SizeClass::Large),
            _ => Err(UnknownValue::new("size", s)),
        }
    }
}
