//! Secondary pipeline records embedded in a lead. Each stage is optional and
//! is merged field by field on update.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SuspectRecord {
    pub lead_source: LeadSource,
    pub other_portal_name: Option<String>,
    pub job_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProspectRecord {
    pub status: ProspectStatus,
    pub last_contacted_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LeadQualifiedRecord {
    #[serde(default)]
    pub interested_services: Vec<InterestedService>,
    pub budget_approx: Option<f64>,
    #[serde(default)]
    pub budget_currency: Currency,
    pub timeline_approx: Option<String>,
    #[serde(default)]
    pub meeting_scheduled: bool,
    pub meeting_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OpportunityRecord {
    pub budget_amount: Option<f64>,
    #[serde(default)]
    pub budget_currency: Currency,
    pub deal_stage: Option<DealStage>,
    pub notes: Option<String>,
    pub custom_requirements: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DealRecord {
    pub status: DealOutcome,
    pub service_type_sold: Option<String>,
    pub project_start_date: Option<DateTime<Utc>>,
    pub final_deal_value: Option<f64>,
    #[serde(default)]
    pub final_deal_currency: Currency,
    pub reason_lost: Option<ReasonLost>,
    pub other_notes: Option<String>,
    pub closed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LeadSource {
    Linkedin,
    Email,
    Upwork,
    Otherportal,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProspectStatus {
    Interested,
    NotInterested,
    NotNow,
    Unqualified,
    NoResponse,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum InterestedService {
    #[serde(rename = "mvp")]
    Mvp,
    #[serde(rename = "website")]
    Website,
    #[serde(rename = "app")]
    App,
    #[serde(rename = "dedicated developer")]
    DedicatedDeveloper,
    #[serde(rename = "ui/ux")]
    UiUx,
    #[serde(rename = "qa")]
    Qa,
    #[serde(rename = "devops")]
    Devops,
    #[serde(rename = "other")]
    Other,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum Currency {
    #[default]
    #[serde(rename = "USD")]
    Usd,
    #[serde(rename = "EUR")]
    Eur,
    #[serde(rename = "INR")]
    Inr,
    #[serde(rename = "GBP")]
    Gbp,
    Other,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum DealStage {
    #[serde(rename = "proposal_sent")]
    ProposalSent,
    #[serde(rename = "negotiation")]
    Negotiation,
    #[serde(rename = "verbal_commit")]
    VerbalCommit,
    #[serde(rename = "legal/procurement")]
    LegalProcurement,
    #[serde(rename = "closed_won")]
    ClosedWon,
    #[serde(rename = "closed_lost")]
    ClosedLost,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum DealOutcome {
    Won,
    Lost,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ReasonLost {
    Price,
    Delay,
    #[serde(rename = "No Response")]
    NoResponse,
    #[serde(rename = "Bad Fit")]
    BadFit,
    Timing,
    Competitor,
    Other,
}
