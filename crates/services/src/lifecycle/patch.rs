//! Typed inputs for lead and activity mutations.

use bson::oid::ObjectId;
use chrono::{DateTime, NaiveDate, Utc};
use leadflow_db::models::{
    ActivityType, Currency, DealOutcome, DealRecord, DealStage, InterestedService, Lead,
    LeadQualifiedRecord, LeadSource, LeadStatus, OpportunityRecord, ProspectRecord,
    ProspectStatus, ReasonLost, SuspectRecord,
};
use serde::{Deserialize, Deserializer};
use validator::{Validate, ValidationError};

use crate::dao::base::{DaoError, DaoResult};

/// Distinguishes an absent field from an explicit `null`.
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Accepts RFC 3339 timestamps or bare `YYYY-MM-DD` dates (midnight UTC).
fn flexible_date<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(raw) = Option::<String>::deserialize(deserializer)? else {
        return Ok(None);
    };
    parse_date(&raw).map(Some).map_err(serde::de::Error::custom)
}

pub fn parse_date(raw: &str) -> Result<DateTime<Utc>, String> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .ok_or_else(|| format!("invalid date: {raw}"))
}

fn validate_http_url(url: &str) -> Result<(), ValidationError> {
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(())
    } else {
        Err(ValidationError::new("http_url"))
    }
}

fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::new("blank"))
    } else {
        Ok(())
    }
}

/// Merges a partial stage update into an existing record. Creating a record
/// requires its mandatory fields.
pub trait StagePatch {
    type Record;

    fn merge(self, existing: Option<Self::Record>) -> DaoResult<Self::Record>;
}

fn required<T>(value: Option<T>, stage: &str, field: &str) -> DaoResult<T> {
    value.ok_or_else(|| DaoError::Validation(format!("{stage}.{field} is required")))
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SuspectPatch {
    pub lead_source: Option<LeadSource>,
    pub other_portal_name: Option<String>,
    #[validate(custom(function = "validate_http_url"))]
    pub job_url: Option<String>,
}

impl StagePatch for SuspectPatch {
    type Record = SuspectRecord;

    fn merge(self, existing: Option<SuspectRecord>) -> DaoResult<SuspectRecord> {
        let mut record = match existing {
            Some(record) => record,
            None => SuspectRecord {
                lead_source: required(self.lead_source, "suspect", "leadSource")?,
                other_portal_name: None,
                job_url: None,
            },
        };
        if let Some(v) = self.lead_source {
            record.lead_source = v;
        }
        if self.other_portal_name.is_some() {
            record.other_portal_name = self.other_portal_name;
        }
        if self.job_url.is_some() {
            record.job_url = self.job_url;
        }
        Ok(record)
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ProspectPatch {
    pub status: Option<ProspectStatus>,
    #[serde(default, deserialize_with = "flexible_date")]
    pub last_contacted_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

impl StagePatch for ProspectPatch {
    type Record = ProspectRecord;

    fn merge(self, existing: Option<ProspectRecord>) -> DaoResult<ProspectRecord> {
        let mut record = match existing {
            Some(record) => record,
            None => ProspectRecord {
                status: required(self.status, "prospect", "status")?,
                last_contacted_at: None,
                notes: None,
            },
        };
        if let Some(v) = self.status {
            record.status = v;
        }
        if self.last_contacted_at.is_some() {
            record.last_contacted_at = self.last_contacted_at;
        }
        if self.notes.is_some() {
            record.notes = self.notes;
        }
        Ok(record)
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LeadQualifiedPatch {
    pub interested_services: Option<Vec<InterestedService>>,
    #[validate(range(min = 0.0))]
    pub budget_approx: Option<f64>,
    pub budget_currency: Option<Currency>,
    pub timeline_approx: Option<String>,
    pub meeting_scheduled: Option<bool>,
    #[serde(default, deserialize_with = "flexible_date")]
    pub meeting_date: Option<DateTime<Utc>>,
}

impl StagePatch for LeadQualifiedPatch {
    type Record = LeadQualifiedRecord;

    fn merge(self, existing: Option<LeadQualifiedRecord>) -> DaoResult<LeadQualifiedRecord> {
        let mut record = existing.unwrap_or(LeadQualifiedRecord {
            interested_services: Vec::new(),
            budget_approx: None,
            budget_currency: Currency::default(),
            timeline_approx: None,
            meeting_scheduled: false,
            meeting_date: None,
        });
        if let Some(v) = self.interested_services {
            record.interested_services = v;
        }
        if self.budget_approx.is_some() {
            record.budget_approx = self.budget_approx;
        }
        if let Some(v) = self.budget_currency {
            record.budget_currency = v;
        }
        if self.timeline_approx.is_some() {
            record.timeline_approx = self.timeline_approx;
        }
        if let Some(v) = self.meeting_scheduled {
            record.meeting_scheduled = v;
        }
        if self.meeting_date.is_some() {
            record.meeting_date = self.meeting_date;
        }
        Ok(record)
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct OpportunityPatch {
    #[validate(range(min = 0.0))]
    pub budget_amount: Option<f64>,
    pub budget_currency: Option<Currency>,
    pub deal_stage: Option<DealStage>,
    pub notes: Option<String>,
    pub custom_requirements: Option<String>,
}

impl StagePatch for OpportunityPatch {
    type Record = OpportunityRecord;

    fn merge(self, existing: Option<OpportunityRecord>) -> DaoResult<OpportunityRecord> {
        let mut record = existing.unwrap_or(OpportunityRecord {
            budget_amount: None,
            budget_currency: Currency::default(),
            deal_stage: None,
            notes: None,
            custom_requirements: None,
        });
        if self.budget_amount.is_some() {
            record.budget_amount = self.budget_amount;
        }
        if let Some(v) = self.budget_currency {
            record.budget_currency = v;
        }
        if self.deal_stage.is_some() {
            record.deal_stage = self.deal_stage;
        }
        if self.notes.is_some() {
            record.notes = self.notes;
        }
        if self.custom_requirements.is_some() {
            record.custom_requirements = self.custom_requirements;
        }
        Ok(record)
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DealPatch {
    pub status: Option<DealOutcome>,
    pub service_type_sold: Option<String>,
    #[serde(default, deserialize_with = "flexible_date")]
    pub project_start_date: Option<DateTime<Utc>>,
    #[validate(range(min = 0.0))]
    pub final_deal_value: Option<f64>,
    pub final_deal_currency: Option<Currency>,
    pub reason_lost: Option<ReasonLost>,
    pub other_notes: Option<String>,
    #[serde(default, deserialize_with = "flexible_date")]
    pub closed_at: Option<DateTime<Utc>>,
}

impl StagePatch for DealPatch {
    type Record = DealRecord;

    fn merge(self, existing: Option<DealRecord>) -> DaoResult<DealRecord> {
        let mut record = match existing {
            Some(record) => record,
            None => DealRecord {
                status: required(self.status, "deal", "status")?,
                service_type_sold: None,
                project_start_date: None,
                final_deal_value: None,
                final_deal_currency: Currency::default(),
                reason_lost: None,
                other_notes: None,
                closed_at: None,
            },
        };
        if let Some(v) = self.status {
            record.status = v;
        }
        if self.service_type_sold.is_some() {
            record.service_type_sold = self.service_type_sold;
        }
        if self.project_start_date.is_some() {
            record.project_start_date = self.project_start_date;
        }
        if self.final_deal_value.is_some() {
            record.final_deal_value = self.final_deal_value;
        }
        if let Some(v) = self.final_deal_currency {
            record.final_deal_currency = v;
        }
        if self.reason_lost.is_some() {
            record.reason_lost = self.reason_lost;
        }
        if self.other_notes.is_some() {
            record.other_notes = self.other_notes;
        }
        if self.closed_at.is_some() {
            record.closed_at = self.closed_at;
        }
        Ok(record)
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct StagePatches {
    #[validate(nested)]
    pub suspect: Option<SuspectPatch>,
    #[validate(nested)]
    pub prospect: Option<ProspectPatch>,
    #[validate(nested)]
    pub lead_qualified: Option<LeadQualifiedPatch>,
    #[validate(nested)]
    pub opportunity: Option<OpportunityPatch>,
    #[validate(nested)]
    pub deal: Option<DealPatch>,
}

impl StagePatches {
    pub fn apply(self, lead: &mut Lead) -> DaoResult<()> {
        if let Some(patch) = self.suspect {
            lead.suspect = Some(patch.merge(lead.suspect.take())?);
        }
        if let Some(patch) = self.prospect {
            lead.prospect = Some(patch.merge(lead.prospect.take())?);
        }
        if let Some(patch) = self.lead_qualified {
            lead.lead_qualified = Some(patch.merge(lead.lead_qualified.take())?);
        }
        if let Some(patch) = self.opportunity {
            lead.opportunity = Some(patch.merge(lead.opportunity.take())?);
        }
        if let Some(patch) = self.deal {
            lead.deal = Some(patch.merge(lead.deal.take())?);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LeadInput {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(max = 100))]
    pub company: Option<String>,
    #[validate(length(max = 100))]
    pub position: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub phone: Option<String>,
    #[validate(range(min = 0.0))]
    pub value: Option<f64>,
    pub status: Option<LeadStatus>,
    pub notes: Option<String>,
    pub assigned_to: Option<ObjectId>,
    #[serde(flatten)]
    #[validate(nested)]
    pub stages: StagePatches,
}

impl LeadInput {
    pub fn normalize(&mut self) {
        self.name = self.name.trim().to_string();
        trim_opt(&mut self.company);
        trim_opt(&mut self.position);
        trim_opt(&mut self.email);
    }
}

/// Scalar fields overwrite when present; stage records merge field by field.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LeadPatch {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[validate(length(max = 100))]
    pub company: Option<String>,
    #[validate(length(max = 100))]
    pub position: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub phone: Option<String>,
    #[validate(range(min = 0.0))]
    pub value: Option<f64>,
    pub status: Option<LeadStatus>,
    pub notes: Option<String>,
    /// `Some(None)` unassigns.
    #[serde(default, deserialize_with = "double_option")]
    pub assigned_to: Option<Option<ObjectId>>,
    #[serde(flatten)]
    #[validate(nested)]
    pub stages: StagePatches,
}

impl LeadPatch {
    pub fn normalize(&mut self) {
        trim_opt(&mut self.name);
        trim_opt(&mut self.company);
        trim_opt(&mut self.position);
        trim_opt(&mut self.email);
    }

    /// Fails only when a stage record would be created without its
    /// mandatory fields; `lead` may be partially updated in that case.
    pub fn apply(self, lead: &mut Lead) -> DaoResult<()> {
        if let Some(v) = self.name {
            lead.name = v;
        }
        if self.company.is_some() {
            lead.company = self.company;
        }
        if self.position.is_some() {
            lead.position = self.position;
        }
        if self.email.is_some() {
            lead.email = self.email;
        }
        if self.phone.is_some() {
            lead.phone = self.phone;
        }
        if let Some(v) = self.value {
            lead.value = v;
        }
        if let Some(v) = self.status {
            lead.status = v;
        }
        if self.notes.is_some() {
            lead.notes = self.notes;
        }
        if let Some(assignee) = self.assigned_to {
            lead.assigned_to = assignee;
        }
        self.stages.apply(lead)
    }
}

fn trim_opt(value: &mut Option<String>) {
    if let Some(v) = value.as_mut() {
        *v = v.trim().to_string();
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ActivityInput {
    #[serde(rename = "type")]
    pub activity_type: ActivityType,
    #[validate(custom(function = "validate_not_blank"))]
    pub description: String,
    #[serde(default, deserialize_with = "flexible_date")]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ActivityPatch {
    #[validate(custom(function = "validate_not_blank"))]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "flexible_date")]
    pub due_date: Option<DateTime<Utc>>,
    pub completed: Option<bool>,
}
