use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use bson::DateTime;
use leadflow_db::models::{
    Activity, ActivityType, DealRecord, Lead, LeadQualifiedRecord, LeadStatus, OpportunityRecord,
    ProspectRecord, SuspectRecord,
};
use leadflow_services::{
    dao::base::{PaginatedResult, PaginationParams},
    lifecycle::{ActivityInput, ActivityPatch, LeadInput, LeadPatch},
    store::{LeadQuery, LeadSort},
};
use serde::{Deserialize, Serialize};

use crate::{
    error::{ApiError, parse_object_id},
    extractors::{auth::AuthUser, json::ApiJson},
    state::AppState,
};

fn rfc3339(dt: DateTime) -> String {
    dt.try_to_rfc3339_string().unwrap_or_default()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListLeadsQuery {
    pub status: Option<LeadStatus>,
    pub assigned_to: Option<String>,
    pub search: Option<String>,
    pub sort: Option<String>,
    pub page: Option<u64>,
    #[serde(alias = "limit")]
    pub per_page: Option<u64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityResponse {
    pub id: String,
    #[serde(rename = "type")]
    pub activity_type: ActivityType,
    pub description: String,
    pub due_date: Option<String>,
    pub completed: bool,
    pub completed_at: Option<String>,
    pub created_by: String,
    pub created_at: String,
}

impl From<Activity> for ActivityResponse {
    fn from(a: Activity) -> Self {
        Self {
            id: a.id.to_hex(),
            activity_type: a.activity_type,
            description: a.description,
            due_date: a.due_date.map(rfc3339),
            completed: a.completed,
            completed_at: a.completed_at.map(rfc3339),
            created_by: a.created_by.to_hex(),
            created_at: rfc3339(a.created_at),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadResponse {
    pub id: String,
    pub name: String,
    pub company: Option<String>,
    pub position: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub value: f64,
    pub status: LeadStatus,
    pub notes: Option<String>,
    pub activities: Vec<ActivityResponse>,
    pub assigned_to: Option<String>,
    pub created_by: String,
    pub suspect: Option<SuspectRecord>,
    pub prospect: Option<ProspectRecord>,
    pub lead_qualified: Option<LeadQualifiedRecord>,
    pub opportunity: Option<OpportunityRecord>,
    pub deal: Option<DealRecord>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Lead> for LeadResponse {
    fn from(lead: Lead) -> Self {
        Self {
            id: lead.id.map(|id| id.to_hex()).unwrap_or_default(),
            name: lead.name,
            company: lead.company,
            position: lead.position,
            email: lead.email,
            phone: lead.phone,
            value: lead.value,
            status: lead.status,
            notes: lead.notes,
            activities: lead
                .activities
                .into_iter()
                .map(ActivityResponse::from)
                .collect(),
            assigned_to: lead.assigned_to.map(|id| id.to_hex()),
            created_by: lead.created_by.to_hex(),
            suspect: lead.suspect,
            prospect: lead.prospect,
            lead_qualified: lead.lead_qualified,
            opportunity: lead.opportunity,
            deal: lead.deal,
            created_at: rfc3339(lead.created_at),
            updated_at: rfc3339(lead.updated_at),
        }
    }
}

pub async fn list(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<ListLeadsQuery>,
) -> Result<Json<PaginatedResult<LeadResponse>>, ApiError> {
    let sort = match query.sort.as_deref() {
        Some(raw) => LeadSort::parse(raw)
            .ok_or_else(|| ApiError::BadRequest(format!("Unsupported sort: {raw}")))?,
        None => LeadSort::default(),
    };
    let assigned_to = query
        .assigned_to
        .as_deref()
        .map(parse_object_id)
        .transpose()?;

    let defaults = PaginationParams::default();
    let params = PaginationParams::new(
        query.page.unwrap_or(defaults.page),
        query.per_page.unwrap_or(defaults.per_page),
    )
    .normalized();

    let lead_query = LeadQuery {
        status: query.status,
        assigned_to,
        search: query.search.filter(|s| !s.trim().is_empty()),
        sort,
    };
    let result = state
        .leads
        .list(lead_query, &params, &auth.actor())
        .await?;
    Ok(Json(result.map(LeadResponse::from)))
}

pub async fn get(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(lead_id): Path<String>,
) -> Result<Json<LeadResponse>, ApiError> {
    let id = parse_object_id(&lead_id)?;
    let lead = state.leads.get(id, &auth.actor()).await?;
    Ok(Json(LeadResponse::from(lead)))
}

pub async fn create(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(body): ApiJson<LeadInput>,
) -> Result<(StatusCode, Json<LeadResponse>), ApiError> {
    let lead = state.leads.create(body, &auth.actor()).await?;
    Ok((StatusCode::CREATED, Json(LeadResponse::from(lead))))
}

pub async fn update(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(lead_id): Path<String>,
    ApiJson(body): ApiJson<LeadPatch>,
) -> Result<Json<LeadResponse>, ApiError> {
    let id = parse_object_id(&lead_id)?;
    let lead = state.leads.update(id, body, &auth.actor()).await?;
    Ok(Json(LeadResponse::from(lead)))
}

pub async fn delete(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(lead_id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let id = parse_object_id(&lead_id)?;
    state.leads.delete(id, &auth.actor()).await?;
    Ok(Json(serde_json::json!({
        "success": true,
        "message": "Lead removed",
    })))
}

pub async fn add_activity(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(lead_id): Path<String>,
    ApiJson(body): ApiJson<ActivityInput>,
) -> Result<Json<LeadResponse>, ApiError> {
    let id = parse_object_id(&lead_id)?;
    let lead = state.leads.add_activity(id, body, &auth.actor()).await?;
    Ok(Json(LeadResponse::from(lead)))
}

pub async fn update_activity(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((lead_id, activity_id)): Path<(String, String)>,
    ApiJson(body): ApiJson<ActivityPatch>,
) -> Result<Json<LeadResponse>, ApiError> {
    let id = parse_object_id(&lead_id)?;
    let aid = parse_object_id(&activity_id)?;
    let lead = state
        .leads
        .update_activity(id, aid, body, &auth.actor())
        .await?;
    Ok(Json(LeadResponse::from(lead)))
}

pub async fn delete_activity(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((lead_id, activity_id)): Path<(String, String)>,
) -> Result<Json<LeadResponse>, ApiError> {
    let id = parse_object_id(&lead_id)?;
    let aid = parse_object_id(&activity_id)?;
    let lead = state
        .leads
        .delete_activity(id, aid, &auth.actor())
        .await?;
    Ok(Json(LeadResponse::from(lead)))
}
