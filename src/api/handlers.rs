//! Request handlers for the record CRUD surface
//!
//! Each mutating handler runs the registered pre-hooks before touching the
//! record store and the post-hooks after the mutation committed, which is
//! where the quota gate does its work.

use actix_web::error::{ErrorBadRequest, ErrorInternalServerError};
use actix_web::{web, Error, HttpRequest, HttpResponse};
use bytes::BytesMut;
use futures::StreamExt;
use log::{debug, info};
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::accountant::StorageAccountant;
use crate::api::header_handler;
use crate::app_state::AppState;
use crate::hooks::{HookContext, OperationKind};
use crate::record::StoredRecord;
use crate::store::RecordStore;

fn empty_metadata() -> Value {
    Value::Object(Map::new())
}

#[derive(Debug, Deserialize)]
pub struct CreateRecordRequest {
    pub id: String,
    #[serde(rename = "type")]
    pub record_type: String,
    #[serde(default = "empty_metadata")]
    pub metadata: Value,
}

#[derive(Debug, Deserialize, Default)]
pub struct CopyRecordRequest {
    /// Id for the duplicate; defaults to "<source>-copy"
    #[serde(default)]
    pub id: Option<String>,
}

async fn read_body(payload: &mut web::Payload) -> Result<BytesMut, Error> {
    let mut bytes = BytesMut::new();
    while let Some(chunk) = payload.next().await {
        let chunk = chunk.map_err(ErrorInternalServerError)?;
        bytes.extend_from_slice(&chunk);
    }
    Ok(bytes)
}

pub async fn create_record(
    mut payload: web::Payload,
    req: HttpRequest,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let actor = header_handler(&req)?;

    let bytes = read_body(&mut payload).await?;
    if bytes.is_empty() {
        return Ok(HttpResponse::BadRequest().body("No data was uploaded"));
    }
    let body: CreateRecordRequest = serde_json::from_slice(&bytes)
        .map_err(|e| ErrorBadRequest(format!("Invalid record body: {}", e)))?;

    debug!(
        "CREATE record {} of type {} for member {}",
        body.id, body.record_type, actor.id
    );

    let record = StoredRecord::new(body.id, actor.id.clone(), body.record_type, body.metadata);
    let ctx = HookContext::new(record.clone(), actor);

    // The quota pre-check runs here and aborts the create before any write
    app_state.hooks.run_pre(OperationKind::Create, &ctx)?;

    app_state.records.insert(&record)?;
    app_state.hooks.run_post(OperationKind::Create, &ctx);

    info!("Record created: id = {}", record.id);
    Ok(HttpResponse::Created().json(record))
}

pub async fn get_record(
    path: web::Path<String>,
    req: HttpRequest,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let _actor = header_handler(&req)?;
    let id = path.into_inner();

    let record = app_state.records.get(&id)?;
    Ok(HttpResponse::Ok().json(record))
}

pub async fn update_record(
    path: web::Path<String>,
    mut payload: web::Payload,
    req: HttpRequest,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let actor = header_handler(&req)?;
    let id = path.into_inner();

    let bytes = read_body(&mut payload).await?;
    if bytes.is_empty() {
        return Ok(HttpResponse::BadRequest().body("No data was uploaded"));
    }
    let patch: Value = serde_json::from_slice(&bytes)
        .map_err(|e| ErrorBadRequest(format!("Invalid metadata patch: {}", e)))?;

    // Pre-update state; the gate needs it to tell a newly supplied size
    // from an ordinary edit
    let record = app_state.records.get(&id)?;
    let merged = record.merged_with(&patch);
    let ctx = HookContext::with_patch(record, actor, patch);

    app_state.hooks.run_pre(OperationKind::Update, &ctx)?;

    app_state.records.update_metadata(&id, &merged.metadata)?;
    app_state.hooks.run_post(OperationKind::Update, &ctx);

    debug!("Record updated: id = {}", id);
    Ok(HttpResponse::Ok().json(merged))
}

pub async fn copy_record(
    path: web::Path<String>,
    mut payload: web::Payload,
    req: HttpRequest,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let actor = header_handler(&req)?;
    let source_id = path.into_inner();

    let bytes = read_body(&mut payload).await?;
    let body: CopyRecordRequest = if bytes.is_empty() {
        CopyRecordRequest::default()
    } else {
        serde_json::from_slice(&bytes)
            .map_err(|e| ErrorBadRequest(format!("Invalid copy body: {}", e)))?
    };

    let source = app_state.records.get(&source_id)?;
    let copy_id = body.id.unwrap_or_else(|| format!("{}-copy", source_id));
    debug!(
        "COPY record {} -> {} for member {}",
        source_id, copy_id, actor.id
    );

    // The duplicate belongs to the acting member
    let copy = StoredRecord::new(
        copy_id,
        actor.id.clone(),
        source.record_type.clone(),
        source.metadata.clone(),
    );
    let ctx = HookContext::new(copy.clone(), actor);

    app_state.hooks.run_pre(OperationKind::Copy, &ctx)?;

    app_state.records.insert(&copy)?;
    app_state.hooks.run_post(OperationKind::Copy, &ctx);

    info!("Record copied: id = {}", copy.id);
    Ok(HttpResponse::Created().json(copy))
}

pub async fn delete_record(
    path: web::Path<String>,
    req: HttpRequest,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let actor = header_handler(&req)?;
    let id = path.into_inner();

    let record = app_state.records.get(&id)?;
    let ctx = HookContext::new(record, actor);

    app_state.hooks.run_pre(OperationKind::Delete, &ctx)?;

    app_state.records.delete(&id)?;
    app_state.hooks.run_post(OperationKind::Delete, &ctx);

    Ok(HttpResponse::Ok().body(format!("Record deleted successfully: id = {}", id)))
}

pub async fn member_storage(
    req: HttpRequest,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let actor = header_handler(&req)?;

    let total = app_state.accountant.get_user_storage(&actor.id)?;
    Ok(HttpResponse::Ok().json(json!({
        "member_id": actor.id,
        "total": total,
        "max_member_storage": app_state.config.quota.max_member_storage,
    })))
}
