//! # cap-api Handlers
//!
//! This module coordinates the flow between HTTP requests and the
//! pipeline/facade. Responses use the `{success, ...}` JSON envelope.

use actix_web::{web, HttpResponse, Responder};
use actix_multipart::Multipart;
use cap_core::error::AppError;
use cap_core::models::ImageRecord;
use cap_pipeline::queries::ImageQueries;
use cap_pipeline::{ImagePipeline, MAX_UPLOAD_BYTES};
use futures_util::{Stream, StreamExt};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

/// State shared across all Actix-web workers.
pub struct AppState {
    pub pipeline: ImagePipeline,
    pub queries: ImageQueries,
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    /// Optional filename search term.
    pub q: Option<String>,
}

/// Upper bound on the `owner_id` text field; anything near this is junk.
const OWNER_ID_FIELD_LIMIT: usize = 4096;

/// Drains a multipart field into memory, rejecting as soon as the
/// running total would exceed `cap`. Raw `Multipart` enforces no limit
/// of its own, so without this an oversize body would be fully buffered
/// before the pipeline's validation ever saw it. The pipeline check
/// stays authoritative; this is the transport-level cutoff.
async fn collect_capped<S, B, E>(
    stream: &mut S,
    cap: usize,
    over_limit: &str,
) -> Result<Vec<u8>, AppError>
where
    S: Stream<Item = Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
    E: std::fmt::Display,
{
    let mut out = Vec::new();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| AppError::Validation(format!("upload read error: {e}")))?;
        if out.len() + chunk.as_ref().len() > cap {
            return Err(AppError::Validation(over_limit.to_string()));
        }
        out.extend_from_slice(chunk.as_ref());
    }
    Ok(out)
}

/// Accepts a multipart upload (`image` file + `owner_id` field) and runs
/// it through the pipeline. Once validation passes the response always
/// carries a terminal record; a describer failure shows up as
/// `status=ERROR` on the record, not as a failed request.
pub async fn upload_image(data: web::Data<AppState>, mut payload: Multipart) -> impl Responder {
    let mut file_bytes: Vec<u8> = Vec::new();
    let mut original_filename = String::from("upload");
    let mut content_type: Option<String> = None;
    let mut owner_id: Option<String> = None;

    while let Some(item) = payload.next().await {
        let mut field = match item {
            Ok(field) => field,
            Err(e) => return error_envelope(&AppError::Validation(format!("bad multipart: {e}"))),
        };

        let field_name = field.name().to_string();
        match field_name.as_str() {
            "image" => {
                if let Some(name) = field.content_disposition().get_filename() {
                    original_filename = name.to_string();
                }
                content_type = field.content_type().map(|m| m.to_string());
                file_bytes = match collect_capped(
                    &mut field,
                    MAX_UPLOAD_BYTES,
                    "image too large; maximum size is 10 MiB",
                )
                .await
                {
                    Ok(bytes) => bytes,
                    Err(err) => return error_envelope(&err),
                };
            }
            "owner_id" => {
                let value = match collect_capped(
                    &mut field,
                    OWNER_ID_FIELD_LIMIT,
                    "owner_id field too long",
                )
                .await
                {
                    Ok(bytes) => bytes,
                    Err(err) => return error_envelope(&err),
                };
                owner_id = String::from_utf8(value).ok();
            }
            // Unknown fields are ignored, not rejected.
            _ => {}
        }
    }

    let owner_id = match owner_id.filter(|o| !o.is_empty()) {
        Some(owner) => owner,
        None => return error_envelope(&AppError::Validation("missing owner_id field".into())),
    };
    let content_type = content_type.unwrap_or_default();

    match data
        .pipeline
        .submit(&file_bytes, &original_filename, &owner_id, &content_type)
        .await
    {
        Ok(record) => HttpResponse::Ok().json(json!({
            "success": true,
            "image": image_json(&record),
            "message": "image processed",
        })),
        Err(err) => error_envelope(&err),
    }
}

pub async fn get_image(data: web::Data<AppState>, path: web::Path<Uuid>) -> impl Responder {
    match data.queries.get(path.into_inner()).await {
        Ok(record) => HttpResponse::Ok().json(json!({
            "success": true,
            "image": image_json(&record),
        })),
        Err(err) => error_envelope(&err),
    }
}

pub async fn list_owner_images(
    data: web::Data<AppState>,
    path: web::Path<String>,
    params: web::Query<ListParams>,
) -> impl Responder {
    let owner_id = path.into_inner();
    let result = match &params.q {
        Some(term) => data.queries.search(&owner_id, term).await,
        None => data.queries.list_for_owner(&owner_id).await,
    };

    match result {
        Ok(records) => {
            let images: Vec<_> = records.iter().map(image_json).collect();
            HttpResponse::Ok().json(json!({
                "success": true,
                "count": images.len(),
                "images": images,
            }))
        }
        Err(err) => error_envelope(&err),
    }
}

pub async fn delete_image(data: web::Data<AppState>, path: web::Path<Uuid>) -> impl Responder {
    let id = path.into_inner();
    match data.queries.delete(id).await {
        Ok(true) => HttpResponse::Ok().json(json!({
            "success": true,
            "message": "image deleted",
        })),
        Ok(false) => error_envelope(&AppError::NotFound("image".into(), id.to_string())),
        Err(err) => error_envelope(&err),
    }
}

pub async fn owner_stats(data: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    match data.queries.stats(&path.into_inner()).await {
        Ok(stats) => HttpResponse::Ok().json(json!({
            "success": true,
            "stats": stats,
        })),
        Err(err) => error_envelope(&err),
    }
}

fn image_json(record: &ImageRecord) -> serde_json::Value {
    serde_json::to_value(record).unwrap_or_else(|_| json!(null))
}

/// Maps the error taxonomy onto status codes. Internal errors keep their
/// detail out of the response body.
fn error_envelope(err: &AppError) -> HttpResponse {
    let body = |message: &str| json!({ "success": false, "error": message });
    match err {
        AppError::Validation(_) => HttpResponse::BadRequest().json(body(&err.to_string())),
        AppError::NotFound(_, _) => HttpResponse::NotFound().json(body(&err.to_string())),
        AppError::Internal(detail) => {
            log::error!("internal error: {detail}");
            HttpResponse::InternalServerError().json(body("internal service error"))
        }
    }
}
