//! End-to-end tests for the staging pipeline
//!
//! Drives the command and query handlers against the in-memory staging
//! store with fake upstream collaborators, plus one HTTP-level test of the
//! multipart import route.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;

use imar_common::StoreError;
use imar_server::config::ImportConfig;
use imar_server::features::staging::commands::{
    delete, import, promote_all, promote_one, update, DeleteStagedRecordCommand,
    DeleteStagedRecordError, ImportSpreadsheetCommand, ImportSpreadsheetError,
    PromoteBatchCommand, PromoteStagedRecordCommand, PromoteStagedRecordError,
    UpdateStagedRecordCommand,
};
use imar_server::features::staging::queries::{export, list, stats, ExportStagingQuery, ListStagedRecordsQuery, StagingStatsQuery};
use imar_server::features::staging::InFlight;
use imar_server::features::FeatureState;
use imar_server::models::{
    BatchStatus, LocationLabels, LocationLevel, MosqueId, NewMosqueRecord, ResolvedLocation,
};
use imar_server::spreadsheet::schema::headers;
use imar_server::spreadsheet::{build_workbook, Cell};
use imar_server::stores::{InMemoryStagingStore, LocationResolver, MosqueStore, ResolveError};

/// Resolver that accepts every location except a designated governorate.
struct FakeResolver {
    unknown_governorate: String,
}

#[async_trait]
impl LocationResolver for FakeResolver {
    async fn resolve(&self, labels: &LocationLabels) -> Result<ResolvedLocation, ResolveError> {
        if labels.governorate == self.unknown_governorate {
            return Err(ResolveError::Unresolved {
                level: LocationLevel::Governorate,
                label: labels.governorate.clone(),
            });
        }
        Ok(ResolvedLocation {
            governorate_id: 1,
            district_id: 2,
            sub_district_id: 3,
            neighborhood_id: 4,
        })
    }
}

/// Mosque store that records every created payload.
#[derive(Default)]
struct FakeMosqueStore {
    created: Mutex<Vec<NewMosqueRecord>>,
    fail_names: HashSet<String>,
}

#[async_trait]
impl MosqueStore for FakeMosqueStore {
    async fn create(&self, record: NewMosqueRecord) -> Result<MosqueId, StoreError> {
        if self.fail_names.contains(&record.name_en) {
            return Err(StoreError::Unavailable("injected outage".to_string()));
        }
        let mut created = self.created.lock().unwrap();
        created.push(record);
        Ok(uuid::Uuid::new_v4())
    }
}

fn state_with(mosques: Arc<FakeMosqueStore>) -> FeatureState {
    FeatureState {
        staging: Arc::new(InMemoryStagingStore::new()),
        locations: Arc::new(FakeResolver {
            unknown_governorate: "مجهول".to_string(),
        }),
        mosques,
        inflight: InFlight::new(),
        import: ImportConfig {
            max_file_size_bytes: 10 * 1024 * 1024,
        },
    }
}

fn state() -> FeatureState {
    state_with(Arc::new(FakeMosqueStore::default()))
}

fn header_row() -> Vec<Cell> {
    headers().into_iter().map(|h| Cell::Text(h.to_string())).collect()
}

fn data_row(name_ar: &str, name_en: &str, governorate: &str) -> Vec<Cell> {
    [
        name_ar,
        name_en,
        governorate,
        "جبل سمعان",
        "مركز",
        "الميدان",
        "",
        "جزئي",
        "100000",
        "إعادة إعمار",
        "لجنة الإعمار",
        "",
    ]
    .iter()
    .map(|c| Cell::Text(c.to_string()))
    .collect()
}

fn workbook(rows: &[Vec<Cell>]) -> Vec<u8> {
    let mut all = vec![header_row()];
    all.extend_from_slice(rows);
    build_workbook(&all).unwrap()
}

async fn import_file(state: &FeatureState, bytes: Vec<u8>) -> import::ImportSpreadsheetResponse {
    import::handle(
        state,
        ImportSpreadsheetCommand {
            filename: "masajid.xlsx".to_string(),
            bytes,
        },
    )
    .await
    .unwrap()
}

#[tokio::test]
async fn partial_import_keeps_valid_rows_and_reports_bad_ones() {
    let state = state();
    // Row 2 is missing both names.
    let bytes = workbook(&[
        data_row("مسجد النور", "Al-Nour", "حلب"),
        data_row("", "", "حلب"),
        data_row("مسجد الرحمة", "Al-Rahma", "حمص"),
    ]);

    let response = import_file(&state, bytes).await;
    assert_eq!(response.records.len(), 2);
    assert_eq!(response.row_errors.len(), 1);
    assert_eq!(response.batch.remaining, 2);
    assert_eq!(response.batch.status, BatchStatus::Reviewing);
}

#[tokio::test]
async fn all_invalid_rows_create_no_batch() {
    let state = state();
    let bytes = workbook(&[data_row("", "", "حلب"), data_row("", "", "حمص")]);

    let err = import::handle(
        &state,
        ImportSpreadsheetCommand {
            filename: "bad.xlsx".to_string(),
            bytes,
        },
    )
    .await
    .unwrap_err();

    match err {
        ImportSpreadsheetError::EmptyImport { row_errors } => assert_eq!(row_errors.len(), 2),
        other => panic!("expected EmptyImport, got {:?}", other),
    }
    assert!(state.staging.batches().await.is_empty());
}

#[tokio::test]
async fn promotion_is_idempotent() {
    let mosques = Arc::new(FakeMosqueStore::default());
    let state = state_with(Arc::clone(&mosques));
    let response = import_file(&state, workbook(&[data_row("مسجد", "Mosque", "حلب")])).await;
    let id = response.records[0].id;

    let first = promote_one::handle(&state, PromoteStagedRecordCommand { id })
        .await
        .unwrap();
    assert_eq!(first.staged_id, id);

    // Second promote of the same id: gone is gone.
    let second = promote_one::handle(&state, PromoteStagedRecordCommand { id }).await;
    assert!(matches!(
        second,
        Err(PromoteStagedRecordError::NotFound(gone)) if gone == id
    ));

    assert_eq!(mosques.created.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn failed_promotion_leaves_the_record_staged() {
    let state = state();
    let response = import_file(&state, workbook(&[data_row("مسجد", "Mosque", "مجهول")])).await;
    let id = response.records[0].id;

    let err = promote_one::handle(&state, PromoteStagedRecordCommand { id })
        .await
        .unwrap_err();
    match err {
        PromoteStagedRecordError::UnresolvedLocation { level, label } => {
            assert_eq!(level, LocationLevel::Governorate);
            assert_eq!(label, "مجهول");
        },
        other => panic!("expected UnresolvedLocation, got {:?}", other),
    }

    // Still there, editable, retryable.
    assert!(state.staging.get(id).await.is_some());
}

#[tokio::test]
async fn edit_then_promote_uses_the_corrected_location() {
    let mosques = Arc::new(FakeMosqueStore::default());
    let state = state_with(Arc::clone(&mosques));
    let response = import_file(&state, workbook(&[data_row("مسجد", "Mosque", "مجهول")])).await;
    let id = response.records[0].id;

    let command = UpdateStagedRecordCommand {
        id,
        governorate: Some("حلب".to_string()),
        estimated_cost: Some(123_456.0),
        ..Default::default()
    };
    let updated = update::handle(&state, command).await.unwrap();
    assert_eq!(updated.fields.location.governorate, "حلب");

    promote_one::handle(&state, PromoteStagedRecordCommand { id })
        .await
        .unwrap();

    let created = mosques.created.lock().unwrap();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].estimated_cost, 123_456.0);
}

#[tokio::test]
async fn deletion_never_touches_the_authoritative_store() {
    let mosques = Arc::new(FakeMosqueStore::default());
    let state = state_with(Arc::clone(&mosques));
    let response = import_file(&state, workbook(&[data_row("مسجد", "Mosque", "حلب")])).await;
    let id = response.records[0].id;

    let deleted = delete::handle(&state, DeleteStagedRecordCommand { id })
        .await
        .unwrap();
    assert_eq!(deleted.id, id);
    assert!(mosques.created.lock().unwrap().is_empty());

    // A second delete, and a promote of the deleted id, both observe NotFound.
    assert!(matches!(
        delete::handle(&state, DeleteStagedRecordCommand { id }).await,
        Err(DeleteStagedRecordError::NotFound(_))
    ));
    assert!(matches!(
        promote_one::handle(&state, PromoteStagedRecordCommand { id }).await,
        Err(PromoteStagedRecordError::NotFound(_))
    ));
}

#[tokio::test]
async fn promote_all_isolates_failures() {
    let state = state();
    let response = import_file(
        &state,
        workbook(&[
            data_row("مسجد أ", "Mosque A", "حلب"),
            data_row("مسجد ب", "Mosque B", "مجهول"),
            data_row("مسجد ج", "Mosque C", "حمص"),
        ]),
    )
    .await;
    let batch_id = response.batch.id;
    let unresolved_id = response.records[1].id;

    let sweep = promote_all::handle(&state, PromoteBatchCommand { batch_id })
        .await
        .unwrap();

    assert_eq!(sweep.promoted.len(), 2);
    assert_eq!(sweep.failed.len(), 1);
    assert_eq!(sweep.failed[0].staged_id, unresolved_id);
    assert!(sweep.failed[0].error.contains("مجهول"));

    // The failed record is still staged; the batch is still under review.
    assert!(state.staging.get(unresolved_id).await.is_some());
    assert_eq!(sweep.batch.status, BatchStatus::Reviewing);
    assert_eq!(sweep.batch.remaining, 1);
}

#[tokio::test]
async fn promote_all_does_not_touch_other_batches() {
    let state = state();
    let first = import_file(&state, workbook(&[data_row("مسجد أ", "Mosque A", "حلب")])).await;
    let second = import_file(&state, workbook(&[data_row("مسجد ب", "Mosque B", "حمص")])).await;

    promote_all::handle(&state, PromoteBatchCommand { batch_id: first.batch.id })
        .await
        .unwrap();

    assert!(state.staging.get(second.records[0].id).await.is_some());
    let untouched = state.staging.batch(second.batch.id).await.unwrap();
    assert_eq!(untouched.status, BatchStatus::Reviewing);
}

#[tokio::test]
async fn three_row_example_scenario() {
    let mosques = Arc::new(FakeMosqueStore::default());
    let state = state_with(Arc::clone(&mosques));

    // Row 2 is missing the bilingual name.
    let response = import_file(
        &state,
        workbook(&[
            data_row("مسجد النور", "Al-Nour", "حلب"),
            data_row("", "", "حلب"),
            data_row("مسجد الرحمة", "Al-Rahma", "حمص"),
        ]),
    )
    .await;
    let batch_id = response.batch.id;
    assert_eq!(response.records.len(), 2);

    let figures = stats::handle(
        &state,
        StagingStatsQuery {
            batch_id: Some(batch_id),
        },
    )
    .await
    .unwrap();
    assert_eq!(figures.staged_count, 2);

    let sweep = promote_all::handle(&state, PromoteBatchCommand { batch_id })
        .await
        .unwrap();
    assert_eq!(sweep.promoted.len(), 2);
    assert!(sweep.failed.is_empty());
    assert_eq!(mosques.created.lock().unwrap().len(), 2);

    // Staging is empty for the batch and its status reflects completion.
    let (items, total) = state.staging.list(Some(batch_id), 0, 50).await;
    assert!(items.is_empty());
    assert_eq!(total, 0);
    assert_eq!(sweep.batch.status, BatchStatus::Completed);
    assert_eq!(sweep.batch.remaining, 0);
}

#[tokio::test]
async fn deleting_every_record_marks_the_batch_rejected() {
    let state = state();
    let response = import_file(&state, workbook(&[data_row("مسجد", "Mosque", "حلب")])).await;

    let deleted = delete::handle(
        &state,
        DeleteStagedRecordCommand {
            id: response.records[0].id,
        },
    )
    .await
    .unwrap();

    let batch = deleted.batch.unwrap();
    assert_eq!(batch.status, BatchStatus::Rejected);
}

#[tokio::test]
async fn export_import_round_trip_preserves_fields() {
    let state = state();
    let original = import_file(
        &state,
        workbook(&[
            data_row("مسجد النور", "Al-Nour", "حلب"),
            data_row("مسجد الرحمة", "Al-Rahma", "حمص"),
        ]),
    )
    .await;

    let exported = export::handle(&state, ExportStagingQuery::default())
        .await
        .unwrap();

    // Re-import the export into a fresh staging area.
    let second = self::state();
    let reimported = import_file(&second, exported).await;
    assert_eq!(reimported.records.len(), 2);
    assert!(reimported.row_errors.is_empty());

    let original_fields: Vec<_> = original.records.iter().map(|r| r.fields.clone()).collect();
    let reimported_fields: Vec<_> =
        reimported.records.iter().map(|r| r.fields.clone()).collect();
    assert_eq!(original_fields, reimported_fields);
}

#[tokio::test]
async fn upstream_outage_is_reported_and_record_stays() {
    let mosques = Arc::new(FakeMosqueStore {
        created: Mutex::new(Vec::new()),
        fail_names: HashSet::from(["Mosque".to_string()]),
    });
    let state = state_with(mosques);
    let response = import_file(&state, workbook(&[data_row("مسجد", "Mosque", "حلب")])).await;
    let id = response.records[0].id;

    let err = promote_one::handle(&state, PromoteStagedRecordCommand { id })
        .await
        .unwrap_err();
    match err {
        PromoteStagedRecordError::Store(store) => assert!(store.is_retryable()),
        other => panic!("expected Store error, got {:?}", other),
    }
    assert!(state.staging.get(id).await.is_some());
}

#[tokio::test]
async fn list_pages_and_scopes_by_batch() {
    let state = state();
    let first = import_file(
        &state,
        workbook(&[
            data_row("مسجد أ", "Mosque A", "حلب"),
            data_row("مسجد ب", "Mosque B", "حلب"),
            data_row("مسجد ج", "Mosque C", "حلب"),
        ]),
    )
    .await;
    import_file(&state, workbook(&[data_row("مسجد د", "Mosque D", "حمص")])).await;

    let query = ListStagedRecordsQuery {
        batch_id: Some(first.batch.id),
        page: Some(1),
        per_page: Some(2),
    };
    let page = list::handle(&state, query).await.unwrap();
    assert_eq!(page.items.len(), 2);
    assert_eq!(page.pagination.total, 3);
    assert_eq!(page.pagination.total_pages, 2);
    assert_eq!(page.batches.len(), 1);
}

// ============================================================================
// HTTP surface
// ============================================================================

fn app(state: FeatureState) -> axum::Router {
    axum::Router::new().nest("/api/v1", imar_server::features::router(state))
}

fn multipart_body(boundary: &str, filename: &str, bytes: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\n",
            filename
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());
    body
}

#[tokio::test]
async fn import_route_creates_a_batch() {
    let state = state();
    let bytes = workbook(&[data_row("مسجد النور", "Al-Nour", "حلب")]);

    let boundary = "X-IMAR-TEST-BOUNDARY";
    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/staging/import")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", boundary),
        )
        .body(Body::from(multipart_body(boundary, "masajid.xlsx", &bytes)))
        .unwrap();

    let response = app(state).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(value["success"], true);
    assert_eq!(value["data"]["records"][0]["name_en"], "Al-Nour");
}

#[tokio::test]
async fn import_route_rejects_unsupported_extension() {
    let state = state();
    let boundary = "X-IMAR-TEST-BOUNDARY";
    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/staging/import")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", boundary),
        )
        .body(Body::from(multipart_body(boundary, "masajid.csv", b"a,b,c")))
        .unwrap();

    let response = app(state).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(value["error"]["code"], "UNSUPPORTED_FILE_TYPE");
}

#[tokio::test]
async fn template_route_serves_a_workbook() {
    let response = app(state())
        .oneshot(
            Request::builder()
                .uri("/api/v1/staging/template")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
    );

    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&body[..2], b"PK");
}
