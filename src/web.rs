//
// web.rs
// Dicom-Catalog-rs
//
// Axum-based HTTP server exposing upload, study search, study lookup and stored-file download.
//
// Thales Matheus Mendonça Santos - October 2026

use std::fmt::Display;
use std::io;
use std::net::SocketAddr;

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::{header, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::{error::CatalogError, ingest::Ingestor, models::StudyRecord};

// Enhanced multi-frame studies routinely exceed axum's 2 MB default.
const MAX_UPLOAD_BYTES: usize = 512 * 1024 * 1024;

#[derive(Clone)]
struct AppState {
    ingestor: Ingestor,
}

/// Error response: status plus a JSON `{"error": ...}` body.
#[derive(Debug)]
pub struct ApiError(StatusCode, String);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.0, Json(json!({ "error": self.1 }))).into_response()
    }
}

impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        let status = match &err {
            CatalogError::StorageWrite { source, .. } => match source.kind() {
                io::ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
                io::ErrorKind::AlreadyExists => StatusCode::CONFLICT,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            CatalogError::StorageRead { source, .. } => match source.kind() {
                io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied => {
                    StatusCode::NOT_FOUND
                }
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            CatalogError::Parse { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            CatalogError::NotFound(_) => StatusCode::NOT_FOUND,
            CatalogError::Persistence(_) | CatalogError::CatalogUnavailable => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        ApiError(status, err.to_string())
    }
}

type ApiResult<T> = Result<T, ApiError>;

/// Builds the application router around an already opened ingestor.
pub fn router(ingestor: Ingestor) -> Router {
    let state = AppState { ingestor };

    Router::new()
        .route("/", get(root_handler))
        .route("/api/upload", post(upload_handler))
        .route("/api/studies", get(search_handler))
        .route("/api/studies/:id", get(study_handler))
        .route("/api/studies/:id/file", get(download_handler))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
        .layer(CorsLayer::permissive())
}

/// Bootstraps the Axum HTTP server and serves until the process is stopped.
pub async fn start_server(ingestor: Ingestor, host: &str, port: u16) -> anyhow::Result<()> {
    let app = router(ingestor);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Server running at http://{}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn root_handler() -> Html<&'static str> {
    Html(include_str!("templates/index.html"))
}

async fn upload_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<(StatusCode, Json<StudyRecord>)> {
    let mut upload = None;

    // Find the first part named "file" and pull bytes eagerly.
    while let Some(field) = multipart.next_field().await.map_err(bad_request)? {
        if field.name() == Some("file") {
            let file_name = field
                .file_name()
                .map(|s| s.to_string())
                .ok_or_else(|| bad_request("Uploaded file has no file name"))?;
            let data = field.bytes().await.map_err(bad_request)?;
            upload = Some((file_name, data));
            break;
        }
    }

    let (file_name, data) =
        upload.ok_or_else(|| ApiError(StatusCode::BAD_REQUEST, "No file uploaded".into()))?;

    let ingestor = state.ingestor.clone();
    let record = tokio::task::spawn_blocking(move || ingestor.ingest(&file_name, &data))
        .await
        .map_err(internal_error)??;

    Ok((StatusCode::CREATED, Json(record)))
}

#[derive(Debug, Default, Deserialize)]
struct SearchQuery {
    #[serde(default)]
    q: String,
}

async fn search_handler(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Json<Vec<StudyRecord>>> {
    let ingestor = state.ingestor.clone();
    let records = tokio::task::spawn_blocking(move || ingestor.search(&query.q))
        .await
        .map_err(internal_error)??;
    Ok(Json(records))
}

async fn study_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<StudyRecord>> {
    let id = parse_study_id(&id)?;
    let ingestor = state.ingestor.clone();
    let record = tokio::task::spawn_blocking(move || ingestor.catalog().get(id))
        .await
        .map_err(internal_error)??;
    Ok(Json(record))
}

async fn download_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let id = parse_study_id(&id)?;
    let ingestor = state.ingestor.clone();
    let (record, bytes) = tokio::task::spawn_blocking(move || {
        let record = ingestor.catalog().get(id)?;
        let path = ingestor.store().resolve(&record.stored_file_name)?;
        let bytes = ingestor.store().read(&path)?;
        Ok::<_, CatalogError>((record, bytes))
    })
    .await
    .map_err(internal_error)??;

    let disposition = HeaderValue::from_str(&format!(
        "attachment; filename=\"{}\"",
        record.stored_file_name.replace('"', "")
    ))
    .map_err(internal_error)?;
    Ok((
        [
            (
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/dicom"),
            ),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    ))
}

/// Study ids are taken as text so a malformed id gets the JSON error body too.
fn parse_study_id(raw: &str) -> ApiResult<i64> {
    raw.parse()
        .map_err(|_| ApiError(StatusCode::BAD_REQUEST, format!("invalid study id {:?}", raw)))
}

fn bad_request<E: Display>(err: E) -> ApiError {
    ApiError(StatusCode::BAD_REQUEST, err.to_string())
}

fn internal_error<E: Display>(err: E) -> ApiError {
    ApiError(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt; // for `oneshot`

    use dicom::core::{DataElement, PrimitiveValue, VR};
    use dicom::dictionary_std::{tags, StandardDataDictionary};
    use dicom::object::{FileDicomObject, FileMetaTableBuilder};
    use dicom::transfer_syntax::entries::EXPLICIT_VR_LITTLE_ENDIAN;

    use crate::catalog::Catalog;
    use crate::models::ParsedFields;
    use crate::storage::{DuplicatePolicy, FileStore};

    fn test_ingestor(dir: &std::path::Path) -> Ingestor {
        let store = FileStore::new(dir, DuplicatePolicy::Reject).expect("store");
        Ingestor::new(store, Catalog::open_in_memory().expect("catalog"))
    }

    fn fields(name: &str) -> ParsedFields {
        ParsedFields {
            patient_name: name.into(),
            study_date: "20230401".into(),
            patient_birth_date: "Unknown".into(),
            study_description: "No description".into(),
            patient_id: "No ID".into(),
            institution_name: "Unknown".into(),
        }
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        serde_json::from_slice(&bytes).expect("json body")
    }

    /// Bytes of a minimal Secondary Capture file for `patient`.
    fn dicom_fixture(patient: &str) -> Vec<u8> {
        let sop_class = "1.2.840.10008.5.1.4.1.1.7";
        let instance_uid = "1.2.826.0.1.3680043.2.1125.2";
        let meta = FileMetaTableBuilder::new()
            .transfer_syntax(EXPLICIT_VR_LITTLE_ENDIAN.uid())
            .media_storage_sop_class_uid(sop_class)
            .media_storage_sop_instance_uid(instance_uid)
            .build()
            .expect("meta");

        let mut obj = FileDicomObject::new_empty_with_dict_and_meta(StandardDataDictionary, meta);
        obj.put(DataElement::new(tags::SOP_CLASS_UID, VR::UI, PrimitiveValue::from(sop_class)));
        obj.put(DataElement::new(
            tags::SOP_INSTANCE_UID,
            VR::UI,
            PrimitiveValue::from(instance_uid),
        ));
        obj.put(DataElement::new(tags::PATIENT_NAME, VR::PN, PrimitiveValue::from(patient)));
        obj.put(DataElement::new(tags::STUDY_DATE, VR::DA, PrimitiveValue::from("20230401")));

        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("fixture.dcm");
        obj.write_to_file(&path).expect("write fixture");
        std::fs::read(&path).expect("read fixture")
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn multipart_upload(file_name: &str, bytes: &[u8]) -> Request<Body> {
        let boundary = "catalog-test-boundary";
        let mut body = format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{f}\"\r\n\
             Content-Type: application/dicom\r\n\r\n",
            b = boundary,
            f = file_name
        )
        .into_bytes();
        body.extend_from_slice(bytes);
        body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());

        Request::builder()
            .method("POST")
            .uri("/api/upload")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", boundary),
            )
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn search_filters_by_patient_name() {
        let dir = tempfile::tempdir().expect("tempdir");
        let ingestor = test_ingestor(dir.path());
        ingestor.catalog().ingest(fields("DOE^JANE"), "a.dcm").expect("a");
        ingestor.catalog().ingest(fields("SMITH^JOHN"), "b.dcm").expect("b");
        let app = router(ingestor);

        let response = app
            .clone()
            .oneshot(Request::builder().uri("/api/studies?q=DOE").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let found = body_json(response).await;
        assert_eq!(found.as_array().map(Vec::len), Some(1));
        assert_eq!(found[0]["patientName"], "DOE^JANE");
        assert_eq!(found[0]["storedFileName"], "a.dcm");

        let response = app
            .oneshot(Request::builder().uri("/api/studies").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(body_json(response).await.as_array().map(Vec::len), Some(2));
    }

    #[tokio::test]
    async fn unknown_study_is_not_found() {
        let dir = tempfile::tempdir().expect("tempdir");
        let app = router(test_ingestor(dir.path()));

        let response = app
            .oneshot(Request::builder().uri("/api/studies/7").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["error"], "study 7 not found");
    }

    #[tokio::test]
    async fn corrupt_upload_is_unprocessable_and_not_cataloged() {
        let dir = tempfile::tempdir().expect("tempdir");
        let ingestor = test_ingestor(dir.path());
        let app = router(ingestor.clone());

        let response = app
            .oneshot(multipart_upload("broken.dcm", b"garbage"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(ingestor.catalog().count().expect("count"), 0);
    }

    #[tokio::test]
    async fn upload_without_file_part_is_a_bad_request() {
        let dir = tempfile::tempdir().expect("tempdir");
        let app = router(test_ingestor(dir.path()));

        let boundary = "catalog-test-boundary";
        let body = format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"note\"\r\n\r\nhello\r\n--{b}--\r\n",
            b = boundary
        );
        let request = Request::builder()
            .method("POST")
            .uri("/api/upload")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", boundary),
            )
            .body(Body::from(body))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn storage_errors_map_to_client_statuses() {
        let duplicate = ApiError::from(CatalogError::StorageWrite {
            name: "a.dcm".into(),
            source: io::Error::new(io::ErrorKind::AlreadyExists, "exists"),
        });
        assert_eq!(duplicate.0, StatusCode::CONFLICT);

        let unsafe_name = ApiError::from(CatalogError::StorageWrite {
            name: "../a.dcm".into(),
            source: io::Error::new(io::ErrorKind::InvalidInput, "bad name"),
        });
        assert_eq!(unsafe_name.0, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn uploaded_study_can_be_fetched_and_downloaded() {
        let dir = tempfile::tempdir().expect("tempdir");
        let app = router(test_ingestor(dir.path()));
        let bytes = dicom_fixture("DOE^JANE");

        let response = app
            .clone()
            .oneshot(multipart_upload("jane.dcm", &bytes))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let created = body_json(response).await;
        assert_eq!(created["patientName"], "DOE^JANE");
        assert_eq!(created["studyDate"], "20230401");
        assert_eq!(created["institutionName"], "Unknown");
        assert_eq!(created["storedFileName"], "jane.dcm");
        assert!(dir.path().join("jane.dcm").exists());
        let id = created["id"].as_i64().expect("numeric id");

        let response = app
            .clone()
            .oneshot(get_request(&format!("/api/studies/{}", id)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, created);

        let response = app
            .oneshot(get_request(&format!("/api/studies/{}/file", id)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/dicom"
        );
        assert_eq!(
            response.headers().get(header::CONTENT_DISPOSITION).unwrap(),
            "attachment; filename=\"jane.dcm\""
        );
        let downloaded = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        assert_eq!(downloaded.as_ref(), bytes.as_slice());
    }

    #[tokio::test]
    async fn reupload_under_reject_policy_is_a_conflict() {
        let dir = tempfile::tempdir().expect("tempdir");
        let ingestor = test_ingestor(dir.path());
        let app = router(ingestor.clone());

        let first = app
            .clone()
            .oneshot(multipart_upload("scan.dcm", &dicom_fixture("DOE^JANE")))
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::CREATED);

        let second = app
            .oneshot(multipart_upload("scan.dcm", &dicom_fixture("SMITH^JOHN")))
            .await
            .unwrap();
        assert_eq!(second.status(), StatusCode::CONFLICT);
        assert!(body_json(second).await["error"].is_string());
        assert_eq!(ingestor.catalog().count().expect("count"), 1);
    }

    #[tokio::test]
    async fn upload_named_like_a_path_is_a_bad_request() {
        let root = tempfile::tempdir().expect("tempdir");
        let uploads = root.path().join("uploads");
        let ingestor = test_ingestor(&uploads);
        let app = router(ingestor.clone());

        let response = app
            .oneshot(multipart_upload("../x.dcm", &dicom_fixture("DOE^JANE")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(!root.path().join("x.dcm").exists());
        assert_eq!(ingestor.catalog().count().expect("count"), 0);
    }

    #[tokio::test]
    async fn download_of_a_removed_blob_is_not_found() {
        let dir = tempfile::tempdir().expect("tempdir");
        let ingestor = test_ingestor(dir.path());
        let record = ingestor
            .ingest("gone.dcm", &dicom_fixture("DOE^JANE"))
            .expect("ingest");
        std::fs::remove_file(dir.path().join("gone.dcm")).expect("remove blob");

        let response = router(ingestor)
            .oneshot(get_request(&format!("/api/studies/{}/file", record.id)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(body_json(response).await["error"].is_string());
    }

    #[tokio::test]
    async fn malformed_study_id_is_a_json_bad_request() {
        let dir = tempfile::tempdir().expect("tempdir");
        let app = router(test_ingestor(dir.path()));

        for uri in ["/api/studies/abc", "/api/studies/abc/file"] {
            let response = app.clone().oneshot(get_request(uri)).await.unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", uri);
            assert_eq!(body_json(response).await["error"], "invalid study id \"abc\"");
        }
    }
}
