use crate::applicants::{normalize_phone, ApplicantService};
use crate::bank_accounts::BankAccountService;
use crate::eligibility::{ApplicantIdentity, EligibilityService};
use crate::errors::{AppError, ResultExt};
use crate::models::*;
use crate::otp::OtpVerifier;
use crate::storage_client::ObjectStorageClient;
use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use moka::future::Cache;
use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

/// Shared application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub db: PgPool,
    /// Client for the object-storage service.
    pub storage: ObjectStorageClient,
    /// Loan-product catalog cache (reference data, 5 minute TTL).
    pub catalog_cache: Cache<String, Arc<Vec<LoanProduct>>>,
}

impl AppState {
    pub fn applicants(&self) -> ApplicantService {
        ApplicantService::new(self.db.clone())
    }

    pub fn accounts(&self) -> BankAccountService {
        BankAccountService::new(self.db.clone())
    }

    pub fn eligibility(&self) -> EligibilityService {
        EligibilityService::new(self.db.clone(), self.catalog_cache.clone())
    }

    pub fn otp(&self) -> OtpVerifier {
        OtpVerifier::new(self.db.clone())
    }
}

/// Health check endpoint.
pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "loan-intake-api",
            "version": "0.1.0"
        })),
    )
}

/// POST /api/auth/verify-signup
///
/// OTP-gated availability check before registration: verifies the submitted
/// passcode, then reports whether the phone number is free to register.
pub async fn verify_signup(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SignupVerification>,
) -> Result<Json<serde_json::Value>, AppError> {
    let phone = payload
        .phone_number
        .as_deref()
        .filter(|p| !p.trim().is_empty())
        .ok_or_else(|| {
            AppError::BadRequest("El número de teléfono es requerido.".to_string())
        })?;
    let code = payload
        .code
        .as_deref()
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest("El código OTP es requerido.".to_string()))?;

    state.otp().verify(phone, code).await?;

    let matches = state.applicants().find_by_phone(phone).await?;
    match matches.len() {
        0 => Ok(Json(json!({
            "message": "Número de celular disponible para registro."
        }))),
        1 => Err(AppError::Conflict(
            "Número de celular ya registrado.".to_string(),
        )),
        _ => Err(AppError::Conflict(
            "Número de celular registrado múltiples veces. Verifique los registros.".to_string(),
        )),
    }
}

/// One uploaded part of the registration multipart body.
struct UploadedFile {
    name: String,
    content_type: String,
    data: Vec<u8>,
}

/// POST /api/auth/register (multipart)
///
/// Expects a `contacto` field, a `formData` JSON field and exactly 3 files.
/// All validation happens before any side effect; uploads are sequential and
/// the first failure aborts without cleaning up already-uploaded objects.
pub async fn register(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<RegistrationResponse>), AppError> {
    let mut contacto: Option<String> = None;
    let mut form_data_raw: Option<String> = None;
    let mut files: Vec<UploadedFile> = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Solicitud multipart inválida: {}", e)))?
    {
        match field.name() {
            Some("contacto") => {
                contacto = Some(field.text().await.map_err(|e| {
                    AppError::BadRequest(format!("Campo 'contacto' ilegible: {}", e))
                })?);
            }
            Some("formData") => {
                form_data_raw = Some(field.text().await.map_err(|e| {
                    AppError::BadRequest(format!("Campo 'formData' ilegible: {}", e))
                })?);
            }
            Some("files") => {
                let name = field
                    .file_name()
                    .map(|n| n.to_string())
                    .unwrap_or_else(|| format!("documento-{}", files.len() + 1));
                let content_type = field
                    .content_type()
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "application/octet-stream".to_string());
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Archivo ilegible: {}", e)))?
                    .to_vec();
                files.push(UploadedFile {
                    name,
                    content_type,
                    data,
                });
            }
            _ => {}
        }
    }

    let contacto = contacto
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest("El campo \"contacto\" es obligatorio.".to_string()))?;

    if files.len() != 3 {
        return Err(AppError::BadRequest(
            "Debe enviar exactamente 3 archivos.".to_string(),
        ));
    }

    let mut form: RegistrationForm = serde_json::from_str(form_data_raw.as_deref().unwrap_or(""))
        .map_err(|_| {
            AppError::BadRequest("El campo \"formData\" debe ser un JSON válido.".to_string())
        })?;

    let phone = normalize_phone(&contacto);
    form.contacto = Some(phone.clone());

    let applicants = state.applicants();
    if !applicants.find_by_phone(&phone).await?.is_empty() {
        return Err(AppError::Conflict(
            "El número de celular ya está registrado.".to_string(),
        ));
    }
    if applicants.find_by_document(&form.dni).await?.is_some() {
        return Err(AppError::Conflict("El CURP ya está registrado.".to_string()));
    }

    // Sequential uploads; orphaned objects on partial failure are accepted.
    let mut uploaded_files = Vec::with_capacity(files.len());
    for file in files {
        let key = format!("{}-{}", Uuid::new_v4(), file.name);
        let location = state
            .storage
            .upload(&key, &file.content_type, file.data)
            .await?;
        uploaded_files.push(location);
    }

    let identity = ApplicantIdentity::of_form(&form, &phone);
    let applications = state.eligibility().for_applicant(&identity).await?;

    // Applicant and initial titular account commit together or not at all.
    let mut tx = state
        .db
        .begin()
        .await
        .context("failed to begin registration transaction")?;

    let applicant = applicants
        .insert(&mut tx, &form, &phone, &uploaded_files)
        .await?;

    state
        .accounts()
        .insert(
            &mut tx,
            applicant.id,
            &NewBankAccount {
                titular: true,
                nombre_banco: form.nombre_banco.clone(),
                clave_banco: form.clave_banco.clone(),
                numero_de_cuenta: form.numero_de_tarjeta_bancari.clone(),
                tipo_cuenta: form.tipo_cuenta.clone(),
                estado_de_cuenta: None,
            },
        )
        .await?;

    tx.commit()
        .await
        .context("failed to commit registration")?;

    tracing::info!("Registered applicant {} ({})", applicant.id, phone);

    Ok((
        StatusCode::CREATED,
        Json(RegistrationResponse {
            message: "Registro completado con éxito.".to_string(),
            data: RegistrationData {
                form,
                applications,
                uploaded_files,
                form_id: applicant.id,
            },
        }),
    ))
}

/// GET /api/auth/login
///
/// OTP-gated login: verifies the passcode, then resolves the phone to exactly
/// one applicant and returns the enriched view.
pub async fn login(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LoginParams>,
) -> Result<Json<ApplicantView>, AppError> {
    let (Some(phone), Some(code)) = (params.phone_number.as_deref(), params.code.as_deref())
    else {
        return Err(AppError::BadRequest(
            "El número de teléfono y el código son requeridos.".to_string(),
        ));
    };

    state.otp().verify(phone, code).await?;

    let mut matches = state.applicants().find_by_phone(phone).await?;
    match matches.len() {
        0 => Err(AppError::Unauthorized(
            "Número de celular no registrado.".to_string(),
        )),
        1 => {
            let applicant = matches.remove(0);
            Ok(Json(enriched_view(&state, applicant).await?))
        }
        _ => Err(AppError::Conflict(
            "Existen múltiples cuentas asociadas con este número.".to_string(),
        )),
    }
}

/// GET /api/auth/refresh
///
/// Phone lookup used by the mobile client on refresh; no OTP involved.
pub async fn refresh(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PhoneLookupParams>,
) -> Result<Json<ApplicantView>, AppError> {
    let applicant = resolve_single_by_phone(&state, params.phone_number.as_deref()).await?;
    Ok(Json(enriched_view(&state, applicant).await?))
}

/// GET /api/auth/web
///
/// Web-facing lookup variant: returns document URLs instead of eligibility.
pub async fn web_lookup(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PhoneLookupParams>,
) -> Result<Json<WebApplicantView>, AppError> {
    let applicant = resolve_single_by_phone(&state, params.phone_number.as_deref()).await?;
    let cuentas_bancarias = state.accounts().list(applicant.id).await?;
    Ok(Json(WebApplicantView {
        user_id: applicant.id,
        photo_urls: applicant.images.clone(),
        applicant,
        cuentas_bancarias,
    }))
}

/// PUT /api/auth/applicants/:id
///
/// Allow-listed partial update; responds with the enriched applicant view.
pub async fn update_applicant(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(update): Json<ApplicantUpdate>,
) -> Result<Json<ApplicantView>, AppError> {
    let applicant = state.applicants().apply_update(id, update).await?;
    Ok(Json(enriched_view(&state, applicant).await?))
}

/// GET /api/auth/contacts
///
/// Paginated contact list filtered by full name.
pub async fn contacts(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ContactQuery>,
) -> Result<Json<ContactPage>, AppError> {
    let page = state
        .applicants()
        .contact_page(params.nombre_completo.as_deref(), params.page, params.limit)
        .await?;
    Ok(Json(page))
}

/// Resolves a phone filter to exactly one applicant: 0 matches is 404,
/// several matches is 409 (standardized; the predecessor mixed 409 and 204).
async fn resolve_single_by_phone(
    state: &AppState,
    phone: Option<&str>,
) -> Result<Applicant, AppError> {
    let phone = phone.filter(|p| !p.trim().is_empty()).ok_or_else(|| {
        AppError::BadRequest("El campo phoneNumber es requerido.".to_string())
    })?;

    let mut matches = state.applicants().find_by_phone(phone).await?;
    match matches.len() {
        0 => Err(AppError::NotFound(
            "No se encontraron usuarios que coincidan con el filtro.".to_string(),
        )),
        1 => Ok(matches.remove(0)),
        _ => Err(AppError::Conflict(
            "Existen múltiples cuentas asociadas con este número.".to_string(),
        )),
    }
}

/// Builds the enriched applicant view returned by login/refresh/update:
/// the record plus freshly computed eligibility and bank accounts.
pub async fn enriched_view(
    state: &AppState,
    applicant: Applicant,
) -> Result<ApplicantView, AppError> {
    let applications = state
        .eligibility()
        .for_applicant(&ApplicantIdentity::of(&applicant))
        .await?;
    let cuentas_bancarias = state.accounts().list(applicant.id).await?;
    Ok(ApplicantView {
        user_id: applicant.id,
        applicant,
        applications,
        cuentas_bancarias,
    })
}
