use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// ============ Database Models ============

/// An applicant record — one per phone number.
///
/// Uniqueness is enforced at the application level (registration checks),
/// not by a database constraint. Applicants are never hard-deleted.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Applicant {
    /// Generated primary key.
    pub id: Uuid,
    pub nombres: String,
    pub apellidos: String,
    /// Contact phone number, stored normalized (E.164 where parseable).
    pub contacto: String,
    /// Identity document number (CURP).
    pub dni: String,
    pub provincia_ciudad: Option<String>,
    pub estado_civil: Option<String>,
    pub trabajo: Option<String>,
    pub prestamo_en_linea: Option<String>,
    pub prestamos_pendientes: Option<String>,
    pub ingreso: Option<String>,
    pub nivel_de_prestamo: Option<String>,
    pub nombre_banco: Option<String>,
    pub clave_banco: Option<String>,
    pub tipo_cuenta: Option<String>,
    // Wire spelling kept for client compatibility
    pub numero_de_tarjeta_bancari: Option<String>,
    pub fecha_nacimiento: Option<String>,
    pub sexo: Option<String>,
    pub nivel_educativo: Option<String>,
    pub contact_name_amigo: Option<String>,
    pub contact_name_familiar: Option<String>,
    pub phone_number_amigo: Option<String>,
    pub phone_number_familiar: Option<String>,
    /// Uploaded document URLs, exactly 3 at registration.
    pub images: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Applicant {
    /// Full name used for loan-history matching ("nombres apellidos").
    pub fn full_name(&self) -> String {
        format!("{} {}", self.nombres, self.apellidos)
    }
}

/// Lifecycle state of a bank account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum AccountStatus {
    #[default]
    Activo,
    Bloqueado,
}

impl AccountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::Activo => "Activo",
            AccountStatus::Bloqueado => "Bloqueado",
        }
    }
}

/// A bank account owned by exactly one applicant.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BankAccount {
    pub id: Uuid,
    #[serde(skip_serializing)]
    pub applicant_id: Uuid,
    /// Whether this is the primary/holder account.
    pub titular: bool,
    pub nombre_banco: Option<String>,
    pub clave_banco: Option<String>,
    pub numero_de_cuenta: Option<String>,
    pub tipo_cuenta: Option<String>,
    /// "Activo" or "Bloqueado".
    pub estado_de_cuenta: String,
    pub created_at: DateTime<Utc>,
}

/// Loan product catalog row (tiers joined separately).
#[derive(Debug, Clone, FromRow)]
pub struct ProductRow {
    pub id: Uuid,
    pub nombre: String,
    pub icon: Option<String>,
    pub calificacion: Option<f64>,
}

/// Tier row belonging to a loan product.
#[derive(Debug, Clone, FromRow)]
pub struct TierRow {
    pub product_id: Uuid,
    pub nivel: i32,
    pub valor_prestado_mas_interes: BigDecimal,
    pub interes_diario: BigDecimal,
    pub interes_total: BigDecimal,
    pub valor_deposito_liquido: BigDecimal,
    pub valor_extencion: BigDecimal,
    pub valor_prestamo_menos_interes: BigDecimal,
}

/// A historical loan fact, immutable once created.
///
/// Referenced by exact (phone, full name) match, not by a foreign key.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanRecord {
    pub nombre_del_producto: String,
    pub numero_de_telefono_movil: String,
    pub nombre_del_cliente: String,
    /// Free text; the canonical paid value is "pagado" (trimmed, lowercased).
    pub estado_de_credito: String,
}

// ============ Eligibility Models ============

/// A qualification level within a loan product.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanTier {
    pub nivel_de_prestamo: i32,
    pub valor_prestado_mas_interes: BigDecimal,
    pub interes_diario: BigDecimal,
    pub interes_total: BigDecimal,
    pub valor_deposito_liquido: BigDecimal,
    pub valor_extencion: BigDecimal,
    pub valor_prestamo_menos_interes: BigDecimal,
}

/// A third-party loan product with its qualification ladder.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoanProduct {
    pub nombre: String,
    pub icon: Option<String>,
    pub calificacion: Option<f64>,
    pub niveles: Vec<LoanTier>,
}

/// Display state of a product for a given applicant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TierStatus {
    #[serde(rename = "Disponible")]
    Disponible,
    #[serde(rename = "No disponible")]
    NoDisponible,
    #[serde(rename = "Próximamente")]
    Proximamente,
}

/// Per-product eligibility computed for one applicant.
///
/// `prestamo_maximo`/`interes_diario_maximo` carry the ceiling terms; the
/// remaining figures come from the tier the applicant would borrow at next.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductEligibility {
    pub nombre: String,
    pub icon: Option<String>,
    pub calificacion: Option<f64>,
    pub prestamo_maximo: BigDecimal,
    pub interes_diario_maximo: BigDecimal,
    pub interes_diario: BigDecimal,
    pub interes_total: BigDecimal,
    pub valor_deposito_liquido: BigDecimal,
    pub valor_extencion: BigDecimal,
    pub valor_prestado: BigDecimal,
    pub valor_prestamo_menos_interes: BigDecimal,
    pub estado_de_nivel: TierStatus,
    pub nivel_de_prestamo: Option<i32>,
}

// ============ API Request Models ============

/// The structured form payload submitted at registration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationForm {
    pub nombres: String,
    pub apellidos: String,
    pub dni: String,
    #[serde(default)]
    pub contacto: Option<String>,
    #[serde(default)]
    pub provincia_ciudad: Option<String>,
    #[serde(default)]
    pub estado_civil: Option<String>,
    #[serde(default)]
    pub trabajo: Option<String>,
    #[serde(default)]
    pub prestamo_en_linea: Option<String>,
    #[serde(default)]
    pub prestamos_pendientes: Option<String>,
    #[serde(default)]
    pub ingreso: Option<String>,
    #[serde(default)]
    pub nivel_de_prestamo: Option<String>,
    #[serde(default)]
    pub nombre_banco: Option<String>,
    #[serde(default)]
    pub clave_banco: Option<String>,
    #[serde(default)]
    pub tipo_cuenta: Option<String>,
    #[serde(default)]
    pub numero_de_tarjeta_bancari: Option<String>,
    #[serde(default)]
    pub fecha_nacimiento: Option<String>,
    #[serde(default)]
    pub sexo: Option<String>,
    #[serde(default)]
    pub nivel_educativo: Option<String>,
    #[serde(default)]
    pub contact_name_amigo: Option<String>,
    #[serde(default)]
    pub contact_name_familiar: Option<String>,
    #[serde(default)]
    pub phone_number_amigo: Option<String>,
    #[serde(default)]
    pub phone_number_familiar: Option<String>,
}

/// Allow-listed partial update of an applicant. Absent fields are untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicantUpdate {
    pub apellidos: Option<String>,
    pub nombres: Option<String>,
    pub contacto: Option<String>,
    pub dni: Option<String>,
    pub provincia_ciudad: Option<String>,
    pub estado_civil: Option<String>,
    pub trabajo: Option<String>,
    pub prestamo_en_linea: Option<String>,
    pub prestamos_pendientes: Option<String>,
    pub ingreso: Option<String>,
    pub nivel_de_prestamo: Option<String>,
    pub nombre_banco: Option<String>,
    pub clave_banco: Option<String>,
    pub tipo_cuenta: Option<String>,
    pub numero_de_tarjeta_bancari: Option<String>,
    pub fecha_nacimiento: Option<String>,
    pub sexo: Option<String>,
    pub nivel_educativo: Option<String>,
    pub contact_name_amigo: Option<String>,
    pub contact_name_familiar: Option<String>,
    pub phone_number_amigo: Option<String>,
    pub phone_number_familiar: Option<String>,
}

/// New bank account payload (nested under an applicant).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBankAccount {
    #[serde(default)]
    pub titular: bool,
    pub nombre_banco: Option<String>,
    pub clave_banco: Option<String>,
    pub numero_de_cuenta: Option<String>,
    pub tipo_cuenta: Option<String>,
    pub estado_de_cuenta: Option<AccountStatus>,
}

/// Partial bank-account update. Absent fields are untouched, not nulled.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BankAccountUpdate {
    pub titular: Option<bool>,
    pub nombre_banco: Option<String>,
    pub clave_banco: Option<String>,
    pub numero_de_cuenta: Option<String>,
    pub tipo_cuenta: Option<String>,
    pub estado_de_cuenta: Option<AccountStatus>,
}

/// Body of POST /api/auth/verify-signup.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupVerification {
    pub phone_number: Option<String>,
    pub code: Option<String>,
}

/// Query of GET /api/auth/login.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginParams {
    pub phone_number: Option<String>,
    pub code: Option<String>,
}

/// Query of the phone lookup endpoints.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhoneLookupParams {
    pub phone_number: Option<String>,
}

/// Query of GET /api/auth/contacts.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactQuery {
    pub nombre_completo: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

// ============ API Response Models ============

/// Applicant enriched with freshly computed eligibility and bank accounts.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicantView {
    #[serde(rename = "userID")]
    pub user_id: Uuid,
    #[serde(flatten)]
    pub applicant: Applicant,
    pub applications: Vec<ProductEligibility>,
    pub cuentas_bancarias: Vec<BankAccount>,
}

/// Web-facing lookup variant: document URLs instead of eligibility.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebApplicantView {
    #[serde(rename = "userID")]
    pub user_id: Uuid,
    #[serde(flatten)]
    pub applicant: Applicant,
    #[serde(rename = "photoURLs")]
    pub photo_urls: Vec<String>,
    pub cuentas_bancarias: Vec<BankAccount>,
}

/// One entry of the paginated contact list.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactSummary {
    pub id: Uuid,
    pub nombre_completo: String,
    pub contacto: String,
}

/// Paginated contact search result.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactPage {
    pub data: Vec<ContactSummary>,
    pub current_page: i64,
    pub total_pages: i64,
    pub total_documents: i64,
}

/// Response of POST /api/auth/register.
#[derive(Debug, Serialize)]
pub struct RegistrationResponse {
    pub message: String,
    pub data: RegistrationData,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationData {
    #[serde(flatten)]
    pub form: RegistrationForm,
    pub applications: Vec<ProductEligibility>,
    pub uploaded_files: Vec<String>,
    pub form_id: Uuid,
}

/// Response of the bank-account update endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountUpdateResponse {
    pub message: String,
    pub cuenta_bancaria: BankAccount,
}

/// Response of the bank-account removal endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountRemovalResponse {
    pub message: String,
    pub cuentas_bancarias: Vec<BankAccount>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_status_wire_names() {
        assert_eq!(
            serde_json::to_string(&TierStatus::Disponible).unwrap(),
            "\"Disponible\""
        );
        assert_eq!(
            serde_json::to_string(&TierStatus::NoDisponible).unwrap(),
            "\"No disponible\""
        );
        assert_eq!(
            serde_json::to_string(&TierStatus::Proximamente).unwrap(),
            "\"Próximamente\""
        );
    }

    #[test]
    fn registration_form_accepts_partial_payload() {
        let form: RegistrationForm = serde_json::from_str(
            r#"{"nombres":"Ana","apellidos":"Lopez","dni":"LOAA900101MDFXXX01","nombreBanco":"BBVA"}"#,
        )
        .unwrap();
        assert_eq!(form.nombre_banco.as_deref(), Some("BBVA"));
        assert!(form.contacto.is_none());
        assert!(form.numero_de_tarjeta_bancari.is_none());
    }

    #[test]
    fn applicant_update_keeps_wire_misspelling() {
        let update: ApplicantUpdate =
            serde_json::from_str(r#"{"numeroDeTarjetaBancari":"4152000011112222"}"#).unwrap();
        assert_eq!(
            update.numero_de_tarjeta_bancari.as_deref(),
            Some("4152000011112222")
        );
    }
}
