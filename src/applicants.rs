//! Applicant repository: normalized-phone equality lookup, uniqueness checks,
//! allow-listed partial updates and contact pagination.

use crate::errors::{AppError, ResultExt};
use crate::models::{
    Applicant, ApplicantUpdate, ContactPage, ContactSummary, RegistrationForm,
};
use phonenumber::{country::Id as CountryId, Mode};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

/// Normalizes a phone number for storage and equality comparison.
///
/// Uses the phonenumber library (port of Google's libphonenumber) to parse
/// Mexican numbers into E.164; inputs that don't parse fall back to their
/// bare digits. Lookups compare normalized values with plain equality —
/// no pattern matching against user input.
pub fn normalize_phone(raw: &str) -> String {
    match phonenumber::parse(Some(CountryId::MX), raw) {
        Ok(number) if phonenumber::is_valid(&number) => {
            number.format().mode(Mode::E164).to_string()
        }
        _ => raw.chars().filter(|c| c.is_ascii_digit()).collect(),
    }
}

/// Escapes LIKE wildcards in a user-supplied search token.
fn escape_like(token: &str) -> String {
    token
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

const DEFAULT_CONTACT_PAGE_SIZE: i64 = 5;

pub struct ApplicantService {
    pool: PgPool,
}

impl ApplicantService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// All applicants whose stored (normalized) phone equals the given one.
    /// Returns every match so callers can distinguish 0 / 1 / many.
    pub async fn find_by_phone(&self, phone: &str) -> Result<Vec<Applicant>, AppError> {
        let normalized = normalize_phone(phone);
        sqlx::query_as::<_, Applicant>("SELECT * FROM applicants WHERE contacto = $1")
            .bind(normalized)
            .fetch_all(&self.pool)
            .await
            .context("failed to look up applicants by phone")
    }

    /// First applicant with the given document number, if any.
    pub async fn find_by_document(&self, dni: &str) -> Result<Option<Applicant>, AppError> {
        sqlx::query_as::<_, Applicant>("SELECT * FROM applicants WHERE dni = $1 LIMIT 1")
            .bind(dni)
            .fetch_optional(&self.pool)
            .await
            .context("failed to look up applicant by document")
    }

    pub async fn fetch(&self, id: Uuid) -> Result<Option<Applicant>, AppError> {
        sqlx::query_as::<_, Applicant>("SELECT * FROM applicants WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("failed to fetch applicant")
    }

    /// Persists a new applicant from the registration form. The phone must
    /// already be normalized; `images` are the uploaded document URLs.
    ///
    /// Runs on the caller's connection so registration can commit the
    /// applicant and its initial bank account together.
    pub async fn insert(
        &self,
        conn: &mut PgConnection,
        form: &RegistrationForm,
        phone: &str,
        images: &[String],
    ) -> Result<Applicant, AppError> {
        sqlx::query_as::<_, Applicant>(
            "INSERT INTO applicants (\
                id, nombres, apellidos, contacto, dni, provincia_ciudad, estado_civil, \
                trabajo, prestamo_en_linea, prestamos_pendientes, ingreso, nivel_de_prestamo, \
                nombre_banco, clave_banco, tipo_cuenta, numero_de_tarjeta_bancari, \
                fecha_nacimiento, sexo, nivel_educativo, contact_name_amigo, \
                contact_name_familiar, phone_number_amigo, phone_number_familiar, images, \
                created_at\
             ) VALUES (\
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, \
                $17, $18, $19, $20, $21, $22, $23, $24, NOW()\
             ) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(&form.nombres)
        .bind(&form.apellidos)
        .bind(phone)
        .bind(&form.dni)
        .bind(&form.provincia_ciudad)
        .bind(&form.estado_civil)
        .bind(&form.trabajo)
        .bind(&form.prestamo_en_linea)
        .bind(&form.prestamos_pendientes)
        .bind(&form.ingreso)
        .bind(&form.nivel_de_prestamo)
        .bind(&form.nombre_banco)
        .bind(&form.clave_banco)
        .bind(&form.tipo_cuenta)
        .bind(&form.numero_de_tarjeta_bancari)
        .bind(&form.fecha_nacimiento)
        .bind(&form.sexo)
        .bind(&form.nivel_educativo)
        .bind(&form.contact_name_amigo)
        .bind(&form.contact_name_familiar)
        .bind(&form.phone_number_amigo)
        .bind(&form.phone_number_familiar)
        .bind(images)
        .fetch_one(&mut *conn)
        .await
        .context("failed to insert applicant")
    }

    /// Applies an allow-listed partial update: only fields present in the
    /// payload change. Read-modify-write, so concurrent writers can race
    /// (accepted). Fails with `NotFound` when the id doesn't resolve.
    pub async fn apply_update(
        &self,
        id: Uuid,
        update: ApplicantUpdate,
    ) -> Result<Applicant, AppError> {
        let mut applicant = self
            .fetch(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Formulario no encontrado".to_string()))?;

        let ApplicantUpdate {
            apellidos,
            nombres,
            contacto,
            dni,
            provincia_ciudad,
            estado_civil,
            trabajo,
            prestamo_en_linea,
            prestamos_pendientes,
            ingreso,
            nivel_de_prestamo,
            nombre_banco,
            clave_banco,
            tipo_cuenta,
            numero_de_tarjeta_bancari,
            fecha_nacimiento,
            sexo,
            nivel_educativo,
            contact_name_amigo,
            contact_name_familiar,
            phone_number_amigo,
            phone_number_familiar,
        } = update;

        if let Some(v) = apellidos {
            applicant.apellidos = v;
        }
        if let Some(v) = nombres {
            applicant.nombres = v;
        }
        if let Some(v) = contacto {
            applicant.contacto = normalize_phone(&v);
        }
        if let Some(v) = dni {
            applicant.dni = v;
        }
        if let Some(v) = provincia_ciudad {
            applicant.provincia_ciudad = Some(v);
        }
        if let Some(v) = estado_civil {
            applicant.estado_civil = Some(v);
        }
        if let Some(v) = trabajo {
            applicant.trabajo = Some(v);
        }
        if let Some(v) = prestamo_en_linea {
            applicant.prestamo_en_linea = Some(v);
        }
        if let Some(v) = prestamos_pendientes {
            applicant.prestamos_pendientes = Some(v);
        }
        if let Some(v) = ingreso {
            applicant.ingreso = Some(v);
        }
        if let Some(v) = nivel_de_prestamo {
            applicant.nivel_de_prestamo = Some(v);
        }
        if let Some(v) = nombre_banco {
            applicant.nombre_banco = Some(v);
        }
        if let Some(v) = clave_banco {
            applicant.clave_banco = Some(v);
        }
        if let Some(v) = tipo_cuenta {
            applicant.tipo_cuenta = Some(v);
        }
        if let Some(v) = numero_de_tarjeta_bancari {
            applicant.numero_de_tarjeta_bancari = Some(v);
        }
        if let Some(v) = fecha_nacimiento {
            applicant.fecha_nacimiento = Some(v);
        }
        if let Some(v) = sexo {
            applicant.sexo = Some(v);
        }
        if let Some(v) = nivel_educativo {
            applicant.nivel_educativo = Some(v);
        }
        if let Some(v) = contact_name_amigo {
            applicant.contact_name_amigo = Some(v);
        }
        if let Some(v) = contact_name_familiar {
            applicant.contact_name_familiar = Some(v);
        }
        if let Some(v) = phone_number_amigo {
            applicant.phone_number_amigo = Some(v);
        }
        if let Some(v) = phone_number_familiar {
            applicant.phone_number_familiar = Some(v);
        }

        sqlx::query_as::<_, Applicant>(
            "UPDATE applicants SET \
                nombres = $2, apellidos = $3, contacto = $4, dni = $5, \
                provincia_ciudad = $6, estado_civil = $7, trabajo = $8, \
                prestamo_en_linea = $9, prestamos_pendientes = $10, ingreso = $11, \
                nivel_de_prestamo = $12, nombre_banco = $13, clave_banco = $14, \
                tipo_cuenta = $15, numero_de_tarjeta_bancari = $16, fecha_nacimiento = $17, \
                sexo = $18, nivel_educativo = $19, contact_name_amigo = $20, \
                contact_name_familiar = $21, phone_number_amigo = $22, \
                phone_number_familiar = $23, updated_at = NOW() \
             WHERE id = $1 RETURNING *",
        )
        .bind(applicant.id)
        .bind(&applicant.nombres)
        .bind(&applicant.apellidos)
        .bind(&applicant.contacto)
        .bind(&applicant.dni)
        .bind(&applicant.provincia_ciudad)
        .bind(&applicant.estado_civil)
        .bind(&applicant.trabajo)
        .bind(&applicant.prestamo_en_linea)
        .bind(&applicant.prestamos_pendientes)
        .bind(&applicant.ingreso)
        .bind(&applicant.nivel_de_prestamo)
        .bind(&applicant.nombre_banco)
        .bind(&applicant.clave_banco)
        .bind(&applicant.tipo_cuenta)
        .bind(&applicant.numero_de_tarjeta_bancari)
        .bind(&applicant.fecha_nacimiento)
        .bind(&applicant.sexo)
        .bind(&applicant.nivel_educativo)
        .bind(&applicant.contact_name_amigo)
        .bind(&applicant.contact_name_familiar)
        .bind(&applicant.phone_number_amigo)
        .bind(&applicant.phone_number_familiar)
        .fetch_one(&self.pool)
        .await
        .context("failed to update applicant")
    }

    /// Paginated contact list filtered by full name. A single token matches
    /// either first or last name; two tokens match first AND last name.
    /// Matching is case-insensitive contains, with LIKE wildcards escaped.
    pub async fn contact_page(
        &self,
        nombre_completo: Option<&str>,
        page: Option<i64>,
        limit: Option<i64>,
    ) -> Result<ContactPage, AppError> {
        let page = page.unwrap_or(1).max(1);
        let limit = limit.unwrap_or(DEFAULT_CONTACT_PAGE_SIZE).max(1);
        let offset = (page - 1) * limit;

        let tokens: Vec<String> = nombre_completo
            .unwrap_or_default()
            .split_whitespace()
            .map(|t| format!("%{}%", escape_like(t)))
            .collect();

        let (rows, total) = match tokens.as_slice() {
            [] => {
                let rows = sqlx::query_as::<_, (Uuid, String, String, String)>(
                    "SELECT id, nombres, apellidos, contacto FROM applicants \
                     ORDER BY created_at LIMIT $1 OFFSET $2",
                )
                .bind(limit)
                .bind(offset)
                .fetch_all(&self.pool)
                .await?;
                let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM applicants")
                    .fetch_one(&self.pool)
                    .await?;
                (rows, total)
            }
            [single] => {
                let rows = sqlx::query_as::<_, (Uuid, String, String, String)>(
                    "SELECT id, nombres, apellidos, contacto FROM applicants \
                     WHERE nombres ILIKE $1 OR apellidos ILIKE $1 \
                     ORDER BY created_at LIMIT $2 OFFSET $3",
                )
                .bind(single)
                .bind(limit)
                .bind(offset)
                .fetch_all(&self.pool)
                .await?;
                let total = sqlx::query_scalar::<_, i64>(
                    "SELECT COUNT(*) FROM applicants \
                     WHERE nombres ILIKE $1 OR apellidos ILIKE $1",
                )
                .bind(single)
                .fetch_one(&self.pool)
                .await?;
                (rows, total)
            }
            [first, last, ..] => {
                let rows = sqlx::query_as::<_, (Uuid, String, String, String)>(
                    "SELECT id, nombres, apellidos, contacto FROM applicants \
                     WHERE nombres ILIKE $1 AND apellidos ILIKE $2 \
                     ORDER BY created_at LIMIT $3 OFFSET $4",
                )
                .bind(first)
                .bind(last)
                .bind(limit)
                .bind(offset)
                .fetch_all(&self.pool)
                .await?;
                let total = sqlx::query_scalar::<_, i64>(
                    "SELECT COUNT(*) FROM applicants \
                     WHERE nombres ILIKE $1 AND apellidos ILIKE $2",
                )
                .bind(first)
                .bind(last)
                .fetch_one(&self.pool)
                .await?;
                (rows, total)
            }
        };

        let data = rows
            .into_iter()
            .map(|(id, nombres, apellidos, contacto)| ContactSummary {
                id,
                nombre_completo: format!("{} {}", nombres, apellidos),
                contacto,
            })
            .collect();

        Ok(ContactPage {
            data,
            current_page: page,
            total_pages: (total + limit - 1) / limit,
            total_documents: total,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mexican_numbers_normalize_to_e164() {
        assert_eq!(normalize_phone("55 1234 5678"), "+525512345678");
        assert_eq!(normalize_phone("+52 55 1234 5678"), "+525512345678");
        assert_eq!(normalize_phone("+525512345678"), "+525512345678");
    }

    #[test]
    fn unparseable_input_falls_back_to_digits() {
        assert_eq!(normalize_phone("(abc) 12"), "12");
        assert_eq!(normalize_phone("n/a"), "");
    }

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(escape_like("100%_sure"), "100\\%\\_sure");
        assert_eq!(escape_like("plain"), "plain");
        assert_eq!(escape_like("back\\slash"), "back\\\\slash");
    }
}
