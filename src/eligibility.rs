//! Eligibility engine: computes, per loan product, which tier an applicant
//! currently qualifies for based on their repayment history.
//!
//! The ladder is simple: one fully repaid loan per product graduates the
//! applicant one tier on that product; any unpaid loan on a product locks it
//! at the entry tier until resolved. Three display states exist per product:
//! "Disponible", "No disponible" and "Próximamente" (ladder exhausted).

use crate::errors::{AppError, ResultExt};
use crate::models::{
    Applicant, LoanProduct, LoanRecord, LoanTier, ProductEligibility, ProductRow,
    RegistrationForm, TierRow, TierStatus,
};
use moka::future::Cache;
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::Arc;

/// Cache key for the (single) product catalog entry.
const CATALOG_KEY: &str = "catalog";

/// Identity triple used to match loan history.
#[derive(Debug, Clone)]
pub struct ApplicantIdentity {
    pub phone: String,
    pub document: String,
    /// "nombres apellidos", matched case-sensitively against history rows.
    pub full_name: String,
}

impl ApplicantIdentity {
    pub fn of(applicant: &Applicant) -> Self {
        Self {
            phone: applicant.contacto.clone(),
            document: applicant.dni.clone(),
            full_name: applicant.full_name(),
        }
    }

    pub fn of_form(form: &RegistrationForm, phone: &str) -> Self {
        Self {
            phone: phone.to_string(),
            document: form.dni.clone(),
            full_name: format!("{} {}", form.nombres, form.apellidos),
        }
    }

    fn is_complete(&self) -> bool {
        !self.phone.trim().is_empty()
            && !self.document.trim().is_empty()
            && !self.full_name.trim().is_empty()
    }
}

/// Whether a loan-record status counts as fully repaid.
pub fn is_paid(status: &str) -> bool {
    status.trim().to_lowercase() == "pagado"
}

/// Computes eligibility for every catalog product, preserving catalog order.
///
/// With no history every product is offered at the entry tier. With history,
/// products without tiers are dropped and the remaining ones are resolved
/// against the applicant's paid/unpaid counts per product.
pub fn qualify(products: &[LoanProduct], records: &[LoanRecord]) -> Vec<ProductEligibility> {
    if records.is_empty() {
        return products.iter().map(entry_tier_offer).collect();
    }
    products
        .iter()
        .filter_map(|product| ladder_offer(product, records))
        .collect()
}

/// First-time offer: tier-1 terms across the board, zeros where tier 1 is
/// not defined. Products without tiers are still listed.
fn entry_tier_offer(product: &LoanProduct) -> ProductEligibility {
    let tier1 = product
        .niveles
        .iter()
        .find(|t| t.nivel_de_prestamo == 1)
        .cloned()
        .unwrap_or_default();

    ProductEligibility {
        nombre: product.nombre.clone(),
        icon: product.icon.clone(),
        calificacion: product.calificacion,
        prestamo_maximo: tier1.valor_prestado_mas_interes.clone(),
        interes_diario_maximo: tier1.interes_diario.clone(),
        interes_diario: tier1.interes_diario.clone(),
        interes_total: tier1.interes_total,
        valor_deposito_liquido: tier1.valor_deposito_liquido,
        valor_extencion: tier1.valor_extencion,
        valor_prestado: tier1.valor_prestado_mas_interes,
        valor_prestamo_menos_interes: tier1.valor_prestamo_menos_interes,
        estado_de_nivel: TierStatus::Disponible,
        nivel_de_prestamo: Some(1),
    }
}

/// Resolves one product against the applicant's history. Returns None for
/// products with no defined tiers.
fn ladder_offer(product: &LoanProduct, records: &[LoanRecord]) -> Option<ProductEligibility> {
    let mut tiers: Vec<&LoanTier> = product.niveles.iter().collect();
    tiers.sort_by_key(|t| t.nivel_de_prestamo);
    let top = *tiers.last()?;

    let on_product: Vec<&LoanRecord> = records
        .iter()
        .filter(|r| r.nombre_del_producto == product.nombre)
        .collect();
    let has_unpaid = on_product.iter().any(|r| !is_paid(&r.estado_de_credito));
    let paid_count = on_product
        .iter()
        .filter(|r| is_paid(&r.estado_de_credito))
        .count() as i32;

    let next_level = paid_count + 1;
    let max_level = top.nivel_de_prestamo;

    // Terms at the level the applicant would borrow at next; zeros when that
    // tier is not defined (unavailable / ladder exhausted).
    let current = tiers
        .iter()
        .find(|t| t.nivel_de_prestamo == next_level)
        .map(|t| (*t).clone())
        .unwrap_or_default();

    let (estado_de_nivel, nivel_de_prestamo) = if has_unpaid {
        (TierStatus::NoDisponible, Some(1))
    } else if next_level > max_level {
        (TierStatus::Proximamente, None)
    } else {
        (TierStatus::Disponible, Some(next_level))
    };

    Some(ProductEligibility {
        nombre: product.nombre.clone(),
        icon: product.icon.clone(),
        calificacion: product.calificacion,
        prestamo_maximo: top.valor_prestado_mas_interes.clone(),
        interes_diario_maximo: top.interes_diario.clone(),
        interes_diario: current.interes_diario,
        interes_total: current.interes_total,
        valor_deposito_liquido: current.valor_deposito_liquido,
        valor_extencion: current.valor_extencion,
        valor_prestado: current.valor_prestado_mas_interes,
        valor_prestamo_menos_interes: current.valor_prestamo_menos_interes,
        estado_de_nivel,
        nivel_de_prestamo,
    })
}

/// DB-backed engine: fetches the applicant's loan history and the (cached)
/// product catalog and delegates to [`qualify`].
pub struct EligibilityService {
    pool: PgPool,
    catalog_cache: Cache<String, Arc<Vec<LoanProduct>>>,
}

impl EligibilityService {
    pub fn new(pool: PgPool, catalog_cache: Cache<String, Arc<Vec<LoanProduct>>>) -> Self {
        Self {
            pool,
            catalog_cache,
        }
    }

    /// Computes current product eligibility for the given identity.
    pub async fn for_applicant(
        &self,
        identity: &ApplicantIdentity,
    ) -> Result<Vec<ProductEligibility>, AppError> {
        if !identity.is_complete() {
            return Err(AppError::BadRequest(
                "Todos los campos (numeroDeTelefono, dni, nombreDelCliente) son obligatorios."
                    .to_string(),
            ));
        }

        let records = self
            .loan_history(&identity.phone, &identity.full_name)
            .await?;
        let products = self.catalog().await?;

        tracing::debug!(
            "Eligibility for {}: {} history rows, {} products",
            identity.full_name,
            records.len(),
            products.len()
        );

        Ok(qualify(&products, &records))
    }

    /// Loan records matching phone and full name exactly (case-sensitive).
    async fn loan_history(
        &self,
        phone: &str,
        full_name: &str,
    ) -> Result<Vec<LoanRecord>, AppError> {
        sqlx::query_as::<_, LoanRecord>(
            "SELECT nombre_del_producto, numero_de_telefono_movil, nombre_del_cliente, \
             estado_de_credito \
             FROM loan_records \
             WHERE numero_de_telefono_movil = $1 AND nombre_del_cliente = $2",
        )
        .bind(phone)
        .bind(full_name)
        .fetch_all(&self.pool)
        .await
        .context("failed to load loan history")
    }

    /// Full product catalog in insertion order, served from the moka cache
    /// when fresh.
    async fn catalog(&self) -> Result<Arc<Vec<LoanProduct>>, AppError> {
        if let Some(cached) = self.catalog_cache.get(CATALOG_KEY).await {
            tracing::debug!("Product catalog cache HIT");
            return Ok(cached);
        }

        let product_rows = sqlx::query_as::<_, ProductRow>(
            "SELECT id, nombre, icon, calificacion FROM loan_products ORDER BY created_at, id",
        )
        .fetch_all(&self.pool)
        .await
        .context("failed to load loan products")?;

        let tier_rows = sqlx::query_as::<_, TierRow>(
            "SELECT product_id, nivel, valor_prestado_mas_interes, interes_diario, \
             interes_total, valor_deposito_liquido, valor_extencion, \
             valor_prestamo_menos_interes \
             FROM loan_tiers ORDER BY nivel",
        )
        .fetch_all(&self.pool)
        .await
        .context("failed to load loan tiers")?;

        let mut tiers_by_product: HashMap<uuid::Uuid, Vec<LoanTier>> = HashMap::new();
        for row in tier_rows {
            tiers_by_product
                .entry(row.product_id)
                .or_default()
                .push(LoanTier {
                    nivel_de_prestamo: row.nivel,
                    valor_prestado_mas_interes: row.valor_prestado_mas_interes,
                    interes_diario: row.interes_diario,
                    interes_total: row.interes_total,
                    valor_deposito_liquido: row.valor_deposito_liquido,
                    valor_extencion: row.valor_extencion,
                    valor_prestamo_menos_interes: row.valor_prestamo_menos_interes,
                });
        }

        let products: Vec<LoanProduct> = product_rows
            .into_iter()
            .map(|row| LoanProduct {
                nombre: row.nombre,
                icon: row.icon,
                calificacion: row.calificacion,
                niveles: tiers_by_product.remove(&row.id).unwrap_or_default(),
            })
            .collect();

        tracing::info!("Product catalog cache MISS - loaded {} products", products.len());
        let products = Arc::new(products);
        self.catalog_cache
            .insert(CATALOG_KEY.to_string(), products.clone())
            .await;
        Ok(products)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paid_status_is_trimmed_and_case_insensitive() {
        assert!(is_paid("pagado"));
        assert!(is_paid("  PAGADO  "));
        assert!(is_paid("Pagado"));
        assert!(!is_paid("pendiente"));
        assert!(!is_paid("pagado parcialmente"));
        assert!(!is_paid(""));
    }
}
