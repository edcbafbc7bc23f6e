/// Property-based tests for the eligibility engine and OTP purge sampling
use bigdecimal::BigDecimal;
use loan_intake_api::eligibility::{is_paid, qualify};
use loan_intake_api::models::{LoanProduct, LoanRecord, LoanTier, TierStatus};
use loan_intake_api::otp::{sample_purge_delay, PURGE_DELAY_MAX_MS, PURGE_DELAY_MIN_MS};
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::time::Duration;

fn ladder(nombre: &str, tier_count: usize) -> LoanProduct {
    let niveles = (1..=tier_count as i32)
        .map(|nivel| LoanTier {
            nivel_de_prestamo: nivel,
            valor_prestado_mas_interes: BigDecimal::from(1000 * nivel),
            interes_diario: BigDecimal::from(10 * nivel),
            interes_total: BigDecimal::from(100 * nivel),
            valor_deposito_liquido: BigDecimal::from(900 * nivel),
            valor_extencion: BigDecimal::from(50 * nivel),
            valor_prestamo_menos_interes: BigDecimal::from(800 * nivel),
        })
        .collect();
    LoanProduct {
        nombre: nombre.to_string(),
        icon: None,
        calificacion: None,
        niveles,
    }
}

fn record(nombre: &str, estado: &str) -> LoanRecord {
    LoanRecord {
        nombre_del_producto: nombre.to_string(),
        numero_de_telefono_movil: "+525512345678".to_string(),
        nombre_del_cliente: "Ana Lopez".to_string(),
        estado_de_credito: estado.to_string(),
    }
}

fn status_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("pagado".to_string()),
        Just(" PAGADO ".to_string()),
        Just("pendiente".to_string()),
        Just("vencido".to_string()),
        "[a-zA-Z ]{0,12}",
    ]
}

proptest! {
    #[test]
    fn no_history_offers_every_product_at_level_one(tier_counts in prop::collection::vec(0usize..4, 0..6)) {
        let catalog: Vec<LoanProduct> = tier_counts
            .iter()
            .enumerate()
            .map(|(i, &n)| ladder(&format!("P{}", i), n))
            .collect();

        let offers = qualify(&catalog, &[]);

        prop_assert_eq!(offers.len(), catalog.len());
        for offer in &offers {
            prop_assert_eq!(&offer.estado_de_nivel, &TierStatus::Disponible);
            prop_assert_eq!(offer.nivel_de_prestamo, Some(1));
        }
    }

    #[test]
    fn unpaid_record_always_locks_the_product(
        tier_count in 1usize..4,
        statuses in prop::collection::vec(status_strategy(), 0..5),
        unpaid in prop_oneof![
            Just("pendiente".to_string()),
            Just("vencido".to_string()),
            Just("en mora".to_string()),
        ],
    ) {
        let catalog = vec![ladder("P0", tier_count)];
        let mut history: Vec<LoanRecord> = statuses.iter().map(|s| record("P0", s)).collect();
        history.push(record("P0", &unpaid));

        let offers = qualify(&catalog, &history);

        prop_assert_eq!(offers.len(), 1);
        prop_assert_eq!(&offers[0].estado_de_nivel, &TierStatus::NoDisponible);
        prop_assert_eq!(offers[0].nivel_de_prestamo, Some(1));
    }

    #[test]
    fn paid_only_history_follows_the_ladder(tier_count in 1usize..4, paid in 0usize..6) {
        let catalog = vec![ladder("P0", tier_count)];
        let history: Vec<LoanRecord> = (0..paid).map(|_| record("P0", "pagado")).collect();

        let offers = qualify(&catalog, &history);

        if paid == 0 {
            // empty history takes the entry-tier path
            prop_assert_eq!(&offers[0].estado_de_nivel, &TierStatus::Disponible);
            prop_assert_eq!(offers[0].nivel_de_prestamo, Some(1));
        } else if paid + 1 > tier_count {
            prop_assert_eq!(&offers[0].estado_de_nivel, &TierStatus::Proximamente);
            prop_assert_eq!(offers[0].nivel_de_prestamo, None);
        } else {
            prop_assert_eq!(&offers[0].estado_de_nivel, &TierStatus::Disponible);
            prop_assert_eq!(offers[0].nivel_de_prestamo, Some(paid as i32 + 1));
        }
    }

    #[test]
    fn ceilings_come_from_the_top_tier_with_history(
        tier_count in 1usize..4,
        statuses in prop::collection::vec(status_strategy(), 1..6),
    ) {
        let catalog = vec![ladder("P0", tier_count)];
        let history: Vec<LoanRecord> = statuses.iter().map(|s| record("P0", s)).collect();

        let offers = qualify(&catalog, &history);

        prop_assert_eq!(
            &offers[0].prestamo_maximo,
            &BigDecimal::from(1000 * tier_count as i32)
        );
        prop_assert_eq!(
            &offers[0].interes_diario_maximo,
            &BigDecimal::from(10 * tier_count as i32)
        );
    }

    #[test]
    fn qualify_is_deterministic(
        tier_counts in prop::collection::vec(0usize..4, 1..4),
        statuses in prop::collection::vec(status_strategy(), 0..6),
    ) {
        let catalog: Vec<LoanProduct> = tier_counts
            .iter()
            .enumerate()
            .map(|(i, &n)| ladder(&format!("P{}", i), n))
            .collect();
        let history: Vec<LoanRecord> = statuses
            .iter()
            .enumerate()
            .map(|(i, s)| record(&format!("P{}", i % tier_counts.len()), s))
            .collect();

        prop_assert_eq!(qualify(&catalog, &history), qualify(&catalog, &history));
    }

    #[test]
    fn paid_predicate_matches_normalized_form(raw in "[ ]{0,3}(pagado|PAGADO|Pagado|pendiente|vencido)[ ]{0,3}") {
        prop_assert_eq!(is_paid(&raw), raw.trim().to_lowercase() == "pagado");
    }

    #[test]
    fn purge_delay_always_within_window(seed in any::<u64>()) {
        let mut rng = StdRng::seed_from_u64(seed);
        let d = sample_purge_delay(&mut rng);
        prop_assert!(d >= Duration::from_millis(PURGE_DELAY_MIN_MS));
        prop_assert!(d < Duration::from_millis(PURGE_DELAY_MAX_MS));
    }
}
