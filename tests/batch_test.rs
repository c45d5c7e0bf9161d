//! Batch verification over the scripted portal

mod common;

use common::{AttemptScript, MockPortal, PortalAnswer, reinfo_empty_table, reinfo_table, sunat_page};
use std::time::Duration;
use tokio::time::Instant;
use veta_scrape::config::LookupConfig;
use veta_scrape::lookup::JitterRange;
use veta_scrape::{BatchEntry, BatchRunner, RecpoIndex, ReinfoOutcome};

const MINER: &str = "20606564016";
const SHOP: &str = "20100000001";

fn mining_answer() -> PortalAnswer {
    PortalAnswer {
        reinfo_table: Some(reinfo_table(&["750012345"])),
        sunat_page: sunat_page(&["Principal - 0729 - EXTRACCIÓN DE OTROS MINERALES METALÍFEROS NO FERROSOS"]),
    }
}

fn shop_answer() -> PortalAnswer {
    PortalAnswer {
        reinfo_table: Some(reinfo_empty_table()),
        sunat_page: sunat_page(&["Principal - 4711 - VENTA AL POR MENOR EN COMERCIOS NO ESPECIALIZADOS"]),
    }
}

fn answering_portal() -> MockPortal {
    MockPortal::new()
        .fallback(AttemptScript::Answer)
        .answer(MINER, mining_answer())
        .answer(SHOP, shop_answer())
}

fn quiet_config() -> LookupConfig {
    LookupConfig::builder()
        .without_pauses()
        .build()
        .expect("valid config")
}

#[tokio::test(start_paused = true)]
async fn test_repeated_identifiers_keep_their_rows() {
    let portal = answering_portal();
    let runner = BatchRunner::new(portal.clone(), &quiet_config());
    let entries = vec![
        BatchEntry::new(MINER).with_name("Minera Los Andes"),
        BatchEntry::new(SHOP),
        BatchEntry::new("20606564016.0").with_name("Minera Los Andes (sede)"),
        BatchEntry::new(SHOP),
    ];
    let recpo = RecpoIndex::from_entries([(MINER, "REC-0042")]);

    let report = runner.run(&entries, &recpo).await;

    let rucs: Vec<&str> = report.rows.iter().map(|row| row.ruc.as_str()).collect();
    assert_eq!(rucs, vec![MINER, SHOP, MINER, SHOP]);
    assert_eq!(report.rows[0].name.as_deref(), Some("Minera Los Andes"));
    assert_eq!(report.rows[2].name.as_deref(), Some("Minera Los Andes (sede)"));
    assert_eq!(report.rows[2].unique_code, report.rows[0].unique_code);
    assert_eq!(report.rows[2].recpo, "REC-0042");

    // one SUNAT and one REINFO lookup per distinct RUC
    assert_eq!(portal.filled(), vec![MINER, SHOP, MINER, SHOP]);

    let flagged: Vec<&str> = report.flagged().iter().map(|row| row.ruc.as_str()).collect();
    assert_eq!(flagged, vec![SHOP]);
}

#[tokio::test(start_paused = true)]
async fn test_clean_mining_row_is_not_flagged() {
    let runner = BatchRunner::new(answering_portal(), &quiet_config());
    let recpo = RecpoIndex::from_entries([(MINER, "REC-0042")]);

    let report = runner.run(&[BatchEntry::new(MINER)], &recpo).await;

    let row = &report.rows[0];
    assert_eq!(row.alert, "Normal");
    assert_eq!(row.unique_code, "750012345");
    assert_eq!(row.recpo, "REC-0042");
    assert!(!row.is_flagged(), "{:?}", row.flags);
    assert!(report.flagged().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_shop_row_raises_flags() {
    let runner = BatchRunner::new(answering_portal(), &quiet_config());

    let report = runner
        .run(&[BatchEntry::new(MINER), BatchEntry::new(SHOP)], &RecpoIndex::empty())
        .await;

    let flagged = report.flagged();
    assert_eq!(flagged.len(), 2);

    let shop = flagged.iter().find(|row| row.ruc == SHOP).expect("shop row");
    assert!(shop.flags.non_mining_activity);
    assert!(shop.flags.missing_reinfo);
    assert!(shop.flags.missing_recpo);
    assert!(!shop.flags.scrape_error);
    assert_eq!(shop.unique_code, "No tiene REINFO");
    assert_eq!(shop.recpo, "⚠️ No tiene RECPO");

    let json = serde_json::to_value(shop).expect("json");
    assert_eq!(json["uniqueCode"], "No tiene REINFO");
    assert_eq!(json["flags"]["missingRecpo"], true);
}

#[tokio::test(start_paused = true)]
async fn test_pause_only_between_identifiers() {
    let config = LookupConfig::builder()
        .without_pauses()
        .inter_record_delay(JitterRange::new(1.0, 1.0))
        .build()
        .expect("valid config");
    let runner = BatchRunner::new(
        answering_portal().answer("20999999999", mining_answer()),
        &config,
    );
    let entries = [
        BatchEntry::new(MINER),
        BatchEntry::new(SHOP),
        BatchEntry::new("20999999999"),
    ];

    let started = Instant::now();
    runner.run(&entries, &RecpoIndex::empty()).await;

    // two gaps in each of the two passes
    assert_eq!(started.elapsed(), Duration::from_secs(4));
}

#[tokio::test(start_paused = true)]
async fn test_record_deadline_yields_sentinels() {
    let portal = MockPortal::new().fallback(AttemptScript::NavigationHangs);
    let config = LookupConfig::builder()
        .without_pauses()
        .record_deadline(Some(Duration::from_secs(30)))
        .build()
        .expect("valid config");
    let runner = BatchRunner::new(portal.clone(), &config);

    let report = runner.run(&[BatchEntry::new(MINER)], &RecpoIndex::empty()).await;

    let row = &report.rows[0];
    assert_eq!(row.economic_activity, "Error");
    assert_eq!(row.alert, "❌ No se pudo consultar tras 3 intentos");
    // the probe hangs too, so REINFO gives up before its deadline
    assert_eq!(row.unique_code, "Sitio no disponible");
    assert!(row.flags.scrape_error);
    assert!(portal.all_pages_released());
    assert!(portal.all_scopes_released());
}

#[tokio::test(start_paused = true)]
async fn test_reinfo_deadline_yields_timeout_error() {
    let portal = MockPortal::reinfo().fallback(AttemptScript::NavigationHangs);
    let config = LookupConfig::builder()
        .without_pauses()
        .record_deadline(Some(Duration::from_secs(60)))
        .build()
        .expect("valid config");
    let runner = BatchRunner::new(portal.clone(), &config);

    let started = Instant::now();
    let outcome = runner.reinfo_outcome(MINER).await;

    assert_eq!(outcome, ReinfoOutcome::TimedOut);
    assert_eq!(started.elapsed(), Duration::from_secs(60));
    assert!(portal.all_pages_released());
    assert!(portal.all_scopes_released());
}
