//! End-to-end tests over the reconciliation pipeline: raw sheet in,
//! priced and formatted report out, with the price chain mocked.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use etfwatch_core::{
    find_header_row, infer_mapping, normalize_table, Action, PriceSource, RawTable,
    ReconcileConfig, ReconcileService,
};

/// Scripted per-ticker prices; unknown tickers resolve to 0.
struct PriceBook(Vec<(&'static str, f64)>);

#[async_trait]
impl PriceSource for PriceBook {
    async fn price(&self, ticker: &str, _date: NaiveDate) -> f64 {
        self.0
            .iter()
            .find(|(t, _)| *t == ticker)
            .map(|(_, p)| *p)
            .unwrap_or(0.0)
    }
}

fn sheet(rows: &[&[&str]]) -> RawTable {
    RawTable::new(
        rows.iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect(),
    )
}

fn load(table: &RawTable) -> Vec<etfwatch_core::CanonicalHolding> {
    let header_index = find_header_row(table).unwrap();
    let mapping = infer_mapping(table.row(header_index).unwrap()).unwrap();
    normalize_table(table, header_index, &mapping)
}

#[tokio::test]
async fn messy_sheets_reconcile_into_a_priced_report() {
    // Old snapshot: clean layout, English labels.
    let old = sheet(&[
        &["Fund 0050 holdings"],
        &["Symbol", "Name", "Shares"],
        &["2330", "TSMC", "10,000"],
        &["2317", "Hon Hai", "8,000"],
    ]);
    // New snapshot: Chinese labels, float-artifact tickers, a weight
    // column that must not be mistaken for shares, extra title rows.
    let new = sheet(&[
        &["基金持股明細"],
        &[""],
        &["股票代號", "股票名稱", "持股權重(%)", "股數"],
        &["2330.0", "台積電", "55.3", "15000"],
        &["2454.0", "聯發科", "4.1", "2,000"],
        &["2317.0", "鴻海", "0.1", "500"],
        &["", "小計", "", "999"],
    ]);

    let prices = PriceBook(vec![("2330", 100.0), ("2454", 1200.0), ("2317", 150.0)]);
    let service = ReconcileService::new(Arc::new(prices), ReconcileConfig::default());
    let date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();

    let report = service
        .reconcile_holdings(&load(&old), &load(&new), date)
        .await;

    // Changes sorted by ticker: 2317 trimmed below the floor, 2330
    // increased, 2454 entered.
    let actions: Vec<(&str, Action)> = report
        .changes
        .iter()
        .map(|r| (r.ticker.as_str(), r.action))
        .collect();
    assert_eq!(
        actions,
        vec![
            ("2317", Action::Removed),
            ("2330", Action::Changed),
            ("2454", Action::Added),
        ]
    );

    let tsmc = &report.changes[1];
    assert_eq!(tsmc.name, "台積電");
    assert_eq!(tsmc.delta_shares, 5_000);
    assert_eq!(tsmc.monetary_value, 500_000.0);
    assert_eq!(tsmc.monetary_value_str, "50萬");

    let mediatek = &report.changes[2];
    assert_eq!(mediatek.monetary_value, 2_400_000.0);
    assert_eq!(mediatek.monetary_value_str, "240萬");

    // Holdings: only positions above the floor, valued at the full
    // position.
    let held: Vec<&str> = report.holdings.iter().map(|r| r.ticker.as_str()).collect();
    assert_eq!(held, vec!["2330", "2454"]);
    assert!(report.holdings.iter().all(|r| r.action == Action::Holding));
    assert_eq!(report.holdings[0].monetary_value, 1_500_000.0);
    assert_eq!(report.holdings[0].monetary_value_str, "150萬");
}

#[tokio::test]
async fn unpriceable_ticker_still_appears_with_zero_value() {
    let old = sheet(&[&["Symbol", "Name", "Shares"]]);
    let new = sheet(&[
        &["Symbol", "Name", "Shares"],
        &["9999", "Delisted Co", "5000"],
    ]);

    let service = ReconcileService::new(
        Arc::new(PriceBook(vec![])),
        ReconcileConfig::default(),
    );
    let date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();

    let report = service
        .reconcile_holdings(&load(&old), &load(&new), date)
        .await;

    assert_eq!(report.changes.len(), 1);
    assert_eq!(report.changes[0].action, Action::Added);
    assert_eq!(report.changes[0].price, 0.0);
    assert_eq!(report.changes[0].monetary_value, 0.0);
    assert_eq!(report.changes[0].monetary_value_str, "0");
}
