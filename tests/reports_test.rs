use anyhow::Result;
use chrono::{NaiveDate, NaiveTime};
use sales_analytics::domain::SaleRecord;
use sales_analytics::reports::{self, catalog, ReportParams, ResultSet, Value};
use sales_analytics::store::SalesStore;

fn sale(id: u32, branch: &str, unit_price: f64, quantity: u32) -> SaleRecord {
    SaleRecord {
        invoice_id: id.to_string(),
        branch: branch.to_string(),
        city: "Austin".to_string(),
        category: "Food and beverages".to_string(),
        unit_price,
        quantity,
        date: NaiveDate::from_ymd_opt(2023, 6, 1).unwrap(),
        time: NaiveTime::from_hms_opt(10, 30, 0).unwrap(),
        payment_method: "Cash".to_string(),
        rating: 7.0,
        profit_margin: Some(0.3),
        total: SaleRecord::compute_total(unit_price, quantity),
    }
}

fn on(mut record: SaleRecord, y: i32, m: u32, d: u32) -> SaleRecord {
    record.date = NaiveDate::from_ymd_opt(y, m, d).unwrap();
    record
}

fn store_with(records: &[SaleRecord]) -> Result<SalesStore> {
    let mut store = SalesStore::open_in_memory()?;
    store.load(records, "test", "fingerprint")?;
    Ok(store)
}

fn run(store: &SalesStore, name: &str) -> Result<ResultSet> {
    Ok(reports::run_named(store, name, &ReportParams::default())?)
}

fn text(rs: &ResultSet, row: usize, col: &str) -> String {
    rs.rows[row][rs.column_index(col).unwrap()]
        .as_str()
        .unwrap()
        .to_string()
}

fn num(rs: &ResultSet, row: usize, col: &str) -> f64 {
    rs.rows[row][rs.column_index(col).unwrap()].as_f64().unwrap()
}

fn mixed_records() -> Vec<SaleRecord> {
    let payments = ["Cash", "Ewallet", "Credit card"];
    let branches = ["WALM001", "WALM002", "WALM003"];
    (0..30)
        .map(|i| {
            let mut r = sale(i + 1, branches[i as usize % 3], 10.0 + i as f64, i % 12);
            r.payment_method = payments[(i as usize * 7) % 3].to_string();
            r.time = NaiveTime::from_hms_opt(9 + (i % 12), 0, 0).unwrap();
            r
        })
        .collect()
}

#[test]
fn test_payment_counts_sum_to_record_count() -> Result<()> {
    let records = mixed_records();
    let store = store_with(&records)?;
    let rs = run(&store, "payment_method_summary")?;
    let sum: i64 = rs.column("no_payments").filter_map(Value::as_i64).sum();
    assert_eq!(sum as usize, records.len());
    Ok(())
}

#[test]
fn test_preferred_payment_view_has_one_row_per_branch() -> Result<()> {
    let store = store_with(&mixed_records())?;
    let rs = run(&store, "preferred_payment_per_branch")?;
    let branches = store.branches()?;
    assert_eq!(rs.len(), branches.len());
    for branch in &branches {
        let hits = rs
            .column("branch")
            .filter(|v| v.as_str() == Some(branch.as_str()))
            .count();
        assert_eq!(hits, 1, "branch {branch}");
        assert!(store.preferred_payment_for(branch)?.is_some());
    }
    assert!(store.preferred_payment_for("WALM999")?.is_none());
    Ok(())
}

#[test]
fn test_basket_buckets_are_disjoint_and_complete() -> Result<()> {
    let store = store_with(&[sale(1, "A", 5.0, 4), sale(2, "A", 5.0, 20)])?;
    let rs = run(&store, "basket_size_buckets")?;
    assert_eq!(rs.len(), 2);
    assert_eq!(text(&rs, 0, "basket_size"), "Small");
    assert_eq!(num(&rs, 0, "total_quantity"), 4.0);
    assert_eq!(text(&rs, 1, "basket_size"), "Large");
    assert_eq!(num(&rs, 1, "total_quantity"), 20.0);
    let total: i64 = rs.column("no_transactions").filter_map(Value::as_i64).sum();
    assert_eq!(total, 2);
    Ok(())
}

#[test]
fn test_basket_bucket_boundaries() -> Result<()> {
    let records: Vec<_> = [0, 4, 5, 9, 10]
        .iter()
        .enumerate()
        .map(|(i, q)| sale(i as u32 + 1, "A", 1.0, *q))
        .collect();
    let store = store_with(&records)?;
    let rs = run(&store, "basket_size_buckets")?;
    let sizes: Vec<String> = (0..rs.len()).map(|i| text(&rs, i, "basket_size")).collect();
    assert_eq!(sizes, vec!["Small", "Medium", "Large"]);
    let counts: Vec<i64> = rs.column("no_transactions").filter_map(Value::as_i64).collect();
    assert_eq!(counts, vec![2, 2, 1]);
    Ok(())
}

#[test]
fn test_revenue_decrease_only_reports_drops() -> Result<()> {
    let store = store_with(&[
        // A: 100 -> 50
        on(sale(1, "A", 100.0, 1), 2022, 3, 1),
        on(sale(2, "A", 50.0, 1), 2023, 3, 1),
        // B: 30 -> 40, an increase
        on(sale(3, "B", 30.0, 1), 2022, 3, 1),
        on(sale(4, "B", 40.0, 1), 2023, 3, 1),
        // C: only in the current year
        on(sale(5, "C", 10.0, 1), 2023, 3, 1),
        // D: 300 -> 200
        on(sale(6, "D", 100.0, 3), 2022, 3, 1),
        on(sale(7, "D", 100.0, 2), 2023, 3, 1),
    ])?;
    let rs = run(&store, "revenue_decrease_by_branch")?;
    assert_eq!(rs.len(), 2);
    assert_eq!(text(&rs, 0, "branch"), "A");
    assert_eq!(num(&rs, 0, "rev_dec_ratio"), 50.0);
    assert_eq!(text(&rs, 1, "branch"), "D");
    assert!((num(&rs, 1, "rev_dec_ratio") - 33.33).abs() < 1e-9);
    for i in 0..rs.len() {
        assert!(num(&rs, i, "last_year_revenue") > num(&rs, i, "current_year_revenue"));
    }
    Ok(())
}

#[test]
fn test_revenue_decrease_handles_zero_previous_revenue() -> Result<()> {
    let store = store_with(&[
        on(sale(1, "A", 10.0, 0), 2022, 3, 1),
        on(sale(2, "A", 10.0, 0), 2023, 3, 1),
    ])?;
    let rs = run(&store, "revenue_decrease_by_branch")?;
    assert!(rs.is_empty());
    Ok(())
}

#[test]
fn test_revenue_decrease_respects_years_and_limit() -> Result<()> {
    let mut records = Vec::new();
    for (i, branch) in ["A", "B", "C"].iter().enumerate() {
        let id = i as u32 * 2;
        records.push(on(sale(id + 1, branch, 100.0, 1), 2019, 1, 1));
        records.push(on(sale(id + 2, branch, 10.0 * (i as f64 + 1.0), 1), 2020, 1, 1));
    }
    let store = store_with(&records)?;
    let params = ReportParams {
        previous_year: 2019,
        current_year: 2020,
        limit: 2,
        ..ReportParams::default()
    };
    let rs = reports::run_named(&store, "revenue_decrease_by_branch", &params)?;
    assert_eq!(rs.len(), 2);
    assert_eq!(text(&rs, 0, "branch"), "A");
    assert_eq!(num(&rs, 0, "rev_dec_ratio"), 90.0);
    assert_eq!(text(&rs, 1, "branch"), "B");
    Ok(())
}

#[test]
fn test_top_categories_keeps_k_per_city() -> Result<()> {
    let categories = ["Fashion", "Food", "Health", "Sports"];
    let records: Vec<_> = categories
        .iter()
        .enumerate()
        .map(|(i, c)| {
            let mut r = sale(i as u32 + 1, "A", 10.0 * (i as f64 + 1.0), 1);
            r.category = c.to_string();
            r
        })
        .collect();
    let store = store_with(&records)?;
    let rs = run(&store, "top_categories_per_city")?;
    assert_eq!(rs.len(), 3);
    let names: Vec<String> = (0..3).map(|i| text(&rs, i, "category")).collect();
    assert_eq!(names, vec!["Sports", "Health", "Food"]);
    let ranks: Vec<i64> = rs.column("revenue_rank").filter_map(Value::as_i64).collect();
    assert_eq!(ranks, vec![1, 2, 3]);
    Ok(())
}

#[test]
fn test_highest_rated_category_lists_ties() -> Result<()> {
    let mut a = sale(1, "A", 1.0, 1);
    a.category = "Food".to_string();
    a.rating = 9.0;
    let mut b = sale(2, "A", 1.0, 1);
    b.category = "Sports".to_string();
    b.rating = 9.0;
    let mut c = sale(3, "A", 1.0, 1);
    c.category = "Health".to_string();
    c.rating = 4.0;
    let store = store_with(&[a, b, c])?;
    let rs = run(&store, "highest_rated_category_per_branch")?;
    assert_eq!(rs.len(), 2);
    assert_eq!(text(&rs, 0, "category"), "Food");
    assert_eq!(text(&rs, 1, "category"), "Sports");
    Ok(())
}

#[test]
fn test_profit_treats_missing_margin_as_zero() -> Result<()> {
    let mut with_margin = sale(1, "A", 10.0, 2);
    with_margin.profit_margin = Some(0.5);
    let mut without = sale(2, "A", 10.0, 3);
    without.profit_margin = None;
    let store = store_with(&[with_margin, without])?;
    let rs = run(&store, "profit_by_category")?;
    assert_eq!(rs.len(), 1);
    assert_eq!(num(&rs, 0, "total_revenue"), 50.0);
    assert_eq!(num(&rs, 0, "total_profit"), 10.0);
    Ok(())
}

#[test]
fn test_shift_boundaries_in_sql() -> Result<()> {
    let times = [(11, 59), (12, 0), (17, 59), (18, 0)];
    let records: Vec<_> = times
        .iter()
        .enumerate()
        .map(|(i, (h, m))| {
            let mut r = sale(i as u32 + 1, "A", 1.0, 1);
            r.time = NaiveTime::from_hms_opt(*h, *m, 0).unwrap();
            r
        })
        .collect();
    let store = store_with(&records)?;
    let rs = run(&store, "shift_invoices_per_branch")?;
    let shifts: Vec<String> = (0..rs.len()).map(|i| text(&rs, i, "shift")).collect();
    assert_eq!(shifts, vec!["Morning", "Afternoon", "Evening"]);
    let counts: Vec<i64> = rs.column("no_invoices").filter_map(Value::as_i64).collect();
    assert_eq!(counts, vec![1, 2, 1]);
    Ok(())
}

#[test]
fn test_busiest_day_uses_weekday_names() -> Result<()> {
    // 2023-06-05 is a Monday, 2023-06-06 a Tuesday
    let store = store_with(&[
        on(sale(1, "A", 1.0, 1), 2023, 6, 5),
        on(sale(2, "A", 1.0, 1), 2023, 6, 5),
        on(sale(3, "A", 1.0, 1), 2023, 6, 6),
    ])?;
    let rs = run(&store, "busiest_day_per_branch")?;
    assert_eq!(rs.len(), 1);
    assert_eq!(text(&rs, 0, "day_name"), "Monday");
    assert_eq!(num(&rs, 0, "no_transactions"), 2.0);
    Ok(())
}

#[test]
fn test_shares_sum_to_one_hundred() -> Result<()> {
    let store = store_with(&mixed_records())?;
    let rs = run(&store, "payment_share_by_city")?;
    let total: f64 = rs.column("share_pct").filter_map(Value::as_f64).sum();
    assert!((total - 100.0).abs() < 0.05, "got {total}");

    let rs = run(&store, "category_revenue_share")?;
    let total: f64 = rs.column("share_pct").filter_map(Value::as_f64).sum();
    assert!((total - 100.0).abs() < 0.05, "got {total}");
    Ok(())
}

#[test]
fn test_every_query_honours_its_column_contract() -> Result<()> {
    let store = store_with(&mixed_records())?;
    for def in catalog() {
        let rs = reports::run_query(&store, def, &ReportParams::default())?;
        assert_eq!(rs.columns, def.columns, "columns of {}", def.name);
        for row in &rs.rows {
            assert_eq!(row.len(), def.columns.len());
        }
    }
    Ok(())
}
