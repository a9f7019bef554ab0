use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{Duration, NaiveDate};
use clap::Parser;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

/// Generate a synthetic raw sales CSV with the usual defects
/// (currency strings, duplicates, blanks, malformed values).
#[derive(Parser)]
#[command(name = "generate-sample")]
struct Args {
    #[arg(long)]
    output: PathBuf,
    #[arg(long, default_value_t = 1000)]
    rows: usize,
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

const BRANCHES: [(&str, &str); 6] = [
    ("WALM001", "San Antonio"),
    ("WALM002", "Harlingen"),
    ("WALM003", "San Antonio"),
    ("WALM004", "Austin"),
    ("WALM005", "Dallas"),
    ("WALM006", "Houston"),
];

const CATEGORIES: [&str; 6] = [
    "Health and beauty",
    "Electronic accessories",
    "Home and lifestyle",
    "Sports and travel",
    "Food and beverages",
    "Fashion accessories",
];

const PAYMENTS: [&str; 3] = ["Ewallet", "Cash", "Credit card"];

fn main() -> Result<()> {
    let args = Args::parse();
    let mut rng = StdRng::seed_from_u64(args.seed);
    let start = NaiveDate::from_ymd_opt(2019, 1, 1).context("valid start date")?;
    let span_days = (NaiveDate::from_ymd_opt(2023, 12, 31).context("valid end date")? - start).num_days();

    if let Some(parent) = args.output.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let mut wtr = csv::Writer::from_path(&args.output)
        .with_context(|| format!("creating {}", args.output.display()))?;
    wtr.write_record([
        "invoice_id",
        "Branch",
        "City",
        "category",
        "unit_price",
        "quantity",
        "date",
        "time",
        "payment_method",
        "rating",
        "profit_margin",
    ])?;

    let mut previous: Option<Vec<String>> = None;
    for i in 1..=args.rows {
        // Re-emit the previous row now and then to create exact duplicates
        if let Some(prev) = previous.as_ref().filter(|_| rng.gen_bool(0.02)) {
            wtr.write_record(prev)?;
            continue;
        }

        let (branch, city) = BRANCHES.choose(&mut rng).copied().unwrap_or(BRANCHES[0]);
        let category = CATEGORIES.choose(&mut rng).copied().unwrap_or(CATEGORIES[0]);
        let payment = PAYMENTS.choose(&mut rng).copied().unwrap_or(PAYMENTS[0]);
        let date = start + Duration::days(rng.gen_range(0..=span_days));
        let price: f64 = rng.gen_range(10.0..100.0);
        let mut row = vec![
            i.to_string(),
            branch.to_string(),
            city.to_string(),
            category.to_string(),
            format!("${price:.2}"),
            rng.gen_range(1..=10).to_string(),
            date.format("%d/%m/%y").to_string(),
            format!("{:02}:{:02}:00", rng.gen_range(10..21), rng.gen_range(0..60)),
            payment.to_string(),
            format!("{:.1}", rng.gen_range(3.0..10.0)),
            format!("{:.2}", rng.gen_range(0.18..0.57)),
        ];

        if rng.gen_bool(0.02) {
            let blank = rng.gen_range(0..row.len());
            row[blank].clear();
        }
        if rng.gen_bool(0.01) {
            row[4] = format!("USD {price:.2}");
        }

        wtr.write_record(&row)?;
        previous = Some(row);
    }
    wtr.flush()?;
    println!("Wrote {} rows to {}", args.rows, args.output.display());
    Ok(())
}
