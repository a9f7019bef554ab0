//! The fixed catalog of read-only report queries.
//!
//! Every statement reads the `sales` table (or the preferred-payment view)
//! and binds only the named parameters it mentions: `:previous_year`,
//! `:current_year`, `:top_k`, `:limit`.

use once_cell::sync::Lazy;

use crate::constants::{
    AFTERNOON_START_HOUR, EVENING_START_HOUR, HIGH_RATING_MIN, LARGE_BASKET_MIN_QTY,
    MEDIUM_BASKET_MIN_QTY, MEDIUM_RATING_MIN,
};

/// A catalog entry: a named query and its output column contract
#[derive(Debug, Clone)]
pub struct QueryDef {
    pub name: &'static str,
    pub description: &'static str,
    pub columns: &'static [&'static str],
    pub sql: String,
}

fn shift_label() -> String {
    format!(
        "CASE WHEN CAST(strftime('%H', time) AS INTEGER) < {AFTERNOON_START_HOUR} THEN 'Morning' \
         WHEN CAST(strftime('%H', time) AS INTEGER) < {EVENING_START_HOUR} THEN 'Afternoon' \
         ELSE 'Evening' END"
    )
}

fn shift_order() -> String {
    format!(
        "CASE WHEN CAST(strftime('%H', time) AS INTEGER) < {AFTERNOON_START_HOUR} THEN 0 \
         WHEN CAST(strftime('%H', time) AS INTEGER) < {EVENING_START_HOUR} THEN 1 \
         ELSE 2 END"
    )
}

fn basket_label() -> String {
    format!(
        "CASE WHEN quantity < {MEDIUM_BASKET_MIN_QTY} THEN 'Small' \
         WHEN quantity < {LARGE_BASKET_MIN_QTY} THEN 'Medium' \
         ELSE 'Large' END"
    )
}

fn basket_order() -> String {
    format!(
        "CASE WHEN quantity < {MEDIUM_BASKET_MIN_QTY} THEN 0 \
         WHEN quantity < {LARGE_BASKET_MIN_QTY} THEN 1 \
         ELSE 2 END"
    )
}

fn rating_label() -> String {
    format!(
        "CASE WHEN rating < {MEDIUM_RATING_MIN:.1} THEN 'Low' \
         WHEN rating < {HIGH_RATING_MIN:.1} THEN 'Medium' \
         ELSE 'High' END"
    )
}

fn rating_order() -> String {
    format!(
        "CASE WHEN rating < {MEDIUM_RATING_MIN:.1} THEN 0 \
         WHEN rating < {HIGH_RATING_MIN:.1} THEN 1 \
         ELSE 2 END"
    )
}

const DAY_NAME: &str = "CASE strftime('%w', date) \
    WHEN '0' THEN 'Sunday' WHEN '1' THEN 'Monday' WHEN '2' THEN 'Tuesday' \
    WHEN '3' THEN 'Wednesday' WHEN '4' THEN 'Thursday' WHEN '5' THEN 'Friday' \
    ELSE 'Saturday' END";

// Monday first
const DAY_ORDER: &str = "(CAST(strftime('%w', date) AS INTEGER) + 6) % 7";

const YEAR: &str = "CAST(strftime('%Y', date) AS INTEGER)";

fn build_catalog() -> Vec<QueryDef> {
    vec![
        QueryDef {
            name: "payment_method_summary",
            description: "Transactions and quantity sold per payment method",
            columns: &["payment_method", "no_payments", "no_qty_sold"],
            sql: "SELECT payment_method, COUNT(*) AS no_payments, SUM(quantity) AS no_qty_sold
                  FROM sales
                  GROUP BY payment_method
                  ORDER BY no_payments DESC, payment_method"
                .to_string(),
        },
        QueryDef {
            name: "highest_rated_category_per_branch",
            description: "Category with the highest average rating in each branch (ties all listed)",
            columns: &["branch", "category", "avg_rating"],
            sql: "WITH ranked AS (
                      SELECT branch, category, AVG(rating) AS avg_rating,
                             RANK() OVER (PARTITION BY branch ORDER BY AVG(rating) DESC) AS rnk
                      FROM sales
                      GROUP BY branch, category
                  )
                  SELECT branch, category, ROUND(avg_rating, 2) AS avg_rating
                  FROM ranked
                  WHERE rnk = 1
                  ORDER BY branch, category"
                .to_string(),
        },
        QueryDef {
            name: "busiest_day_per_branch",
            description: "Weekday with the most transactions in each branch (ties all listed)",
            columns: &["branch", "day_name", "no_transactions"],
            sql: format!(
                "WITH days AS (
                     SELECT branch, {DAY_NAME} AS day_name, {DAY_ORDER} AS day_order FROM sales
                 ),
                 counted AS (
                     SELECT branch, day_name, day_order, COUNT(*) AS no_transactions,
                            RANK() OVER (PARTITION BY branch ORDER BY COUNT(*) DESC) AS rnk
                     FROM days
                     GROUP BY branch, day_name, day_order
                 )
                 SELECT branch, day_name, no_transactions
                 FROM counted
                 WHERE rnk = 1
                 ORDER BY branch, day_order"
            ),
        },
        QueryDef {
            name: "quantity_by_payment_method",
            description: "Total quantity sold per payment method",
            columns: &["payment_method", "no_qty_sold"],
            sql: "SELECT payment_method, SUM(quantity) AS no_qty_sold
                  FROM sales
                  GROUP BY payment_method
                  ORDER BY no_qty_sold DESC, payment_method"
                .to_string(),
        },
        QueryDef {
            name: "category_rating_by_city",
            description: "Average, minimum and maximum rating of each category per city",
            columns: &["city", "category", "avg_rating", "min_rating", "max_rating"],
            sql: "SELECT city, category,
                         ROUND(AVG(rating), 2) AS avg_rating,
                         MIN(rating) AS min_rating,
                         MAX(rating) AS max_rating
                  FROM sales
                  GROUP BY city, category
                  ORDER BY city, category"
                .to_string(),
        },
        QueryDef {
            name: "profit_by_category",
            description: "Revenue and estimated profit per category (missing margins count as 0)",
            columns: &["category", "total_revenue", "total_profit"],
            sql: "SELECT category,
                         ROUND(SUM(total), 2) AS total_revenue,
                         ROUND(SUM(total * COALESCE(profit_margin, 0)), 2) AS total_profit
                  FROM sales
                  GROUP BY category
                  ORDER BY total_profit DESC, category"
                .to_string(),
        },
        QueryDef {
            name: "preferred_payment_per_branch",
            description: "Most used payment method in each branch",
            columns: &["branch", "preferred_payment_method", "no_transactions"],
            sql: "SELECT branch, preferred_payment_method, no_transactions
                  FROM preferred_payment_per_branch
                  ORDER BY branch"
                .to_string(),
        },
        QueryDef {
            name: "shift_invoices_per_branch",
            description: "Invoices per branch and shift (Morning < 12h <= Afternoon < 18h <= Evening)",
            columns: &["branch", "shift", "no_invoices"],
            sql: format!(
                "WITH shifted AS (
                     SELECT branch, {} AS shift, {} AS shift_order FROM sales
                 )
                 SELECT branch, shift, COUNT(*) AS no_invoices
                 FROM shifted
                 GROUP BY branch, shift, shift_order
                 ORDER BY branch, shift_order",
                shift_label(),
                shift_order()
            ),
        },
        QueryDef {
            name: "revenue_decrease_by_branch",
            description: "Branches whose revenue fell between the previous and current year, largest drop first",
            columns: &["branch", "last_year_revenue", "current_year_revenue", "rev_dec_ratio"],
            sql: format!(
                "WITH prev AS (
                     SELECT branch, SUM(total) AS revenue FROM sales
                     WHERE {YEAR} = :previous_year
                     GROUP BY branch
                 ),
                 cur AS (
                     SELECT branch, SUM(total) AS revenue FROM sales
                     WHERE {YEAR} = :current_year
                     GROUP BY branch
                 )
                 SELECT p.branch AS branch,
                        ROUND(p.revenue, 2) AS last_year_revenue,
                        ROUND(c.revenue, 2) AS current_year_revenue,
                        ROUND(CASE WHEN p.revenue = 0 THEN 0.0
                                   ELSE (p.revenue - c.revenue) * 100.0 / p.revenue END, 2) AS rev_dec_ratio
                 FROM prev p
                 JOIN cur c ON p.branch = c.branch
                 WHERE p.revenue > c.revenue AND p.revenue > 0
                 ORDER BY rev_dec_ratio DESC, branch
                 LIMIT :limit"
            ),
        },
        QueryDef {
            name: "top_categories_per_city",
            description: "Top K categories by revenue in each city",
            columns: &["city", "category", "total_revenue", "revenue_rank"],
            sql: "WITH revenue AS (
                      SELECT city, category, SUM(total) AS revenue
                      FROM sales
                      GROUP BY city, category
                  ),
                  ranked AS (
                      SELECT city, category, revenue,
                             ROW_NUMBER() OVER (PARTITION BY city ORDER BY revenue DESC, category ASC) AS revenue_rank
                      FROM revenue
                  )
                  SELECT city, category, ROUND(revenue, 2) AS total_revenue, revenue_rank
                  FROM ranked
                  WHERE revenue_rank <= :top_k
                  ORDER BY city, revenue_rank"
                .to_string(),
        },
        QueryDef {
            name: "revenue_by_branch",
            description: "Transactions and revenue per branch",
            columns: &["branch", "city", "no_transactions", "total_revenue"],
            sql: "SELECT branch, city, COUNT(*) AS no_transactions, ROUND(SUM(total), 2) AS total_revenue
                  FROM sales
                  GROUP BY branch, city
                  ORDER BY SUM(total) DESC, branch"
                .to_string(),
        },
        QueryDef {
            name: "revenue_by_city",
            description: "Branch count and revenue per city",
            columns: &["city", "no_branches", "total_revenue"],
            sql: "SELECT city, COUNT(DISTINCT branch) AS no_branches, ROUND(SUM(total), 2) AS total_revenue
                  FROM sales
                  GROUP BY city
                  ORDER BY SUM(total) DESC, city"
                .to_string(),
        },
        QueryDef {
            name: "monthly_revenue",
            description: "Transactions and revenue per calendar month",
            columns: &["month", "no_transactions", "total_revenue"],
            sql: "WITH monthly AS (
                      SELECT strftime('%Y-%m', date) AS month, total FROM sales
                  )
                  SELECT month, COUNT(*) AS no_transactions, ROUND(SUM(total), 2) AS total_revenue
                  FROM monthly
                  GROUP BY month
                  ORDER BY month"
                .to_string(),
        },
        QueryDef {
            name: "revenue_by_weekday",
            description: "Transactions and revenue per weekday, Monday first",
            columns: &["day_name", "no_transactions", "total_revenue"],
            sql: format!(
                "WITH days AS (
                     SELECT {DAY_NAME} AS day_name, {DAY_ORDER} AS day_order, total FROM sales
                 )
                 SELECT day_name, COUNT(*) AS no_transactions, ROUND(SUM(total), 2) AS total_revenue
                 FROM days
                 GROUP BY day_name, day_order
                 ORDER BY day_order"
            ),
        },
        QueryDef {
            name: "rating_bands",
            description: "Transactions per rating band (Low < 4 <= Medium < 7 <= High)",
            columns: &["rating_band", "no_transactions", "avg_rating"],
            sql: format!(
                "WITH banded AS (
                     SELECT {} AS rating_band, {} AS band_order, rating FROM sales
                 )
                 SELECT rating_band, COUNT(*) AS no_transactions, ROUND(AVG(rating), 2) AS avg_rating
                 FROM banded
                 GROUP BY rating_band, band_order
                 ORDER BY band_order",
                rating_label(),
                rating_order()
            ),
        },
        QueryDef {
            name: "basket_size_buckets",
            description: "Transactions per branch and basket size (Small < 5 <= Medium < 10 <= Large)",
            columns: &["branch", "basket_size", "no_transactions", "total_quantity"],
            sql: format!(
                "WITH sized AS (
                     SELECT branch, {} AS basket_size, {} AS size_order, quantity FROM sales
                 )
                 SELECT branch, basket_size, COUNT(*) AS no_transactions, SUM(quantity) AS total_quantity
                 FROM sized
                 GROUP BY branch, basket_size, size_order
                 ORDER BY branch, size_order",
                basket_label(),
                basket_order()
            ),
        },
        QueryDef {
            name: "payment_share_by_city",
            description: "Share of transactions per payment method within each city",
            columns: &["city", "payment_method", "no_transactions", "share_pct"],
            sql: "WITH counts AS (
                      SELECT city, payment_method, COUNT(*) AS no_transactions
                      FROM sales
                      GROUP BY city, payment_method
                  )
                  SELECT city, payment_method, no_transactions,
                         ROUND(no_transactions * 100.0 / SUM(no_transactions) OVER (PARTITION BY city), 2) AS share_pct
                  FROM counts
                  ORDER BY city, no_transactions DESC, payment_method"
                .to_string(),
        },
        QueryDef {
            name: "average_basket_by_branch",
            description: "Average invoice total, quantity and unit price per branch",
            columns: &["branch", "avg_total", "avg_quantity", "avg_unit_price"],
            sql: "SELECT branch,
                         ROUND(AVG(total), 2) AS avg_total,
                         ROUND(AVG(quantity), 2) AS avg_quantity,
                         ROUND(AVG(unit_price), 2) AS avg_unit_price
                  FROM sales
                  GROUP BY branch
                  ORDER BY branch"
                .to_string(),
        },
        QueryDef {
            name: "category_revenue_share",
            description: "Revenue per category and its share of all revenue",
            columns: &["category", "total_revenue", "share_pct"],
            sql: "WITH revenue AS (
                      SELECT category, SUM(total) AS revenue FROM sales GROUP BY category
                  ),
                  grand AS (
                      SELECT SUM(revenue) AS revenue FROM revenue
                  )
                  SELECT r.category AS category,
                         ROUND(r.revenue, 2) AS total_revenue,
                         ROUND(CASE WHEN g.revenue = 0 THEN 0.0
                                    ELSE r.revenue * 100.0 / g.revenue END, 2) AS share_pct
                  FROM revenue r
                  CROSS JOIN grand g
                  ORDER BY r.revenue DESC, r.category"
                .to_string(),
        },
        QueryDef {
            name: "peak_hour_per_branch",
            description: "Hour of day with the most transactions in each branch (ties all listed)",
            columns: &["branch", "hour", "no_transactions"],
            sql: "WITH hourly AS (
                      SELECT branch, CAST(strftime('%H', time) AS INTEGER) AS hour FROM sales
                  ),
                  counted AS (
                      SELECT branch, hour, COUNT(*) AS no_transactions,
                             RANK() OVER (PARTITION BY branch ORDER BY COUNT(*) DESC) AS rnk
                      FROM hourly
                      GROUP BY branch, hour
                  )
                  SELECT branch, hour, no_transactions
                  FROM counted
                  WHERE rnk = 1
                  ORDER BY branch, hour"
                .to_string(),
        },
        QueryDef {
            name: "yearly_revenue_by_category",
            description: "Revenue per year and category",
            columns: &["year", "category", "total_revenue"],
            sql: format!(
                "WITH yearly AS (
                     SELECT {YEAR} AS year, category, total FROM sales
                 )
                 SELECT year, category, ROUND(SUM(total), 2) AS total_revenue
                 FROM yearly
                 GROUP BY year, category
                 ORDER BY year, category"
            ),
        },
    ]
}

static CATALOG: Lazy<Vec<QueryDef>> = Lazy::new(build_catalog);

/// All report queries, in catalog order
pub fn catalog() -> &'static [QueryDef] {
    &CATALOG
}

/// Look up a query by name
pub fn find_query(name: &str) -> Option<&'static QueryDef> {
    CATALOG.iter().find(|q| q.name == name)
}
