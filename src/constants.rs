/// Column names of the sales dataset, in canonical (lowercased) form.
/// These double as the column names of the `sales` table and the cleaned CSV.
pub const INVOICE_ID: &str = "invoice_id";
pub const BRANCH: &str = "branch";
pub const CITY: &str = "city";
pub const CATEGORY: &str = "category";
pub const UNIT_PRICE: &str = "unit_price";
pub const QUANTITY: &str = "quantity";
pub const DATE: &str = "date";
pub const TIME: &str = "time";
pub const PAYMENT_METHOD: &str = "payment_method";
pub const RATING: &str = "rating";
pub const PROFIT_MARGIN: &str = "profit_margin";
pub const TOTAL: &str = "total";

/// Fields a row must carry to survive cleaning. `profit_margin` is nullable.
pub const REQUIRED_FIELDS: [&str; 10] = [
    INVOICE_ID,
    BRANCH,
    CITY,
    CATEGORY,
    UNIT_PRICE,
    QUANTITY,
    DATE,
    TIME,
    PAYMENT_METHOD,
    RATING,
];

/// Cell values treated as null in addition to the empty string
pub const NULL_TOKENS: [&str; 6] = ["na", "n/a", "nan", "null", "none", "#n/a"];

// Rating scale
pub const RATING_MIN: f64 = 0.0;
pub const RATING_MAX: f64 = 10.0;

// Shift boundaries (hour of day, lower bound inclusive)
pub const AFTERNOON_START_HOUR: u32 = 12;
pub const EVENING_START_HOUR: u32 = 18;

// Basket size boundaries (quantity, lower bound inclusive)
pub const MEDIUM_BASKET_MIN_QTY: u32 = 5;
pub const LARGE_BASKET_MIN_QTY: u32 = 10;

// Rating band boundaries (lower bound inclusive)
pub const MEDIUM_RATING_MIN: f64 = 4.0;
pub const HIGH_RATING_MIN: f64 = 7.0;

// Report parameter defaults
pub const DEFAULT_PREVIOUS_YEAR: i32 = 2022;
pub const DEFAULT_CURRENT_YEAR: i32 = 2023;
pub const DEFAULT_TOP_K: u32 = 3;
pub const DEFAULT_LIMIT: u32 = 5;

/// Date formats tried in order when none are configured
pub fn default_date_formats() -> Vec<String> {
    vec![
        "%Y-%m-%d".to_string(),
        "%d/%m/%y".to_string(),
        "%d/%m/%Y".to_string(),
        "%d-%m-%Y".to_string(),
    ]
}

/// Time formats tried in order when none are configured
pub fn default_time_formats() -> Vec<String> {
    vec!["%H:%M:%S".to_string(), "%H:%M".to_string()]
}

/// Shift label for an hour of day
pub fn shift_for_hour(hour: u32) -> &'static str {
    if hour < AFTERNOON_START_HOUR {
        "Morning"
    } else if hour < EVENING_START_HOUR {
        "Afternoon"
    } else {
        "Evening"
    }
}

/// Basket size label for a quantity
pub fn basket_size_for_quantity(quantity: u32) -> &'static str {
    if quantity < MEDIUM_BASKET_MIN_QTY {
        "Small"
    } else if quantity < LARGE_BASKET_MIN_QTY {
        "Medium"
    } else {
        "Large"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shift_boundaries() {
        assert_eq!(shift_for_hour(0), "Morning");
        assert_eq!(shift_for_hour(11), "Morning");
        assert_eq!(shift_for_hour(12), "Afternoon");
        assert_eq!(shift_for_hour(17), "Afternoon");
        assert_eq!(shift_for_hour(18), "Evening");
        assert_eq!(shift_for_hour(23), "Evening");
    }

    #[test]
    fn test_basket_size_boundaries() {
        assert_eq!(basket_size_for_quantity(0), "Small");
        assert_eq!(basket_size_for_quantity(4), "Small");
        assert_eq!(basket_size_for_quantity(5), "Medium");
        assert_eq!(basket_size_for_quantity(9), "Medium");
        assert_eq!(basket_size_for_quantity(10), "Large");
        assert_eq!(basket_size_for_quantity(20), "Large");
    }
}
