//! Naming utilities for table_sync
//!
//! This module synthesizes index names and keeps them within engine limits.

/// Pattern used when no naming configuration is given
pub const DEFAULT_INDEX_PATTERN: &str = "{table}_{columns}_idx";

/// Format a name according to a pattern with placeholders
pub fn format_name(pattern: &str, replacements: &[(&str, &str)]) -> String {
    let mut result = pattern.to_string();

    for (placeholder, value) in replacements {
        result = result.replace(&format!("{{{}}}", placeholder), value);
    }

    result
}

/// Get index name from table and columns according to pattern
pub fn get_index_name<S: AsRef<str>>(pattern: &str, table_name: &str, columns: &[S]) -> String {
    let columns_str = columns
        .iter()
        .map(|c| c.as_ref())
        .collect::<Vec<_>>()
        .join("_");

    format_name(pattern, &[("table", table_name), ("columns", &columns_str)])
}

/// Truncate an identifier to fit database limits
pub fn truncate_identifier(name: &str, max_length: usize) -> String {
    // Room for an underscore and eight hash characters
    if name.len() <= max_length || max_length <= 9 {
        return name.to_string();
    }

    let hash = format!("{:x}", md5::compute(name.as_bytes()));

    let mut keep_length = max_length - 9;
    while !name.is_char_boundary(keep_length) {
        keep_length -= 1;
    }

    format!("{}_{}", &name[..keep_length], &hash[0..8])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_name() {
        assert_eq!(
            format_name("ix_{table}_{columns}", &[("table", "users"), ("columns", "email")]),
            "ix_users_email"
        );
    }

    #[test]
    fn test_index_name() {
        assert_eq!(
            get_index_name(DEFAULT_INDEX_PATTERN, "users", &["email"]),
            "users_email_idx"
        );

        assert_eq!(
            get_index_name(
                DEFAULT_INDEX_PATTERN,
                "orders",
                &["customer_id".to_string(), "order_date".to_string()]
            ),
            "orders_customer_id_order_date_idx"
        );
    }

    #[test]
    fn test_truncate_identifier() {
        let long_name = "this_is_a_very_long_identifier_that_exceeds_database_limits";
        let truncated = truncate_identifier(long_name, 30);

        assert_eq!(truncated.len(), 30);
        assert!(truncated.starts_with("this_is_a_very_long_"));
        assert_ne!(truncated, truncate_identifier(&format!("{}_2", long_name), 30));
    }

    #[test]
    fn short_identifiers_are_untouched() {
        assert_eq!(truncate_identifier("users_email_idx", 63), "users_email_idx");
    }
}
