// Library module for testable functions

pub mod analytics;
pub mod api;
pub mod ingestion;

/// Bucket a LinkedIn headcount into a company size category
pub fn categorize_company_size(size: f64) -> &'static str {
    if size < 30.0 {
        "Micro (< 30)"
    } else if size < 100.0 {
        "Small (30-99)"
    } else if size < 500.0 {
        "Medium (100-499)"
    } else {
        "Large (500+)"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_micro_company() {
        assert_eq!(categorize_company_size(0.0), "Micro (< 30)");
        assert_eq!(categorize_company_size(29.0), "Micro (< 30)");
    }

    #[test]
    fn test_small_company_boundaries() {
        // 30 is the first small headcount
        assert_eq!(categorize_company_size(30.0), "Small (30-99)");
        assert_eq!(categorize_company_size(99.0), "Small (30-99)");
    }

    #[test]
    fn test_medium_company_boundaries() {
        assert_eq!(categorize_company_size(100.0), "Medium (100-499)");
        assert_eq!(categorize_company_size(499.5), "Medium (100-499)");
    }

    #[test]
    fn test_large_company() {
        assert_eq!(categorize_company_size(500.0), "Large (500+)");
        assert_eq!(categorize_company_size(120_000.0), "Large (500+)");
    }
}
