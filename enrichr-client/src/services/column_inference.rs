//! Column role inference
//!
//! Proposes which uploaded headers hold the company name and the website.
//! Pure and total: any header list, including an empty one, yields a mapping.
//! Fields with no candidate stay empty.

use crate::models::ColumnMapping;

const COMPANY_NAME_KEYWORDS: &[&str] = &["company", "name"];
const WEBSITE_KEYWORDS: &[&str] = &["website", "url"];

/// Propose a column mapping for `headers`
///
/// The first header (in order) whose lowercase form contains one of a field's
/// keywords wins that field.
pub fn infer_column_mapping<S: AsRef<str>>(headers: &[S]) -> ColumnMapping {
    ColumnMapping {
        company_name_field: first_match(headers, COMPANY_NAME_KEYWORDS),
        website_field: first_match(headers, WEBSITE_KEYWORDS),
    }
}

fn first_match<S: AsRef<str>>(headers: &[S], keywords: &[&str]) -> String {
    headers
        .iter()
        .map(AsRef::as_ref)
        .find(|header| {
            let lower = header.to_lowercase();
            keywords.iter().any(|k| lower.contains(k))
        })
        .map(str::to_owned)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_headers() {
        let mapping = infer_column_mapping(&["Company", "Website", "Industry"]);
        assert_eq!(mapping, ColumnMapping::new("Company", "Website"));
    }

    #[test]
    fn test_alternate_headers() {
        let mapping = infer_column_mapping(&["Org Name", "URL"]);
        assert_eq!(mapping, ColumnMapping::new("Org Name", "URL"));
    }

    #[test]
    fn test_empty_headers() {
        let headers: Vec<String> = Vec::new();
        assert_eq!(infer_column_mapping(&headers), ColumnMapping::default());
    }

    #[test]
    fn test_first_match_wins() {
        let mapping = infer_column_mapping(&["Contact Name", "Company", "LinkedIn URL", "Website"]);
        assert_eq!(mapping, ColumnMapping::new("Contact Name", "LinkedIn URL"));
    }

    #[test]
    fn test_no_candidates() {
        let mapping = infer_column_mapping(&["Industry", "Revenue"]);
        assert_eq!(mapping, ColumnMapping::default());
    }

    #[test]
    fn test_case_insensitive() {
        let mapping = infer_column_mapping(&["COMPANY_ID", "homepage_url"]);
        assert_eq!(mapping, ColumnMapping::new("COMPANY_ID", "homepage_url"));
    }

    #[test]
    fn test_fields_are_members_of_headers() {
        let samples: Vec<Vec<&str>> = vec![
            vec![],
            vec![""],
            vec!["a", "b", "c"],
            vec!["Name", "Name2", "url"],
            vec!["Ünternehmen", "WEBSITE", "company website"],
            vec!["x", "companyname"],
        ];

        for headers in samples {
            let mapping = infer_column_mapping(&headers);
            for field in [&mapping.company_name_field, &mapping.website_field] {
                assert!(
                    field.is_empty() || headers.contains(&field.as_str()),
                    "{:?} not in {:?}",
                    field,
                    headers
                );
            }
        }
    }
}
