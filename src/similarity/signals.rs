//! Cheap, local similarity signals between two signatures.
//!
//! All functions here are symmetric in their two arguments and return
//! values in [0.0, 1.0].

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;
use std::hash::Hash;

use crate::signature::FunctionSignature;

lazy_static! {
    /// `parseHTTPResponse` -> `parseHTTP_Response`
    static ref CAMEL_WORD: Regex = Regex::new(r"(.)([A-Z][a-z]+)").unwrap();
    /// `parseHTTP_Response` -> `parse_HTTP_Response`
    static ref CAMEL_BOUNDARY: Regex = Regex::new(r"([a-z0-9])([A-Z])").unwrap();
}

const FEATURE_COUNT_WEIGHT: f64 = 0.3;
const FEATURE_RETURN_WEIGHT: f64 = 0.2;
const FEATURE_TYPES_WEIGHT: f64 = 0.3;
const FEATURE_DOCS_WEIGHT: f64 = 0.2;

/// Neutral score used when a feature cannot be compared.
const NEUTRAL: f64 = 0.5;

/// Jaccard coefficient |A ∩ B| / |A ∪ B|; two empty sets are identical.
pub fn jaccard<T: Eq + Hash>(a: &HashSet<T>, b: &HashSet<T>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / union as f64
}

/// Minimum single-character edits turning `a` into `b`.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];
    for i in 1..=a.len() {
        curr[0] = i;
        for j in 1..=b.len() {
            let cost = usize::from(a[i - 1] != b[j - 1]);
            curr[j] = (curr[j - 1] + 1).min(prev[j] + 1).min(prev[j - 1] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

/// `1 - distance / longest`; zero when either side is empty.
pub fn edit_similarity(a: &str, b: &str) -> f64 {
    let longest = a.chars().count().max(b.chars().count());
    if a.is_empty() || b.is_empty() || longest == 0 {
        return 0.0;
    }
    (1.0 - levenshtein(a, b) as f64 / longest as f64).max(0.0)
}

/// Collapse naming conventions into lowercase words.
///
/// `calculateTotal`, `calculate_total`, `Calculate-Total` and
/// `calculate.total` all become `["calculate", "total"]`.
pub fn name_words(name: &str) -> Vec<String> {
    let split = CAMEL_WORD.replace_all(name, "${1}_${2}");
    let split = CAMEL_BOUNDARY.replace_all(&split, "${1}_${2}");
    split
        .to_lowercase()
        .split(|c: char| c == '_' || c == '-' || c == '.' || c.is_whitespace())
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

/// Tiered similarity between two function names.
pub fn name_similarity(a: &str, b: &str) -> f64 {
    let a_lower = a.to_lowercase();
    let b_lower = b.to_lowercase();
    if a_lower == b_lower {
        return 1.0;
    }

    let a_words = name_words(a);
    let b_words = name_words(b);
    if !a_words.is_empty() && a_words == b_words {
        return 0.95;
    }

    let a_set: HashSet<&String> = a_words.iter().collect();
    let b_set: HashSet<&String> = b_words.iter().collect();
    if !a_set.is_empty() && !b_set.is_empty() {
        let overlap = jaccard(&a_set, &b_set);
        if overlap >= 0.7 {
            return 0.85;
        }
        if overlap >= 0.5 {
            return 0.70;
        }
        if overlap > 0.3 {
            return 0.50;
        }
    }

    edit_similarity(&a_lower, &b_lower)
}

/// Cheap name check used to rule out unrelated pairs.
///
/// Word overlap on `_`-separated words when it exceeds 0.3, otherwise
/// overlap of the character sets.
pub fn rough_name_similarity(a: &str, b: &str) -> f64 {
    let a = a.to_lowercase();
    let b = b.to_lowercase();
    if a == b {
        return 1.0;
    }

    let words = |s: &str| -> HashSet<String> {
        s.replace('_', " ")
            .split_whitespace()
            .map(str::to_string)
            .collect()
    };
    let a_words = words(&a);
    let b_words = words(&b);
    if !a_words.is_empty() && !b_words.is_empty() {
        let overlap = jaccard(&a_words, &b_words);
        if overlap > 0.3 {
            return overlap;
        }
    }

    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let a_chars: HashSet<char> = a.chars().collect();
    let b_chars: HashSet<char> = b.chars().collect();
    jaccard(&a_chars, &b_chars)
}

fn doc_words(text: &str) -> HashSet<String> {
    text.split_whitespace().map(str::to_lowercase).collect()
}

/// Blend of parameter count, return type, parameter types and docs.
pub fn feature_similarity(a: &FunctionSignature, b: &FunctionSignature) -> f64 {
    let count_a = a.parameters.len();
    let count_b = b.parameters.len();
    let longest = count_a.max(count_b).max(1);
    let count = 1.0 - count_a.abs_diff(count_b) as f64 / longest as f64;

    let returns = match (&a.return_type, &b.return_type) {
        (Some(x), Some(y)) if x.trim() == y.trim() => 1.0,
        (None, None) => 1.0,
        _ => NEUTRAL,
    };

    let types = if a.parameters.is_empty() || b.parameters.is_empty() {
        NEUTRAL
    } else {
        let agreeing = a
            .parameters
            .iter()
            .zip(&b.parameters)
            .filter(|(p, q)| match (&p.type_annotation, &q.type_annotation) {
                (Some(x), Some(y)) => x.trim() == y.trim(),
                _ => false,
            })
            .count();
        agreeing as f64 / count_a.max(count_b) as f64
    };

    let docs = match (&a.documentation, &b.documentation) {
        (Some(x), Some(y)) => {
            let (x, y) = (doc_words(x), doc_words(y));
            if x.is_empty() || y.is_empty() {
                NEUTRAL
            } else {
                jaccard(&x, &y)
            }
        }
        _ => NEUTRAL,
    };

    FEATURE_COUNT_WEIGHT * count
        + FEATURE_RETURN_WEIGHT * returns
        + FEATURE_TYPES_WEIGHT * types
        + FEATURE_DOCS_WEIGHT * docs
}

/// Whether the case-insensitive parameter-name sets or counts differ.
pub fn parameters_differ(a: &FunctionSignature, b: &FunctionSignature) -> bool {
    if a.parameters.len() != b.parameters.len() {
        return true;
    }
    let names = |s: &FunctionSignature| -> HashSet<String> {
        s.parameters.iter().map(|p| p.name.to_lowercase()).collect()
    };
    names(a) != names(b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::Parameter;

    fn sig(name: &str, params: Vec<Parameter>) -> FunctionSignature {
        FunctionSignature::new(name, "test", 1).with_parameters(params)
    }

    #[test]
    fn test_levenshtein() {
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("same", "same"), 0);
    }

    #[test]
    fn test_edit_similarity_empty() {
        assert_eq!(edit_similarity("", "abc"), 0.0);
        assert_eq!(edit_similarity("abc", "abc"), 1.0);
    }

    #[test]
    fn test_name_words() {
        assert_eq!(name_words("calculateTotal"), ["calculate", "total"]);
        assert_eq!(name_words("parseHTTPResponse"), ["parse", "http", "response"]);
        assert_eq!(name_words("send-email.v2"), ["send", "email", "v2"]);
    }

    #[test]
    fn test_name_similarity_tiers() {
        assert_eq!(name_similarity("Calculate_Total", "calculate_total"), 1.0);
        assert_eq!(name_similarity("calculateTotal", "calculate_total"), 0.95);
        // {get, user, name} vs {get, user} -> 2/3
        assert_eq!(name_similarity("get_user_name", "get_user"), 0.70);
        // {fetch, user} vs {get, user} -> 1/3
        assert_eq!(name_similarity("fetch_user", "get_user"), 0.50);
    }

    #[test]
    fn test_name_similarity_falls_back_to_edit_distance() {
        let score = name_similarity("colour", "color");
        assert!((score - (1.0 - 1.0 / 6.0)).abs() < 1e-9);
    }

    #[test]
    fn test_name_similarity_symmetric() {
        let pairs = [
            ("calculate_total", "calculateSum"),
            ("send_email", "sendMail"),
            ("a", "abc"),
            ("parse", ""),
        ];
        for (a, b) in pairs {
            assert_eq!(name_similarity(a, b), name_similarity(b, a), "{} / {}", a, b);
        }
    }

    #[test]
    fn test_rough_name_similarity() {
        assert_eq!(rough_name_similarity("Add", "add"), 1.0);
        // {calculate, total} vs {calculate, sum}
        let score = rough_name_similarity("calculate_total", "calculate_sum");
        assert!((score - 1.0 / 3.0).abs() < 1e-9);
        assert!(rough_name_similarity("xyz", "abc") < 0.3);
    }

    #[test]
    fn test_feature_similarity_identical() {
        let params = vec![
            Parameter::typed("price", "float"),
            Parameter::typed("quantity", "int"),
        ];
        let a = sig("f", params.clone())
            .with_return_type(Some("float".to_string()))
            .with_documentation(Some("Compute the total".to_string()));
        let b = a.clone();
        assert!((feature_similarity(&a, &b) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_feature_similarity_neutral_parts() {
        // Equal counts (0.3), no return types (0.2), no params (0.15), no docs (0.1).
        let a = sig("f", vec![]);
        let b = sig("g", vec![]);
        assert!((feature_similarity(&a, &b) - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_feature_similarity_return_types() {
        let none = sig("f", vec![]);
        let float = sig("f", vec![]).with_return_type(Some("float".to_string()));
        let int = sig("f", vec![]).with_return_type(Some("int".to_string()));
        // count 0.3 + types 0.15 + docs 0.1, plus the return share
        assert!((feature_similarity(&none, &none) - 0.75).abs() < 1e-9);
        assert!((feature_similarity(&float, &float) - 0.75).abs() < 1e-9);
        assert!((feature_similarity(&none, &float) - 0.65).abs() < 1e-9);
        assert!((feature_similarity(&float, &int) - 0.65).abs() < 1e-9);
    }

    #[test]
    fn test_feature_similarity_counts_and_types() {
        let a = sig(
            "f",
            vec![Parameter::typed("a", "int"), Parameter::typed("b", "str")],
        );
        let b = sig("f", vec![Parameter::typed("a", "int")]);
        // count 0.5 * 0.3 + return 1.0 * 0.2 + types 0.5 * 0.3 + docs 0.5 * 0.2
        assert!((feature_similarity(&a, &b) - 0.6).abs() < 1e-9);
        assert_eq!(feature_similarity(&a, &b), feature_similarity(&b, &a));
    }

    #[test]
    fn test_parameters_differ() {
        let a = sig("f", vec![Parameter::new("Price"), Parameter::new("qty")]);
        let b = sig("f", vec![Parameter::new("qty"), Parameter::new("price")]);
        assert!(!parameters_differ(&a, &b));

        let c = sig("f", vec![Parameter::new("price"), Parameter::new("tax")]);
        assert!(parameters_differ(&a, &c));
    }
}
