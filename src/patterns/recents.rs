//! Bounded, case-insensitively distinct query lists.

use serde_json::Value;

/// Capacity of the standalone recents record.
pub const RECENTS_CAP: usize = 8;

/// Move `query` to the front of `list`, dropping any case-insensitive
/// duplicate and truncating to `cap` entries.
///
/// Blank input leaves the list untouched.
pub fn push_distinct(list: &mut Vec<String>, query: &str, cap: usize) {
    let query = query.trim();
    if query.is_empty() {
        return;
    }
    let folded = query.to_lowercase();
    list.retain(|existing| existing.to_lowercase() != folded);
    list.insert(0, query.to_string());
    list.truncate(cap);
}

/// Rebuild a list from an arbitrary JSON value, keeping the first
/// occurrence of every string and dropping everything else.
pub(crate) fn repair_list(value: Option<&Value>, cap: usize) -> Vec<String> {
    let Some(Value::Array(items)) = value else {
        return Vec::new();
    };

    let mut list: Vec<String> = Vec::with_capacity(items.len().min(cap));
    for item in items {
        let Some(text) = item.as_str().map(str::trim) else {
            continue;
        };
        if text.is_empty() {
            continue;
        }
        let folded = text.to_lowercase();
        if list.iter().any(|existing| existing.to_lowercase() == folded) {
            continue;
        }
        list.push(text.to_string());
        if list.len() == cap {
            break;
        }
    }
    list
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn push_moves_duplicates_to_front() {
        let mut list = vec!["Nike".to_string(), "adidas".to_string()];
        push_distinct(&mut list, "ADIDAS", RECENTS_CAP);
        assert_eq!(list, vec!["ADIDAS", "Nike"]);
    }

    #[test]
    fn push_truncates_to_cap() {
        let mut list = Vec::new();
        for index in 0..12 {
            push_distinct(&mut list, &format!("query {index}"), RECENTS_CAP);
        }
        assert_eq!(list.len(), RECENTS_CAP);
        assert_eq!(list[0], "query 11");
        assert_eq!(list[RECENTS_CAP - 1], "query 4");
    }

    #[test]
    fn blank_queries_are_ignored() {
        let mut list = vec!["nike".to_string()];
        push_distinct(&mut list, "   ", RECENTS_CAP);
        assert_eq!(list, vec!["nike"]);
    }

    #[test]
    fn repair_drops_invalid_entries() {
        let value = json!(["nike", 3, null, "NIKE", " ", "puma", {"a": 1}]);
        assert_eq!(repair_list(Some(&value), RECENTS_CAP), vec!["nike", "puma"]);
        assert!(repair_list(Some(&json!({"nike": 1})), RECENTS_CAP).is_empty());
        assert!(repair_list(None, RECENTS_CAP).is_empty());
    }
}
