/// Extracts a fundraising-project id smuggled into a free-text product
/// description, e.g. `"Donation project_id=12"` or `"บริจาค #12"`.
///
/// Explicit markers are tried first (`project_id`, `project`, `pid` followed by
/// `=`, `:`, `-` or `#`, then a bare `#`); failing that, the first run of
/// digits anywhere in the text is used. Anything unparsable is `None`; this
/// never fails the payment it came with.
pub fn parse_project_earmark(description: &str) -> Option<i64> {
    let lowered = description.to_lowercase();

    for marker in ["project_id", "project", "pid"] {
        let mut search_from = 0;
        while let Some(found) = lowered[search_from..].find(marker) {
            let after = search_from + found + marker.len();
            if let Some(id) = id_after_delimiter(&lowered[after..]) {
                return Some(id);
            }
            search_from = after;
        }
    }

    if let Some(found) = lowered.find('#') {
        if let Some(id) = leading_id(&lowered[found + 1..]) {
            return Some(id);
        }
    }

    first_number(&lowered)
}

fn id_after_delimiter(rest: &str) -> Option<i64> {
    let rest = rest.trim_start();
    let mut chars = rest.chars();
    match chars.next() {
        Some('=' | ':' | '-' | '#') => leading_id(chars.as_str().trim_start()),
        _ => None,
    }
}

fn leading_id(text: &str) -> Option<i64> {
    let digits: String = text.chars().take_while(char::is_ascii_digit).collect();
    positive_id(&digits)
}

fn first_number(text: &str) -> Option<i64> {
    let digits: String = text
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(char::is_ascii_digit)
        .collect();
    positive_id(&digits)
}

fn positive_id(digits: &str) -> Option<i64> {
    digits.parse::<i64>().ok().filter(|id| *id > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_markers_win_over_other_numbers() {
        assert_eq!(parse_project_earmark("Donate 500 THB project_id=12"), Some(12));
        assert_eq!(parse_project_earmark("PROJECT: 7 (2026)"), Some(7));
        assert_eq!(parse_project_earmark("bulk 300 pid-44"), Some(44));
        assert_eq!(parse_project_earmark("บริจาค 100 บาท #9"), Some(9));
    }

    #[test]
    fn marker_without_number_falls_through() {
        assert_eq!(parse_project_earmark("project update 31"), Some(31));
        assert_eq!(parse_project_earmark("project:none, ref 5"), Some(5));
    }

    #[test]
    fn falls_back_to_first_number() {
        assert_eq!(parse_project_earmark("Temple roof 15 batch 2"), Some(15));
    }

    #[test]
    fn unparsable_text_is_no_earmark() {
        assert_eq!(parse_project_earmark(""), None);
        assert_eq!(parse_project_earmark("general fund"), None);
        assert_eq!(parse_project_earmark("project_id=0"), None);
        assert_eq!(parse_project_earmark("id 99999999999999999999999"), None);
    }
}
