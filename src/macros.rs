use std::collections::BTreeMap;

/// Expand `$(Name)` references using `known`.
///
/// Unknown macros are left untouched, as is an unterminated `$(`.
pub fn expand_macros(text: &str, known: &BTreeMap<String, String>) -> String {
    if !text.contains("$(") {
        return text.to_string();
    }

    let mut result = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find("$(") {
        result.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find(')') {
            Some(end) => {
                let name = &after[..end];
                match known.get(name) {
                    Some(value) => result.push_str(value),
                    None => {
                        result.push_str("$(");
                        result.push_str(name);
                        result.push(')');
                    }
                }
                rest = &after[end + 1..];
            }
            None => {
                result.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    result.push_str(rest);
    result
}
