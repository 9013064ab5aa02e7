use crate::error::AgentError;

/// Extract the first JSON object from a string that may contain surrounding text.
///
/// Handles common model response formats:
/// - Clean JSON: `{"key": "value"}`
/// - Markdown-wrapped: ```json\n{"key": "value"}\n```
/// - Prefix text: `Degerlendirme:\n{"key": "value"}`
pub fn extract_json(text: &str) -> Result<String, AgentError> {
    let trimmed = text.trim();

    if trimmed.starts_with('{') && serde_json::from_str::<serde_json::Value>(trimmed).is_ok() {
        return Ok(trimmed.to_string());
    }

    if let Some(json_str) = extract_from_markdown_block(trimmed) {
        if serde_json::from_str::<serde_json::Value>(&json_str).is_ok() {
            return Ok(json_str);
        }
    }

    if let Some(json_str) = extract_first_object(trimmed) {
        if serde_json::from_str::<serde_json::Value>(&json_str).is_ok() {
            return Ok(json_str);
        }
    }

    Err(AgentError::Parse(format!(
        "No valid JSON object found in response (length={})",
        text.len()
    )))
}

fn extract_from_markdown_block(text: &str) -> Option<String> {
    let start_markers = ["```json\n", "```json\r\n", "```\n", "```\r\n"];

    for marker in &start_markers {
        if let Some(start) = text.find(marker) {
            let json_start = start + marker.len();
            if let Some(end) = text[json_start..].find("```") {
                let extracted = text[json_start..json_start + end].trim();
                return Some(extracted.to_string());
            }
        }
    }

    None
}

/// Find the first balanced { ... } in the text.
fn extract_first_object(text: &str) -> Option<String> {
    let mut depth = 0;
    let mut start = None;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, ch) in text.char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }

        match ch {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            '{' if !in_string => {
                if depth == 0 {
                    start = Some(i);
                }
                depth += 1;
            }
            '}' if !in_string && depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    if let Some(s) = start {
                        return Some(text[s..=i].to_string());
                    }
                }
            }
            _ => {}
        }
    }

    None
}

/// Parse the first decimal number in a reply, accepting a comma as the
/// decimal separator ("0,85"). Returns `None` when no number is present.
pub fn parse_number(text: &str) -> Option<f64> {
    let chars: Vec<char> = text.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        if chars[i].is_ascii_digit() {
            let negative = i > 0 && chars[i - 1] == '-';
            let mut literal = String::new();
            let mut seen_separator = false;
            while i < chars.len() {
                let c = chars[i];
                if c.is_ascii_digit() {
                    literal.push(c);
                } else if (c == '.' || c == ',')
                    && !seen_separator
                    && chars.get(i + 1).is_some_and(|n| n.is_ascii_digit())
                {
                    seen_separator = true;
                    literal.push('.');
                } else {
                    break;
                }
                i += 1;
            }
            let value: f64 = literal.parse().ok()?;
            return Some(if negative { -value } else { value });
        }
        i += 1;
    }
    None
}

/// Parse a score in `[0, 1]` from a model reply. Values outside the range are
/// clamped; replies with no number yield `None`.
pub fn parse_unit_score(text: &str) -> Option<f64> {
    parse_number(text).map(|v| v.clamp(0.0, 1.0))
}

/// Interpret a yes/no verdict, in Turkish or English. `None` when neither appears.
pub fn parse_verdict(text: &str) -> Option<bool> {
    let folded = bist_data::text::tokenize(text);
    for token in &folded {
        match token.as_str() {
            "evet" | "yes" => return Some(true),
            "hayir" | "no" => return Some(false),
            _ => {}
        }
    }
    None
}
