//! Cleaning of free-text answers before they reach the response sheet.
//!
//! Rows are appended with `USER_ENTERED`, so anything that looks like a
//! formula would be evaluated by the spreadsheet. Control characters are
//! stripped first, then the text is trimmed, capped and formula-escaped with
//! a leading quote, so a control character can never hide a formula leader.

pub const MAX_TEXT_CHARS: usize = 1000;

const FORMULA_TRIGGERS: [char; 4] = ['=', '+', '-', '@'];

pub fn sanitize_text(text: Option<&str>) -> String {
    let Some(text) = text else {
        return String::new();
    };

    let stripped: String = text.chars().filter(|c| !is_stripped_control(*c)).collect();
    let trimmed = stripped.trim();

    if trimmed.starts_with(FORMULA_TRIGGERS) {
        // The quote counts towards the cap.
        let body: String = trimmed.chars().take(MAX_TEXT_CHARS - 1).collect();
        format!("'{body}")
    } else {
        trimmed.chars().take(MAX_TEXT_CHARS).collect()
    }
}

fn is_stripped_control(c: char) -> bool {
    matches!(c, '\u{00}'..='\u{08}' | '\u{0B}'..='\u{0C}' | '\u{0E}'..='\u{1F}' | '\u{7F}')
}
