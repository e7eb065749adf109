//! Input checks shared by several controllers.

use rustrict::CensorStr;

const INSTITUTION_DOMAIN: &str = "lhr.nu.edu.pk";

/// Longest name or topic accepted for rooms, courses and teachers.
pub const MAX_NAME_LEN: usize = 255;

/// Student addresses look like `l123456@lhr.nu.edu.pk`: the letter `l`,
/// exactly six digits, then the campus domain.
pub fn is_institutional_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    let Some(digits) = local.strip_prefix('l') else {
        return false;
    };
    domain == INSTITUTION_DOMAIN && digits.len() == 6 && digits.bytes().all(|b| b.is_ascii_digit())
}

/// Trimmed, non-empty and no longer than [`MAX_NAME_LEN`].
pub fn name_field(field: &str, value: &str) -> Result<String, String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(format!("{field} cannot be empty."));
    }
    if value.chars().count() > MAX_NAME_LEN {
        return Err(format!("{field} must be at most {MAX_NAME_LEN} characters."));
    }
    Ok(value.to_string())
}

/// Campus slang and short forms the general-purpose filter lets through.
const PROFANITY: &[&str] = &[
    "arse", "arsehole", "ass", "asshat", "asshole", "bastard", "bellend", "bitch", "bitches",
    "bloody", "bollocks", "bugger", "bullshit", "chutiya", "cock", "crap", "crappy", "cunt",
    "damn", "dick", "dickhead", "dipshit", "douche", "douchebag", "dumbass", "fag", "faggot",
    "fck", "fuck", "fucked", "fucker", "fucking", "fuk", "harami", "hoe", "jackass", "kamina",
    "kutta", "kutti", "motherfucker", "nigga", "nigger", "piss", "pissed", "prick", "pussy",
    "retard", "retarded", "shit", "shitty", "slut", "stfu", "tatti", "twat", "wanker", "whore",
    "wtf",
];

/// Undo the usual character swaps used to dodge word filters.
fn normalize(c: char) -> char {
    match c {
        '@' | '4' => 'a',
        '$' | '5' => 's',
        '0' => 'o',
        '1' | '!' => 'i',
        '3' => 'e',
        '7' => 't',
        other => other.to_ascii_lowercase(),
    }
}

/// True if any word of `text` is on the local list.
fn has_listed_word(text: &str) -> bool {
    let normalized: String = text.chars().map(normalize).collect();
    normalized
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .any(|word| PROFANITY.contains(&word))
}

/// Checked against `rustrict`'s maintained dictionary, which also catches
/// repeated-letter and look-alike spellings, then against the local list.
pub fn contains_profanity(text: &str) -> bool {
    text.is_inappropriate() || has_listed_word(text)
}
