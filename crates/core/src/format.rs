//! Small text and number formatters used by hosts when rendering cells and labels.

use once_cell::sync::Lazy;
use regex::Regex;

static NON_DIGIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\d]").expect("valid regex"));
static NON_SLUG: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9\s]").expect("valid regex"));
static SPACES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Uppercase the first character of every space-separated word.
pub fn capitalize(s: &str) -> String {
    s.split(' ')
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(c) => c.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn to_kebab_case(s: &str) -> String {
    let lower = s.trim().to_lowercase();
    let cleaned = NON_SLUG.replace_all(&lower, "");
    SPACES.replace_all(&cleaned, "-").into_owned()
}

/// Keep digits only; an empty result is 0.
pub fn sanitize_number(s: &str) -> u64 {
    let digits = NON_DIGIT.replace_all(s, "");
    if digits.is_empty() { return 0; }
    digits.parse::<u64>().unwrap_or(u64::MAX)
}

/// Group digits with `.` thousand separators, e.g. `Rp1.250.000`.
pub fn format_numeric(s: &str, prefix: &str) -> String {
    let digits = sanitize_number(s).to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 { out.push('.'); }
        out.push(ch);
    }
    format!("{}{}", prefix, out)
}

/// Leading zeros are dropped: `0812345678901` -> `812-3456-7890-1`.
pub fn format_phone(s: &str) -> String {
    let n = sanitize_number(s);
    if n == 0 { return String::new(); }
    let digits = n.to_string();
    if digits.len() <= 3 { return digits; }
    let (head, rest) = digits.split_at(3);
    let mut out = head.to_string();
    let tail: Vec<char> = rest.chars().collect();
    for chunk in tail.chunks(4) {
        out.push('-');
        out.extend(chunk.iter());
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dhms {
    pub days: u64,
    pub hours: u64,
    pub minutes: u64,
    pub seconds: u64,
}

pub fn seconds_to_dhms(total: u64) -> Dhms {
    Dhms {
        days: total / 86_400,
        hours: (total % 86_400) / 3_600,
        minutes: (total % 3_600) / 60,
        seconds: total % 60,
    }
}

pub fn to_bytes(mb: u64) -> u64 { mb * 1024 * 1024 }

pub fn to_megabytes(bytes: u64) -> f64 { bytes as f64 / 1024.0 / 1024.0 }
