/*!
Validation of candidate records.

Two independent layers: the server-side checks run by the registration
endpoint, and the stricter pre-submit checks the form runs before it
sends anything. Both are pure; neither consults the store (uniqueness is
checked separately).
*/
use crate::student::{RegisterStudent, MANDATORY_EXAM_LABEL};

/// Earliest year accepted for dates of birth and passing years.
pub const MIN_YEAR: i32 = 1900;

/**
Server-side validation of a candidate record.

Returns one human-readable message per failed rule; an empty vector means
the candidate is acceptable. All failures are reported, not just the
first.
*/
pub fn validate_candidate(c: &RegisterStudent) -> Vec<String> {
    log::trace!("validate_candidate( {:?} ) called.", &c.roll_no);

    let mut errors: Vec<String> = Vec::new();

    if c.roll_no.trim().is_empty() {
        errors.push("Roll number is required".to_owned());
    }
    if c.first_name.trim().is_empty() {
        errors.push("First name is required".to_owned());
    }
    if c.last_name.trim().is_empty() {
        errors.push("Last name is required".to_owned());
    }
    if c.email.trim().is_empty() {
        errors.push("Email is required".to_owned());
    }
    if c.password.is_empty() {
        errors.push("Password is required".to_owned());
    }

    if c.academic_qualifications.is_empty() {
        errors.push("Academic qualifications are required".to_owned());
    } else {
        let has_mandatory = c.academic_qualifications.iter()
            .any(|q| q.exam_type == MANDATORY_EXAM_LABEL);
        if !has_mandatory {
            errors.push(format!(
                "{} qualification is mandatory", MANDATORY_EXAM_LABEL
            ));
        }
    }

    errors
}

/// True iff `s` is exactly ten ASCII digits.
pub fn mobile_ok(s: &str) -> bool {
    s.len() == 10 && s.bytes().all(|b| b.is_ascii_digit())
}

/// Basic `local@domain.tld` shape check: exactly one `@`, a nonempty
/// local part, a dot somewhere after the `@` with text on both sides,
/// and no whitespace anywhere.
pub fn email_ok(s: &str) -> bool {
    if s.chars().any(char::is_whitespace) {
        return false;
    }
    let mut parts = s.splitn(2, '@');
    let local = match parts.next() {
        Some(l) => l,
        None => { return false; },
    };
    let domain = match parts.next() {
        Some(d) => d,
        None => { return false; },
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) => !host.is_empty() && !tld.is_empty(),
        None => false,
    }
}

/// Check a passing-year string: four digits, within `[MIN_YEAR, current_year]`.
pub fn passing_year_ok(s: &str, current_year: i32) -> bool {
    if s.len() != 4 || !s.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    match s.parse::<i32>() {
        Ok(y) => y >= MIN_YEAR && y <= current_year,
        Err(_) => false,
    }
}
