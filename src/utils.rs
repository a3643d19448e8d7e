/// Canonical form used for storage and comparison: trimmed, ASCII-lowercased.
pub fn normalize_email(raw: &str) -> String {
  raw.trim().to_ascii_lowercase()
}

/// Syntactic check only; deliverability is the mail provider's problem.
pub fn is_valid_email(email: &str) -> bool {
  if email.is_empty() || email.chars().any(char::is_whitespace) {
    return false;
  }

  let Some((local, domain)) = email.split_once('@') else {
    return false;
  };

  !local.is_empty()
    && !domain.is_empty()
    && domain.contains('.')
    && !domain.starts_with('.')
    && !domain.ends_with('.')
    && !domain.contains('@')
}
