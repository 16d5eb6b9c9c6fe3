//! Small utility helpers used across modules.

/// Identifiers minted by the local fallback store carry this prefix, so a
/// draft id can be told apart from an upstream row id without a lookup.
pub const LOCAL_ID_PREFIX: &str = "local-";

/// True if the identifier was generated by the local draft store.
pub fn is_local_id(id: &str) -> bool {
  id.starts_with(LOCAL_ID_PREFIX)
}

/// Log-safe truncation for large strings.
/// Avoids spamming logs with huge request/response payloads.
/// Cuts on char boundaries, so multi-byte payloads never panic.
pub fn trunc_for_log(s: &str, max: usize) -> String {
  match s.char_indices().nth(max) {
    None => s.to_string(),
    Some((cut, _)) => format!("{}… ({} bytes total)", &s[..cut], s.len()),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn local_ids_are_recognized() {
    assert!(is_local_id("local-2c1f"));
    assert!(!is_local_id("42"));
    assert!(!is_local_id(""));
  }

  #[test]
  fn truncation_cuts_on_char_boundaries() {
    // A multi-byte char straddling the byte offset must not panic.
    let mut s = "a".repeat(199);
    s.push('é');
    s.push_str(&"b".repeat(50));
    let out = trunc_for_log(&s, 200);
    assert!(out.starts_with(&"a".repeat(199)));
    assert!(out.contains('é'));
    assert!(out.contains("bytes total"));

    let all_wide = "漢".repeat(10);
    assert_eq!(trunc_for_log(&all_wide, 10), all_wide);
    assert!(trunc_for_log(&all_wide, 3).starts_with("漢漢漢…"));
  }
}
