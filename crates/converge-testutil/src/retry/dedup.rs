//! Collapsing repeated report lines

use std::collections::HashSet;

/// Join `lines` into one newline-terminated block, keeping only the first
/// occurrence of each distinct line
///
/// ```rust
/// use converge_testutil::retry::dedup;
///
/// assert_eq!(dedup(&["a", "b", "a", "c", "b"]), "a\nb\nc\n");
/// assert_eq!(dedup::<&str>(&[]), "");
/// ```
pub fn dedup<S: AsRef<str>>(lines: &[S]) -> String {
    let mut seen = HashSet::with_capacity(lines.len());
    let mut out = String::new();
    for line in lines {
        let line: &str = line.as_ref();
        if seen.insert(line) {
            out.push_str(line);
            out.push('\n');
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_of_first_occurrence() {
        assert_eq!(dedup(&["a", "b", "a", "c", "b"]), "a\nb\nc\n");
    }

    #[test]
    fn test_empty_input() {
        let lines: Vec<String> = Vec::new();
        assert_eq!(dedup(&lines), "");
    }

    #[test]
    fn test_all_identical() {
        let lines = vec!["probe.rs:12: x".to_string(); 5];
        assert_eq!(dedup(&lines), "probe.rs:12: x\n");
    }

    #[test]
    fn test_stable_on_its_own_output() {
        let once = dedup(&["b", "a", "b", "a"]);
        let lines: Vec<&str> = once.lines().collect();
        assert_eq!(dedup(&lines), once);
    }
}
