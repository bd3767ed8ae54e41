//! Change detection: a content fingerprint decides *whether* a page changed;
//! the line diff only describes *how* for the notification.

use freed_types::events::Change;
use sha1::{Digest, Sha1};

/// Above this many LCS table cells the diff degrades to "all old lines
/// removed, all new lines added".
const MAX_TABLE_CELLS: usize = 4_000_000;

/// Hex SHA-1 of the raw page bytes.
pub fn fingerprint(content: &[u8]) -> String {
    hex::encode(Sha1::digest(content))
}

/// With no previous digest there is nothing to compare against, so this is
/// never a change.
pub fn has_changed(old_digest: Option<&str>, new_digest: &str) -> bool {
    old_digest.is_some_and(|old| old != new_digest)
}

/// Line diff from `old` to `new`, including unchanged context lines, in
/// document order.
///
/// Lines are compared without their terminators. When that finds nothing but
/// the texts still differ (a trailing newline, `\r\n` vs `\n`), the comparison
/// is repeated with terminators included, so differing inputs never produce an
/// empty set of changes.
pub fn diff(old: &str, new: &str) -> Vec<Change> {
    if old != new && old.lines().eq(new.lines()) {
        let a: Vec<&str> = old.split_inclusive('\n').collect();
        let b: Vec<&str> = new.split_inclusive('\n').collect();
        return diff_lines(&a, &b);
    }

    let a: Vec<&str> = old.lines().collect();
    let b: Vec<&str> = new.lines().collect();
    diff_lines(&a, &b)
}

fn diff_lines(a: &[&str], b: &[&str]) -> Vec<Change> {
    let prefix = a.iter().zip(b).take_while(|(x, y)| x == y).count();
    let suffix = a[prefix..]
        .iter()
        .rev()
        .zip(b[prefix..].iter().rev())
        .take_while(|(x, y)| x == y)
        .count();

    let mut out = Vec::with_capacity(a.len().max(b.len()));
    out.extend(a[..prefix].iter().map(|l| Change::unchanged(strip_eol(l))));
    diff_middle(&a[prefix..a.len() - suffix], &b[prefix..b.len() - suffix], &mut out);
    out.extend(a[a.len() - suffix..].iter().map(|l| Change::unchanged(strip_eol(l))));
    out
}

/// Only the added and removed lines of [`diff`].
pub fn changes(old: &str, new: &str) -> Vec<Change> {
    diff(old, new).into_iter().filter(Change::is_change).collect()
}

fn diff_middle(a: &[&str], b: &[&str], out: &mut Vec<Change>) {
    if a.len().saturating_mul(b.len()) > MAX_TABLE_CELLS {
        out.extend(a.iter().map(|l| Change::removed(strip_eol(l))));
        out.extend(b.iter().map(|l| Change::added(strip_eol(l))));
        return;
    }

    // lcs[i * w + j] = length of the longest common subsequence of a[i..] and b[j..]
    let w = b.len() + 1;
    let mut lcs = vec![0u32; (a.len() + 1) * w];
    for i in (0..a.len()).rev() {
        for j in (0..b.len()).rev() {
            lcs[i * w + j] = if a[i] == b[j] {
                lcs[(i + 1) * w + j + 1] + 1
            } else {
                lcs[(i + 1) * w + j].max(lcs[i * w + j + 1])
            };
        }
    }

    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        if a[i] == b[j] {
            out.push(Change::unchanged(strip_eol(a[i])));
            i += 1;
            j += 1;
        } else if lcs[(i + 1) * w + j] >= lcs[i * w + j + 1] {
            out.push(Change::removed(strip_eol(a[i])));
            i += 1;
        } else {
            out.push(Change::added(strip_eol(b[j])));
            j += 1;
        }
    }
    out.extend(a[i..].iter().map(|l| Change::removed(strip_eol(l))));
    out.extend(b[j..].iter().map(|l| Change::added(strip_eol(l))));
}

fn strip_eol(line: &str) -> &str {
    match line.strip_suffix('\n') {
        Some(line) => line.strip_suffix('\r').unwrap_or(line),
        None => line,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_is_sha1_hex() {
        assert_eq!(fingerprint(b""), "da39a3ee5e6b4b0d3255bfef95601890afd80709");
        assert_eq!(fingerprint(b"v1"), fingerprint(b"v1"));
        assert_ne!(fingerprint(b"v1"), fingerprint(b"v2"));
        assert_eq!(fingerprint(b"v1").len(), 40);
    }

    #[test]
    fn first_poll_is_not_a_change() {
        assert!(!has_changed(None, "abc"));
        assert!(!has_changed(Some("abc"), "abc"));
        assert!(has_changed(Some("abc"), "abd"));
    }

    #[test]
    fn single_line_replacement() {
        assert_eq!(changes("v1", "v2"), vec![Change::removed("v1"), Change::added("v2")]);
    }

    #[test]
    fn keeps_context_in_order() {
        let old = "title\nalpha\nbeta\nfooter";
        let new = "title\nalpha\ngamma\nbeta\nfooter";
        assert_eq!(
            diff(old, new),
            vec![
                Change::unchanged("title"),
                Change::unchanged("alpha"),
                Change::added("gamma"),
                Change::unchanged("beta"),
                Change::unchanged("footer"),
            ]
        );
    }

    #[test]
    fn interleaved_edits() {
        let old = "a\nb\nc\nd\ne";
        let new = "a\nx\nc\ne\nf";
        assert_eq!(
            changes(old, new),
            vec![
                Change::removed("b"),
                Change::added("x"),
                Change::removed("d"),
                Change::added("f"),
            ]
        );
    }

    #[test]
    fn identical_and_empty_inputs() {
        assert!(changes("same\ntext", "same\ntext").is_empty());
        assert_eq!(changes("", "new"), vec![Change::added("new")]);
        assert_eq!(changes("old", ""), vec![Change::removed("old")]);
        assert!(diff("", "").is_empty());
    }

    #[test]
    fn line_ending_only_change_is_reported() {
        assert!(has_changed(Some(&fingerprint(b"v1")), &fingerprint(b"v1\n")));
        assert_eq!(changes("v1", "v1\n"), vec![Change::removed("v1"), Change::added("v1")]);

        let crlf = changes("a\r\nb\r\n", "a\nb\n");
        assert_eq!(
            crlf,
            vec![
                Change::removed("a"),
                Change::removed("b"),
                Change::added("a"),
                Change::added("b"),
            ]
        );
    }

    #[test]
    fn line_endings_ignored_when_content_differs() {
        assert_eq!(
            changes("a\r\nb\r\n", "a\nc\n"),
            vec![Change::removed("b"), Change::added("c")]
        );
    }

    #[test]
    fn huge_inputs_fall_back_to_replace() {
        let old: String = (0..2100).map(|n| format!("o{n}\n")).collect();
        let new: String = (0..2100).map(|n| format!("n{n}\n")).collect();
        let out = changes(&old, &new);
        assert_eq!(out.len(), 4200);
        assert!(out[..2100].iter().all(|c| c.kind == freed_types::events::ChangeKind::Removed));
    }
}
