use std::cmp::Ordering;

/// Sort lines case-insensitively; ties fall back to byte order so output is stable.
pub fn sort_case_insensitive(lines: &mut [String]) {
    lines.sort_by(|a, b| {
        let ord = a.to_lowercase().cmp(&b.to_lowercase());
        if ord == Ordering::Equal {
            a.cmp(b)
        } else {
            ord
        }
    });
}

/// Length as Telegram counts it: UTF-16 code units.
pub fn message_len(s: &str) -> usize {
    s.encode_utf16().count()
}

/// Pack lines into newline-joined messages of at most `limit` UTF-16 units each.
///
/// A line longer than `limit` on its own is split on character boundaries.
pub fn chunk_lines<S: AsRef<str>>(lines: &[S], limit: usize) -> Vec<String> {
    let limit = limit.max(2);
    let mut out = Vec::new();
    let mut buf = String::new();
    let mut buf_len = 0usize;

    for line in lines {
        let line = line.as_ref();
        let line_len = message_len(line);

        if line_len > limit {
            if !buf.is_empty() {
                out.push(std::mem::take(&mut buf));
                buf_len = 0;
            }
            out.extend(split_long_line(line, limit));
            continue;
        }

        if !buf.is_empty() && buf_len + 1 + line_len > limit {
            out.push(std::mem::take(&mut buf));
            buf_len = 0;
        }

        if !buf.is_empty() {
            buf.push('\n');
            buf_len += 1;
        }
        buf.push_str(line);
        buf_len += line_len;
    }

    if !buf.is_empty() {
        out.push(buf);
    }
    out
}

fn split_long_line(line: &str, limit: usize) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut piece = String::new();
    let mut piece_len = 0usize;

    for ch in line.chars() {
        let ch_len = ch.len_utf16();
        if piece_len + ch_len > limit {
            pieces.push(std::mem::take(&mut piece));
            piece_len = 0;
        }
        piece.push(ch);
        piece_len += ch_len;
    }
    if !piece.is_empty() {
        pieces.push(piece);
    }
    pieces
}

const ELLIPSIS: &str = "...";

/// Cut `s` to at most `max_len` characters, ending in "..." when shortened.
pub fn truncate_text(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        return s.to_string();
    }
    let keep = max_len.saturating_sub(ELLIPSIS.len());
    let mut out = s.chars().take(keep).collect::<String>();
    out.push_str(ELLIPSIS);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sorts_ignoring_case() {
        let mut lines = vec![
            "beta:true".to_string(),
            "Alpha:false".to_string(),
            "alpha:true".to_string(),
            "Gamma:true".to_string(),
        ];
        sort_case_insensitive(&mut lines);
        assert_eq!(
            lines,
            vec!["Alpha:false", "alpha:true", "beta:true", "Gamma:true"]
        );
    }

    #[test]
    fn short_output_stays_in_one_message() {
        let chunks = chunk_lines(&["a:true", "b:false"], 100);
        assert_eq!(chunks, vec!["a:true\nb:false".to_string()]);
        assert!(chunk_lines::<&str>(&[], 100).is_empty());
    }

    #[test]
    fn long_output_is_split_within_budget_without_losing_lines() {
        let mut lines: Vec<String> = (0..300).map(|i| format!("PC-{i:03}:true")).collect();
        sort_case_insensitive(&mut lines);
        let limit = 200;

        let chunks = chunk_lines(&lines, limit);
        assert!(chunks.len() >= 2);
        assert!(chunks.iter().all(|c| c.chars().count() <= limit));

        let rejoined: Vec<&str> = chunks.iter().flat_map(|c| c.split('\n')).collect();
        assert_eq!(rejoined, lines.iter().map(String::as_str).collect::<Vec<_>>());
    }

    #[test]
    fn exact_fit_does_not_flush_early() {
        // "aaaa\nbbbb" is exactly 9 chars.
        let chunks = chunk_lines(&["aaaa", "bbbb", "c"], 9);
        assert_eq!(chunks, vec!["aaaa\nbbbb".to_string(), "c".to_string()]);
    }

    #[test]
    fn oversized_line_is_split_on_char_boundaries() {
        let chunks = chunk_lines(&["ok", "ééééé", "tail"], 2);
        assert_eq!(chunks, vec!["ok", "éé", "éé", "é", "ta", "il"]);
    }

    #[test]
    fn budget_counts_utf16_units_for_astral_names() {
        let lines: Vec<String> = (0..1000).map(|i| format!("😀😀😀{i:04}:true")).collect();
        let limit = 4000;

        let chunks = chunk_lines(&lines, limit);
        assert!(chunks.iter().all(|c| message_len(c) <= limit));

        let rejoined: Vec<&str> = chunks.iter().flat_map(|c| c.split('\n')).collect();
        assert_eq!(rejoined, lines.iter().map(String::as_str).collect::<Vec<_>>());
    }

    #[test]
    fn oversized_astral_line_never_splits_a_surrogate_pair() {
        let chunks = chunk_lines(&["😀😀😀"], 3);
        assert_eq!(chunks, vec!["😀", "😀", "😀"]);
        assert!(chunks.iter().all(|c| message_len(c) <= 3));
    }

    #[test]
    fn truncate_text_adds_ellipsis() {
        assert_eq!(truncate_text("short", 10), "short");
        assert_eq!(truncate_text("abcdefghij", 6), "abc...");
        assert_eq!(truncate_text("abcdefghij", 10), "abcdefghij");

        let long = "x".repeat(500);
        let cut = truncate_text(&long, 200);
        assert_eq!(cut.chars().count(), 200);
        assert!(cut.ends_with("..."));
    }
}
