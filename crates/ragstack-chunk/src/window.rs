use crate::char_len;

pub(crate) struct Window {
    /// Char offset of the window start in the source text.
    pub start: usize,
    pub text: String,
}

const STOPS: [char; 6] = ['.', '!', '?', '。', '！', '？'];

/// Fixed-size char windows advancing by `size - overlap`. Windows are trimmed
/// and blank ones dropped; the last one may be shorter than `size`.
///
/// With `snap` set, a window that does not reach the end of the text is cut
/// back to the last sentence stop (or else space) inside its overlap region,
/// so consecutive windows still cover the whole text.
pub(crate) fn sliding(text: &str, size: usize, overlap: usize, snap: bool) -> Vec<Window> {
    let size = size.max(1);
    let step = size.saturating_sub(overlap).max(1);
    let offsets: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
    let total = offsets.len();
    let byte_at = |ci: usize| if ci >= total { text.len() } else { offsets[ci] };

    let mut out = Vec::new();
    let mut start = 0;
    while start < total {
        let end = (start + size).min(total);
        let mut slice = &text[byte_at(start)..byte_at(end)];
        if snap && end < total {
            slice = snap_to_boundary(slice, step);
        }
        let trimmed = slice.trim();
        if !trimmed.is_empty() {
            out.push(Window { start, text: trimmed.to_string() });
        }
        if end >= total {
            break;
        }
        start += step;
    }
    out
}

/// Cut `slice` after its last stop, or before its last space, provided the
/// cut keeps at least `min_keep` chars.
fn snap_to_boundary(slice: &str, min_keep: usize) -> &str {
    let mut last_stop = None;
    let mut last_space = None;
    for (ci, (bi, c)) in slice.char_indices().enumerate() {
        if STOPS.contains(&c) {
            last_stop = Some((ci + 1, bi + c.len_utf8()));
        } else if c == ' ' {
            last_space = Some((ci, bi));
        }
    }
    match (last_stop, last_space) {
        (Some((kept, end)), _) if kept >= min_keep && kept < char_len(slice) => &slice[..end],
        (_, Some((kept, end))) if kept >= min_keep => &slice[..end],
        _ => slice,
    }
}
