/// Compress a free-form message into a single-line display title.
///
/// Newlines collapse to spaces; anything beyond `max` characters is cut and
/// marked with an ellipsis.
pub fn truncate_title(text: &str, max: usize) -> String {
    let flat = text
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");

    if flat.chars().count() <= max {
        flat
    } else {
        let mut cut: String = flat.chars().take(max).collect();
        cut.push('…');
        cut
    }
}
