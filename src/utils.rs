use std::fmt::Write;

/// Join the `Display` form of every item with `delim` in between, as in `a b c` for atoms or
/// `1,2,3` for a number list.
pub(crate) fn iter_join<I, T>(iter: I, delim: &str) -> String
where
    I: IntoIterator<Item = T>,
    T: std::fmt::Display,
{
    let mut out = String::new();
    for (i, item) in iter.into_iter().enumerate() {
        if i > 0 {
            out.push_str(delim);
        }
        let _ = write!(out, "{}", item);
    }
    out
}
