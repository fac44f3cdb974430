use crate::error::{MapError, Result};

pub const STYLE_ANCHOR: &str = "</style>";

/// Splice `fragment` into `base` right before the first `</style>`.
pub fn compose(base: &str, fragment: &str) -> Result<String> {
    let anchor = base.find(STYLE_ANCHOR).ok_or(MapError::MissingStyleAnchor)?;

    let mut document = String::with_capacity(base.len() + fragment.len() + 1);
    document.push_str(&base[..anchor]);
    document.push_str(fragment);
    document.push('\n');
    document.push_str(&base[anchor..]);
    Ok(document)
}
