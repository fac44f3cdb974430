use crate::band::{Band, ClassMap};

/// Render one `fill` rule per non-empty band, in `Band::ALL` order.
pub fn generate(classes: &ClassMap) -> String {
    let mut css = String::new();
    for band in Band::ALL {
        let selectors: Vec<String> = classes.members(band).map(|code| format!(".{}", code)).collect();
        if selectors.is_empty() {
            continue;
        }
        css.push_str(&format!(
            "{} {{ fill:#{}; }}\n",
            selectors.join(", "),
            band.colour()
        ));
    }
    css
}
