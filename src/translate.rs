/// English label fragment → Spanish display name, checked in order.
pub const TRANSLATIONS: &[(&str, &str)] = &[
    ("Hammer", "Martillo"),
    ("Wrench", "Llave Inglesa"),
    ("Pliers", "Alicates"),
    ("Screwdriver", "Destornillador"),
    ("Hand Saw", "Sierra de Mano"),
    ("Electric Drill", "Taladro"),
    ("Utility Knife", "Cuchilla"),
    ("Chisel", "Cincel"),
    ("Mallet", "Mazo"),
    ("Clamp", "Prensa"),
];

/// Dataset noise stripped from labels that have no translation.
const FILLERS: &[&str] = &["AI Dataset", "Collection"];

/// Translates a class label for display.
///
/// The first table entry whose English fragment occurs anywhere in `label`
/// wins. Without a match the label is returned with the dataset fillers
/// removed and surrounding whitespace trimmed.
pub fn translate(label: &str) -> String {
    if let Some((_, spanish)) = TRANSLATIONS.iter().find(|(english, _)| label.contains(english)) {
        return spanish.to_string();
    }

    let mut cleaned = label.to_string();
    for filler in FILLERS {
        cleaned = cleaned.replace(filler, "");
    }
    cleaned.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::UNKNOWN_LABEL;

    #[test]
    fn substring_match() {
        assert_eq!(translate("Electric Drill Collection"), "Taladro");
        assert_eq!(translate("Claw Hammer AI Dataset"), "Martillo");
        assert_eq!(translate("Clamp"), "Prensa");
    }

    #[test]
    fn first_entry_wins() {
        // "Hammer" precedes "Mallet" in the table.
        assert_eq!(translate("Mallet Hammer"), "Martillo");
        assert_eq!(translate("Pliers and Wrench"), "Llave Inglesa");
    }

    #[test]
    fn match_is_case_sensitive() {
        assert_eq!(translate("hammer"), "hammer");
    }

    #[test]
    fn fallback_strips_fillers() {
        assert_eq!(translate("Rare Tool AI Dataset Collection"), "Rare Tool");
        assert_eq!(translate("  Level Collection "), "Level");
        assert_eq!(translate("Tape Measure"), "Tape Measure");
    }

    #[test]
    fn unknown_label_passes_through() {
        assert_eq!(translate(UNKNOWN_LABEL), UNKNOWN_LABEL);
    }
}
