//! Named output sizes.

/// A named output size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputPreset {
    pub name: &'static str,
    pub width: u32,
    pub height: u32,
    pub description: &'static str,
}

impl OutputPreset {
    pub const fn new(
        name: &'static str,
        width: u32,
        height: u32,
        description: &'static str,
    ) -> Self {
        Self {
            name,
            width,
            height,
            description,
        }
    }

    pub const fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

static PRESETS: [OutputPreset; 7] = [
    OutputPreset::new("ID Photo", 354, 472, "3:4 identity photo, cascade default"),
    OutputPreset::new("Portrait", 480, 600, "4:5 portrait, neural default"),
    OutputPreset::new("Passport", 413, 531, "35×45 mm passport photo at 300 dpi"),
    OutputPreset::new("Square", 512, 512, "Square headshot"),
    OutputPreset::new("Avatar", 256, 256, "Small square avatar"),
    OutputPreset::new("LinkedIn", 400, 400, "Square profile photo"),
    OutputPreset::new("Instagram", 1080, 1080, "Square post"),
];

pub fn standard_presets() -> &'static [OutputPreset] {
    &PRESETS
}

/// Look a preset up ignoring case, spaces, dashes and underscores.
pub fn preset_by_name(name: &str) -> Option<OutputPreset> {
    let key = normalize_name(name);
    standard_presets()
        .iter()
        .find(|preset| normalize_name(preset.name) == key)
        .copied()
}

fn normalize_name(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detector_defaults_are_presets() {
        assert_eq!(preset_by_name("id-photo").map(|p| p.size()), Some((354, 472)));
        assert_eq!(preset_by_name("portrait").map(|p| p.size()), Some((480, 600)));
    }

    #[test]
    fn lookup_ignores_spacing_and_case() {
        assert!(preset_by_name("ID_PHOTO").is_some());
        assert!(preset_by_name(" linked in ").is_some());
        assert!(preset_by_name("billboard").is_none());
    }

    #[test]
    fn presets_have_positive_sizes_and_unique_names() {
        let presets = standard_presets();
        for (i, preset) in presets.iter().enumerate() {
            assert!(preset.width > 0 && preset.height > 0, "{}", preset.name);
            for other in &presets[i + 1..] {
                assert_ne!(normalize_name(preset.name), normalize_name(other.name));
            }
        }
    }
}
