//! Language index and code lookups.
//!
//! The table follows the canonical Whisper language-token order; the
//! language model's argmax indexes straight into it.

/// `(iso_639_1, english_name)` in Whisper token order.
pub(crate) const LANGUAGES: &[(&str, &str)] = &[
    ("en", "English"),
    ("zh", "Chinese"),
    ("de", "German"),
    ("es", "Spanish"),
    ("ru", "Russian"),
    ("ko", "Korean"),
    ("fr", "French"),
    ("ja", "Japanese"),
    ("pt", "Portuguese"),
    ("tr", "Turkish"),
    ("pl", "Polish"),
    ("ca", "Catalan"),
    ("nl", "Dutch"),
    ("ar", "Arabic"),
    ("sv", "Swedish"),
    ("it", "Italian"),
    ("id", "Indonesian"),
    ("hi", "Hindi"),
    ("fi", "Finnish"),
    ("vi", "Vietnamese"),
    ("he", "Hebrew"),
    ("uk", "Ukrainian"),
    ("el", "Greek"),
    ("ms", "Malay"),
    ("cs", "Czech"),
    ("ro", "Romanian"),
    ("da", "Danish"),
    ("hu", "Hungarian"),
    ("ta", "Tamil"),
    ("no", "Norwegian"),
    ("th", "Thai"),
    ("ur", "Urdu"),
    ("hr", "Croatian"),
    ("bg", "Bulgarian"),
    ("lt", "Lithuanian"),
    ("la", "Latin"),
    ("mi", "Maori"),
    ("cy", "Welsh"),
    ("sk", "Slovak"),
    ("te", "Telugu"),
    ("fa", "Persian"),
    ("lv", "Latvian"),
    ("bn", "Bengali"),
    ("sr", "Serbian"),
    ("az", "Azerbaijani"),
    ("sl", "Slovenian"),
    ("kn", "Kannada"),
    ("et", "Estonian"),
    ("mk", "Macedonian"),
    ("br", "Breton"),
    ("eu", "Basque"),
    ("is", "Icelandic"),
    ("hy", "Armenian"),
    ("ne", "Nepali"),
    ("mn", "Mongolian"),
    ("bs", "Bosnian"),
    ("kk", "Kazakh"),
    ("sq", "Albanian"),
    ("sw", "Swahili"),
    ("gl", "Galician"),
    ("mr", "Marathi"),
    ("pa", "Punjabi"),
    ("si", "Sinhala"),
    ("km", "Khmer"),
    ("sn", "Shona"),
    ("yo", "Yoruba"),
    ("so", "Somali"),
    ("af", "Afrikaans"),
    ("oc", "Occitan"),
    ("ka", "Georgian"),
    ("be", "Belarusian"),
    ("tg", "Tajik"),
    ("sd", "Sindhi"),
    ("gu", "Gujarati"),
    ("am", "Amharic"),
    ("yi", "Yiddish"),
    ("lo", "Lao"),
    ("uz", "Uzbek"),
    ("fo", "Faroese"),
    ("ht", "Haitian Creole"),
    ("ps", "Pashto"),
    ("tk", "Turkmen"),
    ("nn", "Nynorsk"),
    ("mt", "Maltese"),
    ("sa", "Sanskrit"),
    ("lb", "Luxembourgish"),
    ("my", "Myanmar"),
    ("bo", "Tibetan"),
    ("tl", "Tagalog"),
    ("mg", "Malagasy"),
    ("as", "Assamese"),
    ("tt", "Tatar"),
    ("haw", "Hawaiian"),
    ("ln", "Lingala"),
    ("ha", "Hausa"),
    ("ba", "Bashkir"),
    ("jw", "Javanese"),
    ("su", "Sundanese"),
];

/// `(code, name)` for a model output index. Indices past the table map to
/// `("lang<idx>", "Unknown")`.
pub(crate) fn language_for_index(idx: usize) -> (String, String) {
    match LANGUAGES.get(idx) {
        Some(&(code, name)) => (code.to_string(), name.to_string()),
        None => (format!("lang{idx}"), "Unknown".to_string()),
    }
}

/// The full `(code, name)` table, in model index order.
pub fn language_table() -> &'static [(&'static str, &'static str)] {
    LANGUAGES
}

/// English name for an ISO 639-1 code, when the code is in the table.
pub fn language_name(code: &str) -> Option<&'static str> {
    LANGUAGES
        .iter()
        .find(|&&(c, _)| c == code)
        .map(|&(_, name)| name)
}

/// Accent-region heuristic: Chinese reports Mandarin, everything else its
/// own language name.
pub(crate) fn accent_region_for(code: &str, name: &str) -> String {
    if code == "zh" {
        "Mandarin".to_string()
    } else {
        name.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_covers_whisper_prefix() {
        assert_eq!(LANGUAGES.len(), 98);
        assert_eq!(LANGUAGES[0], ("en", "English"));
        assert_eq!(LANGUAGES[1], ("zh", "Chinese"));
        assert_eq!(LANGUAGES[97], ("su", "Sundanese"));
    }

    #[test]
    fn index_lookup() {
        assert_eq!(
            language_for_index(4),
            ("ru".to_string(), "Russian".to_string())
        );
        assert_eq!(
            language_for_index(500),
            ("lang500".to_string(), "Unknown".to_string())
        );
    }

    #[test]
    fn reverse_lookup_covers_whole_table() {
        for &(code, name) in LANGUAGES {
            assert_eq!(language_name(code), Some(name));
        }
        assert_eq!(language_name("xx"), None);
    }

    #[test]
    fn accent_heuristic() {
        assert_eq!(accent_region_for("zh", "Chinese"), "Mandarin");
        assert_eq!(accent_region_for("fr", "French"), "French");
    }
}
