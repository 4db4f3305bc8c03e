//! ISO 639 language code handling.

/// Two-letter languages the OCR ripper has models for.
const OCR_LANGUAGES: &[&str] = &[
    "en", "es", "fr", "de", "it", "pt", "ja", "zh", "ko", "ru", "ar", "nl", "sv", "da", "no", "fi",
    "pl", "tr", "th", "vi", "hu", "cs", "el", "he", "hi", "id", "ms", "ro", "uk", "bg", "hr", "sk",
    "sl", "sr", "ca", "eu", "gl", "lt", "lv", "et", "is", "mt", "cy", "ga",
];

/// Map an ISO 639-2 code (terminologic or bibliographic) to ISO 639-1.
///
/// `und` maps to `un`. Unknown codes return `None`.
pub fn normalize_lang_code(lang3: &str) -> Option<&'static str> {
    let code = match lang3.to_ascii_lowercase().as_str() {
        "eng" => "en",
        "spa" => "es",
        "fre" | "fra" => "fr",
        "deu" | "ger" => "de",
        "ita" => "it",
        "por" => "pt",
        "jpn" => "ja",
        "chi" | "zho" => "zh",
        "kor" => "ko",
        "rus" => "ru",
        "ara" => "ar",
        "nld" | "dut" => "nl",
        "swe" => "sv",
        "dan" => "da",
        "nor" => "no",
        "fin" => "fi",
        "pol" => "pl",
        "tur" => "tr",
        "tha" => "th",
        "vie" => "vi",
        "hun" => "hu",
        "ces" | "cze" => "cs",
        "ell" | "gre" => "el",
        "heb" => "he",
        "hin" => "hi",
        "ind" => "id",
        "msa" | "may" => "ms",
        "ron" | "rum" => "ro",
        "ukr" => "uk",
        "bul" => "bg",
        "hrv" => "hr",
        "slk" | "slo" => "sk",
        "slv" => "sl",
        "srp" => "sr",
        "cat" => "ca",
        "eus" | "baq" => "eu",
        "glg" => "gl",
        "lit" => "lt",
        "lav" => "lv",
        "est" => "et",
        "isl" | "ice" => "is",
        "mlt" => "mt",
        "cym" | "wel" => "cy",
        "gle" | "iri" => "ga",
        "und" => "un",
        _ => return None,
    };
    Some(code)
}

/// Whether a two-letter code has an OCR model.
pub fn is_ocr_language(lang2: &str) -> bool {
    OCR_LANGUAGES.contains(&lang2.to_ascii_lowercase().as_str())
}
