// Language Detection
// Whole-text language identification, reported as ISO 639-1 where one exists

use thiserror::Error;
use whatlang::Lang;

pub const UNKNOWN_LANGUAGE: &str = "unknown";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum LanguageError {
    #[error("no language features in text")]
    Undetectable,
}

/// Detect the dominant language of `text`.
///
/// Blank text is `"unknown"`. Text that has content but nothing the detector can
/// work with (digits, symbols) is an error, not a guess.
pub fn detect_language(text: &str) -> Result<String, LanguageError> {
    if text.trim().is_empty() {
        return Ok(UNKNOWN_LANGUAGE.to_string());
    }

    let info = whatlang::detect(text).ok_or(LanguageError::Undetectable)?;
    Ok(iso_code(info.lang()).to_string())
}

fn iso_code(lang: Lang) -> &'static str {
    match lang {
        Lang::Eng => "en",
        Lang::Spa => "es",
        Lang::Fra => "fr",
        Lang::Deu => "de",
        Lang::Ita => "it",
        Lang::Por => "pt",
        Lang::Nld => "nl",
        Lang::Swe => "sv",
        Lang::Pol => "pl",
        Lang::Tur => "tr",
        Lang::Rus => "ru",
        Lang::Ukr => "uk",
        Lang::Ara => "ar",
        Lang::Hin => "hi",
        Lang::Cmn => "zh",
        Lang::Jpn => "ja",
        Lang::Kor => "ko",
        Lang::Vie => "vi",
        other => other.code(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_text_is_unknown() {
        assert_eq!(detect_language("").unwrap(), "unknown");
        assert_eq!(detect_language("  \n\t").unwrap(), "unknown");
    }

    #[test]
    fn test_common_languages() {
        let en = "The committee reviewed the proposal and decided to fund the research project next year.";
        let fr = "Le comité a examiné la proposition et a décidé de financer le projet de recherche l'année prochaine.";
        let de = "Der Ausschuss hat den Vorschlag geprüft und beschlossen, das Forschungsprojekt im nächsten Jahr zu finanzieren.";
        assert_eq!(detect_language(en).unwrap(), "en");
        assert_eq!(detect_language(fr).unwrap(), "fr");
        assert_eq!(detect_language(de).unwrap(), "de");
    }

    #[test]
    fn test_symbols_only_is_an_error() {
        assert_eq!(
            detect_language("12345 678 !!! ???"),
            Err(LanguageError::Undetectable)
        );
    }
}
