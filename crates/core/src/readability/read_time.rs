//! Reading time estimate from character count, language and image count.

use whatlang::Lang;

/// Minutes added for every image in the article.
const MINUTES_PER_IMAGE: f64 = 0.2;

/// Mean characters per minute and its standard deviation.
fn reading_speed(lang: Option<Lang>) -> (f64, f64) {
    match lang {
        Some(Lang::Ara) => (612.0, 88.0),
        Some(Lang::Nld) => (978.0, 143.0),
        Some(Lang::Fin) => (1078.0, 121.0),
        Some(Lang::Fra) => (998.0, 126.0),
        Some(Lang::Deu) => (920.0, 86.0),
        Some(Lang::Heb) => (833.0, 130.0),
        Some(Lang::Ita) => (950.0, 140.0),
        Some(Lang::Jpn) => (357.0, 56.0),
        Some(Lang::Pol) => (916.0, 126.0),
        Some(Lang::Por) => (913.0, 145.0),
        Some(Lang::Rus) => (986.0, 175.0),
        Some(Lang::Slv) => (885.0, 145.0),
        Some(Lang::Spa) => (1025.0, 127.0),
        Some(Lang::Swe) => (917.0, 156.0),
        Some(Lang::Tur) => (1054.0, 156.0),
        _ => (987.0, 188.0),
    }
}

/// Detected language of `text`, `None` when detection is unreliable.
pub fn detect_language(text: &str) -> Option<Lang> {
    whatlang::detect(text).filter(|info| info.is_reliable()).map(|info| info.lang())
}

/// `(min, max)` minutes to read `text` with `images` pictures.
///
/// Both bounds are rounded half up and never negative, and `min <= max`.
pub fn estimate_read_time(text: &str, images: usize) -> (i64, i64) {
    let chars = text.chars().count();
    if chars == 0 && images == 0 {
        return (0, 0);
    }

    let (mean, sd) = reading_speed(detect_language(text));
    let extra = images as f64 * MINUTES_PER_IMAGE;
    let round = |x: f64| ((x + 0.5).floor() as i64).max(0);

    let min = round(chars as f64 / (mean + sd) + extra);
    let max = round(chars as f64 / (mean - sd) + extra);
    (min, max.max(min))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_is_zero() {
        assert_eq!(estimate_read_time("", 0), (0, 0));
    }

    #[test]
    fn test_images_only() {
        assert_eq!(estimate_read_time("", 5), (1, 1));
    }

    #[test]
    fn test_english_bounds() {
        let text = "The quick brown fox jumps over the lazy dog. ".repeat(200);
        let (min, max) = estimate_read_time(&text, 0);
        assert_eq!(min, 8);
        assert_eq!(max, 11);
        assert!(min <= max);
    }

    #[test]
    fn test_unknown_language_falls_back_to_english() {
        assert_eq!(reading_speed(None), (987.0, 188.0));
        assert_eq!(reading_speed(Some(Lang::Jpn)), (357.0, 56.0));
    }
}
