use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

const ELLIPSIS: &str = "...";

/// Rewrites arbitrary text into a transport-safe payload for SMS: accents are
/// stripped via NFD decomposition, `ñ`/`Ñ` are mapped to `n`/`N`, everything
/// outside the printable 7-bit range is dropped, and the result is truncated
/// to `max_len` with a 3-character ellipsis marker when it does not fit.
///
/// Pure function, no I/O. Empty input yields an empty string.
pub fn sanitize_for_sms(text: &str, max_len: usize) -> String {
    let cleaned: String = text
        .replace('ñ', "n")
        .replace('Ñ', "N")
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .filter(|c| (' '..='~').contains(c))
        .collect();

    // Everything left is single-byte ASCII, so byte indexing is safe.
    if cleaned.len() <= max_len {
        return cleaned;
    }
    if max_len <= ELLIPSIS.len() {
        return cleaned[..max_len].to_string();
    }
    format!("{}{}", &cleaned[..max_len - ELLIPSIS.len()], ELLIPSIS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_accents_and_enye() {
        assert_eq!(sanitize_for_sms("Ñandú", 10), "Nandu");
        assert_eq!(sanitize_for_sms("José María Pérez", 30), "Jose Maria Perez");
        assert_eq!(sanitize_for_sms("señal de pánico", 30), "senal de panico");
    }

    #[test]
    fn drops_non_printable_and_non_latin() {
        assert_eq!(sanitize_for_sms("alerta 🚨 SOS", 30), "alerta  SOS");
        assert_eq!(sanitize_for_sms("位置情報", 30), "");
        assert_eq!(sanitize_for_sms("line\nbreak\ttab", 30), "linebreaktab");
    }

    #[test]
    fn truncates_with_ellipsis_marker() {
        let long = "A".repeat(50);
        assert_eq!(sanitize_for_sms(&long, 10), "AAAAAAA...");
    }

    #[test]
    fn never_exceeds_budget() {
        let inputs = [
            "",
            "short",
            "Ñoño güero 🚨 con acentos y más texto del que cabe en el presupuesto",
            "plain ascii that is fairly long and should get cut somewhere sensible",
        ];
        for text in inputs {
            for max_len in 0..40 {
                let out = sanitize_for_sms(text, max_len);
                assert!(
                    out.len() <= max_len,
                    "len {} > budget {} for {:?}",
                    out.len(),
                    max_len,
                    text
                );
            }
        }
    }

    #[test]
    fn idempotent_on_clean_ascii_within_budget() {
        let text = "Help me at 5th avenue";
        let once = sanitize_for_sms(text, 40);
        assert_eq!(once, text);
        assert_eq!(sanitize_for_sms(&once, 40), once);
    }

    #[test]
    fn empty_input_yields_empty_string() {
        assert_eq!(sanitize_for_sms("", 10), "");
        assert_eq!(sanitize_for_sms("", 0), "");
    }

    #[test]
    fn tiny_budgets_truncate_without_marker() {
        assert_eq!(sanitize_for_sms("ABCDEF", 3), "ABC");
        assert_eq!(sanitize_for_sms("ABCDEF", 2), "AB");
        assert_eq!(sanitize_for_sms("ABCDEF", 0), "");
    }
}
