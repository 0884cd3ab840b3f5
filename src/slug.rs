use std::collections::HashSet;

/// Builds a URL-safe Latin slug from a (possibly Cyrillic) name.
///
/// Whitespace runs become a single dash, anything outside
/// `[a-z0-9-_]` after transliteration is dropped, repeated dashes are
/// squeezed, and an empty result falls back to `"item"`.
pub fn transliterate(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prev_dash = false;
    for ch in text.to_lowercase().chars() {
        let mapped = match ch {
            'а' => "a",
            'б' => "b",
            'в' => "v",
            'г' => "g",
            'д' => "d",
            'е' => "e",
            'ё' => "yo",
            'ж' => "zh",
            'з' => "z",
            'и' => "i",
            'й' => "y",
            'к' => "k",
            'л' => "l",
            'м' => "m",
            'н' => "n",
            'о' => "o",
            'п' => "p",
            'р' => "r",
            'с' => "s",
            'т' => "t",
            'у' => "u",
            'ф' => "f",
            'х' => "h",
            'ц' => "ts",
            'ч' => "ch",
            'ш' => "sh",
            'щ' => "sch",
            'ъ' | 'ь' => "",
            'ы' => "y",
            'э' => "e",
            'ю' => "yu",
            'я' => "ya",
            _ => "",
        };
        if !mapped.is_empty() {
            out.push_str(mapped);
            prev_dash = false;
            continue;
        }
        if ch.is_ascii_alphanumeric() || ch == '_' {
            out.push(ch);
            prev_dash = false;
            continue;
        }
        if (ch.is_whitespace() || ch == '-') && !prev_dash && !out.is_empty() {
            out.push('-');
            prev_dash = true;
        }
    }
    while out.ends_with('-') {
        out.pop();
    }
    if out.is_empty() {
        return "item".to_string();
    }
    out
}

/// Derives a slug unique against `existing`, suffixing `-1`, `-2`, …
/// when the base form is already taken.
pub fn generate_slug<S: AsRef<str>>(text: &str, existing: &[S]) -> String {
    let taken: HashSet<&str> = existing.iter().map(|s| s.as_ref()).collect();
    let base = transliterate(text);
    if !taken.contains(base.as_str()) {
        return base;
    }
    let mut counter = 1usize;
    loop {
        let candidate = format!("{base}-{counter}");
        if !taken.contains(candidate.as_str()) {
            return candidate;
        }
        counter += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transliterates_cyrillic_names() {
        assert_eq!(transliterate("Воздушный фильтр Bosch"), "vozdushnyy-filtr-bosch");
        assert_eq!(transliterate("Моторные масла"), "motornye-masla");
        assert_eq!(transliterate("Щётки"), "schyotki");
    }

    #[test]
    fn squeezes_dashes_and_trims() {
        assert_eq!(transliterate("  Тормозная --- система  "), "tormoznaya-sistema");
        assert_eq!(transliterate("5W-30 (5л)"), "5w-30-5l");
    }

    #[test]
    fn falls_back_when_nothing_survives() {
        assert_eq!(transliterate("!!!"), "item");
        assert_eq!(transliterate(""), "item");
    }

    #[test]
    fn suffixes_until_unique() {
        let existing = vec!["filtry".to_string(), "filtry-1".to_string()];
        assert_eq!(generate_slug("Фильтры", &existing), "filtry-2");
        assert_eq!(generate_slug("Подвеска", &existing), "podveska");
    }
}
