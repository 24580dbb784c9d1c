//! Slug generation for article titles.
//!
//! Titles are transliterated (Cyrillic to Latin), lowercased and reduced to
//! `a-z0-9-` with collapsing separators. Slugs are not unique; articles are
//! addressed by id.

const SLUG_MAX: usize = 96;
const FALLBACK_SLUG: &str = "article";

/// Builds a URL-safe slug from a title.
/// Falls back to `article` when nothing usable survives normalization.
pub(super) fn slugify(title: &str) -> String {
    let mut slug = String::new();
    let mut prev_dash = false;
    for ch in title.trim().to_lowercase().chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch);
            prev_dash = false;
        } else if let Some(latin) = transliterate(ch) {
            slug.push_str(latin);
            prev_dash = false;
        } else if !prev_dash {
            slug.push('-');
            prev_dash = true;
        }
    }

    let truncated: String = slug.trim_matches('-').chars().take(SLUG_MAX).collect();
    let normalized = truncated.trim_matches('-');
    if normalized.is_empty() {
        FALLBACK_SLUG.to_string()
    } else {
        normalized.to_string()
    }
}

/// Latin spelling of a lowercase Cyrillic letter. Soft and hard signs map to
/// an empty string so they vanish without splitting the word.
fn transliterate(ch: char) -> Option<&'static str> {
    let latin = match ch {
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
        'й' => "j",
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
        'ц' => "c",
        'ч' => "ch",
        'ш' => "sh",
        'щ' => "shch",
        'ъ' | 'ь' => "",
        'ы' => "y",
        'э' => "e",
        'ю' => "yu",
        'я' => "ya",
        _ => return None,
    };
    Some(latin)
}
