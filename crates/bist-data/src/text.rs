//! Text folding shared by query classification and document retrieval.

/// Lowercase and fold Turkish letters to ASCII so that "Karşılaştır" and
/// "karsilastir" compare equal.
pub fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            'ç' | 'Ç' => out.push('c'),
            'ğ' | 'Ğ' => out.push('g'),
            'ı' | 'I' | 'İ' => out.push('i'),
            'ö' | 'Ö' => out.push('o'),
            'ş' | 'Ş' => out.push('s'),
            'ü' | 'Ü' => out.push('u'),
            'â' | 'Â' => out.push('a'),
            other => out.extend(other.to_lowercase()),
        }
    }
    out
}

/// Split normalized text into alphanumeric tokens. Apostrophes split
/// suffixes off proper nouns ("GARAN'i" -> "garan", "i").
pub fn tokenize(text: &str) -> Vec<String> {
    normalize(text)
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Truncate a token to its first five characters, a cheap stemmer that works
/// well for agglutinative Turkish ("bankacilik" and "bankalar" share "banka").
pub fn stem(token: &str) -> String {
    token.chars().take(5).collect()
}

/// True when the consecutive-token `phrase` occurs in `tokens`, comparing
/// every phrase word as a prefix of the token at that position.
pub fn contains_phrase(tokens: &[String], phrase: &str) -> bool {
    let words: Vec<&str> = phrase.split_whitespace().collect();
    if words.is_empty() || words.len() > tokens.len() {
        return false;
    }
    tokens.windows(words.len()).any(|window| {
        window
            .iter()
            .zip(&words)
            .all(|(token, word)| token.starts_with(word))
    })
}

/// Like [`contains_phrase`] but every phrase word must equal its token.
pub fn contains_words(tokens: &[String], phrase: &str) -> bool {
    let words: Vec<&str> = phrase.split_whitespace().collect();
    if words.is_empty() || words.len() > tokens.len() {
        return false;
    }
    tokens
        .windows(words.len())
        .any(|window| window.iter().zip(&words).all(|(token, word)| token == word))
}
