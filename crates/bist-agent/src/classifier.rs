//! Rule-based query classification: ticker extraction, intent category and
//! sector hint. Pure functions over ASCII-folded text.

use bist_data::text::{contains_phrase, contains_words, normalize, tokenize};
use bist_models::{QueryCategory, Sector, Ticker};

use self::Cue::{Stem, Word};

/// A category keyword. `Stem` matches as a prefix of the query token, so
/// suffixed nouns ("riskleri", "grafigi") still hit. `Word` must match the
/// whole token; it covers stems that also start common verbs or adverbs
/// ("destekler", "gelirse", "genellikle").
#[derive(Debug, Clone, Copy)]
enum Cue {
    Stem(&'static str),
    Word(&'static str),
}

impl Cue {
    fn matches(&self, tokens: &[String]) -> bool {
        match self {
            Cue::Stem(phrase) => contains_phrase(tokens, phrase),
            Cue::Word(phrase) => contains_words(tokens, phrase),
        }
    }
}

/// Keyword cues per category, checked in precedence order.
const CATEGORY_KEYWORDS: [(QueryCategory, &[Cue]); 7] = [
    (
        QueryCategory::Comparison,
        &[
            Stem("karsilastir"),
            Stem("kiyasla"),
            Word("vs"),
            Word("versus"),
            Stem("hangisi daha"),
            Stem("compare"),
        ],
    ),
    (
        QueryCategory::Fundamental,
        &[
            Stem("temel"),
            Stem("fundamental"),
            Stem("finansal"),
            Stem("bilanco"),
            Word("gelir"),
            Word("geliri"),
            Word("gelirleri"),
            Stem("gelir tablo"),
            Stem("karlilik"),
            Stem("mali tablo"),
        ],
    ),
    (
        QueryCategory::Technical,
        &[
            Stem("teknik"),
            Stem("technical"),
            Stem("rsi"),
            Stem("macd"),
            Stem("trend"),
            Stem("grafik"),
            Stem("grafig"),
            Stem("fiyat hareket"),
            Stem("hareketli ortalama"),
            Word("destek"),
            Word("destegi"),
            Stem("destek seviye"),
            Stem("destek noktas"),
            Stem("direnc"),
        ],
    ),
    (
        QueryCategory::Risk,
        &[Stem("risk"), Stem("volatilite"), Stem("oynaklik")],
    ),
    (
        QueryCategory::Macro,
        &[
            Stem("makro"),
            Stem("ekonomi"),
            Stem("faiz"),
            Stem("enflasyon"),
            Stem("tcmb"),
            Stem("merkez bankasi"),
            Stem("doviz"),
        ],
    ),
    (
        QueryCategory::Portfolio,
        &[
            Stem("model portfoy"),
            Stem("kurumsal"),
            Stem("analist"),
            Stem("hedef fiyat"),
            Stem("araci kurum"),
            Stem("tavsiye"),
        ],
    ),
    (
        QueryCategory::Comprehensive,
        &[
            Stem("kapsamli"),
            Stem("detayli"),
            Word("tum"),
            Word("tumu"),
            Word("genel"),
            Stem("genel gorunum"),
            Stem("comprehensive"),
        ],
    ),
];

const SECTOR_WORDS: [&str; 3] = ["sektor", "sector", "endustri"];

/// What the classifier extracted from a query.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub tickers: Vec<Ticker>,
    pub category: QueryCategory,
    pub sector: Option<Sector>,
}

impl Classification {
    pub fn primary_ticker(&self) -> Option<Ticker> {
        self.tickers.first().copied()
    }
}

/// Classify a free-text query. Never fails; unrecognized input yields
/// `QueryCategory::Unknown` with no tickers.
pub fn classify(query: &str) -> Classification {
    let tickers = extract_tickers(query);
    let tokens = tokenize(query);
    let sector = detect_sector(&tokens).or_else(|| tickers.first().map(|t| t.sector()));

    let keyword_category = CATEGORY_KEYWORDS
        .iter()
        .find(|(_, cues)| cues.iter().any(|cue| cue.matches(&tokens)))
        .map(|(category, _)| *category);

    let category = match keyword_category {
        Some(category) => category,
        None if SECTOR_WORDS.iter().any(|w| contains_phrase(&tokens, w)) => QueryCategory::Sector,
        None if tickers.len() >= 2 => QueryCategory::Comparison,
        None if !tickers.is_empty() => QueryCategory::Comprehensive,
        None if detect_sector(&tokens).is_some() => QueryCategory::Sector,
        None => QueryCategory::Unknown,
    };

    Classification {
        tickers,
        category,
        sector,
    }
}

/// Tickers named in the query, ordered by first occurrence, without duplicates.
/// A symbol matches where a token starts with it, so "GARAN'in", "garanti"
/// and "Şişecam" count but "kişisel" does not name SISE.
pub fn extract_tickers(query: &str) -> Vec<Ticker> {
    let folded = normalize(query);
    let mut found: Vec<(usize, Ticker)> = Ticker::ALL
        .iter()
        .filter_map(|ticker| {
            let symbol = ticker.symbol().to_lowercase();
            folded
                .match_indices(&symbol)
                .map(|(pos, _)| pos)
                .find(|&pos| starts_token(&folded, pos))
                .map(|pos| (pos, *ticker))
        })
        .collect();
    found.sort_by_key(|(pos, _)| *pos);
    found.into_iter().map(|(_, ticker)| ticker).collect()
}

fn starts_token(text: &str, pos: usize) -> bool {
    text[..pos]
        .chars()
        .next_back()
        .map_or(true, |c| !c.is_alphanumeric())
}

/// First sector whose vocabulary appears in the tokens.
fn detect_sector(tokens: &[String]) -> Option<Sector> {
    Sector::ALL
        .iter()
        .copied()
        .find(|sector| sector.keywords().iter().any(|k| contains_phrase(tokens, k)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn category(query: &str) -> QueryCategory {
        classify(query).category
    }

    #[test]
    fn fundamental_queries() {
        let result = classify("THYAO hissesi için temel analiz yap");
        assert_eq!(result.tickers, vec![Ticker::Thyao]);
        assert_eq!(result.category, QueryCategory::Fundamental);
        assert_eq!(category("AKBNK'nin finansal durumunu degerlendir"), QueryCategory::Fundamental);
        assert_eq!(category("SISE sirketinin mali tablolarini incele"), QueryCategory::Fundamental);
        assert_eq!(category("TUPRS'un karlilik durumu nasil?"), QueryCategory::Fundamental);
    }

    #[test]
    fn technical_queries() {
        assert_eq!(category("THYAO teknik analiz"), QueryCategory::Technical);
        assert_eq!(category("KCHOL'un fiyat trendi hakkinda bilgi ver"), QueryCategory::Technical);
        assert_eq!(category("EREGL RSI değeri kaç?"), QueryCategory::Technical);
    }

    #[test]
    fn comparison_beats_other_keywords() {
        let result = classify("AKBNK ve GARAN'ı karşılaştır");
        assert_eq!(result.category, QueryCategory::Comparison);
        assert_eq!(result.tickers, vec![Ticker::Akbnk, Ticker::Garan]);

        assert_eq!(
            category("THYAO ile TCELL teknik olarak hangisi daha guclu?"),
            QueryCategory::Comparison
        );
    }

    #[test]
    fn two_tickers_without_keywords_is_comparison() {
        assert_eq!(category("KCHOL SAHOL"), QueryCategory::Comparison);
    }

    #[test]
    fn single_ticker_without_keywords_is_comprehensive() {
        assert_eq!(category("BIMAS hakkinda ne dusunuyorsun?"), QueryCategory::Comprehensive);
    }

    #[test]
    fn macro_portfolio_risk_and_sector() {
        assert_eq!(category("Faiz kararlari borsayi nasil etkiler?"), QueryCategory::Macro);
        assert_eq!(category("Türkiye ekonomisi hisse senetlerini nasıl etkiler?"), QueryCategory::Macro);
        assert_eq!(category("Hangi araci kurumlar AKBNK'yi oneriyor?"), QueryCategory::Portfolio);
        assert_eq!(category("THYAO icin kurumsal yatirimcilar ne dusunuyor?"), QueryCategory::Portfolio);
        assert_eq!(category("TUPRS yatiriminin riskleri nelerdir?"), QueryCategory::Risk);
        assert_eq!(category("Havacilik sektorunun gorunumu nasil?"), QueryCategory::Sector);
    }

    #[test]
    fn sector_hint() {
        assert_eq!(classify("Enerji sektorundeki firsatlari degerlendir").sector, Some(Sector::Energy));
        assert_eq!(classify("Bankacilik hisseleri").sector, Some(Sector::Banking));
        assert_eq!(classify("Bankacilik hisseleri").category, QueryCategory::Sector);
        assert_eq!(classify("TCELL hakkinda").sector, Some(Sector::Telecom));
    }

    #[test]
    fn unknown_queries() {
        let result = classify("XYZABC hissesini analiz et");
        assert!(result.tickers.is_empty());
        assert_eq!(result.category, QueryCategory::Unknown);

        assert_eq!(category("Borsa"), QueryCategory::Unknown);
        assert_eq!(category(""), QueryCategory::Unknown);
    }

    #[test]
    fn tickers_are_deduplicated_in_order() {
        assert_eq!(
            extract_tickers("garan, akbnk ve yine GARAN"),
            vec![Ticker::Garan, Ticker::Akbnk]
        );
        assert_eq!(extract_tickers("Garanti Bankasi"), vec![Ticker::Garan]);
    }

    #[test]
    fn symbols_inside_other_words_are_ignored() {
        let result = classify("Kişisel portföyüm için hangi hisseler uygun?");
        assert!(result.tickers.is_empty());
        assert_eq!(result.sector, None);

        assert_eq!(extract_tickers("Şişecam ve kişisel tercihler"), vec![Ticker::Sise]);
        assert_eq!(extract_tickers("GARAN'in bilancosu"), vec![Ticker::Garan]);
    }

    #[test]
    fn verb_forms_do_not_trigger_categories() {
        let result = classify("Merkez bankasi faiz karari borsayi destekler mi?");
        assert_eq!(result.category, QueryCategory::Macro);
        assert_eq!(result.sector, Some(Sector::Banking));

        assert_eq!(category("TCMB faiz indirimi gelirse borsa ne olur?"), QueryCategory::Macro);
        assert_eq!(
            category("KCHOL ve SAHOL genellikle birlikte mi hareket eder?"),
            QueryCategory::Comparison
        );
    }

    #[test]
    fn noun_forms_still_match() {
        assert_eq!(category("THYAO destek ve direnc seviyeleri"), QueryCategory::Technical);
        assert_eq!(category("THYAO icin destek seviyesi nerede?"), QueryCategory::Technical);
        assert_eq!(category("BIMAS gelir tablosu nasil?"), QueryCategory::Fundamental);
        assert_eq!(category("TCELL geliri artiyor mu?"), QueryCategory::Fundamental);
        assert_eq!(category("EREGL genel durum"), QueryCategory::Comprehensive);
    }
}
