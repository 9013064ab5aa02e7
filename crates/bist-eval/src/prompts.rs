//! Scoring prompts. Replies are parsed leniently; anything unparseable
//! becomes a null score rather than a default.

pub const SCORER_SYSTEM_PROMPT: &str = "Sen finansal analiz raporlarini tarafsiz bicimde \
degerlendiren bir degerlendiricisin. Yalnizca istenen formatta yanit ver.";

pub fn faithfulness_prompt(report: &str, context: &str) -> String {
    format!(
        "Verilen yanittaki iddialarin kaynaklar tarafindan desteklenip desteklenmedigini degerlendir.\n\n\
         Yanit:\n{report}\n\n\
         Kaynaklar:\n{context}\n\n\
         Her iddiayi kontrol et ve 0-1 arasi bir puan ver:\n\
         - 1.0: Tum iddialar kaynaklarda destekleniyor\n\
         - 0.5: Bazi iddialar destekleniyor, bazilari belirsiz\n\
         - 0.0: Iddialar kaynaklarda desteklenmiyor\n\n\
         Sadece sayisal puani ver (0 ile 1 arasi ondalikli sayi):"
    )
}

pub fn relevancy_prompt(query: &str, report: &str) -> String {
    format!(
        "Verilen yanitin soruyla ne kadar alakali oldugunu degerlendir.\n\n\
         Soru: {query}\n\n\
         Yanit: {report}\n\n\
         Alaka duzeyini 0-1 arasi puanla:\n\
         - 1.0: Yanit soruyu tam olarak cevapliyor\n\
         - 0.5: Yanit kismen alakali\n\
         - 0.0: Yanit alakasiz\n\n\
         Sadece sayisal puani ver:"
    )
}

pub fn context_relevance_prompt(query: &str, snippet: &str) -> String {
    format!(
        "Bu metin verilen soruyla alakali mi?\n\n\
         Soru: {query}\n\n\
         Metin: {snippet}\n\n\
         Sadece 'Evet' veya 'Hayir' yaz:"
    )
}

pub fn judge_prompt(query: &str, report: &str, sources: &str) -> String {
    format!(
        "Asagidaki hisse analiz raporunu degerlendir.\n\n\
         ## Kullanici Sorusu\n{query}\n\n\
         ## Uretilen Analiz\n{report}\n\n\
         ## Kullanilan Kaynaklar\n{sources}\n\n\
         ## Degerlendirme Kriterleri (her biri 1-5)\n\n\
         ### data_accuracy (Veri Dogrulugu)\n\
         5: Tum rakamlar dogru ve kaynaktan dogrulanabilir. 3: Cogu dogru, bazi hatalar. 1: Ciddi veri hatalari.\n\n\
         ### analysis_depth (Analiz Kapsami)\n\
         5: Makro, temel, teknik ve kurumsal boyutlar tam. 3: En az iki boyut yeterli derinlikte. 1: Cok eksik.\n\n\
         ### reasoning_quality (Muhakeme Kalitesi)\n\
         5: Veriden sonuca net mantik zinciri. 3: Temel muhakeme, bazi atlamalar. 1: Sonuclar desteksiz.\n\n\
         ### investor_usefulness (Yatirimci Icin Fayda)\n\
         5: Karar vermeye yardimci somut icgoruler. 3: Genel bilgi, aksiyon belirsiz. 1: Katkisi minimal.\n\n\
         ### presentation_quality (Sunum Kalitesi)\n\
         5: Net yapi, profesyonel format. 3: Anlasilir ama daginik. 1: Okunamaz.\n\n\
         ## Yanit Formati\n\
         SADECE su JSON formatinda yanit ver:\n\n\
         {{\n\
         \x20 \"data_accuracy\": {{\"score\": <1-5>, \"reasoning\": \"<kisa aciklama>\"}},\n\
         \x20 \"analysis_depth\": {{\"score\": <1-5>, \"reasoning\": \"<kisa aciklama>\"}},\n\
         \x20 \"reasoning_quality\": {{\"score\": <1-5>, \"reasoning\": \"<kisa aciklama>\"}},\n\
         \x20 \"investor_usefulness\": {{\"score\": <1-5>, \"reasoning\": \"<kisa aciklama>\"}},\n\
         \x20 \"presentation_quality\": {{\"score\": <1-5>, \"reasoning\": \"<kisa aciklama>\"}},\n\
         \x20 \"strengths\": [\"<guclu yon>\"],\n\
         \x20 \"weaknesses\": [\"<zayif yon>\"]\n\
         }}"
    )
}

/// First `max_chars` characters of `text`, never splitting a character.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
