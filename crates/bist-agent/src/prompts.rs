use bist_models::{AgentState, PromptingMode, ToolResult};

const BASE_SYSTEM_PROMPT: &str = "Sen Borsa Istanbul (BIST) hisseleri konusunda uzman bir arastirma \
analistisin. Gorevin bireysel yatirimcilara karar destegi saglamaktir; yatirim tavsiyesi vermezsin.\n\n\
## Analiz Boyutlari\n\n\
Kapsamli bir analizde su boyutlari degerlendir:\n\
- **Makroekonomi**: politika faizi, enflasyon, doviz kuru, sektor gorunumu\n\
- **Temel Analiz**: F/K, PD/DD, karlilik, piyasa degeri, temettu\n\
- **Teknik Analiz**: trend, RSI, hareketli ortalamalar, MACD, destek/direnc\n\
- **Kurumsal Gorusler**: model portfoyler, hedef fiyatlar, AL/TUT/SAT dagilimi\n\n\
## Kurallar\n\n\
- AL/SAT tavsiyesi VERME, yalnizca analiz sun\n\
- Her iddiayi sana verilen verilere ve dokumanlara dayandir; veri uydurma\n\
- Verilerin tarihini ve kaynagini belirt\n\
- Eksik veya basarisiz veri kaynaklarini acikca belirt\n\
- Belirsizlikleri gizleme\n\
- Turkce yanit ver\n\n\
## Cikti Formati\n\n\
Markdown kullan ve su sirayi izle:\n\
1. Ozet\n\
2. Detayli analiz (boyutlara gore)\n\
3. Riskler ve dikkat edilecek noktalar\n\
4. Kaynaklar\n";

/// A worked query and report used to steer the report format.
#[derive(Debug, Clone, Copy)]
pub struct FewShotExample {
    pub query: &'static str,
    pub response: &'static str,
}

pub const FEW_SHOT_EXAMPLES: [FewShotExample; 3] = [
    FewShotExample {
        query: "THYAO hissesi icin temel analiz yap",
        response: "# THYAO Temel Analiz Raporu\n\n\
## Ozet\n\
Turk Hava Yollari havacilik sektorunun lider sirketidir. F/K orani sektor ortalamasinin \
altinda kalmakta, bu da degerlemenin temkinli fiyatlandigina isaret etmektedir.\n\n\
## Temel Gostergeler\n\
- **Guncel Fiyat**: 265.40 TL\n\
- **F/K**: 5.2 (sektor ortalamasi 8.5)\n\
- **PD/DD**: 1.8\n\
- **Piyasa Degeri**: 365 milyar TL\n\n\
## Degerlendirme\n\
Guclu nakit akisi ve yolcu sayisindaki artis olumlu sinyallerdir; dusuk carpanlar piyasanin \
buyume beklentisini sinirli fiyatladigini gostermektedir.\n\n\
## Riskler\n\
- Yakit maliyeti dalgalanmalari\n\
- Doviz kuru riski\n\
- Jeopolitik belirsizlikler\n\n\
## Kaynaklar\n\
- Piyasa verisi anlik goruntusu\n\
- Sirket finansal tablolari\n",
    },
    FewShotExample {
        query: "Bankacilik sektoru makroekonomik acidan nasil etkilenir?",
        response: "# Bankacilik Sektoru Makroekonomik Analiz\n\n\
## Ozet\n\
Yuksek faiz ortami bankacilik sektoru icin karisik etkiler yaratmaktadir: net faiz marji \
genislerken kredi buyumesi yavaslamaktadir.\n\n\
## Makroekonomik Gostergeler\n\
- **TCMB Politika Faizi**: %45\n\
- **Yillik TUFE**: %44.4\n\
- **USD/TRY**: 35.2\n\n\
## Sektore Etkiler\n\
### Olumlu\n\
- Mevduat maliyetleri politika faizinin altinda kalabilir\n\
- TL mevduata donus suruyor\n\n\
### Olumsuz\n\
- Kredi talebi baski altinda\n\
- Aktif kalitesi riskleri\n\n\
## Dikkat Edilecekler\n\
Faiz indirim dongusunun baslamasi sektor dinamiklerini degistirebilir.\n\n\
## Kaynaklar\n\
- TCMB verileri\n\
- Sektor raporlari\n",
    },
    FewShotExample {
        query: "EREGL hissesinin teknik gorunumu nasil?",
        response: "# EREGL Teknik Gorunum\n\n\
## Ozet\n\
Fiyat 20 gunluk ortalamanin uzerinde islem gormekte ve kisa vadeli trend yukari yonlu \
gorunmektedir. RSI notr bolgededir.\n\n\
## Gostergeler\n\
- **RSI (14)**: 56.3 (notr)\n\
- **SMA 20 / SMA 50**: 47.10 / 45.80 TL\n\
- **MACD**: sinyal cizgisinin uzerinde\n\
- **Destek / Direnc**: 45.20 / 49.60 TL\n\n\
## Degerlendirme\n\
Kisa vadeli ortalamanin uzun vadeli ortalamanin uzerinde olmasi yukselis egilimini \
desteklemektedir; direnc seviyesine yakinlik kar satislarina yol acabilir.\n\n\
## Riskler\n\
- Kuresel celik fiyatlarindaki dusus\n\
- Teknik gostergeler gecmis fiyatlara dayanir, gelecegi garanti etmez\n\n\
## Kaynaklar\n\
- Gunluk kapanis fiyatlari uzerinden hesaplanan gostergeler\n",
    },
];

/// Worked examples included for a prompting mode.
pub fn examples_for(mode: PromptingMode) -> &'static [FewShotExample] {
    match mode {
        PromptingMode::ZeroShot => &[],
        PromptingMode::OneShot => &FEW_SHOT_EXAMPLES[..1],
        PromptingMode::FewShot => &FEW_SHOT_EXAMPLES[..],
    }
}

/// System prompt for report synthesis, with worked examples for the mode.
pub fn system_prompt(mode: PromptingMode) -> String {
    let examples = examples_for(mode);
    if examples.is_empty() {
        return BASE_SYSTEM_PROMPT.to_string();
    }

    let mut prompt = String::from(BASE_SYSTEM_PROMPT);
    prompt.push_str("\n## Ornekler\n");
    for (i, example) in examples.iter().enumerate() {
        prompt.push_str(&format!(
            "\n### Ornek {}\nSoru: {}\n\nYanit:\n{}\n",
            i + 1,
            example.query,
            example.response
        ));
    }
    prompt
}

/// User prompt carrying the gathered data, document context and the question.
pub fn synthesis_prompt(state: &AgentState) -> String {
    let mut prompt = String::from("Topladigin verileri kullanarak bir analiz raporu olustur.\n\n## Toplanan Veriler\n");

    if !state.capabilities.tools {
        prompt.push_str("\nBu calismada veri araclari devre disi.\n");
    } else if state.planned_tools.is_empty() {
        prompt.push_str("\nBu soru icin veri araci planlanmadi.\n");
    }

    for invocation in &state.planned_tools {
        let key = invocation.key();
        prompt.push_str(&format!("\n### {} [{}]\n", invocation.tool.label(), key));
        match state.gathered.get(&key) {
            Some(ToolResult::Success { payload }) => {
                let rendered = serde_json::to_string_pretty(payload).unwrap_or_else(|_| payload.to_string());
                prompt.push_str(&format!("```json\n{rendered}\n```\n"));
            }
            Some(ToolResult::Failure { reason }) => {
                prompt.push_str(&format!("VERI YOK: {reason}\n"));
            }
            None => prompt.push_str("VERI YOK: sonuc alinamadi\n"),
        }
    }

    prompt.push_str("\n## Dokuman Arastirmasi\n");
    if !state.retrieval_planned {
        prompt.push_str("\nDokuman aramasi bu calismada devre disi.\n");
    } else if state.context.is_empty() {
        prompt.push_str("\nIlgili dokuman bulunamadi.\n");
    } else {
        for (i, snippet) in state.context.iter().enumerate() {
            prompt.push_str(&format!(
                "\n[{}] {} (skor {:.2})\n{}\n",
                i + 1,
                snippet.source_id,
                snippet.score,
                snippet.text
            ));
        }
    }

    prompt.push_str(
        "\n## Gorev\n\n\
         Bu verileri sentezleyerek soruya yanit ver. Onemli bulgulari one cikar, veriler \
         arasindaki iliskileri acikla, tutarsizliklari ve eksik verileri belirt.\n",
    );
    prompt.push_str(&format!("\nKullanici Sorusu: {}\n", state.query));
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use bist_models::{CapabilityFlags, ContextSnippet, ToolId, ToolInvocation, Ticker};

    #[test]
    fn example_count_follows_mode() {
        assert_eq!(examples_for(PromptingMode::ZeroShot).len(), 0);
        assert_eq!(examples_for(PromptingMode::OneShot).len(), 1);
        assert_eq!(examples_for(PromptingMode::FewShot).len(), 3);
    }

    #[test]
    fn zero_shot_prompt_has_no_examples() {
        let prompt = system_prompt(PromptingMode::ZeroShot);
        assert!(!prompt.contains("## Ornekler"));
        assert!(prompt.contains("AL/SAT tavsiyesi VERME"));

        let few = system_prompt(PromptingMode::FewShot);
        assert!(few.contains("### Ornek 3"));
        assert!(few.contains("EREGL hissesinin teknik gorunumu nasil?"));
    }

    #[test]
    fn synthesis_prompt_marks_failed_slots() {
        let mut state = AgentState::new("THYAO teknik analiz", CapabilityFlags::ALL, PromptingMode::FewShot);
        state.planned_tools = vec![
            ToolInvocation::new(ToolId::MarketData, Some(Ticker::Thyao)),
            ToolInvocation::new(ToolId::Technicals, Some(Ticker::Thyao)),
        ];
        state.retrieval_planned = true;
        state.gathered.insert(
            "market_data:THYAO".to_string(),
            ToolResult::success(serde_json::json!({"price": "265.40"})),
        );
        state.gathered.insert(
            "technicals:THYAO".to_string(),
            ToolResult::failure("insufficient data"),
        );
        state.context.push(ContextSnippet {
            text: "Yolcu sayisi artti".to_string(),
            score: 0.8,
            source_id: "THYAO - faaliyet_raporu (thy-1)".to_string(),
        });

        let prompt = synthesis_prompt(&state);
        assert!(prompt.contains("### market data [market_data:THYAO]"));
        assert!(prompt.contains("\"price\": \"265.40\""));
        assert!(prompt.contains("VERI YOK: insufficient data"));
        assert!(prompt.contains("[1] THYAO - faaliyet_raporu (thy-1) (skor 0.80)"));
        assert!(prompt.ends_with("Kullanici Sorusu: THYAO teknik analiz\n"));
    }

    #[test]
    fn synthesis_prompt_notes_disabled_capabilities() {
        let caps = CapabilityFlags { rag: false, tools: false };
        let state = AgentState::new("Borsa", caps, PromptingMode::ZeroShot);
        let prompt = synthesis_prompt(&state);
        assert!(prompt.contains("veri araclari devre disi"));
        assert!(prompt.contains("Dokuman aramasi bu calismada devre disi"));
    }
}
