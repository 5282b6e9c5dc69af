//! Per-language classification patterns and the synthetic strings the
//! pipeline emits.
//!
//! Every entry is a regex fragment matched case-insensitively at the start of
//! a line (after optional quote, heading and bold markers), except
//! `legal_terms`, which is matched anywhere on word boundaries. Adding a
//! language means adding one row to `TABLE`.

use std::sync::LazyLock;

use lettera_core::Language;
use regex::Regex;

pub struct LanguagePatterns {
    pub language: Language,
    /// Salutations and addressee lines that open a letter.
    pub openers: &'static [&'static str],
    /// Formal closings that precede the signature.
    pub closers: &'static [&'static str],
    pub subject_markers: &'static [&'static str],
    /// Chat lead-ins ("Here is the draft:") that precede a letter.
    pub preface_phrases: &'static [&'static str],
    /// Chat sign-offs ("Hope this helps!") that follow a letter.
    pub closing_phrases: &'static [&'static str],
    /// Words suggesting the user needs up-to-date legal sources.
    pub legal_terms: &'static [&'static str],
    /// Lead-ins of a recap of user-supplied facts.
    pub summary_intros: &'static [&'static str],
    /// Assistant turn shown instead of the raw reply once a draft is extracted.
    pub draft_confirmation: &'static str,
    /// Assistant turn appended when the completion service fails.
    pub fallback_reply: &'static str,
    /// Assistant turn appended when an attachment yields no text.
    pub unreadable_document: &'static str,
    /// Shown when a `mailto:` link cannot carry the body.
    pub mailto_paste_hint: &'static str,
}

/// Paired markers the assistant wraps around a generated letter.
pub const SENTINELS: [(&str, &str); 2] = [
    ("---LETTERA---", "---FINE LETTERA---"),
    ("---LETTER---", "---END LETTER---"),
];

static TABLE: &[LanguagePatterns] = &[
    LanguagePatterns {
        language: Language::It,
        openers: &[
            r"Gentil(?:e|issim[oa])\b",
            r"Egreg(?:io|ia|i)\b",
            r"Egr\.",
            r"Spett\.?le\b",
            r"Spettabile\b",
            r"Car[oa]\s+(?-i:\p{Lu})",
            r"Alla\s+(?:cortese\s+)?attenzione\b",
        ],
        closers: &[
            r"(?:Cordiali|Distinti)\s+saluti\b",
            r"(?:Porgo|Invio)\s+(?:i\s+miei\s+)?(?:cordiali|distinti)\s+saluti\b",
            r"Con\s+osservanza\b",
            r"Cordialmente\b",
            r"In\s+fede\b",
        ],
        subject_markers: &[r"Oggetto\s*:"],
        preface_phrases: &[
            r"Ecco\b",
            r"Certo\b",
            r"Certamente\b",
            r"Perfetto\b",
            r"Ottimo\b",
            r"Grazie\b",
            r"Di\s+seguito\b",
            r"Ho\s+(?:preparato|aggiornato|modificato|scritto|redatto|riscritto|tradotto)\b",
        ],
        closing_phrases: &[
            r"Spero\s+(?:che\s+)?(?:questa|questo|ti|le|possa|sia)\b",
            r"Fammi\s+sapere\b",
            r"Mi\s+faccia\s+sapere\b",
            r"Se\s+(?:vuoi|desideri|preferisci|hai\s+bisogno)\b",
            r"Posso\s+(?:anche|aiutarti)\b",
            r"Vuoi\s+che\b",
            r"In\s+bocca\s+al\s+lupo\b",
            r"Buona\s+fortuna\b",
        ],
        legal_terms: &[
            r"legge",
            r"decreto",
            r"normativa",
            r"articolo",
            r"sentenza",
            r"giurisprudenza",
            r"codice\s+civile",
            r"ricorso",
            r"termini\s+di\s+legge",
        ],
        summary_intros: &[r"(?:Ecco\s+)?(?:un\s+|il\s+)?(?:riepilogo|riassunto)\b", r"Grazie.{0,40}riepilogo"],
        draft_confirmation: "✅ La tua lettera è pronta. La trovi nell'anteprima qui sotto.",
        fallback_reply: "Mi dispiace, c'è stato un problema di connessione. Riprova tra qualche istante.",
        unreadable_document: "Non sono riuscito a leggere il documento. Prova con una foto più nitida o un PDF.",
        mailto_paste_hint: "Il testo della lettera è stato copiato negli appunti: incollalo nel messaggio.",
    },
    LanguagePatterns {
        language: Language::En,
        openers: &[
            r"Dear\b",
            r"To\s+whom\s+it\s+may\s+concern\b",
            r"For\s+the\s+attention\s+of\b",
            r"Attn\.?\s*:",
        ],
        closers: &[
            r"Yours\s+(?:sincerely|faithfully|truly)\b",
            r"Sincerely\b",
            r"(?:Kind|Best|Warm)\s+regards\b",
            r"Regards\b",
            r"Respectfully\b",
        ],
        subject_markers: &[r"Subject\s*:", r"Re\s*:"],
        preface_phrases: &[
            r"Here\s+is\b",
            r"Here's\b",
            r"Certainly\b",
            r"Sure\b",
            r"Of\s+course\b",
            r"Absolutely\b",
            r"Thank\s+you\b",
            r"Below\s+is\b",
            r"I(?:'ve|\s+have)\s+(?:drafted|prepared|updated|revised|written|rewritten|translated)\b",
        ],
        closing_phrases: &[
            r"(?:I\s+)?hope\s+this\s+helps\b",
            r"Let\s+me\s+know\b",
            r"Feel\s+free\s+to\b",
            r"If\s+you\s+(?:need|want|would\s+like)\b",
            r"Would\s+you\s+like\b",
            r"Good\s+luck\b",
        ],
        legal_terms: &[
            r"law",
            r"statute",
            r"regulation",
            r"court\s+ruling",
            r"case\s+law",
            r"legal\s+basis",
        ],
        summary_intros: &[r"(?:Here\s+is\s+|Here's\s+)?(?:a\s+|the\s+)?summary\b", r"Thank\s+you.{0,40}summary"],
        draft_confirmation: "✅ Your letter is ready. You can find it in the preview below.",
        fallback_reply: "Sorry, there was a connection problem. Please try again in a moment.",
        unreadable_document: "I couldn't read the document. Please try a sharper photo or a PDF.",
        mailto_paste_hint: "The letter text has been copied to your clipboard: paste it into the message.",
    },
    LanguagePatterns {
        language: Language::De,
        openers: &[
            r"Sehr\s+geehrte[rs]?\b",
            r"Liebe[rs]?\s+(?-i:\p{Lu})",
            r"Guten\s+Tag\b",
            r"An\s+(?:das|die|den)\s+(?-i:\p{Lu})",
        ],
        closers: &[
            r"Mit\s+freundlichen\s+Grüßen\b",
            r"Mit\s+freundlichem\s+Gruß\b",
            r"Freundliche\s+Grüße\b",
            r"Hochachtungsvoll\b",
            r"Viele\s+Grüße\b",
        ],
        subject_markers: &[r"Betreff\s*:", r"Betr\.\s*:"],
        preface_phrases: &[
            r"Hier\s+ist\b",
            r"Gerne\b",
            r"Natürlich\b",
            r"Selbstverständlich\b",
            r"Danke\b",
            r"Nachfolgend\b",
            r"Ich\s+habe\s+(?:den|das|die|Ihren|Ihre)\b",
        ],
        closing_phrases: &[
            r"Ich\s+hoffe\b",
            r"Lass(?:en\s+Sie)?\s+mich\s+wissen\b",
            r"Wenn\s+Sie\s+(?:möchten|noch)\b",
            r"Viel\s+Erfolg\b",
        ],
        legal_terms: &[
            r"Gesetz\w*",
            r"Paragraph\w*",
            r"Verordnung",
            r"Urteil",
            r"Rechtsprechung",
        ],
        summary_intros: &[r"(?:Hier\s+ist\s+)?(?:eine\s+|die\s+)?Zusammenfassung\b", r"Danke.{0,40}Zusammenfassung"],
        draft_confirmation: "✅ Ihr Brief ist fertig. Sie finden ihn in der Vorschau unten.",
        fallback_reply: "Entschuldigung, es gab ein Verbindungsproblem. Bitte versuchen Sie es gleich noch einmal.",
        unreadable_document: "Ich konnte das Dokument nicht lesen. Bitte versuchen Sie ein schärferes Foto oder ein PDF.",
        mailto_paste_hint: "Der Brieftext wurde in die Zwischenablage kopiert: fügen Sie ihn in die Nachricht ein.",
    },
    LanguagePatterns {
        language: Language::Fr,
        openers: &[
            r"Madame\b",
            r"Monsieur\b",
            r"Mesdames\b",
            r"Cher\s+(?-i:\p{Lu})",
            r"Chère\s+(?-i:\p{Lu})",
            r"À\s+l'attention\s+de\b",
        ],
        closers: &[
            r"Cordialement\b",
            r"Veuillez\s+agréer\b",
            r"Je\s+vous\s+prie\s+d'agréer\b",
            r"Bien\s+à\s+vous\b",
            r"Salutations\s+distinguées\b",
        ],
        subject_markers: &[r"Objet\s*:"],
        preface_phrases: &[
            r"Voici\b",
            r"Bien\s+sûr\b",
            r"Certainement\b",
            r"Merci\b",
            r"Ci-dessous\b",
            r"J'ai\s+(?:rédigé|préparé|mis\s+à\s+jour|traduit)\b",
        ],
        closing_phrases: &[
            r"J'espère\b",
            r"N'hésitez\s+pas\b",
            r"Si\s+vous\s+(?:souhaitez|avez\s+besoin)\b",
            r"Bonne\s+chance\b",
        ],
        legal_terms: &[r"loi", r"décret", r"jurisprudence", r"arrêt", r"code\s+civil"],
        summary_intros: &[r"(?:Voici\s+)?(?:un\s+|le\s+)?(?:résumé|récapitulatif)\b", r"Merci.{0,40}(?:résumé|récapitulatif)"],
        draft_confirmation: "✅ Votre lettre est prête. Vous la trouverez dans l'aperçu ci-dessous.",
        fallback_reply: "Désolé, un problème de connexion est survenu. Veuillez réessayer dans un instant.",
        unreadable_document: "Je n'ai pas pu lire le document. Essayez une photo plus nette ou un PDF.",
        mailto_paste_hint: "Le texte de la lettre a été copié dans le presse-papiers : collez-le dans le message.",
    },
    LanguagePatterns {
        language: Language::Es,
        openers: &[
            r"Estimad[oa]s?\b",
            r"Distinguid[oa]s?\b",
            r"Muy\s+señor(?:es)?\b",
            r"A\s+quien\s+corresponda\b",
            r"Señor(?:a|es)?\s+(?-i:\p{Lu})",
        ],
        closers: &[
            r"Atentamente\b",
            r"(?:Reciba\s+)?[Uu]n\s+cordial\s+saludo\b",
            r"Saludos\s+cordiales\b",
            r"Le\s+saluda\s+atentamente\b",
        ],
        subject_markers: &[r"Asunto\s*:"],
        preface_phrases: &[
            r"Aquí\s+(?:tienes|tiene|está)\b",
            r"Claro\b",
            r"Por\s+supuesto\b",
            r"Gracias\b",
            r"A\s+continuación\b",
            r"He\s+(?:redactado|preparado|actualizado|traducido)\b",
        ],
        closing_phrases: &[
            r"Espero\s+que\b",
            r"Déjame\s+saber\b",
            r"Si\s+necesitas\b",
            r"No\s+dudes\b",
            r"¡?Suerte\b",
        ],
        legal_terms: &[r"ley", r"decreto", r"artículo", r"jurisprudencia", r"sentencia"],
        summary_intros: &[r"(?:Aquí\s+(?:tienes|está)\s+)?(?:un\s+|el\s+)?resumen\b", r"Gracias.{0,40}resumen"],
        draft_confirmation: "✅ Tu carta está lista. La encontrarás en la vista previa de abajo.",
        fallback_reply: "Lo siento, hubo un problema de conexión. Inténtalo de nuevo en un momento.",
        unreadable_document: "No pude leer el documento. Prueba con una foto más nítida o un PDF.",
        mailto_paste_hint: "El texto de la carta se ha copiado al portapapeles: pégalo en el mensaje.",
    },
    LanguagePatterns {
        language: Language::Pt,
        openers: &[
            r"Prezad[oa]s?\b",
            r"Exm[oa]s?\.?\s",
            r"Excelentíssim[oa]\b",
            r"A\s+quem\s+possa\s+interessar\b",
        ],
        closers: &[
            r"Atenciosamente\b",
            r"(?:Com\s+os\s+)?[Mm]elhores\s+cumprimentos\b",
            r"Respeitosamente\b",
        ],
        subject_markers: &[r"Assunto\s*:"],
        preface_phrases: &[
            r"Aqui\s+está\b",
            r"Com\s+certeza\b",
            r"Obrigad[oa]\b",
            r"Segue\b",
            r"Preparei\b",
        ],
        closing_phrases: &[
            r"Espero\s+ter\s+ajudado\b",
            r"Se\s+precisar\b",
            r"Fico\s+à\s+disposição\b",
            r"Boa\s+sorte\b",
        ],
        legal_terms: &[r"lei", r"decreto", r"artigo", r"jurisprudência", r"acórdão"],
        summary_intros: &[r"(?:Aqui\s+está\s+)?(?:um\s+|o\s+)?resumo\b", r"Obrigad[oa].{0,40}resumo"],
        draft_confirmation: "✅ A sua carta está pronta. Encontra-a na pré-visualização abaixo.",
        fallback_reply: "Desculpe, houve um problema de ligação. Tente novamente dentro de momentos.",
        unreadable_document: "Não consegui ler o documento. Tente uma foto mais nítida ou um PDF.",
        mailto_paste_hint: "O texto da carta foi copiado para a área de transferência: cole-o na mensagem.",
    },
    LanguagePatterns {
        language: Language::Ro,
        openers: &[
            r"Stimat(?:e|ă)?\b",
            r"Doamn(?:ă|ei)\b",
            r"Domnul(?:e|ui)?\b",
            r"Către\b",
        ],
        closers: &[
            r"Cu\s+stimă\b",
            r"Cu\s+respect\b",
            r"Cu\s+deosebită\s+considerație\b",
            r"Cu\s+considerație\b",
        ],
        subject_markers: &[r"Subiect\s*:", r"Referitor\s+la\s*:"],
        preface_phrases: &[
            r"Iată\b",
            r"Desigur\b",
            r"Sigur\b",
            r"Mulțumesc\b",
            r"Mai\s+jos\b",
            r"Am\s+(?:redactat|pregătit|actualizat|tradus)\b",
        ],
        closing_phrases: &[
            r"Sper\s+c[aă]\b",
            r"Dac[aă]\s+(?:ai|aveți)\s+nevoie\b",
            r"Spor\b",
            r"Mult\s+succes\b",
        ],
        legal_terms: &[r"lege[a]?", r"ordonanț\w*", r"articol\w*", r"jurisprudenț\w*", r"hotărâre\w*"],
        summary_intros: &[r"(?:Iată\s+)?(?:un\s+)?rezumat\w*\b", r"Mulțumesc.{0,40}rezumat"],
        draft_confirmation: "✅ Scrisoarea ta este gata. O găsești în previzualizarea de mai jos.",
        fallback_reply: "Ne pare rău, a apărut o problemă de conexiune. Încearcă din nou în câteva momente.",
        unreadable_document: "Nu am putut citi documentul. Încearcă o fotografie mai clară sau un PDF.",
        mailto_paste_hint: "Textul scrisorii a fost copiat în clipboard: lipește-l în mesaj.",
    },
    LanguagePatterns {
        language: Language::Pl,
        openers: &[
            r"Szanown(?:y|a|i)\b",
            r"Drog(?:i|a|ie)\s+(?-i:\p{Lu})",
        ],
        closers: &[
            r"Z\s+poważaniem\b",
            r"Z\s+wyrazami\s+szacunku\b",
            r"Łączę\s+wyrazy\s+szacunku\b",
            r"Pozdrawiam\b",
        ],
        subject_markers: &[r"Dotyczy\s*:", r"Temat\s*:", r"Dot\.\s*:"],
        preface_phrases: &[
            r"Oto\b",
            r"Oczywiście\b",
            r"Jasne\b",
            r"Dziękuję\b",
            r"Poniżej\b",
            r"Przygotowałe[mś]\b",
        ],
        closing_phrases: &[
            r"Mam\s+nadzieję\b",
            r"Daj\s+(?:mi\s+)?znać\b",
            r"Jeśli\s+(?:potrzebujesz|chcesz)\b",
            r"Powodzenia\b",
        ],
        legal_terms: &[r"ustaw\w*", r"rozporządzeni\w*", r"artykuł\w*", r"orzecz\w*", r"wyrok\w*", r"kodeks\w*"],
        summary_intros: &[r"(?:Oto\s+)?podsumowanie\b", r"Dziękuję.{0,40}podsumowanie"],
        draft_confirmation: "✅ Twój list jest gotowy. Znajdziesz go w podglądzie poniżej.",
        fallback_reply: "Przepraszamy, wystąpił problem z połączeniem. Spróbuj ponownie za chwilę.",
        unreadable_document: "Nie udało mi się odczytać dokumentu. Spróbuj wyraźniejszego zdjęcia lub pliku PDF.",
        mailto_paste_hint: "Treść listu została skopiowana do schowka: wklej ją do wiadomości.",
    },
];

/// Patterns for `language`, falling back to the base language.
pub fn patterns(language: Language) -> &'static LanguagePatterns {
    TABLE
        .iter()
        .find(|p| p.language == language)
        .or_else(|| TABLE.iter().find(|p| p.language == Language::BASE))
        .unwrap_or(&TABLE[0])
}

pub fn all() -> &'static [LanguagePatterns] {
    TABLE
}

/// Whether `content` is one of the synthetic confirmation turns, in any language.
pub fn is_draft_confirmation(content: &str) -> bool {
    TABLE.iter().any(|p| p.draft_confirmation == content)
}

/// Remove sentinel markers, dropping lines that held nothing else.
pub fn strip_sentinels(text: &str) -> String {
    if !contains_any_sentinel(text) {
        return text.to_string();
    }
    let mut out: Vec<String> = Vec::new();
    for line in text.lines() {
        let trimmed = line.trim();
        if SENTINELS
            .iter()
            .any(|(open, close)| trimmed == *open || trimmed == *close)
        {
            continue;
        }
        let mut cleaned = line.to_string();
        for (open, close) in SENTINELS {
            cleaned = cleaned.replace(close, "").replace(open, "");
        }
        out.push(cleaned);
    }
    out.join("\n")
}

pub fn contains_any_sentinel(text: &str) -> bool {
    SENTINELS
        .iter()
        .any(|(open, close)| text.contains(open) || text.contains(close))
}

/// Build a line-anchored, case-insensitive regex from one column of the table.
fn line_regex(column: impl Fn(&LanguagePatterns) -> &'static [&'static str]) -> Regex {
    let alternation = TABLE
        .iter()
        .flat_map(|p| column(p).iter().copied())
        .collect::<Vec<_>>()
        .join("|");
    let pattern = format!(r"(?i)^[ \t]*(?:>[ \t]*)?(?:#{{1,6}}[ \t]*)?(?:\*\*|__)?[ \t]*(?:{alternation})");
    Regex::new(&pattern).expect("letter pattern table must compile")
}

pub(crate) static OPENER_LINE: LazyLock<Regex> = LazyLock::new(|| line_regex(|p| p.openers));
pub(crate) static CLOSER_LINE: LazyLock<Regex> = LazyLock::new(|| line_regex(|p| p.closers));
pub(crate) static SUBJECT_LINE: LazyLock<Regex> = LazyLock::new(|| line_regex(|p| p.subject_markers));
pub(crate) static PREFACE_LINE: LazyLock<Regex> = LazyLock::new(|| line_regex(|p| p.preface_phrases));
pub(crate) static CHAT_CLOSING_LINE: LazyLock<Regex> =
    LazyLock::new(|| line_regex(|p| p.closing_phrases));
pub(crate) static SUMMARY_INTRO_LINE: LazyLock<Regex> =
    LazyLock::new(|| line_regex(|p| p.summary_intros));

static LEGAL_TERM: LazyLock<Regex> = LazyLock::new(|| {
    let alternation = TABLE
        .iter()
        .flat_map(|p| p.legal_terms.iter().copied())
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"(?i)\b(?:{alternation})\b|§|\bart\.\s*\d"))
        .expect("legal term table must compile")
});

/// Heuristic: does this message ask about laws, rulings or deadlines that
/// warrant a fresh legal-source search?
pub fn needs_legal_sources(text: &str) -> bool {
    LEGAL_TERM.is_match(text)
}

/// Text of the first subject line ("Oggetto: ...", "Re: ..."), if any.
pub fn subject_of(text: &str) -> Option<String> {
    text.lines().find_map(|line| {
        let m = SUBJECT_LINE.find(line)?;
        let rest = line[m.end()..]
            .trim_start_matches(|c: char| c == ':' || c == '*' || c == '_' || c.is_whitespace())
            .trim_end_matches(|c: char| c == '*' || c == '_' || c.is_whitespace());
        (!rest.is_empty()).then(|| rest.to_string())
    })
}
