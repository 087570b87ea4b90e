//! Quick replies — a fixed keyword table answered locally, before any LLM call.
//!
//! Matching works on whole words after lowercasing and folding Spanish accents,
//! so "ENVÍO", "envio" and "envío?" all hit the shipping entry. Entries are tried
//! in table order and the first hit wins.

/// How an entry's keywords are matched against the user's words.
#[derive(Debug, Clone, Copy, PartialEq)]
enum MatchRule {
    /// Any single word in the message is a keyword.
    AnyWord,
    /// Every word in the message is a keyword (pure greetings like "hola buenas").
    OnlyKeywords,
}

struct QuickReply {
    topic: &'static str,
    rule: MatchRule,
    keywords: &'static [&'static str],
    /// `{whatsapp_url}` is substituted at lookup time.
    reply: &'static str,
}

const QUICK_REPLIES: &[QuickReply] = &[
    QuickReply {
        topic: "exchanges",
        rule: MatchRule::AnyWord,
        keywords: &["cambio", "cambios", "devolucion", "devoluciones", "devolver", "garantia"],
        reply: "🔄 Puedes solicitar cambios hasta 3 días hábiles después de recibir tu pedido. \
                Escríbenos por WhatsApp para gestionarlo: {whatsapp_url}",
    },
    QuickReply {
        topic: "shipping",
        rule: MatchRule::AnyWord,
        keywords: &["envio", "envios", "enviar", "envian", "domicilio", "entrega", "despacho"],
        reply: "🚚 Envío en Cúcuta: $5,000 COP (entrega en 24 horas). \
                Resto del país: $15,000 COP (entrega en 2-3 días).",
    },
    QuickReply {
        topic: "sizes",
        rule: MatchRule::AnyWord,
        keywords: &["talla", "tallas", "medida", "medidas"],
        reply: "📏 Manejamos tallas S, M, L y XL para hombre, mujer y niños. \
                Si tienes dudas con tu talla, te asesoramos por WhatsApp: {whatsapp_url}",
    },
    QuickReply {
        topic: "hours",
        rule: MatchRule::AnyWord,
        keywords: &["horario", "horarios", "abren", "atienden", "cierran"],
        reply: "🕗 Atendemos de lunes a viernes, de 8:00am a 6:00pm.",
    },
    QuickReply {
        topic: "contact",
        rule: MatchRule::AnyWord,
        keywords: &["whatsapp", "contacto", "telefono", "celular", "asesor", "numero"],
        reply: "📞 Escríbenos por WhatsApp y te atendemos personalmente: {whatsapp_url}",
    },
    QuickReply {
        topic: "greeting",
        rule: MatchRule::OnlyKeywords,
        keywords: &[
            "hola", "holi", "buenas", "buen", "buenos", "dia", "dias", "tarde", "tardes",
            "noche", "noches", "saludos", "hey",
        ],
        reply: "👋 ¡Hola! Bienvenido a Pijamas Shalom. ¿En qué puedo ayudarte hoy? \
                Pregúntame por tallas, precios, envíos o cambios.",
    },
];

/// Returns a canned answer when the message hits the keyword table.
pub fn quick_reply(message: &str, whatsapp_url: &str) -> Option<String> {
    let words = normalized_words(message);
    if words.is_empty() {
        return None;
    }

    QUICK_REPLIES
        .iter()
        .find(|entry| matches(entry, &words))
        .map(|entry| {
            tracing::debug!(topic = entry.topic, "Quick reply hit");
            entry.reply.replace("{whatsapp_url}", whatsapp_url)
        })
}

fn matches(entry: &QuickReply, words: &[String]) -> bool {
    let is_keyword = |w: &String| entry.keywords.contains(&w.as_str());
    match entry.rule {
        MatchRule::AnyWord => words.iter().any(is_keyword),
        MatchRule::OnlyKeywords => words.iter().all(is_keyword),
    }
}

fn normalized_words(message: &str) -> Vec<String> {
    message
        .chars()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .map(fold_accent)
        .collect::<String>()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

/// Combining diacritical marks (U+0300–U+036F), as found in NFD input.
fn is_combining_mark(c: char) -> bool {
    ('\u{300}'..='\u{36f}').contains(&c)
}

fn fold_accent(c: char) -> char {
    match c {
        'á' | 'à' | 'ä' => 'a',
        'é' | 'è' | 'ë' => 'e',
        'í' | 'ì' | 'ï' => 'i',
        'ó' | 'ò' | 'ö' => 'o',
        'ú' | 'ù' | 'ü' => 'u',
        'ñ' => 'n',
        other => other,
    }
}
