//! Phrase lexicons consumed by the in-page programs.
//!
//! Matching is case-insensitive substring on trimmed element text, so every
//! entry is lowercase with single internal spaces. Locales covered: en plus
//! de, fr, es, it, pt, nl.

/// Call-to-action button/link phrases.
pub const CTA_PHRASES: &[&str] = &[
    // en
    "buy now",
    "buy",
    "add to cart",
    "add to bag",
    "shop now",
    "shop the",
    "sign up",
    "get started",
    "start free",
    "try for free",
    "free trial",
    "book now",
    "book a demo",
    "order now",
    "checkout",
    "subscribe",
    "join now",
    "get a quote",
    "apply now",
    "donate",
    "download",
    "contact us",
    "learn more",
    // de
    "jetzt kaufen",
    "kaufen",
    "in den warenkorb",
    "zum warenkorb",
    "jetzt bestellen",
    "jetzt buchen",
    "anmelden",
    "registrieren",
    "kostenlos testen",
    "mehr erfahren",
    "angebot anfordern",
    // fr
    "acheter",
    "ajouter au panier",
    "commander",
    "s'inscrire",
    "essai gratuit",
    "en savoir plus",
    "nous contacter",
    "réserver",
    "télécharger",
    // es
    "comprar ahora",
    "comprar",
    "añadir al carrito",
    "añadir a la cesta",
    "regístrate",
    "suscríbete",
    "prueba gratis",
    "más información",
    "reservar",
    "descargar",
    // it
    "acquista ora",
    "acquista",
    "aggiungi al carrello",
    "iscriviti",
    "prova gratuita",
    "scopri di più",
    "prenota",
    "contattaci",
    "scarica",
    // pt
    "compre agora",
    "adicionar ao carrinho",
    "inscreva-se",
    "assine agora",
    "teste grátis",
    "saiba mais",
    "fale conosco",
    "baixar",
    // nl
    "nu kopen",
    "in winkelwagen",
    "aanmelden",
    "gratis proberen",
    "meer informatie",
    "boek nu",
    "downloaden",
];

/// Href fragments that mark a link as intent-bearing. Checked against the
/// lowercased `href` when the visible text alone is inconclusive.
pub const CTA_HREF_TOKENS: &[&str] = &[
    "signup",
    "sign-up",
    "register",
    "subscribe",
    "buy",
    "cart",
    "basket",
    "checkout",
    "order",
    "pricing",
    "quote",
    "demo",
    "trial",
    "book",
    "contact",
    "download",
    "warenkorb",
    "kasse",
    "panier",
    "carrito",
    "carrello",
    "winkelwagen",
];

/// Cookie/consent overlay vocabulary.
pub const CONSENT_TOKENS: &[&str] = &[
    // en
    "cookie",
    "cookies",
    "consent",
    "gdpr",
    "privacy policy",
    "accept all",
    "reject all",
    "we use cookies",
    "your privacy",
    "manage preferences",
    // de
    "datenschutz",
    "einwilligung",
    "alle akzeptieren",
    "zustimmen",
    "ablehnen",
    // fr
    "accepter tout",
    "tout accepter",
    "politique de confidentialité",
    "gérer les cookies",
    // es
    "aceptar todo",
    "aceptar todas",
    "política de privacidad",
    "gestionar cookies",
    // it
    "accetta tutti",
    "informativa sulla privacy",
    "gestisci i cookie",
    // pt
    "aceitar todos",
    "política de privacidade",
    // nl
    "alles accepteren",
    "privacybeleid",
    "cookies beheren",
];

/// Anti-bot challenge page vocabulary, matched against title + body text.
pub const BOT_CHALLENGE_TOKENS: &[&str] = &[
    "just a moment",
    "checking your browser",
    "verify you are human",
    "verifying you are human",
    "are you human",
    "are you a robot",
    "access denied",
    "attention required",
    "enable javascript and cookies",
    "ddos protection",
    "security check to access",
    "unusual traffic",
];

/// Class/attribute fragments marking navigation toggles that must never be
/// counted as CTAs.
pub const NAV_TOGGLE_TOKENS: &[&str] = &[
    "burger",
    "hamburger",
    "menu-toggle",
    "nav-toggle",
    "menu-button",
    "navbar-toggler",
    "drawer-toggle",
];

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_normalized(list: &[&str], name: &str) {
        assert!(!list.is_empty(), "{} is empty", name);
        for entry in list {
            assert_eq!(
                *entry,
                entry.trim().to_lowercase(),
                "{} entry '{}' is not trimmed lowercase",
                name,
                entry
            );
            assert!(!entry.contains("  "), "{} entry '{}' has doubled spaces", name, entry);
        }
    }

    #[test]
    fn test_lexicons_are_normalized() {
        assert_normalized(CTA_PHRASES, "CTA_PHRASES");
        assert_normalized(CTA_HREF_TOKENS, "CTA_HREF_TOKENS");
        assert_normalized(CONSENT_TOKENS, "CONSENT_TOKENS");
        assert_normalized(BOT_CHALLENGE_TOKENS, "BOT_CHALLENGE_TOKENS");
        assert_normalized(NAV_TOGGLE_TOKENS, "NAV_TOGGLE_TOKENS");
    }

    #[test]
    fn test_locale_anchors_present() {
        assert!(CTA_PHRASES.contains(&"add to cart"));
        assert!(CTA_PHRASES.contains(&"in den warenkorb"));
        assert!(CTA_PHRASES.contains(&"ajouter au panier"));
        assert!(CTA_PHRASES.contains(&"añadir al carrito"));
        assert!(CTA_PHRASES.contains(&"aggiungi al carrello"));
        assert!(CTA_PHRASES.contains(&"adicionar ao carrinho"));
        assert!(CTA_PHRASES.contains(&"in winkelwagen"));
    }

    #[test]
    fn test_consent_covers_major_locales() {
        assert!(CONSENT_TOKENS.contains(&"accept all"));
        assert!(CONSENT_TOKENS.contains(&"alle akzeptieren"));
        assert!(CONSENT_TOKENS.contains(&"tout accepter"));
        assert!(CONSENT_TOKENS.contains(&"aceptar todo"));
    }

    #[test]
    fn test_no_duplicate_phrases() {
        let mut seen = std::collections::HashSet::new();
        for phrase in CTA_PHRASES {
            assert!(seen.insert(phrase), "duplicate CTA phrase '{}'", phrase);
        }
    }
}
