use super::record::DiagnosisRecord;

/// Locale used for the canned failure record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackLocale {
    English,
    Hindi,
}

impl FallbackLocale {
    /// `"hindi"` in any case selects Hindi; everything else is English.
    pub fn from_language(language: &str) -> Self {
        if language.eq_ignore_ascii_case("hindi") {
            FallbackLocale::Hindi
        } else {
            FallbackLocale::English
        }
    }

    pub fn failure_sentinel(self) -> &'static str {
        match self {
            FallbackLocale::English => "Analysis Failed",
            FallbackLocale::Hindi => "विश्लेषण असफल",
        }
    }
}

/// Zero-confidence record returned whenever a diagnosis cannot be produced.
pub fn fallback_record(language: &str, reason: &str) -> DiagnosisRecord {
    let locale = FallbackLocale::from_language(language);
    match locale {
        FallbackLocale::Hindi => DiagnosisRecord {
            disease_name: locale.failure_sentinel().to_string(),
            description: format!(
                "छवि का विश्लेषण नहीं हो सका: {reason}. कृपया छवि की गुणवत्ता जांचें और पुनः प्रयास करें।"
            ),
            symptoms: vec!["कोई लक्षण नहीं मिला".to_string()],
            treatment: "छवि स्पष्ट और अच्छी रोशनी में हो\nदूसरे कोण से फोटो लें\nइंटरनेट कनेक्शन जांचें"
                .to_string(),
            prevention: "स्थानीय कृषि विशेषज्ञ से सलाह लें".to_string(),
            confidence: 0.0,
        },
        FallbackLocale::English => DiagnosisRecord {
            disease_name: locale.failure_sentinel().to_string(),
            description: format!(
                "Could not analyze the image: {reason}. Please check image quality and try again."
            ),
            symptoms: vec!["No symptoms detected".to_string()],
            treatment: "Ensure image is clear and well-lit\nTry taking photo from a different angle\nCheck internet connection"
                .to_string(),
            prevention: "Consult a local agricultural expert".to_string(),
            confidence: 0.0,
        },
    }
}
