//! Which field of an entry the user is asking for.
//!
//! Classification walks [`RULES`] top to bottom and returns the first rule
//! with a keyword contained in the query. Several rules can match the same
//! query ("interaksi makanan" also contains "interaksi"); position in the
//! table decides. Reordering rows changes answers.

/// Requested field of an [`Entry`](crate::knowledge::Entry).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum IntentField {
    /// No keyword matched: render the whole record.
    #[default]
    Full,
    Indication,
    Dosage,
    SideEffects,
    DrugInteraction,
    FoodInteraction,
    Notes,
    DrugClass,
    DiseaseCategory,
}

impl IntentField {
    pub fn as_str(self) -> &'static str {
        match self {
            IntentField::Full => "full",
            IntentField::Indication => "indication",
            IntentField::Dosage => "dosage",
            IntentField::SideEffects => "side_effects",
            IntentField::DrugInteraction => "drug_interaction",
            IntentField::FoodInteraction => "food_interaction",
            IntentField::Notes => "special_notes",
            IntentField::DrugClass => "drug_class",
            IntentField::DiseaseCategory => "disease_category",
        }
    }
}

/// One row of the classification table.
pub struct IntentRule {
    pub intent: IntentField,
    pub keywords: &'static [&'static str],
}

/// Ordered rule table. Earlier rows win.
pub const RULES: &[IntentRule] = &[
    IntentRule { intent: IntentField::DrugClass, keywords: &["golongan"] },
    IntentRule { intent: IntentField::DiseaseCategory, keywords: &["kategori penyakit", "penyakit"] },
    IntentRule { intent: IntentField::Indication, keywords: &["apa itu", "untuk apa", "apakah itu"] },
    IntentRule { intent: IntentField::SideEffects, keywords: &["efek samping"] },
    IntentRule { intent: IntentField::Dosage, keywords: &["dosis", "aturan pakai"] },
    IntentRule { intent: IntentField::FoodInteraction, keywords: &["interaksi makanan"] },
    IntentRule { intent: IntentField::DrugInteraction, keywords: &["interaksi obat", "interaksi"] },
    IntentRule { intent: IntentField::Notes, keywords: &["catatan khusus"] },
];

/// Classify a normalized query.
pub fn classify(query: &str) -> IntentField {
    RULES
        .iter()
        .find(|rule| rule.keywords.iter().any(|k| query.contains(k)))
        .map(|rule| rule.intent)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_keyword_queries() {
        let cases = [
            ("golongan metformin", IntentField::DrugClass),
            ("metformin untuk penyakit apa", IntentField::DiseaseCategory),
            ("apa itu metformin", IntentField::Indication),
            ("metformin untuk apa", IntentField::Indication),
            ("efek samping metformin", IntentField::SideEffects),
            ("dosis metformin", IntentField::Dosage),
            ("aturan pakai metformin", IntentField::Dosage),
            ("interaksi obat metformin", IntentField::DrugInteraction),
            ("interaksi metformin", IntentField::DrugInteraction),
            ("interaksi makanan metformin", IntentField::FoodInteraction),
            ("catatan khusus metformin", IntentField::Notes),
            ("metformin", IntentField::Full),
        ];
        for (q, expected) in cases {
            assert_eq!(classify(q), expected, "query {q:?}");
        }
    }

    #[test]
    fn earlier_rule_wins_on_overlap() {
        assert_eq!(classify("golongan dan dosis metformin"), IntentField::DrugClass);
        assert_eq!(classify("efek samping dan dosis"), IntentField::SideEffects);
        assert_eq!(classify("apa itu efek samping"), IntentField::Indication);
        // "penyakit" outranks everything below it.
        assert_eq!(classify("dosis untuk penyakit ginjal"), IntentField::DiseaseCategory);
        assert_eq!(classify("dosis dan interaksi"), IntentField::Dosage);
    }

    #[test]
    fn food_rule_sits_directly_above_drug_rule() {
        let pos = |i: IntentField| RULES.iter().position(|r| r.intent == i).unwrap();
        assert_eq!(pos(IntentField::FoodInteraction) + 1, pos(IntentField::DrugInteraction));
        assert!(pos(IntentField::Dosage) < pos(IntentField::FoodInteraction));
        assert!(pos(IntentField::DrugInteraction) < pos(IntentField::Notes));
    }

    #[test]
    fn empty_query_is_full() {
        assert_eq!(classify(""), IntentField::Full);
    }
}
