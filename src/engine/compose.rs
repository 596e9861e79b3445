//! Rendering matched knowledge as reply text.
//!
//! Output is a pure function of its input: no clock, no locale, no
//! randomness. Field replies are `"<Label> <name>:\n<value>"` with
//! [`NO_DATA`] standing in for an empty value. The full record drops empty
//! sections instead of printing bare headers.

use crate::knowledge::{Category, Entry, Subcategory};

use super::intent::IntentField;
use super::matcher::MatchResult;

/// Placeholder for an empty or missing field in a single-field reply.
pub const NO_DATA: &str = "Tidak ada data";

/// Placeholder inside the subcategory summary block.
const DASH: &str = "-";

/// Render whatever `result` points at, or `None` when nothing matched.
pub fn compose(result: &MatchResult<'_>) -> Option<String> {
    if let Some(entry) = result.entry {
        return Some(compose_entry(entry, result.intent));
    }
    if let Some(sub) = result.subcategory {
        return Some(compose_subcategory(sub, result.intent));
    }
    result.category.map(compose_category)
}

pub fn compose_entry(entry: &Entry, intent: IntentField) -> String {
    let name = &entry.name;
    match intent {
        IntentField::Full => full_record(entry),
        IntentField::Indication => field("Indikasi", name, or_no_data(&entry.indication)),
        IntentField::Dosage => field("Dosis", name, or_no_data(&entry.dosage)),
        IntentField::SideEffects => field("Efek samping", name, &joined_or(&entry.side_effects, NO_DATA)),
        IntentField::DrugInteraction => {
            let lines: Vec<String> = entry
                .drug_interactions
                .iter()
                .map(|x| format!("{}: {}", x.agent, x.effect))
                .collect();
            field("Interaksi obat", name, &lines_or_no_data(&lines))
        }
        IntentField::FoodInteraction => {
            let lines: Vec<String> = entry
                .food_interactions
                .iter()
                .map(|x| format!("{}: {}", x.food, x.effect))
                .collect();
            field("Interaksi makanan", name, &lines_or_no_data(&lines))
        }
        IntentField::Notes => field(
            "Catatan khusus",
            name,
            or_no_data(entry.special_notes.as_deref().unwrap_or_default()),
        ),
        IntentField::DrugClass => field("Golongan", name, or_no_data(&entry.drug_class)),
        IntentField::DiseaseCategory => {
            field("Kategori penyakit", name, or_no_data(&entry.disease_category))
        }
    }
}

/// Multi-line record: only sections with data are emitted.
fn full_record(entry: &Entry) -> String {
    let mut out = vec![format!("{}:", entry.name)];

    if !is_blank(&entry.indication) {
        out.push(format!("Indikasi: {}", entry.indication));
    }
    if !is_blank(&entry.dosage) {
        out.push(format!("Dosis: {}", entry.dosage));
    }
    if !entry.side_effects.is_empty() {
        out.push(format!("Efek samping: {}", entry.side_effects.join(", ")));
    }
    if !entry.drug_interactions.is_empty() {
        out.push("Interaksi obat:".to_string());
        out.extend(entry.drug_interactions.iter().map(|x| format!("- {}: {}", x.agent, x.effect)));
    }
    if !entry.food_interactions.is_empty() {
        out.push("Interaksi makanan:".to_string());
        out.extend(entry.food_interactions.iter().map(|x| format!("- {}: {}", x.food, x.effect)));
    }
    if let Some(notes) = entry.special_notes.as_deref().filter(|n| !is_blank(n)) {
        out.push(format!("Catatan khusus: {notes}"));
    }

    out.join("\n")
}

pub fn compose_subcategory(sub: &Subcategory, intent: IntentField) -> String {
    let name = &sub.name;
    match intent {
        IntentField::Dosage => field(
            "Dosis umum",
            name,
            or_no_data(sub.usual_dosage.as_deref().unwrap_or_default()),
        ),
        IntentField::SideEffects => field("Efek samping", name, &joined_or(&sub.side_effects, NO_DATA)),
        _ => [
            format!("{name}:"),
            format!("Deskripsi: {}", or_dash(sub.description.as_deref())),
            format!("Contoh obat: {}", joined_or(&sub.examples, DASH)),
            format!("Dosis umum: {}", or_dash(sub.usual_dosage.as_deref())),
            format!("Efek samping: {}", joined_or(&sub.side_effects, DASH)),
        ]
        .join("\n"),
    }
}

pub fn compose_category(category: &Category) -> String {
    let mut out = vec![format!("{}:", category.name)];
    if let Some(desc) = category.description.as_deref().filter(|d| !is_blank(d)) {
        out.push(desc.to_string());
    }
    if category.has_subcategories() {
        let names: Vec<String> = category.subcategories.iter().map(|s| s.name.clone()).collect();
        out.push(format!("Subkategori: {}", names.join(", ")));
    } else {
        let names: Vec<String> = category.entries.iter().map(|e| e.name.clone()).collect();
        out.push(format!("Daftar obat: {}", joined_or(&names, NO_DATA)));
    }
    out.join("\n")
}

fn field(label: &str, name: &str, value: &str) -> String {
    format!("{label} {name}:\n{value}")
}

fn is_blank(s: &str) -> bool {
    s.trim().is_empty()
}

fn or_no_data(s: &str) -> &str {
    if is_blank(s) { NO_DATA } else { s }
}

fn or_dash(s: Option<&str>) -> &str {
    s.filter(|s| !is_blank(s)).unwrap_or(DASH)
}

fn joined_or(items: &[String], empty: &str) -> String {
    if items.is_empty() { empty.to_string() } else { items.join(", ") }
}

fn lines_or_no_data(lines: &[String]) -> String {
    if lines.is_empty() { NO_DATA.to_string() } else { lines.join("\n") }
}
