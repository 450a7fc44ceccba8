//! Admin statistics: wire types and symptom frequency grouping.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const OTHER_SYMPTOMS: &str = "Other symptoms";

/// Reporting window accepted by the stats endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, strum::EnumString, strum::AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum Period {
    Day,
    Week,
    #[default]
    Month,
    Year,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymptomRecord {
    pub symptom: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyCount {
    pub date: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosisCount {
    pub diagnosis: String,
    pub count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OverallStats {
    pub total_chats: u64,
    pub today_chats: u64,
    pub unique_diagnoses: u64,
    pub active_users: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymptomGroupCount {
    pub group: &'static str,
    pub count: u64,
}

/// Symptom families and the phrases that identify them. The first family
/// with a matching phrase wins.
static SYMPTOM_GROUPS: Lazy<Vec<(&'static str, Vec<&'static str>)>> = Lazy::new(|| {
    vec![
        ("Headache", vec!["головная боль", "болит голова", "голова болит", "мигрень", "головные боли", "headache", "migraine"]),
        ("Sore throat", vec!["горло болит", "боль в горле", "болит горло", "першит в горле", "болезненное глотание", "sore throat"]),
        ("Runny nose", vec!["насморк", "заложенный нос", "течет из носа", "ринит", "заложенность носа", "runny nose", "stuffy nose"]),
        ("Cough", vec!["кашель", "кашляю", "сухой кашель", "мокрый кашель", "кашляет", "cough"]),
        ("Fever", vec!["температура", "лихорадка", "жар", "температурю", "повышенная температура", "фебрильная", "fever"]),
        ("Abdominal pain", vec!["боль в животе", "болит живот", "живот болит", "спазмы в животе", "боли в животе", "stomach ache", "abdominal pain"]),
        ("Nausea", vec!["тошнота", "тошнит", "рвота", "рвет", "позывы к рвоте", "nausea", "vomit"]),
        ("Diarrhea", vec!["диарея", "понос", "жидкий стул", "частый стул", "расстройство стула", "diarrhea"]),
        ("Rash", vec!["сыпь", "высыпания", "крапивница", "красные пятна", "зуд кожи", "чешется кожа", "rash", "hives"]),
        ("Joint pain", vec!["боль в суставах", "болят суставы", "артралгия", "ломота в суставах", "joint pain"]),
        ("Dizziness", vec!["головокружение", "кружится голова", "чувство вращения", "неустойчивость", "dizziness", "dizzy"]),
        ("Weakness", vec!["слабость", "утомляемость", "вялость", "упадок сил", "астения", "weakness", "fatigue"]),
        ("Shortness of breath", vec!["одышка", "тяжело дышать", "нехватка воздуха", "затрудненное дыхание", "shortness of breath"]),
        ("Chest pain", vec!["боль в груди", "грудная боль", "давит грудь", "сдавливание в груди", "chest pain"]),
        ("Allergy", vec!["аллергия", "аллергическая реакция", "отек", "зуд и сыпь", "allergy", "allergic"]),
    ]
});

/// Family a free-text symptom belongs to
pub fn classify_symptom(symptom: &str) -> &'static str {
    let lower = symptom.to_lowercase();
    SYMPTOM_GROUPS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| lower.contains(k)))
        .map(|(group, _)| *group)
        .unwrap_or(OTHER_SYMPTOMS)
}

/// Count symptoms per family, most frequent first (ties by name)
pub fn group_symptoms<'a, I>(symptoms: I) -> Vec<SymptomGroupCount>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut counts: HashMap<&'static str, u64> = HashMap::new();
    for symptom in symptoms {
        *counts.entry(classify_symptom(symptom)).or_default() += 1;
    }

    let mut grouped: Vec<SymptomGroupCount> = counts
        .into_iter()
        .map(|(group, count)| SymptomGroupCount { group, count })
        .collect();
    grouped.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.group.cmp(b.group)));
    grouped
}
