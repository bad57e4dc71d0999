// src/enrich/classify.rs
//! Keyword-table SDG tagging.
//!
//! The table maps goal numbers ("1".."17") to lowercase keywords. Loads from
//! TOML (`[goals]` table) and falls back to a built-in Spanish + English seed.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::model::UNKNOWN_SDG;

pub trait SdgClassifier: Send + Sync {
    /// Goal numbers in ascending order, or `["unknown"]`.
    fn classify(&self, text: &str) -> Vec<String>;
}

#[derive(Debug, Clone, Deserialize)]
struct KeywordFile {
    goals: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone)]
pub struct KeywordClassifier {
    /// (goal number, lowercase keywords), sorted by goal number.
    goals: Vec<(u8, Vec<String>)>,
}

impl Default for KeywordClassifier {
    fn default() -> Self {
        Self::default_seed()
    }
}

impl KeywordClassifier {
    pub fn from_table<I, K, V>(table: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: IntoIterator,
        V::Item: AsRef<str>,
    {
        let mut goals: Vec<(u8, Vec<String>)> = table
            .into_iter()
            .filter_map(|(goal, kws)| {
                let n: u8 = goal.as_ref().trim().parse().ok()?;
                if !(1..=17).contains(&n) {
                    return None;
                }
                let kws: Vec<String> = kws
                    .into_iter()
                    .map(|k| k.as_ref().trim().to_lowercase())
                    .filter(|k| !k.is_empty())
                    .collect();
                Some((n, kws))
            })
            .collect();
        goals.sort_by_key(|(n, _)| *n);
        Self { goals }
    }

    /// Load `[goals]` from a TOML file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let s = fs::read_to_string(path)
            .with_context(|| format!("reading sdg keywords from {}", path.display()))?;
        let file: KeywordFile =
            toml::from_str(&s).with_context(|| format!("parsing {}", path.display()))?;
        Ok(Self::from_table(file.goals))
    }

    /// Built-in seed used when no keyword file is configured.
    pub fn default_seed() -> Self {
        Self::from_table([
            ("1", vec!["pobreza", "pobres", "desigualdad", "poverty"]),
            ("2", vec!["hambre", "alimentación", "agricultura", "hunger", "agriculture", "food security"]),
            ("3", vec!["salud", "bienestar", "enfermedad", "health", "disease", "well-being"]),
            ("4", vec!["educación", "escuela", "universidad", "education", "school", "university"]),
            ("5", vec!["igualdad de género", "mujer", "género", "gender", "women"]),
            ("6", vec!["agua", "saneamiento", "hidráulica", "water", "sanitation"]),
            ("7", vec!["energía", "renovable", "electrificación", "energy", "renewable"]),
            ("8", vec!["trabajo", "empleo", "economía", "employment", "decent work", "economic growth"]),
            ("9", vec!["industria", "innovación", "infraestructura", "tecnología", "industry", "innovation", "infrastructure", "technology"]),
            ("10", vec!["desigualdad", "inclusión", "migración", "inequality", "inclusion", "migration"]),
            ("11", vec!["ciudades", "comunidades", "urbanismo", "cities", "urban", "communities"]),
            ("12", vec!["consumo", "producción", "residuos", "consumption", "circular economy", "waste"]),
            ("13", vec!["clima", "cambio climático", "carbono", "climate", "carbon"]),
            ("14", vec!["océano", "mar", "pesca", "ocean", "marine", "fisheries"]),
            ("15", vec!["ecosistema", "bosque", "biodiversidad", "ecosystem", "forest", "biodiversity"]),
            ("16", vec!["paz", "justicia", "instituciones", "peace", "justice", "institutions"]),
            ("17", vec!["alianzas", "cooperación", "financiación", "partnership", "cooperation"]),
        ])
    }
}

impl SdgClassifier for KeywordClassifier {
    fn classify(&self, text: &str) -> Vec<String> {
        let lower = text.to_lowercase();
        if lower.trim().is_empty() {
            return vec![UNKNOWN_SDG.to_string()];
        }
        let hits: Vec<String> = self
            .goals
            .iter()
            .filter(|(_, kws)| kws.iter().any(|k| lower.contains(k.as_str())))
            .map(|(n, _)| n.to_string())
            .collect();
        if hits.is_empty() {
            vec![UNKNOWN_SDG.to_string()]
        } else {
            hits
        }
    }
}
