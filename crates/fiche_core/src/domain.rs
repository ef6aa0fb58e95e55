//! crates/fiche_core/src/domain.rs
//!
//! Defines the core data structures for lesson-preparation sheets.
//! The serialized shape (camelCase keys, millisecond timestamps) matches the
//! `edu_sheets` payload the sheets have always been stored as.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

//=========================================================================================
// Identity and Classification
//=========================================================================================

/// Opaque, immutable identifier of a sheet.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SheetId(String);

impl SheetId {
    /// Generates a fresh identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for SheetId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for SheetId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for SheetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The kind of document a sheet describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SheetType {
    #[default]
    Lesson,
    Exercise,
    Evaluation,
}

impl SheetType {
    pub const ALL: [SheetType; 3] = [SheetType::Lesson, SheetType::Exercise, SheetType::Evaluation];

    /// The wire code sent to the generation service (`LESSON`, ...).
    pub fn code(self) -> &'static str {
        match self {
            SheetType::Lesson => "LESSON",
            SheetType::Exercise => "EXERCISE",
            SheetType::Evaluation => "EVALUATION",
        }
    }

    /// French label shown on listings and documents.
    pub fn label(self) -> &'static str {
        match self {
            SheetType::Lesson => "Leçon",
            SheetType::Exercise => "Exercices",
            SheetType::Evaluation => "Évaluation",
        }
    }
}

/// Grade levels of the Senegalese elementary cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum GradeLevel {
    #[serde(rename = "CI")]
    Ci,
    #[serde(rename = "CP")]
    Cp,
    #[serde(rename = "CE1")]
    Ce1,
    #[serde(rename = "CE2")]
    Ce2,
    #[serde(rename = "CM1")]
    Cm1,
    #[serde(rename = "CM2")]
    Cm2,
}

impl GradeLevel {
    pub const ALL: [GradeLevel; 6] = [
        GradeLevel::Ci,
        GradeLevel::Cp,
        GradeLevel::Ce1,
        GradeLevel::Ce2,
        GradeLevel::Cm1,
        GradeLevel::Cm2,
    ];

    pub fn code(self) -> &'static str {
        match self {
            GradeLevel::Ci => "CI",
            GradeLevel::Cp => "CP",
            GradeLevel::Ce1 => "CE1",
            GradeLevel::Ce2 => "CE2",
            GradeLevel::Cm1 => "CM1",
            GradeLevel::Cm2 => "CM2",
        }
    }

    /// How long the written summary should be for this grade.
    pub fn summary_calibration(self) -> &'static str {
        match self {
            GradeLevel::Ci | GradeLevel::Cp => "une seule phrase simple",
            GradeLevel::Ce1 | GradeLevel::Ce2 => "deux ou trois phrases courtes",
            GradeLevel::Cm1 | GradeLevel::Cm2 => "une synthèse structurée",
        }
    }
}

impl Default for GradeLevel {
    fn default() -> Self {
        GradeLevel::Cm2
    }
}

impl fmt::Display for GradeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for GradeLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        GradeLevel::ALL
            .into_iter()
            .find(|grade| grade.code().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown grade level '{}'", s))
    }
}

//=========================================================================================
// The Sheet
//=========================================================================================

/// One temporal phase of a lesson.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    pub name: String,
    pub objective: String,
    pub teacher_activity: String,
    pub student_activity: String,
}

/// Supplies needed for the lesson.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Material {
    #[serde(default)]
    pub collective: String,
    #[serde(default)]
    pub individual: String,
}

/// A lesson-preparation sheet ("fiche de préparation").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sheet {
    pub id: SheetId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discipline: Option<String>,
    pub subject: String,
    pub domain: String,
    pub sub_domain: String,
    pub grade_level: GradeLevel,
    /// Compétence de base (CB).
    pub competence: String,
    /// Palier.
    pub level: String,
    /// Objectif d'apprentissage (OA).
    pub oa: String,
    /// Trace écrite.
    #[serde(default)]
    pub content_summary: String,
    /// Objectif spécifique (OS).
    pub specific_objective: String,
    #[serde(rename = "type")]
    pub sheet_type: SheetType,
    pub duration: String,
    #[serde(default)]
    pub material: Material,
    #[serde(default)]
    pub reference: String,
    #[serde(default)]
    pub steps: Vec<Step>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

//=========================================================================================
// Generation Request
//=========================================================================================

/// A non-empty, duplicate-free, ordered list of language names.
///
/// The first language leads each `/`-separated segment of generated text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct Languages(Vec<String>);

impl Languages {
    pub fn new(languages: Vec<String>) -> Result<Self, String> {
        let mut cleaned: Vec<String> = Vec::with_capacity(languages.len());
        for language in languages {
            let language = language.trim().to_string();
            if language.is_empty() {
                continue;
            }
            if cleaned.iter().any(|l| l.eq_ignore_ascii_case(&language)) {
                return Err(format!("language '{}' is listed twice", language));
            }
            cleaned.push(language);
        }
        if cleaned.is_empty() {
            return Err("at least one language is required".to_string());
        }
        Ok(Self(cleaned))
    }

    pub fn single(language: &str) -> Self {
        Self(vec![language.to_string()])
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn is_multilingual(&self) -> bool {
        self.0.len() > 1
    }

    /// Joins the names the way multilingual fields are written (`A / B`).
    pub fn joined(&self) -> String {
        self.0.join(" / ")
    }
}

impl Default for Languages {
    fn default() -> Self {
        Self::single("Français")
    }
}

impl TryFrom<Vec<String>> for Languages {
    type Error = String;

    fn try_from(value: Vec<String>) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Languages> for Vec<String> {
    fn from(value: Languages) -> Self {
        value.0
    }
}

/// The parameters of one generation call. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub topic: String,
    pub grade_level: GradeLevel,
    pub activity: String,
    pub languages: Languages,
    #[serde(rename = "type")]
    pub sheet_type: SheetType,
}
