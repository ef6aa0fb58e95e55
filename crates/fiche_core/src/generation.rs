//! crates/fiche_core/src/generation.rs
//!
//! Turns a `GenerationRequest` into a `Sheet` through the `CompletionService` port:
//! builds the curriculum instruction and response schema, pulls the JSON object
//! out of the raw response, decodes it against a typed payload, and stamps the
//! client-assigned fields.

use chrono::{DateTime, SubsecRound, Utc};
use regex::Regex;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::{Arc, OnceLock};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::domain::{GenerationRequest, Material, Sheet, SheetId, Step};
use crate::ports::{CompletionPrompt, CompletionService};

pub const SCHEMA_NAME: &str = "fiche_pedagogique";

const GENERIC_FAILURE: &str =
    "Erreur lors de la génération. Veuillez vérifier la connexion ou les paramètres.";

const SYSTEM_INSTRUCTION_TEMPLATE: &str = r#"Tu es l'expert de référence du Ministère de l'Éducation Nationale du Sénégal et tu maîtrises le Guide Pédagogique du Curriculum de l'Éducation de Base (CEB) pour toutes les classes (CI, CP, CE1, CE2, CM1, CM2) et toutes les disciplines.

RÉFÉRENTIEL DU CEB :
1. Langue et Communication (LC) : communication orale, lecture, écriture, production d'écrits, grammaire, conjugaison, orthographe, vocabulaire.
2. Mathématiques : activités numériques, géométrie, mesure, résolution de problèmes.
3. ESVS : histoire, géographie, initiation scientifique et technologique.
4. EDD (Éducation au Développement Durable) : vivre ensemble, vivre dans son milieu.
5. Arts et Sports : arts plastiques, éducation musicale, EPS.
6. Franco-Arabe : Tawhid, Fiqh, Sirah, Hadith, Coran (Hifz/Tajwid), langue arabe (Nahw, Sarf, Imla, Incha).
7. Anglais : initiation à l'anglais oral et écrit.

MISSION :
- Décliner précisément le DOMAINE, le SOUS-DOMAINE, la CB, le PALIER et l'OA du guide pour la classe de {grade}.
- Employer le vocabulaire pédagogique de l'APC : matérialisation, confrontation, validation, institutionnalisation.
- Calibrer le résumé (trace écrite) pour un élève de {grade} : {calibration}.

DÉROULEMENT OBLIGATOIRE (modèle APC) :
- Mise en train : rappel des pré-requis ou jeu éducatif.
- Mise en situation : situation-problème ancrée dans le contexte sénégalais (lieux, prénoms locaux).
- Construction des connaissances : démarche active (observation, hypothèses, vérification, synthèse).
- Évaluation : exercice d'application immédiate de l'OS.

Réponds EXCLUSIVEMENT avec un objet JSON conforme au schéma fourni."#;

//=========================================================================================
// Errors
//=========================================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerationError {
    #[error("The generation service returned an empty response")]
    EmptyResponse,
    #[error("The generation response contains no JSON object")]
    NoJsonObject,
    #[error("The generation response is not valid JSON: {0}")]
    Malformed(String),
    #[error("The generation response does not match the sheet schema: {0}")]
    Schema(String),
    #[error("The generation service failed: {0}")]
    Upstream(String),
    #[error("The generation was cancelled")]
    Cancelled,
}

impl GenerationError {
    /// The message shown to the teacher: the provider's own wording when the
    /// provider failed, a generic notice otherwise.
    pub fn user_message(&self) -> String {
        match self {
            GenerationError::Upstream(message) if !message.trim().is_empty() => message.clone(),
            _ => GENERIC_FAILURE.to_string(),
        }
    }
}

//=========================================================================================
// Prompt and Schema
//=========================================================================================

/// Builds the full prompt for one request.
pub fn build_prompt(request: &GenerationRequest) -> CompletionPrompt {
    let grade = request.grade_level;
    let system_instruction = SYSTEM_INSTRUCTION_TEMPLATE
        .replace("{grade}", grade.code())
        .replace("{calibration}", grade.summary_calibration());

    CompletionPrompt {
        system_instruction,
        user_prompt: user_prompt(request),
        schema_name: SCHEMA_NAME,
        response_schema: response_schema(),
    }
}

fn user_prompt(request: &GenerationRequest) -> String {
    let languages = &request.languages;
    let mut prompt = format!(
        "Génère une fiche de préparation complète pour :\n\
         Classe : \"{}\"\n\
         Discipline/Activité : \"{}\"\n\
         Titre de la leçon : \"{}\"\n\
         Type : \"{}\"\n\
         Langue(s) de rédaction : \"{}\"\n\n",
        request.grade_level.code(),
        request.activity.trim(),
        request.topic.trim(),
        request.sheet_type.code(),
        languages.joined(),
    );

    if languages.is_multilingual() {
        prompt.push_str(&format!(
            "Rédige chaque champ texte (titres, activités, résumé) dans toutes ces langues, \
             dans cet ordre, en séparant les versions par \" / \" (exemple : \"Titre / العنوان\"). \
             Langues : {}.",
            languages.joined()
        ));
    } else {
        prompt.push_str(&format!(
            "Tout le contenu (titres, activités, résumé) doit être rédigé en \"{}\".",
            languages.joined()
        ));
    }
    prompt
}

/// The JSON Schema of the expected response: a sheet without the fields the
/// client assigns itself (id, createdAt, type, gradeLevel).
pub fn response_schema() -> Value {
    let text = json!({ "type": "string" });
    json!({
        "type": "object",
        "properties": {
            "title": text,
            "domain": text,
            "subDomain": text,
            "discipline": text,
            "activity": text,
            "competence": text,
            "level": text,
            "oa": text,
            "contentSummary": text,
            "specificObjective": text,
            "duration": text,
            "reference": text,
            "material": {
                "type": "object",
                "properties": {
                    "collective": text,
                    "individual": text
                }
            },
            "steps": {
                "type": "array",
                "minItems": 1,
                "items": {
                    "type": "object",
                    "properties": {
                        "name": text,
                        "objective": text,
                        "teacherActivity": text,
                        "studentActivity": text
                    },
                    "required": ["name", "objective", "teacherActivity", "studentActivity"]
                }
            }
        },
        "required": [
            "title", "domain", "subDomain", "competence", "level",
            "oa", "specificObjective", "duration", "steps"
        ]
    })
}

//=========================================================================================
// Response Decoding
//=========================================================================================

/// The typed shape of a generation response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeneratedSheet {
    title: String,
    domain: String,
    sub_domain: String,
    #[serde(default)]
    discipline: Option<String>,
    #[serde(default)]
    activity: Option<String>,
    competence: String,
    level: String,
    oa: String,
    #[serde(default)]
    content_summary: Option<String>,
    specific_objective: String,
    duration: String,
    #[serde(default)]
    reference: Option<String>,
    #[serde(default)]
    material: Option<Material>,
    steps: Vec<Step>,
}

impl GeneratedSheet {
    fn into_sheet(self, request: &GenerationRequest, created_at: DateTime<Utc>) -> Sheet {
        let subject = non_blank(self.activity).unwrap_or_else(|| request.activity.clone());
        Sheet {
            id: SheetId::generate(),
            title: self.title,
            discipline: non_blank(self.discipline),
            subject,
            domain: self.domain,
            sub_domain: self.sub_domain,
            grade_level: request.grade_level,
            competence: self.competence,
            level: self.level,
            oa: self.oa,
            content_summary: self.content_summary.unwrap_or_default(),
            specific_objective: self.specific_objective,
            sheet_type: request.sheet_type,
            duration: self.duration,
            material: self.material.unwrap_or_default(),
            reference: self.reference.unwrap_or_default(),
            steps: self.steps,
            created_at,
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn json_object_span() -> &'static Regex {
    static SPAN: OnceLock<Regex> = OnceLock::new();
    SPAN.get_or_init(|| Regex::new(r"\{[\s\S]*\}").expect("static pattern compiles"))
}

/// Finds the first well-formed JSON object in `raw`, tolerating prose and
/// stray braces around it.
pub fn extract_json_object(raw: &str) -> Result<Value, GenerationError> {
    let text = raw.trim();
    if text.is_empty() {
        return Err(GenerationError::EmptyResponse);
    }
    let span = json_object_span()
        .find(text)
        .ok_or(GenerationError::NoJsonObject)?;

    if let Ok(value) = serde_json::from_str::<Value>(span.as_str()) {
        return Ok(value);
    }

    // Braces in the surrounding prose break the greedy span. Decode the first
    // value at each opening brace in turn and keep the first that parses.
    let mut first_error = None;
    for (start, _) in text.match_indices('{') {
        let mut values = serde_json::Deserializer::from_str(&text[start..]).into_iter::<Value>();
        match values.next() {
            Some(Ok(value)) => return Ok(value),
            Some(Err(e)) => {
                first_error.get_or_insert(e);
            }
            None => {}
        }
    }
    Err(match first_error {
        Some(e) => GenerationError::Malformed(e.to_string()),
        None => GenerationError::NoJsonObject,
    })
}

fn decode_payload(raw: &str) -> Result<GeneratedSheet, GenerationError> {
    let value = extract_json_object(raw)?;
    let payload: GeneratedSheet =
        serde_json::from_value(value).map_err(|e| GenerationError::Schema(e.to_string()))?;
    if payload.steps.is_empty() {
        return Err(GenerationError::Schema("the sheet has no steps".to_string()));
    }
    Ok(payload)
}

/// Decodes a raw response into a sheet for `request`, stamped at `created_at`.
pub fn sheet_from_response(
    raw: &str,
    request: &GenerationRequest,
    created_at: DateTime<Utc>,
) -> Result<Sheet, GenerationError> {
    Ok(decode_payload(raw)?.into_sheet(request, created_at))
}

//=========================================================================================
// The Generator
//=========================================================================================

/// Generates sheets through a `CompletionService`. Each call is one upstream
/// request; nothing is retried or cached.
#[derive(Clone)]
pub struct SheetGenerator {
    completion: Arc<dyn CompletionService>,
}

impl SheetGenerator {
    pub fn new(completion: Arc<dyn CompletionService>) -> Self {
        Self { completion }
    }

    pub async fn generate(&self, request: &GenerationRequest) -> Result<Sheet, GenerationError> {
        info!(
            "Generating {} sheet for {} / {} ({}).",
            request.sheet_type.code(),
            request.grade_level,
            request.activity,
            request.languages.joined()
        );
        let prompt = build_prompt(request);

        let raw = self.completion.complete(&prompt).await.map_err(|e| {
            error!("Generation service call failed: {:?}", e);
            GenerationError::Upstream(e.to_string())
        })?;

        // Stored timestamps keep millisecond precision.
        let created_at = Utc::now().trunc_subsecs(3);
        let sheet = sheet_from_response(&raw, request, created_at).map_err(|e| {
            error!("Unusable generation response: {}", e);
            e
        })?;
        info!("Generated sheet {} with {} step(s).", sheet.id, sheet.steps.len());
        Ok(sheet)
    }

    /// Like `generate`, but resolves to `GenerationError::Cancelled` as soon as
    /// `token` is cancelled. The upstream call is dropped at that point.
    pub async fn generate_cancellable(
        &self,
        request: &GenerationRequest,
        token: &CancellationToken,
    ) -> Result<Sheet, GenerationError> {
        tokio::select! {
            _ = token.cancelled() => {
                info!("Generation cancelled before completion.");
                Err(GenerationError::Cancelled)
            }
            result = self.generate(request) => result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{GradeLevel, Languages, SheetType};
    use crate::ports::{PortError, PortResult};
    use async_trait::async_trait;
    use std::sync::Mutex;

    const PAYLOAD: &str = r#"{
        "title": "Le pluriel des noms",
        "domain": "Langue et Communication",
        "subDomain": "Étude de la langue",
        "activity": "Grammaire",
        "competence": "Produire des textes",
        "level": "Palier 2",
        "oa": "Maîtriser les accords",
        "specificObjective": "Former le pluriel des noms en -s et -x",
        "duration": "45 min",
        "type": "EVALUATION",
        "gradeLevel": "CI",
        "steps": [
            {"name": "Mise en train", "objective": "o1", "teacherActivity": "t1", "studentActivity": "s1"},
            {"name": "Mise en situation", "objective": "o2", "teacherActivity": "t2", "studentActivity": "s2"}
        ]
    }"#;

    fn request() -> GenerationRequest {
        GenerationRequest {
            topic: "Le pluriel des noms".to_string(),
            grade_level: GradeLevel::Cm2,
            activity: "Grammaire".to_string(),
            languages: Languages::default(),
            sheet_type: SheetType::Lesson,
        }
    }

    /// Replies with a fixed text and remembers the prompts it received.
    struct CannedCompletion {
        reply: PortResult<String>,
        prompts: Mutex<Vec<CompletionPrompt>>,
    }

    impl CannedCompletion {
        fn ok(text: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(text.to_string()),
                prompts: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl CompletionService for CannedCompletion {
        async fn complete(&self, prompt: &CompletionPrompt) -> PortResult<String> {
            self.prompts.lock().unwrap().push(prompt.clone());
            match &self.reply {
                Ok(text) => Ok(text.clone()),
                Err(e) => Err(PortError::Unavailable(e.to_string())),
            }
        }
    }

    #[test]
    fn extracts_object_wrapped_in_prose() {
        let raw = format!("Voici la fiche demandée :\n```json\n{}\n```\nBon courage !", PAYLOAD);
        let value = extract_json_object(&raw).unwrap();
        assert_eq!(value["title"], "Le pluriel des noms");
    }

    #[test]
    fn extracts_first_object_when_prose_contains_braces() {
        let raw = format!("{} et un détail {{ hors JSON }}", PAYLOAD);
        let value = extract_json_object(&raw).unwrap();
        assert_eq!(value["steps"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn skips_braces_in_leading_prose() {
        let raw = r#"Voici la fiche {CM2} demandée : {"title": "Le pluriel", "steps": []} Bonne leçon."#;
        let value = extract_json_object(raw).unwrap();
        assert_eq!(value["title"], "Le pluriel");

        let raw = format!("Classe {{CM2}}, type {{LESSON}} :\n{}\nFin {{ }}", PAYLOAD);
        let value = extract_json_object(&raw).unwrap();
        assert_eq!(value["steps"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn classifies_unusable_responses() {
        assert_eq!(extract_json_object("  \n").unwrap_err(), GenerationError::EmptyResponse);
        assert_eq!(extract_json_object("désolé").unwrap_err(), GenerationError::NoJsonObject);
        assert!(matches!(
            extract_json_object("{ title: oops }").unwrap_err(),
            GenerationError::Malformed(_)
        ));
        assert!(matches!(
            sheet_from_response(r#"{"title": "x"}"#, &request(), Utc::now()).unwrap_err(),
            GenerationError::Schema(_)
        ));
    }

    #[test]
    fn rejects_a_sheet_without_steps() {
        let mut value: Value = serde_json::from_str(PAYLOAD).unwrap();
        value["steps"] = json!([]);
        let err = sheet_from_response(&value.to_string(), &request(), Utc::now()).unwrap_err();
        assert!(matches!(err, GenerationError::Schema(_)));
    }

    #[test]
    fn client_fields_override_the_payload() {
        let created_at = Utc::now();
        let sheet = sheet_from_response(PAYLOAD, &request(), created_at).unwrap();
        assert_eq!(sheet.grade_level, GradeLevel::Cm2);
        assert_eq!(sheet.sheet_type, SheetType::Lesson);
        assert_eq!(sheet.created_at, created_at);
        assert_eq!(sheet.subject, "Grammaire");
        assert_eq!(sheet.content_summary, "");
        assert_eq!(sheet.material, Material::default());
    }

    #[test]
    fn blank_activity_falls_back_to_the_request() {
        let mut value: Value = serde_json::from_str(PAYLOAD).unwrap();
        value["activity"] = json!("  ");
        let mut req = request();
        req.activity = "Orthographe".to_string();
        let sheet = sheet_from_response(&value.to_string(), &req, Utc::now()).unwrap();
        assert_eq!(sheet.subject, "Orthographe");
    }

    #[test]
    fn prompt_carries_request_parameters() {
        let prompt = build_prompt(&request());
        assert!(prompt.system_instruction.contains("CM2"));
        assert!(prompt.system_instruction.contains("synthèse structurée"));
        assert!(prompt.user_prompt.contains("\"Grammaire\""));
        assert!(prompt.user_prompt.contains("\"LESSON\""));
        assert!(prompt.user_prompt.contains("rédigé en \"Français\""));
        assert_eq!(prompt.response_schema["properties"]["steps"]["minItems"], 1);
        assert!(prompt.response_schema["properties"].get("gradeLevel").is_none());
    }

    #[test]
    fn multilingual_prompt_asks_for_interleaved_segments() {
        let mut req = request();
        req.languages = Languages::new(vec!["Français".to_string(), "Arabe".to_string()]).unwrap();
        let prompt = build_prompt(&req);
        assert!(prompt.user_prompt.contains("Français / Arabe"));
        assert!(prompt.user_prompt.contains("\" / \""));
    }

    #[tokio::test]
    async fn generator_sends_one_prompt_per_call() {
        let completion = CannedCompletion::ok(PAYLOAD);
        let generator = SheetGenerator::new(completion.clone());

        let first = generator.generate(&request()).await.unwrap();
        let second = generator.generate(&request()).await.unwrap();

        assert_ne!(first.id, second.id);
        assert_eq!(completion.prompts.lock().unwrap().len(), 2);
    }

    struct HangingCompletion;

    #[async_trait]
    impl CompletionService for HangingCompletion {
        async fn complete(&self, _prompt: &CompletionPrompt) -> PortResult<String> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn cancellation_interrupts_a_pending_call() {
        let token = CancellationToken::new();
        let generator = SheetGenerator::new(Arc::new(HangingCompletion));

        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            canceller.cancel();
        });

        let err = generator
            .generate_cancellable(&request(), &token)
            .await
            .unwrap_err();
        assert_eq!(err, GenerationError::Cancelled);
    }

    #[tokio::test]
    async fn upstream_failures_keep_the_provider_message() {
        let completion = Arc::new(CannedCompletion {
            reply: Err(PortError::Unavailable("quota exceeded".to_string())),
            prompts: Mutex::new(Vec::new()),
        });
        let err = SheetGenerator::new(completion)
            .generate(&request())
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::Upstream(_)));
        assert!(err.user_message().contains("quota exceeded"));
        assert_eq!(GenerationError::EmptyResponse.user_message(), GENERIC_FAILURE);
    }
}
